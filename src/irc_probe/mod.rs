//! Bitlbee (IRC gateway) probe: login, identify, then ask root for its CTCP VERSION.

pub mod handshake;
pub mod probe;
pub mod result;
pub mod transport;

pub mod prelude {
    pub use super::probe::{BitlbeeProbe, IrcTarget};
    pub use super::result::{HandshakeState, IrcOutcome};
}
