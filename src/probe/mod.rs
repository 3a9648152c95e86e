//! The envelope every probe runs in: a single attempt wrapped in a timeout.

pub mod probe;
#[cfg(test)]
pub(crate) mod testing;

pub use probe::{DEFAULT_PROBE_TIMEOUT, Envelope, Scheme, run_with_timeout};
