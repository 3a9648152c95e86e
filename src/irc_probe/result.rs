/// Where a Bitlbee probe is in its single connection attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HandshakeState {
    #[default]
    NotStarted,
    Connecting,
    /// Registration lines sent, waiting for the welcome and identify prompts.
    LoginWait,
    /// `identify` sent to `&bitlbee`, waiting for the `+i` mode confirmation.
    IdentifyWait,
    VersionWait,
    Done,
    TimedOut,
    ConnRefused,
}

impl HandshakeState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            HandshakeState::Done | HandshakeState::TimedOut | HandshakeState::ConnRefused
        )
    }
}

/// Terminal fields of a Bitlbee probe. Every field starts at its zero value
/// and is written at most once per attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IrcOutcome {
    pub connected: bool,
    pub timed_out: bool,
    pub version: String,
}
