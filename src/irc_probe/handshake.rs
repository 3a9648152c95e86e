//! Bitlbee login and CTCP VERSION exchange, independent of any socket.
//!
//! The server greeting is matched with substring rules against a buffer that
//! accumulates across reads, so a line split over several reads still matches
//! once its last piece arrives. The buffer is cleared whenever a rule fires.

use std::sync::LazyLock;

use regex::bytes::Regex;

use super::result::HandshakeState;

const WELCOME: &[u8] = b"Welcome to the";
const IDENTIFY_PROMPT: &[u8] = b"If you've never";

// Only a terminated line is answered, so a partially read PING is not
// answered with a truncated token. Trailing parameters are ignored.
static PING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PING (\S+)[^\r\n]*\r?\n").expect("static PING pattern"));

// CTCP delimiters and CR/LF frame the payload and are not part of it.
static VERSION_REPLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"VERSION ([^\x01\r\n]+)[\x01\r\n]").expect("static VERSION pattern")
});
static VERSION_REPLY_UNTERMINATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"VERSION ([^\x01\r\n]+)$").expect("static VERSION pattern")
});

/// Result of feeding one read into the login phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStep {
    /// No rule matched yet; keep reading.
    Pending,
    /// A rule matched; send this line and keep reading.
    Reply(String),
    /// The `+i` mode confirmation arrived.
    Complete,
}

#[derive(Debug)]
pub struct Handshake {
    nick: String,
    password: String,
    mode_confirmation: Vec<u8>,
    buffer: Vec<u8>,
    state: HandshakeState,
}

impl Handshake {
    pub fn new(nick: &str, password: &str) -> Self {
        Self {
            nick: nick.to_string(),
            password: password.to_string(),
            mode_confirmation: format!("MODE {nick} :+i").into_bytes(),
            buffer: Vec::with_capacity(1024),
            state: HandshakeState::Connecting,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Lines sent as soon as the stream is open.
    pub fn registration(&mut self) -> Vec<String> {
        self.state = HandshakeState::LoginWait;
        vec![
            format!("PASS {}", self.password),
            format!("NICK {}", self.nick),
            format!("USER {0} {0} servername :TestUser", self.nick),
        ]
    }

    /// Append a read to the buffer and apply the first matching login rule.
    pub fn feed_login(&mut self, bytes: &[u8]) -> LoginStep {
        self.buffer.extend_from_slice(bytes);

        if contains(&self.buffer, WELCOME) {
            log::debug!("Welcome received, setting user mode +i");
            self.buffer.clear();
            return LoginStep::Reply(format!("MODE {} +i", self.nick));
        }

        if contains(&self.buffer, IDENTIFY_PROMPT) {
            log::debug!("Identify prompt received from &bitlbee");
            self.buffer.clear();
            self.state = HandshakeState::IdentifyWait;
            return LoginStep::Reply(format!("PRIVMSG &bitlbee :identify {}", self.password));
        }

        if let Some(token) = PING
            .captures(&self.buffer)
            .and_then(|caps| caps.get(1))
            .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
        {
            log::debug!("PING {token} during login");
            self.buffer.clear();
            return LoginStep::Reply(format!("PONG {token}"));
        }

        if contains(&self.buffer, &self.mode_confirmation) {
            log::debug!("Mode +i confirmed for {}", self.nick);
            self.buffer.clear();
            return LoginStep::Complete;
        }

        LoginStep::Pending
    }

    /// The CTCP VERSION query. Starts the version phase with an empty buffer.
    pub fn version_query(&mut self) -> String {
        self.buffer.clear();
        self.state = HandshakeState::VersionWait;
        "PRIVMSG root :\x01VERSION\x01".to_string()
    }

    /// Append a read and return the version payload once a complete reply is buffered.
    pub fn feed_version(&mut self, bytes: &[u8]) -> Option<String> {
        self.buffer.extend_from_slice(bytes);
        let version = capture(&VERSION_REPLY, &self.buffer)?;
        self.state = HandshakeState::Done;
        Some(version)
    }

    /// The stream ended. A reply cut off by the close still counts.
    pub fn finish(&mut self) -> Option<String> {
        let version = match self.state {
            HandshakeState::VersionWait => capture(&VERSION_REPLY_UNTERMINATED, &self.buffer),
            _ => None,
        };
        self.state = HandshakeState::Done;
        version
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
}

fn capture(pattern: &Regex, buffer: &[u8]) -> Option<String> {
    pattern
        .captures(buffer)
        .and_then(|caps| caps.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
}
