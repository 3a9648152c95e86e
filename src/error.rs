//! Error taxonomy shared by every probe.
//!
//! Timeouts and refused connections are not errors: probes record them in
//! their outcome. Everything listed here is a failure the caller has to see.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    /// Any socket failure other than a refused connection.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("tls negotiation failed: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid header value: {0}")]
    InvalidHeader(String),

    #[error("command failed: {0}")]
    Command(String),
}

impl ProbeError {
    /// Short label used in log lines and the report.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Tls(_) => "tls",
            Self::Http(_) => "http",
            Self::InvalidUrl(_) => "invalid_url",
            Self::InvalidHeader(_) => "invalid_header",
            Self::Command(_) => "command",
        }
    }
}

pub type Result<T, E = ProbeError> = std::result::Result<T, E>;
