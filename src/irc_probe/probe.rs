use std::io::ErrorKind;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::handshake::{Handshake, LoginStep};
use super::result::{HandshakeState, IrcOutcome};
use super::transport::open_stream;
use crate::error::{ProbeError, Result};
use crate::probe::{DEFAULT_PROBE_TIMEOUT, run_with_timeout};

const READ_CHUNK: usize = 1024;
const QUIT_LINE: &str = "QUIT :\"outta here\"";

/// Where and as whom a Bitlbee probe connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcTarget {
    pub host: String,
    pub port: u16,
    pub nick: String,
    pub password: String,
    pub secure: bool,
    pub timeout: Duration,
}

impl IrcTarget {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        nick: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            nick: nick.into(),
            password: password.into(),
            secure: false,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// One login attempt against a Bitlbee gateway.
///
/// Nothing touches the network until the first accessor call, which runs the
/// whole attempt once; later calls read the recorded outcome. Accessors take
/// `&mut self`, so an instance is driven from one task at a time.
///
/// Read failures inside the handshake end the exchange quietly instead of
/// failing the probe: a gateway that hangs up mid-login shows up as an empty
/// version, not as an error. Write and TLS failures are returned.
#[derive(Debug)]
pub struct BitlbeeProbe {
    target: IrcTarget,
    started: bool,
    state: HandshakeState,
    outcome: IrcOutcome,
}

impl BitlbeeProbe {
    pub fn new(target: IrcTarget) -> Self {
        Self {
            target,
            started: false,
            state: HandshakeState::NotStarted,
            outcome: IrcOutcome::default(),
        }
    }

    pub fn target(&self) -> &IrcTarget {
        &self.target
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// The recorded outcome, without triggering the attempt.
    pub fn outcome(&self) -> &IrcOutcome {
        &self.outcome
    }

    /// Run the attempt unless it already ran.
    ///
    /// Timeouts and refused connections are recorded in the outcome. Any other
    /// failure is returned once; the probe stays started afterwards.
    pub async fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        self.state = HandshakeState::Connecting;

        let target = &self.target;
        let envelope = run_with_timeout(target.timeout, session(target, &mut self.outcome)).await;

        match envelope.completed {
            None => {
                log::warn!(
                    "Bitlbee probe of {}:{} timed out after {:.2}s",
                    target.host,
                    target.port,
                    envelope.elapsed_seconds
                );
                self.outcome.timed_out = true;
                self.state = HandshakeState::TimedOut;
                Ok(())
            }
            Some(Ok(state)) => {
                log::info!(
                    "Bitlbee probe of {}:{} finished: connected={}, version={:?}",
                    target.host,
                    target.port,
                    self.outcome.connected,
                    self.outcome.version
                );
                self.state = state;
                Ok(())
            }
            Some(Err(ProbeError::Transport(e))) if e.kind() == ErrorKind::ConnectionRefused => {
                log::warn!("Bitlbee at {}:{} refused the connection", target.host, target.port);
                self.outcome.connected = false;
                self.state = HandshakeState::ConnRefused;
                Ok(())
            }
            Some(Err(e)) => {
                self.state = HandshakeState::Done;
                Err(e)
            }
        }
    }

    pub async fn timed_out(&mut self) -> Result<bool> {
        self.start().await?;
        Ok(self.outcome.timed_out)
    }

    pub async fn connectable(&mut self) -> Result<bool> {
        self.start().await?;
        Ok(self.outcome.connected)
    }

    pub async fn version(&mut self) -> Result<String> {
        self.start().await?;
        Ok(self.outcome.version.clone())
    }
}

/// Connect, converse, say goodbye. The stream is dropped (closed) on every
/// exit from this future, including cancellation by the timeout.
async fn session(target: &IrcTarget, outcome: &mut IrcOutcome) -> Result<HandshakeState> {
    let mut stream = open_stream(&target.host, target.port, target.secure).await?;
    let mut handshake = Handshake::new(&target.nick, &target.password);

    let still_open = converse(&mut stream, &mut handshake, outcome).await?;
    if still_open {
        send_line(&mut stream, QUIT_LINE).await?;
        if let Err(e) = stream.shutdown().await {
            log::debug!("Shutdown after QUIT failed: {e}");
        }
    }

    Ok(handshake.state())
}

/// Drive the login and version phases over `stream`.
///
/// Returns whether the peer is still there when the exchange ends.
pub(crate) async fn converse<S>(
    stream: &mut S,
    handshake: &mut Handshake,
    outcome: &mut IrcOutcome,
) -> Result<bool>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    for line in handshake.registration() {
        send_line(stream, &line).await?;
    }

    let mut chunk = [0u8; READ_CHUNK];

    let logged_in = loop {
        let Some(n) = read_chunk(stream, &mut chunk).await else {
            break false;
        };
        outcome.connected = true;

        match handshake.feed_login(&chunk[..n]) {
            LoginStep::Pending => {}
            LoginStep::Reply(line) => send_line(stream, &line).await?,
            LoginStep::Complete => break true,
        }
    };

    if !logged_in {
        log::debug!("Stream closed before login completed");
        handshake.finish();
        return Ok(false);
    }

    let query = handshake.version_query();
    send_line(stream, &query).await?;

    loop {
        let Some(n) = read_chunk(stream, &mut chunk).await else {
            if let Some(version) = handshake.finish() {
                outcome.version = version;
            }
            return Ok(false);
        };

        if let Some(version) = handshake.feed_version(&chunk[..n]) {
            outcome.version = version;
            return Ok(true);
        }
    }
}

/// `None` on EOF or on any read error.
async fn read_chunk<S>(stream: &mut S, chunk: &mut [u8]) -> Option<usize>
where
    S: AsyncRead + Unpin,
{
    match stream.read(chunk).await {
        Ok(0) => None,
        Ok(n) => Some(n),
        Err(e) => {
            log::debug!("Read ended the exchange: {e}");
            None
        }
    }
}

async fn send_line<S>(stream: &mut S, line: &str) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    log::debug!("-> {}", redact(line));
    stream.write_all(line.as_bytes()).await?;
    stream.write_all(b"\r\n").await?;
    stream.flush().await?;
    Ok(())
}

fn redact(line: &str) -> &str {
    if line.starts_with("PASS ") {
        "PASS ****"
    } else if line.contains(":identify ") {
        "PRIVMSG &bitlbee :identify ****"
    } else {
        line
    }
}
