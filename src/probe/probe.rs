use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::Deserialize;

/// Budget applied to a whole probe when the caller does not override it.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport scheme of an HTTP probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(format!("unsupported scheme: {other}")),
        }
    }
}

/// What came back from a timeout-wrapped probe run.
#[derive(Debug)]
pub struct Envelope<T> {
    /// `None` when the budget elapsed first.
    pub completed: Option<T>,
    pub elapsed_seconds: f64,
}

impl<T> Envelope<T> {
    pub fn timed_out(&self) -> bool {
        self.completed.is_none()
    }
}

/// Run `fut` inside `budget`.
///
/// When the budget elapses the future is dropped before this returns, so any
/// socket it owns is closed on the timeout path exactly as on the success path.
pub async fn run_with_timeout<F, T>(budget: Duration, fut: F) -> Envelope<T>
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let completed = tokio::time::timeout(budget, fut).await.ok();
    let elapsed_seconds = start.elapsed().as_secs_f64();

    if completed.is_none() {
        log::warn!(
            "Probe exceeded its {:.1}s budget after {:.2}s",
            budget.as_secs_f64(),
            elapsed_seconds
        );
    }

    Envelope {
        completed,
        elapsed_seconds,
    }
}
