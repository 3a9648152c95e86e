//! Turns configured checks into pass/fail lines for the report.

use crate::config::probe_config::{BitlbeeCheck, HttpGetCheck, VirtualenvCheck};
use crate::error::ProbeError;
use crate::http_probe::prelude::*;
use crate::http_probe::report;
use crate::irc_probe::prelude::*;
use crate::virtualenv::{CommandRunner, Virtualenv};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl CheckReport {
    fn failed(name: String, detail: String) -> Self {
        Self {
            name,
            passed: false,
            detail,
        }
    }

    fn errored(name: String, e: &ProbeError) -> Self {
        Self::failed(name, format!("Probe error ({}): {}", e.kind(), report(e)))
    }
}

pub async fn run_bitlbee(check: &BitlbeeCheck, host: &str) -> CheckReport {
    let name = check.label();
    let mut probe = BitlbeeProbe::new(check.target(host));

    if let Err(e) = probe.start().await {
        return CheckReport::errored(name, &e);
    }

    let outcome = probe.outcome().clone();
    if outcome.timed_out {
        return CheckReport::failed(name, "Timed out".to_string());
    }
    if !outcome.connected {
        return CheckReport::failed(name, format!("Not connectable ({:?})", probe.state()));
    }

    let version_ok = check
        .version_contains
        .as_deref()
        .is_none_or(|expected| outcome.version.contains(expected));

    CheckReport {
        name,
        passed: version_ok,
        detail: format!("Version: {:?}", outcome.version),
    }
}

pub async fn run_http_get(check: &HttpGetCheck, host: &str) -> CheckReport {
    let name = check.label();
    let probe = match HttpProbe::fetch(check.target(host)).await {
        Ok(probe) => probe,
        Err(e) => return CheckReport::errored(name, &e),
    };

    if probe.timed_out() {
        return CheckReport::failed(name, format!("Timed out, URL: {}", probe.outcome().url));
    }

    let status_ok = check.accepted_status_codes.contains(&probe.status());
    let redirect_ok = check
        .expect_redirect
        .as_deref()
        .is_none_or(|location| probe.redirected_to(location));

    let mut detail = format!(
        "URL: {}, Status: {} (accepted: {:?}), Elapsed: {:.2}ms",
        probe.outcome().url,
        probe.status(),
        check.accepted_status_codes,
        probe.outcome().http_time * 1000.0
    );
    if let Some(location) = &probe.outcome().redirect_location {
        detail.push_str(&format!(", Location: {location}"));
    }

    CheckReport {
        name,
        passed: status_ok && redirect_ok,
        detail,
    }
}

pub async fn run_virtualenv<R: CommandRunner>(check: &VirtualenvCheck, runner: R) -> CheckReport {
    let name = check.label();
    let mut venv = Virtualenv::new(&check.path, runner);

    let summary = async {
        let healthy = venv.is_virtualenv().await?;
        let python = venv.python_version().await?;
        let pip = venv.pip_version().await?;
        let packages = venv.pip_freeze().await?.len();
        Ok::<_, ProbeError>((healthy, python, pip, packages))
    };

    match summary.await {
        Ok((healthy, python, pip, packages)) => CheckReport {
            name,
            passed: healthy,
            detail: format!("Python: {python:?}, pip: {pip:?}, Packages: {packages}"),
        },
        Err(e) => CheckReport::errored(name, &e),
    }
}
