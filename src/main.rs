use std::process::ExitCode;

use hostprobe::checks::{CheckReport, run_bitlbee, run_http_get, run_virtualenv};
use hostprobe::config::app_config::load_config;
use hostprobe::virtualenv::LocalRunner;

fn to_fixed_width(input: &str, width: usize) -> String {
    use unicode_truncate::UnicodeTruncateStr;

    let (truncated, _) = input.unicode_truncate(width);
    format!("{:<width$}", truncated, width = width)
}

fn print_report(report: &CheckReport, width: usize) {
    let name = to_fixed_width(&report.name, width);
    let mark = if report.passed { "✅" } else { "❌" };
    println!("[{name}] {mark} {}", report.detail);
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let app = match load_config() {
        Ok(app) => app,
        Err(e) => {
            log::error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    if app.checks.is_empty() {
        log::warn!("No checks configured.");
        return ExitCode::SUCCESS;
    }

    let mut reports = Vec::new();

    for check in &app.checks.bitlbee {
        reports.push(run_bitlbee(check, &app.target_host).await);
    }
    for check in &app.checks.http_get {
        reports.push(run_http_get(check, &app.target_host).await);
    }
    for check in &app.checks.virtualenv {
        reports.push(run_virtualenv(check, LocalRunner).await);
    }

    for report in &reports {
        print_report(report, app.max_name_width);
    }

    let failed = reports.iter().filter(|report| !report.passed).count();
    if failed > 0 {
        println!("{failed} of {} checks failed", reports.len());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
