use std::env;

use anyhow::Context;

use super::probe_config::ChecksConfig;

const DEFAULT_CONFIG_FILE: &str = "checks.yml";
const DEFAULT_TARGET_HOST: &str = "127.0.0.1";

pub struct AppConfig {
    pub checks: ChecksConfig,
    pub target_host: String,
    pub max_name_width: usize,
}

/// Load the application configuration from a YAML file and environment variables.
/// This function reads the configuration file specified by the `CONFIG_FILE` environment variable,
/// parses it into a `ChecksConfig` struct, and resolves the host every probe targets.
pub fn load_config() -> anyhow::Result<AppConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        log::debug!("Loaded environment from {}", path.display());
    }

    let config_file_location =
        env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    let config_str = std::fs::read_to_string(&config_file_location)
        .with_context(|| format!("Failed to read {config_file_location}"))?;

    let checks: ChecksConfig = serde_yaml::from_str(&config_str)
        .with_context(|| format!("Invalid YAML in {config_file_location}"))?;

    let target_host = resolve_target_host(
        env::var("TARGET_HOST").ok(),
        env::var("SERVERSPEC_TARGET_HOST").ok(),
    );
    log::info!("Using target host: {}", target_host);

    let max_name_width = checks.labels().map(|name| name.len()).max().unwrap_or(10);

    Ok(AppConfig {
        checks,
        target_host,
        max_name_width,
    })
}

/// First non-blank candidate wins, then the loopback default.
pub fn resolve_target_host(primary: Option<String>, fallback: Option<String>) -> String {
    [primary, fallback]
        .into_iter()
        .flatten()
        .map(|host| host.trim().to_string())
        .find(|host| !host.is_empty())
        .unwrap_or_else(|| DEFAULT_TARGET_HOST.to_string())
}
