use std::time::Duration;

use serde::Deserialize;

use crate::http_probe::prelude::HttpTarget;
use crate::irc_probe::prelude::IrcTarget;
use crate::probe::Scheme;

/// Every check to run against the target host, grouped by kind.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChecksConfig {
    #[serde(default)]
    pub bitlbee: Vec<BitlbeeCheck>,

    #[serde(default)]
    pub http_get: Vec<HttpGetCheck>,

    #[serde(default)]
    pub virtualenv: Vec<VirtualenvCheck>,
}

impl ChecksConfig {
    /// Display names of all checks, in run order.
    pub fn labels(&self) -> impl Iterator<Item = String> + '_ {
        self.bitlbee
            .iter()
            .map(BitlbeeCheck::label)
            .chain(self.http_get.iter().map(HttpGetCheck::label))
            .chain(self.virtualenv.iter().map(VirtualenvCheck::label))
    }

    pub fn is_empty(&self) -> bool {
        self.bitlbee.is_empty() && self.http_get.is_empty() && self.virtualenv.is_empty()
    }
}

/// A Bitlbee gateway login check.
#[derive(Debug, Clone, Deserialize)]
pub struct BitlbeeCheck {
    #[serde(default)]
    pub name: Option<String>,

    pub port: u16,
    pub nick: String,
    pub password: String,

    /// Connect over TLS. Certificates are not verified.
    #[serde(default)]
    pub use_ssl: bool,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// When set, the reported version must contain this text.
    #[serde(default)]
    pub version_contains: Option<String>,
}

impl BitlbeeCheck {
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("bitlbee:{}", self.port))
    }

    pub fn target(&self, host: &str) -> IrcTarget {
        IrcTarget::new(host, self.port, &self.nick, &self.password)
            .secure(self.use_ssl)
            .with_timeout(Duration::from_secs(self.timeout_seconds))
    }
}

/// A single HTTP GET against the target host.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpGetCheck {
    #[serde(default)]
    pub name: Option<String>,

    pub port: u16,
    pub host_header: String,
    pub path: String,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub protocol: Scheme,

    /// Skip certificate verification. Only honoured for https.
    #[serde(default)]
    pub bypass_ssl_verify: bool,

    /// Defaults to 200 if not specified.
    #[serde(default = "default_status_codes")]
    pub accepted_status_codes: Vec<u16>,

    /// When set, the response must redirect to exactly this location.
    #[serde(default)]
    pub expect_redirect: Option<String>,
}

impl HttpGetCheck {
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("http_get:{}{}", self.host_header, self.path))
    }

    pub fn target(&self, host: &str) -> HttpTarget {
        HttpTarget::new(host, self.port, &self.host_header, &self.path)
            .with_timeout(Duration::from_secs(self.timeout_seconds))
            .with_scheme(self.protocol)
            .bypass_ssl_verify(self.bypass_ssl_verify)
    }
}

/// A Python virtualenv on the local machine.
#[derive(Debug, Clone, Deserialize)]
pub struct VirtualenvCheck {
    #[serde(default)]
    pub name: Option<String>,

    pub path: String,
}

impl VirtualenvCheck {
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("virtualenv:{}", self.path))
    }
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_status_codes() -> Vec<u16> {
    vec![200]
}

#[cfg(test)]
pub mod test {
    use super::*;

    #[test]
    fn test_default_status_codes() {
        assert_eq!(default_status_codes(), vec![200]);
        assert_eq!(default_timeout_seconds(), 10);
    }

    #[test]
    fn test_checks_deserialization() {
        let yaml = r#"
                    bitlbee:
                        - port: 6697
                          nick: probe
                          password: hunter2
                          use_ssl: true
                          version_contains: "3."
                    http_get:
                        - name: homepage
                          port: 80
                          host_header: www.example.com
                          path: /
                        - port: 443
                          host_header: api.example.com
                          path: /health
                          timeout_seconds: 20
                          protocol: https
                          bypass_ssl_verify: true
                          accepted_status_codes: [200, 301]
                          expect_redirect: https://api.example.com/health/
                    virtualenv:
                        - path: /opt/app/venv
                                    "#;

        let config: ChecksConfig = serde_yaml::from_str(yaml).expect("Invalid YAML");

        assert_eq!(config.bitlbee.len(), 1);
        let bitlbee = &config.bitlbee[0];
        assert_eq!(bitlbee.label(), "bitlbee:6697");
        assert!(bitlbee.use_ssl);
        assert_eq!(bitlbee.timeout_seconds, 10);
        let target = bitlbee.target("10.1.2.3");
        assert_eq!(target.host, "10.1.2.3");
        assert!(target.secure);
        assert_eq!(target.timeout, Duration::from_secs(10));

        assert_eq!(config.http_get.len(), 2);
        let homepage = &config.http_get[0];
        assert_eq!(homepage.label(), "homepage");
        assert_eq!(homepage.protocol, Scheme::Http);
        assert_eq!(homepage.accepted_status_codes, vec![200]);
        assert!(!homepage.bypass_ssl_verify);

        let api = &config.http_get[1];
        assert_eq!(api.label(), "http_get:api.example.com/health");
        let target = api.target("10.1.2.3");
        assert_eq!(target.scheme, Scheme::Https);
        assert!(target.accepts_invalid_certs());
        assert_eq!(target.timeout, Duration::from_secs(20));
        assert_eq!(api.accepted_status_codes, vec![200, 301]);
        assert_eq!(
            api.expect_redirect.as_deref(),
            Some("https://api.example.com/health/")
        );

        assert_eq!(config.virtualenv[0].label(), "virtualenv:/opt/app/venv");
        assert_eq!(config.labels().count(), 4);
    }

    #[test]
    fn test_sections_are_optional() {
        let config: ChecksConfig = serde_yaml::from_str("http_get: []").expect("Invalid YAML");
        assert!(config.is_empty());
    }
}
