use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Duration;

use reqwest::header::{HOST, HeaderMap, HeaderValue, LOCATION};
use reqwest::redirect::Policy;
use serde_json::{Map, Value};
use url::Url;

use super::result::HttpOutcome;
use crate::error::{ProbeError, Result};
use crate::probe::{DEFAULT_PROBE_TIMEOUT, Scheme, run_with_timeout};

pub const USER_AGENT: &str = concat!("hostprobe/", env!("CARGO_PKG_VERSION"), " (http_get)");

/// What an HTTP probe requests. The URL is built from `host` and `port`;
/// `host_header` only travels in the `Host` header, so a virtual host can be
/// tested against a bare IP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTarget {
    pub host: String,
    pub port: u16,
    pub host_header: String,
    pub path: String,
    pub timeout: Duration,
    pub scheme: Scheme,
    pub bypass_ssl_verify: bool,
}

impl HttpTarget {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        host_header: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            host_header: host_header.into(),
            path: path.into(),
            timeout: DEFAULT_PROBE_TIMEOUT,
            scheme: Scheme::Http,
            bypass_ssl_verify: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn bypass_ssl_verify(mut self, bypass: bool) -> Self {
        self.bypass_ssl_verify = bypass;
        self
    }

    /// Certificate checks are only ever relaxed for https targets.
    pub fn accepts_invalid_certs(&self) -> bool {
        self.scheme == Scheme::Https && self.bypass_ssl_verify
    }

    pub fn url(&self) -> Result<Url> {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        Ok(Url::parse(&format!(
            "{}://{}:{}{}",
            self.scheme, host, self.port, path
        ))?)
    }
}

/// A finished HTTP GET. The request runs once, inside `fetch`; everything
/// after that is a plain read of the recorded outcome.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    target: HttpTarget,
    outcome: HttpOutcome,
}

struct Page {
    status: u16,
    headers: HashMap<String, String>,
    redirect_location: Option<String>,
    body: String,
}

impl HttpProbe {
    /// Issue the GET within the target's timeout.
    ///
    /// Running out of time is recorded in the outcome. Any other request
    /// failure (refused connection, DNS, TLS) is returned as an error.
    pub async fn fetch(target: HttpTarget) -> Result<Self> {
        let url = target.url()?;
        let host_header = HeaderValue::from_str(&target.host_header)
            .map_err(|e| ProbeError::InvalidHeader(format!("{}: {e}", target.host_header)))?;
        let client = build_client(&target)?;

        let envelope =
            run_with_timeout(target.timeout, get_page(&client, url.clone(), host_header)).await;

        let mut outcome = HttpOutcome {
            url: url.to_string(),
            http_time: envelope.elapsed_seconds,
            ..Default::default()
        };

        match envelope.completed {
            None => {
                log::warn!(
                    "GET {url} (Host: {}) timed out after {:.2}s",
                    target.host_header,
                    envelope.elapsed_seconds
                );
                outcome.timed_out = true;
            }
            Some(page) => {
                let page = page?;
                log::info!(
                    "GET {url} (Host: {}) -> {} in {:.2}ms",
                    target.host_header,
                    page.status,
                    envelope.elapsed_seconds * 1000.0
                );
                outcome.http_status = Some(page.status);
                outcome.json = parse_json(&page.body);
                outcome.body = page.body;
                outcome.headers = page.headers;
                outcome.redirect_location = page.redirect_location;
            }
        }

        Ok(Self { target, outcome })
    }

    pub fn target(&self) -> &HttpTarget {
        &self.target
    }

    pub fn outcome(&self) -> &HttpOutcome {
        &self.outcome
    }

    pub fn timed_out(&self) -> bool {
        self.outcome.timed_out
    }

    /// The response status, or 0 when the request timed out.
    pub fn status(&self) -> u16 {
        if self.outcome.timed_out {
            0
        } else {
            self.outcome.http_status.unwrap_or(0)
        }
    }

    pub fn body(&self) -> &str {
        &self.outcome.body
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.outcome.headers
    }

    pub fn json(&self) -> &Map<String, Value> {
        &self.outcome.json
    }

    /// True whenever the response carried a `location` header, 3xx or not.
    pub fn redirected(&self) -> bool {
        self.outcome.redirect_location.is_some()
    }

    pub fn redirected_to(&self, location: &str) -> bool {
        self.outcome.redirect_location.as_deref() == Some(location)
    }
}

fn build_client(target: &HttpTarget) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .redirect(Policy::none())
        .no_proxy()
        .danger_accept_invalid_certs(target.accepts_invalid_certs())
        .build()?)
}

async fn get_page(client: &reqwest::Client, url: Url, host_header: HeaderValue) -> Result<Page> {
    let response = client.get(url).header(HOST, host_header).send().await?;

    let status = response.status().as_u16();
    let headers = collect_headers(response.headers());
    let redirect_location = response
        .headers()
        .get(LOCATION)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());
    let body = response.text().await?;

    Ok(Page {
        status,
        headers,
        redirect_location,
        body,
    })
}

fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut collected: HashMap<String, String> = HashMap::with_capacity(headers.len());
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match collected.entry(name.as_str().to_string()) {
            Entry::Occupied(mut existing) => {
                let joined = existing.get_mut();
                joined.push_str(", ");
                joined.push_str(&value);
            }
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
        }
    }
    collected
}

/// Best effort: anything but a JSON object yields an empty map.
fn parse_json(body: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            log::debug!("Response body is JSON but not an object");
            Map::new()
        }
        Err(e) => {
            log::debug!("Response body is not JSON: {e}");
            Map::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;
    use crate::probe::testing::self_signed_acceptor;

    /// Answer one request with `response` and hand back the raw request text.
    async fn serve_once(response: String) -> (u16, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (port, handle)
    }

    /// `serve_once` behind a self-signed certificate. The handshake failing
    /// on the client side is not an error here.
    async fn serve_tls_once(response: String) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let acceptor = self_signed_acceptor();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let Ok(mut tls) = acceptor.accept(socket).await else {
                return;
            };
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match tls.read(&mut chunk).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => request.extend_from_slice(&chunk[..n]),
                }
            }
            tls.write_all(response.as_bytes()).await.unwrap();
            let _ = tls.shutdown().await;
        });
        port
    }

    fn response(status_line: &str, headers: &[(&str, &str)], body: &str) -> String {
        let mut raw = format!("HTTP/1.1 {status_line}\r\n");
        for (name, value) in headers {
            raw.push_str(&format!("{name}: {value}\r\n"));
        }
        raw.push_str(&format!(
            "content-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        ));
        raw
    }

    #[test]
    fn url_uses_target_host_not_host_header() {
        let target = HttpTarget::new("10.0.0.5", 8080, "www.example.com", "mypath");
        assert_eq!(target.url().unwrap().as_str(), "http://10.0.0.5:8080/mypath");

        let target = HttpTarget::new("myhost", 1, "hostheader", "/a/b?c=d").with_scheme(Scheme::Https);
        assert_eq!(target.url().unwrap().as_str(), "https://myhost:1/a/b?c=d");
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        let target = HttpTarget::new("::1", 8080, "example", "/");
        assert_eq!(target.url().unwrap().as_str(), "http://[::1]:8080/");
    }

    #[test]
    fn default_port_is_left_out_of_the_url() {
        let target = HttpTarget::new("::1", 80, "example", "/");
        assert_eq!(target.url().unwrap().as_str(), "http://[::1]/");
        let target = HttpTarget::new("10.0.0.5", 443, "example", "/").with_scheme(Scheme::Https);
        assert_eq!(target.url().unwrap().as_str(), "https://10.0.0.5/");
    }

    #[test]
    fn certificate_bypass_needs_https() {
        let target = HttpTarget::new("h", 1, "hh", "/").bypass_ssl_verify(true);
        assert!(!target.accepts_invalid_certs());
        assert!(target.with_scheme(Scheme::Https).accepts_invalid_certs());
        assert!(!HttpTarget::new("h", 1, "hh", "/")
            .with_scheme(Scheme::Https)
            .accepts_invalid_certs());
    }

    #[test]
    fn json_is_best_effort() {
        assert!(parse_json("not json").is_empty());
        assert!(parse_json("[1, 2]").is_empty());
        let parsed = parse_json(r#"{"a":1}"#);
        assert_eq!(Value::Object(parsed), json!({"a": 1}));
    }

    #[test]
    fn repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("x-thing", HeaderValue::from_static("one"));
        headers.append("x-thing", HeaderValue::from_static("two"));
        headers.insert("server", HeaderValue::from_static("nginx"));
        let collected = collect_headers(&headers);
        assert_eq!(collected["x-thing"], "one, two");
        assert_eq!(collected["server"], "nginx");
    }

    #[tokio::test]
    async fn records_status_body_and_headers() {
        let (port, server) =
            serve_once(response("200 OK", &[("h1", "h1val"), ("h2", "h2val")], "foo bar")).await;

        let probe = HttpProbe::fetch(HttpTarget::new("127.0.0.1", port, "hostheader", "mypath"))
            .await
            .unwrap();

        assert!(!probe.timed_out());
        assert_eq!(probe.status(), 200);
        assert_eq!(probe.body(), "foo bar");
        assert_eq!(probe.headers()["h1"], "h1val");
        assert_eq!(probe.headers()["h2"], "h2val");
        assert!(probe.json().is_empty());
        assert!(!probe.redirected());
        assert!(!probe.redirected_to("https://myhost:1/mynewpath"));

        let request = server.await.unwrap().to_ascii_lowercase();
        assert!(request.starts_with("get /mypath http/1.1\r\n"));
        assert!(request.contains("\r\nhost: hostheader\r\n"));
        assert!(request.contains(&format!("\r\nuser-agent: {}\r\n", USER_AGENT.to_ascii_lowercase())));
    }

    #[tokio::test]
    async fn parses_json_bodies() {
        let body = r#"{"foo": "bar", "baz": {"blam": "blarg"}}"#;
        let (port, _server) = serve_once(response(
            "200 OK",
            &[("content-type", "application/json")],
            body,
        ))
        .await;

        let probe = HttpProbe::fetch(HttpTarget::new("127.0.0.1", port, "api", "/status"))
            .await
            .unwrap();

        assert_eq!(probe.body(), body);
        assert_eq!(
            Value::Object(probe.json().clone()),
            json!({"foo": "bar", "baz": {"blam": "blarg"}})
        );
    }

    #[tokio::test]
    async fn location_header_marks_redirect() {
        let location = "https://myhost:1/mynewpath";
        let (port, _server) = serve_once(response(
            "301 Moved Permanently",
            &[("location", location)],
            "OK",
        ))
        .await;

        let probe = HttpProbe::fetch(HttpTarget::new("127.0.0.1", port, "hostheader", "mypath"))
            .await
            .unwrap();

        assert_eq!(probe.status(), 301);
        assert!(probe.redirected());
        assert!(probe.redirected_to(location));
        assert!(!probe.redirected_to("https://myhost:1/other"));
    }

    #[tokio::test]
    async fn location_header_counts_without_3xx() {
        let (port, _server) =
            serve_once(response("201 Created", &[("location", "/items/7")], "")).await;

        let probe = HttpProbe::fetch(HttpTarget::new("127.0.0.1", port, "api", "/items"))
            .await
            .unwrap();

        assert_eq!(probe.status(), 201);
        assert!(probe.redirected());
        assert!(probe.redirected_to("/items/7"));
    }

    #[tokio::test]
    async fn slow_server_reports_status_zero() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let probe = HttpProbe::fetch(
            HttpTarget::new("127.0.0.1", port, "hostheader", "/")
                .with_timeout(Duration::from_millis(100)),
        )
        .await
        .unwrap();

        assert!(probe.timed_out());
        assert_eq!(probe.status(), 0);
        assert_eq!(probe.body(), "");
        assert!(probe.headers().is_empty());
        assert!(probe.json().is_empty());
        assert!(!probe.redirected());
    }

    #[tokio::test]
    async fn refused_connection_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = HttpProbe::fetch(HttpTarget::new("127.0.0.1", port, "hostheader", "/")).await;
        assert!(matches!(result, Err(ProbeError::Http(_))));
    }

    #[tokio::test]
    async fn https_with_bypass_accepts_self_signed_certificate() {
        let port = serve_tls_once(response("200 OK", &[("server", "tls")], "secure")).await;

        let probe = HttpProbe::fetch(
            HttpTarget::new("127.0.0.1", port, "www.example.com", "/")
                .with_scheme(Scheme::Https)
                .bypass_ssl_verify(true),
        )
        .await
        .unwrap();

        assert_eq!(probe.outcome().url, format!("https://127.0.0.1:{port}/"));
        assert_eq!(probe.status(), 200);
        assert_eq!(probe.body(), "secure");
        assert_eq!(probe.headers()["server"], "tls");
    }

    #[tokio::test]
    async fn https_without_bypass_rejects_self_signed_certificate() {
        let port = serve_tls_once(response("200 OK", &[], "secure")).await;

        let result = HttpProbe::fetch(
            HttpTarget::new("127.0.0.1", port, "www.example.com", "/").with_scheme(Scheme::Https),
        )
        .await;

        assert!(matches!(result, Err(ProbeError::Http(_))));
    }

    #[tokio::test]
    async fn invalid_host_header_is_rejected() {
        let result = HttpProbe::fetch(HttpTarget::new("127.0.0.1", 1, "bad\nheader", "/")).await;
        assert!(matches!(result, Err(ProbeError::InvalidHeader(_))));
    }
}
