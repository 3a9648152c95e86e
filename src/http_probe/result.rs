use std::collections::HashMap;

use serde_json::{Map, Value};

/// Everything recorded by one HTTP GET probe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpOutcome {
    pub url: String,
    pub timed_out: bool,
    /// `None` until a response arrives.
    pub http_status: Option<u16>,
    pub body: String,
    /// Header names as the HTTP stack yields them (lowercase). Repeated
    /// headers are joined with `", "`.
    pub headers: HashMap<String, String>,
    /// Populated only when the body is a JSON object.
    pub json: Map<String, Value>,
    /// Value of the `location` header, whatever the status code.
    pub redirect_location: Option<String>,
    pub http_time: f64,
}
