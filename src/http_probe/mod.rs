pub mod probe;
pub mod result;

use std::fmt::Write;

pub mod prelude {
    pub use super::probe::{HttpProbe, HttpTarget, USER_AGENT};
    pub use super::result::HttpOutcome;
}

/// Render an error followed by its chain of causes.
pub fn report(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let _ = write!(s, "\n\nCaused by: {}", src);
        err = src;
    }
    s
}
