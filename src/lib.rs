//! Service health probes for infrastructure tests.
//!
//! Each probe makes exactly one attempt against a host and exposes what it
//! saw through read-only accessors:
//!
//! - [`irc_probe::probe::BitlbeeProbe`] logs in to a Bitlbee gateway and asks for its version.
//! - [`http_probe::probe::HttpProbe`] issues one GET with a custom `Host` header.
//! - [`virtualenv::Virtualenv`] inspects a Python virtualenv through a command runner.

pub mod checks;
pub mod config;
pub mod error;
pub mod http_probe;
pub mod irc_probe;
pub mod probe;
pub mod virtualenv;

pub use error::{ProbeError, Result};
