//! Python virtualenv checks, expressed over a [`runner::CommandRunner`].

pub mod check;
pub mod runner;

pub use check::Virtualenv;
pub use runner::{CommandResult, CommandRunner, LocalRunner, Who};
