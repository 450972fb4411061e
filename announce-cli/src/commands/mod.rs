//! Operator commands
//!
//! Each command writes its operator-facing output through a [`Console`] and
//! returns an [`Outcome`]; `main` turns the outcome into the exit status.
//!
//! [`Console`]: crate::Console

use std::process::ExitCode;

pub mod audiences;
pub mod feed;
pub mod post;
pub mod profiles;

pub use audiences::{generate_audiences, list_audiences};
pub use feed::feed;
pub use post::{post, PostArgs};
pub use profiles::{generate_profiles, show_profile};

/// How a command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Work was done (possibly none was needed)
    Completed,
    /// Operator declined the confirmation; nothing written
    Cancelled,
    /// Nothing to act on; nothing written
    NothingToDo,
    /// Prerequisite data or input was missing; nothing written
    Failed,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Failed => ExitCode::FAILURE,
            _ => ExitCode::SUCCESS,
        }
    }
}
