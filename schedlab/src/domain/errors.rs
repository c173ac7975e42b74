//! Structured error types for schedlab
//!
//! Using thiserror for automatic Display implementation. Setup failures keep
//! their own variants because each one maps to a distinct process exit code.

use thiserror::Error;

/// A failure while bringing the probe pipeline up
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("failed to load scheduler probes: {0}")]
    Load(String),

    #[error("failed to write probe configuration: {0}")]
    Config(String),

    #[error("failed to attach tracepoint sched/{tracepoint}: {error}")]
    Attach { tracepoint: String, error: String },

    #[error("failed to set up the event ring: {0}")]
    Ring(String),
}

impl SetupError {
    /// Process exit code for this failure
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            SetupError::Load(_) => 2,
            SetupError::Config(_) => 3,
            SetupError::Attach { .. } => 4,
            SetupError::Ring(_) => 5,
        }
    }
}

/// Any failure after setup succeeded
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunError {
    /// Process exit code for this failure
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Setup(e) => e.exit_code(),
            RunError::Io(_) => 1,
        }
    }
}
