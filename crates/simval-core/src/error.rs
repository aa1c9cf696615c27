//! Error types for pipeline components.

use thiserror::Error;

/// Usage and lifecycle violations.
///
/// These are programming errors: calling `start` twice, configuring a value
/// after it started, or restarting a stopped clock. Every offending call is
/// rejected with one of these variants and nothing about the component changes.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Clock interval of zero.
    #[error("Clock interval must be greater than zero")]
    ZeroInterval,

    /// `start` called on a component that is already running.
    #[error("The {component} is already running")]
    AlreadyRunning { component: &'static str },

    /// Configuration call after activation.
    #[error("The {component} configuration is frozen once started")]
    ConfigurationFrozen { component: &'static str },

    /// Operation on a component that was stopped for good.
    #[error("The {component} has been stopped and cannot be restarted")]
    Stopped { component: &'static str },

    /// No tokio runtime is available to spawn the background task.
    #[error("No tokio runtime available to spawn the {component} task")]
    NoRuntime { component: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Log a usage violation before handing it back to the caller.
pub(crate) fn usage_error(err: Error) -> Error {
    tracing::error!("Usage error: {err}");
    err
}

/// Failure raised by a single transform step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// The transform refused the input.
    #[error("Rejected input: {0}")]
    Rejected(String),

    /// The transform panicked while computing its output.
    #[error("Panicked: {0}")]
    Panicked(String),
}

impl TransformError {
    /// Create a rejection with the given reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        TransformError::Rejected(reason.into())
    }
}

/// Extract a printable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
