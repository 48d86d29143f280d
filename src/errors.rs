use std::result::Result as StdResult;

use thiserror::Error;

/// Error type for misuse of the wizard engine and its supporting layers.
///
/// Validation failures are not errors; they are reported through
/// [`crate::wizard::ValidationResult`].
#[derive(Debug, Error)]
pub enum WizardError {
    #[error("Unknown field: {0}")]
    UnknownField(String),
    #[error("Field `{0}` cannot be edited")]
    ReadOnlyField(String),
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("Wizard `{0}` has no steps")]
    EmptyDefinition(String),
    #[error("Step {step} has no password suggestion slot")]
    NoSuggestionSlot { step: usize },
    #[error("Step {step} has nothing to verify")]
    NoVerification { step: usize },
    #[error("Submission in progress")]
    SubmissionPending,
    #[error("Wizard is no longer active")]
    Inactive,
    #[error("Unknown flow: {0}")]
    UnknownFlow(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = StdResult<T, WizardError>;

/// User-facing CLI error wrapper.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Command failed: {0}")]
    Command(String),
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Command(err.to_string())
    }
}

impl From<rustyline::error::ReadlineError> for CliError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        CliError::Input(err.to_string())
    }
}
