//! CLI-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
}

impl From<InfraError> for CliError {
    fn from(e: InfraError) -> Self {
        CliError::Application(ApplicationError::Infra(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        CliError::Application(ApplicationError::Domain(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        use crate::exitcode;

        match self {
            CliError::InvalidArgs(_) => exitcode::USAGE,
            CliError::Application(e) => match e {
                ApplicationError::Domain(d) => match d {
                    DomainError::FileNotFound(_) => exitcode::NOINPUT,
                    DomainError::Read { .. } => exitcode::IOERR,
                    _ => exitcode::DATAERR,
                },
                ApplicationError::Infra(i) => match i {
                    InfraError::Io { .. } => exitcode::IOERR,
                    InfraError::LockTimeout { .. } => exitcode::TEMPFAIL,
                    _ => exitcode::SOFTWARE,
                },
                ApplicationError::NotFound(_) => exitcode::NOINPUT,
                ApplicationError::AlreadyExists(_) | ApplicationError::InvalidMove { .. } => {
                    exitcode::DATAERR
                }
                ApplicationError::Consistency(_) | ApplicationError::CorruptData { .. } => {
                    exitcode::DATAERR
                }
                ApplicationError::EmptyTree => exitcode::NOINPUT,
                ApplicationError::Config { .. } => exitcode::CONFIG,
            },
        }
    }
}
