//! Top-level error type and process exit codes.

use thiserror::Error;

use crate::puller::PullError;
use crate::time::TimeParseError;
use crate::xray::XRayError;

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    /// Bad command-line input, such as an unparsable time.
    UsageError = 2,
    /// AWS X-Ray rejected or failed a request.
    ServiceError = 3,
    /// Writing results failed.
    OutputError = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as u8 as i32
    }
}

#[derive(Error, Debug)]
pub enum TracesError {
    #[error(transparent)]
    Time(#[from] TimeParseError),

    #[error(transparent)]
    XRay(#[from] XRayError),

    #[error(transparent)]
    Pull(#[from] PullError),
}

impl TracesError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            TracesError::Time(_) => ExitCode::UsageError,
            TracesError::XRay(_) | TracesError::Pull(PullError::XRay(_)) => ExitCode::ServiceError,
            TracesError::Pull(PullError::Output(_)) => ExitCode::OutputError,
            TracesError::Pull(PullError::Task(_)) => ExitCode::GeneralError,
        }
    }
}

pub type TracesResult<T> = Result<T, TracesError>;
