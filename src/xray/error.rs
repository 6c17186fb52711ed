//! Error types for X-Ray API calls.

use aws_sdk_xray::error::{DisplayErrorContext, ProvideErrorMetadata};
use thiserror::Error;

/// Error codes X-Ray uses when a caller exceeds its request rate.
const THROTTLING_CODES: &[&str] = &["ThrottlingException", "ThrottledException"];

/// Errors from X-Ray operations.
#[derive(Error, Debug)]
pub enum XRayError {
    #[error("Throttled by AWS X-Ray during {operation}")]
    Throttled { operation: &'static str },

    #[error("AWS X-Ray {operation} failed: {message}")]
    Service {
        operation: &'static str,
        message: String,
    },

    #[error("Invalid AWS client configuration: {0}")]
    Config(String),
}

impl XRayError {
    pub fn is_throttled(&self) -> bool {
        matches!(self, XRayError::Throttled { .. })
    }

    /// Sort an SDK error into throttling versus everything else.
    pub fn classify<E>(operation: &'static str, err: E) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
    {
        match err.code() {
            Some(code) if THROTTLING_CODES.contains(&code) => XRayError::Throttled { operation },
            _ => XRayError::Service {
                operation,
                message: DisplayErrorContext(&err).to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_xray::error::ErrorMetadata;

    #[test]
    fn test_throttling_code_is_classified() {
        let meta = ErrorMetadata::builder()
            .code("ThrottlingException")
            .message("Rate exceeded")
            .build();
        let err = XRayError::classify("BatchGetTraces", meta);
        assert!(err.is_throttled());
        assert_eq!(err.to_string(), "Throttled by AWS X-Ray during BatchGetTraces");
    }

    #[test]
    fn test_other_codes_are_service_errors() {
        let meta = ErrorMetadata::builder()
            .code("InvalidRequestException")
            .message("bad trace id")
            .build();
        let err = XRayError::classify("BatchGetTraces", meta);
        assert!(!err.is_throttled());
        match err {
            XRayError::Service { operation, message } => {
                assert_eq!(operation, "BatchGetTraces");
                assert!(message.contains("bad trace id"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
