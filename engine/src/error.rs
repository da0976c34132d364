//! Error types for the certsync engine.
//!
//! Cloud-facing failures are distinct named variants so callers can treat
//! "not found", "offline" and "unauthorized" as different outcomes rather
//! than a uniform null.

use crate::ReportId;
use thiserror::Error;

/// All possible errors from the certsync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Cloud sync errors
    #[error("report not found: {0}")]
    ReportNotFound(ReportId),

    #[error("not authenticated")]
    Unauthorized,

    #[error("offline")]
    Offline,

    #[error("network error: {0}")]
    Network(String),

    // Certificate number errors
    #[error("certificate number generation failed: {0}")]
    NumberGeneration(String),

    // Local state errors
    #[error("invalid draft data: {0}")]
    InvalidDraft(String),

    #[error("invalid form payload: {0}")]
    InvalidPayload(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::ReportNotFound("report-1".into());
        assert_eq!(err.to_string(), "report not found: report-1");

        let err = Error::Network("connection refused".into());
        assert_eq!(err.to_string(), "network error: connection refused");

        let err = Error::NumberGeneration("sequence unavailable".into());
        assert_eq!(
            err.to_string(),
            "certificate number generation failed: sequence unavailable"
        );
    }
}
