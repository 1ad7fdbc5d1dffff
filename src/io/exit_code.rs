//! Exit codes for CLI operations following Unix conventions.
//!
//! # Exit Code Semantics
//!
//! - `0`: Success
//! - `1`: Not found or usage error (missing document, empty or missing corpus, blank query)
//! - `2`: Runtime failure (encoder, cache, I/O)

use crate::error::SearchError;

/// Standard exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Operation succeeded (code 0)
    Success = 0,

    /// Requested entity missing or invalid input (code 1)
    NotFound = 1,

    /// Operation failed at runtime (code 2)
    Failure = 2,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl ExitCode {
    /// Determine exit code for a lookup based on result presence.
    pub fn from_lookup<T>(result: &Option<T>) -> Self {
        match result {
            Some(_) => ExitCode::Success,
            None => ExitCode::NotFound,
        }
    }

    /// Convert a `SearchError` to the appropriate exit code.
    pub fn from_error(error: &SearchError) -> Self {
        match error {
            SearchError::EmptyCorpus
            | SearchError::CorpusNotFound { .. }
            | SearchError::IndexNotBuilt => ExitCode::NotFound,
            SearchError::DimensionMismatch { .. }
            | SearchError::EncoderFailure(_)
            | SearchError::CacheUnavailable(_)
            | SearchError::Io { .. }
            | SearchError::Vector(_) => ExitCode::Failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success as u8, 0);
        assert_eq!(ExitCode::NotFound as u8, 1);
        assert_eq!(ExitCode::Failure as u8, 2);
        assert_eq!(i32::from(ExitCode::Failure), 2);
    }

    #[test]
    fn test_from_lookup() {
        assert_eq!(ExitCode::from_lookup(&Some("text")), ExitCode::Success);
        assert_eq!(ExitCode::from_lookup::<&str>(&None), ExitCode::NotFound);
    }

    #[test]
    fn test_from_error() {
        assert_eq!(ExitCode::from_error(&SearchError::EmptyCorpus), ExitCode::NotFound);
        assert_eq!(
            ExitCode::from_error(&SearchError::EncoderFailure("x".into())),
            ExitCode::Failure
        );
        assert_eq!(
            ExitCode::from_error(&SearchError::CorpusNotFound {
                path: "missing".into()
            }),
            ExitCode::NotFound
        );
    }
}
