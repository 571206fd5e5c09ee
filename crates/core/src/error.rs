//! Error types for the panel cutting engine.

use thiserror::Error;

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the data model, the packers and the validator.
///
/// Infeasibility (a part that fits nowhere, a sheet cap reached) and solver
/// timeouts are not errors; they surface as unplaced instances on the solution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Solver or job configuration is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Part request with a non-positive dimension or quantity.
    #[error("invalid part: {0}")]
    InvalidPart(String),

    /// Board whose trim leaves no usable area.
    #[error("invalid board: {0}")]
    InvalidBoard(String),

    /// Cut segment with zero length.
    #[error("invalid cut: {0}")]
    InvalidCut(String),

    /// Placement outside the usable rectangle.
    #[error("placement out of bounds: {0}")]
    OutOfBounds(String),

    /// Geometric invariant broken by a packer or reconstructor.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A total was requested before metrics were computed on every sheet.
    #[error("metrics missing on sheet {0}")]
    MissingMetrics(usize),

    /// Unexpected internal failure (lock poisoning, backend failure).
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true for errors caused by user supplied input.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig(_) | Self::InvalidPart(_) | Self::InvalidBoard(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidPart("width must be > 0".into());
        assert_eq!(err.to_string(), "invalid part: width must be > 0");
        assert_eq!(Error::MissingMetrics(2).to_string(), "metrics missing on sheet 2");
    }

    #[test]
    fn test_is_configuration() {
        assert!(Error::InvalidBoard("x".into()).is_configuration());
        assert!(!Error::InvalidCut("x".into()).is_configuration());
    }
}
