//! Error types for cftree-core.
//!
//! Only user-supplied parameters and configuration are validated through
//! [`ClusterError`]. Broken tree invariants and vectors whose dimensionality
//! does not match the tree are caller bugs and panic instead.

use thiserror::Error;

/// Errors raised while validating CF-tree parameters or configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClusterError {
    /// A parameter is outside its valid range.
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// Description of the offending value.
        message: String,
    },

    /// Vector dimension does not match the expected size.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension received.
        actual: usize,
    },

    /// Configuration could not be read, parsed or serialized.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the failure.
        message: String,
    },
}

impl ClusterError {
    /// Create an [`ClusterError::InvalidParameter`] error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Create a [`ClusterError::DimensionMismatch`] error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create a [`ClusterError::Config`] error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Result alias for cftree-core operations.
pub type ClusterResult<T> = Result<T, ClusterError>;
