//! Alert Error Types

use thiserror::Error;

/// Errors while turning a push payload into an [`Alert`](crate::Alert)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlertError {
    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Field present but empty
    #[error("Field {0} must not be empty")]
    EmptyField(&'static str),
}
