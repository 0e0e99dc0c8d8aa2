//! Result type alias for Tally operations

use crate::domain::errors::TallyError;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, TallyError>;
