//! Terrain generation errors.

/// Rejected generation parameters.
#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    /// A parameter is outside its valid range.
    #[error("invalid terrain parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Constraint that was violated.
        reason: String,
    },
}

impl TerrainError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
