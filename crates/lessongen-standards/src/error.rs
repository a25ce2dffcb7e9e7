//! Error types for the standards subsystem

/// Standards subsystem errors
#[derive(Debug, thiserror::Error)]
pub enum StandardsError {
    /// Crosswalk source could not deliver the raw table
    #[error("crosswalk source unavailable: {0}")]
    SourceUnavailable(String),

    /// Raw table text could not be parsed into any rows
    #[error("crosswalk table malformed: {0}")]
    MalformedTable(String),

    /// Judgment service call failed (network, timeout, malformed reply)
    #[error("judge call failed: {0}")]
    JudgeFailed(String),
}

impl StandardsError {
    /// Whether the error is a transport-level failure rather than bad data
    #[inline]
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::SourceUnavailable(_) | Self::JudgeFailed(_))
    }
}
