//! Error types for the generation pipeline
//!
//! The taxonomy mirrors how failures are surfaced to operators:
//! - Missing dependencies pause the batch with a list, never an error
//! - Malformed structured responses are fatal to the field and batch
//! - Transport/storage failures pause the batch at the current field
//! - Alignment-judge failures are absorbed upstream (fail-open)

use crate::batch::BatchState;
use lessongen_standards::StandardsError;

/// Collaborator service errors (AI completion, image, caption, storage,
/// persistence)
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    /// Network/timeout-level failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// Response arrived but could not be interpreted
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Requested entity does not exist
    #[error("not found: {0}")]
    NotFound(String),
}

/// Generation pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Structured question response missing required parts; nothing is
    /// stored and the batch pauses
    #[error("question {slot} of field '{field}' is malformed: missing {missing:?}")]
    MalformedQuestion {
        /// Field display name
        field: String,
        /// Zero-based slot index
        slot: usize,
        /// Missing part names
        missing: Vec<&'static str>,
    },

    /// Question-set field without per-slot prompt configuration
    #[error("field '{field}' has no question prompts configured")]
    MissingQuestionPrompts {
        /// Field display name
        field: String,
    },

    /// Collaborator call failed while generating a field
    #[error("service call failed for field '{field}': {source}")]
    Service {
        /// Field display name
        field: String,
        /// Underlying failure
        #[source]
        source: ServiceError,
    },

    /// Crosswalk lookup failed while generating a field
    #[error("standards lookup failed for field '{field}': {source}")]
    Standards {
        /// Field display name
        field: String,
        /// Underlying failure
        #[source]
        source: StandardsError,
    },

    /// Autosave snapshot could not be persisted
    #[error("autosave failed: {0}")]
    Autosave(#[source] ServiceError),

    /// Field definitions could not be loaded
    #[error("field load failed: {0}")]
    FieldLoad(#[source] ServiceError),

    /// Batch is in a state that cannot be (re)run
    #[error("batch is not runnable in state {0:?}")]
    NotRunnable(BatchState),
}

impl GenerationError {
    /// Whether the batch can be resumed after this error.
    ///
    /// Malformed questions require operator intervention (prompt or model
    /// changes); transport-level failures are retryable as-is.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Service { .. } | Self::Standards { .. } | Self::Autosave(_) | Self::FieldLoad(_)
        )
    }
}
