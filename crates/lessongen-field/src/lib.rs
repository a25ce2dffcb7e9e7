//! Lessongen Field - lesson field model and validation
//!
//! Defines the typed field/value model shared by the whole pipeline:
//! - Field definitions (audience, kind, generation config)
//! - Field values as a tagged union (one variant per field kind)
//! - The canonical emptiness predicate used for generation gating
//! - Missing context / required field reporting

#![warn(unreachable_pub)]

pub mod emptiness;
pub mod types;

// Re-exports for convenience
pub use emptiness::{
    is_empty, missing_context_fields, missing_required_fields, strip_markup, MissingField,
};
pub use types::{
    Audience, Field, FieldId, FieldKind, FieldValue, ImageValue, QuestionPrompt, QuestionSetValue,
    StandardDescriptor, QUESTION_SLOTS,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
