//! Field model types
//!
//! Defines the fundamental types for the pipeline:
//! - Field identifiers and audiences
//! - Field definitions and their generation configuration
//! - Field values as a tagged union, one variant per field kind

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of question slots in a question-set field.
///
/// A question-set value always has exactly this many slots, blank or
/// filled, never fewer.
pub const QUESTION_SLOTS: usize = 5;

/// Unique field identifier (operator-assigned slug)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldId(pub String);

impl FieldId {
    /// Create field ID from a slug
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Slug as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FieldId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Which editing audience a field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    /// Template designers (generated first in a batch)
    Designer,
    /// Lesson builders (generated second)
    Builder,
}

/// Field content kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Single-line plain text
    PlainText,
    /// Rich text (markup allowed)
    RichText,
    /// Single selection from fixed options
    Dropdown,
    /// Multiple selections
    Checklist,
    /// Generated or uploaded image
    Image,
    /// Five-slot multiple-choice question set
    QuestionSet,
    /// Standards-assignment field
    StandardsAssignment,
}

/// Per-slot generation configuration for a question-set field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionPrompt {
    /// Slot-specific generation instructions
    pub prompt: String,
    /// Append grade-level vocabulary standards guidance to the prompt
    pub include_vocabulary_standards: bool,
    /// Append grade-level main-idea standards guidance to the prompt
    pub include_main_idea_standards: bool,
}

impl QuestionPrompt {
    /// Create prompt config with instructions only
    #[inline]
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Enable vocabulary standards guidance
    #[inline]
    #[must_use]
    pub fn with_vocabulary_standards(mut self) -> Self {
        self.include_vocabulary_standards = true;
        self
    }

    /// Enable main-idea standards guidance
    #[inline]
    #[must_use]
    pub fn with_main_idea_standards(mut self) -> Self {
        self.include_main_idea_standards = true;
        self
    }
}

/// A named, typed slot in a lesson template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Identifier (unique within a template)
    pub id: FieldId,
    /// Display name
    pub name: String,
    /// Content kind
    pub kind: FieldKind,
    /// Editing audience
    pub audience: Audience,
    /// Whether AI generation is enabled for this field
    pub generation_enabled: bool,
    /// Whether a value is required before publishing
    pub required: bool,
    /// Ordered context-field dependencies injected into the prompt
    pub context_field_ids: Vec<FieldId>,
    /// Generation instructions for the field as a whole
    pub instructions: String,
    /// Per-slot prompts (question-set fields only)
    pub question_prompts: Option<[QuestionPrompt; QUESTION_SLOTS]>,
}

impl Field {
    /// Create a new field definition
    #[must_use]
    pub fn new(
        id: impl Into<FieldId>,
        name: impl Into<String>,
        kind: FieldKind,
        audience: Audience,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            audience,
            generation_enabled: false,
            required: false,
            context_field_ids: Vec::new(),
            instructions: String::new(),
            question_prompts: None,
        }
    }

    /// Enable AI generation
    #[inline]
    #[must_use]
    pub fn generatable(mut self) -> Self {
        self.generation_enabled = true;
        self
    }

    /// Mark as required
    #[inline]
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// With context-field dependencies
    #[inline]
    #[must_use]
    pub fn with_context(mut self, ids: impl IntoIterator<Item = FieldId>) -> Self {
        self.context_field_ids = ids.into_iter().collect();
        self
    }

    /// With generation instructions
    #[inline]
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// With per-slot question prompts
    #[inline]
    #[must_use]
    pub fn with_question_prompts(mut self, prompts: [QuestionPrompt; QUESTION_SLOTS]) -> Self {
        self.question_prompts = Some(prompts);
        self
    }
}

impl From<String> for FieldId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A standard code with its textual statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardDescriptor {
    /// Framework-specific code string
    pub code: String,
    /// Human-readable statement
    pub statement: String,
}

impl StandardDescriptor {
    /// Create descriptor
    #[inline]
    #[must_use]
    pub fn new(code: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            statement: statement.into(),
        }
    }
}

/// Stored value of a generated image field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageValue {
    /// Public URL of the uploaded asset
    pub url: String,
    /// Alt text for accessibility
    pub alt_text: String,
    /// Model that produced the image
    pub model_used: String,
    /// Model that produced the alt text
    pub alt_text_model_used: String,
    /// Operator-supplied description, if any
    pub description: String,
}

/// Stored value of a question-set field
///
/// Invariant: always exactly [`QUESTION_SLOTS`] question slots, blank or
/// filled. The maps are keyed by slot index and may be sparse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionSetValue {
    /// Question text per slot (blank string when not yet generated)
    pub questions: [String; QUESTION_SLOTS],
    /// Source standard per slot
    pub sources: BTreeMap<usize, StandardDescriptor>,
    /// Candidate codes dropped by alignment filtering, per slot
    pub filtered_out: BTreeMap<usize, Vec<String>>,
}

/// Current content of a field
///
/// Tagged union keyed by field kind; consumers switch exhaustively over
/// the variants rather than duck-typing on shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// No value yet
    Empty,
    /// Plain or rich text
    Text(String),
    /// Checklist selections
    Items(Vec<String>),
    /// Generated image asset
    Image(ImageValue),
    /// Five-slot question set
    Questions(QuestionSetValue),
    /// Free-form keyed record
    Record(IndexMap<String, String>),
}

impl FieldValue {
    /// Text content, if this is a text value
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Question-set content, if this is a question-set value
    #[inline]
    #[must_use]
    pub fn as_questions(&self) -> Option<&QuestionSetValue> {
        match self {
            Self::Questions(q) => Some(q),
            _ => None,
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        Self::Empty
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_builder() {
        let field = Field::new("passage", "Passage", FieldKind::RichText, Audience::Designer)
            .generatable()
            .required()
            .with_context([FieldId::new("grade_band")]);

        assert_eq!(field.id.as_str(), "passage");
        assert!(field.generation_enabled);
        assert!(field.required);
        assert_eq!(field.context_field_ids.len(), 1);
    }

    #[test]
    fn question_set_has_five_slots() {
        let value = QuestionSetValue::default();
        assert_eq!(value.questions.len(), QUESTION_SLOTS);
        assert!(value.sources.is_empty());
    }

    #[test]
    fn field_value_serde_round_trip() {
        let value = FieldValue::Items(vec!["a".to_string(), "b".to_string()]);
        let json = serde_json::to_string(&value).unwrap();
        let back: FieldValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn question_prompt_builder() {
        let prompt = QuestionPrompt::new("Ask about the main idea").with_main_idea_standards();
        assert!(prompt.include_main_idea_standards);
        assert!(!prompt.include_vocabulary_standards);
    }
}
