//! Prompt assembly
//!
//! Turns a structured configuration into a single text prompt. Section
//! layout is part of the contract the orchestrator relies on: FORMAT
//! REQUIREMENTS is always emitted (with a default sentence when empty);
//! CONTEXT is emitted only when at least one context field or extra
//! block contributes content. Markup in instruction text is converted to
//! plain text; entity-encoded tag mentions in user-authored content
//! survive verbatim.

use lessongen_field::{strip_markup, Field, FieldId, FieldValue};
use std::collections::HashMap;

/// Emitted when no format requirements are configured
pub const DEFAULT_FORMAT_REQUIREMENTS: &str =
    "Return plain text only, with no surrounding commentary.";

/// Structured prompt configuration
#[derive(Debug, Clone, Default)]
pub struct PromptConfig {
    /// System-level instructions
    pub system_instructions: String,
    /// Task instructions for the field being generated
    pub task_instructions: String,
    /// Output format requirements
    pub format_requirements: String,
    /// Instructions on how to use the context section
    pub context_instructions: String,
    /// Context fields whose current values are injected
    pub context_field_ids: Vec<FieldId>,
    /// Extra named context blocks
    pub extra_context: Vec<(String, String)>,
}

impl PromptConfig {
    /// Create empty config
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With system instructions
    #[inline]
    #[must_use]
    pub fn with_system(mut self, text: impl Into<String>) -> Self {
        self.system_instructions = text.into();
        self
    }

    /// With task instructions
    #[inline]
    #[must_use]
    pub fn with_task(mut self, text: impl Into<String>) -> Self {
        self.task_instructions = text.into();
        self
    }

    /// With format requirements
    #[inline]
    #[must_use]
    pub fn with_format(mut self, text: impl Into<String>) -> Self {
        self.format_requirements = text.into();
        self
    }

    /// With context instructions
    #[inline]
    #[must_use]
    pub fn with_context_instructions(mut self, text: impl Into<String>) -> Self {
        self.context_instructions = text.into();
        self
    }

    /// With context field ids
    #[inline]
    #[must_use]
    pub fn with_context_fields(mut self, ids: impl IntoIterator<Item = FieldId>) -> Self {
        self.context_field_ids = ids.into_iter().collect();
        self
    }

    /// Add a named context block
    #[inline]
    #[must_use]
    pub fn with_extra_context(
        mut self,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        self.extra_context.push((name.into(), content.into()));
        self
    }

    /// Assemble the final prompt text
    #[must_use]
    pub fn assemble(
        &self,
        all_fields: &[Field],
        values: &HashMap<FieldId, FieldValue>,
    ) -> String {
        let mut sections = Vec::new();

        let system = strip_markup(&self.system_instructions);
        if !system.trim().is_empty() {
            sections.push(format!("SYSTEM:\n{}", system.trim()));
        }

        let task = strip_markup(&self.task_instructions);
        if !task.trim().is_empty() {
            sections.push(format!("TASK:\n{}", task.trim()));
        }

        let format = strip_markup(&self.format_requirements);
        let format = format.trim();
        sections.push(format!(
            "FORMAT REQUIREMENTS:\n{}",
            if format.is_empty() {
                DEFAULT_FORMAT_REQUIREMENTS
            } else {
                format
            }
        ));

        let context = self.context_section(all_fields, values);
        if let Some(context) = context {
            sections.push(context);
        }

        sections.join("\n\n")
    }

    fn context_section(
        &self,
        all_fields: &[Field],
        values: &HashMap<FieldId, FieldValue>,
    ) -> Option<String> {
        let mut blocks = Vec::new();

        for id in &self.context_field_ids {
            // Dangling ids and empty values contribute nothing
            let Some(field) = all_fields.iter().find(|f| &f.id == id) else {
                continue;
            };
            let Some(value) = values.get(id) else {
                continue;
            };
            let text = value_text(value);
            if text.trim().is_empty() {
                continue;
            }
            blocks.push(format!("{}:\n{}", field.name, strip_markup(&text)));
        }

        for (name, content) in &self.extra_context {
            if content.trim().is_empty() {
                continue;
            }
            blocks.push(format!("{}:\n{}", name, strip_markup(content)));
        }

        if blocks.is_empty() {
            return None;
        }

        let instructions = strip_markup(&self.context_instructions);
        let mut section = String::from("CONTEXT:");
        if !instructions.trim().is_empty() {
            section.push('\n');
            section.push_str(instructions.trim());
        }
        for block in blocks {
            section.push_str("\n\n");
            section.push_str(&block);
        }
        Some(section)
    }
}

/// Render a field value as plain text for prompt injection
#[must_use]
pub fn value_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Empty => String::new(),
        FieldValue::Text(s) => s.clone(),
        FieldValue::Items(items) => items.join(", "),
        FieldValue::Image(image) => image.alt_text.clone(),
        FieldValue::Questions(set) => set
            .questions
            .iter()
            .filter(|q| !q.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n"),
        FieldValue::Record(map) => map
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Truncate to at most `max` characters on a char boundary
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
