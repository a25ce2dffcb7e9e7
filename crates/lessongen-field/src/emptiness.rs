//! Canonical emptiness predicate and missing-field reporting
//!
//! "Empty" is the single definition of "this field has no usable value"
//! shared by generation gating, context validation, and required-field
//! checks. Total over every [`FieldValue`] shape; never panics.

use crate::types::{Audience, Field, FieldId, FieldValue};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Strip markup tags and non-breaking-space entities from text.
///
/// Entity-encoded tag mentions (`&lt;p&gt;`) are not tags and survive
/// untouched.
#[must_use]
pub fn strip_markup(text: &str) -> String {
    MARKUP_TAG.replace_all(text, "").replace("&nbsp;", "")
}

fn text_is_blank(text: &str) -> bool {
    strip_markup(text).trim().is_empty()
}

/// Whether a field value carries no usable content.
///
/// - Text: blank once markup and `&nbsp;` entities are stripped
/// - Items / records: empty iff zero entries
/// - Question sets: empty iff every slot is blank by the text rule
/// - Images: empty iff no asset URL has been stored
#[must_use]
pub fn is_empty(value: &FieldValue) -> bool {
    match value {
        FieldValue::Empty => true,
        FieldValue::Text(s) => text_is_blank(s),
        FieldValue::Items(items) => items.is_empty(),
        FieldValue::Image(image) => image.url.is_empty(),
        FieldValue::Questions(set) => set.questions.iter().all(|q| text_is_blank(q)),
        FieldValue::Record(map) => map.is_empty(),
    }
}

/// A field reported as missing to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField {
    /// Field identifier
    pub id: FieldId,
    /// Display name
    pub name: String,
    /// Editing audience
    pub audience: Audience,
}

impl MissingField {
    fn of(field: &Field) -> Self {
        Self {
            id: field.id.clone(),
            name: field.name.clone(),
            audience: field.audience,
        }
    }
}

/// Context dependencies of `field` that currently have no value.
///
/// A context id with no matching definition in `all_fields` is skipped
/// silently; dangling references are an authoring artifact, not an error.
#[must_use]
pub fn missing_context_fields(
    field: &Field,
    all_fields: &[Field],
    values: &HashMap<FieldId, FieldValue>,
) -> Vec<MissingField> {
    field
        .context_field_ids
        .iter()
        .filter_map(|id| all_fields.iter().find(|f| &f.id == id))
        .filter(|f| values.get(&f.id).map_or(true, is_empty))
        .map(MissingField::of)
        .collect()
}

/// Required fields that currently have no value.
#[must_use]
pub fn missing_required_fields(
    all_fields: &[Field],
    values: &HashMap<FieldId, FieldValue>,
) -> Vec<MissingField> {
    all_fields
        .iter()
        .filter(|f| f.required)
        .filter(|f| values.get(&f.id).map_or(true, is_empty))
        .map(MissingField::of)
        .collect()
}
