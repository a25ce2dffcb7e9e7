//! Generation batch state
//!
//! One batch is one run of the orchestrator across the generation-enabled
//! fields of a lesson: designer-audience fields first, then builder
//! fields, each group in field-definition order. The batch owns the
//! field-value map and the current index for its whole lifetime; nothing
//! else mutates them. Cancellation is cooperative, checked only between
//! steps.

use chrono::{DateTime, Utc};
use lessongen_field::{Audience, Field, FieldId, FieldValue, MissingField};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Batch lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// Created, nothing generated yet
    Idle,
    /// Look-ahead context validation in progress
    Validating,
    /// Stepping through fields
    Running,
    /// Recoverable stop; index retained for resume
    Paused,
    /// Operator cancelled between steps
    Cancelled,
    /// Every field generated; batch may be discarded
    Completed,
}

/// Cooperative cancellation flag, checked at step boundaries only
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; takes effect before the next step
    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Ephemeral run state of one generation batch
#[derive(Debug)]
pub struct GenerationBatch {
    id: Uuid,
    lesson_id: String,
    fields: Vec<Field>,
    order: Vec<FieldId>,
    values: HashMap<FieldId, FieldValue>,
    index: usize,
    state: BatchState,
    missing: Vec<MissingField>,
    last_error: Option<String>,
    last_saved_at: Option<DateTime<Utc>>,
    cancel: CancelFlag,
}

impl GenerationBatch {
    /// Create a batch over a lesson's fields and current values.
    ///
    /// The generation order is fixed at creation: designer fields first,
    /// then builder fields, each group preserving definition order.
    #[must_use]
    pub fn new(
        lesson_id: impl Into<String>,
        fields: Vec<Field>,
        values: HashMap<FieldId, FieldValue>,
    ) -> Self {
        let order = ordered_generatable(&fields);
        Self {
            id: Uuid::new_v4(),
            lesson_id: lesson_id.into(),
            fields,
            order,
            values,
            index: 0,
            state: BatchState::Idle,
            missing: Vec::new(),
            last_error: None,
            last_saved_at: None,
            cancel: CancelFlag::new(),
        }
    }

    /// Batch identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Lesson this batch generates into
    #[inline]
    #[must_use]
    pub fn lesson_id(&self) -> &str {
        &self.lesson_id
    }

    /// All field definitions
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Ordered ids of the fields this batch generates
    #[inline]
    #[must_use]
    pub fn order(&self) -> &[FieldId] {
        &self.order
    }

    /// Field ids not yet generated
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> &[FieldId] {
        &self.order[self.index.min(self.order.len())..]
    }

    /// Current step index
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Current lifecycle state
    #[inline]
    #[must_use]
    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Missing fields surfaced by the last pause, if any
    #[inline]
    #[must_use]
    pub fn missing(&self) -> &[MissingField] {
        &self.missing
    }

    /// Error message from the last failed step, if any
    #[inline]
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// When the last autosave snapshot was persisted
    #[inline]
    #[must_use]
    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    /// Current field values
    #[inline]
    #[must_use]
    pub fn values(&self) -> &HashMap<FieldId, FieldValue> {
        &self.values
    }

    /// Value of one field
    #[inline]
    #[must_use]
    pub fn value_of(&self, id: &FieldId) -> Option<&FieldValue> {
        self.values.get(id)
    }

    /// Set a field value from outside the orchestrator loop (operator
    /// edits between a pause and a resume)
    #[inline]
    pub fn set_value(&mut self, id: FieldId, value: FieldValue) {
        self.values.insert(id, value);
    }

    /// Cancellation handle for this batch
    #[inline]
    #[must_use]
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    // Orchestrator-internal mutators. Kept crate-private so the batch's
    // index and state are owned exclusively by the step loop.

    pub(crate) fn set_state(&mut self, state: BatchState) {
        self.state = state;
    }

    pub(crate) fn pause_missing(&mut self, missing: Vec<MissingField>) {
        self.missing = missing;
        self.state = BatchState::Paused;
    }

    pub(crate) fn pause_error(&mut self, message: String) {
        self.last_error = Some(message);
        self.state = BatchState::Paused;
    }

    pub(crate) fn store(&mut self, id: FieldId, value: FieldValue) {
        self.values.insert(id, value);
    }

    pub(crate) fn mark_saved(&mut self) {
        self.last_saved_at = Some(Utc::now());
    }

    pub(crate) fn advance(&mut self) {
        self.index += 1;
    }

    pub(crate) fn complete(&mut self) {
        self.index = 0;
        self.state = BatchState::Completed;
    }

    pub(crate) fn clear_flags(&mut self) {
        self.missing.clear();
        self.last_error = None;
    }
}

/// Generation-enabled ids: designer audience first, then builder, each
/// group in definition order
fn ordered_generatable(fields: &[Field]) -> Vec<FieldId> {
    let group = |audience: Audience| {
        fields
            .iter()
            .filter(move |f| f.generation_enabled && f.audience == audience)
            .map(|f| f.id.clone())
    };
    group(Audience::Designer)
        .chain(group(Audience::Builder))
        .collect()
}
