//! Generation orchestrator
//!
//! Walks the generation-enabled fields of a lesson one at a time:
//! validates context dependencies ahead of the whole batch, assembles a
//! prompt per field, invokes the AI collaborators (specializing for
//! image and question-set fields), aligns generated standards through
//! the crosswalk and the judge, and autosaves after every committed
//! step. Single-flow by design: one batch, one field, one outstanding
//! call at a time, so later steps may read state written by earlier
//! steps.

use crate::batch::{BatchState, GenerationBatch};
use crate::error::{GenerationError, ServiceError};
use crate::prompt::{truncate_chars, value_text, PromptConfig};
use crate::services::Services;
use lessongen_field::{
    missing_context_fields, strip_markup, Field, FieldId, FieldKind, FieldValue, ImageValue,
    MissingField, QuestionSetValue, StandardDescriptor,
};
use lessongen_standards::{filter_aligned, grade, insert_in_order, Crosswalk, StandardsError};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Model for free-text field generation
    pub completion_model: String,
    /// Model for structured question generation
    pub question_model: String,
    /// Model for alignment judgment
    pub judge_model: String,
    /// Model name recorded when alt text comes from the caption service
    pub caption_model: String,
    /// Image size requested from the image service
    pub image_size: String,
    /// Character cap for the context-passage summary in image prompts
    pub summary_cap: usize,
    /// Optional completion token budget
    pub max_tokens: Option<u32>,
    /// Field whose value carries the lesson's grade band
    pub grade_band_field: Option<FieldId>,
    /// Persist an autosave snapshot after each committed step
    pub autosave: bool,
}

impl OrchestratorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With the grade-band field id
    #[inline]
    #[must_use]
    pub fn with_grade_band_field(mut self, id: FieldId) -> Self {
        self.grade_band_field = Some(id);
        self
    }

    /// With autosave toggled
    #[inline]
    #[must_use]
    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    /// With the completion model
    #[inline]
    #[must_use]
    pub fn with_completion_model(mut self, model: impl Into<String>) -> Self {
        self.completion_model = model.into();
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            completion_model: "gpt-4o".to_string(),
            question_model: "gpt-4o".to_string(),
            judge_model: "gpt-4o-mini".to_string(),
            caption_model: "gpt-4o-mini".to_string(),
            image_size: "1024x1024".to_string(),
            summary_cap: 700,
            max_tokens: None,
            grade_band_field: None,
            autosave: true,
        }
    }
}

/// The generation orchestrator
#[derive(Debug)]
pub struct GenerationOrchestrator {
    services: Services,
    crosswalk: Arc<Crosswalk>,
    config: OrchestratorConfig,
}

impl GenerationOrchestrator {
    /// Create an orchestrator over injected collaborators
    #[must_use]
    pub fn new(services: Services, crosswalk: Arc<Crosswalk>, config: OrchestratorConfig) -> Self {
        Self {
            services,
            crosswalk,
            config,
        }
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Create a batch for a lesson, loading field definitions from
    /// persistence
    pub async fn new_batch(
        &self,
        template_id: &str,
        lesson_id: &str,
        values: HashMap<FieldId, FieldValue>,
    ) -> Result<GenerationBatch, GenerationError> {
        let fields = self
            .services
            .persistence
            .load_fields(template_id)
            .await
            .map_err(GenerationError::FieldLoad)?;
        Ok(GenerationBatch::new(lesson_id, fields, values))
    }

    /// Run a batch from its current index until completion, pause, or
    /// cancellation.
    ///
    /// Starting and resuming are the same operation: the missing-context
    /// union is computed over the remaining fields, and stepping
    /// continues from the stored index. Pauses for missing dependencies
    /// return `Ok(Paused)` with the list surfaced on the batch; step
    /// failures pause the batch at the current index and propagate the
    /// error.
    pub async fn run(&self, batch: &mut GenerationBatch) -> Result<BatchState, GenerationError> {
        match batch.state() {
            BatchState::Idle | BatchState::Paused => {}
            state => return Err(GenerationError::NotRunnable(state)),
        }
        batch.clear_flags();

        // Look-ahead validation: the union of missing context across
        // every remaining field, so field N is never generated only to
        // discover field N+3 cannot proceed.
        batch.set_state(BatchState::Validating);
        let missing = self.lookahead_missing(batch);
        if !missing.is_empty() {
            tracing::info!(
                batch = %batch.id(),
                missing = missing.len(),
                "batch paused before generation; context fields missing"
            );
            batch.pause_missing(missing);
            return Ok(BatchState::Paused);
        }

        batch.set_state(BatchState::Running);
        let cancel = batch.cancel_flag();

        while batch.index() < batch.order().len() {
            // Cooperative cancellation, checked only between steps
            if cancel.is_cancelled() {
                tracing::info!(batch = %batch.id(), index = batch.index(), "batch cancelled");
                batch.set_state(BatchState::Cancelled);
                return Ok(BatchState::Cancelled);
            }

            let id = batch.order()[batch.index()].clone();
            let Some(field) = batch.fields().iter().find(|f| f.id == id).cloned() else {
                batch.advance();
                continue;
            };

            // Values may have changed since batch start; re-check this
            // field's own dependencies immediately before generating
            let still_missing = missing_context_fields(&field, batch.fields(), batch.values());
            if !still_missing.is_empty() {
                tracing::info!(field = %field.id, "step paused; context fields missing");
                batch.pause_missing(still_missing);
                return Ok(BatchState::Paused);
            }

            tracing::debug!(field = %field.id, index = batch.index(), "generating field");
            let value = match self.generate_field(&field, batch).await {
                Ok(value) => value,
                Err(err) => {
                    tracing::error!(field = %field.id, %err, "step failed; batch paused");
                    batch.pause_error(err.to_string());
                    return Err(err);
                }
            };
            batch.store(field.id.clone(), value);

            // Commit before advancing so a later failure resumes here
            if self.config.autosave {
                if let Err(e) = self
                    .services
                    .persistence
                    .save_field_values(batch.lesson_id(), batch.values())
                    .await
                {
                    let err = GenerationError::Autosave(e);
                    tracing::error!(field = %field.id, %err, "autosave failed; batch paused");
                    batch.pause_error(err.to_string());
                    return Err(err);
                }
                batch.mark_saved();
            }
            batch.advance();
        }

        tracing::info!(batch = %batch.id(), "batch completed");
        batch.complete();
        Ok(BatchState::Completed)
    }

    /// Union of missing context fields across the remaining batch
    /// fields, deduplicated by id
    fn lookahead_missing(&self, batch: &GenerationBatch) -> Vec<MissingField> {
        let mut union: Vec<MissingField> = Vec::new();
        for id in batch.remaining() {
            let Some(field) = batch.fields().iter().find(|f| &f.id == id) else {
                continue;
            };
            for missing in missing_context_fields(field, batch.fields(), batch.values()) {
                if !union.iter().any(|m| m.id == missing.id) {
                    union.push(missing);
                }
            }
        }
        union
    }

    async fn generate_field(
        &self,
        field: &Field,
        batch: &GenerationBatch,
    ) -> Result<FieldValue, GenerationError> {
        match field.kind {
            FieldKind::Image => self.generate_image_field(field, batch).await,
            FieldKind::QuestionSet => self.generate_question_set(field, batch).await,
            _ => self.generate_text_field(field, batch).await,
        }
    }

    async fn generate_text_field(
        &self,
        field: &Field,
        batch: &GenerationBatch,
    ) -> Result<FieldValue, GenerationError> {
        let prompt = PromptConfig::new()
            .with_task(field.instructions.as_str())
            .with_context_fields(field.context_field_ids.iter().cloned())
            .assemble(batch.fields(), batch.values());

        let text = self
            .services
            .completion
            .complete(&prompt, &self.config.completion_model, self.config.max_tokens)
            .await
            .map_err(|e| self.service_err(field, e))?;
        Ok(FieldValue::Text(text))
    }

    async fn generate_image_field(
        &self,
        field: &Field,
        batch: &GenerationBatch,
    ) -> Result<FieldValue, GenerationError> {
        // Operator-supplied description from a prior value survives
        // regeneration and prefixes the prompt
        let description = match batch.value_of(&field.id) {
            Some(FieldValue::Image(image)) => image.description.clone(),
            _ => String::new(),
        };

        let passage = context_passage(field, batch);
        let summary = truncate_chars(&passage, self.config.summary_cap);

        let mut parts = Vec::new();
        if !description.trim().is_empty() {
            parts.push(description.clone());
        }
        if !field.instructions.trim().is_empty() {
            parts.push(strip_markup(&field.instructions));
        }
        if !summary.trim().is_empty() {
            parts.push(format!("Scene context: {summary}"));
        }
        let prompt = parts.join("\n\n");

        let image = self
            .services
            .image
            .generate_image(&prompt, &self.config.image_size)
            .await
            .map_err(|e| self.service_err(field, e))?;

        // Prefer alt text from the image service itself
        let (alt_text, alt_text_model_used) = match image
            .alt_text
            .clone()
            .filter(|alt| !alt.trim().is_empty())
        {
            Some(alt) => (alt, image.model_used.clone()),
            None => {
                let alt = self
                    .services
                    .caption
                    .caption(&image.data_url)
                    .await
                    .map_err(|e| self.service_err(field, e))?;
                (alt, self.config.caption_model.clone())
            }
        };

        let (bytes, content_type) = decode_data_url(&image.data_url);
        let path = format!(
            "lessons/{}/{}-{}.png",
            batch.lesson_id(),
            field.id,
            Uuid::new_v4()
        );
        let url = self
            .services
            .storage
            .upload(&path, &bytes, &content_type)
            .await
            .map_err(|e| self.service_err(field, e))?;

        Ok(FieldValue::Image(ImageValue {
            url,
            alt_text,
            model_used: image.model_used,
            alt_text_model_used,
            description,
        }))
    }

    async fn generate_question_set(
        &self,
        field: &Field,
        batch: &GenerationBatch,
    ) -> Result<FieldValue, GenerationError> {
        let Some(prompts) = field.question_prompts.as_ref() else {
            return Err(GenerationError::MissingQuestionPrompts {
                field: field.name.clone(),
            });
        };

        let grade = self.lesson_grade(batch);
        let passage = context_passage(field, batch);
        let mut set = QuestionSetValue::default();

        // Slots run strictly sequentially; each has its own prompt and
        // flags, and later slots may read standards bookkeeping from
        // earlier ones
        for (slot, slot_prompt) in prompts.iter().enumerate() {
            let mut config = PromptConfig::new()
                .with_system(field.instructions.as_str())
                .with_task(slot_prompt.prompt.as_str())
                .with_format(
                    "Return one multiple-choice question: question text, four labeled \
                     choices, the correct choice label, and the standard codes it targets.",
                )
                .with_context_fields(field.context_field_ids.iter().cloned());

            if slot_prompt.include_vocabulary_standards {
                if let Some(grade) = grade {
                    let standards = self
                        .crosswalk
                        .vocabulary_standards(grade, None)
                        .await
                        .map_err(|e| self.standards_err(field, e))?;
                    if !standards.is_empty() {
                        config = config
                            .with_extra_context("Vocabulary standards", render_standards(&standards));
                    }
                }
            }
            if slot_prompt.include_main_idea_standards {
                if let Some(grade) = grade {
                    let standards = self
                        .crosswalk
                        .main_idea_standards(grade, None)
                        .await
                        .map_err(|e| self.standards_err(field, e))?;
                    if !standards.is_empty() {
                        config = config
                            .with_extra_context("Main idea standards", render_standards(&standards));
                    }
                }
            }

            let prompt = config.assemble(batch.fields(), batch.values());
            let question = self
                .services
                .completion
                .complete_question(&prompt, &self.config.question_model)
                .await
                .map_err(|e| self.service_err(field, e))?;

            // No partial question is ever stored; an invalid slot aborts
            // the whole field
            let missing = question.missing_parts();
            if !missing.is_empty() {
                return Err(GenerationError::MalformedQuestion {
                    field: field.name.clone(),
                    slot,
                    missing,
                });
            }

            if let Some(first_code) = question.standard_codes.first() {
                let reversed = self
                    .crosswalk
                    .reverse_lookup(first_code, grade)
                    .await
                    .map_err(|e| self.standards_err(field, e))?;

                let candidates: Vec<String> = reversed
                    .mapped
                    .split(';')
                    .map(str::trim)
                    .filter(|c| !c.is_empty() && *c != reversed.source.code)
                    .map(String::from)
                    .collect();
                let kept = filter_aligned(
                    &question.text,
                    &passage,
                    &candidates,
                    self.services.judge.as_ref(),
                    &self.config.judge_model,
                )
                .await;
                let dropped: Vec<String> = candidates
                    .iter()
                    .filter(|c| !kept.contains(c))
                    .cloned()
                    .collect();

                // The source code goes back into its canonical position
                // after filtering
                let merged = insert_in_order(&kept.join("; "), &reversed.source.code);
                set.sources.insert(
                    slot,
                    StandardDescriptor::new(merged, reversed.source.statement.as_str()),
                );
                if !dropped.is_empty() {
                    set.filtered_out.insert(slot, dropped);
                }
            }

            set.questions[slot] = question.render();
        }

        Ok(FieldValue::Questions(set))
    }

    /// Representative grade of the lesson, read from the configured
    /// grade-band field
    fn lesson_grade(&self, batch: &GenerationBatch) -> Option<u8> {
        let id = self.config.grade_band_field.as_ref()?;
        let value = batch.value_of(id)?;
        grade::representative_grade(&value_text(value))
    }

    fn service_err(&self, field: &Field, source: ServiceError) -> GenerationError {
        GenerationError::Service {
            field: field.name.clone(),
            source,
        }
    }

    fn standards_err(&self, field: &Field, source: StandardsError) -> GenerationError {
        GenerationError::Standards {
            field: field.name.clone(),
            source,
        }
    }
}

/// Concatenated plain-text content of a field's context dependencies
fn context_passage(field: &Field, batch: &GenerationBatch) -> String {
    field
        .context_field_ids
        .iter()
        .filter_map(|id| batch.value_of(id))
        .map(|value| strip_markup(&value_text(value)))
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render standards as prompt guidance lines
fn render_standards(standards: &[StandardDescriptor]) -> String {
    standards
        .iter()
        .map(|s| format!("{}: {}", s.code, s.statement))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split a data URL into payload bytes and content type. Non-data-URL
/// input is uploaded as-is with a PNG content type.
fn decode_data_url(data_url: &str) -> (Vec<u8>, String) {
    use base64::Engine as _;

    if let Some((header, payload)) = data_url.split_once(',') {
        if let Some(meta) = header.strip_prefix("data:") {
            let mime = meta.split(';').next().unwrap_or_default();
            let mime = if mime.is_empty() { "image/png" } else { mime };
            if meta.contains("base64") {
                if let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(payload) {
                    return (bytes, mime.to_string());
                }
            }
            return (payload.as_bytes().to_vec(), mime.to_string());
        }
    }
    (data_url.as_bytes().to_vec(), "image/png".to_string())
}
