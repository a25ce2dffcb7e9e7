//! Testing utilities for the lessongen workspace
//!
//! Scripted collaborator services, in-memory persistence, and field
//! fixtures shared by unit and integration tests.

#![allow(missing_docs)]

use async_trait::async_trait;
use lessongen_core::{
    CaptionService, CompletionService, GeneratedImage, GeneratedQuestion, ImageService,
    Persistence, PersistenceCrosswalkSource, ServiceError, Services, StorageService,
};
use lessongen_field::{Audience, Field, FieldId, FieldKind, FieldValue, QuestionPrompt};
use lessongen_standards::{Crosswalk, StandardsError, StandardsJudge};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Canned crosswalk table matching the shapes the engine recognizes
#[must_use]
pub fn sample_crosswalk_table() -> String {
    "\
source_code,source_statement,framework,mapped_code,mapped_statement
9.RL.1,\"Cite evidence, strong and thorough\",CCSS,CCSS.RL.9.1,Cite strong textual evidence
9.RL.1,\"Cite evidence, strong and thorough\",TEKS,TEKS.9.5.B,Analyze textual evidence
9.RL.1,\"Cite evidence, strong and thorough\",BEST,BEST.ELA.09.R.2.1,Analyze central ideas
9.RL.1,\"Cite evidence, strong and thorough\",BLOOM,BLOOM.Analyze,Analyze
9-10.L.4,Determine word meanings,CCSS,CCSS.L.9-10.4,Determine meaning of unknown words
9-10.L.4,Determine word meanings,TEKS,TEKS.9.2.B,Use context clues
9-10.RI.2,Determine central idea of a text,CCSS,CCSS.RI.9-10.2,Determine central ideas
"
    .to_string()
}

/// A fully populated, valid structured question
#[must_use]
pub fn valid_question(text: &str, codes: &[&str]) -> GeneratedQuestion {
    GeneratedQuestion {
        text: text.to_string(),
        choice_a: "alpha".to_string(),
        choice_b: "bravo".to_string(),
        choice_c: "charlie".to_string(),
        choice_d: "delta".to_string(),
        correct_choice: "A".to_string(),
        standard_codes: codes.iter().map(|c| (*c).to_string()).collect(),
    }
}

pub fn text_field(id: &str, audience: Audience) -> Field {
    Field::new(id, id.to_uppercase(), FieldKind::PlainText, audience)
        .generatable()
        .with_instructions(format!("Generate the {id} field"))
}

pub fn question_field(id: &str, context: &[&str]) -> Field {
    let prompts: [QuestionPrompt; 5] = std::array::from_fn(|i| {
        QuestionPrompt::new(format!("Write question {}", i + 1))
    });
    Field::new(id, id.to_uppercase(), FieldKind::QuestionSet, Audience::Builder)
        .generatable()
        .with_context(context.iter().map(|c| FieldId::new(*c)))
        .with_question_prompts(prompts)
}

/// Completion service with scripted replies and call counting.
///
/// Unscripted calls return a deterministic default rather than failing.
#[derive(Default)]
pub struct ScriptedCompletion {
    texts: Mutex<VecDeque<String>>,
    questions: Mutex<VecDeque<GeneratedQuestion>>,
    fail_text_on: AtomicUsize,
    fail_question_on: AtomicUsize,
    pub text_calls: AtomicUsize,
    pub question_calls: AtomicUsize,
}

impl ScriptedCompletion {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.texts.lock().unwrap().push_back(text.into());
    }

    pub fn push_question(&self, question: GeneratedQuestion) {
        self.questions.lock().unwrap().push_back(question);
    }

    /// Fail the nth text call (1-based) with a transport error
    pub fn fail_text_call(&self, n: usize) {
        self.fail_text_on.store(n, Ordering::SeqCst);
    }

    /// Fail the nth question call (1-based) with a transport error
    pub fn fail_question_call(&self, n: usize) {
        self.fail_question_on.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(
        &self,
        _prompt: &str,
        _model: &str,
        _max_tokens: Option<u32>,
    ) -> Result<String, ServiceError> {
        let call = self.text_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_text_on.load(Ordering::SeqCst) == call {
            return Err(ServiceError::Transport("scripted failure".to_string()));
        }
        Ok(self
            .texts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "generated text".to_string()))
    }

    async fn complete_question(
        &self,
        _prompt: &str,
        _model: &str,
    ) -> Result<GeneratedQuestion, ServiceError> {
        let call = self.question_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_question_on.load(Ordering::SeqCst) == call {
            return Err(ServiceError::Transport("scripted failure".to_string()));
        }
        Ok(self
            .questions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| valid_question("default question", &["9.RL.1"])))
    }
}

#[derive(Default)]
pub struct ScriptedImage {
    alt_text: Mutex<Option<String>>,
    pub calls: AtomicUsize,
}

impl ScriptedImage {
    /// Make subsequent generations carry service-provided alt text
    pub fn set_alt_text(&self, alt: impl Into<String>) {
        *self.alt_text.lock().unwrap() = Some(alt.into());
    }
}

#[async_trait]
impl ImageService for ScriptedImage {
    async fn generate_image(
        &self,
        _prompt: &str,
        _size: &str,
    ) -> Result<GeneratedImage, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GeneratedImage {
            data_url: "data:image/png;base64,aGVsbG8=".to_string(),
            model_used: "test-image-model".to_string(),
            alt_text: self.alt_text.lock().unwrap().clone(),
        })
    }
}

#[derive(Default)]
pub struct ScriptedCaption {
    pub calls: AtomicUsize,
}

#[async_trait]
impl CaptionService for ScriptedCaption {
    async fn caption(&self, _image_data_url: &str) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("a scripted caption".to_string())
    }
}

#[derive(Default)]
pub struct InMemoryStorage {
    pub uploads: Mutex<Vec<(String, usize, String)>>,
}

#[async_trait]
impl StorageService for InMemoryStorage {
    async fn upload(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, ServiceError> {
        self.uploads
            .lock()
            .unwrap()
            .push((path.to_string(), bytes.len(), content_type.to_string()));
        Ok(format!("https://cdn.test/{path}"))
    }

    async fn delete(&self, _path: &str) -> Result<(), ServiceError> {
        Ok(())
    }
}

pub struct InMemoryPersistence {
    fields: Vec<Field>,
    crosswalk: String,
    fail_saves: AtomicBool,
    pub snapshots: Mutex<Vec<HashMap<FieldId, FieldValue>>>,
}

impl InMemoryPersistence {
    #[must_use]
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            crosswalk: sample_crosswalk_table(),
            fail_saves: AtomicBool::new(false),
            snapshots: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn save_count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }
}

#[async_trait]
impl Persistence for InMemoryPersistence {
    async fn load_fields(&self, _template_id: &str) -> Result<Vec<Field>, ServiceError> {
        Ok(self.fields.clone())
    }

    async fn save_field_values(
        &self,
        _lesson_id: &str,
        values: &HashMap<FieldId, FieldValue>,
    ) -> Result<(), ServiceError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ServiceError::Transport("save unavailable".to_string()));
        }
        self.snapshots.lock().unwrap().push(values.clone());
        Ok(())
    }

    async fn load_crosswalk_table(&self) -> Result<String, ServiceError> {
        Ok(self.crosswalk.clone())
    }
}

/// Judge that echoes the prompt, so every candidate code is "named"
#[derive(Default)]
pub struct ApproveAllJudge;

#[async_trait]
impl StandardsJudge for ApproveAllJudge {
    async fn judge(&self, prompt: &str, _model: &str) -> Result<String, StandardsError> {
        Ok(prompt.to_string())
    }
}

/// Judge that always fails at the transport level
#[derive(Default)]
pub struct FailingJudge;

#[async_trait]
impl StandardsJudge for FailingJudge {
    async fn judge(&self, _prompt: &str, _model: &str) -> Result<String, StandardsError> {
        Err(StandardsError::JudgeFailed("scripted outage".to_string()))
    }
}

/// Judge replying with fixed text regardless of input
pub struct NamingJudge(pub String);

#[async_trait]
impl StandardsJudge for NamingJudge {
    async fn judge(&self, _prompt: &str, _model: &str) -> Result<String, StandardsError> {
        Ok(self.0.clone())
    }
}

/// Bundle of concrete scripted collaborators plus the service handles
/// the orchestrator consumes
pub struct TestHarness {
    pub completion: Arc<ScriptedCompletion>,
    pub image: Arc<ScriptedImage>,
    pub caption: Arc<ScriptedCaption>,
    pub storage: Arc<InMemoryStorage>,
    pub persistence: Arc<InMemoryPersistence>,
    pub judge: Arc<dyn StandardsJudge>,
}

impl TestHarness {
    #[must_use]
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            completion: Arc::new(ScriptedCompletion::new()),
            image: Arc::new(ScriptedImage::default()),
            caption: Arc::new(ScriptedCaption::default()),
            storage: Arc::new(InMemoryStorage::default()),
            persistence: Arc::new(InMemoryPersistence::new(fields)),
            judge: Arc::new(ApproveAllJudge),
        }
    }

    #[must_use]
    pub fn with_judge(mut self, judge: Arc<dyn StandardsJudge>) -> Self {
        self.judge = judge;
        self
    }

    #[must_use]
    pub fn services(&self) -> Services {
        Services {
            completion: self.completion.clone(),
            image: self.image.clone(),
            caption: self.caption.clone(),
            storage: self.storage.clone(),
            persistence: self.persistence.clone(),
            judge: self.judge.clone(),
        }
    }

    /// Crosswalk engine fed from the in-memory persistence table
    #[must_use]
    pub fn crosswalk(&self) -> Arc<Crosswalk> {
        Arc::new(Crosswalk::new(Arc::new(PersistenceCrosswalkSource(
            self.persistence.clone(),
        ))))
    }
}
