//! Collaborator service contracts
//!
//! The pipeline never talks to the network itself; every external
//! capability is injected behind one of these traits. Timeout/retry
//! policy, if any, belongs to the implementations.

use crate::error::ServiceError;
use async_trait::async_trait;
use lessongen_field::{Field, FieldId, FieldValue};
use lessongen_standards::{CrosswalkSource, StandardsError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Structured question payload returned by function-calling completion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    /// Question text
    pub text: String,
    /// Choice A
    pub choice_a: String,
    /// Choice B
    pub choice_b: String,
    /// Choice C
    pub choice_c: String,
    /// Choice D
    pub choice_d: String,
    /// Label of the correct choice ("A".."D")
    pub correct_choice: String,
    /// Raw standard codes the model claims the question targets
    pub standard_codes: Vec<String>,
}

impl GeneratedQuestion {
    /// Required parts that are blank. A non-empty result makes the
    /// question invalid; no partial question is ever stored.
    #[must_use]
    pub fn missing_parts(&self) -> Vec<&'static str> {
        let parts = [
            ("text", &self.text),
            ("choice_a", &self.choice_a),
            ("choice_b", &self.choice_b),
            ("choice_c", &self.choice_c),
            ("choice_d", &self.choice_d),
        ];
        parts
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }

    /// Render the question and its choices as stored text
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "{}\nA) {}\nB) {}\nC) {}\nD) {}\nAnswer: {}",
            self.text, self.choice_a, self.choice_b, self.choice_c, self.choice_d,
            self.correct_choice
        )
    }
}

/// Image generation result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Data URL of the produced image
    pub data_url: String,
    /// Model that produced it
    pub model_used: String,
    /// Alt text, when the image service provides one itself
    pub alt_text: Option<String>,
}

/// AI completion service
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Free-text completion
    async fn complete(
        &self,
        prompt: &str,
        model: &str,
        max_tokens: Option<u32>,
    ) -> Result<String, ServiceError>;

    /// Structured single-question completion (function-calling style)
    async fn complete_question(
        &self,
        prompt: &str,
        model: &str,
    ) -> Result<GeneratedQuestion, ServiceError>;
}

/// Image generation service
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Generate one image at the given size (e.g. "1024x1024")
    async fn generate_image(&self, prompt: &str, size: &str)
        -> Result<GeneratedImage, ServiceError>;
}

/// Vision captioning service used for alt text when the image service
/// returns none
#[async_trait]
pub trait CaptionService: Send + Sync {
    /// Caption an image given as a data URL
    async fn caption(&self, image_data_url: &str) -> Result<String, ServiceError>;
}

/// Asset storage
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Upload bytes, returning a public URL
    async fn upload(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, ServiceError>;

    /// Delete an asset
    async fn delete(&self, path: &str) -> Result<(), ServiceError>;
}

/// Persistence collaborator
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Load field definitions for a template
    async fn load_fields(&self, template_id: &str) -> Result<Vec<Field>, ServiceError>;

    /// Persist an autosave snapshot of all field values
    async fn save_field_values(
        &self,
        lesson_id: &str,
        values: &HashMap<FieldId, FieldValue>,
    ) -> Result<(), ServiceError>;

    /// Fetch the raw crosswalk table
    async fn load_crosswalk_table(&self) -> Result<String, ServiceError>;
}

/// Adapter exposing [`Persistence`] as a crosswalk table source
#[derive(Clone)]
pub struct PersistenceCrosswalkSource(pub Arc<dyn Persistence>);

#[async_trait]
impl CrosswalkSource for PersistenceCrosswalkSource {
    async fn load_crosswalk(&self) -> Result<String, StandardsError> {
        self.0
            .load_crosswalk_table()
            .await
            .map_err(|e| StandardsError::SourceUnavailable(e.to_string()))
    }
}

/// Bundle of injected collaborators consumed by the orchestrator
#[derive(Clone)]
pub struct Services {
    /// AI completion
    pub completion: Arc<dyn CompletionService>,
    /// Image generation
    pub image: Arc<dyn ImageService>,
    /// Vision captioning
    pub caption: Arc<dyn CaptionService>,
    /// Asset storage
    pub storage: Arc<dyn StorageService>,
    /// Template/lesson persistence
    pub persistence: Arc<dyn Persistence>,
    /// Standards alignment judge
    pub judge: Arc<dyn lessongen_standards::StandardsJudge>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_missing_parts() {
        let mut q = GeneratedQuestion {
            text: "What is the main idea?".to_string(),
            choice_a: "A".to_string(),
            choice_b: "B".to_string(),
            choice_c: "C".to_string(),
            choice_d: "D".to_string(),
            correct_choice: "B".to_string(),
            standard_codes: vec![],
        };
        assert!(q.missing_parts().is_empty());

        q.choice_c.clear();
        q.text = "  ".to_string();
        assert_eq!(q.missing_parts(), vec!["text", "choice_c"]);
    }

    #[test]
    fn question_render_includes_choices() {
        let q = GeneratedQuestion {
            text: "Pick one".to_string(),
            choice_a: "first".to_string(),
            choice_b: "second".to_string(),
            choice_c: "third".to_string(),
            choice_d: "fourth".to_string(),
            correct_choice: "A".to_string(),
            standard_codes: vec![],
        };
        let rendered = q.render();
        assert!(rendered.contains("B) second"));
        assert!(rendered.contains("Answer: A"));
    }

    #[test]
    fn question_serde_round_trip() {
        let q = GeneratedQuestion {
            text: "t".to_string(),
            standard_codes: vec!["CCSS.RL.9.1".to_string()],
            ..GeneratedQuestion::default()
        };
        let json = serde_json::to_string(&q).unwrap();
        let back: GeneratedQuestion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q);
    }
}
