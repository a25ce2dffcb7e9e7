//! Lessongen Core - generation orchestrator
//!
//! The state machine that drives AI generation of a lesson's fields:
//! - Orders generation-enabled fields (designer first, then builder)
//! - Look-ahead validates context dependencies across the whole batch
//! - Steps one field at a time through the injected AI collaborators
//! - Maps and filters standard codes on generated questions
//! - Autosaves after every committed step; pauses resumably on failure
//!
//! # Example
//!
//! ```rust,ignore
//! use lessongen_core::{GenerationOrchestrator, OrchestratorConfig, Services};
//!
//! # async fn example(services: Services, crosswalk: std::sync::Arc<lessongen_standards::Crosswalk>) -> anyhow::Result<()> {
//! let orchestrator = GenerationOrchestrator::new(services, crosswalk, OrchestratorConfig::new());
//! let mut batch = orchestrator.new_batch("template-1", "lesson-1", Default::default()).await?;
//! let state = orchestrator.run(&mut batch).await?;
//! println!("batch finished in state {state:?}");
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod batch;
pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod services;

// Re-exports for convenience
pub use batch::{BatchState, CancelFlag, GenerationBatch};
pub use error::{GenerationError, ServiceError};
pub use orchestrator::{GenerationOrchestrator, OrchestratorConfig};
pub use prompt::{PromptConfig, DEFAULT_FORMAT_REQUIREMENTS};
pub use services::{
    CaptionService, CompletionService, GeneratedImage, GeneratedQuestion, ImageService,
    Persistence, PersistenceCrosswalkSource, Services, StorageService,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the generation pipeline
    pub use crate::{
        BatchState, CancelFlag, GenerationBatch, GenerationError, GenerationOrchestrator,
        OrchestratorConfig, PromptConfig, Services,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
