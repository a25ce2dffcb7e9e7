//! Lessongen Standards - crosswalk engine and alignment filter
//!
//! Translates educational standard codes across the five supported
//! frameworks and judges which candidate codes are topically relevant to
//! a generated item:
//! - Framework classification and grade-token extraction from codes
//! - Grade-band string parsing
//! - Crosswalk table loading (once per process) and lookups
//! - Canonically ordered serialization of cross-framework code sets
//! - Fail-open alignment filtering via an injected judge

#![warn(unreachable_pub)]

pub mod alignment;
pub mod crosswalk;
pub mod error;
pub mod framework;
pub mod grade;

// Re-exports for convenience
pub use alignment::{filter_aligned, StandardsJudge, NO_PASSAGE_SENTINEL};
pub use crosswalk::{
    insert_in_order, Crosswalk, CrosswalkRow, CrosswalkSource, MappedStandards, Reversed,
    STATEMENT_NOT_AVAILABLE,
};
pub use error::StandardsError;
pub use framework::Framework;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
