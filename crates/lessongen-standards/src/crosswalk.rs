//! Crosswalk table loading and cross-framework code lookups
//!
//! The crosswalk is a comma-delimited table of
//! `source code, source statement, mapped framework, mapped code, mapped statement`
//! rows keyed on GSE source codes. It is loaded at most once per process
//! through an injected [`CrosswalkSource`] and cached read-only for the
//! process lifetime; there is no write path.

use crate::error::StandardsError;
use crate::framework::{Framework, CANONICAL_ORDER};
use crate::grade;
use async_trait::async_trait;
use indexmap::IndexMap;
use lessongen_field::StandardDescriptor;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Sentinel statement for codes absent from the crosswalk in both
/// directions. Callers must tolerate unknown codes.
pub const STATEMENT_NOT_AVAILABLE: &str = "statement not available";

/// Well-known GSE vocabulary-standard codes: exact-grade shape plus the
/// banded fallbacks scanned when no exact-grade row exists.
const VOCABULARY_BANDS: [&str; 3] = ["6-8.L.4", "9-10.L.4", "11-12.L.4"];
const MAIN_IDEA_BANDS: [&str; 3] = ["6-8.RI.2", "9-10.RI.2", "11-12.RI.2"];

/// Provider of the raw crosswalk table text
#[async_trait]
pub trait CrosswalkSource: Send + Sync {
    /// Fetch the raw comma-delimited table
    async fn load_crosswalk(&self) -> Result<String, StandardsError>;
}

/// One crosswalk row: a source code paired with one equivalent code in
/// one other framework. Many rows share a source code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrosswalkRow {
    /// GSE source code
    pub source_code: String,
    /// Statement of the source standard
    pub source_statement: String,
    /// Framework of the mapped code
    pub framework: Framework,
    /// Equivalent code in `framework`
    pub mapped_code: String,
    /// Statement of the mapped standard
    pub mapped_statement: String,
}

/// Cross-framework code set keyed by framework, canonical order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedStandards {
    codes: IndexMap<Framework, Vec<String>>,
}

impl MappedStandards {
    /// Record a code under its framework, deduplicating
    fn push(&mut self, framework: Framework, code: &str) {
        let bucket = self.codes.entry(framework).or_default();
        if !bucket.iter().any(|c| c == code) {
            bucket.push(code.to_string());
        }
    }

    /// Codes for one framework
    #[must_use]
    pub fn codes(&self, framework: Framework) -> &[String] {
        self.codes.get(&framework).map_or(&[], Vec::as_slice)
    }

    /// All codes, flat, in canonical framework order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        CANONICAL_ORDER
            .into_iter()
            .flat_map(|fw| self.codes(fw).iter().map(String::as_str))
    }

    /// Whether no framework has any codes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.values().all(Vec::is_empty)
    }

    /// Serialize as `"; "`-joined codes in the fixed canonical framework
    /// order CCSS, TEKS, BEST, BLOOM, GSE. Downstream consumers rely on
    /// this ordering.
    #[must_use]
    pub fn format(&self) -> String {
        self.iter().collect::<Vec<_>>().join("; ")
    }
}

/// Result of a reverse lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reversed {
    /// Recovered source standard (sentinel statement when unknown)
    pub source: StandardDescriptor,
    /// Full cross-framework set, formatted, source code included
    pub mapped: String,
}

/// Insert a code into a `"; "`-joined code string at its canonical
/// framework position.
///
/// Idempotent: inserting an already-present code returns the input
/// unchanged. Codes of unrecognized shape sort after all known
/// frameworks, preserving their relative order.
#[must_use]
pub fn insert_in_order(existing: &str, new_code: &str) -> String {
    let new_code = new_code.trim();
    if new_code.is_empty() {
        return existing.to_string();
    }

    let codes: Vec<&str> = existing
        .split(';')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    if codes.iter().any(|c| *c == new_code) {
        return existing.to_string();
    }

    let mut groups: IndexMap<Option<Framework>, Vec<&str>> = CANONICAL_ORDER
        .into_iter()
        .map(|fw| (Some(fw), Vec::new()))
        .chain(std::iter::once((None, Vec::new())))
        .collect();
    for code in codes {
        groups
            .entry(Framework::of_code(code))
            .or_default()
            .push(code);
    }
    groups
        .entry(Framework::of_code(new_code))
        .or_default()
        .push(new_code);

    groups
        .values()
        .flatten()
        .copied()
        .collect::<Vec<_>>()
        .join("; ")
}

/// The crosswalk engine
///
/// Owns the lazily-initialized row cache; construct once and share by
/// reference. Tests inject a fake table through the source.
pub struct Crosswalk {
    source: Arc<dyn CrosswalkSource>,
    rows: OnceCell<Vec<CrosswalkRow>>,
}

impl std::fmt::Debug for Crosswalk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crosswalk")
            .field("loaded", &self.rows.initialized())
            .finish()
    }
}

impl Crosswalk {
    /// Create an engine over an injected table source
    #[must_use]
    pub fn new(source: Arc<dyn CrosswalkSource>) -> Self {
        Self {
            source,
            rows: OnceCell::new(),
        }
    }

    /// Parsed rows, loading and caching the table on first use
    async fn rows(&self) -> Result<&[CrosswalkRow], StandardsError> {
        let rows = self
            .rows
            .get_or_try_init(|| async {
                let raw = self.source.load_crosswalk().await?;
                let rows = parse_table(&raw);
                if rows.is_empty() {
                    return Err(StandardsError::MalformedTable(
                        "no parseable rows".to_string(),
                    ));
                }
                tracing::debug!(rows = rows.len(), "crosswalk table loaded");
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    /// Equivalent codes for a source code in every other framework.
    ///
    /// When a grade is supplied, mapped codes carrying a different grade
    /// token are dropped; codes with no extractable grade are always
    /// kept. Codes are deduplicated per framework.
    pub async fn mapped_standards(
        &self,
        source_code: &str,
        grade: Option<u8>,
    ) -> Result<MappedStandards, StandardsError> {
        let source_code = source_code.trim();
        let mut mapped = MappedStandards::default();
        for row in self.rows().await? {
            if row.source_code != source_code {
                continue;
            }
            if let (Some(grade), Some(row_grade)) =
                (grade, row.framework.grade_of_code(&row.mapped_code))
            {
                if row_grade != grade {
                    continue;
                }
            }
            mapped.push(row.framework, &row.mapped_code);
        }
        Ok(mapped)
    }

    /// Recover the source standard behind a non-source code and the full
    /// cross-framework set including the source framework itself.
    ///
    /// Unknown codes yield a sentinel-statement descriptor rather than an
    /// error.
    pub async fn reverse_lookup(
        &self,
        code: &str,
        grade: Option<u8>,
    ) -> Result<Reversed, StandardsError> {
        let code = code.trim();
        let rows = self.rows().await?;

        let source = rows
            .iter()
            .find(|r| r.mapped_code == code)
            .map(|r| StandardDescriptor::new(&r.source_code, &r.source_statement))
            .or_else(|| {
                rows.iter()
                    .find(|r| r.source_code == code)
                    .map(|r| StandardDescriptor::new(&r.source_code, &r.source_statement))
            });

        let Some(source) = source else {
            tracing::debug!(code, "code not found in crosswalk");
            return Ok(Reversed {
                source: StandardDescriptor::new(code, STATEMENT_NOT_AVAILABLE),
                mapped: insert_in_order("", code),
            });
        };

        let mapped = self.mapped_standards(&source.code, grade).await?;
        Ok(Reversed {
            mapped: insert_in_order(&mapped.format(), &source.code),
            source,
        })
    }

    /// Vocabulary standards for a grade, optionally translated to one
    /// target framework.
    pub async fn vocabulary_standards(
        &self,
        grade: u8,
        target: Option<Framework>,
    ) -> Result<Vec<StandardDescriptor>, StandardsError> {
        self.well_known_standards(grade, "L.4", &VOCABULARY_BANDS, target)
            .await
    }

    /// Main-idea standards for a grade, optionally translated to one
    /// target framework.
    pub async fn main_idea_standards(
        &self,
        grade: u8,
        target: Option<Framework>,
    ) -> Result<Vec<StandardDescriptor>, StandardsError> {
        self.well_known_standards(grade, "RI.2", &MAIN_IDEA_BANDS, target)
            .await
    }

    /// Exact-grade code preferred; otherwise the nearest enclosing banded
    /// code. A grade covered by neither yields no standards.
    async fn well_known_standards(
        &self,
        grade: u8,
        suffix: &str,
        bands: &[&str],
        target: Option<Framework>,
    ) -> Result<Vec<StandardDescriptor>, StandardsError> {
        let rows = self.rows().await?;

        let exact = format!("{grade}.{suffix}");
        let banded = bands
            .iter()
            .filter(|code| {
                let band = code.split('.').next().unwrap_or_default();
                grade::encloses(band, grade)
            })
            .map(|code| (*code).to_string());
        let source_row = std::iter::once(exact)
            .chain(banded)
            .find_map(|candidate| rows.iter().find(|r| r.source_code == candidate));

        let Some(source_row) = source_row else {
            return Ok(Vec::new());
        };

        let Some(target) = target else {
            return Ok(vec![StandardDescriptor::new(
                &source_row.source_code,
                &source_row.source_statement,
            )]);
        };

        Ok(rows
            .iter()
            .filter(|r| r.source_code == source_row.source_code && r.framework == target)
            .map(|r| StandardDescriptor::new(&r.mapped_code, &r.mapped_statement))
            .collect())
    }
}

/// Parse the raw table. Rows that are short, blank, or carry an unknown
/// framework label (the header row included) are skipped.
fn parse_table(raw: &str) -> Vec<CrosswalkRow> {
    raw.lines()
        .filter_map(|line| {
            let fields = parse_record(line);
            if fields.len() < 5 {
                return None;
            }
            let framework = Framework::from_label(&fields[2])?;
            Some(CrosswalkRow {
                source_code: fields[0].trim().to_string(),
                source_statement: fields[1].trim().to_string(),
                framework,
                mapped_code: fields[3].trim().to_string(),
                mapped_statement: fields[4].trim().to_string(),
            })
        })
        .collect()
}

/// Split one comma-delimited record, honoring quoted fields. A quoted
/// field may contain literal commas; a doubled quote inside a quoted
/// field is an escaped quote.
fn parse_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}
