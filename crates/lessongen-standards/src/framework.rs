//! Standards frameworks and code classification
//!
//! A code's framework is inferable from its lexical shape: a leading
//! framework token, or a bare leading integer for GSE (the default
//! framework the crosswalk is keyed on). Grade extraction is likewise
//! framework-specific pattern matching; a code with no recognizable
//! grade token simply has no grade.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One of the five supported standards taxonomies
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Framework {
    /// Common Core State Standards
    Ccss,
    /// Texas Essential Knowledge and Skills
    Teks,
    /// Florida B.E.S.T.
    Best,
    /// Bloom's taxonomy levels
    Bloom,
    /// Georgia Standards of Excellence (default framework; bare-integer codes)
    Gse,
}

/// Canonical serialization order for cross-framework code sets.
///
/// Downstream consumers rely on this ordering; it never varies by
/// insertion order.
pub const CANONICAL_ORDER: [Framework; 5] = [
    Framework::Ccss,
    Framework::Teks,
    Framework::Best,
    Framework::Bloom,
    Framework::Gse,
];

// GSE grade: bare leading integer before a dot ("9.RL.1").
static GSE_GRADE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2})\.").expect("valid regex"));
// BEST grade: 2-digit embedded token ("BEST.ELA.09.R.2.1").
static BEST_GRADE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.(\d{2})\.").expect("valid regex"));
// TEKS grade: 1-digit embedded token ("TEKS.9.5.B").
static TEKS_GRADE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.(\d)\.").expect("valid regex"));

impl Framework {
    /// Infer the framework of a code from its lexical shape.
    ///
    /// Returns `None` for codes matching no known shape.
    #[must_use]
    pub fn of_code(code: &str) -> Option<Self> {
        let code = code.trim();
        if code.starts_with("CCSS") {
            Some(Self::Ccss)
        } else if code.starts_with("TEKS") {
            Some(Self::Teks)
        } else if code.starts_with("BEST") {
            Some(Self::Best)
        } else if code.starts_with("BLOOM") {
            Some(Self::Bloom)
        } else if code.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            Some(Self::Gse)
        } else {
            None
        }
    }

    /// Parse a framework label as it appears in the crosswalk table
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "CCSS" => Some(Self::Ccss),
            "TEKS" => Some(Self::Teks),
            "BEST" => Some(Self::Best),
            "BLOOM" => Some(Self::Bloom),
            "GSE" => Some(Self::Gse),
            _ => None,
        }
    }

    /// Canonical label
    #[inline]
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Ccss => "CCSS",
            Self::Teks => "TEKS",
            Self::Best => "BEST",
            Self::Bloom => "BLOOM",
            Self::Gse => "GSE",
        }
    }

    /// Extract the grade embedded in a code of this framework.
    ///
    /// CCSS and BLOOM codes carry no grade token; banded GSE codes
    /// ("9-10.L.4") also yield `None`.
    #[must_use]
    pub fn grade_of_code(self, code: &str) -> Option<u8> {
        let captured = match self {
            Self::Gse => GSE_GRADE.captures(code.trim()),
            Self::Best => BEST_GRADE.captures(code),
            Self::Teks => TEKS_GRADE.captures(code),
            Self::Ccss | Self::Bloom => None,
        };
        captured.and_then(|c| c[1].parse().ok())
    }
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Grade of a code, inferring the framework first
#[must_use]
pub fn grade_of_code(code: &str) -> Option<u8> {
    Framework::of_code(code).and_then(|fw| fw.grade_of_code(code))
}
