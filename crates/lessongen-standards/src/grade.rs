//! Grade-band string parsing
//!
//! A band is either a single grade ("9") or two grades joined by a
//! hyphen or en-dash ("9-10", "9–10"). Unparseable input yields an empty
//! list, never an error.

use once_cell::sync::Lazy;
use regex::Regex;

static BAND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,2})\s*(?:[-–]\s*(\d{1,2})\s*)?$").expect("valid regex"));

/// Grades named by a band string, ascending.
///
/// `"9"` yields `[9]`; `"9-10"` and `"9–10"` yield `[9, 10]` (both
/// endpoints, not the full range). Anything else yields `[]`.
#[must_use]
pub fn grades(band: &str) -> Vec<u8> {
    let Some(captures) = BAND.captures(band) else {
        return Vec::new();
    };
    let Ok(first) = captures[1].parse::<u8>() else {
        return Vec::new();
    };
    match captures.get(2).and_then(|m| m.as_str().parse::<u8>().ok()) {
        Some(second) if second < first => vec![second, first],
        Some(second) if second > first => vec![first, second],
        Some(_) => vec![first],
        None => vec![first],
    }
}

/// The single representative grade of a band: the maximum endpoint.
#[must_use]
pub fn representative_grade(band: &str) -> Option<u8> {
    grades(band).into_iter().max()
}

/// Whether a band encloses the given grade (inclusive endpoints).
#[must_use]
pub fn encloses(band: &str, grade: u8) -> bool {
    match grades(band).as_slice() {
        [single] => *single == grade,
        [lo, hi] => (*lo..=*hi).contains(&grade),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_grade() {
        assert_eq!(grades("9"), vec![9]);
        assert_eq!(grades(" 12 "), vec![12]);
    }

    #[test]
    fn banded_grades_both_endpoints() {
        assert_eq!(grades("9-10"), vec![9, 10]);
        assert_eq!(grades("9–10"), vec![9, 10]);
        assert_eq!(grades("10-9"), vec![9, 10]);
    }

    #[test]
    fn junk_yields_empty() {
        assert_eq!(grades(""), Vec::<u8>::new());
        assert_eq!(grades("K-2a"), Vec::<u8>::new());
        assert_eq!(grades("ninth"), Vec::<u8>::new());
        assert_eq!(grades("9-"), Vec::<u8>::new());
    }

    #[test]
    fn representative_is_max() {
        assert_eq!(representative_grade("9-10"), Some(10));
        assert_eq!(representative_grade("7"), Some(7));
        assert_eq!(representative_grade("n/a"), None);
    }

    #[test]
    fn enclosure() {
        assert!(encloses("9-10", 9));
        assert!(encloses("9-10", 10));
        assert!(!encloses("9-10", 11));
        assert!(encloses("7", 7));
        assert!(!encloses("", 7));
    }

    proptest! {
        #[test]
        fn single_form_never_panics_and_is_exact(g in 0u8..=99) {
            prop_assert_eq!(grades(&g.to_string()), vec![g]);
        }

        #[test]
        fn band_forms_return_sorted_endpoints(a in 0u8..=99, b in 0u8..=99, dash in prop::sample::select(vec!["-", "–"])) {
            let band = format!("{a}{dash}{b}");
            let parsed = grades(&band);
            if a == b {
                prop_assert_eq!(parsed, vec![a]);
            } else {
                prop_assert_eq!(parsed, vec![a.min(b), a.max(b)]);
            }
        }

        #[test]
        fn arbitrary_input_never_panics(s in ".*") {
            let _ = grades(&s);
            let _ = representative_grade(&s);
        }
    }
}
