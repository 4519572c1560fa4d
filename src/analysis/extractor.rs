//! Field extraction from free-text identity documents
//!
//! [`PatternExtractor`] recognises labelled lines (`Name: ...`, `DOB: ...`)
//! case-insensitively. The first non-blank occurrence of a label wins and a
//! missing label leaves the field empty.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{ExtractedFields, Extraction};

/// A strategy for turning document text into structured fields.
///
/// Implementations must be deterministic: identical inputs yield identical
/// output.
pub trait Extractor: Send + Sync {
    /// Extract fields and compare the claimed name against the extracted one
    fn extract(&self, document_text: &str, claimed_name: &str) -> Extraction;
}

/// Build a line-anchored matcher for a label alternation.
///
/// The label must start a line (leading blanks allowed) and end on a word
/// boundary; an optional `:`/`-`/`.` separator follows and the rest of the
/// line is captured.
fn labelled_line(labels: &str) -> Regex {
    let pattern = format!(r"(?im)^[ \t]*(?:{labels})\b[ \t]*[.:\-]*[ \t]*([^\r\n]*)");
    Regex::new(&pattern).expect("label pattern is a valid regex")
}

static NAME: Lazy<Regex> = Lazy::new(|| labelled_line(r"(?:full|given)[ \t]+name|name"));

static DOB: Lazy<Regex> =
    Lazy::new(|| labelled_line(r"dob|date[ \t]+of[ \t]+birth|birth[ \t]+date"));

/// Up to three words may qualify the number label (`Aadhaar Number`, `Voter ID No`)
static DOC_NUMBER: Lazy<Regex> =
    Lazy::new(|| labelled_line(r"(?:[\w'.]+[ \t]+){0,3}(?:number|no)"));

static EXPIRY: Lazy<Regex> = Lazy::new(|| {
    labelled_line(
        r"date[ \t]+of[ \t]+expiry|expiry(?:[ \t]+date)?|expiration(?:[ \t]+date)?|expires(?:[ \t]+on)?|valid[ \t]+(?:until|till|through|thru|upto|up[ \t]+to|to)|validity|valid",
    )
});

/// First non-blank value captured by `re`
fn first_value(re: &Regex, text: &str) -> Option<String> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Case-folded substring test; no other normalisation is applied
pub fn name_matches(claimed_name: &str, full_name: Option<&str>) -> bool {
    match full_name {
        Some(full) => full.to_lowercase().contains(&claimed_name.to_lowercase()),
        None => false,
    }
}

/// Regex-based extractor for labelled key/value documents
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternExtractor;

impl PatternExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract_fields(&self, document_text: &str) -> ExtractedFields {
        ExtractedFields {
            full_name: first_value(&NAME, document_text),
            dob: first_value(&DOB, document_text),
            doc_number: first_value(&DOC_NUMBER, document_text),
            expiry_date: first_value(&EXPIRY, document_text),
        }
    }
}

impl Extractor for PatternExtractor {
    fn extract(&self, document_text: &str, claimed_name: &str) -> Extraction {
        let fields = self.extract_fields(document_text);
        let name_match = name_matches(claimed_name, fields.full_name.as_deref());
        Extraction { fields, name_match }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSPORT: &str = "Name: John Doe\nDOB: 1990-01-01\nNumber: X123\nExpiry: 2030-01-01";

    #[test]
    fn test_extracts_all_labelled_fields() {
        let out = PatternExtractor::new().extract(PASSPORT, "John Doe");
        assert_eq!(out.fields.full_name.as_deref(), Some("John Doe"));
        assert_eq!(out.fields.dob.as_deref(), Some("1990-01-01"));
        assert_eq!(out.fields.doc_number.as_deref(), Some("X123"));
        assert_eq!(out.fields.expiry_date.as_deref(), Some("2030-01-01"));
        assert!(out.name_match);
    }

    #[test]
    fn test_missing_labels_are_absent() {
        let out = PatternExtractor::new().extract("Name: John Doe\nNumber: X123", "John");
        assert!(out.fields.dob.is_none());
        assert!(out.fields.expiry_date.is_none());
        assert!(out.fields.is_valid());
    }

    #[test]
    fn test_labels_are_case_insensitive() {
        let text = "FULL NAME: Ana Lima\ndate of birth - 1985-03-02\nPassport No. P998877\nvalid until: 2031-12-31";
        let fields = PatternExtractor::new().extract_fields(text);
        assert_eq!(fields.full_name.as_deref(), Some("Ana Lima"));
        assert_eq!(fields.dob.as_deref(), Some("1985-03-02"));
        assert_eq!(fields.doc_number.as_deref(), Some("P998877"));
        assert_eq!(fields.expiry_date.as_deref(), Some("2031-12-31"));
    }

    #[test]
    fn test_qualified_number_labels() {
        let ex = PatternExtractor::new();
        for (text, expected) in [
            ("Name: Ravi Kumar\nAadhaar Number: 1234 5678 9012", "1234 5678 9012"),
            ("Name: Ravi Kumar\nPAN No: ABCDE1234F", "ABCDE1234F"),
            ("Name: Ravi Kumar\nVoter ID No: XYZ0123456", "XYZ0123456"),
            ("Name: Ravi Kumar\nDL No: MH01 20110012345", "MH01 20110012345"),
            ("Name: Ravi Kumar\nDriving Licence No. KA0520190001", "KA0520190001"),
        ] {
            let fields = ex.extract_fields(text);
            assert_eq!(fields.doc_number.as_deref(), Some(expected), "{text}");
            assert!(fields.is_valid(), "{text}");
        }
    }

    #[test]
    fn test_number_label_needs_word_boundary() {
        let fields = PatternExtractor::new().extract_fields("Name: Ravi Kumar\nNotes: none");
        assert!(fields.doc_number.is_none());
    }

    #[test]
    fn test_valid_expiry_labels() {
        let ex = PatternExtractor::new();
        for text in [
            "Valid Upto: 2030-01-01",
            "Valid up to - 2030-01-01",
            "Valid: 2030-01-01",
            "Valid until 2030-01-01",
        ] {
            let fields = ex.extract_fields(text);
            assert_eq!(fields.expiry_date.as_deref(), Some("2030-01-01"), "{text}");
        }
    }

    #[test]
    fn test_first_match_wins() {
        let text = "Name: First Person\nName: Second Person";
        let fields = PatternExtractor::new().extract_fields(text);
        assert_eq!(fields.full_name.as_deref(), Some("First Person"));
    }

    #[test]
    fn test_blank_value_falls_through_to_next_label() {
        let text = "Name:   \nName: Real Name";
        let fields = PatternExtractor::new().extract_fields(text);
        assert_eq!(fields.full_name.as_deref(), Some("Real Name"));
    }

    #[test]
    fn test_label_must_start_line() {
        let text = "Surname: Doe\nFather's Name: Richard Roe";
        let fields = PatternExtractor::new().extract_fields(text);
        assert!(fields.full_name.is_none());
    }

    #[test]
    fn test_dob_line_is_not_read_as_expiry() {
        let fields = PatternExtractor::new().extract_fields("Date of Birth: 1990-01-01");
        assert_eq!(fields.dob.as_deref(), Some("1990-01-01"));
        assert!(fields.expiry_date.is_none());
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = "Name: John Doe\r\nNumber: X123\r\n";
        let fields = PatternExtractor::new().extract_fields(text);
        assert_eq!(fields.full_name.as_deref(), Some("John Doe"));
        assert_eq!(fields.doc_number.as_deref(), Some("X123"));
    }

    #[test]
    fn test_name_match_is_case_folded_substring() {
        assert!(name_matches("john", Some("JOHN DOE")));
        assert!(name_matches("Doe", Some("John Doe")));
        assert!(!name_matches("Jane Smith", Some("John Doe")));
        assert!(!name_matches("John Doe", None));
    }

    #[test]
    fn test_deterministic() {
        let ex = PatternExtractor::new();
        assert_eq!(ex.extract(PASSPORT, "John"), ex.extract(PASSPORT, "John"));
    }
}
