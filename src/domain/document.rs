//! Verification input and extracted document fields

use serde::{Deserialize, Serialize};

/// A claimed identity plus the free-text document supporting it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub name: String,
    pub email: String,
    pub document_text: String,
    #[serde(default)]
    pub document_type: String,
}

impl VerificationRequest {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        document_text: impl Into<String>,
        document_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            document_text: document_text.into(),
            document_type: document_type.into(),
        }
    }
}

/// Fields pulled out of document text.
///
/// Every field is optional; a missing label is a normal outcome and is
/// reported through the decision's issue list rather than as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub full_name: Option<String>,
    pub dob: Option<String>,
    pub doc_number: Option<String>,
    pub expiry_date: Option<String>,
}

impl ExtractedFields {
    /// A document is structurally valid once it names someone and carries a number
    pub fn is_valid(&self) -> bool {
        self.full_name.is_some() && self.doc_number.is_some()
    }
}

/// Output of an extraction strategy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub fields: ExtractedFields,
    /// Claimed name (case-folded) is a substring of the extracted full name
    pub name_match: bool,
}
