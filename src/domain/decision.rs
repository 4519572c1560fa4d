//! Risk decisions and the analysis report built around them

use serde::{Deserialize, Serialize};

use super::{Confidence, ExtractedFields, Extraction, Issue, RiskLevel, VerificationStatus};

/// Output of risk evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub is_valid: bool,
    pub confidence: Confidence,
    pub risk_level: RiskLevel,
    /// Ordered: name, date of birth, expiry
    pub issues: Vec<Issue>,
    pub status: VerificationStatus,
}

/// Whether the document states an expiry date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryStatus {
    Valid,
    Unknown,
}

/// Recommended follow-up for an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextStep {
    Approve,
    Review,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub is_valid: bool,
    pub confidence: Confidence,
    pub name_match: bool,
    pub expiry_status: ExpiryStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub risk_level: RiskLevel,
    pub issues: Vec<Issue>,
    /// Reserved for strategies that detect tampering; always empty for
    /// pattern extraction
    #[serde(default)]
    pub fraud_indicators: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendations {
    pub suggestions: Vec<String>,
    pub next_step: NextStep,
}

/// Full analysis returned to callers and persisted with the audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub extraction: ExtractedFields,
    pub validation: ValidationSummary,
    pub risk_analysis: RiskAnalysis,
    pub recommendations: Recommendations,
}

impl AnalysisReport {
    pub fn new(extraction: &Extraction, decision: &Decision) -> Self {
        let suggestion = if decision.is_valid {
            "Document appears valid"
        } else {
            "Please review document"
        };
        let next_step = if decision.is_valid && decision.risk_level == RiskLevel::Low {
            NextStep::Approve
        } else {
            NextStep::Review
        };
        let expiry_status = if extraction.fields.expiry_date.is_some() {
            ExpiryStatus::Valid
        } else {
            ExpiryStatus::Unknown
        };

        Self {
            extraction: extraction.fields.clone(),
            validation: ValidationSummary {
                is_valid: decision.is_valid,
                confidence: decision.confidence,
                name_match: extraction.name_match,
                expiry_status,
            },
            risk_analysis: RiskAnalysis {
                risk_level: decision.risk_level,
                issues: decision.issues.clone(),
                fraud_indicators: Vec::new(),
            },
            recommendations: Recommendations {
                suggestions: vec![suggestion.to_string()],
                next_step,
            },
        }
    }
}
