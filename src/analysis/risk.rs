//! Risk evaluation
//!
//! Decision table:
//!
//! | input                                  | result                        |
//! |----------------------------------------|-------------------------------|
//! | full name and document number present  | `is_valid`                    |
//! | more than 2 issues                     | `high` risk                   |
//! | 1 or 2 issues                          | `medium` risk                 |
//! | no issues                              | `low` risk                    |
//! | valid and low risk                     | confidence 90                 |
//! | valid otherwise                        | confidence 60                 |
//! | not valid                              | confidence 30                 |
//! | confidence >= 80 and low risk          | `APPROVED`                    |
//! | confidence >= 60                       | `UNDER_REVIEW`                |
//! | otherwise                              | `REJECTED`                    |

use crate::domain::{Confidence, Decision, ExtractedFields, Issue, RiskLevel, VerificationStatus};

/// Minimum confidence for automatic approval
pub const APPROVAL_THRESHOLD: u8 = 80;

/// Minimum confidence for manual review instead of rejection
pub const REVIEW_THRESHOLD: u8 = 60;

/// Turns extracted fields into a decision. Stateless and total.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskEngine;

impl RiskEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, fields: &ExtractedFields, name_match: bool) -> Decision {
        let is_valid = fields.is_valid();
        let issues = collect_issues(fields, name_match);
        let risk_level = risk_level(issues.len());
        let confidence = confidence(is_valid, risk_level);
        let status = status(confidence, risk_level);

        Decision {
            is_valid,
            confidence,
            risk_level,
            issues,
            status,
        }
    }
}

/// Issues in fixed order: name, date of birth, expiry
fn collect_issues(fields: &ExtractedFields, name_match: bool) -> Vec<Issue> {
    let mut issues = Vec::with_capacity(3);
    if !name_match {
        issues.push(Issue::NameMismatch);
    }
    if fields.dob.is_none() {
        issues.push(Issue::DobMissing);
    }
    if fields.expiry_date.is_none() {
        issues.push(Issue::ExpiryMissing);
    }
    issues
}

fn risk_level(issue_count: usize) -> RiskLevel {
    if issue_count > 2 {
        RiskLevel::High
    } else if issue_count > 0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn confidence(is_valid: bool, risk_level: RiskLevel) -> Confidence {
    if is_valid && risk_level == RiskLevel::Low {
        Confidence::High
    } else if is_valid {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

fn status(confidence: Confidence, risk_level: RiskLevel) -> VerificationStatus {
    let score = confidence.as_u8();
    if score >= APPROVAL_THRESHOLD && risk_level == RiskLevel::Low {
        VerificationStatus::Approved
    } else if score >= REVIEW_THRESHOLD {
        VerificationStatus::UnderReview
    } else {
        VerificationStatus::Rejected
    }
}
