//! Property-based tests using proptest.
//!
//! These tests verify invariants that should hold for any valid input.

use proptest::prelude::*;

use gracker_kyc::analysis::{Extractor, PatternExtractor, RiskEngine};
use gracker_kyc::crypto::{canonicalize_json, derive_subject_id, SUBJECT_ID_LEN};
use gracker_kyc::domain::{
    Block, BlockPayload, Confidence, ExtractedFields, Issue, RiskLevel, VerificationPayload,
    VerificationStatus,
};
use gracker_kyc::infra::verify_chain;

// ============================================================================
// Custom Strategies
// ============================================================================

/// Arbitrary multi-line document text, sometimes with labelled lines
fn arb_document() -> impl Strategy<Value = String> {
    let line = prop_oneof![
        "[A-Za-z ]{0,20}".prop_map(|v| format!("Name: {v}")),
        "[0-9]{4}-[0-9]{2}-[0-9]{2}".prop_map(|v| format!("DOB: {v}")),
        "[A-Z0-9]{1,10}".prop_map(|v| format!("Number: {v}")),
        "[0-9]{4}-[0-9]{2}-[0-9]{2}".prop_map(|v| format!("Expiry: {v}")),
        ".{0,40}",
    ];
    prop::collection::vec(line, 0..8).prop_map(|lines| lines.join("\n"))
}

fn arb_fields() -> impl Strategy<Value = ExtractedFields> {
    (
        prop::option::of("[A-Za-z ]{1,20}"),
        prop::option::of("[0-9-]{10}"),
        prop::option::of("[A-Z0-9]{1,10}"),
        prop::option::of("[0-9-]{10}"),
    )
        .prop_map(|(full_name, dob, doc_number, expiry_date)| ExtractedFields {
            full_name,
            dob,
            doc_number,
            expiry_date,
        })
}

fn arb_payload() -> impl Strategy<Value = BlockPayload> {
    ("[a-z]{1,12}", "[a-z]{1,8}@[a-z]{1,8}\\.com", any::<bool>()).prop_map(
        |(name, email, approved)| {
            BlockPayload::Verification(VerificationPayload {
                subject_id: derive_subject_id(&email),
                name,
                email,
                doc_type: "passport".to_string(),
                status: if approved {
                    VerificationStatus::Approved
                } else {
                    VerificationStatus::UnderReview
                },
                confidence: if approved {
                    Confidence::High
                } else {
                    Confidence::Medium
                },
                risk_level: if approved {
                    RiskLevel::Low
                } else {
                    RiskLevel::Medium
                },
                issues: if approved {
                    vec![]
                } else {
                    vec![Issue::ExpiryMissing]
                },
                requested_at: gracker_kyc::domain::now_micros(),
            })
        },
    )
}

// ============================================================================
// Extraction
// ============================================================================

proptest! {
    #[test]
    fn prop_extraction_is_deterministic(text in arb_document(), claimed in "[A-Za-z ]{0,12}") {
        let extractor = PatternExtractor::new();
        let first = extractor.extract(&text, &claimed);
        let second = extractor.extract(&text, &claimed);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_extracted_values_are_trimmed_and_single_line(text in arb_document()) {
        let fields = PatternExtractor::new().extract_fields(&text);
        for value in [&fields.full_name, &fields.dob, &fields.doc_number, &fields.expiry_date]
            .into_iter()
            .flatten()
        {
            prop_assert!(!value.is_empty());
            prop_assert_eq!(value.trim(), value.as_str());
            prop_assert!(!value.contains('\n'));
        }
    }

    #[test]
    fn prop_name_never_matches_without_full_name(claimed in ".{0,12}", text in "[0-9 ]{0,40}") {
        let out = PatternExtractor::new().extract(&text, &claimed);
        prop_assert!(out.fields.full_name.is_none());
        prop_assert!(!out.name_match);
    }
}

// ============================================================================
// Risk evaluation
// ============================================================================

proptest! {
    #[test]
    fn prop_decision_follows_table(fields in arb_fields(), name_match in any::<bool>()) {
        let decision = RiskEngine::new().evaluate(&fields, name_match);

        let expected_valid = fields.full_name.is_some() && fields.doc_number.is_some();
        prop_assert_eq!(decision.is_valid, expected_valid);

        let mut expected_issues = Vec::new();
        if !name_match { expected_issues.push(Issue::NameMismatch); }
        if fields.dob.is_none() { expected_issues.push(Issue::DobMissing); }
        if fields.expiry_date.is_none() { expected_issues.push(Issue::ExpiryMissing); }
        prop_assert_eq!(&decision.issues, &expected_issues);

        let expected_risk = match expected_issues.len() {
            0 => RiskLevel::Low,
            1 | 2 => RiskLevel::Medium,
            _ => RiskLevel::High,
        };
        prop_assert_eq!(decision.risk_level, expected_risk);

        let expected_confidence = match (expected_valid, expected_risk) {
            (true, RiskLevel::Low) => Confidence::High,
            (true, _) => Confidence::Medium,
            (false, _) => Confidence::Low,
        };
        prop_assert_eq!(decision.confidence, expected_confidence);

        let expected_status = match expected_confidence {
            Confidence::High if expected_risk == RiskLevel::Low => VerificationStatus::Approved,
            Confidence::High | Confidence::Medium => VerificationStatus::UnderReview,
            Confidence::Low => VerificationStatus::Rejected,
        };
        prop_assert_eq!(decision.status, expected_status);
    }
}

// ============================================================================
// Hashing and chaining
// ============================================================================

proptest! {
    #[test]
    fn prop_subject_id_is_stable_hex(email in ".{0,40}") {
        let a = derive_subject_id(&email);
        let b = derive_subject_id(&email);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.len(), SUBJECT_ID_LEN);
        prop_assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn prop_canonical_json_is_key_order_independent(a in any::<i64>(), b in "[a-z]{0,10}") {
        let one = serde_json::json!({ "a": a, "b": b });
        let two: serde_json::Value =
            serde_json::from_str(&format!(r#"{{"b":{},"a":{}}}"#, serde_json::to_string(&b).unwrap(), a)).unwrap();
        prop_assert_eq!(canonicalize_json(&one).unwrap(), canonicalize_json(&two).unwrap());
    }

    #[test]
    fn prop_built_chain_verifies(payloads in prop::collection::vec(arb_payload(), 0..12)) {
        let mut blocks = vec![Block::genesis(gracker_kyc::domain::now_micros()).unwrap()];
        for payload in payloads {
            let parent = blocks.last().unwrap();
            let next = parent.successor(gracker_kyc::domain::now_micros(), payload).unwrap();
            blocks.push(next);
        }

        prop_assert!(verify_chain(&blocks).is_ok());
        for pair in blocks.windows(2) {
            prop_assert_eq!(&pair[1].previous_hash, &pair[0].hash);
            prop_assert_eq!(pair[1].index, pair[0].index + 1);
        }
        for block in &blocks {
            prop_assert!(block.has_valid_hash());
        }
    }

    #[test]
    fn prop_any_altered_block_breaks_chain(
        payloads in prop::collection::vec(arb_payload(), 1..8),
        pick in any::<prop::sample::Index>(),
        new_name in "[A-Z]{1,8}",
    ) {
        let mut blocks = vec![Block::genesis(gracker_kyc::domain::now_micros()).unwrap()];
        for payload in payloads {
            let next = blocks
                .last()
                .unwrap()
                .successor(gracker_kyc::domain::now_micros(), payload)
                .unwrap();
            blocks.push(next);
        }

        let target = 1 + pick.index(blocks.len() - 1);
        if let BlockPayload::Verification(p) = &mut blocks[target].payload {
            p.name = new_name;
        }

        let violation = verify_chain(&blocks).unwrap_err();
        prop_assert_eq!(violation.index, target as u64);
    }
}
