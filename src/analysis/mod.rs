//! Document analysis: field extraction and risk evaluation
//!
//! Both stages are pure; they take no locks and may run in parallel across
//! requests.

mod extractor;
mod risk;

pub use extractor::*;
pub use risk::*;

use crate::domain::{AnalysisReport, Decision, Extraction};

/// Combined output of extraction and evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub extraction: Extraction,
    pub decision: Decision,
    pub report: AnalysisReport,
}

/// Run `extractor` over the document and evaluate the result
pub fn analyze(
    extractor: &dyn Extractor,
    engine: &RiskEngine,
    document_text: &str,
    claimed_name: &str,
) -> Analysis {
    let extraction = extractor.extract(document_text, claimed_name);
    let decision = engine.evaluate(&extraction.fields, extraction.name_match);
    let report = AnalysisReport::new(&extraction, &decision);
    Analysis {
        extraction,
        decision,
        report,
    }
}
