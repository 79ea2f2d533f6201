//! Statement classification
//!
//! Cheap deterministic heuristics run first; the generative model is only
//! consulted for PDF content that the heuristics could not confirm. The
//! model's verdict is gated by a hard confidence threshold.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::pipeline::loader::StatementContent;
use crate::traits::ExtractionService;
use crate::types::*;

/// Minimum content length before the AI fallback is worth a model call.
/// Shorter content cannot plausibly contain a full statement.
pub const MIN_AI_CONTENT_CHARS: usize = 1500;

/// The model's verdict is accepted only with confidence strictly above
/// this value. Tune only with explicit test coverage.
pub const AI_CONFIDENCE_THRESHOLD: f64 = 0.8;

const BANKING_TERMS: [&str; 13] = [
    "statement",
    "account",
    "balance",
    "transaction",
    "deposit",
    "withdrawal",
    "opening balance",
    "closing balance",
    "available balance",
    "branch code",
    "sort code",
    "iban",
    "swift",
];

const BANK_NAMES: [&str; 13] = [
    "absa",
    "fnb",
    "first national bank",
    "standard bank",
    "nedbank",
    "capitec",
    "investec",
    "tymebank",
    "african bank",
    "discovery bank",
    "bidvest",
    "barclays",
    "hsbc",
];

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b\d{1,2}[-/]\d{1,2}[-/]\d{4}\b|\b\d{4}[-/]\d{1,2}[-/]\d{1,2}\b|\b\d{1,2}\s?(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s?\d{4}",
    )
    .expect("hardcoded regex should be valid")
});

static CURRENCY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:ZAR|R|USD|\$|€|£)\s?\d[\d,]*\.\d{2}|\d[\d,]*\.\d{2}\s?(?:ZAR|R|USD|\$|€|£)")
        .expect("hardcoded regex should be valid")
});

/// Outcome of the deterministic checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicVerdict {
    pub accepted: bool,
    pub reason: String,
}

/// Deterministic, model-free plausibility checks
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    /// Run the four independent checks; all must pass for acceptance.
    pub fn evaluate(text: &str) -> HeuristicVerdict {
        let lowered = text.to_lowercase();

        let checks: [(&str, bool); 4] = [
            (
                "no banking terminology found",
                BANKING_TERMS.iter().any(|term| lowered.contains(term)),
            ),
            (
                "no known bank name found",
                BANK_NAMES.iter().any(|name| lowered.contains(name)),
            ),
            ("no date patterns found", DATE_PATTERN.is_match(text)),
            (
                "no currency amounts found",
                CURRENCY_PATTERN.is_match(text),
            ),
        ];

        for (reason, passed) in checks {
            if !passed {
                return HeuristicVerdict {
                    accepted: false,
                    reason: reason.to_string(),
                };
            }
        }

        HeuristicVerdict {
            accepted: true,
            reason: "heuristic checks passed".to_string(),
        }
    }
}

/// Full classification: heuristics with AI fallback for PDF content
pub struct StatementClassifier;

impl StatementClassifier {
    /// Confirm that the content plausibly is a bank statement.
    ///
    /// A heuristic accept short-circuits without a model call. CSV content
    /// that fails the heuristics is rejected outright; PDF content falls
    /// back to the model only when long enough to plausibly hold a full
    /// statement.
    pub async fn classify<X: ExtractionService>(
        content: &StatementContent,
        service: &X,
    ) -> IngestResult<()> {
        let verdict = HeuristicClassifier::evaluate(&content.text);
        if verdict.accepted {
            debug!(reason = %verdict.reason, "heuristic classification accepted");
            return Ok(());
        }

        if content.file_type == FileType::Csv {
            return Err(IngestError::NotABankStatement(verdict.reason));
        }

        let char_count = content.text.chars().count();
        if char_count < MIN_AI_CONTENT_CHARS {
            return Err(IngestError::NotABankStatement(format!(
                "content too short to be a bank statement ({char_count} characters)"
            )));
        }

        // Cost control: the model sees roughly the first half of the content.
        let sample: String = content.text.chars().take(char_count / 2).collect();
        let prompt = format!(
            "Determine whether the following document is a bank statement. \
             Respond with isValid, a short message, and a confidence between 0 and 1.\n\n{sample}"
        );

        let verdict = service.classify(&prompt).await?;
        debug!(
            is_valid = verdict.is_valid,
            confidence = verdict.confidence,
            "model classification verdict"
        );

        if verdict.is_valid && verdict.confidence > AI_CONFIDENCE_THRESHOLD {
            Ok(())
        } else {
            Err(IngestError::NotABankStatement(verdict.message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::stubs::ScriptedExtractionService;

    const STATEMENT_TEXT: &str =
        "FNB Cheque Account Statement\n01/09/2024 Opening balance R 1,000.00\n09/09/2024 Salary deposit R 14,269.04";

    fn pdf_content(text: &str) -> StatementContent {
        StatementContent {
            file_type: FileType::Pdf,
            text: text.to_string(),
            rows: Vec::new(),
        }
    }

    fn csv_content(text: &str) -> StatementContent {
        StatementContent {
            file_type: FileType::Csv,
            text: text.to_string(),
            rows: Vec::new(),
        }
    }

    #[test]
    fn heuristics_accept_a_plausible_statement() {
        let verdict = HeuristicClassifier::evaluate(STATEMENT_TEXT);
        assert!(verdict.accepted, "{}", verdict.reason);
    }

    #[test]
    fn heuristics_require_every_check() {
        // Bank name and dates but no currency amounts.
        let verdict =
            HeuristicClassifier::evaluate("Nedbank account statement dated 01/09/2024");
        assert!(!verdict.accepted);
        assert_eq!(verdict.reason, "no currency amounts found");

        let verdict = HeuristicClassifier::evaluate("grocery list: eggs, bread, milk");
        assert!(!verdict.accepted);
    }

    #[tokio::test]
    async fn heuristic_accept_short_circuits_the_model() {
        let service = ScriptedExtractionService::new();
        StatementClassifier::classify(&pdf_content(STATEMENT_TEXT), &service)
            .await
            .unwrap();
        assert_eq!(service.classify_calls(), 0);
    }

    #[tokio::test]
    async fn csv_failures_never_reach_the_model() {
        let service = ScriptedExtractionService::new();
        let err = StatementClassifier::classify(&csv_content("a, b, c"), &service)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::NotABankStatement(_)));
        assert_eq!(service.classify_calls(), 0);
    }

    #[tokio::test]
    async fn short_pdf_content_is_rejected_without_a_model_call() {
        let service = ScriptedExtractionService::new();
        let text = "x".repeat(MIN_AI_CONTENT_CHARS - 1);
        let err = StatementClassifier::classify(&pdf_content(&text), &service)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::NotABankStatement(_)));
        assert_eq!(service.classify_calls(), 0);
    }

    #[tokio::test]
    async fn long_pdf_content_triggers_the_fallback() {
        let service = ScriptedExtractionService::new().with_classification(
            crate::traits::ClassificationVerdict {
                is_valid: true,
                message: "looks like a statement".to_string(),
                confidence: 0.95,
            },
        );
        let text = "x".repeat(MIN_AI_CONTENT_CHARS);
        StatementClassifier::classify(&pdf_content(&text), &service)
            .await
            .unwrap();
        assert_eq!(service.classify_calls(), 1);
    }

    #[tokio::test]
    async fn confidence_threshold_is_strict() {
        let text = "x".repeat(MIN_AI_CONTENT_CHARS);

        let service = ScriptedExtractionService::new().with_classification(
            crate::traits::ClassificationVerdict {
                is_valid: true,
                message: "borderline".to_string(),
                confidence: 0.80,
            },
        );
        let err = StatementClassifier::classify(&pdf_content(&text), &service)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::NotABankStatement(_)));

        let service = ScriptedExtractionService::new().with_classification(
            crate::traits::ClassificationVerdict {
                is_valid: true,
                message: "just over".to_string(),
                confidence: 0.801,
            },
        );
        StatementClassifier::classify(&pdf_content(&text), &service)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn model_failure_is_a_processing_error() {
        let text = "x".repeat(MIN_AI_CONTENT_CHARS);
        let service = ScriptedExtractionService::new()
            .with_classification_error(IngestError::Processing("model timeout".to_string()));

        let err = StatementClassifier::classify(&pdf_content(&text), &service)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Processing(_)));
    }
}
