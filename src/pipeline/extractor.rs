//! Transaction extraction
//!
//! CSV statements are parsed deterministically row by row; PDF statements
//! go through the generative extraction oracle under a strict output
//! contract. Either way, only credit-direction (positive) amounts survive;
//! inbound deposits are the only transactions this domain cares about.

use bigdecimal::BigDecimal;
use tracing::debug;

use crate::pipeline::loader::StatementContent;
use crate::traits::{ExtractionOutcome, ExtractionService};
use crate::types::*;
use crate::utils::validation::{parse_amount, parse_statement_date};

/// Rows that parsed as transactions, plus a report of rows that looked like
/// transactions but carried unparseable amounts
#[derive(Debug, Clone, PartialEq)]
pub struct CsvParseReport {
    pub invalid_rows: usize,
    pub errors: Vec<String>,
}

/// Turns validated statement content into normalized transactions
pub struct TransactionExtractor;

impl TransactionExtractor {
    /// Extract credit transactions from statement content.
    pub async fn extract<X: ExtractionService>(
        content: &StatementContent,
        service: &X,
    ) -> IngestResult<Vec<RawTransaction>> {
        match content.file_type {
            FileType::Csv => {
                let (transactions, report) = Self::parse_csv_rows(&content.rows);
                if report.invalid_rows > 0 {
                    debug!(
                        invalid_rows = report.invalid_rows,
                        "skipped CSV rows with unparseable amounts"
                    );
                }
                Ok(transactions)
            }
            FileType::Pdf => Self::extract_with_model(&content.text, service).await,
        }
    }

    /// Deterministic CSV transaction parse.
    ///
    /// A row is a transaction candidate when it has at least three columns
    /// and its first column parses as a date; other rows (headers, balance
    /// summaries) are skipped silently. Candidates with unparseable amounts
    /// are counted in the report. Only credits (positive amounts) are kept.
    pub fn parse_csv_rows(rows: &[Vec<String>]) -> (Vec<RawTransaction>, CsvParseReport) {
        let mut transactions = Vec::new();
        let mut report = CsvParseReport {
            invalid_rows: 0,
            errors: Vec::new(),
        };

        for (index, row) in rows.iter().enumerate() {
            if row.len() < 3 {
                continue;
            }

            let Some(date) = parse_statement_date(&row[0]) else {
                continue;
            };

            let reference = row[1].clone();
            let Some(amount) = parse_amount(&row[2]) else {
                report.invalid_rows += 1;
                report
                    .errors
                    .push(format!("Row {}: invalid amount \"{}\"", index + 1, row[2]));
                continue;
            };

            if amount > BigDecimal::from(0) {
                transactions.push(RawTransaction {
                    date,
                    amount,
                    reference,
                });
            }
        }

        (transactions, report)
    }

    /// Extract transactions from PDF text via the oracle.
    ///
    /// An `Invalid` outcome yields an empty list rather than an error:
    /// classification already passed, so this is "nothing extractable", not
    /// a contradiction worth failing the run over. Transactions with empty
    /// references or unparseable dates are a contract violation and fail as
    /// `Processing`.
    async fn extract_with_model<X: ExtractionService>(
        text: &str,
        service: &X,
    ) -> IngestResult<Vec<RawTransaction>> {
        let prompt = format!(
            "Extract the following information from this bank statement:\n\
             - Date of transaction\n\
             - Reference or description\n\
             - Amount (positive numbers for credits)\n\n\
             Only include transactions that credit the account (positive amounts).\n\n\
             Bank statement content:\n{text}"
        );

        let outcome = service.extract(&prompt).await?;

        let extracted = match outcome {
            ExtractionOutcome::Invalid { reason } => {
                debug!(%reason, "extraction oracle found nothing extractable");
                return Ok(Vec::new());
            }
            ExtractionOutcome::Valid { transactions } => transactions,
        };

        let mut transactions = Vec::with_capacity(extracted.len());
        for entry in extracted {
            if entry.transaction_reference.trim().is_empty() {
                return Err(IngestError::Processing(
                    "extracted transaction has an empty reference".to_string(),
                ));
            }
            let date = parse_statement_date(&entry.date).ok_or_else(|| {
                IngestError::Processing(format!(
                    "extracted transaction has unparseable date \"{}\"",
                    entry.date
                ))
            })?;

            if entry.amount > BigDecimal::from(0) {
                transactions.push(RawTransaction {
                    date,
                    amount: entry.amount,
                    reference: entry.transaction_reference,
                });
            }
        }

        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ExtractedTransaction;
    use crate::utils::stubs::ScriptedExtractionService;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn csv_keeps_only_credits_and_normalizes_dates() {
        let (transactions, report) = TransactionExtractor::parse_csv_rows(&rows(&[
            &["09Sep2024", "Salary", "14269.04"],
            &["21Sep2024", "Payment", "-100.00"],
        ]));

        assert_eq!(transactions.len(), 1);
        assert_eq!(
            transactions[0].date,
            NaiveDate::from_ymd_opt(2024, 9, 9).unwrap()
        );
        assert_eq!(
            transactions[0].amount,
            BigDecimal::from_str("14269.04").unwrap()
        );
        assert_eq!(transactions[0].reference, "Salary");
        assert_eq!(report.invalid_rows, 0);
    }

    #[test]
    fn csv_skips_non_transaction_rows_silently() {
        let (transactions, report) = TransactionExtractor::parse_csv_rows(&rows(&[
            &["Date", "Description", "Amount"],
            &["Opening balance", "", "1000.00"],
            &["09Sep2024", "Rent received", "8,500.00"],
            &["too", "short"],
        ]));

        assert_eq!(transactions.len(), 1);
        assert_eq!(
            transactions[0].amount,
            BigDecimal::from_str("8500.00").unwrap()
        );
        assert_eq!(report.invalid_rows, 0);
    }

    #[test]
    fn csv_reports_unparseable_amounts() {
        let (transactions, report) = TransactionExtractor::parse_csv_rows(&rows(&[
            &["09Sep2024", "Salary", "not-a-number"],
            &["10Sep2024", "Refund", "50.00"],
        ]));

        assert_eq!(transactions.len(), 1);
        assert_eq!(report.invalid_rows, 1);
        assert!(report.errors[0].contains("Row 1"));
    }

    fn pdf_content() -> crate::pipeline::loader::StatementContent {
        crate::pipeline::loader::StatementContent {
            file_type: FileType::Pdf,
            text: "statement text".to_string(),
            rows: Vec::new(),
        }
    }

    #[tokio::test]
    async fn pdf_extraction_maps_oracle_output() {
        let service = ScriptedExtractionService::new().with_extraction(ExtractionOutcome::Valid {
            transactions: vec![
                ExtractedTransaction {
                    date: "2024-09-09".to_string(),
                    amount: BigDecimal::from_str("250.00").unwrap(),
                    transaction_reference: "ABC123".to_string(),
                },
                ExtractedTransaction {
                    date: "2024-09-10".to_string(),
                    amount: BigDecimal::from_str("-40.00").unwrap(),
                    transaction_reference: "fee".to_string(),
                },
            ],
        });

        let transactions = TransactionExtractor::extract(&pdf_content(), &service)
            .await
            .unwrap();

        // The debit never makes it through.
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].reference, "ABC123");
    }

    #[tokio::test]
    async fn invalid_outcome_yields_an_empty_list() {
        let service = ScriptedExtractionService::new().with_extraction(ExtractionOutcome::Invalid {
            reason: "no transactions found".to_string(),
        });

        let transactions = TransactionExtractor::extract(&pdf_content(), &service)
            .await
            .unwrap();
        assert!(transactions.is_empty());
    }

    #[tokio::test]
    async fn contract_violations_fail_the_run() {
        let service = ScriptedExtractionService::new().with_extraction(ExtractionOutcome::Valid {
            transactions: vec![ExtractedTransaction {
                date: "when the invoice cleared".to_string(),
                amount: BigDecimal::from(10),
                transaction_reference: "ref".to_string(),
            }],
        });

        let err = TransactionExtractor::extract(&pdf_content(), &service)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Processing(_)));
    }
}
