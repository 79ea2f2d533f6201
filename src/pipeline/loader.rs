//! Content loading and file-level validation
//!
//! Decodes an uploaded blob into classification-ready text: CSV bytes are
//! split into rows with a relaxed reader, PDF bytes go through the external
//! text-extraction collaborator. Pure transform, no storage or network
//! calls happen here.

use crate::traits::PdfTextExtractor;
use crate::types::*;

/// Decoded statement content, ready for classification and extraction
#[derive(Debug, Clone, PartialEq)]
pub struct StatementContent {
    pub file_type: FileType,
    /// Full text used for classification: PDF text, or CSV rows joined
    /// with `", "` within a row and newlines between rows
    pub text: String,
    /// Ordered CSV rows; empty for PDF content
    pub rows: Vec<Vec<String>>,
}

/// Loads and validates uploaded statement files
pub struct ContentLoader;

impl ContentLoader {
    /// Decode an upload into [`StatementContent`].
    ///
    /// Rejects with `FileTooLarge` above [`MAX_FILE_BYTES`] (exactly the
    /// cap is accepted) and with `InvalidFileType` unless the extension or
    /// MIME type resolves to PDF or CSV.
    pub fn load(
        bytes: &[u8],
        file_name: &str,
        mime_type: &str,
        pdf_extractor: &dyn PdfTextExtractor,
    ) -> IngestResult<StatementContent> {
        if bytes.len() > MAX_FILE_BYTES {
            return Err(IngestError::FileTooLarge(bytes.len() as u64));
        }

        let file_type = FileType::resolve(file_name, mime_type)?;

        match file_type {
            FileType::Csv => {
                let rows = Self::split_csv_rows(bytes)?;
                let text = rows
                    .iter()
                    .map(|row| row.join(", "))
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(StatementContent {
                    file_type,
                    text,
                    rows,
                })
            }
            FileType::Pdf => {
                let text = pdf_extractor.extract_text(bytes)?;
                Ok(StatementContent {
                    file_type,
                    text,
                    rows: Vec::new(),
                })
            }
        }
    }

    /// Relaxed CSV row split: no header assumption, uneven column counts
    /// tolerated, empty rows skipped.
    fn split_csv_rows(bytes: &[u8]) -> IngestResult<Vec<Vec<String>>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| IngestError::Processing(format!("CSV parse error: {e}")))?;
            let row: Vec<String> = record.iter().map(|field| field.to_string()).collect();
            if row.iter().any(|field| !field.trim().is_empty()) {
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPdfText(&'static str);

    impl PdfTextExtractor for FixedPdfText {
        fn extract_text(&self, _bytes: &[u8]) -> IngestResult<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn accepts_exactly_the_size_cap() {
        let bytes = vec![b'a'; MAX_FILE_BYTES];
        let result = ContentLoader::load(&bytes, "big.pdf", "application/pdf", &FixedPdfText(""));
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_one_byte_over_the_cap() {
        let bytes = vec![b'a'; MAX_FILE_BYTES + 1];
        let err = ContentLoader::load(&bytes, "big.pdf", "application/pdf", &FixedPdfText(""))
            .unwrap_err();
        assert!(matches!(err, IngestError::FileTooLarge(_)));
    }

    #[test]
    fn rejects_unsupported_types_before_decoding() {
        let err = ContentLoader::load(b"hello", "notes.txt", "text/plain", &FixedPdfText(""))
            .unwrap_err();
        assert!(matches!(err, IngestError::InvalidFileType(_)));
    }

    #[test]
    fn splits_csv_rows_with_uneven_columns() {
        let csv = b"09Sep2024,Salary,14269.04\nsome,short\n,,\n21Sep2024,Payment,-100.00,extra\n";
        let content =
            ContentLoader::load(csv, "statement.csv", "text/csv", &FixedPdfText("")).unwrap();

        assert_eq!(content.file_type, FileType::Csv);
        assert_eq!(content.rows.len(), 3); // blank row dropped
        assert_eq!(content.rows[0], vec!["09Sep2024", "Salary", "14269.04"]);
        assert_eq!(content.rows[1].len(), 2);
        assert_eq!(content.rows[2].len(), 4);
        assert!(content.text.starts_with("09Sep2024, Salary, 14269.04\n"));
    }

    #[test]
    fn pdf_content_uses_the_text_extractor() {
        let content = ContentLoader::load(
            b"%PDF-1.4",
            "statement.pdf",
            "application/pdf",
            &FixedPdfText("Bank Statement\nFNB"),
        )
        .unwrap();

        assert_eq!(content.file_type, FileType::Pdf);
        assert_eq!(content.text, "Bank Statement\nFNB");
        assert!(content.rows.is_empty());
    }
}
