//! CSV ingestion and submission-configuration validation
//!
//! Parsing is all-or-nothing: a malformed file yields a ParseError and no
//! partial row set ever reaches the submission engine. Configuration
//! validation is the engine's precondition — no batch is created unless the
//! ID column, category, and tag value are set and mutually consistent.

use crate::services::registry::CategoryRegistry;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Parse failure; fatal to the submission attempt
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read CSV: {0}")]
    Malformed(#[from] csv::Error),

    #[error("CSV header row is missing or empty")]
    EmptyHeader,
}

/// Operator-chosen submission configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionConfig {
    /// CSV column whose cells become record identifiers
    pub id_column: String,
    pub category_key: String,
    pub tag_value: String,
    #[serde(default)]
    pub batch_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub file_name: String,
}

impl SubmissionConfig {
    /// Batch name falls back to the uploaded filename
    pub fn effective_batch_name(&self) -> String {
        self.batch_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.file_name)
            .to_string()
    }
}

/// Configuration failure; recoverable by correcting input
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("CSV contains no data rows")]
    NoRows,

    #[error("id column '{0}' is not one of the CSV headers")]
    UnknownIdColumn(String),

    #[error("unknown or inactive tag category '{0}'")]
    UnknownCategory(String),

    #[error("tag value '{value}' is not allowed for category '{category}'")]
    DisallowedTagValue { category: String, value: String },
}

/// Parsed upload: ordered header list plus one map per data row
#[derive(Debug, Clone)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub rows: Vec<BTreeMap<String, String>>,
}

impl ParsedCsv {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Parse an uploaded CSV byte source with a header row.
///
/// Rows shorter than the header list read missing cells as empty strings;
/// cells beyond the header list are dropped. Fully empty lines are skipped,
/// matching the upload tooling this service replaces.
pub fn parse_csv(bytes: &[u8]) -> Result<ParsedCsv, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(ParseError::Malformed)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(ParseError::EmptyHeader);
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;

        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let mut row = BTreeMap::new();
        for (i, header) in headers.iter().enumerate() {
            row.insert(header.clone(), record.get(i).unwrap_or("").to_string());
        }
        rows.push(row);
    }

    Ok(ParsedCsv { headers, rows })
}

/// Submission precondition: ID column, category, and tag value must all be
/// set and mutually consistent before a batch may be created
pub fn validate_config(
    parsed: &ParsedCsv,
    config: &SubmissionConfig,
    registry: &CategoryRegistry,
) -> Result<(), ValidationError> {
    if parsed.rows.is_empty() {
        return Err(ValidationError::NoRows);
    }

    if !parsed.headers.iter().any(|h| h == &config.id_column) {
        return Err(ValidationError::UnknownIdColumn(config.id_column.clone()));
    }

    let category = registry
        .get(&config.category_key)
        .ok_or_else(|| ValidationError::UnknownCategory(config.category_key.clone()))?;

    if !category.allows(&config.tag_value) {
        return Err(ValidationError::DisallowedTagValue {
            category: config.category_key.clone(),
            value: config.tag_value.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rostra_common::models::TagCategory;

    fn test_registry() -> CategoryRegistry {
        CategoryRegistry::new(vec![TagCategory {
            category_key: "enrollment_status".to_string(),
            display_name: "Enrollment Status".to_string(),
            allowed_values: vec!["active".to_string(), "termed".to_string()],
            is_active: true,
        }])
    }

    fn test_config() -> SubmissionConfig {
        SubmissionConfig {
            id_column: "npi".to_string(),
            category_key: "enrollment_status".to_string(),
            tag_value: "termed".to_string(),
            batch_name: None,
            notes: None,
            file_name: "term_sweep.csv".to_string(),
        }
    }

    #[test]
    fn parses_headers_and_rows() {
        let csv = "npi,name,payer\n1234567890,Dr. Smith,Acme Health\n9876543210,Dr. Jones,Beta Care\n";
        let parsed = parse_csv(csv.as_bytes()).unwrap();

        assert_eq!(parsed.headers, vec!["npi", "name", "payer"]);
        assert_eq!(parsed.row_count(), 2);
        assert_eq!(parsed.rows[0]["npi"], "1234567890");
        assert_eq!(parsed.rows[1]["payer"], "Beta Care");
    }

    #[test]
    fn handles_quoted_cells_with_commas() {
        let csv = "npi,name\n1234567890,\"Smith, Jane\"\n";
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.rows[0]["name"], "Smith, Jane");
    }

    #[test]
    fn short_rows_read_missing_cells_as_empty() {
        let csv = "npi,name,payer\n1234567890,Dr. Smith\n";
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.rows[0]["payer"], "");
    }

    #[test]
    fn skips_fully_empty_lines() {
        let csv = "npi,name\n1234567890,Dr. Smith\n,\n9876543210,Dr. Jones\n";
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.row_count(), 2);
    }

    #[test]
    fn unbalanced_quote_is_a_parse_error() {
        let csv = "npi,name\n123,\"unterminated\n456,ok\n";
        assert!(matches!(
            parse_csv(csv.as_bytes()),
            Err(ParseError::Malformed(_))
        ));
    }

    #[test]
    fn empty_input_has_no_header() {
        assert!(matches!(parse_csv(b""), Err(ParseError::EmptyHeader)));
    }

    #[test]
    fn valid_config_passes() {
        let parsed = parse_csv(b"npi,name\n1234567890,Dr. Smith\n").unwrap();
        assert!(validate_config(&parsed, &test_config(), &test_registry()).is_ok());
    }

    #[test]
    fn rejects_unknown_id_column() {
        let parsed = parse_csv(b"provider_id,name\n1,Dr. Smith\n").unwrap();
        let err = validate_config(&parsed, &test_config(), &test_registry()).unwrap_err();
        assert_eq!(err, ValidationError::UnknownIdColumn("npi".to_string()));
    }

    #[test]
    fn rejects_unknown_category() {
        let parsed = parse_csv(b"npi,name\n1234567890,Dr. Smith\n").unwrap();
        let mut config = test_config();
        config.category_key = "no_such_category".to_string();
        let err = validate_config(&parsed, &config, &test_registry()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownCategory("no_such_category".to_string())
        );
    }

    #[test]
    fn rejects_disallowed_tag_value() {
        let parsed = parse_csv(b"npi,name\n1234567890,Dr. Smith\n").unwrap();
        let mut config = test_config();
        config.tag_value = "suspended".to_string();
        assert!(matches!(
            validate_config(&parsed, &config, &test_registry()),
            Err(ValidationError::DisallowedTagValue { .. })
        ));
    }

    #[test]
    fn rejects_empty_row_set() {
        let parsed = parse_csv(b"npi,name\n").unwrap();
        let err = validate_config(&parsed, &test_config(), &test_registry()).unwrap_err();
        assert_eq!(err, ValidationError::NoRows);
    }

    #[test]
    fn batch_name_falls_back_to_filename() {
        let mut config = test_config();
        assert_eq!(config.effective_batch_name(), "term_sweep.csv");

        config.batch_name = Some("  ".to_string());
        assert_eq!(config.effective_batch_name(), "term_sweep.csv");

        config.batch_name = Some("Q3 termination sweep".to_string());
        assert_eq!(config.effective_batch_name(), "Q3 termination sweep");
    }
}
