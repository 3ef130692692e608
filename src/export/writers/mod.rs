//! Format encoders for export operations
//!
//! This module provides a unified interface for turning a validated export
//! request into the bytes of one artifact format (delimited text, JSON,
//! XLSX workbook, PDF report).

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::model::{DomainRecord, ExportConfig, ExportFormat, FieldCatalog};
use crate::projector::{FieldProjector, Projection, ProjectionStyle};

pub mod csv;
pub mod json;
pub mod pdf;
pub mod xlsx;

pub use csv::CsvEncoder;
pub use json::JsonEncoder;
pub use pdf::PdfEncoder;
pub use xlsx::XlsxEncoder;

/// Everything an encoder reads for one export
///
/// All references are shared and immutable: an encoder never changes the
/// configuration or the dataset it is given.
#[derive(Debug, Clone, Copy)]
pub struct EncodeJob<'a> {
    /// Validated export configuration
    pub config: &'a ExportConfig,
    /// Pre-filtered records, in output order
    pub records: &'a [DomainRecord],
    /// Field labels and types
    pub catalog: &'a FieldCatalog,
    /// Value formatting options
    pub projector: &'a FieldProjector,
    /// Timestamp written into metadata blocks
    pub generated_at: DateTime<Utc>,
    /// Resolved `(start, end)` of the exported period
    pub period: (Option<NaiveDate>, Option<NaiveDate>),
}

impl<'a> EncodeJob<'a> {
    /// Resolve the formatter registry for the selected fields
    pub fn plan(&self, style: ProjectionStyle) -> Projection {
        self.projector.plan(&self.config.fields, self.catalog, style)
    }

    /// Human readable period, e.g. `01/03/2024 - 31/03/2024`
    ///
    /// # Arguments
    /// * `date_format` - chrono format string for each bound
    ///
    /// # Returns
    /// * `Option<String>` - None when the period is fully open
    pub fn period_label(&self, date_format: &str) -> Option<String> {
        match self.period {
            (Some(start), Some(end)) => Some(format!(
                "{} - {}",
                start.format(date_format),
                end.format(date_format)
            )),
            (Some(start), None) => Some(format!("from {}", start.format(date_format))),
            (None, Some(end)) => Some(format!("until {}", end.format(date_format))),
            (None, None) => None,
        }
    }
}

/// Trait for encoding an export job into one artifact format
pub trait Encoder: Send + Sync {
    /// Format produced by this encoder
    fn format(&self) -> ExportFormat;

    /// Encode the job
    ///
    /// # Arguments
    /// * `job` - Configuration, records and formatting context
    ///
    /// # Returns
    /// * `Result<Vec<u8>>` - Artifact bytes or error
    fn encode(&self, job: &EncodeJob<'_>) -> Result<Vec<u8>>;
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::LazyLock;

    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    static CATALOG: LazyLock<FieldCatalog> = LazyLock::new(FieldCatalog::transactions);
    static PROJECTOR: LazyLock<FieldProjector> = LazyLock::new(FieldProjector::default);

    /// Fixed clock for reproducible output
    pub(crate) fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, 9, 30, 0).unwrap()
    }

    pub(crate) fn job_for<'a>(config: &'a ExportConfig, records: &'a [DomainRecord]) -> EncodeJob<'a> {
        EncodeJob {
            config,
            records,
            catalog: &CATALOG,
            projector: &PROJECTOR,
            generated_at: fixed_now(),
            period: (config.date_range.start, config.date_range.end),
        }
    }

    pub(crate) fn sample_records() -> Vec<DomainRecord> {
        let rows = vec![
            json!({
                "id": "TX-001", "date": "2024-01-15", "client": "Acme Imports",
                "collaborator": "Lucia", "operation_type": "buy", "currency_from": "USD",
                "currency_to": "MXN", "amount": 1500.0, "exchange_rate": 17.05,
                "converted_amount": 25575.0, "commission": 15.0, "commission_rate": 1.0,
                "status": "completed", "verified": true
            }),
            json!({
                "id": "TX-002", "date": "2024-02-03", "client": "Pérez, Juan",
                "collaborator": "Marco", "operation_type": "sell", "currency_from": "EUR",
                "currency_to": "USD", "amount": 820.5, "exchange_rate": 1.08,
                "converted_amount": 886.14, "commission": 8.2, "commission_rate": 1.0,
                "status": "pending", "verified": false
            }),
            json!({
                "id": "TX-003", "date": "2024-03-21", "client": "Nova Travel",
                "collaborator": "Lucia", "operation_type": "buy", "currency_from": "USD",
                "currency_to": "MXN", "amount": 2400.0, "exchange_rate": 16.9,
                "converted_amount": 40560.0, "commission": 36.0, "commission_rate": 1.5,
                "status": "error", "verified": false
            }),
            json!({
                "id": "TX-004", "date": "2024-03-28", "client": "Acme Imports",
                "collaborator": "Sofia", "operation_type": "buy", "currency_from": "GBP",
                "currency_to": "MXN", "amount": 600.0, "exchange_rate": 21.4,
                "converted_amount": 12840.0, "commission": 9.0, "commission_rate": 1.5,
                "status": "completed", "verified": true
            }),
        ];
        rows.into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect()
    }

    #[test]
    fn test_period_label() {
        let mut config = ExportConfig::new(ExportFormat::Text, vec!["id".into()]);
        config.date_range.start = NaiveDate::from_ymd_opt(2024, 3, 1);
        config.date_range.end = NaiveDate::from_ymd_opt(2024, 3, 31);
        let job = job_for(&config, &[]);
        assert_eq!(
            job.period_label("%d/%m/%Y").as_deref(),
            Some("01/03/2024 - 31/03/2024")
        );

        let open = ExportConfig::new(ExportFormat::Text, vec!["id".into()]);
        assert_eq!(job_for(&open, &[]).period_label("%d/%m/%Y"), None);
    }
}
