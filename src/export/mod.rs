//! Export engine
//!
//! This module turns a validated export request into an artifact:
//! - Validation of the export configuration before any encoding
//! - Period resolution against the caller's clock
//! - Dispatch to the format encoder
//! - File naming and MIME type
//!
//! # Architecture
//!
//! 1. **ExportEngine**: owns one encoder per format, configured from settings
//! 2. **Encoder**: turns an [`EncodeJob`] into bytes (see [`writers`])
//! 3. **ProgressTracker**: optional coarse stage reporting for the CLI
//!
//! The engine performs no I/O. The same request always produces the same
//! artifact, since the timestamp is part of the request.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{ConfigInvalid, Result};
use crate::model::{Artifact, DomainRecord, ExportConfig, ExportFormat, FieldCatalog};
use crate::projector::FieldProjector;
use crate::theme::StatusPalette;
use crate::utils::filename::artifact_filename;

pub mod progress;
pub mod writers;

pub use progress::{ExportStage, ProgressTracker};
use writers::{CsvEncoder, EncodeJob, Encoder, JsonEncoder, PdfEncoder, XlsxEncoder};

/// One export to perform
#[derive(Debug, Clone, Copy)]
pub struct ExportRequest<'a> {
    /// Format, fields, period and presentation options
    pub config: &'a ExportConfig,
    /// Pre-filtered records, in output order
    pub records: &'a [DomainRecord],
    /// Labels and types of the exportable fields
    pub catalog: &'a FieldCatalog,
    /// Timestamp written into metadata and file names
    pub generated_at: DateTime<Utc>,
}

/// Progress sink for one job
#[derive(Clone, Copy)]
pub struct JobProgress<'a> {
    pub tracker: &'a ProgressTracker,
    pub job: &'a str,
}

impl JobProgress<'_> {
    fn advance(&self, stage: ExportStage) {
        self.tracker.advance(self.job, stage);
    }
}

/// Dispatches export requests to the format encoders
pub struct ExportEngine {
    projector: FieldProjector,
    csv: CsvEncoder,
    json: JsonEncoder,
    xlsx: XlsxEncoder,
    pdf: PdfEncoder,
}

impl ExportEngine {
    /// Create an engine from application settings
    ///
    /// # Arguments
    /// * `settings` - Formatting, workbook, report and theme settings
    pub fn new(settings: &Settings) -> Self {
        let palette = StatusPalette::from_config(&settings.theme);
        let format = &settings.format;
        Self {
            projector: FieldProjector::new(format),
            csv: CsvEncoder::new(format.delimiter, format.csv_bom),
            json: JsonEncoder::new(),
            xlsx: XlsxEncoder::new(
                &settings.workbook,
                &format.currency_symbol,
                &format.date_format,
                palette.clone(),
            ),
            pdf: PdfEncoder::new(&settings.report, format, palette),
        }
    }

    fn encoder(&self, format: ExportFormat) -> &dyn Encoder {
        match format {
            ExportFormat::Text => &self.csv,
            ExportFormat::Structured => &self.json,
            ExportFormat::Workbook => &self.xlsx,
            ExportFormat::Vector => &self.pdf,
        }
    }

    /// Produce the artifact for a request
    ///
    /// # Arguments
    /// * `request` - Configuration, records and clock
    ///
    /// # Returns
    /// * `Result<Artifact>` - Artifact, or the first validation or encoding error
    pub fn export(&self, request: &ExportRequest<'_>) -> Result<Artifact> {
        self.export_with_progress(request, None)
    }

    /// Produce the artifact, reporting stages to `progress`
    pub fn export_with_progress(
        &self,
        request: &ExportRequest<'_>,
        progress: Option<JobProgress<'_>>,
    ) -> Result<Artifact> {
        let config = request.config;
        config.validate()?;

        let today = request.generated_at.date_naive();
        let period = config.date_range.resolve(today);
        if let (Some(start), Some(end)) = period
            && start > end
        {
            return Err(ConfigInvalid::InvertedDateRange {
                start: start.to_string(),
                end: end.to_string(),
            }
            .into());
        }
        if let Some(p) = progress {
            p.advance(ExportStage::Validated);
        }

        let job = EncodeJob {
            config,
            records: request.records,
            catalog: request.catalog,
            projector: &self.projector,
            generated_at: request.generated_at,
            period,
        };
        debug!(
            "Exporting {} records as {} ({} fields)",
            request.records.len(),
            config.format,
            config.fields.len()
        );
        if let Some(p) = progress {
            p.advance(ExportStage::Projected);
        }

        let encoder = self.encoder(config.format);
        let bytes = encoder.encode(&job)?;
        if let Some(p) = progress {
            p.advance(ExportStage::Encoded);
        }

        let artifact = Artifact {
            filename: artifact_filename(config, period, request.generated_at),
            mime_type: encoder.format().mime_type(),
            bytes,
        };
        info!(
            "Export ready: {} ({} bytes, {} records)",
            artifact.filename,
            artifact.bytes.len(),
            request.records.len()
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;
    use crate::export::writers::tests::{fixed_now, sample_records};
    use crate::model::DatePreset;
    use chrono::NaiveDate;

    fn engine() -> ExportEngine {
        ExportEngine::new(&Settings::default())
    }

    fn run(config: &ExportConfig, records: &[DomainRecord]) -> Result<Artifact> {
        let catalog = FieldCatalog::transactions();
        engine().export(&ExportRequest {
            config,
            records,
            catalog: &catalog,
            generated_at: fixed_now(),
        })
    }

    fn fields() -> Vec<String> {
        vec!["id".into(), "client".into(), "amount".into(), "status".into()]
    }

    #[test]
    fn test_empty_fields_rejected_before_encoding() {
        let config = ExportConfig::new(ExportFormat::Vector, vec![]);
        match run(&config, &sample_records()) {
            Err(ExportError::ConfigInvalid(ConfigInvalid::EmptyFields)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut config = ExportConfig::new(ExportFormat::Text, fields());
        config.date_range.start = NaiveDate::from_ymd_opt(2024, 3, 31);
        config.date_range.end = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert!(matches!(
            run(&config, &sample_records()),
            Err(ExportError::ConfigInvalid(ConfigInvalid::InvertedDateRange { .. }))
        ));
    }

    #[test]
    fn test_start_after_preset_end_rejected() {
        let mut config = ExportConfig::new(ExportFormat::Text, fields());
        config.date_range.preset = Some(DatePreset::LastMonth);
        config.date_range.start = NaiveDate::from_ymd_opt(2024, 4, 1);
        assert!(matches!(
            run(&config, &sample_records()),
            Err(ExportError::ConfigInvalid(ConfigInvalid::InvertedDateRange { .. }))
        ));
    }

    #[test]
    fn test_csv_artifact() {
        let records = sample_records();
        let config = ExportConfig::new(ExportFormat::Text, fields());
        let artifact = run(&config, &records).unwrap();
        assert_eq!(artifact.mime_type, "text/csv");
        assert_eq!(artifact.filename, "transactions-export-20240402-093000.csv");
        let text = String::from_utf8(artifact.bytes).unwrap();
        assert_eq!(text.lines().count(), records.len() + 1);
    }

    #[test]
    fn test_preset_resolves_against_clock() {
        let mut config = ExportConfig::new(ExportFormat::Structured, fields());
        config.date_range.preset = Some(DatePreset::LastMonth);
        config.include_metadata = true;
        let artifact = run(&config, &sample_records()).unwrap();
        assert_eq!(
            artifact.filename,
            "transactions-export-2024-03-01_2024-03-31.json"
        );
        let doc: serde_json::Value = serde_json::from_slice(&artifact.bytes).unwrap();
        assert_eq!(doc["metadata"]["date_range"]["start"], "2024-03-01");
    }

    #[test]
    fn test_every_format_produces_bytes() {
        let records = sample_records();
        for format in [
            ExportFormat::Text,
            ExportFormat::Structured,
            ExportFormat::Workbook,
            ExportFormat::Vector,
        ] {
            let config = ExportConfig::new(format, fields());
            let artifact = run(&config, &records).unwrap();
            assert!(!artifact.bytes.is_empty());
            assert_eq!(artifact.mime_type, format.mime_type());
            assert!(artifact.filename.ends_with(format.extension()));
        }
    }

    #[test]
    fn test_progress_reports_three_stages() {
        let records = sample_records();
        let catalog = FieldCatalog::transactions();
        let config = ExportConfig::new(ExportFormat::Text, fields());
        let tracker = ProgressTracker::new(1, false);
        engine()
            .export_with_progress(
                &ExportRequest {
                    config: &config,
                    records: &records,
                    catalog: &catalog,
                    generated_at: fixed_now(),
                },
                Some(JobProgress {
                    tracker: &tracker,
                    job: "csv",
                }),
            )
            .unwrap();
        assert_eq!(tracker.completed(), ExportStage::COUNT);
    }
}
