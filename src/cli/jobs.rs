//! Batch export runs for the command line
//!
//! Every job is one [`ExportConfig`] exported against the same record set.
//! Jobs run in parallel on the blocking pool, then their artifacts are
//! written into a single output directory.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::{Alignment, Modify, Style, object::Rows};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::error::{ExportError, Result};
use crate::export::{ExportEngine, ExportRequest, JobProgress, ProgressTracker};
use crate::model::{Artifact, DomainRecord, ExportConfig, FieldCatalog};
use crate::utils::convert::format_bytes;
use crate::utils::fs::ensure_dir_exists;

/// One export to run in a batch
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Name shown in progress output and the summary
    pub name: String,
    pub config: ExportConfig,
    pub catalog: FieldCatalog,
}

impl ExportJob {
    /// Create a job, picking the built-in catalog for the data type unless
    /// one is supplied
    pub fn new(
        name: impl Into<String>,
        config: ExportConfig,
        catalog: Option<&FieldCatalog>,
    ) -> Self {
        let catalog = match catalog {
            Some(c) => c.clone(),
            None => FieldCatalog::builtin(&config.data_type).unwrap_or_default(),
        };
        Self {
            name: name.into(),
            config,
            catalog,
        }
    }
}

/// Artifact written to disk
#[derive(Debug)]
pub struct WrittenArtifact {
    pub path: PathBuf,
    pub mime_type: &'static str,
    pub size: u64,
}

/// Result of one job after writing
#[derive(Debug)]
pub struct JobOutcome {
    pub name: String,
    pub result: Result<WrittenArtifact>,
}

fn invalid_data(msg: impl Into<String>) -> ExportError {
    ExportError::Io(io::Error::new(io::ErrorKind::InvalidData, msg.into()))
}

/// Parse the record set handed to `export`
///
/// Accepts a JSON array of objects or an object with a `data` array.
/// Rows that are not objects are skipped with a warning.
pub fn parse_records(content: &str) -> Result<Vec<DomainRecord>> {
    let rows = match serde_json::from_str::<Value>(content)? {
        Value::Array(rows) => rows,
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(rows)) => rows,
            _ => return Err(invalid_data("expected an object with a \"data\" array")),
        },
        _ => return Err(invalid_data("expected an array of records")),
    };

    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        match row {
            Value::Object(map) => records.push(map),
            other => warn!("Skipping record {index}: expected an object, found {other}"),
        }
    }
    Ok(records)
}

/// Read the record set from a JSON file
pub async fn load_records(path: &Path) -> Result<Vec<DomainRecord>> {
    let content = tokio::fs::read_to_string(path).await?;
    let records = parse_records(&content)?;
    debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Read one export configuration from a JSON file
///
/// # Returns
/// * `Result<(String, ExportConfig)>` - Job name (the file stem) and configuration
pub async fn load_job_config(path: &Path) -> Result<(String, ExportConfig)> {
    let content = tokio::fs::read_to_string(path).await?;
    let config = ExportConfig::from_json(&content)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok((name, config))
}

/// Read a field catalog from a JSON file
pub async fn load_catalog(path: &Path) -> Result<FieldCatalog> {
    let content = tokio::fs::read_to_string(path).await?;
    FieldCatalog::from_json(&content)
}

/// Run every job against the same records
///
/// Results come back in job order regardless of completion order.
pub async fn run_jobs(
    engine: Arc<ExportEngine>,
    jobs: Vec<ExportJob>,
    records: Arc<Vec<DomainRecord>>,
    generated_at: DateTime<Utc>,
    tracker: Arc<ProgressTracker>,
) -> Vec<(String, Result<Artifact>)> {
    let names: Vec<String> = jobs.iter().map(|j| j.name.clone()).collect();
    let mut set = JoinSet::new();

    for (index, job) in jobs.into_iter().enumerate() {
        let engine = Arc::clone(&engine);
        let records = Arc::clone(&records);
        let tracker = Arc::clone(&tracker);
        set.spawn_blocking(move || {
            let request = ExportRequest {
                config: &job.config,
                records: records.as_slice(),
                catalog: &job.catalog,
                generated_at,
            };
            let progress = JobProgress {
                tracker: &tracker,
                job: &job.name,
            };
            (index, engine.export_with_progress(&request, Some(progress)))
        });
    }

    let mut results: Vec<Option<Result<Artifact>>> = names.iter().map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => error!("Export task did not complete: {e}"),
        }
    }

    names
        .into_iter()
        .zip(results)
        .map(|(name, result)| {
            let result =
                result.unwrap_or_else(|| Err(ExportError::encode_failed("export", "task aborted")));
            (name, result)
        })
        .collect()
}

/// Pick a path in `dir` for `filename` that no earlier job of this run used
fn unique_path(dir: &Path, filename: &str, taken: &mut HashSet<String>) -> PathBuf {
    if taken.insert(filename.to_string()) {
        return dir.join(filename);
    }
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{ext}")),
        None => (filename, String::new()),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{stem}-{n}{ext}");
        if taken.insert(candidate.clone()) {
            return dir.join(candidate);
        }
        n += 1;
    }
}

/// Write successful artifacts into `output_dir`
pub async fn write_artifacts(
    results: Vec<(String, Result<Artifact>)>,
    output_dir: &Path,
) -> Result<Vec<JobOutcome>> {
    ensure_dir_exists(output_dir).await?;

    let mut taken = HashSet::new();
    let mut outcomes = Vec::with_capacity(results.len());
    for (name, result) in results {
        let result = match result {
            Ok(artifact) => {
                let path = unique_path(output_dir, &artifact.filename, &mut taken);
                write_artifact(&artifact, path).await
            }
            Err(e) => Err(e),
        };
        outcomes.push(JobOutcome { name, result });
    }
    Ok(outcomes)
}

async fn write_artifact(artifact: &Artifact, path: PathBuf) -> Result<WrittenArtifact> {
    tokio::fs::write(&path, &artifact.bytes).await?;
    debug!("Wrote {} ({} bytes)", path.display(), artifact.bytes.len());
    Ok(WrittenArtifact {
        path,
        mime_type: artifact.mime_type,
        size: artifact.bytes.len() as u64,
    })
}

/// Render the per-job summary
pub fn summary_table(outcomes: &[JobOutcome]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Job", "Status", "File", "Type", "Size"]);
    for outcome in outcomes {
        match &outcome.result {
            Ok(written) => builder.push_record([
                outcome.name.clone(),
                "ok".to_string(),
                written.path.display().to_string(),
                written.mime_type.to_string(),
                format_bytes(written.size),
            ]),
            Err(e) => builder.push_record([
                outcome.name.clone(),
                "failed".to_string(),
                e.to_string(),
                String::new(),
                String::new(),
            ]),
        }
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::export::writers::tests::{fixed_now, sample_records};
    use crate::model::ExportFormat;

    fn job(name: &str, format: ExportFormat) -> ExportJob {
        let config = ExportConfig::new(
            format,
            vec!["id".into(), "client".into(), "amount".into(), "status".into()],
        );
        ExportJob::new(name, config, None)
    }

    #[test]
    fn test_parse_records_array_and_wrapper() {
        let records = parse_records(r#"[{"id": "a"}, 3, {"id": "b"}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["id"], "b");

        let records = parse_records(r#"{"data": [{"id": "a"}]}"#).unwrap();
        assert_eq!(records.len(), 1);

        assert!(parse_records(r#"{"rows": []}"#).is_err());
        assert!(parse_records("42").is_err());
        assert!(parse_records("[").is_err());
    }

    #[test]
    fn test_job_uses_builtin_catalog() {
        let job = job("csv", ExportFormat::Text);
        assert!(job.catalog.get("amount").is_some());

        let mut config = ExportConfig::new(ExportFormat::Text, vec!["x".into()]);
        config.data_type = "unknown".into();
        assert!(ExportJob::new("x", config, None).catalog.fields.is_empty());
    }

    #[test]
    fn test_unique_path_suffixes_repeats() {
        let dir = Path::new("/out");
        let mut taken = HashSet::new();
        assert_eq!(unique_path(dir, "a.csv", &mut taken), dir.join("a.csv"));
        assert_eq!(unique_path(dir, "a.csv", &mut taken), dir.join("a-2.csv"));
        assert_eq!(unique_path(dir, "a.csv", &mut taken), dir.join("a-3.csv"));
        assert_eq!(unique_path(dir, "noext", &mut taken), dir.join("noext"));
        assert_eq!(unique_path(dir, "noext", &mut taken), dir.join("noext-2"));
    }

    #[tokio::test]
    async fn test_run_jobs_writes_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(ExportEngine::new(&Settings::default()));
        let tracker = Arc::new(ProgressTracker::new(3, false));
        let mut broken = job("broken", ExportFormat::Structured);
        broken.config.fields.clear();

        let results = run_jobs(
            engine,
            vec![
                job("csv", ExportFormat::Text),
                broken,
                job("pdf", ExportFormat::Vector),
            ],
            Arc::new(sample_records()),
            fixed_now(),
            Arc::clone(&tracker),
        )
        .await;
        let names: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["csv", "broken", "pdf"]);

        let outcomes = write_artifacts(results, &dir.path().join("out")).await.unwrap();
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        let pdf = outcomes[2].result.as_ref().unwrap();
        assert_eq!(pdf.mime_type, "application/pdf");
        assert!(pdf.path.exists());
        assert_eq!(std::fs::metadata(&pdf.path).unwrap().len(), pdf.size);

        let table = summary_table(&outcomes);
        assert!(table.contains("broken"));
        assert!(table.contains("failed"));
        assert!(table.contains("ok"));
    }

    #[tokio::test]
    async fn test_load_job_config_reports_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("word.json");
        tokio::fs::write(&path, r#"{"format": "docx", "fields": ["id"]}"#)
            .await
            .unwrap();
        assert!(matches!(
            load_job_config(&path).await,
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_load_job_config_names_job_by_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monthly-close.json");
        tokio::fs::write(&path, r#"{"format": "pdf", "fields": ["id", "amount"]}"#)
            .await
            .unwrap();
        let (name, config) = load_job_config(&path).await.unwrap();
        assert_eq!(name, "monthly-close");
        assert_eq!(config.format, ExportFormat::Vector);
        assert_eq!(config.data_type, "transactions");
    }
}
