//! Structured document encoder
//!
//! Emits a JSON document with a `data` array holding one object per record
//! (label -> value in field order). With metadata enabled a `metadata`
//! object comes first. Output is pretty printed with a stable key order, so
//! identical input always produces identical bytes.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ExportError, Result};
use crate::model::ExportFormat;
use crate::projector::{Column, ProjectionStyle};

use super::{EncodeJob, Encoder};

/// Encoder for structured JSON documents
#[derive(Debug, Clone, Default)]
pub struct JsonEncoder;

impl JsonEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Object keys for the selected columns
    ///
    /// Labels are used as keys; a label already taken by an earlier column
    /// is qualified with the field key so no value is overwritten.
    fn object_keys(columns: &[Column]) -> Vec<String> {
        let mut seen = HashSet::new();
        columns
            .iter()
            .map(|col| {
                if seen.insert(col.label.clone()) {
                    col.label.clone()
                } else {
                    format!("{} ({})", col.label, col.key)
                }
            })
            .collect()
    }

    fn metadata(job: &EncodeJob<'_>, labels: &[String]) -> Value {
        let mut meta = Map::new();
        meta.insert(
            "generated_at".into(),
            Value::String(job.generated_at.to_rfc3339()),
        );
        meta.insert("data_type".into(), Value::String(job.config.data_type.clone()));
        meta.insert("row_count".into(), Value::from(job.records.len()));
        meta.insert(
            "fields".into(),
            Value::Array(labels.iter().cloned().map(Value::String).collect()),
        );

        let filters: Map<String, Value> = job
            .config
            .filters
            .applied()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        meta.insert("filters".into(), Value::Object(filters));

        if job.period != (None, None) {
            let mut range = Map::new();
            if let Some(start) = job.period.0 {
                range.insert("start".into(), Value::String(start.to_string()));
            }
            if let Some(end) = job.period.1 {
                range.insert("end".into(), Value::String(end.to_string()));
            }
            meta.insert("date_range".into(), Value::Object(range));
        }

        Value::Object(meta)
    }
}

impl Encoder for JsonEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Structured
    }

    fn encode(&self, job: &EncodeJob<'_>) -> Result<Vec<u8>> {
        let projection = job.plan(ProjectionStyle::Structured);
        let keys = Self::object_keys(projection.columns());

        let data: Vec<Value> = job
            .records
            .iter()
            .map(|record| {
                let object: Map<String, Value> = keys
                    .iter()
                    .cloned()
                    .zip(projection.project_row(record).iter().map(|c| c.to_json()))
                    .collect();
                Value::Object(object)
            })
            .collect();

        let mut document = Map::new();
        if job.config.include_metadata {
            document.insert("metadata".into(), Self::metadata(job, &projection.labels()));
        }
        document.insert("data".into(), Value::Array(data));

        let mut bytes = serde_json::to_vec_pretty(&Value::Object(document))
            .map_err(|e| ExportError::encode_failed("json", e))?;
        bytes.push(b'\n');

        debug!("Encoded {} records as JSON ({} bytes)", job.records.len(), bytes.len());
        Ok(bytes)
    }
}
