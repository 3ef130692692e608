//! Data model for export requests
//!
//! This module defines the values that flow into and out of the export engine:
//! - `ExportConfig`: the user's format, field, filter and date choices
//! - `DomainRecord`: one exportable row, an opaque key/value map
//! - `FieldCatalog` / `FieldDescriptor`: labels and types for record keys
//! - `Artifact`: the encoded bytes plus filename and MIME type

pub mod catalog;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigInvalid, ExportError};

pub use catalog::{FieldCatalog, FieldDescriptor, FieldType, ValueFormat};

/// One exportable row of application data
///
/// Keys are a superset of any selected field list.
pub type DomainRecord = serde_json::Map<String, Value>;

/// Supported export formats
///
/// Deserialization goes through [`FromStr`], so the aliases and case
/// rules match the command line and unknown names become
/// [`ExportError::UnsupportedFormat`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ExportFormat {
    /// Delimited text (CSV)
    Text,

    /// Structured document (JSON)
    Structured,

    /// Spreadsheet workbook (XLSX)
    Workbook,

    /// Paginated vector document (PDF)
    Vector,
}

impl ExportFormat {
    /// File extension without the leading dot
    pub const fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "csv",
            ExportFormat::Structured => "json",
            ExportFormat::Workbook => "xlsx",
            ExportFormat::Vector => "pdf",
        }
    }

    /// MIME type handed to the download collaborator
    pub const fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Text => "text/csv",
            ExportFormat::Structured => "application/json",
            ExportFormat::Workbook => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Vector => "application/pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl TryFrom<String> for ExportFormat {
    type Error = ExportError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "csv" => Ok(ExportFormat::Text),
            "structured" | "json" => Ok(ExportFormat::Structured),
            "workbook" | "xlsx" | "excel" => Ok(ExportFormat::Workbook),
            "vector" | "pdf" => Ok(ExportFormat::Vector),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Named date range shortcuts offered by the export wizard
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DatePreset {
    Today,
    #[serde(alias = "last7days")]
    Last7Days,
    #[serde(alias = "last30days")]
    Last30Days,
    ThisMonth,
    LastMonth,
    ThisYear,
    Custom,
}

/// Date range of the exported period
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<DatePreset>,
}

impl DateRange {
    /// Concrete `(start, end)` for this range
    ///
    /// Explicit bounds win over the preset. `Custom` and a missing preset
    /// leave unset bounds open.
    ///
    /// # Arguments
    /// * `today` - Reference date for relative presets
    pub fn resolve(&self, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
        let (preset_start, preset_end) = match self.preset {
            Some(DatePreset::Today) => (Some(today), Some(today)),
            Some(DatePreset::Last7Days) => (Some(today - Duration::days(6)), Some(today)),
            Some(DatePreset::Last30Days) => (Some(today - Duration::days(29)), Some(today)),
            Some(DatePreset::ThisMonth) => (today.with_day(1), Some(today)),
            Some(DatePreset::LastMonth) => {
                let first_this = today.with_day(1);
                let last_prev = first_this.and_then(|d| d.pred_opt());
                (last_prev.and_then(|d| d.with_day(1)), last_prev)
            }
            Some(DatePreset::ThisYear) => (NaiveDate::from_ymd_opt(today.year(), 1, 1), Some(today)),
            Some(DatePreset::Custom) | None => (None, None),
        };
        (self.start.or(preset_start), self.end.or(preset_end))
    }
}

/// Filters that were applied upstream to produce the dataset
///
/// The engine never filters rows itself; these values are only echoed into
/// metadata blocks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Filters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaborator: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<f64>,
}

impl Filters {
    /// Filters that carry a value, in a fixed order
    pub fn applied(&self) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        if let Some(v) = &self.collaborator {
            out.push(("collaborator", Value::from(v.as_str())));
        }
        if let Some(v) = &self.client {
            out.push(("client", Value::from(v.as_str())));
        }
        if let Some(v) = &self.status {
            out.push(("status", Value::from(v.as_str())));
        }
        if let Some(v) = self.min_amount {
            out.push(("min_amount", Value::from(v)));
        }
        if let Some(v) = self.max_amount {
            out.push(("max_amount", Value::from(v)));
        }
        out
    }
}

/// The full set of user choices driving one export
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportConfig {
    /// Output format
    pub format: ExportFormat,

    /// Kind of data being exported ("transactions", "report_summary", ...)
    #[serde(default = "default_data_type")]
    pub data_type: String,

    /// Exported period
    #[serde(default)]
    pub date_range: DateRange,

    /// Filters applied upstream
    #[serde(default)]
    pub filters: Filters,

    /// Ordered, unique field keys
    pub fields: Vec<String>,

    /// Emit a header row (delimited text, workbook, table)
    #[serde(default = "default_true")]
    pub include_headers: bool,

    /// Emit a metadata block
    #[serde(default)]
    pub include_metadata: bool,

    /// Filename without extension chosen by the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_filename: Option<String>,

    /// Report title shown in banners
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

fn default_data_type() -> String {
    "transactions".to_string()
}

fn default_true() -> bool {
    true
}

impl ExportConfig {
    /// Create a configuration with headers on and metadata off
    pub fn new(format: ExportFormat, fields: Vec<String>) -> Self {
        Self {
            format,
            data_type: default_data_type(),
            date_range: DateRange::default(),
            filters: Filters::default(),
            fields,
            include_headers: true,
            include_metadata: false,
            custom_filename: None,
            title: None,
        }
    }

    /// Parse a configuration from JSON
    ///
    /// An unknown `format` is reported as [`ExportError::UnsupportedFormat`]
    /// rather than a generic JSON error.
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        let value: Value = serde_json::from_str(json)?;
        if let Some(format) = value.get("format").and_then(Value::as_str) {
            format.parse::<ExportFormat>()?;
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Check the invariants that must hold before any encoding starts
    pub fn validate(&self) -> Result<(), ConfigInvalid> {
        if self.fields.is_empty() {
            return Err(ConfigInvalid::EmptyFields);
        }

        let mut seen = HashSet::with_capacity(self.fields.len());
        for key in &self.fields {
            if !seen.insert(key.as_str()) {
                return Err(ConfigInvalid::DuplicateField(key.clone()));
            }
        }

        if let (Some(start), Some(end)) = (self.date_range.start, self.date_range.end) {
            if start > end {
                return Err(ConfigInvalid::InvertedDateRange {
                    start: start.to_string(),
                    end: end.to_string(),
                });
            }
        }

        if let (Some(min), Some(max)) = (self.filters.min_amount, self.filters.max_amount) {
            if min > max {
                return Err(ConfigInvalid::InvertedAmountRange { min, max });
            }
        }

        Ok(())
    }

    /// Title used by banners when the user did not pick one
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(title) => title.clone(),
            None => {
                let mut words: Vec<String> = self
                    .data_type
                    .split('_')
                    .filter(|w| !w.is_empty())
                    .map(|w| {
                        let mut chars = w.chars();
                        match chars.next() {
                            Some(first) => first.to_uppercase().chain(chars).collect(),
                            None => String::new(),
                        }
                    })
                    .collect();
                words.push("Report".to_string());
                words.join(" ")
            }
        }
    }
}

/// An encoded export ready for download
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: &'static str,
}
