//! Configuration management for fxexport
//!
//! This module handles loading, parsing, and managing settings from:
//! - A TOML settings file
//! - Command-line arguments (applied by the `cli` module)
//!
//! Precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Settings file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, SettingsError};

/// Main settings structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Value formatting shared by every encoder
    #[serde(default)]
    pub format: FormatConfig,

    /// Paginated report layout
    #[serde(default)]
    pub report: ReportConfig,

    /// Workbook layout
    #[serde(default)]
    pub workbook: WorkbookConfig,

    /// Status colour palette
    #[serde(default)]
    pub theme: ThemeConfig,

    /// Saved-configuration store
    #[serde(default)]
    pub store: StoreConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,

    /// Show a progress bar while exporting
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Value formatting options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormatConfig {
    /// Symbol prefixed to currency values
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    /// chrono format string for dates in human-facing formats
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Thousands separator for human-facing numbers
    #[serde(default = "default_thousands_separator")]
    pub thousands_separator: char,

    /// Decimal separator for human-facing numbers
    #[serde(default = "default_decimal_separator")]
    pub decimal_separator: char,

    /// Field delimiter of delimited text output
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Prefix delimited text output with a UTF-8 byte order mark
    #[serde(default)]
    pub csv_bom: bool,
}

/// Paginated report layout, in PDF points
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    #[serde(default = "default_page_width")]
    pub page_width: f64,

    #[serde(default = "default_page_height")]
    pub page_height: f64,

    #[serde(default = "default_margin")]
    pub margin: f64,

    /// Space kept free at the bottom of each page for the footer
    #[serde(default = "default_footer_reserve")]
    pub footer_reserve: f64,

    /// Organisation name printed in the header banner
    #[serde(default = "default_organization")]
    pub organization: String,

    /// Number of entries kept in ranked series (top collaborators)
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Number of trailing months kept in monthly series
    #[serde(default = "default_months")]
    pub months: usize,

    /// Record keys the report aggregates over
    #[serde(default)]
    pub keys: ReportKeys,
}

/// Record keys used to aggregate report metrics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportKeys {
    #[serde(default = "default_amount_key")]
    pub amount: String,

    #[serde(default = "default_date_key")]
    pub date: String,

    #[serde(default = "default_status_key")]
    pub status: String,

    #[serde(default = "default_collaborator_key")]
    pub collaborator: String,
}

/// Workbook layout options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkbookConfig {
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,

    /// Width of columns without an entry in `column_widths`
    #[serde(default = "default_column_width")]
    pub default_column_width: f64,

    /// Column widths keyed by field
    #[serde(default = "default_column_widths")]
    pub column_widths: BTreeMap<String, f64>,
}

/// Status colours as `RRGGBB` hex strings keyed by status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThemeConfig {
    #[serde(default = "default_status_colors")]
    pub status_colors: BTreeMap<String, String>,
}

/// Saved-configuration store options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON file holding saved export configurations
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

// Default value functions
fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    true
}

fn default_show_progress() -> bool {
    true
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

fn default_date_format() -> String {
    "%d/%m/%Y".to_string()
}

fn default_thousands_separator() -> char {
    ','
}

fn default_decimal_separator() -> char {
    '.'
}

fn default_delimiter() -> char {
    ','
}

fn default_page_width() -> f64 {
    595.0 // A4 portrait
}

fn default_page_height() -> f64 {
    842.0
}

fn default_margin() -> f64 {
    40.0
}

fn default_footer_reserve() -> f64 {
    40.0
}

fn default_organization() -> String {
    "Exchange Back Office".to_string()
}

fn default_top_n() -> usize {
    5
}

fn default_months() -> usize {
    6
}

fn default_amount_key() -> String {
    "amount".to_string()
}

fn default_date_key() -> String {
    "date".to_string()
}

fn default_status_key() -> String {
    "status".to_string()
}

fn default_collaborator_key() -> String {
    "collaborator".to_string()
}

fn default_sheet_name() -> String {
    "Export".to_string()
}

fn default_column_width() -> f64 {
    15.0
}

fn default_column_widths() -> BTreeMap<String, f64> {
    [
        ("id", 12.0),
        ("date", 14.0),
        ("client", 28.0),
        ("collaborator", 24.0),
        ("operation_type", 14.0),
        ("currency_from", 8.0),
        ("currency_to", 8.0),
        ("amount", 16.0),
        ("exchange_rate", 12.0),
        ("converted_amount", 18.0),
        ("commission", 14.0),
        ("commission_rate", 14.0),
        ("status", 14.0),
        ("verified", 10.0),
        ("period", 14.0),
        ("transactions", 14.0),
        ("volume", 18.0),
        ("growth", 12.0),
        ("success_rate", 14.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn default_status_colors() -> BTreeMap<String, String> {
    [
        ("completed", "2E7D32"),
        ("pending", "F9A825"),
        ("processing", "1565C0"),
        ("cancelled", "757575"),
        ("error", "C62828"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_store_path() -> PathBuf {
    Settings::base_dir().join("saved_configs.json")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
            show_progress: default_show_progress(),
        }
    }
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            date_format: default_date_format(),
            thousands_separator: default_thousands_separator(),
            decimal_separator: default_decimal_separator(),
            delimiter: default_delimiter(),
            csv_bom: false,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            page_width: default_page_width(),
            page_height: default_page_height(),
            margin: default_margin(),
            footer_reserve: default_footer_reserve(),
            organization: default_organization(),
            top_n: default_top_n(),
            months: default_months(),
            keys: ReportKeys::default(),
        }
    }
}

impl Default for ReportKeys {
    fn default() -> Self {
        Self {
            amount: default_amount_key(),
            date: default_date_key(),
            status: default_status_key(),
            collaborator: default_collaborator_key(),
        }
    }
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        Self {
            sheet_name: default_sheet_name(),
            default_column_width: default_column_width(),
            column_widths: default_column_widths(),
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            status_colors: default_status_colors(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Settings {
    /// Create settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory holding the settings file and the saved-config store
    pub fn base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".fxexport")
    }

    /// Get the default settings file path
    pub fn default_path() -> PathBuf {
        Self::base_dir().join("config.toml")
    }

    /// Load settings from a file
    ///
    /// With no explicit path the default location is tried and a missing
    /// file yields defaults. An explicit path must exist.
    ///
    /// # Arguments
    /// * `path` - Optional path to the settings file (TOML format)
    ///
    /// # Returns
    /// * `Result<Settings>` - Loaded settings or error
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path(), false),
        };

        if !path.exists() {
            if explicit {
                return Err(SettingsError::FileNotFound(path.display().to_string()).into());
            }
            tracing::debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SettingsError::InvalidFormat(e.to_string()).into())
    }

    /// Render settings as TOML text
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SettingsError::InvalidFormat(e.to_string()).into())
    }

    /// Save settings to a file
    ///
    /// # Arguments
    /// * `path` - Path where to save the settings
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml()?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the settings
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        let report = &self.report;
        if report.page_width <= report.margin * 2.0 {
            return Err(invalid("report.page_width", report.page_width));
        }
        if report.page_height <= report.margin * 2.0 + report.footer_reserve {
            return Err(invalid("report.page_height", report.page_height));
        }
        if report.top_n == 0 {
            return Err(invalid("report.top_n", report.top_n));
        }
        if report.months < 2 {
            return Err(invalid("report.months", report.months));
        }
        if !is_valid_date_format(&self.format.date_format) {
            return Err(invalid("format.date_format", &self.format.date_format));
        }
        if matches!(self.format.delimiter, '"' | '\n' | '\r') {
            return Err(invalid("format.delimiter", self.format.delimiter.escape_default()));
        }
        if self.workbook.sheet_name.is_empty() || self.workbook.sheet_name.chars().count() > 31 {
            return Err(invalid("workbook.sheet_name", &self.workbook.sheet_name));
        }
        for (status, hex) in &self.theme.status_colors {
            if crate::theme::Rgb::from_hex(hex).is_none() {
                return Err(invalid(&format!("theme.status_colors.{status}"), hex));
            }
        }
        Ok(())
    }
}

/// Whether chrono can render dates with `fmt`
fn is_valid_date_format(fmt: &str) -> bool {
    use chrono::format::{Item, StrftimeItems};

    !fmt.is_empty() && !StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error))
}

fn invalid(field: &str, value: impl std::fmt::Display) -> crate::error::ExportError {
    SettingsError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
