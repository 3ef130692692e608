//! Utility functions and helpers for fxexport
//!
//! This module provides common utility functions used throughout the application:
//! - Artifact file naming
//! - Time and duration utilities
//! - File system helpers
//! - Conversion utilities

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// Artifact file naming
pub mod filename {
    use chrono::{DateTime, NaiveDate, Utc};

    use crate::model::ExportConfig;

    /// Longest file stem kept from user input
    const MAX_STEM_LEN: usize = 120;

    /// Make a user supplied name safe to use as a file name
    ///
    /// Path separators, reserved characters and control characters become
    /// `_`, whitespace runs become a single `_`, and leading dots are
    /// dropped so the name can never point outside the output directory.
    ///
    /// # Arguments
    /// * `name` - Raw file name
    ///
    /// # Returns
    /// * `String` - Sanitised name, possibly empty
    pub fn sanitize(name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        let mut last_was_space = false;
        for c in name.trim().chars() {
            if c.is_whitespace() {
                if !last_was_space {
                    out.push('_');
                }
                last_was_space = true;
                continue;
            }
            last_was_space = false;
            match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => out.push('_'),
                c if c.is_control() => out.push('_'),
                c => out.push(c),
            }
        }
        let trimmed = out.trim_start_matches('.');
        trimmed.chars().take(MAX_STEM_LEN).collect()
    }

    /// File name for an export artifact
    ///
    /// Uses the sanitised `custom_filename` when it has one, otherwise
    /// `{data_type}-export-{start}_{end}` for a closed period or
    /// `{data_type}-export-{timestamp}`. The format extension is appended
    /// unless the custom name already ends with it.
    ///
    /// # Arguments
    /// * `config` - Export configuration
    /// * `period` - Resolved period bounds
    /// * `generated_at` - Export timestamp
    pub fn artifact_filename(
        config: &ExportConfig,
        period: (Option<NaiveDate>, Option<NaiveDate>),
        generated_at: DateTime<Utc>,
    ) -> String {
        let extension = config.format.extension();

        if let Some(custom) = config.custom_filename.as_deref() {
            let name = sanitize(custom);
            if !name.is_empty() {
                let suffix = format!(".{extension}");
                if name.to_lowercase().ends_with(&suffix) {
                    return name;
                }
                return format!("{name}{suffix}");
            }
        }

        let data_type = match sanitize(&config.data_type) {
            s if s.is_empty() => "data".to_string(),
            s => s,
        };
        match period {
            (Some(start), Some(end)) => format!(
                "{data_type}-export-{}_{}.{extension}",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            ),
            _ => format!(
                "{data_type}-export-{}.{extension}",
                generated_at.format("%Y%m%d-%H%M%S")
            ),
        }
    }
}

/// Time utilities
pub mod time {
    use super::*;

    /// Format duration as human-readable string
    ///
    /// # Arguments
    /// * `duration` - Duration to format
    ///
    /// # Returns
    /// * `String` - Formatted duration (e.g., "1m 30s")
    pub fn format_duration(duration: Duration) -> String {
        let secs = duration.as_secs();
        let millis = duration.subsec_millis();

        if secs == 0 {
            return format!("{}ms", millis);
        }

        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;

        let mut parts = Vec::new();

        if hours > 0 {
            parts.push(format!("{}h", hours));
        }
        if minutes > 0 {
            parts.push(format!("{}m", minutes));
        }
        if seconds > 0 || parts.is_empty() {
            parts.push(format!("{}s", seconds));
        }

        parts.join(" ")
    }
}

/// File system utilities
pub mod fs {
    use super::*;

    /// Ensure directory exists, create if not
    ///
    /// # Arguments
    /// * `path` - Directory path
    ///
    /// # Returns
    /// * `Result<()>` - Success or error
    pub async fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            tokio::fs::create_dir_all(path).await?;
        }
        Ok(())
    }

    /// Expand home directory in path
    ///
    /// # Arguments
    /// * `path` - Path potentially starting with ~
    ///
    /// # Returns
    /// * `PathBuf` - Expanded path
    pub fn expand_home(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        PathBuf::from(path)
    }
}

/// Conversion utilities
pub mod convert {
    /// Format bytes as human-readable size
    ///
    /// # Arguments
    /// * `bytes` - Number of bytes
    ///
    /// # Returns
    /// * `String` - Formatted size (e.g., "1.5 MB")
    pub fn format_bytes(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExportConfig, ExportFormat};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn config(format: ExportFormat) -> ExportConfig {
        ExportConfig::new(format, vec!["id".into()])
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(filename::sanitize("  March report "), "March_report");
        assert_eq!(filename::sanitize("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(filename::sanitize("a:b*c?\"d\""), "a_b_c__d_");
        assert_eq!(filename::sanitize("..."), "");
        assert_eq!(filename::sanitize(&"x".repeat(300)).len(), 120);
    }

    #[test]
    fn test_artifact_filename_custom() {
        let now = Utc.with_ymd_and_hms(2024, 4, 2, 9, 30, 0).unwrap();
        let mut config = config(ExportFormat::Workbook);
        config.custom_filename = Some("Cierre marzo".into());
        assert_eq!(
            filename::artifact_filename(&config, (None, None), now),
            "Cierre_marzo.xlsx"
        );

        config.custom_filename = Some("totals.XLSX".into());
        assert_eq!(
            filename::artifact_filename(&config, (None, None), now),
            "totals.XLSX"
        );

        config.custom_filename = Some("   ".into());
        assert_eq!(
            filename::artifact_filename(&config, (None, None), now),
            "transactions-export-20240402-093000.xlsx"
        );
    }

    #[test]
    fn test_artifact_filename_from_period() {
        let now = Utc.with_ymd_and_hms(2024, 4, 2, 9, 30, 0).unwrap();
        let config = config(ExportFormat::Text);
        let period = (
            NaiveDate::from_ymd_opt(2024, 3, 1),
            NaiveDate::from_ymd_opt(2024, 3, 31),
        );
        assert_eq!(
            filename::artifact_filename(&config, period, now),
            "transactions-export-2024-03-01_2024-03-31.csv"
        );
        assert_eq!(
            filename::artifact_filename(&config, (period.0, None), now),
            "transactions-export-20240402-093000.csv"
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(time::format_duration(Duration::from_secs(0)), "0ms");
        assert_eq!(time::format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(time::format_duration(Duration::from_secs(3661)), "1h 1m 1s");
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(fs::expand_home("/tmp/out"), PathBuf::from("/tmp/out"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(fs::expand_home("~/out"), home.join("out"));
        }
    }

    #[tokio::test]
    async fn test_ensure_dir_exists() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        fs::ensure_dir_exists(&nested).await.unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(convert::format_bytes(500), "500 B");
        assert_eq!(convert::format_bytes(1024), "1.00 KB");
        assert_eq!(convert::format_bytes(1024 * 1024), "1.00 MB");
    }
}
