//! Delimited text encoder
//!
//! Emits an optional header line followed by one line per record, values
//! joined by the configured delimiter. Values are escaped following
//! RFC 4180: a value containing the delimiter, a double quote, CR or LF is
//! wrapped in quotes with inner quotes doubled.

use tracing::debug;

use crate::error::Result;
use crate::model::ExportFormat;
use crate::projector::ProjectionStyle;

use super::{EncodeJob, Encoder};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Encoder for delimited text
#[derive(Debug, Clone)]
pub struct CsvEncoder {
    /// Field delimiter
    delimiter: char,
    /// Prefix output with a UTF-8 byte order mark
    bom: bool,
}

impl CsvEncoder {
    /// Create a new delimited text encoder
    ///
    /// # Arguments
    /// * `delimiter` - Field delimiter
    /// * `bom` - Whether to emit a UTF-8 byte order mark
    pub fn new(delimiter: char, bom: bool) -> Self {
        Self { delimiter, bom }
    }

    /// Escape a value if necessary
    ///
    /// # Arguments
    /// * `value` - Value to escape
    ///
    /// # Returns
    /// * `String` - Escaped value
    fn escape_value(&self, value: &str) -> String {
        if value.contains(self.delimiter)
            || value.contains('"')
            || value.contains('\n')
            || value.contains('\r')
        {
            format!("\"{}\"", value.replace('"', "\"\""))
        } else {
            value.to_string()
        }
    }

    fn push_line(&self, out: &mut String, values: impl Iterator<Item = String>) {
        let mut first = true;
        for value in values {
            if !first {
                out.push(self.delimiter);
            }
            out.push_str(&self.escape_value(&value));
            first = false;
        }
        out.push('\n');
    }
}

impl Default for CsvEncoder {
    fn default() -> Self {
        Self::new(',', false)
    }
}

impl Encoder for CsvEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Text
    }

    fn encode(&self, job: &EncodeJob<'_>) -> Result<Vec<u8>> {
        let projection = job.plan(ProjectionStyle::Human);
        let mut out = String::new();

        if job.config.include_headers {
            self.push_line(&mut out, projection.labels().into_iter());
        }

        for record in job.records {
            let row = projection.project_row(record);
            self.push_line(&mut out, row.iter().map(|c| c.as_text()));
        }

        debug!(
            "Encoded {} rows x {} fields as delimited text",
            job.records.len(),
            projection.columns().len()
        );

        if out.is_empty() {
            return Ok(Vec::new());
        }

        let mut bytes = Vec::with_capacity(out.len() + UTF8_BOM.len());
        if self.bom {
            bytes.extend_from_slice(UTF8_BOM);
        }
        bytes.extend_from_slice(out.as_bytes());
        Ok(bytes)
    }
}
