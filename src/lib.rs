//! fxexport library
//!
//! Turns a configuration, a pre-filtered record set and a field catalog into
//! a downloadable artifact: delimited text, structured JSON, a spreadsheet
//! workbook or a paginated PDF report.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and batch exports
//! - `config`: Application settings
//! - `error`: Error types and handling
//! - `export`: Export engine, encoders and progress reporting
//! - `model`: Export configuration, records, catalogs and artifacts
//! - `projector`: Field projection and value formatting
//! - `store`: Saved export configurations
//! - `theme`: Colours shared by the workbook and PDF encoders
//! - `utils`: Utility functions and helpers
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use fxexport::model::{ExportConfig, ExportFormat, FieldCatalog};
//! use fxexport::{ExportEngine, ExportRequest, Settings};
//!
//! fn main() -> fxexport::Result<()> {
//!     let engine = ExportEngine::new(&Settings::default());
//!     let config = ExportConfig::new(ExportFormat::Text, vec!["id".into(), "amount".into()]);
//!     let records = Vec::new();
//!     let artifact = engine.export(&ExportRequest {
//!         config: &config,
//!         records: &records,
//!         catalog: &FieldCatalog::transactions(),
//!         generated_at: Utc::now(),
//!     })?;
//!     println!("{} ({} bytes)", artifact.filename, artifact.bytes.len());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod projector;
pub mod store;
pub mod theme;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use error::{ExportError, Result};
pub use export::{ExportEngine, ExportRequest};
pub use model::{Artifact, ExportConfig, ExportFormat};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
