//! Error handling for export operations.
//!
//! Errors fall into three groups:
//! - configuration rejected before encoding (`ConfigInvalid`)
//! - encoder failures surfaced with a generic message (`EncodeFailed`)
//! - unknown formats (`UnsupportedFormat`)
//!
//! Settings, store and I/O errors are wrapped so the whole crate shares one
//! [`Result`] alias.

pub mod kinds;

pub use kinds::{ConfigInvalid, ExportError, Result, SettingsError, StoreError};
