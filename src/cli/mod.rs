//! Command-line interface for fxexport
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Settings loading and validation
//! - Batch exports of one record set into several formats
//! - Managing saved export configurations

pub mod jobs;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{LogLevel, Settings};
use crate::error::Result;
use crate::export::{ExportEngine, ProgressTracker};
use crate::model::{ExportFormat, FieldCatalog};
use crate::store::{ConfigStore, JsonFileStore, SavedConfig};
use crate::utils::{fs::expand_home, time::format_duration};

use jobs::ExportJob;

/// fxexport - Report exports for exchange back-office data
#[derive(Parser, Debug)]
#[command(
    name = "fxexport",
    version,
    about = "Export transaction data as CSV, JSON, XLSX or PDF reports",
    long_about = "Exports a record set into delimited text, structured JSON, spreadsheet
workbooks and paginated PDF reports, and keeps named export configurations for reuse."
)]
pub struct CliArgs {
    /// Settings file path
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Quiet mode (errors only, no summary)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv", global = true)]
    pub very_verbose: bool,

    /// Hide the progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for fxexport
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export a record set with one or more configurations
    Export(ExportArgs),

    /// Manage saved export configurations
    Saved {
        #[command(subcommand)]
        action: SavedCommand,
    },

    /// List the exportable fields of a data type
    Fields {
        /// Data type whose built-in catalog is listed
        #[arg(long, value_name = "TYPE", default_value = "transactions")]
        data_type: String,

        /// Catalog file to list instead of a built-in one
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,
    },

    /// Show version information
    Version,

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,

        /// Write a default configuration file if none exists
        #[arg(long)]
        init: bool,
    },
}

/// Arguments of the `export` subcommand
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Export configuration file (JSON), repeatable
    #[arg(
        short = 'j',
        long = "job",
        value_name = "FILE",
        required_unless_present = "saved"
    )]
    pub jobs: Vec<PathBuf>,

    /// Id of a saved configuration to run, repeatable
    #[arg(long, value_name = "ID")]
    pub saved: Vec<Uuid>,

    /// Records to export (JSON array of objects)
    #[arg(short = 'd', long, value_name = "FILE")]
    pub data: PathBuf,

    /// Field catalog (JSON array of descriptors)
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Directory the artifacts are written to
    #[arg(short = 'o', long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Override the format of every job (csv, json, xlsx, pdf)
    #[arg(short = 'f', long, value_name = "FORMAT")]
    pub format: Option<ExportFormat>,

    /// Data type of the saved configurations
    #[arg(long, value_name = "TYPE", default_value = "transactions")]
    pub data_type: String,
}

/// Actions on saved export configurations
#[derive(Subcommand, Debug)]
pub enum SavedCommand {
    /// List saved configurations, most recently used first
    List {
        #[arg(long, value_name = "TYPE", default_value = "transactions")]
        data_type: String,
    },

    /// Save a configuration file under a name
    Save {
        /// Display name
        name: String,

        /// Export configuration file (JSON)
        #[arg(short = 'j', long = "job", value_name = "FILE")]
        job: PathBuf,
    },

    /// Print a saved configuration as JSON
    Show {
        id: Uuid,

        #[arg(long, value_name = "TYPE", default_value = "transactions")]
        data_type: String,
    },

    /// Delete a saved configuration
    Delete {
        id: Uuid,

        #[arg(long, value_name = "TYPE", default_value = "transactions")]
        data_type: String,
    },
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded settings
    settings: Settings,
}

impl CliInterface {
    /// Create a new CLI interface
    ///
    /// # Returns
    /// * `Result<Self>` - New CLI interface or error
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Create a CLI interface from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let settings = Self::load_settings(&args)?;
        Ok(Self { args, settings })
    }

    /// Load settings from file and merge with arguments
    fn load_settings(args: &CliArgs) -> Result<Settings> {
        let mut settings = Settings::load_from_file(args.config_file.as_deref())?;

        if let Err(e) = settings.validate() {
            eprintln!("Warning: Configuration validation failed: {}", e);
            eprintln!("Using default configuration instead.");
            settings = Settings::default();
        }

        Self::apply_logging_args(&mut settings, args);
        Ok(settings)
    }

    /// Apply logging-related CLI arguments to settings
    fn apply_logging_args(settings: &mut Settings, args: &CliArgs) {
        settings.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            settings.logging.level
        };

        if args.no_progress || args.quiet {
            settings.logging.show_progress = false;
        }
    }

    /// Get the settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn store(&self) -> JsonFileStore {
        JsonFileStore::new(expand_home(&self.settings.store.path.to_string_lossy()))
    }

    /// Run the selected subcommand
    pub async fn run(&self) -> Result<()> {
        match &self.args.command {
            Commands::Export(export) => self.run_export(export).await,
            Commands::Saved { action } => self.handle_saved_command(action).await,
            Commands::Fields { data_type, catalog } => {
                self.show_fields(data_type, catalog.as_deref()).await
            }
            Commands::Version => {
                self.show_version();
                Ok(())
            }
            Commands::Config {
                show,
                validate,
                init,
            } => self.handle_config_command(*show, *validate, *init),
        }
    }

    /// Export the record set once per job
    async fn run_export(&self, export: &ExportArgs) -> Result<()> {
        let catalog = match &export.catalog {
            Some(path) => Some(jobs::load_catalog(path).await?),
            None => None,
        };

        let mut batch = Vec::with_capacity(export.jobs.len() + export.saved.len());
        for path in &export.jobs {
            let (name, config) = jobs::load_job_config(path).await?;
            batch.push(ExportJob::new(name, config, catalog.as_ref()));
        }
        if !export.saved.is_empty() {
            let store = self.store();
            for id in &export.saved {
                let saved = store.touch_last_used(&export.data_type, *id).await?;
                batch.push(ExportJob::new(saved.name, saved.config, catalog.as_ref()));
            }
        }
        if let Some(format) = export.format {
            for job in &mut batch {
                job.config.format = format;
            }
        }

        let records = Arc::new(jobs::load_records(&export.data).await?);
        info!(
            "Running {} export job(s) over {} records",
            batch.len(),
            records.len()
        );

        let engine = Arc::new(ExportEngine::new(&self.settings));
        let tracker = Arc::new(ProgressTracker::new(
            batch.len() as u64,
            self.settings.logging.show_progress,
        ));
        let results = jobs::run_jobs(
            engine,
            batch,
            records,
            Utc::now(),
            Arc::clone(&tracker),
        )
        .await;
        tracker.finish();

        let output_dir = expand_home(&export.output_dir.to_string_lossy());
        let outcomes = jobs::write_artifacts(results, &output_dir).await?;
        let succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count();

        if !self.args.quiet {
            println!("{}", jobs::summary_table(&outcomes));
            println!(
                "Exported {}/{} in {}",
                succeeded,
                outcomes.len(),
                format_duration(tracker.elapsed())
            );
        }

        match outcomes.into_iter().find_map(|o| o.result.err()) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Handle saved subcommand
    async fn handle_saved_command(&self, action: &SavedCommand) -> Result<()> {
        let store = self.store();
        match action {
            SavedCommand::List { data_type } => {
                let configs = store.list(data_type).await?;
                if configs.is_empty() {
                    println!("No saved configurations for '{}'", data_type);
                } else {
                    println!("{}", saved_table(&configs));
                }
            }
            SavedCommand::Save { name, job } => {
                let (_, config) = jobs::load_job_config(job).await?;
                config.validate()?;
                let data_type = config.data_type.clone();
                let saved = store.save(&data_type, name, config).await?;
                println!("Saved '{}' as {} ({})", saved.name, saved.id, data_type);
            }
            SavedCommand::Show { id, data_type } => {
                let configs = store.list(data_type).await?;
                match configs.into_iter().find(|c| c.id == *id) {
                    Some(saved) => println!("{}", serde_json::to_string_pretty(&saved)?),
                    None => {
                        return Err(crate::error::StoreError::NotFound {
                            data_type: data_type.clone(),
                            id: id.to_string(),
                        }
                        .into());
                    }
                }
            }
            SavedCommand::Delete { id, data_type } => {
                store.delete(data_type, *id).await?;
                println!("Deleted {}", id);
            }
        }
        Ok(())
    }

    /// List catalog fields
    async fn show_fields(&self, data_type: &str, catalog: Option<&Path>) -> Result<()> {
        let catalog = match catalog {
            Some(path) => jobs::load_catalog(path).await?,
            None => match FieldCatalog::builtin(data_type) {
                Some(c) => c,
                None => {
                    warn!("No built-in catalog for '{}'", data_type);
                    return Ok(());
                }
            },
        };
        println!("{}", fields_table(&catalog));
        Ok(())
    }

    /// Show version information
    fn show_version(&self) {
        println!("fxexport version {}", env!("CARGO_PKG_VERSION"));
        println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    }

    /// Handle config subcommand
    fn handle_config_command(&self, show: bool, validate: bool, init: bool) -> Result<()> {
        if init {
            self.init_config_file()?;
        }

        if validate {
            self.validate_config_file();
        }

        if show {
            self.show_config();
        }

        Ok(())
    }

    /// Write default settings unless a file already exists
    fn init_config_file(&self) -> Result<()> {
        let path = self.get_config_path();
        if path.exists() {
            println!("Configuration file already exists: {}", path.display());
            return Ok(());
        }
        Settings::default().save(&path)?;
        println!("Wrote default configuration to {}", path.display());
        Ok(())
    }

    /// Validate configuration file
    fn validate_config_file(&self) {
        let path = self.get_config_path();
        println!("Validating configuration file: {}", path.display());

        if !path.exists() {
            println!("❌ Configuration file does not exist");
            return;
        }

        match Settings::load_from_file(Some(&path)) {
            Ok(settings) => match settings.validate() {
                Ok(_) => println!("✅ Configuration is valid"),
                Err(e) => println!("❌ Configuration validation failed: {}", e),
            },
            Err(e) => println!("❌ Failed to load configuration: {}", e),
        }
    }

    /// Show effective configuration
    fn show_config(&self) {
        let path = self.get_config_path();
        println!("Configuration file: {}", path.display());
        println!();
        println!("=== Effective Configuration ===");
        println!();

        match self.settings.to_toml() {
            Ok(toml_str) => println!("{}", toml_str),
            Err(e) => {
                eprintln!("Error formatting configuration: {}", e);
                println!("{:#?}", self.settings);
            }
        }
    }

    /// Get configuration file path (from args or default)
    fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Settings::default_path)
    }
}

fn saved_table(configs: &[SavedConfig]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Id", "Name", "Format", "Fields", "Last used"]);
    for saved in configs {
        builder.push_record([
            saved.id.to_string(),
            saved.name.clone(),
            saved.config.format.to_string(),
            saved.config.fields.len().to_string(),
            saved
                .last_used_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string()),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

fn fields_table(catalog: &FieldCatalog) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Key", "Label", "Type", "Format"]);
    for field in &catalog.fields {
        builder.push_record([
            field.key.clone(),
            field.label.clone(),
            variant_name(&field.field_type),
            variant_name(&field.format),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

/// Serialized name of a unit enum variant
fn variant_name<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}
