//! fxexport - report exports from the command line
//!
//! Exports one record set into CSV, JSON, XLSX or PDF artifacts, running
//! several export configurations in parallel.
//!
//! # Usage
//!
//! ```bash
//! # Export with two configuration files
//! fxexport export -j monthly.json -j errors.json -d transactions.json -o out/
//!
//! # Re-run a saved configuration as a PDF report
//! fxexport export --saved 6f1c... -d transactions.json -f pdf
//! ```

use fxexport::cli::CliInterface;
use fxexport::error::Result;

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load settings
/// 2. Initialize logging
/// 3. Run the selected subcommand
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    cli.run().await
}

/// Initialize logging system based on verbosity level
///
/// Logs go to stderr so stdout only carries command output.
fn initialize_logging(cli: &CliInterface) {
    let logging = &cli.settings().logging;

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(logging.level.to_tracing_level())
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
