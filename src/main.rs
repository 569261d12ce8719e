//! `dirtidy` - organize a directory into category folders, reversibly.

use clap::Parser;
use dirtidy::cli::{Cli, exit, run_cli};
use dirtidy::logging::init_tracing;
use dirtidy::output::OutputFormatter;

fn main() {
    let cli = Cli::parse();

    // Held until exit so the file writer can flush.
    let _guard = match init_tracing(cli.log_level, cli.log_file.as_deref(), cli.log_json) {
        Ok(guard) => guard,
        Err(e) => {
            OutputFormatter::error(&format!("{e:#}"));
            std::process::exit(exit::FATAL);
        }
    };

    let code = match run_cli(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "command failed");
            OutputFormatter::error(&format!("Error: {e:#}"));
            exit::FATAL
        }
    };

    drop(_guard);
    std::process::exit(code);
}
