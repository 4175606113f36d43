//! Local context command implementations

use colored::Colorize;
use tracing::debug;

use crate::cli::{LocalContextCommands, OutputFormat};
use crate::connection::ConnectionManager;
use crate::error::Result as CliResult;
use crate::output::{self, print_output};

/// Handle local context commands
pub fn handle_local_context_command(
    command: &LocalContextCommands,
    conn_mgr: &ConnectionManager,
    output_format: OutputFormat,
    query: Option<&str>,
) -> CliResult<()> {
    let store = conn_mgr.settings_store()?;
    debug!("Local context file: {:?}", store.path());

    match command {
        LocalContextCommands::Show => {
            let context = store.snapshot();
            if !conn_mgr.config.param_persist {
                eprintln!(
                    "{} param_persist is off in the configuration; these values are not used",
                    "note:".yellow().bold()
                );
            }
            match output::OutputFormat::from_cli(output_format, output::OutputFormat::Table) {
                output::OutputFormat::Table if query.is_none() => {
                    println!(
                        "Local context ({}): {}",
                        store.path().display(),
                        if context.enabled { "on" } else { "off" }
                    );
                    if context.sections.is_empty() {
                        println!("No remembered values.");
                    }
                    for (section, values) in &context.sections {
                        println!("\n[{}]", section.bold());
                        for (key, value) in values {
                            println!("  {} = {}", key, value);
                        }
                    }
                }
                format => print_output(&context, format, query)?,
            }
        }
        LocalContextCommands::Clear => {
            store.clear()?;
            println!("{} Local context cleared", "✓".green());
        }
        LocalContextCommands::On => {
            store.set_enabled(true)?;
            println!("{} Local context turned on", "✓".green());
        }
        LocalContextCommands::Off => {
            store.set_enabled(false)?;
            println!("{} Local context turned off", "✓".green());
        }
    }
    Ok(())
}
