//! Shared utilities for command implementations

use colored::Colorize;
use flexctl_core::{ProgressCallback, ProgressEvent};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::sync::Arc;
use tabled::Tabled;

use crate::error::{FlexCtlError, Result as CliResult};

/// Row structure for vertical table display
#[derive(Tabled)]
pub struct DetailRow {
    #[tabled(rename = "Property")]
    pub property: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Ask for confirmation; never proceeds without a terminal to ask on
pub fn confirm_action(message: &str) -> CliResult<bool> {
    if !std::io::stdin().is_terminal() {
        eprintln!(
            "{} refusing to {} without confirmation; pass --yes to skip the prompt",
            "warning:".yellow().bold(),
            message
        );
        return Ok(false);
    }

    dialoguer::Confirm::new()
        .with_prompt(format!("Are you sure you want to {}?", message))
        .default(false)
        .interact()
        .map_err(|e| FlexCtlError::InvalidInput {
            message: format!("Failed to read confirmation: {}", e),
        })
}

/// Spinner driven by long-running operation progress events
pub fn operation_spinner(message: &str) -> (ProgressBar, ProgressCallback) {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed_precise}]")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));

    let pb_clone = pb.clone();
    let callback: ProgressCallback = Arc::new(move |event: ProgressEvent| match &event {
        ProgressEvent::Started { operation } => {
            pb_clone.set_message(format!("{}: started", operation));
        }
        ProgressEvent::Polling {
            operation, status, ..
        } => {
            pb_clone.set_message(format!("{}: {}", operation, status));
        }
        ProgressEvent::Completed { operation } => {
            pb_clone.set_message(format!("{}: {}", operation, "succeeded".green()));
        }
        ProgressEvent::Failed { operation, error } => {
            pb_clone.set_message(format!("{} {}: {}", operation, "failed".red(), error));
        }
    });

    (pb, callback)
}

/// Parse `key=value` tag arguments
pub fn parse_tags(tags: &[String]) -> CliResult<BTreeMap<String, String>> {
    tags.iter()
        .filter(|t| !t.is_empty())
        .map(|tag| match tag.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(FlexCtlError::InvalidInput {
                message: format!("Tag '{}' is not in key=value form", tag),
            }),
        })
        .collect()
}
