//! Progress tracking and polling for long-running ARM operations
//!
//! Mutating ARM calls may answer `201`/`202` with an `Azure-AsyncOperation` or
//! `Location` header. This module follows those headers until the operation reaches
//! a terminal state, emitting optional progress events for UI updates.

use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::arm::rest::{ArmClient, RawResponse};
use crate::arm::{ArmError, ArmResult};

/// Polling ceiling applied to every long-running operation
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Interval used when the service does not send `Retry-After`
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Progress events emitted while waiting on an operation
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Operation accepted by the control plane
    Started { operation: String },
    /// Polling iteration with current status
    Polling {
        operation: String,
        status: String,
        elapsed: Duration,
    },
    /// Operation reached `Succeeded`
    Completed { operation: String },
    /// Operation failed or was cancelled
    Failed { operation: String, error: String },
}

/// Callback type for progress updates
///
/// The CLI uses this to drive a spinner; library callers usually pass nothing.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Where to poll an accepted operation
#[derive(Debug, Clone, Default)]
pub struct PendingOperation {
    /// Label for logs and progress events, e.g. `MySQL Server Create`
    pub name: String,
    /// `Azure-AsyncOperation` header value
    pub async_operation_url: Option<String>,
    /// `Location` header value
    pub location_url: Option<String>,
    /// First `Retry-After` hint
    pub retry_after: Option<Duration>,
}

impl PendingOperation {
    /// Returns true if the initial response already completed the operation
    pub fn is_complete(&self) -> bool {
        self.async_operation_url.is_none() && self.location_url.is_none()
    }
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    #[serde(default)]
    status: String,
    #[serde(default)]
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

enum PollState {
    Running(String),
    Succeeded,
}

/// Poll an accepted operation until it succeeds, fails or times out.
///
/// # Arguments
///
/// * `client` - The ARM client used to issue authenticated polling requests
/// * `operation` - Operation headers captured from the initial response
/// * `timeout` - Maximum time to wait for completion
/// * `interval` - Time between polls when the service gives no `Retry-After`
/// * `on_progress` - Optional callback for progress updates
pub async fn poll_operation(
    client: &ArmClient,
    operation: &PendingOperation,
    timeout: Duration,
    interval: Duration,
    on_progress: Option<&ProgressCallback>,
) -> ArmResult<()> {
    let start = Instant::now();
    let name = operation.name.clone();

    emit(
        on_progress,
        ProgressEvent::Started {
            operation: name.clone(),
        },
    );

    if operation.is_complete() {
        emit(on_progress, ProgressEvent::Completed { operation: name });
        return Ok(());
    }

    let mut wait = operation.retry_after.unwrap_or(interval);

    loop {
        let elapsed = start.elapsed();
        if elapsed > timeout {
            return Err(ArmError::OperationTimeout {
                operation: name,
                timeout,
            });
        }

        tokio::time::sleep(wait).await;

        let (response, state) = match &operation.async_operation_url {
            Some(url) => {
                let response = client.get_url(url).await?;
                let state = match async_operation_state(&response) {
                    Ok(state) => state,
                    Err(e) => {
                        emit(
                            on_progress,
                            ProgressEvent::Failed {
                                operation: name.clone(),
                                error: e.to_string(),
                            },
                        );
                        return Err(e);
                    }
                };
                (response, state)
            }
            None => {
                // Location polling: 202 while running, 200/201/204 when done
                let url = operation.location_url.as_deref().unwrap_or_default();
                let response = client.get_url(url).await?;
                let state = location_state(&response)?;
                (response, state)
            }
        };

        match state {
            PollState::Succeeded => {
                debug!("{} completed after {:?}", name, start.elapsed());
                emit(on_progress, ProgressEvent::Completed { operation: name });
                return Ok(());
            }
            PollState::Running(status) => {
                trace!("{} still {}", name, status);
                emit(
                    on_progress,
                    ProgressEvent::Polling {
                        operation: name.clone(),
                        status,
                        elapsed: start.elapsed(),
                    },
                );
                wait = response.retry_after.unwrap_or(interval);
            }
        }
    }
}

fn async_operation_state(response: &RawResponse) -> ArmResult<PollState> {
    if response.status >= 400 {
        return Err(ArmError::from_response(response.status, &response.body));
    }

    let doc: OperationStatus =
        serde_json::from_str(&response.body).map_err(|e| ArmError::Decode {
            url: response.url.clone(),
            message: e.to_string(),
        })?;

    // Terminal states are matched case-insensitively
    match doc.status.to_lowercase().as_str() {
        "succeeded" => Ok(PollState::Succeeded),
        "failed" | "canceled" | "cancelled" => {
            let (code, message) = match doc.error {
                Some(err) => (err.code, err.message),
                None => (
                    format!("Operation{}", doc.status),
                    format!("Operation finished with status {}", doc.status),
                ),
            };
            Err(ArmError::Api {
                status: response.status,
                code,
                message,
            })
        }
        "" => Ok(PollState::Running("InProgress".to_string())),
        _ => Ok(PollState::Running(doc.status)),
    }
}

fn location_state(response: &RawResponse) -> ArmResult<PollState> {
    match response.status {
        202 => Ok(PollState::Running("InProgress".to_string())),
        200 | 201 | 204 => Ok(PollState::Succeeded),
        status => Err(ArmError::from_response(status, &response.body)),
    }
}

/// Helper to emit progress events
fn emit(callback: Option<&ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = callback {
        cb(event);
    }
}
