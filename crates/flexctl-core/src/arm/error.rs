//! Errors returned by the Azure Resource Manager control plane

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Error codes ARM uses for missing resources
const NOT_FOUND_CODES: &[&str] = &["NotFound", "ResourceNotFound", "ResourceGroupNotFound"];

/// Error code ARM returns when a subnet prefix does not fit in the vnet address space
pub const INVALID_SUBNET_CODE: &str = "NetcfgInvalidSubnet";

/// A fault raised by the management API or the transport beneath it
#[derive(Error, Debug)]
pub enum ArmError {
    /// Structured ARM error body (`{"error": {"code", "message"}}`)
    #[error("({code}) {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Request could not be sent or the response could not be read
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Token acquisition failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Response body did not match the expected shape
    #[error("Unexpected response from {url}: {message}")]
    Decode { url: String, message: String },

    /// Client could not be constructed from the supplied settings
    #[error("Invalid client configuration: {0}")]
    Configuration(String),

    /// Long-running operation did not reach a terminal state in time
    #[error("{operation} timed out after {timeout:?}")]
    OperationTimeout { operation: String, timeout: Duration },
}

impl ArmError {
    /// Build an API error from a status code and a raw response body.
    ///
    /// Falls back to the raw body as the message when it is not an ARM error document.
    pub fn from_response(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct Envelope {
            error: Detail,
        }
        #[derive(Deserialize)]
        struct Detail {
            code: String,
            #[serde(default)]
            message: String,
        }

        match serde_json::from_str::<Envelope>(body) {
            Ok(envelope) => ArmError::Api {
                status,
                code: envelope.error.code,
                message: envelope.error.message,
            },
            Err(_) => ArmError::Api {
                status,
                code: format!("HttpStatus{}", status),
                message: if body.is_empty() {
                    format!("Request failed with status {}", status)
                } else {
                    body.to_string()
                },
            },
        }
    }

    /// The ARM error code, if this is an API error
    pub fn code(&self) -> Option<&str> {
        match self {
            ArmError::Api { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    /// Returns true if the resource does not exist (404 or a not-found code)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            ArmError::Api { status, code, .. } => {
                *status == 404 || NOT_FOUND_CODES.contains(&code.as_str())
            }
            _ => false,
        }
    }

    /// Returns true if the subnet address space does not fit in the vnet
    #[must_use]
    pub fn is_invalid_subnet(&self) -> bool {
        self.code() == Some(INVALID_SUBNET_CODE)
    }

    /// Returns true if this is an authentication/authorization error (401/403)
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        match self {
            ArmError::Api { status, .. } => *status == 401 || *status == 403,
            ArmError::Auth(_) => true,
            _ => false,
        }
    }

    /// Returns true if a long-running operation exceeded its polling ceiling
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, ArmError::OperationTimeout { .. })
    }

    /// Returns true if the control plane throttled the request (429)
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        matches!(self, ArmError::Api { status: 429, .. })
    }
}
