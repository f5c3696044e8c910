// Backend API error types and envelope mapping

use serde::Deserialize;
use thiserror::Error;

// Backend error envelope: { error: { message } } or { error: "message" }
#[derive(Debug, Clone, Deserialize)]
pub struct BackendErrorEnvelope {
    pub error: BackendErrorDetails,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BackendErrorDetails {
    Structured {
        #[serde(default)]
        message: Option<String>,
    },
    Text(String),
}

impl BackendErrorEnvelope {
    pub fn message(self) -> Option<String> {
        match self.error {
            BackendErrorDetails::Structured { message } => message,
            BackendErrorDetails::Text(text) => Some(text),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Transport failure or a non-2xx answer from the backend
    #[error("network error: status={status:?} message={message}")]
    Network {
        status: Option<u16>,
        message: String,
    },
    /// Response body lacked a field the client depends on
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ApiError {
    pub fn transport(e: impl std::fmt::Display) -> Self {
        ApiError::Network {
            status: None,
            message: e.to_string(),
        }
    }

    pub(crate) fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<BackendErrorEnvelope>(body)
            .ok()
            .and_then(BackendErrorEnvelope::message)
            .unwrap_or_else(|| body.to_string());
        ApiError::Network {
            status: Some(status),
            message,
        }
    }

    /// Text suitable for a user-facing notice. Backend messages pass through untouched.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network { status: None, .. } => "Unable to reach the server".to_string(),
            ApiError::Network { status: Some(s), message } if message.is_empty() => {
                format!("The server answered with status {s}")
            }
            ApiError::Network { message, .. } => message.clone(),
            ApiError::MalformedResponse(_) => "The server sent an unexpected response".to_string(),
            ApiError::Config(_) => "The app is not configured to reach the server".to_string(),
        }
    }
}
