//! Error handling module

use std::time::Duration;

use thiserror::Error;

use crate::protocol::ParsedResponse;

pub type Result<T> = std::result::Result<T, RouterError>;

#[derive(Error, Debug)]
pub enum RouterError {
    /// Connection, DNS, timeout or body-read failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Body could not be decoded even with duplicate keys allowed.
    /// The command's effect on the router is unknown.
    #[error("Malformed response: {reason}")]
    MalformedResponse { reason: String, body: String },

    #[error("Login salt missing: response has no random_login field")]
    SaltMissing,

    #[error("Authentication failed (result: {})", .result.as_deref().unwrap_or("absent"))]
    AuthFailure { result: Option<String> },

    #[error("Command {command} failed (result: {})", .response.first_text("result").unwrap_or_else(|| "absent".to_string()))]
    CommandFailure {
        command: String,
        response: Box<ParsedResponse>,
    },

    #[error("Router is rebooting, {}s of quiescence remaining", .remaining.as_secs())]
    QuiescenceActive { remaining: Duration },

    #[error("Session invalidated by reboot, login required")]
    ReauthenticationRequired,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RouterError {
    /// Only transport failures are retried automatically
    pub fn is_retryable(&self) -> bool {
        matches!(self, RouterError::Transport(_))
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            RouterError::SaltMissing | RouterError::AuthFailure { .. }
        )
    }

    /// Parsed fields attached to a logical command failure
    pub fn response(&self) -> Option<&ParsedResponse> {
        match self {
            RouterError::CommandFailure { response, .. } => Some(response),
            _ => None,
        }
    }
}
