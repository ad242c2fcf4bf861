//! Error taxonomy for the command pipeline.
//!
//! Every variant reachable from a parsed request maps to a chat reply through
//! [`CommandError::into_reply`]. Backend and internal detail is logged, never
//! returned to the caller.

use thiserror::Error;

use crate::types::SlackResponse;

pub const GENERIC_APOLOGY: &str =
    "Sorry, an error occurred while processing your request. Please try again later.";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {key} has invalid value {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Server configuration does not include Slack signing secret.")]
    MissingSecret,

    #[error("Invalid Slack signature.")]
    InvalidSignature,

    #[error("Request timestamp is outside the allowed window.")]
    ExpiredTimestamp,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Error: No command was provided.")]
    MissingCommand,

    #[error("Error: A single parameter was expected. Example: {command} my-resource")]
    InvalidParameter { command: String },
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("data store is not configured: missing {0}")]
    NotConfigured(&'static str),

    #[error("data store unavailable: {0}")]
    BackendUnavailable(String),

    #[error("malformed data store response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        LookupError::BackendUnavailable(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("Command '{0}' not recognized.")]
    UnknownCommand(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CommandError {
    pub fn into_reply(self) -> SlackResponse {
        match self {
            CommandError::Auth(e) => {
                tracing::error!(error = %e, "Validation or signature error");
                SlackResponse::ephemeral(format!("Validation Error: {e}"))
            }
            CommandError::Input(e) => {
                tracing::warn!(error = %e, "Rejected command input");
                SlackResponse::ephemeral(e.to_string())
            }
            CommandError::UnknownCommand(command) => {
                tracing::warn!(%command, "Unknown command");
                SlackResponse::ephemeral(format!("Command '{command}' not recognized."))
            }
            CommandError::Lookup(e) => {
                tracing::error!(error = %e, "Lookup failed");
                SlackResponse::ephemeral(GENERIC_APOLOGY)
            }
            CommandError::Internal(msg) => {
                tracing::error!(error = %msg, "Error processing request");
                SlackResponse::ephemeral(GENERIC_APOLOGY)
            }
        }
    }
}
