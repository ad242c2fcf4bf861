//! Slack slash-command webhook answering resource lookups from BigQuery.
//!
//! Request flow: content-type check, signature verification, form parsing,
//! parameter sanitizing, then routing to a lookup/format pipeline.

pub mod bigquery;
pub mod config;
pub mod error;
pub mod format;
pub mod handler;
pub mod lookup;
pub mod router;
pub mod slack;
pub mod types;

pub use config::Config;
pub use error::{AuthError, CommandError, ConfigError, InputError, LookupError};
pub use handler::{function_handler, App};
pub use router::{CommandHandler, Pipeline, Router};
pub use types::{Block, Button, SlackResponse};
