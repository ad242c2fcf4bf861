use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::bigquery::BigQueryClient;
use crate::error::{CommandError, LookupError};
use crate::format::{Formatter, ResourceFormatter, StatusFormatter};
use crate::lookup::{Lookup, ResourceInfoLookup, StatusLookup};
use crate::types::SlackResponse;

pub const GET_INFO: &str = "/getinfo";
pub const CHECK_STATUS: &str = "/checkstatus";

/// Something that answers one slash command given its sanitized parameter.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, parameter: &str) -> Result<SlackResponse, LookupError>;
}

/// Lookup, then format. An empty key never reaches the store.
pub struct Pipeline<L, F> {
    lookup: L,
    formatter: F,
}

impl<L, F> Pipeline<L, F> {
    pub fn new(lookup: L, formatter: F) -> Self {
        Self { lookup, formatter }
    }
}

#[async_trait]
impl<L, F> CommandHandler for Pipeline<L, F>
where
    L: Lookup,
    F: Formatter<Input = L::Output>,
{
    async fn handle(&self, parameter: &str) -> Result<SlackResponse, LookupError> {
        let found = if parameter.is_empty() {
            <L::Output>::default()
        } else {
            self.lookup.find(parameter).await?
        };
        Ok(self.formatter.format(parameter, found))
    }
}

#[derive(Default)]
pub struct Router {
    handlers: HashMap<String, Box<dyn CommandHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// `/getinfo` and `/checkstatus` backed by the given store client.
    pub fn with_defaults(client: Arc<BigQueryClient>) -> Self {
        Self::new()
            .register(
                GET_INFO,
                Pipeline::new(ResourceInfoLookup::new(client.clone()), ResourceFormatter),
            )
            .register(
                CHECK_STATUS,
                Pipeline::new(StatusLookup::new(client), StatusFormatter),
            )
    }

    pub fn register(mut self, command: &str, handler: impl CommandHandler + 'static) -> Self {
        self.handlers.insert(command.to_string(), Box::new(handler));
        self
    }

    pub async fn dispatch(
        &self,
        command: &str,
        parameter: &str,
    ) -> Result<SlackResponse, CommandError> {
        tracing::info!(command, parameter, "Processing command");

        let handler = self
            .handlers
            .get(command)
            .ok_or_else(|| CommandError::UnknownCommand(command.to_string()))?;
        Ok(handler.handle(parameter).await?)
    }

    /// Always yields a reply; failures become soft ephemeral messages.
    pub async fn route(&self, command: &str, parameter: &str) -> SlackResponse {
        self.dispatch(command, parameter)
            .await
            .unwrap_or_else(CommandError::into_reply)
    }
}
