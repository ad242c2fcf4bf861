use std::sync::Arc;

use lambda_http::http::header::CONTENT_TYPE;
use lambda_http::http::HeaderMap;
use lambda_http::{Body, Error, Request, Response};

use crate::bigquery::BigQueryClient;
use crate::config::Config;
use crate::error::{CommandError, InputError};
use crate::router::Router;
use crate::slack::{self, SignatureVerifier};
use crate::types::{SlackCommand, SlackResponse};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const WRONG_CONTENT_TYPE: &str =
    "This request does not appear to be from Slack (incorrect Content-Type).";

const LOG_BODY_LIMIT: usize = 512;

/// Everything a request needs, built once per cold start.
pub struct App {
    verifier: SignatureVerifier,
    router: Router,
}

impl App {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Arc::new(BigQueryClient::new(config.bigquery.clone())?);
        Ok(Self::with_router(config, Router::with_defaults(client)))
    }

    pub fn with_router(config: &Config, router: Router) -> Self {
        Self {
            verifier: SignatureVerifier::new(
                config.signing_secret.clone(),
                config.timestamp_tolerance,
            ),
            router,
        }
    }
}

pub async fn function_handler(app: &App, event: Request) -> Result<Response<Body>, Error> {
    let headers = event.headers();
    let body: &[u8] = event.body();

    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    if content_type != Some(FORM_CONTENT_TYPE) {
        tracing::warn!(?content_type, "Request received with unexpected Content-Type");
        tracing::debug!(body = %truncate_for_log(body), "Content of invalid request");
        return Ok(Response::builder()
            .status(400)
            .header("Content-Type", "text/plain")
            .body(Body::from(WRONG_CONTENT_TYPE))?);
    }

    let reply = match process(app, headers, body).await {
        Ok(reply) => reply,
        Err(e) => {
            let form: SlackCommand = serde_urlencoded::from_bytes(body).unwrap_or_default();
            tracing::warn!(
                error = %e,
                ?headers,
                body = %truncate_for_log(body),
                command = %form.command,
                parameter = %form.text,
                "Request ended with an error reply"
            );
            e.into_reply()
        }
    };

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(&reply)?))?)
}

async fn process(
    app: &App,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<SlackResponse, CommandError> {
    app.verifier.verify(headers, body)?;
    tracing::info!(?headers, body = %truncate_for_log(body), "Slack request received");

    let command: SlackCommand = serde_urlencoded::from_bytes(body)
        .map_err(|e| CommandError::Internal(format!("could not parse form body: {e}")))?;

    let name = command.command.trim();
    if name.is_empty() {
        return Err(InputError::MissingCommand.into());
    }

    let parameter = slack::sanitize(slack::parse_parameter(name, &command.text)?);
    tracing::info!(
        command = name,
        %parameter,
        user = %command.user_name,
        channel = %command.channel_id,
        "Command received with sanitized parameter"
    );

    app.router.dispatch(name, &parameter).await
}

fn truncate_for_log(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(LOG_BODY_LIMIT)
        .collect()
}
