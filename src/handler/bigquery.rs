use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::config::BigQueryConfig;
use crate::error::LookupError;
use crate::types::Timestamp;

const BIGQUERY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery.readonly";

/// Thin client over the BigQuery `jobs.query` REST endpoint.
pub struct BigQueryClient {
    client: Client,
    config: BigQueryConfig,
    // Resolved on first use; the provider caches tokens until they expire.
    credentials: OnceCell<Arc<dyn TokenProvider>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    parameter_mode: &'static str,
    query_parameters: Vec<QueryParameter<'a>>,
    max_results: u32,
    timeout_ms: u64,
    format_options: FormatOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FormatOptions {
    use_int64_timestamp: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryParameter<'a> {
    name: &'a str,
    parameter_type: ParameterType,
    parameter_value: ParameterValue<'a>,
}

#[derive(Debug, Serialize)]
struct ParameterType {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ParameterValue<'a> {
    value: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize)]
struct FieldSchema {
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    v: Value,
}

/// One result row, keyed by column name.
#[derive(Debug, Clone, Default)]
pub struct Row {
    cells: HashMap<String, Cell>,
}

#[derive(Debug, Clone)]
struct Cell {
    kind: String,
    value: Value,
}

impl Row {
    /// Column value as text. Nulls and empty strings are `None`.
    pub fn text(&self, field: &str) -> Option<String> {
        let cell = self.cells.get(field)?;
        let text = match &cell.value {
            Value::String(s) => s.clone(),
            Value::Null => return None,
            other => other.to_string(),
        };
        (!text.is_empty()).then_some(text)
    }

    pub fn timestamp(&self, field: &str) -> Option<Timestamp> {
        let cell = self.cells.get(field)?;
        let raw = match &cell.value {
            Value::String(s) if !s.is_empty() => s.as_str(),
            Value::Null | Value::String(_) => return None,
            other => return Some(Timestamp::Raw(other.to_string())),
        };
        let parsed = match cell.kind.as_str() {
            "TIMESTAMP" => parse_epoch(raw),
            "DATETIME" => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.and_utc()),
            "DATE" => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc()),
            _ => None,
        };
        Some(parsed.map_or_else(|| Timestamp::Raw(raw.to_string()), Timestamp::At))
    }
}

#[cfg(test)]
impl Row {
    pub fn from_pairs(pairs: &[(&str, &str, Value)]) -> Self {
        let cells = pairs
            .iter()
            .map(|(name, kind, value)| {
                (
                    name.to_string(),
                    Cell {
                        kind: kind.to_string(),
                        value: value.clone(),
                    },
                )
            })
            .collect();
        Row { cells }
    }
}

/// TIMESTAMP cells arrive as int64 microseconds, or as float seconds when the
/// int64 format option is not honoured.
fn parse_epoch(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(micros) = raw.parse::<i64>() {
        return DateTime::from_timestamp_micros(micros);
    }
    let seconds = raw.parse::<f64>().ok()?;
    DateTime::from_timestamp_micros((seconds * 1_000_000.0).round() as i64)
}

impl BigQueryClient {
    pub fn new(config: BigQueryConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            credentials: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &BigQueryConfig {
        &self.config
    }

    /// Runs a query with named `STRING` parameters and returns at most
    /// `max_results` rows.
    pub async fn query(
        &self,
        sql: &str,
        params: &[(&str, &str)],
        max_results: u32,
    ) -> Result<Vec<Row>, LookupError> {
        let project = self.config.project()?;
        let token = self.access_token().await?;

        let request_body = QueryRequest {
            query: sql,
            use_legacy_sql: false,
            parameter_mode: "NAMED",
            query_parameters: params
                .iter()
                .map(|&(name, value)| QueryParameter {
                    name,
                    parameter_type: ParameterType { kind: "STRING" },
                    parameter_value: ParameterValue { value },
                })
                .collect(),
            max_results,
            timeout_ms: self.config.timeout.as_millis() as u64,
            format_options: FormatOptions {
                use_int64_timestamp: true,
            },
        };

        let response = self
            .client
            .post(format!("{}/projects/{}/queries", self.config.api_base, project))
            .bearer_auth(token)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LookupError::BackendUnavailable(format!(
                "BigQuery API error {status}: {error_text}"
            )));
        }

        let payload: QueryResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::BackendUnavailable(e.to_string())
            } else {
                LookupError::MalformedResponse(e.to_string())
            }
        })?;

        // jobComplete=false means the server-side timeoutMs ran out
        if !payload.job_complete {
            return Err(LookupError::BackendUnavailable(
                "query did not complete within the timeout".to_string(),
            ));
        }

        let fields = payload.schema.map(|s| s.fields).unwrap_or_default();
        let rows = payload
            .rows
            .into_iter()
            .take(max_results as usize)
            .map(|row| {
                let cells = fields
                    .iter()
                    .zip(row.f)
                    .map(|(field, cell)| {
                        (
                            field.name.clone(),
                            Cell {
                                kind: field.kind.clone(),
                                value: cell.v,
                            },
                        )
                    })
                    .collect();
                Row { cells }
            })
            .collect();

        Ok(rows)
    }

    async fn access_token(&self) -> Result<String, LookupError> {
        if let Some(token) = &self.config.access_token {
            return Ok(token.clone());
        }

        let provider = self
            .credentials
            .get_or_try_init(|| self.token_provider())
            .await?;
        let token = provider.token(&[BIGQUERY_SCOPE]).await.map_err(|e| {
            LookupError::BackendUnavailable(format!("could not obtain access token: {e}"))
        })?;
        Ok(token.as_str().to_string())
    }

    /// Inline service-account JSON wins; otherwise Application Default
    /// Credentials (`GOOGLE_APPLICATION_CREDENTIALS`, gcloud, metadata server).
    async fn token_provider(&self) -> Result<Arc<dyn TokenProvider>, LookupError> {
        match &self.config.service_account_json {
            Some(json) => {
                tracing::debug!("Using inline service account credentials");
                let account = CustomServiceAccount::from_json(json).map_err(|e| {
                    LookupError::BackendUnavailable(format!("invalid service account key: {e}"))
                })?;
                let provider: Arc<dyn TokenProvider> = Arc::new(account);
                Ok(provider)
            }
            None => gcp_auth::provider().await.map_err(|e| {
                LookupError::BackendUnavailable(format!("no Google credentials available: {e}"))
            }),
        }
    }
}
