//! Process configuration, read once at cold start and passed to each component.

use std::time::Duration;

use crate::error::{ConfigError, LookupError};

const DEFAULT_API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";
const DEFAULT_TOLERANCE_SECS: u64 = 60 * 5;
const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub signing_secret: Option<String>,
    pub timestamp_tolerance: Duration,
    pub bigquery: BigQueryConfig,
}

#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    pub project_id: Option<String>,
    pub dataset_id: Option<String>,
    pub instances_table: Option<String>,
    pub status_table: Option<String>,
    pub api_base: String,
    pub access_token: Option<String>,
    pub service_account_json: Option<String>,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Empty values
    /// count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bigquery = BigQueryConfig {
            project_id: var("BIGQUERY_PROJECT_ID"),
            dataset_id: var("BIGQUERY_DATASET_ID"),
            instances_table: var("INSTANCES_TABLE_ID"),
            status_table: var("STATUS_CHECK_TABLE_ID"),
            api_base: var("BIGQUERY_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            access_token: var("BIGQUERY_ACCESS_TOKEN"),
            service_account_json: var("GOOGLE_SERVICE_ACCOUNT_JSON"),
            timeout: seconds(
                "BIGQUERY_TIMEOUT_SECS",
                var("BIGQUERY_TIMEOUT_SECS"),
                DEFAULT_TIMEOUT_SECS,
            )?,
        };

        Ok(Config {
            signing_secret: var("SLACK_SIGNING_SECRET"),
            timestamp_tolerance: seconds(
                "SLACK_TIMESTAMP_TOLERANCE_SECS",
                var("SLACK_TIMESTAMP_TOLERANCE_SECS"),
                DEFAULT_TOLERANCE_SECS,
            )?,
            bigquery,
        })
    }
}

impl BigQueryConfig {
    pub fn project(&self) -> Result<&str, LookupError> {
        self.project_id
            .as_deref()
            .ok_or(LookupError::NotConfigured("BIGQUERY_PROJECT_ID"))
    }

    /// Fully qualified `project.dataset.table` for the given table id.
    pub fn table_ref(
        &self,
        table: Option<&str>,
        table_key: &'static str,
    ) -> Result<String, LookupError> {
        let project = self.project()?;
        let dataset = self
            .dataset_id
            .as_deref()
            .ok_or(LookupError::NotConfigured("BIGQUERY_DATASET_ID"))?;
        let table = table.ok_or(LookupError::NotConfigured(table_key))?;
        Ok(format!("{project}.{dataset}.{table}"))
    }

    pub fn instances_table_ref(&self) -> Result<String, LookupError> {
        self.table_ref(self.instances_table.as_deref(), "INSTANCES_TABLE_ID")
    }

    pub fn status_table_ref(&self) -> Result<String, LookupError> {
        self.table_ref(self.status_table.as_deref(), "STATUS_CHECK_TABLE_ID")
    }
}

fn seconds(key: &'static str, raw: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    match raw {
        None => Ok(Duration::from_secs(default)),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}
