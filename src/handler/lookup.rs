use std::sync::Arc;

use async_trait::async_trait;

use crate::bigquery::{BigQueryClient, Row};
use crate::error::LookupError;
use crate::types::{ResourceRecord, StatusRecord};

const MAX_RESOURCE_ROWS: u32 = 2;

/// A keyed query against the data store. `Output::default()` is the
/// "nothing matched" result.
#[async_trait]
pub trait Lookup: Send + Sync {
    type Output: Default + Send;

    async fn find(&self, key: &str) -> Result<Self::Output, LookupError>;
}

pub struct ResourceInfoLookup {
    client: Arc<BigQueryClient>,
}

impl ResourceInfoLookup {
    pub fn new(client: Arc<BigQueryClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Lookup for ResourceInfoLookup {
    type Output = Vec<ResourceRecord>;

    async fn find(&self, key: &str) -> Result<Self::Output, LookupError> {
        let table = self.client.config().instances_table_ref()?;
        let sql = format!(
            "SELECT instance_id, instance_name, project_id, status, zone, machine_type, \
             creation_timestamp, \
             CONCAT('https://console.cloud.google.com/compute/instancesDetail/zones/', zone, \
             '/instances/', instance_name, '?project=', project_id) AS instance_console_url \
             FROM `{table}` \
             WHERE LOWER(instance_name) = @resource_name OR LOWER(instance_id) = @resource_name \
             LIMIT {MAX_RESOURCE_ROWS}"
        );

        tracing::info!(resource = key, "Querying resource information");
        let rows = self
            .client
            .query(&sql, &[("resource_name", key)], MAX_RESOURCE_ROWS)
            .await?;
        tracing::info!(resource = key, count = rows.len(), "Resource rows found");

        Ok(rows.iter().map(resource_from_row).collect())
    }
}

fn resource_from_row(row: &Row) -> ResourceRecord {
    ResourceRecord {
        id: row.text("instance_id"),
        name: row.text("instance_name"),
        project: row.text("project_id"),
        status: row.text("status"),
        zone: row.text("zone"),
        machine_type: row.text("machine_type"),
        created_at: row.timestamp("creation_timestamp"),
        console_url: row.text("instance_console_url"),
    }
}

pub struct StatusLookup {
    client: Arc<BigQueryClient>,
}

impl StatusLookup {
    pub fn new(client: Arc<BigQueryClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Lookup for StatusLookup {
    type Output = Option<StatusRecord>;

    async fn find(&self, key: &str) -> Result<Self::Output, LookupError> {
        let table = self.client.config().status_table_ref()?;
        let sql = format!(
            "SELECT item_name, current_status, details, last_checked \
             FROM `{table}` \
             WHERE LOWER(item_name) = @resource_name \
             LIMIT 1"
        );

        tracing::info!(resource = key, "Querying resource status");
        let rows = self
            .client
            .query(&sql, &[("resource_name", key)], 1)
            .await?;

        let record = rows.first().map(status_from_row);
        if let Some(record) = &record {
            tracing::info!(resource = key, ?record, "Status record found");
        }
        Ok(record)
    }
}

fn status_from_row(row: &Row) -> StatusRecord {
    StatusRecord {
        item_name: row.text("item_name"),
        current_status: row.text("current_status"),
        details: row.text("details"),
        last_checked: row.timestamp("last_checked"),
    }
}
