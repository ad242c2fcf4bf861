//! Turns lookup results into Slack replies.

use crate::types::{Block, Button, ResourceRecord, SlackResponse, StatusRecord, Timestamp};

const CONSOLE_BUTTON_LABEL: &str = "🔗 Open in GCP Console";

pub trait Formatter: Send + Sync {
    type Input;

    fn format(&self, key: &str, found: Self::Input) -> SlackResponse;
}

/// Renders a stored date/time as `DD-MM-YYYY at HH:MM UTC`.
pub fn format_timestamp(value: Option<&Timestamp>) -> String {
    match value {
        Some(Timestamp::At(dt)) => dt.format("%d-%m-%Y at %H:%M UTC").to_string(),
        Some(Timestamp::Raw(raw)) => raw.clone(),
        None => "Not available".to_string(),
    }
}

fn or_na(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("N/A")
}

pub struct ResourceFormatter;

impl Formatter for ResourceFormatter {
    type Input = Vec<ResourceRecord>;

    fn format(&self, key: &str, records: Vec<ResourceRecord>) -> SlackResponse {
        if records.is_empty() {
            tracing::warn!(resource = key, "No information found");
            return SlackResponse::ephemeral(format!(
                "No information found for resource: *{key}*."
            ));
        }

        let last = records.len() - 1;
        let mut blocks = Vec::new();
        for (i, record) in records.iter().enumerate() {
            blocks.push(Block::section(resource_summary(record)));

            if let Some(url) = record.console_url.as_deref().filter(|u| !u.is_empty()) {
                blocks.push(Block::Actions {
                    elements: vec![Button {
                        label: CONSOLE_BUTTON_LABEL.to_string(),
                        url: url.to_string(),
                    }],
                });
            }

            if i != last {
                blocks.push(Block::Divider);
            }
        }

        SlackResponse::ephemeral_blocks(blocks)
    }
}

fn resource_summary(record: &ResourceRecord) -> String {
    format!(
        "ℹ️ Information for *{}* (ID: *{}*):\n   \
         • Project: *{}*\n   \
         • Status: *{}*\n   \
         • Zone: *{}*\n   \
         • Machine Type: *{}*\n   \
         • Created/Updated: _{}_",
        or_na(&record.name),
        or_na(&record.id),
        or_na(&record.project),
        or_na(&record.status),
        or_na(&record.zone),
        or_na(&record.machine_type),
        format_timestamp(record.created_at.as_ref()),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTier {
    Favorable,
    Pending,
    Unfavorable,
}

impl StatusTier {
    /// Case-insensitive substring classification of a status value.
    pub fn classify(status: &str) -> Self {
        let status = status.to_lowercase();

        if contains_any(&status, &["active", "ok", "complete"]) {
            StatusTier::Favorable
        } else if contains_any(&status, &["pending", "in progress"]) {
            StatusTier::Pending
        } else {
            StatusTier::Unfavorable
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            StatusTier::Favorable => "✅",
            StatusTier::Pending => "⏳",
            StatusTier::Unfavorable => "❌",
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

pub struct StatusFormatter;

impl Formatter for StatusFormatter {
    type Input = Option<StatusRecord>;

    fn format(&self, key: &str, record: Option<StatusRecord>) -> SlackResponse {
        let Some(record) = record else {
            tracing::info!(resource = key, "Not found in the status check table");
            return SlackResponse::ephemeral(format!(
                "❓ Resource *{key}* was not found for status check."
            ));
        };

        let tier = StatusTier::classify(record.current_status.as_deref().unwrap_or("unknown"));
        let item = record.item_name.as_deref().unwrap_or(key);
        let status = or_na(&record.current_status);

        let message = match tier {
            StatusTier::Favorable => {
                format!("Resource *{item}* has a favorable status: *{status}*.")
            }
            StatusTier::Pending => format!("Resource *{item}* has status: *{status}*."),
            StatusTier::Unfavorable => {
                format!("Resource *{item}* requires attention. Status: *{status}*.")
            }
        };

        SlackResponse::ephemeral(format!(
            "{} {}\n   • Details: _{}_\n   • Last checked: _{}_",
            tier.glyph(),
            message,
            record.details.as_deref().unwrap_or("No additional details."),
            format_timestamp(record.last_checked.as_ref()),
        ))
    }
}
