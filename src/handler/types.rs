use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Form fields Slack posts for a slash command. Only `command` and `text`
/// drive behaviour; the rest is kept for log context.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct SlackCommand {
    pub team_id: String,
    pub team_domain: String,
    pub channel_id: String,
    pub channel_name: String,
    pub user_id: String,
    pub user_name: String,
    pub command: String,
    pub text: String,
    pub response_url: String,
    pub trigger_id: String,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Ephemeral,
    InChannel,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SlackResponse {
    pub response_type: ResponseType,
    #[serde(flatten)]
    pub body: MessageBody,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum MessageBody {
    Text { text: String },
    Blocks { blocks: Vec<Block> },
}

impl SlackResponse {
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Ephemeral,
            body: MessageBody::Text { text: text.into() },
        }
    }

    pub fn ephemeral_blocks(blocks: Vec<Block>) -> Self {
        Self {
            response_type: ResponseType::Ephemeral,
            body: MessageBody::Blocks { blocks },
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Text { text } => Some(text),
            MessageBody::Blocks { .. } => None,
        }
    }

    pub fn blocks(&self) -> Option<&[Block]> {
        match &self.body {
            MessageBody::Blocks { blocks } => Some(blocks),
            MessageBody::Text { .. } => None,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { text: TextObject },
    Actions { elements: Vec<Button> },
    Divider,
}

impl Block {
    pub fn section(markdown: impl Into<String>) -> Self {
        Block::Section {
            text: TextObject::Markdown {
                text: markdown.into(),
            },
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum TextObject {
    #[serde(rename = "mrkdwn")]
    Markdown { text: String },
    #[serde(rename = "plain_text")]
    PlainText { text: String, emoji: bool },
}

/// A link button. Serialized in Slack's `button` element shape.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(into = "ButtonElement")]
pub struct Button {
    pub label: String,
    pub url: String,
}

#[derive(Serialize)]
struct ButtonElement {
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextObject,
    url: String,
}

impl From<Button> for ButtonElement {
    fn from(button: Button) -> Self {
        ButtonElement {
            kind: "button",
            text: TextObject::PlainText {
                text: button.label,
                emoji: true,
            },
            url: button.url,
        }
    }
}

/// A date/time column value as the store returned it.
#[derive(Debug, Clone, PartialEq)]
pub enum Timestamp {
    At(DateTime<Utc>),
    Raw(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub project: Option<String>,
    pub status: Option<String>,
    pub zone: Option<String>,
    pub machine_type: Option<String>,
    pub created_at: Option<Timestamp>,
    pub console_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusRecord {
    pub item_name: Option<String>,
    pub current_status: Option<String>,
    pub details: Option<String>,
    pub last_checked: Option<Timestamp>,
}
