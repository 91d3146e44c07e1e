use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message on the workspace bus. Created by `send_message`; only the read
/// flag and its stamps ever change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub from_agent: String,
    #[serde(default)]
    pub to_agent: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_by: Option<String>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    pub fn new(id: u64, from_agent: String, to_agent: String, body: String) -> Self {
        Self {
            id,
            from_agent,
            to_agent,
            body,
            read: false,
            read_at: None,
            read_by: None,
            created_at: Utc::now(),
            extra: serde_json::Map::new(),
        }
    }

    /// First line of the body.
    pub fn subject(&self) -> &str {
        self.body.lines().next().unwrap_or("").trim()
    }

    pub fn mark_read(&mut self, by: &str) {
        self.read = true;
        self.read_at = Some(Utc::now());
        self.read_by = Some(by.to_string());
    }
}
