use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable copy of a chat message, written over REST alongside the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub conversation_id: String,
    pub sender: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub images: Option<String>,
    pub created_at: DateTime<Utc>,
}
