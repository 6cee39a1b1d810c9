//! The slice of the `/sync` response the bot reads.

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct SyncResponse {
    pub next_batch: String,
    #[serde(default)]
    pub rooms: Rooms,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rooms {
    /// Keyed by room id.
    #[serde(default)]
    pub join: HashMap<String, JoinedRoom>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinedRoom {
    #[serde(default)]
    pub timeline: Timeline,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub events: Vec<RoomEvent>,
}

/// A timeline event. `content` stays untyped until the event kind is known.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub sender: String,
    /// Milliseconds since the epoch.
    pub origin_server_ts: i64,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub content: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    msgtype: Option<String>,
    body: Option<String>,
}

/// A plain text message pulled out of a [`RoomEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    pub sender: String,
    pub body: String,
    pub origin_server_ts: i64,
}

impl RoomEvent {
    pub fn text_message(&self) -> Option<TextMessage> {
        if self.kind != "m.room.message" {
            return None;
        }
        let content = MessageContent::deserialize(&self.content).ok()?;
        if content.msgtype.as_deref() != Some("m.text") {
            return None;
        }
        Some(TextMessage {
            sender: self.sender.clone(),
            body: content.body?,
            origin_server_ts: self.origin_server_ts,
        })
    }
}
