//! Minimal Matrix client-server API client: long-poll `/sync` and send text messages.

use anyhow::anyhow;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, de::DeserializeOwned};
use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tracing::{debug, instrument};

use crate::error::MatrixError;

pub mod events;

pub use events::{RoomEvent, SyncResponse, TextMessage};

/// A fully qualified user id, `@localpart:server`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId {
    localpart: String,
    server: String,
}

impl UserId {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let rest = s
            .strip_prefix('@')
            .ok_or_else(|| anyhow!("Invalid user id '{s}': must start with '@'"))?;
        let (localpart, server) = rest
            .split_once(':')
            .ok_or_else(|| anyhow!("Invalid user id '{s}': expected @user:server"))?;

        if localpart.is_empty() || server.is_empty() {
            return Err(anyhow!("Invalid user id '{s}': expected @user:server"));
        }

        Ok(Self { localpart: localpart.to_string(), server: server.to_string() })
    }

    /// The name people use to address this user in chat.
    pub fn localpart(&self) -> &str {
        &self.localpart
    }

    pub fn server(&self) -> &str {
        &self.server
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}:{}", self.localpart, self.server)
    }
}

/// Nick of a sender id, falling back to the raw id when it doesn't parse.
pub fn display_nick(sender: &str) -> &str {
    sender
        .strip_prefix('@')
        .and_then(|rest| rest.split_once(':'))
        .map(|(local, _)| local)
        .filter(|local| !local.is_empty())
        .unwrap_or(sender)
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    errcode: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    event_id: String,
}

#[derive(Debug)]
pub struct MatrixClient {
    http: Client,
    homeserver: Url,
    access_token: String,
    txn_prefix: i64,
    txn_counter: AtomicU64,
}

impl MatrixClient {
    pub fn new(http: Client, homeserver: Url, access_token: String) -> Self {
        Self {
            http,
            homeserver,
            access_token,
            txn_prefix: chrono::Utc::now().timestamp_millis(),
            txn_counter: AtomicU64::new(0),
        }
    }

    pub fn homeserver(&self) -> &Url {
        &self.homeserver
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, MatrixError> {
        let mut url = self.homeserver.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| MatrixError::Url(self.homeserver.to_string()))?;
            path.pop_if_empty().extend(["_matrix", "client", "v3"]).extend(segments);
        }
        Ok(url)
    }

    fn next_txn_id(&self) -> String {
        let n = self.txn_counter.fetch_add(1, Ordering::Relaxed);
        format!("weatherbot.{}.{}", self.txn_prefix, n)
    }

    /// Long-poll for new events. `timeout` is how long the server may hold the request.
    #[instrument(skip(self), level = "debug")]
    pub async fn sync(
        &self,
        since: Option<&str>,
        timeout: Duration,
    ) -> Result<SyncResponse, MatrixError> {
        let url = self.endpoint(&["sync"])?;
        let timeout_ms = timeout.as_millis().to_string();

        let mut query = vec![("timeout", timeout_ms.as_str())];
        if let Some(since) = since {
            query.push(("since", since));
        }

        let res = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&query)
            .send()
            .await?;

        let sync: SyncResponse = decode(res).await?;
        debug!(next_batch = %sync.next_batch, rooms = sync.rooms.join.len(), "sync batch");
        Ok(sync)
    }

    /// Post an `m.text` message; returns the new event id.
    #[instrument(skip(self, body), level = "debug")]
    pub async fn send_text(&self, room_id: &str, body: &str) -> Result<String, MatrixError> {
        let txn_id = self.next_txn_id();
        let url = self.endpoint(&["rooms", room_id, "send", "m.room.message", &txn_id])?;

        let res = self
            .http
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "msgtype": "m.text", "body": body }))
            .send()
            .await?;

        let sent: SendResponse = decode(res).await?;
        debug!(event_id = %sent.event_id, "message sent");
        Ok(sent.event_id)
    }
}

async fn decode<T: DeserializeOwned>(res: Response) -> Result<T, MatrixError> {
    let status = res.status();
    let body = res.text().await?;

    if !status.is_success() {
        let details: Option<ErrorBody> = serde_json::from_str(&body).ok();
        let (errcode, error) = details.map(|d| (d.errcode, d.error)).unwrap_or_default();
        return Err(MatrixError::Status { status, errcode, error });
    }

    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user_id() {
        let id = UserId::parse("@weatherbot:example.org").expect("valid id");
        assert_eq!(id.localpart(), "weatherbot");
        assert_eq!(id.server(), "example.org");
        assert_eq!(id.to_string(), "@weatherbot:example.org");
    }

    #[test]
    fn server_may_contain_port() {
        let id = UserId::parse("@bot:localhost:8448").expect("valid id");
        assert_eq!(id.localpart(), "bot");
        assert_eq!(id.server(), "localhost:8448");
    }

    #[test]
    fn rejects_malformed_user_ids() {
        for bad in ["weatherbot", "@weatherbot", "@:example.org", "@bot:", "bot:example.org"] {
            assert!(UserId::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn display_nick_strips_server() {
        assert_eq!(display_nick("@alice:example.org"), "alice");
        assert_eq!(display_nick("alice"), "alice");
    }

    #[test]
    fn endpoint_encodes_room_id() {
        let hs = Url::parse("https://matrix.example.org/").expect("valid url");
        let client = MatrixClient::new(Client::new(), hs, "token".into());
        let url = client
            .endpoint(&["rooms", "!abc/def:example.org", "send"])
            .expect("base url");
        assert_eq!(
            url.as_str(),
            "https://matrix.example.org/_matrix/client/v3/rooms/!abc%2Fdef:example.org/send"
        );
    }

    #[test]
    fn txn_ids_are_unique() {
        let hs = Url::parse("https://matrix.example.org").expect("valid url");
        let client = MatrixClient::new(Client::new(), hs, "token".into());
        assert_ne!(client.next_txn_id(), client.next_txn_id());
    }
}
