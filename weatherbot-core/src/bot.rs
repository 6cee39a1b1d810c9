//! The sync loop and the per-message responder.

use anyhow::Context;
use chrono::{DateTime, Utc};
use std::{future::Future, path::Path, sync::Arc, time::Duration};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::{
    config::Settings,
    matrix::{MatrixClient, SyncResponse, TextMessage, UserId, display_nick},
    provider::WeatherProvider,
    reply::format_reply,
    state::SyncState,
};

/// Word that marks a message as a weather query.
pub const KEYWORD: &str = "weather";

/// Extract the city from a message like `weatherbot: weather Paris`.
///
/// The first whitespace-delimited word (minus a trailing `:`) must be `bot_name`,
/// and the rest must mention [`KEYWORD`]. Every occurrence of the keyword is dropped from the city.
pub fn parse_query(bot_name: &str, body: &str) -> Option<String> {
    let (first, rest) = body.split_once(char::is_whitespace)?;
    if first.trim_end_matches(':') != bot_name {
        return None;
    }
    if !rest.contains(KEYWORD) {
        return None;
    }

    let city = rest.replace(KEYWORD, "");
    let city = city.trim();
    (!city.is_empty()).then(|| city.to_string())
}

/// Whether a message sent at `origin_ts_ms` is too old to answer at `now`.
pub fn is_stale(origin_ts_ms: i64, now: DateTime<Utc>, stale_after: Duration) -> bool {
    let age_ms = now.timestamp_millis() - origin_ts_ms;
    age_ms > i64::try_from(stale_after.as_millis()).unwrap_or(i64::MAX)
}

/// Answers a single query; cheap to clone into spawned tasks.
#[derive(Debug, Clone)]
pub struct Responder {
    matrix: Arc<MatrixClient>,
    weather: Arc<dyn WeatherProvider>,
    stale_after: Duration,
}

impl Responder {
    pub fn new(
        matrix: Arc<MatrixClient>,
        weather: Arc<dyn WeatherProvider>,
        stale_after: Duration,
    ) -> Self {
        Self { matrix, weather, stale_after }
    }

    /// Look up `city` and reply in `room_id`, unless the query went stale meanwhile.
    /// Returns whether a reply was sent.
    pub async fn respond(&self, room_id: &str, message: &TextMessage, city: &str) -> bool {
        debug!("Got query for {city}");
        let result = self.weather.current_weather(city).await;

        if is_stale(message.origin_server_ts, Utc::now(), self.stale_after) {
            let excerpt: String = message.body.chars().take(20).collect();
            warn!(
                "It has been too long since the message {excerpt} from {} was sent, not responding",
                message.sender
            );
            return false;
        }

        let reply = format_reply(display_nick(&message.sender), city, &result);
        match self.matrix.send_text(room_id, &reply).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to send reply: {e}");
                false
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct BotOptions {
    pub retry_delay: Duration,
    pub sync_timeout: Duration,
}

impl From<&Settings> for BotOptions {
    fn from(s: &Settings) -> Self {
        Self { retry_delay: s.retry_delay, sync_timeout: s.sync_timeout }
    }
}

#[derive(Debug)]
pub struct Bot {
    user_id: UserId,
    matrix: Arc<MatrixClient>,
    responder: Responder,
    options: BotOptions,
    since: Option<String>,
    tasks: JoinSet<()>,
}

impl Bot {
    pub fn new(
        user_id: UserId,
        matrix: Arc<MatrixClient>,
        responder: Responder,
        options: BotOptions,
        since: Option<String>,
    ) -> Self {
        Self { user_id, matrix, responder, options, since, tasks: JoinSet::new() }
    }

    /// Current sync position.
    pub fn since(&self) -> Option<&str> {
        self.since.as_deref()
    }

    /// Spawn a responder for every query addressed to the bot in `sync`.
    /// Returns the number of spawned responders.
    pub fn dispatch(&mut self, sync: &SyncResponse) -> usize {
        let own_id = self.user_id.to_string();
        let mut spawned = 0;

        for (room_id, room) in &sync.rooms.join {
            for message in room.timeline.events.iter().filter_map(|e| e.text_message()) {
                if message.sender == own_id {
                    continue;
                }
                let Some(city) = parse_query(self.user_id.localpart(), &message.body) else {
                    continue;
                };

                let responder = self.responder.clone();
                let room_id = room_id.clone();
                self.tasks.spawn(async move {
                    responder.respond(&room_id, &message, &city).await;
                });
                spawned += 1;
            }
        }

        spawned
    }

    /// Run the sync loop until `shutdown` resolves. Returns the last sync position.
    pub async fn run<F>(mut self, shutdown: F) -> Option<String>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(user = %self.user_id, homeserver = %self.matrix.homeserver(), "bot started");

        loop {
            while let Some(res) = self.tasks.try_join_next() {
                if let Err(e) = res {
                    if e.is_panic() {
                        error!("responder task panicked: {e}");
                    }
                }
            }

            let sync = tokio::select! {
                _ = &mut shutdown => break,
                res = self.matrix.sync(self.since.as_deref(), self.options.sync_timeout) => res,
            };

            match sync {
                Ok(sync) => {
                    let spawned = self.dispatch(&sync);
                    if spawned > 0 {
                        debug!(spawned, "dispatched queries");
                    }
                    self.since = Some(sync.next_batch);
                }
                Err(e) => {
                    warn!("sync failure {e}");
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(self.options.retry_delay) => {}
                    }
                    warn!("retrying sync");
                }
            }
        }

        info!("bot stopping");
        self.tasks.shutdown().await;
        self.since
    }

    /// [`Bot::run`], then save the final sync position to `state_file`.
    pub async fn run_and_persist<F>(self, shutdown: F, state_file: &Path) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let next_batch = self.run(shutdown).await;
        SyncState { next_batch }
            .save(state_file)
            .context("Failed to persist sync position")
    }
}
