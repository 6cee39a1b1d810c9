//! Core library for `weatherbot`, a Matrix bot that answers weather queries.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - A weather provider abstraction backed by OpenWeatherMap
//! - A minimal Matrix client (sync + send)
//! - The sync loop that turns chat messages into weather replies
//!
//! It is used by `weatherbot-cli`, but can also be embedded elsewhere.

pub mod bot;
pub mod config;
pub mod error;
pub mod http;
pub mod matrix;
pub mod model;
pub mod provider;
pub mod reply;
pub mod state;

pub use bot::{Bot, BotOptions, Responder};
pub use config::{BotTuning, Config, Settings};
pub use error::{MatrixError, WeatherError};
pub use matrix::{MatrixClient, UserId};
pub use model::CurrentWeather;
pub use provider::{OpenWeatherProvider, WeatherProvider};
pub use state::SyncState;
