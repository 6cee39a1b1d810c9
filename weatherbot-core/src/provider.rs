use async_trait::async_trait;
use std::fmt::Debug;

use crate::{error::WeatherError, model::CurrentWeather};

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// Source of current weather conditions for a city.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_weather(&self, city: &str) -> Result<CurrentWeather, WeatherError>;
}
