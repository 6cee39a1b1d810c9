use std::error::Error;
use tracing::warn;

use crate::{error::WeatherError, model::CurrentWeather};

/// One-line summary of current conditions.
pub fn weather_excerpt(weather: &CurrentWeather) -> String {
    format!(
        "Weather for {}: {} Temperature={}K Humidity={} Cloudy={}% Wind={}m/s, {}°",
        weather.name,
        weather.description().unwrap_or("unknown"),
        weather.main.temp,
        weather.main.humidity,
        weather.clouds.all,
        weather.wind.speed,
        weather.wind.deg,
    )
}

/// Chat reply to `nick` for a lookup of `city`.
pub fn format_reply(nick: &str, city: &str, result: &Result<CurrentWeather, WeatherError>) -> String {
    match result {
        Ok(weather) => format!("{nick}: {}", weather_excerpt(weather)),
        Err(WeatherError::Service { body, .. }) => {
            format!("{nick}: Weather service returned error for {city}: {body}")
        }
        Err(e) => {
            warn!("Failed to get weather for {city}: {e}");
            let cause = e.source().map_or_else(|| e.to_string(), ToString::to_string);
            let short: String = cause.chars().take(20).collect();
            format!("{nick}: Failed to get weather for {city}: {short}")
        }
    }
}
