use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response of OpenWeatherMap's current weather endpoint.
///
/// No `units` parameter is sent, so temperatures are in Kelvin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub coord: Coordinate,
    pub weather: Vec<WeatherItem>,
    pub main: MainWeather,
    pub wind: Wind,
    pub clouds: Clouds,
    /// Time of data calculation, unix seconds.
    pub dt: i64,
    pub sys: Sys,
    /// City id.
    pub id: i64,
    /// City name.
    pub name: String,
    #[serde(default)]
    pub rain: Option<Rain>,
}

impl CurrentWeather {
    pub fn observation_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.dt, 0)
    }

    pub fn description(&self) -> Option<&str> {
        self.weather.first().map(|w| w.description.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f32,
    pub lat: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherItem {
    pub id: i64,
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MainWeather {
    pub temp: f32,
    pub pressure: f32,
    /// Percent; the service sends integers but the field is declared as a float.
    pub humidity: f32,
    pub temp_min: f32,
    pub temp_max: f32,
    #[serde(default)]
    pub sea_level: Option<f32>,
    #[serde(default)]
    pub grnd_level: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    /// m/s
    pub speed: f32,
    /// Meteorological degrees.
    #[serde(default)]
    pub deg: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clouds {
    /// Cloudiness, %.
    pub all: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sys {
    #[serde(default)]
    pub country: Option<String>,
    /// Unix seconds, UTC.
    pub sunrise: i64,
    pub sunset: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rain {
    #[serde(rename = "3h", default)]
    pub h3: Option<f32>,
    #[serde(rename = "1h", default)]
    pub h1: Option<f32>,
}
