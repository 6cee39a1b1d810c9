//! Integration tests for OpenWeatherProvider using wiremock.

use reqwest::{Client, StatusCode};
use weatherbot_core::{OpenWeatherProvider, WeatherError, WeatherProvider};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn moscow() -> serde_json::Value {
    serde_json::json!({
        "coord": {"lon": 37.62, "lat": 55.75},
        "weather": [{"id": 600, "main": "Snow", "description": "light snow", "icon": "13n"}],
        "main": {"temp": 269.15, "pressure": 1021, "humidity": 92, "temp_min": 268.15, "temp_max": 270.15},
        "wind": {"speed": 2, "deg": 170},
        "clouds": {"all": 75},
        "dt": 1547488800,
        "sys": {"country": "RU", "sunrise": 1547444943, "sunset": 1547472622},
        "id": 524901,
        "name": "Moscow"
    })
}

#[tokio::test]
async fn test_current_weather_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Moscow"))
        .and(query_param("appid", "APPID"))
        .respond_with(ResponseTemplate::new(200).set_body_json(moscow()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let base = format!("{}/data/2.5", mock_server.uri());
    let provider = OpenWeatherProvider::with_base_url(Client::new(), "APPID".into(), &base);

    let weather = provider.current_weather("Moscow").await.unwrap();

    assert_eq!(weather.name, "Moscow");
    assert_eq!(weather.description(), Some("light snow"));
    assert_eq!(weather.main.humidity, 92.0);
    assert!(weather.rain.is_none());
}

#[tokio::test]
async fn test_current_weather_city_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "cod": "404",
            "message": "city not found"
        })))
        .mount(&mock_server)
        .await;

    let provider =
        OpenWeatherProvider::with_base_url(Client::new(), "APPID".into(), &mock_server.uri());

    let err = provider.current_weather("Atlantis").await.unwrap_err();

    match err {
        WeatherError::Service { status, body } => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert!(body.contains("city not found"), "body: {body}");
        }
        other => panic!("expected service error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_current_weather_malformed_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"name\": 1}"))
        .mount(&mock_server)
        .await;

    let provider =
        OpenWeatherProvider::with_base_url(Client::new(), "APPID".into(), &mock_server.uri());

    let err = provider.current_weather("Moscow").await.unwrap_err();
    assert!(matches!(err, WeatherError::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn test_current_weather_unreachable() {
    let provider =
        OpenWeatherProvider::with_base_url(Client::new(), "APPID".into(), "http://127.0.0.1:9");

    let err = provider.current_weather("Moscow").await.unwrap_err();
    assert!(matches!(err, WeatherError::Transport(_)), "got {err:?}");
}
