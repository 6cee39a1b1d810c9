use reqwest::StatusCode;
use thiserror::Error;

/// Failure while asking the weather service for conditions.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// The request never produced a readable response.
    #[error("request to weather service failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered, but not with a success status.
    #[error("weather service returned {status}: {body}")]
    Service { status: StatusCode, body: String },

    #[error("could not decode weather response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("request to homeserver failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success reply. Matrix errors carry `errcode`/`error` in the body when available.
    #[error("homeserver returned {status}: {}", describe(.errcode, .error))]
    Status {
        status: StatusCode,
        errcode: Option<String>,
        error: Option<String>,
    },

    #[error("could not decode homeserver response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid homeserver url: {0}")]
    Url(String),
}

fn describe(errcode: &Option<String>, error: &Option<String>) -> String {
    match (errcode, error) {
        (Some(code), Some(msg)) => format!("{code} {msg}"),
        (Some(code), None) => code.clone(),
        (None, Some(msg)) => msg.clone(),
        (None, None) => "no error details".to_string(),
    }
}

/// Cut a response body down for logs and chat replies, respecting char boundaries.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_body_is_unchanged() {
        assert_eq!(truncate_body("city not found"), "city not found");
    }

    #[test]
    fn long_body_is_cut_on_char_boundary() {
        let body = "é".repeat(250);
        let cut = truncate_body(&body);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.trim_end_matches("...").chars().count(), 200);
    }

    #[test]
    fn status_error_mentions_errcode() {
        let err = MatrixError::Status {
            status: StatusCode::FORBIDDEN,
            errcode: Some("M_FORBIDDEN".into()),
            error: Some("Unknown token".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("403"));
        assert!(msg.contains("M_FORBIDDEN Unknown token"));
    }
}
