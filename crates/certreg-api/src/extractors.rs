//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait for request DTOs and helpers that map
//! body and query-string rejections onto [`AppError::BadRequest`].

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Request types with rules beyond what serde checks.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`]
/// and oversized bodies to [`AppError::PayloadTooLarge`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| body_error(err.status(), err.body_text()))
}

fn body_error(status: StatusCode, text: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(text)
    } else {
        AppError::BadRequest(text)
    }
}

/// Parse an optional JSON body and validate it.
///
/// An empty or whitespace-only body yields `T::default()` whatever the
/// `Content-Type` says. Anything else must be valid JSON for `T`.
pub fn extract_optional_json<T>(result: Result<Bytes, BytesRejection>) -> Result<T, AppError>
where
    T: DeserializeOwned + Default + Validate,
{
    let bytes = result.map_err(|err| body_error(err.status(), err.body_text()))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: T = serde_json::from_slice(&bytes)
        .map_err(|err| AppError::BadRequest(format!("invalid JSON body: {err}")))?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Extract query parameters, mapping parse errors to [`AppError::BadRequest`].
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    struct Note {
        text: Option<String>,
    }

    impl Validate for Note {
        fn validate(&self) -> Result<(), String> {
            match &self.text {
                Some(t) if t.is_empty() => Err("text must not be empty".into()),
                _ => Ok(()),
            }
        }
    }

    fn parse(body: &'static str) -> Result<Note, AppError> {
        extract_optional_json(Ok(Bytes::from_static(body.as_bytes())))
    }

    #[test]
    fn blank_body_is_default() {
        assert!(parse("").unwrap().text.is_none());
        assert!(parse(" \n\t").unwrap().text.is_none());
    }

    #[test]
    fn json_body_is_parsed_and_validated() {
        assert_eq!(parse(r#"{"text":"hi"}"#).unwrap().text.as_deref(), Some("hi"));
        assert!(matches!(parse(r#"{"text":""}"#), Err(AppError::Validation(_))));
        assert!(matches!(parse("{not json"), Err(AppError::BadRequest(_))));
    }
}
