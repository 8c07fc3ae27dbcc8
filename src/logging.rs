//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

/// Bodies longer than this many bytes are truncated in the `info` level logs.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Fields of JSON bodies whose values are never logged.
const REDACTED_FIELDS: [&str; 2] = ["password", "token"];

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is truncated and
/// the full body is logged at the `debug` level. Request headers are not
/// logged, so bearer tokens never end up in the logs.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("could not read request body: {error}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    log_body(
        &format!("Received request: {} {}", parts.method, parts.uri),
        &body_text_for_log(&body_bytes),
    );

    let request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::error!("could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    log_body(
        &format!("Sending response: {}", parts.status),
        &body_text_for_log(&body_bytes),
    );

    Response::from_parts(parts, Body::from(body_bytes))
}

/// The text to log for a request or response body.
///
/// Any body that parses as JSON has its [REDACTED_FIELDS] masked, whatever its
/// `Content-Type` says. Other bodies that mention one of those fields are
/// replaced with a placeholder.
fn body_text_for_log(body: &Bytes) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => redact_json_fields(value),
        Err(_) => {
            let text = String::from_utf8_lossy(body);

            if REDACTED_FIELDS.iter().any(|field| text.contains(field)) {
                format!("<unparsed body of {} bytes>", body.len())
            } else {
                text.into_owned()
            }
        }
    }
}

fn redact_json_fields(value: Value) -> String {
    match value {
        Value::Object(mut object) => {
            for field in REDACTED_FIELDS {
                if let Some(value) = object.get_mut(field) {
                    *value = Value::String("********".to_owned());
                }
            }

            Value::Object(object).to_string()
        }
        other => other.to_string(),
    }
}

/// The longest prefix of `text` that fits in [LOG_BODY_LENGTH_LIMIT] bytes
/// without splitting a character.
fn truncate(text: &str) -> &str {
    if text.len() <= LOG_BODY_LENGTH_LIMIT {
        return text;
    }

    let end = (0..=LOG_BODY_LENGTH_LIMIT)
        .rev()
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(0);

    &text[..end]
}

fn log_body(message: &str, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!("{message}\nbody: {}...", truncate(body));
        tracing::debug!("Full body: {body:?}");
    } else {
        tracing::info!("{message}\nbody: {body:?}");
    }
}
