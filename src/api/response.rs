//! Response decoding: envelope unwrapping, identifier normalization, and
//! error-body extraction.
//!
//! Backends behind this client are inconsistent about whether they wrap results
//! in `{ "data": ... }` and about whether identifiers come back as numbers or
//! strings. Both are normalized here so no caller has to know which shape a
//! given endpoint uses.

use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;

/// Decoded success payload, plus the error shape if a 2xx body carried one.
#[derive(Debug)]
pub struct Payload {
  pub value: Value,
  /// Set when a successful response body itself looks like a backend error
  /// (`message` + `code`); surfaced as a warning, not a failure.
  pub warning: Option<ErrorBody>,
}

/// Error body shape the backend emits: `{ message, code?, field? }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
  pub message: Option<String>,
  pub code: Option<String>,
  pub field: Option<String>,
}

impl ErrorBody {
  /// Human-readable rendering, code first when present.
  pub fn display(&self) -> String {
    let message = self.message.as_deref().unwrap_or("unknown error");
    match &self.code {
      Some(code) => format!("{code}: {message}"),
      None => message.to_string(),
    }
  }
}

/// Decode a success response into a payload value.
///
/// - `204 No Content` yields `Value::Null` regardless of declared content type.
/// - JSON bodies are parsed, envelope-unwrapped, and id-normalized.
/// - Text bodies come back as `Value::String`.
/// - Anything else is a contract violation.
pub async fn decode_payload(response: Response) -> Result<Payload, ApiError> {
  if response.status() == StatusCode::NO_CONTENT {
    return Ok(Payload {
      value: Value::Null,
      warning: None,
    });
  }

  let content_type = response
    .headers()
    .get(reqwest::header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .unwrap_or("")
    .to_string();

  if is_json(&content_type) {
    let text = response
      .text()
      .await
      .map_err(|e| ApiError::Decode(e.to_string()))?;
    if text.is_empty() {
      return Ok(Payload {
        value: Value::Null,
        warning: None,
      });
    }
    let parsed: Value =
      serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))?;
    let warning = soft_error(&parsed);
    let mut value = unwrap_envelope(parsed);
    normalize_ids(&mut value);
    Ok(Payload { value, warning })
  } else if content_type.starts_with("text/") {
    let text = response
      .text()
      .await
      .map_err(|e| ApiError::Decode(e.to_string()))?;
    Ok(Payload {
      value: Value::String(text),
      warning: None,
    })
  } else {
    Err(ApiError::UnsupportedContentType(content_type))
  }
}

/// Build an [`ApiError`] from a non-success response, parsing the backend's
/// error body when it is JSON and falling back to the canonical status text.
pub async fn error_from_response(response: Response) -> ApiError {
  let status = response.status();
  let fallback = status
    .canonical_reason()
    .unwrap_or("request failed")
    .to_string();
  let body = response.text().await.unwrap_or_default();

  match serde_json::from_str::<ErrorBody>(&body) {
    Ok(parsed) => ApiError::Http {
      status: status.as_u16(),
      message: parsed.message.unwrap_or(fallback),
      code: parsed.code,
      field: parsed.field,
    },
    Err(_) => ApiError::Http {
      status: status.as_u16(),
      message: fallback,
      code: None,
      field: None,
    },
  }
}

fn is_json(content_type: &str) -> bool {
  content_type.starts_with("application/json") || content_type.contains("+json")
}

/// `{ "data": X }` means X is the payload; anything else is the payload itself.
pub fn unwrap_envelope(value: Value) -> Value {
  match value {
    Value::Object(mut map) => match map.remove("data") {
      Some(inner) => inner,
      None => Value::Object(map),
    },
    other => other,
  }
}

/// Rewrite every numeric property literally named `id` to its decimal string
/// form, recursing through arrays and nested objects. Keeps identifier
/// comparisons and URL interpolation stable regardless of what numeric
/// precision the backend emits.
pub fn normalize_ids(value: &mut Value) {
  match value {
    Value::Array(items) => {
      for item in items {
        normalize_ids(item);
      }
    }
    Value::Object(map) => {
      if let Some(id) = map.get_mut("id") {
        if let Value::Number(n) = id {
          *id = Value::String(n.to_string());
        }
      }
      for (_, v) in map.iter_mut() {
        normalize_ids(v);
      }
    }
    _ => {}
  }
}

/// A 2xx body that carries both `message` and `code` is treated as a soft
/// error worth warning about.
fn soft_error(value: &Value) -> Option<ErrorBody> {
  let map = value.as_object()?;
  let message = map.get("message")?.as_str()?;
  let code = map.get("code")?.as_str()?;
  Some(ErrorBody {
    message: Some(message.to_string()),
    code: Some(code.to_string()),
    field: map.get("field").and_then(Value::as_str).map(String::from),
  })
}
