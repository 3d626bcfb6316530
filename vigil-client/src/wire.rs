use reqwest::Response;
use serde::{Deserialize, Deserializer};

use crate::error::{ClientError, Result};

/// Turn a non-success response into [`ClientError::Server`], keeping the
/// backend's own message.
pub(crate) async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let url = resp.url().to_string();
    let body = resp.text().await.unwrap_or_default();
    let message = server_message(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    log::warn!("{} from {}: {}", status.as_u16(), url, message);
    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}

pub(crate) fn server_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error", "detail"] {
            if let Some(serde_json::Value::String(msg)) = map.get(key) {
                return Some(msg.clone());
            }
        }
    }
    Some(body.to_string())
}

/// The `message` field of a successful JSON response, if any.
pub(crate) async fn success_message(resp: Response) -> Option<String> {
    let body = resp.text().await.ok()?;
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(serde_json::Value::Object(map)) => map
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned),
        _ => None,
    }
}

/// Ids arrive as either JSON strings or integers depending on the backend.
pub(crate) fn string_or_number<'de, D>(de: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(de)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_taken_from_known_fields() {
        assert_eq!(
            server_message(r#"{"message":"Invalid credentials"}"#).as_deref(),
            Some("Invalid credentials")
        );
        assert_eq!(
            server_message(r#"{"status":"no","error":"Device exists"}"#).as_deref(),
            Some("Device exists")
        );
        assert_eq!(
            server_message(r#"{"detail":"CSRF Failed"}"#).as_deref(),
            Some("CSRF Failed")
        );
    }

    #[test]
    fn message_falls_back_to_raw_body() {
        assert_eq!(server_message("  bad gateway \n").as_deref(), Some("bad gateway"));
        assert_eq!(server_message(r#"{"code":7}"#).as_deref(), Some(r#"{"code":7}"#));
        assert_eq!(server_message("   "), None);
    }
}
