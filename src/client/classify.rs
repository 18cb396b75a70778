//! Decides whether a response means "token no longer valid".
//!
//! The backend reports expiry two ways: HTTP 401/403, or a 2xx envelope with
//! `success: false`. For the latter a structured `code` is trusted when present;
//! the message phrase list is only consulted when the server sent no code.

use serde_json::Value;

use crate::error::Error;
use crate::models::ApiEnvelope;

/// Structured error codes that mean the bearer credential was rejected.
///
/// Numeric codes are compared in their decimal form.
pub const AUTH_FAILURE_CODES: &[&str] = &[
    "401",
    "403",
    "TOKEN_EXPIRED",
    "TOKEN_INVALID",
    "INVALID_TOKEN",
    "JWT_EXPIRED",
    "JWT_MALFORMED",
    "UNAUTHORIZED",
    "UNAUTHENTICATED",
];

/// Message heuristics. A message matches a group when it contains every word in it.
pub const AUTH_FAILURE_PHRASES: &[&[&str]] = &[
    &["jwt"],
    &["unauthorized"],
    &["expired", "token"],
    &["invalid", "token"],
    &["malformed", "token"],
];

/// How one HTTP exchange turned out.
#[derive(Debug)]
pub enum Classification {
    Success(Value),
    /// Internal only: drives refresh and retry, never returned to callers.
    TokenInvalid,
    /// A business failure, passed to the caller unchanged.
    Rejected(Error),
}

/// Whether a `success: false` envelope is really an authentication failure.
pub fn is_auth_failure(envelope: &ApiEnvelope) -> bool {
    if let Some(code) = envelope.code.as_deref() {
        return AUTH_FAILURE_CODES
            .iter()
            .any(|known| known.eq_ignore_ascii_case(code.trim()));
    }
    envelope
        .message
        .as_deref()
        .map(message_looks_like_auth_failure)
        .unwrap_or(false)
}

pub fn message_looks_like_auth_failure(message: &str) -> bool {
    let message = message.to_lowercase();
    AUTH_FAILURE_PHRASES
        .iter()
        .any(|group| group.iter().all(|word| message.contains(word)))
}

/// Classifies a raw response. Transport failures never reach this point.
pub fn classify(status: u16, raw: &[u8]) -> Classification {
    if status == 401 || status == 403 {
        return Classification::TokenInvalid;
    }

    let success_status = (200..300).contains(&status);
    let body = match parse_body(raw) {
        Ok(body) => body,
        Err(e) if success_status => {
            return Classification::Rejected(Error::Decode(format!(
                "response body is not JSON: {}",
                e
            )))
        }
        Err(_) => Value::String(String::from_utf8_lossy(raw).trim().to_string()),
    };

    let envelope = ApiEnvelope::from_body(&body);
    if success_status && !envelope.is_failure() {
        return Classification::Success(body);
    }
    if success_status && is_auth_failure(&envelope) {
        return Classification::TokenInvalid;
    }

    let message = match (&envelope.message, &body) {
        (Some(message), _) => message.clone(),
        (None, Value::String(text)) if !text.is_empty() => text.clone(),
        _ => reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("request failed")
            .to_string(),
    };
    Classification::Rejected(Error::Business {
        status,
        code: envelope.code,
        message,
        body,
    })
}

fn parse_body(raw: &[u8]) -> Result<Value, serde_json::Error> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(message: &str) -> ApiEnvelope {
        ApiEnvelope {
            success: Some(false),
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn auth_flavoured_messages_match() {
        for message in [
            "jwt expired",
            "JWT malformed",
            "Unauthorized",
            "Token has expired",
            "Invalid token",
            "Invalid refresh token",
            "malformed token",
        ] {
            assert!(
                message_looks_like_auth_failure(message),
                "expected '{}' to match",
                message
            );
        }
    }

    #[test]
    fn business_messages_do_not_match() {
        for message in [
            "Session not found",
            "Plan limit exceeded",
            "Invalid fluid volume",
            "Lab result expired and was archived",
        ] {
            assert!(
                !message_looks_like_auth_failure(message),
                "expected '{}' not to match",
                message
            );
        }
    }

    #[test]
    fn structured_code_takes_precedence_over_message() {
        let mut env = envelope("invalid token in request payload");
        env.code = Some("VALIDATION_FAILED".into());
        assert!(!is_auth_failure(&env));

        let mut env = envelope("please sign in again");
        env.code = Some("token_expired".into());
        assert!(is_auth_failure(&env));
    }

    #[test]
    fn status_401_and_403_are_token_invalid() {
        assert!(matches!(classify(401, b""), Classification::TokenInvalid));
        assert!(matches!(
            classify(403, br#"{"message":"forbidden"}"#),
            Classification::TokenInvalid
        ));
    }

    #[test]
    fn success_false_with_auth_message_is_token_invalid() {
        let raw = br#"{"success": false, "message": "jwt expired"}"#;
        assert!(matches!(classify(200, raw), Classification::TokenInvalid));
    }

    #[test]
    fn numeric_auth_code_in_success_envelope_is_token_invalid() {
        let raw = br#"{"success": false, "message": "jwt expired", "code": 401}"#;
        assert!(matches!(classify(200, raw), Classification::TokenInvalid));
    }

    #[test]
    fn numeric_business_code_is_rejected() {
        let raw = br#"{"success": false, "message": "Too many entries", "code": 429}"#;
        match classify(200, raw) {
            Classification::Rejected(Error::Business { code, .. }) => {
                assert_eq!(code.as_deref(), Some("429"))
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn list_of_messages_is_a_business_error() {
        let raw = br#"{"success": false, "message": ["volume is required"]}"#;
        match classify(200, raw) {
            Classification::Rejected(Error::Business {
                status, message, ..
            }) => {
                assert_eq!(status, 200);
                assert_eq!(message, "volume is required");
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn success_false_business_error_is_rejected() {
        let raw = br#"{"success": false, "message": "Plan limit exceeded", "code": "PLAN_LIMIT"}"#;
        match classify(200, raw) {
            Classification::Rejected(Error::Business {
                status,
                code,
                message,
                ..
            }) => {
                assert_eq!(status, 200);
                assert_eq!(code.as_deref(), Some("PLAN_LIMIT"));
                assert_eq!(message, "Plan limit exceeded");
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn auth_wording_on_error_status_is_not_token_invalid() {
        let raw = br#"{"success": false, "message": "invalid token format in upload"}"#;
        assert!(matches!(
            classify(400, raw),
            Classification::Rejected(Error::Business { status: 400, .. })
        ));
    }

    #[test]
    fn success_body_is_returned_whole() {
        let raw = br#"{"success": true, "data": [1, 2]}"#;
        match classify(200, raw) {
            Classification::Success(body) => {
                assert_eq!(body, json!({"success": true, "data": [1, 2]}))
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn empty_success_body_is_null() {
        assert!(matches!(
            classify(204, b""),
            Classification::Success(Value::Null)
        ));
    }

    #[test]
    fn non_json_success_body_is_a_decode_error() {
        assert!(matches!(
            classify(200, b"<html>"),
            Classification::Rejected(Error::Decode(_))
        ));
    }

    #[test]
    fn plain_text_error_body_becomes_message() {
        match classify(502, b"Bad gateway from upstream") {
            Classification::Rejected(Error::Business { message, .. }) => {
                assert_eq!(message, "Bad gateway from upstream")
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn missing_message_falls_back_to_reason_phrase() {
        match classify(404, b"{}") {
            Classification::Rejected(Error::Business { message, .. }) => {
                assert_eq!(message, "Not Found")
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }
}
