use serde::Deserialize;
use serde_json::Value;

use super::envelope::payload;
use super::token::TokenPair;
use crate::error::{Error, Result};

/// Result of a credential exchange (login, registration, Google sign-in) or a refresh.
///
/// Refresh responses only carry `tokens`; `user` and `profile` stay `None`.
#[derive(Deserialize, Debug, Clone)]
pub struct AuthPayload {
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub profile: Option<Value>,
    pub tokens: TokenPair,
}

impl AuthPayload {
    /// Extracts the payload from either `data` or the top level of the body.
    pub fn from_body(body: &Value) -> Result<Self> {
        let auth: AuthPayload = serde_json::from_value(payload(body).clone())
            .map_err(|e| Error::Decode(format!("malformed auth payload: {}", e)))?;
        if !auth.tokens.is_complete() {
            return Err(Error::Decode("auth payload carries an incomplete token pair".into()));
        }
        Ok(auth)
    }
}

/// Body for `POST /auth/login`.
#[derive(serde::Serialize, Debug)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body for `POST /auth/register`.
#[derive(serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub full_name: &'a str,
}

/// Body for `POST /auth/google`.
#[derive(serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GoogleRequest<'a> {
    pub id_token: &'a str,
}

/// Body for `POST /auth/refresh` and `POST /auth/logout`.
#[derive(serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_enveloped_login_payload() {
        let body = json!({
            "success": true,
            "data": {
                "user": {"id": "u1", "email": "a@b.c"},
                "profile": {"fullName": "Ada"},
                "tokens": {"accessToken": "T1", "refreshToken": "R1"}
            }
        });
        let auth = AuthPayload::from_body(&body).unwrap();
        assert_eq!(auth.tokens, TokenPair::new("T1", "R1"));
        assert_eq!(auth.profile, Some(json!({"fullName": "Ada"})));
    }

    #[test]
    fn parses_bare_refresh_payload() {
        let body = json!({"tokens": {"accessToken": "T2", "refreshToken": "R2"}});
        let auth = AuthPayload::from_body(&body).unwrap();
        assert_eq!(auth.tokens, TokenPair::new("T2", "R2"));
        assert!(auth.user.is_none());
    }

    #[test]
    fn rejects_payload_without_refresh_token() {
        let body = json!({"tokens": {"accessToken": "T2"}});
        assert!(matches!(AuthPayload::from_body(&body), Err(Error::Decode(_))));

        let body = json!({"tokens": {"accessToken": "T2", "refreshToken": ""}});
        assert!(matches!(AuthPayload::from_body(&body), Err(Error::Decode(_))));
    }

    #[test]
    fn register_body_uses_camel_case() {
        let body = serde_json::to_value(RegisterRequest {
            email: "a@b.c",
            password: "pw",
            full_name: "Ada Lovelace",
        })
        .unwrap();
        assert_eq!(body["fullName"], "Ada Lovelace");
    }
}
