//! Token exchange against the Berbix API
//!
//! Three payloads yield a full token set, all POSTed with HTTP Basic auth
//! (`<api_secret>:`):
//! 1. Transaction creation (`/v0/transactions`)
//! 2. Refresh (`/v0/tokens`, `grant_type=refresh_token`)
//! 3. Authorization code exchange (`/v0/tokens`, `grant_type=authorization_code`)
//!
//! A failed exchange never produces a partial credential.

use std::sync::Arc;

use common::Secret;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use transport::{BasicAuth, Method, Request, Transport};

use crate::constants::{TOKENS_PATH, USER_AGENT as CLIENT_USER_AGENT};
use crate::credentials::{Credential, now_millis};
use crate::error::{Error, Result};

/// Token fields consumed from an exchange response.
///
/// `expires_in` is a delta in seconds; `resource_id` comes from
/// `transaction_id`, falling back to the legacy `user_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    pub refresh_token: String,
    pub access_token: String,
    pub client_token: Option<String>,
    pub expires_in: u64,
    pub resource_id: String,
}

#[derive(Deserialize)]
struct WireTokenResponse {
    refresh_token: String,
    access_token: String,
    #[serde(default)]
    client_token: Option<String>,
    expires_in: u64,
    #[serde(default)]
    transaction_id: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

impl TokenResponse {
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let wire = WireTokenResponse::deserialize(value)
            .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))?;
        if wire.refresh_token.trim().is_empty() {
            return Err(Error::TokenExchange(
                "token response has an empty refresh_token".into(),
            ));
        }
        if wire.access_token.trim().is_empty() {
            return Err(Error::TokenExchange(
                "token response has an empty access_token".into(),
            ));
        }
        let resource_id = wire.transaction_id.or(wire.user_id).ok_or_else(|| {
            Error::TokenExchange("token response missing transaction_id".into())
        })?;
        Ok(Self {
            refresh_token: wire.refresh_token,
            access_token: wire.access_token,
            client_token: wire.client_token,
            expires_in: wire.expires_in,
            resource_id,
        })
    }
}

/// Options for the hosted verification flow.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HostedOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

/// Fields for creating a transaction. Unset fields are omitted from the body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateTransactionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosted_options: Option<HostedOptions>,
}

pub fn refresh_payload(refresh_token: &str) -> serde_json::Value {
    json!({
        "refresh_token": refresh_token,
        "grant_type": "refresh_token",
    })
}

pub fn code_payload(code: &str) -> serde_json::Value {
    json!({
        "code": code,
        "grant_type": "authorization_code",
    })
}

/// Turns a payload into a fresh `Credential` using the service account secret.
pub struct TokenExchanger {
    transport: Arc<dyn Transport>,
    api_host: String,
    api_secret: Secret<String>,
}

impl TokenExchanger {
    pub fn new(
        transport: Arc<dyn Transport>,
        api_host: impl Into<String>,
        api_secret: Secret<String>,
    ) -> Self {
        Self {
            transport,
            api_host: api_host.into(),
            api_secret,
        }
    }

    /// POST `payload` to `path` and build a credential from the response.
    pub async fn exchange(&self, path: &str, payload: serde_json::Value) -> Result<Credential> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        let request = Request {
            method: Method::Post,
            url: format!("{}{}", self.api_host, path),
            headers,
            body: Some(payload),
            basic_auth: Some(BasicAuth {
                username: self.api_secret.expose().clone(),
                password: None,
            }),
        };

        debug!(path, "exchanging tokens");
        let raw = self
            .transport
            .request(request)
            .await?
            .ok_or(Error::EmptyResponse("token exchange"))?;
        let token = TokenResponse::from_json(&raw)?;
        debug!(path, transaction_id = %token.resource_id, expires_in = token.expires_in, "token exchange succeeded");

        Ok(Credential::from_token_response(token, raw, now_millis()))
    }

    pub async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        if credential.refresh_token().trim().is_empty() {
            return Err(Error::InvalidRequest(
                "credential has no refresh token".into(),
            ));
        }
        self.exchange(TOKENS_PATH, refresh_payload(credential.refresh_token()))
            .await
    }

    pub async fn exchange_code(&self, code: &str) -> Result<Credential> {
        self.exchange(TOKENS_PATH, code_payload(code)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transaction_response() {
        let raw = json!({
            "refresh_token": "r1",
            "access_token": "a1",
            "client_token": "c1",
            "expires_in": 600,
            "transaction_id": "tx_1",
            "hosted_url": "https://verify.berbix.com/x"
        });
        let token = TokenResponse::from_json(&raw).unwrap();
        assert_eq!(token.refresh_token, "r1");
        assert_eq!(token.access_token, "a1");
        assert_eq!(token.client_token.as_deref(), Some("c1"));
        assert_eq!(token.expires_in, 600);
        assert_eq!(token.resource_id, "tx_1");
    }

    #[test]
    fn falls_back_to_user_id() {
        let raw = json!({
            "refresh_token": "r1",
            "access_token": "a1",
            "expires_in": 60,
            "user_id": "u_7"
        });
        let token = TokenResponse::from_json(&raw).unwrap();
        assert_eq!(token.resource_id, "u_7");
        assert!(token.client_token.is_none());
    }

    #[test]
    fn transaction_id_wins_over_user_id() {
        let raw = json!({
            "refresh_token": "r1",
            "access_token": "a1",
            "expires_in": 60,
            "transaction_id": "tx_1",
            "user_id": "u_7"
        });
        assert_eq!(TokenResponse::from_json(&raw).unwrap().resource_id, "tx_1");
    }

    #[test]
    fn missing_access_token_is_rejected() {
        let raw = json!({"refresh_token": "r1", "expires_in": 60, "transaction_id": "tx"});
        let err = TokenResponse::from_json(&raw).unwrap_err();
        assert!(matches!(err, Error::TokenExchange(_)), "got: {err:?}");
    }

    #[test]
    fn blank_refresh_token_is_rejected() {
        let raw = json!({
            "refresh_token": "",
            "access_token": "a1",
            "expires_in": 60,
            "transaction_id": "tx"
        });
        let err = TokenResponse::from_json(&raw).unwrap_err();
        assert!(err.to_string().contains("refresh_token"), "got: {err}");
    }

    #[test]
    fn blank_access_token_is_rejected() {
        let raw = json!({
            "refresh_token": "r1",
            "access_token": " ",
            "expires_in": 60,
            "transaction_id": "tx"
        });
        let err = TokenResponse::from_json(&raw).unwrap_err();
        assert!(err.to_string().contains("access_token"), "got: {err}");
    }

    #[test]
    fn missing_resource_id_is_rejected() {
        let raw = json!({"refresh_token": "r1", "access_token": "a1", "expires_in": 60});
        let err = TokenResponse::from_json(&raw).unwrap_err();
        assert!(err.to_string().contains("transaction_id"), "got: {err}");
    }

    #[test]
    fn create_options_omit_unset_fields() {
        let opts = CreateTransactionOptions {
            customer_uid: Some("abc".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&opts).unwrap(), json!({"customer_uid": "abc"}));
    }

    #[test]
    fn create_options_nest_hosted_options() {
        let opts = CreateTransactionOptions {
            email: Some("a@b.c".into()),
            template_key: Some("tpk_1".into()),
            hosted_options: Some(HostedOptions {
                completion_email: Some("done@b.c".into()),
                redirect_url: None,
            }),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&opts).unwrap(),
            json!({
                "email": "a@b.c",
                "template_key": "tpk_1",
                "hosted_options": {"completion_email": "done@b.c"}
            })
        );
    }

    #[test]
    fn grant_payloads() {
        assert_eq!(
            refresh_payload("rt"),
            json!({"refresh_token": "rt", "grant_type": "refresh_token"})
        );
        assert_eq!(
            code_payload("abc"),
            json!({"code": "abc", "grant_type": "authorization_code"})
        );
    }
}
