//! Short-lived Berbix credentials
//!
//! A `Credential` always carries the long-lived refresh token. The access
//! grant (access token, optional client token, expiry, transaction id) is
//! either wholly present, after any successful exchange, or wholly absent,
//! when the caller built the credential from a bare refresh token. The
//! client mutates a credential in place when it refreshes it; the refresh
//! token itself is never replaced.
//!
//! There is no internal locking. Two tasks sharing one credential behind an
//! external mutex is the caller's job; without one, both may refresh.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use common::Secret;

use crate::token::TokenResponse;

/// Access material obtained from the token endpoint.
///
/// `expires` is a unix timestamp in milliseconds (absolute), computed from
/// the response's `expires_in` delta at exchange time.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub access_token: Secret<String>,
    /// Only present for transaction-flavored responses
    pub client_token: Option<Secret<String>>,
    pub expires: u64,
    /// Transaction (or legacy user) id the tokens are scoped to
    pub resource_id: String,
}

#[derive(Clone)]
pub struct Credential {
    refresh_token: Secret<String>,
    grant: Option<AccessGrant>,
    last_response: serde_json::Value,
}

impl Credential {
    /// Build a credential from a stored refresh token. The first request
    /// made with it triggers a refresh.
    pub fn from_refresh(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: Secret::new(refresh_token.into()),
            grant: None,
            last_response: serde_json::Value::Null,
        }
    }

    pub(crate) fn from_token_response(
        token: TokenResponse,
        raw: serde_json::Value,
        now_millis: u64,
    ) -> Self {
        let expires = now_millis.saturating_add(token.expires_in.saturating_mul(1000));
        Self {
            refresh_token: Secret::new(token.refresh_token),
            grant: Some(AccessGrant {
                access_token: Secret::new(token.access_token),
                client_token: token.client_token.map(Secret::new),
                expires,
                resource_id: token.resource_id,
            }),
            last_response: raw,
        }
    }

    /// Whether the access grant is missing or expired as of now.
    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh_at(now_millis())
    }

    /// Whether the access grant is missing or expires at or before `now_millis`.
    pub fn needs_refresh_at(&self, now_millis: u64) -> bool {
        match &self.grant {
            Some(grant) => grant.expires <= now_millis,
            None => true,
        }
    }

    /// Take the access grant and raw response from a freshly exchanged
    /// credential, keeping this credential's refresh token.
    pub fn apply_refresh(&mut self, fresh: Credential) {
        let Credential {
            grant,
            last_response,
            ..
        } = fresh;
        self.grant = grant;
        self.last_response = last_response;
    }

    pub fn refresh_token(&self) -> &str {
        self.refresh_token.expose()
    }

    pub fn grant(&self) -> Option<&AccessGrant> {
        self.grant.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.grant.as_ref().map(|g| g.access_token.expose().as_str())
    }

    pub fn client_token(&self) -> Option<&str> {
        self.grant
            .as_ref()
            .and_then(|g| g.client_token.as_ref())
            .map(|t| t.expose().as_str())
    }

    /// Expiry as unix milliseconds.
    pub fn expires(&self) -> Option<u64> {
        self.grant.as_ref().map(|g| g.expires)
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.grant.as_ref().map(|g| g.resource_id.as_str())
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.resource_id()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.resource_id()
    }

    /// Raw JSON of the most recent token response (`Null` for a bare
    /// refresh-token credential that has never been exchanged).
    pub fn last_response(&self) -> &serde_json::Value {
        &self.last_response
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // last_response echoes the tokens, so it is left out
        f.debug_struct("Credential")
            .field("refresh_token", &self.refresh_token)
            .field("grant", &self.grant)
            .finish_non_exhaustive()
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
