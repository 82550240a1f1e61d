//! Authenticated request pipeline
//!
//! Every call on a credential goes through the same two steps:
//! 1. Refresh gate: if the credential is stale, exchange its refresh token
//!    and update it in place (one attempt, failure aborts the call)
//! 2. Issue the request with `Authorization: Bearer <access_token>`
//!
//! A fresh credential costs one round trip, a stale one two, in that order.

use std::fmt;
use std::sync::Arc;

use common::Secret;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use transport::{Method, Request, ReqwestTransport, Transport, TransportConfig};

use crate::constants::{
    CONTINUATIONS_PATH, Environment, OVERRIDE_PATH, TRANSACTIONS_PATH,
    USER_AGENT as CLIENT_USER_AGENT,
};
use crate::credentials::{AccessGrant, Credential};
use crate::error::{Error, Result};
use crate::token::{CreateTransactionOptions, TokenExchanger};
use crate::transactions::{OverrideTransactionOptions, UpdateTransactionOptions};

/// Configures a [`Client`]. The API secret is required.
#[derive(Default)]
pub struct ClientBuilder {
    api_secret: Option<Secret<String>>,
    environment: Environment,
    api_host: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    transport_config: TransportConfig,
}

impl ClientBuilder {
    pub fn api_secret(mut self, secret: impl Into<Secret<String>>) -> Self {
        self.api_secret = Some(secret.into());
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Explicit host; takes precedence over the environment.
    pub fn api_host(mut self, host: impl Into<String>) -> Self {
        self.api_host = Some(host.into());
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Timeouts for the default reqwest transport. Ignored when a custom
    /// transport is supplied.
    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = config;
        self
    }

    pub fn build(self) -> Result<Client> {
        let api_secret = match self.api_secret {
            Some(secret) if !secret.is_blank() => secret,
            _ => {
                return Err(Error::Config(
                    "api_secret must be provided when instantiating the Berbix client".into(),
                ));
            }
        };

        let api_host = self
            .api_host
            .unwrap_or_else(|| self.environment.host().to_string())
            .trim_end_matches('/')
            .to_string();

        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new(self.transport_config)?),
        };

        Ok(Client {
            exchanger: TokenExchanger::new(transport.clone(), api_host.clone(), api_secret),
            transport,
            api_host,
        })
    }
}

/// Berbix API client bound to one service account.
pub struct Client {
    transport: Arc<dyn Transport>,
    api_host: String,
    exchanger: TokenExchanger,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_host", &self.api_host)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Production client with the default transport.
    pub fn new(api_secret: impl Into<Secret<String>>) -> Result<Self> {
        Self::builder().api_secret(api_secret).build()
    }

    pub fn api_host(&self) -> &str {
        &self.api_host
    }

    pub async fn create_transaction(&self, opts: &CreateTransactionOptions) -> Result<Credential> {
        self.exchanger
            .exchange(TRANSACTIONS_PATH, to_body(opts)?)
            .await
    }

    /// Exchange the credential's refresh token for a new credential. The
    /// argument is left untouched.
    pub async fn refresh_tokens(&self, credential: &Credential) -> Result<Credential> {
        self.exchanger.refresh(credential).await
    }

    pub async fn exchange_code(&self, code: &str) -> Result<Credential> {
        self.exchanger.exchange_code(code).await
    }

    pub async fn fetch_transaction(&self, credential: &mut Credential) -> Result<serde_json::Value> {
        self.call(Method::Get, credential, TRANSACTIONS_PATH, None)
            .await?
            .ok_or(Error::EmptyResponse("fetch_transaction"))
    }

    pub async fn delete_transaction(&self, credential: &mut Credential) -> Result<()> {
        self.call(Method::Delete, credential, TRANSACTIONS_PATH, None)
            .await?;
        Ok(())
    }

    pub async fn update_transaction(
        &self,
        credential: &mut Credential,
        opts: &UpdateTransactionOptions,
    ) -> Result<serde_json::Value> {
        self.call(Method::Patch, credential, TRANSACTIONS_PATH, Some(to_body(opts)?))
            .await?
            .ok_or(Error::EmptyResponse("update_transaction"))
    }

    pub async fn override_transaction(
        &self,
        credential: &mut Credential,
        opts: &OverrideTransactionOptions,
    ) -> Result<()> {
        self.call(Method::Patch, credential, OVERRIDE_PATH, Some(to_body(opts)?))
            .await?;
        Ok(())
    }

    /// Create a continuation token for resuming the verification flow.
    pub async fn create_continuation(&self, credential: &mut Credential) -> Result<String> {
        let body = self
            .call(Method::Post, credential, CONTINUATIONS_PATH, Some(json!({})))
            .await?
            .ok_or(Error::EmptyResponse("create_continuation"))?;
        body.get("value")
            .and_then(|v| v.as_str())
            .map(str::to_owned)
            .ok_or_else(|| {
                Error::UnexpectedResponse("continuation response has no string `value`".into())
            })
    }

    /// Refresh `credential` if needed, then issue an authenticated request.
    ///
    /// Returns the parsed JSON body, or `None` for a 204. A refresh failure
    /// aborts before the target request is sent.
    pub async fn call(
        &self,
        method: Method,
        credential: &mut Credential,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Option<serde_json::Value>> {
        let grant = self.refresh_if_necessary(credential).await?;

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", grant.access_token.expose()))
            .map_err(|e| Error::InvalidRequest(format!("invalid access token: {e}")))?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let request = Request {
            method,
            url: format!("{}{}", self.api_host, path),
            headers,
            body,
            basic_auth: None,
        };
        Ok(self.transport.request(request).await?)
    }

    async fn refresh_if_necessary<'c>(
        &self,
        credential: &'c mut Credential,
    ) -> Result<&'c AccessGrant> {
        if credential.needs_refresh() {
            debug!(
                transaction_id = credential.resource_id().unwrap_or("<unknown>"),
                "credential stale, refreshing"
            );
            let fresh = self.exchanger.refresh(credential).await?;
            credential.apply_refresh(fresh);
        }
        credential
            .grant()
            .ok_or_else(|| Error::TokenExchange("no access grant after refresh".into()))
    }
}

fn to_body<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| Error::InvalidRequest(e.to_string()))
}
