//! `Transport` implementation backed by `reqwest`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;

use crate::{Request, Result, Transport, TransportError};

/// Timeouts applied to every request made by a `ReqwestTransport`.
#[derive(Debug, Clone, Copy)]
pub struct TransportConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(60),
            read_timeout: Duration::from_secs(60),
        }
    }
}

/// HTTPS transport over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: TransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;
        Ok(Self { client })
    }

    async fn send(&self, request: Request) -> Result<Option<serde_json::Value>> {
        let Request {
            method,
            url,
            headers,
            body,
            basic_auth,
        } = request;

        let mut builder = self
            .client
            .request(method.into(), url.as_str())
            .headers(headers);
        if let Some(body) = &body {
            builder = builder.json(body);
        }
        if let Some(auth) = basic_auth {
            builder = builder.basic_auth(auth.username, auth.password);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        debug!(%method, %url, status = status.as_u16(), "response received");
        if !status.is_success() {
            return Err(TransportError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(format!("reading response body: {e}")))?;
        if bytes.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

impl Transport for ReqwestTransport {
    fn request(
        &self,
        request: Request,
    ) -> Pin<Box<dyn Future<Output = Result<Option<serde_json::Value>>> + Send + '_>> {
        Box::pin(self.send(request))
    }
}
