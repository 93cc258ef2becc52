use super::{ActionSink, StatusSource};
use crate::config::Settings;
use crate::error::{ErrorBody, RemoteError};
use crate::model::{PolicyListItem, StatusSnapshot, StopRequest};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

/// HTTP client for the policy service.
#[derive(Clone)]
pub struct PolicyClient {
    http: Client,
    base: Url,
}

impl PolicyClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let base = Url::parse(&settings.base_url)
            .with_context(|| format!("invalid base url {}", settings.base_url))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("base url {} cannot carry a path", settings.base_url);
        }
        let http = Client::builder()
            .user_agent(format!("policy-monitor/{}", env!("CARGO_PKG_VERSION")))
            .timeout(settings.request_timeout)
            .build()
            .context("build http client")?;
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Join path segments onto the base url, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn check(resp: Response) -> Result<Response, RemoteError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let raw = resp.bytes().await.unwrap_or_default();
        let body = serde_json::from_slice::<ErrorBody>(&raw).unwrap_or_default();
        Err(RemoteError::rejected(status.as_u16(), body))
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, RemoteError> {
        let resp = Self::check(resp).await?;
        let raw = resp.bytes().await?;
        serde_json::from_slice(&raw).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[async_trait]
impl StatusSource for PolicyClient {
    async fn get_all_policies(&self) -> Result<Vec<PolicyListItem>, RemoteError> {
        let resp = self
            .http
            .get(self.endpoint(&["policy", "all"]))
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn get_policies_status(&self) -> Result<Vec<StatusSnapshot>, RemoteError> {
        let resp = self
            .http
            .get(self.endpoint(&["policyContext"]))
            .send()
            .await?;
        Self::decode(resp).await
    }
}

#[async_trait]
impl ActionSink for PolicyClient {
    async fn run_policy(&self, id: &str) -> Result<(), RemoteError> {
        let resp = self
            .http
            .get(self.endpoint(&["policy", "run", id]))
            .send()
            .await?;
        Self::check(resp).await.map(|_| ())
    }

    async fn stop_policy(&self, request: &StopRequest) -> Result<(), RemoteError> {
        let resp = self
            .http
            .put(self.endpoint(&["policyContext"]))
            .json(request)
            .send()
            .await?;
        Self::check(resp).await.map(|_| ())
    }

    async fn delete_policy_checkpoint(&self, name: &str) -> Result<(), RemoteError> {
        let resp = self
            .http
            .delete(self.endpoint(&["policy", "checkpoint", name]))
            .send()
            .await?;
        Self::check(resp).await.map(|_| ())
    }
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod tests;
