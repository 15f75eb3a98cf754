// edep-net/src/registry.rs
use std::collections::HashMap;
use std::time::Duration;

use edep_common::config::Config;
use edep_common::error::{EdepError, Result};
use edep_common::model::registry::{ImageDockerAuth, RegistryService, RegistryServices};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

const REQUEST_TIMEOUT_SECS: u64 = 120;
const CONNECT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT_STRING: &str = "edep service dependency manager (Rust)";

/// Lookup parameters for `GET orgs/{org}/services`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceQuery {
    pub org: String,
    pub url: String,
    pub version: Option<String>,
    pub arch: String,
}

impl ServiceQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("url", self.url.clone())];
        if let Some(version) = self.version.as_ref().filter(|v| !v.is_empty()) {
            params.push(("version", version.clone()));
        }
        params.push(("arch", self.arch.clone()));
        params
    }
}

/// What the resolver needs from the service registry.
#[allow(async_fn_in_trait)]
pub trait Registry {
    /// Every service matching the query, keyed by registry id. No match is an
    /// empty map, not an error.
    async fn get_services(
        &self,
        query: &ServiceQuery,
        creds: Option<&str>,
    ) -> Result<HashMap<String, RegistryService>>;

    /// Image pull credentials stored for a service; none stored is an empty
    /// list.
    async fn get_docker_auths(
        &self,
        org: &str,
        service_id: &str,
        creds: Option<&str>,
    ) -> Result<Vec<ImageDockerAuth>>;
}

/// HTTP implementation of [`Registry`].
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
    auth_org: Option<String>,
    default_creds: Option<String>,
}

impl RegistryClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            base_url: config.registry_url.trim_end_matches('/').to_string(),
            auth_org: config.org.clone(),
            default_creds: config.user_auth.clone(),
        })
    }

    /// Splits `user:password` into basic-auth parts, qualifying a bare user
    /// with the configured org.
    fn basic_auth(&self, creds: Option<&str>) -> Option<(String, String)> {
        let creds = creds
            .filter(|c| !c.is_empty())
            .or(self.default_creds.as_deref())?;
        let (user, password) = creds.split_once(':').unwrap_or((creds, ""));
        let user = match (&self.auth_org, user.contains('/')) {
            (Some(org), false) => format!("{org}/{user}"),
            _ => user.to_string(),
        };
        Some((user, password.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&'static str, String)],
        creds: Option<&str>,
    ) -> Result<Option<T>> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("Registry GET {} {:?}", url, params);

        let mut request = self.client.get(&url).query(params);
        if let Some((user, password)) = self.basic_auth(creds) {
            request = request.basic_auth(user, Some(password));
        }

        let response = request.send().await.map_err(|e| {
            debug!("HTTP request failed for {url}: {e}");
            EdepError::Fetch(format!("registry request {url} failed: {e}"))
        })?;
        let status = response.status();
        debug!("Received HTTP status: {} for {}", status, url);

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read response body".to_string());
            error!("HTTP error {} for URL {}: {}", status, url, body_text);
            return Err(EdepError::Fetch(format!(
                "registry returned HTTP {status} for {url}: {body_text}"
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            EdepError::Fetch(format!("failed to read registry response from {url}: {e}"))
        })?;
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| EdepError::Parse(url.clone(), e.to_string()))
    }
}

impl Registry for RegistryClient {
    async fn get_services(
        &self,
        query: &ServiceQuery,
        creds: Option<&str>,
    ) -> Result<HashMap<String, RegistryService>> {
        let path = format!("orgs/{}/services", query.org);
        let response: Option<RegistryServices> =
            self.get_json(&path, &query.params(), creds).await?;
        Ok(response.map(|r| r.services).unwrap_or_default())
    }

    async fn get_docker_auths(
        &self,
        org: &str,
        service_id: &str,
        creds: Option<&str>,
    ) -> Result<Vec<ImageDockerAuth>> {
        let path = format!("orgs/{org}/services/{service_id}/dockauths");
        let auths: Option<Vec<ImageDockerAuth>> = self.get_json(&path, &[], creds).await?;
        Ok(auths.unwrap_or_default())
    }
}

fn build_http_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| EdepError::Fetch(format!("Failed to build HTTP client: {e}")))
}
