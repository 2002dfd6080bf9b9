//! OIDC userinfo endpoint resolution
//!
//! Turns the `[oidc]` configuration section into a single validated userinfo
//! endpoint. A directly configured userinfo endpoint wins; otherwise the
//! discovery document is fetched once and its `userinfo_endpoint` is used.
//! Every failure here is fatal to startup.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

const DISCOVERY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_USERNAME_CLAIM: &str = "preferred_username";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors raised while validating the OIDC configuration
#[derive(Error, Debug)]
pub enum OidcConfigError {
    #[error("no open id connect endpoints set")]
    EmptyConfiguration,

    #[error("invalid discovery uri: {0}")]
    InvalidDiscoveryUri(String),

    #[error("discovery request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid discovery response: {0}")]
    InvalidDiscoveryResponse(String),

    #[error("discovery did not disclose userinfo endpoint")]
    DiscoveryResponseMissingUserInfo,

    #[error("invalid userinfo uri: {0}")]
    InvalidUserInfoUri(String),

    #[error("insecure userinfo uri: {0}")]
    InsecureUserInfoUri(String),
}

/// The `[oidc]` section of the configuration file.
///
/// Either `discoveryEndpoint` or `userInfoEndpoint` has to be set. When both
/// are present the userinfo endpoint takes precedence and discovery is
/// skipped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OidcConfiguration {
    /// OpenID Connect Discovery 1.0 document URL
    #[serde(default, rename = "discoveryEndpoint", alias = "discoveryendpoint")]
    pub discovery_endpoint: Option<String>,

    /// OpenID Connect userinfo endpoint URL
    #[serde(default, rename = "userInfoEndpoint", alias = "userinfoendpoint")]
    pub userinfo_endpoint: Option<String>,

    /// Claim of the userinfo response used as the caller's name
    #[serde(default, rename = "usernameClaim", alias = "usernameclaim")]
    pub username_claim: Option<String>,

    /// Upper bound for a single userinfo round-trip
    #[serde(
        default,
        rename = "requestTimeoutSeconds",
        alias = "requesttimeoutseconds"
    )]
    pub request_timeout_seconds: Option<u64>,

    /// Lifetime of cached identities; absent or zero disables the cache
    #[serde(default, rename = "cacheTtlSeconds", alias = "cachettlseconds")]
    pub cache_ttl_seconds: Option<u64>,
}

impl OidcConfiguration {
    /// Resolve the configuration into a validated userinfo endpoint.
    ///
    /// Performs at most one outbound request, and only when the userinfo
    /// endpoint has to be discovered.
    pub async fn resolve(&self) -> Result<UserInfoEndpoint, OidcConfigError> {
        let raw = match (&self.userinfo_endpoint, &self.discovery_endpoint) {
            (None, None) => return Err(OidcConfigError::EmptyConfiguration),
            (Some(userinfo), _) => userinfo.clone(),
            (None, Some(discovery)) => discover_userinfo_endpoint(discovery).await?,
        };

        UserInfoEndpoint::parse(&raw)
    }

    /// Claim used to derive the caller's username
    pub fn username_claim(&self) -> &str {
        self.username_claim
            .as_deref()
            .filter(|claim| !claim.trim().is_empty())
            .unwrap_or(DEFAULT_USERNAME_CLAIM)
    }

    /// Timeout applied to each identity-provider request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_seconds
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Cache lifetime, `None` when caching is disabled
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_seconds
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

async fn discover_userinfo_endpoint(discovery_endpoint: &str) -> Result<String, OidcConfigError> {
    let discovery_url = Url::parse(discovery_endpoint)
        .map_err(|e| OidcConfigError::InvalidDiscoveryUri(format!("{}: {}", discovery_endpoint, e)))?;

    if discovery_url.scheme() != "http" && discovery_url.scheme() != "https" {
        return Err(OidcConfigError::InvalidDiscoveryUri(format!(
            "unsupported scheme '{}'",
            discovery_url.scheme()
        )));
    }

    tracing::info!("Requesting OIDC discovery document from {}", discovery_url);

    let client = reqwest::Client::new();
    let response = client
        .get(discovery_url)
        .timeout(Duration::from_secs(DISCOVERY_TIMEOUT_SECS))
        .send()
        .await?;

    let body = response.bytes().await?;
    let document: Map<String, Value> = serde_json::from_slice(&body)
        .map_err(|e| OidcConfigError::InvalidDiscoveryResponse(e.to_string()))?;

    match document.get("userinfo_endpoint") {
        None => Err(OidcConfigError::DiscoveryResponseMissingUserInfo),
        Some(Value::String(endpoint)) => {
            tracing::debug!("Discovered userinfo endpoint {}", endpoint);
            Ok(endpoint.clone())
        }
        Some(other) => Err(OidcConfigError::InvalidDiscoveryResponse(format!(
            "userinfo_endpoint is not a string: {}",
            other
        ))),
    }
}

/// A userinfo endpoint that passed validation and uses `https`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfoEndpoint(Url);

impl UserInfoEndpoint {
    /// Parse and validate a userinfo endpoint URL
    pub fn parse(raw: &str) -> Result<Self, OidcConfigError> {
        let url = Url::parse(raw)
            .map_err(|e| OidcConfigError::InvalidUserInfoUri(format!("{}: {}", raw, e)))?;

        if url.scheme() != "https" {
            return Err(OidcConfigError::InsecureUserInfoUri(url.to_string()));
        }

        Ok(Self(url))
    }

    /// Skips the scheme check so mock providers on plain http can be used
    #[cfg(test)]
    pub(crate) fn insecure(raw: &str) -> Self {
        Self(Url::parse(raw).expect("valid test url"))
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for UserInfoEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
