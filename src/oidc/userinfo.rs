//! Userinfo lookups against the identity provider
//!
//! Bearer tokens are never inspected locally. The caller's `Authorization`
//! header is forwarded to the userinfo endpoint and the provider's answer
//! decides whether the request is authenticated.

use http::header::AUTHORIZATION;
use http::{HeaderValue, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde_json::{Map, Value};
use thiserror::Error;

use super::cache::IdentityCache;
use super::discovery::{OidcConfiguration, UserInfoEndpoint};
use crate::middleware::upstream::UpstreamMiddleware;

/// The authenticated caller, attached to the request for downstream handlers
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// Display name stamped onto persisted records
    pub username: String,
    /// The full userinfo response
    pub claims: Map<String, Value>,
}

#[derive(Error, Debug)]
pub enum UserInfoError {
    #[error("identity provider rejected the supplied credentials")]
    Unauthorized,

    #[error("identity provider denied access")]
    Forbidden,

    #[error("unexpected response code during authentication validation")]
    UnexpectedStatus(StatusCode),

    #[error("unable to reach identity provider: {0}")]
    Transport(#[from] reqwest_middleware::Error),

    #[error("unable to decode userinfo response: {0}")]
    Decode(String),

    #[error("userinfo response does not contain a '{0}' claim")]
    MissingUsername(String),
}

/// Shared client for the resolved userinfo endpoint
pub struct UserInfoClient {
    endpoint: UserInfoEndpoint,
    http: ClientWithMiddleware,
    username_claim: String,
    cache: Option<IdentityCache>,
}

impl UserInfoClient {
    /// Create the client; one instance serves every request
    pub fn new(endpoint: UserInfoEndpoint, config: &OidcConfiguration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let http = ClientBuilder::new(client).with(UpstreamMiddleware).build();

        let cache = config.cache_ttl().map(IdentityCache::new);
        if let Some(ttl) = config.cache_ttl() {
            tracing::info!("Caching userinfo responses for {}s", ttl.as_secs());
        }

        Ok(Self {
            endpoint,
            http,
            username_claim: config.username_claim().to_string(),
            cache,
        })
    }

    pub fn endpoint(&self) -> &UserInfoEndpoint {
        &self.endpoint
    }

    /// Validate the credentials in `authorization` with the identity provider
    pub async fn fetch_identity(
        &self,
        authorization: &HeaderValue,
    ) -> Result<Identity, UserInfoError> {
        if let Some(cache) = &self.cache {
            if let Some(identity) = cache.get(authorization).await {
                tracing::debug!(user = %identity.username, "Using cached identity");
                return Ok(identity);
            }
        }

        let response = self
            .http
            .get(self.endpoint.as_url().clone())
            .header(AUTHORIZATION, authorization.clone())
            .send()
            .await?;

        let identity = match response.status() {
            StatusCode::OK => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| UserInfoError::Decode(e.to_string()))?;
                self.decode_identity(&body)?
            }
            StatusCode::UNAUTHORIZED => return Err(UserInfoError::Unauthorized),
            StatusCode::FORBIDDEN => return Err(UserInfoError::Forbidden),
            status => {
                tracing::warn!(status = status.as_u16(), "Unexpected userinfo response status");
                return Err(UserInfoError::UnexpectedStatus(status));
            }
        };

        if let Some(cache) = &self.cache {
            cache.insert(authorization.clone(), identity.clone()).await;
        }

        Ok(identity)
    }

    fn decode_identity(&self, body: &[u8]) -> Result<Identity, UserInfoError> {
        let claims: Map<String, Value> =
            serde_json::from_slice(body).map_err(|e| UserInfoError::Decode(e.to_string()))?;

        let username = match claims.get(&self.username_claim) {
            Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
            _ => return Err(UserInfoError::MissingUsername(self.username_claim.clone())),
        };

        Ok(Identity { username, claims })
    }
}
