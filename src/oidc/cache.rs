//! Short-lived identity cache
//!
//! Disabled unless `cacheTtlSeconds` is configured. Entries are keyed by the
//! exact `Authorization` header value and only successful lookups are stored.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::HeaderValue;
use tokio::sync::RwLock;

use super::userinfo::Identity;

struct CachedIdentity {
    identity: Identity,
    expires_at: Instant,
}

#[derive(Clone)]
pub struct IdentityCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<HeaderValue, CachedIdentity>>>,
}

impl IdentityCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Return the cached identity if it has not expired yet
    pub async fn get(&self, authorization: &HeaderValue) -> Option<Identity> {
        let entries = self.entries.read().await;
        entries
            .get(authorization)
            .filter(|cached| cached.expires_at > Instant::now())
            .map(|cached| cached.identity.clone())
    }

    /// Store an identity, dropping expired entries on the way
    pub async fn insert(&self, authorization: HeaderValue, identity: Identity) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, cached| cached.expires_at > now);
        entries.insert(
            authorization,
            CachedIdentity {
                identity,
                expires_at: now + self.ttl,
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
