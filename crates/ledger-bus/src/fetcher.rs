//! Peer reachability / root-config lookups over HTTP. Backs the two
//! collaborator calls the transfer-prepare path needs: "is this recipient
//! reachable" and "what is this debtor's current root config".

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootConfig {
    #[serde(rename = "rate")]
    pub interest_rate: f64,
}

#[async_trait]
pub trait PeerFetcher: Send + Sync {
    async fn is_reachable(&self, debtor_id: i64, creditor_id: i64) -> bool;
    async fn get_root_config(&self, debtor_id: i64) -> Option<RootConfig>;
}

/// `reqwest`-backed implementation hitting the peer's own introspection
/// endpoints. A timeout or transport error is treated as "unreachable" /
/// "no config available" — the conservative answer, per the concurrency
/// model's cancellation rules.
pub struct HttpPeerFetcher {
    client: reqwest::Client,
    base_url: String,
    config_cache: Mutex<LruCache<i64, RootConfig>>,
}

impl HttpPeerFetcher {
    pub fn new(base_url: String, timeout_seconds: f64, connections: usize, cache_size: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs_f64(timeout_seconds))
            .pool_max_idle_per_host(connections)
            .build()
            .expect("reqwest client configuration is valid");
        let cache_size = NonZeroUsize::new(cache_size.max(1)).expect("cache_size >= 1 after max(1)");
        Self {
            client,
            base_url,
            config_cache: Mutex::new(LruCache::new(cache_size)),
        }
    }
}

#[async_trait]
impl PeerFetcher for HttpPeerFetcher {
    async fn is_reachable(&self, debtor_id: i64, creditor_id: i64) -> bool {
        let url = format!("{}/accounts/{}/{}/reachable", self.base_url, debtor_id, creditor_id);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().as_u16() == 204,
            Err(e) => {
                tracing::warn!(error = %e, debtor_id, creditor_id, "peer reachability check failed, treating as unreachable");
                false
            }
        }
    }

    async fn get_root_config(&self, debtor_id: i64) -> Option<RootConfig> {
        if let Some(cached) = self.config_cache.lock().unwrap().get(&debtor_id) {
            return Some(cached.clone());
        }
        let url = format!("{}/accounts/{}/0/config", self.base_url, debtor_id);
        let body = match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp.text().await.ok()?,
            _ => return None,
        };
        let config: RootConfig = serde_json::from_str(&body).ok()?;
        self.config_cache.lock().unwrap().put(debtor_id, config.clone());
        Some(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_holds_one_entry_at_capacity_one() {
        let cache_size = NonZeroUsize::new(1).unwrap();
        let mut cache: LruCache<i64, RootConfig> = LruCache::new(cache_size);
        cache.put(1, RootConfig { interest_rate: 1.0 });
        cache.put(2, RootConfig { interest_rate: 2.0 });
        assert!(cache.get(&1).is_none());
        assert_eq!(cache.get(&2), Some(&RootConfig { interest_rate: 2.0 }));
    }
}
