use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};

/// DNS cache with a fixed TTL, backed by `moka` since `reqwest`'s
/// built-in resolver has no TTL knob of its own.
#[derive(Clone)]
pub struct CachedResolver {
    cache: Cache<String, Arc<Vec<SocketAddr>>>,
}

impl CachedResolver {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().time_to_live(ttl).build(),
        }
    }
}

impl Resolve for CachedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let cache = self.cache.clone();
        let host = name.as_str().to_string();
        Box::pin(async move {
            if let Some(addrs) = cache.get(&host).await {
                let iter: Addrs = Box::new(addrs.as_ref().clone().into_iter());
                return Ok(iter);
            }

            let lookup = format!("{host}:0");
            let resolved: Vec<SocketAddr> = tokio::net::lookup_host(lookup).await?.collect();
            cache.insert(host, Arc::new(resolved.clone())).await;
            let iter: Addrs = Box::new(resolved.into_iter());
            Ok(iter)
        })
    }
}
