use crate::error::CacheError;
use crate::fetcher::{CacheKey, Fetcher, Payload};
use crate::flight::SingleFlight;
use crate::keys::{DerivedKeys, KeyScheme};
use crate::store::{KvStore, StoreOp};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long a fetched payload stays in the cache when nothing else is set.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct CachePolicy {
    /// Lifetime of a cache entry. The fetch counter never expires.
    #[builder(default = DEFAULT_TTL)]
    pub ttl: Duration,
    #[builder(default)]
    pub keys: KeyScheme,
    /// Collapse concurrent misses on one key into a single fetch.
    #[builder(default = false)]
    pub single_flight: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Cache-aside wrapper around a [`Fetcher`].
///
/// A hit is served straight from the store. A miss calls the inner fetcher,
/// stores the payload with the policy TTL and bumps the fetch counter of the
/// key. The two writes are separate store operations: if the increment fails
/// the entry stays cached and the error is still reported.
pub struct CachingFetcher<S, F> {
    store: S,
    inner: F,
    policy: CachePolicy,
    flight: Option<SingleFlight>,
}

impl<S, F> CachingFetcher<S, F>
where
    S: KvStore,
    F: Fetcher,
{
    pub fn new(store: S, inner: F, policy: CachePolicy) -> Self {
        let flight = policy.single_flight.then(SingleFlight::default);
        Self {
            store,
            inner,
            policy,
            flight,
        }
    }

    /// Like [`CachingFetcher::new`], but refuse to build on top of a store
    /// that does not answer.
    pub async fn connect(store: S, inner: F, policy: CachePolicy) -> Result<Self, CacheError> {
        store
            .ping()
            .await
            .map_err(CacheError::store(StoreOp::Ping))?;
        Ok(Self::new(store, inner, policy))
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// Return the payload for `key`, from the cache when possible.
    pub async fn get(&self, key: &F::Key) -> Result<F::Output, CacheError> {
        let raw = key.as_key();
        let keys = self.policy.keys.derive(&raw)?;

        if let Some(payload) = self.lookup(&raw, &keys).await? {
            return Ok(payload);
        }

        let _flight = match &self.flight {
            Some(flight) => {
                let guard = flight.acquire(&keys.cached).await;
                // someone else may have filled it while we waited
                if let Some(payload) = self.lookup(&raw, &keys).await? {
                    return Ok(payload);
                }
                Some(guard)
            }
            None => None,
        };

        info!(key = %raw, "cache miss, fetching");
        let payload = match self.inner.fetch(key).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(key = %raw, "fetch failed: {err:#}");
                return Err(CacheError::fetch_failed(raw, err));
            }
        };

        self.store
            .set_with_expiration(&keys.cached, &payload.to_bytes(), self.policy.ttl)
            .await
            .map_err(CacheError::store(StoreOp::SetWithExpiration))?;
        let count = self
            .store
            .increment(&keys.count)
            .await
            .map_err(CacheError::store(StoreOp::Increment))?;
        debug!(key = %raw, count, "payload cached");

        Ok(payload)
    }

    /// How many times `key` had to be fetched. Hits are not counted.
    pub async fn fetch_count(&self, key: &F::Key) -> Result<u64, CacheError> {
        let keys = self.policy.keys.derive(&key.as_key())?;
        let Some(raw) = self
            .store
            .get(&keys.count)
            .await
            .map_err(CacheError::store(StoreOp::Get))?
        else {
            return Ok(0);
        };

        std::str::from_utf8(&raw)
            .ok()
            .and_then(|count| count.parse::<u64>().ok())
            .ok_or_else(|| {
                CacheError::corrupt(
                    keys.count.clone(),
                    anyhow::anyhow!("counter is not an unsigned integer"),
                )
            })
    }

    async fn lookup(
        &self,
        raw: &str,
        keys: &DerivedKeys,
    ) -> Result<Option<F::Output>, CacheError> {
        let Some(bytes) = self
            .store
            .get(&keys.cached)
            .await
            .map_err(CacheError::store(StoreOp::Get))?
        else {
            return Ok(None);
        };

        let payload = <F::Output as Payload>::from_bytes(bytes)
            .map_err(|err| CacheError::corrupt(&keys.cached, err))?;
        info!(key = %raw, "cache hit");
        Ok(Some(payload))
    }
}
