use crate::store::{StoreError, StoreOp};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything that can go wrong while serving a key through a
/// [`CachingFetcher`](crate::CachingFetcher).
///
/// None of these leave partial state behind: a failing fetch never writes the
/// cache entry nor bumps the counter.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The key can not be mapped onto the storage namespaces.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The backing store could not serve one of the operations. This is not a
    /// cache miss: the caller decides whether to go fetch-only or give up.
    #[error("store unavailable during {op}: {source}")]
    StoreUnavailable {
        op: StoreOp,
        #[source]
        source: StoreError,
    },

    /// The wrapped fetch operation failed. Nothing was cached.
    #[error("fail to fetch `{key}`: {source}")]
    FetchFailed {
        key: String,
        #[source]
        source: BoxError,
    },

    /// A cached value exists but can not be turned back into the payload type.
    #[error("cached entry `{key}` is corrupted: {source}")]
    CorruptEntry {
        key: String,
        #[source]
        source: BoxError,
    },
}

impl CacheError {
    pub(crate) fn store(op: StoreOp) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::StoreUnavailable { op, source }
    }

    pub(crate) fn fetch_failed(key: impl Into<String>, err: anyhow::Error) -> Self {
        Self::FetchFailed {
            key: key.into(),
            source: err.into(),
        }
    }

    pub(crate) fn corrupt(key: impl Into<String>, err: anyhow::Error) -> Self {
        Self::CorruptEntry {
            key: key.into(),
            source: err.into(),
        }
    }

    /// Whether the failure came from the store rather than from the key or the
    /// fetch itself.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }
}
