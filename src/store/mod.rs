mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::connect;

use std::fmt;
use std::time::Duration;

/// Error raised by a [`KvStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Redis(#[from] ::redis::RedisError),

    #[error("value stored at `{0}` is not an integer")]
    NotAnInteger(String),

    #[error("increment of `{0}` would overflow")]
    Overflow(String),
}

/// The store primitive that was running when a [`StoreError`] happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Ping,
    Get,
    SetWithExpiration,
    Increment,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ping => "PING",
            Self::Get => "GET",
            Self::SetWithExpiration => "PSETEX",
            Self::Increment => "INCR",
        };
        f.write_str(name)
    }
}

/// A networked key-value store addressed by string keys.
///
/// Each operation must be atomic on its own. Nothing here spans two keys.
#[async_trait::async_trait]
pub trait KvStore: Send + Sync {
    /// Check that the store answers at all.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Read the value stored at `key`. Expired values are absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store `value` at `key` and let it expire after `ttl`, in one operation.
    async fn set_with_expiration(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Increment the integer at `key` by one, creating it from zero, and
    /// return the new value.
    async fn increment(&self, key: &str) -> Result<i64, StoreError>;
}
