//! Cache-aside access to remote pages, backed by a key-value store that also
//! keeps a per-key fetch counter.

// Data Module
pub mod cache;
pub mod error;
pub mod fetcher;
pub mod keys;
pub mod store;

mod flight;

// Runtime Module
#[cfg(feature = "reqwest")]
pub mod app;
pub mod config;
#[cfg(feature = "reqwest")]
pub mod http;

pub use cache::{CachePolicy, CachingFetcher};
pub use error::CacheError;
pub use fetcher::{CacheKey, FnFetcher, Fetcher, Payload};
pub use keys::{DerivedKeys, KeyScheme};
pub use store::{KvStore, MemoryStore, StoreError, StoreOp};
