use anyhow::Context;
use std::borrow::Cow;
use std::future::Future;
use std::marker::PhantomData;

/// Anything that can identify a remote resource and be turned into a storage
/// key.
pub trait CacheKey {
    fn as_key(&self) -> Cow<'_, str>;
}

impl CacheKey for String {
    fn as_key(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl<'a> CacheKey for &'a str {
    fn as_key(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

#[cfg(feature = "reqwest")]
impl CacheKey for reqwest::Url {
    fn as_key(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

/// A fetched value that can be stored as an opaque blob.
pub trait Payload: Sized {
    fn to_bytes(&self) -> Vec<u8>;
    fn from_bytes(bytes: Vec<u8>) -> anyhow::Result<Self>;
}

impl Payload for String {
    fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn from_bytes(bytes: Vec<u8>) -> anyhow::Result<Self> {
        String::from_utf8(bytes).with_context(|| "cached payload is not valid UTF-8")
    }
}

impl Payload for Vec<u8> {
    fn to_bytes(&self) -> Vec<u8> {
        self.clone()
    }

    fn from_bytes(bytes: Vec<u8>) -> anyhow::Result<Self> {
        Ok(bytes)
    }
}

/// The expensive operation sitting behind the cache.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    type Key: CacheKey + Send + Sync;
    type Output: Payload + Send;

    async fn fetch(&self, key: &Self::Key) -> anyhow::Result<Self::Output>;
}

/// Turn a single-argument async function into a [`Fetcher`].
///
/// ```ignore
/// let fetcher = FnFetcher::new(|url: String| async move { anyhow::Ok(format!("body of {url}")) });
/// ```
pub struct FnFetcher<K, F> {
    f: F,
    _key: PhantomData<fn(K)>,
}

impl<K, F> FnFetcher<K, F> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _key: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<K, F, Fut, T> Fetcher for FnFetcher<K, F>
where
    K: CacheKey + Clone + Send + Sync,
    F: Fn(K) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<T>> + Send,
    T: Payload + Send,
{
    type Key = K;
    type Output = T;

    async fn fetch(&self, key: &K) -> anyhow::Result<T> {
        (self.f)(key.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_payload_rejects_invalid_utf8() {
        assert_eq!(String::from_bytes(b"hello".to_vec()).unwrap(), "hello");
        assert!(String::from_bytes(vec![0xff, 0xfe]).is_err());
    }

    #[tokio::test]
    async fn test_fn_fetcher_forwards_key() {
        let fetcher = FnFetcher::new(|key: String| async move { anyhow::Ok(key.to_uppercase()) });
        assert_eq!(fetcher.fetch(&"abc".to_string()).await.unwrap(), "ABC");
    }
}
