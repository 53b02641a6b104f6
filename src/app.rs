use anyhow::Context;
use std::ops::Deref;
use std::sync::Arc;

use redis::aio::ConnectionManager;

use crate::cache::CachingFetcher;
use crate::config::Config;
use crate::http::HttpClient;
use crate::store;

/// Web pages cached in redis.
pub type PageCache = CachingFetcher<ConnectionManager, HttpClient>;

pub struct AppData(Arc<RuntimeData>);

impl From<RuntimeData> for AppData {
    fn from(data: RuntimeData) -> Self {
        Self(Arc::new(data))
    }
}

impl Clone for AppData {
    fn clone(&self) -> Self {
        AppData(Arc::clone(&self.0))
    }
}

impl Deref for AppData {
    type Target = Arc<RuntimeData>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(typed_builder::TypedBuilder)]
pub struct RuntimeData {
    pub pages: PageCache,
}

impl AppData {
    /// Connect to redis and build the page cache described by `config`.
    pub async fn prepare(config: &Config) -> anyhow::Result<Self> {
        let policy = config.cache.policy()?;
        let requester = HttpClient::new(config.http.timeout())?;

        let addr = config.redis.addr();
        let conn = store::connect(&addr).await.with_context(|| {
            format!(
                "fail to open redis connection to {}:{}",
                config.redis.host, config.redis.port
            )
        })?;
        let pages = PageCache::connect(conn, requester, policy)
            .await
            .with_context(|| "redis is not answering")?;

        Ok(RuntimeData::builder().pages(pages).build().into())
    }
}
