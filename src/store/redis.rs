use super::{KvStore, StoreError};
use redis::{aio::ConnectionManager, AsyncCommands};
use std::time::Duration;

/// Open a managed connection to the redis server at `addr`.
///
/// The manager reconnects on its own after a dropped connection, so a
/// transient outage shows up as failing calls instead of a dead handle.
pub async fn connect(addr: &str) -> Result<ConnectionManager, StoreError> {
    let client = redis::Client::open(addr)?;
    Ok(client.get_connection_manager().await?)
}

/// PSETEX argument for `ttl`: saturates instead of wrapping, and never zero
/// since redis rejects that.
fn expiration_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

// Cloning the manager is cheap and every clone shares one multiplexed
// connection.
#[async_trait::async_trait]
impl KvStore for ConnectionManager {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.clone();
        // spelled out, `get` alone would pick `KvStore::get` again
        Ok(AsyncCommands::get(&mut conn, key).await?)
    }

    async fn set_with_expiration(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.clone();
        let _: () = conn.pset_ex(key, value, expiration_millis(ttl)).await?;
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.clone();
        Ok(conn.incr(key, 1).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiration_millis() {
        assert_eq!(expiration_millis(Duration::from_secs(10)), 10_000);
        assert_eq!(expiration_millis(Duration::from_micros(10)), 1);
        assert_eq!(expiration_millis(Duration::MAX), u64::MAX);
    }
}
