use crate::error::CacheError;

const CACHED_PREFIX: &str = "cached:";
const COUNT_PREFIX: &str = "count:";

/// Maps a caller key onto the cache-entry and counter namespaces.
///
/// Both prefixes are non-empty and neither is a prefix of the other, so a
/// cache key can never equal a count key whatever the caller passes in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyScheme {
    cached_prefix: String,
    count_prefix: String,
}

/// The pair of storage keys derived from one caller key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedKeys {
    pub cached: String,
    pub count: String,
}

impl Default for KeyScheme {
    fn default() -> Self {
        Self {
            cached_prefix: CACHED_PREFIX.to_string(),
            count_prefix: COUNT_PREFIX.to_string(),
        }
    }
}

impl KeyScheme {
    pub fn new(
        cached_prefix: impl Into<String>,
        count_prefix: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let cached_prefix = cached_prefix.into();
        let count_prefix = count_prefix.into();

        if cached_prefix.is_empty() || count_prefix.is_empty() {
            anyhow::bail!("cache and count prefixes must not be empty");
        }
        if cached_prefix.starts_with(&count_prefix) || count_prefix.starts_with(&cached_prefix) {
            anyhow::bail!(
                "prefixes `{cached_prefix}` and `{count_prefix}` overlap, derived keys could collide"
            );
        }

        Ok(Self {
            cached_prefix,
            count_prefix,
        })
    }

    pub fn cached_prefix(&self) -> &str {
        &self.cached_prefix
    }

    pub fn count_prefix(&self) -> &str {
        &self.count_prefix
    }

    pub fn derive(&self, key: &str) -> Result<DerivedKeys, CacheError> {
        if key.is_empty() {
            return Err(CacheError::InvalidKey("key must not be empty".to_string()));
        }

        Ok(DerivedKeys {
            cached: format!("{}{}", self.cached_prefix, key),
            count: format!("{}{}", self.count_prefix, key),
        })
    }
}
