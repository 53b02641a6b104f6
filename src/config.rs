use crate::cache::CachePolicy;
use crate::keys::KeyScheme;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{env, fs, path};

const CONFIG_PATH_VAR: &str = "PAGE_TRACKER_CFG_PATH";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "log_level_default")]
    pub log_level: String,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub http: HttpConfig,

    /// File the config was read from, `None` when running on defaults.
    #[serde(skip)]
    pub source: Option<path::PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: log_level_default(),
            redis: RedisConfig::default(),
            cache: CacheConfig::default(),
            http: HttpConfig::default(),
            source: None,
        }
    }
}

impl Config {
    fn get_config_dir() -> anyhow::Result<path::PathBuf> {
        let config_dir = if let Ok(xdg_path) = env::var("XDG_CONFIG_HOME") {
            path::PathBuf::from(&xdg_path)
        } else {
            let home =
                env::var("HOME").with_context(|| "neither XDG_CONFIG_HOME nor HOME is set")?;
            path::Path::new(&home).join(".config")
        };

        Ok(config_dir.join("page_tracker"))
    }

    /// Load the config from `path`, or from `$PAGE_TRACKER_CFG_PATH`, or from
    /// the default config directory.
    ///
    /// A file that was asked for explicitly must exist. A missing default file
    /// just means running with the defaults.
    pub fn load(path: Option<&path::Path>) -> anyhow::Result<Self> {
        let explicit = path
            .map(path::Path::to_path_buf)
            .or_else(|| env::var(CONFIG_PATH_VAR).ok().map(path::PathBuf::from));

        if let Some(file_path) = explicit {
            if !file_path.exists() {
                anyhow::bail!("Config file not found in {file_path:?}");
            }
            return Self::from_file(&file_path);
        }

        let file_path = Self::get_config_dir()
            .with_context(|| "fail to locate config directory")?
            .join("config.toml");
        // Logging is set up from the loaded config, so the caller reports
        // which file was used through `source`.
        if !file_path.exists() {
            return Ok(Self::default());
        }

        Self::from_file(&file_path)
    }

    pub fn from_file(file_path: &path::Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(file_path)
            .with_context(|| format!("fail to read config file {file_path:?}"))?;

        let mut config: Self = content.parse()?;
        config.source = Some(file_path.to_path_buf());
        Ok(config)
    }

    pub fn log_level(&self) -> anyhow::Result<tracing::Level> {
        self.log_level
            .parse()
            .with_context(|| format!("invalid log level `{}`", self.log_level))
    }
}

impl std::str::FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).with_context(|| "fail to parse config from toml")
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RedisConfig {
    #[serde(default = "redis_host_default")]
    pub host: String,
    #[serde(default = "redis_port_default")]
    pub port: u16,
    #[serde(default)]
    pub db: i64,
    pub password: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: redis_host_default(),
            port: redis_port_default(),
            db: 0,
            password: None,
        }
    }
}

impl RedisConfig {
    pub fn addr(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{password}@{}:{}/{}",
                self.host, self.port, self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "ttl_secs_default")]
    pub ttl_secs: u64,
    #[serde(default = "cached_prefix_default")]
    pub cached_prefix: String,
    #[serde(default = "count_prefix_default")]
    pub count_prefix: String,
    #[serde(default)]
    pub single_flight: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: ttl_secs_default(),
            cached_prefix: cached_prefix_default(),
            count_prefix: count_prefix_default(),
            single_flight: false,
        }
    }
}

impl CacheConfig {
    pub fn policy(&self) -> anyhow::Result<CachePolicy> {
        if self.ttl_secs == 0 {
            anyhow::bail!("cache.ttl_secs must be at least 1");
        }
        let keys = KeyScheme::new(&self.cached_prefix, &self.count_prefix)
            .with_context(|| "invalid cache key prefixes")?;

        Ok(CachePolicy::builder()
            .ttl(Duration::from_secs(self.ttl_secs))
            .keys(keys)
            .single_flight(self.single_flight)
            .build())
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "timeout_secs_default")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: timeout_secs_default(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn log_level_default() -> String {
    "INFO".to_string()
}

fn redis_host_default() -> String {
    "localhost".to_string()
}

fn redis_port_default() -> u16 {
    6379
}

fn ttl_secs_default() -> u64 {
    10
}

fn cached_prefix_default() -> String {
    "cached:".to_string()
}

fn count_prefix_default() -> String {
    "count:".to_string()
}

fn timeout_secs_default() -> u64 {
    30
}
