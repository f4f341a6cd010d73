//! Configuration for the retrieval pipeline.
//!
//! `RetrieverConfig` is the value every component is constructed from. It can
//! be built in code with the `with_*` methods or seeded from an INI file via
//! [`ConfigFile`]:
//!
//! ```ini
//! [network]
//! retries = 10
//! retry_delay_secs = 3
//! timeout_secs = 15
//!
//! [cache]
//! directory = /var/cache/ccdl
//!
//! [catalog]
//! url_version = v6
//!
//! [auth]
//! token = Bearer eyJ...
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;

use crate::catalog::UrlVersion;
use crate::error::{FetchError, FetchResult};

/// Default number of attempts for a network operation.
pub const DEFAULT_RETRY_COUNT: u32 = 10;

/// Default delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILENAME: &str = "config.ini";

/// Configuration for the retrieval pipeline.
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Root of the on-disk cache. `None` disables caching.
    pub cache_dir: Option<PathBuf>,

    /// Attempts per HEAD/GET before giving up.
    pub retry_count: u32,

    /// Delay between attempts.
    pub retry_delay: Duration,

    /// Timeout for a single request.
    pub timeout: Duration,

    /// Value for the `Authorization` header, if any.
    pub auth: Option<String>,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay: DEFAULT_RETRY_DELAY,
            timeout: DEFAULT_TIMEOUT,
            auth: None,
        }
    }
}

impl RetrieverConfig {
    /// Create a configuration with defaults and no cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache directory.
    pub fn with_cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Set the number of attempts per network operation (at least one).
    pub fn with_retry_count(mut self, count: u32) -> Self {
        self.retry_count = count.max(1);
        self
    }

    /// Set the delay between attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the authorization header value.
    pub fn with_auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = Some(auth.into());
        self
    }
}

/// Settings read from `config.ini`.
///
/// Every field is optional; absent keys leave the corresponding
/// `RetrieverConfig` default untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub retries: Option<u32>,
    pub retry_delay_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub cache_dir: Option<PathBuf>,
    pub url_version: Option<UrlVersion>,
    pub auth_token: Option<String>,
}

impl ConfigFile {
    /// Default location: `<config dir>/ccdl/config.ini`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ccdl").join(CONFIG_FILENAME))
    }

    /// Load the file at the default location, or defaults if there is none.
    pub fn load() -> FetchResult<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load and parse a specific file.
    pub fn load_from(path: &Path) -> FetchResult<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| FetchError::io(path.to_path_buf(), e))?;
        Self::parse(&text)
    }

    /// Parse INI text.
    pub fn parse(text: &str) -> FetchResult<Self> {
        let ini = Ini::load_from_str(text)
            .map_err(|e| FetchError::Config(format!("config.ini: {}", e)))?;

        let get = |section: &str, key: &str| -> Option<String> {
            ini.section(Some(section))
                .and_then(|s| s.get(key))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let url_version = get("catalog", "url_version")
            .map(|v| {
                v.parse::<UrlVersion>()
                    .map_err(|e| FetchError::Config(format!("[catalog] url_version: {}", e)))
            })
            .transpose()?;

        Ok(Self {
            retries: parse_number(get("network", "retries"), "[network] retries")?,
            retry_delay_secs: parse_number(
                get("network", "retry_delay_secs"),
                "[network] retry_delay_secs",
            )?,
            timeout_secs: parse_number(get("network", "timeout_secs"), "[network] timeout_secs")?,
            cache_dir: get("cache", "directory").map(PathBuf::from),
            url_version,
            auth_token: get("auth", "token"),
        })
    }

    /// Overlay the file's settings onto `config`.
    pub fn apply(&self, mut config: RetrieverConfig) -> RetrieverConfig {
        if let Some(retries) = self.retries {
            config = config.with_retry_count(retries);
        }
        if let Some(secs) = self.retry_delay_secs {
            config.retry_delay = Duration::from_secs(secs);
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        if let Some(token) = &self.auth_token {
            config.auth = Some(token.clone());
        }
        config
    }
}

fn parse_number<T: std::str::FromStr>(value: Option<String>, key: &str) -> FetchResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.parse::<T>()
                .map_err(|e| FetchError::Config(format!("{}: {}", key, e)))
        })
        .transpose()
}
