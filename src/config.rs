//! Configuration types for artfetch

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Main configuration for [`ArtworkFetcher`](crate::ArtworkFetcher)
///
/// Fields are organized into logical sub-configs:
/// - [`cache`](CacheConfig): store root, namespace, entry TTL
/// - [`fetch`](FetchConfig): lock wait, transfer concurrency
/// - [`retry`](RetryConfig): attempt ceiling and delays for page transfers
/// - [`http`](HttpConfig): request headers sent to the provider and asset hosts
/// - [`animation`](AnimationConfig): frame rate and output format for animated artworks
/// - [`compression`](CompressionConfig): size budget and downscale loop
/// - [`tools`](ToolsConfig): ffmpeg/ffprobe discovery
///
/// Every field has a default, so `Config::default()` works out of the box and
/// partial JSON documents deserialize cleanly.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Local content store settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Lock and concurrency settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Retry behavior for page and archive transfers
    #[serde(default)]
    pub retry: RetryConfig,

    /// HTTP request settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Animated artwork assembly
    #[serde(default)]
    pub animation: AnimationConfig,

    /// Size-compliance compression
    #[serde(default)]
    pub compression: CompressionConfig,

    /// External tool discovery
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Config {
    /// Load configuration from a JSON file and validate it
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.cache.namespace.trim().is_empty() {
            return Err(Error::config("cache.namespace", "must not be empty"));
        }
        let single_component = matches!(
            std::path::Path::new(&self.cache.namespace)
                .components()
                .collect::<Vec<_>>()
                .as_slice(),
            [std::path::Component::Normal(_)]
        );
        if !single_component || self.cache.namespace.contains(['/', '\\']) {
            return Err(Error::config(
                "cache.namespace",
                "must be a single path component",
            ));
        }
        if self.fetch.max_concurrent_transfers == 0 {
            return Err(Error::config(
                "fetch.max_concurrent_transfers",
                "must be at least 1",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::config("retry.max_attempts", "must be at least 1"));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "retry.backoff_multiplier",
                "must be 1.0 or greater",
            ));
        }
        if self.animation.frame_rate == 0 {
            return Err(Error::config("animation.frame_rate", "must be at least 1"));
        }
        if self.animation.output_format.trim().is_empty() {
            return Err(Error::config("animation.output_format", "must not be empty"));
        }
        let scale = self.compression.scale_factor;
        if !(scale > 0.0 && scale < 1.0) {
            return Err(Error::config(
                "compression.scale_factor",
                "must be between 0 and 1 (exclusive)",
            ));
        }
        if self.compression.min_width == 0 {
            return Err(Error::config("compression.min_width", "must be at least 1"));
        }
        if self.compression.max_iterations == 0 {
            return Err(Error::config(
                "compression.max_iterations",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Local content store settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root directory of the filesystem store (default: "./cache")
    #[serde(default = "default_cache_root")]
    pub root_dir: PathBuf,

    /// First path segment of every cache key (default: "artworks")
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Time-to-live registered on every write and refreshed on every hit (default: 6 hours)
    #[serde(default = "default_cache_ttl", with = "duration_serde")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root_dir: default_cache_root(),
            namespace: default_namespace(),
            ttl: default_cache_ttl(),
        }
    }
}

/// Lock and transfer concurrency settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// How long a caller waits for the per-artwork lock (default: 120 seconds)
    #[serde(default = "default_lock_timeout", with = "duration_serde")]
    pub lock_timeout: Duration,

    /// Maximum network transfers in flight across all artworks (default: 20)
    #[serde(default = "default_max_concurrent_transfers")]
    pub max_concurrent_transfers: usize,

    /// How long a transfer waits for a permit (None = wait indefinitely)
    #[serde(default, with = "optional_duration_serde")]
    pub permit_timeout: Option<Duration>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            lock_timeout: default_lock_timeout(),
            max_concurrent_transfers: default_max_concurrent_transfers(),
            permit_timeout: None,
        }
    }
}

/// Retry configuration for transient transfer failures
///
/// The defaults describe a fixed-delay policy: ten attempts one second apart.
/// Raising `backoff_multiplier` above 1.0 turns it into exponential backoff capped
/// at `max_delay`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first (default: 10)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 1 second)
    #[serde(default = "default_retry_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 1 second)
    #[serde(default = "default_retry_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each retry (default: 1.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,

    /// Wall-clock limit for a single attempt (default: 60 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_retry_delay(),
            max_delay: default_retry_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
            request_timeout: default_request_timeout(),
        }
    }
}

/// HTTP request settings shared by metadata lookups and asset transfers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header (default: "artfetch/<version>")
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Referer header; asset hosts commonly refuse hot-linked requests without it
    #[serde(default)]
    pub referer: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            referer: None,
        }
    }
}

/// Animated artwork assembly settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Frame rate passed to the encoder when the provider does not supply one (default: 25)
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Container/extension of the assembled asset (default: "gif")
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Parent directory for scratch workspaces (None = OS temp dir)
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            output_format: default_output_format(),
            scratch_dir: None,
        }
    }
}

/// Size-compliance compression settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Assets at or above this size are downscaled (None = never compress; default: 10 MiB)
    #[serde(default = "default_budget_bytes")]
    pub budget_bytes: Option<u64>,

    /// Width multiplier applied on each pass (default: 0.8)
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,

    /// Width floor in pixels (default: 10)
    #[serde(default = "default_min_width")]
    pub min_width: u32,

    /// Maximum number of re-encode passes before giving up (default: 12)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            budget_bytes: default_budget_bytes(),
            scale_factor: default_scale_factor(),
            min_width: default_min_width(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// External tool paths
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Path to ffprobe executable (auto-detected if None)
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            search_path: true,
        }
    }
}

fn default_cache_root() -> PathBuf {
    PathBuf::from("./cache")
}

fn default_namespace() -> String {
    "artworks".to_string()
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(6 * 60 * 60)
}

fn default_lock_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_max_concurrent_transfers() -> usize {
    20
}

fn default_max_attempts() -> u32 {
    10
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_user_agent() -> String {
    format!("artfetch/{}", env!("CARGO_PKG_VERSION"))
}

fn default_frame_rate() -> u32 {
    25
}

fn default_output_format() -> String {
    "gif".to_string()
}

fn default_budget_bytes() -> Option<u64> {
    Some(10 * 1024 * 1024)
}

fn default_scale_factor() -> f64 {
    0.8
}

fn default_min_width() -> u32 {
    10
}

fn default_max_iterations() -> u32 {
    12
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
