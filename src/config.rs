//! Configuration loading and types for Bookdex.
//!
//! Configuration is read from a YAML file and deserialized into the
//! [`Config`] struct.  Each subsection governs a different part of the
//! system: networking, catalog persistence, cover-image storage, and
//! CORS behavior.

use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Catalog store settings.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Cover-image store settings.
    #[serde(default)]
    pub covers: CoversConfig,

    /// CORS settings.
    #[serde(default)]
    pub cors: CorsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Catalog store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Backend type: `sqlite` or `memory`.
    #[serde(default = "default_catalog_engine")]
    pub engine: String,

    /// SQLite-specific configuration.
    #[serde(default)]
    pub sqlite: SqliteConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            engine: default_catalog_engine(),
            sqlite: SqliteConfig::default(),
        }
    }
}

/// SQLite-specific catalog configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_catalog_path")]
    pub path: String,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

/// Cover-image store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CoversConfig {
    /// Backend type: `local`, `aws`, `memory`, or `none` (disabled).
    #[serde(default = "default_covers_backend")]
    pub backend: String,

    /// Local filesystem configuration.
    #[serde(default)]
    pub local: LocalCoversConfig,

    /// AWS S3 gateway configuration.
    #[serde(default)]
    pub aws: Option<AwsCoversConfig>,

    /// Lifetime of presigned read URLs in seconds.
    #[serde(default = "default_read_url_expiry")]
    pub read_url_expiry_seconds: u64,

    /// Lifetime of presigned upload URLs in seconds.
    #[serde(default = "default_upload_url_expiry")]
    pub upload_url_expiry_seconds: u64,
}

impl Default for CoversConfig {
    fn default() -> Self {
        Self {
            backend: default_covers_backend(),
            local: LocalCoversConfig::default(),
            aws: None,
            read_url_expiry_seconds: default_read_url_expiry(),
            upload_url_expiry_seconds: default_upload_url_expiry(),
        }
    }
}

/// Local filesystem cover storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalCoversConfig {
    /// Root directory for stored cover blobs.
    #[serde(default = "default_covers_root")]
    pub root_dir: String,

    /// Public base URL of this server, used to build signed cover URLs.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// HMAC secret for signing cover URLs.
    #[serde(default = "default_signing_secret")]
    pub signing_secret: String,
}

impl Default for LocalCoversConfig {
    fn default() -> Self {
        Self {
            root_dir: default_covers_root(),
            public_base_url: default_public_base_url(),
            signing_secret: default_signing_secret(),
        }
    }
}

/// AWS S3 gateway cover storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AwsCoversConfig {
    /// Backing S3 bucket name.
    pub bucket: String,
    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Key prefix in the backing bucket.
    #[serde(default)]
    pub prefix: String,
    /// Custom S3-compatible endpoint (e.g. MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: String,
    /// Force path-style URL addressing.
    #[serde(default)]
    pub use_path_style: bool,
    /// Explicit AWS access key (falls back to env/credential chain).
    #[serde(default)]
    pub access_key_id: String,
    /// Explicit AWS secret key (falls back to env/credential chain).
    #[serde(default)]
    pub secret_access_key: String,
}

/// CORS configuration.
///
/// Responses echo the request origin when it is allow-listed, and fall
/// back to `default_origin` otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed to be echoed back.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Origin used when the request origin is absent or unrecognized.
    #[serde(default = "default_origin")]
    pub default_origin: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
            default_origin: default_origin(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9310
}

fn default_catalog_engine() -> String {
    "sqlite".to_string()
}

fn default_catalog_path() -> String {
    "./data/catalog.db".to_string()
}

fn default_covers_backend() -> String {
    "local".to_string()
}

fn default_covers_root() -> String {
    "./data/covers".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:9310".to_string()
}

fn default_signing_secret() -> String {
    "bookdex-secret".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_read_url_expiry() -> u64 {
    3600
}

fn default_upload_url_expiry() -> u64 {
    600
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

// -- Loader ------------------------------------------------------------------

/// Load and parse configuration from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: Config = serde_yaml::from_str(&contents)?;
    Ok(config)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 9310);
        assert_eq!(config.catalog.engine, "sqlite");
        assert_eq!(config.covers.backend, "local");
        assert_eq!(config.covers.read_url_expiry_seconds, 3600);
        assert_eq!(config.covers.upload_url_expiry_seconds, 600);
        assert_eq!(config.cors.default_origin, "http://localhost:3000");
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
server:
  port: 8080
covers:
  backend: none
cors:
  allowed_origins:
    - "http://localhost:3000"
    - "https://books.example.com"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.covers.backend, "none");
        assert_eq!(config.cors.allowed_origins.len(), 2);
    }

    #[test]
    fn test_parse_aws_section() {
        let yaml = r#"
covers:
  backend: aws
  aws:
    bucket: my-covers
    prefix: "bookdex/"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let aws = config.covers.aws.unwrap();
        assert_eq!(aws.bucket, "my-covers");
        assert_eq!(aws.region, "us-east-1");
        assert_eq!(aws.prefix, "bookdex/");
        assert!(!aws.use_path_style);
    }
}
