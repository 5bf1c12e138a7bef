//! Gateway configuration.
//!
//! Layered as built-in defaults, then an optional config file, then the
//! process environment.

use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::types::{Address, IdError};

/// Environment variable → configuration key.
const ENV_KEYS: &[(&str, &str)] = &[
    ("PORT", "server.port"),
    ("REQUEST_TIMEOUT_SECS", "server.request_timeout_secs"),
    ("MAX_UPLOAD_BYTES", "server.max_upload_bytes"),
    ("STORE_BACKEND", "storage.backend"),
    ("STORE_PATH", "storage.path"),
    ("SCRATCH_DIR", "storage.scratch_dir"),
    ("PARCEL_API_URL", "platform.api_url"),
    ("PARCEL_AUTH_URL", "platform.auth_url"),
    ("PARCEL_CLIENT_ID", "platform.client_id"),
    ("PARCEL_CLIENT_SECRET", "platform.client_secret"),
    ("PARCEL_DISPATCHER_ADDRESS", "platform.dispatcher_address"),
    ("PARCEL_HTTP_TIMEOUT_SECS", "platform.http_timeout_secs"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub platform: PlatformConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub request_timeout_secs: u64,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Rocksdb,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StoreBackend,
    pub path: PathBuf,
    /// Directory for per-request download files
    pub scratch_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    pub api_url: String,
    pub auth_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub dispatcher_address: String,
    pub http_timeout_secs: u64,
}

impl PlatformConfig {
    pub fn dispatcher_address(&self) -> Result<Address, IdError> {
        self.dispatcher_address.parse()
    }
}

impl GatewayConfig {
    /// Load from defaults, `file` (if given) and the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(file, |key| std::env::var(key).ok())
    }

    /// Like [`GatewayConfig::load`], reading environment values through `env`.
    pub fn load_with<F>(file: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let scratch = std::env::temp_dir().to_string_lossy().into_owned();

        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.request_timeout_secs", 120)?
            .set_default("server.max_upload_bytes", 256 * 1024 * 1024)?
            .set_default("storage.backend", "rocksdb")?
            .set_default("storage.path", "data/records")?
            .set_default("storage.scratch_dir", scratch)?
            .set_default("platform.api_url", "https://api.oasislabs.com/parcel/v1")?
            .set_default("platform.auth_url", "https://auth.oasislabs.com/oauth")?
            .set_default("platform.client_id", "")?
            .set_default("platform.client_secret", "")?
            .set_default("platform.dispatcher_address", "")?
            .set_default("platform.http_timeout_secs", 60)?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }

        for (var, key) in ENV_KEYS {
            builder = builder.set_override_option(*key, env(*var))?;
        }

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::load_with(None, |_| None).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.request_timeout_secs, 120);
        assert_eq!(config.storage.backend, StoreBackend::Rocksdb);
        assert_eq!(config.storage.path, PathBuf::from("data/records"));
        assert!(config.platform.dispatcher_address().is_err());
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 8080\n\n[storage]\nbackend = \"memory\"\n\n[platform]\nclient_id = \"from-file\""
        )
        .unwrap();

        let env: HashMap<&str, &str> = HashMap::from([
            ("PORT", "9090"),
            ("PARCEL_DISPATCHER_ADDRESS", "0x1111111111111111111111111111111111111111"),
        ]);
        let config = GatewayConfig::load_with(Some(file.path()), |key| {
            env.get(key).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.storage.backend, StoreBackend::Memory);
        assert_eq!(config.platform.client_id, "from-file");
        assert_eq!(
            config.platform.dispatcher_address().unwrap().to_hex(),
            "0x1111111111111111111111111111111111111111"
        );
    }
}
