//! Configuration structures for certificate resolution.

use crate::error::{CertError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default keychain for certificate storage
pub const DEFAULT_KEYCHAIN: &str = "login.keychain-db";

/// Default common name for certificate signing requests
pub const DEFAULT_COMMON_NAME: &str = "Kodegen Signing";

/// Options consumed by a resolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertConfig {
    /// Identity used to authenticate with the signing authority
    pub username: String,

    /// Request a development certificate instead of a production one
    #[serde(default)]
    pub development: bool,

    /// Revoke expired certificates of the resolved class before selection
    #[serde(default)]
    pub revoke_expired: bool,

    /// Always create a new certificate, even if an installed one exists
    #[serde(default)]
    pub force: bool,

    /// Directory receiving the CSR, private key and certificate files
    pub output_path: PathBuf,

    #[serde(default = "default_keychain")]
    pub keychain: String,

    #[serde(default = "default_common_name")]
    pub common_name: String,

    #[serde(default)]
    pub verbose: bool,

    /// App Store Connect API credentials
    #[serde(default)]
    pub api: Option<ApiKeyConfig>,
}

/// App Store Connect API key credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyConfig {
    pub issuer_id: String,
    pub key_id: String,
    pub private_key_path: PathBuf,
    /// Account belongs to the Enterprise (in-house) program
    #[serde(default)]
    pub enterprise: bool,
}

/// Pool of certificates a run lists from and creates into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateClass {
    Production,
    Development,
    InHouse,
}

impl CertificateClass {
    /// Pick the class for a run.
    ///
    /// An in-house account always gets in-house certificates, regardless of
    /// the `development` flag. Otherwise development wins over production.
    #[must_use]
    pub fn resolve(development: bool, in_house: bool) -> Self {
        if in_house {
            Self::InHouse
        } else if development {
            Self::Development
        } else {
            Self::Production
        }
    }

    /// Convert to Apple API certificate type string
    ///
    /// In-house certificates use the distribution type on the enterprise host.
    /// See: <https://developer.apple.com/documentation/appstoreconnectapi/certificatetype>
    #[must_use]
    pub fn to_apple_api_string(&self) -> &'static str {
        match self {
            Self::Production | Self::InHouse => "DISTRIBUTION",
            Self::Development => "DEVELOPMENT",
        }
    }

    /// Get human-readable certificate class name
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Production => "Production",
            Self::Development => "Development",
            Self::InHouse => "In-House",
        }
    }
}

impl std::fmt::Display for CertificateClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl CertConfig {
    /// Configuration with every optional setting at its default
    pub fn new(username: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            username: username.into(),
            development: false,
            revoke_expired: false,
            force: false,
            output_path: output_path.into(),
            keychain: default_keychain(),
            common_name: default_common_name(),
            verbose: false,
            api: None,
        }
    }

    /// Load configuration from a TOML file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            CertError::InvalidConfig(format!("Cannot read {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Reject configurations a run cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(CertError::MissingConfig("username".to_string()));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(CertError::MissingConfig("output_path".to_string()));
        }
        if self.keychain.trim().is_empty() {
            return Err(CertError::InvalidConfig(
                "keychain name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl ApiKeyConfig {
    /// Try to load API credentials from environment variables
    ///
    /// Reads `APPLE_API_KEY` + `APPLE_API_ISSUER`, then either
    /// `APPLE_API_KEY_PATH` or an `AuthKey_<id>.p8` found in a standard
    /// location. `APPLE_API_ENTERPRISE=1` marks an in-house account.
    pub fn from_env() -> Option<Self> {
        let (Ok(key_id), Ok(issuer_id)) = (
            std::env::var("APPLE_API_KEY"),
            std::env::var("APPLE_API_ISSUER"),
        ) else {
            return None;
        };

        let enterprise = std::env::var("APPLE_API_ENTERPRISE")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let private_key_path = match std::env::var("APPLE_API_KEY_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => find_p8_key_in_standard_locations(&key_id)?,
        };

        Some(Self {
            issuer_id,
            key_id,
            private_key_path,
            enterprise,
        })
    }
}

fn find_p8_key_in_standard_locations(key_id: &str) -> Option<PathBuf> {
    let filename = format!("AuthKey_{key_id}.p8");

    let mut search_paths = vec![PathBuf::from("./private_keys")];

    if let Some(home) = dirs::home_dir() {
        search_paths.push(home.join("private_keys"));
        search_paths.push(home.join(".private_keys"));
        search_paths.push(home.join(".appstoreconnect/private_keys"));
    }

    search_paths
        .into_iter()
        .map(|dir| dir.join(&filename))
        .find(|path| path.is_file())
}

fn default_common_name() -> String {
    DEFAULT_COMMON_NAME.to_string()
}

fn default_keychain() -> String {
    DEFAULT_KEYCHAIN.to_string()
}
