//! Local trust store holding installed certificates and keys
//!
//! - `keychain` - macOS keychain via the `security` tool

pub mod keychain;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

pub use keychain::Keychain;

#[async_trait]
pub trait TrustStore: Send + Sync {
    /// Whether the certificate stored at `path` is installed and usable
    async fn is_installed(&self, path: &Path) -> Result<bool>;

    /// Import a key or certificate file
    async fn import(&self, path: &Path) -> Result<()>;
}
