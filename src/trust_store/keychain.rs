//! macOS keychain trust store
//!
//! A certificate counts as installed when its SHA-1 fingerprint shows up as
//! a valid code-signing identity, i.e. the keychain holds both the
//! certificate and its private key.

use super::TrustStore;
use crate::config::DEFAULT_KEYCHAIN;
use crate::error::{CertError, Result};
use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use std::path::{Path, PathBuf};

/// Returned by `security import` when the item is already present
const ALREADY_EXISTS: &str = "already exists in the keychain";

#[derive(Debug, Clone)]
pub struct Keychain {
    name: String,
}

impl Default for Keychain {
    fn default() -> Self {
        Self::new(DEFAULT_KEYCHAIN)
    }
}

impl Keychain {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Verify keychain is accessible and unlocked
    ///
    /// Run before any remote state changes so a locked keychain does not
    /// leave an orphaned certificate behind.
    pub async fn ensure_accessible(&self) -> Result<()> {
        let output = tokio::process::Command::new("security")
            .args(["show-keychain-info", &self.name])
            .output()
            .await
            .map_err(|e| {
                CertError::CommandExecution(format!("Failed to check keychain status: {e}"))
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let keychain = &self.name;

        if stderr.contains("locked") {
            return Err(CertError::KeychainOperation(format!(
                "Keychain '{keychain}' is locked.\n\
                 Please unlock it before running:\n\
                 security unlock-keychain {keychain}"
            )));
        }

        if stderr.contains("does not exist") || stderr.contains("not found") {
            return Err(CertError::KeychainOperation(format!(
                "Keychain '{keychain}' not found."
            )));
        }

        Err(CertError::KeychainOperation(format!(
            "Keychain check failed: {}",
            stderr.trim()
        )))
    }

    /// Code-signing identity hashes currently valid in this keychain
    async fn identity_hashes(&self) -> Result<Vec<String>> {
        let output = tokio::process::Command::new("security")
            .args(["find-identity", "-v", "-p", "codesigning", &self.name])
            .output()
            .await
            .map_err(|e| {
                CertError::CommandExecution(format!("Failed to run security find-identity: {e}"))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CertError::CommandExecution(format!(
                "security find-identity failed with status {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let stdout = std::str::from_utf8(&output.stdout).map_err(|e| {
            CertError::CommandExecution(format!("security command output is not valid UTF-8: {e}"))
        })?;

        Ok(parse_identity_hashes(stdout))
    }
}

#[async_trait]
impl TrustStore for Keychain {
    async fn is_installed(&self, path: &Path) -> Result<bool> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(false);
        }

        let fingerprint = sha1_fingerprint(path).await?;
        let identities = self.identity_hashes().await?;

        Ok(identities.iter().any(|hash| *hash == fingerprint))
    }

    /// Import with an exclusive lock so parallel runs don't race on the
    /// keychain
    async fn import(&self, path: &Path) -> Result<()> {
        let lock_path = import_lock_path().await?;
        let lock_file = tokio::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .await?;

        // Released when lock_file is dropped
        lock_file.lock_exclusive().map_err(|e| {
            CertError::KeychainOperation(format!("Failed to acquire keychain lock: {e}"))
        })?;

        let import_output = tokio::process::Command::new("security")
            .arg("import")
            .arg(path)
            .args(["-k", &self.name, "-T", "/usr/bin/codesign"])
            .output()
            .await
            .map_err(|e| {
                CertError::KeychainOperation(format!("Failed to execute security import: {e}"))
            })?;

        if import_output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&import_output.stderr);
        if stderr.contains(ALREADY_EXISTS) {
            return Ok(());
        }

        Err(CertError::KeychainOperation(format!(
            "Keychain import of {} failed: {}",
            path.display(),
            stderr.trim()
        )))
    }
}

/// Lock file serializing keychain imports across processes
async fn import_lock_path() -> Result<PathBuf> {
    let lock_dir = dirs::cache_dir()
        .ok_or_else(|| CertError::MissingConfig("Could not determine cache directory".to_string()))?
        .join("kodegen");

    tokio::fs::create_dir_all(&lock_dir).await.map_err(|e| {
        CertError::KeychainOperation(format!(
            "Failed to create lock directory {}: {e}",
            lock_dir.display()
        ))
    })?;
    Ok(lock_dir.join("keychain.lock"))
}

/// SHA-1 fingerprint of a DER certificate file, uppercase hex without colons
async fn sha1_fingerprint(cert_path: &Path) -> Result<String> {
    let output = tokio::process::Command::new("openssl")
        .args(["x509", "-inform", "DER", "-fingerprint", "-sha1", "-noout", "-in"])
        .arg(cert_path)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CertError::MissingDependency(
                    "openssl command not found. Please install OpenSSL.".to_string(),
                )
            } else {
                CertError::CommandExecution(format!("Failed to run openssl: {e}"))
            }
        })?;

    if !output.status.success() {
        return Err(CertError::CommandExecution(format!(
            "Could not read certificate {}: {}",
            cert_path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_fingerprint(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        CertError::CommandExecution(format!(
            "Unexpected openssl fingerprint output for {}",
            cert_path.display()
        ))
    })
}

/// Parse `SHA1 Fingerprint=AB:CD:...` (OpenSSL) or `sha1 Fingerprint=...` (LibreSSL)
fn parse_fingerprint(output: &str) -> Option<String> {
    let (label, value) = output.trim().split_once('=')?;
    if !label.to_ascii_lowercase().starts_with("sha1") {
        return None;
    }
    let hash = value.trim().replace(':', "").to_ascii_uppercase();
    (hash.len() == 40 && hash.chars().all(|c| c.is_ascii_hexdigit())).then_some(hash)
}

/// Extract identity hashes from `security find-identity -v` output
///
/// Line format: `  1) 0123ABCD... "Apple Distribution: Acme Corp (TEAM123)"`
fn parse_identity_hashes(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let (_, rest) = line.trim().split_once(')')?;
            let hash = rest.split_whitespace().next()?;
            (hash.len() == 40 && hash.chars().all(|c| c.is_ascii_hexdigit()))
                .then(|| hash.to_ascii_uppercase())
        })
        .collect()
}
