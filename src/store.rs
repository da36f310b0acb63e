//! Artifact storage under the configured output directory
//!
//! Filenames are deterministic so re-runs overwrite instead of piling up:
//! - `CertCertificateSigningRequest.certSigningRequest` - PEM CSR
//! - `private_key.p12` - private key
//! - `<certificate-id>.cer` - raw certificate bytes

use crate::authority::{Certificate, SigningAuthority};
use crate::error::{CertError, Result};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

pub const SIGNING_REQUEST_FILE_NAME: &str = "CertCertificateSigningRequest.certSigningRequest";
pub const PRIVATE_KEY_FILE_NAME: &str = "private_key.p12";
pub const CERTIFICATE_EXTENSION: &str = "cer";

#[derive(Debug, Clone)]
pub struct CertificateStore {
    output_dir: PathBuf,
}

impl CertificateStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[must_use]
    pub fn certificate_path(&self, certificate_id: &str) -> PathBuf {
        self.output_dir
            .join(format!("{certificate_id}.{CERTIFICATE_EXTENSION}"))
    }

    #[must_use]
    pub fn signing_request_path(&self) -> PathBuf {
        self.output_dir.join(SIGNING_REQUEST_FILE_NAME)
    }

    #[must_use]
    pub fn private_key_path(&self) -> PathBuf {
        self.output_dir.join(PRIVATE_KEY_FILE_NAME)
    }

    /// Create the output directory if needed and check that it is writable
    ///
    /// Runs before any remote state changes so a bad path fails the run
    /// before a certificate is created.
    pub async fn ensure_writable(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| CertError::Persistence {
                path: self.output_dir.clone(),
                source,
            })?;

        let marker = self.output_dir.join(".write_test");
        write_artifact(&marker, b"test").await?;
        tokio::fs::remove_file(&marker)
            .await
            .map_err(|source| CertError::Persistence {
                path: marker.clone(),
                source,
            })?;

        Ok(())
    }

    /// Download the certificate and write it to `<output>/<id>.cer`
    ///
    /// Always re-downloads and overwrites; there is no cache.
    pub async fn store_certificate<A>(&self, authority: &A, certificate: &Certificate) -> Result<PathBuf>
    where
        A: SigningAuthority + ?Sized,
    {
        let raw = authority.download_raw(&certificate.id).await?;
        let path = self.certificate_path(&certificate.id);
        write_artifact(&path, &raw).await?;
        Ok(path)
    }

    pub async fn write_signing_request(&self, csr_pem: &str) -> Result<PathBuf> {
        let path = self.signing_request_path();
        write_artifact(&path, csr_pem.as_bytes()).await?;
        Ok(path)
    }

    /// Write the private key, readable by the owner only on unix
    ///
    /// The file is created with mode 0600, and an existing file from an
    /// earlier run is narrowed to 0600 before the new key goes in.
    pub async fn write_private_key(&self, private_key_pem: &str) -> Result<PathBuf> {
        let path = self.private_key_path();
        let persistence = |source: std::io::Error| CertError::Persistence {
            path: path.clone(),
            source,
        };

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&path).await.map_err(persistence)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(persistence)?;
        }

        file.write_all(private_key_pem.as_bytes())
            .await
            .map_err(persistence)?;
        file.flush().await.map_err(persistence)?;

        Ok(path)
    }
}

async fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| CertError::Persistence {
            path: path.to_path_buf(),
            source,
        })
}
