//! Signing authority: the remote service that issues, lists and revokes
//! certificates
//!
//! - `apple` - App Store Connect implementation

pub mod apple;

use crate::config::CertificateClass;
use crate::error::{CertError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub use apple::AppleAPIClient;

/// A certificate record owned by the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: String,
    pub name: String,
    pub expires: DateTime<Utc>,
    pub class: CertificateClass,
}

impl Certificate {
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires < now
    }
}

/// Account the authority resolved for this session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountContext {
    pub in_house: bool,
}

/// A locally generated key pair and the CSR bound to it.
///
/// The private key is wiped from memory when the request is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SigningRequest {
    #[zeroize(skip)]
    csr_pem: String,
    private_key_pem: String,
}

impl SigningRequest {
    #[must_use]
    pub fn new(csr_pem: String, private_key_pem: String) -> Self {
        Self {
            csr_pem,
            private_key_pem,
        }
    }

    #[must_use]
    pub fn csr_pem(&self) -> &str {
        &self.csr_pem
    }

    #[must_use]
    pub fn private_key_pem(&self) -> &str {
        &self.private_key_pem
    }
}

impl std::fmt::Debug for SigningRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningRequest")
            .field("csr_pem", &self.csr_pem)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

/// Remote certificate authority.
///
/// Calls are made strictly one after another by the resolver.
#[async_trait]
pub trait SigningAuthority: Send + Sync {
    /// Authenticate as `username`
    async fn login(&self, username: &str) -> Result<()>;

    /// Select the account subsequent calls operate on
    async fn select_team(&self) -> Result<AccountContext>;

    /// Certificates of `class`, in the authority's order
    async fn list_certificates(&self, class: CertificateClass) -> Result<Vec<Certificate>>;

    async fn revoke(&self, certificate_id: &str) -> Result<()>;

    /// Generate a fresh key pair and CSR locally
    async fn create_signing_request(&self) -> Result<SigningRequest>;

    /// Submit a PEM CSR and return the issued certificate
    async fn submit_request(&self, class: CertificateClass, csr_pem: &str) -> Result<Certificate>;

    /// Raw DER bytes of an issued certificate
    async fn download_raw(&self, certificate_id: &str) -> Result<Vec<u8>>;
}

/// Generate a PEM CSR and PEM private key with rcgen
pub fn generate_signing_request(common_name: &str) -> Result<SigningRequest> {
    use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};

    let csr_error = |e: rcgen::Error| CertError::CsrGeneration(e.to_string());

    let key_pair = KeyPair::generate().map_err(csr_error)?;
    let private_key_pem = key_pair.serialize_pem();

    let mut params = CertificateParams::new(vec![]).map_err(csr_error)?;
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    // No country code - Apple doesn't require it
    params.distinguished_name = dn;

    let csr = params.serialize_request(&key_pair).map_err(csr_error)?;
    let csr_pem = csr.pem().map_err(csr_error)?;

    Ok(SigningRequest::new(csr_pem, private_key_pem))
}
