//! New certificate creation

use super::ResolvedCertificate;
use crate::authority::SigningAuthority;
use crate::config::CertificateClass;
use crate::error::{CertError, Result};
use crate::store::CertificateStore;
use crate::trust_store::TrustStore;

const QUOTA_MARKERS: &[&str] = &[
    "maximum number",
    "already have a current",
    "certificate limit",
    "limit reached",
];

/// Whether an authority message reports a certificate quota
#[must_use]
pub fn is_quota_message(message: &str) -> bool {
    let message = message.to_lowercase();
    QUOTA_MARKERS.iter().any(|marker| message.contains(marker))
}

fn classify_submit_failure(err: CertError) -> CertError {
    let message = err.detail();
    if is_quota_message(&message) {
        CertError::CreationQuota(message)
    } else {
        CertError::Creation(message)
    }
}

/// Generate a key pair, have the authority issue a certificate for it, write
/// CSR, key and certificate to `store`, then import key and certificate.
///
/// Nothing is written until the authority has accepted the request. Files
/// already written stay on disk if a later step fails.
pub async fn create_certificate<A, T>(
    authority: &A,
    trust_store: &T,
    store: &CertificateStore,
    class: CertificateClass,
) -> Result<ResolvedCertificate>
where
    A: SigningAuthority + ?Sized,
    T: TrustStore + ?Sized,
{
    let request = authority.create_signing_request().await?;

    let certificate = match authority.submit_request(class, request.csr_pem()).await {
        Ok(certificate) => certificate,
        Err(e) => {
            let err = classify_submit_failure(e);
            if matches!(err, CertError::CreationQuota(_)) {
                error!(
                    "Could not create another certificate, reached the maximum number of available certificates."
                );
            }
            return Err(err);
        }
    };

    store.write_signing_request(request.csr_pem()).await?;
    let private_key_path = store.write_private_key(request.private_key_pem()).await?;
    let cert_path = store.store_certificate(authority, &certificate).await?;

    // Key first: the keychain pairs the certificate with an existing key
    trust_store.import(&private_key_path).await?;
    trust_store.import(&cert_path).await?;

    success!(
        "Successfully generated {} which was imported to the local machine.",
        certificate.id
    );

    Ok(ResolvedCertificate {
        certificate_id: certificate.id,
        file_path: cert_path,
    })
}
