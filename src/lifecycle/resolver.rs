//! Certificate resolution state machine

use super::create::create_certificate;
use super::{Resolution, ResolutionOutcome, ResolvedCertificate, RevocationReport};
use crate::authority::SigningAuthority;
use crate::config::{CertConfig, CertificateClass};
use crate::error::{CertError, Result};
use crate::output::verbose;
use crate::store::CertificateStore;
use crate::trust_store::TrustStore;
use chrono::{DateTime, Utc};

/// Picks a usable certificate or creates one.
///
/// Steps run strictly in sequence: login, team selection, optional
/// revocation of expired certificates, selection of the first installed
/// certificate, creation when none qualifies (or when forced), and a final
/// installation check.
pub struct LifecycleResolver<A, T> {
    authority: A,
    trust_store: T,
}

impl<A, T> LifecycleResolver<A, T>
where
    A: SigningAuthority,
    T: TrustStore,
{
    pub fn new(authority: A, trust_store: T) -> Self {
        Self {
            authority,
            trust_store,
        }
    }

    pub fn authority(&self) -> &A {
        &self.authority
    }

    pub fn trust_store(&self) -> &T {
        &self.trust_store
    }

    pub async fn resolve(&self, config: &CertConfig) -> Result<Resolution> {
        config.validate()?;

        info!("Starting login with user '{}'", config.username);
        self.authority
            .login(&config.username)
            .await
            .map_err(into_authentication)?;
        let account = self
            .authority
            .select_team()
            .await
            .map_err(into_authentication)?;
        success!("Successfully logged in");

        let class = CertificateClass::resolve(config.development, account.in_house);
        verbose(config.verbose, &format!("Certificate class: {class}"));

        let store = CertificateStore::new(&config.output_path);
        store.ensure_writable().await?;

        let now = Utc::now();
        let revocations = if config.revoke_expired {
            self.revoke_expired(class, now).await?
        } else {
            RevocationReport::default()
        };

        let existing = if config.force {
            verbose(config.verbose, "force is set, skipping existing certificates");
            None
        } else {
            self.find_existing(class, &store, &revocations).await?
        };

        let (resolved, outcome) = match existing {
            Some(resolved) => (resolved, ResolutionOutcome::Reused),
            None => {
                let created =
                    create_certificate(&self.authority, &self.trust_store, &store, class).await?;
                (created, ResolutionOutcome::Created)
            }
        };

        self.verify_installed(&resolved).await?;

        Ok(Resolution {
            certificate_id: resolved.certificate_id,
            file_path: resolved.file_path,
            class,
            outcome,
            revocations,
        })
    }

    /// Revoke every certificate of `class` that expired before `now`.
    ///
    /// A failed revocation is logged and recorded; the run continues.
    async fn revoke_expired(
        &self,
        class: CertificateClass,
        now: DateTime<Utc>,
    ) -> Result<RevocationReport> {
        let mut report = RevocationReport::default();

        let certificates = self.authority.list_certificates(class).await?;
        for certificate in certificates.iter().filter(|c| c.is_expired_at(now)) {
            info!(
                "{} {} has expired, revoking",
                certificate.id, certificate.name
            );
            match self.authority.revoke(&certificate.id).await {
                Ok(()) => report.revoked.push(certificate.id.clone()),
                Err(e) => {
                    let failure = CertError::Revocation {
                        certificate_id: certificate.id.clone(),
                        message: e.detail(),
                    };
                    warn!("{failure}");
                    report.failures.push(failure);
                }
            }
        }

        Ok(report)
    }

    /// First certificate, in authority order, whose file is installed locally.
    ///
    /// Certificates revoked earlier in this run are skipped. Iteration stops
    /// at the first match.
    async fn find_existing(
        &self,
        class: CertificateClass,
        store: &CertificateStore,
        revocations: &RevocationReport,
    ) -> Result<Option<ResolvedCertificate>> {
        let certificates = self.authority.list_certificates(class).await?;

        for certificate in certificates
            .iter()
            .filter(|c| !revocations.was_revoked(&c.id))
        {
            let path = store.store_certificate(&self.authority, certificate).await?;

            if self.trust_store.is_installed(&path).await? {
                success!(
                    "Found the certificate {} ({}) which is installed on the local machine. Using this one.",
                    certificate.id,
                    certificate.name
                );
                return Ok(Some(ResolvedCertificate {
                    certificate_id: certificate.id.clone(),
                    file_path: path,
                }));
            }

            info!(
                "Certificate {} ({}) can't be found on your local computer",
                certificate.id, certificate.name
            );
        }

        info!("Couldn't find an existing certificate... creating a new one");
        Ok(None)
    }

    /// Final gate: the resolved file must be installed right now
    async fn verify_installed(&self, resolved: &ResolvedCertificate) -> Result<()> {
        let verification_error = |reason: String| CertError::InstallationVerification {
            certificate_id: resolved.certificate_id.clone(),
            path: resolved.file_path.clone(),
            reason,
        };

        match self.trust_store.is_installed(&resolved.file_path).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(verification_error(
                "not present in the trust store".to_string(),
            )),
            Err(e) => Err(verification_error(e.to_string())),
        }
    }
}

fn into_authentication(err: CertError) -> CertError {
    match err {
        CertError::Authentication(_) => err,
        other => CertError::Authentication(other.detail()),
    }
}
