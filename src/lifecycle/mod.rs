//! Certificate lifecycle: reuse an installed certificate or create a new one
//!
//! - `resolver` - the resolution state machine
//! - `create` - new certificate creation and installation

mod create;
mod resolver;

use crate::config::CertificateClass;
use crate::error::CertError;
use std::path::PathBuf;

pub use create::{create_certificate, is_quota_message};
pub use resolver::LifecycleResolver;

/// A certificate picked or created by a run, with its local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCertificate {
    pub certificate_id: String,
    pub file_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// An existing certificate was already installed locally
    Reused,
    /// A new certificate was created and imported
    Created,
}

/// Result of a successful run.
#[derive(Debug)]
pub struct Resolution {
    pub certificate_id: String,
    pub file_path: PathBuf,
    pub class: CertificateClass,
    pub outcome: ResolutionOutcome,
    pub revocations: RevocationReport,
}

/// Best-effort revocation results. Failures never fail the run.
#[derive(Debug, Default)]
pub struct RevocationReport {
    pub revoked: Vec<String>,
    /// Each entry is a `CertError::Revocation`
    pub failures: Vec<CertError>,
}

impl RevocationReport {
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.revoked.len() + self.failures.len()
    }

    #[must_use]
    pub fn was_revoked(&self, certificate_id: &str) -> bool {
        self.revoked.iter().any(|id| id == certificate_id)
    }
}
