//! Error types for certificate resolution and provisioning.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CertError>;

#[derive(Debug, Error)]
pub enum CertError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Could not revoke certificate {certificate_id}: {message}")]
    Revocation {
        certificate_id: String,
        message: String,
    },

    #[error("Certificate limit reached: {0}")]
    CreationQuota(String),

    #[error("Certificate creation failed: {0}")]
    Creation(String),

    #[error(
        "Certificate {certificate_id} could not be confirmed installed ({}): {reason}",
        .path.display()
    )]
    InstallationVerification {
        certificate_id: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Signing authority error: {0}")]
    AuthorityApi(String),

    #[error("CSR generation failed: {0}")]
    CsrGeneration(String),

    #[error("Keychain operation failed: {0}")]
    KeychainOperation(String),

    #[error("Command execution failed: {0}")]
    CommandExecution(String),

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("JWT creation failed: {0}")]
    JwtCreation(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

impl CertError {
    /// Whether this error aborts a resolution run.
    ///
    /// Revocation failures are collected into the run's report instead.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Revocation { .. })
    }

    /// The collaborator's own message, without the variant prefix.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::AuthorityApi(msg)
            | Self::Authentication(msg)
            | Self::CreationQuota(msg)
            | Self::Creation(msg)
            | Self::KeychainOperation(msg)
            | Self::CommandExecution(msg) => msg.clone(),
            Self::Revocation { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_revocation_is_non_fatal() {
        let revocation = CertError::Revocation {
            certificate_id: "X1".to_string(),
            message: "gone".to_string(),
        };
        assert!(!revocation.is_fatal());
        assert!(CertError::Authentication("bad key".to_string()).is_fatal());
        assert!(CertError::CreationQuota("max".to_string()).is_fatal());
    }

    #[test]
    fn detail_strips_variant_prefix() {
        let err = CertError::AuthorityApi("You have reached the maximum number".to_string());
        assert_eq!(err.detail(), "You have reached the maximum number");
        assert_eq!(
            err.to_string(),
            "Signing authority error: You have reached the maximum number"
        );
    }
}
