//! Signing certificate provisioning
//!
//! Reuses a certificate that is already installed locally, or creates a new
//! one through the signing authority, stores it, and installs it into the
//! trust store.

#[macro_use]
pub mod output;

pub mod authority;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod store;
pub mod trust_store;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

// Re-export common types
pub use authority::{AppleAPIClient, Certificate, SigningAuthority};
pub use config::{ApiKeyConfig, CertConfig, CertificateClass};
pub use error::CertError;
pub use lifecycle::{LifecycleResolver, Resolution, ResolutionOutcome};
pub use store::CertificateStore;
pub use trust_store::{Keychain, TrustStore};
