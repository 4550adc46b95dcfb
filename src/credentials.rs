//! Bearer credentials and the suppliers that provide them.

use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque bearer token.
///
/// `Debug` never prints the token; use [`Credential::fingerprint`] when a
/// stable identifier is needed for keys or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
  pub fn new(token: impl Into<String>) -> Self {
    Self(token.into())
  }

  /// Raw token, for the `Authorization` header only
  pub fn token(&self) -> &str {
    &self.0
  }

  /// SHA256 of the token, hex encoded
  pub fn fingerprint(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.0.as_bytes());
    hex::encode(hasher.finalize())
  }
}

impl fmt::Debug for Credential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Credential").field(&"<redacted>").finish()
  }
}

/// Source of the current credential. `None` means "not signed in yet".
pub trait CredentialSupplier: Send + Sync {
  fn credential(&self) -> Option<Credential>;
}

/// Reads the token from the environment.
///
/// Checks FUNDSCTL_API_TOKEN first, then FUNDS_API_TOKEN as fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSupplier for EnvCredentials {
  fn credential(&self) -> Option<Credential> {
    std::env::var("FUNDSCTL_API_TOKEN")
      .or_else(|_| std::env::var("FUNDS_API_TOKEN"))
      .ok()
      .filter(|t| !t.trim().is_empty())
      .map(Credential::new)
  }
}

/// Fixed credential, mostly for tests and scripted sessions
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(pub Option<Credential>);

impl CredentialSupplier for StaticCredentials {
  fn credential(&self) -> Option<Credential> {
    self.0.clone()
  }
}
