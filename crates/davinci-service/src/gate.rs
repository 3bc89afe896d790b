//! The administrative gate: a shared secret checked against an argon2 hash.
//!
//! Admin-only operations take an [`Admin`] argument. The only way to obtain
//! one is [`AdminGate::verify`], so holding the value proves the caller
//! presented the secret.

use argon2::{
  Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier as _,
  password_hash::{self, SaltString},
};
use rand_core::OsRng;

use crate::{Error, Result};

/// Zero-size capability: proof that the administrative secret was verified.
#[derive(Debug)]
pub struct Admin(());

/// Verifies administrative secrets against a PHC hash from configuration.
#[derive(Debug, Clone)]
pub struct AdminGate {
  secret_hash: String,
}

impl AdminGate {
  /// Build a gate from a PHC string such as `$argon2id$v=19$…`. Malformed
  /// hashes are rejected up front rather than on first use.
  pub fn new(secret_hash: impl Into<String>) -> Result<Self, password_hash::Error> {
    let secret_hash = secret_hash.into();
    PasswordHash::new(&secret_hash)?;
    Ok(Self { secret_hash })
  }

  pub fn verify(&self, secret: &str) -> Result<Admin> {
    let parsed = PasswordHash::new(&self.secret_hash).map_err(|_| Error::Unauthorized)?;
    Argon2::default()
      .verify_password(secret.as_bytes(), &parsed)
      .map_err(|_| Error::Unauthorized)?;
    Ok(Admin(()))
  }
}

/// Hash `secret` into a PHC string suitable for [`AdminGate::new`].
pub fn hash_secret(secret: &str) -> Result<String, password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(secret.as_bytes(), &salt)?.to_string())
}
