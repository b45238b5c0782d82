//! Non-transferable service identity.
//!
//! The service process binds one Ed25519 keypair as its identity. The
//! prefix uses the non-transferable derivation code (`B`): the identifier
//! IS the public key, with no rotation history — appropriate for a
//! service endpoint whose identity can simply be replaced.

use ed25519_dalek::{SigningKey, SECRET_KEY_LENGTH};
use rand::rngs::OsRng;
use std::path::Path;
use tessera_registry::coding::qb64;
use thiserror::Error;

/// Errors that can occur loading or creating the service identity.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The seed file exists but cannot be read or written.
    #[error("failed to access key file: {0}")]
    KeyFile(#[from] std::io::Error),

    /// The seed file contents are not a valid Ed25519 seed.
    #[error("key file does not contain a valid Ed25519 seed")]
    BadSeed,
}

/// The service's signing identity.
#[derive(Debug)]
pub struct ServiceIdentity {
    signing_key: SigningKey,
    prefix: String,
}

impl ServiceIdentity {
    /// Wraps an existing signing key.
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let prefix = qb64("B", signing_key.verifying_key().as_bytes());
        Self {
            signing_key,
            prefix,
        }
    }

    /// Generates a fresh ephemeral identity.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Loads the identity from a hex seed file, generating and persisting
    /// a new one when the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if the file cannot be read or written, or
    /// holds something other than a 32-byte hex seed.
    pub fn load_or_generate(path: &Path) -> Result<Self, IdentityError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let seed = hex::decode(contents.trim()).map_err(|_| IdentityError::BadSeed)?;
                let seed: [u8; SECRET_KEY_LENGTH] =
                    seed.as_slice().try_into().map_err(|_| IdentityError::BadSeed)?;
                Ok(Self::from_signing_key(SigningKey::from_bytes(&seed)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let identity = Self::generate();
                std::fs::write(path, hex::encode(identity.signing_key.to_bytes()))?;
                tracing::info!(prefix = %identity.prefix, path = %path.display(), "generated service identity");
                Ok(identity)
            }
            Err(e) => Err(IdentityError::KeyFile(e)),
        }
    }

    /// The signing key.
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// The non-transferable identifier prefix (`B…`).
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_non_transferable_code() {
        let identity = ServiceIdentity::generate();
        assert!(identity.prefix().starts_with('B'));
        assert_eq!(identity.prefix().len(), 44);
    }

    #[test]
    fn load_or_generate_round_trips_through_file() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("service.key");

        let first = ServiceIdentity::load_or_generate(&path).expect("should generate");
        let second = ServiceIdentity::load_or_generate(&path).expect("should load");

        assert_eq!(first.prefix(), second.prefix());
    }

    #[test]
    fn rejects_corrupt_seed_file() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("service.key");
        std::fs::write(&path, "not hex at all").expect("should write");

        let err = ServiceIdentity::load_or_generate(&path).unwrap_err();
        assert!(matches!(err, IdentityError::BadSeed));
    }
}
