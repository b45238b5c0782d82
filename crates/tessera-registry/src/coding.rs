//! qb64 text coding for cryptographic material.
//!
//! Every piece of cryptographic material travels as qualified base64: a
//! short derivation code followed by the unpadded URL-safe base64 of the
//! raw bytes. The code prefix makes the material self-describing — `E…` is
//! a Blake3-256 digest, `B…` a non-transferable Ed25519 verkey, `0A…` a
//! 128-bit sequence number, and indexed signatures carry their backer
//! index in the second character.

use crate::RegistryError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use tessera_types::DigestCode;

/// The URL-safe base64 alphabet, indexable by value (0..=63).
const B64_CHARS: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Non-transferable Ed25519 verkey derivation code.
pub const CODE_ED25519N: char = 'B';

/// Transferable Ed25519 verkey derivation code.
pub const CODE_ED25519: char = 'D';

/// Qualifies raw material under a derivation code.
pub fn qb64(code: &str, raw: &[u8]) -> String {
    format!("{code}{}", URL_SAFE_NO_PAD.encode(raw))
}

/// Strips a derivation code and decodes the remaining base64 material.
///
/// # Errors
///
/// Returns a validation error if the value does not start with `code` or
/// the remainder is not valid base64.
pub fn unqb64(value: &str, code: &str) -> Result<Vec<u8>, RegistryError> {
    let material = value
        .strip_prefix(code)
        .ok_or_else(|| RegistryError::Validation(format!("expected code '{code}' on '{value}'")))?;
    URL_SAFE_NO_PAD
        .decode(material)
        .map_err(|e| RegistryError::Validation(format!("bad base64 material in '{value}': {e}")))
}

/// Encodes a digest under its algorithm's derivation code.
pub fn digest_qb64(code: DigestCode, raw: &[u8]) -> String {
    qb64(&code.code().to_string(), raw)
}

/// Encodes a sequence number as a 128-bit big-endian seqner (`0A` code,
/// 24 characters).
pub fn seqner(sn: u64) -> String {
    let mut raw = [0u8; 16];
    raw[8..].copy_from_slice(&sn.to_be_bytes());
    qb64("0A", &raw)
}

/// Decodes an Ed25519 verifying key from a backer identifier prefix
/// (`B` non-transferable or `D` transferable).
pub fn verkey_from_prefix(prefix: &str) -> Result<VerifyingKey, RegistryError> {
    let code = prefix.chars().next().ok_or(RegistryError::EmptyMaterial(
        "backer identifier prefix is empty",
    ))?;
    if code != CODE_ED25519N && code != CODE_ED25519 {
        return Err(RegistryError::Validation(format!(
            "backer prefix '{prefix}' is not an Ed25519 identifier"
        )));
    }
    let raw = unqb64(prefix, &code.to_string())?;
    let raw: [u8; PUBLIC_KEY_LENGTH] = raw.as_slice().try_into().map_err(|_| {
        RegistryError::Validation(format!("backer prefix '{prefix}' has wrong key length"))
    })?;
    VerifyingKey::from_bytes(&raw)
        .map_err(|e| RegistryError::Validation(format!("bad Ed25519 verkey in '{prefix}': {e}")))
}

/// An Ed25519 signature qualified with the signing backer's index in the
/// backer set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedSignature {
    /// Position of the signer in the event's backer set (0..=63).
    pub index: u32,
    /// The raw 64-byte signature.
    pub raw: [u8; SIGNATURE_LENGTH],
}

impl IndexedSignature {
    /// Attaches an index to a signature.
    pub fn new(index: u32, signature: Signature) -> Self {
        Self {
            index,
            raw: signature.to_bytes(),
        }
    }

    /// The dalek signature value.
    pub fn signature(&self) -> Signature {
        Signature::from_bytes(&self.raw)
    }

    /// Renders the indexed qb64 form: `A`, one index character, then the
    /// unpadded base64 of the signature (88 characters total).
    pub fn qb64(&self) -> String {
        let idx = B64_CHARS[(self.index & 0x3f) as usize] as char;
        format!("A{idx}{}", URL_SAFE_NO_PAD.encode(self.raw))
    }

    /// Parses the indexed qb64 form produced by [`Self::qb64`].
    pub fn from_qb64(value: &str) -> Result<Self, RegistryError> {
        let mut chars = value.chars();
        match chars.next() {
            Some('A') => {}
            _ => {
                return Err(RegistryError::Validation(format!(
                    "'{value}' is not an indexed Ed25519 signature"
                )))
            }
        }
        let idx_char = chars.next().ok_or(RegistryError::EmptyMaterial(
            "indexed signature missing index character",
        ))?;
        let index = B64_CHARS
            .iter()
            .position(|&c| c as char == idx_char)
            .ok_or_else(|| {
                RegistryError::Validation(format!("bad signature index character '{idx_char}'"))
            })? as u32;
        let material = URL_SAFE_NO_PAD.decode(&value[2..]).map_err(|e| {
            RegistryError::Validation(format!("bad base64 material in signature: {e}"))
        })?;
        let raw: [u8; SIGNATURE_LENGTH] = material.as_slice().try_into().map_err(|_| {
            RegistryError::Validation("indexed signature has wrong length".to_string())
        })?;
        Ok(Self { index, raw })
    }
}
