//! Canonical event serialization.
//!
//! Every event serializes as compact JSON with a fixed field order and a
//! self-describing version string (`KERI10JSON######_`, where `######` is
//! the six-digit lowercase-hex byte length of the whole serialization).
//! The version string always occupies bytes 6..23, so sizing is two-pass:
//! serialize with a dummy size, then splice the real one in place.
//! Round-trips are byte-identical, which the self-addressing identifiers
//! and event digests depend on.

use crate::eventing::EventBody;
use crate::{coding, RegistryError};
use sha2::{Digest, Sha256};
use tessera_types::{DigestCode, Ilk, PROTOCOL, VERSION};

/// Byte length of the version string.
pub const VERSION_STRING_SIZE: usize = 17;

/// Byte offset of the version string within a serialized event
/// (the length of `{"v":"`).
const VERSION_STRING_OFFSET: usize = 6;

/// Renders the version string for a serialization of `size` bytes.
pub fn versify(size: usize) -> String {
    format!(
        "{}{:x}{:x}JSON{:06x}_",
        PROTOCOL, VERSION.0, VERSION.1, size
    )
}

/// Parses a version string, returning the declared serialization size.
///
/// # Errors
///
/// Returns a validation error if the protocol label, version, kind, or
/// terminator do not match the supported serialization.
pub fn deversify(vs: &str) -> Result<usize, RegistryError> {
    let expected_head = format!("{}{:x}{:x}JSON", PROTOCOL, VERSION.0, VERSION.1);
    let tail = vs
        .strip_prefix(expected_head.as_str())
        .and_then(|t| t.strip_suffix('_'))
        .ok_or_else(|| RegistryError::Validation(format!("unsupported version string '{vs}'")))?;
    usize::from_str_radix(tail, 16)
        .map_err(|_| RegistryError::Validation(format!("bad size in version string '{vs}'")))
}

/// Computes the qb64 digest of raw bytes under the given algorithm.
pub fn digest_raw(code: DigestCode, raw: &[u8]) -> String {
    match code {
        DigestCode::Blake3_256 => coding::digest_qb64(code, blake3::hash(raw).as_bytes()),
        DigestCode::Sha2_256 => coding::digest_qb64(code, &Sha256::digest(raw)),
    }
}

/// A serialized event: the canonical raw bytes together with the parsed
/// body they encode. The raw bytes are authoritative; digests and
/// signatures are always computed over them.
#[derive(Debug, Clone, PartialEq)]
pub struct Serder {
    raw: Vec<u8>,
    body: EventBody,
}

impl Serder {
    /// Serializes an event body, sizing its version string in place.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the body cannot be rendered.
    pub fn from_body(mut body: EventBody) -> Result<Self, RegistryError> {
        let raw = sized_raw(&mut body)?;
        Ok(Self { raw, body })
    }

    /// Parses raw event bytes, checking the declared size against the
    /// actual length.
    ///
    /// # Errors
    ///
    /// Returns a validation error on malformed JSON, an unknown event
    /// kind, or a version-string size mismatch.
    pub fn from_raw(raw: &[u8]) -> Result<Self, RegistryError> {
        let body = EventBody::from_slice(raw)?;
        let declared = deversify(body.v())?;
        if declared != raw.len() {
            return Err(RegistryError::Validation(format!(
                "version string declares {declared} bytes but event is {} bytes",
                raw.len()
            )));
        }
        Ok(Self {
            raw: raw.to_vec(),
            body,
        })
    }

    /// The canonical serialized bytes.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The parsed event body.
    pub fn body(&self) -> &EventBody {
        &self.body
    }

    /// The event kind.
    pub fn ilk(&self) -> Ilk {
        self.body.ilk()
    }

    /// The event's identifier prefix (`i` field): the registry identifier
    /// for `vcp`/`vrt`, the credential identifier otherwise.
    pub fn pre(&self) -> &str {
        self.body.i()
    }

    /// The event's sequence number, parsed from its hex text form.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the `s` field is not lowercase hex.
    pub fn sn(&self) -> Result<u64, RegistryError> {
        let s = self.body.s_hex();
        u64::from_str_radix(s, 16)
            .map_err(|_| RegistryError::Validation(format!("bad sequence number text '{s}'")))
    }

    /// The qb64 digest of the canonical bytes under `code`.
    pub fn digest(&self, code: DigestCode) -> String {
        digest_raw(code, &self.raw)
    }
}

/// Serializes a body with its version string patched to the real size.
/// The body's `v` field is updated to match the returned bytes.
pub(crate) fn sized_raw(body: &mut EventBody) -> Result<Vec<u8>, RegistryError> {
    body.set_v(versify(0));
    let mut raw = serde_json::to_vec(body)?;
    let vs = versify(raw.len());
    debug_assert_eq!(vs.len(), VERSION_STRING_SIZE);
    raw[VERSION_STRING_OFFSET..VERSION_STRING_OFFSET + VERSION_STRING_SIZE]
        .copy_from_slice(vs.as_bytes());
    body.set_v(vs);
    Ok(raw)
}
