//! Shared types, error definitions, and constants for the Tessera platform.
//!
//! This crate provides the foundational types used across all Tessera
//! crates: registry event kinds, configuration traits, digest algorithm
//! codes, and the anchor seal structure that links the transaction event
//! log (TEL) to a controller's key event log (KEL).
//!
//! No crate in the workspace depends on anything *except* `tessera-types`
//! for cross-cutting type definitions. This keeps the dependency graph
//! clean and prevents circular dependencies.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Protocol identifier carried in every event's version string.
pub const PROTOCOL: &str = "KERI";

/// Protocol major/minor version carried in every event's version string.
pub const VERSION: (u8, u8) = (1, 0);

/// Registry event kinds (the `t` field of every TEL event).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ilk {
    /// Registry inception.
    #[serde(rename = "vcp")]
    Vcp,
    /// Registry rotation (backer set / threshold change).
    #[serde(rename = "vrt")]
    Vrt,
    /// Simple credential issuance.
    #[serde(rename = "iss")]
    Iss,
    /// Simple credential revocation.
    #[serde(rename = "rev")]
    Rev,
    /// Backer-attested credential issuance.
    #[serde(rename = "bis")]
    Bis,
    /// Backer-attested credential revocation.
    #[serde(rename = "brv")]
    Brv,
}

/// Error returned when parsing an unknown event kind label.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown event kind '{0}'")]
pub struct ParseIlkError(pub String);

impl Ilk {
    /// Returns the wire label for this event kind.
    pub fn label(self) -> &'static str {
        match self {
            Self::Vcp => "vcp",
            Self::Vrt => "vrt",
            Self::Iss => "iss",
            Self::Rev => "rev",
            Self::Bis => "bis",
            Self::Brv => "brv",
        }
    }

    /// Parses a wire label into an event kind.
    pub fn from_label(label: &str) -> Result<Self, ParseIlkError> {
        match label {
            "vcp" => Ok(Self::Vcp),
            "vrt" => Ok(Self::Vrt),
            "iss" => Ok(Self::Iss),
            "rev" => Ok(Self::Rev),
            "bis" => Ok(Self::Bis),
            "brv" => Ok(Self::Brv),
            other => Err(ParseIlkError(other.to_string())),
        }
    }

    /// Returns true for the two registry management kinds (`vcp`, `vrt`).
    pub fn is_registry(self) -> bool {
        matches!(self, Self::Vcp | Self::Vrt)
    }

    /// Returns true for the four credential kinds.
    pub fn is_credential(self) -> bool {
        !self.is_registry()
    }
}

/// Registry configuration traits (the `c` field of an inception event).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigTrait {
    /// The registry never designates backers; the controller is the sole
    /// authority for issuance and revocation state.
    #[serde(rename = "NB")]
    NoBackers,
}

impl ConfigTrait {
    /// Returns the wire label for this trait.
    pub fn label(self) -> &'static str {
        match self {
            Self::NoBackers => "NB",
        }
    }
}

/// Digest algorithms usable for self-addressing identifiers and event
/// digests, each tagged by its one-character derivation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DigestCode {
    /// Blake3-256, code `E`. The default for deployed registries.
    Blake3_256,
    /// SHA2-256, code `I`.
    Sha2_256,
}

impl DigestCode {
    /// Returns the one-character derivation code.
    pub fn code(self) -> char {
        match self {
            Self::Blake3_256 => 'E',
            Self::Sha2_256 => 'I',
        }
    }

    /// Raw digest size in bytes.
    pub fn raw_size(self) -> usize {
        32
    }

    /// Full qb64 size in characters (code plus unpadded base64).
    pub fn full_size(self) -> usize {
        44
    }

    /// Attempts to map a derivation code character back to an algorithm.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'E' => Some(Self::Blake3_256),
            'I' => Some(Self::Sha2_256),
            _ => None,
        }
    }
}

/// An anchor seal: a `(identifier, sequence, digest)` triple embedded in
/// one event log that cryptographically commits to an event in another.
///
/// When a controller anchors a registry event, the seal lives in the data
/// payload of one of its KEL events and points at the registry event. The
/// same shape (with the registry as the identifier) appears as the `ra`
/// field of backer-attested credential events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorSeal {
    /// The identifier prefix of the log holding the sealed event.
    pub i: String,
    /// The sequence number of the sealed event.
    pub s: u64,
    /// The digest of the sealed event (qb64). May be empty when the caller
    /// has not yet learned the digest; resolution then cannot succeed.
    pub d: String,
}

impl AnchorSeal {
    /// Convenience constructor.
    pub fn new(i: impl Into<String>, s: u64, d: impl Into<String>) -> Self {
        Self {
            i: i.into(),
            s,
            d: d.into(),
        }
    }
}
