//! Transaction event log (TEL) core for the Tessera platform.
//!
//! A registry is an append-only log of credential issuance and revocation
//! events, controlled by an identifier whose key event log (KEL) anchors
//! every registry event, and optionally attested by a threshold of
//! designated backers. This crate implements the verifiable core:
//!
//! - canonical event construction ([`eventing`]) with byte-exact wire
//!   serialization ([`serder`]),
//! - self-addressing identifier derivation and verification
//!   ([`prefixer`]),
//! - the validator/escrow state machine ([`tever`]) that accepts or
//!   escrows incoming events against the Registry Store (`tessera-db`)
//!   and the controller key-state oracle ([`oracle`]).
//!
//! The controller's KEL is consumed strictly as a read port: the engine
//! asks "does an event with this digest exist at this sequence?" and never
//! mutates controller state. That one-directional consumption is what
//! breaks the reference cycle between the two logs.

pub mod coding;
pub mod eventing;
pub mod oracle;
pub mod prefixer;
pub mod serder;
pub mod tever;

pub use eventing::{
    backer_issue, backer_revoke, incept, issue, revoke, rotate, EventBody, InceptionEvent,
    RegistrySeal, RotationEvent,
};
pub use oracle::{InMemoryOracle, KeyStateOracle};
pub use prefixer::Prefixer;
pub use serder::Serder;
pub use tever::{Tever, Tevery};

use tessera_types::Ilk;
use thiserror::Error;

/// Errors produced by the TEL core.
///
/// The two escrow conditions ([`RegistryError::MissingAnchor`] and
/// [`RegistryError::MissingBackerSignatures`]) are retryable: the engine
/// has already persisted the raw event and an escrow pointer, so a later
/// call with the same event succeeds once the corroborating data exists.
/// Every other variant is a terminal answer about the supplied input.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Identifier derivation was attempted with no source material.
    #[error("empty material: {0}")]
    EmptyMaterial(&'static str),

    /// Event kind unsupported for identifier derivation, or the
    /// self-addressing identifier does not verify against its content.
    #[error("derivation error: {0}")]
    Derivation(String),

    /// The backer list contains duplicate entries.
    #[error("duplicate backers in {0:?}")]
    DuplicateBackers(Vec<String>),

    /// Backers supplied for a registry configured with the `NB` trait.
    #[error("backers not allowed under the NoBackers configuration trait")]
    NoBackersConflict,

    /// Threshold out of bounds for the (resulting) backer set.
    #[error("invalid backer threshold {toad} for {count} backers")]
    InvalidThreshold {
        /// The requested threshold.
        toad: u64,
        /// The size of the backer set it was checked against.
        count: usize,
    },

    /// Invalid cut/add transition of the backer set: a cut that is not a
    /// current backer, an add that is already a (remaining) backer, or a
    /// duplicate within either list.
    #[error("invalid backer-set transition: {0}")]
    InvalidBackerTransition(String),

    /// Sequence number unusable for this operation (0 is reserved for
    /// inception; later events must strictly increase).
    #[error("invalid sequence number {0}")]
    InvalidSequence(u64),

    /// Structurally malformed event or anchor seal; retrying cannot help.
    #[error("validation error: {0}")]
    Validation(String),

    /// The event kind is not usable where it was supplied.
    #[error("unexpected event kind {0:?}")]
    UnexpectedKind(Ilk),

    /// Anchor seal well-formed but not yet resolvable against controller
    /// key-state. Retryable: the raw event and an awaiting-anchor pointer
    /// are persisted.
    #[error("missing anchor for registry {registry_id} at sn {sn}")]
    MissingAnchor {
        /// The registry (or credential) identifier awaiting its anchor.
        registry_id: String,
        /// The event sequence number.
        sn: u64,
        /// The event digest.
        digest: String,
    },

    /// Anchor resolved but the backer-signature threshold is unmet.
    /// Retryable: the raw event and an awaiting-signatures pointer are
    /// persisted.
    #[error(
        "missing backer signatures for registry {registry_id} at sn {sn}: have {have}, need {need}"
    )]
    MissingBackerSignatures {
        /// The registry (or credential) identifier awaiting signatures.
        registry_id: String,
        /// The event sequence number.
        sn: u64,
        /// The event digest.
        digest: String,
        /// Count of valid signatures supplied so far.
        have: usize,
        /// The threshold that must be met.
        need: u64,
    },

    /// Registry Store failure.
    #[error(transparent)]
    Store(#[from] tessera_db::StoreError),

    /// Canonical serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RegistryError {
    /// True for escrow conditions that a retry can resolve once the
    /// corroborating data (anchor or signatures) arrives.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::MissingAnchor { .. } | Self::MissingBackerSignatures { .. }
        )
    }
}
