//! Registry Event Factory.
//!
//! Pure, side-effect-free builders for the six canonical registry event
//! kinds: inception (`vcp`), rotation (`vrt`), simple issuance/revocation
//! (`iss`/`rev`), and backer-attested issuance/revocation (`bis`/`brv`).
//! Every invariant is enforced before serialization — a partially
//! constructed event is never returned.
//!
//! Sequence numbers and thresholds encode as lowercase-hex text; the
//! registry anchor seal's sequence number is a JSON number. Field order is
//! struct declaration order and must not change: existing deployments
//! depend on byte-identical serializations.

use crate::prefixer::Prefixer;
use crate::serder::{versify, Serder};
use crate::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tessera_types::{ConfigTrait, DigestCode, Ilk};

/// Registry inception event body (`vcp`). The `i` field is the registry's
/// self-addressing identifier, derived over this very body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InceptionEvent {
    /// Version string.
    pub v: String,
    /// Registry self-addressing identifier.
    pub i: String,
    /// Issuer (controller) identifier prefix.
    pub ii: String,
    /// Sequence number, hex text; always `"0"`.
    pub s: String,
    /// Event kind; always `vcp`.
    pub t: Ilk,
    /// Configuration traits.
    pub c: Vec<ConfigTrait>,
    /// Backer threshold, hex text.
    pub bt: String,
    /// Initial backer identifier prefixes.
    pub b: Vec<String>,
}

/// Registry rotation event body (`vrt`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationEvent {
    /// Version string.
    pub v: String,
    /// Registry identifier.
    pub i: String,
    /// Digest of the prior registry event.
    pub p: String,
    /// Sequence number, hex text; `>= 1`.
    pub s: String,
    /// Event kind; always `vrt`.
    pub t: Ilk,
    /// Backer threshold after this rotation, hex text.
    pub bt: String,
    /// Backers removed (cuts).
    pub br: Vec<String>,
    /// Backers appended (adds).
    pub ba: Vec<String>,
}

/// Simple credential issuance body (`iss`), for registries where the
/// controller is the sole authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueEvent {
    /// Version string.
    pub v: String,
    /// Credential identifier.
    pub i: String,
    /// Sequence number, hex text; always `"0"`.
    pub s: String,
    /// Event kind; always `iss`.
    pub t: Ilk,
    /// Registry identifier this credential belongs to.
    pub ri: String,
}

/// Simple credential revocation body (`rev`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevokeEvent {
    /// Version string.
    pub v: String,
    /// Credential identifier.
    pub i: String,
    /// Sequence number, hex text; always `"1"`.
    pub s: String,
    /// Event kind; always `rev`.
    pub t: Ilk,
    /// Digest of the issuance event being revoked.
    pub p: String,
}

/// The registry anchor seal embedded in backer-attested credential
/// events: points at the registry event whose backer configuration
/// attests this credential event. Its `s` is a JSON number on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySeal {
    /// Registry identifier.
    pub i: String,
    /// Registry event sequence number.
    pub s: u64,
    /// Registry event digest.
    pub d: String,
}

/// Backer-attested credential issuance body (`bis`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackerIssueEvent {
    /// Version string.
    pub v: String,
    /// Credential identifier.
    pub i: String,
    /// Registry identifier.
    pub ii: String,
    /// Sequence number, hex text; always `"0"`.
    pub s: String,
    /// Event kind; always `bis`.
    pub t: Ilk,
    /// Seal of the registry event attesting this issuance.
    pub ra: RegistrySeal,
}

/// Backer-attested credential revocation body (`brv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackerRevokeEvent {
    /// Version string.
    pub v: String,
    /// Credential identifier.
    pub i: String,
    /// Sequence number, hex text; always `"1"`.
    pub s: String,
    /// Event kind; always `brv`.
    pub t: Ilk,
    /// Digest of the issuance event being revoked.
    pub p: String,
    /// Seal of the registry event attesting this revocation.
    pub ra: RegistrySeal,
}

/// A parsed registry event of any kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventBody {
    /// Registry inception.
    Inception(InceptionEvent),
    /// Registry rotation.
    Rotation(RotationEvent),
    /// Simple issuance.
    Issue(IssueEvent),
    /// Simple revocation.
    Revoke(RevokeEvent),
    /// Backer-attested issuance.
    BackerIssue(BackerIssueEvent),
    /// Backer-attested revocation.
    BackerRevoke(BackerRevokeEvent),
}

impl EventBody {
    /// The event kind.
    pub fn ilk(&self) -> Ilk {
        match self {
            Self::Inception(e) => e.t,
            Self::Rotation(e) => e.t,
            Self::Issue(e) => e.t,
            Self::Revoke(e) => e.t,
            Self::BackerIssue(e) => e.t,
            Self::BackerRevoke(e) => e.t,
        }
    }

    /// The identifier prefix (`i` field).
    pub fn i(&self) -> &str {
        match self {
            Self::Inception(e) => &e.i,
            Self::Rotation(e) => &e.i,
            Self::Issue(e) => &e.i,
            Self::Revoke(e) => &e.i,
            Self::BackerIssue(e) => &e.i,
            Self::BackerRevoke(e) => &e.i,
        }
    }

    /// The version string.
    pub fn v(&self) -> &str {
        match self {
            Self::Inception(e) => &e.v,
            Self::Rotation(e) => &e.v,
            Self::Issue(e) => &e.v,
            Self::Revoke(e) => &e.v,
            Self::BackerIssue(e) => &e.v,
            Self::BackerRevoke(e) => &e.v,
        }
    }

    /// The sequence number hex text (`s` field).
    pub fn s_hex(&self) -> &str {
        match self {
            Self::Inception(e) => &e.s,
            Self::Rotation(e) => &e.s,
            Self::Issue(e) => &e.s,
            Self::Revoke(e) => &e.s,
            Self::BackerIssue(e) => &e.s,
            Self::BackerRevoke(e) => &e.s,
        }
    }

    pub(crate) fn set_v(&mut self, v: String) {
        match self {
            Self::Inception(e) => e.v = v,
            Self::Rotation(e) => e.v = v,
            Self::Issue(e) => e.v = v,
            Self::Revoke(e) => e.v = v,
            Self::BackerIssue(e) => e.v = v,
            Self::BackerRevoke(e) => e.v = v,
        }
    }

    pub(crate) fn set_i(&mut self, i: String) {
        match self {
            Self::Inception(e) => e.i = i,
            Self::Rotation(e) => e.i = i,
            Self::Issue(e) => e.i = i,
            Self::Revoke(e) => e.i = i,
            Self::BackerIssue(e) => e.i = i,
            Self::BackerRevoke(e) => e.i = i,
        }
    }

    /// Parses an event body from raw JSON, dispatching on the `t` field.
    pub(crate) fn from_slice(raw: &[u8]) -> Result<Self, RegistryError> {
        let value: serde_json::Value = serde_json::from_slice(raw)?;
        let label = value
            .get("t")
            .and_then(|t| t.as_str())
            .ok_or_else(|| RegistryError::Validation("event has no 't' field".to_string()))?;
        let ilk = Ilk::from_label(label)
            .map_err(|e| RegistryError::Validation(e.to_string()))?;
        let body = match ilk {
            Ilk::Vcp => Self::Inception(serde_json::from_value(value)?),
            Ilk::Vrt => Self::Rotation(serde_json::from_value(value)?),
            Ilk::Iss => Self::Issue(serde_json::from_value(value)?),
            Ilk::Rev => Self::Revoke(serde_json::from_value(value)?),
            Ilk::Bis => Self::BackerIssue(serde_json::from_value(value)?),
            Ilk::Brv => Self::BackerRevoke(serde_json::from_value(value)?),
        };
        Ok(body)
    }
}

/// Checks a threshold against the size of the backer set it governs:
/// an empty set demands a zero threshold, a non-empty set bounds it above.
fn validate_toad(toad: u64, count: usize) -> Result<(), RegistryError> {
    if (count == 0 && toad != 0) || toad > count as u64 {
        return Err(RegistryError::InvalidThreshold { toad, count });
    }
    Ok(())
}

fn has_duplicates(items: &[String]) -> bool {
    let mut seen = HashSet::new();
    !items.iter().all(|item| seen.insert(item.as_str()))
}

/// Builds a registry inception event (`vcp`) with a derived
/// self-addressing identifier.
///
/// The backer threshold defaults to the size of the backer list when not
/// given.
///
/// # Errors
///
/// Fails on duplicate backers, backers under the `NB` trait, or a
/// threshold outside `0 ..= backers.len()` (an empty backer list demands
/// threshold zero).
pub fn incept(
    issuer: &str,
    config: &[ConfigTrait],
    backers: &[String],
    toad: Option<u64>,
    code: DigestCode,
) -> Result<Serder, RegistryError> {
    if has_duplicates(backers) {
        return Err(RegistryError::DuplicateBackers(backers.to_vec()));
    }
    if config.contains(&ConfigTrait::NoBackers) && !backers.is_empty() {
        return Err(RegistryError::NoBackersConflict);
    }
    let toad = toad.unwrap_or(backers.len() as u64);
    validate_toad(toad, backers.len())?;

    let mut body = EventBody::Inception(InceptionEvent {
        v: versify(0),
        i: String::new(),
        ii: issuer.to_string(),
        s: format!("{:x}", 0),
        t: Ilk::Vcp,
        c: config.to_vec(),
        bt: format!("{toad:x}"),
        b: backers.to_vec(),
    });

    let prefixer = Prefixer::derive(&body, code)?;
    body.set_i(prefixer.qb64().to_string());
    Serder::from_body(body)
}

/// Builds a registry rotation event (`vrt`) transitioning the backer set
/// of `registry_id` by removing `cuts` and appending `adds`.
///
/// `backers` is the current backer set; the resulting set is
/// `(backers - cuts) ++ adds`. The threshold defaults to the size of the
/// resulting set.
///
/// # Errors
///
/// Fails on `sn == 0` (reserved for inception), on any invalid backer-set
/// transition (a cut that is not a current backer, an add that is already
/// a remaining backer, duplicates or overlap within the lists), or on a
/// threshold outside the bounds of the resulting set.
pub fn rotate(
    registry_id: &str,
    dig: &str,
    sn: u64,
    backers: &[String],
    cuts: &[String],
    adds: &[String],
    toad: Option<u64>,
) -> Result<Serder, RegistryError> {
    if sn < 1 {
        return Err(RegistryError::InvalidSequence(sn));
    }
    let remaining = apply_transition(backers, cuts, adds)?;
    let toad = toad.unwrap_or(remaining.len() as u64);
    validate_toad(toad, remaining.len())?;

    let body = EventBody::Rotation(RotationEvent {
        v: versify(0),
        i: registry_id.to_string(),
        p: dig.to_string(),
        s: format!("{sn:x}"),
        t: Ilk::Vrt,
        bt: format!("{toad:x}"),
        br: cuts.to_vec(),
        ba: adds.to_vec(),
    });
    Serder::from_body(body)
}

/// Applies the cut/add transition to a backer set, enforcing its
/// invariants, and returns the resulting set.
pub(crate) fn apply_transition(
    backers: &[String],
    cuts: &[String],
    adds: &[String],
) -> Result<Vec<String>, RegistryError> {
    let current: HashSet<&str> = backers.iter().map(String::as_str).collect();
    if has_duplicates(cuts) {
        return Err(RegistryError::InvalidBackerTransition(
            "duplicate cuts".to_string(),
        ));
    }
    for cut in cuts {
        if !current.contains(cut.as_str()) {
            return Err(RegistryError::InvalidBackerTransition(format!(
                "cut '{cut}' is not a current backer"
            )));
        }
    }

    let cut_set: HashSet<&str> = cuts.iter().map(String::as_str).collect();
    let mut result: Vec<String> = backers
        .iter()
        .filter(|b| !cut_set.contains(b.as_str()))
        .cloned()
        .collect();

    if has_duplicates(adds) {
        return Err(RegistryError::InvalidBackerTransition(
            "duplicate adds".to_string(),
        ));
    }
    for add in adds {
        if cut_set.contains(add.as_str()) {
            return Err(RegistryError::InvalidBackerTransition(format!(
                "add '{add}' is also being cut"
            )));
        }
        if result.iter().any(|b| b == add) {
            return Err(RegistryError::InvalidBackerTransition(format!(
                "add '{add}' is already a backer"
            )));
        }
    }
    result.extend(adds.iter().cloned());
    Ok(result)
}

/// Builds a simple credential issuance event (`iss`).
pub fn issue(credential_id: &str, registry_id: &str) -> Result<Serder, RegistryError> {
    Serder::from_body(EventBody::Issue(IssueEvent {
        v: versify(0),
        i: credential_id.to_string(),
        s: format!("{:x}", 0),
        t: Ilk::Iss,
        ri: registry_id.to_string(),
    }))
}

/// Builds a simple credential revocation event (`rev`) linked to the
/// issuance event with digest `dig`.
pub fn revoke(credential_id: &str, dig: &str) -> Result<Serder, RegistryError> {
    Serder::from_body(EventBody::Revoke(RevokeEvent {
        v: versify(0),
        i: credential_id.to_string(),
        s: format!("{:x}", 1),
        t: Ilk::Rev,
        p: dig.to_string(),
    }))
}

/// Builds a backer-attested credential issuance event (`bis`) sealed to
/// the registry event at `(registry_sn, registry_dig)`.
pub fn backer_issue(
    credential_id: &str,
    registry_id: &str,
    registry_sn: u64,
    registry_dig: &str,
) -> Result<Serder, RegistryError> {
    Serder::from_body(EventBody::BackerIssue(BackerIssueEvent {
        v: versify(0),
        i: credential_id.to_string(),
        ii: registry_id.to_string(),
        s: format!("{:x}", 0),
        t: Ilk::Bis,
        ra: RegistrySeal {
            i: registry_id.to_string(),
            s: registry_sn,
            d: registry_dig.to_string(),
        },
    }))
}

/// Builds a backer-attested credential revocation event (`brv`) linked to
/// the issuance with digest `dig` and sealed to the registry event at
/// `(registry_sn, registry_dig)`.
pub fn backer_revoke(
    credential_id: &str,
    registry_id: &str,
    registry_sn: u64,
    registry_dig: &str,
    dig: &str,
) -> Result<Serder, RegistryError> {
    Serder::from_body(EventBody::BackerRevoke(BackerRevokeEvent {
        v: versify(0),
        i: credential_id.to_string(),
        s: format!("{:x}", 1),
        t: Ilk::Brv,
        p: dig.to_string(),
        ra: RegistrySeal {
            i: registry_id.to_string(),
            s: registry_sn,
            d: registry_dig.to_string(),
        },
    }))
}
