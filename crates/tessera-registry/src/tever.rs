//! Tever: the registry event validator / escrow engine.
//!
//! One `Tever` holds the accepted state of one registry: its
//! self-addressing identifier, the last accepted sequence number and
//! digest, and the current backer set and threshold. State only changes
//! through the accept transitions here; everything else the engine learns
//! is written to the Registry Store, which owns the durable bytes — the
//! in-memory record is a rebuildable projection, not a second source of
//! truth.
//!
//! Validation is synchronous and call-scoped. Each call either accepts
//! the event or fails with one condition; the two escrow conditions
//! (`MissingAnchor`, `MissingBackerSignatures`) leave the raw event and
//! an escrow pointer persisted, so a retry with the same or additional
//! evidence succeeds without re-transmission. Callers serialize
//! concurrent validation of the same registry; different registries are
//! fully independent.

use crate::coding::{seqner, verkey_from_prefix, IndexedSignature};
use crate::eventing::{apply_transition, EventBody};
use crate::prefixer::Prefixer;
use crate::serder::Serder;
use crate::{KeyStateOracle, RegistryError};
use ed25519_dalek::Verifier;
use rusqlite::Connection;
use std::collections::{BTreeMap, HashMap};
use tessera_db::store;
use tessera_types::{AnchorSeal, ConfigTrait, DigestCode, Ilk};

/// Validated runtime state of a single registry.
#[derive(Debug, Clone)]
pub struct Tever {
    registry_id: String,
    issuer: String,
    code: DigestCode,
    sn: u64,
    digest: String,
    backers: Vec<String>,
    toad: u64,
    no_backers: bool,
}

impl Tever {
    /// Validates a registry inception event and, on acceptance, creates
    /// the registry's runtime state.
    ///
    /// Processing order: self-addressing check, anchor well-formedness,
    /// durable persistence of the raw event, anchor resolution through
    /// the oracle, then the backer-signature threshold. Failures after
    /// persistence leave the raw event (and resolved anchor) stored so a
    /// retry is cheap.
    ///
    /// # Errors
    ///
    /// `Derivation` if the event's identifier does not verify;
    /// `Validation` for structural problems (wrong kind, malformed seal);
    /// the retryable `MissingAnchor` / `MissingBackerSignatures` escrow
    /// conditions otherwise.
    pub fn new(
        serder: &Serder,
        seal: &AnchorSeal,
        sigs: &[IndexedSignature],
        oracle: &dyn KeyStateOracle,
        conn: &Connection,
    ) -> Result<Self, RegistryError> {
        let event = match serder.body() {
            EventBody::Inception(event) => event,
            _ => return Err(RegistryError::UnexpectedKind(serder.ilk())),
        };

        let prefixer = Prefixer::new(&event.i)?;
        if !prefixer.verify(serder.body(), false) {
            return Err(RegistryError::Derivation(format!(
                "registry identifier '{}' does not verify against its inception event",
                event.i
            )));
        }

        let sn = serder.sn()?;
        if sn != 0 {
            return Err(RegistryError::Validation(format!(
                "inception carries sequence number {sn}, expected 0"
            )));
        }

        let no_backers = event.c.contains(&ConfigTrait::NoBackers);
        if no_backers && !event.b.is_empty() {
            return Err(RegistryError::NoBackersConflict);
        }
        let toad = parse_hex(&event.bt)?;
        if (event.b.is_empty() && toad != 0) || toad > event.b.len() as u64 {
            return Err(RegistryError::InvalidThreshold {
                toad,
                count: event.b.len(),
            });
        }

        let registry_id = event.i.clone();
        let digest = serder.digest(prefixer.code());

        confirm_anchor(conn, oracle, &registry_id, sn, &digest, serder.raw(), seal)?;
        satisfy_threshold(
            conn,
            &registry_id,
            sn,
            &digest,
            serder.raw(),
            &event.b,
            toad,
            sigs,
        )?;

        tracing::info!(registry = %registry_id, "registry inception accepted");

        Ok(Self {
            registry_id,
            issuer: event.ii.clone(),
            code: prefixer.code(),
            sn,
            digest,
            backers: event.b.clone(),
            toad,
            no_backers,
        })
    }

    /// Validates a subsequent event against this registry's state: a
    /// rotation (`vrt`) of the backer set, or a credential event
    /// (`iss`/`rev`/`bis`/`brv`).
    ///
    /// Rotations advance `(sn, digest, backers, toad)` on acceptance.
    /// Credential events index under the credential identifier and leave
    /// registry state untouched.
    ///
    /// # Errors
    ///
    /// `Validation` for linkage problems (wrong registry, bad prior
    /// digest, seal not matching accepted registry state);
    /// `InvalidSequence` when the sequence does not strictly follow;
    /// the retryable escrow conditions as in [`Self::new`].
    pub fn update(
        &mut self,
        serder: &Serder,
        seal: &AnchorSeal,
        sigs: &[IndexedSignature],
        oracle: &dyn KeyStateOracle,
        conn: &Connection,
    ) -> Result<(), RegistryError> {
        match serder.body() {
            EventBody::Rotation(_) => self.rotate(serder, seal, sigs, oracle, conn),
            EventBody::Issue(_) | EventBody::Revoke(_) => {
                self.simple_credential(serder, seal, oracle, conn)
            }
            EventBody::BackerIssue(_) | EventBody::BackerRevoke(_) => {
                self.backed_credential(serder, seal, sigs, oracle, conn)
            }
            EventBody::Inception(_) => Err(RegistryError::UnexpectedKind(Ilk::Vcp)),
        }
    }

    fn rotate(
        &mut self,
        serder: &Serder,
        seal: &AnchorSeal,
        sigs: &[IndexedSignature],
        oracle: &dyn KeyStateOracle,
        conn: &Connection,
    ) -> Result<(), RegistryError> {
        let event = match serder.body() {
            EventBody::Rotation(event) => event,
            _ => unreachable!("rotate is only called with rotation bodies"),
        };

        if event.i != self.registry_id {
            return Err(RegistryError::Validation(format!(
                "rotation names registry '{}', expected '{}'",
                event.i, self.registry_id
            )));
        }
        if self.no_backers {
            return Err(RegistryError::Validation(
                "a NoBackers registry cannot rotate its backer set".to_string(),
            ));
        }
        let sn = serder.sn()?;
        if sn != self.sn + 1 {
            return Err(RegistryError::InvalidSequence(sn));
        }
        if event.p != self.digest {
            return Err(RegistryError::Validation(format!(
                "rotation prior digest '{}' does not match accepted digest '{}'",
                event.p, self.digest
            )));
        }

        let new_backers = apply_transition(&self.backers, &event.br, &event.ba)?;
        let toad = parse_hex(&event.bt)?;
        if (new_backers.is_empty() && toad != 0) || toad > new_backers.len() as u64 {
            return Err(RegistryError::InvalidThreshold {
                toad,
                count: new_backers.len(),
            });
        }

        let digest = serder.digest(self.code);
        confirm_anchor(conn, oracle, &self.registry_id, sn, &digest, serder.raw(), seal)?;
        // The rotated-to backer set attests its own rotation.
        satisfy_threshold(
            conn,
            &self.registry_id,
            sn,
            &digest,
            serder.raw(),
            &new_backers,
            toad,
            sigs,
        )?;

        tracing::info!(
            registry = %self.registry_id,
            sn,
            backers = new_backers.len(),
            "registry rotation accepted"
        );

        self.sn = sn;
        self.digest = digest;
        self.backers = new_backers;
        self.toad = toad;
        Ok(())
    }

    fn simple_credential(
        &self,
        serder: &Serder,
        seal: &AnchorSeal,
        oracle: &dyn KeyStateOracle,
        conn: &Connection,
    ) -> Result<(), RegistryError> {
        if !self.backers.is_empty() {
            return Err(RegistryError::Validation(
                "simple credential events require a backerless registry".to_string(),
            ));
        }
        let sn = serder.sn()?;
        let credential_id = serder.pre().to_string();

        match serder.body() {
            EventBody::Issue(event) => {
                if event.ri != self.registry_id {
                    return Err(RegistryError::Validation(format!(
                        "issuance names registry '{}', expected '{}'",
                        event.ri, self.registry_id
                    )));
                }
                if sn != 0 {
                    return Err(RegistryError::InvalidSequence(sn));
                }
            }
            EventBody::Revoke(event) => {
                if sn != 1 {
                    return Err(RegistryError::InvalidSequence(sn));
                }
                self.check_prior_issuance(conn, &credential_id, &event.p)?;
            }
            _ => unreachable!("simple_credential is only called with iss/rev bodies"),
        }

        let digest = serder.digest(self.code);
        confirm_anchor(conn, oracle, &credential_id, sn, &digest, serder.raw(), seal)?;
        store::set_confirmed(conn, &credential_id, sn, &digest)?;

        tracing::info!(
            registry = %self.registry_id,
            credential = %credential_id,
            kind = serder.ilk().label(),
            "credential event accepted"
        );
        Ok(())
    }

    fn backed_credential(
        &self,
        serder: &Serder,
        seal: &AnchorSeal,
        sigs: &[IndexedSignature],
        oracle: &dyn KeyStateOracle,
        conn: &Connection,
    ) -> Result<(), RegistryError> {
        if self.no_backers {
            return Err(RegistryError::Validation(
                "backer-attested credential events require a backed registry".to_string(),
            ));
        }
        let sn = serder.sn()?;
        let credential_id = serder.pre().to_string();

        let ra = match serder.body() {
            EventBody::BackerIssue(event) => {
                if event.ii != self.registry_id {
                    return Err(RegistryError::Validation(format!(
                        "issuance names registry '{}', expected '{}'",
                        event.ii, self.registry_id
                    )));
                }
                if sn != 0 {
                    return Err(RegistryError::InvalidSequence(sn));
                }
                &event.ra
            }
            EventBody::BackerRevoke(event) => {
                if sn != 1 {
                    return Err(RegistryError::InvalidSequence(sn));
                }
                self.check_prior_issuance(conn, &credential_id, &event.p)?;
                &event.ra
            }
            _ => unreachable!("backed_credential is only called with bis/brv bodies"),
        };

        if ra.i != self.registry_id {
            return Err(RegistryError::Validation(format!(
                "registry seal names '{}', expected '{}'",
                ra.i, self.registry_id
            )));
        }
        match store::confirmed_digest(conn, &self.registry_id, ra.s)? {
            Some(digest) if digest == ra.d => {}
            _ => {
                return Err(RegistryError::Validation(format!(
                    "registry seal at sn {} does not match accepted registry state",
                    ra.s
                )))
            }
        }

        let digest = serder.digest(self.code);
        confirm_anchor(conn, oracle, &credential_id, sn, &digest, serder.raw(), seal)?;
        satisfy_threshold(
            conn,
            &credential_id,
            sn,
            &digest,
            serder.raw(),
            &self.backers,
            self.toad,
            sigs,
        )?;

        tracing::info!(
            registry = %self.registry_id,
            credential = %credential_id,
            kind = serder.ilk().label(),
            "credential event accepted"
        );
        Ok(())
    }

    fn check_prior_issuance(
        &self,
        conn: &Connection,
        credential_id: &str,
        prior: &str,
    ) -> Result<(), RegistryError> {
        match store::confirmed_digest(conn, credential_id, 0)? {
            Some(digest) if digest == prior => Ok(()),
            _ => Err(RegistryError::Validation(format!(
                "revocation of '{credential_id}' does not link to an accepted issuance"
            ))),
        }
    }

    /// The registry's self-addressing identifier.
    pub fn registry_id(&self) -> &str {
        &self.registry_id
    }

    /// The issuing controller's identifier prefix.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The last accepted registry sequence number.
    pub fn sn(&self) -> u64 {
        self.sn
    }

    /// The digest of the last accepted registry event.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// The current backer set.
    pub fn backers(&self) -> &[String] {
        &self.backers
    }

    /// The current backer-signature threshold.
    pub fn toad(&self) -> u64 {
        self.toad
    }

    /// Whether the registry carries the `NB` (NoBackers) trait.
    pub fn no_backers(&self) -> bool {
        self.no_backers
    }
}

/// Steps 2–5 of the processing protocol: seal well-formedness, durable
/// persistence of the raw event, anchor resolution, anchor recording.
fn confirm_anchor(
    conn: &Connection,
    oracle: &dyn KeyStateOracle,
    key: &str,
    sn: u64,
    digest: &str,
    raw: &[u8],
    seal: &AnchorSeal,
) -> Result<(), RegistryError> {
    // Structural checks happen before any store write: a controller
    // inception (sn 0) cannot co-anchor registry state, so no retry can
    // ever resolve such a seal.
    if seal.i.is_empty() {
        return Err(RegistryError::Validation(
            "anchor seal has an empty controller identifier".to_string(),
        ));
    }
    if seal.s < 1 {
        return Err(RegistryError::Validation(format!(
            "anchor seal names controller sequence {}, inception cannot anchor",
            seal.s
        )));
    }

    store::put_raw_event(conn, key, digest, raw)?;

    match oracle.resolve(&seal.i, seal.s) {
        Some(resolved) if !seal.d.is_empty() && resolved == seal.d => {
            let couple = format!("{}{}{}", seal.i, seqner(seal.s), seal.d);
            store::put_anchor_couple(conn, digest, &couple)?;
            Ok(())
        }
        _ => {
            store::set_awaiting_anchor(conn, key, sn, digest)?;
            tracing::debug!(key, sn, "anchor not yet resolvable, escrowed");
            Err(RegistryError::MissingAnchor {
                registry_id: key.to_string(),
                sn,
                digest: digest.to_string(),
            })
        }
    }
}

/// Step 6: validate supplied backer signatures against the governing
/// backer set and either accept or escrow on the threshold.
#[allow(clippy::too_many_arguments)]
fn satisfy_threshold(
    conn: &Connection,
    key: &str,
    sn: u64,
    digest: &str,
    raw: &[u8],
    backers: &[String],
    toad: u64,
    sigs: &[IndexedSignature],
) -> Result<(), RegistryError> {
    if backers.is_empty() || toad == 0 {
        store::set_confirmed(conn, key, sn, digest)?;
        return Ok(());
    }

    // Each backer counts at most once, keyed by its set position.
    let mut valid: BTreeMap<u32, IndexedSignature> = BTreeMap::new();
    for sig in sigs {
        let Some(backer) = backers.get(sig.index as usize) else {
            tracing::debug!(key, index = sig.index, "signature index outside backer set");
            continue;
        };
        let Ok(verkey) = verkey_from_prefix(backer) else {
            tracing::debug!(key, backer = %backer, "backer prefix is not a verifiable key");
            continue;
        };
        if verkey.verify(raw, &sig.signature()).is_ok() {
            valid.entry(sig.index).or_insert_with(|| sig.clone());
        } else {
            tracing::debug!(key, index = sig.index, "backer signature failed verification");
        }
    }

    if (valid.len() as u64) < toad {
        store::set_awaiting_sigs(conn, key, sn, digest)?;
        tracing::debug!(key, sn, have = valid.len(), need = toad, "threshold unmet, escrowed");
        return Err(RegistryError::MissingBackerSignatures {
            registry_id: key.to_string(),
            sn,
            digest: digest.to_string(),
            have: valid.len(),
            need: toad,
        });
    }

    for (index, sig) in &valid {
        store::add_backer_sig(conn, digest, *index, &sig.qb64())?;
    }
    store::set_confirmed(conn, key, sn, digest)?;
    Ok(())
}

fn parse_hex(text: &str) -> Result<u64, RegistryError> {
    u64::from_str_radix(text, 16)
        .map_err(|_| RegistryError::Validation(format!("bad hex field value '{text}'")))
}

/// Registry-keyed arena of `Tever` state records.
///
/// Dispatches incoming events to the registry they belong to, creating a
/// new record on a registry's first valid inception. Sharding by registry
/// identifier is safe: records never share mutable state.
#[derive(Debug, Default)]
pub struct Tevery {
    tevers: HashMap<String, Tever>,
}

impl Tevery {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the accepted state of a registry, if any.
    pub fn tever(&self, registry_id: &str) -> Option<&Tever> {
        self.tevers.get(registry_id)
    }

    /// Routes one event through validation: inceptions create registry
    /// state, every other kind updates the registry it resolves to.
    ///
    /// # Errors
    ///
    /// Propagates the validation outcome; additionally fails with
    /// `Validation` when a non-inception event names a registry this
    /// arena has never accepted.
    pub fn process(
        &mut self,
        serder: &Serder,
        seal: &AnchorSeal,
        sigs: &[IndexedSignature],
        oracle: &dyn KeyStateOracle,
        conn: &Connection,
    ) -> Result<(), RegistryError> {
        match serder.ilk() {
            Ilk::Vcp => {
                let tever = Tever::new(serder, seal, sigs, oracle, conn)?;
                self.tevers.insert(tever.registry_id().to_string(), tever);
                Ok(())
            }
            _ => {
                let registry_id = self.registry_for(serder, conn)?;
                let tever = self.tevers.get_mut(&registry_id).ok_or_else(|| {
                    RegistryError::Validation(format!(
                        "no accepted registry state for '{registry_id}'"
                    ))
                })?;
                tever.update(serder, seal, sigs, oracle, conn)
            }
        }
    }

    /// Resolves the registry an event belongs to from its linkage fields:
    /// `i` for rotations, `ri`/`ii`/`ra.i` for credential events, and the
    /// stored prior issuance for simple revocations.
    fn registry_for(&self, serder: &Serder, conn: &Connection) -> Result<String, RegistryError> {
        match serder.body() {
            EventBody::Rotation(event) => Ok(event.i.clone()),
            EventBody::Issue(event) => Ok(event.ri.clone()),
            EventBody::BackerIssue(event) => Ok(event.ii.clone()),
            EventBody::BackerRevoke(event) => Ok(event.ra.i.clone()),
            EventBody::Revoke(event) => {
                let raw = store::raw_event(conn, &event.i, &event.p)?.ok_or_else(|| {
                    RegistryError::Validation(format!(
                        "revocation prior '{}' is not a stored event",
                        event.p
                    ))
                })?;
                match Serder::from_raw(&raw)?.body() {
                    EventBody::Issue(prior) => Ok(prior.ri.clone()),
                    _ => Err(RegistryError::Validation(
                        "revocation prior is not an issuance event".to_string(),
                    )),
                }
            }
            EventBody::Inception(_) => unreachable!("inceptions are handled by process"),
        }
    }
}
