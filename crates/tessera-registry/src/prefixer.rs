//! Self-addressing identifier derivation ("Prefixer").
//!
//! A registry's identifier is a digest of its own inception event. The
//! digest material is the canonical serialization of the event with the
//! identifier field holding a run of `#` dummy characters of the final
//! identifier's length — so the version string, and therefore the digest,
//! match the event exactly as it will be persisted. Every other field
//! (config traits, backer list, thresholds) is fully populated before
//! derivation: all of them are covered by the self-addressing guarantee.

use crate::eventing::EventBody;
use crate::serder::{digest_raw, sized_raw};
use crate::RegistryError;
use tessera_types::DigestCode;

/// The dummy character filling the identifier field during derivation.
const DUMMY: char = '#';

/// A derived or adopted self-addressing identifier together with its
/// digest algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefixer {
    qb64: String,
    code: DigestCode,
}

impl Prefixer {
    /// Adopts an existing identifier, reading the algorithm from its
    /// derivation code.
    ///
    /// # Errors
    ///
    /// Returns an empty-material error for an empty string and a
    /// derivation error for an unknown code or wrong length.
    pub fn new(qb64: &str) -> Result<Self, RegistryError> {
        let code_char = qb64
            .chars()
            .next()
            .ok_or(RegistryError::EmptyMaterial("identifier prefix is empty"))?;
        let code = DigestCode::from_code(code_char).ok_or_else(|| {
            RegistryError::Derivation(format!("unsupported derivation code '{code_char}'"))
        })?;
        if qb64.len() != code.full_size() {
            return Err(RegistryError::Derivation(format!(
                "identifier '{qb64}' has length {}, expected {}",
                qb64.len(),
                code.full_size()
            )));
        }
        Ok(Self {
            qb64: qb64.to_string(),
            code,
        })
    }

    /// Derives the self-addressing identifier of an inception event body.
    ///
    /// # Errors
    ///
    /// Returns a derivation error for any event kind other than registry
    /// inception — only identifier-bearing kinds are derivable.
    pub fn derive(body: &EventBody, code: DigestCode) -> Result<Self, RegistryError> {
        if !matches!(body, EventBody::Inception(_)) {
            return Err(RegistryError::Derivation(format!(
                "cannot derive an identifier from a '{}' event",
                body.ilk().label()
            )));
        }
        let qb64 = digest_raw(code, &derivation_material(body, code, false)?);
        Ok(Self { qb64, code })
    }

    /// The identifier in qualified base64.
    pub fn qb64(&self) -> &str {
        &self.qb64
    }

    /// The digest algorithm the identifier was derived with.
    pub fn code(&self) -> DigestCode {
        self.code
    }

    /// Recomputes the derivation over `body` and compares it to this
    /// identifier. With `prefixed` the identifier field is hashed as-is
    /// (self-referential mode) instead of being dummied out; that mode
    /// disagrees with identifiers produced by [`Self::derive`].
    pub fn verify(&self, body: &EventBody, prefixed: bool) -> bool {
        if !matches!(body, EventBody::Inception(_)) {
            return false;
        }
        match derivation_material(body, self.code, prefixed) {
            Ok(raw) => digest_raw(self.code, &raw) == self.qb64,
            Err(_) => false,
        }
    }
}

/// Serializes the digest material for a body: identifier dummied out
/// (unless `prefixed`), version string sized over the result.
fn derivation_material(
    body: &EventBody,
    code: DigestCode,
    prefixed: bool,
) -> Result<Vec<u8>, RegistryError> {
    let mut material = body.clone();
    if !prefixed {
        material.set_i(DUMMY.to_string().repeat(code.full_size()));
    }
    sized_raw(&mut material)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventing::InceptionEvent;
    use crate::serder::versify;
    use tessera_types::{ConfigTrait, Ilk};

    const ISSUER: &str = "DntNTPnDFBnmlO6J44LXCrzZTAmpe-82b7BmQGtL4QhM";
    const BAK1: &str = "EXvR3p8V95W8J7Ui4-mEzZ79S-A1esAnJo1Kmzq80Jkc";
    const BAK2: &str = "DSEpNJeSJjxo6oAxkNE8eCOJg2HRPstqkeHWBAvN9XNU";
    const BAK3: &str = "Dvxo-P4W_Z0xXTfoA3_4DMPn7oi0mLCElOWJDpC0nQXw";

    fn inception_body(config: Vec<ConfigTrait>, backers: Vec<&str>, bt: &str) -> EventBody {
        EventBody::Inception(InceptionEvent {
            v: versify(0),
            i: String::new(),
            ii: ISSUER.to_string(),
            s: "0".to_string(),
            t: Ilk::Vcp,
            c: config,
            bt: bt.to_string(),
            b: backers.into_iter().map(String::from).collect(),
        })
    }

    #[test]
    fn empty_material_fails() {
        let err = Prefixer::new("").unwrap_err();
        assert!(matches!(err, RegistryError::EmptyMaterial(_)));
    }

    #[test]
    fn derive_rejects_non_inception_kinds() {
        let serder = crate::eventing::issue("Dvc", "Ereg").unwrap();
        let err = Prefixer::derive(serder.body(), DigestCode::Blake3_256).unwrap_err();
        assert!(matches!(err, RegistryError::Derivation(_)));
    }

    #[test]
    fn derive_matches_deployed_vectors() {
        // Fixtures from the deployed registry implementation.
        let cases = [
            (vec![], vec![], "0", "EiLMklo_OJmbv8D58wPlv_fudfEzuqsIl3mFYq640Jzg"),
            (
                vec![ConfigTrait::NoBackers],
                vec![],
                "0",
                "EjD_sFljMHXJCC3rEFL93MwHNGguKdC11mcMuQnZitcs",
            ),
            (
                vec![],
                vec![BAK1],
                "1",
                "EVohdnN33-vdNOTPYxeTQIWVzRKtzZzBoiBSGYSSnD0s",
            ),
            (
                vec![],
                vec![BAK1, BAK2, BAK3],
                "3",
                "Ez5ncVo7zXjC9DJT8-DM-ZMqJ-WtgpEGGs8JUzXh_Tc0",
            ),
            (
                vec![],
                vec![BAK1, BAK2, BAK3],
                "2",
                "E39gu2hSUBannC3st40r2d8Dy7T6JsyTk0JefYYPtDgE",
            ),
        ];

        for (config, backers, bt, expected) in cases {
            let body = inception_body(config, backers, bt);
            let prefixer = Prefixer::derive(&body, DigestCode::Blake3_256)
                .expect("derivation should succeed");
            assert_eq!(prefixer.qb64(), expected);

            // Standard mode verifies; self-referential mode disagrees.
            assert!(prefixer.verify(&body, false));
            assert!(!prefixer.verify(&body, true));

            // Verification also holds once the identifier is embedded.
            let mut embedded = body.clone();
            embedded.set_i(prefixer.qb64().to_string());
            assert!(prefixer.verify(&embedded, false));
            assert!(!prefixer.verify(&embedded, true));
        }
    }

    #[test]
    fn verify_detects_tampering() {
        let body = inception_body(vec![], vec![BAK1], "1");
        let prefixer =
            Prefixer::derive(&body, DigestCode::Blake3_256).expect("derivation should succeed");

        let tampered = inception_body(vec![], vec![BAK2], "1");
        assert!(!prefixer.verify(&tampered, false));

        let tampered_threshold = inception_body(vec![], vec![BAK1], "0");
        assert!(!prefixer.verify(&tampered_threshold, false));
    }

    #[test]
    fn sha2_derivation_differs_but_verifies() {
        let body = inception_body(vec![], vec![], "0");
        let blake = Prefixer::derive(&body, DigestCode::Blake3_256).unwrap();
        let sha = Prefixer::derive(&body, DigestCode::Sha2_256).unwrap();

        assert!(sha.qb64().starts_with('I'));
        assert_ne!(blake.qb64(), sha.qb64());
        assert!(sha.verify(&body, false));
    }
}
