//! Witness discovery URL (OOBI) generation.
//!
//! An out-of-band introduction URL tells a peer where a controller's KEL
//! can be fetched from one of its witnesses:
//! `http://{host}:{port}/oobi/{controller}/witness/{witness}`. Generation
//! requires each witness to have a known, reachable HTTP endpoint.

use crate::config::WitnessConfig;
use thiserror::Error;

/// Errors that can occur generating discovery URLs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OobiError {
    /// The identifier has no witnesses to introduce through.
    #[error("identifier '{0}' does not have any witnesses")]
    NoWitnesses(String),

    /// A witness has no known HTTP endpoint.
    #[error("unable to query witness '{0}', no http endpoint")]
    MissingEndpoint(String),
}

/// Generates one discovery URL per witness of `controller`.
///
/// # Errors
///
/// Returns `NoWitnesses` for an empty witness set and `MissingEndpoint`
/// when any witness lacks a reachable HTTP URL — a partial introduction
/// would silently hide witnesses, so generation is all-or-nothing.
pub fn witness_oobis(
    controller: &str,
    witnesses: &[WitnessConfig],
) -> Result<Vec<String>, OobiError> {
    if witnesses.is_empty() {
        return Err(OobiError::NoWitnesses(controller.to_string()));
    }

    witnesses
        .iter()
        .map(|witness| {
            if witness.url.is_empty() {
                return Err(OobiError::MissingEndpoint(witness.prefix.clone()));
            }
            Ok(format!(
                "{}/oobi/{}/witness/{}",
                witness.url.trim_end_matches('/'),
                controller,
                witness.prefix
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn witness(prefix: &str, url: &str) -> WitnessConfig {
        WitnessConfig {
            prefix: prefix.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn generates_one_url_per_witness() {
        let witnesses = vec![
            witness("BwitOne", "http://127.0.0.1:5631"),
            witness("BwitTwo", "http://witness.example:5632/"),
        ];

        let urls = witness_oobis("Econtroller", &witnesses).expect("should generate");
        assert_eq!(
            urls,
            vec![
                "http://127.0.0.1:5631/oobi/Econtroller/witness/BwitOne",
                "http://witness.example:5632/oobi/Econtroller/witness/BwitTwo",
            ]
        );
    }

    #[test]
    fn fails_without_witnesses() {
        assert_eq!(
            witness_oobis("Econtroller", &[]),
            Err(OobiError::NoWitnesses("Econtroller".to_string()))
        );
    }

    #[test]
    fn fails_when_any_witness_lacks_an_endpoint() {
        let witnesses = vec![
            witness("BwitOne", "http://127.0.0.1:5631"),
            witness("BwitTwo", ""),
        ];

        assert_eq!(
            witness_oobis("Econtroller", &witnesses),
            Err(OobiError::MissingEndpoint("BwitTwo".to_string()))
        );
    }
}
