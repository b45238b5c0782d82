//! Factory conformance tests against the deployed wire format.
//!
//! The raw byte fixtures come from an existing production registry
//! deployment; serializations must match byte-for-byte.

use tessera_registry::{
    backer_issue, backer_revoke, incept, issue, revoke, rotate, RegistryError, Serder,
};
use tessera_types::{ConfigTrait, DigestCode};

const ISSUER: &str = "DntNTPnDFBnmlO6J44LXCrzZTAmpe-82b7BmQGtL4QhM";
const BAK1: &str = "EXvR3p8V95W8J7Ui4-mEzZ79S-A1esAnJo1Kmzq80Jkc";
const BAK2: &str = "DSEpNJeSJjxo6oAxkNE8eCOJg2HRPstqkeHWBAvN9XNU";
const BAK3: &str = "Dvxo-P4W_Z0xXTfoA3_4DMPn7oi0mLCElOWJDpC0nQXw";
const REGK: &str = "EE3Xv6CWwEMpW-99rhPD9IHFCR2LN5ienLVI8yG5faBw";
const DIG: &str = "EY2L3ycqK9645aEeQKP941xojSiuiHsw4Y6yTW-PmsBg";

fn baks(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn incept_no_backers() {
    let serder = incept(ISSUER, &[], &[], None, DigestCode::Blake3_256).unwrap();
    assert_eq!(
        serder.raw(),
        &b"{\"v\":\"KERI10JSON0000a9_\",\"i\":\"EiLMklo_OJmbv8D58wPlv_fudfEzuqsIl3mFYq640Jzg\",\
\"ii\":\"DntNTPnDFBnmlO6J44LXCrzZTAmpe-82b7BmQGtL4QhM\",\"s\":\"0\",\"t\":\"vcp\",\"c\":[],\"bt\":\"0\",\"b\":[]}"[..]
    );
}

#[test]
fn incept_no_backers_allowed_trait() {
    let serder = incept(
        ISSUER,
        &[ConfigTrait::NoBackers],
        &[],
        None,
        DigestCode::Blake3_256,
    )
    .unwrap();
    assert_eq!(
        serder.raw(),
        &b"{\"v\":\"KERI10JSON0000ad_\",\"i\":\"EjD_sFljMHXJCC3rEFL93MwHNGguKdC11mcMuQnZitcs\",\
\"ii\":\"DntNTPnDFBnmlO6J44LXCrzZTAmpe-82b7BmQGtL4QhM\",\"s\":\"0\",\"t\":\"vcp\",\"c\":[\"NB\"],\"bt\":\"0\",\"b\":[]}"[..]
    );
}

#[test]
fn incept_rejects_backer_under_no_backers_trait() {
    let err = incept(
        ISSUER,
        &[ConfigTrait::NoBackers],
        &baks(&[BAK1]),
        None,
        DigestCode::Blake3_256,
    )
    .unwrap_err();
    assert!(matches!(err, RegistryError::NoBackersConflict));
}

#[test]
fn incept_rejects_duplicate_backers() {
    let err = incept(
        ISSUER,
        &[],
        &baks(&[BAK1, BAK1, BAK2]),
        None,
        DigestCode::Blake3_256,
    )
    .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateBackers(_)));
}

#[test]
fn incept_rejects_out_of_bounds_threshold() {
    let err = incept(
        ISSUER,
        &[],
        &baks(&[BAK1, BAK2, BAK3]),
        Some(4),
        DigestCode::Blake3_256,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::InvalidThreshold { toad: 4, count: 3 }
    ));

    let err = incept(ISSUER, &[], &[], Some(1), DigestCode::Blake3_256).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::InvalidThreshold { toad: 1, count: 0 }
    ));
}

#[test]
fn incept_one_backer() {
    let serder = incept(ISSUER, &[], &baks(&[BAK1]), None, DigestCode::Blake3_256).unwrap();
    let expected = &b"{\"v\":\"KERI10JSON0000d7_\",\"i\":\"EVohdnN33-vdNOTPYxeTQIWVzRKtzZzBoiBSGYSSnD0s\",\
\"ii\":\"DntNTPnDFBnmlO6J44LXCrzZTAmpe-82b7BmQGtL4QhM\",\"s\":\"0\",\"t\":\"vcp\",\"c\":[],\"bt\":\"1\",\
\"b\":[\"EXvR3p8V95W8J7Ui4-mEzZ79S-A1esAnJo1Kmzq80Jkc\"]}"[..];
    assert_eq!(serder.raw(), expected);

    // An explicit threshold equal to the default yields the same bytes.
    let explicit = incept(ISSUER, &[], &baks(&[BAK1]), Some(1), DigestCode::Blake3_256).unwrap();
    assert_eq!(explicit.raw(), expected);
}

#[test]
fn incept_three_backers_default_threshold() {
    let serder = incept(
        ISSUER,
        &[],
        &baks(&[BAK1, BAK2, BAK3]),
        None,
        DigestCode::Blake3_256,
    )
    .unwrap();
    assert_eq!(
        serder.raw(),
        &b"{\"v\":\"KERI10JSON000135_\",\"i\":\"Ez5ncVo7zXjC9DJT8-DM-ZMqJ-WtgpEGGs8JUzXh_Tc0\",\
\"ii\":\"DntNTPnDFBnmlO6J44LXCrzZTAmpe-82b7BmQGtL4QhM\",\"s\":\"0\",\"t\":\"vcp\",\"c\":[],\"bt\":\"3\",\
\"b\":[\"EXvR3p8V95W8J7Ui4-mEzZ79S-A1esAnJo1Kmzq80Jkc\",\"DSEpNJeSJjxo6oAxkNE8eCOJg2HRPstqkeHWBAvN9XNU\",\
\"Dvxo-P4W_Z0xXTfoA3_4DMPn7oi0mLCElOWJDpC0nQXw\"]}"[..]
    );
}

#[test]
fn incept_three_backers_explicit_threshold() {
    let serder = incept(
        ISSUER,
        &[],
        &baks(&[BAK1, BAK2, BAK3]),
        Some(2),
        DigestCode::Blake3_256,
    )
    .unwrap();
    assert_eq!(
        serder.raw(),
        &b"{\"v\":\"KERI10JSON000135_\",\"i\":\"E39gu2hSUBannC3st40r2d8Dy7T6JsyTk0JefYYPtDgE\",\
\"ii\":\"DntNTPnDFBnmlO6J44LXCrzZTAmpe-82b7BmQGtL4QhM\",\"s\":\"0\",\"t\":\"vcp\",\"c\":[],\"bt\":\"2\",\
\"b\":[\"EXvR3p8V95W8J7Ui4-mEzZ79S-A1esAnJo1Kmzq80Jkc\",\"DSEpNJeSJjxo6oAxkNE8eCOJg2HRPstqkeHWBAvN9XNU\",\
\"Dvxo-P4W_Z0xXTfoA3_4DMPn7oi0mLCElOWJDpC0nQXw\"]}"[..]
    );
}

#[test]
fn rotate_empty_sets() {
    let serder = rotate(REGK, DIG, 1, &[], &[], &[], None).unwrap();
    assert_eq!(
        serder.raw(),
        &b"{\"v\":\"KERI10JSON0000aa_\",\"i\":\"EE3Xv6CWwEMpW-99rhPD9IHFCR2LN5ienLVI8yG5faBw\",\
\"p\":\"EY2L3ycqK9645aEeQKP941xojSiuiHsw4Y6yTW-PmsBg\",\"s\":\"1\",\"t\":\"vrt\",\"bt\":\"0\",\"br\":[],\"ba\":[]}"[..]
    );
}

#[test]
fn rotate_keeps_current_backers() {
    let serder = rotate(REGK, DIG, 3, &baks(&[BAK1]), &[], &[], None).unwrap();
    assert_eq!(
        serder.raw(),
        &b"{\"v\":\"KERI10JSON0000aa_\",\"i\":\"EE3Xv6CWwEMpW-99rhPD9IHFCR2LN5ienLVI8yG5faBw\",\
\"p\":\"EY2L3ycqK9645aEeQKP941xojSiuiHsw4Y6yTW-PmsBg\",\"s\":\"3\",\"t\":\"vrt\",\"bt\":\"1\",\"br\":[],\"ba\":[]}"[..]
    );

    let serder = rotate(REGK, DIG, 4, &baks(&[BAK1, BAK2, BAK3]), &[], &[], None).unwrap();
    assert_eq!(
        serder.raw(),
        &b"{\"v\":\"KERI10JSON0000aa_\",\"i\":\"EE3Xv6CWwEMpW-99rhPD9IHFCR2LN5ienLVI8yG5faBw\",\
\"p\":\"EY2L3ycqK9645aEeQKP941xojSiuiHsw4Y6yTW-PmsBg\",\"s\":\"4\",\"t\":\"vrt\",\"bt\":\"3\",\"br\":[],\"ba\":[]}"[..]
    );
}

#[test]
fn rotate_cuts() {
    let serder = rotate(
        REGK,
        DIG,
        4,
        &baks(&[BAK1, BAK2, BAK3]),
        &baks(&[BAK2]),
        &[],
        None,
    )
    .unwrap();
    assert_eq!(
        serder.raw(),
        &b"{\"v\":\"KERI10JSON0000d8_\",\"i\":\"EE3Xv6CWwEMpW-99rhPD9IHFCR2LN5ienLVI8yG5faBw\",\
\"p\":\"EY2L3ycqK9645aEeQKP941xojSiuiHsw4Y6yTW-PmsBg\",\"s\":\"4\",\"t\":\"vrt\",\"bt\":\"2\",\
\"br\":[\"DSEpNJeSJjxo6oAxkNE8eCOJg2HRPstqkeHWBAvN9XNU\"],\"ba\":[]}"[..]
    );

    let serder = rotate(
        REGK,
        DIG,
        4,
        &baks(&[BAK1, BAK2, BAK3]),
        &baks(&[BAK2, BAK3]),
        &[],
        None,
    )
    .unwrap();
    assert_eq!(
        serder.raw(),
        &b"{\"v\":\"KERI10JSON000107_\",\"i\":\"EE3Xv6CWwEMpW-99rhPD9IHFCR2LN5ienLVI8yG5faBw\",\
\"p\":\"EY2L3ycqK9645aEeQKP941xojSiuiHsw4Y6yTW-PmsBg\",\"s\":\"4\",\"t\":\"vrt\",\"bt\":\"1\",\
\"br\":[\"DSEpNJeSJjxo6oAxkNE8eCOJg2HRPstqkeHWBAvN9XNU\",\"Dvxo-P4W_Z0xXTfoA3_4DMPn7oi0mLCElOWJDpC0nQXw\"],\
\"ba\":[]}"[..]
    );

    let serder = rotate(
        REGK,
        DIG,
        4,
        &baks(&[BAK1, BAK2, BAK3]),
        &baks(&[BAK1, BAK2, BAK3]),
        &[],
        None,
    )
    .unwrap();
    assert_eq!(
        serder.raw(),
        &b"{\"v\":\"KERI10JSON000136_\",\"i\":\"EE3Xv6CWwEMpW-99rhPD9IHFCR2LN5ienLVI8yG5faBw\",\
\"p\":\"EY2L3ycqK9645aEeQKP941xojSiuiHsw4Y6yTW-PmsBg\",\"s\":\"4\",\"t\":\"vrt\",\"bt\":\"0\",\
\"br\":[\"EXvR3p8V95W8J7Ui4-mEzZ79S-A1esAnJo1Kmzq80Jkc\",\"DSEpNJeSJjxo6oAxkNE8eCOJg2HRPstqkeHWBAvN9XNU\",\
\"Dvxo-P4W_Z0xXTfoA3_4DMPn7oi0mLCElOWJDpC0nQXw\"],\"ba\":[]}"[..]
    );
}

#[test]
fn rotate_adds() {
    let serder = rotate(
        REGK,
        DIG,
        4,
        &baks(&[BAK2, BAK3]),
        &[],
        &baks(&[BAK1]),
        None,
    )
    .unwrap();
    assert_eq!(
        serder.raw(),
        &b"{\"v\":\"KERI10JSON0000d8_\",\"i\":\"EE3Xv6CWwEMpW-99rhPD9IHFCR2LN5ienLVI8yG5faBw\",\
\"p\":\"EY2L3ycqK9645aEeQKP941xojSiuiHsw4Y6yTW-PmsBg\",\"s\":\"4\",\"t\":\"vrt\",\"bt\":\"3\",\"br\":[],\
\"ba\":[\"EXvR3p8V95W8J7Ui4-mEzZ79S-A1esAnJo1Kmzq80Jkc\"]}"[..]
    );

    let serder = rotate(
        REGK,
        DIG,
        4,
        &[],
        &[],
        &baks(&[BAK1, BAK2, BAK3]),
        Some(2),
    )
    .unwrap();
    assert_eq!(
        serder.raw(),
        &b"{\"v\":\"KERI10JSON000136_\",\"i\":\"EE3Xv6CWwEMpW-99rhPD9IHFCR2LN5ienLVI8yG5faBw\",\
\"p\":\"EY2L3ycqK9645aEeQKP941xojSiuiHsw4Y6yTW-PmsBg\",\"s\":\"4\",\"t\":\"vrt\",\"bt\":\"2\",\"br\":[],\
\"ba\":[\"EXvR3p8V95W8J7Ui4-mEzZ79S-A1esAnJo1Kmzq80Jkc\",\"DSEpNJeSJjxo6oAxkNE8eCOJg2HRPstqkeHWBAvN9XNU\",\
\"Dvxo-P4W_Z0xXTfoA3_4DMPn7oi0mLCElOWJDpC0nQXw\"]}"[..]
    );

    let serder = rotate(
        REGK,
        DIG,
        4,
        &baks(&[BAK1]),
        &[],
        &baks(&[BAK2, BAK3]),
        Some(3),
    )
    .unwrap();
    assert_eq!(
        serder.raw(),
        &b"{\"v\":\"KERI10JSON000107_\",\"i\":\"EE3Xv6CWwEMpW-99rhPD9IHFCR2LN5ienLVI8yG5faBw\",\
\"p\":\"EY2L3ycqK9645aEeQKP941xojSiuiHsw4Y6yTW-PmsBg\",\"s\":\"4\",\"t\":\"vrt\",\"bt\":\"3\",\"br\":[],\
\"ba\":[\"DSEpNJeSJjxo6oAxkNE8eCOJg2HRPstqkeHWBAvN9XNU\",\"Dvxo-P4W_Z0xXTfoA3_4DMPn7oi0mLCElOWJDpC0nQXw\"]}"[..]
    );
}

#[test]
fn rotate_rejects_invalid_transitions() {
    // cut of a non-backer
    let err = rotate(REGK, DIG, 4, &baks(&[BAK1, BAK3]), &baks(&[BAK2]), &[], None).unwrap_err();
    assert!(matches!(err, RegistryError::InvalidBackerTransition(_)));

    // add of a remaining backer
    let err = rotate(REGK, DIG, 4, &baks(&[BAK2, BAK3]), &[], &baks(&[BAK2]), None).unwrap_err();
    assert!(matches!(err, RegistryError::InvalidBackerTransition(_)));

    // cut containing a non-backer alongside a valid one
    let err = rotate(
        REGK,
        DIG,
        4,
        &baks(&[BAK3]),
        &baks(&[BAK2, BAK3]),
        &[],
        None,
    )
    .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidBackerTransition(_)));

    // duplicate adds
    let err = rotate(REGK, DIG, 4, &[], &[], &baks(&[BAK1, BAK1]), None).unwrap_err();
    assert!(matches!(err, RegistryError::InvalidBackerTransition(_)));
}

#[test]
fn rotate_rejects_invalid_threshold() {
    let err = rotate(
        REGK,
        DIG,
        4,
        &baks(&[BAK1, BAK3]),
        &baks(&[BAK3]),
        &[],
        Some(2),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::InvalidThreshold { toad: 2, count: 1 }
    ));

    let err = rotate(REGK, DIG, 5, &[], &[], &baks(&[BAK2, BAK3]), Some(3)).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::InvalidThreshold { toad: 3, count: 2 }
    ));
}

#[test]
fn rotate_rejects_inception_sequence() {
    let err = rotate(REGK, DIG, 0, &[], &[], &[], None).unwrap_err();
    assert!(matches!(err, RegistryError::InvalidSequence(0)));
}

#[test]
fn simple_issue_and_revoke() {
    let vcdig = ISSUER;

    let serder = issue(vcdig, REGK).unwrap();
    assert_eq!(
        serder.raw(),
        &b"{\"v\":\"KERI10JSON000092_\",\"i\":\"DntNTPnDFBnmlO6J44LXCrzZTAmpe-82b7BmQGtL4QhM\",\"s\":\"0\",\
\"t\":\"iss\",\"ri\":\"EE3Xv6CWwEMpW-99rhPD9IHFCR2LN5ienLVI8yG5faBw\"}"[..]
    );

    let serder = revoke(vcdig, DIG).unwrap();
    assert_eq!(
        serder.raw(),
        &b"{\"v\":\"KERI10JSON000091_\",\"i\":\"DntNTPnDFBnmlO6J44LXCrzZTAmpe-82b7BmQGtL4QhM\",\"s\":\"1\",\"t\":\"rev\",\
\"p\":\"EY2L3ycqK9645aEeQKP941xojSiuiHsw4Y6yTW-PmsBg\"}"[..]
    );
}

#[test]
fn backer_issue_and_revoke() {
    let vcdig = ISSUER;
    let regd = "Ezpq06UecHwzy-K9FpNoRxCJp2wIGM9u2Edk-PLMZ1H4";

    let serder = backer_issue(vcdig, REGK, 3, regd).unwrap();
    assert_eq!(
        serder.raw(),
        &b"{\"v\":\"KERI10JSON000105_\",\"i\":\"DntNTPnDFBnmlO6J44LXCrzZTAmpe-82b7BmQGtL4QhM\",\
\"ii\":\"EE3Xv6CWwEMpW-99rhPD9IHFCR2LN5ienLVI8yG5faBw\",\"s\":\"0\",\"t\":\"bis\",\
\"ra\":{\"i\":\"EE3Xv6CWwEMpW-99rhPD9IHFCR2LN5ienLVI8yG5faBw\",\"s\":3,\
\"d\":\"Ezpq06UecHwzy-K9FpNoRxCJp2wIGM9u2Edk-PLMZ1H4\"}}"[..]
    );

    let serder = backer_revoke(vcdig, REGK, 3, regd, DIG).unwrap();
    assert_eq!(
        serder.raw(),
        &b"{\"v\":\"KERI10JSON000104_\",\"i\":\"DntNTPnDFBnmlO6J44LXCrzZTAmpe-82b7BmQGtL4QhM\",\"s\":\"1\",\"t\":\"brv\",\
\"p\":\"EY2L3ycqK9645aEeQKP941xojSiuiHsw4Y6yTW-PmsBg\",\
\"ra\":{\"i\":\"EE3Xv6CWwEMpW-99rhPD9IHFCR2LN5ienLVI8yG5faBw\",\"s\":3,\
\"d\":\"Ezpq06UecHwzy-K9FpNoRxCJp2wIGM9u2Edk-PLMZ1H4\"}}"[..]
    );
}

#[test]
fn serder_round_trips_raw_bytes() {
    let built = incept(ISSUER, &[], &baks(&[BAK1]), None, DigestCode::Blake3_256).unwrap();
    let parsed = Serder::from_raw(built.raw()).unwrap();
    assert_eq!(parsed, built);
    assert_eq!(parsed.sn().unwrap(), 0);
    assert_eq!(parsed.pre(), "EVohdnN33-vdNOTPYxeTQIWVzRKtzZzBoiBSGYSSnD0s");
}

#[test]
fn serder_rejects_size_mismatch() {
    let built = issue(ISSUER, REGK).unwrap();
    let mut raw = built.raw().to_vec();
    raw.extend_from_slice(b" ");
    assert!(matches!(
        Serder::from_raw(&raw),
        Err(RegistryError::Validation(_))
    ));
}
