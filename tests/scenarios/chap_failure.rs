// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Scenario: same CHAP setup as the success path, but the response comes
//! back with a flipped byte — the exchange must abort and record
//! `AuthResult=Fail` before propagating the error.

use iscsi_login_negotiator::negotiation::{error::NegotiationError, types::ParamType};

use crate::scenarios::common::{Harness, Token};

#[test]
fn mismatched_response_fails_and_records_auth_result() {
    let mut h = Harness::new();
    h.rng = crate::scenarios::common::FixedRng { byte: 42, fill: 0xAB };
    h.credentials.insert("alice", b"secret".to_vec());

    h.catalog.add(ParamType::List, "AuthMethod", "None", "CHAP,None").expect("add");
    h.catalog.add(ParamType::Declarative, "CHAP_A", "", "5").expect("add");
    h.catalog.add(ParamType::Declarative, "CHAP_I", "", "").expect("add");
    h.catalog.add(ParamType::Declarative, "CHAP_C", "", "").expect("add");
    h.catalog.add(ParamType::Declarative, "CHAP_N", "", "").expect("add");
    h.catalog.add(ParamType::Declarative, "CHAP_R", "", "").expect("add");
    h.catalog.add(ParamType::Declarative, "AuthResult", "", "").expect("add");

    h.parse(&[Token::Pair { key: "AuthMethod", value: "CHAP" }], false).expect("AuthMethod");
    h.parse(&[Token::Pair { key: "CHAP_A", value: "5" }], false).expect("CHAP_A");

    // A response with the last hex nibble corrupted, which still decodes
    // cleanly as hex but will not equal the expected MD5 digest.
    let bogus_response = format!("{}f", &"0".repeat(31));
    let result = h.parse(
        &[
            Token::Pair { key: "CHAP_N", value: "alice" },
            Token::Pair { key: "CHAP_R", value: &bogus_response },
        ],
        false,
    );

    assert!(matches!(result, Err(NegotiationError::AuthFailed(_))));
    assert_eq!(h.catalog.value("AuthResult", 0).expect("value"), "Fail");
}
