// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Scenario: a full CHAP round trip from the challenger's side — offer
//! `AuthMethod=CHAP`, agree on algorithm 5, issue a challenge, and accept
//! a correctly-computed response.
//!
//! The prose scenario in the spec narrates this from outside (initiator
//! and target PDUs interleaved); this drives `ChapContext` through
//! `engine::parse` one received batch at a time instead, matching the
//! actual API (see DESIGN.md's CHAP test-sequencing note).

use iscsi_login_negotiator::negotiation::{chap::calc_chap_response_hex, types::ParamType};

use crate::scenarios::common::{Harness, Token};

fn seed_chap_catalog(h: &mut Harness) {
    h.catalog.add(ParamType::List, "AuthMethod", "None", "CHAP,None").expect("add");
    h.catalog.add(ParamType::Declarative, "CHAP_A", "", "5").expect("add");
    h.catalog.add(ParamType::Declarative, "CHAP_I", "", "").expect("add");
    h.catalog.add(ParamType::Declarative, "CHAP_C", "", "").expect("add");
    h.catalog.add(ParamType::Declarative, "CHAP_N", "", "").expect("add");
    h.catalog.add(ParamType::Declarative, "CHAP_R", "", "").expect("add");
    h.catalog.add(ParamType::Declarative, "AuthResult", "", "").expect("add");
}

#[test]
fn correct_response_is_accepted_and_recorded() {
    let mut h = Harness::new();
    h.rng = crate::scenarios::common::FixedRng { byte: 42, fill: 0xAB };
    h.credentials.insert("alice", b"secret".to_vec());
    seed_chap_catalog(&mut h);

    let step1 = h.parse(&[Token::Pair { key: "AuthMethod", value: "CHAP" }], false).expect("AuthMethod");
    assert_eq!(step1.answers, vec![("CHAP_A".to_string(), "5".to_string())]);

    let step2 = h.parse(&[Token::Pair { key: "CHAP_A", value: "5" }], false).expect("CHAP_A");
    assert_eq!(
        step2.answers,
        vec![
            ("CHAP_A".to_string(), "5".to_string()),
            ("CHAP_I".to_string(), "42".to_string()),
            ("CHAP_C".to_string(), "ab".repeat(16)),
        ]
    );

    let response_hex = calc_chap_response_hex(42, b"secret", &[0xAB; 16]);
    let step3 = h
        .parse(
            &[
                Token::Pair { key: "CHAP_N", value: "alice" },
                Token::Pair { key: "CHAP_R", value: &response_hex },
            ],
            false,
        )
        .expect("CHAP_N/CHAP_R");
    assert!(step3.answers.is_empty());

    assert_eq!(h.catalog.value("AuthResult", 0).expect("value"), "Yes");
}
