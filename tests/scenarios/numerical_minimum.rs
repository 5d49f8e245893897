// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Scenario: we offer `MaxBurstLength=262144`, the peer answers with a
//! smaller value; their answer is accepted as the negotiated result
//! without being re-minimized against our own ceiling a second time.

use iscsi_login_negotiator::negotiation::types::ParamType;

use crate::scenarios::common::{Harness, Token};

#[test]
fn peer_answer_becomes_the_negotiated_value() {
    let mut h = Harness::new();
    h.catalog.add(ParamType::Numerical, "MaxBurstLength", "262144", "262144").expect("add");

    let offer = [Token::Pair { key: "MaxBurstLength", value: "262144" }];
    h.parse(&offer, true).expect("record our outgoing offer");

    let answer = [Token::Pair { key: "MaxBurstLength", value: "65536" }];
    let outcome = h.parse(&answer, false).expect("fold peer's answer");

    assert!(outcome.answers.is_empty());
    assert_eq!(h.catalog.value("MaxBurstLength", 0).expect("value"), "65536");
}

#[test]
fn our_answer_to_peers_offer_is_the_minimum_of_both_sides() {
    let mut h = Harness::new();
    h.catalog.add(ParamType::Numerical, "MaxBurstLength", "262144", "262144").expect("add");

    let offer = [Token::Pair { key: "MaxBurstLength", value: "65536" }];
    let outcome = h.parse(&offer, false).expect("fold peer's offer");

    assert_eq!(outcome.answers, vec![("MaxBurstLength".to_string(), "65536".to_string())]);
    assert_eq!(h.catalog.value("MaxBurstLength", 0).expect("value"), "65536");
}
