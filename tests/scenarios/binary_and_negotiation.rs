// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Scenario: we have already offered `HeaderDigest=Yes` outgoing; the
//! peer's incoming `HeaderDigest=Yes` is their answer to that offer, not a
//! fresh offer of their own, so it commits directly with no reply queued.

use iscsi_login_negotiator::negotiation::types::ParamType;

use crate::scenarios::common::{Harness, Token};

#[test]
fn commits_peers_answer_to_our_own_offer() {
    let mut h = Harness::new();
    h.catalog.add(ParamType::BinaryOr, "HeaderDigest", "No", "Yes,No").expect("add");

    let offer = [Token::Pair { key: "HeaderDigest", value: "Yes" }];
    h.parse(&offer, true).expect("record our outgoing offer");

    let answer = [Token::Pair { key: "HeaderDigest", value: "Yes" }];
    let outcome = h.parse(&answer, false).expect("fold peer's answer");

    assert!(outcome.answers.is_empty());
    assert_eq!(h.catalog.value("HeaderDigest", 0).expect("value"), "Yes");
    assert_eq!(h.catalog.value_count("HeaderDigest").expect("count"), 1);
}
