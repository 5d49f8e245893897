// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The two structural invariants from the spec's testable-properties
//! section that are not tied to any one parameter type: the codec's
//! round trip, and `parse`'s idempotence on empty input.

use iscsi_login_negotiator::negotiation::{codec, types::ParamType};

use crate::scenarios::common::{Harness, Token};

#[test]
fn decode_of_encode_preserves_pairs() {
    let pairs = [
        ("SessionType", "Normal"),
        ("InitiatorName", "iqn.1994-04.org.netbsd.initiator"),
        ("MaxConnections", "1"),
    ];
    let mut buf = Vec::new();
    for (key, value) in pairs {
        codec::encode(&mut buf, key, value, codec::MAX_TOKEN_LEN).expect("encode");
    }
    let decoded = codec::decode(&buf).expect("decode");
    let expected: Vec<Token<'_>> = pairs.iter().map(|(key, value)| Token::Pair { key, value }).collect();
    assert_eq!(decoded, expected);
}

#[test]
fn parsing_empty_input_is_a_no_op() {
    let mut h = Harness::new();
    h.catalog.add(ParamType::Declarative, "TargetName", "iqn.example", "").expect("add");

    let outcome = h.parse(&[], false).expect("parse empty");

    assert!(outcome.answers.is_empty());
    assert_eq!(h.catalog.value("TargetName", 0).expect("value"), "iqn.example");
    assert_eq!(h.catalog.value_count("TargetName").expect("count"), 1);
}
