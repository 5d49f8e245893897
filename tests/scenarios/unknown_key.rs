// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Scenario: a key the catalog never registered folds to a
//! `NotUnderstood` answer, `key=NotUnderstood`, rather than aborting the
//! whole batch.

use crate::scenarios::common::{Harness, Token};

#[test]
fn unregistered_key_answers_not_understood() {
    let mut h = Harness::new();

    let toks = [Token::Pair { key: "X-Vendor-Foo", value: "1" }];
    let outcome = h.parse(&toks, false).expect("fold unknown key");

    assert_eq!(
        outcome.answers,
        vec![("X-Vendor-Foo".to_string(), "NotUnderstood".to_string())]
    );
}

#[test]
fn outgoing_unknown_key_is_silently_dropped() {
    let mut h = Harness::new();

    let toks = [Token::Pair { key: "X-Vendor-Foo", value: "1" }];
    let outcome = h.parse(&toks, true).expect("fold outgoing unknown key");

    assert!(outcome.answers.is_empty());
}
