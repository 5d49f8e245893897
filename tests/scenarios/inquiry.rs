// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Scenario: an incoming `?` requests the current value of a key without
//! ever changing its history.

use iscsi_login_negotiator::negotiation::types::ParamType;

use crate::scenarios::common::{Harness, Token};

#[test]
fn inquiry_echoes_current_value_without_committing() {
    let mut h = Harness::new();
    h.catalog
        .add(ParamType::Declarative, "TargetName", "iqn.1994-04.org.netbsd.iscsi-target", "")
        .expect("add");

    let toks = [Token::Pair { key: "TargetName", value: "?" }];
    let outcome = h.parse(&toks, false).expect("fold inquiry");

    assert_eq!(
        outcome.answers,
        vec![("TargetName".to_string(), "iqn.1994-04.org.netbsd.iscsi-target".to_string())]
    );
    assert_eq!(h.catalog.value_count("TargetName").expect("count"), 1);
    assert_eq!(
        h.catalog.get("TargetName").expect("get").flags,
        iscsi_login_negotiator::negotiation::catalog::DirectionalFlags::default()
    );
}
