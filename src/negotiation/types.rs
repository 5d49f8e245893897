// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Parameter type tags and the `valid` field syntax that goes with each.
//!
//! Mirrors `ISCSI_PARAM_TYPE_*` from the original `parameters.c`/
//! `parameters.h`, rendered as a Rust enum instead of an integer constant.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::negotiation::error::{NegotiationError, Result};

/// The eight `valid` strings a `BinaryOr`/`BinaryAnd` key may declare.
const BINARY_VALID_SET: [&str; 8] = [
    "Yes", "No", "Yes,No", "No,Yes", "yes", "no", "yes,no", "no,yes",
];

/// The negotiation behavior associated with a catalog key.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Announced, not negotiated; the sender's value wins outright.
    Declarative,
    /// Like `Declarative`, but may be declared repeatedly, building a list.
    DeclareMulti,
    /// Negotiated value is `Yes` iff either side offered `Yes`.
    BinaryOr,
    /// Negotiated value is `Yes` iff both sides offered `Yes`.
    BinaryAnd,
    /// Negotiated value is `min(peer, ours)`.
    Numerical,
    /// Like `Numerical`, but `0` means "unlimited" on either side.
    NumericalZ,
    /// Negotiated value must come from a comma-separated enumeration.
    List,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParamType::Declarative => "Declarative",
            ParamType::DeclareMulti => "DeclareMulti",
            ParamType::BinaryOr => "BinaryOr",
            ParamType::BinaryAnd => "BinaryAnd",
            ParamType::Numerical => "Numerical",
            ParamType::NumericalZ => "NumericalZ",
            ParamType::List => "List",
        })
    }
}

impl ParamType {
    /// Whether this type commits through the declarative path (the send or
    /// receive itself is the commit, no answer is generated).
    pub fn is_declarative(self) -> bool {
        matches!(self, ParamType::Declarative | ParamType::DeclareMulti)
    }

    /// Checks that `valid` is well-formed for this type, per
    /// `param_list_add`'s `switch (type)` validation.
    pub fn validate_valid(self, key: &str, valid: &str) -> Result<()> {
        match self {
            ParamType::BinaryOr | ParamType::BinaryAnd => {
                if BINARY_VALID_SET.contains(&valid) {
                    Ok(())
                } else {
                    Err(NegotiationError::BadBinaryValid {
                        key: key.to_string(),
                        valid: valid.to_string(),
                    })
                }
            },
            _ => Ok(()),
        }
    }
}

/// Parses a non-negative decimal prefix of `s`, stopping at the first
/// non-digit character (lenient atoi semantics matching the wire protocol;
/// see spec Design Notes on `driver_atoi`).
pub fn lenient_atoi(s: &str) -> u64 {
    let mut acc: u64 = 0;
    for c in s.chars() {
        match c.to_digit(10) {
            Some(d) => acc = acc.saturating_mul(10).saturating_add(d as u64),
            None => break,
        }
    }
    acc
}

/// Splits a comma-separated enumeration, preserving empty input as no
/// elements.
pub fn split_csv(s: &str) -> Vec<&str> {
    if s.is_empty() {
        Vec::new()
    } else {
        s.split(',').collect()
    }
}

/// Canonicalizes a loosely-cased binary wire value (`yes`/`Yes`/`no`/`No`)
/// into one of `Yes`/`No`. Returns `None` for anything else.
pub fn canonical_binary(value: &str) -> Option<&'static str> {
    match value {
        "Yes" | "yes" => Some("Yes"),
        "No" | "no" => Some("No"),
        _ => None,
    }
}
