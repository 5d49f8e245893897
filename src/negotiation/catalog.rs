// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The ordered registry of recognized keys plus their per-session
//! negotiation state.
//!
//! Re-architected from `parameters.c`'s forward-linked `iscsi_parameter`
//! list (plus a second linked list per key for the value history) into a
//! contiguous `Vec<Parameter>`, each holding its own `Vec<String>` history.
//! Lookup stays linear: catalogs are bounded to a few dozen keys, so a scan
//! is both simpler and no slower than a hash map in practice.

use tracing::trace;

use crate::negotiation::{
    error::{NegotiationError, Result},
    types::ParamType,
};

/// One of the four roles a token can play while it is mid-flight through a
/// single `parse()` call. Exactly one is set at a time; all four are clear
/// at rest (see spec §3 invariants).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DirectionalFlags {
    pub tx_offer: bool,
    pub rx_offer: bool,
    pub tx_answer: bool,
    pub rx_answer: bool,
}

impl DirectionalFlags {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A single catalog entry: its static definition plus transient
/// negotiation slots that live for the session's duration.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub key: String,
    pub param_type: ParamType,
    pub default: String,
    pub valid: String,

    pub offer_tx: String,
    pub offer_rx: String,
    pub answer_tx: String,
    pub answer_rx: String,
    pub negotiated: String,

    pub flags: DirectionalFlags,
    pub reset: bool,

    history: Vec<String>,
}

impl Parameter {
    fn new(param_type: ParamType, key: &str, default: &str, valid: &str) -> Self {
        Self {
            key: key.to_string(),
            param_type,
            default: default.to_string(),
            valid: valid.to_string(),
            offer_tx: String::new(),
            offer_rx: String::new(),
            answer_tx: String::new(),
            answer_rx: String::new(),
            negotiated: String::new(),
            flags: DirectionalFlags::default(),
            reset: false,
            history: vec![default.to_string()],
        }
    }
}

/// The ordered registry of recognized keys for one login session.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    params: Vec<Parameter>,
}

impl Catalog {
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Appends a new parameter. Fails if a Binary type is given a `valid`
    /// outside the allowed eight strings (`param_list_add`'s `switch
    /// (type)` validation).
    pub fn add(
        &mut self,
        param_type: ParamType,
        key: &str,
        default: &str,
        valid: &str,
    ) -> Result<()> {
        param_type.validate_valid(key, valid)?;
        trace!(
            key,
            valid,
            default,
            current = default,
            "registered catalog parameter"
        );
        self.params.push(Parameter::new(param_type, key, default, valid));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<&Parameter> {
        self.params
            .iter()
            .find(|p| p.key == key)
            .ok_or_else(|| NegotiationError::UnknownCatalogKey(key.to_string()))
    }

    pub fn get_mut(&mut self, key: &str) -> Result<&mut Parameter> {
        self.params
            .iter_mut()
            .find(|p| p.key == key)
            .ok_or_else(|| NegotiationError::UnknownCatalogKey(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.iter().any(|p| p.key == key)
    }

    /// Iterates parameters in insertion order (part of the contract: debug
    /// dumps and printing depend on it).
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    /// Returns the `which`-th entry in `key`'s value history.
    pub fn value(&self, key: &str, which: usize) -> Result<&str> {
        let p = self.get(key)?;
        p.history
            .get(which)
            .map(String::as_str)
            .ok_or(NegotiationError::ValueIndexOutOfRange {
                key: key.to_string(),
                which,
            })
    }

    /// Parses the zeroth value as a non-negative decimal (lenient atoi).
    pub fn value_as_int(&self, key: &str) -> Result<u64> {
        let v = self.value(key, 0)?;
        Ok(crate::negotiation::types::lenient_atoi(v))
    }

    /// String-equality check against the zeroth value.
    pub fn value_equals(&self, key: &str, v: &str) -> Result<bool> {
        Ok(self.value(key, 0)? == v)
    }

    pub fn value_count(&self, key: &str) -> Result<usize> {
        Ok(self.get(key)?.history.len())
    }

    /// Marks `key` so its value history is cleared at the next successful
    /// commit.
    pub fn reset(&mut self, key: &str) -> Result<()> {
        self.get_mut(key)?.reset = true;
        Ok(())
    }

    /// Empties `key`'s value history immediately (used internally once a
    /// `reset` fires at commit time).
    pub fn delete_all_values(&mut self, key: &str) -> Result<()> {
        self.get_mut(key)?.history.clear();
        Ok(())
    }

    /// Overwrites (Declarative/Binary/Numerical/List) or appends
    /// (DeclareMulti) the committed value, honoring a pending `reset`.
    pub(crate) fn commit_value(&mut self, key: &str, value: &str) -> Result<()> {
        let p = self.get_mut(key)?;
        if p.reset {
            p.history.clear();
            p.reset = false;
        }
        if p.param_type == ParamType::DeclareMulti {
            p.history.push(value.to_string());
        } else if let Some(slot) = p.history.first_mut() {
            *slot = value.to_string();
        } else {
            p.history.push(value.to_string());
        }
        Ok(())
    }
}
