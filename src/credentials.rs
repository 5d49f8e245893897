// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Credential lookup for CHAP authentication.
//!
//! `parameters.c`'s `find_credentials` is a stub that always returns
//! failure, with a comment noting the real lookup is the caller's
//! responsibility. This crate does not replicate that stub: it defines
//! the lookup as a trait so a real login driver can back it with
//! whatever store it has (a config file, a database, an external
//! service), and ships a minimal in-memory implementation for tests and
//! small deployments.

use std::collections::HashMap;

/// Resolves a CHAP username to its shared secret.
pub trait CredentialLookup {
    /// Returns the shared secret for `name`, or `None` if unknown.
    fn secret_for(&self, name: &str) -> Option<Vec<u8>>;
}

/// An in-memory [`CredentialLookup`] backed by a `HashMap`.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentialStore {
    secrets: HashMap<String, Vec<u8>>,
}

impl StaticCredentialStore {
    pub fn new() -> Self {
        Self { secrets: HashMap::new() }
    }

    pub fn insert(&mut self, name: impl Into<String>, secret: Vec<u8>) {
        self.secrets.insert(name.into(), secret);
    }
}

impl CredentialLookup for StaticCredentialStore {
    fn secret_for(&self, name: &str) -> Option<Vec<u8>> {
        self.secrets.get(name).cloned()
    }
}
