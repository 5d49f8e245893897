// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use iscsi_login_negotiator::{
    credentials::StaticCredentialStore,
    negotiation::{catalog::Catalog, chap::ChapContext},
};
pub use iscsi_login_negotiator::negotiation::{
    chap::RandomSource,
    codec::Token,
    engine,
};

/// A deterministic [`RandomSource`] so CHAP identifier/challenge bytes are
/// reproducible across test runs.
pub struct FixedRng {
    pub byte: u8,
    pub fill: u8,
}

impl RandomSource for FixedRng {
    fn next_byte(&mut self) -> u8 {
        self.byte
    }

    fn fill_bytes(&mut self, buf: &mut [u8]) {
        buf.fill(self.fill);
    }
}

/// Bundles the pieces `engine::parse` needs, mirroring
/// `NegotiationSession`'s own fields but with every collaborator swapped
/// for a test double under the caller's control.
pub struct Harness {
    pub catalog: Catalog,
    pub chap: ChapContext,
    pub credentials: StaticCredentialStore,
    pub rng: FixedRng,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            catalog: Catalog::new(),
            chap: ChapContext::new("target", b"unused".to_vec()),
            credentials: StaticCredentialStore::new(),
            rng: FixedRng { byte: 0, fill: 0 },
        }
    }

    pub fn parse(&mut self, tokens: &[Token<'_>], outgoing: bool) -> iscsi_login_negotiator::negotiation::Result<engine::NegotiationOutcome> {
        engine::parse(
            &mut self.catalog,
            &mut self.chap,
            &self.credentials,
            &mut self.rng,
            tokens,
            outgoing,
        )
    }
}
