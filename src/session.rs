// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Owns one login session's catalog and CHAP state across the several
//! `parse()` calls a real login phase makes (Login(Security), Login
//! (Operational), possibly more than one PDU each).
//!
//! Grounded on the teacher's `state_machine/login/common.rs` `LoginCtx`,
//! which plays the same role of carrying state across steps; this
//! version drops the PDU/connection fields that belonged to the
//! transport layer this crate does not own.

use crate::{
    cfg::config::{AuthConfig, NegotiationConfig},
    credentials::{CredentialLookup, StaticCredentialStore},
    negotiation::{
        catalog::Catalog,
        chap::{ChapContext, RandomSource, ThreadRng},
        codec::{self, Token},
        engine::{self, NegotiationOutcome},
        error::Result,
        snapshot::{self, SessionParams},
    },
};

/// A single iSCSI login-phase negotiation in progress.
pub struct NegotiationSession {
    catalog: Catalog,
    chap: ChapContext,
    credentials: Box<dyn CredentialLookup + Send + Sync>,
    rng: Box<dyn RandomSource + Send + Sync>,
}

impl NegotiationSession {
    /// Builds a fresh session from a loaded config, seeding the catalog
    /// and wiring up credential lookup for CHAP per the config's
    /// `AuthConfig`.
    pub fn new(config: &NegotiationConfig) -> anyhow::Result<Self> {
        let catalog = config.seed_catalog()?;
        let (self_username, self_secret, credentials): (
            String,
            Vec<u8>,
            Box<dyn CredentialLookup + Send + Sync>,
        ) = match &config.auth {
            AuthConfig::None => (String::new(), Vec::new(), Box::new(StaticCredentialStore::new())),
            AuthConfig::Chap(chap) => {
                let mut store = StaticCredentialStore::new();
                store.insert(chap.username.clone(), chap.secret.clone().into_bytes());
                (chap.username.clone(), chap.secret.clone().into_bytes(), Box::new(store))
            },
        };
        Ok(Self {
            catalog,
            chap: ChapContext::new(self_username, self_secret),
            credentials,
            rng: Box::new(ThreadRng),
        })
    }

    /// Decodes and folds one incoming wire buffer into the catalog,
    /// returning the answers this side must send back.
    pub fn parse(&mut self, buf: &[u8]) -> Result<NegotiationOutcome> {
        let tokens: Vec<Token<'_>> = codec::decode(buf)?;
        engine::parse(
            &mut self.catalog,
            &mut self.chap,
            self.credentials.as_ref(),
            self.rng.as_mut(),
            &tokens,
            false,
        )
    }

    /// Folds a buffer the caller is about to send out, updating
    /// bookkeeping so a later peer reply is matched against the offer.
    pub fn record_outgoing(&mut self, buf: &[u8]) -> Result<NegotiationOutcome> {
        let tokens: Vec<Token<'_>> = codec::decode(buf)?;
        engine::parse(
            &mut self.catalog,
            &mut self.chap,
            self.credentials.as_ref(),
            self.rng.as_mut(),
            &tokens,
            true,
        )
    }

    /// Registers that we are sending `key` as an offer, so the peer's
    /// reply is routed through the negotiate path rather than re-answered.
    pub fn mark_offer_sent(&mut self, key: &str) -> Result<()> {
        engine::mark_offer_sent(&mut self.catalog, key)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn chap_mut(&mut self) -> &mut ChapContext {
        &mut self.chap
    }

    pub fn credentials(&self) -> &(dyn CredentialLookup + Send + Sync) {
        self.credentials.as_ref()
    }

    /// Extracts the operational parameters the data-transfer phase needs
    /// once negotiation has settled.
    pub fn snapshot(&self) -> Result<SessionParams> {
        snapshot::extract(&self.catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cfg::config::{CatalogSeed, ChapConfig, LoggerConfig},
        negotiation::types::ParamType,
    };

    fn test_config(auth: AuthConfig) -> NegotiationConfig {
        NegotiationConfig {
            auth,
            catalog_seed: vec![CatalogSeed {
                key: "MaxConnections".to_string(),
                param_type: ParamType::Numerical,
                default: "4".to_string(),
                valid: String::new(),
            }],
            logging: LoggerConfig::default(),
        }
    }

    #[test]
    fn new_session_seeds_catalog_from_config() {
        let cfg = test_config(AuthConfig::None);
        let session = NegotiationSession::new(&cfg).expect("new session");
        assert_eq!(session.catalog().value("MaxConnections", 0).expect("value"), "4");
    }

    #[test]
    fn chap_auth_config_seeds_credential_store() {
        let cfg = test_config(AuthConfig::Chap(ChapConfig {
            username: "alice".to_string(),
            secret: "hunter2".to_string(),
        }));
        let session = NegotiationSession::new(&cfg).expect("new session");
        assert_eq!(
            session.credentials().secret_for("alice"),
            Some(b"hunter2".to_vec())
        );
    }

    #[test]
    fn parse_answers_a_simple_offer() {
        let cfg = test_config(AuthConfig::None);
        let mut session = NegotiationSession::new(&cfg).expect("new session");
        let outcome = session.parse(b"MaxConnections=2\0").expect("parse");
        assert_eq!(outcome.answers, vec![("MaxConnections".to_string(), "2".to_string())]);
    }
}
