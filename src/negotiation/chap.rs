// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! CHAP security sub-negotiator.
//!
//! Invoked by the negotiator for every key in the `AuthMethod`/`CHAP_A`/
//! `CHAP_I`/`CHAP_C`/`CHAP_N`/`CHAP_R` family. Grounded on `parameters.c`'s
//! `param_parse_security`, described there from the target's perspective
//! (receiving an initiator's challenge-response); this implementation
//! keeps that bias; a login driver acting as the challenged party drives
//! the symmetric half of the exchange through the same key set, one step
//! behind. Hex encoding is lowercase with no `0x` prefix (the base wire
//! convention), unlike the teacher's own uppercase `0x`-prefixed
//! `calc_chap_r_hex` — this engine must interoperate symmetrically rather
//! than match only the teacher's own wire quirks (see `DESIGN.md`).

use md5::{Digest, Md5};
use rand::Rng;
use tracing::{trace, warn};

use crate::{
    credentials::CredentialLookup,
    negotiation::{
        catalog::Catalog,
        error::{NegotiationError, Result},
    },
};

/// Length in bytes of the CHAP challenge (`ISCSI_CHAP_DATA_LENGTH`): one
/// MD5 digest's worth.
pub const CHAP_DATA_LENGTH: usize = 16;

/// Result of folding one key into the CHAP sub-negotiator. A failed
/// exchange is reported as `Err(NegotiationError::AuthFailed)` rather than
/// as a third variant here, so the caller cannot forget to propagate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityOutcome {
    /// Authentication concluded for this key; fall through to normal
    /// negotiation (used for `AuthMethod=None`).
    Done,
    /// The sub-negotiator queued outgoing text of its own; the caller
    /// must skip the normal answer path for this key.
    InProgress,
}

/// Returns whether `key` belongs to the CHAP key family the sub-negotiator
/// owns.
pub fn is_chap_key(key: &str) -> bool {
    matches!(key, "AuthMethod" | "CHAP_A" | "CHAP_I" | "CHAP_C" | "CHAP_N" | "CHAP_R")
}

/// Source of random bytes injected into [`ChapContext`], so tests can
/// supply deterministic challenges/identifiers without touching a real
/// RNG.
pub trait RandomSource {
    fn next_byte(&mut self) -> u8;
    fn fill_bytes(&mut self, buf: &mut [u8]);
}

/// Production [`RandomSource`] backed by `rand`'s thread-local generator.
#[derive(Debug, Default)]
pub struct ThreadRng;

impl RandomSource for ThreadRng {
    fn next_byte(&mut self) -> u8 {
        rand::rng().random::<u8>()
    }

    fn fill_bytes(&mut self, buf: &mut [u8]) {
        rand::rng().fill(buf);
    }
}

/// Transient CHAP state for one login exchange: identifier, challenge,
/// the peer's claimed username, and our own credentials for when we are
/// the one proving knowledge of a secret.
#[derive(Debug)]
pub struct ChapContext {
    self_username: String,
    self_secret: Vec<u8>,
    identifier: Option<u8>,
    challenge: Option<Vec<u8>>,
    peer_username: Option<String>,
    peer_secret: Option<Vec<u8>>,
    queued: Vec<(String, String)>,
}

impl ChapContext {
    pub fn new(self_username: impl Into<String>, self_secret: Vec<u8>) -> Self {
        Self {
            self_username: self_username.into(),
            self_secret,
            identifier: None,
            challenge: None,
            peer_username: None,
            peer_secret: None,
            queued: Vec::new(),
        }
    }

    /// Drains and returns any outgoing tokens queued by the most recent
    /// `step` call.
    pub fn take_queued(&mut self) -> Vec<(String, String)> {
        std::mem::take(&mut self.queued)
    }

    fn queue(&mut self, key: &str, value: impl Into<String>) {
        self.queued.push((key.to_string(), value.into()));
    }

    /// Sets `AuthResult`'s zeroth value when the catalog carries that key;
    /// this is the surface through which the login driver learns the
    /// verdict.
    fn record_auth_result(catalog: &mut Catalog, value: &str) {
        if catalog.contains("AuthResult") {
            let _ = catalog.commit_value("AuthResult", value);
        }
    }

    /// Folds one CHAP-family key into the sub-negotiator.
    pub fn step(
        &mut self,
        key: &str,
        value: &str,
        incoming_offer: bool,
        credentials: &dyn CredentialLookup,
        rng: &mut dyn RandomSource,
        catalog: &mut Catalog,
    ) -> Result<SecurityOutcome> {
        match key {
            "AuthMethod" => self.on_auth_method(value, incoming_offer, catalog),
            "CHAP_A" => self.on_chap_a(value, incoming_offer, rng),
            "CHAP_I" => self.on_chap_i(value),
            "CHAP_C" => self.on_chap_c(value, incoming_offer, credentials, rng),
            "CHAP_N" => self.on_chap_n(value, credentials),
            "CHAP_R" => self.on_chap_r(value, catalog),
            _ => unreachable!("step() only called for is_chap_key keys"),
        }
    }

    fn on_auth_method(&mut self, value: &str, incoming_offer: bool, catalog: &mut Catalog) -> Result<SecurityOutcome> {
        if value == "None" {
            trace!("AuthMethod=None, auth bypassed");
            return Ok(SecurityOutcome::Done);
        }
        if incoming_offer {
            let supported = catalog
                .get("CHAP_A")
                .map(|p| p.valid.clone())
                .unwrap_or_else(|_| "5".to_string());
            self.queue("CHAP_A", supported);
            return Ok(SecurityOutcome::InProgress);
        }
        Ok(SecurityOutcome::InProgress)
    }

    fn on_chap_a(&mut self, offered: &str, incoming_offer: bool, rng: &mut dyn RandomSource) -> Result<SecurityOutcome> {
        if !incoming_offer {
            return Ok(SecurityOutcome::InProgress);
        }
        if !crate::negotiation::types::split_csv(offered).contains(&"5") {
            warn!(offered, "peer offered no supported CHAP algorithm");
            return Err(NegotiationError::AuthFailed(
                "no mutually supported CHAP algorithm".to_string(),
            ));
        }
        self.queue("CHAP_A", "5");

        let identifier = rng.next_byte();
        self.identifier = Some(identifier);
        self.queue("CHAP_I", identifier.to_string());

        let mut challenge = vec![0u8; CHAP_DATA_LENGTH];
        rng.fill_bytes(&mut challenge);
        let hex_challenge = hex::encode(&challenge);
        self.challenge = Some(challenge);
        self.queue("CHAP_C", hex_challenge);

        Ok(SecurityOutcome::InProgress)
    }

    fn on_chap_i(&mut self, value: &str) -> Result<SecurityOutcome> {
        // Strict decimal parse: unlike the lenient value parsing used for
        // generic numerical keys, a peer that cannot send a clean byte
        // here is malformed rather than truncated (see DESIGN.md).
        let identifier: u8 = value
            .parse()
            .map_err(|_| NegotiationError::AuthFailed(format!("malformed CHAP_I value \"{value}\"")))?;
        self.identifier = Some(identifier);
        Ok(SecurityOutcome::InProgress)
    }

    fn on_chap_c(
        &mut self,
        hex_value: &str,
        incoming_offer: bool,
        credentials: &dyn CredentialLookup,
        rng: &mut dyn RandomSource,
    ) -> Result<SecurityOutcome> {
        let challenge = hex::decode(hex_value)
            .map_err(|_| NegotiationError::AuthFailed(format!("malformed CHAP_C value \"{hex_value}\"")))?;

        let identifier = self
            .identifier
            .ok_or_else(|| NegotiationError::AuthFailed("CHAP_C received before CHAP_I".to_string()))?;
        let secret = credentials
            .secret_for(&self.self_username)
            .ok_or_else(|| NegotiationError::AuthFailed(format!("no credentials for \"{}\"", self.self_username)))?;

        self.queue("CHAP_N", self.self_username.clone());
        let response_hex = calc_chap_response_hex(identifier, &secret, &challenge);
        self.queue("CHAP_R", response_hex);

        if incoming_offer {
            // Mutual authentication: challenge the peer back in the same
            // exchange, with our own fresh identifier and challenge (the
            // ones above belong to the peer's challenge to us).
            let reverse_identifier: u8 = identifier.wrapping_add(1);
            self.identifier = Some(reverse_identifier);
            self.queue("CHAP_I", reverse_identifier.to_string());

            let mut reverse_challenge = vec![0u8; CHAP_DATA_LENGTH];
            rng.fill_bytes(&mut reverse_challenge);
            let hex_reverse_challenge = hex::encode(&reverse_challenge);
            self.challenge = Some(reverse_challenge);
            self.queue("CHAP_C", hex_reverse_challenge);
        } else {
            self.challenge = Some(challenge);
        }

        Ok(SecurityOutcome::InProgress)
    }

    fn on_chap_n(&mut self, username: &str, credentials: &dyn CredentialLookup) -> Result<SecurityOutcome> {
        let secret = credentials.secret_for(username).ok_or_else(|| {
            warn!(username, "CHAP_N for unknown user");
            NegotiationError::AuthFailed(format!("no credentials for \"{username}\""))
        })?;
        self.peer_username = Some(username.to_string());
        self.peer_secret = Some(secret);
        Ok(SecurityOutcome::InProgress)
    }

    fn on_chap_r(&mut self, received_hex: &str, catalog: &mut Catalog) -> Result<SecurityOutcome> {
        let identifier = self
            .identifier
            .ok_or_else(|| NegotiationError::AuthFailed("CHAP_R received before CHAP_I".to_string()))?;
        let challenge = self
            .challenge
            .clone()
            .ok_or_else(|| NegotiationError::AuthFailed("CHAP_R received before CHAP_C".to_string()))?;
        let secret = self
            .peer_secret
            .clone()
            .ok_or_else(|| NegotiationError::AuthFailed("CHAP_R received before CHAP_N".to_string()))?;

        let expected_hex = calc_chap_response_hex(identifier, &secret, &challenge);
        if received_hex.eq_ignore_ascii_case(&expected_hex) {
            trace!("CHAP response verified");
            Self::record_auth_result(catalog, "Yes");
            Ok(SecurityOutcome::Done)
        } else {
            warn!("CHAP response mismatch");
            Self::record_auth_result(catalog, "Fail");
            Err(NegotiationError::AuthFailed("CHAP response mismatch".to_string()))
        }
    }
}

/// `response = MD5(identifier_byte || secret || challenge)`, lowercase hex.
pub fn calc_chap_response_hex(identifier: u8, secret: &[u8], challenge: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update([identifier]);
    hasher.update(secret);
    hasher.update(challenge);
    hex::encode(hasher.finalize())
}
