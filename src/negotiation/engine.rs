// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The core negotiator: turns one decoded batch of tokens into a
//! committed catalog state plus the tokens we must answer with.
//!
//! Grounded line-by-line on `parameters.c`'s `param_text_parse`. The
//! original walks the buffer once, `goto`-ing between an `answer:` label
//! (we are the responder; compute and queue our reply) and a `negotiate:`
//! label (the value in hand is final; just commit it). That control flow
//! is rendered here as an explicit match on directional flags instead of
//! gotos.

use tracing::{trace, warn};

use crate::{
    credentials::CredentialLookup,
    negotiation::{
        catalog::{Catalog, DirectionalFlags},
        chap::{self, ChapContext, RandomSource, SecurityOutcome},
        codec::{Token, MAX_VALUE_LEN},
        error::{NegotiationError, Result},
        types::{canonical_binary, split_csv, ParamType},
    },
};

/// Inquiry sentinel value (`?`): request the current value without
/// changing it.
const INQUIRY: &str = "?";

/// The result of folding one incoming or outgoing text segment into the
/// catalog.
#[derive(Debug, Default, Clone)]
pub struct NegotiationOutcome {
    /// Tokens we must send back this round, in the order they were
    /// decided.
    pub answers: Vec<(String, String)>,
}

impl NegotiationOutcome {
    fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.answers.push((key.into(), value.into()));
    }

    fn extend(&mut self, pairs: Vec<(String, String)>) {
        self.answers.extend(pairs);
    }
}

/// Folds one batch of tokens into `catalog`.
///
/// `outgoing=false` means `tokens` was received from the peer and may
/// produce response text; `outgoing=true` means `tokens` is text the
/// caller is about to send, processed only to update bookkeeping (so a
/// later peer reply can be matched against the offer).
#[allow(clippy::too_many_arguments)]
pub fn parse(
    catalog: &mut Catalog,
    chap_ctx: &mut ChapContext,
    credentials: &dyn CredentialLookup,
    rng: &mut dyn RandomSource,
    tokens: &[Token<'_>],
    outgoing: bool,
) -> Result<NegotiationOutcome> {
    let mut outcome = NegotiationOutcome::default();

    for tok in tokens {
        let (key, value) = match tok {
            Token::Oversized { key } => {
                if outgoing {
                    trace!(key, "outgoing oversized key dropped");
                } else {
                    warn!(key, "oversized key, answering NotUnderstood");
                    outcome.push(*key, "NotUnderstood");
                }
                continue;
            },
            Token::Pair { key, value } => (*key, *value),
        };

        if !catalog.contains(key) {
            if outgoing {
                trace!(key, "outgoing unknown key dropped");
            } else {
                trace!(key, "unrecognized key, answering NotUnderstood");
                outcome.push(key, "NotUnderstood");
            }
            continue;
        }

        if value.len() + 1 > MAX_VALUE_LEN {
            return Err(NegotiationError::ValueTooLong {
                key: key.to_string(),
                len: value.len(),
                max: MAX_VALUE_LEN,
            });
        }

        if chap::is_chap_key(key) {
            fold_chap_key(catalog, chap_ctx, credentials, rng, key, value, outgoing, &mut outcome)?;
            continue;
        }

        fold_ordinary_key(catalog, key, value, outgoing, &mut outcome)?;
    }

    Ok(outcome)
}

fn fold_chap_key(
    catalog: &mut Catalog,
    chap_ctx: &mut ChapContext,
    credentials: &dyn CredentialLookup,
    rng: &mut dyn RandomSource,
    key: &str,
    value: &str,
    outgoing: bool,
    outcome: &mut NegotiationOutcome,
) -> Result<()> {
    let incoming_offer = !outgoing && !catalog.get(key)?.flags.tx_offer;

    // The sub-negotiator owns its own transient progress (identifier,
    // challenge, peer credentials); the catalog's directional flags on a
    // CHAP key only ever mark "we are mid-exchange on this key", and are
    // cleared once this step concludes, matching the at-rest invariant
    // that all four flags are false outside an in-flight token.
    match chap_ctx.step(key, value, incoming_offer, credentials, rng, catalog) {
        Ok(SecurityOutcome::Done) => {
            // `AuthMethod=None` concludes the sub-negotiator's own part of
            // the exchange, but `AuthMethod` is still an ordinary `List`
            // key underneath: the offer/answer cycle for it has to run its
            // normal course (so the peer's offer gets answered/committed)
            // rather than leaving the key's flags dangling mid-flight.
            return fold_ordinary_key(catalog, key, value, outgoing, outcome);
        },
        Ok(SecurityOutcome::InProgress) => {
            catalog.get_mut(key)?.flags.clear();
            outcome.extend(chap_ctx.take_queued());
        },
        Err(err) => return Err(err),
    }
    Ok(())
}

fn fold_ordinary_key(
    catalog: &mut Catalog,
    key: &str,
    value: &str,
    outgoing: bool,
    outcome: &mut NegotiationOutcome,
) -> Result<()> {
    let param_type = catalog.get(key)?.param_type;
    let had_prior_offer = catalog.get(key)?.flags.rx_offer || catalog.get(key)?.flags.tx_offer;

    if outgoing {
        if had_prior_offer {
            catalog.get_mut(key)?.answer_tx = value.to_string();
            commit(catalog, key, param_type, value, true, false)?;
        } else {
            let p = catalog.get_mut(key)?;
            p.flags.clear();
            p.flags.tx_offer = true;
            p.offer_tx = value.to_string();
            if param_type.is_declarative() {
                commit(catalog, key, param_type, value, true, true)?;
            }
        }
        return Ok(());
    }

    // Incoming.
    if catalog.get(key)?.flags.tx_offer {
        // Peer's answer to our earlier offer.
        catalog.get_mut(key)?.answer_rx = value.to_string();
        commit(catalog, key, param_type, value, false, false)?;
        return Ok(());
    }

    // Peer's offer.
    {
        let p = catalog.get_mut(key)?;
        p.flags.clear();
        p.flags.rx_offer = true;
        p.offer_rx = value.to_string();
    }

    if value != INQUIRY && param_type.is_declarative() {
        commit(catalog, key, param_type, value, false, true)?;
        return Ok(());
    }

    answer_offer(catalog, key, param_type, value, outcome)
}

/// Computes and queues our answer to an offer the peer just sent.
fn answer_offer(
    catalog: &mut Catalog,
    key: &str,
    param_type: ParamType,
    value: &str,
    outcome: &mut NegotiationOutcome,
) -> Result<()> {
    if value == INQUIRY {
        let current = catalog.value(key, 0).unwrap_or("").to_string();
        outcome.push(key, current);
        // Inquiry never commits a new value, but the exchange is still
        // fully resolved the moment we answer it, so the flags set by the
        // caller on the way in return to rest here too.
        catalog.get_mut(key)?.flags.clear();
        return Ok(());
    }

    let decided = match param_type {
        ParamType::BinaryOr | ParamType::BinaryAnd => binary_answer(catalog, key, value)?,
        ParamType::Numerical => numerical_answer(catalog, key, value, false)?,
        ParamType::NumericalZ => numerical_answer(catalog, key, value, true)?,
        ParamType::List => list_answer(catalog, key, value)?,
        ParamType::Declarative | ParamType::DeclareMulti => unreachable!("routed to negotiate directly"),
    };

    catalog.get_mut(key)?.answer_tx = decided.clone();
    commit(catalog, key, param_type, &decided, false, true)?;
    outcome.push(key, decided);
    Ok(())
}

fn binary_answer(catalog: &Catalog, key: &str, peer_offer: &str) -> Result<String> {
    if canonical_binary(peer_offer).is_none() {
        warn!(key, peer_offer, "invalid binary offer, answering Reject");
        return Ok("Reject".to_string());
    }
    let valid = catalog.get(key)?.valid.clone();
    let choices = split_csv(&valid);
    let decided = if choices.len() > 1 {
        peer_offer.to_string()
    } else {
        choices.first().copied().unwrap_or("No").to_string()
    };
    Ok(decided)
}

fn numerical_answer(catalog: &Catalog, key: &str, peer_offer: &str, zero_is_unlimited: bool) -> Result<String> {
    let our_max = catalog.get(key)?.valid.clone();
    let our_max = if our_max.is_empty() {
        catalog.get(key)?.default.clone()
    } else {
        our_max
    };
    let peer_n = crate::negotiation::types::lenient_atoi(peer_offer);
    let our_n = crate::negotiation::types::lenient_atoi(&our_max);
    let chosen = if zero_is_unlimited {
        match (our_n, peer_n) {
            (0, p) => p,
            (o, 0) => o,
            (o, p) => o.min(p),
        }
    } else {
        our_n.min(peer_n)
    };
    Ok(chosen.to_string())
}

fn list_answer(catalog: &Catalog, key: &str, peer_offer: &str) -> Result<String> {
    let p = catalog.get(key)?;
    let valid = p.valid.clone();
    let default = p.default.clone();
    let ours = split_csv(&valid);
    let offered = split_csv(peer_offer);

    if !default.is_empty() && offered.contains(&default.as_str()) {
        return Ok(default);
    }
    if ours.is_empty() {
        return offered
            .first()
            .map(|s| s.to_string())
            .ok_or_else(|| NegotiationError::EmptyValidList(key.to_string()));
    }
    for candidate in offered {
        if ours.contains(&candidate) {
            return Ok(candidate.to_string());
        }
    }
    warn!(key, peer_offer, "no list intersection, answering Reject");
    Ok("Reject".to_string())
}

/// Recomputes `negotiated` for a Binary key from both recorded directional
/// slots (spec §5/§8: `OR`/`AND` over the two sides, not the wire answer we
/// happened to emit — a single-choice `valid` means our answer always
/// echoes that one choice regardless of what the peer offered, so the
/// answer string alone is not the negotiated result).
fn binary_negotiated(catalog: &Catalog, key: &str, param_type: ParamType) -> Result<String> {
    let p = catalog.get(key)?;
    let (a, b) = if !p.offer_rx.is_empty() || !p.answer_tx.is_empty() {
        (p.offer_rx.as_str(), p.answer_tx.as_str())
    } else {
        (p.offer_tx.as_str(), p.answer_rx.as_str())
    };
    let a_yes = canonical_binary(a) == Some("Yes");
    let b_yes = canonical_binary(b) == Some("Yes");
    let yes = match param_type {
        ParamType::BinaryOr => a_yes || b_yes,
        ParamType::BinaryAnd => a_yes && b_yes,
        _ => unreachable!("binary_negotiated only called for Binary types"),
    };
    Ok(if yes { "Yes".to_string() } else { "No".to_string() })
}

/// Commits `value` as the negotiated result for `key`, honoring the
/// `List` sentinel set and skipping history updates for inquiries.
fn commit(
    catalog: &mut Catalog,
    key: &str,
    param_type: ParamType,
    value: &str,
    outgoing: bool,
    is_final: bool,
) -> Result<()> {
    let recomputed;
    let value = if (param_type == ParamType::BinaryOr || param_type == ParamType::BinaryAnd)
        && value != "Irrelevant"
        && value != "Reject"
    {
        recomputed = binary_negotiated(catalog, key, param_type)?;
        recomputed.as_str()
    } else {
        value
    };

    if param_type == ParamType::List {
        const SENTINELS: [&str; 4] = ["None", "Reject", "Irrelevant", "NotUnderstood"];
        let valid = catalog.get(key)?.valid.clone();
        let choices = split_csv(&valid);
        if !choices.contains(&value) && !SENTINELS.contains(&value) {
            return Err(NegotiationError::InvalidListValue {
                key: key.to_string(),
                value: value.to_string(),
                valid,
            });
        }
    }
    if (param_type == ParamType::BinaryOr || param_type == ParamType::BinaryAnd)
        && canonical_binary(value).is_none()
        && value != "Irrelevant"
        && value != "Reject"
    {
        return Err(NegotiationError::InvalidBinaryValue {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    catalog.commit_value(key, value)?;
    let p = catalog.get_mut(key)?;
    p.negotiated = value.to_string();
    // A commit always concludes this key's negotiation cycle for the
    // token in hand: declarative values commit immediately, offers we
    // answer commit as soon as we decide, and a peer's answer to our own
    // earlier offer commits it too. None of these leave anything
    // in-flight, so all four directional flags return to rest here.
    p.flags.clear();
    trace!(key, value, outgoing, is_final, "committed value");
    Ok(())
}

/// Registers an outgoing offer directly, bypassing `parse`: used by a
/// login driver that wants to record what it is about to send before
/// actually encoding it.
pub fn mark_offer_sent(catalog: &mut Catalog, key: &str) -> Result<()> {
    let p = catalog.get_mut(key)?;
    p.flags.clear();
    p.flags.tx_offer = true;
    Ok(())
}
