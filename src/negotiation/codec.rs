// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Wire codec for the packed `key=value\0` text buffers exchanged during
//! the login phase.
//!
//! Grounded on `parameters.c`'s `param_text_parse` token-scanning loop
//! (walks the buffer splitting on NUL, skipping runs of NULs between
//! tokens) and `param_text_add` for the inverse direction, with the
//! split-on-NUL style itself taken from the teacher's
//! `parse_login_text_map`.

use tracing::warn;

use crate::negotiation::error::{NegotiationError, Result};

/// Maximum length of a key, NUL included.
pub const MAX_KEY_LEN: usize = 64;
/// Maximum length of a value, NUL included.
pub const MAX_VALUE_LEN: usize = 256;
/// Maximum length of one key=value\0 token.
pub const MAX_TOKEN_LEN: usize = 8192;

/// One decoded token: either a well-formed `key=value` pair or a key too
/// long to parse at all (folded into a `NotUnderstood` answer by the
/// negotiator; see spec §4.2). Value-length enforcement happens one layer
/// up, in the negotiator's length guard, since an over-length value on an
/// otherwise-parseable key is a fatal protocol error rather than an
/// unknown-key condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Pair { key: &'a str, value: &'a str },
    Oversized { key: &'a str },
}

/// Splits a packed `key=value\0key=value\0...` buffer into tokens.
///
/// Runs of NUL bytes between tokens are skipped, matching the original's
/// tolerance for padding. A token lacking `=` is rejected outright: unlike
/// an oversized key, a missing delimiter means the buffer itself is not
/// well-formed text-parameter data.
pub fn decode(buf: &[u8]) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut start = 0usize;
    while start < buf.len() {
        if buf[start] == 0 {
            start += 1;
            continue;
        }
        let end = buf[start..]
            .iter()
            .position(|&b| b == 0)
            .map(|p| start + p)
            .unwrap_or(buf.len());
        let raw = &buf[start..end];
        if raw.len() > MAX_TOKEN_LEN {
            return Err(NegotiationError::ValueTooLong {
                key: "<token>".to_string(),
                len: raw.len(),
                max: MAX_TOKEN_LEN,
            });
        }
        let text = std::str::from_utf8(raw)
            .map_err(|_| NegotiationError::MissingDelimiter(String::from_utf8_lossy(raw).into_owned()))?;
        let eq = text
            .find('=')
            .ok_or_else(|| NegotiationError::MissingDelimiter(text.to_string()))?;
        let key = &text[..eq];
        let value = &text[eq + 1..];
        if key.len() + 1 > MAX_KEY_LEN {
            warn!(key, len = key.len(), "oversized key, not parsed");
            tokens.push(Token::Oversized { key });
        } else {
            tokens.push(Token::Pair { key, value });
        }
        start = end + 1;
    }
    Ok(tokens)
}

/// Appends one `key=value\0` token to `out`, failing if doing so would
/// exceed `out`'s remaining capacity (mirrors `param_text_add`'s
/// length-checked append into a fixed-size PDU data segment).
pub fn encode(out: &mut Vec<u8>, key: &str, value: &str, max_total: usize) -> Result<()> {
    let need = key.len() + 1 + value.len() + 1;
    if out.len() + need > max_total {
        return Err(NegotiationError::BufferTooSmall {
            need: out.len() + need,
            have: max_total,
        });
    }
    out.extend_from_slice(key.as_bytes());
    out.push(b'=');
    out.extend_from_slice(value.as_bytes());
    out.push(0);
    Ok(())
}
