// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

/// Failure modes of the negotiation engine.
///
/// `AuthFailed` is the one variant a login driver is expected to branch on
/// directly (it maps to the `AuthResult=Fail` outcome); every other variant
/// is a fatal protocol error that should abort the login.
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("key \"{0}\" not found in catalog")]
    UnknownCatalogKey(String),

    #[error("value index {which} for key \"{key}\" is past the end of the history")]
    ValueIndexOutOfRange { key: String, which: usize },

    #[error("bad valid field \"{valid}\" for binary key \"{key}\"")]
    BadBinaryValid { key: String, valid: String },

    #[error("token \"{0}\" is missing the '=' delimiter")]
    MissingDelimiter(String),

    #[error("value for key \"{key}\" exceeds the maximum length ({len} > {max})")]
    ValueTooLong { key: String, len: usize, max: usize },

    #[error("\"{value}\" is not a valid binary value for key \"{key}\"")]
    InvalidBinaryValue { key: String, value: String },

    #[error("\"{value}\" is not a valid list value for key \"{key}\" (must choose from \"{valid}\")")]
    InvalidListValue { key: String, value: String, valid: String },

    #[error("valid list is empty for list key \"{0}\" and no offer could be accepted")]
    EmptyValidList(String),

    #[error("encode buffer has insufficient capacity: need {need}, have {have}")]
    BufferTooSmall { need: usize, have: usize },

    #[error("CHAP authentication failed: {0}")]
    AuthFailed(String),
}

pub type Result<T> = std::result::Result<T, NegotiationError>;
