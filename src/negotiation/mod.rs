// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The login-phase text-parameter negotiation engine: catalog, wire
//! codec, negotiator core, CHAP sub-negotiator, and the session-snapshot
//! extractor.

pub mod catalog;
pub mod chap;
pub mod codec;
pub mod engine;
pub mod error;
pub mod snapshot;
pub mod types;

pub use catalog::Catalog;
pub use engine::{parse, NegotiationOutcome};
pub use error::{NegotiationError, Result};
pub use snapshot::SessionParams;
pub use types::ParamType;
