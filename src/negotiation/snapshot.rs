// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Extracts the fixed set of operational parameters a login driver needs
//! once negotiation settles, so it never has to poke at the catalog
//! directly.
//!
//! Grounded on `parameters.c`'s `set_session_parameters`, which reads the
//! same seven keys out of the negotiated list into the session struct.

use crate::negotiation::{catalog::Catalog, error::Result, types::canonical_binary};

/// Negotiated values a login driver needs to configure the data-transfer
/// phase that follows. Field names match the teacher's
/// `cfg::config::Flow`/`WriteFlow`/`Integrity` naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    pub max_burst_length: u64,
    pub first_burst_length: u64,
    pub max_recv_data_segment_length: u64,
    pub header_digest: bool,
    pub data_digest: bool,
    pub initial_r2t: bool,
    pub immediate_data: bool,
}

/// Reads the negotiated session parameters out of `catalog`. Every key
/// here is expected to have been registered (and thus negotiated) before
/// this call; a missing key is a caller bug, not a protocol error.
pub fn extract(catalog: &Catalog) -> Result<SessionParams> {
    Ok(SessionParams {
        max_burst_length: catalog.value_as_int("MaxBurstLength")?,
        first_burst_length: catalog.value_as_int("FirstBurstLength")?,
        max_recv_data_segment_length: catalog.value_as_int("MaxRecvDataSegmentLength")?,
        header_digest: binary_is_yes(catalog, "HeaderDigest")?,
        data_digest: binary_is_yes(catalog, "DataDigest")?,
        initial_r2t: binary_is_yes(catalog, "InitialR2T")?,
        immediate_data: binary_is_yes(catalog, "ImmediateData")?,
    })
}

fn binary_is_yes(catalog: &Catalog, key: &str) -> Result<bool> {
    Ok(canonical_binary(catalog.value(key, 0)?) == Some("Yes"))
}
