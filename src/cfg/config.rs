// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::negotiation::{catalog::Catalog, types::ParamType};

/// Top-level configuration for one negotiation session: authentication
/// strategy, the catalog of keys to register before negotiation starts,
/// and logging.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct NegotiationConfig {
    /// Authentication strategy (AuthMethod / CHAP).
    pub auth: AuthConfig,
    /// Catalog keys to register, with their type/default/valid triples.
    #[serde(default = "default_catalog_seed")]
    pub catalog_seed: Vec<CatalogSeed>,
    /// Logger configuration.
    #[serde(default)]
    pub logging: LoggerConfig,
}

/// One row of the catalog seed list: a single `Catalog::add` call's worth
/// of configuration, expressed as plain data so it can come straight out
/// of YAML.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CatalogSeed {
    pub key: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub default: String,
    #[serde(default)]
    pub valid: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(tag = "AuthMethod")]
/// Authentication configuration exposed through the Login AuthMethod key.
pub enum AuthConfig {
    #[serde(rename = "None")]
    None,
    #[serde(rename = "CHAP")]
    Chap(ChapConfig),
}

#[derive(Deserialize, Serialize, Debug, Clone)]
/// CHAP credentials used during challenge-response authentication.
pub struct ChapConfig {
    /// Username advertised via CHAP_N.
    pub username: String,
    /// Shared secret used to generate CHAP_R.
    pub secret: String,
}

/// Logger configuration, mirroring the fields the teacher's
/// `cfg::logger::init_logger` already reads off a config struct.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LoggerConfig {
    /// Minimum level to emit (`trace`/`debug`/`info`/`warn`/`error`).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional directory to also write a rolling JSON log file to.
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// The standard RFC3720-derived operational keys this engine negotiates
/// out of the box. A deployment can override or extend this list via its
/// own `catalog_seed` in YAML.
fn default_catalog_seed() -> Vec<CatalogSeed> {
    vec![
        seed(ParamType::List, "SessionType", "Normal", "Discovery,Normal"),
        seed(ParamType::Declarative, "InitiatorName", "", ""),
        seed(ParamType::Declarative, "InitiatorAlias", "", ""),
        seed(ParamType::Declarative, "TargetName", "", ""),
        // Security-phase keys, driven by the CHAP sub-negotiator rather
        // than the ordinary type-rule machinery; `valid` for `CHAP_A`
        // carries the supported algorithm ids ("5" = MD5).
        seed(ParamType::List, "AuthMethod", "None", "CHAP,None"),
        seed(ParamType::Declarative, "CHAP_A", "", "5"),
        seed(ParamType::Declarative, "CHAP_I", "", ""),
        seed(ParamType::Declarative, "CHAP_C", "", ""),
        seed(ParamType::Declarative, "CHAP_N", "", ""),
        seed(ParamType::Declarative, "CHAP_R", "", ""),
        seed(ParamType::Declarative, "AuthResult", "", ""),
        seed(ParamType::BinaryOr, "HeaderDigest", "No", "Yes,No"),
        seed(ParamType::BinaryOr, "DataDigest", "No", "Yes,No"),
        seed(ParamType::Numerical, "MaxConnections", "1", ""),
        seed(ParamType::NumericalZ, "MaxBurstLength", "262144", ""),
        seed(ParamType::NumericalZ, "FirstBurstLength", "65536", ""),
        seed(ParamType::Numerical, "MaxRecvDataSegmentLength", "8192", ""),
        seed(ParamType::Numerical, "MaxOutstandingR2T", "1", ""),
        seed(ParamType::BinaryOr, "InitialR2T", "Yes", "Yes,No"),
        seed(ParamType::BinaryOr, "ImmediateData", "Yes", "Yes,No"),
        seed(ParamType::BinaryAnd, "DataPDUInOrder", "Yes", "Yes,No"),
        seed(ParamType::BinaryAnd, "DataSequenceInOrder", "Yes", "Yes,No"),
        seed(ParamType::Numerical, "ErrorRecoveryLevel", "0", ""),
        seed(ParamType::Numerical, "DefaultTime2Wait", "2", ""),
        seed(ParamType::Numerical, "DefaultTime2Retain", "20", ""),
    ]
}

fn seed(param_type: ParamType, key: &str, default: &str, valid: &str) -> CatalogSeed {
    CatalogSeed {
        key: key.to_string(),
        param_type,
        default: default.to_string(),
        valid: valid.to_string(),
    }
}

impl NegotiationConfig {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path.as_ref()))?;
        let mut cfg: NegotiationConfig =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants: non-empty seed list, no duplicate keys, every
    /// Binary-typed seed's `valid` field in the allowed eight-string set,
    /// and (for `Chap` auth) a non-empty username and secret.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(!self.catalog_seed.is_empty(), "catalog_seed must not be empty");

        let mut seen = std::collections::HashSet::new();
        for row in &self.catalog_seed {
            ensure!(seen.insert(row.key.as_str()), "duplicate catalog_seed key \"{}\"", row.key);
            row.param_type
                .validate_valid(&row.key, &row.valid)
                .with_context(|| format!("invalid valid field for catalog_seed key \"{}\"", row.key))?;
        }

        if let AuthConfig::Chap(chap) = &self.auth {
            ensure!(!chap.username.is_empty(), "CHAP username must not be empty");
            ensure!(!chap.secret.is_empty(), "CHAP secret must not be empty");
        }
        Ok(())
    }

    /// Registers every seeded key into a fresh catalog.
    pub fn seed_catalog(&self) -> Result<Catalog> {
        let mut catalog = Catalog::new();
        for row in &self.catalog_seed {
            catalog
                .add(row.param_type, &row.key, &row.default, &row.valid)
                .with_context(|| format!("failed to seed catalog key \"{}\"", row.key))?;
        }
        Ok(catalog)
    }
}
