//! Environment-driven configuration for the service and binding layers.
//!
//! The engines never read configuration themselves; everything they need is
//! passed in explicitly.

use std::path::PathBuf;

use crate::consensus::ConsensusPolicy;

pub const DB_PATH_ENV: &str = "AGREEMENT_DB_PATH";
pub const DECLINE_UNRESOLVED_ENV: &str = "AGREEMENT_DECLINE_UNRESOLVED";
pub const VOCAB_TTL_ENV: &str = "AGREEMENT_VOCAB_TTL_SECONDS";

pub const DEFAULT_DB_PATH: &str = "~/.agreement/agreement.db";
pub const DEFAULT_VOCAB_TTL_SECONDS: f64 = 300.0;

#[derive(Clone, Debug, PartialEq)]
pub struct AgreementConfig {
    pub db_path: PathBuf,
    pub consensus_policy: ConsensusPolicy,
    pub vocabulary_ttl_seconds: f64,
}

impl Default for AgreementConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            consensus_policy: ConsensusPolicy::LeavePending,
            vocabulary_ttl_seconds: DEFAULT_VOCAB_TTL_SECONDS,
        }
    }
}

fn env_flag(value: Option<String>) -> bool {
    match value {
        Some(val) => {
            let v = val.trim().to_lowercase();
            matches!(v.as_str(), "1" | "true" | "yes" | "on")
        }
        None => false,
    }
}

impl AgreementConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, falling back to defaults
    /// for missing or unparseable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let db_path = lookup(DB_PATH_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let consensus_policy = if env_flag(lookup(DECLINE_UNRESOLVED_ENV)) {
            ConsensusPolicy::DeclineUnresolved
        } else {
            ConsensusPolicy::LeavePending
        };

        let vocabulary_ttl_seconds = lookup(VOCAB_TTL_ENV)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(defaults.vocabulary_ttl_seconds);

        Self {
            db_path,
            consensus_policy,
            vocabulary_ttl_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> AgreementConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AgreementConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(config(&[]), AgreementConfig::default());
    }

    #[test]
    fn decline_flag_switches_policy() {
        let cfg = config(&[(DECLINE_UNRESOLVED_ENV, " Yes ")]);
        assert_eq!(cfg.consensus_policy, ConsensusPolicy::DeclineUnresolved);
        let cfg = config(&[(DECLINE_UNRESOLVED_ENV, "off")]);
        assert_eq!(cfg.consensus_policy, ConsensusPolicy::LeavePending);
    }

    #[test]
    fn invalid_ttl_falls_back() {
        assert_eq!(
            config(&[(VOCAB_TTL_ENV, "-4")]).vocabulary_ttl_seconds,
            DEFAULT_VOCAB_TTL_SECONDS
        );
        assert_eq!(config(&[(VOCAB_TTL_ENV, "12.5")]).vocabulary_ttl_seconds, 12.5);
    }

    #[test]
    fn db_path_is_read_verbatim() {
        let cfg = config(&[(DB_PATH_ENV, "/tmp/agreements.db")]);
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/agreements.db"));
    }
}
