use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::policy::{
    cap_delay, constant_delay, exponential_backoff, fibonacci_backoff, limit_retries,
    limit_retries_by_delay, RetryPolicy, DEFAULT_DELAY, DEFAULT_MAX_RETRIES,
};

/// Shape of the delay curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Constant,
    Exponential,
    Fibonacci,
}

/// A policy that cannot be built as written.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyConfigError {
    #[error("give_up_after_delay_ms = 0 would never allow a retry")]
    ZeroCutoff,
    #[error("{0:?} backoff with base_delay_ms = 0 never waits; use constant instead")]
    ZeroGrowthBase(BackoffKind),
}

/// Retry policy parameters (`[policy]` section in config.toml).
///
/// A missing `[policy]` section means the default policy. Inside the section,
/// omitted limits are unset: leaving out `max_retries` retries without limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Delay curve: constant, exponential or fibonacci.
    #[serde(default)]
    pub backoff: BackoffKind,
    /// Base delay in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Maximum number of retries (not counting the first attempt). None = unlimited.
    #[serde(default)]
    pub max_retries: Option<u32>,
    /// Upper bound on any single delay, in milliseconds.
    #[serde(default)]
    pub max_delay_ms: Option<u64>,
    /// Stop once the curve asks for a delay this long or longer, in milliseconds.
    #[serde(default)]
    pub give_up_after_delay_ms: Option<u64>,
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_DELAY.as_millis() as u64
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffKind::Constant,
            base_delay_ms: default_base_delay_ms(),
            max_retries: Some(DEFAULT_MAX_RETRIES),
            max_delay_ms: None,
            give_up_after_delay_ms: None,
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<(), PolicyConfigError> {
        if self.give_up_after_delay_ms == Some(0) {
            return Err(PolicyConfigError::ZeroCutoff);
        }
        if self.base_delay_ms == 0 && self.backoff != BackoffKind::Constant {
            return Err(PolicyConfigError::ZeroGrowthBase(self.backoff));
        }
        if self.max_retries.is_none() && self.give_up_after_delay_ms.is_none() {
            tracing::warn!("retry policy has no limit; retries continue until success");
        }
        Ok(())
    }

    /// Build the policy: the backoff curve, capped, cut off, then limited.
    pub fn to_policy(&self) -> Result<RetryPolicy, PolicyConfigError> {
        self.validate()?;
        let base = Duration::from_millis(self.base_delay_ms);
        let mut policy = match self.backoff {
            BackoffKind::Constant => constant_delay(base),
            BackoffKind::Exponential => exponential_backoff(base),
            BackoffKind::Fibonacci => fibonacci_backoff(base),
        };
        if let Some(max) = self.max_delay_ms {
            policy = cap_delay(Duration::from_millis(max), policy);
        }
        if let Some(cutoff) = self.give_up_after_delay_ms {
            policy = limit_retries_by_delay(Duration::from_millis(cutoff), policy);
        }
        if let Some(n) = self.max_retries {
            policy = policy + limit_retries(n);
        }
        Ok(policy)
    }
}

/// Global configuration loaded from `~/.config/rebound/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReboundConfig {
    /// Report every retry decision as a warning.
    #[serde(default = "default_report_retries")]
    pub report_retries: bool,
    #[serde(default)]
    pub policy: PolicyConfig,
}

fn default_report_retries() -> bool {
    true
}

impl Default for ReboundConfig {
    fn default() -> Self {
        Self {
            report_retries: default_report_retries(),
            policy: PolicyConfig::default(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rebound")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ReboundConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ReboundConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load and validate the configuration at `path`.
pub fn load_from_path(path: &Path) -> Result<ReboundConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: ReboundConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    cfg.policy
        .validate()
        .with_context(|| format!("invalid [policy] in {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn default_config_is_default_policy() {
        let cfg = ReboundConfig::default();
        assert!(cfg.report_retries);
        let policy = cfg.policy.to_policy().unwrap();
        let expected = RetryPolicy::default();
        for n in 0..8 {
            assert_eq!(policy.delay(n), expected.delay(n), "iteration {n}");
        }
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = ReboundConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ReboundConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            report_retries = false
            [policy]
            backoff = "exponential"
            base_delay_ms = 100
            max_retries = 4
            max_delay_ms = 300
        "#;
        let cfg: ReboundConfig = toml::from_str(toml).unwrap();
        assert!(!cfg.report_retries);
        assert_eq!(cfg.policy.backoff, BackoffKind::Exponential);
        assert!(cfg.policy.give_up_after_delay_ms.is_none());

        let p = cfg.policy.to_policy().unwrap();
        assert_eq!(p.delay(0), Some(ms(100)));
        assert_eq!(p.delay(1), Some(ms(200)));
        assert_eq!(p.delay(2), Some(ms(300)));
        assert_eq!(p.delay(3), Some(ms(300)));
        assert_eq!(p.delay(4), None);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let cfg: ReboundConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, ReboundConfig::default());

        let cfg: ReboundConfig = toml::from_str("[policy]\nbackoff = \"fibonacci\"").unwrap();
        assert_eq!(cfg.policy.base_delay_ms, 50);
        assert_eq!(cfg.policy.max_retries, None);
    }

    #[test]
    fn cutoff_stops_growing_curve() {
        let cfg = PolicyConfig {
            backoff: BackoffKind::Fibonacci,
            base_delay_ms: 10,
            max_retries: None,
            max_delay_ms: None,
            give_up_after_delay_ms: Some(50),
        };
        let delays: Vec<_> = cfg.to_policy().unwrap().schedule().collect();
        assert_eq!(delays, vec![ms(10), ms(10), ms(20), ms(30)]);
    }

    #[test]
    fn rejects_zero_cutoff() {
        let cfg = PolicyConfig {
            give_up_after_delay_ms: Some(0),
            ..PolicyConfig::default()
        };
        assert_eq!(cfg.validate(), Err(PolicyConfigError::ZeroCutoff));
    }

    #[test]
    fn rejects_zero_base_for_growing_curves() {
        let cfg = PolicyConfig {
            backoff: BackoffKind::Exponential,
            base_delay_ms: 0,
            ..PolicyConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(PolicyConfigError::ZeroGrowthBase(BackoffKind::Exponential))
        );
        let constant = PolicyConfig {
            base_delay_ms: 0,
            ..PolicyConfig::default()
        };
        assert!(constant.validate().is_ok());
    }

    #[test]
    fn load_from_path_reads_and_validates() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.toml");
        fs::write(&good, "[policy]\nmax_retries = 2\n").unwrap();
        let cfg = load_from_path(&good).unwrap();
        assert_eq!(cfg.policy.max_retries, Some(2));

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[policy]\ngive_up_after_delay_ms = 0\n").unwrap();
        let err = load_from_path(&bad).unwrap_err();
        assert!(format!("{err:#}").contains("never allow a retry"));

        assert!(load_from_path(&dir.path().join("missing.toml")).is_err());
    }
}
