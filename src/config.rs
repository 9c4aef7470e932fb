// src/config.rs
//! Service configuration: artifact locations and presentation pacing.
//!
//! Loaded from TOML (`config/service.toml` by default, `VINTAGE_CONFIG_PATH`
//! to override). A missing or malformed file falls back to compiled
//! defaults so the service still boots against the shipped artifacts.

use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/service.toml";

pub const ENV_CONFIG_PATH: &str = "VINTAGE_CONFIG_PATH";
pub const ENV_REVEAL_DELAY_MS: &str = "VINTAGE_REVEAL_DELAY_MS";

/// Upper bound for the cosmetic reveal delay.
pub const MAX_REVEAL_DELAY_MS: u64 = 10_000;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub artifacts: ArtifactPaths,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Where the pre-fit pair lives on disk. Each artifact has a primary name
/// and a fallback tried when the primary is absent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArtifactPaths {
    #[serde(default = "default_model_primary")]
    pub model_primary: PathBuf,
    #[serde(default = "default_model_fallback")]
    pub model_fallback: PathBuf,
    #[serde(default = "default_scaler_primary")]
    pub scaler_primary: PathBuf,
    #[serde(default = "default_scaler_fallback")]
    pub scaler_fallback: PathBuf,
}

fn default_model_primary() -> PathBuf {
    PathBuf::from("artifacts/quality_model.json")
}
fn default_model_fallback() -> PathBuf {
    PathBuf::from("artifacts/model.json")
}
fn default_scaler_primary() -> PathBuf {
    PathBuf::from("artifacts/feature_scaler.json")
}
fn default_scaler_fallback() -> PathBuf {
    PathBuf::from("artifacts/scaler.json")
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            model_primary: default_model_primary(),
            model_fallback: default_model_fallback(),
            scaler_primary: default_scaler_primary(),
            scaler_fallback: default_scaler_fallback(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct UiConfig {
    /// Fixed pacing before the result is revealed. Cosmetic; zero is valid.
    #[serde(default = "default_reveal_delay_ms")]
    pub reveal_delay_ms: u64,
}

fn default_reveal_delay_ms() -> u64 {
    1500
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            reveal_delay_ms: default_reveal_delay_ms(),
        }
    }
}

impl ServiceConfig {
    /// Strict load from a TOML file; any read or parse failure is an error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        let cfg = toml::from_str(&raw)?;
        Ok(cfg)
    }

    /// Resolution order: `VINTAGE_CONFIG_PATH` → `config/service.toml` →
    /// compiled defaults. `VINTAGE_REVEAL_DELAY_MS` overrides the pacing.
    pub fn load() -> Self {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut cfg = Self::load_from_file(&path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "service config unusable, using defaults");
            Self::default()
        });

        if let Some(ms) = parse_delay_env(std::env::var(ENV_REVEAL_DELAY_MS).ok()) {
            cfg.ui.reveal_delay_ms = ms;
        }
        cfg
    }
}

// parse optional integer env and clamp to the allowed delay window
fn parse_delay_env(raw: Option<String>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .map(|v| v.min(MAX_REVEAL_DELAY_MS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_shipped_artifacts() {
        let cfg = ServiceConfig::default();
        assert_eq!(
            cfg.artifacts.model_primary,
            PathBuf::from("artifacts/quality_model.json")
        );
        assert_eq!(
            cfg.artifacts.scaler_fallback,
            PathBuf::from("artifacts/scaler.json")
        );
        assert_eq!(cfg.ui.reveal_delay_ms, 1500);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: ServiceConfig = toml::from_str(
            r#"
            [ui]
            reveal_delay_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.ui.reveal_delay_ms, 0);
        assert_eq!(cfg.artifacts, ArtifactPaths::default());
    }

    #[test]
    fn full_toml_round_trips() {
        let cfg: ServiceConfig = toml::from_str(
            r#"
            [artifacts]
            model_primary = "/srv/wine/model_a.json"
            model_fallback = "/srv/wine/model_b.json"
            scaler_primary = "/srv/wine/scaler_a.json"
            scaler_fallback = "/srv/wine/scaler_b.json"

            [ui]
            reveal_delay_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(cfg.artifacts.model_primary, PathBuf::from("/srv/wine/model_a.json"));
        assert_eq!(cfg.ui.reveal_delay_ms, 250);
    }

    #[test]
    fn strict_load_reports_unreadable_files() {
        assert!(ServiceConfig::load_from_file("/nonexistent/service.toml").is_err());
    }

    #[test]
    fn delay_env_parses_and_clamps() {
        assert_eq!(parse_delay_env(None), None);
        assert_eq!(parse_delay_env(Some("abc".into())), None);
        assert_eq!(parse_delay_env(Some(" 750 ".into())), Some(750));
        assert_eq!(parse_delay_env(Some("99999999".into())), Some(MAX_REVEAL_DELAY_MS));
    }
}
