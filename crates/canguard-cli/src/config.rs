//! Session configuration – reads/writes `~/.canguard/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use canguard_types::SafetyMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Log output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Persisted session configuration stored in `~/.canguard/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Safety mode the engine starts in.
    #[serde(default = "default_safety_mode")]
    pub safety_mode: SafetyMode,

    /// Integration sub-mode flags (e.g. `1` = GM camera harness).
    #[serde(default)]
    pub safety_param: u16,

    /// Alternative-experience bits. Unknown bits are dropped by the engine.
    #[serde(default)]
    pub alternative_experience: u32,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_safety_mode() -> SafetyMode {
    SafetyMode::Silent
}

impl Default for Config {
    fn default() -> Self {
        Self {
            safety_mode: default_safety_mode(),
            safety_param: 0,
            alternative_experience: 0,
            log_format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Return the path to `~/.canguard/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".canguard").join("config.toml")
}

/// Load the config from disk. Returns `None` if the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<Config>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut cfg: Config = toml::from_str(&raw)?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `CANGUARD_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `CANGUARD_SAFETY_MODE` | `safety_mode` (name or numeric id) |
/// | `CANGUARD_SAFETY_PARAM` | `safety_param` |
/// | `CANGUARD_ALT_EXP` | `alternative_experience` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides_from(cfg, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides_from<F>(cfg: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(mode) = lookup("CANGUARD_SAFETY_MODE").as_deref().and_then(parse_safety_mode) {
        cfg.safety_mode = mode;
    }
    if let Some(param) = lookup("CANGUARD_SAFETY_PARAM").and_then(|v| v.trim().parse().ok()) {
        cfg.safety_param = param;
    }
    if let Some(bits) = lookup("CANGUARD_ALT_EXP").and_then(|v| v.trim().parse().ok()) {
        cfg.alternative_experience = bits;
    }
}

/// Accept either the mode's name (`gm`, `all_output`, …) or its numeric id.
pub fn parse_safety_mode(raw: &str) -> Option<SafetyMode> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<u16>() {
        return SafetyMode::from_id(id).ok();
    }
    SafetyMode::ALL
        .into_iter()
        .find(|mode| mode.to_string().eq_ignore_ascii_case(raw))
}

/// Save the config to a specific path, creating the parent directory.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let raw = toml::to_string_pretty(cfg)?;
    fs::write(path, raw).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn roundtrip_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config {
            safety_mode: SafetyMode::Gm,
            safety_param: 1,
            alternative_experience: 1,
            log_format: LogFormat::Json,
        };
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.safety_mode, SafetyMode::Gm);
        assert_eq!(loaded.safety_param, 1);
        assert_eq!(loaded.log_format, LogFormat::Json);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: Config = toml::from_str("safety_mode = \"gm\"").unwrap();
        assert_eq!(cfg.safety_mode, SafetyMode::Gm);
        assert_eq!(cfg.safety_param, 0);
        assert_eq!(cfg.alternative_experience, 0);
        assert_eq!(cfg.log_format, LogFormat::Compact);
    }

    #[test]
    fn unknown_mode_name_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "safety_mode = \"tesla\"").unwrap();
        assert!(matches!(load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn config_path_points_to_canguard_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".canguard"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn overrides_apply_mode_param_and_alt_exp() {
        let mut cfg = Config::default();
        apply_overrides_from(
            &mut cfg,
            env(&[
                ("CANGUARD_SAFETY_MODE", "gm"),
                ("CANGUARD_SAFETY_PARAM", "1"),
                ("CANGUARD_ALT_EXP", "9"),
            ]),
        );
        assert_eq!(cfg.safety_mode, SafetyMode::Gm);
        assert_eq!(cfg.safety_param, 1);
        assert_eq!(cfg.alternative_experience, 9);
    }

    #[test]
    fn mode_override_accepts_numeric_id() {
        let mut cfg = Config::default();
        apply_overrides_from(&mut cfg, env(&[("CANGUARD_SAFETY_MODE", "17")]));
        assert_eq!(cfg.safety_mode, SafetyMode::AllOutput);
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut cfg = Config::default();
        apply_overrides_from(
            &mut cfg,
            env(&[
                ("CANGUARD_SAFETY_MODE", "3"),
                ("CANGUARD_SAFETY_PARAM", "not-a-number"),
                ("CANGUARD_ALT_EXP", "-1"),
            ]),
        );
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn parse_safety_mode_by_name() {
        assert_eq!(parse_safety_mode("ALL_OUTPUT"), Some(SafetyMode::AllOutput));
        assert_eq!(parse_safety_mode(" no_output "), Some(SafetyMode::NoOutput));
        assert_eq!(parse_safety_mode("bogus"), None);
    }
}
