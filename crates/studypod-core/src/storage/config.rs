//! TOML-based engine configuration.
//!
//! Groups the tunables of every engine component:
//! - Check-in ceiling
//! - Streak grace allowance, window and scope
//! - Matching tolerance and new-pod capacity
//! - Coaching window, milestones and notification timing
//!
//! Configuration is stored at `~/.config/studypod/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::checkin::ValidatorConfig;
use crate::coaching::CoachingConfig;
use crate::error::ConfigError;
use crate::matcher::MatcherConfig;
use crate::pod::{MAX_POD_CAPACITY, MIN_POD_CAPACITY};
use crate::streak::StreakConfig;

const FILE_NAME: &str = "config.toml";

/// Upper bound for any day-based window
const MAX_WINDOW_DAYS: u32 = 366;
/// Upper bound for the coaching lookback
const MAX_WINDOW_WEEKS: u32 = 52;

/// Engine configuration.
///
/// Serialized to/from TOML at `~/.config/studypod/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub streak: StreakConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub coaching: CoachingConfig,
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Path of the config file inside `dir`.
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(FILE_NAME)
    }

    /// Load from the default data directory, writing defaults if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&data_dir()?)
    }

    /// Load from `dir`, writing defaults if no config file exists yet.
    pub fn load_from(dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::path_in(dir);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(dir)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default data directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&data_dir()?)
    }

    /// Persist to `dir`.
    pub fn save_to(&self, dir: &Path) -> Result<(), ConfigError> {
        let path = Self::path_in(dir);
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.clone(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key. The value is parsed according to the
    /// type of the current value, and the result must pass [`Self::validate`].
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be
    /// parsed or is out of range.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        };

        if self.validator.max_daily_minutes == 0 {
            return invalid("validator.max_daily_minutes", "must be at least 1");
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&self.streak.grace_window_days) {
            return invalid("streak.grace_window_days", "must be within 1..=366");
        }
        if self.matcher.exam_date_tolerance_days > MAX_WINDOW_DAYS {
            return invalid("matcher.exam_date_tolerance_days", "must be within 0..=366");
        }
        if !(MIN_POD_CAPACITY..=MAX_POD_CAPACITY).contains(&self.matcher.default_capacity) {
            return invalid("matcher.default_capacity", "must be within 3..=8");
        }
        if !(1..=MAX_WINDOW_WEEKS).contains(&self.coaching.window_weeks) {
            return invalid("coaching.window_weeks", "must be within 1..=52");
        }
        if !(0.0..=1.0).contains(&self.coaching.struggling_share) {
            return invalid("coaching.struggling_share", "must be within 0.0..=1.0");
        }
        if self.coaching.reminder_hour > 23 {
            return invalid("coaching.reminder_hour", "must be within 0..=23");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streak::StreakScope;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.validator.max_daily_minutes, 720);
        assert_eq!(parsed.coaching.milestones, vec![7, 30, 100]);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str(
            "[streak]\ngrace_allowance = 2\n\n[matcher]\nexam_date_tolerance_days = 7\n",
        )
        .unwrap();
        assert_eq!(parsed.streak.grace_allowance, 2);
        assert_eq!(parsed.streak.grace_window_days, 7);
        assert_eq!(parsed.streak.scope, StreakScope::PerPod);
        assert_eq!(parsed.matcher.exam_date_tolerance_days, 7);
        assert_eq!(parsed.matcher.default_capacity, 6);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("streak.grace_allowance").as_deref(), Some("1"));
        assert_eq!(cfg.get("streak.scope").as_deref(), Some("per_pod"));
        assert!(cfg.get("streak.missing_key").is_none());
    }

    #[test]
    fn set_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.set("validator.max_daily_minutes", "300").unwrap();
        cfg.set("coaching.struggling_share", "0.6").unwrap();
        cfg.set("coaching.milestones", "[3, 14]").unwrap();
        cfg.set("streak.scope", "all_pods").unwrap();
        assert_eq!(cfg.validator.max_daily_minutes, 300);
        assert_eq!(cfg.coaching.struggling_share, 0.6);
        assert_eq!(cfg.coaching.milestones, vec![3, 14]);
        assert_eq!(cfg.streak.scope, StreakScope::AllPods);
    }

    #[test]
    fn set_rejects_unknown_keys_and_bad_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("streak.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(cfg.set("streak.grace_allowance", "lots").is_err());
        assert!(cfg.set("matcher.default_capacity", "12").is_err());
        assert!(cfg.set("streak.scope", "galaxy").is_err());
        // Failed sets leave the config untouched
        assert_eq!(cfg.matcher.default_capacity, 6);
    }

    #[test]
    fn set_rejects_unbounded_windows() {
        let mut cfg = Config::default();
        assert!(cfg.set("matcher.exam_date_tolerance_days", "4000000000").is_err());
        assert!(cfg.set("matcher.exam_date_tolerance_days", "367").is_err());
        assert!(cfg.set("coaching.window_weeks", "4000000000").is_err());
        assert!(cfg.set("coaching.window_weeks", "53").is_err());
        assert!(cfg.set("streak.grace_window_days", "367").is_err());
        assert_eq!(cfg.matcher.exam_date_tolerance_days, 14);
        assert_eq!(cfg.coaching.window_weeks, 3);

        cfg.set("matcher.exam_date_tolerance_days", "366").unwrap();
        cfg.set("coaching.window_weeks", "52").unwrap();
        assert_eq!(cfg.matcher.exam_date_tolerance_days, 366);
    }

    #[test]
    fn load_from_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let first = Config::load_from(dir.path()).unwrap();
        assert!(Config::path_in(dir.path()).exists());

        let mut changed = first.clone();
        changed.set("coaching.reminder_hour", "21").unwrap();
        changed.save_to(dir.path()).unwrap();

        let reloaded = Config::load_from(dir.path()).unwrap();
        assert_eq!(reloaded.coaching.reminder_hour, 21);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(Config::path_in(dir.path()), "streak = 3").unwrap();
        assert!(matches!(
            Config::load_from(dir.path()),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
