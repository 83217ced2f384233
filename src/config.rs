use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted configuration for the exif-maker-notes tools.
///
/// Currently this only holds the per-fix enable toggles, keyed in the
/// config store as `fixes.<name>` (e.g. `fixes.timezone`).
///
/// # Loading
///
/// ```rust,no_run
/// use exif_maker_notes::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.fixes.exposure = false;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Which fixes the pipeline instantiates.
    pub fixes: FixToggles,
}

/// Enable flags for each fix in the catalog. All enabled by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixToggles {
    pub timezone: bool,
    pub body_name: bool,
    pub lens_model: bool,
    pub lens_35mm: bool,
    pub exposure: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fixes: FixToggles {
                timezone: true,
                body_name: true,
                lens_model: true,
                lens_35mm: true,
                exposure: true,
            },
        }
    }
}

impl Config {
    /// Resolve the config file path — same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::debug!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// All config entries as `(dotted key, value)` pairs, for display.
    pub fn entries(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("fixes.timezone", self.fixes.timezone),
            ("fixes.body_name", self.fixes.body_name),
            ("fixes.lens_model", self.fixes.lens_model),
            ("fixes.lens_35mm", self.fixes.lens_35mm),
            ("fixes.exposure", self.fixes.exposure),
        ]
    }

    /// Look up a config value by dotted key.
    pub fn get_key(&self, key: &str) -> Result<String> {
        for (k, v) in self.entries() {
            if k == key {
                return Ok(v.to_string());
            }
        }
        bail!("Unknown configuration key: {key}")
    }

    /// Set a config value by dotted key. All current keys are booleans.
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<()> {
        let value = parse_bool(value).with_context(|| format!("Invalid value for {key}"))?;
        match key {
            "fixes.timezone" => self.fixes.timezone = value,
            "fixes.body_name" => self.fixes.body_name = value,
            "fixes.lens_model" => self.fixes.lens_model = value,
            "fixes.lens_35mm" => self.fixes.lens_35mm = value,
            "fixes.exposure" => self.fixes.exposure = value,
            _ => bail!("Unknown configuration key: {key}"),
        }
        Ok(())
    }
}

/// Parse a boolean token the strict way: `y`, `yes`, `t`, `true`, `on`, `1`
/// are true; `n`, `no`, `f`, `false`, `off`, `0` are false; anything else is
/// an error. Case-insensitive. Also used for the maker-note daylight-saving
/// flag, whose spelling varies by camera firmware.
pub fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Ok(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Ok(false),
        other => bail!("Invalid boolean value: {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ── parse_bool ───────────────────────────────────────────────────

    #[test]
    fn parse_bool_true_tokens() {
        for token in &["y", "yes", "t", "true", "on", "1", "True", "YES", " on "] {
            assert!(parse_bool(token).unwrap(), "expected true for {token:?}");
        }
    }

    #[test]
    fn parse_bool_false_tokens() {
        for token in &["n", "no", "f", "false", "off", "0", "False", "NO"] {
            assert!(!parse_bool(token).unwrap(), "expected false for {token:?}");
        }
    }

    #[test]
    fn parse_bool_rejects_garbage() {
        assert!(parse_bool("").is_err());
        assert!(parse_bool("2").is_err());
        assert!(parse_bool("maybe").is_err());
    }

    // ── get/set keys ─────────────────────────────────────────────────

    #[test]
    fn default_enables_all_fixes() {
        let config = Config::default();
        for (key, value) in config.entries() {
            assert!(value, "expected {key} enabled by default");
        }
    }

    #[test]
    fn get_key_renders_boolean() {
        let config = Config::default();
        assert_eq!(config.get_key("fixes.timezone").unwrap(), "true");
    }

    #[test]
    fn set_key_round_trip() {
        let mut config = Config::default();
        config.set_key("fixes.timezone", "false").unwrap();
        assert_eq!(config.get_key("fixes.timezone").unwrap(), "false");
        config.set_key("fixes.timezone", "on").unwrap();
        assert_eq!(config.get_key("fixes.timezone").unwrap(), "true");
    }

    #[test]
    fn unknown_key_is_error() {
        let mut config = Config::default();
        assert!(config.get_key("fixes.bogus").is_err());
        assert!(config.set_key("fixes.bogus", "true").is_err());
    }

    #[test]
    fn set_key_rejects_bad_value() {
        let mut config = Config::default();
        assert!(config.set_key("fixes.timezone", "maybe").is_err());
    }

    // ── load/save ────────────────────────────────────────────────────

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.fixes.exposure = false;
        config.save(Some(&path)).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert!(!loaded.fixes.exposure);
        assert!(loaded.fixes.timezone);
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("nope.json"))).unwrap();
        assert!(config.fixes.timezone);
    }

    #[test]
    fn load_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
