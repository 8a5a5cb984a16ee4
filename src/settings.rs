//! Settings store.
//!
//! Loads the single `settings.toml` that drives every run. The file is the
//! only source of configuration truth: it is created with stock defaults on
//! first run and afterwards changed only by the user.
//!
//! ## Settings File Location
//!
//! ```text
//! $XDG_CONFIG_HOME/hyprtheme/settings.toml    (usually ~/.config/hyprtheme/)
//! ```
//!
//! The `--settings` flag points at a different file.
//!
//! ## Settings Options
//!
//! ```toml
//! enabled = true
//! fancy = false                 # HSL-blend neighbouring stops
//! stop_count = 2                # 1-5 gradient stops
//! keys = ["accent", "secondary"]
//! alpha_active = 0.93
//! alpha_inactive = 0.67
//! gradient_angle = 45
//! # wallpaper = "~/Pictures/wall.png"
//!
//! [targets]
//! hyprland = true
//! waybar = true
//! rofi = false
//!
//! [paths]
//! # waybar = "~/dotfiles/waybar/style.css"
//!
//! [extractor]
//! # command = "wallust-json"
//! args = []
//! builtin_fallback = true
//!
//! [backups]
//! keep = 10
//! ```
//!
//! ## Partial and Forward-Compatible Files
//!
//! Missing keys take their defaults. Unknown keys are ignored so a settings
//! file written by a newer version still loads. A file that exists but does
//! not parse is **never** replaced: the run halts with
//! [`SettingsError::Corrupt`] so user data is not silently reset.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Name of the settings file within the config directory.
pub const SETTINGS_FILENAME: &str = "settings.toml";

/// Directory name used under the XDG config, cache and data roots.
pub const APP_DIR: &str = "hyprtheme";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("settings file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid settings: {0}")]
    Validation(String),
}

/// Typed settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Master switch. A disabled run is a no-op unless forced.
    pub enabled: bool,
    /// Blend neighbouring stops in HSL instead of using them verbatim.
    pub fancy: bool,
    /// Number of gradient stops (1-5).
    pub stop_count: u8,
    /// Role names to use as stops, in order. Empty means "first roles in
    /// the palette, excluding surface".
    pub keys: Vec<String>,
    /// Alpha applied to every active-border color.
    pub alpha_active: f64,
    /// Alpha applied to the inactive (surface) color.
    pub alpha_inactive: f64,
    /// Gradient angle in degrees for targets that draw gradients.
    pub gradient_angle: u16,
    /// Source image used when none is given on the command line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallpaper: Option<PathBuf>,
    /// Per-target enable flags. Targets missing from the map use their
    /// built-in default.
    pub targets: BTreeMap<String, bool>,
    /// Per-target config path overrides.
    pub paths: BTreeMap<String, PathBuf>,
    pub extractor: ExtractorSettings,
    pub backups: BackupSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            fancy: false,
            stop_count: 2,
            keys: vec!["accent".to_string(), "secondary".to_string()],
            alpha_active: 0.93,
            alpha_inactive: 0.67,
            gradient_angle: 45,
            wallpaper: None,
            targets: BTreeMap::from([
                ("hyprland".to_string(), true),
                ("rofi".to_string(), false),
                ("waybar".to_string(), true),
            ]),
            paths: BTreeMap::new(),
            extractor: ExtractorSettings::default(),
            backups: BackupSettings::default(),
        }
    }
}

impl Settings {
    /// Validate values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(1..=5).contains(&self.stop_count) {
            return Err(SettingsError::Validation(
                "stop_count must be between 1 and 5".into(),
            ));
        }
        for (name, alpha) in [
            ("alpha_active", self.alpha_active),
            ("alpha_inactive", self.alpha_inactive),
        ] {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(SettingsError::Validation(format!(
                    "{name} must be between 0.0 and 1.0"
                )));
            }
        }
        if self.keys.iter().any(|k| k.trim().is_empty()) {
            return Err(SettingsError::Validation(
                "keys must not contain empty role names".into(),
            ));
        }
        Ok(())
    }

    /// Whether a target is enabled, falling back to `default` when the
    /// settings don't mention it.
    pub fn target_enabled(&self, name: &str, default: bool) -> bool {
        self.targets.get(name).copied().unwrap_or(default)
    }

    /// Configured path override for a target, with `~/` expanded.
    pub fn target_path(&self, name: &str) -> Option<PathBuf> {
        self.paths.get(name).map(|p| expand_home(p))
    }

    /// Configured wallpaper, with `~/` expanded.
    pub fn wallpaper_path(&self) -> Option<PathBuf> {
        self.wallpaper.as_deref().map(expand_home)
    }
}

/// How palettes are extracted from the source image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorSettings {
    /// External program printing a JSON role → hex document on stdout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Free-form flags passed to the program. `{image}` is replaced with the
    /// image path; without a placeholder the path is appended.
    pub args: Vec<String>,
    /// Fall back to the built-in extractor when the command fails or is
    /// not configured.
    pub builtin_fallback: bool,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            builtin_fallback: true,
        }
    }
}

/// Backup retention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSettings {
    /// Backups retained per target; older ones are pruned. `0` keeps all.
    pub keep: usize,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self { keep: 10 }
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Parse a settings document. Values are not validated.
pub fn parse_settings(content: &str) -> Result<Settings, toml::de::Error> {
    toml::from_str(content)
}

/// Loads and bootstraps the settings file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_CONFIG_HOME/hyprtheme/settings.toml`, if a config dir exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(SETTINGS_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, writing the stock document on first run.
    ///
    /// - Missing file: the stock document is written and defaults returned.
    /// - Unparseable file: [`SettingsError::Corrupt`]; the file is left as-is.
    /// - Out-of-range values: [`SettingsError::Validation`].
    pub fn load(&self) -> Result<Settings, SettingsError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no settings file; writing defaults");
                self.write_stock()?;
                return Ok(Settings::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let settings = parse_settings(&content).map_err(|source| SettingsError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        settings.validate()?;
        debug!(path = %self.path.display(), "settings loaded");
        Ok(settings)
    }

    fn write_stock(&self) -> Result<(), SettingsError> {
        let io_err = |source: io::Error| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&self.path, stock_settings_toml()).map_err(io_err)
    }
}

/// Returns a fully-commented stock `settings.toml`.
///
/// Written on first run and printed by the `gen-config` CLI command.
pub fn stock_settings_toml() -> &'static str {
    r##"# hyprtheme settings
# ==================
# Values shown below are the defaults. Missing keys use their default;
# unknown keys are ignored.

# Master switch. `hyprtheme force` ignores it.
enabled = true

# Blend each stop with its neighbour in HSL space (midpoint), keeping the
# first and last stop unchanged. false = use the palette colors verbatim.
fancy = false

# Number of gradient stops for the active border (1-5).
stop_count = 2

# Palette roles used as stops, in order. Leave empty to take the first
# roles the extractor produced (the "surface" role is never picked).
keys = ["accent", "secondary"]

# Alpha of the active gradient and of the inactive (surface) color.
alpha_active = 0.93
alpha_inactive = 0.67

# Gradient angle in degrees, for targets that draw gradients.
gradient_angle = 45

# Source image used when none is passed on the command line.
# wallpaper = "~/Pictures/wallpaper.png"

# ---------------------------------------------------------------------------
# Targets
# ---------------------------------------------------------------------------
[targets]
hyprland = true
rofi = false
waybar = true

# Override where each target's config lives.
[paths]
# hyprland = "~/.config/hypr/hyprland.conf"
# waybar = "~/.config/waybar/style.css"
# rofi = "~/.config/rofi/config.rasi"

# ---------------------------------------------------------------------------
# Palette extraction
# ---------------------------------------------------------------------------
[extractor]
# External program printing a JSON document of role -> "#rrggbb" on stdout.
# `{image}` in args is replaced with the image path; otherwise the path is
# appended as the last argument.
# command = "my-palette-tool"
args = []

# Use the built-in extractor when the command is unset or fails.
builtin_fallback = true

# ---------------------------------------------------------------------------
# Backups
# ---------------------------------------------------------------------------
[backups]
# Backups kept per target before the oldest are pruned. 0 keeps everything.
keep = 10
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_valid() {
        Settings::default().validate().unwrap();
    }

    #[test]
    fn parse_partial_settings() {
        let settings = parse_settings("fancy = true\nstop_count = 3\n").unwrap();
        assert!(settings.fancy);
        assert_eq!(settings.stop_count, 3);
        // Defaults preserved
        assert!(settings.enabled);
        assert_eq!(settings.keys, vec!["accent", "secondary"]);
        assert_eq!(settings.backups.keep, 10);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let settings = parse_settings(
            r#"
future_option = "x"
enabled = false

[future_table]
anything = 1
"#,
        )
        .unwrap();
        assert!(!settings.enabled);
    }

    #[test]
    fn keys_keep_insertion_order() {
        let settings = parse_settings(r#"keys = ["tertiary", "accent", "secondary"]"#).unwrap();
        assert_eq!(settings.keys, vec!["tertiary", "accent", "secondary"]);
    }

    #[test]
    fn partial_targets_fall_back_to_defaults() {
        let settings = parse_settings("[targets]\nwaybar = false\n").unwrap();
        assert!(!settings.target_enabled("waybar", true));
        assert!(settings.target_enabled("hyprland", true));
    }

    #[test]
    fn validate_stop_count_range() {
        for bad in [0u8, 6] {
            let settings = Settings {
                stop_count: bad,
                ..Settings::default()
            };
            assert!(matches!(
                settings.validate(),
                Err(SettingsError::Validation(_))
            ));
        }
    }

    #[test]
    fn validate_alpha_range() {
        let settings = Settings {
            alpha_inactive: 1.2,
            ..Settings::default()
        };
        let err = settings.validate().unwrap_err().to_string();
        assert!(err.contains("alpha_inactive"));

        let settings = Settings {
            alpha_active: f64::NAN,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_empty_key() {
        let settings = Settings {
            keys: vec!["accent".into(), " ".into()],
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn expand_home_only_touches_tilde_prefix() {
        assert_eq!(expand_home(Path::new("/etc/x")), PathBuf::from("/etc/x"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/a/b")), home.join("a/b"));
        }
    }

    // =========================================================================
    // SettingsStore
    // =========================================================================

    #[test]
    fn load_missing_file_writes_stock_document() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sub/settings.toml");
        let store = SettingsStore::new(&path);

        let settings = store.load().unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), stock_settings_toml());
    }

    #[test]
    fn load_reads_existing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.toml");
        fs::write(&path, "alpha_active = 0.5\n").unwrap();

        let settings = SettingsStore::new(&path).load().unwrap();
        assert_eq!(settings.alpha_active, 0.5);
    }

    #[test]
    fn load_corrupt_file_errors_and_preserves_it() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.toml");
        fs::write(&path, "enabled = [unterminated").unwrap();

        let err = SettingsStore::new(&path).load().unwrap_err();
        assert!(matches!(err, SettingsError::Corrupt { .. }));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "enabled = [unterminated"
        );
    }

    #[test]
    fn load_wrong_type_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.toml");
        fs::write(&path, "stop_count = \"three\"\n").unwrap();
        assert!(matches!(
            SettingsStore::new(&path).load(),
            Err(SettingsError::Corrupt { .. })
        ));
    }

    #[test]
    fn load_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.toml");
        fs::write(&path, "stop_count = 9\n").unwrap();
        assert!(matches!(
            SettingsStore::new(&path).load(),
            Err(SettingsError::Validation(_))
        ));
    }

    #[test]
    fn stock_settings_roundtrips_to_defaults() {
        let settings = parse_settings(stock_settings_toml()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn settings_serialize_back_to_toml() {
        let text = toml::to_string_pretty(&Settings::default()).unwrap();
        assert_eq!(parse_settings(&text).unwrap(), Settings::default());
    }
}
