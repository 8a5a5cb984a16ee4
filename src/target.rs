//! Built-in targets and their theme → declaration mappings.
//!
//! Each target pairs a config file with a [`Syntax`] family and a fixed
//! mapping from [`RenderedTheme`] fields to declarations:
//!
//! | Target | Default file | Syntax | Reload |
//! |---|---|---|---|
//! | `hyprland` | `hypr/hyprland.conf` | [`KeyValue`] | `hyprctl reload` |
//! | `waybar` | `waybar/style.css` | [`DefineColor`] | `SIGUSR2` to `waybar` |
//! | `rofi` | `rofi/config.rasi` | [`BraceBlock`] | none (read at launch) |
//!
//! Default paths are relative to `$XDG_CONFIG_HOME`; `[paths]` in the
//! settings overrides them.

use crate::gradient::RenderedTheme;
use crate::notify::ReloadAction;
use crate::settings::Settings;
use crate::synth::syntax::{BraceBlock, Declaration, DefineColor, KeyValue, Syntax};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetKind {
    Hyprland,
    Waybar,
    Rofi,
}

impl TargetKind {
    /// All targets, in processing order.
    pub const ALL: [TargetKind; 3] = [TargetKind::Hyprland, TargetKind::Waybar, TargetKind::Rofi];

    pub fn name(self) -> &'static str {
        match self {
            TargetKind::Hyprland => "hyprland",
            TargetKind::Waybar => "waybar",
            TargetKind::Rofi => "rofi",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Path relative to the XDG config directory.
    pub fn default_relative_path(self) -> &'static str {
        match self {
            TargetKind::Hyprland => "hypr/hyprland.conf",
            TargetKind::Waybar => "waybar/style.css",
            TargetKind::Rofi => "rofi/config.rasi",
        }
    }

    pub fn enabled_by_default(self) -> bool {
        !matches!(self, TargetKind::Rofi)
    }

    pub fn syntax(self) -> &'static dyn Syntax {
        match self {
            TargetKind::Hyprland => &KeyValue,
            TargetKind::Waybar => &DefineColor,
            TargetKind::Rofi => &BraceBlock { selector: "*" },
        }
    }

    pub fn reload_action(self) -> ReloadAction {
        match self {
            TargetKind::Hyprland => ReloadAction::Command {
                program: "hyprctl",
                args: &["reload"],
            },
            TargetKind::Waybar => ReloadAction::Signal {
                process: "waybar",
                signal: "SIGUSR2",
            },
            TargetKind::Rofi => ReloadAction::None,
        }
    }

    /// The fixed theme → declaration mapping for this target.
    pub fn declarations(self, theme: &RenderedTheme) -> Vec<Declaration> {
        match self {
            TargetKind::Hyprland => hyprland_declarations(theme),
            TargetKind::Waybar => waybar_declarations(theme),
            TargetKind::Rofi => rofi_declarations(theme),
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn hyprland_declarations(theme: &RenderedTheme) -> Vec<Declaration> {
    let mut gradient: Vec<String> = theme.active.iter().map(|c| c.to_hyprland()).collect();
    // Hyprland only accepts an angle after two or more colors
    if gradient.len() > 1 {
        gradient.push(format!("{}deg", theme.angle));
    }
    let plain = theme.accent.to_hex();
    vec![
        Declaration::new("$theme_accent", format!("rgb({})", &plain[1..])),
        Declaration::new("$theme_inactive", theme.inactive.to_hyprland()),
        Declaration::new("general:col.active_border", gradient.join(" ")),
        Declaration::new("general:col.inactive_border", theme.inactive.to_hyprland()),
    ]
}

fn waybar_declarations(theme: &RenderedTheme) -> Vec<Declaration> {
    let mut decls = vec![
        Declaration::new("theme_accent", theme.accent.to_hex()),
        Declaration::new("theme_inactive", theme.inactive.to_css()),
    ];
    decls.extend(
        theme
            .active
            .iter()
            .enumerate()
            .map(|(i, c)| Declaration::new(format!("theme_active_{i}"), c.to_css())),
    );
    decls
}

fn rofi_declarations(theme: &RenderedTheme) -> Vec<Declaration> {
    let mut decls = vec![
        Declaration::new("theme-accent", theme.accent.to_hex()),
        Declaration::new("theme-inactive", theme.inactive.to_hex_rgba()),
    ];
    decls.extend(
        theme
            .active
            .iter()
            .enumerate()
            .map(|(i, c)| Declaration::new(format!("theme-active-{i}"), c.to_hex_rgba())),
    );
    decls
}

/// A target resolved against the settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub kind: TargetKind,
    pub path: PathBuf,
    pub enabled: bool,
}

impl Target {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Resolve every built-in target's path and enable flag.
///
/// `config_dir` is the base for default paths (normally
/// `$XDG_CONFIG_HOME`).
pub fn resolve_targets(settings: &Settings, config_dir: &std::path::Path) -> Vec<Target> {
    for name in settings.targets.keys().chain(settings.paths.keys()) {
        if TargetKind::from_name(name).is_none() {
            tracing::warn!(target_name = %name, "unknown target in settings; ignoring");
        }
    }
    TargetKind::ALL
        .into_iter()
        .map(|kind| Target {
            kind,
            path: settings
                .target_path(kind.name())
                .unwrap_or_else(|| config_dir.join(kind.default_relative_path())),
            enabled: settings.target_enabled(kind.name(), kind.enabled_by_default()),
        })
        .collect()
}
