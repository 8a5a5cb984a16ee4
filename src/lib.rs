//! # hyprtheme
//!
//! Derives a color theme from a wallpaper and writes it into the configs of
//! a Hyprland desktop: the compositor's window borders, the Waybar
//! stylesheet and the rofi launcher theme.
//!
//! # Architecture: One-Shot Pipeline
//!
//! Every invocation is a single pass, typically run by a wallpaper-change
//! hook:
//!
//! ```text
//! 1. Palette   image    →  role → color map   (cached by image fingerprint)
//! 2. Theme     palette  →  RenderedTheme      (gradient stops + alpha)
//! 3. Apply     theme    →  target configs     (managed block, backup, reload)
//! ```
//!
//! Nothing runs in the background. The settings file, the palette cache and
//! the backups are plain files the user can inspect or delete.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`settings`] | `settings.toml` loading, stock document, validation |
//! | [`cache`] | Image fingerprinting and content-addressed palette storage |
//! | [`palette`] | Ordered role → color document, extractor JSON parsing |
//! | [`extract`] | Palette extractors: external command, built-in quantizer, fallback chain |
//! | [`color`] | RGB/HSL conversion, interpolation, per-syntax color literals |
//! | [`gradient`] | Stop selection and HSL smoothing into a [`gradient::RenderedTheme`] |
//! | [`target`] | Built-in targets, default paths, theme → declaration mappings |
//! | [`synth`] | Managed-block splicing, syntax families, atomic writes |
//! | [`backup`] | Timestamped snapshots, retention, restore |
//! | [`notify`] | Reload commands and signals for running consumers |
//! | [`pipeline`] | Orchestrates a run; abort vs per-target error policy |
//! | [`output`] | CLI output formatting of run and restore reports |
//!
//! # Design Decisions
//!
//! ## Managed Blocks, Not Generated Files
//!
//! Users keep hand-written configs. hyprtheme owns only the region between
//! its start and end markers and treats everything else as opaque bytes.
//! Files without a block get one appended; nothing else is ever inserted.
//!
//! ## Idempotent Runs
//!
//! The synthesized file is compared to the current one before writing. An
//! unchanged target is left alone entirely: no backup, no write, no reload.
//!
//! ## Abort Early, Then Isolate
//!
//! Everything that can fail without side effects runs before any target is
//! touched and aborts the run.
//! Once writing starts, each target succeeds or fails on its own.
//!
//! ## HSL Blending
//!
//! Fancy gradients blend neighbouring stops in HSL along the shortest hue
//! arc. Averaging in RGB pulls saturated pairs toward gray (green and blue
//! average to teal); HSL keeps them vivid (cyan).

pub mod backup;
pub mod cache;
pub mod color;
pub mod extract;
pub mod gradient;
pub mod notify;
pub mod output;
pub mod palette;
pub mod pipeline;
pub mod settings;
pub mod synth;
pub mod target;

#[cfg(test)]
pub(crate) mod test_helpers;
