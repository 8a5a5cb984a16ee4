//! Gradient construction: palette roles → rendered theme.
//!
//! ## Stop selection
//!
//! `stop_count` role names are taken from `settings.keys` in order. With no
//! keys configured, the first roles of the palette document are used,
//! skipping the reserved `surface` role. Keys naming roles the palette
//! doesn't have are skipped with a warning, and later keys fill their slot.
//!
//! ## Fancy mode
//!
//! With `fancy = true`, every stop except the first and last is replaced by
//! the HSL midpoint of itself and its successor. The output has exactly as
//! many colors as there are stops:
//!
//! ```text
//! stops:    s0        s1        s2        s3
//! output:   s0   mid(s1,s2) mid(s2,s3)    s3
//! ```

use crate::color::{Color, Rgb, blend};
use crate::palette::{PaletteDocument, SURFACE_ROLE};
use crate::settings::Settings;
use thiserror::Error;
use tracing::warn;

/// Inactive color used when the palette has no `surface` role.
pub const NEUTRAL_GRAY: Rgb = Rgb::new(0x59, 0x59, 0x59);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ThemeError {
    #[error("invalid palette: {0}")]
    InvalidPalette(String),
}

/// Colors for one pipeline run, ready to be written into target configs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTheme {
    /// Active-state gradient, alpha applied.
    pub active: Vec<Color>,
    /// Inactive-state color (surface), alpha applied.
    pub inactive: Color,
    /// First stop without alpha, for consumers that want a plain color.
    pub accent: Rgb,
    /// Gradient angle in degrees.
    pub angle: u16,
}

/// Pick the role names that become gradient stops.
pub fn select_stops(palette: &PaletteDocument, settings: &Settings) -> Vec<String> {
    let count = usize::from(settings.stop_count);
    if settings.keys.is_empty() {
        return palette
            .roles()
            .filter(|role| *role != SURFACE_ROLE)
            .take(count)
            .map(str::to_string)
            .collect();
    }
    settings
        .keys
        .iter()
        .filter(|key| {
            let present = palette.get(key).is_some();
            if !present {
                warn!(role = %key, "palette has no such role; skipping stop");
            }
            present
        })
        .take(count)
        .cloned()
        .collect()
}

/// Blend interior stops with their successor at `t = 0.5`.
pub fn smooth(stops: &[Rgb]) -> Vec<Rgb> {
    let n = stops.len();
    stops
        .iter()
        .enumerate()
        .map(|(i, &stop)| {
            if i == 0 || i + 1 == n {
                stop
            } else {
                blend(stop, stops[i + 1], 0.5)
            }
        })
        .collect()
}

/// Build the theme for a palette.
///
/// Fails with [`ThemeError::InvalidPalette`] when the palette is empty or
/// none of the selected roles exist.
pub fn build(palette: &PaletteDocument, settings: &Settings) -> Result<RenderedTheme, ThemeError> {
    if palette.is_empty() {
        return Err(ThemeError::InvalidPalette("palette has no roles".into()));
    }
    let stops: Vec<Rgb> = select_stops(palette, settings)
        .iter()
        .filter_map(|role| palette.get(role))
        .collect();
    let Some(&accent) = stops.first() else {
        return Err(ThemeError::InvalidPalette(
            "none of the selected roles exist in the palette".into(),
        ));
    };

    let colors = if settings.fancy { smooth(&stops) } else { stops };
    let surface = palette.get(SURFACE_ROLE).unwrap_or(NEUTRAL_GRAY);

    Ok(RenderedTheme {
        active: colors
            .into_iter()
            .map(|c| c.with_alpha(settings.alpha_active))
            .collect(),
        inactive: surface.with_alpha(settings.alpha_inactive),
        accent,
        angle: settings.gradient_angle,
    })
}
