//! Color math: RGB ↔ HSL conversion, hue-aware interpolation, and the
//! serializers each target syntax needs.
//!
//! All conversions operate on normalized channels in `[0, 1]`. Hue is a
//! fraction of a full turn, always wrapped into `[0, 1)`, so `0.0` and `1.0`
//! both denote red and only `0.0` is ever produced.
//!
//! ## Interpolation
//!
//! Blending happens in HSL rather than RGB. An RGB average of green and blue
//! is a murky teal at half brightness; the HSL midpoint is a fully saturated
//! cyan. Hue is interpolated along the **shortest arc**: going from hue
//! `0.95` to `0.05` passes through `0.0`, never through `0.5`.
//!
//! ```text
//! raw  = h2 - h1
//! arc  = raw - 1   if raw >  0.5
//!        raw + 1   if raw < -0.5
//!        raw       otherwise
//! h(t) = wrap(h1 + arc * t)
//! ```

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ColorError {
    #[error("invalid hex color: {0:?}")]
    InvalidHex(String),
}

/// An opaque 8-bit RGB triple. Palette roles decode into this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Hue, saturation and lightness, each normalized to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

/// An RGB color with an 8-bit alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`, `rrggbb`, `#rgb` or `rgb` (case-insensitive).
    ///
    /// An 8-digit `#rrggbbaa` form is accepted and its alpha discarded;
    /// extractors sometimes emit it for fully opaque colors.
    pub fn from_hex(input: &str) -> Result<Self, ColorError> {
        let digits = input.trim();
        let digits = digits.strip_prefix('#').unwrap_or(digits);
        let invalid = || ColorError::InvalidHex(input.to_string());
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        match digits.len() {
            3 => {
                let expand = |i: usize| channel(&digits[i..i + 1].repeat(2));
                Ok(Self::new(expand(0)?, expand(1)?, expand(2)?))
            }
            6 | 8 => Ok(Self::new(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            _ => Err(invalid()),
        }
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn to_hsl(self) -> Hsl {
        rgb_to_hsl(
            f64::from(self.r) / 255.0,
            f64::from(self.g) / 255.0,
            f64::from(self.b) / 255.0,
        )
    }

    pub fn from_hsl(hsl: Hsl) -> Self {
        let (r, g, b) = hsl_to_rgb(hsl);
        Self::new(to_channel(r), to_channel(g), to_channel(b))
    }

    /// Attach an alpha given as a fraction in `[0, 1]` (clamped).
    pub fn with_alpha(self, alpha: f64) -> Color {
        Color {
            r: self.r,
            g: self.g,
            b: self.b,
            a: to_channel(alpha),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Color {
    pub fn rgb(self) -> Rgb {
        Rgb::new(self.r, self.g, self.b)
    }

    /// Alpha as a fraction in `[0, 1]`.
    pub fn alpha(self) -> f64 {
        f64::from(self.a) / 255.0
    }

    /// Hyprland color literal: `rgba(rrggbbaa)`.
    pub fn to_hyprland(self) -> String {
        format!(
            "rgba({:02x}{:02x}{:02x}{:02x})",
            self.r, self.g, self.b, self.a
        )
    }

    /// CSS functional notation: `rgba(r, g, b, 0.60)`.
    pub fn to_css(self) -> String {
        format!(
            "rgba({}, {}, {}, {:.2})",
            self.r,
            self.g,
            self.b,
            self.alpha()
        )
    }

    /// `#rrggbbaa`, understood by rasi and most CSS-like syntaxes.
    pub fn to_hex_rgba(self) -> String {
        format!(
            "#{:02x}{:02x}{:02x}{:02x}",
            self.r, self.g, self.b, self.a
        )
    }
}

fn to_channel(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Wrap a hue into `[0, 1)`.
fn wrap_hue(h: f64) -> f64 {
    let w = h.rem_euclid(1.0);
    // rem_euclid rounds tiny negatives up to exactly 1.0
    if w >= 1.0 { 0.0 } else { w }
}

/// Convert normalized RGB to HSL. Achromatic input yields `h = 0, s = 0`.
pub fn rgb_to_hsl(r: f64, g: f64, b: f64) -> Hsl {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    if max == min {
        return Hsl { h: 0.0, s: 0.0, l };
    }

    let d = max - min;
    let s = if l <= 0.5 {
        d / (max + min)
    } else {
        d / (2.0 - max - min)
    };
    let sector = if max == r {
        (g - b) / d
    } else if max == g {
        2.0 + (b - r) / d
    } else {
        4.0 + (r - g) / d
    };
    Hsl {
        h: wrap_hue(sector / 6.0),
        s,
        l,
    }
}

/// Convert HSL back to normalized RGB.
pub fn hsl_to_rgb(hsl: Hsl) -> (f64, f64, f64) {
    let Hsl { h, s, l } = hsl;
    if s == 0.0 {
        return (l, l, l);
    }
    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;
    (
        hue_channel(m1, m2, h + 1.0 / 3.0),
        hue_channel(m1, m2, h),
        hue_channel(m1, m2, h - 1.0 / 3.0),
    )
}

fn hue_channel(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = wrap_hue(hue);
    if hue < 1.0 / 6.0 {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < 2.0 / 3.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        m1
    }
}

/// Signed shortest distance from hue `from` to hue `to`, in `[-0.5, 0.5]`.
pub fn hue_arc(from: f64, to: f64) -> f64 {
    let raw = to - from;
    if raw > 0.5 {
        raw - 1.0
    } else if raw < -0.5 {
        raw + 1.0
    } else {
        raw
    }
}

/// Interpolate between two HSL colors at `t ∈ [0, 1]`.
///
/// Lightness and saturation are linear; hue follows the shortest arc and
/// is wrapped back into `[0, 1)`.
pub fn interpolate(from: Hsl, to: Hsl, t: f64) -> Hsl {
    Hsl {
        h: wrap_hue(from.h + hue_arc(from.h, to.h) * t),
        s: from.s + (to.s - from.s) * t,
        l: from.l + (to.l - from.l) * t,
    }
}

/// [`interpolate`] lifted to 8-bit RGB.
pub fn blend(from: Rgb, to: Rgb, t: f64) -> Rgb {
    Rgb::from_hsl(interpolate(from.to_hsl(), to.to_hsl(), t))
}
