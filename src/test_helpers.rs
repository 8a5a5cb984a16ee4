//! Shared test utilities for the hyprtheme test suite.
//!
//! Builders for palettes, themes and small generated images, plus a
//! counting [`PaletteExtractor`] mock.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let pal = palette(&[("accent", "#ff0000"), ("surface", "#101010")]);
//! write_png(&tmp.path().join("wall.png"), 16, 16, |x, _| {
//!     if x < 8 { [255, 0, 0] } else { [16, 16, 16] }
//! });
//! ```

use crate::color::Rgb;
use crate::extract::{ExtractionError, PaletteExtractor};
use crate::gradient::RenderedTheme;
use crate::palette::PaletteDocument;
use std::cell::Cell;
use std::path::Path;

// =========================================================================
// Builders
// =========================================================================

/// Palette from `(role, hex)` pairs, in order.
pub fn palette(entries: &[(&str, &str)]) -> PaletteDocument {
    let mut doc = PaletteDocument::new();
    for (role, hex) in entries {
        doc.insert(*role, Rgb::from_hex(hex).unwrap());
    }
    doc
}

/// Red → blue gradient over a dark surface, fully opaque except the
/// inactive color (alpha 0.6).
pub fn sample_theme() -> RenderedTheme {
    RenderedTheme {
        active: vec![
            Rgb::new(255, 0, 0).with_alpha(1.0),
            Rgb::new(0, 0, 255).with_alpha(1.0),
        ],
        inactive: Rgb::new(0x20, 0x20, 0x20).with_alpha(0.6),
        accent: Rgb::new(255, 0, 0),
        angle: 45,
    }
}

/// Write a `width`×`height` RGB PNG whose pixels come from `pixel(x, y)`.
pub fn write_png(path: &Path, width: u32, height: u32, pixel: impl Fn(u32, u32) -> [u8; 3]) {
    let img = image::RgbImage::from_fn(width, height, |x, y| image::Rgb(pixel(x, y)));
    img.save(path).unwrap();
}

// =========================================================================
// Mocks
// =========================================================================

/// Extractor returning a fixed palette (or failing), counting calls.
pub struct MockExtractor {
    result: Option<PaletteDocument>,
    calls: Cell<usize>,
}

impl MockExtractor {
    pub fn returning(doc: PaletteDocument) -> Self {
        Self {
            result: Some(doc),
            calls: Cell::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: None,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl PaletteExtractor for MockExtractor {
    fn name(&self) -> &str {
        "mock"
    }

    fn extract(&self, _image: &Path) -> Result<PaletteDocument, ExtractionError> {
        self.calls.set(self.calls.get() + 1);
        self.result.clone().ok_or(ExtractionError::Empty)
    }
}
