//! Palette extraction: image → named color roles.
//!
//! The rest of the crate only depends on the [`PaletteExtractor`] contract:
//! given an image path, return a [`PaletteDocument`] or an
//! [`ExtractionError`]. Two strategies ship with the crate:
//!
//! | Strategy | How |
//! |---|---|
//! | [`CommandExtractor`] | runs an external program, parses its JSON stdout |
//! | [`BuiltinExtractor`] | decodes the image with the `image` crate and buckets pixels |
//!
//! Fallback is explicit: an [`ExtractorChain`] tries its strategies in order
//! and returns the first success.
//!
//! An external program that never exits blocks the run. Timeouts are the
//! caller's job (e.g. `timeout 30 hyprtheme run`).

use crate::color::{Hsl, Rgb};
use crate::palette::{PaletteDocument, PaletteError, SURFACE_ROLE};
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("unparsable palette: {0}")]
    Parse(#[from] PaletteError),
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("extractor produced no color roles")]
    Empty,
    #[error("no extractor configured")]
    NoStrategy,
}

/// Maps an image to a set of named color roles.
pub trait PaletteExtractor {
    /// Short name for logs and run summaries.
    fn name(&self) -> &str;

    fn extract(&self, image: &Path) -> Result<PaletteDocument, ExtractionError>;
}

// ============================================================================
// External command
// ============================================================================

/// Runs `program args...` and parses its stdout as a palette document.
///
/// `{image}` inside any argument is replaced by the image path. When no
/// argument contains the placeholder, the path is appended.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
}

impl CommandExtractor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// The argument list for a given image.
    pub fn command_args(&self, image: &Path) -> Vec<String> {
        let image = image.to_string_lossy();
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace("{image}", &image))
            .collect();
        if !self.args.iter().any(|a| a.contains("{image}")) {
            args.push(image.into_owned());
        }
        args
    }
}

impl PaletteExtractor for CommandExtractor {
    fn name(&self) -> &str {
        &self.program
    }

    fn extract(&self, image: &Path) -> Result<PaletteDocument, ExtractionError> {
        let args = self.command_args(image);
        debug!(program = %self.program, ?args, "running extractor");
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| ExtractionError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(ExtractionError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let doc = PaletteDocument::from_extractor_json(&String::from_utf8_lossy(&output.stdout))?;
        if doc.is_empty() {
            return Err(ExtractionError::Empty);
        }
        Ok(doc)
    }
}

// ============================================================================
// Built-in extractor
// ============================================================================

/// Pure-Rust extractor: no external tools required.
///
/// The image is downscaled to a thumbnail, pixels are grouped into buckets
/// of similar color (5 bits per channel), and each bucket is represented by
/// the mean of its pixels. Roles are then assigned from the buckets:
///
/// - `accent`, `secondary`, `tertiary`: the most populous *colorful*
///   buckets (population weighted by saturation), preferring distinct hues
/// - `surface`: the darkest of the dominant buckets
/// - `foreground`: the lightest of the dominant buckets
#[derive(Debug, Clone)]
pub struct BuiltinExtractor {
    sample_size: u32,
}

impl Default for BuiltinExtractor {
    fn default() -> Self {
        Self { sample_size: 96 }
    }
}

/// Buckets considered "dominant" for surface/foreground selection.
const DOMINANT_BUCKETS: usize = 8;

/// Minimum hue distance between accent roles when enough buckets exist.
const MIN_HUE_DISTANCE: f64 = 0.08;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    color: Rgb,
    hsl: Hsl,
    population: u32,
}

impl Bucket {
    fn score(&self) -> f64 {
        // Near-black and near-white buckets make poor accents
        let usable = if (0.12..=0.92).contains(&self.hsl.l) { 1.0 } else { 0.1 };
        f64::from(self.population) * (self.hsl.s + 0.05) * usable
    }
}

impl BuiltinExtractor {
    pub fn new(sample_size: u32) -> Self {
        Self {
            sample_size: sample_size.max(1),
        }
    }

    fn buckets(&self, image: &Path) -> Result<Vec<Bucket>, ExtractionError> {
        let img = image::open(image)?;
        // Only ever downscale; upscaling would invent blended colors
        let img = if img.width() > self.sample_size || img.height() > self.sample_size {
            img.thumbnail(self.sample_size, self.sample_size)
        } else {
            img
        };
        let thumb = img.to_rgb8();

        let mut sums: HashMap<(u8, u8, u8), (u64, u64, u64, u32)> = HashMap::new();
        for px in thumb.pixels() {
            let [r, g, b] = px.0;
            let entry = sums.entry((r >> 3, g >> 3, b >> 3)).or_default();
            entry.0 += u64::from(r);
            entry.1 += u64::from(g);
            entry.2 += u64::from(b);
            entry.3 += 1;
        }

        let mut buckets: Vec<Bucket> = sums
            .into_values()
            .map(|(r, g, b, n)| {
                let mean = |sum: u64| (sum / u64::from(n)) as u8;
                let color = Rgb::new(mean(r), mean(g), mean(b));
                Bucket {
                    color,
                    hsl: color.to_hsl(),
                    population: n,
                }
            })
            .collect();
        // Deterministic order regardless of hash iteration
        buckets.sort_by(|a, b| {
            b.population
                .cmp(&a.population)
                .then_with(|| a.color.to_hex().cmp(&b.color.to_hex()))
        });
        Ok(buckets)
    }
}

impl PaletteExtractor for BuiltinExtractor {
    fn name(&self) -> &str {
        "builtin"
    }

    fn extract(&self, image: &Path) -> Result<PaletteDocument, ExtractionError> {
        let buckets = self.buckets(image)?;
        let doc = assign_roles(&buckets);
        if doc.is_empty() {
            return Err(ExtractionError::Empty);
        }
        Ok(doc)
    }
}

fn assign_roles(buckets: &[Bucket]) -> PaletteDocument {
    let mut doc = PaletteDocument::new();
    if buckets.is_empty() {
        return doc;
    }

    let mut by_score: Vec<&Bucket> = buckets.iter().collect();
    by_score.sort_by(|a, b| b.score().total_cmp(&a.score()));

    let mut picked: Vec<&Bucket> = Vec::new();
    for &candidate in &by_score {
        if picked.len() == 3 {
            break;
        }
        let distinct = picked.iter().all(|p| {
            crate::color::hue_arc(p.hsl.h, candidate.hsl.h).abs() >= MIN_HUE_DISTANCE
        });
        if distinct {
            picked.push(candidate);
        }
    }
    // Not enough distinct hues: fill up with the next best buckets
    for &candidate in &by_score {
        if picked.len() == 3 {
            break;
        }
        if !picked.iter().any(|p| std::ptr::eq(*p, candidate)) {
            picked.push(candidate);
        }
    }

    for (role, bucket) in ["accent", "secondary", "tertiary"].iter().zip(&picked) {
        doc.insert(*role, bucket.color);
    }

    let dominant = &buckets[..buckets.len().min(DOMINANT_BUCKETS)];
    if let Some(dark) = dominant.iter().min_by(|a, b| a.hsl.l.total_cmp(&b.hsl.l)) {
        doc.insert(SURFACE_ROLE, dark.color);
    }
    if let Some(light) = dominant.iter().max_by(|a, b| a.hsl.l.total_cmp(&b.hsl.l)) {
        doc.insert("foreground", light.color);
    }
    doc
}

// ============================================================================
// Fallback chain
// ============================================================================

/// Ordered list of strategies; the first success wins.
#[derive(Default)]
pub struct ExtractorChain {
    strategies: Vec<Box<dyn PaletteExtractor>>,
}

impl ExtractorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, strategy: impl PaletteExtractor + 'static) {
        self.strategies.push(Box::new(strategy));
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Chain described by the `[extractor]` settings: the configured
    /// command first, then the built-in extractor if enabled.
    pub fn from_settings(settings: &crate::settings::ExtractorSettings) -> Self {
        let mut chain = Self::new();
        if let Some(command) = &settings.command {
            chain.push(CommandExtractor::new(command.clone(), settings.args.clone()));
        }
        if settings.builtin_fallback {
            chain.push(BuiltinExtractor::default());
        }
        chain
    }
}

impl PaletteExtractor for ExtractorChain {
    fn name(&self) -> &str {
        "chain"
    }

    /// Returns the last strategy's error when all fail.
    fn extract(&self, image: &Path) -> Result<PaletteDocument, ExtractionError> {
        let mut last = ExtractionError::NoStrategy;
        for strategy in &self.strategies {
            match strategy.extract(image) {
                Ok(doc) => {
                    debug!(strategy = strategy.name(), roles = doc.len(), "palette extracted");
                    return Ok(doc);
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), "extraction failed: {e}");
                    last = e;
                }
            }
        }
        Err(last)
    }
}
