//! Named color roles produced by an extractor.
//!
//! A [`PaletteDocument`] maps role names (`accent`, `secondary`, `surface`,
//! ...) to hex colors. Order is significant: when the settings don't name
//! which roles to use, the gradient takes the first roles in document order.
//!
//! Documents are written once per source image and never merged. A new
//! extraction supersedes the previous document entirely.

use crate::color::{ColorError, Rgb};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Role reserved for the background/inactive color. Never picked as a
/// gradient stop implicitly.
pub const SURFACE_ROLE: &str = "surface";

#[derive(Error, Debug)]
pub enum PaletteError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("palette document must be a JSON object")]
    NotAnObject,
    #[error("role {role:?}: {source}")]
    Color { role: String, source: ColorError },
}

/// Ordered role → color mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaletteDocument {
    entries: Vec<(String, Rgb)>,
}

impl PaletteDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a role. Re-inserting an existing role keeps its original position.
    pub fn insert(&mut self, role: impl Into<String>, color: Rgb) {
        let role = role.into();
        match self.entries.iter_mut().find(|(r, _)| *r == role) {
            Some(entry) => entry.1 = color,
            None => self.entries.push((role, color)),
        }
    }

    pub fn get(&self, role: &str) -> Option<Rgb> {
        self.entries
            .iter()
            .find(|(r, _)| r == role)
            .map(|(_, c)| *c)
    }

    /// Role names in document order.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(r, _)| r.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Rgb)> {
        self.entries.iter().map(|(r, c)| (r.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse extractor output.
    ///
    /// Top-level `#`-prefixed string values that decode as hex colors
    /// become roles.
    /// Nested objects are flattened one level (`{"colors": {"accent": ..}}`
    /// yields role `accent`), which covers the common extractor layouts.
    /// Everything else (wallpaper path, alpha, version numbers) is metadata
    /// and ignored.
    pub fn from_extractor_json(json: &str) -> Result<Self, PaletteError> {
        let value: Value = serde_json::from_str(json)?;
        let Value::Object(map) = value else {
            return Err(PaletteError::NotAnObject);
        };
        let mut doc = Self::new();
        collect_roles(&map, &mut doc);
        for nested in map.values().filter_map(Value::as_object) {
            collect_roles(nested, &mut doc);
        }
        Ok(doc)
    }

    /// Load a document previously written by [`save`](Self::save).
    ///
    /// Unlike extractor output, every value must be a valid color.
    pub fn load(path: &Path) -> Result<Self, PaletteError> {
        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        let Value::Object(map) = value else {
            return Err(PaletteError::NotAnObject);
        };
        let mut doc = Self::new();
        for (role, v) in &map {
            let hex = v.as_str().unwrap_or_default();
            let color = Rgb::from_hex(hex).map_err(|source| PaletteError::Color {
                role: role.clone(),
                source,
            })?;
            doc.insert(role.clone(), color);
        }
        Ok(doc)
    }

    pub fn save(&self, path: &Path) -> Result<(), PaletteError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(role, c)| (role.clone(), Value::String(c.to_hex())))
            .collect();
        serde_json::to_string_pretty(&Value::Object(map))
    }
}

fn collect_roles(map: &Map<String, Value>, doc: &mut PaletteDocument) {
    for (role, value) in map {
        // Bare digits like "100" are metadata, not colors
        let hex = value.as_str().filter(|s| s.starts_with('#'));
        if let Some(color) = hex.and_then(|s| Rgb::from_hex(s).ok()) {
            doc.insert(role.clone(), color);
        }
    }
}
