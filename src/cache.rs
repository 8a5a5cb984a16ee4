//! Palette cache for repeated runs against the same wallpaper.
//!
//! Palette extraction is the slow part of a run: it decodes the whole image
//! or shells out to an external tool. This module lets a run skip it when
//! the source image hasn't changed since the palette was produced.
//!
//! # Design
//!
//! ## Cache records
//!
//! Each source image path maps to a [`CacheRecord`]:
//!
//! - **`fingerprint`**: SHA-256 of the image contents.
//! - **`modified`**: the image's modification time, in nanoseconds since
//!   the Unix epoch.
//!
//! A hit requires **both** to match the image as it is now. Timestamps alone
//! are unreliable (copy/restore tools reset them in either direction while
//! keeping content), and a changed fingerprint under an unchanged timestamp
//! must still regenerate. Because a timestamp mismatch already decides the
//! outcome, it is checked first and the file is only hashed when the
//! timestamps agree.
//!
//! ## Palette storage
//!
//! Palettes are **content-addressed**: the document for an image lives at
//! `palettes/<fingerprint>.json`. Switching back to a previous wallpaper
//! finds its palette again, and a record can never point at the palette of
//! a different image.
//!
//! ## Storage
//!
//! The records live in `<cache_dir>/cache.json`. A missing, corrupt or
//! older-version file loads as an empty cache; the worst outcome is one
//! redundant extraction.
//!
//! Every update prunes the cache: records whose image no longer exists are
//! dropped, and palette files no remaining record refers to are deleted.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};

/// Name of the record file within the cache directory.
const CACHE_FILENAME: &str = "cache.json";

/// Subdirectory holding content-addressed palette documents.
const PALETTE_DIR: &str = "palettes";

/// Version of the record file format. Bump this to invalidate all
/// existing caches when the format or fingerprint computation changes.
const CACHE_VERSION: u32 = 1;

/// Fingerprint and timestamp of a source image at the time its palette
/// was produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheRecord {
    pub fingerprint: String,
    pub modified: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    entries: BTreeMap<String, CacheRecord>,
}

impl CacheFile {
    fn empty() -> Self {
        Self {
            version: CACHE_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

/// Decides whether a stored palette is still valid for a source image.
#[derive(Debug)]
pub struct CacheGuard {
    dir: PathBuf,
    file: CacheFile,
}

impl CacheGuard {
    /// An empty cache rooted at `dir` (used for `force` runs and first runs).
    pub fn empty(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            file: CacheFile::empty(),
        }
    }

    /// Load from the cache directory. Returns an empty cache if the file
    /// doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let content = match fs::read_to_string(dir.join(CACHE_FILENAME)) {
            Ok(c) => c,
            Err(_) => return Self::empty(dir),
        };
        let file: CacheFile = match serde_json::from_str(&content) {
            Ok(f) => f,
            Err(e) => {
                debug!("discarding unreadable cache: {e}");
                return Self::empty(dir);
            }
        };
        if file.version != CACHE_VERSION {
            return Self::empty(dir);
        }
        Self { dir, file }
    }

    /// Default location: `$XDG_CACHE_HOME/hyprtheme`.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|d| d.join(crate::settings::APP_DIR))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save records to the cache directory.
    pub fn save(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(&self.file)?;
        fs::write(self.dir.join(CACHE_FILENAME), json)
    }

    /// The stored record for an image, if any.
    pub fn record(&self, image: &Path) -> Option<&CacheRecord> {
        self.file.entries.get(&cache_key(image))
    }

    /// True only if the image's current timestamp and fingerprint both
    /// equal the record's. Unreadable images are never valid.
    pub fn is_valid(&self, image: &Path, record: &CacheRecord) -> bool {
        match modified_timestamp(image) {
            Ok(modified) if modified == record.modified => {}
            Ok(_) => {
                debug!(image = %image.display(), "timestamp changed");
                return false;
            }
            Err(_) => return false,
        }
        match hash_file(image) {
            Ok(fingerprint) if fingerprint == record.fingerprint => true,
            Ok(_) => {
                debug!(image = %image.display(), "content changed under same timestamp");
                false
            }
            Err(_) => false,
        }
    }

    /// Recompute the image's record and persist it.
    pub fn update(&mut self, image: &Path) -> io::Result<CacheRecord> {
        let record = fingerprint(image)?;
        self.file.entries.insert(cache_key(image), record.clone());
        self.prune();
        self.save()?;
        Ok(record)
    }

    /// Drop records of deleted images, then delete orphaned palette files.
    fn prune(&mut self) {
        self.file.entries.retain(|key, _| {
            let exists = Path::new(key).exists();
            if !exists {
                debug!(image = %key, "dropping record of missing image");
            }
            exists
        });

        let live: HashSet<&str> = self
            .file
            .entries
            .values()
            .map(|r| r.fingerprint.as_str())
            .collect();
        let Ok(listing) = fs::read_dir(self.dir.join(PALETTE_DIR)) else {
            return;
        };
        for entry in listing.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let orphaned = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| !live.contains(stem));
            if !orphaned {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed orphaned palette"),
                Err(e) => warn!(path = %path.display(), "could not remove orphaned palette: {e}"),
            }
        }
    }

    /// Where the palette produced for this record is stored.
    pub fn palette_path(&self, record: &CacheRecord) -> PathBuf {
        self.dir
            .join(PALETTE_DIR)
            .join(format!("{}.json", record.fingerprint))
    }
}

/// Records are keyed by absolute path so `./wall.png` and its absolute
/// spelling share an entry.
fn cache_key(image: &Path) -> String {
    fs::canonicalize(image)
        .unwrap_or_else(|_| image.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// Compute a fresh record for an image.
pub fn fingerprint(image: &Path) -> io::Result<CacheRecord> {
    Ok(CacheRecord {
        modified: modified_timestamp(image)?,
        fingerprint: hash_file(image)?,
    })
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// Modification time in nanoseconds since the Unix epoch. Pre-epoch times
/// are negative.
pub fn modified_timestamp(path: &Path) -> io::Result<i64> {
    let modified = fs::metadata(path)?.modified()?;
    let nanos = match modified.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_nanos()),
        Err(before) => i64::try_from(before.duration().as_nanos()).map(|n| -n),
    };
    nanos.map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "timestamp out of range"))
}
