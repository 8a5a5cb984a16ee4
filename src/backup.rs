//! Timestamped backups of target configs.
//!
//! Before a target file is first modified in a run, its current contents
//! are copied to:
//!
//! ```text
//! <backup_dir>/<target>/<file name>.<YYYYmmdd-HHMMSS-micros>-<seq>.bak
//! ```
//!
//! Names are fixed-width, so lexicographic order is chronological order;
//! `seq` disambiguates snapshots taken within the same microsecond. Each
//! target directory keeps at most `keep` snapshots (0 keeps everything).

use crate::synth::write_atomic;
use chrono::Local;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Upper bound on same-instant collisions before giving up.
const MAX_SEQUENCE: u32 = 100;

pub struct BackupManager {
    root: PathBuf,
    keep: usize,
    /// Source path → backup already taken during this run.
    taken: HashMap<PathBuf, PathBuf>,
}

impl BackupManager {
    pub fn new(root: impl Into<PathBuf>, keep: usize) -> Self {
        Self {
            root: root.into(),
            keep,
            taken: HashMap::new(),
        }
    }

    /// `$XDG_DATA_HOME/hyprtheme/backups`.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|d| d.join(crate::settings::APP_DIR).join("backups"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn target_dir(&self, target_name: &str) -> PathBuf {
        self.root.join(target_name)
    }

    /// Copy `path` into the target's backup directory.
    ///
    /// A file is snapshotted at most once per manager; later calls return
    /// the first snapshot so a run never backs up its own output.
    pub fn snapshot(&mut self, target_name: &str, path: &Path) -> io::Result<PathBuf> {
        if let Some(existing) = self.taken.get(path) {
            return Ok(existing.clone());
        }
        let dir = self.target_dir(target_name);
        fs::create_dir_all(&dir)?;

        let contents = fs::read(path)?;
        let file_name = file_name(path);
        let stamp = Local::now().format("%Y%m%d-%H%M%S-%6f").to_string();

        for seq in 0..MAX_SEQUENCE {
            let candidate = dir.join(format!("{file_name}.{stamp}-{seq:02}.bak"));
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(f) => f,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            };
            file.write_all(&contents)?;
            file.sync_all()?;
            debug!(target_name, backup = %candidate.display(), "backup written");

            self.taken.insert(path.to_path_buf(), candidate.clone());
            self.prune(target_name, &file_name);
            return Ok(candidate);
        }
        Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free backup name for {} at {stamp}", path.display()),
        ))
    }

    /// Every backup of `file_name` for a target, oldest first.
    pub fn list(&self, target_name: &str, file_name: &str) -> io::Result<Vec<PathBuf>> {
        let dir = self.target_dir(target_name);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let prefix = format!("{file_name}.");
        let mut backups: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".bak"))
            })
            .collect();
        backups.sort();
        Ok(backups)
    }

    pub fn latest(&self, target_name: &str, file_name: &str) -> io::Result<Option<PathBuf>> {
        Ok(self.list(target_name, file_name)?.pop())
    }

    /// Put the newest backup back in place of `path`.
    ///
    /// Returns the backup that was restored, or `None` when there is none.
    pub fn restore(&self, target_name: &str, path: &Path) -> io::Result<Option<PathBuf>> {
        let Some(backup) = self.latest(target_name, &file_name(path))? else {
            return Ok(None);
        };
        let contents = fs::read(&backup)?;
        write_atomic(path, &contents)?;
        debug!(target_name, backup = %backup.display(), "restored");
        Ok(Some(backup))
    }

    /// Delete the oldest backups beyond the retention limit.
    fn prune(&self, target_name: &str, file_name: &str) {
        if self.keep == 0 {
            return;
        }
        let backups = match self.list(target_name, file_name) {
            Ok(b) => b,
            Err(e) => {
                warn!(target_name, "could not list backups for pruning: {e}");
                return;
            }
        };
        let excess = backups.len().saturating_sub(self.keep);
        for old in &backups[..excess] {
            match fs::remove_file(old) {
                Ok(()) => debug!(backup = %old.display(), "pruned"),
                Err(e) => warn!(backup = %old.display(), "could not prune backup: {e}"),
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config".to_string())
}
