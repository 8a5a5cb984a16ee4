//! Config synthesis: rewriting the managed block of each target file.
//!
//! For every target the synthesizer:
//!
//! 1. reads the file (a missing file counts as empty),
//! 2. splits it into prefix / managed block / suffix ([`block::split`]),
//! 3. regenerates the block from the [`RenderedTheme`] using the target's
//!    declaration mapping and [`Syntax`],
//! 4. writes `prefix + block + suffix` atomically, after taking a backup.
//!
//! Files without a block get one appended. Content outside the block is
//! never altered or reordered, so repeated runs with the same theme produce
//! byte-identical files. When the synthesized text equals the current file
//! nothing is written, backed up, or reloaded.
//!
//! Writes go to a temporary file in the same directory which is then
//! renamed over the target; a consumer reloading mid-run sees either the
//! old or the new file, never a truncated one. Symlinked configs (dotfile
//! managers) are resolved so the link itself survives.

pub mod block;
pub mod syntax;

use crate::backup::BackupManager;
use crate::gradient::RenderedTheme;
use crate::target::Target;
use block::BlockError;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use syntax::{Declaration, Syntax};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SynthError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed managed block: {0}")]
    Block(#[from] BlockError),
    #[error("{} is read-only", .0.display())]
    ReadOnly(PathBuf),
    #[error("backup failed: {0}")]
    Backup(io::Error),
}

/// What happened to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The file already held this exact theme.
    Unchanged,
    /// The file was rewritten. `backup` is `None` when the file didn't exist.
    Written { backup: Option<PathBuf> },
}

/// Regenerate the managed block of `current`.
///
/// The block follows the file's line endings: CRLF when the first line of
/// `current` ends in `\r\n`, LF otherwise.
pub fn synthesize(
    current: &str,
    syntax: &dyn Syntax,
    decls: &[Declaration],
) -> Result<String, BlockError> {
    let mut rendered = syntax.render_block(decls);
    if uses_crlf(current) {
        rendered = rendered.replace('\n', "\r\n");
    }
    block::replace(
        current,
        &syntax.start_marker(),
        &syntax.end_marker(),
        &rendered,
    )
}

fn uses_crlf(content: &str) -> bool {
    content
        .find('\n')
        .is_some_and(|i| content[..i].ends_with('\r'))
}

/// Rewrites target files, snapshotting each before its first write.
pub struct ConfigSynthesizer<'a> {
    backups: &'a mut BackupManager,
}

impl<'a> ConfigSynthesizer<'a> {
    pub fn new(backups: &'a mut BackupManager) -> Self {
        Self { backups }
    }

    pub fn apply(
        &mut self,
        target: &Target,
        theme: &RenderedTheme,
    ) -> Result<ApplyOutcome, SynthError> {
        let path = resolve_link(&target.path);
        let existing = match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let decls = target.kind.declarations(theme);
        let updated = synthesize(
            existing.as_deref().unwrap_or_default(),
            target.kind.syntax(),
            &decls,
        )?;
        if existing.as_deref() == Some(updated.as_str()) {
            debug!(target_name = target.name(), "already up to date");
            return Ok(ApplyOutcome::Unchanged);
        }
        if is_read_only(&path) {
            return Err(SynthError::ReadOnly(path));
        }

        let backup = match existing {
            Some(_) => Some(
                self.backups
                    .snapshot(target.name(), &path)
                    .map_err(SynthError::Backup)?,
            ),
            None => None,
        };
        write_atomic(&path, updated.as_bytes())?;
        debug!(target_name = target.name(), path = %path.display(), "written");
        Ok(ApplyOutcome::Written { backup })
    }
}

/// Follow a symlink to the file it points at, if it resolves.
pub fn resolve_link(path: &Path) -> PathBuf {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}

fn is_read_only(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.permissions().readonly())
}

/// Replace `path` with `contents` via a sibling temp file and rename.
///
/// The replacement keeps the original file's permissions; a new file gets
/// the same mode a plain create would (0666 less the umask). Read-only
/// files are refused rather than replaced.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path).ok().map(|m| m.permissions());
    if permissions.as_ref().is_some_and(|p| p.readonly()) {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("{} is read-only", path.display()),
        ));
    }

    let mut tmp = match permissions {
        Some(_) => NamedTempFile::new_in(dir)?,
        None => new_file_in(dir)?,
    };
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    if let Some(perms) = permissions {
        tmp.as_file().set_permissions(perms)?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Temp file for a target that doesn't exist yet. Temp files default to
/// 0600; request 0666 and let the umask apply.
#[cfg(unix)]
fn new_file_in(dir: &Path) -> io::Result<NamedTempFile> {
    use std::os::unix::fs::PermissionsExt;
    tempfile::Builder::new()
        .permissions(fs::Permissions::from_mode(0o666))
        .tempfile_in(dir)
}

#[cfg(not(unix))]
fn new_file_in(dir: &Path) -> io::Result<NamedTempFile> {
    NamedTempFile::new_in(dir)
}
