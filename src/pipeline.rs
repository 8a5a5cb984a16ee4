//! One run: source image → palette → theme → target configs → reloads.
//!
//! ```text
//! image ──► CacheGuard ──hit──► palettes/<fp>.json ─┐
//!              │                                     ├─► gradient::build ─► per target:
//!              └─miss─► PaletteExtractor ──save──────┘        snapshot → write → notify
//! ```
//!
//! # Error policy
//!
//! Errors before the first target is touched abort the run with a
//! [`PipelineError`] and leave every file as it was: a missing source image,
//! a failed extraction, or a palette with no usable roles.
//!
//! Once targets are being written, a failure is local to its target. It is
//! recorded as [`TargetOutcome::Failed`] and the remaining targets are still
//! processed; targets already written stay written. A failed reload is only
//! noted in the report, since the config itself is already in place.
//!
//! Cache bookkeeping never fails a run. If the record or palette can't be
//! stored, the next run simply extracts again.

use crate::backup::BackupManager;
use crate::cache::CacheGuard;
use crate::extract::PaletteExtractor;
use crate::gradient::{self, RenderedTheme};
use crate::notify::ReloadNotifier;
use crate::palette::PaletteDocument;
use crate::settings::{APP_DIR, Settings};
use crate::synth::{ApplyOutcome, ConfigSynthesizer, resolve_link};
use crate::target::{Target, TargetKind, resolve_targets};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no source image given and no wallpaper configured")]
    NoSource,
    #[error("source image {} is missing or unreadable: {source}", path.display())]
    MissingSource { path: PathBuf, source: io::Error },
    #[error("invalid palette: {0}")]
    InvalidPalette(String),
}

/// Where a run reads and writes outside of the target configs themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dirs {
    /// Base for default target paths (`$XDG_CONFIG_HOME`).
    pub config: PathBuf,
    pub cache: PathBuf,
    pub backups: PathBuf,
}

impl Dirs {
    /// The XDG locations for the current user.
    pub fn from_environment() -> Option<Self> {
        Some(Self {
            config: dirs::config_dir()?,
            cache: CacheGuard::default_dir()?,
            backups: BackupManager::default_dir()?,
        })
    }

    /// All three under one root, for sandboxed runs.
    pub fn under(root: &Path) -> Self {
        Self {
            config: root.join("config"),
            cache: root.join("cache").join(APP_DIR),
            backups: root.join("data").join(APP_DIR).join("backups"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Source image; falls back to `settings.wallpaper`.
    pub image: Option<PathBuf>,
    /// Ignore the enabled flag and the palette cache.
    pub force: bool,
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// `enabled = false` and not forced; nothing was read or written.
    Disabled,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteSource {
    Cached,
    Extracted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    Updated {
        backup: Option<PathBuf>,
        notified: bool,
    },
    Unchanged,
    Disabled,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub name: String,
    pub path: PathBuf,
    pub outcome: TargetOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub status: RunStatus,
    pub image: Option<PathBuf>,
    pub palette: Option<PaletteSource>,
    pub theme: Option<RenderedTheme>,
    pub targets: Vec<TargetReport>,
}

impl RunReport {
    fn disabled() -> Self {
        Self {
            status: RunStatus::Disabled,
            image: None,
            palette: None,
            theme: None,
            targets: Vec::new(),
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    /// Targets that now hold the theme (written or already up to date).
    pub fn succeeded(&self) -> impl Iterator<Item = &TargetReport> {
        self.targets.iter().filter(|t| {
            matches!(
                t.outcome,
                TargetOutcome::Updated { .. } | TargetOutcome::Unchanged
            )
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = &TargetReport> {
        self.targets
            .iter()
            .filter(|t| matches!(t.outcome, TargetOutcome::Failed(_)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored { backup: PathBuf, notified: bool },
    NoBackup,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub name: String,
    pub path: PathBuf,
    pub outcome: RestoreOutcome,
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct Pipeline<E, N> {
    settings: Settings,
    dirs: Dirs,
    extractor: E,
    notifier: N,
}

impl<E: PaletteExtractor, N: ReloadNotifier> Pipeline<E, N> {
    pub fn new(settings: Settings, dirs: Dirs, extractor: E, notifier: N) -> Self {
        Self {
            settings,
            dirs,
            extractor,
            notifier,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn targets(&self) -> Vec<Target> {
        resolve_targets(&self.settings, &self.dirs.config)
    }

    pub fn run(&self, options: &RunOptions) -> Result<RunReport, PipelineError> {
        if !self.settings.enabled && !options.force {
            info!("theming disabled in settings; nothing to do");
            return Ok(RunReport::disabled());
        }

        let image = options
            .image
            .clone()
            .or_else(|| self.settings.wallpaper_path())
            .ok_or(PipelineError::NoSource)?;
        let missing = |source: io::Error| PipelineError::MissingSource {
            path: image.clone(),
            source,
        };
        let meta = File::open(&image)
            .and_then(|f| f.metadata())
            .map_err(missing)?;
        if !meta.is_file() {
            return Err(missing(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }

        let (palette, source) = self.palette_for(&image, options.force)?;
        let theme = gradient::build(&palette, &self.settings)
            .map_err(|e| PipelineError::InvalidPalette(e.to_string()))?;

        let mut backups = BackupManager::new(&self.dirs.backups, self.settings.backups.keep);
        let mut synth = ConfigSynthesizer::new(&mut backups);
        let targets = self
            .targets()
            .into_iter()
            .map(|target| {
                let outcome = self.apply_target(&mut synth, &target, &theme);
                TargetReport {
                    name: target.name().to_string(),
                    path: target.path,
                    outcome,
                }
            })
            .collect();

        Ok(RunReport {
            status: RunStatus::Completed,
            image: Some(image),
            palette: Some(source),
            theme: Some(theme),
            targets,
        })
    }

    /// Reuse the stored palette when the image is unchanged, extract otherwise.
    fn palette_for(
        &self,
        image: &Path,
        force: bool,
    ) -> Result<(PaletteDocument, PaletteSource), PipelineError> {
        let mut cache = CacheGuard::load(&self.dirs.cache);

        if !force {
            if let Some(record) = cache.record(image).cloned() {
                if cache.is_valid(image, &record) {
                    match PaletteDocument::load(&cache.palette_path(&record)) {
                        Ok(palette) if !palette.is_empty() => {
                            debug!(image = %image.display(), "palette cache hit");
                            return Ok((palette, PaletteSource::Cached));
                        }
                        Ok(_) => debug!("cached palette is empty; extracting"),
                        Err(e) => debug!("cached palette unusable: {e}"),
                    }
                }
            }
        }

        info!(image = %image.display(), extractor = self.extractor.name(), "extracting palette");
        let palette = self
            .extractor
            .extract(image)
            .map_err(|e| PipelineError::InvalidPalette(e.to_string()))?;
        if palette.is_empty() {
            return Err(PipelineError::InvalidPalette(
                "extractor produced no roles".into(),
            ));
        }

        match cache.update(image) {
            Ok(record) => {
                if let Err(e) = palette.save(&cache.palette_path(&record)) {
                    warn!("could not store palette in cache: {e}");
                }
            }
            Err(e) => warn!("could not update palette cache: {e}"),
        }
        Ok((palette, PaletteSource::Extracted))
    }

    fn apply_target(
        &self,
        synth: &mut ConfigSynthesizer<'_>,
        target: &Target,
        theme: &RenderedTheme,
    ) -> TargetOutcome {
        if !target.enabled {
            debug!(target_name = target.name(), "target disabled");
            return TargetOutcome::Disabled;
        }
        match synth.apply(target, theme) {
            Ok(ApplyOutcome::Unchanged) => TargetOutcome::Unchanged,
            Ok(ApplyOutcome::Written { backup }) => {
                let notified = self.notifier.notify(target.kind);
                info!(target_name = target.name(), notified, "target updated");
                TargetOutcome::Updated { backup, notified }
            }
            Err(e) => {
                warn!(target_name = target.name(), path = %target.path.display(), "{e}");
                TargetOutcome::Failed(e.to_string())
            }
        }
    }

    /// Copy the newest backup of each selected target back over its config.
    ///
    /// With `only = None` every enabled target is restored; naming a target
    /// restores it whether or not it is enabled.
    pub fn restore(&self, only: Option<TargetKind>) -> Vec<RestoreReport> {
        let backups = BackupManager::new(&self.dirs.backups, self.settings.backups.keep);
        self.targets()
            .into_iter()
            .filter(|t| match only {
                Some(kind) => t.kind == kind,
                None => t.enabled,
            })
            .map(|target| {
                let outcome = match backups.restore(target.name(), &resolve_link(&target.path)) {
                    Ok(Some(backup)) => RestoreOutcome::Restored {
                        backup,
                        notified: self.notifier.notify(target.kind),
                    },
                    Ok(None) => RestoreOutcome::NoBackup,
                    Err(e) => {
                        warn!(target_name = target.name(), "restore failed: {e}");
                        RestoreOutcome::Failed(e.to_string())
                    }
                };
                RestoreReport {
                    name: target.name().to_string(),
                    path: target.path,
                    outcome,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::tests::RecordingNotifier;
    use crate::test_helpers::{MockExtractor, palette};
    use std::fs;
    use tempfile::TempDir;

    fn sandbox(settings: Settings, extractor: MockExtractor) -> (TempDir, Pipeline<MockExtractor, RecordingNotifier>) {
        let tmp = TempDir::new().unwrap();
        let dirs = Dirs::under(tmp.path());
        for kind in TargetKind::ALL {
            let path = dirs.config.join(kind.default_relative_path());
            fs::create_dir_all(path.parent().unwrap()).unwrap();
        }
        let pipeline = Pipeline::new(settings, dirs, extractor, RecordingNotifier::default());
        (tmp, pipeline)
    }

    fn image(tmp: &TempDir) -> PathBuf {
        let path = tmp.path().join("wall.png");
        fs::write(&path, b"not decoded by the mock").unwrap();
        path
    }

    fn options(image: &Path) -> RunOptions {
        RunOptions {
            image: Some(image.to_path_buf()),
            force: false,
        }
    }

    fn two_roles() -> MockExtractor {
        MockExtractor::returning(palette(&[("accent", "#ff0000"), ("secondary", "#0000ff")]))
    }

    #[test]
    fn disabled_run_is_a_noop() {
        let settings = Settings {
            enabled: false,
            ..Settings::default()
        };
        let (_tmp, pipeline) = sandbox(settings, two_roles());
        let report = pipeline.run(&RunOptions::default()).unwrap();
        assert_eq!(report.status, RunStatus::Disabled);
        assert!(report.targets.is_empty());
        assert_eq!(pipeline.extractor().calls(), 0);
    }

    #[test]
    fn force_overrides_disabled() {
        let settings = Settings {
            enabled: false,
            ..Settings::default()
        };
        let (tmp, pipeline) = sandbox(settings, two_roles());
        let img = image(&tmp);
        let report = pipeline
            .run(&RunOptions {
                image: Some(img),
                force: true,
            })
            .unwrap();
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.succeeded().count(), 2);
    }

    #[test]
    fn second_run_hits_cache_and_changes_nothing() {
        let (tmp, pipeline) = sandbox(Settings::default(), two_roles());
        let img = image(&tmp);

        let first = pipeline.run(&options(&img)).unwrap();
        assert_eq!(first.palette, Some(PaletteSource::Extracted));
        assert_eq!(pipeline.notifier().calls.borrow().len(), 2);

        let second = pipeline.run(&options(&img)).unwrap();
        assert_eq!(second.palette, Some(PaletteSource::Cached));
        assert_eq!(pipeline.extractor().calls(), 1);
        assert!(second.targets.iter().all(|t| matches!(
            t.outcome,
            TargetOutcome::Unchanged | TargetOutcome::Disabled
        )));
        // No further reloads for unchanged files
        assert_eq!(pipeline.notifier().calls.borrow().len(), 2);
    }

    #[test]
    fn force_bypasses_cache() {
        let (tmp, pipeline) = sandbox(Settings::default(), two_roles());
        let img = image(&tmp);
        pipeline.run(&options(&img)).unwrap();
        let report = pipeline
            .run(&RunOptions {
                image: Some(img),
                force: true,
            })
            .unwrap();
        assert_eq!(report.palette, Some(PaletteSource::Extracted));
        assert_eq!(pipeline.extractor().calls(), 2);
    }

    #[test]
    fn missing_image_aborts_before_writes() {
        let (tmp, pipeline) = sandbox(Settings::default(), two_roles());
        let err = pipeline
            .run(&options(&tmp.path().join("gone.png")))
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingSource { .. }));
        assert_eq!(pipeline.extractor().calls(), 0);
        assert!(!pipeline.targets()[0].path.exists());
    }

    #[test]
    fn directory_as_image_aborts_before_writes() {
        let (tmp, pipeline) = sandbox(Settings::default(), two_roles());
        let walls = tmp.path().join("walls");
        fs::create_dir(&walls).unwrap();

        let err = pipeline.run(&options(&walls)).unwrap_err();

        assert!(matches!(err, PipelineError::MissingSource { .. }));
        assert_eq!(pipeline.extractor().calls(), 0);
        assert!(pipeline.targets().iter().all(|t| !t.path.exists()));
    }

    #[test]
    fn no_image_and_no_wallpaper() {
        let (_tmp, pipeline) = sandbox(Settings::default(), two_roles());
        assert!(matches!(
            pipeline.run(&RunOptions::default()),
            Err(PipelineError::NoSource)
        ));
    }

    #[test]
    fn extraction_failure_is_invalid_palette() {
        let (tmp, pipeline) = sandbox(Settings::default(), MockExtractor::failing());
        let img = image(&tmp);
        let err = pipeline.run(&options(&img)).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidPalette(_)));
        assert!(pipeline.targets().iter().all(|t| !t.path.exists()));
        assert!(!tmp.path().join("data").exists());
    }

    #[test]
    fn palette_without_selected_roles_aborts() {
        let extractor = MockExtractor::returning(palette(&[("surface", "#101010")]));
        let (tmp, pipeline) = sandbox(Settings::default(), extractor);
        let img = image(&tmp);
        assert!(matches!(
            pipeline.run(&options(&img)),
            Err(PipelineError::InvalidPalette(_))
        ));
        assert!(pipeline.targets().iter().all(|t| !t.path.exists()));
    }

    #[test]
    fn disabled_target_is_untouched() {
        let (tmp, pipeline) = sandbox(Settings::default(), two_roles());
        let img = image(&tmp);
        let report = pipeline.run(&options(&img)).unwrap();
        let rofi = report.targets.iter().find(|t| t.name == "rofi").unwrap();
        assert_eq!(rofi.outcome, TargetOutcome::Disabled);
        assert!(!rofi.path.exists());
    }

    #[test]
    fn failed_reload_is_reported_not_fatal() {
        let (tmp, mut pipeline) = sandbox(Settings::default(), two_roles());
        pipeline.notifier.fail = true;
        let img = image(&tmp);
        let report = pipeline.run(&options(&img)).unwrap();
        assert!(!report.has_failures());
        assert!(report.targets.iter().any(|t| matches!(
            t.outcome,
            TargetOutcome::Updated {
                notified: false,
                ..
            }
        )));
    }

    #[test]
    fn restore_undoes_run() {
        let (tmp, pipeline) = sandbox(Settings::default(), two_roles());
        let hypr = pipeline.targets()[0].path.clone();
        fs::write(&hypr, "monitor = ,preferred,auto,1\n").unwrap();
        let img = image(&tmp);
        pipeline.run(&options(&img)).unwrap();
        assert_ne!(fs::read_to_string(&hypr).unwrap(), "monitor = ,preferred,auto,1\n");

        let reports = pipeline.restore(Some(TargetKind::Hyprland));
        assert_eq!(reports.len(), 1);
        assert!(matches!(reports[0].outcome, RestoreOutcome::Restored { .. }));
        assert_eq!(fs::read_to_string(&hypr).unwrap(), "monitor = ,preferred,auto,1\n");
    }

    #[test]
    fn restore_without_backup_reports_it() {
        let (_tmp, pipeline) = sandbox(Settings::default(), two_roles());
        let reports = pipeline.restore(None);
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.outcome == RestoreOutcome::NoBackup));
    }
}
