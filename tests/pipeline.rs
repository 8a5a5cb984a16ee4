//! End-to-end runs through the public API, sandboxed in a temp directory.

use hyprtheme::color::Rgb;
use hyprtheme::extract::{BuiltinExtractor, ExtractionError, PaletteExtractor};
use hyprtheme::notify::NoopNotifier;
use hyprtheme::palette::PaletteDocument;
use hyprtheme::pipeline::{
    Dirs, PaletteSource, Pipeline, PipelineError, RestoreOutcome, RunOptions, TargetOutcome,
};
use hyprtheme::settings::Settings;
use hyprtheme::target::TargetKind;
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const HYPR_USER: &str = "monitor = ,preferred,auto,1\nbind = SUPER, Q, killactive\n";
const WAYBAR_USER: &str = "window#waybar {\n    background: @theme_inactive;\n}\n";
const ROFI_USER: &str = "configuration {\n    modi: \"drun\";\n}\n";

struct CountingExtractor {
    palette: PaletteDocument,
    calls: Cell<usize>,
}

impl CountingExtractor {
    fn new(roles: &[(&str, Rgb)]) -> Self {
        let mut palette = PaletteDocument::new();
        for (role, color) in roles {
            palette.insert(*role, *color);
        }
        Self {
            palette,
            calls: Cell::new(0),
        }
    }
}

impl PaletteExtractor for CountingExtractor {
    fn name(&self) -> &str {
        "counting"
    }

    fn extract(&self, _image: &Path) -> Result<PaletteDocument, ExtractionError> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.palette.clone())
    }
}

struct Sandbox {
    tmp: TempDir,
    dirs: Dirs,
}

impl Sandbox {
    /// Config tree with user content in all three targets.
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let dirs = Dirs::under(tmp.path());
        let sandbox = Self { tmp, dirs };
        for (kind, content) in [
            (TargetKind::Hyprland, HYPR_USER),
            (TargetKind::Waybar, WAYBAR_USER),
            (TargetKind::Rofi, ROFI_USER),
        ] {
            let path = sandbox.target(kind);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        sandbox
    }

    fn target(&self, kind: TargetKind) -> PathBuf {
        self.dirs.config.join(kind.default_relative_path())
    }

    fn read(&self, kind: TargetKind) -> String {
        fs::read_to_string(self.target(kind)).unwrap()
    }

    fn wallpaper(&self) -> PathBuf {
        let path = self.tmp.path().join("wall.png");
        image::RgbImage::from_fn(40, 20, |x, _| {
            if x < 24 {
                image::Rgb([200, 40, 40])
            } else {
                image::Rgb([20, 20, 28])
            }
        })
        .save(&path)
        .unwrap();
        path
    }

    fn pipeline<E: PaletteExtractor>(&self, settings: Settings, extractor: E) -> Pipeline<E, NoopNotifier> {
        Pipeline::new(settings, self.dirs.clone(), extractor, NoopNotifier)
    }
}

fn all_targets() -> Settings {
    let mut settings = Settings::default();
    settings.targets.insert("rofi".into(), true);
    settings
}

fn run(image: &Path) -> RunOptions {
    RunOptions {
        image: Some(image.to_path_buf()),
        force: false,
    }
}

fn red_blue() -> CountingExtractor {
    CountingExtractor::new(&[
        ("accent", Rgb::new(255, 0, 0)),
        ("secondary", Rgb::new(0, 0, 255)),
        ("surface", Rgb::new(16, 16, 16)),
    ])
}

// =========================================================================
// Happy path
// =========================================================================

#[test]
fn first_run_writes_every_target_around_user_content() {
    let sandbox = Sandbox::new();
    let image = sandbox.wallpaper();
    let pipeline = sandbox.pipeline(all_targets(), red_blue());

    let report = pipeline.run(&run(&image)).unwrap();

    assert_eq!(report.succeeded().count(), 3);
    assert!(!report.has_failures());

    let hypr = sandbox.read(TargetKind::Hyprland);
    assert!(hypr.starts_with(HYPR_USER));
    assert!(hypr.contains("general:col.active_border = rgba(ff0000ed) rgba(0000ffed) 45deg\n"));
    assert!(hypr.contains("general:col.inactive_border = rgba(101010ab)\n"));

    let waybar = sandbox.read(TargetKind::Waybar);
    assert!(waybar.starts_with(WAYBAR_USER));
    assert!(waybar.contains("@define-color theme_accent #ff0000;\n"));

    let rofi = sandbox.read(TargetKind::Rofi);
    assert!(rofi.starts_with(ROFI_USER));
    assert!(rofi.contains("    theme-active-1: #0000ffed;\n"));
}

#[test]
fn builtin_extractor_end_to_end() {
    let sandbox = Sandbox::new();
    let image = sandbox.wallpaper();
    let settings = Settings {
        stop_count: 1,
        keys: vec!["accent".into()],
        ..Settings::default()
    };
    let pipeline = sandbox.pipeline(settings, BuiltinExtractor::default());

    let report = pipeline.run(&run(&image)).unwrap();

    let theme = report.theme.unwrap();
    assert_eq!(theme.accent, Rgb::new(200, 40, 40));
    assert_eq!(theme.inactive.rgb(), Rgb::new(20, 20, 28));
    assert!(
        sandbox
            .read(TargetKind::Hyprland)
            .contains("general:col.active_border = rgba(c82828ed)\n")
    );
}

// =========================================================================
// Cache and idempotence
// =========================================================================

#[test]
fn rerun_uses_cache_and_leaves_files_identical() {
    let sandbox = Sandbox::new();
    let image = sandbox.wallpaper();
    let pipeline = sandbox.pipeline(all_targets(), red_blue());

    pipeline.run(&run(&image)).unwrap();
    let before: Vec<String> = TargetKind::ALL.iter().map(|k| sandbox.read(*k)).collect();

    let second = pipeline.run(&run(&image)).unwrap();

    assert_eq!(pipeline.extractor().calls.get(), 1);
    assert_eq!(second.palette, Some(PaletteSource::Cached));
    assert!(second.targets.iter().all(|t| t.outcome == TargetOutcome::Unchanged));
    let after: Vec<String> = TargetKind::ALL.iter().map(|k| sandbox.read(*k)).collect();
    assert_eq!(before, after);
}

#[test]
fn edited_wallpaper_is_extracted_again() {
    let sandbox = Sandbox::new();
    let image = sandbox.wallpaper();
    let pipeline = sandbox.pipeline(all_targets(), red_blue());
    pipeline.run(&run(&image)).unwrap();

    image::RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3]))
        .save(&image)
        .unwrap();
    let report = pipeline.run(&run(&image)).unwrap();

    assert_eq!(report.palette, Some(PaletteSource::Extracted));
    assert_eq!(pipeline.extractor().calls.get(), 2);
}

#[test]
fn settings_change_rewrites_only_the_block() {
    let sandbox = Sandbox::new();
    let image = sandbox.wallpaper();
    sandbox.pipeline(all_targets(), red_blue()).run(&run(&image)).unwrap();

    let fancy = Settings {
        fancy: true,
        stop_count: 3,
        keys: vec!["accent".into(), "secondary".into(), "surface".into()],
        ..all_targets()
    };
    let report = sandbox.pipeline(fancy, red_blue()).run(&run(&image)).unwrap();

    assert_eq!(report.palette, Some(PaletteSource::Cached));
    let hypr = sandbox.read(TargetKind::Hyprland);
    assert!(hypr.starts_with(HYPR_USER));
    assert_eq!(hypr.matches("general:col.active_border").count(), 1);
    assert_eq!(hypr.matches(">>> hyprtheme managed block >>>").count(), 1);
}

// =========================================================================
// Failures
// =========================================================================

#[test]
fn read_only_target_fails_alone() {
    let sandbox = Sandbox::new();
    let image = sandbox.wallpaper();
    let waybar = sandbox.target(TargetKind::Waybar);
    let mut perms = fs::metadata(&waybar).unwrap().permissions();
    perms.set_readonly(true);
    fs::set_permissions(&waybar, perms).unwrap();

    let report = sandbox
        .pipeline(all_targets(), red_blue())
        .run(&run(&image))
        .unwrap();

    assert_eq!(report.succeeded().count(), 2);
    let failed: Vec<&str> = report.failed().map(|t| t.name.as_str()).collect();
    assert_eq!(failed, vec!["waybar"]);
    assert!(report.has_failures());
    assert_eq!(sandbox.read(TargetKind::Waybar), WAYBAR_USER);
    assert!(sandbox.read(TargetKind::Rofi).contains("theme-accent"));
}

#[test]
fn missing_source_touches_nothing() {
    let sandbox = Sandbox::new();
    let pipeline = sandbox.pipeline(all_targets(), red_blue());

    let err = pipeline
        .run(&run(&sandbox.tmp.path().join("nope.png")))
        .unwrap_err();

    assert!(matches!(err, PipelineError::MissingSource { .. }));
    assert_eq!(sandbox.read(TargetKind::Hyprland), HYPR_USER);
    assert!(!sandbox.dirs.backups.exists());
}

#[test]
fn unusable_palette_touches_nothing() {
    let sandbox = Sandbox::new();
    let image = sandbox.wallpaper();
    let extractor = CountingExtractor::new(&[("surface", Rgb::new(16, 16, 16))]);

    let err = sandbox
        .pipeline(all_targets(), extractor)
        .run(&run(&image))
        .unwrap_err();

    assert!(matches!(err, PipelineError::InvalidPalette(_)));
    assert_eq!(sandbox.read(TargetKind::Waybar), WAYBAR_USER);
    assert!(!sandbox.dirs.backups.exists());
}

// =========================================================================
// Restore
// =========================================================================

#[test]
fn restore_all_returns_user_files() {
    let sandbox = Sandbox::new();
    let image = sandbox.wallpaper();
    let pipeline = sandbox.pipeline(all_targets(), red_blue());
    pipeline.run(&run(&image)).unwrap();
    assert_ne!(sandbox.read(TargetKind::Rofi), ROFI_USER);

    let reports = pipeline.restore(None);

    assert_eq!(reports.len(), 3);
    assert!(
        reports
            .iter()
            .all(|r| matches!(r.outcome, RestoreOutcome::Restored { .. }))
    );
    assert_eq!(sandbox.read(TargetKind::Hyprland), HYPR_USER);
    assert_eq!(sandbox.read(TargetKind::Waybar), WAYBAR_USER);
    assert_eq!(sandbox.read(TargetKind::Rofi), ROFI_USER);
}
