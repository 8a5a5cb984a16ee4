use clap::{Parser, Subcommand};
use hyprtheme::extract::ExtractorChain;
use hyprtheme::notify::{NoopNotifier, ReloadNotifier, SystemNotifier};
use hyprtheme::output;
use hyprtheme::pipeline::{Dirs, Pipeline, RestoreOutcome, RunOptions};
use hyprtheme::settings::{self, Settings, SettingsStore};
use hyprtheme::target::TargetKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hyprtheme")]
#[command(about = "Derive a color theme from a wallpaper and apply it to Hyprland, Waybar and rofi")]
#[command(long_about = "\
Derive a color theme from a wallpaper and apply it to Hyprland, Waybar and rofi

Each run extracts a palette from the image (cached by content), builds an
active-border gradient and an inactive color, and rewrites the managed block
in every enabled target config:

  ~/.config/hypr/hyprland.conf     general:col.active_border = rgba(..) rgba(..) 45deg
  ~/.config/waybar/style.css       @define-color theme_accent #..;
  ~/.config/rofi/config.rasi       * { theme-accent: #..; }

Only the lines between the hyprtheme markers are ever changed. Files are
backed up before each change and consumers are told to reload.

Settings live in ~/.config/hyprtheme/settings.toml (created on first run).
Run 'hyprtheme gen-config' to print a documented copy.")]
#[command(version)]
struct Cli {
    /// Log diagnostic detail to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file [default: ~/.config/hyprtheme/settings.toml]
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Palette cache directory [default: ~/.cache/hyprtheme]
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Backup directory [default: ~/.local/share/hyprtheme/backups]
    #[arg(long, global = true)]
    backup_dir: Option<PathBuf>,

    /// Write configs without signalling running programs
    #[arg(long, global = true)]
    no_reload: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply the theme for an image (default: the configured wallpaper)
    Run { image: Option<PathBuf> },
    /// Like run, but ignore `enabled = false` and the palette cache
    Force { image: Option<PathBuf> },
    /// Put the most recent backup of a target (or all enabled targets) back
    Restore {
        #[arg(value_parser = parse_target)]
        target: Option<TargetKind>,
    },
    /// Print a stock settings.toml with all options documented
    GenConfig,
    /// Print the effective settings
    Show,
}

fn parse_target(name: &str) -> Result<TargetKind, String> {
    TargetKind::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = TargetKind::ALL.iter().map(|k| k.name()).collect();
        format!("unknown target '{name}' (expected one of: {})", known.join(", "))
    })
}

fn init_logging(verbose: bool) {
    let default = if verbose { "warn,hyprtheme=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", settings::stock_settings_toml());
        return Ok(());
    }

    let settings = load_settings(&cli)?;
    if let Command::Show = cli.command {
        print!("{}", toml::to_string_pretty(&settings)?);
        return Ok(());
    }

    let dirs = resolve_dirs(&cli)?;
    if cli.no_reload {
        execute(&cli.command, settings, dirs, NoopNotifier)
    } else {
        execute(&cli.command, settings, dirs, SystemNotifier)
    }
}

fn load_settings(cli: &Cli) -> Result<Settings, Box<dyn std::error::Error>> {
    let path = match &cli.settings {
        Some(path) => path.clone(),
        None => SettingsStore::default_path().ok_or("cannot locate the user config directory")?,
    };
    Ok(SettingsStore::new(path).load()?)
}

fn resolve_dirs(cli: &Cli) -> Result<Dirs, Box<dyn std::error::Error>> {
    let mut dirs = Dirs::from_environment().ok_or("cannot locate the XDG base directories")?;
    if let Some(cache) = &cli.cache_dir {
        dirs.cache = cache.clone();
    }
    if let Some(backups) = &cli.backup_dir {
        dirs.backups = backups.clone();
    }
    Ok(dirs)
}

fn execute<N: ReloadNotifier>(
    command: &Command,
    settings: Settings,
    dirs: Dirs,
    notifier: N,
) -> Result<(), Box<dyn std::error::Error>> {
    let extractor = ExtractorChain::from_settings(&settings.extractor);
    let pipeline = Pipeline::new(settings, dirs, extractor, notifier);

    match command {
        Command::Run { image } | Command::Force { image } => {
            let options = RunOptions {
                image: image.clone(),
                force: matches!(command, Command::Force { .. }),
            };
            let report = pipeline.run(&options)?;
            output::print_run_report(&report);
            if report.has_failures() {
                let names: Vec<&str> = report.failed().map(|t| t.name.as_str()).collect();
                return Err(format!("failed to update: {}", names.join(", ")).into());
            }
        }
        Command::Restore { target } => {
            let reports = pipeline.restore(*target);
            output::print_restore(&reports);
            if reports
                .iter()
                .any(|r| matches!(r.outcome, RestoreOutcome::Failed(_)))
            {
                return Err("restore failed for at least one target".into());
            }
        }
        Command::GenConfig | Command::Show => {}
    }
    Ok(())
}
