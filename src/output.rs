//! CLI output formatting for run and restore results.
//!
//! # Output Format
//!
//! ## Run
//!
//! ```text
//! Source: /home/me/Pictures/wall.png (palette cached)
//! Theme
//!     active: rgba(ff0000ed) rgba(0000ffed) 45deg
//!     inactive: rgba(202020ab)
//! Targets
//!     hyprland: updated (reloaded)
//!         Path: /home/me/.config/hypr/hyprland.conf
//!         Backup: /home/me/.local/share/hyprtheme/backups/hyprland/hyprland.conf.20240101-120000-000000-00.bak
//!     waybar: unchanged
//!         Path: /home/me/.config/waybar/style.css
//!     rofi: disabled
//!
//! 2 targets ok, 0 failed
//! ```
//!
//! ## Restore
//!
//! ```text
//! hyprland: restored
//!     Backup: .../hyprland.conf.20240101-120000-000000-00.bak
//! waybar: no backup
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::gradient::RenderedTheme;
use crate::pipeline::{
    PaletteSource, RestoreOutcome, RestoreReport, RunReport, RunStatus, TargetOutcome,
    TargetReport,
};

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn theme_lines(theme: &RenderedTheme) -> Vec<String> {
    let mut active: Vec<String> = theme.active.iter().map(|c| c.to_hyprland()).collect();
    if active.len() > 1 {
        active.push(format!("{}deg", theme.angle));
    }
    vec![
        "Theme".to_string(),
        format!("{}active: {}", indent(1), active.join(" ")),
        format!("{}inactive: {}", indent(1), theme.inactive.to_hyprland()),
    ]
}

fn target_lines(target: &TargetReport) -> Vec<String> {
    let status = match &target.outcome {
        TargetOutcome::Updated { notified: true, .. } => "updated (reloaded)".to_string(),
        TargetOutcome::Updated {
            notified: false, ..
        } => "updated (reload failed)".to_string(),
        TargetOutcome::Unchanged => "unchanged".to_string(),
        TargetOutcome::Disabled => "disabled".to_string(),
        TargetOutcome::Failed(reason) => format!("FAILED: {reason}"),
    };
    let mut lines = vec![format!("{}{}: {}", indent(1), target.name, status)];
    if target.outcome == TargetOutcome::Disabled {
        return lines;
    }
    lines.push(format!("{}Path: {}", indent(2), target.path.display()));
    if let TargetOutcome::Updated {
        backup: Some(backup),
        ..
    } = &target.outcome
    {
        lines.push(format!("{}Backup: {}", indent(2), backup.display()));
    }
    lines
}

/// Format the summary of one pipeline run.
pub fn format_run_report(report: &RunReport) -> Vec<String> {
    if report.status == RunStatus::Disabled {
        return vec!["Theming is disabled (set enabled = true, or use `force`)".to_string()];
    }

    let mut lines = Vec::new();
    if let Some(image) = &report.image {
        let source = match report.palette {
            Some(PaletteSource::Cached) => " (palette cached)",
            Some(PaletteSource::Extracted) => " (palette extracted)",
            None => "",
        };
        lines.push(format!("Source: {}{}", image.display(), source));
    }
    if let Some(theme) = &report.theme {
        lines.extend(theme_lines(theme));
    }
    lines.push("Targets".to_string());
    for target in &report.targets {
        lines.extend(target_lines(target));
    }
    lines.push(String::new());
    lines.push(format!(
        "{} ok, {} failed",
        plural(report.succeeded().count(), "target"),
        report.failed().count()
    ));
    lines
}

/// Print the run summary to stdout.
pub fn print_run_report(report: &RunReport) {
    for line in format_run_report(report) {
        println!("{}", line);
    }
}

/// Format the result of a restore.
pub fn format_restore(reports: &[RestoreReport]) -> Vec<String> {
    if reports.is_empty() {
        return vec!["No targets selected".to_string()];
    }
    let mut lines = Vec::new();
    for report in reports {
        match &report.outcome {
            RestoreOutcome::Restored { backup, notified } => {
                let suffix = if *notified { "" } else { " (reload failed)" };
                lines.push(format!("{}: restored{}", report.name, suffix));
                lines.push(format!("{}Backup: {}", indent(1), backup.display()));
            }
            RestoreOutcome::NoBackup => lines.push(format!("{}: no backup", report.name)),
            RestoreOutcome::Failed(reason) => {
                lines.push(format!("{}: FAILED: {}", report.name, reason));
                lines.push(format!("{}Path: {}", indent(1), report.path.display()));
            }
        }
    }
    lines
}

pub fn print_restore(reports: &[RestoreReport]) {
    for line in format_restore(reports) {
        println!("{}", line);
    }
}
