use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use rolling_backup_core::{ProgressReporter, RunReport, Stage};
use std::sync::Mutex;
use std::time::Duration;

/// CLI progress reporter: one spinner for the whole run, labelled by stage.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(mut guard) = self.bar.lock() {
            let pb = guard.get_or_insert_with(new_spinner);
            f(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

fn new_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Init => "Starting...",
        Stage::LogSetup => "Opening run log...",
        Stage::SizeProbe => "Measuring sources...",
        Stage::RetentionSweep => "Removing expired backups...",
        Stage::SpaceCheck => "Checking free space...",
        Stage::Reclaim => "Reclaiming space...",
        Stage::DirCreate => "Creating backup directory...",
        Stage::DataArchive => "Archiving data...",
        Stage::DbDump => "Dumping database...",
        Stage::LogCleanup => "Closing run log...",
        Stage::Done => "Done",
    }
}

impl ProgressReporter for CliReporter {
    fn on_stage(&self, stage: Stage) {
        if stage == Stage::Done {
            self.finish_bar();
            return;
        }
        self.with_bar(|pb| pb.set_message(stage_label(stage)));
    }

    fn on_reclaim_progress(&self, freed_bytes: u64, required_bytes: u64) {
        self.with_bar(|pb| {
            pb.set_message(format!(
                "Reclaiming space... {} of {} bytes",
                freed_bytes, required_bytes
            ))
        });
    }

    fn on_run_complete(&self, report: &RunReport) {
        self.finish_bar();
        let mark = if report.failures.is_empty() {
            "✓".green()
        } else {
            "!".yellow()
        };
        eprintln!(
            "  {} Backup {} complete: {} expired, {} reclaimed, {} failures",
            mark,
            report.run_dir.display(),
            report.sweep.deleted.len(),
            report.reclaim.as_ref().map_or(0, |r| r.deleted.len()),
            report.failures.len(),
        );
    }
}

impl Drop for CliReporter {
    fn drop(&mut self) {
        self.finish_bar();
    }
}
