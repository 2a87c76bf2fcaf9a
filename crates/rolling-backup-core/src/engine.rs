use chrono::{Local, NaiveDate};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::artifacts::{Archiver, DatabaseDumper, MysqlDumper, ZipArchiver};
use crate::config::AppConfig;
use crate::error::{FatalKind, RecoverableKind, RunError, RunFailure};
use crate::platform::{FreeSpace, StatvfsFreeSpace};
use crate::policy::{self, retention, ReclaimOutcome, SweepOutcome};
use crate::progress::ProgressReporter;
use crate::runlog::RunLog;
use crate::scanner::{self, directory_size, format_backup_date, BackupEntry, StrayDirectory};

/// States of a backup run, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Init,
    LogSetup,
    SizeProbe,
    RetentionSweep,
    SpaceCheck,
    Reclaim,
    DirCreate,
    DataArchive,
    DbDump,
    LogCleanup,
    Done,
}

/// Space needed by the pending backup against what the disk has left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpaceBudget {
    pub required_bytes: u64,
    pub free_bytes: u64,
}

impl SpaceBudget {
    pub fn needs_reclaim(&self) -> bool {
        self.free_bytes <= self.required_bytes
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub date: NaiveDate,
    pub run_dir: PathBuf,
    pub log_file: PathBuf,
    /// False when the run logged nothing and its log file was removed.
    pub log_retained: bool,
    pub budget: SpaceBudget,
    pub sweep: SweepOutcome,
    pub reclaim: Option<ReclaimOutcome>,
    pub archive: Option<PathBuf>,
    pub dump: Option<PathBuf>,
    pub failures: Vec<RunFailure>,
}

impl RunReport {
    pub fn failures_of(&self, kind: RecoverableKind) -> impl Iterator<Item = &RunFailure> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }
}

/// Read-only view of what a run would find under the backup root.
#[derive(Debug)]
pub struct BackupPlan {
    pub budget: SpaceBudget,
    pub entries: Vec<PlannedEntry>,
    pub strays: Vec<StrayDirectory>,
}

#[derive(Debug)]
pub struct PlannedEntry {
    pub entry: BackupEntry,
    pub age_days: i64,
    pub size_bytes: Option<u64>,
    pub expired: bool,
}

pub struct BackupEngine {
    config: AppConfig,
    archiver: Box<dyn Archiver>,
    dumper: Box<dyn DatabaseDumper>,
    free_space: Box<dyn FreeSpace>,
    console_log: bool,
}

impl BackupEngine {
    /// Engine with the zip archiver, the mysqldump dumper and statvfs free space.
    ///
    /// Only one run per backup root may execute at a time; nothing here
    /// enforces that.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            archiver: Box::new(ZipArchiver),
            dumper: Box::new(MysqlDumper),
            free_space: Box::new(StatvfsFreeSpace),
            console_log: false,
        }
    }

    pub fn with_archiver(mut self, archiver: impl Archiver + 'static) -> Self {
        self.archiver = Box::new(archiver);
        self
    }

    pub fn with_dumper(mut self, dumper: impl DatabaseDumper + 'static) -> Self {
        self.dumper = Box::new(dumper);
        self
    }

    pub fn with_free_space(mut self, free_space: impl FreeSpace + 'static) -> Self {
        self.free_space = Box::new(free_space);
        self
    }

    /// Mirror the run log to stdout.
    pub fn with_console_log(mut self, enabled: bool) -> Self {
        self.console_log = enabled;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<RunReport, RunError> {
        self.run_on(Local::now().date_naive(), reporter)
    }

    /// Run a full backup as of `today`:
    /// 1. Open the run log (fatal on failure)
    /// 2. Measure the sources and delete backups past retention
    /// 3. Reclaim space oldest first if the disk is short
    /// 4. Create the run directory (fatal on failure), then archive and dump
    /// 5. Drop the run log if it stayed empty
    pub fn run_on(
        &self,
        today: NaiveDate,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunReport, RunError> {
        reporter.on_stage(Stage::Init);
        let date_name = format_backup_date(today, &self.config.date_format)
            .map_err(|e| RunError::new(FatalKind::DateFormat, e))?;

        reporter.on_stage(Stage::LogSetup);
        let log = RunLog::open(
            &self.config.log_root,
            &format!("{}.txt", date_name),
            &self.config.log_level,
            self.console_log,
        )
        .map_err(|e| RunError::new(FatalKind::LogSetup, e))?;
        let log_file = log.path().to_path_buf();

        let result = log.in_scope(|| self.execute(today, &date_name, &log_file, reporter));

        reporter.on_stage(Stage::LogCleanup);
        let log_retained = match log.finish() {
            Ok(retained) => retained,
            Err(err) => {
                warn!("Can not clean up log file {}: {}", log_file.display(), err);
                true
            }
        };

        let mut report = result?;
        report.log_retained = log_retained;

        reporter.on_stage(Stage::Done);
        reporter.on_run_complete(&report);
        Ok(report)
    }

    fn execute(
        &self,
        today: NaiveDate,
        date_name: &str,
        log_file: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<RunReport, RunError> {
        let config = &self.config;
        let root = config.backup_root.as_path();
        let mut failures = Vec::new();

        if let Err(err) = fs::create_dir_all(root) {
            error!("Can not create directory {}: {}", root.display(), err);
            return Err(RunError::new(FatalKind::BackupRoot, err));
        }

        reporter.on_stage(Stage::SizeProbe);
        let required_bytes = self.required_bytes(&mut failures);
        debug!("Backup needs up to {} bytes", required_bytes);

        reporter.on_stage(Stage::RetentionSweep);
        let sweep = match policy::sweep(root, today, config.retention_days, &config.date_format) {
            Ok(sweep) => sweep,
            Err(err) => {
                error!("Can not scan {}: {}", root.display(), err);
                failures.push(RunFailure::new(
                    RecoverableKind::Inventory,
                    Some(root.to_path_buf()),
                    err,
                ));
                SweepOutcome::default()
            }
        };
        failures.extend(sweep.failures.iter().map(|f| {
            RunFailure::new(RecoverableKind::RetentionDelete, Some(f.path.clone()), &f.error)
        }));

        reporter.on_stage(Stage::SpaceCheck);
        let mut budget = SpaceBudget {
            required_bytes,
            free_bytes: 0,
        };
        let free_known = match self.free_space.free_bytes(root) {
            Ok(free) => {
                budget.free_bytes = free;
                true
            }
            Err(err) => {
                error!("Can not determine free space on {}: {}", root.display(), err);
                failures.push(RunFailure::new(
                    RecoverableKind::FreeSpace,
                    Some(root.to_path_buf()),
                    err,
                ));
                false
            }
        };

        let mut reclaim = None;
        if free_known && budget.needs_reclaim() {
            reporter.on_stage(Stage::Reclaim);
            info!(
                "Try making more space: {} bytes free, {} bytes required",
                budget.free_bytes, budget.required_bytes
            );
            match policy::reclaim(root, required_bytes, &config.date_format, reporter) {
                Ok(outcome) => {
                    failures.extend(outcome.failures.iter().map(|f| {
                        RunFailure::new(RecoverableKind::ReclaimDelete, Some(f.path.clone()), &f.error)
                    }));
                    reclaim = Some(outcome);
                }
                Err(err) => {
                    error!("Can not scan {}: {}", root.display(), err);
                    failures.push(RunFailure::new(
                        RecoverableKind::Inventory,
                        Some(root.to_path_buf()),
                        err,
                    ));
                }
            }
        }

        reporter.on_stage(Stage::DirCreate);
        let run_dir = root.join(date_name);
        if let Err(err) = fs::create_dir_all(&run_dir) {
            error!(
                "Can not create directory {}, the user may not have enough rights: {}",
                run_dir.display(),
                err
            );
            return Err(RunError::new(FatalKind::RunDirectory, err));
        }

        reporter.on_stage(Stage::DataArchive);
        let archive = match self.archiver.archive(&config.source_dir, &run_dir) {
            Ok(path) => Some(path),
            Err(err) => {
                error!("Data backup failed: {}", err);
                failures.push(RunFailure::new(
                    RecoverableKind::Archive,
                    Some(config.source_dir.clone()),
                    err,
                ));
                None
            }
        };

        reporter.on_stage(Stage::DbDump);
        let dump = match self.dumper.dump(&config.database, &run_dir) {
            Ok(path) => Some(path),
            Err(err) => {
                error!("Database backup failed: {}", err);
                failures.push(RunFailure::new(RecoverableKind::Dump, None, err));
                None
            }
        };

        Ok(RunReport {
            date: today,
            run_dir,
            log_file: log_file.to_path_buf(),
            log_retained: false,
            budget,
            sweep,
            reclaim,
            archive,
            dump,
            failures,
        })
    }

    /// Size of both sources plus the safety margin. A source that can not be
    /// measured counts as zero.
    fn required_bytes(&self, failures: &mut Vec<RunFailure>) -> u64 {
        let sources = [&self.config.source_dir, &self.config.database_dir];
        sources
            .into_iter()
            .map(|source| match directory_size(source) {
                Ok(size) => size,
                Err(err) => {
                    error!("Can not measure {}: {}", source.display(), err);
                    failures.push(RunFailure::new(
                        RecoverableKind::SizeProbe,
                        Some(source.clone()),
                        err,
                    ));
                    0
                }
            })
            .fold(self.config.safety_margin_bytes, u64::saturating_add)
    }

    /// What a run on `today` would see, without deleting or writing anything.
    pub fn plan_on(&self, today: NaiveDate) -> io::Result<BackupPlan> {
        let config = &self.config;
        let mut ignored = Vec::new();
        let required_bytes = self.required_bytes(&mut ignored);
        let free_bytes = self.free_space.free_bytes(&config.backup_root)?;

        let mut found = scanner::take_inventory(&config.backup_root, &config.date_format)?;
        scanner::sort_oldest_first(&mut found.entries);

        let entries = found
            .entries
            .into_iter()
            .map(|entry| PlannedEntry {
                age_days: retention::age_in_days(&entry, today),
                size_bytes: directory_size(&entry.path).ok(),
                expired: retention::is_expired(&entry, today, config.retention_days),
                entry,
            })
            .collect();

        Ok(BackupPlan {
            budget: SpaceBudget {
                required_bytes,
                free_bytes,
            },
            entries,
            strays: found.strays,
        })
    }
}
