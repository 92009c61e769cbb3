//! Entry-walk driver shared by every container format.
//!
//! Entries are processed strictly in order: filter, quota, name checks, path
//! guard, then materialization through the [`Sandbox`]. Failures go through a
//! single policy point that decides between aborting, recording and skipping.

use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::ExtractionConfig;
use crate::ExtractionContext;
use crate::ExtractionError;
use crate::ExtractionReport;
use crate::LimitKind;
use crate::Result;
use crate::error::NameViolation;
use crate::formats::ArchiveEntry;
use crate::formats::EntryContent;
use crate::formats::Walker;
use crate::formats::traits::normalize_name;
use crate::logger::Logger;
use crate::security::PatternFilter;
use crate::security::QuotaTracker;
use crate::security::check_entry_name;
use crate::target::Sandbox;
use crate::target::Target;
use crate::target::platform;
use crate::types::DestDir;
use crate::types::EntryKind;
use crate::types::SafePath;

/// Longest symlink target read from entry content.
const MAX_LINK_TARGET: u64 = 4096;

struct DirTimes {
    path: SafePath,
    accessed: Option<SystemTime>,
    modified: Option<SystemTime>,
}

/// Walks one container and materializes its entries under a sandbox.
pub struct ArchiveDriver<'a> {
    ctx: &'a ExtractionContext,
    config: &'a ExtractionConfig,
    sandbox: &'a Sandbox<'a>,
    filter: PatternFilter,
    quota: QuotaTracker,
    dir_times: Vec<DirTimes>,
}

impl<'a> ArchiveDriver<'a> {
    /// Creates a driver for one walk.
    ///
    /// # Errors
    ///
    /// `InvalidPattern` when a configured pattern does not compile.
    pub fn new(
        ctx: &'a ExtractionContext,
        config: &'a ExtractionConfig,
        sandbox: &'a Sandbox<'a>,
    ) -> Result<Self> {
        Ok(Self {
            ctx,
            config,
            sandbox,
            filter: PatternFilter::new(&config.patterns)?,
            quota: QuotaTracker::new(config),
            dir_times: Vec::new(),
        })
    }

    fn logger(&self) -> &dyn Logger {
        self.config.logger.as_ref()
    }

    /// Drains `walker`, updating `report` as entries are materialized.
    ///
    /// # Errors
    ///
    /// The first error the policy does not allow to be skipped.
    pub fn run(&mut self, walker: &mut dyn Walker, report: &mut ExtractionReport) -> Result<()> {
        report.extracted_type = walker.archive_type().to_string();
        self.ctx.check()?;
        walker.for_each_entry(&mut |entry, content| self.visit(entry, content, report))?;
        self.apply_dir_times()
    }

    fn visit(
        &mut self,
        entry: &ArchiveEntry,
        content: &mut dyn EntryContent,
        report: &mut ExtractionReport,
    ) -> Result<()> {
        self.ctx.check()?;
        if !self.filter.matches(&entry.name) {
            report.pattern_mismatches += 1;
            self.logger()
                .debug("skipping entry not matching patterns", &[("name", &entry.name)]);
            return Ok(());
        }

        match self.extract_entry(content, entry, report) {
            Ok(()) => Ok(()),
            Err(err) => self.handle(err, entry, report),
        }
    }

    fn handle(
        &self,
        err: ExtractionError,
        entry: &ArchiveEntry,
        report: &mut ExtractionReport,
    ) -> Result<()> {
        if err.is_fatal() {
            return Err(err);
        }
        if err.is_unsupported() && self.config.continue_on_unsupported_files {
            report.record_unsupported(&entry.name);
            self.logger().info(
                "skipping unsupported entry",
                &[("name", &entry.name), ("reason", &err)],
            );
            return Ok(());
        }
        if self.config.continue_on_error {
            self.logger()
                .warn("skipping entry", &[("name", &entry.name), ("error", &err)]);
            report.record_error(&err);
            return Ok(());
        }
        Err(err)
    }

    fn extract_entry(
        &mut self,
        content: &mut dyn EntryContent,
        entry: &ArchiveEntry,
        report: &mut ExtractionReport,
    ) -> Result<()> {
        self.quota.begin_entry()?;

        match &entry.kind {
            EntryKind::Unsupported { reason } => {
                return Err(ExtractionError::UnsupportedEntry {
                    name: entry.name.clone(),
                    kind: reason.clone(),
                });
            }
            EntryKind::Symlink if self.config.deny_symlinks => {
                return Err(ExtractionError::SymlinkDenied {
                    path: PathBuf::from(&entry.name),
                });
            }
            _ => {}
        }

        if let Some(reason) = &entry.name_violation {
            return Err(ExtractionError::IllegalName {
                name: entry.name.clone(),
                reason: reason.clone(),
            });
        }
        check_entry_name(&entry.name)?;
        let path = self.sandbox.guard().resolve(&entry.name)?;

        match entry.kind {
            EntryKind::Directory => self.extract_dir(&path, entry, report),
            EntryKind::File => self.extract_file(content, &path, entry, report),
            EntryKind::Symlink => self.extract_symlink(content, &path, entry, report),
            EntryKind::Unsupported { .. } => Ok(()),
        }
    }

    fn extract_dir(
        &mut self,
        path: &SafePath,
        entry: &ArchiveEntry,
        report: &mut ExtractionReport,
    ) -> Result<()> {
        if path.is_root() {
            return Ok(());
        }
        self.ctx.check()?;
        self.sandbox.create_dir_all(path)?;
        report.dirs += 1;

        if self.config.preserve_file_attributes {
            if let Some(mode) = entry.mode {
                self.sandbox.chmod(path, mode & 0o7777)?;
            }
            self.dir_times.push(DirTimes {
                path: path.clone(),
                accessed: entry.accessed,
                modified: entry.modified,
            });
        }
        self.apply_owner(path, entry)
    }

    fn extract_file(
        &mut self,
        content: &mut dyn EntryContent,
        path: &SafePath,
        entry: &ArchiveEntry,
        report: &mut ExtractionReport,
    ) -> Result<()> {
        require_name(path, entry)?;

        let remaining = self.quota.remaining_size();
        let size_limit = self.quota.size_limit();
        let exceeded = || ExtractionError::LimitExceeded {
            kind: LimitKind::ExtractionSize,
            limit: size_limit.unwrap_or_default(),
        };
        if remaining.is_some_and(|remaining| entry.size > remaining) {
            return Err(exceeded());
        }

        let mode = entry.mode.map_or(self.config.file_mode, |mode| mode & 0o777);
        self.ctx.check()?;
        let written = {
            let mut reader = content.open()?;
            self.sandbox
                .create_file(path, &mut reader, mode, self.config.overwrite, remaining)
        }
        .map_err(|err| match err.limit_kind() {
            Some(LimitKind::ExtractionSize) => exceeded(),
            _ => err,
        })?;

        self.quota.record_written(written);
        report.files += 1;
        report.extraction_size += written;

        if self.config.preserve_file_attributes {
            if let Some(mode) = entry.mode {
                self.sandbox.chmod(path, mode & 0o7777)?;
            }
            self.sandbox
                .set_times(path, false, entry.accessed, entry.modified)?;
        }
        self.apply_owner(path, entry)
    }

    fn extract_symlink(
        &mut self,
        content: &mut dyn EntryContent,
        path: &SafePath,
        entry: &ArchiveEntry,
        report: &mut ExtractionReport,
    ) -> Result<()> {
        require_name(path, entry)?;

        let target = match &entry.link_target {
            Some(target) => target.clone(),
            None => read_link_target(content.open()?)?,
        };
        let target = normalize_name(&target);

        self.ctx.check()?;
        self.sandbox
            .create_symlink(path, &target, self.config.overwrite)?;
        report.symlinks += 1;

        if self.config.preserve_file_attributes {
            self.sandbox
                .set_times(path, true, entry.accessed, entry.modified)?;
        }
        self.apply_owner(path, entry)
    }

    fn apply_owner(&self, path: &SafePath, entry: &ArchiveEntry) -> Result<()> {
        if self.config.preserve_owner {
            self.sandbox.chown(path, entry.uid, entry.gid)?;
        }
        Ok(())
    }

    fn apply_dir_times(&mut self) -> Result<()> {
        let mut pending = std::mem::take(&mut self.dir_times);
        // Children first, so setting a parent's times is not undone.
        pending.sort_by_key(|dir| std::cmp::Reverse(dir.path.depth()));
        for dir in pending {
            self.sandbox
                .set_times(&dir.path, false, dir.accessed, dir.modified)?;
        }
        Ok(())
    }
}

fn require_name(path: &SafePath, entry: &ArchiveEntry) -> Result<()> {
    if path.is_root() {
        return Err(ExtractionError::IllegalName {
            name: entry.name.clone(),
            reason: NameViolation::Empty,
        });
    }
    Ok(())
}

fn read_link_target(content: Box<dyn Read + '_>) -> Result<String> {
    let mut target = String::new();
    let read = content
        .take(MAX_LINK_TARGET + 1)
        .read_to_string(&mut target)?;
    if read as u64 > MAX_LINK_TARGET {
        return Err(ExtractionError::InvalidArchive(format!(
            "symlink target longer than {MAX_LINK_TARGET} bytes"
        )));
    }
    Ok(target)
}

/// Makes sure `dir` exists as a directory, creating it when allowed.
///
/// # Errors
///
/// `DestinationMissing` when it is absent and creation is disabled, or an
/// I/O error when something other than a directory is in the way.
pub fn ensure_directory(target: &dyn Target, dir: &Path, create: bool, mode: u32) -> Result<()> {
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    match target.stat(dir)? {
        Some(meta) if meta.is_dir() => Ok(()),
        Some(_) => Err(ExtractionError::Io(std::io::Error::new(
            std::io::ErrorKind::NotADirectory,
            format!("destination is not a directory: {}", dir.display()),
        ))),
        None if create => {
            let mut chain: Vec<&Path> = dir
                .ancestors()
                .filter(|ancestor| !ancestor.as_os_str().is_empty())
                .collect();
            chain.reverse();
            for ancestor in chain {
                target.create_dir(ancestor, mode)?;
            }
            Ok(())
        }
        None => Err(ExtractionError::DestinationMissing {
            path: dir.to_path_buf(),
        }),
    }
}

/// Prepares the destination root and drains `walker` into it.
///
/// # Errors
///
/// Destination errors, then whatever [`ArchiveDriver::run`] reports.
pub fn extract_entries(
    ctx: &ExtractionContext,
    target: &dyn Target,
    dst: &Path,
    config: &ExtractionConfig,
    walker: &mut dyn Walker,
    report: &mut ExtractionReport,
) -> Result<()> {
    let logger = config.logger.as_ref();
    ctx.check()?;
    ensure_directory(target, dst, config.create_destination, config.dir_mode)?;

    if config.preserve_owner && !platform::is_privileged() {
        logger.debug(
            "unprivileged process, ownership changes on disk are skipped",
            &[],
        );
    }

    let root = DestDir::new(dst);
    let sandbox = Sandbox::new(
        target,
        &root,
        config.traverse_symlinks,
        config.dir_mode,
        logger,
    );
    let mut driver = ArchiveDriver::new(ctx, config, &sandbox)?;
    driver.run(walker, report)
}
