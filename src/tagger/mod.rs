//! Device-tag rewriting through an external metadata tool.
//!
//! The [`Tagger`] builds one exiftool-style command per file, runs it through a
//! [`CommandRunner`], classifies the outcome into a [`TaggerError`] and removes
//! the backup copy the tool may leave next to the file.
//!
//! ```rust,no_run
//! use rayban_tag::tagger::Tagger;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), rayban_tag::tagger::TaggerError> {
//! let tagger = Tagger::new("exiftool");
//! let path = tagger.apply_tags(Path::new("photo.jpg")).await?;
//! println!("Tagged {}", path.display());
//! # Ok(())
//! # }
//! ```

mod command;
mod error;
mod runner;

pub use command::{build_command, tag_flag, Invocation, OVERWRITE_FLAG, TAG_SET};
pub use error::{ErrorKind, TaggerError};
pub use runner::{CommandOutput, CommandRunner, SystemRunner};

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Marker the tool appends to the name of its safety copy.
pub const BACKUP_SUFFIX: &str = "_original";

/// Applies the fixed [`TAG_SET`] to files with a configured tool.
///
/// Holds no per-file state; share one instance (e.g. in an `Arc`) across
/// concurrent calls.
#[derive(Debug, Clone)]
pub struct Tagger<R = SystemRunner> {
    tool: PathBuf,
    extra_args: Vec<OsString>,
    timeout: Option<Duration>,
    runner: R,
}

impl Tagger<SystemRunner> {
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            extra_args: Vec::new(),
            timeout: None,
            runner: SystemRunner,
        }
    }
}

impl<R> Tagger<R> {
    /// Swap the process runner, keeping the rest of the configuration.
    pub fn with_runner<T>(self, runner: T) -> Tagger<T> {
        Tagger {
            tool: self.tool,
            extra_args: self.extra_args,
            timeout: self.timeout,
            runner,
        }
    }

    /// Arguments appended after the fixed tag flags.
    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.extra_args = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        self
    }

    /// Kill the tool and fail with [`TaggerError::TimedOut`] after `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn tool(&self) -> &Path {
        &self.tool
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// The exact invocation [`apply_tags`](Self::apply_tags) would run for `path`.
    pub fn command_for(&self, path: &Path) -> Invocation {
        build_command(path, &self.tool, &self.extra_args)
    }
}

impl<R: CommandRunner> Tagger<R> {
    /// Rewrite the device tags of `path` in place and return the same path.
    ///
    /// One attempt, no retry. Backups are only removed after the tool reported
    /// success; after a failure whatever the tool left behind is kept.
    pub async fn apply_tags(&self, path: &Path) -> Result<PathBuf, TaggerError> {
        if !path.is_file() {
            return Err(TaggerError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let invocation = self.command_for(path);
        log::debug!("Running: {}", invocation.display());

        let run = self.runner.run(&invocation);
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                TaggerError::TimedOut {
                    path: path.to_path_buf(),
                    timeout: limit,
                }
            })?,
            None => run.await,
        }
        .map_err(|source| TaggerError::ToolUnavailable {
            tool: self.tool.clone(),
            source,
        })?;

        if !output.success {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            log::warn!(
                "{} exited with {:?} on {}",
                self.tool.display(),
                output.code,
                path.display()
            );
            return Err(TaggerError::ToolFailed {
                path: path.to_path_buf(),
                code: output.code,
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            log::debug!("{}: {}", self.tool.display(), stdout.trim_end());
        }

        remove_backup_files(path)?;
        Ok(path.to_path_buf())
    }
}

/// Tag `path` with the tool at `tool_path`, appending `extra_args`.
pub async fn apply_tags<S: AsRef<OsStr>>(
    path: &Path,
    tool_path: &Path,
    extra_args: &[S],
) -> Result<PathBuf, TaggerError> {
    Tagger::new(tool_path)
        .with_extra_args(extra_args)
        .apply_tags(path)
        .await
}

/// Names the tool may give its safety copy of `path`:
/// `<name>_original` and `<stem>.<ext>_original`. Coinciding names are listed once.
pub fn backup_paths(path: &Path) -> Vec<PathBuf> {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    let mut name = path.file_name().map(OsStr::to_os_string).unwrap_or_default();
    name.push(BACKUP_SUFFIX);

    let mut legacy = path.file_stem().map(OsStr::to_os_string).unwrap_or_default();
    if let Some(ext) = path.extension() {
        legacy.push(".");
        legacy.push(ext);
    }
    legacy.push(BACKUP_SUFFIX);

    let mut paths = vec![parent.join(name)];
    let legacy = parent.join(legacy);
    if !paths.contains(&legacy) {
        paths.push(legacy);
    }
    paths
}

/// Delete any backup of `path`. A backup that is already gone is fine.
fn remove_backup_files(path: &Path) -> Result<(), TaggerError> {
    for backup in backup_paths(path) {
        match std::fs::remove_file(&backup) {
            Ok(()) => log::debug!("Removed backup {}", backup.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(TaggerError::Cleanup { path: backup, source }),
        }
    }
    Ok(())
}
