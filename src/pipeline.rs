use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use walkdir::WalkDir;

use crate::config::OutputConfig;
use crate::sniff::{self, DetectorRegistry, Source};
use crate::tagger::{CommandRunner, ErrorKind, Tagger, BACKUP_SUFFIX};

/// Where a detected format label came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatSource {
    /// Matched a byte signature.
    Signature,
    /// Inferred from the file name (or the caller's filename hint).
    Extension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetectedFormat {
    pub label: &'static str,
    pub source: FormatSource,
}

/// The result of running one file through the pipeline.
///
/// Failures are recorded here rather than returned, so one bad file never
/// aborts a batch. `error_kind` is the machine-readable classification.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub path: PathBuf,
    pub format: Option<DetectedFormat>,
    pub tagged: bool,
    /// Why the tool was not run, when it was skipped on purpose.
    pub skipped: Option<String>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl ProcessResult {
    fn new(path: &Path, format: Option<DetectedFormat>) -> Self {
        Self {
            path: path.to_path_buf(),
            format,
            tagged: false,
            skipped: None,
            error: None,
            error_kind: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Collect files to tag from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks). A `<name>_original` file is taken for a
/// backup copy left by the tool, and skipped, only while `<name>` sits next to it.
///
/// # Example
///
/// ```rust,no_run
/// use rayban_tag::pipeline::collect_files;
/// use std::path::PathBuf;
///
/// let files = collect_files(&[
///     PathBuf::from("photo.jpg"),   // single file
///     PathBuf::from("./uploads/"),  // entire directory
/// ]);
/// println!("Found {} files", files.len());
/// ```
pub fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_backup_artifact(path) {
                log::warn!("Skipping backup file: {}", path.display());
            } else {
                files.push(path.clone());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if !p.is_file() {
                    continue;
                }
                if is_backup_artifact(p) {
                    log::debug!("Skipping backup file: {}", p.display());
                } else {
                    files.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    files
}

/// Check if `path` is the tool's backup of a sibling file.
fn is_backup_artifact(path: &Path) -> bool {
    let Some(original) = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(BACKUP_SUFFIX))
        .filter(|name| !name.is_empty())
    else {
        return false;
    };
    path.with_file_name(original).is_file()
}

/// Determine the format of `path`.
///
/// The byte signature wins; otherwise the extension of `hint` (a filename the
/// upload arrived with) or of `path` itself is used.
pub fn detect_format(
    registry: &DetectorRegistry,
    path: &Path,
    hint: Option<&Path>,
) -> Result<Option<DetectedFormat>> {
    let sniffed = registry
        .identify(Source::Path(path))
        .with_context(|| format!("Failed to read header of {}", path.display()))?;

    if let Some(label) = sniffed {
        return Ok(Some(DetectedFormat {
            label,
            source: FormatSource::Signature,
        }));
    }

    Ok(hint
        .and_then(sniff::format_from_extension)
        .or_else(|| sniff::format_from_extension(path))
        .map(|label| DetectedFormat {
            label,
            source: FormatSource::Extension,
        }))
}

/// Run one file through sniffing and tagging.
///
/// Sniffing is informational unless `options.require_known_format` is set; a
/// header that cannot be read is logged and left for the tagger to classify.
///
/// `hint` is the name the file arrived under, for callers that store uploads
/// under temporary names. It only feeds the extension fallback. Batch runs
/// work on real file names and pass `None`.
pub async fn process_file<R: CommandRunner>(
    path: &Path,
    hint: Option<&Path>,
    registry: &DetectorRegistry,
    tagger: &Tagger<R>,
    options: &OutputConfig,
) -> ProcessResult {
    let format = match detect_format(registry, path, hint) {
        Ok(format) => format,
        Err(e) => {
            log::warn!("{e:#}");
            None
        }
    };
    let mut result = ProcessResult::new(path, format);

    match format {
        Some(f) => log::debug!("{}: {} ({:?})", path.display(), f.label, f.source),
        None if options.require_known_format => {
            log::info!("Skipping {}: unknown format", path.display());
            result.skipped = Some("unknown format".to_string());
            return result;
        }
        None => log::debug!("{}: unknown format", path.display()),
    }

    if options.dry_run {
        log::info!("Would run: {}", tagger.command_for(path).display());
        result.skipped = Some("dry run".to_string());
        return result;
    }

    match tagger.apply_tags(path).await {
        Ok(_) => result.tagged = true,
        Err(e) => {
            result.error_kind = Some(e.kind());
            result.error = Some(e.to_string());
        }
    }

    result
}

/// Process many files concurrently, at most `jobs` at a time.
///
/// Results come back in the order of `files`, exactly one per file. A worker
/// task that panics is reported as a failed result for its file.
pub async fn process_batch<R>(
    files: Vec<PathBuf>,
    registry: Arc<DetectorRegistry>,
    tagger: Arc<Tagger<R>>,
    options: OutputConfig,
    jobs: usize,
) -> Vec<ProcessResult>
where
    R: CommandRunner + 'static,
{
    let total = files.len();
    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let options = Arc::new(options);
    let mut set = JoinSet::new();

    for (index, path) in files.iter().cloned().enumerate() {
        let registry = Arc::clone(&registry);
        let tagger = Arc::clone(&tagger);
        let options = Arc::clone(&options);
        let semaphore = Arc::clone(&semaphore);

        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let result = process_file(&path, None, &registry, &tagger, &options).await;
            (index, result)
        });
    }

    let mut slots: Vec<Option<ProcessResult>> = (0..total).map(|_| None).collect();
    let mut lost = Vec::new();
    let mut done = 0;
    while let Some(joined) = set.join_next().await {
        done += 1;
        match joined {
            Ok((index, result)) => {
                match (&result.error, &result.skipped) {
                    (Some(err), _) => log::error!("[{done}/{total}] {}: {err}", result.path.display()),
                    (None, Some(reason)) => {
                        log::info!("[{done}/{total}] {}: skipped ({reason})", result.path.display())
                    }
                    (None, None) => log::info!("[{done}/{total}] Tagged {}", result.path.display()),
                }
                slots[index] = Some(result);
            }
            Err(e) => {
                log::error!("[{done}/{total}] Worker task failed: {e}");
                lost.push(e.to_string());
            }
        }
    }

    // A worker that panicked or was cancelled never reports its index; every
    // empty slot still gets a failed result so the batch stays one-to-one.
    let reason = match lost.as_slice() {
        [single] => format!("worker task failed: {single}"),
        _ => "worker task failed".to_string(),
    };
    slots
        .into_iter()
        .zip(files)
        .map(|(slot, path)| {
            slot.unwrap_or_else(|| {
                let mut result = ProcessResult::new(&path, None);
                result.error = Some(reason.clone());
                result
            })
        })
        .collect()
}
