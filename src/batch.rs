//! Runs the codemod over a set of files on a worker pool.
//!
//! Files are independent. A file is only written after its whole in-memory
//! transform succeeded, through a temp file renamed over the original, so an
//! interrupted run never leaves a half-rewritten file behind. Cancellation is
//! honoured between files only.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::CodemodConfig;
use crate::diagnostics::Diagnostic;
use crate::driver::transform_file;
use crate::error::{CodemodError, Result};

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Report what would change without writing anything.
    pub dry_run: bool,
    /// Checked before each file is started.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl BatchOptions {
    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum FileStatus {
    Rewritten,
    Unchanged,
    /// Could not be parsed; left as is.
    Skipped,
    /// Read or write failed.
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    pub diagnostics: Vec<Diagnostic>,
    pub error: Option<String>,
}

impl FileReport {
    fn new(path: &Path, status: FileStatus) -> Self {
        Self {
            path: path.to_path_buf(),
            status,
            diagnostics: vec![],
            error: None,
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct BatchReport {
    /// One entry per input path, in input order.
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.files.iter().flat_map(|f| f.diagnostics.iter())
    }
}

pub fn run(paths: &[PathBuf], config: &CodemodConfig, options: &BatchOptions) -> BatchReport {
    let files: Vec<FileReport> = paths
        .par_iter()
        .map(|path| process_file(path, config, options))
        .collect();
    let report = BatchReport { files };
    info!(
        files = report.files.len(),
        rewritten = report.count(FileStatus::Rewritten),
        skipped = report.count(FileStatus::Skipped),
        failed = report.count(FileStatus::Failed),
        cancelled = report.count(FileStatus::Cancelled),
        dry_run = options.dry_run,
        "codemod batch finished"
    );
    report
}

fn process_file(path: &Path, config: &CodemodConfig, options: &BatchOptions) -> FileReport {
    if options.cancelled() {
        return FileReport::new(path, FileStatus::Cancelled);
    }

    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read file");
            return FileReport {
                error: Some(CodemodError::io(path, e).to_string()),
                ..FileReport::new(path, FileStatus::Failed)
            };
        }
    };

    let output = match transform_file(path, &source, config) {
        Ok(output) => output,
        Err(CodemodError::Parse(diagnostic)) => {
            debug!(path = %path.display(), "skipping unparsable file");
            return FileReport {
                diagnostics: vec![diagnostic],
                ..FileReport::new(path, FileStatus::Skipped)
            };
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "transform failed");
            return FileReport {
                error: Some(e.to_string()),
                ..FileReport::new(path, FileStatus::Failed)
            };
        }
    };

    if !output.changed {
        return FileReport {
            diagnostics: output.diagnostics,
            ..FileReport::new(path, FileStatus::Unchanged)
        };
    }
    if !options.dry_run {
        if let Err(e) = persist(path, &output.source_text) {
            warn!(path = %path.display(), error = %e, "failed to write file");
            return FileReport {
                diagnostics: output.diagnostics,
                error: Some(e.to_string()),
                ..FileReport::new(path, FileStatus::Failed)
            };
        }
    }
    FileReport {
        diagnostics: output.diagnostics,
        ..FileReport::new(path, FileStatus::Rewritten)
    }
}

/// Writes next to `path` and renames over it.
fn persist(path: &Path, text: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| CodemodError::io(dir, e))?;
    tmp.write_all(text.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| CodemodError::io(tmp.path(), e))?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions())
            .map_err(|e| CodemodError::io(tmp.path(), e))?;
    }
    tmp.persist(path)
        .map_err(|e| CodemodError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.js");
        fs::write(&path, "old").unwrap();
        persist(&path, "new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn cancelled_batch_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.js");
        let src = "import Router from 'next/router';\nfunction f() { Router.push('/a', '/b'); }\n";
        fs::write(&path, src).unwrap();

        let options = BatchOptions {
            dry_run: false,
            cancel: Some(Arc::new(AtomicBool::new(true))),
        };
        let report = run(&[path.clone()], &CodemodConfig::default(), &options);
        assert_eq!(report.count(FileStatus::Cancelled), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), src);
    }

    #[test]
    fn missing_file_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let report = run(
            &[dir.path().join("missing.js")],
            &CodemodConfig::default(),
            &BatchOptions::default(),
        );
        assert_eq!(report.files[0].status, FileStatus::Failed);
        assert!(report.files[0].error.as_deref().unwrap().contains("missing.js"));
    }
}
