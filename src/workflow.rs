//! End-to-end workflows: merge + watermark, and per-file folder watermarking
//!
//! Both workflows keep their intermediate watermark documents in a scratch
//! directory that is removed when the workflow returns, including on error.

use std::fs;
use std::path::{Path, PathBuf};

use glob::{glob, glob_with, MatchOptions, Pattern};
use tempfile::TempDir;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::layout::{PageDimensions, Position};
use crate::pdf::{create_watermark_pdf, merge_pdfs, overlay_watermark, MergeOptions};
use crate::pdf::{StyleOverrides, WatermarkOptions};

/// Where batch mode writes when no output root is given
pub const DEFAULT_OUTPUT_ROOT: &str = "data/output";

fn scratch_dir() -> Result<TempDir> {
    Ok(tempfile::Builder::new().prefix("pdf-stamp-").tempdir()?)
}

/// Expand glob patterns in input paths
///
/// Literal paths are kept as given. Each pattern is replaced by its matches
/// in sorted order; the order of the arguments themselves is preserved.
pub fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        if !(pattern.contains('*') || pattern.contains('?') || pattern.contains('[')) {
            paths.push(PathBuf::from(pattern));
            continue;
        }

        let entries = glob(pattern).map_err(|e| Error::InvalidGlob(format!("{}: {}", pattern, e)))?;
        let mut matched = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) => matched.push(path),
                Err(e) => warn!(pattern = %pattern, error = %e, "glob error"),
            }
        }
        if matched.is_empty() {
            return Err(Error::NoFilesMatched(pattern.clone()));
        }
        matched.sort();
        paths.extend(matched);
    }

    Ok(paths)
}

/// Find the `*.pdf` files directly inside `folder`, sorted by path
///
/// The suffix match is case-sensitive and does not recurse.
pub fn discover_pdfs(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.exists() {
        return Err(Error::FolderNotFound(folder.to_path_buf()));
    }

    let pattern = format!("{}/*.pdf", Pattern::escape(&folder.to_string_lossy()));
    let match_options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut files: Vec<PathBuf> = glob_with(&pattern, match_options)
        .map_err(|e| Error::InvalidGlob(e.to_string()))?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();

    if files.is_empty() {
        return Err(Error::NoPdfFiles(folder.to_path_buf()));
    }

    files.sort();
    Ok(files)
}

/// Options for merging inputs and watermarking the result
#[derive(Debug, Clone)]
pub struct MergeWatermarkOptions {
    /// Input PDF file paths in merge order
    pub input_paths: Vec<PathBuf>,
    /// Final watermarked PDF
    pub output_path: PathBuf,
    /// The watermark to stamp on every merged page
    pub watermark: WatermarkOptions,
}

impl MergeWatermarkOptions {
    pub fn new(
        input_paths: Vec<PathBuf>,
        output_path: PathBuf,
        text: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            input_paths,
            output_path,
            watermark: WatermarkOptions::single(text, position),
        }
    }
}

/// Merge the inputs, then stamp the watermark onto every page of the result
///
/// Returns the page count of the output. Nothing is written to the output
/// path unless every step succeeds.
pub fn merge_and_watermark(options: &MergeWatermarkOptions) -> Result<usize> {
    if options.input_paths.is_empty() {
        return Err(Error::General("No input PDF files provided".to_string()));
    }
    options.watermark.validate()?;
    for path in &options.input_paths {
        if !path.exists() {
            return Err(Error::FileNotFound(path.clone()));
        }
    }

    let scratch = scratch_dir()?;
    let merged_pdf = scratch.path().join("merged.pdf");
    let watermark_pdf = scratch.path().join("watermark.pdf");

    info!(text = %options.watermark.text, "creating watermark");
    create_watermark_pdf(&watermark_pdf, &options.watermark)?;

    info!(count = options.input_paths.len(), "merging PDFs");
    merge_pdfs(&MergeOptions {
        input_paths: options.input_paths.clone(),
        output_path: merged_pdf.clone(),
    })?;

    info!("applying watermark");
    overlay_watermark(&merged_pdf, &watermark_pdf, &options.output_path)
}

/// What to do when one file of a batch fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failing file
    #[default]
    Abort,
    /// Record the failure and move on to the next file
    Continue,
}

/// Options for watermarking every PDF in a folder
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Folder to scan for `*.pdf` files
    pub folder: PathBuf,
    /// Outputs go to `<output_root>/<folder name>/`
    pub output_root: PathBuf,
    /// Add the diagonal center stamp to the header and footer
    pub include_center: bool,
    /// Style overrides for every stamp
    pub overrides: StyleOverrides,
    /// Watermark page size
    pub page: PageDimensions,
    pub on_error: FailurePolicy,
}

impl BatchOptions {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            include_center: false,
            overrides: StyleOverrides::default(),
            page: PageDimensions::letter(),
            on_error: FailurePolicy::Abort,
        }
    }

    /// The watermark stamped on a file with base name `text`
    fn watermark(&self, text: &str) -> WatermarkOptions {
        WatermarkOptions::banner(text, self.include_center)
            .with_overrides(&self.overrides)
            .with_page(self.page)
    }
}

/// A file that could not be watermarked
#[derive(Debug)]
pub struct BatchFailure {
    pub input: PathBuf,
    pub error: Error,
}

/// Outcome of a batch run
#[derive(Debug)]
pub struct BatchReport {
    /// Directory all outputs were written to
    pub output_dir: PathBuf,
    /// Output files written, in processing order
    pub written: Vec<PathBuf>,
    /// Files skipped under [`FailurePolicy::Continue`]
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Watermark every PDF in a folder with its own base name
///
/// Files are processed one at a time in sorted order. Each output lands at
/// `<output_root>/<folder name>/<base name>.pdf`.
pub fn watermark_folder(options: &BatchOptions) -> Result<BatchReport> {
    watermark_folder_with_progress(options, |_| {})
}

/// Like [`watermark_folder`], calling `on_file` before each file is processed
///
/// Style errors are reported once, before any output directory is created,
/// regardless of the failure policy.
pub fn watermark_folder_with_progress<F>(
    options: &BatchOptions,
    mut on_file: F,
) -> Result<BatchReport>
where
    F: FnMut(&Path),
{
    options.watermark("").validate()?;

    let files = discover_pdfs(&options.folder)?;
    let output_dir = options.output_root.join(folder_name(&options.folder)?);
    fs::create_dir_all(&output_dir)?;

    let scratch = scratch_dir()?;
    let mut report = BatchReport {
        output_dir,
        written: Vec::with_capacity(files.len()),
        failed: Vec::new(),
    };

    for file in files {
        info!(file = %file.display(), "watermarking");
        on_file(&file);
        match watermark_one(&file, scratch.path(), &report.output_dir, options) {
            Ok(output) => report.written.push(output),
            Err(error) if options.on_error == FailurePolicy::Continue => {
                warn!(file = %file.display(), error = %error, "skipping file");
                report.failed.push(BatchFailure { input: file, error });
            }
            Err(error) => return Err(error),
        }
    }

    info!(
        written = report.written.len(),
        failed = report.failed.len(),
        output_dir = %report.output_dir.display(),
        "batch finished"
    );

    Ok(report)
}

fn watermark_one(
    file: &Path,
    scratch: &Path,
    output_dir: &Path,
    options: &BatchOptions,
) -> Result<PathBuf> {
    let base_name = file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .ok_or_else(|| Error::General(format!("No file name: {}", file.display())))?;

    let watermark_pdf = scratch.join(format!("{}_wm.pdf", base_name));
    let output_pdf = output_dir.join(format!("{}.pdf", base_name));

    create_watermark_pdf(&watermark_pdf, &options.watermark(&base_name))?;
    overlay_watermark(file, &watermark_pdf, &output_pdf)?;

    Ok(output_pdf)
}

/// Last component of the folder path, resolving `.` and `..` if needed
fn folder_name(folder: &Path) -> Result<PathBuf> {
    if let Some(name) = folder.file_name() {
        return Ok(PathBuf::from(name));
    }

    folder
        .canonicalize()?
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| Error::General(format!("Cannot name output folder for {}", folder.display())))
}
