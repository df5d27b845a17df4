//! PDF Stamp CLI tool
//!
//! Merges PDFs and stamps a watermark onto the result, or watermarks every
//! PDF of a folder with its own file name.

use std::io;
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Result};
use clap::{ArgAction, ArgGroup, Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use pdf_stamp::layout::{PageDimensions, Position};
use pdf_stamp::pdf::{Rgb, StyleOverrides, WatermarkOptions};
use pdf_stamp::workflow::{
    discover_pdfs, expand_inputs, merge_and_watermark, watermark_folder_with_progress, BatchOptions,
    FailurePolicy, MergeWatermarkOptions, DEFAULT_OUTPUT_ROOT,
};

/// PDF Stamp - Merge PDFs and apply a watermark
#[derive(Parser)]
#[command(name = "pdf-stamp")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("inputs").required(true).args(["files", "folder"])))]
#[command(after_help = "EXAMPLES:
    # Merge two PDFs and stamp DRAFT in the footer
    pdf-stamp out.pdf DRAFT --files a.pdf b.pdf --position footer

    # Merge every PDF of a folder with a diagonal stamp
    pdf-stamp out.pdf CONFIDENTIAL --folder handouts

    # Watermark each PDF of a folder with its own name
    pdf-stamp --folder handouts --position center")]
struct Cli {
    /// Output PDF file (merge mode only)
    output: Option<PathBuf>,

    /// Watermark text (merge mode only)
    text: Option<String>,

    /// PDF files to merge, in order. Supports glob patterns like "*.pdf"
    #[arg(long, num_args = 1..)]
    files: Vec<String>,

    /// Folder containing PDF files
    #[arg(long)]
    folder: Option<PathBuf>,

    /// Watermark position: center, header or footer
    /// (batch mode: "center" adds a diagonal stamp to the header and footer)
    #[arg(long)]
    position: Option<String>,

    /// Root directory for batch output; files go to <ROOT>/<folder name>/
    #[arg(long, default_value = DEFAULT_OUTPUT_ROOT)]
    output_root: PathBuf,

    /// Font size in points for every stamp
    #[arg(long)]
    font_size: Option<f32>,

    /// Text color: #rrggbb, red, black, gray or blue
    #[arg(long)]
    color: Option<String>,

    /// Text opacity from 0 (invisible) to 1 (opaque)
    #[arg(long)]
    opacity: Option<f32>,

    /// Page size of the watermark overlay
    #[arg(long, value_enum, default_value_t = PageSize::Letter)]
    page_size: PageSize,

    /// Batch mode: keep going when a file fails and report failures at the end
    #[arg(long)]
    keep_going: bool,

    /// Debug logging. RUST_LOG overrides this.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum PageSize {
    Letter,
    A4,
}

impl From<PageSize> for PageDimensions {
    fn from(size: PageSize) -> Self {
        match size {
            PageSize::Letter => PageDimensions::letter(),
            PageSize::A4 => PageDimensions::a4(),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Reject bad configuration before anything touches the filesystem
    let position = cli
        .position
        .as_deref()
        .map(str::parse::<Position>)
        .transpose()?;
    let overrides = StyleOverrides {
        font_size: cli.font_size,
        color: cli.color.as_deref().map(str::parse::<Rgb>).transpose()?,
        opacity: cli.opacity,
    };

    match (&cli.folder, &cli.output) {
        (Some(folder), None) => cmd_batch(folder.clone(), position, overrides, &cli),
        _ => cmd_merge(position, overrides, &cli),
    }
}

/// Merge the inputs and watermark the result
fn cmd_merge(position: Option<Position>, overrides: StyleOverrides, cli: &Cli) -> Result<()> {
    let (Some(output), Some(text)) = (&cli.output, &cli.text) else {
        bail!("output filename and watermark text are required in merge mode.");
    };

    let inputs = match &cli.folder {
        Some(folder) => discover_pdfs(folder)?,
        None => expand_inputs(&cli.files)?,
    };
    if inputs.is_empty() {
        bail!("No input PDF files provided.");
    }

    let position = position.unwrap_or(Position::Center);
    let options = MergeWatermarkOptions {
        input_paths: inputs,
        output_path: output.clone(),
        watermark: WatermarkOptions::single(text.as_str(), position)
            .with_overrides(&overrides)
            .with_page(cli.page_size.into()),
    };

    eprintln!(
        "Merging {} PDF(s) with a {} watermark...",
        options.input_paths.len(),
        position
    );

    let pages = merge_and_watermark(&options)?;

    eprintln!(
        "Merged and watermarked PDF saved as: {} ({} pages)",
        output.display(),
        pages
    );

    Ok(())
}

/// Watermark every PDF of a folder with its own name
fn cmd_batch(
    folder: PathBuf,
    position: Option<Position>,
    overrides: StyleOverrides,
    cli: &Cli,
) -> Result<()> {
    let options = BatchOptions {
        output_root: cli.output_root.clone(),
        include_center: position == Some(Position::Center),
        overrides,
        page: cli.page_size.into(),
        on_error: if cli.keep_going {
            FailurePolicy::Continue
        } else {
            FailurePolicy::Abort
        },
        ..BatchOptions::new(folder)
    };

    let report = watermark_folder_with_progress(&options, |file| {
        eprintln!("Watermarking: {}", file.display());
    })?;

    for failure in &report.failed {
        eprintln!("Failed: {}: {}", failure.input.display(), failure.error);
    }

    if !report.is_success() {
        bail!(
            "{} of {} files failed",
            report.failed.len(),
            report.failed.len() + report.written.len()
        );
    }

    eprintln!(
        "All watermarked files are saved in: {}",
        report.output_dir.display()
    );

    Ok(())
}
