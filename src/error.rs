//! Error types for the pdf-stamp library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the pdf-stamp library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Input folder does not exist
    #[error("Input folder '{}' does not exist", .0.display())]
    FolderNotFound(PathBuf),

    /// Folder exists but holds no `*.pdf` files
    #[error("No PDF files found in {}", .0.display())]
    NoPdfFiles(PathBuf),

    /// Invalid glob pattern
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// No files matched pattern
    #[error("No PDF files found matching pattern: {0}")]
    NoFilesMatched(String),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// Unknown watermark position
    #[error("Invalid watermark position '{0}'. Choose from: center, header, footer")]
    InvalidPosition(String),

    /// Bad color, opacity or font size
    #[error("Invalid watermark style: {0}")]
    InvalidStyle(String),

    /// General error
    #[error("{0}")]
    General(String),
}
