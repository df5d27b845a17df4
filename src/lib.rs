//! PDF Stamp Library
//!
//! Merges PDF documents and stamps a text watermark onto every page.
//! This library provides functionality to:
//! - Merge multiple PDF files in order
//! - Create one-page watermark PDFs (diagonal, header, footer)
//! - Overlay a watermark page onto every page of a document
//! - Watermark every PDF of a folder with its own file name
//!
//! # Example
//!
//! ```no_run
//! use pdf_stamp::layout::Position;
//! use pdf_stamp::workflow::{merge_and_watermark, MergeWatermarkOptions};
//! use std::path::PathBuf;
//!
//! let options = MergeWatermarkOptions::new(
//!     vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")],
//!     PathBuf::from("out.pdf"),
//!     "DRAFT",
//!     Position::Footer,
//! );
//!
//! merge_and_watermark(&options).expect("Failed to merge and watermark");
//! ```

pub mod error;
pub mod layout;
pub mod pdf;
pub mod workflow;

// Re-export commonly used items
pub use error::{Error, Result};
