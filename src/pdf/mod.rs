//! PDF manipulation module

pub mod create;
pub mod merge;
pub mod metadata;
pub mod tree;

// Re-export commonly used items
pub use create::{create_watermark_pdf, Rgb, Stamp, StyleOverrides, WatermarkOptions, WatermarkStyle};
pub use merge::{merge_pdfs, overlay_watermark, MergeOptions};
pub use metadata::count_pages;
