//! PDF metadata: page counting and the document Info dictionary

use std::path::Path;

use chrono::Local;
use lopdf::{Dictionary, Document, Object, StringFormat};

use crate::error::{Error, Result};

/// Producer string written into every document we create
pub const PRODUCER: &str = concat!("pdf-stamp ", env!("CARGO_PKG_VERSION"));

/// Count pages by reading the Count field from the Pages dictionary
/// This is more reliable than get_pages() which doesn't handle nested page trees
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog = doc.catalog()?;

    let pages_id = catalog
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|_| Error::General("No Pages reference in catalog".to_string()))?;

    let count = doc
        .get_dictionary(pages_id)?
        .get(b"Count")
        .and_then(Object::as_i64)
        .map_err(|_| Error::General("No integer Count in Pages".to_string()))?;

    usize::try_from(count).map_err(|_| Error::General(format!("Negative page count: {}", count)))
}

/// Count the number of pages in a PDF file
///
/// This is a quick operation that reads the Count field from the Pages dictionary.
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    count_pages_from_catalog(&doc)
}

/// Format a timestamp the way PDF dates are written (`D:YYYYMMDDHHmmSS`)
fn pdf_date_now() -> String {
    Local::now().format("D:%Y%m%d%H%M%S").to_string()
}

/// Encode an Info string: ASCII as a literal, anything else as UTF-16BE with BOM
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }

    let mut bytes = vec![0xfe, 0xff];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Attach a fresh Info dictionary (Producer, CreationDate, optional Title)
pub fn set_document_info(doc: &mut Document, title: Option<&str>) {
    let mut info = Dictionary::new();
    info.set("Producer", text_string(PRODUCER));
    info.set(
        "CreationDate",
        Object::String(pdf_date_now().into_bytes(), StringFormat::Literal),
    );
    if let Some(title) = title {
        info.set("Title", text_string(title));
    }

    let info_id = doc.add_object(Object::Dictionary(info));
    doc.trailer.set("Info", Object::Reference(info_id));
}
