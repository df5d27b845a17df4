//! PDF merging and watermark overlay using lopdf

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::pdf::metadata::set_document_info;
use crate::pdf::tree::{
    collect_references, content_stream_ids, find_inherited, materialize_inherited_attributes,
    page_resources, resolve_dictionary,
};

/// Resource name prefix of the imported watermark Form XObject
const OVERLAY_NAME: &str = "Wm";

/// Options for merging PDFs
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Input PDF file paths in the order they should be merged
    pub input_paths: Vec<PathBuf>,
    /// Output PDF file path
    pub output_path: PathBuf,
}

/// Merge multiple PDF files into a single PDF
///
/// Pages appear in input order, each document's pages in their own order.
/// Returns the number of pages in the merged document.
///
/// Based on the lopdf merge example:
/// https://github.com/J-F-Liu/lopdf/blob/main/examples/merge.rs
///
/// # Example
///
/// ```no_run
/// use pdf_stamp::pdf::{MergeOptions, merge_pdfs};
/// use std::path::PathBuf;
///
/// let options = MergeOptions {
///     input_paths: vec![
///         PathBuf::from("a.pdf"),
///         PathBuf::from("b.pdf"),
///     ],
///     output_path: PathBuf::from("merged.pdf"),
/// };
///
/// merge_pdfs(&options).expect("Failed to merge");
/// ```
pub fn merge_pdfs(options: &MergeOptions) -> Result<usize> {
    if options.input_paths.is_empty() {
        return Err(Error::General("No input files provided".to_string()));
    }

    // Validate all input files exist
    for path in &options.input_paths {
        if !path.exists() {
            return Err(Error::FileNotFound(path.clone()));
        }
    }

    // Define a starting max_id for merged document
    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for path in &options.input_paths {
        let mut doc = Document::load(path)?;

        // Renumber objects in this document to avoid conflicts
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        debug!(path = %path.display(), pages = pages.len(), "loaded input");

        // Pages are about to lose their old ancestors
        for &page_id in &pages {
            materialize_inherited_attributes(&mut doc, page_id)?;
        }

        page_ids.extend(pages);
        objects.extend(doc.objects);
    }

    let mut merged_doc = Document::with_version("1.5");

    // Add all collected objects FIRST
    merged_doc.objects.extend(objects);

    // Otherwise new_object_id() will return IDs that collide with existing objects
    merged_doc.max_id = max_id - 1;

    let pages_id = merged_doc.new_object_id();

    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();

    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(page_ids.len() as i64));
    pages_object.set("Kids", Object::Array(kids));
    merged_doc
        .objects
        .insert(pages_id, Object::Dictionary(pages_object));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = merged_doc.add_object(Object::Dictionary(catalog));
    merged_doc.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in &page_ids {
        let page = merged_doc.get_dictionary_mut(page_id)?;
        page.set("Parent", Object::Reference(pages_id));
    }

    // Old catalogs and page-tree nodes are unreachable now
    let pruned = merged_doc.prune_objects();
    debug!(pruned = pruned.len(), "pruned unreferenced objects");

    set_document_info(&mut merged_doc, None);

    if let Some(parent) = non_empty_parent(&options.output_path) {
        fs::create_dir_all(parent)?;
    }

    merged_doc.compress();
    merged_doc.save(&options.output_path)?;

    info!(
        inputs = options.input_paths.len(),
        pages = page_ids.len(),
        output = %options.output_path.display(),
        "merged PDFs"
    );

    Ok(page_ids.len())
}

/// Overlay a one-page watermark PDF onto every page of a source PDF
///
/// The watermark's first page is imported once as a Form XObject and drawn
/// on top of each source page. The original page content is wrapped in
/// `q`/`Q` so any transformation it leaves behind does not move the
/// watermark. Page count and order are unchanged; the number of stamped
/// pages is returned.
///
/// # Arguments
///
/// * `source_path` - Path to the source PDF file
/// * `watermark_path` - Path to the watermark PDF file (first page is used)
/// * `output_path` - Path where the combined PDF will be saved
///
/// # Example
///
/// ```no_run
/// use pdf_stamp::pdf::overlay_watermark;
/// use std::path::Path;
///
/// overlay_watermark(
///     Path::new("source.pdf"),
///     Path::new("watermark.pdf"),
///     Path::new("output.pdf")
/// ).expect("Failed to overlay");
/// ```
pub fn overlay_watermark(
    source_path: &Path,
    watermark_path: &Path,
    output_path: &Path,
) -> Result<usize> {
    for path in [source_path, watermark_path] {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
    }

    let mut source_doc = Document::load(source_path)?;
    let watermark_doc = Document::load(watermark_path)?;

    let form_id = import_watermark_page(&mut source_doc, watermark_doc, watermark_path)?;

    let source_pages: Vec<ObjectId> = source_doc.get_pages().into_values().collect();

    // The opening `q` stream is the same for every page
    let open_id = source_doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let mut close_streams: BTreeMap<String, ObjectId> = BTreeMap::new();

    for &page_id in &source_pages {
        let name = attach_form_to_resources(&mut source_doc, page_id, form_id)?;

        let close_id = match close_streams.get(&name) {
            Some(&id) => id,
            None => {
                let invoke = format!("Q\nq\n/{} Do\nQ\n", name);
                let id = source_doc.add_object(Stream::new(Dictionary::new(), invoke.into_bytes()));
                close_streams.insert(name, id);
                id
            }
        };

        wrap_page_contents(&mut source_doc, page_id, open_id, close_id)?;
    }

    set_document_info(&mut source_doc, None);

    if let Some(parent) = non_empty_parent(output_path) {
        fs::create_dir_all(parent)?;
    }

    source_doc.compress();
    source_doc.save(output_path)?;

    info!(
        pages = source_pages.len(),
        output = %output_path.display(),
        "applied watermark"
    );

    Ok(source_pages.len())
}

/// Copy the watermark's first page into `target` as a Form XObject
fn import_watermark_page(
    target: &mut Document,
    mut watermark_doc: Document,
    watermark_path: &Path,
) -> Result<ObjectId> {
    // Move watermark objects past everything already in the target
    watermark_doc.renumber_objects_with(target.max_id + 1);
    watermark_doc.decompress();

    let page_id = watermark_doc
        .get_pages()
        .into_values()
        .next()
        .ok_or_else(|| Error::EmptyPdf(watermark_path.to_path_buf()))?;

    let content = watermark_doc.get_page_content(page_id)?;
    let resources = page_resources(&watermark_doc, page_id);
    let bbox = find_inherited(&watermark_doc, page_id, b"MediaBox").unwrap_or_else(|| {
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ])
    });

    // Bring over only what the page's resources actually use
    let mut needed = BTreeSet::new();
    collect_references(
        &watermark_doc,
        &Object::Dictionary(resources.clone()),
        &mut needed,
    );
    debug!(objects = needed.len(), "importing watermark resources");

    for id in needed {
        if let Some(object) = watermark_doc.objects.remove(&id) {
            target.objects.insert(id, object);
        }
    }
    target.max_id = target.max_id.max(watermark_doc.max_id);

    let mut form = Dictionary::new();
    form.set("Type", Object::Name(b"XObject".to_vec()));
    form.set("Subtype", Object::Name(b"Form".to_vec()));
    form.set("FormType", Object::Integer(1));
    form.set("BBox", bbox);
    form.set("Resources", Object::Dictionary(resources));

    Ok(target.add_object(Stream::new(form, content)))
}

/// Register the watermark form in the page's own Resources and return its name
///
/// Inherited or shared (referenced) resources are copied onto the page so
/// other pages are unaffected.
fn attach_form_to_resources(
    doc: &mut Document,
    page_id: ObjectId,
    form_id: ObjectId,
) -> Result<String> {
    let mut resources = page_resources(doc, page_id);

    let mut xobjects = match resources.get(b"XObject") {
        Ok(xobjects) => resolve_dictionary(doc, xobjects),
        Err(_) => Dictionary::new(),
    };

    let name = unused_name(&xobjects, form_id);
    xobjects.set(name.as_str(), Object::Reference(form_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    let page = doc.get_dictionary_mut(page_id)?;
    page.set("Resources", Object::Dictionary(resources));

    Ok(name)
}

/// Pick an XObject name that is free on this page (or already points at our form)
fn unused_name(xobjects: &Dictionary, form_id: ObjectId) -> String {
    (0..)
        .map(|i| format!("{}{}", OVERLAY_NAME, i))
        .find(|name| match xobjects.get(name.as_bytes()) {
            Ok(Object::Reference(id)) => *id == form_id,
            Ok(_) => false,
            Err(_) => true,
        })
        .unwrap_or_else(|| OVERLAY_NAME.to_string())
}

/// Contents become `[open, original..., close]`
fn wrap_page_contents(
    doc: &mut Document,
    page_id: ObjectId,
    open_id: ObjectId,
    close_id: ObjectId,
) -> Result<()> {
    let existing = content_stream_ids(doc, page_id)?;

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing.into_iter().map(Object::Reference));
    contents.push(Object::Reference(close_id));

    let page = doc.get_dictionary_mut(page_id)?;
    page.set("Contents", Object::Array(contents));

    Ok(())
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_options_creation() {
        let options = MergeOptions {
            input_paths: vec![PathBuf::from("test1.pdf"), PathBuf::from("test2.pdf")],
            output_path: PathBuf::from("merged.pdf"),
        };

        assert_eq!(options.input_paths.len(), 2);
        assert_eq!(options.output_path, Path::new("merged.pdf"));
    }

    #[test]
    fn test_unused_name_skips_taken_names() {
        let mut xobjects = Dictionary::new();
        xobjects.set("Wm0", Object::Reference((7, 0)));
        xobjects.set("Wm1", Object::Name(b"Other".to_vec()));

        assert_eq!(unused_name(&xobjects, (99, 0)), "Wm2");
        // Reuse a slot that already points at our form
        assert_eq!(unused_name(&xobjects, (7, 0)), "Wm0");
    }

    #[test]
    fn test_non_empty_parent() {
        assert_eq!(non_empty_parent(Path::new("out.pdf")), None);
        assert_eq!(
            non_empty_parent(Path::new("data/out.pdf")),
            Some(Path::new("data"))
        );
    }

    #[test]
    fn test_overlay_missing_source() {
        let result = overlay_watermark(
            Path::new("nonexistent.pdf"),
            Path::new("also-missing.pdf"),
            Path::new("out.pdf"),
        );
        assert!(matches!(result, Err(Error::FileNotFound(p)) if p == Path::new("nonexistent.pdf")));
    }
}
