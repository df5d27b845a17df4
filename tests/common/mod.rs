//! Fixture PDFs and inspection helpers shared by the integration tests
#![allow(dead_code)]

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat, Stream};

/// Write a PDF whose page `i` shows the text `<label>-<i>`
///
/// Resources and MediaBox live on the Pages node, so pages inherit them.
pub fn write_pdf(path: &Path, label: &str, pages: usize) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    let font_id = doc.add_object(Object::Dictionary(font));

    let mut fonts = Dictionary::new();
    fonts.set("F1", Object::Reference(font_id));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));
    let resources_id = doc.add_object(Object::Dictionary(resources));

    let mut kids = Vec::new();
    for i in 1..=pages {
        let text = format!("{}-{}", label, i);
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                Operation::new("Td", vec![Object::Integer(72), Object::Integer(720)]),
                Operation::new(
                    "Tj",
                    vec![Object::String(text.into_bytes(), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().expect("encode content"),
        ));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set("Contents", Object::Reference(content_id));
        kids.push(Object::Reference(doc.add_object(Object::Dictionary(page))));
    }

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(kids.len() as i64));
    pages_dict.set("Kids", Object::Array(kids));
    pages_dict.set("Resources", Object::Reference(resources_id));
    pages_dict.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ]),
    );
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc.save(path).expect("save fixture");
}

/// Load a PDF with every stream decompressed
pub fn load(path: &Path) -> Document {
    let mut doc = Document::load(path).expect("load PDF");
    doc.decompress();
    doc
}

pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

fn shown_text(ops: &[Operation]) -> Vec<String> {
    ops.iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| op.operands.first())
        .filter_map(|obj| obj.as_str().ok())
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .collect()
}

fn number(obj: &Object) -> f32 {
    match obj {
        Object::Integer(v) => *v as f32,
        Object::Real(v) => *v,
        other => panic!("not a number: {:?}", other),
    }
}

/// The page's own text, in order, ignoring overlays
pub fn page_labels(path: &Path) -> Vec<String> {
    let doc = load(path);
    page_ids(&doc)
        .into_iter()
        .map(|page_id| {
            let content = doc.get_page_content(page_id).expect("page content");
            let ops = Content::decode(&content).expect("decode page").operations;
            shown_text(&ops).join(" ")
        })
        .collect()
}

/// A piece of overlay text with the baseline of its text matrix
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayText {
    pub text: String,
    pub x: f32,
    pub y: f32,
    /// `b` component of the text matrix; non-zero means rotated
    pub skew: f32,
}

/// Text drawn by the Form XObjects a page invokes with `Do`
pub fn overlay_texts(doc: &Document, page_id: ObjectId) -> Vec<OverlayText> {
    let content = doc.get_page_content(page_id).expect("page content");
    let ops = Content::decode(&content).expect("decode page").operations;

    let page = doc.get_dictionary(page_id).expect("page dict");
    let resources = page
        .get(b"Resources")
        .and_then(Object::as_dict)
        .expect("page has inline Resources after overlay");
    let xobjects = resources
        .get(b"XObject")
        .and_then(Object::as_dict)
        .expect("XObject resources");

    let mut texts = Vec::new();
    for op in ops.iter().filter(|op| op.operator == "Do") {
        let name = op.operands[0].as_name().expect("XObject name");
        let form_id = xobjects
            .get(name)
            .and_then(Object::as_reference)
            .expect("XObject reference");
        let form = doc
            .get_object(form_id)
            .and_then(Object::as_stream)
            .expect("form stream");
        let form_ops = Content::decode(&form.content).expect("decode form").operations;

        let mut matrix = None;
        for form_op in &form_ops {
            match form_op.operator.as_str() {
                "Tm" => matrix = Some(form_op.operands.clone()),
                "Tj" => {
                    let m = matrix.as_ref().expect("Tm before Tj");
                    texts.push(OverlayText {
                        text: String::from_utf8_lossy(form_op.operands[0].as_str().unwrap())
                            .into_owned(),
                        x: number(&m[4]),
                        y: number(&m[5]),
                        skew: number(&m[1]),
                    });
                }
                _ => {}
            }
        }
    }
    texts
}

/// Write a structurally valid PDF with no pages at all
pub fn write_empty_pdf(path: &Path) {
    let mut doc = Document::with_version("1.5");

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Kids", Object::Array(vec![]));
    pages.set("Count", Object::Integer(0));
    let pages_id = doc.add_object(Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc.save(path).expect("save empty PDF");
}
