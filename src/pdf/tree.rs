//! Page tree helpers shared by merging and overlaying

use std::collections::BTreeSet;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::Result;

/// Page attributes a page may inherit from its ancestor `Pages` nodes
pub const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic Parent chains in malformed files
const MAX_TREE_DEPTH: usize = 64;

/// Look up `key` on a page, falling back to its ancestors in the page tree
pub fn find_inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = Some(page_id);
    let mut depth = 0;

    while let Some(id) = current {
        if depth > MAX_TREE_DEPTH {
            break;
        }
        let dict = doc.get_dictionary(id).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    None
}

/// Copy inherited attributes onto the page itself
///
/// Needed before a page is moved under a different `Pages` node, otherwise
/// it silently loses the resources and boxes of its old ancestors.
pub fn materialize_inherited_attributes(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut inherited = Vec::new();
    {
        let page = doc.get_dictionary(page_id)?;
        for key in INHERITABLE_KEYS {
            if page.has(key) {
                continue;
            }
            if let Some(value) = find_inherited(doc, page_id, key) {
                inherited.push((key.to_vec(), value));
            }
        }
    }

    if !inherited.is_empty() {
        let page = doc.get_dictionary_mut(page_id)?;
        for (key, value) in inherited {
            page.set(key, value);
        }
    }

    Ok(())
}

/// Resolve an object that may be a reference into an owned dictionary
///
/// Anything that is not a dictionary resolves to an empty one.
pub fn resolve_dictionary(doc: &Document, object: &Object) -> Dictionary {
    match object {
        Object::Dictionary(dict) => dict.clone(),
        Object::Reference(id) => doc
            .get_dictionary(*id)
            .map(Clone::clone)
            .unwrap_or_else(|_| Dictionary::new()),
        _ => Dictionary::new(),
    }
}

/// The effective Resources dictionary of a page, as an owned copy
pub fn page_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    find_inherited(doc, page_id, b"Resources")
        .map(|res| resolve_dictionary(doc, &res))
        .unwrap_or_else(Dictionary::new)
}

/// Collect the ids of every object reachable from `object`
pub fn collect_references(doc: &Document, object: &Object, seen: &mut BTreeSet<ObjectId>) {
    match object {
        Object::Reference(id) => {
            if seen.insert(*id) {
                if let Ok(target) = doc.get_object(*id) {
                    collect_references(doc, target, seen);
                }
            }
        }
        Object::Array(items) => {
            for item in items {
                collect_references(doc, item, seen);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                collect_references(doc, value, seen);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter() {
                collect_references(doc, value, seen);
            }
        }
        _ => {}
    }
}

/// Content stream ids of a page, in drawing order
pub fn content_stream_ids(doc: &Document, page_id: ObjectId) -> Result<Vec<ObjectId>> {
    let page = doc.get_dictionary(page_id)?;

    let ids = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            // A reference to an array of streams
            Ok(Object::Array(items)) => references_in(items),
            _ => vec![*id],
        },
        Ok(Object::Array(items)) => references_in(items),
        _ => Vec::new(),
    };

    Ok(ids)
}

fn references_in(items: &[Object]) -> Vec<ObjectId> {
    items
        .iter()
        .filter_map(|obj| obj.as_reference().ok())
        .collect()
}
