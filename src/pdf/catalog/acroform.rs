//! AcroForm field reader built on lopdf

use super::{FieldType, FormField};
use crate::error::{Error, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;
use std::path::Path;

/// Deepest field nesting that is still walked
const MAX_FIELD_DEPTH: usize = 32;

/// Read the fillable fields of a PDF from Root/AcroForm/Fields.
///
/// Names and values are returned as raw strings. A document without an
/// AcroForm has no fields.
pub fn read_acroform_fields(path: &Path) -> Result<Vec<FormField>> {
    let doc = Document::load(path).map_err(|e| Error::InvalidPdf {
        reason: format!("{}: {}", path.display(), e),
    })?;
    fields_from_document(&doc)
}

pub(crate) fn fields_from_document(doc: &Document) -> Result<Vec<FormField>> {
    let catalog = doc.catalog().map_err(|e| Error::InvalidPdf {
        reason: format!("document catalog: {}", e),
    })?;

    let Some(acroform) = catalog
        .get(b"AcroForm")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
    else {
        return Ok(Vec::new());
    };

    let Some(roots) = acroform
        .get(b"Fields")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_array().ok())
    else {
        return Ok(Vec::new());
    };

    let mut fields = Vec::new();
    let mut visited = HashSet::new();
    for root in roots {
        if !first_visit(root, &mut visited) {
            continue;
        }
        if let Some(dict) = resolve(doc, root).and_then(|obj| obj.as_dict().ok()) {
            collect_field(doc, dict, &Inherited::default(), 0, &mut visited, &mut fields);
        }
    }
    Ok(fields)
}

/// Attributes a field inherits from its ancestors
#[derive(Default, Clone)]
struct Inherited {
    name: Option<String>,
    field_type: Option<FieldType>,
    value: Option<String>,
}

fn collect_field(
    doc: &Document,
    dict: &Dictionary,
    parent: &Inherited,
    depth: usize,
    visited: &mut HashSet<ObjectId>,
    out: &mut Vec<FormField>,
) {
    if depth > MAX_FIELD_DEPTH {
        tracing::debug!("field tree too deep, stopping");
        return;
    }

    let partial = dict.get(b"T").ok().and_then(|obj| text_value(doc, obj));
    let name = match (&parent.name, partial) {
        (Some(prefix), Some(partial)) => Some(format!("{}.{}", prefix, partial)),
        (None, partial) => partial,
        (Some(prefix), None) => Some(prefix.clone()),
    };

    let field_type = match dict.get(b"FT").ok().and_then(|obj| resolve(doc, obj)) {
        Some(Object::Name(ft)) => FieldType::from_pdf_name(ft),
        _ => parent.field_type,
    };

    let value = dict
        .get(b"V")
        .ok()
        .and_then(|obj| text_value(doc, obj))
        .or_else(|| parent.value.clone());

    let named_kids: Vec<&Dictionary> = dict
        .get(b"Kids")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_array().ok())
        .map(|kids| {
            kids.iter()
                .filter(|kid| first_visit(kid, visited))
                .filter_map(|kid| resolve(doc, kid).and_then(|obj| obj.as_dict().ok()))
                .filter(|kid| kid.has(b"T"))
                .collect()
        })
        .unwrap_or_default();

    if !named_kids.is_empty() {
        let inherited = Inherited {
            name,
            field_type,
            value,
        };
        for kid in named_kids {
            collect_field(doc, kid, &inherited, depth + 1, visited, out);
        }
        return;
    }

    let Some(name) = name else {
        tracing::debug!("skipping field without a name");
        return;
    };

    match field_type {
        Some(field_type) => out.push(FormField {
            name,
            field_type,
            current_value: value.unwrap_or_default(),
        }),
        None => tracing::debug!(%name, "skipping field with unsupported type"),
    }
}

/// Record a field reference, returning false when it was already walked.
/// Kids arrays that point back up the tree would otherwise recurse forever.
fn first_visit(obj: &Object, visited: &mut HashSet<ObjectId>) -> bool {
    match obj {
        Object::Reference(id) => visited.insert(*id),
        _ => true,
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// String or name content of an object, undecoded beyond the PDF text encoding
fn text_value(doc: &Document, obj: &Object) -> Option<String> {
    match resolve(doc, obj)? {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, otherwise UTF-8 or Latin-1
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        return char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
