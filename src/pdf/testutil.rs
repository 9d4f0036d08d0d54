//! Helpers for building small AcroForm documents in tests

use lopdf::{dictionary, Document, Object, StringFormat};

pub(crate) struct TestField {
    field_type: &'static str,
    name: Object,
    value: Option<Object>,
}

impl TestField {
    pub(crate) fn text(name: &str, value: Option<&str>) -> Self {
        Self {
            field_type: "Tx",
            name: Object::string_literal(name),
            value: value.map(Object::string_literal),
        }
    }

    pub(crate) fn button(name: &str, state: Option<&str>) -> Self {
        Self {
            field_type: "Btn",
            name: Object::string_literal(name),
            value: state.map(|s| Object::Name(s.as_bytes().to_vec())),
        }
    }

    pub(crate) fn other(field_type: &'static str, name: &str) -> Self {
        Self {
            field_type,
            name: Object::string_literal(name),
            value: None,
        }
    }

    pub(crate) fn text_utf16(name: &str) -> Self {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in name.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Self {
            field_type: "Tx",
            name: Object::String(bytes, StringFormat::Hexadecimal),
            value: None,
        }
    }
}

/// One-page PDF whose AcroForm lists `fields`; no AcroForm when empty
pub(crate) fn form_pdf(fields: &[TestField]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.new_object_id();

    let mut field_ids = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        let y = 700 - 40 * i as i64;
        let mut dict = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => field.field_type,
            "T" => field.name.clone(),
            "Rect" => vec![50.into(), y.into(), 250.into(), (y + 20).into()],
            "P" => page_id,
        };
        if let Some(value) = &field.value {
            dict.set("V", value.clone());
        }
        field_ids.push(doc.add_object(dict));
    }

    let annots: Vec<Object> = field_ids.iter().map(|id| (*id).into()).collect();
    doc.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Annots" => annots.clone(),
        }),
    );
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };
    if !fields.is_empty() {
        let acroform = doc.add_object(dictionary! { "Fields" => annots });
        catalog.set("AcroForm", acroform);
    }
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save test pdf");
    out
}
