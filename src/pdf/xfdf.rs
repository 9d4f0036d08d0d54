//! XFDF document generation for the form filler

use quick_xml::escape::escape;

const XFDF_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?><xfdf><fields>"#;
const XFDF_FOOTER: &str = "</fields></xfdf>";

/// Value written for a checked button
pub const BUTTON_ON: &str = "Yes";
/// Value written for an unchecked button
pub const BUTTON_OFF: &str = "Off";

/// Build an XFDF document from text and button values.
///
/// Entries are written in the order the iterators yield them, text fields
/// first. Both names and values are XML-escaped.
pub fn build_xfdf<'a, T, B>(text_values: T, button_values: B) -> Vec<u8>
where
    T: IntoIterator<Item = (&'a str, &'a str)>,
    B: IntoIterator<Item = (&'a str, bool)>,
{
    let mut doc = String::with_capacity(256);
    doc.push_str(XFDF_HEADER);
    doc.push('\n');

    for (name, value) in text_values {
        push_field(&mut doc, name, &escape(value));
    }

    for (name, checked) in button_values {
        push_field(&mut doc, name, if checked { BUTTON_ON } else { BUTTON_OFF });
    }

    doc.push_str(XFDF_FOOTER);
    doc.push('\n');
    doc.into_bytes()
}

fn push_field(doc: &mut String, name: &str, escaped_value: &str) {
    doc.push_str("<field name=\"");
    doc.push_str(&escape(name));
    doc.push_str("\"><value>");
    doc.push_str(escaped_value);
    doc.push_str("</value></field>");
}
