//! Parser for `pdftk dump_data_fields` reports
//!
//! The report is a list of records separated by `---` lines:
//!
//! ```text
//! ---
//! FieldType: Text
//! FieldName: Name
//! FieldFlags: 0
//! FieldValue: Karel &amp; Co
//! FieldJustification: Left
//! ---
//! FieldType: Button
//! FieldName: Accept
//! ```

use super::{FieldType, FormField};
use crate::error::{Error, Result};
use quick_xml::escape::resolve_html5_entity;
use std::borrow::Cow;

const RECORD_SEPARATOR: &str = "---";

#[derive(Default)]
struct Record {
    field_type: Option<String>,
    name: Option<String>,
    value: Option<String>,
}

impl Record {
    fn is_empty(&self) -> bool {
        self.field_type.is_none() && self.name.is_none() && self.value.is_none()
    }

    /// Convert into a form field, or `None` when the type cannot be filled
    fn finish(self) -> Result<Option<FormField>> {
        let Some(field_type) = self
            .field_type
            .as_deref()
            .and_then(FieldType::from_dump_token)
        else {
            tracing::debug!(
                name = self.name.as_deref().unwrap_or_default(),
                field_type = self.field_type.as_deref().unwrap_or_default(),
                "skipping field with unsupported type"
            );
            return Ok(None);
        };

        let name = self.name.ok_or_else(|| Error::DumpParse {
            line: format!("FieldType: {} (record has no FieldName)", field_type),
        })?;

        Ok(Some(FormField {
            name,
            field_type,
            current_value: self.value.unwrap_or_default(),
        }))
    }
}

/// Parse a field dump into fillable fields, in report order.
///
/// Fields whose type is neither `Text` nor `Button` are dropped. A line that
/// is not a `Key: Value` pair fails the whole parse.
pub fn parse_field_dump(report: &str) -> Result<Vec<FormField>> {
    let mut fields = Vec::new();
    let mut record = Record::default();

    for line in report.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.is_empty() {
            continue;
        }

        if line == RECORD_SEPARATOR {
            if !record.is_empty() {
                fields.extend(std::mem::take(&mut record).finish()?);
            }
            continue;
        }

        let (key, value) = line.split_once(": ").ok_or_else(|| Error::DumpParse {
            line: line.to_string(),
        })?;

        let slot = match key {
            "FieldType" => &mut record.field_type,
            "FieldName" => &mut record.name,
            "FieldValue" => &mut record.value,
            _ => continue,
        };
        *slot = Some(unescape_entities(value));
    }

    if !record.is_empty() {
        fields.extend(record.finish()?);
    }

    Ok(fields)
}

/// Replace HTML character references. A bare `&` or an unknown entity is
/// kept as written.
fn unescape_entities(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let resolved = tail
            .find(';')
            .and_then(|end| resolve_reference(&tail[..end]).map(|text| (end, text)));
        match resolved {
            Some((end, text)) => {
                out.push_str(&text);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

fn resolve_reference(entity: &str) -> Option<Cow<'static, str>> {
    let Some(number) = entity.strip_prefix('#') else {
        return resolve_html5_entity(entity).map(Cow::Borrowed);
    };

    let code = match number.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => number.parse::<u32>().ok()?,
    };
    let c = char::from_u32(code)
        .filter(|&c| c != '\0')
        .unwrap_or(char::REPLACEMENT_CHARACTER);
    Some(Cow::Owned(c.to_string()))
}
