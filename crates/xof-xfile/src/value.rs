//! Runtime values of template fields.

use std::fmt;

use crate::template::TemplateId;

/// A field value produced by repacking or supplied programmatically.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DataObject {
    /// Integer value (all integer field kinds).
    Int(i64),
    /// Floating point value (`FLOAT` and `DOUBLE`).
    Double(f64),
    /// String value.
    Str(String),
    /// Homogeneous array, one level per array dimension.
    Array(Vec<DataObject>),
    /// Nested record of a template-typed field.
    Record(RecordValue),
}

/// Fields of a nested record value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RecordValue {
    /// Template the fields conform to.
    pub template: TemplateId,
    /// Name of the field holding this record, if any.
    pub name: Option<String>,
    /// Field values in template order.
    pub fields: Vec<DataObject>,
}

impl DataObject {
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value as f64 (integers convert).
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array(&self) -> Option<&[DataObject]> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_record(&self) -> Option<&RecordValue> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Arrays and records are complex; they are written one element per line.
    #[inline]
    pub fn is_complex(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Record(_))
    }

    /// Single-line text form.
    ///
    /// Array elements are joined with `sep`, record fields with `;`.
    pub fn to_text(&self, sep: &str) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Double(v) => format_double(*v),
            Self::Str(s) => quote_string(s),
            Self::Array(items) => items
                .iter()
                .map(|item| item.to_text(sep))
                .collect::<Vec<_>>()
                .join(sep),
            Self::Record(record) => record
                .fields
                .iter()
                .map(|field| field.to_text(sep))
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

impl RecordValue {
    /// Field value by position.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&DataObject> {
        self.fields.get(index)
    }
}

impl fmt::Display for DataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text(", "))
    }
}

/// Format a real so it always reads back as a real.
///
/// `.x` readers tell floats from integers by the decimal point, so integral
/// values get a trailing `.0`. Non-finite values have no `.x` spelling and
/// are written as `0.0`.
pub fn format_double(value: f64) -> String {
    if !value.is_finite() {
        tracing::warn!(value, "non-finite real written as 0.0");
        return "0.0".to_string();
    }
    let mut text = value.to_string();
    if !text.contains('.') {
        text.push_str(".0");
    }
    text
}

/// Quote a string, escaping `\n`, `\r`, `"` and `\`.
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
