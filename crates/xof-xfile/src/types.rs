//! Field data types.

use crate::template::TemplateId;

/// Data type of a template field.
///
/// Primitive kinds map to the `.x` keywords; [`FieldKind::Template`] embeds
/// another registered template as a nested record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FieldKind {
    /// Unsigned 16-bit integer.
    Word,
    /// Unsigned 32-bit integer.
    Dword,
    /// 32-bit floating point.
    Float,
    /// 64-bit floating point.
    Double,
    /// Signed 8-bit integer.
    Char,
    /// Unsigned 8-bit integer.
    UChar,
    /// Signed 16-bit integer.
    SWord,
    /// Signed 32-bit integer.
    SDword,
    /// String value (`STRING` / `LPSTR`).
    String,
    /// C string value.
    CString,
    /// Unicode string value.
    Unicode,
    /// Nested record of another template.
    Template(TemplateId),
}

/// Category of value a field consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCategory {
    Integer,
    Real,
    Text,
    Record,
}

impl ValueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Text => "string",
            Self::Record => "record",
        }
    }
}

impl FieldKind {
    /// Parse a primitive type keyword (case-insensitive).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let kind = match keyword.to_ascii_uppercase().as_str() {
            "WORD" => Self::Word,
            "DWORD" => Self::Dword,
            "FLOAT" => Self::Float,
            "DOUBLE" => Self::Double,
            "CHAR" => Self::Char,
            "UCHAR" | "BYTE" => Self::UChar,
            "SWORD" => Self::SWord,
            "SDWORD" => Self::SDword,
            "STRING" | "LPSTR" => Self::String,
            "CSTRING" => Self::CString,
            "UNICODE" => Self::Unicode,
            _ => return None,
        };
        Some(kind)
    }

    /// Keyword written for a primitive kind, `None` for template kinds.
    pub fn keyword(&self) -> Option<&'static str> {
        let keyword = match self {
            Self::Word => "WORD",
            Self::Dword => "DWORD",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Char => "CHAR",
            Self::UChar => "UCHAR",
            Self::SWord => "SWORD",
            Self::SDword => "SDWORD",
            Self::String => "STRING",
            Self::CString => "CSTRING",
            Self::Unicode => "UNICODE",
            Self::Template(_) => return None,
        };
        Some(keyword)
    }

    /// Category of staged token this kind consumes.
    pub fn category(&self) -> ValueCategory {
        match self {
            Self::Word
            | Self::Dword
            | Self::Char
            | Self::UChar
            | Self::SWord
            | Self::SDword => ValueCategory::Integer,
            Self::Float | Self::Double => ValueCategory::Real,
            Self::String | Self::CString | Self::Unicode => ValueCategory::Text,
            Self::Template(_) => ValueCategory::Record,
        }
    }

    /// Check if this is a primitive (non-template) kind.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Self::Template(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_round_trip() {
        for keyword in [
            "WORD", "DWORD", "FLOAT", "DOUBLE", "CHAR", "UCHAR", "SWORD", "SDWORD", "STRING",
            "CSTRING", "UNICODE",
        ] {
            let kind = FieldKind::from_keyword(keyword).unwrap();
            assert_eq!(kind.keyword(), Some(keyword));
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!(FieldKind::from_keyword("lpstr"), Some(FieldKind::String));
        assert_eq!(FieldKind::from_keyword("Byte"), Some(FieldKind::UChar));
        assert_eq!(FieldKind::from_keyword("Vector"), None);
    }

    #[test]
    fn test_categories() {
        assert_eq!(FieldKind::Dword.category(), ValueCategory::Integer);
        assert_eq!(FieldKind::Float.category(), ValueCategory::Real);
        assert_eq!(FieldKind::Unicode.category(), ValueCategory::Text);
        assert_eq!(FieldKind::Template(TemplateId(0)).category(), ValueCategory::Record);
        assert!(!FieldKind::Template(TemplateId(3)).is_primitive());
    }
}
