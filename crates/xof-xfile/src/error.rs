//! Error types for `.x` reading, schema registration and repacking.

use thiserror::Error;
use xof_common::{FormatError, GuidKey};

use crate::header::FormatType;
use crate::staging::Position;
use crate::template::TemplateId;

/// Header framing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileError {
    /// The buffer does not start with a well-formed `.x` header.
    #[error("bad .x header: {0}")]
    BadHeader(String),

    /// The header is valid but the body encoding cannot be parsed.
    #[error("unsupported .x body format: {0} (only text bodies are supported)")]
    UnsupportedFormat(FormatType),
}

/// Errors raised while building a record from staged tokens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepackError {
    /// A dynamic array extent names a field with no integer value yet.
    #[error("array size field {0:?} has no value earlier in the record")]
    UnresolvedSize(String),

    /// A dynamic array extent resolved to a negative value.
    #[error("array size field {field:?} holds negative value {value}")]
    InvalidSize { field: String, value: i64 },

    /// An array of elements that hold no data is larger than the record
    /// body can account for.
    #[error("array {field} has {extent} elements that hold no data")]
    ExtentTooLarge { field: String, extent: usize },

    /// The record body ran out of data before every field was filled.
    #[error("not enough data for field {field} of template {template}")]
    Truncated { template: String, field: String },

    /// Data elements were left over after every field was filled.
    #[error("{remaining} too many data elements for template {template}")]
    TooManyTokens { template: String, remaining: usize },

    /// A staged token has the wrong category for its field.
    #[error("field {field} expects {expected} data, found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Programmatically supplied field values do not fit the template.
    #[error("fields do not match template {template}: {reason}")]
    ShapeMismatch { template: String, reason: String },

    /// A template id that is not registered in the file.
    #[error("unknown template id {0}")]
    UnknownTemplate(TemplateId),
}

/// Template and node registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A different node is already registered under this GUID.
    #[error("GUID {0} is already registered")]
    DuplicateGuid(GuidKey),

    /// No template with this name, GUID or id is registered.
    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    /// A template cannot be both open and restricted.
    #[error("template {0} is both open and restricted")]
    OpenAndRestricted(String),

    /// A dynamic array names a field that is not declared before it.
    #[error("template {template}: array {field} is sized by {size_field:?}, which is not an earlier field")]
    UnknownSizeField {
        template: String,
        field: String,
        size_field: String,
    },

    /// A record id that is not part of the file.
    #[error("unknown record id {0}")]
    UnknownRecord(u32),

    /// A reference target has neither a name nor a GUID, so it cannot be written.
    #[error("record {0} has no name or GUID and cannot be referenced")]
    UnnamedReferenceTarget(u32),

    /// A reference target that is not written before the reference.
    #[error("record {0} is not declared before the reference to it")]
    ForwardReference(u32),

    /// A reference by name that would read back as a different record.
    #[error("reference name {0:?} finds another record; give the target a GUID")]
    AmbiguousReference(String),

    /// A name that cannot be written back as a `.x` identifier.
    #[error("invalid identifier {0:?}")]
    InvalidName(String),
}

/// Errors in the text body syntax.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// A token that does not fit the grammar at this point.
    #[error("{position}: expected {expected}, found {found}")]
    Unexpected {
        position: Position,
        expected: &'static str,
        found: String,
    },

    /// A character that starts no token.
    #[error("{position}: unexpected character {found:?}")]
    BadCharacter { position: Position, found: char },

    /// A string literal with no closing quote.
    #[error("{position}: unterminated string")]
    UnterminatedString { position: Position },

    /// A numeric literal out of range.
    #[error("{position}: invalid number {text:?}")]
    BadNumber { position: Position, text: String },

    /// A malformed `<guid>` literal.
    #[error("{position}: {source}")]
    Guid {
        position: Position,
        #[source]
        source: FormatError,
    },

    /// A type or object names a template that is not declared.
    #[error("{position}: unknown template {name}")]
    UnknownTemplate { position: Position, name: String },

    /// A `{ name }` reference to an object that is not declared.
    #[error("{position}: unknown data object {name}")]
    UnknownReference { position: Position, name: String },
}

/// Errors that can occur when working with `.x` files.
#[derive(Debug, Error)]
pub enum Error {
    /// Header framing error.
    #[error(transparent)]
    File(#[from] FileError),

    /// Repack error outside of a parsed record.
    #[error(transparent)]
    Repack(#[from] RepackError),

    /// Registry error.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Body syntax error.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// GUID text error.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A parsed record failed to repack.
    #[error("{position}: record of template {template}: {source}")]
    Record {
        template: String,
        position: Position,
        #[source]
        source: RepackError,
    },

    /// A registry error attributed to a body position.
    #[error("{position}: {source}")]
    RegistryAt {
        position: Position,
        #[source]
        source: RegistryError,
    },
}

/// Result type for `.x` operations.
pub type Result<T> = std::result::Result<T, Error>;
