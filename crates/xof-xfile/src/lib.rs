//! Template-driven data model for DirectX `.x` files.
//!
//! A `.x` file declares *templates* (GUID-identified record schemas) and
//! then data *records* that instantiate them. This crate reads the text
//! encoding into a typed tree, lets you build one in code, and writes it
//! back out.
//!
//! # Quick Start
//!
//! ```
//! use xof_xfile::{DataObject, ReadOptions, StandardLibrary, XFile};
//!
//! let library = StandardLibrary::load()?;
//! let text = b"xof 0302txt 0032
//! Mesh Quad {
//!   4;
//!   0.0; 0.0; 0.0;, 1.0; 0.0; 0.0;, 1.0; 1.0; 0.0;, 0.0; 1.0; 0.0;;
//!   1;
//!   4; 0, 1, 2, 3;;
//! }
//! ";
//! let file = XFile::read_with(text, &library, &ReadOptions::default())?;
//!
//! let quad = file.find_record("Quad").unwrap();
//! assert_eq!(file.field(quad, "nVertices"), Some(&DataObject::Int(4)));
//!
//! // Standard templates are not written back unless the file declared them.
//! let out = file.write();
//! assert!(out.starts_with(b"xof 0302txt 0032\nMesh Quad {"));
//! # Ok::<(), xof_xfile::Error>(())
//! ```
//!
//! # Architecture
//!
//! - **File** (`XFile`): header, template registry, record arena and the
//!   tree of [`NodeRef`] handles
//! - **Templates** (`Template`, `FieldDef`, `ArrayDim`): the schema
//! - **Records** (`DataNode`): template instances with [`DataObject`] fields
//! - **Staging** (`ParseStaging`): untyped tokens collected for one record
//!   body, turned into fields by [`repack`]
//!
//! # Building Files in Code
//!
//! ```
//! use xof_xfile::{ArrayDim, DataObject, FieldDef, FieldKind, StandardLibrary, Template, XFile};
//! use xof_common::GuidKey;
//!
//! let mut file = XFile::new(&StandardLibrary::empty());
//! let guid: GuidKey = "6b2a4c10-0d3e-4f8a-9b1c-2e5f7a8d9c01".parse()?;
//! let samples = file.register_template(
//!     Template::new("Samples", guid)
//!         .field(FieldDef::named(FieldKind::Dword, "count"))
//!         .field(FieldDef::named(FieldKind::Float, "values").with_dim(ArrayDim::Dynamic("count".into()))),
//! )?;
//! file.add_record(
//!     None,
//!     samples,
//!     Some("Noise"),
//!     None,
//!     vec![
//!         DataObject::Int(2),
//!         DataObject::Array(vec![DataObject::Double(0.5), DataObject::Double(-1.0)]),
//!     ],
//! )?;
//!
//! let reread = XFile::read(&file.write())?;
//! assert!(reread.find_record("Noise").is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod file;
mod header;
mod lexer;
mod node;
mod options;
mod parser;
mod record;
mod staging;
mod standard;
mod template;
mod types;
mod value;
mod writer;

pub mod repack;

// Primary API
pub use error::{Error, FileError, ParseError, RegistryError, RepackError, Result};
pub use file::{Diagnostic, Severity, XFile};
pub use header::{FloatSize, FormatType, XFileHeader};
pub use options::{ReadOptions, WriteOptions};
pub use standard::StandardLibrary;

// Data model
pub use node::{Children, Node, NodeRef};
pub use record::{DataNode, RecordId, RecordState};
pub use template::{ArrayDim, FieldDef, Template, TemplateId};
pub use types::{FieldKind, ValueCategory};
pub use value::{format_double, quote_string, DataObject, RecordValue};

// Staging
pub use staging::{ParseStaging, Position, StagedToken, StagedValue};

// Low-level
pub use lexer::{is_identifier, tokenize, Token, TokenKind};

pub use xof_common::GuidKey;
