//! Xof - DirectX `.x` file toolkit.
//!
//! This crate provides a unified interface to the xof crates.
//!
//! # Crates
//!
//! - [`xof_common`] - Common types (GUID keys, format errors)
//! - [`xof_xfile`] - Templates, records, repacking and text (de)serialization
//!
//! # Example
//!
//! ```no_run
//! use xof::prelude::*;
//!
//! let library = StandardLibrary::load()?;
//! let data = std::fs::read("scene.x")?;
//! let file = XFile::read_with(&data, &library, &ReadOptions::default())?;
//!
//! for (id, record) in file.records() {
//!     let template = file.template(record.template()).map(|t| t.name()).unwrap_or("?");
//!     println!("{} {} {}", id, template, record.name().unwrap_or(""));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export all sub-crates
pub use xof_common as common;
pub use xof_xfile as xfile;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use xof_common::GuidKey;
    pub use xof_xfile::{
        ArrayDim, DataObject, FieldDef, FieldKind, Node, NodeRef, ReadOptions, RecordId,
        StandardLibrary, Template, TemplateId, WriteOptions, XFile,
    };
}

// Re-export commonly used types at the crate root
pub use xof_xfile::{Error, Result, XFile};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
