//! Common types for xof.
//!
//! This crate provides the leaf types shared by the other xof crates:
//!
//! - [`GuidKey`] - the 128-bit Windows GUID that names `.x` templates
//! - [`FormatError`] - errors raised while parsing textual identifiers

mod error;
mod guid;

pub use error::{FormatError, Result};
pub use guid::GuidKey;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
