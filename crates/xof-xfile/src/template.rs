//! Template schema types: templates, their fields and array dimensions.

use std::fmt;

use xof_common::GuidKey;

use crate::error::{RegistryError, RepackError};
use crate::node::{Children, Node};
use crate::repack::PrevFieldMap;
use crate::types::FieldKind;

/// Handle to a template registered in an [`XFile`](crate::XFile).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TemplateId(pub u32);

impl TemplateId {
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One dimension of an array field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ArrayDim {
    /// Extent fixed by the schema.
    Fixed(u32),
    /// Extent read from an earlier field of the same record.
    Dynamic(String),
}

impl ArrayDim {
    /// Resolve the extent against the values bound so far in the record.
    pub fn resolve(&self, prev_fields: &PrevFieldMap) -> Result<u32, RepackError> {
        match self {
            Self::Fixed(n) => Ok(*n),
            Self::Dynamic(name) => {
                let value = prev_fields
                    .get(name)
                    .ok_or_else(|| RepackError::UnresolvedSize(name.clone()))?;
                u32::try_from(value).map_err(|_| RepackError::InvalidSize {
                    field: name.clone(),
                    value,
                })
            }
        }
    }
}

impl fmt::Display for ArrayDim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "[{}]", n),
            Self::Dynamic(name) => write!(f, "[{}]", name),
        }
    }
}

/// One field of a template. Pure schema, no runtime state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FieldDef {
    kind: FieldKind,
    name: Option<String>,
    dims: Vec<ArrayDim>,
}

impl FieldDef {
    /// Create a scalar field.
    pub fn new(kind: FieldKind, name: Option<&str>) -> Self {
        Self {
            kind,
            name: name.map(str::to_string),
            dims: Vec::new(),
        }
    }

    /// Create a named scalar field.
    pub fn named(kind: FieldKind, name: &str) -> Self {
        Self::new(kind, Some(name))
    }

    /// Append an array dimension (outermost first).
    pub fn with_dim(mut self, dim: ArrayDim) -> Self {
        self.dims.push(dim);
        self
    }

    #[inline]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn dims(&self) -> &[ArrayDim] {
        &self.dims
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        !self.dims.is_empty()
    }

    /// Name used in diagnostics.
    pub(crate) fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

/// A template: a named, GUID-identified record schema.
///
/// A template is either open (instances may embed any known template as a
/// child), restricted to a set of child templates, or closed (both unset).
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    guid: GuidKey,
    fields: Vec<FieldDef>,
    open: bool,
    restrictions: Vec<TemplateId>,
    children: Children,
    standard: bool,
}

impl Template {
    /// Create a closed template with no fields.
    pub fn new(name: impl Into<String>, guid: GuidKey) -> Self {
        Self {
            name: name.into(),
            guid,
            fields: Vec::new(),
            open: false,
            restrictions: Vec::new(),
            children: Children::new(),
            standard: false,
        }
    }

    /// Add a field.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Mark the template open (`[...]`).
    pub fn open(mut self) -> Self {
        self.open = true;
        self
    }

    /// Allow instances to embed children of `template`.
    pub fn restrict(mut self, template: TemplateId) -> Self {
        self.restrictions.push(template);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn guid(&self) -> GuidKey {
        self.guid
    }

    #[inline]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.open
    }

    #[inline]
    pub fn restrictions(&self) -> &[TemplateId] {
        &self.restrictions
    }

    /// Check if this template came from the standard library.
    #[inline]
    pub fn is_standard(&self) -> bool {
        self.standard
    }

    pub(crate) fn set_standard(&mut self, standard: bool) {
        self.standard = standard;
    }

    pub(crate) fn children_mut(&mut self) -> &mut Children {
        &mut self.children
    }

    /// Index of the field called `name`.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == Some(name))
    }

    /// Check if an instance may embed a child record of `child`.
    pub fn allows_child(&self, child: TemplateId) -> bool {
        self.open || self.restrictions.contains(&child)
    }

    /// Check the invariants a well-formed template must satisfy.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.open && !self.restrictions.is_empty() {
            return Err(RegistryError::OpenAndRestricted(self.name.clone()));
        }

        for (i, field) in self.fields.iter().enumerate() {
            for dim in field.dims() {
                if let ArrayDim::Dynamic(size_field) = dim {
                    let earlier = self.fields[..i].iter().any(|f| f.name() == Some(size_field));
                    if !earlier {
                        return Err(RegistryError::UnknownSizeField {
                            template: self.name.clone(),
                            field: field.label().to_string(),
                            size_field: size_field.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Compare everything that defines the schema (not the children or origin).
    pub fn same_shape(&self, other: &Template) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.guid == other.guid
            && self.fields == other.fields
            && self.open == other.open
            && self.restrictions == other.restrictions
    }
}

impl Node for Template {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn guid(&self) -> Option<GuidKey> {
        Some(self.guid)
    }

    fn children(&self) -> &Children {
        &self.children
    }
}
