//! Data records: instances of a template in the file's tree.

use std::fmt;

use xof_common::GuidKey;

use crate::node::{Children, Node, NodeRef};
use crate::staging::{ParseStaging, Position};
use crate::template::TemplateId;
use crate::value::DataObject;

/// Handle to a data record in an [`XFile`](crate::XFile).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RecordId(pub u32);

impl RecordId {
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Lifecycle of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Created by the parser, collecting staged tokens.
    Staging,
    /// Fields are filled in.
    Complete,
    /// Removed from the tree; the slot stays so ids remain stable.
    Discarded,
}

/// One data record: a template instance with field values and children.
#[derive(Debug, Clone)]
pub struct DataNode {
    template: TemplateId,
    name: Option<String>,
    guid: Option<GuidKey>,
    fields: Vec<DataObject>,
    children: Children,
    staging: ParseStaging,
    position: Position,
    parent: Option<RecordId>,
    state: RecordState,
}

impl DataNode {
    pub(crate) fn new(
        template: TemplateId,
        name: Option<String>,
        guid: Option<GuidKey>,
        parent: Option<RecordId>,
        position: Position,
    ) -> Self {
        Self {
            template,
            name,
            guid,
            fields: Vec::new(),
            children: Children::new(),
            staging: ParseStaging::new(),
            position,
            parent,
            state: RecordState::Staging,
        }
    }

    #[inline]
    pub fn template(&self) -> TemplateId {
        self.template
    }

    /// Field values in template order. Empty until the record is complete.
    #[inline]
    pub fn fields(&self) -> &[DataObject] {
        &self.fields
    }

    /// Field value by position.
    #[inline]
    pub fn field(&self, index: usize) -> Option<&DataObject> {
        self.fields.get(index)
    }

    /// Enclosing record, `None` for top-level records.
    #[inline]
    pub fn parent(&self) -> Option<RecordId> {
        self.parent
    }

    /// Where the record started in the source, or `0:0` if built in code.
    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    #[inline]
    pub fn state(&self) -> RecordState {
        self.state
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.state == RecordState::Complete
    }

    #[inline]
    pub fn staging(&self) -> &ParseStaging {
        &self.staging
    }

    pub(crate) fn staging_mut(&mut self) -> &mut ParseStaging {
        &mut self.staging
    }

    pub(crate) fn complete(&mut self, fields: Vec<DataObject>) {
        self.fields = fields;
        self.staging = ParseStaging::new();
        self.state = RecordState::Complete;
    }

    pub(crate) fn discard(&mut self) {
        self.state = RecordState::Discarded;
        self.staging = ParseStaging::new();
    }

    pub(crate) fn children_mut(&mut self) -> &mut Children {
        &mut self.children
    }

    /// Owned child records (references excluded).
    pub fn child_records(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.children.iter().filter_map(|child| match child {
            NodeRef::Record(id) => Some(id),
            _ => None,
        })
    }
}

impl Node for DataNode {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn guid(&self) -> Option<GuidKey> {
        self.guid
    }

    fn children(&self) -> &Children {
        &self.children
    }
}
