//! Tree nodes and the ordered, name-indexed child list they share.
//!
//! Templates and data records both own children. A child is a lightweight
//! [`NodeRef`] handle into the owning [`XFile`](crate::XFile)'s arenas, so
//! the tree carries no lifetimes and no reference counting.

use hashbrown::HashMap as FastHashMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

use xof_common::GuidKey;

use crate::record::RecordId;
use crate::template::TemplateId;

type FxHashMap<K, V> = FastHashMap<K, V, BuildHasherDefault<FxHasher>>;

/// Handle to a node in an [`XFile`](crate::XFile).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum NodeRef {
    /// A template declaration.
    Template(TemplateId),
    /// A data record owned by this position in the tree.
    Record(RecordId),
    /// A non-owning `{ name }` reference to a record declared elsewhere.
    Reference(RecordId),
}

impl NodeRef {
    /// Check if the node owns its target (everything but references).
    #[inline]
    pub fn is_owned(&self) -> bool {
        !matches!(self, Self::Reference(_))
    }

    /// Get the record id for records and references.
    #[inline]
    pub fn record(&self) -> Option<RecordId> {
        match self {
            Self::Record(id) | Self::Reference(id) => Some(*id),
            Self::Template(_) => None,
        }
    }
}

/// Behaviour shared by every node that lives in the tree.
pub trait Node {
    /// Name of the node, if it has one.
    fn name(&self) -> Option<&str>;

    /// GUID of the node, if it has one.
    fn guid(&self) -> Option<GuidKey>;

    /// Children of the node.
    fn children(&self) -> &Children;
}

#[derive(Debug, Clone)]
struct ChildEntry {
    node: NodeRef,
    name: Option<String>,
}

/// Ordered child list with case-insensitive name lookup.
///
/// Duplicate names are allowed; lookup returns the most recently added
/// child with that name.
#[derive(Debug, Clone, Default)]
pub struct Children {
    entries: Vec<ChildEntry>,
    by_name: FxHashMap<String, usize>,
}

impl Children {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a child, indexing it under `name` when the name is non-empty.
    pub fn add_child(&mut self, node: NodeRef, name: Option<&str>) -> usize {
        let index = self.entries.len();
        let name = name.filter(|n| !n.is_empty()).map(str::to_string);
        if let Some(name) = &name {
            self.by_name.insert(name.to_ascii_lowercase(), index);
        }
        self.entries.push(ChildEntry { node, name });
        index
    }

    /// Remove a child. Returns `false` if it was not present.
    pub fn remove_child(&mut self, node: NodeRef) -> bool {
        let Some(index) = self.entries.iter().position(|e| e.node == node) else {
            return false;
        };
        self.entries.remove(index);

        // Indices after the removed entry shifted, rebuild in order so
        // last-write-wins still holds.
        self.by_name.clear();
        for (i, entry) in self.entries.iter().enumerate() {
            if let Some(name) = &entry.name {
                self.by_name.insert(name.to_ascii_lowercase(), i);
            }
        }
        true
    }

    /// Index of the child registered under `name`.
    #[inline]
    pub fn find_child_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_ascii_lowercase()).copied()
    }

    /// Child registered under `name`.
    #[inline]
    pub fn find_child(&self, name: &str) -> Option<NodeRef> {
        self.find_child_index(name).map(|i| self.entries[i].node)
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<NodeRef> {
        self.entries.get(index).map(|e| e.node)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over children in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.entries.iter().map(|e| e.node)
    }
}
