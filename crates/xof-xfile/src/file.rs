//! The `.x` file root: header, template registry and record tree.

use hashbrown::HashMap as FastHashMap;
use rustc_hash::FxHasher;
use std::fmt;
use std::hash::BuildHasherDefault;

use tracing::{debug, warn};
use xof_common::GuidKey;

use crate::error::{Error, FileError, RegistryError, RepackError, Result};
use crate::header::{FloatSize, FormatType, XFileHeader};
use crate::lexer::is_identifier;
use crate::node::{Children, Node, NodeRef};
use crate::options::{ReadOptions, WriteOptions};
use crate::record::{DataNode, RecordId, RecordState};
use crate::repack::{check_fields, repack};
use crate::staging::Position;
use crate::standard::StandardLibrary;
use crate::template::{Template, TemplateId};
use crate::types::FieldKind;
use crate::value::DataObject;
use crate::{parser, writer};

type FxHashMap<K, V> = FastHashMap<K, V, BuildHasherDefault<FxHasher>>;

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Severity {
    Warning,
    Error,
}

/// A non-fatal problem found while building the file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub position: Option<Position>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match self.position {
            Some(position) => write!(f, "{}: {}: {}", position, level, self.message),
            None => write!(f, "{}: {}", level, self.message),
        }
    }
}

/// A `.x` file.
///
/// Owns every template and record. Templates and records are addressed by
/// [`TemplateId`] and [`RecordId`]; the tree itself is a list of
/// [`NodeRef`] handles under the root and under each node.
///
/// # Example
///
/// ```
/// use xof_xfile::{StandardLibrary, XFile};
///
/// let library = StandardLibrary::load()?;
/// let file = XFile::read_with(
///     b"xof 0302txt 0032\nHeader { 1; 0; 1; }\n",
///     &library,
///     &Default::default(),
/// )?;
/// assert_eq!(file.records().count(), 1);
/// # Ok::<(), xof_xfile::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct XFile {
    header: XFileHeader,
    templates: Vec<Template>,
    templates_by_name: FxHashMap<String, TemplateId>,
    templates_by_guid: FxHashMap<GuidKey, TemplateId>,
    records: Vec<DataNode>,
    nodes_by_guid: FxHashMap<GuidKey, RecordId>,
    root: Children,
    diagnostics: Vec<Diagnostic>,
    options: ReadOptions,
}

impl XFile {
    /// Create an empty text file that knows the templates of `library`.
    ///
    /// Library templates can be instantiated and referenced but are not
    /// written unless the file declares them itself.
    pub fn new(library: &StandardLibrary) -> Self {
        let mut file = Self {
            header: XFileHeader::default(),
            templates: Vec::with_capacity(library.len()),
            templates_by_name: FxHashMap::default(),
            templates_by_guid: FxHashMap::default(),
            records: Vec::new(),
            nodes_by_guid: FxHashMap::default(),
            root: Children::new(),
            diagnostics: Vec::new(),
            options: ReadOptions::default(),
        };

        for template in library.templates() {
            let id = TemplateId(file.templates.len() as u32);
            let mut template = template.clone();
            template.set_standard(true);
            file.templates_by_name
                .insert(template.name().to_ascii_lowercase(), id);
            file.templates_by_guid.insert(template.guid(), id);
            file.templates.push(template);
        }

        file
    }

    /// Read a file that declares every template it uses.
    pub fn read(data: &[u8]) -> Result<Self> {
        Self::read_with(data, &StandardLibrary::empty(), &ReadOptions::default())
    }

    /// Read a file on top of `library`.
    pub fn read_with(data: &[u8], library: &StandardLibrary, options: &ReadOptions) -> Result<Self> {
        let (header, offset) = XFileHeader::parse(data)?;
        if header.format != FormatType::Text {
            return Err(FileError::UnsupportedFormat(header.format).into());
        }

        let mut file = Self::new(library);
        file.header = header;
        file.options = *options;

        let body = String::from_utf8_lossy(&data[offset..]);
        parser::parse_body(&mut file, &body)?;

        debug!(
            templates = file.templates.len(),
            records = file.records().count(),
            diagnostics = file.diagnostics.len(),
            "read .x file"
        );
        Ok(file)
    }

    /// Write the file with default settings.
    pub fn write(&self) -> Vec<u8> {
        self.write_with(&WriteOptions::default())
    }

    /// Write the header followed by the text body.
    pub fn write_with(&self, options: &WriteOptions) -> Vec<u8> {
        let mut out = self.header.to_bytes();
        let mut body = String::new();
        writer::write_body(self, options, &mut body);
        out.extend_from_slice(body.as_bytes());
        out
    }

    #[inline]
    pub fn header(&self) -> &XFileHeader {
        &self.header
    }

    /// Set the version written in the header.
    pub fn set_version(&mut self, major: u8, minor: u8) {
        self.header.major = major;
        self.header.minor = minor;
    }

    pub fn set_float_size(&mut self, float_size: FloatSize) {
        self.header.float_size = float_size;
    }

    #[inline]
    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: ReadOptions) {
        self.options = options;
    }

    // ─────────────────────────────────────────────────────────────────
    // Templates
    // ─────────────────────────────────────────────────────────────────

    /// Register a top-level template.
    ///
    /// A later template with the same name shadows the earlier one for name
    /// lookup. Re-registering an identical template under a GUID that is
    /// already known returns the existing id; a different template under a
    /// known GUID is an error.
    pub fn register_template(&mut self, template: Template) -> std::result::Result<TemplateId, RegistryError> {
        self.declare_template(None, template)
    }

    /// Register a template declared inside `parent`, or at top level.
    pub fn declare_template(
        &mut self,
        parent: Option<TemplateId>,
        template: Template,
    ) -> std::result::Result<TemplateId, RegistryError> {
        if let Some(parent) = parent {
            self.template_ref(parent)?;
        }
        let (id, attach) = self.insert_template(template)?;
        if attach {
            self.attach_template(parent, id);
        }
        Ok(id)
    }

    /// Add a template to the registry without placing it in the tree.
    ///
    /// Returns the id and whether the template still needs a tree position.
    pub(crate) fn insert_template(
        &mut self,
        template: Template,
    ) -> std::result::Result<(TemplateId, bool), RegistryError> {
        if !is_identifier(template.name()) {
            return Err(RegistryError::InvalidName(template.name().to_string()));
        }
        template.validate()?;
        for field in template.fields() {
            if let FieldKind::Template(id) = field.kind() {
                self.template_ref(id)?;
            }
        }
        for &id in template.restrictions() {
            self.template_ref(id)?;
        }

        if let Some(&existing) = self.templates_by_guid.get(&template.guid()) {
            let current = &mut self.templates[existing.index()];
            if !current.same_shape(&template) {
                return Err(RegistryError::DuplicateGuid(template.guid()));
            }
            // Re-declaration of a known template. A library template becomes
            // part of the file from here on.
            let attach = current.is_standard();
            current.set_standard(false);
            self.templates_by_name
                .insert(template.name().to_ascii_lowercase(), existing);
            debug!(name = template.name(), id = %existing, "template re-declared");
            return Ok((existing, attach));
        }

        let id = TemplateId(self.templates.len() as u32);
        debug!(name = template.name(), guid = %template.guid(), id = %id, "template registered");
        self.templates_by_name
            .insert(template.name().to_ascii_lowercase(), id);
        self.templates_by_guid.insert(template.guid(), id);
        self.templates.push(template);
        Ok((id, true))
    }

    pub(crate) fn attach_template(&mut self, parent: Option<TemplateId>, id: TemplateId) {
        let name = self.templates[id.index()].name().to_string();
        let children = match parent {
            Some(parent) => self.templates[parent.index()].children_mut(),
            None => &mut self.root,
        };
        children.add_child(NodeRef::Template(id), Some(&name));
    }

    fn template_ref(&self, id: TemplateId) -> std::result::Result<&Template, RegistryError> {
        self.templates
            .get(id.index())
            .ok_or_else(|| RegistryError::UnknownTemplate(id.to_string()))
    }

    /// Template registered under `name` (case-insensitive, last wins).
    pub fn find_template(&self, name: &str) -> Option<TemplateId> {
        self.templates_by_name.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn find_template_by_guid(&self, guid: &GuidKey) -> Option<TemplateId> {
        self.templates_by_guid.get(guid).copied()
    }

    #[inline]
    pub fn template(&self, id: TemplateId) -> Option<&Template> {
        self.templates.get(id.index())
    }

    /// All templates, indexed by [`TemplateId`].
    #[inline]
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    // ─────────────────────────────────────────────────────────────────
    // Records
    // ─────────────────────────────────────────────────────────────────

    /// Start a record whose fields will be staged and then finalized.
    pub fn begin_record(
        &mut self,
        parent: Option<RecordId>,
        template: TemplateId,
        name: Option<&str>,
        guid: Option<GuidKey>,
        position: Position,
    ) -> std::result::Result<RecordId, RegistryError> {
        self.template_ref(template)?;
        let name = name.filter(|n| !n.is_empty());
        if let Some(name) = name {
            if !is_identifier(name) {
                return Err(RegistryError::InvalidName(name.to_string()));
            }
        }
        if let Some(guid) = guid {
            if self.nodes_by_guid.contains_key(&guid) {
                return Err(RegistryError::DuplicateGuid(guid));
            }
        }
        if let Some(parent) = parent {
            self.live_record(parent)?;
            self.check_child_allowed(parent, template, position);
        }

        let id = RecordId(self.records.len() as u32);
        self.records.push(DataNode::new(
            template,
            name.map(str::to_string),
            guid,
            parent,
            position,
        ));
        if let Some(guid) = guid {
            self.nodes_by_guid.insert(guid, id);
        }
        self.children_of_mut(parent)
            .add_child(NodeRef::Record(id), name);
        Ok(id)
    }

    /// Stage a run of integers for a record.
    pub fn add_parse_int(
        &mut self,
        record: RecordId,
        values: Vec<i64>,
        position: Position,
    ) -> std::result::Result<(), RegistryError> {
        self.staging_record(record)?
            .staging_mut()
            .add_ints(values, position);
        Ok(())
    }

    /// Stage a run of reals for a record.
    pub fn add_parse_double(
        &mut self,
        record: RecordId,
        values: Vec<f64>,
        position: Position,
    ) -> std::result::Result<(), RegistryError> {
        self.staging_record(record)?
            .staging_mut()
            .add_doubles(values, position);
        Ok(())
    }

    /// Stage a string for a record.
    pub fn add_parse_string(
        &mut self,
        record: RecordId,
        value: String,
        position: Position,
    ) -> std::result::Result<(), RegistryError> {
        self.staging_record(record)?
            .staging_mut()
            .add_string(value, position);
        Ok(())
    }

    /// Repack a record's staged tokens into its fields.
    ///
    /// Running out of data fails. Leftover data is a warning unless
    /// [`ReadOptions::strict_trailing_data`] is set.
    pub fn finalize_parse_data(&mut self, record: RecordId) -> Result<()> {
        let node = self.staging_record(record)?;
        let template = node.template();
        let position = node.position();
        let template_name = self.templates[template.index()].name().to_string();

        let record_error = |source| Error::Record {
            template: template_name.clone(),
            position,
            source,
        };

        let repacked = repack(&self.templates, template, self.records[record.index()].staging())
            .map_err(record_error)?;

        if repacked.leftover > 0 {
            if self.options.strict_trailing_data {
                return Err(record_error(RepackError::TooManyTokens {
                    template: template_name.clone(),
                    remaining: repacked.leftover,
                }));
            }
            self.warn(
                format!(
                    "{} too many data elements in record of template {}",
                    repacked.leftover, template_name
                ),
                Some(position),
            );
        }

        debug!(template = %template_name, record = %record, "record finalized");
        self.records[record.index()].complete(repacked.fields);
        Ok(())
    }

    /// Add a complete record built in code.
    pub fn add_record(
        &mut self,
        parent: Option<RecordId>,
        template: TemplateId,
        name: Option<&str>,
        guid: Option<GuidKey>,
        fields: Vec<DataObject>,
    ) -> Result<RecordId> {
        check_fields(&self.templates, template, &fields)?;
        let id = self.begin_record(parent, template, name, guid, Position::default())?;
        self.records[id.index()].complete(fields);
        Ok(id)
    }

    /// Add a non-owning reference to `target` under `parent`.
    ///
    /// The reference becomes the last child of `parent`, so `target` must be
    /// written before that point. A target without a GUID must also be the
    /// record its name finds from there, or the reference would read back
    /// pointing elsewhere.
    pub fn add_reference(
        &mut self,
        parent: RecordId,
        target: RecordId,
    ) -> std::result::Result<(), RegistryError> {
        let parent_node = self.live_record(parent)?;
        let node = self.live_record(target)?;
        if node.name().is_none() && node.guid().is_none() {
            return Err(RegistryError::UnnamedReferenceTarget(target.0));
        }

        let ranks = self.document_ranks();
        let start = ranks[parent.index()].ok_or(RegistryError::UnknownRecord(parent.0))?;
        let mut subtree = Vec::new();
        self.collect_records(parent_node.children(), &mut subtree);
        let end = start + 1 + subtree.len();
        let visible = |id: RecordId| ranks.get(id.index()).copied().flatten().is_some_and(|r| r < end);

        if !visible(target) {
            return Err(RegistryError::ForwardReference(target.0));
        }
        if let (Some(name), None) = (node.name(), node.guid()) {
            if self.resolve_record_name(name, &visible) != Some(target) {
                return Err(RegistryError::AmbiguousReference(name.to_string()));
            }
        }

        self.attach_reference(parent, target);
        Ok(())
    }

    /// Place a reference whose target is already known to resolve.
    pub(crate) fn attach_reference(&mut self, parent: RecordId, target: RecordId) {
        let template = self.records[target.index()].template();
        let position = self.records[parent.index()].position();
        self.check_child_allowed(parent, template, position);

        self.records[parent.index()]
            .children_mut()
            .add_child(NodeRef::Reference(target), None);
    }

    /// Position of every live record in writing order, indexed by [`RecordId`].
    pub(crate) fn document_ranks(&self) -> Vec<Option<usize>> {
        let mut order = Vec::new();
        self.collect_records(&self.root, &mut order);
        let mut ranks = vec![None; self.records.len()];
        for (rank, id) in order.into_iter().enumerate() {
            ranks[id.index()] = Some(rank);
        }
        ranks
    }

    fn collect_records(&self, children: &Children, out: &mut Vec<RecordId>) {
        for child in children.iter() {
            if let NodeRef::Record(id) = child {
                if let Some(node) = self.record(id) {
                    out.push(id);
                    self.collect_records(node.children(), out);
                }
            }
        }
    }

    /// Remove a record and everything it owns from the tree.
    ///
    /// Ids stay valid but name and GUID lookups no longer find the record,
    /// and references to it are removed.
    pub fn discard_record(&mut self, record: RecordId) -> std::result::Result<(), RegistryError> {
        let parent = self.live_record(record)?.parent();
        self.children_of_mut(parent)
            .remove_child(NodeRef::Record(record));

        let mut discarded = Vec::new();
        let mut stack = vec![record];
        while let Some(id) = stack.pop() {
            let node = &mut self.records[id.index()];
            if node.state() == RecordState::Discarded {
                continue;
            }
            node.discard();
            stack.extend(node.child_records());
            if let Some(guid) = Node::guid(node) {
                self.nodes_by_guid.remove(&guid);
            }
            discarded.push(id);
        }

        for id in discarded {
            self.root.remove_child(NodeRef::Reference(id));
            for node in &mut self.records {
                node.children_mut().remove_child(NodeRef::Reference(id));
            }
        }
        Ok(())
    }

    fn check_child_allowed(&mut self, parent: RecordId, child: TemplateId, position: Position) {
        let parent_template = &self.templates[self.records[parent.index()].template().index()];
        if !parent_template.allows_child(child) {
            let message = format!(
                "template {} does not allow {} children",
                parent_template.name(),
                self.templates[child.index()].name()
            );
            self.warn(message, Some(position));
        }
    }

    fn live_record(&self, id: RecordId) -> std::result::Result<&DataNode, RegistryError> {
        match self.records.get(id.index()) {
            Some(node) if node.state() != RecordState::Discarded => Ok(node),
            _ => Err(RegistryError::UnknownRecord(id.0)),
        }
    }

    fn staging_record(&mut self, id: RecordId) -> std::result::Result<&mut DataNode, RegistryError> {
        match self.records.get_mut(id.index()) {
            Some(node) if node.state() == RecordState::Staging => Ok(node),
            _ => Err(RegistryError::UnknownRecord(id.0)),
        }
    }

    fn children_of_mut(&mut self, parent: Option<RecordId>) -> &mut Children {
        match parent {
            Some(id) => self.records[id.index()].children_mut(),
            None => &mut self.root,
        }
    }

    /// Record by id, `None` once discarded.
    pub fn record(&self, id: RecordId) -> Option<&DataNode> {
        self.live_record(id).ok()
    }

    /// Every live record, in declaration order.
    pub fn records(&self) -> impl Iterator<Item = (RecordId, &DataNode)> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, node)| node.state() != RecordState::Discarded)
            .map(|(i, node)| (RecordId(i as u32), node))
    }

    /// Field of a record by field name.
    pub fn field(&self, record: RecordId, name: &str) -> Option<&DataObject> {
        let node = self.record(record)?;
        let index = self.template(node.template())?.field_index(name)?;
        node.field(index)
    }

    /// Any node in the tree.
    pub fn node(&self, node: NodeRef) -> Option<&dyn Node> {
        match node {
            NodeRef::Template(id) => self.template(id).map(|t| t as &dyn Node),
            NodeRef::Record(id) | NodeRef::Reference(id) => self.record(id).map(|r| r as &dyn Node),
        }
    }

    /// Top-level nodes in declaration order.
    #[inline]
    pub fn root_children(&self) -> &Children {
        &self.root
    }

    fn children_of(&self, parent: Option<NodeRef>) -> Option<&Children> {
        match parent {
            None => Some(&self.root),
            Some(NodeRef::Template(id)) => self.template(id).map(Node::children),
            Some(NodeRef::Record(id)) | Some(NodeRef::Reference(id)) => {
                self.record(id).map(Node::children)
            }
        }
    }

    /// Direct child of `parent` (or of the root) registered under `name`.
    pub fn find_child(&self, parent: Option<NodeRef>, name: &str) -> Option<NodeRef> {
        self.children_of(parent)?.find_child(name)
    }

    /// Depth-first search below `parent` (or the root).
    ///
    /// Direct children are checked before any grandchild; references are
    /// not followed.
    pub fn find_descendant(&self, parent: Option<NodeRef>, name: &str) -> Option<NodeRef> {
        let children = self.children_of(parent)?;
        if let Some(found) = children.find_child(name) {
            return Some(found);
        }
        children
            .iter()
            .filter(NodeRef::is_owned)
            .find_map(|child| self.find_descendant(Some(child), name))
    }

    /// Depth-first search for a record called `name`.
    pub fn find_record(&self, name: &str) -> Option<RecordId> {
        self.resolve_record_name(name, &|_| true)
    }

    /// [`find_record`](Self::find_record) over the records `visible` accepts.
    pub(crate) fn resolve_record_name(
        &self,
        name: &str,
        visible: &dyn Fn(RecordId) -> bool,
    ) -> Option<RecordId> {
        self.find_record_below(&self.root, name, visible)
    }

    fn find_record_below(
        &self,
        children: &Children,
        name: &str,
        visible: &dyn Fn(RecordId) -> bool,
    ) -> Option<RecordId> {
        let records = || {
            children.iter().filter_map(|child| match child {
                NodeRef::Record(id) if visible(id) => self.record(id).map(|node| (id, node)),
                _ => None,
            })
        };
        let direct = records()
            .filter(|(_, node)| {
                node.name()
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
            })
            .last()
            .map(|(id, _)| id);
        direct.or_else(|| records().find_map(|(_, node)| self.find_record_below(node.children(), name, visible)))
    }

    pub fn find_record_by_guid(&self, guid: &GuidKey) -> Option<RecordId> {
        self.nodes_by_guid.get(guid).copied()
    }

    // ─────────────────────────────────────────────────────────────────
    // Diagnostics
    // ─────────────────────────────────────────────────────────────────

    /// Warnings and skipped-record errors collected so far.
    #[inline]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub(crate) fn warn(&mut self, message: String, position: Option<Position>) {
        match position {
            Some(position) => warn!(%position, "{}", message),
            None => warn!("{}", message),
        }
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message,
            position,
        });
    }

    pub(crate) fn error(&mut self, message: String, position: Option<Position>) {
        match position {
            Some(position) => warn!(%position, "skipped: {}", message),
            None => warn!("skipped: {}", message),
        }
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            message,
            position,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{ArrayDim, FieldDef};

    fn guid(n: u32) -> GuidKey {
        GuidKey::new(n, 0x11cf, 0x8f52, [0, 0x40, 0x33, 0x35, 0x94, 0xa3, 0, 0])
    }

    fn values_template() -> Template {
        Template::new("Values", guid(1))
            .field(FieldDef::named(FieldKind::Dword, "n"))
            .field(FieldDef::named(FieldKind::Float, "vals").with_dim(ArrayDim::Dynamic("n".into())))
    }

    #[test]
    fn test_duplicate_guid() {
        let mut file = XFile::new(&StandardLibrary::empty());
        file.register_template(values_template()).unwrap();

        let other = Template::new("Other", guid(1)).field(FieldDef::named(FieldKind::Word, "w"));
        assert_eq!(
            file.register_template(other),
            Err(RegistryError::DuplicateGuid(guid(1)))
        );
    }

    #[test]
    fn test_identical_redeclaration_reuses_id() {
        let mut file = XFile::new(&StandardLibrary::empty());
        let a = file.register_template(values_template()).unwrap();
        let b = file.register_template(values_template()).unwrap();
        assert_eq!(a, b);
        assert_eq!(file.templates().len(), 1);
        assert_eq!(file.root_children().len(), 1);
    }

    #[test]
    fn test_same_name_last_wins() {
        let mut file = XFile::new(&StandardLibrary::empty());
        let first = file.register_template(Template::new("Thing", guid(1))).unwrap();
        let second = file.register_template(Template::new("Thing", guid(2))).unwrap();
        assert_ne!(first, second);
        assert_eq!(file.find_template("thing"), Some(second));
        assert_eq!(file.find_template_by_guid(&guid(1)), Some(first));
    }

    #[test]
    fn test_unknown_field_template() {
        let mut file = XFile::new(&StandardLibrary::empty());
        let bad = Template::new("Bad", guid(3))
            .field(FieldDef::named(FieldKind::Template(TemplateId(7)), "v"));
        assert!(matches!(
            file.register_template(bad),
            Err(RegistryError::UnknownTemplate(_))
        ));
    }

    #[test]
    fn test_staged_record() {
        let mut file = XFile::new(&StandardLibrary::empty());
        let t = file.register_template(values_template()).unwrap();
        let r = file
            .begin_record(None, t, Some("v"), None, Position::new(2, 1))
            .unwrap();
        file.add_parse_int(r, vec![2], Position::new(2, 10)).unwrap();
        file.add_parse_double(r, vec![0.5, 1.5, 2.5], Position::new(2, 13))
            .unwrap();
        file.finalize_parse_data(r).unwrap();

        assert_eq!(file.field(r, "n"), Some(&DataObject::Int(2)));
        assert_eq!(file.diagnostics().len(), 1);
        assert_eq!(file.diagnostics()[0].severity, Severity::Warning);

        // Complete records take no more tokens.
        assert!(file.add_parse_int(r, vec![1], Position::default()).is_err());
    }

    #[test]
    fn test_strict_trailing_data() {
        let mut file = XFile::new(&StandardLibrary::empty());
        file.set_options(ReadOptions::default().strict_trailing_data(true));
        let t = file.register_template(values_template()).unwrap();
        let r = file.begin_record(None, t, None, None, Position::default()).unwrap();
        file.add_parse_int(r, vec![0, 9], Position::default()).unwrap();
        assert!(matches!(
            file.finalize_parse_data(r),
            Err(Error::Record {
                source: RepackError::TooManyTokens { remaining: 1, .. },
                ..
            })
        ));
    }

    #[test]
    fn test_add_record_checks_shape() {
        let mut file = XFile::new(&StandardLibrary::empty());
        let t = file.register_template(values_template()).unwrap();
        let bad = file.add_record(None, t, None, None, vec![DataObject::Int(1)]);
        assert!(matches!(bad, Err(Error::Repack(RepackError::ShapeMismatch { .. }))));
        assert_eq!(file.records().count(), 0);
    }

    #[test]
    fn test_record_guids_collide() {
        let mut file = XFile::new(&StandardLibrary::empty());
        let t = file.register_template(Template::new("Empty", guid(1)).open()).unwrap();
        file.add_record(None, t, Some("a"), Some(guid(9)), vec![]).unwrap();
        assert!(matches!(
            file.add_record(None, t, Some("b"), Some(guid(9)), vec![]),
            Err(Error::Registry(RegistryError::DuplicateGuid(_)))
        ));
    }

    #[test]
    fn test_find_descendant_prefers_shallow() {
        let mut file = XFile::new(&StandardLibrary::empty());
        let t = file.register_template(Template::new("Group", guid(1)).open()).unwrap();
        let outer = file.add_record(None, t, Some("outer"), None, vec![]).unwrap();
        let deep = file.add_record(Some(outer), t, Some("target"), None, vec![]).unwrap();
        let inner = file.add_record(Some(outer), t, Some("inner"), None, vec![]).unwrap();
        let deeper = file.add_record(Some(inner), t, Some("leaf"), None, vec![]).unwrap();

        assert_eq!(file.find_record("target"), Some(deep));
        assert_eq!(file.find_record("LEAF"), Some(deeper));
        assert_eq!(
            file.find_descendant(None, "leaf"),
            Some(NodeRef::Record(deeper))
        );
        assert_eq!(file.find_child(None, "leaf"), None);
        assert_eq!(file.find_record("missing"), None);
    }

    #[test]
    fn test_discard_unregisters() {
        let mut file = XFile::new(&StandardLibrary::empty());
        let t = file.register_template(Template::new("Group", guid(1)).open()).unwrap();
        let a = file.add_record(None, t, Some("a"), Some(guid(10)), vec![]).unwrap();
        let child = file.add_record(Some(a), t, Some("c"), Some(guid(11)), vec![]).unwrap();
        let b = file.add_record(None, t, Some("b"), None, vec![]).unwrap();
        file.add_reference(b, child).unwrap();

        file.discard_record(a).unwrap();
        assert!(file.record(a).is_none());
        assert!(file.record(child).is_none());
        assert_eq!(file.find_record_by_guid(&guid(11)), None);
        assert_eq!(file.find_record("c"), None);
        assert!(file.record(b).unwrap().children().is_empty());
        assert_eq!(file.root_children().len(), 2);
    }

    #[test]
    fn test_restriction_warning() {
        let mut file = XFile::new(&StandardLibrary::empty());
        let closed = file.register_template(Template::new("Leaf", guid(1))).unwrap();
        let parent = file.add_record(None, closed, Some("p"), None, vec![]).unwrap();
        file.add_record(Some(parent), closed, None, None, vec![]).unwrap();
        assert_eq!(file.diagnostics().len(), 1);
        assert!(file.diagnostics()[0].message.contains("does not allow"));
    }

    #[test]
    fn test_unnamed_reference_target() {
        let mut file = XFile::new(&StandardLibrary::empty());
        let t = file.register_template(Template::new("Group", guid(1)).open()).unwrap();
        let a = file.add_record(None, t, Some("a"), None, vec![]).unwrap();
        let anon = file.add_record(None, t, None, None, vec![]).unwrap();
        assert_eq!(
            file.add_reference(a, anon),
            Err(RegistryError::UnnamedReferenceTarget(anon.0))
        );
    }

    #[test]
    fn test_invalid_names() {
        let mut file = XFile::new(&StandardLibrary::empty());
        assert!(matches!(
            file.register_template(Template::new("bad name", guid(1))),
            Err(RegistryError::InvalidName(_))
        ));
    }
}
