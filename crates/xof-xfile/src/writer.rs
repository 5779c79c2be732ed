//! Text emission of templates and records.
//!
//! Scalars that follow each other in a record share a line; arrays and
//! nested records start on their own lines. An array longer than
//! [`LONG_ARRAY`] elements is written one element per line.

use std::fmt::Write as _;

use tracing::warn;
use xof_common::GuidKey;

use crate::file::XFile;
use crate::node::{Node, NodeRef};
use crate::options::WriteOptions;
use crate::record::RecordId;
use crate::template::{Template, TemplateId};
use crate::types::FieldKind;
use crate::value::DataObject;

const LONG_ARRAY: usize = 16;

pub(crate) fn write_body(file: &XFile, options: &WriteOptions, out: &mut String) {
    let mut writer = TextWriter {
        file,
        step: options.indent,
        ranks: file.document_ranks(),
        opened: 0,
        out,
    };
    for (i, node) in file.root_children().iter().enumerate() {
        if i > 0 {
            writer.out.push('\n');
        }
        writer.node(node, 0);
    }
}

struct TextWriter<'a> {
    file: &'a XFile,
    step: usize,
    /// Writing order of each record, indexed by [`RecordId`].
    ranks: Vec<Option<usize>>,
    /// Records whose opening line has been written.
    opened: usize,
    out: &'a mut String,
}

impl<'a> TextWriter<'a> {
    fn indent(&mut self, level: usize) {
        for _ in 0..level {
            self.out.push(' ');
        }
    }

    fn node(&mut self, node: NodeRef, level: usize) {
        match node {
            NodeRef::Template(id) => self.template(id, level),
            NodeRef::Record(id) => self.record(id, level),
            NodeRef::Reference(id) => self.reference(id, level),
        }
    }

    fn template_name(&self, id: TemplateId) -> &'a str {
        let file = self.file;
        file.template(id).map(Template::name).unwrap_or("")
    }

    fn guid_line(&mut self, guid: GuidKey, level: usize) {
        self.indent(level);
        let _ = writeln!(self.out, "<{}>", guid);
    }

    fn template(&mut self, id: TemplateId, level: usize) {
        let file = self.file;
        let Some(template) = file.template(id) else {
            return;
        };
        let inner = level + self.step;

        self.indent(level);
        let _ = writeln!(self.out, "template {} {{", template.name());
        self.guid_line(template.guid(), inner);

        for child in template.children().iter() {
            self.node(child, inner);
        }

        for field in template.fields() {
            self.indent(inner);
            if field.is_array() {
                self.out.push_str("array ");
            }
            match field.kind() {
                FieldKind::Template(nested) => {
                    let name = self.template_name(nested);
                    self.out.push_str(name);
                }
                kind => self.out.push_str(kind.keyword().unwrap_or("")),
            }
            if let Some(name) = field.name() {
                self.out.push(' ');
                self.out.push_str(name);
            }
            for dim in field.dims() {
                let _ = write!(self.out, "{}", dim);
            }
            self.out.push_str(";\n");
        }

        if template.is_open() {
            self.indent(inner);
            self.out.push_str("[...]\n");
        } else if !template.restrictions().is_empty() {
            let allowed: Vec<String> = template
                .restrictions()
                .iter()
                .filter_map(|&r| file.template(r))
                .map(|t| format!("{} <{}>", t.name(), t.guid()))
                .collect();
            self.indent(inner);
            let _ = writeln!(self.out, "[{}]", allowed.join(", "));
        }

        self.indent(level);
        self.out.push_str("}\n");
    }

    fn record(&mut self, id: RecordId, level: usize) {
        let file = self.file;
        let Some(node) = file.record(id) else {
            return;
        };
        let inner = level + self.step;

        let template_name = self.template_name(node.template());
        self.indent(level);
        self.out.push_str(template_name);
        if let Some(name) = node.name() {
            self.out.push(' ');
            self.out.push_str(name);
        }
        self.out.push_str(" {\n");
        self.opened += 1;
        if let Some(guid) = node.guid() {
            self.guid_line(guid, inner);
        }

        self.sequence(node.fields(), ";", ";", "", inner);

        for child in node.children().iter() {
            self.node(child, inner);
        }

        self.indent(level);
        self.out.push_str("}\n");
    }

    fn reference(&mut self, id: RecordId, level: usize) {
        let file = self.file;
        let Some(node) = file.record(id) else {
            return;
        };

        // A reader resolves a bare name against the records it has seen so
        // far; the GUID is only needed when that finds another record.
        let ranks = &self.ranks;
        let opened = self.opened;
        let seen = |r: RecordId| ranks.get(r.index()).copied().flatten().is_some_and(|k| k < opened);
        let text = match (node.name(), node.guid()) {
            (Some(name), guid) => {
                if file.resolve_record_name(name, &seen) == Some(id) {
                    format!("{{ {} }}", name)
                } else if let Some(guid) = guid {
                    format!("{{ {} <{}> }}", name, guid)
                } else {
                    warn!(name, "reference name resolves to another record");
                    format!("{{ {} }}", name)
                }
            }
            (None, Some(guid)) => format!("{{ <{}> }}", guid),
            (None, None) => return,
        };

        self.indent(level);
        self.out.push_str(&text);
        self.out.push('\n');
    }

    /// Write `items` separated by `sep`.
    ///
    /// The last item is followed by `last_sep` and then `terminator`.
    /// Records end every field with `;` (so `last_sep` is `;`); arrays put
    /// nothing between their last element and the terminator.
    fn sequence(
        &mut self,
        items: &[DataObject],
        sep: &str,
        last_sep: &str,
        terminator: &str,
        level: usize,
    ) {
        if items.is_empty() {
            if !terminator.is_empty() {
                self.indent(level);
                self.out.push_str(terminator);
                self.out.push('\n');
            }
            return;
        }

        let long = items.len() > LONG_ARRAY;
        let mut line_open = false;

        for (i, item) in items.iter().enumerate() {
            let last = i + 1 == items.len();
            let item_sep = if last {
                format!("{}{}", last_sep, terminator)
            } else {
                sep.to_string()
            };

            if item.is_complex() || long {
                if line_open {
                    self.out.push('\n');
                    line_open = false;
                }
                self.value(item, &item_sep, level);
            } else {
                if line_open {
                    self.out.push(' ');
                } else {
                    self.indent(level);
                    line_open = true;
                }
                self.out.push_str(&item.to_text(sep));
                self.out.push_str(&item_sep);
            }
        }

        if line_open {
            self.out.push('\n');
        }
    }

    fn value(&mut self, value: &DataObject, terminator: &str, level: usize) {
        match value {
            DataObject::Array(items) => self.sequence(items, ",", "", terminator, level),
            DataObject::Record(record) => self.sequence(&record.fields, ";", ";", terminator, level),
            scalar => {
                self.indent(level);
                self.out.push_str(&scalar.to_text(","));
                self.out.push_str(terminator);
                self.out.push('\n');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::Position;
    use crate::standard::StandardLibrary;
    use crate::template::{ArrayDim, FieldDef};

    fn guid(n: u32) -> GuidKey {
        GuidKey::new(n, 0, 0, [0; 8])
    }

    fn body(file: &XFile) -> String {
        let mut out = String::new();
        write_body(file, &WriteOptions::default(), &mut out);
        out
    }

    #[test]
    fn test_template_text() {
        let mut file = XFile::new(&StandardLibrary::empty());
        let vector = file
            .register_template(
                Template::new("Vector", guid(1))
                    .field(FieldDef::named(FieldKind::Float, "x"))
                    .field(FieldDef::named(FieldKind::Float, "y")),
            )
            .unwrap();
        file.register_template(
            Template::new("Path", guid(2))
                .field(FieldDef::named(FieldKind::Dword, "n"))
                .field(
                    FieldDef::named(FieldKind::Template(vector), "points")
                        .with_dim(ArrayDim::Dynamic("n".into())),
                )
                .restrict(vector),
        )
        .unwrap();

        let expected = "\
template Vector {
  <00000001-0000-0000-0000-000000000000>
  FLOAT x;
  FLOAT y;
}

template Path {
  <00000002-0000-0000-0000-000000000000>
  DWORD n;
  array Vector points[n];
  [Vector <00000001-0000-0000-0000-000000000000>]
}
";
        assert_eq!(body(&file), expected);
    }

    #[test]
    fn test_record_text() {
        let mut file = XFile::new(&StandardLibrary::empty());
        let vector = file
            .register_template(
                Template::new("Vector", guid(1))
                    .field(FieldDef::named(FieldKind::Float, "x"))
                    .field(FieldDef::named(FieldKind::Float, "y")),
            )
            .unwrap();
        let path = file
            .register_template(
                Template::new("Path", guid(2))
                    .field(FieldDef::named(FieldKind::Dword, "n"))
                    .field(
                        FieldDef::named(FieldKind::Template(vector), "points")
                            .with_dim(ArrayDim::Dynamic("n".into())),
                    )
                    .field(FieldDef::named(FieldKind::Word, "ids").with_dim(ArrayDim::Fixed(3)))
                    .field(FieldDef::named(FieldKind::String, "tag"))
                    .open(),
            )
            .unwrap();

        let point = |x: f64, y: f64| {
            DataObject::Record(crate::value::RecordValue {
                template: vector,
                name: Some("points".into()),
                fields: vec![DataObject::Double(x), DataObject::Double(y)],
            })
        };
        let p = file
            .add_record(
                None,
                path,
                Some("P"),
                None,
                vec![
                    DataObject::Int(2),
                    DataObject::Array(vec![point(0.0, 1.0), point(2.5, -3.0)]),
                    DataObject::Array(vec![DataObject::Int(7), DataObject::Int(8), DataObject::Int(9)]),
                    DataObject::Str("t".into()),
                ],
            )
            .unwrap();
        let q = file.begin_record(Some(p), vector, Some("Q"), None, Position::default()).unwrap();
        file.add_parse_double(q, vec![1.0, 2.0], Position::default()).unwrap();
        file.finalize_parse_data(q).unwrap();
        let r = file.add_record(None, path, Some("R"), None, vec![
            DataObject::Int(0),
            DataObject::Array(vec![]),
            DataObject::Array(vec![DataObject::Int(1), DataObject::Int(2), DataObject::Int(3)]),
            DataObject::Str("r".into()),
        ]).unwrap();
        file.add_reference(r, q).unwrap();

        let text = body(&file);
        let expected_p = "\
Path P {
  2;
  0.0; 1.0;,
  2.5; -3.0;;
  7, 8, 9;
  \"t\";
  Vector Q {
    1.0; 2.0;
  }
}
";
        assert!(text.contains(expected_p), "{}", text);
        assert!(text.contains("Path R {\n  0;\n  ;\n  1, 2, 3;\n  \"r\";\n  { Q }\n}\n"), "{}", text);
    }

    #[test]
    fn test_long_arrays_one_per_line() {
        let mut file = XFile::new(&StandardLibrary::empty());
        let t = file
            .register_template(
                Template::new("Many", guid(1))
                    .field(FieldDef::named(FieldKind::Word, "v").with_dim(ArrayDim::Fixed(17))),
            )
            .unwrap();
        let values = (0..17).map(DataObject::Int).collect();
        file.add_record(None, t, None, None, vec![DataObject::Array(values)]).unwrap();

        let text = body(&file);
        assert!(text.contains("  0,\n  1,\n"));
        assert!(text.contains("  16;\n}"));
    }
}
