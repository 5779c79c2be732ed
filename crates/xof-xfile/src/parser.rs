//! Recursive-descent parser for the text body.
//!
//! Template declarations are registered as they are read. Data objects are
//! created with [`XFile::begin_record`], their numbers and strings staged
//! in source order and repacked when the closing brace is reached. Numbers
//! are staged in runs: consecutive literals of one category become a
//! single staged token no matter which separators sit between them.

use tracing::trace;
use xof_common::GuidKey;

use crate::error::{Error, ParseError, Result};
use crate::file::XFile;
use crate::lexer::{tokenize, Token, TokenKind};
use crate::record::RecordId;
use crate::staging::Position;
use crate::template::{ArrayDim, FieldDef, Template, TemplateId};
use crate::types::FieldKind;

/// Parse `body` into `file`.
pub(crate) fn parse_body(file: &mut XFile, body: &str) -> Result<()> {
    let tokens = tokenize(body)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        file,
    };
    parser.body()
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    file: &'a mut XFile,
}

/// Numbers waiting to be staged.
enum Run {
    Empty,
    Ints(Vec<i64>, Position),
    Doubles(Vec<f64>, Position),
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        // The lexer always ends the list with Eof, and `advance` never
        // moves past it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn unexpected(token: &Token, expected: &'static str) -> Error {
        ParseError::Unexpected {
            position: token.position,
            expected,
            found: token.kind.to_string(),
        }
        .into()
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token> {
        let token = self.advance();
        if token.kind == kind {
            Ok(token)
        } else {
            Err(Self::unexpected(&token, expected))
        }
    }

    fn expect_ident(&mut self, expected: &'static str) -> Result<(String, Position)> {
        let token = self.advance();
        match token.kind {
            TokenKind::Ident(name) => Ok((name, token.position)),
            _ => Err(Self::unexpected(&token, expected)),
        }
    }

    fn is_keyword(token: &Token, keyword: &str) -> bool {
        matches!(&token.kind, TokenKind::Ident(name) if name.eq_ignore_ascii_case(keyword))
    }

    fn optional_guid(&mut self) -> Option<GuidKey> {
        let guid = match &self.peek().kind {
            TokenKind::Guid(guid) => Some(*guid),
            _ => None,
        };
        if guid.is_some() {
            self.advance();
        }
        guid
    }

    fn body(&mut self) -> Result<()> {
        loop {
            let token = self.peek().clone();
            match &token.kind {
                TokenKind::Eof => return Ok(()),
                _ if Self::is_keyword(&token, "template") => {
                    let (id, attach) = self.template()?;
                    if attach {
                        self.file.attach_template(None, id);
                    }
                }
                TokenKind::Ident(_) => {
                    self.object(None)?;
                }
                _ => return Err(Self::unexpected(&token, "template or data object")),
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────
    // Templates
    // ─────────────────────────────────────────────────────────────────

    /// Parse and register one template.
    ///
    /// The caller places it in the tree when the returned flag is set; an
    /// identical re-declaration already has its place.
    fn template(&mut self) -> Result<(TemplateId, bool)> {
        self.advance();
        let (name, position) = self.expect_ident("template name")?;
        self.expect(TokenKind::LBrace, "'{'")?;
        let guid = match self.advance() {
            Token {
                kind: TokenKind::Guid(guid),
                ..
            } => guid,
            token => return Err(Self::unexpected(&token, "template GUID")),
        };

        let mut template = Template::new(name, guid);
        let mut nested = Vec::new();

        loop {
            let token = self.peek().clone();
            match &token.kind {
                TokenKind::RBrace => {
                    self.advance();
                    break;
                }
                TokenKind::LBracket => {
                    template = self.restrictions(template)?;
                    self.expect(TokenKind::RBrace, "'}' after restrictions")?;
                    break;
                }
                _ if Self::is_keyword(&token, "template") => {
                    nested.push(self.template()?);
                }
                TokenKind::Ident(_) => {
                    template = template.field(self.member()?);
                }
                _ => return Err(Self::unexpected(&token, "template member")),
            }
        }

        let (id, attach) = self
            .file
            .insert_template(template)
            .map_err(|source| Error::RegistryAt { position, source })?;
        for (child, child_attach) in nested {
            if child_attach {
                self.file.attach_template(Some(id), child);
            }
        }
        trace!(%id, "parsed template");
        Ok((id, attach))
    }

    /// `[array] TYPE [NAME] ([dim])* ;`
    fn member(&mut self) -> Result<FieldDef> {
        let mut array = false;
        if Self::is_keyword(self.peek(), "array") {
            self.advance();
            array = true;
        }

        let (type_name, position) = self.expect_ident("field type")?;
        let kind = match FieldKind::from_keyword(&type_name) {
            Some(kind) => kind,
            None => FieldKind::Template(self.file.find_template(&type_name).ok_or(
                ParseError::UnknownTemplate {
                    position,
                    name: type_name,
                },
            )?),
        };

        let name = match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        };
        let mut field = FieldDef::new(kind, name.as_deref());

        while self.peek().kind == TokenKind::LBracket {
            self.advance();
            let token = self.advance();
            let dim = match token.kind {
                TokenKind::Integer(n) => ArrayDim::Fixed(u32::try_from(n).map_err(|_| {
                    ParseError::BadNumber {
                        position: token.position,
                        text: n.to_string(),
                    }
                })?),
                TokenKind::Ident(size) => ArrayDim::Dynamic(size),
                _ => return Err(Self::unexpected(&token, "array size")),
            };
            field = field.with_dim(dim);
            self.expect(TokenKind::RBracket, "']'")?;
        }

        if array && !field.is_array() {
            let token = self.peek().clone();
            return Err(Self::unexpected(&token, "array dimension"));
        }
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(field)
    }

    /// `[ ... ]` or `[ NAME [<GUID>] (, NAME [<GUID>])* ]`
    fn restrictions(&mut self, mut template: Template) -> Result<Template> {
        self.advance();
        if self.peek().kind == TokenKind::Ellipsis {
            self.advance();
            self.expect(TokenKind::RBracket, "']'")?;
            return Ok(template.open());
        }

        loop {
            let (name, position) = self.expect_ident("template name")?;
            let guid = self.optional_guid();
            let id = guid
                .and_then(|g| self.file.find_template_by_guid(&g))
                .or_else(|| self.file.find_template(&name))
                .ok_or(ParseError::UnknownTemplate { position, name })?;
            template = template.restrict(id);

            let token = self.advance();
            match token.kind {
                TokenKind::Comma => continue,
                TokenKind::RBracket => return Ok(template),
                _ => return Err(Self::unexpected(&token, "',' or ']'")),
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────
    // Data objects
    // ─────────────────────────────────────────────────────────────────

    /// `TEMPLATE [NAME] { [<GUID>] part* }`
    fn object(&mut self, parent: Option<RecordId>) -> Result<()> {
        let (type_name, position) = self.expect_ident("template name")?;
        let template = self
            .file
            .find_template(&type_name)
            .ok_or(ParseError::UnknownTemplate {
                position,
                name: type_name,
            })?;

        let name = match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        };
        self.expect(TokenKind::LBrace, "'{'")?;
        let guid = self.optional_guid();

        let record = self
            .file
            .begin_record(parent, template, name.as_deref(), guid, position)
            .map_err(|source| Error::RegistryAt { position, source })?;

        let mut run = Run::Empty;
        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::Integer(v) => match &mut run {
                    Run::Ints(values, _) => values.push(v),
                    _ => {
                        self.flush(record, &mut run)?;
                        run = Run::Ints(vec![v], token.position);
                    }
                },
                TokenKind::Real(v) => match &mut run {
                    Run::Doubles(values, _) => values.push(v),
                    _ => {
                        self.flush(record, &mut run)?;
                        run = Run::Doubles(vec![v], token.position);
                    }
                },
                TokenKind::Str(s) => {
                    self.flush(record, &mut run)?;
                    self.file.add_parse_string(record, s, token.position)?;
                }
                TokenKind::Semicolon | TokenKind::Comma => {}
                TokenKind::LBrace => {
                    self.flush(record, &mut run)?;
                    self.reference(record, token.position)?;
                }
                TokenKind::Ident(_) => {
                    self.flush(record, &mut run)?;
                    self.pos -= 1;
                    self.object(Some(record))?;
                }
                TokenKind::RBrace => {
                    self.flush(record, &mut run)?;
                    break;
                }
                _ => return Err(Self::unexpected(&token, "data, object or '}'")),
            }
        }

        self.finish(record)
    }

    fn flush(&mut self, record: RecordId, run: &mut Run) -> Result<()> {
        match std::mem::replace(run, Run::Empty) {
            Run::Empty => {}
            Run::Ints(values, position) => self.file.add_parse_int(record, values, position)?,
            Run::Doubles(values, position) => {
                self.file.add_parse_double(record, values, position)?
            }
        }
        Ok(())
    }

    /// Repack a finished object, dropping it if the options allow.
    fn finish(&mut self, record: RecordId) -> Result<()> {
        match self.file.finalize_parse_data(record) {
            Ok(()) => Ok(()),
            Err(err) if self.file.options().skip_bad_records => {
                let position = self.file.record(record).map(|r| r.position());
                self.file.discard_record(record)?;
                self.file.error(err.to_string(), position);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// `{ [NAME] [<GUID>] }`, the opening brace already consumed.
    fn reference(&mut self, parent: RecordId, position: Position) -> Result<()> {
        let name = match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        };
        let guid = self.optional_guid();
        self.expect(TokenKind::RBrace, "'}' closing the reference")?;

        let target = guid
            .and_then(|g| self.file.find_record_by_guid(&g))
            .or_else(|| name.as_deref().and_then(|n| self.file.find_record(n)));
        let Some(target) = target else {
            let name = match (name, guid) {
                (Some(name), _) => name,
                (None, Some(guid)) => format!("<{}>", guid),
                (None, None) => "{}".to_string(),
            };
            return Err(ParseError::UnknownReference { position, name }.into());
        };

        self.file.attach_reference(parent, target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RegistryError, RepackError};
    use crate::options::ReadOptions;
    use crate::standard::StandardLibrary;
    use crate::value::DataObject;
    use crate::NodeRef;
    use crate::node::Node;

    const TEMPLATES: &str = r#"
template Vector {
  <3D82AB5E-62DA-11CF-AB39-0020AF71E433>
  FLOAT x;
  FLOAT y;
  FLOAT z;
}

template Shape {
  <00000001-0000-0000-0000-000000000001>
  DWORD nPoints;
  array Vector points[nPoints];
  STRING label;
  [...]
}
"#;

    fn parse(body: &str, options: ReadOptions) -> Result<XFile> {
        let mut file = XFile::new(&StandardLibrary::empty());
        file.set_options(options);
        parse_body(&mut file, &format!("{}{}", TEMPLATES, body))?;
        Ok(file)
    }

    #[test]
    fn test_templates_and_object() {
        let file = parse(
            r#"
Shape Tri {
  3;
  0.0; 0.0; 0.0;,
  1.0; 0.0; 0.0;,
  0.0; 1.0; 0.0;;
  "triangle";
}
"#,
            ReadOptions::default(),
        )
        .unwrap();

        let shape = file.find_template("SHAPE").unwrap();
        assert!(file.template(shape).unwrap().is_open());

        let tri = file.find_record("Tri").unwrap();
        assert_eq!(file.field(tri, "nPoints"), Some(&DataObject::Int(3)));
        assert_eq!(file.field(tri, "points").unwrap().as_array().unwrap().len(), 3);
        assert_eq!(
            file.field(tri, "label").and_then(DataObject::as_str),
            Some("triangle")
        );
        assert!(file.diagnostics().is_empty());
    }

    #[test]
    fn test_nested_objects_and_references() {
        let file = parse(
            r#"
Shape A { 0;; "a"; Vector V { 1.0; 2.0; 3.0; } }
Shape B { 0;; "b"; { V } }
"#,
            ReadOptions::default(),
        )
        .unwrap();

        let a = file.find_record("A").unwrap();
        let b = file.find_record("B").unwrap();
        let v = file.find_record("V").unwrap();
        assert_eq!(file.record(v).unwrap().parent(), Some(a));

        let children: Vec<_> = file.record(b).unwrap().children().iter().collect();
        assert_eq!(children, vec![NodeRef::Reference(v)]);
    }

    #[test]
    fn test_unknown_reference() {
        let err = parse("Shape A { 0;; \"a\"; { Nope } }", ReadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse(ParseError::UnknownReference { ref name, .. }) if name == "Nope"
        ));
    }

    #[test]
    fn test_truncated_record_aborts_or_skips() {
        let body = "Shape Bad { 2; 1.0; 2.0; 3.0; }\nShape Good { 0;; \"g\"; }";

        let err = parse(body, ReadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Record {
                source: RepackError::Truncated { .. },
                ..
            }
        ));

        let file = parse(body, ReadOptions::default().skip_bad_records(true)).unwrap();
        assert!(file.find_record("Bad").is_none());
        assert!(file.find_record("Good").is_some());
        assert_eq!(file.diagnostics().len(), 1);
    }

    #[test]
    fn test_unknown_template() {
        let err = parse("Mesh M { }", ReadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse(ParseError::UnknownTemplate { ref name, .. }) if name == "Mesh"
        ));
    }

    #[test]
    fn test_restricted_template() {
        let file = parse(
            r#"
template Holder {
  <00000002-0000-0000-0000-000000000002>
  DWORD n;
  [Vector <3D82AB5E-62DA-11CF-AB39-0020AF71E433>, Shape]
}
Holder H { 1; Vector { 0.0; 0.0; 0.0; } }
"#,
            ReadOptions::default(),
        )
        .unwrap();
        let holder = file.template(file.find_template("Holder").unwrap()).unwrap();
        assert_eq!(holder.restrictions().len(), 2);
        assert!(file.diagnostics().is_empty());
    }

    #[test]
    fn test_nested_template_declaration() {
        let file = parse(
            r#"
template Outer {
  <00000003-0000-0000-0000-000000000003>
  template Inner {
    <00000004-0000-0000-0000-000000000004>
    WORD w;
  }
  Inner inner;
  array WORD pair[2];
}
Outer O { 5; 6, 7; }
"#,
            ReadOptions::default(),
        )
        .unwrap();
        let outer = file.find_template("Outer").unwrap();
        let inner = file.find_template("Inner").unwrap();
        assert_eq!(
            file.find_child(Some(NodeRef::Template(outer)), "inner"),
            Some(NodeRef::Template(inner))
        );
        let o = file.find_record("O").unwrap();
        let value = file.field(o, "inner").and_then(DataObject::as_record).unwrap();
        assert_eq!(value.fields, vec![DataObject::Int(5)]);
    }

    #[test]
    fn test_duplicate_object_guid() {
        let err = parse(
            r#"
Vector A { <00000009-0000-0000-0000-000000000009> 0.0; 0.0; 0.0; }
Vector B { <00000009-0000-0000-0000-000000000009> 0.0; 0.0; 0.0; }
"#,
            ReadOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::RegistryAt {
                source: RegistryError::DuplicateGuid(_),
                ..
            }
        ));
    }

    #[test]
    fn test_syntax_error_position() {
        let err = parse("Vector V { 1.0; ] }", ReadOptions::default()).unwrap_err();
        match err {
            Error::Parse(ParseError::Unexpected { position, .. }) => {
                assert_eq!(position.line, TEMPLATES.lines().count() as u32 + 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
