//! Repacking: matching a record's staged tokens against its template.
//!
//! The template's fields are walked in order while a [`Cursor`] walks the
//! flat staging list. Template-typed fields recurse into the same token
//! stream, and dynamic array extents are looked up in a [`PrevFieldMap`]
//! holding the integer fields already filled in the current record, which
//! is why a size field must come before the array it sizes.

use hashbrown::HashMap as FastHashMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

use crate::error::RepackError;
use crate::staging::{ParseStaging, StagedValue};
use crate::template::{FieldDef, Template, TemplateId};
use crate::types::{FieldKind, ValueCategory};
use crate::value::{DataObject, RecordValue};

type FxHashMap<K, V> = FastHashMap<K, V, BuildHasherDefault<FxHasher>>;

/// Array elements that consume no data (empty inner arrays, records of
/// field-less templates) allowed beyond the record's element count.
const EMPTY_ELEMENT_SLACK: usize = 1 << 16;

/// Position in a staging list: the token, and the element within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub index: usize,
    pub sub_index: usize,
}

/// Integer values of the named fields filled so far in one record.
///
/// Nested records start from a copy of their parent's map, so they can see
/// the enclosing record's sizes but never leak their own back up.
#[derive(Debug, Clone, Default)]
pub struct PrevFieldMap {
    values: FxHashMap<String, i64>,
}

impl PrevFieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: i64) {
        self.values.insert(name.to_string(), value);
    }

    /// Bind a field value; only integers can size arrays.
    pub fn bind(&mut self, name: &str, value: &DataObject) {
        if let Some(v) = value.as_i64() {
            self.insert(name, v);
        }
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<i64> {
        self.values.get(name).copied()
    }
}

/// Result of a successful repack.
#[derive(Debug, Clone, PartialEq)]
pub struct Repacked {
    /// Field values in template order.
    pub fields: Vec<DataObject>,
    /// Primitive elements left unconsumed after the last field.
    pub leftover: usize,
}

/// Repack `staging` into the fields of `template`.
///
/// Running out of data is fatal. Leftover data is reported in
/// [`Repacked::leftover`] and left to the caller to judge.
pub fn repack(
    templates: &[Template],
    template: TemplateId,
    staging: &ParseStaging,
) -> Result<Repacked, RepackError> {
    let mut repacker = Repacker {
        templates,
        staging,
        cursor: Cursor::default(),
        empty_budget: 0,
    };
    repacker.empty_budget = repacker.remaining().saturating_add(EMPTY_ELEMENT_SLACK);
    let fields = repacker.template_fields(template, &PrevFieldMap::new())?;
    let leftover = repacker.remaining();
    Ok(Repacked { fields, leftover })
}

struct Repacker<'a> {
    templates: &'a [Template],
    staging: &'a ParseStaging,
    cursor: Cursor,
    /// Elements that may still be produced without consuming data.
    empty_budget: usize,
}

impl<'a> Repacker<'a> {
    fn template(&self, id: TemplateId) -> Result<&'a Template, RepackError> {
        self.templates
            .get(id.index())
            .ok_or(RepackError::UnknownTemplate(id))
    }

    fn template_fields(
        &mut self,
        id: TemplateId,
        outer: &PrevFieldMap,
    ) -> Result<Vec<DataObject>, RepackError> {
        let template = self.template(id)?;
        let mut prev = outer.clone();
        let mut fields = Vec::with_capacity(template.fields().len());

        for field in template.fields() {
            let value = self.field_value(template, field, 0, &prev)?;
            if let Some(name) = field.name() {
                prev.bind(name, &value);
            }
            fields.push(value);
        }

        Ok(fields)
    }

    fn field_value(
        &mut self,
        template: &Template,
        field: &FieldDef,
        depth: usize,
        prev: &PrevFieldMap,
    ) -> Result<DataObject, RepackError> {
        let Some(dim) = field.dims().get(depth) else {
            return self.element(template, field, prev);
        };

        let extent = dim.resolve(prev)? as usize;
        // The extent comes from file data; don't trust it for the allocation.
        let mut elements = Vec::with_capacity(extent.min(self.remaining().max(1)));
        for _ in 0..extent {
            let before = self.cursor;
            elements.push(self.field_value(template, field, depth + 1, prev)?);
            if self.cursor == before {
                // Only data-bearing elements are bounded by the input size.
                self.empty_budget = self.empty_budget.checked_sub(1).ok_or_else(|| {
                    RepackError::ExtentTooLarge {
                        field: field.label().to_string(),
                        extent,
                    }
                })?;
            }
        }
        Ok(DataObject::Array(elements))
    }

    fn element(
        &mut self,
        template: &Template,
        field: &FieldDef,
        prev: &PrevFieldMap,
    ) -> Result<DataObject, RepackError> {
        if let FieldKind::Template(nested) = field.kind() {
            let fields = self.template_fields(nested, prev)?;
            return Ok(DataObject::Record(RecordValue {
                template: nested,
                name: field.name().map(str::to_string),
                fields,
            }));
        }

        match field.kind().category() {
            ValueCategory::Integer => self.next_int(template, field).map(DataObject::Int),
            ValueCategory::Real => self.next_double(template, field).map(DataObject::Double),
            ValueCategory::Text | ValueCategory::Record => {
                self.next_string(template, field).map(DataObject::Str)
            }
        }
    }

    fn truncated(template: &Template, field: &FieldDef) -> RepackError {
        RepackError::Truncated {
            template: template.name().to_string(),
            field: field.label().to_string(),
        }
    }

    fn mismatch(field: &FieldDef, expected: ValueCategory, found: &'static str) -> RepackError {
        RepackError::TypeMismatch {
            field: field.label().to_string(),
            expected: expected.as_str(),
            found,
        }
    }

    fn next_int(&mut self, template: &Template, field: &FieldDef) -> Result<i64, RepackError> {
        let token = self
            .staging
            .get(self.cursor.index)
            .ok_or_else(|| Self::truncated(template, field))?;
        match &token.value {
            StagedValue::Ints(values) => {
                let value = *values
                    .get(self.cursor.sub_index)
                    .ok_or_else(|| Self::truncated(template, field))?;
                self.advance(values.len());
                Ok(value)
            }
            _ => Err(Self::mismatch(field, ValueCategory::Integer, token.category())),
        }
    }

    fn next_double(&mut self, template: &Template, field: &FieldDef) -> Result<f64, RepackError> {
        let token = self
            .staging
            .get(self.cursor.index)
            .ok_or_else(|| Self::truncated(template, field))?;
        match &token.value {
            StagedValue::Doubles(values) => {
                let value = *values
                    .get(self.cursor.sub_index)
                    .ok_or_else(|| Self::truncated(template, field))?;
                self.advance(values.len());
                Ok(value)
            }
            StagedValue::Ints(values) => {
                let value = *values
                    .get(self.cursor.sub_index)
                    .ok_or_else(|| Self::truncated(template, field))?;
                self.advance(values.len());
                Ok(value as f64)
            }
            StagedValue::Str(_) => Err(Self::mismatch(field, ValueCategory::Real, token.category())),
        }
    }

    fn next_string(&mut self, template: &Template, field: &FieldDef) -> Result<String, RepackError> {
        let token = self
            .staging
            .get(self.cursor.index)
            .ok_or_else(|| Self::truncated(template, field))?;
        match &token.value {
            StagedValue::Str(s) => {
                self.advance(1);
                Ok(s.clone())
            }
            _ => Err(Self::mismatch(field, ValueCategory::Text, token.category())),
        }
    }

    fn advance(&mut self, run_len: usize) {
        self.cursor.sub_index += 1;
        if self.cursor.sub_index >= run_len {
            self.cursor.index += 1;
            self.cursor.sub_index = 0;
        }
    }

    /// Primitive elements not yet consumed.
    fn remaining(&self) -> usize {
        let Some(current) = self.staging.get(self.cursor.index) else {
            return 0;
        };
        let rest: usize = self
            .staging
            .iter()
            .skip(self.cursor.index + 1)
            .map(|t| t.len())
            .sum();
        current.len().saturating_sub(self.cursor.sub_index) + rest
    }
}

/// Check that programmatically built field values fit `template`.
///
/// This is the repack walk run over values instead of tokens: field count,
/// value categories, nested templates and every array extent (fixed or
/// dynamic) must match.
pub fn check_fields(
    templates: &[Template],
    template: TemplateId,
    fields: &[DataObject],
) -> Result<(), RepackError> {
    check_record(templates, template, fields, &PrevFieldMap::new())
}

fn check_record(
    templates: &[Template],
    id: TemplateId,
    fields: &[DataObject],
    outer: &PrevFieldMap,
) -> Result<(), RepackError> {
    let template = templates
        .get(id.index())
        .ok_or(RepackError::UnknownTemplate(id))?;

    if fields.len() != template.fields().len() {
        return Err(shape(
            template,
            format!("expected {} fields, got {}", template.fields().len(), fields.len()),
        ));
    }

    let mut prev = outer.clone();
    for (def, value) in template.fields().iter().zip(fields) {
        check_value(templates, template, def, 0, value, &prev)?;
        if let Some(name) = def.name() {
            prev.bind(name, value);
        }
    }
    Ok(())
}

fn check_value(
    templates: &[Template],
    template: &Template,
    def: &FieldDef,
    depth: usize,
    value: &DataObject,
    prev: &PrevFieldMap,
) -> Result<(), RepackError> {
    if let Some(dim) = def.dims().get(depth) {
        let extent = dim.resolve(prev)? as usize;
        let DataObject::Array(items) = value else {
            return Err(shape(template, format!("field {} must be an array", def.label())));
        };
        if items.len() != extent {
            return Err(shape(
                template,
                format!("field {} has {} elements, expected {}", def.label(), items.len(), extent),
            ));
        }
        for item in items {
            check_value(templates, template, def, depth + 1, item, prev)?;
        }
        return Ok(());
    }

    let ok = match (def.kind().category(), value) {
        (ValueCategory::Integer, DataObject::Int(_)) => true,
        (ValueCategory::Real, DataObject::Double(_)) => true,
        (ValueCategory::Text, DataObject::Str(_)) => true,
        (ValueCategory::Record, DataObject::Record(record)) => {
            if def.kind() != FieldKind::Template(record.template) {
                false
            } else {
                check_record(templates, record.template, &record.fields, prev)?;
                true
            }
        }
        _ => false,
    };

    if ok {
        Ok(())
    } else {
        Err(shape(
            template,
            format!("field {} expects {} data", def.label(), def.kind().category().as_str()),
        ))
    }
}

fn shape(template: &Template, reason: String) -> RepackError {
    RepackError::ShapeMismatch {
        template: template.name().to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::Position;
    use crate::template::ArrayDim;
    use xof_common::GuidKey;

    const P: Position = Position::new(1, 1);

    /// 0: Vector { FLOAT x; FLOAT y; FLOAT z; }
    /// 1: T { DWORD n; array FLOAT vals[n]; }
    /// 2: Poly { DWORD n; array Vector pts[n]; STRING tag; }
    /// 3: Grid { DWORD w; DWORD h; array WORD cells[h][w]; }
    fn templates() -> Vec<Template> {
        let g = |n: u32| GuidKey::new(n, 0, 0, [0; 8]);
        vec![
            Template::new("Vector", g(1))
                .field(FieldDef::named(FieldKind::Float, "x"))
                .field(FieldDef::named(FieldKind::Float, "y"))
                .field(FieldDef::named(FieldKind::Float, "z")),
            Template::new("T", g(2))
                .field(FieldDef::named(FieldKind::Dword, "n"))
                .field(FieldDef::named(FieldKind::Float, "vals").with_dim(ArrayDim::Dynamic("n".into()))),
            Template::new("Poly", g(3))
                .field(FieldDef::named(FieldKind::Dword, "n"))
                .field(
                    FieldDef::named(FieldKind::Template(TemplateId(0)), "pts")
                        .with_dim(ArrayDim::Dynamic("n".into())),
                )
                .field(FieldDef::named(FieldKind::String, "tag")),
            Template::new("Grid", g(4))
                .field(FieldDef::named(FieldKind::Dword, "w"))
                .field(FieldDef::named(FieldKind::Dword, "h"))
                .field(
                    FieldDef::named(FieldKind::Word, "cells")
                        .with_dim(ArrayDim::Dynamic("h".into()))
                        .with_dim(ArrayDim::Dynamic("w".into())),
                ),
        ]
    }

    fn floats(values: &[f64]) -> DataObject {
        DataObject::Array(values.iter().copied().map(DataObject::Double).collect())
    }

    #[test]
    fn test_dynamic_array_exact() {
        let mut staging = ParseStaging::new();
        staging.add_ints(vec![3], P);
        staging.add_doubles(vec![1.0, 2.0, 3.0], P);

        let out = repack(&templates(), TemplateId(1), &staging).unwrap();
        assert_eq!(out.fields, vec![DataObject::Int(3), floats(&[1.0, 2.0, 3.0])]);
        assert_eq!(out.leftover, 0);
    }

    #[test]
    fn test_dynamic_array_truncated() {
        let mut staging = ParseStaging::new();
        staging.add_ints(vec![3], P);
        staging.add_doubles(vec![1.0, 2.0], P);

        let err = repack(&templates(), TemplateId(1), &staging).unwrap_err();
        assert_eq!(
            err,
            RepackError::Truncated {
                template: "T".into(),
                field: "vals".into()
            }
        );
    }

    #[test]
    fn test_dynamic_array_leftover() {
        let mut staging = ParseStaging::new();
        staging.add_ints(vec![3], P);
        staging.add_doubles(vec![1.0, 2.0, 3.0, 4.0], P);

        let out = repack(&templates(), TemplateId(1), &staging).unwrap();
        assert_eq!(out.fields[1], floats(&[1.0, 2.0, 3.0]));
        assert_eq!(out.leftover, 1);
    }

    #[test]
    fn test_single_run_spans_fields() {
        // "3; 1; 2; 3;" lexes as one integer run; reals accept integers.
        let mut staging = ParseStaging::new();
        staging.add_ints(vec![3, 1, 2, 3], P);

        let out = repack(&templates(), TemplateId(1), &staging).unwrap();
        assert_eq!(out.fields[1], floats(&[1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_nested_template_array() {
        let mut staging = ParseStaging::new();
        staging.add_ints(vec![2], P);
        staging.add_doubles(vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5], P);
        staging.add_string("quad".into(), P);

        let out = repack(&templates(), TemplateId(2), &staging).unwrap();
        let points = out.fields[1].as_array().unwrap();
        assert_eq!(points.len(), 2);
        let second = points[1].as_record().unwrap();
        assert_eq!(second.template, TemplateId(0));
        assert_eq!(second.fields, vec![
            DataObject::Double(1.5),
            DataObject::Double(2.0),
            DataObject::Double(2.5)
        ]);
        assert_eq!(out.fields[2], DataObject::Str("quad".into()));
    }

    #[test]
    fn test_multi_dimensional() {
        let mut staging = ParseStaging::new();
        staging.add_ints(vec![3, 2, 1, 2, 3, 4, 5, 6], P);

        let out = repack(&templates(), TemplateId(3), &staging).unwrap();
        let rows = out.fields[2].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1],
            DataObject::Array(vec![DataObject::Int(4), DataObject::Int(5), DataObject::Int(6)])
        );
    }

    #[test]
    fn test_type_mismatch() {
        let mut staging = ParseStaging::new();
        staging.add_doubles(vec![1.5], P);

        let err = repack(&templates(), TemplateId(1), &staging).unwrap_err();
        assert!(matches!(
            err,
            RepackError::TypeMismatch {
                expected: "integer",
                found: "real",
                ..
            }
        ));
    }

    #[test]
    fn test_nested_sizes_do_not_leak_up() {
        // Outer { DWORD n; Inner inner; array WORD v[n]; } with Inner { DWORD n; }
        let g = |n: u32| GuidKey::new(n, 0, 0, [0; 8]);
        let templates = vec![
            Template::new("Inner", g(1)).field(FieldDef::named(FieldKind::Dword, "n")),
            Template::new("Outer", g(2))
                .field(FieldDef::named(FieldKind::Dword, "n"))
                .field(FieldDef::named(FieldKind::Template(TemplateId(0)), "inner"))
                .field(FieldDef::named(FieldKind::Word, "v").with_dim(ArrayDim::Dynamic("n".into()))),
        ];

        let mut staging = ParseStaging::new();
        staging.add_ints(vec![2, 5, 7, 8], P);

        let out = repack(&templates, TemplateId(1), &staging).unwrap();
        assert_eq!(out.fields[1].as_record().unwrap().fields, vec![DataObject::Int(5)]);
        assert_eq!(
            out.fields[2],
            DataObject::Array(vec![DataObject::Int(7), DataObject::Int(8)])
        );
        assert_eq!(out.leftover, 0);
    }

    #[test]
    fn test_nested_record_sees_enclosing_sizes() {
        // Row { array WORD cells[w]; } sized by the enclosing record's w.
        let g = |n: u32| GuidKey::new(n, 0, 0, [0; 8]);
        let templates = vec![
            Template::new("Row", g(1))
                .field(FieldDef::named(FieldKind::Word, "cells").with_dim(ArrayDim::Dynamic("w".into()))),
            Template::new("Table", g(2))
                .field(FieldDef::named(FieldKind::Dword, "w"))
                .field(FieldDef::named(FieldKind::Template(TemplateId(0)), "row")),
        ];

        let mut staging = ParseStaging::new();
        staging.add_ints(vec![2, 3, 4], P);

        let out = repack(&templates, TemplateId(1), &staging).unwrap();
        let row = out.fields[1].as_record().unwrap();
        assert_eq!(row.fields[0].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_elements_are_bounded() {
        // cells[h][w] with w = 0: every row is empty, so h is not backed by data.
        let mut staging = ParseStaging::new();
        staging.add_ints(vec![0, 4_294_967_295], P);

        let err = repack(&templates(), TemplateId(3), &staging).unwrap_err();
        assert_eq!(
            err,
            RepackError::ExtentTooLarge {
                field: "cells".into(),
                extent: 4_294_967_295,
            }
        );

        let mut staging = ParseStaging::new();
        staging.add_ints(vec![0, 3], P);
        let out = repack(&templates(), TemplateId(3), &staging).unwrap();
        assert_eq!(
            out.fields[2],
            DataObject::Array(vec![DataObject::Array(vec![]); 3])
        );
    }

    #[test]
    fn test_check_fields() {
        let templates = templates();
        let good = vec![DataObject::Int(2), floats(&[1.0, 2.0])];
        assert!(check_fields(&templates, TemplateId(1), &good).is_ok());

        let wrong_len = vec![DataObject::Int(3), floats(&[1.0, 2.0])];
        assert!(matches!(
            check_fields(&templates, TemplateId(1), &wrong_len),
            Err(RepackError::ShapeMismatch { .. })
        ));

        let wrong_kind = vec![DataObject::Int(1), DataObject::Array(vec![DataObject::Int(1)])];
        assert!(check_fields(&templates, TemplateId(1), &wrong_kind).is_err());

        let missing = vec![DataObject::Int(1)];
        assert!(check_fields(&templates, TemplateId(1), &missing).is_err());
    }
}
