//! Per-kind translation of elaborated cursors into declarations.

use crate::error::{Error, location_of};
use crate::{Elaborator, names};
use c_ast::{CType, Cursor, CursorKind};
use cslice_ir::{
    Attribute, DeclarationKind, Enumerator, Field, Fragment, FunctionType, Meta, Param,
    RecordKind, Storage, Symbol, Tlid, Type, UnitDeclaration,
};
use std::collections::BTreeSet;
use tracing::trace;

fn attributes_of<C: Cursor>(children: &[C]) -> BTreeSet<Attribute> {
    children
        .iter()
        .filter(|child| child.kind() == CursorKind::Attribute)
        .filter_map(Cursor::attribute)
        .collect()
}

fn name_of<C: Cursor>(cursor: &C) -> Option<String> {
    let spelling = cursor.spelling();
    match names::normalize(&spelling) {
        "" => None,
        name => Some(name.to_string()),
    }
}

impl<C: Cursor> Elaborator<C> {
    pub(crate) fn translate(
        &mut self,
        cursor: &C,
        symbol: &Symbol,
    ) -> Result<UnitDeclaration, Error> {
        let name = symbol.entity.name();
        let children = cursor.children();
        let kind = match cursor.kind() {
            CursorKind::Function => self.translate_function(cursor, name, &children)?,
            CursorKind::Variable => self.translate_variable(cursor, name, &children)?,
            CursorKind::Struct => DeclarationKind::Struct {
                fields: self.translate_record(cursor)?,
                attributes: attributes_of(&children),
            },
            CursorKind::Union => DeclarationKind::Union {
                fields: self.translate_record(cursor)?,
                attributes: attributes_of(&children),
            },
            CursorKind::Enum => DeclarationKind::Enum {
                enumerators: self.translate_enumerators(cursor, &symbol.entity, &children)?,
                attributes: attributes_of(&children),
            },
            CursorKind::Typedef => {
                let ty = cursor
                    .ty()
                    .ok_or_else(|| Error::unsupported(cursor, "typedef without a type"))?;
                DeclarationKind::Typedef {
                    ty: self.translate_type(cursor, ty, Some(name))?,
                }
            }
            other => {
                return Err(Error::mismatch(
                    cursor,
                    "top-level declaration",
                    other.describe(),
                ));
            }
        };
        let range = cursor.source_range().cloned();
        Ok(UnitDeclaration {
            name: name.to_string(),
            meta: Meta {
                presumed: range.as_ref().map(|range| range.begin.clone()),
                range,
                comment: cursor.comment().map(str::to_string),
            },
            storage: cursor.storage(),
            kind,
        })
    }

    fn translate_function(
        &mut self,
        cursor: &C,
        name: &str,
        children: &[C],
    ) -> Result<DeclarationKind, Error> {
        let cty = cursor
            .ty()
            .cloned()
            .ok_or_else(|| Error::unsupported(cursor, "function without a type"))?;
        let params: Vec<&C> = children
            .iter()
            .filter(|child| child.kind() == CursorKind::Parameter)
            .collect();
        let ty = self.translate_signature(cursor, &cty, &params, name)?;
        let body = match children
            .iter()
            .find(|child| child.kind() == CursorKind::CompoundStmt)
        {
            Some(body) => Some(self.scan_fragment(body)?),
            None => None,
        };
        Ok(DeclarationKind::Fun {
            inline: cursor.is_inline(),
            ty,
            is_definition: body.is_some(),
            body,
            attributes: attributes_of(children),
        })
    }

    /// Translates the type of a function declaration, naming parameters after the parameter
    /// declarations. Unprototyped definitions take their parameter types from those
    /// declarations too.
    fn translate_signature(
        &mut self,
        cursor: &C,
        cty: &CType,
        params: &[&C],
        name: &str,
    ) -> Result<FunctionType, Error> {
        let mut current = cty.clone();
        let (result, prototype, variadic) = loop {
            let next = match current.desugar() {
                CType::FunctionProto {
                    result,
                    params,
                    variadic,
                } => break ((**result).clone(), Some(params.clone()), *variadic),
                CType::FunctionNoProto { result } => break ((**result).clone(), None, false),
                CType::Typedef {
                    name,
                    decl: Some(decl),
                } => {
                    let target = cursor
                        .resolve(*decl)
                        .ok_or_else(|| Error::unresolved(cursor, name.clone()))?;
                    target
                        .ty()
                        .cloned()
                        .ok_or_else(|| Error::unresolved(cursor, name.clone()))?
                }
                other => {
                    return Err(Error::mismatch(cursor, "function type", format!("{other:?}")));
                }
            };
            current = next;
        };

        let ret = self.translate_type(cursor, &result, Some(name))?;
        let param_types = match prototype {
            Some(types) => types,
            None => params
                .iter()
                .map(|param| {
                    param
                        .ty()
                        .cloned()
                        .ok_or_else(|| Error::unsupported(*param, "parameter without a type"))
                })
                .collect::<Result<_, _>>()?,
        };
        let mut translated = Vec::with_capacity(param_types.len());
        for (i, param_type) in param_types.iter().enumerate() {
            let param_name = params.get(i).and_then(|param| name_of(*param));
            let site = params.get(i).copied().unwrap_or(cursor);
            let hint = param_name.as_deref().or(Some(name));
            translated.push(Param {
                ty: self.translate_type(site, param_type, hint)?,
                name: param_name,
            });
        }
        Ok(FunctionType {
            ret: Box::new(ret),
            params: translated,
            variadic,
        })
    }

    fn translate_variable(
        &mut self,
        cursor: &C,
        name: &str,
        children: &[C],
    ) -> Result<DeclarationKind, Error> {
        let cty = cursor
            .ty()
            .cloned()
            .ok_or_else(|| Error::unsupported(cursor, "variable without a type"))?;
        let ty = self.translate_type(cursor, &cty, Some(name))?;
        let is_definition = cursor.is_definition();
        let rhs = if is_definition {
            self.initializer(cursor, name, &ty, children)?
        } else {
            None
        };
        Ok(DeclarationKind::Var {
            ty,
            rhs,
            is_definition,
            attributes: attributes_of(children),
        })
    }

    /// The initializer among the children of a variable definition. An array may carry more
    /// than one expression child, in which case the last one is the initializer proper.
    fn initializer(
        &mut self,
        cursor: &C,
        name: &str,
        ty: &Type,
        children: &[C],
    ) -> Result<Option<Fragment>, Error> {
        let expressions: Vec<&C> = children
            .iter()
            .filter(|child| matches!(child.kind(), CursorKind::Expression | CursorKind::DeclRef))
            .collect();
        let chosen = match expressions.as_slice() {
            [] => return Ok(None),
            [only] => *only,
            [.., last] if ty.is_array() => *last,
            _ => {
                return Err(Error::MalformedInitializer {
                    name: name.to_string(),
                    expressions: expressions.len(),
                    location: location_of(cursor),
                });
            }
        };
        self.scan_fragment(chosen).map(Some)
    }

    /// Fields of a struct or union definition; `None` for a forward declaration.
    fn translate_record(&mut self, cursor: &C) -> Result<Option<Vec<Field>>, Error> {
        if !cursor.is_definition() {
            return Ok(None);
        }
        self.translate_fields(cursor).map(Some)
    }

    fn translate_fields(&mut self, record: &C) -> Result<Vec<Field>, Error> {
        let mut fields = vec![];
        for child in record.children() {
            match child.kind() {
                CursorKind::Field => fields.push(self.translate_field(&child)?),
                CursorKind::Struct | CursorKind::Union | CursorKind::Enum => {
                    // Named nested tags have file scope; anonymous ones are reached through the
                    // field that uses them.
                    if name_of(&child).is_some() {
                        self.elaborate(&child, None)?;
                    }
                }
                CursorKind::Attribute => {}
                other => trace!(
                    "Ignoring {} in record at {}",
                    other.describe(),
                    location_of(&child)
                ),
            }
        }
        Ok(fields)
    }

    fn translate_field(&mut self, field: &C) -> Result<Field, Error> {
        let cty = field
            .ty()
            .cloned()
            .ok_or_else(|| Error::unsupported(field, "field without a type"))?;
        let name = name_of(field);
        if name.is_none()
            && field.bit_width().is_none()
            && let Some(record) = self.anonymous_record(field, &cty)
        {
            let kind = match record.kind() {
                CursorKind::Union => RecordKind::Union,
                _ => RecordKind::Struct,
            };
            return Ok(Field::AnonymousRecord {
                kind,
                fields: self.translate_fields(&record)?,
                attributes: attributes_of(&record.children()),
            });
        }
        Ok(Field::Leaf {
            ty: self.translate_type(field, &cty, name.as_deref())?,
            name,
            bit_width: field.bit_width(),
        })
    }

    /// The declaration of `cty` if it is an anonymous struct or union.
    fn anonymous_record(&self, site: &C, cty: &CType) -> Option<C> {
        let CType::Record { decl } = cty.desugar() else {
            return None;
        };
        let record = site.resolve(*decl)?;
        let is_record = matches!(record.kind(), CursorKind::Struct | CursorKind::Union);
        (is_record && name_of(&record).is_none()).then_some(record)
    }

    fn translate_enumerators(
        &mut self,
        cursor: &C,
        owner: &Tlid,
        children: &[C],
    ) -> Result<Option<Vec<Enumerator>>, Error> {
        if !cursor.is_definition() {
            return Ok(None);
        }
        children
            .iter()
            .filter(|child| child.kind() == CursorKind::EnumConstant)
            .map(|constant| {
                let value = constant
                    .enum_value()
                    .ok_or_else(|| Error::unsupported(constant, "enumerator without a value"))?;
                Ok(Enumerator {
                    name: constant.spelling(),
                    value,
                    owner: owner.clone(),
                })
            })
            .collect::<Result<_, _>>()
            .map(Some)
    }

    /// Scans a function body or initializer, elaborating the file-scope entities declared or
    /// named inside it.
    pub(crate) fn scan_fragment(&mut self, root: &C) -> Result<Fragment, Error> {
        let mut uses = BTreeSet::new();
        self.scan(root, &mut uses)?;
        Ok(Fragment {
            range: root.source_range().cloned(),
            uses,
        })
    }

    fn scan(&mut self, node: &C, uses: &mut BTreeSet<Tlid>) -> Result<(), Error> {
        match node.kind() {
            CursorKind::Function | CursorKind::Typedef => {
                uses.insert(self.elaborate(node, None)?.entity);
            }
            CursorKind::Struct | CursorKind::Union | CursorKind::Enum => {
                if name_of(node).is_some() {
                    uses.insert(self.elaborate(node, None)?.entity);
                }
            }
            CursorKind::Variable => match node.storage() {
                Storage::Static | Storage::Extern => {
                    uses.insert(self.elaborate(node, None)?.entity);
                }
                Storage::Default | Storage::Auto | Storage::Register => {
                    self.record_type(node, name_of(node).as_deref(), uses)?;
                    self.scan_children(node, uses)?;
                }
            },
            CursorKind::DeclRef => {
                if let Some(target) = node.referenced() {
                    self.record_reference(&target, uses)?;
                }
                self.record_type(node, None, uses)?;
            }
            CursorKind::Expression | CursorKind::Statement | CursorKind::Unknown => {
                self.record_type(node, None, uses)?;
                self.scan_children(node, uses)?;
            }
            CursorKind::CompoundStmt | CursorKind::DeclStmt => self.scan_children(node, uses)?,
            CursorKind::TranslationUnit
            | CursorKind::EnumConstant
            | CursorKind::Field
            | CursorKind::Parameter
            | CursorKind::Attribute => {}
        }
        Ok(())
    }

    fn scan_children(&mut self, node: &C, uses: &mut BTreeSet<Tlid>) -> Result<(), Error> {
        for child in node.children() {
            self.scan(&child, uses)?;
        }
        Ok(())
    }

    fn record_type(
        &mut self,
        node: &C,
        hint: Option<&str>,
        uses: &mut BTreeSet<Tlid>,
    ) -> Result<(), Error> {
        if let Some(cty) = node.ty().cloned() {
            self.translate_type(node, &cty, hint)?.references(uses);
        }
        Ok(())
    }

    /// Records the entity a reference expression names, if it lives at file scope.
    fn record_reference(&mut self, target: &C, uses: &mut BTreeSet<Tlid>) -> Result<(), Error> {
        let entity = match target.kind() {
            CursorKind::Function => Some(self.elaborate(target, None)?),
            CursorKind::Variable if is_file_scope(target) => Some(self.elaborate(target, None)?),
            CursorKind::EnumConstant => match target.parent() {
                Some(owner) => Some(self.elaborate(&owner, None)?),
                None => return Err(Error::unresolved(target, target.spelling())),
            },
            _ => None,
        };
        uses.extend(entity.map(|symbol| symbol.entity));
        Ok(())
    }
}

/// Whether a variable has static storage duration at file scope: declared at the top level, or
/// declared `static` or `extern` inside a function.
fn is_file_scope<C: Cursor>(variable: &C) -> bool {
    matches!(variable.storage(), Storage::Static | Storage::Extern)
        || variable
            .parent()
            .is_none_or(|parent| parent.kind() == CursorKind::TranslationUnit)
}
