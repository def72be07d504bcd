//! Translation of front-end types into the declaration model.

use crate::Elaborator;
use crate::error::Error;
use c_ast::{CType, Cursor, CursorHash};
use cslice_ir::{Attribute, EntityKind, FunctionType, Param, Symbol, Type, TypeKind};

const VA_LIST: &str = "__builtin_va_list";

impl<C: Cursor> Elaborator<C> {
    /// Translates `cty`, met at `site`, elaborating every tag and typedef it refers to.
    /// Anonymous tags are named after `hint`.
    pub(crate) fn translate_type(
        &mut self,
        site: &C,
        cty: &CType,
        hint: Option<&str>,
    ) -> Result<Type, Error> {
        let ty = match cty {
            CType::Void => Type::void(),
            CType::Int { ikind } => Type::int(*ikind),
            CType::Float { fkind } => Type::new(TypeKind::Float(*fkind)),
            CType::Pointer { pointee } => Type::pointer(self.translate_type(site, pointee, hint)?),
            CType::ConstantArray { element, size } => Type::new(TypeKind::Array(
                Box::new(self.translate_type(site, element, hint)?),
                Some(*size),
            )),
            CType::IncompleteArray { element } | CType::VariableArray { element } => Type::new(
                TypeKind::Array(Box::new(self.translate_type(site, element, hint)?), None),
            ),
            CType::FunctionProto {
                result,
                params,
                variadic,
            } => {
                let ret = self.translate_type(site, result, hint)?;
                let params = params
                    .iter()
                    .map(|param| {
                        Ok(Param {
                            name: None,
                            ty: self.translate_type(site, param, hint)?,
                        })
                    })
                    .collect::<Result<_, Error>>()?;
                Type::new(TypeKind::Function(FunctionType {
                    ret: Box::new(ret),
                    params,
                    variadic: *variadic,
                }))
            }
            CType::FunctionNoProto { result } => Type::new(TypeKind::Function(FunctionType {
                ret: Box::new(self.translate_type(site, result, hint)?),
                params: vec![],
                variadic: false,
            })),
            CType::Typedef { name, .. } if name == VA_LIST => Type::new(TypeKind::VaList),
            CType::Typedef { name, decl } => {
                let decl = decl.ok_or_else(|| Error::unresolved(site, name.clone()))?;
                let symbol = self.elaborate_reference(site, decl, name, hint)?;
                Type::new(TypeKind::Typedef(symbol.entity))
            }
            CType::Elaborated { named } => self.translate_type(site, named, hint)?,
            CType::Record { decl } => {
                let symbol = self.elaborate_reference(site, *decl, "record", hint)?;
                match symbol.entity.kind() {
                    EntityKind::Struct => Type::new(TypeKind::Struct(symbol.entity)),
                    EntityKind::Union => Type::new(TypeKind::Union(symbol.entity)),
                    other => {
                        return Err(Error::mismatch(site, "struct or union", other.describe()));
                    }
                }
            }
            CType::Enum { decl } => {
                let symbol = self.elaborate_reference(site, *decl, "enum", hint)?;
                match symbol.entity.kind() {
                    EntityKind::Enum => Type::new(TypeKind::Enum(symbol.entity)),
                    other => return Err(Error::mismatch(site, "enum", other.describe())),
                }
            }
            CType::Qualified { qualifiers, of } => {
                let mut ty = self.translate_type(site, of, hint)?;
                if qualifiers.is_const {
                    ty.attributes.insert(Attribute::Const);
                }
                if qualifiers.is_volatile {
                    ty.attributes.insert(Attribute::Volatile);
                }
                if qualifiers.is_restrict {
                    ty.attributes.insert(Attribute::Restrict);
                }
                ty
            }
            CType::Attributed {
                attribute,
                modified,
            } => self
                .translate_type(site, modified, hint)?
                .with(attribute.clone()),
            CType::Atomic { value } if self.options.atomics => Type::new(TypeKind::Atomic(
                Box::new(self.translate_type(site, value, hint)?),
            )),
            CType::Atomic { .. } => return Err(Error::unsupported(site, "_Atomic type")),
            CType::Complex { .. } => return Err(Error::unsupported(site, "_Complex type")),
            CType::Unexposed {
                spelling,
                canonical,
            } => match canonical.as_deref() {
                Some(canonical) if !matches!(canonical, CType::Unexposed { .. }) => {
                    self.translate_type(site, canonical, hint)?
                }
                _ => {
                    return Err(Error::unsupported(
                        site,
                        format!("unexposed type `{spelling}`"),
                    ));
                }
            },
        };
        Ok(ty)
    }

    fn elaborate_reference(
        &mut self,
        site: &C,
        decl: CursorHash,
        reference: &str,
        hint: Option<&str>,
    ) -> Result<Symbol, Error> {
        let target = site
            .resolve(decl)
            .ok_or_else(|| Error::unresolved(site, reference))?;
        self.elaborate(&target, hint)
    }
}
