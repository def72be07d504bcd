//! Structural queries over the declaration model. Nothing in here builds or changes declarations.

use super::*;
use crate::symbol::{EntityKind, Symbol};

impl Type {
    /// Adds every entity this type names to `out`: typedef names and tags, looking through
    /// pointers, arrays, function signatures and `_Atomic`.
    pub fn references(&self, out: &mut BTreeSet<Tlid>) {
        match &self.kind {
            TypeKind::Void
            | TypeKind::Int(_)
            | TypeKind::Float(_)
            | TypeKind::VaList => {}
            TypeKind::Pointer(inner) | TypeKind::Array(inner, _) | TypeKind::Atomic(inner) => {
                inner.references(out)
            }
            TypeKind::Function(signature) => signature.references(out),
            TypeKind::Typedef(tlid)
            | TypeKind::Struct(tlid)
            | TypeKind::Union(tlid)
            | TypeKind::Enum(tlid) => {
                out.insert(tlid.clone());
            }
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array(..))
    }
}

impl FunctionType {
    pub fn references(&self, out: &mut BTreeSet<Tlid>) {
        self.ret.references(out);
        for param in &self.params {
            param.ty.references(out);
        }
    }
}

impl Field {
    pub fn references(&self, out: &mut BTreeSet<Tlid>) {
        match self {
            Field::Leaf { ty, .. } => ty.references(out),
            Field::AnonymousRecord { fields, .. } => {
                fields.iter().for_each(|field| field.references(out))
            }
        }
    }

    /// Names this field makes accessible on its parent. An anonymous record contributes the
    /// names of its members.
    pub fn member_names(&self) -> Vec<&str> {
        match self {
            Field::Leaf { name, .. } => name.as_deref().into_iter().collect(),
            Field::AnonymousRecord { fields, .. } => {
                fields.iter().flat_map(Field::member_names).collect()
            }
        }
    }
}

impl UnitDeclaration {
    /// The kind of this particular declaration. Unlike [UnitDeclaration::tlid], this
    /// distinguishes a function's prototype from its definition.
    pub fn entity_kind(&self) -> EntityKind {
        match &self.kind {
            DeclarationKind::Var { .. } => EntityKind::Variable,
            DeclarationKind::Fun {
                is_definition: true,
                ..
            } => EntityKind::FunctionDefinition,
            DeclarationKind::Fun { .. } => EntityKind::FunctionDeclaration,
            DeclarationKind::Struct { .. } => EntityKind::Struct,
            DeclarationKind::Union { .. } => EntityKind::Union,
            DeclarationKind::Enum { .. } => EntityKind::Enum,
            DeclarationKind::Typedef { .. } => EntityKind::Typedef,
        }
    }

    pub fn tlid(&self) -> Tlid {
        Tlid::new(self.name.clone(), self.entity_kind())
    }

    /// Whether this declaration completes its entity: a function with a body, a variable
    /// definition, a tag with a member list, or any typedef.
    pub fn is_definition(&self) -> bool {
        match &self.kind {
            DeclarationKind::Var { is_definition, .. }
            | DeclarationKind::Fun { is_definition, .. } => *is_definition,
            DeclarationKind::Struct { fields, .. } | DeclarationKind::Union { fields, .. } => {
                fields.is_some()
            }
            DeclarationKind::Enum { enumerators, .. } => enumerators.is_some(),
            DeclarationKind::Typedef { .. } => true,
        }
    }

    pub fn attributes(&self) -> Option<&BTreeSet<Attribute>> {
        match &self.kind {
            DeclarationKind::Var { attributes, .. }
            | DeclarationKind::Fun { attributes, .. }
            | DeclarationKind::Struct { attributes, .. }
            | DeclarationKind::Union { attributes, .. }
            | DeclarationKind::Enum { attributes, .. } => Some(attributes),
            DeclarationKind::Typedef { .. } => None,
        }
    }

    /// A definition that is not marked `weak`.
    pub fn is_strong_definition(&self) -> bool {
        self.is_definition()
            && !self
                .attributes()
                .is_some_and(|attributes| attributes.contains(&Attribute::Weak))
    }

    /// Every entity this declaration names: types of members, parameters, return values,
    /// variables and typedef targets, plus whatever its body or initializer uses. The
    /// declaration's own identity is not included.
    pub fn references(&self) -> BTreeSet<Tlid> {
        let mut out = BTreeSet::new();
        match &self.kind {
            DeclarationKind::Var { ty, rhs, .. } => {
                ty.references(&mut out);
                if let Some(rhs) = rhs {
                    out.extend(rhs.uses.iter().cloned());
                }
            }
            DeclarationKind::Fun { ty, body, .. } => {
                ty.references(&mut out);
                if let Some(body) = body {
                    out.extend(body.uses.iter().cloned());
                }
            }
            DeclarationKind::Struct { fields, .. } | DeclarationKind::Union { fields, .. } => {
                fields
                    .iter()
                    .flatten()
                    .for_each(|field| field.references(&mut out));
            }
            DeclarationKind::Enum { .. } => {}
            DeclarationKind::Typedef { ty } => ty.references(&mut out),
        }
        out.remove(&self.tlid());
        out
    }
}

impl TranslationUnit {
    /// All declarations of `tlid`, in unit order.
    pub fn declarations_for<'a>(
        &'a self,
        tlid: &Tlid,
    ) -> impl Iterator<Item = &'a UnitDeclaration> + use<'a> {
        let tlid = tlid.clone();
        self.declarations
            .iter()
            .filter(move |declaration| declaration.tlid() == tlid)
    }

    /// The definition downstream consumers should use for `tlid`: the first strong definition
    /// if there is one, otherwise the first (weak) definition. Forward declarations are never
    /// returned.
    pub fn definition_for(&self, tlid: &Tlid) -> Option<&UnitDeclaration> {
        let mut weak = None;
        for declaration in self.declarations_for(tlid) {
            if declaration.is_strong_definition() {
                return Some(declaration);
            }
            if weak.is_none() && declaration.is_definition() {
                weak = Some(declaration);
            }
        }
        weak
    }

    /// [TranslationUnit::definition_for], falling back to the first declaration when `tlid` is
    /// never defined in this unit.
    pub fn authoritative(&self, tlid: &Tlid) -> Option<&UnitDeclaration> {
        self.definition_for(tlid)
            .or_else(|| self.declarations_for(tlid).next())
    }

    pub fn symbol_for(&self, tlid: &Tlid) -> Symbol {
        Symbol::new(self.id.clone(), tlid.clone())
    }

    /// The distinct entities of this unit, in order of their first declaration.
    pub fn tlids(&self) -> Vec<Tlid> {
        let mut seen = BTreeSet::new();
        self.declarations
            .iter()
            .map(UnitDeclaration::tlid)
            .filter(|tlid| seen.insert(tlid.clone()))
            .collect()
    }

    /// Entities of any kind named `name`.
    pub fn tlids_named(&self, name: &str) -> Vec<Tlid> {
        self.tlids()
            .into_iter()
            .filter(|tlid| tlid.name() == name)
            .collect()
    }
}
