/*
 *  Data structures for the cslice declaration model.
 *
 *  Conventions:
 *  - Code that builds these structures lives in the elaborator; code
 *    that only queries them lives in `support`.
 *  - Tag types (struct/union/enum) and typedef names are references
 *    by `Tlid`, never inline copies. C lets a definition appear
 *    wherever a type is expected; the elaborator hoists those
 *    definitions so that this model never has to.
 *  - Members of an unnamed struct/union that is itself an unnamed
 *    member are the exception: they are spliced into the parent as an
 *    `AnonymousRecord` field and never become top-level entities.
 */

pub mod support;

use crate::symbol::{Tlid, Tuid};
use cslice_core::{Representation, write_json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// A position in a source file, as reported by the front end.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct SourceRange {
    pub begin: SourceLocation,
    pub end: SourceLocation,
}

/// Where a declaration came from.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Meta {
    pub range: Option<SourceRange>,
    /// Location after `#line` directives have been applied.
    pub presumed: Option<SourceLocation>,
    pub comment: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Storage {
    #[default]
    Default,
    Extern,
    Static,
    Auto,
    Register,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum IKind {
    Bool,
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Int128,
    UInt128,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum FKind {
    Half,
    Float,
    Double,
    LongDouble,
    Float128,
}

/// Attributes that can decorate a type or a declaration.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Const,
    Volatile,
    Restrict,
    Aligned(u64),
    Packed,
    Weak,
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Type {
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub attributes: BTreeSet<Attribute>,
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum TypeKind {
    Void,
    Int(IKind),
    Float(FKind),
    Pointer(Box<Type>),
    /// Element type and, for constant-size arrays, the element count.
    Array(Box<Type>, Option<u64>),
    Function(FunctionType),
    Typedef(Tlid),
    Struct(Tlid),
    Union(Tlid),
    Enum(Tlid),
    Atomic(Box<Type>),
    VaList,
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct FunctionType {
    pub ret: Box<Type>,
    pub params: Vec<Param>,
    pub variadic: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Param {
    pub name: Option<String>,
    pub ty: Type,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum RecordKind {
    Struct,
    Union,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Field {
    Leaf {
        /// `None` for unnamed bit-fields.
        name: Option<String>,
        ty: Type,
        bit_width: Option<u32>,
    },
    /// The members of an unnamed struct/union used as an unnamed member, visible directly
    /// through the parent.
    AnonymousRecord {
        kind: RecordKind,
        fields: Vec<Field>,
        attributes: BTreeSet<Attribute>,
    },
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Enumerator {
    pub name: String,
    pub value: i64,
    /// The enum this constant belongs to.
    pub owner: Tlid,
}

/// Handle to a function body or an initializer. The text itself stays with the front end and is
/// recovered from `range`; `uses` records every top-level entity the fragment names.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Fragment {
    pub range: Option<SourceRange>,
    pub uses: BTreeSet<Tlid>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct UnitDeclaration {
    pub name: String,
    pub meta: Meta,
    pub storage: Storage,
    pub kind: DeclarationKind,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum DeclarationKind {
    Var {
        ty: Type,
        rhs: Option<Fragment>,
        is_definition: bool,
        attributes: BTreeSet<Attribute>,
    },
    Fun {
        inline: bool,
        ty: FunctionType,
        body: Option<Fragment>,
        is_definition: bool,
        attributes: BTreeSet<Attribute>,
    },
    /// `fields` is `None` for a forward declaration and `Some(vec![])` for an empty definition.
    Struct {
        fields: Option<Vec<Field>>,
        attributes: BTreeSet<Attribute>,
    },
    Union {
        fields: Option<Vec<Field>>,
        attributes: BTreeSet<Attribute>,
    },
    Enum {
        enumerators: Option<Vec<Enumerator>>,
        attributes: BTreeSet<Attribute>,
    },
    Typedef {
        ty: Type,
    },
}

/// All the declarations of one translation unit, in an order a single-pass consumer can follow.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TranslationUnit {
    pub id: Tuid,
    pub declarations: Vec<UnitDeclaration>,
}

impl TranslationUnit {
    pub fn new(id: Tuid, declarations: Vec<UnitDeclaration>) -> TranslationUnit {
        TranslationUnit { id, declarations }
    }
}

impl fmt::Display for TranslationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "translation unit {} ({} declarations)",
            self.id,
            self.declarations.len()
        )
    }
}

impl Representation for TranslationUnit {
    fn name(&self) -> &'static str {
        "translation_unit"
    }

    fn materialize(&self, path: &Path) -> std::io::Result<()> {
        write_json(self, path)
    }
}

/*
 *
 *  Constructors
 *
 */

impl Type {
    pub fn new(kind: TypeKind) -> Type {
        Type {
            kind,
            attributes: BTreeSet::new(),
        }
    }

    pub fn void() -> Type {
        Type::new(TypeKind::Void)
    }

    pub fn int(kind: IKind) -> Type {
        Type::new(TypeKind::Int(kind))
    }

    pub fn pointer(to: Type) -> Type {
        Type::new(TypeKind::Pointer(Box::new(to)))
    }

    pub fn with(mut self, attribute: Attribute) -> Type {
        self.attributes.insert(attribute);
        self
    }
}

impl UnitDeclaration {
    pub fn new<N: Into<String>>(name: N, storage: Storage, kind: DeclarationKind) -> Self {
        Self {
            name: name.into(),
            meta: Meta::default(),
            storage,
            kind,
        }
    }
}
