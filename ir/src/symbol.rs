//! Identities used as map keys everywhere above the declaration model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifies a translation unit by its resolved main source path.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Tuid(PathBuf);

impl Tuid {
    pub fn new<P: Into<PathBuf>>(path: P) -> Tuid {
        Tuid(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for Tuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// The kinds of top-level entity a C translation unit can contain.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum EntityKind {
    FunctionDeclaration,
    FunctionDefinition,
    Struct,
    Union,
    Enum,
    Typedef,
    Variable,
}

impl EntityKind {
    /// The namespace this kind of entity is named in. A function prototype and the definition
    /// that completes it name the same entity, so both function kinds share one namespace.
    pub fn namespace(self) -> EntityKind {
        match self {
            EntityKind::FunctionDefinition => EntityKind::FunctionDeclaration,
            kind => kind,
        }
    }

    pub fn is_function(self) -> bool {
        matches!(
            self,
            EntityKind::FunctionDeclaration | EntityKind::FunctionDefinition
        )
    }

    /// Functions and variables: the entities that have linkage.
    pub fn is_value(self) -> bool {
        self.is_function() || self == EntityKind::Variable
    }

    pub fn describe(self) -> &'static str {
        match self {
            EntityKind::FunctionDeclaration => "function declaration",
            EntityKind::FunctionDefinition => "function definition",
            EntityKind::Struct => "struct",
            EntityKind::Union => "union",
            EntityKind::Enum => "enum",
            EntityKind::Typedef => "typedef",
            EntityKind::Variable => "variable",
        }
    }
}

/// Name and kind of a top-level entity, unique within one translation unit. `struct Foo` and
/// `typedef Foo` are different entities; `int f();` and `int f() { ... }` are the same one.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Tlid {
    name: String,
    kind: EntityKind,
}

impl Tlid {
    pub fn new<N: Into<String>>(name: N, kind: EntityKind) -> Tlid {
        Tlid {
            name: name.into(),
            kind: kind.namespace(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The entity's namespace; for functions this is always
    /// [EntityKind::FunctionDeclaration].
    pub fn kind(&self) -> EntityKind {
        self.kind
    }
}

impl fmt::Display for Tlid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EntityKind::FunctionDeclaration | EntityKind::FunctionDefinition => {
                write!(f, "{}()", self.name)
            }
            EntityKind::Variable => f.write_str(&self.name),
            kind => write!(f, "{} {}", kind.describe(), self.name),
        }
    }
}

/// A top-level entity of a specific translation unit; unique across a whole program.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Symbol {
    pub unit: Tuid,
    pub entity: Tlid,
}

impl Symbol {
    pub fn new(unit: Tuid, entity: Tlid) -> Symbol {
        Symbol { unit, entity }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.unit, self.entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_kinds_share_a_namespace() {
        let declaration = Tlid::new("g", EntityKind::FunctionDeclaration);
        let definition = Tlid::new("g", EntityKind::FunctionDefinition);
        assert_eq!(declaration, definition);
        assert_eq!(definition.kind(), EntityKind::FunctionDeclaration);
    }

    #[test]
    fn tags_and_typedefs_are_distinct() {
        let tag = Tlid::new("Foo", EntityKind::Struct);
        let typedef = Tlid::new("Foo", EntityKind::Typedef);
        assert_ne!(tag, typedef);
        assert_eq!(tag.to_string(), "struct Foo");
        assert_eq!(typedef.to_string(), "typedef Foo");
    }

    #[test]
    fn symbols_are_scoped_by_unit() {
        let entity = Tlid::new("counter", EntityKind::Variable);
        let a = Symbol::new(Tuid::new("a.c"), entity.clone());
        let b = Symbol::new(Tuid::new("b.c"), entity);
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "a.c::counter");
    }
}
