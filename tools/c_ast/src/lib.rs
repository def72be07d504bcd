//! The cursor dump cslice consumes: a clang-style JSON AST of one translation unit, read through
//! `clang_ast`, with structured types attached to every declaration and expression.
//!
//! The dump is produced by an external front end. Only the subset of node kinds that the
//! elaborator inspects are given their own variants; every other node lands in [Clang::Other]
//! with its kind name and, for expressions, its type.

mod cursor;
#[cfg(any(test, feature = "test-util"))]
pub mod test_util;

pub use cursor::{ClangCursor, Cursor, CursorHash, CursorIndex, CursorKind};

use clang_ast::Node;
use cslice_ir::{Attribute, FKind, IKind, SourceRange};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Represents a node of the cursor dump.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Clang {
    TranslationUnitDecl {
        /// Resolved path of the main source file.
        #[serde(rename = "mainFile")]
        main_file: Option<String>,
    },
    TypedefDecl {
        range: Option<SourceRange>,
        name: String,
        /// The underlying type.
        #[serde(rename = "type")]
        qtype: CType,
        #[serde(rename = "isImplicit", default)]
        is_implicit: bool,
        comment: Option<String>,
    },
    FunctionDecl {
        range: Option<SourceRange>,
        name: String,
        #[serde(rename = "type")]
        qtype: CType,
        #[serde(rename = "storageClass")]
        storage_class: Option<String>,
        #[serde(default)]
        inline: bool,
        #[serde(rename = "isImplicit", default)]
        is_implicit: bool,
        comment: Option<String>,
    },
    ParmVarDecl {
        range: Option<SourceRange>,
        name: Option<String>,
        #[serde(rename = "type")]
        qtype: CType,
    },
    /// Represents a struct or union declaration.
    RecordDecl {
        range: Option<SourceRange>,
        name: Option<String>,
        #[serde(rename = "tagUsed")]
        tag_used: TagKind,
        #[serde(rename = "completeDefinition", default)]
        complete_definition: bool,
        comment: Option<String>,
    },
    FieldDecl {
        range: Option<SourceRange>,
        name: Option<String>,
        #[serde(rename = "type")]
        qtype: CType,
        #[serde(rename = "bitWidth")]
        bit_width: Option<u32>,
    },
    EnumDecl {
        range: Option<SourceRange>,
        name: Option<String>,
        #[serde(rename = "completeDefinition", default)]
        complete_definition: bool,
        comment: Option<String>,
    },
    EnumConstantDecl {
        range: Option<SourceRange>,
        name: String,
        value: Option<i64>,
    },
    VarDecl {
        range: Option<SourceRange>,
        name: String,
        #[serde(rename = "type")]
        qtype: CType,
        #[serde(rename = "storageClass")]
        storage_class: Option<String>,
        #[serde(rename = "isDefinition", default)]
        is_definition: bool,
        comment: Option<String>,
    },
    CompoundStmt {
        range: Option<SourceRange>,
    },
    DeclStmt {
        range: Option<SourceRange>,
    },
    DeclRefExpr {
        range: Option<SourceRange>,
        #[serde(rename = "type")]
        qtype: Option<CType>,
        #[serde(rename = "referencedDecl")]
        referenced_decl: Option<DeclRef>,
    },
    PackedAttr {},
    AlignedAttr {
        alignment: Option<u64>,
    },
    WeakAttr {},
    /// Every other node: statements, the remaining expressions, unhandled declarations.
    Other {
        kind: Option<String>,
        range: Option<SourceRange>,
        #[serde(rename = "type")]
        qtype: Option<CType>,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Struct,
    Union,
}

/// The declaration a `DeclRefExpr` names.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DeclRef {
    pub id: clang_ast::Id,
    pub kind: Option<String>,
    pub name: Option<String>,
}

/// A type as the front end reports it, before elaboration. Declarations are referenced by the id
/// of their node, never inlined.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "class")]
pub enum CType {
    Void,
    Int {
        ikind: IKind,
    },
    Float {
        fkind: FKind,
    },
    Pointer {
        pointee: Box<CType>,
    },
    ConstantArray {
        element: Box<CType>,
        size: u64,
    },
    IncompleteArray {
        element: Box<CType>,
    },
    VariableArray {
        element: Box<CType>,
    },
    FunctionProto {
        result: Box<CType>,
        params: Vec<CType>,
        #[serde(default)]
        variadic: bool,
    },
    FunctionNoProto {
        result: Box<CType>,
    },
    /// A typedef name. `decl` is absent for builtin typedefs such as `__builtin_va_list`.
    Typedef {
        name: String,
        decl: Option<clang_ast::Id>,
    },
    /// A type written with its tag keyword (`struct S`), wrapping the tag type itself.
    Elaborated {
        named: Box<CType>,
    },
    Record {
        decl: clang_ast::Id,
    },
    Enum {
        decl: clang_ast::Id,
    },
    Qualified {
        #[serde(default)]
        qualifiers: Qualifiers,
        of: Box<CType>,
    },
    Attributed {
        attribute: Attribute,
        modified: Box<CType>,
    },
    Atomic {
        value: Box<CType>,
    },
    Complex {
        element: Box<CType>,
    },
    /// A type the front end could not classify syntactically, e.g. `typeof(expr)`.
    Unexposed {
        spelling: String,
        canonical: Option<Box<CType>>,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Qualifiers {
    #[serde(rename = "const", default)]
    pub is_const: bool,
    #[serde(rename = "volatile", default)]
    pub is_volatile: bool,
    #[serde(rename = "restrict", default)]
    pub is_restrict: bool,
}

impl CType {
    pub fn void() -> CType {
        CType::Void
    }

    pub fn int() -> CType {
        CType::integer(IKind::Int)
    }

    pub fn integer(ikind: IKind) -> CType {
        CType::Int { ikind }
    }

    pub fn pointer(pointee: CType) -> CType {
        CType::Pointer {
            pointee: Box::new(pointee),
        }
    }

    pub fn array(element: CType, size: u64) -> CType {
        CType::ConstantArray {
            element: Box::new(element),
            size,
        }
    }

    pub fn function(result: CType, params: Vec<CType>, variadic: bool) -> CType {
        CType::FunctionProto {
            result: Box::new(result),
            params,
            variadic,
        }
    }

    /// `struct S` / `union U`, referencing the declaration node `decl`.
    pub fn record(decl: clang_ast::Id) -> CType {
        CType::Elaborated {
            named: Box::new(CType::Record { decl }),
        }
    }

    pub fn enumeration(decl: clang_ast::Id) -> CType {
        CType::Elaborated {
            named: Box::new(CType::Enum { decl }),
        }
    }

    pub fn typedef<N: Into<String>>(name: N, decl: clang_ast::Id) -> CType {
        CType::Typedef {
            name: name.into(),
            decl: Some(decl),
        }
    }

    pub fn constant(of: CType) -> CType {
        CType::Qualified {
            qualifiers: Qualifiers {
                is_const: true,
                ..Qualifiers::default()
            },
            of: Box::new(of),
        }
    }

    /// Strips sugar that does not change which declaration a type refers to.
    pub fn desugar(&self) -> &CType {
        match self {
            CType::Elaborated { named } => named.desugar(),
            CType::Qualified { of, .. } => of.desugar(),
            CType::Attributed { modified, .. } => modified.desugar(),
            other => other,
        }
    }
}

/// One parsed translation unit.
#[derive(Debug)]
pub struct ClangAst {
    /// The file the dump was read from.
    pub source: PathBuf,
    pub root: Node<Clang>,
}

impl ClangAst {
    /// Reads a cursor dump from a JSON file.
    pub fn load(path: &Path) -> Result<ClangAst, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let ast = ClangAst::from_reader(path.to_path_buf(), BufReader::new(file))?;
        info!("Loaded {}", path.display());
        Ok(ast)
    }

    pub fn from_reader<R: Read>(source: PathBuf, reader: R) -> Result<ClangAst, LoadError> {
        let root: Node<Clang> =
            serde_json::from_reader(reader).map_err(|error| LoadError::Json {
                path: source.clone(),
                source: error,
            })?;
        if !matches!(root.kind, Clang::TranslationUnitDecl { .. }) {
            return Err(LoadError::NotATranslationUnit { path: source });
        }
        Ok(ClangAst { source, root })
    }

    /// The resolved main source path of the unit, falling back to the dump's own path when the
    /// front end did not record one.
    pub fn main_file(&self) -> PathBuf {
        match &self.root.kind {
            Clang::TranslationUnitDecl {
                main_file: Some(main_file),
            } => PathBuf::from(main_file),
            _ => self.source.clone(),
        }
    }

    pub fn index(&self) -> CursorIndex<'_> {
        CursorIndex::new(&self.root)
    }
}

impl std::fmt::Display for ClangAst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "C AST for {}", self.source.display())
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path} is not a valid cursor dump: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("the root of {path} is not a TranslationUnitDecl")]
    NotATranslationUnit { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"{
        "id": "0x1",
        "kind": "TranslationUnitDecl",
        "mainFile": "/src/list.c",
        "inner": [
            {
                "id": "0x2",
                "kind": "RecordDecl",
                "name": "list",
                "tagUsed": "struct",
                "completeDefinition": true,
                "inner": [
                    {
                        "id": "0x3",
                        "kind": "FieldDecl",
                        "name": "next",
                        "type": {
                            "class": "Pointer",
                            "pointee": {
                                "class": "Elaborated",
                                "named": { "class": "Record", "decl": "0x2" }
                            }
                        }
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn reads_a_cursor_dump() {
        let ast = ClangAst::from_reader("list.json".into(), DUMP.as_bytes()).unwrap();
        assert_eq!(ast.main_file(), PathBuf::from("/src/list.c"));
        assert_eq!(ast.root.inner.len(), 1);
        let record = &ast.root.inner[0];
        assert!(matches!(
            &record.kind,
            Clang::RecordDecl { name: Some(name), tag_used: TagKind::Struct, .. } if name == "list"
        ));
        let Clang::FieldDecl { qtype, .. } = &record.inner[0].kind else {
            panic!("expected a field, found {:?}", record.inner[0].kind);
        };
        assert_eq!(qtype.desugar(), &CType::pointer(CType::record(record.id)));
    }

    #[test]
    fn rejects_a_dump_without_a_translation_unit() {
        let dump = r#"{ "id": "0x1", "kind": "CompoundStmt" }"#;
        let error = ClangAst::from_reader("stmt.json".into(), dump.as_bytes()).unwrap_err();
        assert!(matches!(error, LoadError::NotATranslationUnit { .. }));
    }

    #[test]
    fn desugar_looks_through_qualifiers() {
        let ty = CType::constant(CType::Attributed {
            attribute: Attribute::Aligned(8),
            modified: Box::new(CType::int()),
        });
        assert_eq!(ty.desugar(), &CType::int());
    }
}
