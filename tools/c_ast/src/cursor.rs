//! The capabilities the elaborator needs from a syntax tree, and their implementation over a
//! [Clang] cursor dump.

use crate::{CType, Clang, TagKind};
use clang_ast::Node;
use cslice_ir::{Attribute, SourceRange, Storage};
use std::collections::HashMap;

/// Stable identity of a syntax node for the lifetime of a walk.
pub type CursorHash = clang_ast::Id;

/// The syntactic categories the elaborator distinguishes. Matches over this enum are exhaustive,
/// so a new category cannot be silently ignored.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CursorKind {
    TranslationUnit,
    Struct,
    Union,
    Enum,
    EnumConstant,
    Field,
    Typedef,
    Function,
    Parameter,
    Variable,
    CompoundStmt,
    DeclStmt,
    DeclRef,
    Attribute,
    Expression,
    Statement,
    Unknown,
}

impl CursorKind {
    pub fn describe(self) -> &'static str {
        match self {
            CursorKind::TranslationUnit => "translation unit",
            CursorKind::Struct => "struct declaration",
            CursorKind::Union => "union declaration",
            CursorKind::Enum => "enum declaration",
            CursorKind::EnumConstant => "enumerator",
            CursorKind::Field => "field declaration",
            CursorKind::Typedef => "typedef declaration",
            CursorKind::Function => "function declaration",
            CursorKind::Parameter => "parameter declaration",
            CursorKind::Variable => "variable declaration",
            CursorKind::CompoundStmt => "compound statement",
            CursorKind::DeclStmt => "declaration statement",
            CursorKind::DeclRef => "declaration reference",
            CursorKind::Attribute => "attribute",
            CursorKind::Expression => "expression",
            CursorKind::Statement => "statement",
            CursorKind::Unknown => "unknown node",
        }
    }
}

/// A node of an external C syntax tree.
///
/// Implementations are cheap handles into a tree that outlives them. Every query answers from
/// the node itself except [Cursor::parent], [Cursor::referenced] and [Cursor::resolve], which
/// navigate the tree.
pub trait Cursor: Clone {
    fn id(&self) -> CursorHash;
    fn kind(&self) -> CursorKind;
    /// Immediate children, in source order.
    fn children(&self) -> Vec<Self>;
    /// The declared name; empty or a front-end placeholder for anonymous entities.
    fn spelling(&self) -> String;
    /// Declared type of a declaration, underlying type of a typedef, type of an expression.
    fn ty(&self) -> Option<&CType>;
    fn source_range(&self) -> Option<&SourceRange>;
    fn is_definition(&self) -> bool;
    fn storage(&self) -> Storage;
    fn is_inline(&self) -> bool;
    /// Declarations the front end synthesized without source, such as builtin typedefs.
    fn is_implicit(&self) -> bool;
    fn comment(&self) -> Option<&str>;
    fn bit_width(&self) -> Option<u32>;
    fn enum_value(&self) -> Option<i64>;
    /// The attribute an attribute node carries.
    fn attribute(&self) -> Option<Attribute>;
    /// The declaration a reference expression names.
    fn referenced(&self) -> Option<Self>;
    fn parent(&self) -> Option<Self>;
    /// Looks up any node of the same tree by identity.
    fn resolve(&self, id: CursorHash) -> Option<Self>;
}

/// Identity and parent lookup for every node of a cursor dump.
pub struct CursorIndex<'a> {
    root: &'a Node<Clang>,
    nodes: HashMap<CursorHash, &'a Node<Clang>>,
    parents: HashMap<CursorHash, CursorHash>,
}

impl<'a> CursorIndex<'a> {
    pub fn new(root: &'a Node<Clang>) -> CursorIndex<'a> {
        let mut index = CursorIndex {
            root,
            nodes: HashMap::new(),
            parents: HashMap::new(),
        };
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            index.nodes.insert(node.id, node);
            for child in &node.inner {
                index.parents.insert(child.id, node.id);
                stack.push(child);
            }
        }
        index
    }

    pub fn root(&self) -> ClangCursor<'_> {
        ClangCursor {
            index: self,
            node: self.root,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A [Cursor] over a node of a [CursorIndex].
#[derive(Clone, Copy)]
pub struct ClangCursor<'a> {
    index: &'a CursorIndex<'a>,
    node: &'a Node<Clang>,
}

impl<'a> ClangCursor<'a> {
    pub fn node(&self) -> &'a Node<Clang> {
        self.node
    }

    fn at(&self, node: &'a Node<Clang>) -> ClangCursor<'a> {
        ClangCursor {
            index: self.index,
            node,
        }
    }
}

impl std::fmt::Debug for ClangCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} {:?}", self.node.id, self.kind())
    }
}

fn storage_from(storage_class: Option<&str>) -> Storage {
    match storage_class {
        Some("extern") => Storage::Extern,
        Some("static") => Storage::Static,
        Some("auto") => Storage::Auto,
        Some("register") => Storage::Register,
        _ => Storage::Default,
    }
}

fn kind_from_name(kind: &str) -> CursorKind {
    if kind.ends_with("Expr") || kind.ends_with("Literal") || kind.ends_with("Operator") {
        CursorKind::Expression
    } else if kind.ends_with("Stmt") {
        CursorKind::Statement
    } else if kind.ends_with("Attr") {
        CursorKind::Attribute
    } else {
        CursorKind::Unknown
    }
}

impl<'a> Cursor for ClangCursor<'a> {
    fn id(&self) -> CursorHash {
        self.node.id
    }

    fn kind(&self) -> CursorKind {
        match &self.node.kind {
            Clang::TranslationUnitDecl { .. } => CursorKind::TranslationUnit,
            Clang::TypedefDecl { .. } => CursorKind::Typedef,
            Clang::FunctionDecl { .. } => CursorKind::Function,
            Clang::ParmVarDecl { .. } => CursorKind::Parameter,
            Clang::RecordDecl {
                tag_used: TagKind::Struct,
                ..
            } => CursorKind::Struct,
            Clang::RecordDecl {
                tag_used: TagKind::Union,
                ..
            } => CursorKind::Union,
            Clang::FieldDecl { .. } => CursorKind::Field,
            Clang::EnumDecl { .. } => CursorKind::Enum,
            Clang::EnumConstantDecl { .. } => CursorKind::EnumConstant,
            Clang::VarDecl { .. } => CursorKind::Variable,
            Clang::CompoundStmt { .. } => CursorKind::CompoundStmt,
            Clang::DeclStmt { .. } => CursorKind::DeclStmt,
            Clang::DeclRefExpr { .. } => CursorKind::DeclRef,
            Clang::PackedAttr {} | Clang::AlignedAttr { .. } | Clang::WeakAttr {} => {
                CursorKind::Attribute
            }
            Clang::Other { kind, .. } => kind
                .as_deref()
                .map_or(CursorKind::Unknown, kind_from_name),
        }
    }

    fn children(&self) -> Vec<Self> {
        self.node.inner.iter().map(|child| self.at(child)).collect()
    }

    fn spelling(&self) -> String {
        match &self.node.kind {
            Clang::TypedefDecl { name, .. }
            | Clang::FunctionDecl { name, .. }
            | Clang::EnumConstantDecl { name, .. }
            | Clang::VarDecl { name, .. } => name.clone(),
            Clang::ParmVarDecl { name, .. }
            | Clang::RecordDecl { name, .. }
            | Clang::FieldDecl { name, .. }
            | Clang::EnumDecl { name, .. } => name.clone().unwrap_or_default(),
            Clang::DeclRefExpr {
                referenced_decl: Some(decl),
                ..
            } => decl.name.clone().unwrap_or_default(),
            _ => String::new(),
        }
    }

    fn ty(&self) -> Option<&CType> {
        match &self.node.kind {
            Clang::TypedefDecl { qtype, .. }
            | Clang::FunctionDecl { qtype, .. }
            | Clang::ParmVarDecl { qtype, .. }
            | Clang::FieldDecl { qtype, .. }
            | Clang::VarDecl { qtype, .. } => Some(qtype),
            Clang::DeclRefExpr { qtype, .. } | Clang::Other { qtype, .. } => qtype.as_ref(),
            _ => None,
        }
    }

    fn source_range(&self) -> Option<&SourceRange> {
        match &self.node.kind {
            Clang::TypedefDecl { range, .. }
            | Clang::FunctionDecl { range, .. }
            | Clang::ParmVarDecl { range, .. }
            | Clang::RecordDecl { range, .. }
            | Clang::FieldDecl { range, .. }
            | Clang::EnumDecl { range, .. }
            | Clang::EnumConstantDecl { range, .. }
            | Clang::VarDecl { range, .. }
            | Clang::CompoundStmt { range }
            | Clang::DeclStmt { range }
            | Clang::DeclRefExpr { range, .. }
            | Clang::Other { range, .. } => range.as_ref(),
            Clang::TranslationUnitDecl { .. }
            | Clang::PackedAttr {}
            | Clang::AlignedAttr { .. }
            | Clang::WeakAttr {} => None,
        }
    }

    fn is_definition(&self) -> bool {
        match &self.node.kind {
            Clang::FunctionDecl { .. } => self
                .node
                .inner
                .iter()
                .any(|child| matches!(child.kind, Clang::CompoundStmt { .. })),
            Clang::RecordDecl {
                complete_definition,
                ..
            }
            | Clang::EnumDecl {
                complete_definition,
                ..
            } => *complete_definition,
            Clang::VarDecl { is_definition, .. } => *is_definition,
            Clang::TypedefDecl { .. } => true,
            _ => false,
        }
    }

    fn storage(&self) -> Storage {
        match &self.node.kind {
            Clang::FunctionDecl { storage_class, .. } | Clang::VarDecl { storage_class, .. } => {
                storage_from(storage_class.as_deref())
            }
            _ => Storage::Default,
        }
    }

    fn is_inline(&self) -> bool {
        matches!(self.node.kind, Clang::FunctionDecl { inline: true, .. })
    }

    fn is_implicit(&self) -> bool {
        matches!(
            self.node.kind,
            Clang::TypedefDecl {
                is_implicit: true,
                ..
            } | Clang::FunctionDecl {
                is_implicit: true,
                ..
            }
        )
    }

    fn comment(&self) -> Option<&str> {
        match &self.node.kind {
            Clang::TypedefDecl { comment, .. }
            | Clang::FunctionDecl { comment, .. }
            | Clang::RecordDecl { comment, .. }
            | Clang::EnumDecl { comment, .. }
            | Clang::VarDecl { comment, .. } => comment.as_deref(),
            _ => None,
        }
    }

    fn bit_width(&self) -> Option<u32> {
        match self.node.kind {
            Clang::FieldDecl { bit_width, .. } => bit_width,
            _ => None,
        }
    }

    fn enum_value(&self) -> Option<i64> {
        match self.node.kind {
            Clang::EnumConstantDecl { value, .. } => value,
            _ => None,
        }
    }

    fn attribute(&self) -> Option<Attribute> {
        match self.node.kind {
            Clang::PackedAttr {} => Some(Attribute::Packed),
            Clang::WeakAttr {} => Some(Attribute::Weak),
            Clang::AlignedAttr {
                alignment: Some(alignment),
            } => Some(Attribute::Aligned(alignment)),
            _ => None,
        }
    }

    fn referenced(&self) -> Option<Self> {
        match &self.node.kind {
            Clang::DeclRefExpr {
                referenced_decl: Some(decl),
                ..
            } => self.resolve(decl.id),
            _ => None,
        }
    }

    fn parent(&self) -> Option<Self> {
        let parent = self.index.parents.get(&self.node.id)?;
        self.resolve(*parent)
    }

    fn resolve(&self, id: CursorHash) -> Option<Self> {
        self.index.nodes.get(&id).map(|node| self.at(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::TreeBuilder;

    #[test]
    fn navigates_parents_and_references() {
        let b = TreeBuilder::new("refs.c");
        let g = b.function("g", None, CType::int(), &[], None);
        let call = b.decl_ref(&g);
        let f = b.function(
            "f",
            None,
            CType::void(),
            &[],
            Some(vec![b.compound(vec![call])]),
        );
        let (g_id, f_id) = (g.id, f.id);
        let root = b.unit(vec![g, f]);
        let index = CursorIndex::new(&root);
        let unit = index.root();

        let f = unit.resolve(f_id).unwrap();
        assert_eq!(f.kind(), CursorKind::Function);
        assert!(f.is_definition());
        let children = f.children();
        let body = &children[0];
        assert_eq!(body.kind(), CursorKind::CompoundStmt);
        let statements = body.children();
        let call = &statements[0];
        assert_eq!(call.kind(), CursorKind::DeclRef);
        assert_eq!(call.referenced().unwrap().id(), g_id);
        assert_eq!(call.parent().unwrap().id(), body.id());
        assert_eq!(f.parent().unwrap().kind(), CursorKind::TranslationUnit);
        assert!(!unit.resolve(g_id).unwrap().is_definition());
    }

    #[test]
    fn classifies_other_nodes_by_name() {
        assert_eq!(kind_from_name("CallExpr"), CursorKind::Expression);
        assert_eq!(kind_from_name("IntegerLiteral"), CursorKind::Expression);
        assert_eq!(kind_from_name("ReturnStmt"), CursorKind::Statement);
        assert_eq!(kind_from_name("BinaryOperator"), CursorKind::Expression);
        assert_eq!(kind_from_name("NoThrowAttr"), CursorKind::Attribute);
        assert_eq!(kind_from_name("StaticAssertDecl"), CursorKind::Unknown);
    }

    #[test]
    fn reads_storage_classes() {
        let b = TreeBuilder::new("storage.c");
        let x = b.var("x", Some("static"), CType::int(), true, vec![]);
        let y = b.var("y", Some("extern"), CType::int(), false, vec![]);
        let root = b.unit(vec![x, y]);
        let index = CursorIndex::new(&root);
        let children = index.root().children();
        assert_eq!(children[0].storage(), Storage::Static);
        assert_eq!(children[1].storage(), Storage::Extern);
        assert!(children[0].is_definition());
        assert!(!children[1].is_definition());
    }
}
