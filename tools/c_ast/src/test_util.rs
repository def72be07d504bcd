//! Builds cursor dumps in memory, for tests of the crates that consume them.
//!
//! Every node gets a fresh id and a one-line source range. Lines are handed out in construction
//! order, so a node built before another also ends before it, the way a nested definition ends
//! before its container.

use crate::{CType, Clang, DeclRef, TagKind};
use clang_ast::{Id, Node};
use cslice_ir::{Attribute, SourceLocation, SourceRange};
use std::cell::{Cell, RefCell};

pub struct TreeBuilder {
    main_file: String,
    file: RefCell<String>,
    next_id: Cell<u64>,
    next_line: Cell<u32>,
}

/// Front-end name of a node kind, as it appears in a dump.
pub fn kind_name(kind: &Clang) -> &'static str {
    match kind {
        Clang::TranslationUnitDecl { .. } => "TranslationUnitDecl",
        Clang::TypedefDecl { .. } => "TypedefDecl",
        Clang::FunctionDecl { .. } => "FunctionDecl",
        Clang::ParmVarDecl { .. } => "ParmVarDecl",
        Clang::RecordDecl { .. } => "RecordDecl",
        Clang::FieldDecl { .. } => "FieldDecl",
        Clang::EnumDecl { .. } => "EnumDecl",
        Clang::EnumConstantDecl { .. } => "EnumConstantDecl",
        Clang::VarDecl { .. } => "VarDecl",
        Clang::CompoundStmt { .. } => "CompoundStmt",
        Clang::DeclStmt { .. } => "DeclStmt",
        Clang::DeclRefExpr { .. } => "DeclRefExpr",
        Clang::PackedAttr {} => "PackedAttr",
        Clang::AlignedAttr { .. } => "AlignedAttr",
        Clang::WeakAttr {} => "WeakAttr",
        Clang::Other { .. } => "Other",
    }
}

fn declared_type(kind: &Clang) -> Option<CType> {
    match kind {
        Clang::TypedefDecl { qtype, .. }
        | Clang::FunctionDecl { qtype, .. }
        | Clang::ParmVarDecl { qtype, .. }
        | Clang::FieldDecl { qtype, .. }
        | Clang::VarDecl { qtype, .. } => Some(qtype.clone()),
        _ => None,
    }
}

fn declared_name(kind: &Clang) -> Option<String> {
    match kind {
        Clang::TypedefDecl { name, .. }
        | Clang::FunctionDecl { name, .. }
        | Clang::EnumConstantDecl { name, .. }
        | Clang::VarDecl { name, .. } => Some(name.clone()),
        Clang::ParmVarDecl { name, .. }
        | Clang::RecordDecl { name, .. }
        | Clang::FieldDecl { name, .. }
        | Clang::EnumDecl { name, .. } => name.clone(),
        _ => None,
    }
}

impl TreeBuilder {
    pub fn new(main_file: &str) -> TreeBuilder {
        TreeBuilder {
            main_file: main_file.to_string(),
            file: RefCell::new(main_file.to_string()),
            next_id: Cell::new(1),
            next_line: Cell::new(1),
        }
    }

    /// Nodes built from now on are located in `file`.
    pub fn set_file(&self, file: &str) {
        *self.file.borrow_mut() = file.to_string();
    }

    /// A fresh node id, for nodes that must be referenced before they are built.
    pub fn reserve(&self) -> Id {
        let n = self.next_id.get();
        self.next_id.set(n + 1);
        serde_json::from_value(serde_json::Value::String(format!("0x{n:x}")))
            .expect("hex strings are valid node ids")
    }

    fn range(&self) -> Option<SourceRange> {
        let line = self.next_line.get();
        self.next_line.set(line + 1);
        let location = SourceLocation {
            file: self.file.borrow().clone(),
            line,
            column: 1,
        };
        Some(SourceRange {
            begin: location.clone(),
            end: location,
        })
    }

    fn node(&self, id: Id, kind: Clang, inner: Vec<Node<Clang>>) -> Node<Clang> {
        Node { id, kind, inner }
    }

    pub fn unit(&self, children: Vec<Node<Clang>>) -> Node<Clang> {
        let kind = Clang::TranslationUnitDecl {
            main_file: Some(self.main_file.clone()),
        };
        self.node(self.reserve(), kind, children)
    }

    /// A struct or union. `fields` is `None` for a forward declaration.
    pub fn record(
        &self,
        tag: TagKind,
        name: Option<&str>,
        fields: Option<Vec<Node<Clang>>>,
    ) -> Node<Clang> {
        self.record_at(self.reserve(), tag, name, fields)
    }

    /// [TreeBuilder::record] with an id from [TreeBuilder::reserve], for self-referential types.
    pub fn record_at(
        &self,
        id: Id,
        tag: TagKind,
        name: Option<&str>,
        fields: Option<Vec<Node<Clang>>>,
    ) -> Node<Clang> {
        let kind = Clang::RecordDecl {
            range: self.range(),
            name: name.map(str::to_string),
            tag_used: tag,
            complete_definition: fields.is_some(),
            comment: None,
        };
        self.node(id, kind, fields.unwrap_or_default())
    }

    pub fn field(&self, name: &str, ty: CType) -> Node<Clang> {
        self.bit_field(Some(name), ty, None)
    }

    pub fn unnamed_field(&self, ty: CType) -> Node<Clang> {
        self.bit_field(None, ty, None)
    }

    pub fn bit_field(&self, name: Option<&str>, ty: CType, width: Option<u32>) -> Node<Clang> {
        let kind = Clang::FieldDecl {
            range: self.range(),
            name: name.map(str::to_string),
            qtype: ty,
            bit_width: width,
        };
        self.node(self.reserve(), kind, vec![])
    }

    /// A complete enum with the given constants, which become its children.
    pub fn enumeration(&self, name: Option<&str>, constants: &[(&str, i64)]) -> Node<Clang> {
        let id = self.reserve();
        let constants = constants
            .iter()
            .map(|(name, value)| {
                let kind = Clang::EnumConstantDecl {
                    range: self.range(),
                    name: name.to_string(),
                    value: Some(*value),
                };
                self.node(self.reserve(), kind, vec![])
            })
            .collect();
        let kind = Clang::EnumDecl {
            range: self.range(),
            name: name.map(str::to_string),
            complete_definition: true,
            comment: None,
        };
        self.node(id, kind, constants)
    }

    pub fn typedef(&self, name: &str, ty: CType) -> Node<Clang> {
        let kind = Clang::TypedefDecl {
            range: self.range(),
            name: name.to_string(),
            qtype: ty,
            is_implicit: false,
            comment: None,
        };
        self.node(self.reserve(), kind, vec![])
    }

    /// A typedef the front end synthesized, such as `__builtin_va_list`.
    pub fn implicit_typedef(&self, name: &str, ty: CType) -> Node<Clang> {
        let kind = Clang::TypedefDecl {
            range: None,
            name: name.to_string(),
            qtype: ty,
            is_implicit: true,
            comment: None,
        };
        self.node(self.reserve(), kind, vec![])
    }

    /// A function with a prototype built from `result` and `params`. Nodes in `body` follow the
    /// parameters; a [TreeBuilder::compound] among them makes this a definition.
    pub fn function(
        &self,
        name: &str,
        storage: Option<&str>,
        result: CType,
        params: &[(&str, CType)],
        body: Option<Vec<Node<Clang>>>,
    ) -> Node<Clang> {
        let ty = CType::function(
            result,
            params.iter().map(|(_, ty)| ty.clone()).collect(),
            false,
        );
        self.function_typed(name, storage, ty, params, body)
    }

    /// [TreeBuilder::function] with an explicit function type, e.g. a variadic or unprototyped
    /// one.
    pub fn function_typed(
        &self,
        name: &str,
        storage: Option<&str>,
        ty: CType,
        params: &[(&str, CType)],
        body: Option<Vec<Node<Clang>>>,
    ) -> Node<Clang> {
        let mut inner: Vec<_> = params
            .iter()
            .map(|(name, ty)| {
                let kind = Clang::ParmVarDecl {
                    range: self.range(),
                    name: (!name.is_empty()).then(|| name.to_string()),
                    qtype: ty.clone(),
                };
                self.node(self.reserve(), kind, vec![])
            })
            .collect();
        inner.extend(body.unwrap_or_default());
        let kind = Clang::FunctionDecl {
            range: self.range(),
            name: name.to_string(),
            qtype: ty,
            storage_class: storage.map(str::to_string),
            inline: false,
            is_implicit: false,
            comment: None,
        };
        self.node(self.reserve(), kind, inner)
    }

    /// A variable; `children` holds its initializer and attributes.
    pub fn var(
        &self,
        name: &str,
        storage: Option<&str>,
        ty: CType,
        is_definition: bool,
        children: Vec<Node<Clang>>,
    ) -> Node<Clang> {
        let kind = Clang::VarDecl {
            range: self.range(),
            name: name.to_string(),
            qtype: ty,
            storage_class: storage.map(str::to_string),
            is_definition,
            comment: None,
        };
        self.node(self.reserve(), kind, children)
    }

    pub fn compound(&self, children: Vec<Node<Clang>>) -> Node<Clang> {
        let kind = Clang::CompoundStmt {
            range: self.range(),
        };
        self.node(self.reserve(), kind, children)
    }

    pub fn decl_stmt(&self, children: Vec<Node<Clang>>) -> Node<Clang> {
        let kind = Clang::DeclStmt {
            range: self.range(),
        };
        self.node(self.reserve(), kind, children)
    }

    /// A reference to the declaration `target`.
    pub fn decl_ref(&self, target: &Node<Clang>) -> Node<Clang> {
        let kind = Clang::DeclRefExpr {
            range: self.range(),
            qtype: declared_type(&target.kind).or(Some(CType::int())),
            referenced_decl: Some(DeclRef {
                id: target.id,
                kind: Some(kind_name(&target.kind).to_string()),
                name: declared_name(&target.kind),
            }),
        };
        self.node(self.reserve(), kind, vec![])
    }

    /// Any other node, named by its front-end kind (`CallExpr`, `ReturnStmt`, ...).
    pub fn expr(&self, kind: &str, ty: Option<CType>, children: Vec<Node<Clang>>) -> Node<Clang> {
        let kind = Clang::Other {
            kind: Some(kind.to_string()),
            range: self.range(),
            qtype: ty,
        };
        self.node(self.reserve(), kind, children)
    }

    pub fn attr(&self, attribute: Attribute) -> Node<Clang> {
        let kind = match attribute {
            Attribute::Packed => Clang::PackedAttr {},
            Attribute::Weak => Clang::WeakAttr {},
            Attribute::Aligned(alignment) => Clang::AlignedAttr {
                alignment: Some(alignment),
            },
            other => Clang::Other {
                kind: Some(format!("{other:?}Attr")),
                range: None,
                qtype: None,
            },
        };
        self.node(self.reserve(), kind, vec![])
    }

    /// Attaches a documentation comment to a declaration.
    pub fn with_comment(&self, mut node: Node<Clang>, text: &str) -> Node<Clang> {
        match &mut node.kind {
            Clang::TypedefDecl { comment, .. }
            | Clang::FunctionDecl { comment, .. }
            | Clang::RecordDecl { comment, .. }
            | Clang::EnumDecl { comment, .. }
            | Clang::VarDecl { comment, .. } => *comment = Some(text.to_string()),
            _ => {}
        }
        node
    }
}
