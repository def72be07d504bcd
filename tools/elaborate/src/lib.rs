//! Elaboration: turns the cursor tree of one translation unit into a flat, ordered list of
//! [UnitDeclaration]s, one entry per declaration of each top-level entity.
//!
//! C allows types to be defined wherever they are used, leaves some of them unnamed, and lets
//! function bodies declare entities that live at file scope. The [Elaborator] gives every such
//! entity a top-level identity ([Tlid]) the first time something refers to it, then translates
//! the entities on a worklist until nothing new is discovered.

mod error;
pub mod names;
mod translate;
mod types;


pub use error::Error;

use c_ast::{ClangAst, Cursor, CursorHash, CursorKind};
use cslice_ir::{EntityKind, Storage, Symbol, Tlid, TranslationUnit, Tuid, UnitDeclaration};
use error::location_of;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, trace};

/// Language features that are rejected unless enabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct Options {
    /// Translate `_Atomic` types instead of failing on them.
    pub atomics: bool,
}

/// Elaboration state for one translation unit.
pub struct Elaborator<C: Cursor> {
    unit: Tuid,
    options: Options,
    declaration_table: HashMap<CursorHash, UnitDeclaration>,
    elaborated: HashMap<CursorHash, Symbol>,
    /// The cursor that first took each identity. Later cursors with the same identity are
    /// further declarations of the same entity, except for the function-local ones of
    /// [local_scope].
    claims: HashMap<Tlid, Claim>,
    to_be_elaborated: VecDeque<C>,
    fresh_names: usize,
    /// Position of each top-level cursor among the children of the unit.
    top_level: HashMap<CursorHash, usize>,
    /// Translated cursors in translation order, with the position of their top-level ancestor.
    order: Vec<(CursorHash, Option<usize>)>,
}

#[derive(Clone, Copy, Debug)]
struct Claim {
    cursor: CursorHash,
    /// The function the claiming declaration is local to.
    function: Option<CursorHash>,
}

impl<C: Cursor> Elaborator<C> {
    pub fn new(unit: Tuid, options: Options) -> Elaborator<C> {
        Elaborator {
            unit,
            options,
            declaration_table: HashMap::new(),
            elaborated: HashMap::new(),
            claims: HashMap::new(),
            to_be_elaborated: VecDeque::new(),
            fresh_names: 0,
            top_level: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Returns the symbol of the entity `cursor` declares, allocating it and scheduling the
    /// cursor for translation on first sight. Anonymous tags are named after `hint`, the
    /// declaration that uses them.
    pub fn elaborate(&mut self, cursor: &C, hint: Option<&str>) -> Result<Symbol, Error> {
        if let Some(symbol) = self.elaborated.get(&cursor.id()) {
            return Ok(symbol.clone());
        }
        let kind = entity_kind(cursor)?;
        let spelling = cursor.spelling();
        let name = match names::normalize(&spelling) {
            "" => match kind {
                EntityKind::Struct | EntityKind::Union | EntityKind::Enum => {
                    let name = names::anonymous(hint, self.fresh_names);
                    self.fresh_names += 1;
                    name
                }
                EntityKind::Typedef
                | EntityKind::FunctionDeclaration
                | EntityKind::FunctionDefinition
                | EntityKind::Variable => return Err(invalid_identifier(cursor, &spelling, kind)),
            },
            name if names::is_identifier(name) => name.to_string(),
            _ => return Err(invalid_identifier(cursor, &spelling, kind)),
        };
        let function = local_scope(cursor);
        let tlid = match &function {
            Some(function) => self.local_identity(cursor, function, Tlid::new(name, kind)),
            None => Tlid::new(name, kind),
        };
        self.claims.entry(tlid.clone()).or_insert(Claim {
            cursor: cursor.id(),
            function: function.map(|function| function.id()),
        });
        let symbol = Symbol::new(self.unit.clone(), tlid);
        trace!("Elaborated {} at {}", symbol, location_of(cursor));
        self.elaborated.insert(cursor.id(), symbol.clone());
        self.to_be_elaborated.push_back(cursor.clone());
        Ok(symbol)
    }

    /// The identity of a declaration local to `function`. It keeps its plain name unless a
    /// different entity already claimed it, and is otherwise renamed `<function>__<name>`, with a
    /// counter appended while that is taken too.
    fn local_identity(&self, cursor: &C, function: &C, tlid: Tlid) -> Tlid {
        let kind = tlid.kind();
        let mut candidate = tlid.clone();
        let mut n = 0;
        while let Some(claim) = self.claims.get(&candidate)
            && !same_local_entity(claim, cursor, function)
        {
            let name = names::hoisted_local(&function.spelling(), tlid.name(), n);
            candidate = Tlid::new(name, kind);
            n += 1;
        }
        if candidate != tlid {
            debug!(
                "Renaming local {tlid} of {}() to {candidate}",
                function.spelling()
            );
        }
        candidate
    }

    /// Translates queued cursors until the queue is empty, returning the declarations produced.
    /// Translation may elaborate, and thus queue, further cursors.
    pub fn run_worklist(&mut self) -> Result<Vec<(CursorHash, UnitDeclaration)>, Error> {
        let mut produced = vec![];
        while let Some(cursor) = self.to_be_elaborated.pop_front() {
            let id = cursor.id();
            if self.declaration_table.contains_key(&id) {
                continue;
            }
            let symbol = self.elaborate(&cursor, None)?;
            let declaration = self.translate(&cursor, &symbol)?;
            trace!("Translated {} ({})", symbol, declaration.entity_kind().describe());
            let position = self.top_level_position(&cursor);
            self.order.push((id, position));
            self.declaration_table.insert(id, declaration.clone());
            produced.push((id, declaration));
        }
        Ok(produced)
    }

    /// Whether `cursor` has been given an identity.
    pub fn is_elaborated(&self, cursor: &C) -> bool {
        self.elaborated.contains_key(&cursor.id())
    }

    /// Records the document order of the unit's top-level declarations, which [Self::finish]
    /// sorts by.
    pub fn set_top_level<'a, I>(&mut self, cursors: I)
    where
        I: IntoIterator<Item = &'a C>,
        C: 'a,
    {
        self.top_level = cursors
            .into_iter()
            .enumerate()
            .map(|(position, cursor)| (cursor.id(), position))
            .collect();
    }

    fn top_level_position(&self, cursor: &C) -> Option<usize> {
        let mut current = Some(cursor.clone());
        while let Some(node) = current {
            if let Some(position) = self.top_level.get(&node.id()) {
                return Some(*position);
            }
            current = node.parent();
        }
        None
    }

    /// The translated declarations in the order of the unit: by the position of the top-level
    /// declaration they appear in, then by where they end, which puts nested definitions before
    /// their container. Headers count where they are included, not where their file was first
    /// seen. Declarations without a location come first, in translation order.
    pub fn finish(mut self) -> Vec<UnitDeclaration> {
        let mut declarations: Vec<_> = self
            .order
            .iter()
            .filter_map(|(id, position)| {
                self.declaration_table
                    .remove(id)
                    .map(|declaration| (*position, declaration))
            })
            .collect();
        declarations.sort_by_key(|(position, declaration)| {
            declaration
                .meta
                .range
                .as_ref()
                .map(|range| (*position, range.end.line, range.end.column))
        });
        declarations
            .into_iter()
            .map(|(_, declaration)| declaration)
            .collect()
    }
}

fn invalid_identifier<C: Cursor>(cursor: &C, spelling: &str, kind: EntityKind) -> Error {
    Error::InvalidIdentifier {
        spelling: spelling.to_string(),
        kind: kind.describe(),
        location: location_of(cursor),
    }
}

/// The kind of entity a declaration cursor introduces.
fn entity_kind<C: Cursor>(cursor: &C) -> Result<EntityKind, Error> {
    match cursor.kind() {
        CursorKind::Struct => Ok(EntityKind::Struct),
        CursorKind::Union => Ok(EntityKind::Union),
        CursorKind::Enum => Ok(EntityKind::Enum),
        CursorKind::Typedef => Ok(EntityKind::Typedef),
        CursorKind::Variable => Ok(EntityKind::Variable),
        CursorKind::Function if cursor.is_definition() => Ok(EntityKind::FunctionDefinition),
        CursorKind::Function => Ok(EntityKind::FunctionDeclaration),
        kind @ (CursorKind::TranslationUnit
        | CursorKind::EnumConstant
        | CursorKind::Field
        | CursorKind::Parameter
        | CursorKind::CompoundStmt
        | CursorKind::DeclStmt
        | CursorKind::DeclRef
        | CursorKind::Attribute
        | CursorKind::Expression
        | CursorKind::Statement
        | CursorKind::Unknown) => Err(Error::mismatch(
            cursor,
            "top-level declaration",
            kind.describe(),
        )),
    }
}

/// The function a hoisted declaration is local to: a `static` variable, tag or typedef declared
/// inside a function body. Local `extern` variables and function prototypes redeclare file-scope
/// entities and have no local scope.
fn local_scope<C: Cursor>(cursor: &C) -> Option<C> {
    match cursor.kind() {
        CursorKind::Variable if cursor.storage() == Storage::Static => {}
        CursorKind::Struct | CursorKind::Union | CursorKind::Enum | CursorKind::Typedef => {}
        _ => return None,
    }
    let mut current = cursor.parent();
    while let Some(node) = current {
        match node.kind() {
            CursorKind::Function => return Some(node),
            CursorKind::TranslationUnit => return None,
            _ => current = node.parent(),
        }
    }
    None
}

/// Whether `cursor`, local to `function`, declares the entity `claim` took the name for. A local
/// static is only ever declared once; a local tag may be declared again in the same function.
fn same_local_entity<C: Cursor>(claim: &Claim, cursor: &C, function: &C) -> bool {
    claim.cursor == cursor.id()
        || (cursor.kind() != CursorKind::Variable && claim.function == Some(function.id()))
}

/// Elaborates the translation unit rooted at `root`.
///
/// Every named top-level declaration is elaborated in document order. Anonymous top-level tags
/// are left to the declarations that use them, so that they are named after their user; the ones
/// nothing uses are elaborated without a hint at the end.
pub fn elaborate_unit<C: Cursor>(
    root: &C,
    unit: Tuid,
    options: Options,
) -> Result<TranslationUnit, Error> {
    if root.kind() != CursorKind::TranslationUnit {
        return Err(Error::mismatch(
            root,
            "translation unit",
            root.kind().describe(),
        ));
    }
    let mut elaborator = Elaborator::new(unit.clone(), options);
    let children = root.children();
    elaborator.set_top_level(&children);
    let mut deferred = vec![];
    for child in children {
        if child.is_implicit() {
            trace!("Skipping implicit {}", child.spelling());
            continue;
        }
        match child.kind() {
            CursorKind::Struct | CursorKind::Union | CursorKind::Enum
                if names::normalize(&child.spelling()).is_empty() =>
            {
                deferred.push(child)
            }
            CursorKind::Struct
            | CursorKind::Union
            | CursorKind::Enum
            | CursorKind::Typedef
            | CursorKind::Function
            | CursorKind::Variable => {
                elaborator.elaborate(&child, None)?;
            }
            other => debug!(
                "Skipping top-level {} at {}",
                other.describe(),
                location_of(&child)
            ),
        }
    }
    elaborator.run_worklist()?;
    for child in deferred {
        if !elaborator.is_elaborated(&child) {
            elaborator.elaborate(&child, None)?;
        }
    }
    elaborator.run_worklist()?;
    let declarations = elaborator.finish();
    info!("Elaborated {} declarations in {}", declarations.len(), unit);
    Ok(TranslationUnit::new(unit, declarations))
}

/// Elaborates a parsed cursor dump. The unit is identified by its main source file.
pub fn elaborate_clang_ast(ast: &ClangAst, options: Options) -> Result<TranslationUnit, Error> {
    let index = ast.index();
    elaborate_unit(&index.root(), Tuid::new(ast.main_file()), options)
}
