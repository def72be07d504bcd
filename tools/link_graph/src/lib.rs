//! Cross-unit linkage: which unit provides each function and variable another unit declares but
//! does not define.
//!
//! Resolution runs in two phases. The exports of every unit are first gathered into one index;
//! imports are then resolved against that index, which is read-only by then, in parallel.

use cslice_core::{Representation, write_json};
use cslice_ir::{
    DeclarationKind, EntityKind, Storage, Symbol, Tlid, TranslationUnit, Tuid, Type, TypeKind,
    UnitDeclaration,
};
use dependency_graph::DependencyGraph;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// What the linker sees of a function or variable declaration.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Prototype {
    pub symbol: Symbol,
    pub kind: EntityKind,
    pub ty: Type,
    pub storage: Storage,
    /// A definition marked `weak`, which yields to any other definition.
    pub weak: bool,
}

impl Prototype {
    pub fn of(unit: &TranslationUnit, declaration: &UnitDeclaration) -> Prototype {
        let ty = match &declaration.kind {
            DeclarationKind::Var { ty, .. } => ty.clone(),
            DeclarationKind::Fun { ty, .. } => Type::new(TypeKind::Function(ty.clone())),
            DeclarationKind::Struct { .. }
            | DeclarationKind::Union { .. }
            | DeclarationKind::Enum { .. }
            | DeclarationKind::Typedef { .. } => Type::void(),
        };
        Prototype {
            symbol: unit.symbol_for(&declaration.tlid()),
            kind: declaration.entity_kind(),
            ty,
            storage: declaration.storage,
            weak: declaration.is_definition() && !declaration.is_strong_definition(),
        }
    }
}

impl fmt::Display for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.kind.describe())
    }
}

/// The linkable surface of one unit. `static` entities have no part in it.
#[derive(Clone, Debug)]
pub struct UnitInterface {
    pub unit: Tuid,
    /// Entities this unit defines.
    pub exports: BTreeMap<Tlid, Prototype>,
    /// Entities this unit declares without defining them.
    pub imports: BTreeMap<Tlid, Prototype>,
}

pub fn object_interface(unit: &TranslationUnit) -> UnitInterface {
    let mut exports = BTreeMap::new();
    let mut imports = BTreeMap::new();
    for tlid in unit.tlids() {
        if !tlid.kind().is_value() {
            continue;
        }
        if unit
            .declarations_for(&tlid)
            .any(|declaration| declaration.storage == Storage::Static)
        {
            debug!("{tlid} has internal linkage in {}", unit.id);
            continue;
        }
        if let Some(definition) = unit.definition_for(&tlid) {
            exports.insert(tlid, Prototype::of(unit, definition));
        } else if let Some(declaration) = unit.declarations_for(&tlid).next() {
            imports.insert(tlid, Prototype::of(unit, declaration));
        }
    }
    UnitInterface {
        unit: unit.id.clone(),
        exports,
        imports,
    }
}

/// An import resolved to the definition it binds to.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Link {
    pub import: Symbol,
    pub export: Symbol,
}

/// Resolved links, keyed by importing unit.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LinkGraph {
    pub links: BTreeMap<Tuid, Vec<Link>>,
}

impl LinkGraph {
    pub fn links_from(&self, unit: &Tuid) -> &[Link] {
        self.links.get(unit).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every link as an edge from the importing symbol to the exporting one.
    pub fn external_dependency_graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for link in self.links.values().flatten() {
            graph.add_edge(link.import.clone(), link.export.clone());
        }
        graph
    }
}

/// An entity with a strong definition in more than one unit. No link is made to any of them.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct DuplicateDefinition {
    pub tlid: Tlid,
    pub definitions: Vec<Symbol>,
    /// Imports left unresolved because of the ambiguity.
    pub importers: Vec<Symbol>,
}

#[derive(Debug, Serialize)]
pub struct LinkReport {
    pub graph: LinkGraph,
    /// Imports no unit defines.
    pub missing: BTreeSet<Prototype>,
    pub duplicates: Vec<DuplicateDefinition>,
}

enum Resolution<'a> {
    Linked(Link),
    Missing(&'a Prototype),
    Ambiguous(&'a Prototype),
}

/// The definition an import binds to among the exports of every unit: the only strong one, or
/// the first weak one when none is strong. `None` when several are strong.
fn choose<'a>(candidates: &[&'a Prototype]) -> Option<&'a Prototype> {
    let mut strong = candidates.iter().filter(|export| !export.weak);
    match (strong.next(), strong.next()) {
        (Some(only), None) => Some(*only),
        (Some(_), Some(_)) => None,
        (None, _) => candidates.first().copied(),
    }
}

fn resolve<'a>(index: &BTreeMap<&Tlid, Vec<&Prototype>>, import: &'a Prototype) -> Resolution<'a> {
    match index.get(&import.symbol.entity) {
        None => Resolution::Missing(import),
        Some(candidates) => match choose(candidates) {
            Some(export) => Resolution::Linked(Link {
                import: import.symbol.clone(),
                export: export.symbol.clone(),
            }),
            None => Resolution::Ambiguous(import),
        },
    }
}

/// Links `units` against each other.
pub fn link_graph(units: &[TranslationUnit]) -> LinkReport {
    let interfaces: Vec<UnitInterface> = units.par_iter().map(object_interface).collect();

    let mut index: BTreeMap<&Tlid, Vec<&Prototype>> = BTreeMap::new();
    for interface in &interfaces {
        for (tlid, export) in &interface.exports {
            index.entry(tlid).or_default().push(export);
        }
    }
    let mut duplicates: BTreeMap<Tlid, DuplicateDefinition> = index
        .iter()
        .filter(|(_, candidates)| choose(candidates).is_none())
        .map(|(tlid, candidates)| {
            let definitions: Vec<Symbol> = candidates
                .iter()
                .map(|export| export.symbol.clone())
                .collect();
            warn!("{tlid} is defined in {} units", definitions.len());
            let duplicate = DuplicateDefinition {
                tlid: (*tlid).clone(),
                definitions,
                importers: vec![],
            };
            ((*tlid).clone(), duplicate)
        })
        .collect();

    let resolutions: Vec<Resolution> = interfaces
        .par_iter()
        .flat_map_iter(|interface| {
            interface
                .imports
                .values()
                .map(|import| resolve(&index, import))
        })
        .collect();

    let mut graph = LinkGraph::default();
    let mut missing = BTreeSet::new();
    for resolution in resolutions {
        match resolution {
            Resolution::Linked(link) => graph
                .links
                .entry(link.import.unit.clone())
                .or_default()
                .push(link),
            Resolution::Missing(import) => {
                debug!("No unit defines {import}");
                missing.insert(import.clone());
            }
            Resolution::Ambiguous(import) => {
                if let Some(duplicate) = duplicates.get_mut(&import.symbol.entity) {
                    duplicate.importers.push(import.symbol.clone());
                }
            }
        }
    }
    info!(
        "Linked {} units: {} links, {} missing, {} duplicate definitions",
        units.len(),
        graph.links.values().map(Vec::len).sum::<usize>(),
        missing.len(),
        duplicates.len()
    );
    LinkReport {
        graph,
        missing,
        duplicates: duplicates.into_values().collect(),
    }
}

impl fmt::Display for LinkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "link report")?;
        for (unit, links) in &self.graph.links {
            for link in links {
                writeln!(f, "  {unit}: {} -> {}", link.import.entity, link.export)?;
            }
        }
        for prototype in &self.missing {
            writeln!(f, "  missing: {prototype}")?;
        }
        for duplicate in &self.duplicates {
            writeln!(
                f,
                "  duplicate: {} defined {} times",
                duplicate.tlid,
                duplicate.definitions.len()
            )?;
        }
        Ok(())
    }
}

impl Representation for LinkReport {
    fn name(&self) -> &'static str {
        "link_report"
    }

    fn materialize(&self, path: &Path) -> std::io::Result<()> {
        write_json(self, path)
    }
}

#[cfg(test)]
mod tests;
