//! Which top-level entities need which others, within a translation unit.
//!
//! An edge `a -> b` means the declaration of `a` names `b`: as a member, parameter, return or
//! variable type, as a typedef target, or from a function body or initializer. References through
//! pointers count, so the graph over-approximates what a slice strictly needs.

use cslice_core::{Representation, write_json};
use cslice_ir::{Symbol, Tlid, TranslationUnit, Tuid, UnitDeclaration};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// Directed graph over symbols. Every symbol is a key, even those without dependencies.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DependencyGraph {
    edges: BTreeMap<Symbol, BTreeSet<Symbol>>,
}

impl DependencyGraph {
    pub fn new() -> DependencyGraph {
        DependencyGraph::default()
    }

    /// Adds `symbol` as a node without edges, if it is not already present.
    pub fn insert(&mut self, symbol: Symbol) {
        self.edges.entry(symbol).or_default();
    }

    pub fn add_edge(&mut self, from: Symbol, to: Symbol) {
        self.insert(to.clone());
        self.edges.entry(from).or_default().insert(to);
    }

    /// Direct dependencies of `symbol`; `None` if it is not in the graph.
    pub fn dependencies(&self, symbol: &Symbol) -> Option<&BTreeSet<Symbol>> {
        self.edges.get(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.edges.keys()
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.edges.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&Symbol, &Symbol)> {
        self.edges
            .iter()
            .flat_map(|(from, to)| to.iter().map(move |to| (from, to)))
    }

    /// Union of both graphs, merging the edge sets of shared symbols.
    pub fn combine(mut self, other: DependencyGraph) -> DependencyGraph {
        for (symbol, dependencies) in other.edges {
            self.edges.entry(symbol).or_default().extend(dependencies);
        }
        self
    }

    /// The subgraph induced by everything reachable from `roots`. Roots that are not in the graph
    /// are kept as isolated nodes.
    pub fn reachable_from<'a, I>(&self, roots: I) -> DependencyGraph
    where
        I: IntoIterator<Item = &'a Symbol>,
    {
        let mut reachable = DependencyGraph::new();
        let mut queue: VecDeque<&Symbol> = VecDeque::new();
        for root in roots {
            if !self.contains(root) {
                warn!("{root} is not in the dependency graph");
            }
            if !reachable.contains(root) {
                reachable.insert(root.clone());
                queue.push_back(root);
            }
        }
        while let Some(symbol) = queue.pop_front() {
            for dependency in self.dependencies(symbol).into_iter().flatten() {
                if !reachable.contains(dependency) {
                    queue.push_back(dependency);
                }
                reachable.add_edge(symbol.clone(), dependency.clone());
            }
        }
        reachable
    }
}

impl Serialize for DependencyGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.edges.len()))?;
        for (symbol, dependencies) in &self.edges {
            let dependencies: Vec<String> = dependencies.iter().map(Symbol::to_string).collect();
            map.serialize_entry(&symbol.to_string(), &dependencies)?;
        }
        map.end()
    }
}

impl fmt::Display for DependencyGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (symbol, dependencies) in &self.edges {
            write!(f, "{symbol}:")?;
            for dependency in dependencies {
                write!(f, " {}", dependency.entity)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// The symbols `declaration` directly refers to, other than its own.
pub fn dependencies_of(unit: &TranslationUnit, declaration: &UnitDeclaration) -> BTreeSet<Symbol> {
    declaration
        .references()
        .iter()
        .map(|tlid| unit.symbol_for(tlid))
        .collect()
}

/// One node per entity of `unit`, with the dependencies of the declaration that defines it (or,
/// for entities never defined here, of their first declaration).
pub fn dependency_graph(unit: &TranslationUnit) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for tlid in unit.tlids() {
        let symbol = unit.symbol_for(&tlid);
        graph.insert(symbol.clone());
        if let Some(declaration) = unit.authoritative(&tlid) {
            for dependency in dependencies_of(unit, declaration) {
                graph.add_edge(symbol.clone(), dependency);
            }
        }
    }
    debug!("{} has {} entities", unit.id, graph.len());
    graph
}

/// The part of a translation unit needed by a set of root entities.
#[derive(Debug, Serialize)]
pub struct Slice {
    pub unit: Tuid,
    pub roots: Vec<Symbol>,
    pub graph: DependencyGraph,
    /// Declarations of every reachable entity, in unit order: for each, its authoritative
    /// declaration and the forward declarations that precede uses of it.
    pub declarations: Vec<UnitDeclaration>,
}

/// Extracts from `unit` the declarations `roots` transitively depend on.
pub fn slice(unit: &TranslationUnit, roots: &[Tlid]) -> Slice {
    let roots: Vec<Symbol> = roots.iter().map(|tlid| unit.symbol_for(tlid)).collect();
    let graph = dependency_graph(unit).reachable_from(&roots);
    let declarations = unit
        .declarations
        .iter()
        .filter(|declaration| {
            let tlid = declaration.tlid();
            graph.contains(&unit.symbol_for(&tlid))
                && (!declaration.is_definition()
                    || unit
                        .authoritative(&tlid)
                        .is_some_and(|chosen| std::ptr::eq(chosen, *declaration)))
        })
        .cloned()
        .collect();
    Slice {
        unit: unit.id.clone(),
        roots,
        graph,
        declarations,
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slice of {} from {} root(s): {} declarations",
            self.unit,
            self.roots.len(),
            self.declarations.len()
        )
    }
}

impl Representation for Slice {
    fn name(&self) -> &'static str {
        "slice"
    }

    fn materialize(&self, path: &Path) -> std::io::Result<()> {
        write_json(self, path)
    }
}

#[cfg(test)]
mod tests;
