use super::*;
use cslice_ir::{
    DeclarationKind, EntityKind, Field, Fragment, FunctionType, IKind, Param, Storage, Type,
    TypeKind,
};

fn structure(name: &str, fields: Option<Vec<(&str, Type)>>) -> UnitDeclaration {
    let fields = fields.map(|fields| {
        fields
            .into_iter()
            .map(|(name, ty)| Field::Leaf {
                name: Some(name.into()),
                ty,
                bit_width: None,
            })
            .collect()
    });
    UnitDeclaration::new(
        name,
        Storage::Default,
        DeclarationKind::Struct {
            fields,
            attributes: BTreeSet::new(),
        },
    )
}

fn typedef(name: &str, ty: Type) -> UnitDeclaration {
    UnitDeclaration::new(name, Storage::Default, DeclarationKind::Typedef { ty })
}

fn function(name: &str, params: Vec<Type>, uses: &[Tlid]) -> UnitDeclaration {
    UnitDeclaration::new(
        name,
        Storage::Default,
        DeclarationKind::Fun {
            inline: false,
            ty: FunctionType {
                ret: Box::new(Type::void()),
                params: params
                    .into_iter()
                    .map(|ty| Param { name: None, ty })
                    .collect(),
                variadic: false,
            },
            body: Some(Fragment {
                range: None,
                uses: uses.iter().cloned().collect(),
            }),
            is_definition: true,
            attributes: BTreeSet::new(),
        },
    )
}

fn tag(name: &str) -> Tlid {
    Tlid::new(name, EntityKind::Struct)
}

fn struct_type(name: &str) -> Type {
    Type::new(TypeKind::Struct(tag(name)))
}

fn unit(declarations: Vec<UnitDeclaration>) -> TranslationUnit {
    TranslationUnit::new(Tuid::new("a.c"), declarations)
}

fn names(slice: &Slice) -> Vec<&str> {
    slice
        .declarations
        .iter()
        .map(|declaration| declaration.name.as_str())
        .collect()
}

#[test]
fn closure_of_a_function_contains_what_it_uses() {
    let s_t = Tlid::new("s_t", EntityKind::Typedef);
    let g = Tlid::new("g", EntityKind::FunctionDeclaration);
    let unit = unit(vec![
        structure("S", Some(vec![("x", Type::int(IKind::Int))])),
        structure("T", Some(vec![("y", Type::int(IKind::Int))])),
        typedef("s_t", struct_type("S")),
        function("g", vec![], &[]),
        function(
            "f",
            vec![Type::pointer(Type::new(TypeKind::Typedef(s_t.clone())))],
            &[g.clone()],
        ),
    ]);
    let f = unit.symbol_for(&Tlid::new("f", EntityKind::FunctionDefinition));
    let closure = dependency_graph(&unit).reachable_from([&f]);

    let reached: BTreeSet<&str> = closure
        .symbols()
        .map(|symbol| symbol.entity.name())
        .collect();
    assert_eq!(reached, BTreeSet::from(["f", "g", "s_t", "S"]));
    assert_eq!(
        closure.dependencies(&f).unwrap(),
        &BTreeSet::from([unit.symbol_for(&s_t), unit.symbol_for(&g)])
    );
    assert_eq!(closure.edges().count(), 3);
}

#[test]
fn self_references_are_not_dependencies() {
    let unit = unit(vec![structure(
        "list",
        Some(vec![("next", Type::pointer(struct_type("list")))]),
    )]);
    assert!(dependencies_of(&unit, &unit.declarations[0]).is_empty());
    let graph = dependency_graph(&unit);
    assert_eq!(graph.len(), 1);
    assert_eq!(graph.edges().count(), 0);
}

#[test]
fn combine_merges_edge_sets() {
    let a = unit(vec![
        structure("A", Some(vec![("b", struct_type("B"))])),
        structure("B", Some(vec![])),
    ]);
    let graph = dependency_graph(&a);
    assert_eq!(graph.clone().combine(DependencyGraph::default()), graph);
    assert_eq!(DependencyGraph::default().combine(graph.clone()), graph);

    let mut extra = DependencyGraph::new();
    let a_symbol = a.symbol_for(&tag("A"));
    let c_symbol = a.symbol_for(&tag("C"));
    extra.add_edge(a_symbol.clone(), c_symbol.clone());
    let combined = graph.combine(extra);
    assert_eq!(combined.len(), 3);
    assert_eq!(combined.dependencies(&a_symbol).unwrap().len(), 2);
    assert!(combined.dependencies(&c_symbol).unwrap().is_empty());
}

#[test]
fn unknown_roots_are_isolated() {
    let unit = unit(vec![structure("A", Some(vec![]))]);
    let missing = unit.symbol_for(&tag("Missing"));
    let closure = dependency_graph(&unit).reachable_from([&missing]);
    assert_eq!(closure.len(), 1);
    assert!(closure.dependencies(&missing).unwrap().is_empty());
}

#[test]
fn slices_keep_forward_declarations_in_unit_order() {
    let unit = unit(vec![
        structure("S", None),
        function("f", vec![Type::pointer(struct_type("S"))], &[]),
        structure("Unrelated", Some(vec![])),
        structure("S", Some(vec![("x", Type::int(IKind::Int))])),
    ]);
    let slice = slice(&unit, &[Tlid::new("f", EntityKind::FunctionDeclaration)]);
    assert_eq!(names(&slice), ["S", "f", "S"]);
    assert!(!slice.declarations[0].is_definition());
    assert!(slice.declarations[2].is_definition());
}

#[test]
fn slices_are_written_as_json() {
    let unit = unit(vec![
        structure("S", Some(vec![])),
        typedef("s_t", struct_type("S")),
    ]);
    let slice = slice(&unit, &[Tlid::new("s_t", EntityKind::Typedef)]);
    assert_eq!(slice.name(), "slice");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slice.json");
    slice.materialize(&path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["graph"]["a.c::typedef s_t"][0], "a.c::struct S");
    assert_eq!(json["declarations"].as_array().unwrap().len(), 2);
}
