use super::*;
use cslice_ir::{Attribute, Fragment, FunctionType, IKind};

fn function(name: &str, storage: Storage, is_definition: bool) -> UnitDeclaration {
    function_with(name, storage, is_definition, &[])
}

fn function_with(
    name: &str,
    storage: Storage,
    is_definition: bool,
    attributes: &[Attribute],
) -> UnitDeclaration {
    UnitDeclaration::new(
        name,
        storage,
        DeclarationKind::Fun {
            inline: false,
            ty: FunctionType {
                ret: Box::new(Type::int(IKind::Int)),
                params: vec![],
                variadic: false,
            },
            body: is_definition.then(Fragment::default),
            is_definition,
            attributes: attributes.iter().cloned().collect(),
        },
    )
}

fn variable(name: &str, storage: Storage, is_definition: bool) -> UnitDeclaration {
    UnitDeclaration::new(
        name,
        storage,
        DeclarationKind::Var {
            ty: Type::int(IKind::Long),
            rhs: None,
            is_definition,
            attributes: BTreeSet::new(),
        },
    )
}

fn unit(path: &str, declarations: Vec<UnitDeclaration>) -> TranslationUnit {
    TranslationUnit::new(Tuid::new(path), declarations)
}

fn symbol(path: &str, name: &str) -> Symbol {
    Symbol::new(
        Tuid::new(path),
        Tlid::new(name, EntityKind::FunctionDeclaration),
    )
}

#[test]
fn imports_link_to_the_defining_unit() {
    let units = [
        unit(
            "a.c",
            vec![
                function("g", Storage::Default, false),
                function("f", Storage::Default, true),
                variable("counter", Storage::Extern, false),
            ],
        ),
        unit(
            "b.c",
            vec![
                function("g", Storage::Default, true),
                variable("counter", Storage::Default, true),
            ],
        ),
    ];
    let report = link_graph(&units);

    assert!(report.missing.is_empty());
    assert!(report.duplicates.is_empty());
    let links = report.graph.links_from(&Tuid::new("a.c"));
    assert_eq!(links.len(), 2);
    assert!(links.contains(&Link {
        import: symbol("a.c", "g"),
        export: symbol("b.c", "g"),
    }));
    assert!(report.graph.links_from(&Tuid::new("b.c")).is_empty());

    let external = report.graph.external_dependency_graph();
    assert_eq!(external.len(), 4);
    assert_eq!(
        external.dependencies(&symbol("a.c", "g")).unwrap(),
        &BTreeSet::from([symbol("b.c", "g")])
    );
}

#[test]
fn unresolved_imports_are_reported() {
    let units = [unit("a.c", vec![function("h", Storage::Extern, false)])];
    let report = link_graph(&units);
    assert!(report.graph.links.is_empty());
    let missing: Vec<_> = report.missing.iter().collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].symbol, symbol("a.c", "h"));
    assert_eq!(missing[0].kind, EntityKind::FunctionDeclaration);
}

#[test]
fn static_symbols_never_link() {
    let units = [
        unit(
            "a.c",
            vec![
                function("k", Storage::Default, false),
                function("local", Storage::Static, false),
            ],
        ),
        unit(
            "b.c",
            vec![
                function("k", Storage::Static, false),
                function("k", Storage::Default, true),
            ],
        ),
    ];
    let b = object_interface(&units[1]);
    assert!(b.exports.is_empty());
    assert!(b.imports.is_empty());
    let a = object_interface(&units[0]);
    assert_eq!(a.imports.len(), 1);

    let report = link_graph(&units);
    assert!(report.graph.links.is_empty());
    assert_eq!(report.missing.len(), 1);
}

#[test]
fn types_are_not_part_of_the_interface() {
    let units = [unit(
        "a.c",
        vec![UnitDeclaration::new(
            "S",
            Storage::Default,
            DeclarationKind::Struct {
                fields: None,
                attributes: BTreeSet::new(),
            },
        )],
    )];
    let interface = object_interface(&units[0]);
    assert!(interface.exports.is_empty());
    assert!(interface.imports.is_empty());
}

#[test]
fn duplicate_definitions_are_reported_not_linked() {
    let units = [
        unit("a.c", vec![function("g", Storage::Default, false)]),
        unit("b.c", vec![function("g", Storage::Default, true)]),
        unit("c.c", vec![function("g", Storage::Default, true)]),
    ];
    let report = link_graph(&units);

    assert!(report.graph.links.is_empty());
    assert!(report.missing.is_empty());
    assert_eq!(
        report.duplicates,
        [DuplicateDefinition {
            tlid: Tlid::new("g", EntityKind::FunctionDeclaration),
            definitions: vec![symbol("b.c", "g"), symbol("c.c", "g")],
            importers: vec![symbol("a.c", "g")],
        }]
    );
}

#[test]
fn weak_definitions_yield_to_strong_ones() {
    let units = [
        unit("a.c", vec![function("g", Storage::Default, false)]),
        unit(
            "b.c",
            vec![function_with("g", Storage::Default, true, &[Attribute::Weak])],
        ),
        unit("c.c", vec![function("g", Storage::Default, true)]),
    ];
    let report = link_graph(&units);
    assert!(report.duplicates.is_empty());
    assert_eq!(
        report.graph.links_from(&Tuid::new("a.c"))[0].export,
        symbol("c.c", "g")
    );

    let only_weak = [
        unit("a.c", vec![function("g", Storage::Default, false)]),
        unit(
            "b.c",
            vec![function_with("g", Storage::Default, true, &[Attribute::Weak])],
        ),
        unit(
            "c.c",
            vec![function_with("g", Storage::Default, true, &[Attribute::Weak])],
        ),
    ];
    let report = link_graph(&only_weak);
    assert!(report.duplicates.is_empty());
    assert_eq!(
        report.graph.links_from(&Tuid::new("a.c"))[0].export,
        symbol("b.c", "g")
    );
}

#[test]
fn reports_are_written_as_json() {
    let units = [
        unit("a.c", vec![function("g", Storage::Default, false)]),
        unit("b.c", vec![function("g", Storage::Default, true)]),
    ];
    let report = link_graph(&units);
    assert_eq!(report.name(), "link_report");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("link.json");
    report.materialize(&path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["graph"]["links"]["a.c"][0]["export"]["unit"], "b.c");
    assert_eq!(json["missing"].as_array().unwrap().len(), 0);
}
