use super::*;
use serde_json::Value;

const LIST: &str = r#"{
    "id": "0x1",
    "kind": "TranslationUnitDecl",
    "mainFile": "/src/list.c",
    "inner": [
        {
            "id": "0x2",
            "kind": "FunctionDecl",
            "name": "length",
            "type": {
                "class": "FunctionProto",
                "result": { "class": "Int", "ikind": "Int" },
                "params": []
            },
            "inner": [{ "id": "0x3", "kind": "CompoundStmt" }]
        }
    ]
}"#;

const MAIN: &str = r#"{
    "id": "0x1",
    "kind": "TranslationUnitDecl",
    "mainFile": "/src/main.c",
    "inner": [
        {
            "id": "0x2",
            "kind": "FunctionDecl",
            "name": "length",
            "type": {
                "class": "FunctionProto",
                "result": { "class": "Int", "ikind": "Int" },
                "params": []
            }
        },
        {
            "id": "0x3",
            "kind": "FunctionDecl",
            "name": "main",
            "type": {
                "class": "FunctionProto",
                "result": { "class": "Int", "ikind": "Int" },
                "params": []
            },
            "inner": [
                {
                    "id": "0x4",
                    "kind": "CompoundStmt",
                    "inner": [
                        {
                            "id": "0x5",
                            "kind": "DeclRefExpr",
                            "referencedDecl": { "id": "0x2", "kind": "FunctionDecl", "name": "length" }
                        }
                    ]
                }
            ]
        }
    ]
}"#;

/// Writes both dumps into `dir` and returns a config reading them.
fn setup(dir: &Path, mode: Mode) -> Config {
    let inputs = [("list.c.json", LIST), ("main.c.json", MAIN)]
        .into_iter()
        .map(|(name, contents)| {
            let path = dir.join(name);
            fs::write(&path, contents).unwrap();
            path
        })
        .collect();
    Config {
        inputs,
        output: dir.join("out"),
        mode,
        ..Config::mock()
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn elaborate_writes_one_file_per_unit() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), Mode::Elaborate);
    run(&config).unwrap();
    let units = config.output.join("units");
    assert!(units.join("0-list.c.json").exists());
    let main = read_json(&units.join("1-main.c.json"));
    assert_eq!(main["id"], "/src/main.c");
    assert!(!config.output.join("link.json").exists());
}

#[test]
fn link_mode_resolves_across_units() {
    let dir = tempfile::tempdir().unwrap();
    run(&setup(dir.path(), Mode::Link)).unwrap();
    let report = read_json(&dir.path().join("out").join("link.json"));
    assert_eq!(
        report["graph"]["links"]["/src/main.c"][0]["export"]["unit"],
        "/src/list.c"
    );
    assert_eq!(report["missing"].as_array().unwrap().len(), 0);
}

#[test]
fn slice_mode_skips_units_without_roots() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        roots: vec!["main".into()],
        ..setup(dir.path(), Mode::Slice)
    };
    run(&config).unwrap();
    let slices = config.output.join("slices");
    assert!(!slices.join("0-list.c.json").exists());
    let slice = read_json(&slices.join("1-main.c.json"));
    assert_eq!(slice["declarations"].as_array().unwrap().len(), 2);
}

#[test]
fn slice_mode_requires_roots() {
    let dir = tempfile::tempdir().unwrap();
    let error = run(&setup(dir.path(), Mode::Slice)).unwrap_err();
    assert!(matches!(error, RunError::NoRoots));
}

#[test]
fn nonempty_output_needs_force() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), Mode::Elaborate);
    fs::create_dir_all(&config.output).unwrap();
    fs::write(config.output.join("stale.txt"), "").unwrap();
    assert!(matches!(run(&config), Err(RunError::OutputNotEmpty(_))));

    let config = Config {
        force: true,
        ..config
    };
    run(&config).unwrap();
    assert!(!config.output.join("stale.txt").exists());
    assert!(config.output.join("units").join("1-main.c.json").exists());
}

#[test]
fn unreadable_inputs_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        inputs: vec![dir.path().join("missing.json")],
        output: dir.path().join("out"),
        ..Config::mock()
    };
    assert!(matches!(run(&config), Err(RunError::Load(_))));
    assert!(matches!(
        run(&Config::mock()),
        Err(RunError::NoInputs)
    ));
}

#[test]
fn output_names_are_numbered_stems() {
    assert_eq!(file_name(3, Path::new("dir/a.c.json")), "3-a.c.json");
    assert_eq!(file_name(0, Path::new("")), "0-unit.json");
}
