//! Configuration for a cslice run. The layering of configuration sources (defaults, user config
//! file, command-line overrides) lives in the `cslice` crate; this module only defines the
//! resulting structure so that every crate can consume it.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

/// What a run produces, beyond the elaborated translation units themselves.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Only elaborate the inputs.
    Elaborate,
    /// Extract the dependency closure of the configured roots from every unit.
    Slice,
    /// Cross-reference all inputs into a link graph.
    Link,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Cursor dumps to process, one per translation unit.
    #[serde(default)]
    pub inputs: Vec<PathBuf>,

    /// Directory the results are written into.
    pub output: PathBuf,

    /// If true, erase `output` when it is not empty instead of refusing to run.
    pub force: bool,

    /// `tracing_subscriber::EnvFilter` directives for console logging.
    pub log_filter: String,

    pub mode: Mode,

    /// Names of the declarations slice mode starts from.
    #[serde(default)]
    pub roots: Vec<String>,

    #[serde(default)]
    pub elaborate: ElaborateConfig,

    #[serde(flatten)]
    pub unknown: HashMap<String, Value>,
}

/// Options passed through to the elaborator.
#[derive(Debug, Default, Deserialize)]
pub struct ElaborateConfig {
    /// Accept `_Atomic` types instead of rejecting them as unsupported.
    #[serde(default)]
    pub atomics: bool,

    #[serde(flatten)]
    pub unknown: HashMap<String, Value>,
}

impl Config {
    /// Prints a warning for every key this version of cslice does not understand.
    pub fn validate(&self) {
        unknown_field_warning("", &self.unknown);
        unknown_field_warning("elaborate", &self.elaborate.unknown);
    }

    /// Returns a mock config for testing.
    pub fn mock() -> Self {
        Self {
            inputs: Vec::new(),
            output: PathBuf::from("cslice-out"),
            force: false,
            log_filter: "off".into(),
            mode: Mode::Elaborate,
            roots: Vec::new(),
            elaborate: ElaborateConfig::default(),
            unknown: HashMap::new(),
        }
    }
}

/// Prints out a warning message for every field in `unknown`.
///
/// `prefix` should be the path to this entry (e.g. `ElaborateConfig` should call this with a
/// `prefix` of `elaborate`).
pub fn unknown_field_warning(prefix: &str, unknown: &HashMap<String, Value>) {
    let mut entries: Vec<_> = unknown.keys().collect();
    entries.sort_unstable();
    entries.into_iter().for_each(|name| match prefix {
        "" => eprintln!("Warning: unknown config key {name}"),
        p => eprintln!("Warning: unknown config key {p}.{name}"),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_keys_are_collected() {
        let config: Config = serde_json::from_value(json!({
            "output": "out",
            "force": false,
            "log_filter": "info",
            "mode": "link",
            "elaborate": { "atomics": true, "typeof": "yes" },
            "colour": "blue",
        }))
        .unwrap();
        assert_eq!(config.mode, Mode::Link);
        assert!(config.inputs.is_empty());
        assert!(config.elaborate.atomics);
        assert!(config.unknown.contains_key("colour"));
        assert!(config.elaborate.unknown.contains_key("typeof"));
    }
}
