//! Infrastructure shared by every cslice crate: the [Representation] trait through which results
//! are written out, and the run [config::Config].

pub mod config;

use serde::Serialize;
use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write as _};
use std::path::Path;
use tracing::debug;

/// A result of one cslice stage (an elaborated unit, a slice, a link report, ...) that can be
/// written to disk for inspection by the user or by downstream tools.
pub trait Representation: Display + Send + Sync {
    /// Name of this representation. Should be snake case, as it is used to build file names.
    fn name(&self) -> &'static str;

    /// Writes this representation to `path`.
    fn materialize(&self, path: &Path) -> io::Result<()>;
}

/// Serializes `value` as pretty-printed JSON into a new file at `path`. This is the `materialize`
/// implementation used by every representation in the workspace.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> io::Result<()> {
    debug!("Writing {}", path.display());
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn write_json_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unit.json");
        write_json(&json!({"declarations": ["S", "f"]}), &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.ends_with('\n'));
        let value: Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(value["declarations"][1], "f");
    }

    #[test]
    fn write_json_reports_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("unit.json");
        let error = write_json(&json!(null), &path).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
    }
}
