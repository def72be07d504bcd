//! The command-line arguments and configuration system for the `cslice` binary.

use clap::{Parser, ValueEnum};
use config::ConfigError;
use config::FileFormat::Toml;
use cslice_core::config::{Config, Mode};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Elaborate,
    Slice,
    Link,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Mode {
        match mode {
            ModeArg::Elaborate => Mode::Elaborate,
            ModeArg::Slice => Mode::Slice,
            ModeArg::Link => Mode::Link,
        }
    }
}

/// Command-line arguments for the `cslice` binary.
#[derive(Debug, Parser)]
pub struct Args {
    /// Set a configuration value; format $NAME=$VALUE.
    #[arg(long, short)]
    pub config: Vec<String>,

    /// Erase the output directory if nonempty.
    #[arg(long, short)]
    pub force: bool,

    /// Cursor dumps to process, one per translation unit.
    // Replaces the configured inputs when any are given.
    pub inputs: Vec<PathBuf>,

    /// Prints out the location of the config file.
    #[arg(long)]
    pub print_config_path: bool,

    /// Path to the output directory.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// What to produce from the elaborated units.
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Name of a declaration to slice from; may be repeated.
    #[arg(long = "root", short)]
    pub roots: Vec<String>,
}

/// Performs parsing and validation of the config; to be called by main() before executing any code
/// that tries to retrieve the config.
///
/// Returns the config, or None if a command line flag that calls for an early exit (such as
/// --print-config-path) was provided.
pub fn initialize(args: &Args) -> Result<Option<Config>, ConfigError> {
    let dirs = ProjectDirs::from("", "", "cslice");
    let config_dir = dirs.as_ref().map(ProjectDirs::config_dir);
    if args.print_config_path {
        match config_dir {
            Some(dir) => println!("Config file location: {:?}", config_file(dir)),
            None => println!("No home directory; only ./cslice.toml is read"),
        }
        return Ok(None);
    }
    let config = load_config(args, config_dir)?;
    config.validate();
    Ok(Some(config))
}

fn load_config(args: &Args, config_dir: Option<&Path>) -> Result<Config, ConfigError> {
    let mut settings = config::Config::builder().add_source(config::File::from_str(
        include_str!("../default_config.toml"),
        Toml,
    ));
    if let Some(dir) = config_dir {
        settings = settings.add_source(config::File::from(config_file(dir)).required(false));
    }
    settings =
        settings.add_source(config::File::from(PathBuf::from("cslice.toml")).required(false));
    for config_arg in &args.config {
        let Some((name, value)) = config_arg.split_once('=') else {
            return Err(ConfigError::Message(format!(
                "failed to parse config value {config_arg:?}; no '=' found"
            )));
        };
        settings = settings.set_override(name, value)?;
    }
    if args.force {
        settings = settings.set_override("force", true)?;
    }

    // Paths and lists cannot be passed losslessly through an override, so the remaining flags are
    // applied after deserialization.
    let mut config: Config = settings.build()?.try_deserialize()?;
    if !args.inputs.is_empty() {
        config.inputs = args.inputs.clone();
    }
    if let Some(ref output) = args.output {
        config.output = output.clone();
    }
    if let Some(mode) = args.mode {
        config.mode = mode.into();
    }
    if !args.roots.is_empty() {
        config.roots = args.roots.clone();
    }
    Ok(config)
}

/// Returns the config file path, given the config directory.
fn config_file(config_dir: &Path) -> PathBuf {
    [config_dir, "cslice.toml".as_ref()].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, io::Write as _};

    #[test]
    fn defaults_and_flags() {
        let config_dir = tempfile::tempdir().unwrap();
        let config = load_config(
            &Args::parse_from(["", "a.json", "b.json", "--output=/tmp/out"]),
            Some(config_dir.path()),
        )
        .unwrap();
        assert_eq!(
            config.inputs,
            [PathBuf::from("a.json"), PathBuf::from("b.json")]
        );
        assert_eq!(config.output, Path::new("/tmp/out"));
        assert_eq!(config.mode, Mode::Elaborate);
        assert!(!config.force);
        assert!(!config.elaborate.atomics);
        assert!(config.unknown.is_empty());
    }

    #[test]
    fn user_config_is_layered_under_flags() {
        let config_dir = tempfile::tempdir().unwrap();
        fs::File::create(config_file(config_dir.path()))
            .unwrap()
            .write_all(
                br#"
                    inputs = ["from_file.json"]
                    mode = "slice"
                    roots = ["main"]
                    [elaborate]
                    atomics = true
                "#,
            )
            .unwrap();

        let config = load_config(&Args::parse_from([""]), Some(config_dir.path())).unwrap();
        assert_eq!(config.inputs, [PathBuf::from("from_file.json")]);
        assert_eq!(config.mode, Mode::Slice);
        assert_eq!(config.roots, ["main"]);
        assert!(config.elaborate.atomics);

        let config = load_config(
            &Args::parse_from([
                "",
                "x.json",
                "--mode=link",
                "--force",
                "--config",
                "elaborate.atomics=false",
                "--config=log_filter=debug",
            ]),
            Some(config_dir.path()),
        )
        .unwrap();
        assert_eq!(config.inputs, [PathBuf::from("x.json")]);
        assert_eq!(config.mode, Mode::Link);
        assert!(config.force);
        assert!(!config.elaborate.atomics);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn roots_from_the_command_line_replace_configured_ones() {
        let config = load_config(
            &Args::parse_from(["", "--mode", "slice", "--root", "f", "-r", "g"]),
            None,
        )
        .unwrap();
        assert_eq!(config.roots, ["f", "g"]);
    }

    #[test]
    fn malformed_overrides_are_errors() {
        let error = load_config(&Args::parse_from(["", "--config", "force"]), None).unwrap_err();
        assert!(error.to_string().contains("no '=' found"));
    }
}
