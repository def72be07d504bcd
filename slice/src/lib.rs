//! The `cslice` pipeline: load cursor dumps, elaborate each into a translation unit, and write out
//! the units together with their slices or the cross-unit link report.

pub mod cli;

use c_ast::{ClangAst, LoadError};
use cslice_core::Representation;
use cslice_core::config::{Config, Mode};
use cslice_ir::{Tlid, TranslationUnit};
use elaborate::{Options, elaborate_clang_ast};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("no inputs given")]
    NoInputs,
    #[error("slice mode needs at least one root")]
    NoRoots,
    #[error("output directory {} is not empty; pass --force to overwrite it", .0.display())]
    OutputNotEmpty(PathBuf),
    #[error("failed to prepare {}: {source}", path.display())]
    Output { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("failed to elaborate {}: {source}", path.display())]
    Elaborate {
        path: PathBuf,
        source: elaborate::Error,
    },
}

/// Runs every stage `config` asks for.
pub fn run(config: &Config) -> Result<(), RunError> {
    if config.inputs.is_empty() {
        return Err(RunError::NoInputs);
    }
    if config.mode == Mode::Slice && config.roots.is_empty() {
        return Err(RunError::NoRoots);
    }
    prepare_output(&config.output, config.force)?;

    let options = Options {
        atomics: config.elaborate.atomics,
    };
    let units = config
        .inputs
        .par_iter()
        .map(|path| load_and_elaborate(path, options))
        .collect::<Result<Vec<_>, _>>()?;
    let units_dir = subdirectory(&config.output, "units")?;
    for (n, (path, unit)) in config.inputs.iter().zip(&units).enumerate() {
        write(unit, &units_dir.join(file_name(n, path)))?;
    }

    match config.mode {
        Mode::Elaborate => {}
        Mode::Slice => {
            let slices_dir = subdirectory(&config.output, "slices")?;
            for (n, (path, unit)) in config.inputs.iter().zip(&units).enumerate() {
                let roots: Vec<Tlid> = config
                    .roots
                    .iter()
                    .flat_map(|name| unit.tlids_named(name))
                    .collect();
                if roots.is_empty() {
                    warn!("None of the roots are declared in {}", unit.id);
                    continue;
                }
                let slice = dependency_graph::slice(unit, &roots);
                info!("{slice}");
                write(&slice, &slices_dir.join(file_name(n, path)))?;
            }
        }
        Mode::Link => {
            let report = link_graph::link_graph(&units);
            write(&report, &config.output.join("link.json"))?;
        }
    }
    info!(
        "Wrote results for {} units to {}",
        units.len(),
        config.output.display()
    );
    Ok(())
}

fn load_and_elaborate(path: &Path, options: Options) -> Result<TranslationUnit, RunError> {
    let ast = ClangAst::load(path)?;
    elaborate_clang_ast(&ast, options).map_err(|source| RunError::Elaborate {
        path: path.to_path_buf(),
        source,
    })
}

/// Makes sure `output` exists and is empty, erasing its contents first if `force` is set.
fn prepare_output(output: &Path, force: bool) -> Result<(), RunError> {
    let io_error = |source| RunError::Output {
        path: output.to_path_buf(),
        source,
    };
    match fs::read_dir(output) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                if !force {
                    return Err(RunError::OutputNotEmpty(output.to_path_buf()));
                }
                warn!("Erasing {}", output.display());
                fs::remove_dir_all(output).map_err(io_error)?;
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_error(e)),
    }
    fs::create_dir_all(output).map_err(io_error)
}

fn subdirectory(output: &Path, name: &str) -> Result<PathBuf, RunError> {
    let path = output.join(name);
    fs::create_dir_all(&path).map_err(|source| RunError::Output {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn write(representation: &dyn Representation, path: &Path) -> Result<(), RunError> {
    representation
        .materialize(path)
        .map_err(|source| RunError::Output {
            path: path.to_path_buf(),
            source,
        })
}

/// `<n>-<stem>.json`, where `n` is the position of the input. Keeps outputs of inputs with the
/// same file name apart.
fn file_name(n: usize, input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or("unit".into());
    format!("{n}-{stem}.json")
}

#[cfg(test)]
mod tests;
