//! Pipeline orchestration
//!
//! Wires the traversal, compilation, and emission stages together. The
//! catalog is built completely before any artifact file is opened, so a
//! compile failure anywhere in the tree leaves the install dir untouched.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use log::{debug, info};

use crate::{
    catalog::{Catalog, FrozenModule},
    cli::Cli,
    compiler::{BytecodeCompiler, CPythonCompiler},
    config::Config,
    emit,
    naming::{ModuleName, is_package_marker},
    walker::{SourceFile, Walker},
};

/// Drives the walk-compile-catalog-emit pipeline for one invocation.
#[derive(Debug)]
pub struct Freezer<'a, C> {
    compiler: &'a C,
    config: &'a Config,
}

impl<'a, C: BytecodeCompiler> Freezer<'a, C> {
    pub fn new(compiler: &'a C, config: &'a Config) -> Self {
        Self { compiler, config }
    }

    /// Build the complete catalog for the given roots.
    ///
    /// Catalog order equals traversal order; the first failing file aborts
    /// the whole batch.
    pub fn freeze(&self, roots: &[PathBuf]) -> Result<Catalog> {
        let accepted = Walker::new(self.config).walk_roots(roots)?;
        debug!("traversal accepted {} source files", accepted.len());

        let mut catalog = Catalog::new();
        for file in &accepted {
            let module = self.freeze_file(file)?;
            catalog.push(module, &file.path)?;
        }
        Ok(catalog)
    }

    fn freeze_file(&self, file: &SourceFile) -> Result<FrozenModule> {
        let source = fs::read_to_string(&file.path)
            .with_context(|| format!("failed to read {}", file.path.display()))?;
        let name = ModuleName::from_source_path(&file.path, &file.top_package)?;
        debug!("freezing {name}");
        let bytecode = self.compiler.compile(&source, &file.path)?;
        Ok(FrozenModule::new(
            &name,
            bytecode,
            is_package_marker(&file.path),
        ))
    }

    /// Write every artifact for a finished catalog into `install_dir`.
    pub fn write_artifacts(&self, catalog: &Catalog, install_dir: &Path, oss: bool) -> Result<()> {
        emit::write_shards(catalog, install_dir, self.config.num_shards)?;
        emit::write_manifest(catalog, install_dir, oss)?;
        Ok(())
    }
}

/// Run the full freeze pipeline for a parsed command line.
pub fn run(cli: &Cli, config: &Config) -> Result<()> {
    preflight(cli)?;

    let compiler = CPythonCompiler::new(config.python.clone());
    let freezer = Freezer::new(&compiler, config);
    let catalog = freezer.freeze(&cli.paths)?;
    freezer.write_artifacts(&catalog, &cli.install_dir, cli.oss)?;

    info!(
        "froze {} modules ({} bytecode bytes) into {} shards under {}",
        catalog.len(),
        catalog.total_bytecode_len(),
        config.num_shards,
        cli.install_dir.display()
    );
    Ok(())
}

/// Input errors abort before anything is compiled or written.
fn preflight(cli: &Cli) -> Result<()> {
    for root in &cli.paths {
        if !root.exists() {
            bail!("path {} does not exist", root.display());
        }
    }
    if !cli.install_dir.is_dir() {
        bail!(
            "install dir {} does not exist or is not a directory",
            cli.install_dir.display()
        );
    }
    Ok(())
}
