//! In-memory catalog of compiled modules
//!
//! The catalog accumulates one [`FrozenModule`] per accepted source file, in
//! traversal order, and rejects duplicate qualified names before any output
//! file is written.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::{naming::ModuleName, types::FxIndexMap};

/// One compiled module ready for emission.
#[derive(Debug, Clone)]
pub struct FrozenModule {
    qualified_name: String,
    symbol_name: String,
    size: i64,
    bytecode: Vec<u8>,
}

impl FrozenModule {
    /// Build a record from a derived name and its marshalled bytecode.
    ///
    /// The manifest encodes package-ness in the sign of the size field, so a
    /// package marker stores the negated bytecode length.
    pub fn new(name: &ModuleName, bytecode: Vec<u8>, is_package: bool) -> Self {
        let mut size = bytecode.len() as i64;
        if is_package {
            size = -size;
        }
        Self {
            qualified_name: name.qualified(),
            symbol_name: name.symbol(),
            size,
            bytecode,
        }
    }

    /// Dotted import name, e.g. `foo.bar`.
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// C identifier of the emitted byte array, e.g. `M_foo__bar`.
    pub fn symbol_name(&self) -> &str {
        &self.symbol_name
    }

    /// Bytecode length, negated when the module is a package.
    pub fn size(&self) -> i64 {
        self.size
    }

    /// Marshalled code object bytes.
    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    /// Whether this record represents a package (`__init__.py`).
    pub fn is_package(&self) -> bool {
        self.size < 0
    }
}

/// Ordered collection of frozen modules with duplicate-name detection.
#[derive(Debug, Default)]
pub struct Catalog {
    modules: Vec<FrozenModule>,
    origins: FxIndexMap<String, PathBuf>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a module, rejecting a qualified name seen before.
    ///
    /// Two distinct traversal roots can legitimately produce colliding names
    /// (e.g. the same package listed twice); the collision is reported with
    /// both source paths so the caller can fix the invocation.
    pub fn push(&mut self, module: FrozenModule, origin: &Path) -> Result<()> {
        if let Some(previous) = self.origins.get(module.qualified_name()) {
            bail!(
                "duplicate module name `{}`: {} collides with {}",
                module.qualified_name(),
                origin.display(),
                previous.display()
            );
        }
        self.origins
            .insert(module.qualified_name().to_owned(), origin.to_path_buf());
        self.modules.push(module);
        Ok(())
    }

    /// Modules in the order they were catalogued.
    pub fn modules(&self) -> &[FrozenModule] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Total marshalled bytecode across all modules, for summary logging.
    pub fn total_bytecode_len(&self) -> usize {
        self.modules
            .iter()
            .map(|module| module.bytecode().len())
            .sum()
    }
}
