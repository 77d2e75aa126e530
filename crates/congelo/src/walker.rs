//! Package tree traversal and filtering
//!
//! Walks the given root paths depth-first and collects every Python source
//! file that belongs to a package, applying the deny-list along the way.
//! Children are visited in lexicographic name order at every level so the
//! resulting catalog, and therefore every generated artifact, is
//! deterministic across runs and platforms.

use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::debug;
use once_cell::sync::Lazy;

use crate::{
    config::Config,
    naming::{self, SOURCE_EXTENSION},
    types::FxIndexSet,
};

/// Names excluded from traversal regardless of where they appear.
///
/// Keeps the frozen library slim and drops functionality that makes no sense
/// in an embedded interpreter.
static DEFAULT_DENY_LIST: Lazy<FxIndexSet<&'static str>> = Lazy::new(|| {
    [
        // Unix database interfaces
        "dbm",
        // ncurses terminal bindings
        "curses",
        // Tcl/Tk GUI
        "tkinter",
        // Standard library test suites
        "test",
        "tests",
        "idle_test",
        "__phello__.foo.py",
        // Import machinery the interpreter already ships frozen
        "_bootstrap.py",
        "_bootstrap_external.py",
    ]
    .into_iter()
    .collect()
});

/// Trace classification for a visited filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitTag {
    PackageDir,
    SourceFile,
    SkippedNonPackageDir,
    SkippedDenied,
    SkippedNonSource,
}

impl VisitTag {
    fn as_str(self) -> &'static str {
        match self {
            Self::PackageDir => "package-dir",
            Self::SourceFile => "source-file",
            Self::SkippedNonPackageDir => "skipped-non-package-dir",
            Self::SkippedDenied => "skipped-denied",
            Self::SkippedNonSource => "skipped-non-source",
        }
    }
}

/// An accepted source file, remembering the top-level unit it was found
/// under so its module name can be derived later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub top_package: PathBuf,
}

/// Deterministic, filtered traversal over package trees.
#[derive(Debug)]
pub struct Walker {
    extra_deny: FxIndexSet<String>,
}

impl Walker {
    pub fn new(config: &Config) -> Self {
        Self {
            extra_deny: config.extend_deny_list.iter().cloned().collect(),
        }
    }

    /// Collect accepted source files under every root, in traversal order.
    ///
    /// A root directory that is not itself a package (no marker file) is a
    /// container: each of its direct children becomes an independent
    /// top-level unit instead of the container being named itself.
    pub fn walk_roots(&self, roots: &[PathBuf]) -> Result<Vec<SourceFile>> {
        let mut accepted = Vec::new();
        for root in roots {
            if root.is_dir() && !root.join(naming::PACKAGE_MARKER).exists() {
                for child in sorted_children(root)? {
                    self.walk_path(&child, &child, 0, &mut accepted)?;
                }
            } else {
                self.walk_path(root, root, 0, &mut accepted)?;
            }
        }
        Ok(accepted)
    }

    fn walk_path(
        &self,
        path: &Path,
        top_package: &Path,
        depth: usize,
        accepted: &mut Vec<SourceFile>,
    ) -> Result<()> {
        if path.is_dir() {
            self.walk_dir(path, top_package, depth, accepted)
        } else {
            self.walk_file(path, top_package, depth, accepted);
            Ok(())
        }
    }

    fn walk_dir(
        &self,
        path: &Path,
        top_package: &Path,
        depth: usize,
        accepted: &mut Vec<SourceFile>,
    ) -> Result<()> {
        if self.is_denied(path) {
            trace_entry(VisitTag::SkippedDenied, path, depth);
            return Ok(());
        }

        // Only directories holding the marker file are packages; anything
        // else is an ordinary folder whose contents are not importable.
        if !path.join(naming::PACKAGE_MARKER).exists() {
            trace_entry(VisitTag::SkippedNonPackageDir, path, depth);
            return Ok(());
        }

        trace_entry(VisitTag::PackageDir, path, depth);
        for child in sorted_children(path)? {
            self.walk_path(&child, top_package, depth + 1, accepted)?;
        }
        Ok(())
    }

    fn walk_file(
        &self,
        path: &Path,
        top_package: &Path,
        depth: usize,
        accepted: &mut Vec<SourceFile>,
    ) {
        if path.extension().and_then(OsStr::to_str) != Some(SOURCE_EXTENSION) {
            trace_entry(VisitTag::SkippedNonSource, path, depth);
            return;
        }
        if self.is_denied(path) {
            trace_entry(VisitTag::SkippedDenied, path, depth);
            return;
        }

        trace_entry(VisitTag::SourceFile, path, depth);
        accepted.push(SourceFile {
            path: path.to_path_buf(),
            top_package: top_package.to_path_buf(),
        });
    }

    fn is_denied(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(OsStr::to_str) else {
            return false;
        };
        DEFAULT_DENY_LIST.contains(name) || self.extra_deny.contains(name)
    }
}

/// Read a directory's children sorted lexicographically by name.
fn sorted_children(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?;
    let mut children = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read an entry of {}", dir.display()))?;
        children.push(entry.path());
    }
    children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(children)
}

fn trace_entry(tag: VisitTag, path: &Path, depth: usize) {
    debug!(
        "{:width$}{} {}",
        "",
        tag.as_str(),
        path.display(),
        width = depth * 4
    );
}
