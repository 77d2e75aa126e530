//! Module name derivation
//!
//! Maps an accepted source file's path, relative to its top package root's
//! parent directory, to the dotted qualified name used in the frozen module
//! table and the mangled C identifier of the emitted byte array.

use std::{
    ffi::OsStr,
    fmt,
    path::{Component, Path},
};

use anyhow::{Context, Result, anyhow, bail};

/// File whose presence marks a directory as an importable package.
pub const PACKAGE_MARKER: &str = "__init__.py";

/// Extension (without the dot) of recognized Python source files.
pub const SOURCE_EXTENSION: &str = "py";

/// Prefix of every emitted C byte array identifier.
const SYMBOL_PREFIX: &str = "M_";

/// Separator joining name segments inside a C identifier.
const SYMBOL_SEPARATOR: &str = "__";

/// Check whether a path points at a package marker file.
pub fn is_package_marker(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name == PACKAGE_MARKER)
}

/// The ordered name segments of a module, e.g. `["foo", "bar", "baz"]` for
/// `foo.bar.baz`.
///
/// A marker file names its containing directory rather than itself, so
/// `foo/bar/__init__.py` maps to `foo.bar`, not `foo.bar.__init__`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleName {
    segments: Vec<String>,
}

impl ModuleName {
    /// Derive the name for `path`, a source file found under `top_package`.
    ///
    /// `top_package` is the path given to the traversal as the top-level
    /// unit (a package directory or a single module file); segments are
    /// taken from `path` relative to its parent directory, with the source
    /// suffix stripped from the final segment.
    pub fn from_source_path(path: &Path, top_package: &Path) -> Result<Self> {
        let base = top_package.parent().ok_or_else(|| {
            anyhow!(
                "top package {} has no parent directory",
                top_package.display()
            )
        })?;
        let relative = path
            .strip_prefix(base)
            .with_context(|| format!("{} is not under {}", path.display(), base.display()))?;

        let mut segments = match relative.parent() {
            Some(parent) => parent
                .components()
                .map(|component| segment_from_component(component, path))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        // The marker file stands for its containing directory, whose name is
        // already the last collected segment.
        if !is_package_marker(relative) {
            let stem = relative
                .file_stem()
                .and_then(OsStr::to_str)
                .ok_or_else(|| anyhow!("non-UTF-8 file name in {}", path.display()))?;
            segments.push(stem.to_owned());
        }

        if segments.is_empty() {
            bail!(
                "cannot derive a module name for {}: a package marker file cannot be a traversal \
                 root",
                path.display()
            );
        }
        Ok(Self { segments })
    }

    /// Dotted qualified name, e.g. `foo.bar.baz`.
    pub fn qualified(&self) -> String {
        self.segments.join(".")
    }

    /// Mangled C identifier of the byte array, e.g. `M_foo__bar__baz`.
    pub fn symbol(&self) -> String {
        format!("{SYMBOL_PREFIX}{}", self.segments.join(SYMBOL_SEPARATOR))
    }

    /// The raw name segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified())
    }
}

fn segment_from_component(component: Component<'_>, path: &Path) -> Result<String> {
    match component {
        Component::Normal(segment) => segment
            .to_str()
            .map(str::to_owned)
            .ok_or_else(|| anyhow!("non-UTF-8 path segment in {}", path.display())),
        _ => bail!(
            "unexpected path component {:?} in {}",
            component,
            path.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive(path: &str, top_package: &str) -> ModuleName {
        ModuleName::from_source_path(Path::new(path), Path::new(top_package))
            .expect("name derivation should succeed")
    }

    #[test]
    fn test_plain_module_names() {
        let name = derive("lib/pkg/sub/leaf.py", "lib/pkg");
        assert_eq!(name.qualified(), "pkg.sub.leaf");
        assert_eq!(name.symbol(), "M_pkg__sub__leaf");
        assert_eq!(name.segments(), ["pkg", "sub", "leaf"]);
    }

    #[test]
    fn test_marker_names_containing_directory() {
        assert_eq!(derive("lib/pkg/__init__.py", "lib/pkg").qualified(), "pkg");
        assert_eq!(
            derive("lib/pkg/sub/__init__.py", "lib/pkg").qualified(),
            "pkg.sub"
        );
        assert_eq!(
            derive("lib/pkg/sub/__init__.py", "lib/pkg").symbol(),
            "M_pkg__sub"
        );
    }

    #[test]
    fn test_single_file_as_top_unit() {
        let name = derive("lib/single.py", "lib/single.py");
        assert_eq!(name.qualified(), "single");
        assert_eq!(name.symbol(), "M_single");
    }

    #[test]
    fn test_absolute_paths() {
        let name = derive("/srv/build/lib/pkg/mod.py", "/srv/build/lib/pkg");
        assert_eq!(name.qualified(), "pkg.mod");
    }

    #[test]
    fn test_marker_as_root_is_rejected() {
        let result = ModuleName::from_source_path(
            Path::new("lib/__init__.py"),
            Path::new("lib/__init__.py"),
        );
        assert!(result.is_err(), "a bare marker file has no module name");
    }

    #[test]
    fn test_path_outside_top_package_is_rejected() {
        let result =
            ModuleName::from_source_path(Path::new("elsewhere/mod.py"), Path::new("lib/pkg"));
        assert!(result.is_err());
    }

    #[test]
    fn test_display_is_qualified_name() {
        assert_eq!(
            derive("lib/pkg/mod.py", "lib/pkg").to_string(),
            "pkg.mod"
        );
    }

    #[test]
    fn test_marker_detection() {
        assert!(is_package_marker(Path::new("lib/pkg/__init__.py")));
        assert!(!is_package_marker(Path::new("lib/pkg/init.py")));
        assert!(!is_package_marker(Path::new("lib/pkg")));
    }
}
