//! Configuration loading and layering
//!
//! An optional `congelo.toml` tunes the freezer without widening the CLI:
//! which interpreter compiles the sources, how many shard files the output
//! is split across, and extra deny-list entries. Discovery checks an
//! explicit path first, then the current directory and its ancestors, then
//! the user configuration directory.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use etcetera::BaseStrategy;
use log::debug;
use serde::Deserialize;

/// Environment variable overriding the configured interpreter.
pub const PYTHON_ENV_VAR: &str = "CONGELO_PYTHON";

/// File name probed at every discovery location.
pub const CONFIG_FILE_NAME: &str = "congelo.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interpreter invoked to compile and marshal source files.
    pub python: String,
    /// Number of bytecode shard files the catalog is distributed across.
    pub num_shards: usize,
    /// Names excluded from traversal in addition to the built-in deny list.
    pub extend_deny_list: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            python: "python3".to_owned(),
            num_shards: 5,
            extend_deny_list: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration, falling back to defaults when no file is found.
    ///
    /// Layering, first hit wins: explicit path, then `congelo.toml` in the
    /// current directory or any ancestor, then the user configuration
    /// directory. A non-empty `CONGELO_PYTHON` environment variable
    /// overrides the configured interpreter regardless of where the file
    /// came from.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match Self::discover(explicit)? {
            Some(path) => Self::from_file(&path)?,
            None => {
                debug!("no {CONFIG_FILE_NAME} found, using defaults");
                Self::default()
            }
        };
        if let Some(python) = env::var(PYTHON_ENV_VAR)
            .ok()
            .filter(|value| !value.is_empty())
        {
            debug!("interpreter overridden by {PYTHON_ENV_VAR}: {python}");
            config.python = python;
        }
        Ok(config)
    }

    /// Parse and validate one specific TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        if config.num_shards == 0 {
            bail!(
                "invalid num_shards in {}: must be at least 1",
                path.display()
            );
        }
        debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    fn discover(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if !path.is_file() {
                bail!("config file {} does not exist", path.display());
            }
            return Ok(Some(path.to_path_buf()));
        }

        let cwd = env::current_dir().context("failed to determine the current directory")?;
        for dir in cwd.ancestors() {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Ok(Some(candidate));
            }
        }

        if let Ok(strategy) = etcetera::choose_base_strategy() {
            let candidate = strategy.config_dir().join("congelo").join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

/// A scoped guard for safely setting and cleaning up the `CONGELO_PYTHON`
/// environment variable.
///
/// This guard ensures that the variable is properly restored to its original
/// value when the guard is dropped, even if a panic occurs during testing.
///
/// # Example
///
/// ```rust
/// use congelo::config::InterpreterGuard;
/// let _guard = InterpreterGuard::new("/usr/bin/python3.12");
/// // CONGELO_PYTHON is now set to "/usr/bin/python3.12"
/// // When _guard goes out of scope, the original value is restored
/// ```
#[must_use = "InterpreterGuard must be held in scope to ensure cleanup"]
pub struct InterpreterGuard {
    /// The original value of `CONGELO_PYTHON`, if it was set
    /// None if the variable was not set originally
    original_value: Option<String>,
}

impl InterpreterGuard {
    /// Create a new guard with the given value.
    ///
    /// This will set the `CONGELO_PYTHON` environment variable to the
    /// specified value and store the original value for restoration when the
    /// guard is dropped.
    pub fn new(new_value: &str) -> Self {
        let original_value = env::var(PYTHON_ENV_VAR).ok();

        // SAFETY: This is safe in test contexts where we control the environment
        // and ensure proper cleanup via the Drop trait.
        unsafe {
            env::set_var(PYTHON_ENV_VAR, new_value);
        }

        Self { original_value }
    }

    /// Create a new guard that ensures `CONGELO_PYTHON` is unset.
    ///
    /// This will remove the `CONGELO_PYTHON` environment variable and store
    /// the original value for restoration when the guard is dropped.
    pub fn unset() -> Self {
        let original_value = env::var(PYTHON_ENV_VAR).ok();

        // SAFETY: This is safe in test contexts where we control the environment
        // and ensure proper cleanup via the Drop trait.
        unsafe {
            env::remove_var(PYTHON_ENV_VAR);
        }

        Self { original_value }
    }
}

impl Drop for InterpreterGuard {
    fn drop(&mut self) {
        // Always attempt cleanup, even during panics - that's the whole point of a scope guard!
        // We catch and ignore any errors to prevent double panics, but we must try to clean up.
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            // SAFETY: This is safe as we're restoring the environment to its original state
            unsafe {
                match self.original_value.take() {
                    Some(original) => env::set_var(PYTHON_ENV_VAR, original),
                    None => env::remove_var(PYTHON_ENV_VAR),
                }
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, content).expect("write config file");
        path
    }

    #[test]
    fn test_default_configuration() {
        let config = Config::default();
        assert_eq!(config.python, "python3");
        assert_eq!(config.num_shards, 5);
        assert!(config.extend_deny_list.is_empty());
    }

    #[test]
    fn test_partial_file_fills_remaining_defaults() {
        let temp = TempDir::new().expect("create temp dir");
        let path = write_config(&temp, "python = \"python3.12\"\n");

        let config = Config::from_file(&path).expect("valid config");
        assert_eq!(config.python, "python3.12");
        assert_eq!(config.num_shards, 5, "missing fields keep their defaults");
        assert!(config.extend_deny_list.is_empty());
    }

    #[test]
    fn test_full_file_parses_all_fields() {
        let temp = TempDir::new().expect("create temp dir");
        let path = write_config(
            &temp,
            "python = \"/opt/python/bin/python3\"\nnum_shards = 3\nextend_deny_list = [\"vendored\", \"secret.py\"]\n",
        );

        let config = Config::from_file(&path).expect("valid config");
        assert_eq!(config.python, "/opt/python/bin/python3");
        assert_eq!(config.num_shards, 3);
        assert_eq!(config.extend_deny_list, ["vendored", "secret.py"]);
    }

    #[test]
    fn test_zero_shards_is_rejected() {
        let temp = TempDir::new().expect("create temp dir");
        let path = write_config(&temp, "num_shards = 0\n");

        let error = Config::from_file(&path).expect_err("zero shards is invalid");
        assert!(error.to_string().contains("num_shards"), "{error}");
    }

    #[test]
    fn test_malformed_toml_reports_the_file() {
        let temp = TempDir::new().expect("create temp dir");
        let path = write_config(&temp, "python = [\n");

        let error = Config::from_file(&path).expect_err("malformed TOML must fail");
        assert!(
            format!("{error:#}").contains(CONFIG_FILE_NAME),
            "parse errors should name the offending file"
        );
    }

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let temp = TempDir::new().expect("create temp dir");
        let missing = temp.path().join("nope.toml");

        let error = Config::load(Some(&missing)).expect_err("missing explicit config must fail");
        assert!(error.to_string().contains("does not exist"), "{error}");
    }

    #[test]
    #[serial]
    fn test_env_var_overrides_config_file() {
        let temp = TempDir::new().expect("create temp dir");
        let path = write_config(&temp, "python = \"from-file\"\n");

        let _guard = InterpreterGuard::new("from-env");
        let config = Config::load(Some(&path)).expect("valid config");
        assert_eq!(config.python, "from-env");
    }

    #[test]
    #[serial]
    fn test_empty_env_var_is_ignored() {
        let temp = TempDir::new().expect("create temp dir");
        let path = write_config(&temp, "python = \"from-file\"\n");

        let _guard = InterpreterGuard::new("");
        let config = Config::load(Some(&path)).expect("valid config");
        assert_eq!(config.python, "from-file");
    }

    #[test]
    #[serial]
    fn test_interpreter_guard_restores_previous_value() {
        let outer = InterpreterGuard::new("outer-python");
        {
            let _inner = InterpreterGuard::new("inner-python");
            assert_eq!(env::var(PYTHON_ENV_VAR).as_deref(), Ok("inner-python"));
        }
        assert_eq!(
            env::var(PYTHON_ENV_VAR).as_deref(),
            Ok("outer-python"),
            "dropping the guard must restore the previous value"
        );
        drop(outer);
    }
}
