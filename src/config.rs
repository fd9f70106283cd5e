//! Migration configuration.
//!
//! A [`MigrationConfig`] is a small JSON document. Every field has a default,
//! so `{}` is a complete configuration that migrates `rxjs` with all rules
//! enabled.

use std::path::Path;

use rxmigrate_core::error::{MigrateError, MigrateResult};
use serde::{Deserialize, Serialize};

/// Default cap on rewrite passes per source file.
pub const DEFAULT_MAX_ITERATIONS: usize = 8;

/// Settings for one migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Root module name of the library.
    pub library: String,
    /// Identifier the static factories are called on.
    pub namespace: String,
    /// Type names that count as streams, together with everything deriving
    /// from them. Add e.g. `"Store"` for store types that extend the stream
    /// class. The `namespace` type counts whether listed or not.
    pub stream_roots: Vec<String>,
    /// Which rules run.
    pub rules: RuleToggles,
    /// Maximum number of rewrite passes before giving up.
    pub max_iterations: usize,
    /// Seed the type oracle with declarations for the library itself.
    pub include_library_types: bool,
}

/// Per-rule switches. Rules run in the listed order within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleToggles {
    pub pipeable_operators: bool,
    pub static_methods: bool,
    pub update_imports: bool,
    pub collapse_imports: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        MigrationConfig {
            library: "rxjs".to_string(),
            namespace: "Observable".to_string(),
            stream_roots: vec!["Observable".to_string()],
            rules: RuleToggles::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            include_library_types: true,
        }
    }
}

impl Default for RuleToggles {
    fn default() -> Self {
        RuleToggles {
            pipeable_operators: true,
            static_methods: true,
            update_imports: true,
            collapse_imports: true,
        }
    }
}

impl MigrationConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(json: &str) -> MigrateResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> MigrateResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MigrationConfig =
            serde_json::from_str(&content).map_err(|e| MigrateError::InvalidInput {
                what: "migration config",
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> MigrateResult<()> {
        let invalid = |reason: &str| MigrateError::InvalidInput {
            what: "migration config",
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };
        if self.library.is_empty() {
            return Err(invalid("`library` must not be empty"));
        }
        if self.max_iterations == 0 {
            return Err(invalid("`max_iterations` must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_object_is_the_default() {
        let config = MigrationConfig::from_json("{}").unwrap();
        assert_eq!(config, MigrationConfig::default());
        assert_eq!(config.max_iterations, 8);
        assert!(config.rules.collapse_imports);
    }

    #[test]
    fn partial_rule_toggles_keep_other_defaults() {
        let config =
            MigrationConfig::from_json(r#"{"rules": {"collapse_imports": false}}"#).unwrap();
        assert!(!config.rules.collapse_imports);
        assert!(config.rules.pipeable_operators);
        assert_eq!(config.library, "rxjs");
    }

    #[test]
    fn load_reads_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"stream_roots": ["Observable", "Store"]}}"#).unwrap();
        let config = MigrationConfig::load(file.path()).unwrap();
        assert_eq!(config.stream_roots, vec!["Observable", "Store"]);
    }

    #[test]
    fn load_rejects_zero_iterations() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_iterations": 0}}"#).unwrap();
        let err = MigrationConfig::load(file.path()).unwrap_err();
        assert!(matches!(
            err,
            MigrateError::InvalidInput { what: "migration config", .. }
        ));
    }

    #[test]
    fn load_reports_malformed_json_with_its_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = MigrationConfig::load(file.path()).unwrap_err();
        match err {
            MigrateError::InvalidInput { path, .. } => assert_eq!(path, file.path()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
