//! One rewrite pass over one source file.
//!
//! The enabled rules run in a fixed order over the same parsed tree and
//! share one [`ImportRegistry`], so an import requested by one rule is never
//! requested again by a later one. Findings come back in rule order and,
//! within a rule, in discovery order. Nothing is applied here; see
//! [`crate::driver`].

use rxmigrate_core::output::Finding;
use rxmigrate_ts::{SyntaxTree, TypeOracle};

use crate::config::MigrationConfig;
use crate::registry::ImportRegistry;
use crate::stream::StreamTypes;
use crate::tables::ModulePaths;
use crate::{chain, collapse, factory, import_path};

/// What every rule needs to inspect one tree.
pub struct PassContext<'a> {
    pub tree: &'a SyntaxTree,
    pub streams: StreamTypes<'a>,
    pub paths: ModulePaths<'a>,
    /// Identifier the static factories are called on.
    pub namespace: &'a str,
}

impl<'a> PassContext<'a> {
    pub fn new(
        tree: &'a SyntaxTree,
        oracle: &'a dyn TypeOracle,
        config: &'a MigrationConfig,
    ) -> Self {
        PassContext {
            tree,
            streams: StreamTypes::new(oracle, &config.stream_roots).with_class(&config.namespace),
            paths: ModulePaths::new(&config.library),
            namespace: &config.namespace,
        }
    }
}

/// Run every enabled rule once over `tree`.
pub fn run_pass(
    tree: &SyntaxTree,
    oracle: &dyn TypeOracle,
    config: &MigrationConfig,
) -> Vec<Finding> {
    let cx = PassContext::new(tree, oracle, config);
    let mut registry = ImportRegistry::new(tree, &cx.paths);
    let mut findings = Vec::new();

    if config.rules.pipeable_operators {
        findings.extend(chain::chain_findings(&cx, &mut registry));
    }
    if config.rules.static_methods {
        findings.extend(factory::factory_findings(&cx, &mut registry));
    }
    if config.rules.update_imports {
        findings.extend(import_path::import_findings(&cx));
    }
    if config.rules.collapse_imports {
        findings.extend(collapse::collapse_findings(&cx));
    }

    tracing::debug!(findings = findings.len(), "rewrite pass complete");
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::library_types;
    use rxmigrate_core::output::RuleId;
    use rxmigrate_ts::{parse, DeclaredTypes};

    fn rules_of(source: &str, config: &MigrationConfig) -> Vec<RuleId> {
        let tree = parse(source).unwrap();
        let facts = library_types(config).with_binding("src", "Observable<number>");
        let oracle = DeclaredTypes::new(&tree, &facts);
        run_pass(&tree, &oracle, config)
            .iter()
            .map(|f| f.rule)
            .collect()
    }

    const MIXED: &str = "import { Observable } from 'rxjs/Observable';\n\
                         import 'rxjs/add/observable/of';\n\
                         src.map(f);\n\
                         Observable.of(1);\n";

    #[test]
    fn rules_run_in_order() {
        let rules = rules_of(MIXED, &MigrationConfig::default());
        assert_eq!(
            rules,
            vec![
                RuleId::PipeableOperators,
                RuleId::StaticObservableMethods,
                RuleId::StaticObservableMethods,
                RuleId::UpdateImports,
            ]
        );
    }

    #[test]
    fn disabled_rules_report_nothing() {
        let mut config = MigrationConfig::default();
        config.rules.pipeable_operators = false;
        config.rules.update_imports = false;
        let rules = rules_of(MIXED, &config);
        assert_eq!(
            rules,
            vec![RuleId::StaticObservableMethods, RuleId::StaticObservableMethods]
        );
    }

    #[test]
    fn a_clean_file_has_no_findings() {
        let source = "import { of } from 'rxjs';\nimport { map } from 'rxjs/operators';\nof(1).pipe(map(f));\n";
        assert!(rules_of(source, &MigrationConfig::default()).is_empty());
    }
}
