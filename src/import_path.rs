//! Deprecated import paths and symbols.
//!
//! Module paths of the 5.x layout are rewritten in place, inside their
//! quotes. Names that no longer exist are renamed at the specifier while
//! keeping the local binding, so code using the import does not change:
//!
//! ```text
//! import { empty } from 'rxjs/observable/empty';
//! import { EMPTY as empty } from 'rxjs';
//! ```

use rxmigrate_core::output::{Finding, RuleId};
use rxmigrate_core::patch::Edit;

use crate::pass::PassContext;

pub const PATH_MESSAGE: &str = "outdated import path";
pub const SYMBOL_MESSAGE: &str = "imported symbol no longer exists";

pub fn import_findings(cx: &PassContext<'_>) -> Vec<Finding> {
    let tree = cx.tree;
    let mut findings = Vec::new();

    for import in tree.imports() {
        for spec in &import.specifiers {
            let imported = spec.imported();
            let old = tree.text(imported);
            let Some(new) = cx.paths.renamed_symbol(&import.module, old) else {
                continue;
            };
            let edit = match spec.property {
                Some(property) => Edit::replace(tree.span(property), new),
                None => Edit::replace(tree.span(spec.name), format!("{new} as {old}")),
            };
            findings.push(Finding::new(
                RuleId::UpdateImports,
                tree.span(imported),
                SYMBOL_MESSAGE,
                vec![edit],
            ));
        }

        if let Some(path) = cx.paths.migrated(&import.module) {
            tracing::debug!(from = %import.module, to = %path, "rewriting import path");
            findings.push(Finding::new(
                RuleId::UpdateImports,
                import.module_span,
                PATH_MESSAGE,
                vec![Edit::replace(import.module_span, path)],
            ));
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MigrationConfig;
    use rxmigrate_core::patch::apply_edits;
    use rxmigrate_ts::{parse, DeclaredTypes, TypeFacts};

    fn findings(source: &str) -> Vec<Finding> {
        let tree = parse(source).unwrap();
        let facts = TypeFacts::new();
        let oracle = DeclaredTypes::new(&tree, &facts);
        let config = MigrationConfig::default();
        let cx = PassContext::new(&tree, &oracle, &config);
        import_findings(&cx)
    }

    fn rewrite(source: &str) -> String {
        let edits: Vec<Edit> = findings(source)
            .into_iter()
            .flat_map(|f| f.edits)
            .collect();
        apply_edits(source, &edits).unwrap()
    }

    mod symbol_tests {
        use super::*;

        #[test]
        fn unaliased_symbol_keeps_local_name() {
            assert_eq!(
                rewrite("import { empty } from 'rxjs/observable/empty';\n"),
                "import { EMPTY as empty } from 'rxjs';\n"
            );
        }

        #[test]
        fn aliased_symbol_renames_only_the_import() {
            assert_eq!(
                rewrite("import { never as n } from 'rxjs/observable/never';\n"),
                "import { NEVER as n } from 'rxjs';\n"
            );
        }

        #[test]
        fn subscription_interfaces() {
            assert_eq!(
                rewrite("import { Subscription, ISubscription, AnonymousSubscription } from 'rxjs/Subscription';\n"),
                "import { Subscription, SubscriptionLike as ISubscription, Unsubscribable as AnonymousSubscription } from 'rxjs';\n"
            );
        }

        #[test]
        fn symbol_finding_comes_before_path_finding() {
            let found = findings("import { empty } from 'rxjs/observable/empty';\n");
            let messages: Vec<&str> = found.iter().map(|f| f.message.as_str()).collect();
            assert_eq!(messages, vec![SYMBOL_MESSAGE, PATH_MESSAGE]);
        }
    }

    mod path_tests {
        use super::*;

        #[test]
        fn exact_prefix_and_operator_paths() {
            let source = "import { Observable } from 'rxjs/Observable';\n\
                          import { async } from 'rxjs/scheduler/async';\n\
                          import { map } from 'rxjs/operators/map';\n";
            assert_eq!(
                rewrite(source),
                "import { Observable } from 'rxjs';\n\
                 import { async } from 'rxjs/internal/scheduler/async';\n\
                 import { map } from 'rxjs/operators';\n"
            );
        }

        #[test]
        fn double_quotes_are_kept() {
            assert_eq!(
                rewrite("import { Subject } from \"rxjs/Subject\";\n"),
                "import { Subject } from \"rxjs\";\n"
            );
        }

        #[test]
        fn side_effect_import_path_is_rewritten() {
            assert_eq!(rewrite("import 'rxjs/Observable';\n"), "import 'rxjs';\n");
        }

        #[test]
        fn current_paths_are_untouched() {
            assert!(findings(
                "import { of } from 'rxjs';\nimport { map } from 'rxjs/operators';\nimport 'rxjs/add/operator/map';\nimport * as rx from 'rxjs';\n"
            )
            .is_empty());
        }
    }
}
