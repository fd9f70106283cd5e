//! Static factory calls to standalone creation functions.
//!
//! `Observable.of(1)` becomes `observableOf(1)` with
//! `import {of as observableOf} from 'rxjs';` added. The alias keeps the
//! new function from clashing with local names such as `of` or `from`.
//! Imports that only patch a factory onto the class are removed.

use rxmigrate_core::output::{Finding, RuleId};
use rxmigrate_core::patch::Edit;
use rxmigrate_ts::NodeKind;

use crate::pass::PassContext;
use crate::registry::ImportRegistry;
use crate::tables::{factory_alias, factory_name, is_static_factory};

pub const MESSAGE: &str = "prefer function calls";
pub const PATCH_IMPORT_MESSAGE: &str = "prefer operator imports with no side-effects";

pub fn factory_findings(cx: &PassContext<'_>, registry: &mut ImportRegistry) -> Vec<Finding> {
    let tree = cx.tree;
    let mut findings = Vec::new();

    for import in tree.imports() {
        if cx.paths.is_patch_factory_import(&import.module) {
            let span = tree.span(import.statement);
            findings.push(Finding::new(
                RuleId::StaticObservableMethods,
                span,
                PATCH_IMPORT_MESSAGE,
                vec![Edit::delete(span)],
            ));
        }
    }

    for node in tree.descendants(tree.root()) {
        if tree.kind(node) != NodeKind::CallExpression {
            continue;
        }
        let Some((callee, _)) = tree.call_parts(node) else {
            continue;
        };
        let Some((object, name)) = tree.property_access_parts(callee) else {
            continue;
        };
        let name = tree.text(name);
        if tree.text(object) != cx.namespace
            || !is_static_factory(name)
            || !cx.streams.returns_stream_like(node)
        {
            continue;
        }

        let canonical = factory_name(name);
        let alias = factory_alias(canonical);
        let span = tree.span(callee);
        let mut edits = vec![Edit::replace(span, alias.as_str())];
        edits.extend(registry.request(cx.paths.library(), canonical, Some(alias.as_str())));
        tracing::debug!(%span, factory = name, alias = %alias, "rewriting static factory call");
        findings.push(Finding::new(
            RuleId::StaticObservableMethods,
            span,
            MESSAGE,
            edits,
        ));
    }
    findings
}
