//! Fixed-point migration driver.
//!
//! One pass only applies findings whose edits do not conflict, and some
//! rewrites only become visible after others (an import path is fixed
//! before duplicates of the new path can be collapsed). The driver
//! therefore re-parses and re-runs the pass until it reports nothing.
//!
//! ## Termination
//!
//! Every text the driver produces is hashed. Revisiting a text, or running
//! out of passes, is a [`MigrateError::NonConvergent`] error instead of a
//! silent partial result.

use std::collections::HashSet;

use rxmigrate_core::error::{MigrateError, MigrateResult};
use rxmigrate_core::output::{Finding, FindingReport};
use rxmigrate_core::patch::{apply_findings, ContentHash};
use rxmigrate_ts::{parse, DeclaredTypes, TypeFacts};
use serde::Serialize;

use crate::config::MigrationConfig;
use crate::pass::run_pass;
use crate::prelude::with_library_types;

/// Findings of one applied pass, with the text they were computed on.
#[derive(Debug, Clone, Serialize)]
pub struct Round {
    pub source: String,
    pub findings: Vec<Finding>,
    /// Findings whose edits were applied.
    pub applied: usize,
    /// Findings left for the next pass because they conflicted.
    pub deferred: usize,
}

/// Result of migrating one source text.
#[derive(Debug, Clone, Serialize)]
pub struct Migration {
    /// The migrated text.
    pub text: String,
    /// Every applied pass, in order.
    pub rounds: Vec<Round>,
}

impl Migration {
    /// Number of passes that changed the text.
    pub fn passes(&self) -> usize {
        self.rounds.len()
    }

    pub fn changed(&self) -> bool {
        !self.rounds.is_empty()
    }

    /// Reports for every finding, each located in the text of its pass.
    pub fn reports(&self, file: &str) -> Vec<FindingReport> {
        self.rounds
            .iter()
            .flat_map(|round| {
                round
                    .findings
                    .iter()
                    .map(|finding| finding.to_report(file, &round.source))
            })
            .collect()
    }
}

/// Migrate `source` until no rule reports anything.
pub fn migrate_source(
    source: &str,
    facts: &TypeFacts,
    config: &MigrationConfig,
) -> MigrateResult<Migration> {
    let facts = with_library_types(facts, config);
    let mut text = source.to_string();
    let mut seen = HashSet::from([ContentHash::compute(text.as_bytes())]);
    let mut rounds = Vec::new();

    loop {
        let tree = parse(&text)?;
        let oracle = DeclaredTypes::new(&tree, &facts);
        let findings = run_pass(&tree, &oracle, config);
        if findings.is_empty() {
            tracing::debug!(passes = rounds.len(), "migration reached a fixed point");
            return Ok(Migration { text, rounds });
        }
        if rounds.len() == config.max_iterations {
            tracing::warn!(
                passes = rounds.len(),
                pending = findings.len(),
                "migration hit the pass limit"
            );
            return Err(MigrateError::NonConvergent {
                iterations: rounds.len(),
            });
        }

        let applied = apply_findings(&text, &findings)?;
        tracing::debug!(
            pass = rounds.len() + 1,
            applied = applied.applied,
            deferred = applied.deferred,
            "applied findings"
        );
        let previous = std::mem::replace(&mut text, applied.text);
        rounds.push(Round {
            source: previous,
            findings,
            applied: applied.applied,
            deferred: applied.deferred,
        });

        if !seen.insert(ContentHash::compute(text.as_bytes())) {
            tracing::warn!(passes = rounds.len(), "migration revisited an earlier text");
            return Err(MigrateError::NonConvergent {
                iterations: rounds.len(),
            });
        }
    }
}
