//! Import registry.
//!
//! Tracks which `(module, symbol, alias)` imports a file has, seeded from
//! its existing named imports and extended as rules request new ones. The
//! first request for an absent import returns the edit that adds it; every
//! later request for the same import returns nothing, so one pass never
//! inserts an import twice.
//!
//! New imports go at the top of the file, or just below a leading header
//! comment that is followed by a blank line.

use std::collections::HashSet;

use rxmigrate_core::patch::Edit;
use rxmigrate_ts::SyntaxTree;

use crate::tables::ModulePaths;

/// One named import.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImportKey {
    pub module: String,
    pub symbol: String,
    pub alias: Option<String>,
}

impl ImportKey {
    pub fn new(module: impl Into<String>, symbol: impl Into<String>, alias: Option<&str>) -> Self {
        ImportKey {
            module: module.into(),
            symbol: symbol.into(),
            alias: alias.map(str::to_string),
        }
    }

    /// Statement text adding this import, with its line break.
    pub fn statement(&self) -> String {
        match &self.alias {
            Some(alias) => format!(
                "import {{{} as {}}} from '{}';\n",
                self.symbol, alias, self.module
            ),
            None => format!("import {{{}}} from '{}';\n", self.symbol, self.module),
        }
    }
}

/// Imports present in, or already requested for, one file.
#[derive(Debug, Clone)]
pub struct ImportRegistry {
    present: HashSet<ImportKey>,
    insertion_point: usize,
}

impl ImportRegistry {
    /// Seed from the named imports of `tree`. Per-operator module paths
    /// count as imports from the operators module.
    pub fn new(tree: &SyntaxTree, paths: &ModulePaths<'_>) -> Self {
        let mut present = HashSet::new();
        for import in tree.imports() {
            let module = paths.canonical_module(&import.module);
            for spec in &import.specifiers {
                let symbol = tree.text(spec.imported());
                let alias = spec.property.map(|_| tree.text(spec.name));
                present.insert(ImportKey::new(module.clone(), symbol, alias));
            }
        }
        ImportRegistry {
            present,
            insertion_point: insertion_point(tree),
        }
    }

    pub fn insertion_point(&self) -> usize {
        self.insertion_point
    }

    /// Edit adding `symbol` (as `alias`) from `module`, unless it is
    /// already present or was requested before.
    pub fn request(&mut self, module: &str, symbol: &str, alias: Option<&str>) -> Option<Edit> {
        let key = ImportKey::new(module, symbol, alias);
        if self.present.contains(&key) {
            return None;
        }
        let edit = Edit::insert(self.insertion_point, key.statement());
        tracing::trace!(module, symbol, ?alias, "requesting import");
        self.present.insert(key);
        Some(edit)
    }
}

/// Offset new imports are inserted at.
///
/// Just past the blank line that follows a leading header comment, or the
/// start of the file.
pub fn insertion_point(tree: &SyntaxTree) -> usize {
    let source = tree.source();
    let Some(first) = tree.comments().first() else {
        return 0;
    };
    let leading = source[..first.span.start].trim().is_empty();
    if leading && source[first.span.end..].starts_with("\n\n") {
        first.span.end + 2
    } else {
        0
    }
}
