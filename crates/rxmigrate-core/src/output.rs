//! Finding records and their JSON rendering.
//!
//! Every rewrite rule reports its work as a list of [`Finding`]s: a
//! diagnostic span, a message and the edits that fix it. Findings are
//! expressed in original source coordinates and each finding's edits are
//! independently appliable.
//!
//! ## Design Principles
//!
//! 1. **Deterministic:** Findings are produced in discovery order (left to right)
//! 2. **Self-contained:** A finding carries every edit it needs, including import insertions
//! 3. **Stable identifiers:** Rule ids are kebab-case strings that never change

use std::fmt;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::patch::{Edit, Span};
use crate::text::byte_offset_to_position_str;
use crate::types::Location;

/// Identifier of the rule that produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleId {
    /// Chains of patched operators converted to `.pipe(...)`.
    #[serde(rename = "migrate-to-pipeable-operators")]
    PipeableOperators,
    /// `Observable.factory(...)` converted to aliased function calls.
    #[serde(rename = "rxjs-no-static-observable-methods")]
    StaticObservableMethods,
    /// Deprecated import paths and symbols.
    #[serde(rename = "update-rxjs-imports")]
    UpdateImports,
    /// Duplicate imports of one module merged into one statement.
    #[serde(rename = "collapse-rxjs-imports")]
    CollapseImports,
}

impl RuleId {
    /// Returns the kebab-case rule name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::PipeableOperators => "migrate-to-pipeable-operators",
            RuleId::StaticObservableMethods => "rxjs-no-static-observable-methods",
            RuleId::UpdateImports => "update-rxjs-imports",
            RuleId::CollapseImports => "collapse-rxjs-imports",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A diagnostic plus the edits that resolve it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// The rule that produced this finding.
    pub rule: RuleId,
    /// The region the diagnostic points at.
    pub span: Span,
    /// Human-readable message.
    pub message: String,
    /// Edits in original source coordinates.
    pub edits: Vec<Edit>,
}

impl Finding {
    /// Create a new finding.
    pub fn new(rule: RuleId, span: Span, message: impl Into<String>, edits: Vec<Edit>) -> Self {
        Finding {
            rule,
            span,
            message: message.into(),
            edits,
        }
    }

    /// Resolve this finding to a line/column report for `file`.
    pub fn to_report(&self, file: &str, source: &str) -> FindingReport {
        let (line, col) = byte_offset_to_position_str(source, self.span.start);
        FindingReport {
            rule: self.rule,
            message: self.message.clone(),
            location: Location::with_span(
                file,
                line,
                col,
                self.span.start as u64,
                self.span.end as u64,
            ),
            edits: self.edits.clone(),
        }
    }
}

/// A finding located by file, line and column, for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingReport {
    /// Rule identifier.
    pub rule: RuleId,
    /// Human-readable message.
    pub message: String,
    /// Where the diagnostic starts.
    pub location: Location,
    /// Edits in original source coordinates.
    pub edits: Vec<Edit>,
}

/// Write findings as pretty JSON followed by a newline.
pub fn emit_findings(reports: &[FindingReport], writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(reports).map_err(io::Error::other)?;
    writeln!(writer, "{}", json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_id_serializes_as_kebab_name() {
        let json = serde_json::to_string(&RuleId::CollapseImports).unwrap();
        assert_eq!(json, "\"collapse-rxjs-imports\"");
        assert_eq!(RuleId::CollapseImports.to_string(), "collapse-rxjs-imports");
    }

    #[test]
    fn report_resolves_line_and_column() {
        let source = "import a;\nfoo.map(f);\n";
        let finding = Finding::new(
            RuleId::PipeableOperators,
            Span::new(13, 20),
            "Prefer pipeable operators",
            vec![],
        );
        let report = finding.to_report("src/a.ts", source);
        assert_eq!(report.location.line, 2);
        assert_eq!(report.location.col, 4);
        assert_eq!(report.location.byte_end, Some(20));
    }

    #[test]
    fn emit_writes_json_array() {
        let finding = Finding::new(
            RuleId::UpdateImports,
            Span::new(0, 1),
            "outdated import path",
            vec![Edit::replace(Span::new(0, 1), "rxjs")],
        );
        let mut out = Vec::new();
        emit_findings(&[finding.to_report("a.ts", "x")], &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["rule"], "update-rxjs-imports");
        assert_eq!(value[0]["edits"][0]["text"], "rxjs");
    }
}
