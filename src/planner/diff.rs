//! Diff engine for comparing deployed and candidate templates.
//!
//! This module computes a zero-context unified diff between the template the
//! stack currently runs and the template about to be submitted.

use similar::TextDiff;
use tracing::debug;

/// Engine for computing template diffs.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffEngine;

/// Display class of a diff line, taken from its first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    /// `@@ -a,b +c,d @@` hunk header.
    Header,
    /// Line only in the candidate.
    Added,
    /// Line only in the deployed template.
    Removed,
    /// Anything else.
    Context,
}

/// One rendered diff line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    /// Display class.
    pub kind: DiffLineKind,
    /// Line text including its leading marker.
    pub text: String,
}

/// Complete diff result.
#[derive(Debug, Default)]
pub struct TemplateDiff {
    /// Non-blank diff lines in output order.
    pub lines: Vec<DiffLine>,
    /// Number of added lines.
    pub additions: usize,
    /// Number of removed lines.
    pub removals: usize,
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Diffs the deployed template against the candidate. Carriage returns are
    /// stripped from the candidate before comparison.
    #[must_use]
    pub fn compute_diff(&self, deployed: &str, candidate: &str) -> TemplateDiff {
        let candidate = candidate.replace('\r', "");
        let unified = TextDiff::from_lines(deployed, candidate.as_str())
            .unified_diff()
            .context_radius(0)
            .missing_newline_hint(false)
            .to_string();

        let lines: Vec<DiffLine> = unified
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(DiffLine::classify)
            .collect();

        let additions = lines.iter().filter(|l| l.kind == DiffLineKind::Added).count();
        let removals = lines.iter().filter(|l| l.kind == DiffLineKind::Removed).count();
        debug!("Template diff: {additions} additions, {removals} removals");

        TemplateDiff {
            lines,
            additions,
            removals,
        }
    }
}

impl DiffLine {
    /// Classifies a line by its first character.
    #[must_use]
    pub fn classify(line: &str) -> Self {
        let kind = match line.chars().next() {
            Some('@') => DiffLineKind::Header,
            Some('+') => DiffLineKind::Added,
            Some('-') => DiffLineKind::Removed,
            _ => DiffLineKind::Context,
        };
        Self {
            kind,
            text: line.to_string(),
        }
    }
}

impl TemplateDiff {
    /// Returns true if the templates differ.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.additions > 0 || self.removals > 0
    }
}

impl std::fmt::Display for DiffLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}
