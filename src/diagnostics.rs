//! Issue collection for a single generation pass.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How bad an issue is. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        f.write_str(label)
    }
}

/// What kind of problem an issue describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Malformed or unsupported schema shape (dangling ref, conflicting constraints)
    StructuralError,
    /// An identifier was suffixed to stay unique
    NamingCollisionResolved,
    /// A construct without a direct mapping; a documented fallback was used
    UnsupportedFeature,
    /// A reference to something the document does not declare (security schemes, mappings)
    UndefinedReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub message: String,
    /// JSON-pointer-like location inside the source document
    pub location: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.location, self.message)
    }
}

/// Flat, ordered list of issues produced during one generation pass.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    issues: Vec<Issue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: Issue) {
        match issue.severity {
            Severity::Info => tracing::debug!(location = %issue.location, "{}", issue.message),
            Severity::Warning => tracing::warn!(location = %issue.location, "{}", issue.message),
            Severity::Error | Severity::Critical => {
                tracing::warn!(severity = %issue.severity, location = %issue.location, "{}", issue.message)
            }
        }
        self.issues.push(issue);
    }

    fn record(
        &mut self,
        severity: Severity,
        kind: IssueKind,
        location: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(Issue {
            severity,
            kind,
            message: message.into(),
            location: location.into(),
        });
    }

    pub fn info(&mut self, kind: IssueKind, location: impl Into<String>, message: impl Into<String>) {
        self.record(Severity::Info, kind, location, message);
    }

    pub fn warning(
        &mut self,
        kind: IssueKind,
        location: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.record(Severity::Warning, kind, location, message);
    }

    pub fn error(&mut self, kind: IssueKind, location: impl Into<String>, message: impl Into<String>) {
        self.record(Severity::Error, kind, location, message);
    }

    pub fn critical(
        &mut self,
        kind: IssueKind,
        location: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.record(Severity::Critical, kind, location, message);
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// True when at least one issue is at `severity` or worse.
    pub fn has_at_least(&self, severity: Severity) -> bool {
        self.issues.iter().any(|i| i.severity >= severity)
    }

    /// A pass succeeds when it produced no Critical issue.
    pub fn is_success(&self) -> bool {
        !self.has_at_least(Severity::Critical)
    }

    /// Consume the collector. Info issues are dropped unless `include_info`.
    pub fn into_issues(self, include_info: bool) -> Vec<Issue> {
        if include_info {
            self.issues
        } else {
            self.issues
                .into_iter()
                .filter(|i| i.severity != Severity::Info)
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn success_means_no_critical() {
        let mut diags = Diagnostics::new();
        diags.warning(IssueKind::UnsupportedFeature, "#/a", "meh");
        diags.error(IssueKind::UndefinedReference, "#/b", "bad");
        assert!(diags.is_success());

        diags.critical(IssueKind::StructuralError, "#/c", "dangling");
        assert!(!diags.is_success());
        assert_eq!(diags.count(Severity::Critical), 1);
    }

    #[test]
    fn info_filtered_unless_requested() {
        let mut diags = Diagnostics::new();
        diags.info(IssueKind::NamingCollisionResolved, "#/x", "renamed");
        diags.warning(IssueKind::UnsupportedFeature, "#/y", "fallback");

        assert_eq!(diags.clone().into_issues(true).len(), 2);
        let filtered = diags.into_issues(false);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].severity, Severity::Warning);
    }

    #[test]
    fn display_includes_location() {
        let issue = Issue {
            severity: Severity::Critical,
            kind: IssueKind::StructuralError,
            message: "dangling $ref 'Missing'".to_string(),
            location: "#/components/schemas/Pet".to_string(),
        };
        assert_eq!(
            issue.to_string(),
            "[critical] #/components/schemas/Pet: dangling $ref 'Missing'"
        );
    }
}
