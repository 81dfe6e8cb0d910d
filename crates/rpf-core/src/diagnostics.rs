//! Structured issues raised while evaluating a scenario.
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::object::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingInput,
    InvalidInput,
    MissingDependency,
    /// Object was not evaluated because something it consumes failed
    UpstreamFailed,
    /// Zero rate/term/denominator replaced by a neutral value
    NumericGuard,
    /// Arithmetic left Decimal range or divided by zero; the object failed
    NumericFailure,
    SourcesUsesMismatch,
    IrrNotConverged,
    IrrUndefined,
    ConfigurationNote,
}

impl IssueKind {
    /// Whether the issue stopped the object from producing outputs.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            IssueKind::MissingInput
                | IssueKind::InvalidInput
                | IssueKind::MissingDependency
                | IssueKind::NumericFailure
                | IssueKind::UpstreamFailed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub object: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub kind: IssueKind,
    pub message: String,
}

impl Issue {
    pub fn from_error(object: ObjectId, err: &EngineError) -> Self {
        let kind = match err {
            EngineError::MissingInput { .. } => IssueKind::MissingInput,
            EngineError::MissingDependency { .. } => IssueKind::MissingDependency,
            EngineError::DivisionByZero { .. } | EngineError::NumericOverflow { .. } => {
                IssueKind::NumericFailure
            }
            _ => IssueKind::InvalidInput,
        };
        Issue {
            object,
            field: err.field().map(str::to_string),
            kind,
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "[{}.{}] {}", self.object, field, self.message),
            None => write!(f, "[{}] {}", self.object, self.message),
        }
    }
}

/// Collects issues for one evaluation pass and mirrors them to the log.
#[derive(Debug, Default)]
pub struct Diagnostics {
    issues: Vec<Issue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: Issue) {
        if issue.kind == IssueKind::ConfigurationNote {
            tracing::info!(object = %issue.object, field = ?issue.field, "{}", issue.message);
        } else {
            tracing::warn!(object = %issue.object, field = ?issue.field, kind = ?issue.kind, "{}", issue.message);
        }
        self.issues.push(issue);
    }

    /// Record a numeric guard that replaced an undefined result with a neutral value.
    pub fn guard(&mut self, object: ObjectId, field: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(object = %object, field, "numeric guard: {message}");
        self.issues.push(Issue {
            object,
            field: Some(field.to_string()),
            kind: IssueKind::NumericGuard,
            message,
        });
    }

    pub fn note(&mut self, object: ObjectId, kind: IssueKind, field: Option<&str>, message: impl Into<String>) {
        self.push(Issue {
            object,
            field: field.map(str::to_string),
            kind,
            message: message.into(),
        });
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_map_to_issue_kinds() {
        let missing = EngineError::MissingInput {
            object: "capex".into(),
            field: "total_capex".into(),
        };
        let issue = Issue::from_error(ObjectId::Capex, &missing);
        assert_eq!(issue.kind, IssueKind::MissingInput);
        assert_eq!(issue.field.as_deref(), Some("total_capex"));

        let div = EngineError::DivisionByZero {
            context: "NPV discount factor".into(),
        };
        assert_eq!(Issue::from_error(ObjectId::CashflowSummary, &div).kind, IssueKind::NumericFailure);

        let overflow = EngineError::overflow("toll escalation");
        let issue = Issue::from_error(ObjectId::ContractedRevenue, &overflow);
        assert_eq!(issue.kind, IssueKind::NumericFailure);
        assert!(issue.kind.is_fatal());
        assert!(issue.field.is_none());
    }

    #[test]
    fn test_guard_is_not_fatal() {
        let mut diag = Diagnostics::new();
        diag.guard(ObjectId::DebtSizing, "debt_rate", "zero rate");
        let issues = diag.into_issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::NumericGuard);
        assert!(!issues[0].kind.is_fatal());
        assert_eq!(issues[0].to_string(), "[debt_sizing.debt_rate] zero rate");
    }
}
