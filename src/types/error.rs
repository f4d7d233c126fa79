use std::fmt;

use thiserror::Error;

use super::schema::{DeclKind, Location};

/// A single problem found by static analysis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticIssue {
    #[error("duplicated definition '{name}'")]
    DuplicateDefinition { name: String },

    #[error("{kind} '{name}' requires an expression")]
    MissingExpression { kind: DeclKind, name: String },

    #[error("trait '{name}' must wrap a CallExpression")]
    TraitNotCall { name: String },

    #[error("undefined reference to '{name}'")]
    UndefinedReference { name: String },

    #[error("unsupported operator '{function}'")]
    UnsupportedOperator { function: String },

    #[error("operator '{function}' expects {expected} args, got {actual}")]
    ArityMismatch {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("cycle detected: {}", path.join(" → "))]
    Cycle { path: Vec<String> },
}

/// A [`SemanticIssue`] together with where it was found, when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub location: Option<Location>,
    pub issue: SemanticIssue,
}

impl Diagnostic {
    #[must_use]
    pub fn new(location: Option<Location>, issue: SemanticIssue) -> Self {
        Self { location, issue }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "at {loc}: {}", self.issue),
            None => write!(f, "{}", self.issue),
        }
    }
}

/// Every diagnostic collected during one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join_lines(diagnostics))]
pub struct SemanticError {
    diagnostics: Vec<Diagnostic>,
}

impl SemanticError {
    pub(crate) fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Iterate over the bare issues, without locations.
    pub fn issues(&self) -> impl Iterator<Item = &SemanticIssue> {
        self.diagnostics.iter().map(|d| &d.issue)
    }
}

fn join_lines(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Failures raised while evaluating a compiled schema. Evaluation stops at the
/// first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("key '{field}' not found in context; available: [{}]", available.join(", "))]
    MissingField {
        field: String,
        available: Vec<String>,
    },

    #[error("unresolved binding '{name}'")]
    UnresolvedBinding { name: String },

    #[error("no binding named '{name}'")]
    UnknownBinding { name: String },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("error calling '{function}': {message}")]
    Call { function: String, message: String },

    #[error("evaluation context must be a mapping, got {found}")]
    InvalidContext { found: String },

    #[error("dependency cycle detected: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("no decision-table match for satisfied traits [{}]", satisfied.join(", "))]
    NoDecisionMatch { satisfied: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_definition_message() {
        let issue = SemanticIssue::DuplicateDefinition { name: "foo".into() };
        assert_eq!(issue.to_string(), "duplicated definition 'foo'");
    }

    #[test]
    fn missing_expression_message() {
        let issue = SemanticIssue::MissingExpression {
            kind: DeclKind::Attribute,
            name: "tier".into(),
        };
        assert_eq!(issue.to_string(), "attribute 'tier' requires an expression");
    }

    #[test]
    fn arity_mismatch_message() {
        let issue = SemanticIssue::ArityMismatch {
            function: ">=".into(),
            expected: 2,
            actual: 3,
        };
        assert_eq!(issue.to_string(), "operator '>=' expects 2 args, got 3");
    }

    #[test]
    fn cycle_message() {
        let issue = SemanticIssue::Cycle {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(issue.to_string(), "cycle detected: a → b → a");
    }

    #[test]
    fn diagnostic_with_and_without_location() {
        let issue = SemanticIssue::UndefinedReference {
            name: "missing".into(),
        };
        let located = Diagnostic::new(Some(Location::new("s.yml", 4, 2)), issue.clone());
        assert_eq!(
            located.to_string(),
            "at s.yml:4:2: undefined reference to 'missing'"
        );
        let bare = Diagnostic::new(None, issue);
        assert_eq!(bare.to_string(), "undefined reference to 'missing'");
    }

    #[test]
    fn semantic_error_joins_one_per_line() {
        let err = SemanticError::new(vec![
            Diagnostic::new(None, SemanticIssue::DuplicateDefinition { name: "a".into() }),
            Diagnostic::new(
                None,
                SemanticIssue::UnsupportedOperator {
                    function: "zap".into(),
                },
            ),
        ]);
        assert_eq!(
            err.to_string(),
            "duplicated definition 'a'\nunsupported operator 'zap'"
        );
        assert_eq!(err.issues().count(), 2);
    }

    #[test]
    fn missing_field_lists_available_keys() {
        let err = RuntimeError::MissingField {
            field: "age".into(),
            available: vec!["name".into(), "tier".into()],
        };
        assert_eq!(
            err.to_string(),
            "key 'age' not found in context; available: [name, tier]"
        );
    }

    #[test]
    fn runtime_cycle_message() {
        let err = RuntimeError::Cycle {
            path: vec!["x".into(), "y".into(), "x".into()],
        };
        assert_eq!(err.to_string(), "dependency cycle detected: x -> y -> x");
    }
}
