use super::{AnalysisState, Pass};
use crate::types::{
    Arity, DeclKind, Declaration, Diagnostic, Expr, Leaf, Schema, SemanticIssue,
};

/// Checks expression shapes, references and operator arities, and builds
/// the dependency graph and leaf map along the way.
///
/// Every declaration gets a graph entry, even when it references nothing.
pub struct TypeValidator;

impl Pass for TypeValidator {
    fn name(&self) -> &'static str {
        "type_check"
    }

    fn run<'a>(
        &self,
        schema: &'a Schema,
        state: &mut AnalysisState<'a>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        for decl in schema.declarations() {
            state.dependency_graph.entry(decl.name.clone()).or_default();

            match (&decl.expression, decl.kind) {
                (Some(Expr::Call { .. }), DeclKind::Trait) => {}
                (_, DeclKind::Trait) => report(
                    diagnostics,
                    decl,
                    SemanticIssue::TraitNotCall {
                        name: decl.name.clone(),
                    },
                ),
                (None, kind) => report(
                    diagnostics,
                    decl,
                    SemanticIssue::MissingExpression {
                        kind,
                        name: decl.name.clone(),
                    },
                ),
                (Some(_), _) => {}
            }

            if let Some(expr) = &decl.expression {
                visit(expr, decl, state, diagnostics);
            }
        }
    }
}

/// Pre-order walk: a node is checked before its children.
fn visit(
    expr: &Expr,
    decl: &Declaration,
    state: &mut AnalysisState<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match expr {
        Expr::Binding(name) => {
            if state.definitions.contains_key(name.as_str()) {
                state
                    .dependency_graph
                    .entry(decl.name.clone())
                    .or_default()
                    .insert(name.clone());
            } else {
                report(
                    diagnostics,
                    decl,
                    SemanticIssue::UndefinedReference { name: name.clone() },
                );
            }
        }
        Expr::Call { function, args } => match state.registry.signature(function) {
            Err(_) => report(
                diagnostics,
                decl,
                SemanticIssue::UnsupportedOperator {
                    function: function.clone(),
                },
            ),
            Ok(signature) => {
                if let Arity::Fixed(expected) = signature.arity {
                    if expected != args.len() {
                        report(
                            diagnostics,
                            decl,
                            SemanticIssue::ArityMismatch {
                                function: function.clone(),
                                expected,
                                actual: args.len(),
                            },
                        );
                    }
                }
            }
        },
        Expr::Field(name) => record_leaf(state, decl, Leaf::Field(name.clone())),
        Expr::Literal(value) => record_leaf(state, decl, Leaf::Literal(value.clone())),
        Expr::List(_) | Expr::Cascade { .. } => {}
    }

    for child in expr.children() {
        visit(child, decl, state, diagnostics);
    }
}

fn record_leaf(state: &mut AnalysisState<'_>, decl: &Declaration, leaf: Leaf) {
    let leaves = state.leaf_map.entry(decl.name.clone()).or_default();
    if !leaves.contains(&leaf) {
        leaves.push(leaf);
    }
}

fn report(diagnostics: &mut Vec<Diagnostic>, decl: &Declaration, issue: SemanticIssue) {
    diagnostics.push(Diagnostic::new(decl.location.clone(), issue));
}
