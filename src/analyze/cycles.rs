use std::collections::HashSet;

use super::{AnalysisState, Pass, roots};
use crate::types::{DependencyGraph, Diagnostic, Schema, SemanticIssue};

/// Depth-first search for back edges in the dependency graph.
///
/// Each back edge is reported as its own cycle, with the path running from
/// the first repeated node back to itself.
pub struct CycleDetector;

impl Pass for CycleDetector {
    fn name(&self) -> &'static str {
        "cycles"
    }

    fn run<'a>(
        &self,
        schema: &'a Schema,
        state: &mut AnalysisState<'a>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let graph = &state.dependency_graph;
        let mut visited = HashSet::new();
        let mut stack = Vec::new();
        let mut paths = Vec::new();
        for root in roots(schema, graph) {
            detect(root, graph, &mut visited, &mut stack, &mut paths);
        }
        for path in paths {
            let location = state
                .definitions
                .get(path[0].as_str())
                .and_then(|decl| decl.location.clone());
            diagnostics.push(Diagnostic::new(location, SemanticIssue::Cycle { path }));
        }
    }
}

fn detect<'g>(
    node: &'g str,
    graph: &'g DependencyGraph,
    visited: &mut HashSet<&'g str>,
    stack: &mut Vec<&'g str>,
    paths: &mut Vec<Vec<String>>,
) {
    if !visited.insert(node) {
        return;
    }
    stack.push(node);
    for next in graph.get(node).into_iter().flatten() {
        if let Some(pos) = stack.iter().position(|&n| n == next.as_str()) {
            let mut path: Vec<String> = stack[pos..].iter().map(|&n| n.to_owned()).collect();
            path.push(next.clone());
            paths.push(path);
        } else {
            detect(next.as_str(), graph, visited, stack, paths);
        }
    }
    stack.pop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FunctionRegistry;

    fn graph(edges: &[(&str, &[&str])]) -> DependencyGraph {
        edges
            .iter()
            .map(|(from, to)| {
                (
                    (*from).to_owned(),
                    to.iter().map(|&t| t.to_owned()).collect(),
                )
            })
            .collect()
    }

    fn cycles(g: DependencyGraph) -> Vec<Vec<String>> {
        let registry = FunctionRegistry::new();
        let schema = Schema::default();
        let mut state = AnalysisState::new(&registry);
        state.dependency_graph = g;
        let mut diagnostics = Vec::new();
        CycleDetector.run(&schema, &mut state, &mut diagnostics);
        diagnostics
            .into_iter()
            .map(|d| match d.issue {
                SemanticIssue::Cycle { path } => path,
                other => panic!("unexpected issue {other}"),
            })
            .collect()
    }

    #[test]
    fn acyclic_graph_is_clean() {
        let g = graph(&[("a", &["b", "c"]), ("b", &["c"]), ("c", &[])]);
        assert!(cycles(g).is_empty());
    }

    #[test]
    fn two_node_cycle() {
        let g = graph(&[("a", &["b"]), ("b", &["a"])]);
        assert_eq!(cycles(g), vec![vec!["a", "b", "a"]]);
    }

    #[test]
    fn path_starts_at_repeated_node() {
        let g = graph(&[("root", &["a"]), ("a", &["b"]), ("b", &["a"])]);
        assert_eq!(cycles(g), vec![vec!["a", "b", "a"]]);
    }

    #[test]
    fn self_loop() {
        let g = graph(&[("a", &["a"])]);
        assert_eq!(cycles(g), vec![vec!["a", "a"]]);
    }
}
