use std::collections::HashMap;

use super::{AnalysisState, Pass, roots};
use crate::types::{DependencyGraph, Diagnostic, Schema, SemanticIssue};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Orders declarations so every dependency precedes its dependents.
///
/// Post-order DFS rooted in declaration order, so the result is stable for a
/// given schema. Re-entering an in-progress node is reported as a cycle.
pub struct Toposorter;

impl Pass for Toposorter {
    fn name(&self) -> &'static str {
        "toposort"
    }

    fn run<'a>(
        &self,
        schema: &'a Schema,
        state: &mut AnalysisState<'a>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let graph = &state.dependency_graph;
        let mut marks = HashMap::with_capacity(graph.len());
        let mut path = Vec::new();
        let mut order = Vec::with_capacity(graph.len());
        let mut cycles = Vec::new();
        for root in roots(schema, graph) {
            visit(root, graph, &mut marks, &mut path, &mut order, &mut cycles);
        }
        for cycle in cycles {
            let location = state
                .definitions
                .get(cycle[0].as_str())
                .and_then(|decl| decl.location.clone());
            diagnostics.push(Diagnostic::new(location, SemanticIssue::Cycle { path: cycle }));
        }
        state.topo_order = order;
    }
}

fn visit<'g>(
    node: &'g str,
    graph: &'g DependencyGraph,
    marks: &mut HashMap<&'g str, Mark>,
    path: &mut Vec<&'g str>,
    order: &mut Vec<String>,
    cycles: &mut Vec<Vec<String>>,
) {
    match marks.get(node) {
        Some(Mark::Done) => return,
        Some(Mark::InProgress) => {
            let start = path.iter().position(|&n| n == node).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(|&n| n.to_owned()).collect();
            cycle.push(node.to_owned());
            cycles.push(cycle);
            return;
        }
        None => {}
    }

    marks.insert(node, Mark::InProgress);
    path.push(node);
    for next in graph.get(node).into_iter().flatten() {
        visit(next.as_str(), graph, marks, path, order, cycles);
    }
    path.pop();
    marks.insert(node, Mark::Done);
    order.push(node.to_owned());
}
