//! Static analysis: the passes that turn a [`Schema`] into an [`Analysis`].
//!
//! Passes run in order over one shared [`AnalysisState`] and push problems
//! into a common diagnostic list. Analysis fails once, after every pass has
//! run, with all collected diagnostics.

mod cycles;
mod name_index;
mod toposort;
mod type_check;

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::types::{
    Analysis, Declaration, DependencyGraph, Diagnostic, ExecutableSchema, FunctionRegistry,
    LeafMap, Schema, SemanticError,
};

pub use cycles::CycleDetector;
pub use name_index::NameIndexer;
pub use toposort::Toposorter;
pub use type_check::TypeValidator;

/// Mutable state threaded through the analysis passes.
pub struct AnalysisState<'a> {
    pub registry: &'a FunctionRegistry,
    /// Name → declaration. On duplicates the last declaration wins.
    pub definitions: HashMap<&'a str, &'a Declaration>,
    pub dependency_graph: DependencyGraph,
    pub leaf_map: LeafMap,
    pub topo_order: Vec<String>,
}

impl<'a> AnalysisState<'a> {
    #[must_use]
    pub fn new(registry: &'a FunctionRegistry) -> Self {
        Self {
            registry,
            definitions: HashMap::new(),
            dependency_graph: DependencyGraph::new(),
            leaf_map: LeafMap::new(),
            topo_order: Vec::new(),
        }
    }
}

/// One step of static analysis.
pub trait Pass {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    fn run<'a>(
        &self,
        schema: &'a Schema,
        state: &mut AnalysisState<'a>,
        diagnostics: &mut Vec<Diagnostic>,
    );
}

/// The standard pipeline: names, types, cycles, then ordering.
#[must_use]
pub fn default_passes() -> Vec<Box<dyn Pass>> {
    vec![
        Box::new(NameIndexer),
        Box::new(TypeValidator),
        Box::new(CycleDetector),
        Box::new(Toposorter),
    ]
}

/// Runs a pass pipeline against a registry.
pub struct Analyzer<'r> {
    registry: &'r FunctionRegistry,
    passes: Vec<Box<dyn Pass>>,
}

impl<'r> Analyzer<'r> {
    #[must_use]
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self {
            registry,
            passes: default_passes(),
        }
    }

    /// Replace the pass pipeline.
    #[must_use]
    pub fn with_passes(mut self, passes: Vec<Box<dyn Pass>>) -> Self {
        self.passes = passes;
        self
    }

    /// Run every pass, then fail if any diagnostic was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`SemanticError`] carrying each distinct diagnostic in the
    /// order it was found.
    pub fn analyze(&self, schema: &Schema) -> Result<Analysis, SemanticError> {
        let mut state = AnalysisState::new(self.registry);
        let mut diagnostics = Vec::new();

        for pass in &self.passes {
            let before = diagnostics.len();
            pass.run(schema, &mut state, &mut diagnostics);
            debug!(
                pass = pass.name(),
                found = diagnostics.len() - before,
                "analysis pass finished"
            );
        }

        if !diagnostics.is_empty() {
            let diagnostics = dedup(diagnostics);
            debug!(count = diagnostics.len(), "analysis failed");
            return Err(SemanticError::new(diagnostics));
        }

        Ok(Analysis::new(
            state.dependency_graph,
            state.leaf_map,
            state.topo_order,
        ))
    }

    /// Analyze with this pipeline, then compile.
    ///
    /// # Errors
    ///
    /// See [`Analyzer::analyze`].
    pub fn compile(&self, schema: &Schema) -> Result<ExecutableSchema, SemanticError> {
        let analysis = self.analyze(schema)?;
        Ok(crate::compile::compile_analyzed(schema, analysis, self.registry))
    }
}

/// Analyze `schema` with the default passes.
///
/// # Errors
///
/// See [`Analyzer::analyze`].
pub fn analyze(schema: &Schema, registry: &FunctionRegistry) -> Result<Analysis, SemanticError> {
    Analyzer::new(registry).analyze(schema)
}

fn dedup(diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    let mut out: Vec<Diagnostic> = Vec::with_capacity(diagnostics.len());
    for diagnostic in diagnostics {
        if !out.contains(&diagnostic) {
            out.push(diagnostic);
        }
    }
    out
}

/// Graph nodes in declaration encounter order, followed by any node the
/// schema does not declare.
fn roots<'g>(schema: &Schema, graph: &'g DependencyGraph) -> Vec<&'g str> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(graph.len());
    let declared = schema
        .declarations()
        .filter_map(|d| graph.get_key_value(d.name.as_str()).map(|(k, _)| k));
    for name in declared.chain(graph.keys()) {
        if seen.insert(name.as_str()) {
            out.push(name.as_str());
        }
    }
    out
}
