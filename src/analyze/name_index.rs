use tracing::trace;

use super::{AnalysisState, Pass};
use crate::types::{Diagnostic, Schema, SemanticIssue};

/// Registers every declaration by name and reports duplicates.
pub struct NameIndexer;

impl Pass for NameIndexer {
    fn name(&self) -> &'static str {
        "name_index"
    }

    fn run<'a>(
        &self,
        schema: &'a Schema,
        state: &mut AnalysisState<'a>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        for decl in schema.declarations() {
            if state.definitions.insert(decl.name.as_str(), decl).is_some() {
                trace!(name = %decl.name, "duplicate definition");
                diagnostics.push(Diagnostic::new(
                    decl.location.clone(),
                    SemanticIssue::DuplicateDefinition {
                        name: decl.name.clone(),
                    },
                ));
            }
        }
    }
}
