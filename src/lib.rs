mod analyze;
mod builtins;
mod compile;
mod error;
mod evaluate;
mod processor;
mod types;

pub use analyze::{
    AnalysisState, Analyzer, CycleDetector, NameIndexer, Pass, Toposorter, TypeValidator, analyze,
    default_passes,
};
pub use error::Error;
pub use processor::Processor;
pub use types::{
    Analysis, Arity, BindingKind, Case, CompareOp, Context, DeclKind, Declaration, DecisionTable,
    DependencyGraph, Diagnostic, Evaluation, ExecutableSchema, Explanation, Expr, FunctionError,
    FunctionRegistry, Leaf, LeafMap, Location, NativeFn, Record, RegistryError, Row, RuntimeError,
    Schema, SchemaBuilder, SemanticError, SemanticIssue, Signature, Value, binding, call, cascade,
    field, list, lit,
};
