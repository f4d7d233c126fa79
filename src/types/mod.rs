mod analysis;
mod context;
mod decision_table;
mod error;
mod executable;
mod explain;
mod expr;
mod registry;
mod schema;
mod value;

pub use analysis::{Analysis, DependencyGraph, Leaf, LeafMap};
pub use context::{Context, Record};
pub use decision_table::{DecisionTable, Row};
pub use error::{Diagnostic, RuntimeError, SemanticError, SemanticIssue};
pub use executable::{BindingKind, Evaluation, ExecutableSchema};
pub(crate) use executable::{Branch, Evaluator, Resolve, Slot};
pub use explain::Explanation;
pub use expr::{Case, Expr, binding, call, cascade, field, list, lit};
pub use registry::{
    Arity, FunctionError, FunctionRegistry, NativeFn, RegistryError, Signature,
};
pub use schema::{DeclKind, Declaration, Location, Schema, SchemaBuilder};
pub use value::{CompareOp, Value};
