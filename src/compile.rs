use std::collections::{BTreeSet, HashMap};
use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

use crate::analyze::Analyzer;
use crate::types::{
    Analysis, Branch, DeclKind, Declaration, DecisionTable, Evaluator, ExecutableSchema, Expr,
    FunctionRegistry, NativeFn, Row, RuntimeError, Schema, SemanticError, Slot, Value,
};

pub(crate) fn compile(
    schema: &Schema,
    registry: &FunctionRegistry,
) -> Result<ExecutableSchema, SemanticError> {
    Analyzer::new(registry).compile(schema)
}

/// Lower an analyzed schema into slot-indexed evaluators.
///
/// Phase one assigns every name its topological slot, so phase two can wire
/// binding references to plain indices regardless of declaration order.
pub(crate) fn compile_analyzed(
    schema: &Schema,
    analysis: Analysis,
    registry: &FunctionRegistry,
) -> ExecutableSchema {
    let index: HashMap<String, usize> = analysis
        .topo_order()
        .iter()
        .enumerate()
        .map(|(slot, name)| (name.clone(), slot))
        .collect();

    let declarations: HashMap<&str, &Declaration> = schema
        .declarations()
        .map(|decl| (decl.name.as_str(), decl))
        .collect();

    let compiler = Compiler {
        index: &index,
        declarations: &declarations,
        registry,
    };

    let slots: Vec<Slot> = analysis
        .topo_order()
        .iter()
        .map(|name| compiler.slot(name))
        .collect();

    let trait_slots = slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.kind == DeclKind::Trait)
        .map(|(i, _)| i)
        .collect();

    debug!(
        bindings = slots.len(),
        decision_tables = slots.iter().filter(|s| s.table.is_some()).count(),
        "schema compiled"
    );

    ExecutableSchema {
        slots,
        index,
        trait_slots,
        analysis,
    }
}

struct Compiler<'c> {
    index: &'c HashMap<String, usize>,
    declarations: &'c HashMap<&'c str, &'c Declaration>,
    registry: &'c FunctionRegistry,
}

impl Compiler<'_> {
    fn slot(&self, name: &str) -> Slot {
        let Some(decl) = self.declarations.get(name) else {
            return Slot {
                name: name.to_owned(),
                kind: DeclKind::Attribute,
                description: String::new(),
                evaluator: unresolved(name),
                table: None,
            };
        };
        let (evaluator, description) = match &decl.expression {
            Some(expr) => (self.expr(expr), expr.to_string()),
            None => (unresolved(name), String::new()),
        };
        let table = match (&decl.kind, &decl.expression) {
            (DeclKind::Attribute, Some(expr)) => self.decision_table(expr),
            _ => None,
        };
        Slot {
            name: decl.name.clone(),
            kind: decl.kind,
            description,
            evaluator,
            table,
        }
    }

    fn expr(&self, expr: &Expr) -> Evaluator {
        match expr {
            Expr::Literal(value) => {
                let value = value.clone();
                Box::new(move |_, _| Ok(value.clone()))
            }
            Expr::Field(name) => {
                let name = name.clone();
                Box::new(move |ctx, _| {
                    ctx.get(&name).ok_or_else(|| RuntimeError::MissingField {
                        field: name.clone(),
                        available: ctx.keys(),
                    })
                })
            }
            Expr::Binding(name) => match self.index.get(name) {
                Some(&slot) => Box::new(move |ctx, resolver| resolver.resolve(slot, ctx)),
                None => unresolved(name),
            },
            Expr::List(items) => {
                let items: Vec<Evaluator> = items.iter().map(|e| self.expr(e)).collect();
                Box::new(move |ctx, resolver| {
                    items
                        .iter()
                        .map(|item| item(ctx, &mut *resolver))
                        .collect::<Result<Vec<_>, _>>()
                        .map(Value::List)
                })
            }
            Expr::Call { function, args } => {
                let name = function.clone();
                let callable = self.registry.fetch(function).ok();
                let args: Vec<Evaluator> = args.iter().map(|e| self.expr(e)).collect();
                Box::new(move |ctx, resolver| {
                    let mut values = Vec::with_capacity(args.len());
                    for arg in &args {
                        values.push(arg(ctx, &mut *resolver)?);
                    }
                    let callable = callable
                        .as_ref()
                        .ok_or_else(|| RuntimeError::UnknownFunction { name: name.clone() })?;
                    invoke(&name, callable, &values)
                })
            }
            Expr::Cascade { cases, default } => {
                let arms: Vec<(Evaluator, Evaluator)> = cases
                    .iter()
                    .map(|case| (self.expr(&case.condition), self.expr(&case.result)))
                    .collect();
                let default = default.as_deref().map(|e| self.expr(e));
                Box::new(move |ctx, resolver| {
                    for (condition, result) in &arms {
                        if condition(ctx, &mut *resolver)?.is_truthy() {
                            return result(ctx, resolver);
                        }
                    }
                    match &default {
                        Some(default) => default(ctx, resolver),
                        None => Ok(Value::Null),
                    }
                })
            }
        }
    }

    /// Build a decision table for a cascade whose every condition is a plain
    /// conjunction of trait references. Anything else stays a lazy cascade only.
    fn decision_table(&self, expr: &Expr) -> Option<DecisionTable<Branch>> {
        let Expr::Cascade { cases, default } = expr else {
            return None;
        };
        if cases.is_empty() {
            return None;
        }

        let mut rows = Vec::with_capacity(cases.len() + 1);
        for case in cases {
            let required = self.required_traits(&case.condition)?;
            let description = format!(
                "row [{}] => {}",
                required.iter().map(String::as_str).collect::<Vec<_>>().join(", "),
                case.result
            );
            rows.push(Row::new(
                required,
                Branch {
                    description,
                    evaluator: self.expr(&case.result),
                },
            ));
        }

        let fallback = match default.as_deref() {
            Some(default) => Branch {
                description: format!("default => {default}"),
                evaluator: self.expr(default),
            },
            None => Branch {
                description: "default => null".to_owned(),
                evaluator: Box::new(|_, _| Ok(Value::Null)),
            },
        };
        rows.push(Row::new(Vec::<String>::new(), fallback));

        Some(DecisionTable::new(rows))
    }

    fn required_traits(&self, condition: &Expr) -> Option<BTreeSet<String>> {
        match condition {
            Expr::Literal(Value::Bool(true)) => Some(BTreeSet::new()),
            Expr::Binding(name) if self.is_trait(name) => Some(BTreeSet::from([name.clone()])),
            Expr::Call { function, args } if function == "and" || function == "all?" => {
                let refs = match args.as_slice() {
                    [Expr::List(items)] => items.as_slice(),
                    _ => args.as_slice(),
                };
                refs.iter()
                    .map(|arg| match arg {
                        Expr::Binding(name) if self.is_trait(name) => Some(name.clone()),
                        _ => None,
                    })
                    .collect()
            }
            _ => None,
        }
    }

    fn is_trait(&self, name: &str) -> bool {
        self.declarations
            .get(name)
            .is_some_and(|decl| decl.kind == DeclKind::Trait)
    }
}

/// Host callables are opaque: a panic inside one is reported like any other
/// callable failure.
fn invoke(name: &str, callable: &NativeFn, args: &[Value]) -> Result<Value, RuntimeError> {
    let message = match panic::catch_unwind(AssertUnwindSafe(|| callable(args))) {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(err)) => err.to_string(),
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "function panicked".to_owned()),
    };
    Err(RuntimeError::Call {
        function: name.to_owned(),
        message,
    })
}

fn unresolved(name: &str) -> Evaluator {
    let name = name.to_owned();
    Box::new(move |_, _| Err(RuntimeError::UnresolvedBinding { name: name.clone() }))
}
