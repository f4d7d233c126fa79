//! Memoizing evaluation session with dependency tracing.

use std::collections::{BTreeSet, HashMap};

use tracing::trace;

use crate::evaluate::{check_context, cycle};
use crate::types::{Context, ExecutableSchema, Explanation, Resolve, RuntimeError, Value};

struct Frame {
    slot: usize,
    deps: Vec<usize>,
}

struct Trace {
    resolver: String,
    deps: Vec<usize>,
}

/// A single-context evaluation session over an [`ExecutableSchema`].
///
/// Each binding is computed at most once per session. Attributes compiled
/// with a decision table resolve through it, using the set of traits that
/// hold in this context. Every resolution records which bindings it
/// consulted, so [`explain`](Self::explain) can report the full derivation.
///
/// Sessions are cheap and not shared: open one per context.
///
/// # Example
///
/// ```
/// use traitgraph::{FunctionRegistry, Record, Schema, Value, binding, cascade, field, lit};
///
/// let compiled = Schema::builder()
///     .define_trait("adult", field("age").gte(18_i64))
///     .define_attribute(
///         "tier",
///         cascade(vec![(binding("adult"), lit("Standard"))], Some(lit("Minor"))),
///     )
///     .compile(&FunctionRegistry::with_builtins())
///     .unwrap();
///
/// let ctx = Record::new().set("age", 30_i64);
/// let mut session = compiled.processor(&ctx).unwrap();
/// assert_eq!(session.resolve("tier").unwrap(), Value::from("Standard"));
/// println!("{}", session.explain("tier").unwrap());
/// ```
pub struct Processor<'s> {
    schema: &'s ExecutableSchema,
    ctx: &'s dyn Context,
    memo: HashMap<usize, Value>,
    trace: HashMap<usize, Trace>,
    frames: Vec<Frame>,
}

impl<'s> Processor<'s> {
    /// # Errors
    ///
    /// Returns [`RuntimeError::InvalidContext`] if `ctx` is not a mapping.
    pub fn new(schema: &'s ExecutableSchema, ctx: &'s dyn Context) -> Result<Self, RuntimeError> {
        check_context(ctx)?;
        Ok(Self {
            schema,
            ctx,
            memo: HashMap::new(),
            trace: HashMap::new(),
            frames: Vec::new(),
        })
    }

    /// Value of the named binding, computing it (and its dependencies) on
    /// first use.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownBinding`] for names the schema does not
    /// define, [`RuntimeError::Cycle`] if resolution re-enters a binding that
    /// is still in progress, or any error raised while evaluating.
    pub fn resolve(&mut self, name: &str) -> Result<Value, RuntimeError> {
        let slot = self.schema.slot_of(name)?;
        let ctx = self.ctx;
        Resolve::resolve(self, slot, ctx)
    }

    /// Names of every trait whose value is truthy in this context.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while resolving a trait.
    pub fn satisfied_traits(&mut self) -> Result<BTreeSet<String>, RuntimeError> {
        let ctx = self.ctx;
        self.satisfied(ctx)
    }

    /// Resolve `name` and return the tree of bindings that produced its value.
    ///
    /// # Errors
    ///
    /// See [`resolve`](Self::resolve).
    pub fn explain(&mut self, name: &str) -> Result<Explanation, RuntimeError> {
        let slot = self.schema.slot_of(name)?;
        self.resolve(name)?;
        Ok(self.explanation(slot))
    }

    /// Whether `name` has already been computed in this session.
    #[must_use]
    pub fn is_resolved(&self, name: &str) -> bool {
        self.schema
            .index
            .get(name)
            .is_some_and(|slot| self.memo.contains_key(slot))
    }

    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.memo.len()
    }

    fn satisfied(&mut self, ctx: &dyn Context) -> Result<BTreeSet<String>, RuntimeError> {
        let schema = self.schema;
        let mut satisfied = BTreeSet::new();
        for &slot in &schema.trait_slots {
            if Resolve::resolve(self, slot, ctx)?.is_truthy() {
                satisfied.insert(schema.slots[slot].name.clone());
            }
        }
        Ok(satisfied)
    }

    fn compute(&mut self, slot: usize, ctx: &dyn Context) -> Result<(Value, String), RuntimeError> {
        let schema = self.schema;
        let entry = &schema.slots[slot];
        match &entry.table {
            Some(table) => {
                let satisfied = self.satisfied(ctx)?;
                let branch = table.pick_row(&satisfied)?.resolver();
                let value = (branch.evaluator)(ctx, self)?;
                Ok((value, branch.description.clone()))
            }
            None => {
                let value = (entry.evaluator)(ctx, self)?;
                Ok((value, entry.description.clone()))
            }
        }
    }

    fn explanation(&self, slot: usize) -> Explanation {
        let entry = &self.schema.slots[slot];
        let trace = self.trace.get(&slot);
        Explanation {
            name: entry.name.clone(),
            kind: entry.kind,
            value: self.memo.get(&slot).cloned().unwrap_or_default(),
            resolver: trace.map_or_else(|| entry.description.clone(), |t| t.resolver.clone()),
            dependencies: trace
                .map(|t| {
                    t.deps
                        .iter()
                        .filter(|&&dep| self.memo.contains_key(&dep))
                        .map(|&dep| self.explanation(dep))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

impl Resolve for Processor<'_> {
    fn resolve(&mut self, slot: usize, ctx: &dyn Context) -> Result<Value, RuntimeError> {
        if let Some(frame) = self.frames.last_mut() {
            if !frame.deps.contains(&slot) {
                frame.deps.push(slot);
            }
        }

        let schema = self.schema;
        if let Some(value) = self.memo.get(&slot) {
            trace!(binding = %schema.slots[slot].name, "memo hit");
            return Ok(value.clone());
        }

        if self.frames.iter().any(|f| f.slot == slot) {
            let stack: Vec<usize> = self.frames.iter().map(|f| f.slot).collect();
            return Err(cycle(&schema.slots, &stack, slot));
        }

        self.frames.push(Frame {
            slot,
            deps: Vec::new(),
        });
        let outcome = self.compute(slot, ctx);
        let deps = self.frames.pop().map(|f| f.deps).unwrap_or_default();
        let (value, resolver) = outcome?;

        trace!(binding = %schema.slots[slot].name, value = %value, "resolved");
        self.trace.insert(slot, Trace { resolver, deps });
        self.memo.insert(slot, value.clone());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FunctionRegistry, Schema, binding, call, cascade, field, lit};
    use crate::Record;

    fn tiers() -> ExecutableSchema {
        Schema::builder()
            .define_trait("adult", field("age").gte(18_i64))
            .define_trait("senior", field("age").gte(65_i64))
            .define_attribute(
                "tier",
                cascade(
                    vec![
                        (call("and", vec![binding("adult"), binding("senior")]), lit("Gold")),
                        (binding("adult"), lit("Standard")),
                    ],
                    Some(lit("Minor")),
                ),
            )
            .compile(&FunctionRegistry::with_builtins())
            .unwrap()
    }

    #[test]
    fn decision_table_picks_matching_row() {
        let schema = tiers();
        for (age, expected) in [(70_i64, "Gold"), (30, "Standard"), (10, "Minor")] {
            let ctx = Record::new().set("age", age);
            let mut session = schema.processor(&ctx).unwrap();
            assert_eq!(session.resolve("tier").unwrap(), Value::from(expected));
        }
    }

    #[test]
    fn memoizes_each_binding_once() {
        let schema = tiers();
        let ctx = Record::new().set("age", 30_i64);
        let mut session = Processor::new(&schema, &ctx).unwrap();
        assert!(!session.is_resolved("adult"));
        session.resolve("tier").unwrap();
        assert!(session.is_resolved("adult"));
        assert!(session.is_resolved("senior"));
        assert_eq!(session.resolved_count(), 3);
        session.resolve("tier").unwrap();
        assert_eq!(session.resolved_count(), 3);
    }

    #[test]
    fn satisfied_traits_only_truthy() {
        let schema = tiers();
        let ctx = Record::new().set("age", 30_i64);
        let mut session = schema.processor(&ctx).unwrap();
        let satisfied: Vec<String> = session.satisfied_traits().unwrap().into_iter().collect();
        assert_eq!(satisfied, vec!["adult"]);
    }

    #[test]
    fn explain_lists_consulted_traits() {
        let schema = tiers();
        let ctx = Record::new().set("age", 30_i64);
        let mut session = schema.processor(&ctx).unwrap();
        let explanation = session.explain("tier").unwrap();
        assert_eq!(explanation.value, Value::from("Standard"));
        assert_eq!(explanation.resolver, "row [adult] => \"Standard\"");
        let deps: Vec<&str> = explanation
            .dependencies
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(deps, vec!["adult", "senior"]);
        assert_eq!(
            explanation.find("adult").map(|e| e.resolver.as_str()),
            Some(">=(field:age, 18)")
        );
    }

    #[test]
    fn unknown_name() {
        let schema = tiers();
        let ctx = Record::new();
        let mut session = schema.processor(&ctx).unwrap();
        assert_eq!(
            session.resolve("nope").unwrap_err(),
            RuntimeError::UnknownBinding {
                name: "nope".into()
            }
        );
    }

    #[test]
    fn trait_reading_a_table_attribute_is_a_runtime_cycle() {
        // Statically acyclic, but the table needs every trait, including one
        // that reads the table attribute itself.
        let schema = Schema::builder()
            .define_trait("adult", field("age").gte(18_i64))
            .define_trait("premium", binding("tier").eq("Standard"))
            .define_attribute(
                "tier",
                cascade(vec![(binding("adult"), lit("Standard"))], Some(lit("Minor"))),
            )
            .compile(&FunctionRegistry::with_builtins())
            .unwrap();
        let ctx = Record::new().set("age", 30_i64);

        let mut session = schema.processor(&ctx).unwrap();
        let err = session.resolve("tier").unwrap_err();
        assert!(matches!(err, RuntimeError::Cycle { .. }), "{err}");
        assert_eq!(
            err.to_string(),
            "dependency cycle detected: tier -> premium -> tier"
        );

        // A failed resolution leaves the session usable.
        assert_eq!(session.resolve("adult").unwrap(), Value::Bool(true));

        // The plain path follows the cascade directly and has no such cycle.
        assert_eq!(
            schema.evaluate_binding("tier", &ctx).unwrap(),
            Value::from("Standard")
        );
    }

    #[test]
    fn rejects_non_mapping_context() {
        let schema = tiers();
        let ctx = Value::from("scalar");
        assert!(matches!(
            schema.processor(&ctx),
            Err(RuntimeError::InvalidContext { .. })
        ));
    }
}
