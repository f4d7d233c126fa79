use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::analysis::{Analysis, Leaf};
use super::context::Context;
use super::decision_table::DecisionTable;
use super::error::RuntimeError;
use super::schema::DeclKind;
use super::value::Value;
use crate::processor::Processor;

/// Kind of a compiled binding.
pub type BindingKind = DeclKind;

/// A compiled expression body. Binding references go through the
/// [`Resolve`] implementation of whoever drives evaluation.
pub(crate) type Evaluator =
    Box<dyn Fn(&dyn Context, &mut dyn Resolve) -> Result<Value, RuntimeError> + Send + Sync>;

/// Resolves a binding slot to its value. Implemented by the plain evaluation
/// path and by [`Processor`].
pub(crate) trait Resolve {
    fn resolve(&mut self, slot: usize, ctx: &dyn Context) -> Result<Value, RuntimeError>;
}

/// Resolver attached to one decision-table row.
pub(crate) struct Branch {
    pub(crate) description: String,
    pub(crate) evaluator: Evaluator,
}

/// One compiled declaration. Its position in [`ExecutableSchema::slots`] is its
/// topological index.
pub(crate) struct Slot {
    pub(crate) name: String,
    pub(crate) kind: BindingKind,
    pub(crate) description: String,
    pub(crate) evaluator: Evaluator,
    /// Present for attributes whose cascade is gated purely on traits.
    pub(crate) table: Option<DecisionTable<Branch>>,
}

/// A compiled, immutable schema. Thread-safe and designed to live behind `Arc`.
///
/// Every evaluation call builds its own transient state, so one instance can
/// serve any number of concurrent callers.
pub struct ExecutableSchema {
    pub(crate) slots: Vec<Slot>,
    pub(crate) index: HashMap<String, usize>,
    pub(crate) trait_slots: Vec<usize>,
    pub(crate) analysis: Analysis,
}

impl ExecutableSchema {
    /// Evaluate every binding against `ctx`.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuntimeError`] raised by any binding, or
    /// [`RuntimeError::InvalidContext`] if `ctx` is not a mapping.
    pub fn evaluate(&self, ctx: &dyn Context) -> Result<Evaluation, RuntimeError> {
        crate::evaluate::check_context(ctx)?;
        let mut evaluation = Evaluation::default();
        for (slot, value) in crate::evaluate::evaluate_where(self, ctx, |_| true)? {
            let name = self.slots[slot].name.clone();
            match self.slots[slot].kind {
                DeclKind::Trait => evaluation.traits.insert(name, value),
                DeclKind::Attribute => evaluation.attributes.insert(name, value),
                DeclKind::Function => evaluation.functions.insert(name, value),
            };
        }
        Ok(evaluation)
    }

    /// Evaluate only the traits.
    ///
    /// # Errors
    ///
    /// See [`evaluate`](Self::evaluate).
    pub fn evaluate_traits(&self, ctx: &dyn Context) -> Result<BTreeMap<String, Value>, RuntimeError> {
        self.evaluate_kind(DeclKind::Trait, ctx)
    }

    /// Evaluate only the attributes.
    ///
    /// # Errors
    ///
    /// See [`evaluate`](Self::evaluate).
    pub fn evaluate_attributes(
        &self,
        ctx: &dyn Context,
    ) -> Result<BTreeMap<String, Value>, RuntimeError> {
        self.evaluate_kind(DeclKind::Attribute, ctx)
    }

    /// Evaluate only the function declarations.
    ///
    /// # Errors
    ///
    /// See [`evaluate`](Self::evaluate).
    pub fn evaluate_functions(
        &self,
        ctx: &dyn Context,
    ) -> Result<BTreeMap<String, Value>, RuntimeError> {
        self.evaluate_kind(DeclKind::Function, ctx)
    }

    /// Evaluate a single binding (and whatever it references).
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownBinding`] if `name` was not compiled,
    /// otherwise any error raised while evaluating it.
    pub fn evaluate_binding(&self, name: &str, ctx: &dyn Context) -> Result<Value, RuntimeError> {
        let slot = self.slot_of(name)?;
        crate::evaluate::check_context(ctx)?;
        crate::evaluate::evaluate_slot(self, slot, ctx)
    }

    /// Open a memoizing [`Processor`] session bound to `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::InvalidContext`] if `ctx` is not a mapping.
    pub fn processor<'a>(&'a self, ctx: &'a dyn Context) -> Result<Processor<'a>, RuntimeError> {
        Processor::new(self, ctx)
    }

    /// Binding names in execution (topological) order.
    #[must_use]
    pub fn execution_order(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.name.as_str()).collect()
    }

    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<BindingKind> {
        self.index.get(name).map(|&slot| self.slots[slot].kind)
    }

    /// Names directly referenced by `name`. Returns `None` if it is not compiled.
    #[must_use]
    pub fn dependencies_of(&self, name: &str) -> Option<Vec<&str>> {
        self.analysis
            .dependencies_of(name)
            .map(|deps| deps.iter().map(String::as_str).collect())
    }

    /// Terminal nodes (fields and literals) under `name`.
    #[must_use]
    pub fn leaves_of(&self, name: &str) -> &[Leaf] {
        self.analysis.leaves_of(name)
    }

    /// Whether `name` was compiled with a trait-gated decision table.
    #[must_use]
    pub fn has_decision_table(&self, name: &str) -> bool {
        self.index
            .get(name)
            .is_some_and(|&slot| self.slots[slot].table.is_some())
    }

    /// The analysis this schema was compiled from.
    #[must_use]
    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn slot_of(&self, name: &str) -> Result<usize, RuntimeError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::UnknownBinding {
                name: name.to_owned(),
            })
    }

    fn evaluate_kind(
        &self,
        kind: BindingKind,
        ctx: &dyn Context,
    ) -> Result<BTreeMap<String, Value>, RuntimeError> {
        crate::evaluate::check_context(ctx)?;
        Ok(crate::evaluate::evaluate_where(self, ctx, |k| k == kind)?
            .into_iter()
            .map(|(slot, value)| (self.slots[slot].name.clone(), value))
            .collect())
    }
}

impl fmt::Debug for ExecutableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutableSchema")
            .field("bindings", &self.execution_order())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ExecutableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = |kind| self.slots.iter().filter(|s| s.kind == kind).count();
        write!(
            f,
            "ExecutableSchema({} traits, {} attributes, {} functions)",
            count(DeclKind::Trait),
            count(DeclKind::Attribute),
            count(DeclKind::Function),
        )
    }
}

/// Values of every binding from one [`ExecutableSchema::evaluate`] call.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct Evaluation {
    traits: BTreeMap<String, Value>,
    attributes: BTreeMap<String, Value>,
    functions: BTreeMap<String, Value>,
}

impl Evaluation {
    #[must_use]
    pub fn traits(&self) -> &BTreeMap<String, Value> {
        &self.traits
    }

    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    #[must_use]
    pub fn functions(&self) -> &BTreeMap<String, Value> {
        &self.functions
    }

    /// Look up any binding by name, whatever its kind.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.traits
            .get(name)
            .or_else(|| self.attributes.get(name))
            .or_else(|| self.functions.get(name))
    }
}
