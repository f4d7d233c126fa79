use crate::types::{BindingKind, Context, ExecutableSchema, Resolve, RuntimeError, Slot, Value};

/// Resolver for plain evaluation: no memo, just a guard against re-entering a
/// slot that is still being computed.
struct Direct<'s> {
    slots: &'s [Slot],
    in_progress: Vec<usize>,
}

impl<'s> Direct<'s> {
    fn new(slots: &'s [Slot]) -> Self {
        Self {
            slots,
            in_progress: Vec::new(),
        }
    }
}

impl Resolve for Direct<'_> {
    fn resolve(&mut self, slot: usize, ctx: &dyn Context) -> Result<Value, RuntimeError> {
        let slots = self.slots;
        let Some(entry) = slots.get(slot) else {
            return Err(RuntimeError::UnresolvedBinding {
                name: format!("#{slot}"),
            });
        };
        if self.in_progress.contains(&slot) {
            return Err(cycle(slots, &self.in_progress, slot));
        }
        self.in_progress.push(slot);
        let outcome = (entry.evaluator)(ctx, self);
        self.in_progress.pop();
        outcome
    }
}

pub(crate) fn check_context(ctx: &dyn Context) -> Result<(), RuntimeError> {
    if ctx.is_mapping() {
        Ok(())
    } else {
        Err(RuntimeError::InvalidContext {
            found: ctx.describe(),
        })
    }
}

/// Evaluate the selected slots in execution order, stopping at the first error.
pub(crate) fn evaluate_where(
    schema: &ExecutableSchema,
    ctx: &dyn Context,
    select: impl Fn(BindingKind) -> bool,
) -> Result<Vec<(usize, Value)>, RuntimeError> {
    let mut direct = Direct::new(&schema.slots);
    let mut out = Vec::new();
    for (slot, entry) in schema.slots.iter().enumerate() {
        if select(entry.kind) {
            out.push((slot, direct.resolve(slot, ctx)?));
        }
    }
    Ok(out)
}

pub(crate) fn evaluate_slot(
    schema: &ExecutableSchema,
    slot: usize,
    ctx: &dyn Context,
) -> Result<Value, RuntimeError> {
    Direct::new(&schema.slots).resolve(slot, ctx)
}

/// Cycle path from the first occurrence of `slot` on `stack`, closed by `slot`.
pub(crate) fn cycle(slots: &[Slot], stack: &[usize], slot: usize) -> RuntimeError {
    let start = stack.iter().position(|&s| s == slot).unwrap_or(0);
    let path = stack[start..]
        .iter()
        .chain(std::iter::once(&slot))
        .map(|&s| slots.get(s).map_or_else(|| format!("#{s}"), |e| e.name.clone()))
        .collect();
    RuntimeError::Cycle { path }
}
