use std::collections::BTreeSet;

use super::error::RuntimeError;

/// One row of a [`DecisionTable`]: the traits that must all be satisfied, and
/// what to resolve with when they are.
#[derive(Debug, Clone)]
pub struct Row<R> {
    required: BTreeSet<String>,
    resolver: R,
}

impl<R> Row<R> {
    pub fn new<I, S>(required: I, resolver: R) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: required.into_iter().map(Into::into).collect(),
            resolver,
        }
    }

    #[must_use]
    pub fn required(&self) -> &BTreeSet<String> {
        &self.required
    }

    #[must_use]
    pub fn resolver(&self) -> &R {
        &self.resolver
    }
}

/// Ordered rows matched first-subset-wins.
///
/// Rows are scanned in declaration order, not by specificity: an empty row
/// placed first shadows everything after it. Callers are expected to end the
/// table with an empty catch-all row; nothing enforces this.
#[derive(Debug, Clone)]
pub struct DecisionTable<R> {
    rows: Vec<Row<R>>,
}

impl<R> DecisionTable<R> {
    #[must_use]
    pub fn new(rows: Vec<Row<R>>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[Row<R>] {
        &self.rows
    }

    /// Resolver of the first row whose required traits are all in `satisfied`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NoDecisionMatch`] when no row matches.
    pub fn pick(&self, satisfied: &BTreeSet<String>) -> Result<&R, RuntimeError> {
        self.pick_row(satisfied).map(Row::resolver)
    }

    pub(crate) fn pick_row(&self, satisfied: &BTreeSet<String>) -> Result<&Row<R>, RuntimeError> {
        self.rows
            .iter()
            .find(|row| row.required.is_subset(satisfied))
            .ok_or_else(|| RuntimeError::NoDecisionMatch {
                satisfied: satisfied.iter().cloned().collect(),
            })
    }

    /// Every trait named by any row, sorted and deduplicated.
    #[must_use]
    pub fn referenced_traits(&self) -> BTreeSet<&str> {
        self.rows
            .iter()
            .flat_map(|row| row.required.iter().map(String::as_str))
            .collect()
    }
}
