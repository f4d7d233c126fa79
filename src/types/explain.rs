use std::fmt;

use super::executable::BindingKind;
use super::value::Value;

/// Why a binding resolved to its value during a [`Processor`](crate::Processor) session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Explanation {
    pub name: String,
    pub kind: BindingKind,
    pub value: Value,
    /// The expression or decision-table row that produced the value.
    pub resolver: String,
    /// Bindings consulted while resolving, in first-use order.
    pub dependencies: Vec<Explanation>,
}

impl Explanation {
    /// Depth-first search for a node by binding name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Explanation> {
        if self.name == name {
            return Some(self);
        }
        self.dependencies.iter().find_map(|d| d.find(name))
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(
            f,
            "{:indent$}{} {} = {} via {}",
            "",
            self.kind,
            self.name,
            self.value,
            self.resolver,
            indent = depth * 2
        )?;
        for dep in &self.dependencies {
            dep.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}
