use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::value::Value;

/// Failure reported by a registered function body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FunctionError {
    message: String,
}

impl FunctionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("function '{name}' is already registered")]
    AlreadyRegistered { name: String },

    #[error("unknown function name '{name}'")]
    UnknownName { name: String },
}

/// Callable stored in a [`FunctionRegistry`].
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync>;

/// Arity specification for a registered function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments.
    Fixed(usize),
    /// Any number of arguments; analysis skips the arity check.
    Variadic,
}

impl Arity {
    #[must_use]
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => n == count,
            Arity::Variadic => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{n}"),
            Arity::Variadic => write!(f, "*"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub arity: Arity,
}

#[derive(Clone)]
struct Entry {
    arity: Arity,
    function: NativeFn,
}

/// Named functions and operators that `Call` expressions may invoke.
///
/// Built once by the host and passed by reference into analysis and
/// compilation. Compiled schemas keep their own handles to the callables they
/// use, so the registry can be dropped afterwards.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    entries: HashMap<String, Entry>,
}

impl FunctionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in operators and functions.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtins::install(&mut registry);
        registry
    }

    /// Register a function under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyRegistered`] if the name is taken.
    pub fn register<F>(&mut self, name: &str, arity: Arity, function: F) -> Result<(), RegistryError>
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        if self.entries.contains_key(name) {
            return Err(RegistryError::AlreadyRegistered {
                name: name.to_owned(),
            });
        }
        self.entries.insert(
            name.to_owned(),
            Entry {
                arity,
                function: Arc::new(function),
            },
        );
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownName`] if `name` is not registered.
    pub fn confirm_support(&self, name: &str) -> Result<(), RegistryError> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(RegistryError::UnknownName {
                name: name.to_owned(),
            })
        }
    }

    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownName`] if `name` is not registered.
    pub fn signature(&self, name: &str) -> Result<Signature, RegistryError> {
        self.entry(name).map(|e| Signature { arity: e.arity })
    }

    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownName`] if `name` is not registered.
    pub fn fetch(&self, name: &str) -> Result<NativeFn, RegistryError> {
        self.entry(name).map(|e| Arc::clone(&e.function))
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, name: &str) -> Result<&Entry, RegistryError> {
        self.entries.get(name).ok_or_else(|| RegistryError::UnknownName {
            name: name.to_owned(),
        })
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}
