use std::fmt;

use super::error::SemanticError;
use super::executable::ExecutableSchema;
use super::expr::Expr;
use super::registry::FunctionRegistry;

/// Source position of a declaration, as reported by the front end that built it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Location {
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeclKind {
    Attribute,
    Trait,
    Function,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclKind::Attribute => write!(f, "attribute"),
            DeclKind::Trait => write!(f, "trait"),
            DeclKind::Function => write!(f, "function"),
        }
    }
}

/// A named attribute, trait or function.
///
/// The expression is optional only so that an incomplete declaration coming
/// from a front end can be reported by analysis instead of being unrepresentable.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Declaration {
    pub kind: DeclKind,
    pub name: String,
    pub expression: Option<Expr>,
    pub location: Option<Location>,
}

impl Declaration {
    #[must_use]
    pub fn new(kind: DeclKind, name: &str, expression: Expr) -> Self {
        Self {
            kind,
            name: name.to_owned(),
            expression: Some(expression),
            location: None,
        }
    }

    #[must_use]
    pub fn without_expression(kind: DeclKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_owned(),
            expression: None,
            location: None,
        }
    }

    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// Root of the AST: ordered attribute, trait and function declarations.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Schema {
    attributes: Vec<Declaration>,
    traits: Vec<Declaration>,
    functions: Vec<Declaration>,
}

impl Schema {
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    #[must_use]
    pub fn attributes(&self) -> &[Declaration] {
        &self.attributes
    }

    #[must_use]
    pub fn traits(&self) -> &[Declaration] {
        &self.traits
    }

    #[must_use]
    pub fn functions(&self) -> &[Declaration] {
        &self.functions
    }

    /// Every declaration in encounter order: attributes, then traits, then functions.
    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.attributes
            .iter()
            .chain(&self.traits)
            .chain(&self.functions)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len() + self.traits.len() + self.functions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Analyze and compile this schema against the given registry.
    ///
    /// # Errors
    ///
    /// Returns [`SemanticError`] carrying every problem analysis found.
    pub fn compile(&self, registry: &FunctionRegistry) -> Result<ExecutableSchema, SemanticError> {
        crate::compile::compile(self, registry)
    }
}

/// Collects declarations into a [`Schema`].
///
/// # Example
///
/// ```
/// use traitgraph::{FunctionRegistry, Schema, binding, cascade, field, lit};
///
/// let schema = Schema::builder()
///     .define_trait("adult", field("age").gte(18_i64))
///     .define_attribute(
///         "tier",
///         cascade(vec![(binding("adult"), lit("Standard"))], Some(lit("Minor"))),
///     )
///     .build();
/// let compiled = schema.compile(&FunctionRegistry::with_builtins()).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn define_attribute(self, name: &str, expression: Expr) -> Self {
        self.declare(Declaration::new(DeclKind::Attribute, name, expression))
    }

    #[must_use]
    pub fn define_trait(self, name: &str, expression: Expr) -> Self {
        self.declare(Declaration::new(DeclKind::Trait, name, expression))
    }

    #[must_use]
    pub fn define_function(self, name: &str, expression: Expr) -> Self {
        self.declare(Declaration::new(DeclKind::Function, name, expression))
    }

    /// Add a fully specified declaration, routed by its kind.
    #[must_use]
    pub fn declare(mut self, declaration: Declaration) -> Self {
        match declaration.kind {
            DeclKind::Attribute => self.schema.attributes.push(declaration),
            DeclKind::Trait => self.schema.traits.push(declaration),
            DeclKind::Function => self.schema.functions.push(declaration),
        }
        self
    }

    #[must_use]
    pub fn build(self) -> Schema {
        self.schema
    }

    /// Build, analyze and compile in one step.
    ///
    /// # Errors
    ///
    /// Returns [`SemanticError`] if analysis fails.
    pub fn compile(self, registry: &FunctionRegistry) -> Result<ExecutableSchema, SemanticError> {
        self.schema.compile(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{binding, field, lit};

    #[test]
    fn builder_routes_by_kind() {
        let schema = Schema::builder()
            .define_attribute("a", lit(1_i64))
            .define_trait("t", field("x").eq(1_i64))
            .define_function("f", binding("a"))
            .define_attribute("b", lit(2_i64))
            .build();

        assert_eq!(schema.attributes().len(), 2);
        assert_eq!(schema.traits().len(), 1);
        assert_eq!(schema.functions().len(), 1);
        assert_eq!(schema.len(), 4);

        let names: Vec<&str> = schema.declarations().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "t", "f"]);
    }

    #[test]
    fn declaration_location() {
        let decl = Declaration::without_expression(DeclKind::Attribute, "x")
            .at(Location::new("rules.yml", 3, 5));
        assert!(decl.expression.is_none());
        assert_eq!(decl.location.unwrap().to_string(), "rules.yml:3:5");
    }

    #[test]
    fn empty_schema() {
        let schema = Schema::builder().build();
        assert!(schema.is_empty());
    }
}
