use std::fmt;
use std::ops::Not;

use super::value::{CompareOp, Value};

/// Expression tree attached to every declaration.
///
/// The variant set is closed: every analysis pass and the compiler match on it
/// exhaustively.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expr {
    Literal(Value),
    /// Reads a key from the evaluation context.
    Field(String),
    /// Refers to another declaration by name.
    Binding(String),
    List(Vec<Expr>),
    /// Invokes a registry function or operator.
    Call { function: String, args: Vec<Expr> },
    /// First truthy condition wins; `default` is used when nothing matches.
    Cascade {
        cases: Vec<Case>,
        default: Option<Box<Expr>>,
    },
}

/// One `(condition, result)` arm of a [`Expr::Cascade`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Case {
    pub condition: Expr,
    pub result: Expr,
}

impl Case {
    #[must_use]
    pub fn new(condition: Expr, result: Expr) -> Self {
        Self { condition, result }
    }
}

impl Expr {
    /// Direct children in evaluation order.
    #[must_use]
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal(_) | Expr::Field(_) | Expr::Binding(_) => Vec::new(),
            Expr::List(elements) => elements.iter().collect(),
            Expr::Call { args, .. } => args.iter().collect(),
            Expr::Cascade { cases, default } => cases
                .iter()
                .flat_map(|c| [&c.condition, &c.result])
                .chain(default.as_deref())
                .collect(),
        }
    }

    #[must_use]
    pub fn is_call(&self) -> bool {
        matches!(self, Expr::Call { .. })
    }

    fn compare(self, op: CompareOp, value: impl Into<Value>) -> Expr {
        call(op.symbol(), vec![self, Expr::Literal(value.into())])
    }

    #[must_use]
    pub fn eq(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Eq, value)
    }

    #[must_use]
    pub fn neq(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Neq, value)
    }

    #[must_use]
    pub fn gt(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Gt, value)
    }

    #[must_use]
    pub fn gte(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Gte, value)
    }

    #[must_use]
    pub fn lt(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Lt, value)
    }

    #[must_use]
    pub fn lte(self, value: impl Into<Value>) -> Expr {
        self.compare(CompareOp::Lte, value)
    }

    #[must_use]
    pub fn and(self, other: Expr) -> Expr {
        call("and", vec![self, other])
    }

    #[must_use]
    pub fn or(self, other: Expr) -> Expr {
        call("or", vec![self, other])
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        call("not", vec![self])
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Literal(v)
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::Field(name) => write!(f, "field:{name}"),
            Expr::Binding(name) => write!(f, "ref:{name}"),
            Expr::List(elements) => {
                write!(f, "[")?;
                write_joined(f, elements)?;
                write!(f, "]")
            }
            Expr::Call { function, args } => {
                write!(f, "{function}(")?;
                write_joined(f, args)?;
                write!(f, ")")
            }
            Expr::Cascade { cases, default } => {
                write!(f, "cascade {{")?;
                for case in cases {
                    write!(f, " on {} => {};", case.condition, case.result)?;
                }
                if let Some(default) = default {
                    write!(f, " default => {default};")?;
                }
                write!(f, " }}")
            }
        }
    }
}

#[must_use]
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

#[must_use]
pub fn field(name: &str) -> Expr {
    Expr::Field(name.to_owned())
}

#[must_use]
pub fn binding(name: &str) -> Expr {
    Expr::Binding(name.to_owned())
}

#[must_use]
pub fn list(elements: Vec<Expr>) -> Expr {
    Expr::List(elements)
}

#[must_use]
pub fn call(function: &str, args: Vec<Expr>) -> Expr {
    Expr::Call {
        function: function.to_owned(),
        args,
    }
}

/// Build a cascade from `(condition, result)` pairs kept in the given order.
#[must_use]
pub fn cascade(cases: Vec<(Expr, Expr)>, default: Option<Expr>) -> Expr {
    Expr::Cascade {
        cases: cases
            .into_iter()
            .map(|(condition, result)| Case { condition, result })
            .collect(),
        default: default.map(Box::new),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_gte_builds_call() {
        let expr = field("age").gte(18_i64);
        assert_eq!(
            expr,
            Expr::Call {
                function: ">=".to_owned(),
                args: vec![Expr::Field("age".to_owned()), Expr::Literal(Value::Int(18))],
            }
        );
    }

    #[test]
    fn all_compare_ops() {
        let ops = vec![
            (field("f").eq(1_i64), "=="),
            (field("f").neq(1_i64), "!="),
            (field("f").gt(1_i64), ">"),
            (field("f").gte(1_i64), ">="),
            (field("f").lt(1_i64), "<"),
            (field("f").lte(1_i64), "<="),
        ];
        for (expr, expected) in ops {
            match expr {
                Expr::Call { function, args } => {
                    assert_eq!(function, expected);
                    assert_eq!(args.len(), 2);
                }
                other => panic!("expected Call, got {other:?}"),
            }
        }
    }

    #[test]
    fn and_or_not_chaining() {
        let expr = !binding("a").and(binding("b")).or(binding("c"));
        match &expr {
            Expr::Call { function, args } => {
                assert_eq!(function, "not");
                assert_eq!(args.len(), 1);
                assert!(matches!(&args[0], Expr::Call { function, .. } if function == "or"));
            }
            other => panic!("expected not(...), got {other:?}"),
        }
    }

    #[test]
    fn cascade_children_keep_declared_order() {
        let expr = cascade(
            vec![(binding("a"), lit("A")), (binding("b"), lit("B"))],
            Some(lit("Z")),
        );
        let children: Vec<String> = expr.children().iter().map(ToString::to_string).collect();
        assert_eq!(children, vec!["ref:a", "\"A\"", "ref:b", "\"B\"", "\"Z\""]);
    }

    #[test]
    fn leaves_have_no_children() {
        assert!(lit(1_i64).children().is_empty());
        assert!(field("x").children().is_empty());
        assert!(binding("x").children().is_empty());
    }

    #[test]
    fn display_nested() {
        let expr = call("add", vec![field("x"), list(vec![lit(1_i64), binding("y")])]);
        assert_eq!(expr.to_string(), "add(field:x, [1, ref:y])");

        let expr = cascade(vec![(binding("adult"), lit("Standard"))], Some(lit("Minor")));
        assert_eq!(
            expr.to_string(),
            "cascade { on ref:adult => \"Standard\"; default => \"Minor\"; }"
        );
    }
}
