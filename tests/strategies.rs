use proptest::prelude::*;
use traitgraph::{
    ExecutableSchema, Expr, FunctionRegistry, Record, Schema, binding, call, cascade, field, lit,
};

// --- Fixed field schema ---
// user.age    : i64 (0..=120)
// user.status : string, one of {"active", "inactive", "suspended"}
// user.banned : bool
// user.region : string, one of {"us-east", "us-west", "eu", "ap"}

const STATUSES: &[&str] = &["active", "inactive", "suspended"];
const REGIONS: &[&str] = &["us-east", "us-west", "eu", "ap"];

/// Generate a context that aligns with the fixed field schema.
pub fn arb_context() -> impl Strategy<Value = Record> {
    (
        0_i64..=120,
        prop::sample::select(STATUSES),
        any::<bool>(),
        prop::sample::select(REGIONS),
    )
        .prop_map(|(age, status, banned, region)| {
            Record::new()
                .set("user.age", age)
                .set("user.status", status)
                .set("user.banned", banned)
                .set("user.region", region)
        })
}

/// A comparison call on a random field from the schema.
fn arb_comparison() -> impl Strategy<Value = Expr> {
    prop_oneof![
        (0_i64..=120, 0_u8..6).prop_map(|(val, op)| {
            let f = field("user.age");
            match op {
                0 => f.eq(val),
                1 => f.neq(val),
                2 => f.gt(val),
                3 => f.gte(val),
                4 => f.lt(val),
                _ => f.lte(val),
            }
        }),
        (prop::sample::select(STATUSES), any::<bool>()).prop_map(|(val, is_eq)| {
            if is_eq {
                field("user.status").eq(val)
            } else {
                field("user.status").neq(val)
            }
        }),
        any::<bool>().prop_map(|val| field("user.banned").eq(val)),
        prop::sample::select(REGIONS).prop_map(|val| field("user.region").eq(val)),
    ]
}

/// A trait body: comparisons combined with and/or/not, bounded depth.
pub fn arb_trait_expr(max_depth: u32) -> impl Strategy<Value = Expr> {
    arb_comparison().prop_recursive(max_depth, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.and(b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.or(b)),
            inner.prop_map(|e| !e),
        ]
    })
}

/// A generated schema: field-only traits, plus attributes that cascade over
/// traits and earlier attributes. Acyclic by construction.
#[derive(Debug, Clone)]
pub struct GenSchema {
    pub traits: Vec<(String, Expr)>,
    pub attributes: Vec<(String, Expr)>,
}

impl GenSchema {
    #[must_use]
    pub fn build(&self) -> Schema {
        let mut builder = Schema::builder();
        // Attributes first so that declaration order differs from dependency order.
        for (name, expr) in self.attributes.iter().rev() {
            builder = builder.define_attribute(name, expr.clone());
        }
        for (name, expr) in &self.traits {
            builder = builder.define_trait(name, expr.clone());
        }
        builder.build()
    }

    /// # Panics
    ///
    /// Panics if the generated schema fails to compile (should not happen
    /// with valid generators).
    #[must_use]
    pub fn compile(&self) -> ExecutableSchema {
        self.build()
            .compile(&FunctionRegistry::with_builtins())
            .expect("generated schema should compile")
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.traits
            .iter()
            .chain(&self.attributes)
            .map(|(name, _)| name.as_str())
    }
}

/// A cascade condition over trait names: a single reference or a conjunction.
fn arb_condition(traits: Vec<String>) -> impl Strategy<Value = Expr> {
    let max = traits.len().min(2);
    prop::sample::subsequence(traits, 1..=max).prop_map(|picked| match picked.as_slice() {
        [one] => binding(one),
        _ => call("all?", picked.iter().map(|t| binding(t)).collect()),
    })
}

/// 1..=4 traits and 1..=4 attributes. Attribute `i` cascades over traits and
/// may fall back to attribute `i - 1`.
pub fn arb_layered_schema() -> impl Strategy<Value = GenSchema> {
    (1_usize..=4, 1_usize..=4).prop_flat_map(|(n_traits, n_attrs)| {
        prop::collection::vec(arb_trait_expr(2), n_traits).prop_flat_map(move |exprs| {
            let traits: Vec<(String, Expr)> = exprs
                .into_iter()
                .enumerate()
                .map(|(i, e)| (format!("t{i}"), e))
                .collect();
            let names: Vec<String> = traits.iter().map(|(n, _)| n.clone()).collect();
            let case = (arb_condition(names), 0_i64..10).prop_map(|(c, v)| (c, lit(v)));
            prop::collection::vec(
                (prop::collection::vec(case, 1..=3), any::<bool>()),
                n_attrs,
            )
            .prop_map(move |attrs| {
                let attributes = attrs
                    .into_iter()
                    .enumerate()
                    .map(|(i, (cases, chain))| {
                        let default = if chain && i > 0 {
                            binding(&format!("a{}", i - 1))
                        } else {
                            lit("none")
                        };
                        (format!("a{i}"), cascade(cases, Some(default)))
                    })
                    .collect();
                GenSchema {
                    traits: traits.clone(),
                    attributes,
                }
            })
        })
    })
}

/// A ring of 1..=5 traits, each referencing the next, the last closing back
/// onto the first.
pub fn arb_cyclic_schema() -> impl Strategy<Value = Schema> {
    (1_usize..=5, 0_usize..3).prop_map(|(n, extra)| {
        let mut builder = Schema::builder();
        for i in 0..n {
            let next = format!("c{}", (i + 1) % n);
            builder = builder.define_trait(&format!("c{i}"), binding(&next).eq(true));
        }
        // Unrelated acyclic declarations alongside the ring.
        for i in 0..extra {
            builder = builder.define_trait(&format!("ok{i}"), field("x").eq(1_i64));
        }
        builder.build()
    })
}
