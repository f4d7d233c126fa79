use std::collections::{BTreeMap, HashMap};

use super::Value;

/// Read-only view of the input a schema is evaluated against.
///
/// Hosts adapt their own data once at the boundary by implementing this trait;
/// the core never inspects the concrete shape.
pub trait Context {
    /// Look up a key, returning `None` when absent.
    fn get(&self, key: &str) -> Option<Value>;

    /// Keys available for lookup, used to build error messages.
    fn keys(&self) -> Vec<String>;

    /// Whether this context supports keyed lookup at all. Checked once per
    /// evaluation call before any binding runs.
    fn is_mapping(&self) -> bool {
        true
    }

    /// Type description reported when [`is_mapping`](Self::is_mapping) is false.
    fn describe(&self) -> String {
        "mapping".to_owned()
    }
}

impl Context for HashMap<String, Value> {
    fn get(&self, key: &str) -> Option<Value> {
        HashMap::get(self, key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = HashMap::keys(self).cloned().collect();
        keys.sort_unstable();
        keys
    }
}

impl Context for BTreeMap<String, Value> {
    fn get(&self, key: &str) -> Option<Value> {
        BTreeMap::get(self, key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        BTreeMap::keys(self).cloned().collect()
    }
}

/// A dynamic value is a valid context only when it is a [`Value::Map`].
impl Context for Value {
    fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Map(entries) => entries.get(key).cloned(),
            _ => None,
        }
    }

    fn keys(&self) -> Vec<String> {
        match self {
            Value::Map(entries) => entries.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    fn is_mapping(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    fn describe(&self) -> String {
        self.type_name().to_owned()
    }
}

impl<C: Context + ?Sized> Context for &C {
    fn get(&self, key: &str) -> Option<Value> {
        (**self).get(key)
    }

    fn keys(&self) -> Vec<String> {
        (**self).keys()
    }

    fn is_mapping(&self) -> bool {
        (**self).is_mapping()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Evaluation input mapping dot-separated paths to [`Value`]s.
///
/// Supports nested paths like `"user.profile.age"`: a field reference to
/// `user.profile.age` reads the leaf stored under that path.
#[derive(Debug, Clone, Default)]
pub struct Record {
    data: HashMap<String, RecordValue>,
}

#[derive(Debug, Clone)]
enum RecordValue {
    Leaf(Value),
    Nested(HashMap<String, RecordValue>),
}

impl Record {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value at a dot-separated path. Creates intermediate nested maps as needed.
    #[must_use]
    pub fn set(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.insert(path, value.into());
        self
    }

    /// Insert a value at a dot-separated path (mutable reference version).
    pub fn insert(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        Self::insert_recursive(&mut self.data, &segments, value);
    }

    /// Look up a value by dot-separated path.
    /// Returns `None` if the path does not exist or points to a nested map.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let segments: Vec<&str> = path.split('.').collect();
        Self::get_recursive(&self.data, &segments)
    }

    fn insert_recursive(map: &mut HashMap<String, RecordValue>, segments: &[&str], value: Value) {
        match segments {
            [] => {}
            [last] => {
                map.insert((*last).to_owned(), RecordValue::Leaf(value));
            }
            [first, rest @ ..] => {
                let entry = map
                    .entry((*first).to_owned())
                    .or_insert_with(|| RecordValue::Nested(HashMap::new()));
                match entry {
                    RecordValue::Nested(nested) => {
                        Self::insert_recursive(nested, rest, value);
                    }
                    RecordValue::Leaf(_) => {
                        let mut nested = HashMap::new();
                        Self::insert_recursive(&mut nested, rest, value);
                        *entry = RecordValue::Nested(nested);
                    }
                }
            }
        }
    }

    fn get_recursive<'a>(
        map: &'a HashMap<String, RecordValue>,
        segments: &[&str],
    ) -> Option<&'a Value> {
        match segments {
            [] => None,
            [last] => match map.get(*last)? {
                RecordValue::Leaf(v) => Some(v),
                RecordValue::Nested(_) => None,
            },
            [first, rest @ ..] => match map.get(*first)? {
                RecordValue::Nested(nested) => Self::get_recursive(nested, rest),
                RecordValue::Leaf(_) => None,
            },
        }
    }

    fn collect_paths(map: &HashMap<String, RecordValue>, prefix: &str, out: &mut Vec<String>) {
        for (key, value) in map {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match value {
                RecordValue::Leaf(_) => out.push(path),
                RecordValue::Nested(nested) => Self::collect_paths(nested, &path, out),
            }
        }
    }
}

impl Context for Record {
    fn get(&self, key: &str) -> Option<Value> {
        self.lookup(key).cloned()
    }

    /// Full dotted paths of every leaf, sorted.
    fn keys(&self) -> Vec<String> {
        let mut out = Vec::new();
        Self::collect_paths(&self.data, "", &mut out);
        out.sort_unstable();
        out
    }
}
