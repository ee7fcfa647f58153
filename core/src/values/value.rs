use core::fmt;
use std::rc::Rc;

use hashbrown::HashMap;

use crate::values::CompiledFunction;

/// A runtime value.
///
/// Scalars are stored inline. Strings and composite values are reference
/// counted, so pushing a constant or copying a global never deep-copies.
#[derive(Clone, Default)]
pub enum Value {
    Int(i64),
    Bool(bool),
    #[default]
    Null,
    Str(Rc<str>),
    Array(Rc<Vec<Value>>),
    Hash(Rc<HashMap<HashKey, Value>>),
    Function(Rc<CompiledFunction>),
}

/// The subset of values usable as hash keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashKey {
    Int(i64),
    Bool(bool),
    Str(Rc<str>),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(elements))
    }

    pub fn function(func: CompiledFunction) -> Self {
        Value::Function(Rc::new(func))
    }

    /// Upper-case kind name used in runtime error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "INTEGER",
            Value::Bool(_) => "BOOLEAN",
            Value::Null => "NULL",
            Value::Str(_) => "STRING",
            Value::Array(_) => "ARRAY",
            Value::Hash(_) => "HASH",
            Value::Function(_) => "FUNCTION",
        }
    }

    /// `false` and `null` are falsy; every other value is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false) | Value::Null)
    }

    /// Key form of this value, or `None` if the kind is not hashable.
    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Value::Int(i) => Some(HashKey::Int(*i)),
            Value::Bool(b) => Some(HashKey::Bool(*b)),
            Value::Str(s) => Some(HashKey::Str(s.clone())),
            _ => None,
        }
    }

    /// Equality on scalars, `None` when either side is composite.
    ///
    /// Scalars of different kinds are simply unequal.
    pub fn scalar_eq(&self, other: &Value) -> Option<bool> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a == b),
            (Value::Bool(a), Value::Bool(b)) => Some(a == b),
            (Value::Str(a), Value::Str(b)) => Some(a == b),
            (Value::Null, Value::Null) => Some(true),
            (a, b) if a.is_scalar() && b.is_scalar() => Some(false),
            _ => None,
        }
    }

    fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Int(_) | Value::Bool(_) | Value::Null | Value::Str(_)
        )
    }
}

impl From<HashKey> for Value {
    fn from(key: HashKey) -> Self {
        match key {
            HashKey::Int(i) => Value::Int(i),
            HashKey::Bool(b) => Value::Bool(b),
            HashKey::Str(s) => Value::Str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

/// Structural equality, used by tests and by constant comparisons.
/// Functions compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Hash(a), Value::Hash(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashKey::Int(i) => write!(f, "{}", i),
            HashKey::Bool(b) => write!(f, "{}", b),
            HashKey::Str(s) => write!(f, "{}", s),
        }
    }
}

/// The REPL form of a value. Strings print without quotes at the top level
/// and hashes list their entries sorted by key.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Str(s) => write!(f, "{}", s),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Value::Hash(pairs) => {
                let mut entries: Vec<_> = pairs.iter().collect();
                entries.sort_by(|(a, _), (b, _)| a.cmp(b));
                write!(f, "{{")?;
                for (i, (key, value)) in entries.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Function(func) => write!(f, "fn/{}", func.num_parameters),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Null => write!(f, "Null"),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Array(elements) => f.debug_list().entries(elements.iter()).finish(),
            Value::Hash(pairs) => {
                let mut entries: Vec<_> = pairs.iter().collect();
                entries.sort_by(|(a, _), (b, _)| a.cmp(b));
                f.debug_map().entries(entries).finish()
            }
            Value::Function(func) => write!(f, "{:?}", func),
        }
    }
}
