//! Lazy accessor chains.
//!
//! An [`Accessor`] records a path of field, index and transform steps
//! without touching any data. Building a step returns a new chain that
//! shares its prefix with the old one, so a chain can be reused as a
//! declarative path expression against any number of sources.
//!
//! ```
//! use remold_access::get;
//! use remold_core::Value;
//!
//! let author = get().index("user").index("name");
//! let source = Value::from(serde_json::json!({"user": {"name": "u"}}));
//! assert_eq!(author.evaluate(&source).unwrap(), Value::from("u"));
//! ```

use crate::operation::{Operation, Transform};
use remold_core::{Halt, Key, Outcome, PortError, Value};
use std::fmt;
use std::sync::Arc;

/// The argument of [`Accessor::index`]: a lookup key, or an operation to
/// splice into the chain.
#[derive(Debug, Clone)]
pub enum Subscript {
    /// Container lookup.
    Key(Value),
    /// Not a lookup: the operation's result replaces the current value.
    Apply(Transform),
}

impl From<Value> for Subscript {
    fn from(value: Value) -> Self {
        Subscript::Key(value)
    }
}

impl From<Key> for Subscript {
    fn from(key: Key) -> Self {
        Subscript::Key(key.into_value())
    }
}

impl From<&str> for Subscript {
    fn from(key: &str) -> Self {
        Subscript::Key(Value::from(key))
    }
}

impl From<String> for Subscript {
    fn from(key: String) -> Self {
        Subscript::Key(Value::Str(key))
    }
}

impl From<i64> for Subscript {
    fn from(index: i64) -> Self {
        Subscript::Key(Value::Int(index))
    }
}

impl From<i32> for Subscript {
    fn from(index: i32) -> Self {
        Subscript::Key(Value::from(index))
    }
}

impl From<Transform> for Subscript {
    fn from(op: Transform) -> Self {
        Subscript::Apply(op)
    }
}

impl From<Accessor> for Subscript {
    fn from(chain: Accessor) -> Self {
        Subscript::Apply(Transform::new(chain))
    }
}

#[derive(Clone)]
enum Step {
    Field(String),
    Index(Value),
    Apply(Transform),
}

struct Link {
    parent: Accessor,
    step: Step,
}

/// An immutable, lazily evaluated access path.
#[derive(Clone, Default)]
pub struct Accessor {
    link: Option<Arc<Link>>,
}

/// The root chain: evaluates to the source itself.
pub fn get() -> Accessor {
    Accessor::identity()
}

impl Accessor {
    pub fn identity() -> Self {
        Self { link: None }
    }

    pub fn is_identity(&self) -> bool {
        self.link.is_none()
    }

    fn push(&self, step: Step) -> Self {
        Self {
            link: Some(Arc::new(Link {
                parent: self.clone(),
                step,
            })),
        }
    }

    /// Field access on the current value.
    pub fn field(&self, name: impl Into<String>) -> Self {
        self.push(Step::Field(name.into()))
    }

    /// Container lookup, or an operation splice when given a transform.
    pub fn index(&self, subscript: impl Into<Subscript>) -> Self {
        match subscript.into() {
            Subscript::Key(key) => self.push(Step::Index(key)),
            Subscript::Apply(op) => self.push(Step::Apply(op)),
        }
    }

    /// Splice an operation into the chain.
    pub fn apply(&self, op: impl Operation + 'static) -> Self {
        self.push(Step::Apply(Transform::new(op)))
    }

    /// Number of steps after the root.
    pub fn len(&self) -> usize {
        let mut len = 0;
        let mut node = self.link.as_deref();
        while let Some(link) = node {
            len += 1;
            node = link.parent.link.as_deref();
        }
        len
    }

    pub fn is_empty(&self) -> bool {
        self.is_identity()
    }

    /// Resolve the whole chain against `source`.
    ///
    /// Fails exactly like the equivalent direct access would. A spliced
    /// operation that skips re-raises the skip's cause: a chain step has
    /// nothing to drop.
    pub fn evaluate(&self, source: &Value) -> Result<Value, PortError> {
        let Some(link) = &self.link else {
            return Ok(source.clone());
        };

        let current = link.parent.evaluate(source)?;
        match &link.step {
            Step::Field(name) => current.get_field(name),
            Step::Index(key) => current.get_index(key),
            Step::Apply(op) => op.apply(&current).map_err(Halt::into_error),
        }
    }
}

impl Operation for Accessor {
    fn apply(&self, source: &Value) -> Outcome<Value> {
        Ok(self.evaluate(source)?)
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(link) = &self.link else {
            return f.write_str("get");
        };
        write!(f, "{}", link.parent)?;
        match &link.step {
            Step::Field(name) => write!(f, ".{name}"),
            Step::Index(Value::Str(key)) => write!(f, "[{key:?}]"),
            Step::Index(key) => write!(f, "[{key}]"),
            Step::Apply(_) => f.write_str("[<apply>]"),
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Accessor({self})")
    }
}
