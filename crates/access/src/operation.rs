//! The composite-operation protocol.
//!
//! Every operation that can sit in an accessor chain or a template leaf is
//! an [`Operation`]: configured once at construction, then applied to any
//! number of sources. Plain closures of the right shape are operations too.

use remold_core::{Outcome, Value};
use std::fmt;
use std::sync::Arc;

/// An arity-1 resolver over a source value.
///
/// Returning `Err(Halt::Skip(..))` asks the enclosing container to drop the
/// element; contexts without containers re-raise the skip's cause.
pub trait Operation: Send + Sync {
    fn apply(&self, source: &Value) -> Outcome<Value>;
}

impl<F> Operation for F
where
    F: Fn(&Value) -> Outcome<Value> + Send + Sync,
{
    fn apply(&self, source: &Value) -> Outcome<Value> {
        self(source)
    }
}

/// A shared, clonable handle to any operation.
#[derive(Clone)]
pub struct Transform(Arc<dyn Operation>);

impl Transform {
    pub fn new(op: impl Operation + 'static) -> Self {
        Self(Arc::new(op))
    }

    /// Wrap a plain closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Outcome<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl Operation for Transform {
    fn apply(&self, source: &Value) -> Outcome<Value> {
        self.0.apply(source)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

/// A two-stage operation: configuration bound now, source supplied later.
///
/// ```
/// use remold_access::{Composite, Operation};
/// use remold_core::Value;
///
/// let add = Composite::new(10, |source: &Value, n: &i64| {
///     Ok(Value::Int(source.as_i64().unwrap_or_default() + n))
/// });
/// assert_eq!(add.apply(&Value::Int(5)).unwrap(), Value::Int(15));
/// ```
pub struct Composite<C, F> {
    config: C,
    func: F,
}

impl<C, F> Composite<C, F>
where
    F: Fn(&Value, &C) -> Outcome<Value>,
{
    pub fn new(config: C, func: F) -> Self {
        Self { config, func }
    }

    pub fn config(&self) -> &C {
        &self.config
    }
}

impl<C, F> Operation for Composite<C, F>
where
    C: Send + Sync,
    F: Fn(&Value, &C) -> Outcome<Value> + Send + Sync,
{
    fn apply(&self, source: &Value) -> Outcome<Value> {
        (self.func)(source, &self.config)
    }
}
