//! Output templates.
//!
//! A [`Template`] mirrors the shape of the output it describes: maps,
//! lists, tuples and sets of further templates, with literals and
//! resolvable leaves at the bottom. Leaves are anything implementing
//! [`Resolve`]; accessor chains, operations, plain closures and async
//! resolvers all convert into one.

use crate::engine::Porter;
use futures::FutureExt;
use futures::future::BoxFuture;
use remold_access::{
    Accessor, AttributeWithDefault, KeyWithDefault, OnlyIfExists, Operation, StringTemplate,
    Transform,
};
use remold_core::{Outcome, Value};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A computation that is not complete yet.
///
/// Awaiting it yields the outcome. Dropping it abandons the computation.
pub struct Deferred<'a, T>(BoxFuture<'a, Outcome<T>>);

impl<'a, T> Deferred<'a, T> {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Outcome<T>> + Send + 'a,
    {
        Self(future.boxed())
    }
}

impl<T> Future for Deferred<'_, T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().0.as_mut().poll(cx)
    }
}

impl<T> fmt::Debug for Deferred<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Deferred(..)")
    }
}

/// What a leaf produced for a source.
#[derive(Debug)]
pub enum Resolution<'a> {
    /// A concrete value, available now.
    Ready(Value),
    /// A pending computation. Its result is a template that gets resolved
    /// again against the same source.
    Deferred(Deferred<'a, Template>),
}

/// A template leaf.
pub trait Resolve: Send + Sync {
    fn resolve<'a>(&self, source: &'a Value) -> Outcome<Resolution<'a>>;

    /// Resolve as part of an enclosing resolution run by `porter` that has
    /// already re-entered `depth` times.
    ///
    /// Leaves that run templates of their own override this so the
    /// re-entry limit covers the whole resolution.
    fn resolve_within<'a>(
        &self,
        source: &'a Value,
        _porter: &Porter,
        _depth: usize,
    ) -> Outcome<Resolution<'a>> {
        self.resolve(source)
    }
}

/// A nested output description.
#[derive(Clone)]
pub enum Template {
    /// Returned unchanged.
    Literal(Value),
    /// Key and value templates, in output order.
    Map(Vec<(Template, Template)>),
    List(Vec<Template>),
    Tuple(Vec<Template>),
    /// Resolves into a set; duplicates collapse.
    Set(Vec<Template>),
    Leaf(Arc<dyn Resolve>),
}

impl Template {
    pub fn literal(value: impl Into<Value>) -> Self {
        Template::Literal(value.into())
    }

    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Template>,
        V: Into<Template>,
    {
        Template::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn list<T: Into<Template>>(items: impl IntoIterator<Item = T>) -> Self {
        Template::List(items.into_iter().map(Into::into).collect())
    }

    pub fn tuple<T: Into<Template>>(items: impl IntoIterator<Item = T>) -> Self {
        Template::Tuple(items.into_iter().map(Into::into).collect())
    }

    pub fn set<T: Into<Template>>(items: impl IntoIterator<Item = T>) -> Self {
        Template::Set(items.into_iter().map(Into::into).collect())
    }

    pub fn leaf(resolver: impl Resolve + 'static) -> Self {
        Template::Leaf(Arc::new(resolver))
    }

    pub fn accessor(chain: Accessor) -> Self {
        Template::op(chain)
    }

    /// A leaf backed by any synchronous operation.
    pub fn op(op: impl Operation + 'static) -> Self {
        Template::leaf(OpLeaf(Transform::new(op)))
    }

    /// A leaf backed by a plain closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Outcome<Value> + Send + Sync + 'static,
    {
        Template::op(f)
    }

    /// A leaf that resolves asynchronously.
    ///
    /// The future yields another template, which is resolved against the
    /// same source; it may itself contain async leaves.
    pub fn deferred<F, Fut>(f: F) -> Self
    where
        F: Fn(&Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<Template>> + Send + 'static,
    {
        Template::leaf(AsyncLeaf(f, PhantomData))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Template::Leaf(_))
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Template::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Template::Map(entries) => f
                .debug_map()
                .entries(entries.iter().map(|(k, v)| (k, v)))
                .finish(),
            Template::List(items) => f.debug_tuple("List").field(items).finish(),
            Template::Tuple(items) => f.debug_tuple("Tuple").field(items).finish(),
            Template::Set(items) => f.debug_tuple("Set").field(items).finish(),
            Template::Leaf(_) => f.write_str("Leaf(..)"),
        }
    }
}

struct OpLeaf(Transform);

impl Resolve for OpLeaf {
    fn resolve<'a>(&self, source: &'a Value) -> Outcome<Resolution<'a>> {
        self.0.apply(source).map(Resolution::Ready)
    }
}

struct AsyncLeaf<F, Fut>(F, PhantomData<fn() -> Fut>);

impl<F, Fut> Resolve for AsyncLeaf<F, Fut>
where
    F: Fn(&Value) -> Fut + Send + Sync,
    Fut: Future<Output = Outcome<Template>> + Send + 'static,
{
    fn resolve<'a>(&self, source: &'a Value) -> Outcome<Resolution<'a>> {
        Ok(Resolution::Deferred(Deferred::new((self.0)(source))))
    }
}

macro_rules! literal_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Template {
                fn from(value: $ty) -> Self {
                    Template::Literal(Value::from(value))
                }
            }
        )*
    };
}

literal_from!(Value, &str, String, i64, i32, f64, bool);

macro_rules! leaf_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Template {
                fn from(op: $ty) -> Self {
                    Template::op(op)
                }
            }
        )*
    };
}

leaf_from!(
    Accessor,
    Transform,
    OnlyIfExists,
    AttributeWithDefault,
    KeyWithDefault,
    StringTemplate,
);

impl From<Vec<Template>> for Template {
    fn from(items: Vec<Template>) -> Self {
        Template::List(items)
    }
}

/// Build a [`Template`] with map or list literal syntax.
///
/// ```
/// use remold_port::{get, template, OnlyIfExists};
///
/// let t = template!({
///     "author" => get().index("user").index("name"),
///     "tags" => template!(["fixed", get().index("tag")]),
///     "title" => OnlyIfExists::new(get().index("title")),
/// });
/// assert!(matches!(t, remold_port::Template::Map(ref entries) if entries.len() == 3));
/// ```
#[macro_export]
macro_rules! template {
    ({ $($key:expr => $value:expr),* $(,)? }) => {
        $crate::Template::Map(::std::vec![
            $(($crate::Template::from($key), $crate::Template::from($value))),*
        ])
    };
    ([ $($item:expr),* $(,)? ]) => {
        $crate::Template::List(::std::vec![$($crate::Template::from($item)),*])
    };
}
