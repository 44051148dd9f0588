//! # remold port
//!
//! Reshape a source value into a new structure described by a template.
//!
//! A [`Template`] is a nested map/list/tuple/set whose leaves are literals,
//! accessor chains or operations. [`port`] resolves every leaf against the
//! source and rebuilds the same shape with the results. Leaves that skip
//! drop their entry from the enclosing container. Async leaves turn the
//! result into a [`Ported::Deferred`] that completes once every pending
//! leaf has resolved.
//!
//! ```
//! use remold_port::{get, port, template, OnlyIfExists, Value};
//!
//! let source = Value::from(serde_json::json!({
//!     "post": {"title": "test title"},
//!     "user": {"name": "test"}
//! }));
//! let t = template!({
//!     "author" => get().index("user").index("name"),
//!     "subtitle" => OnlyIfExists::new(get().index("post").index("subtitle")),
//! });
//! let out = port(&source, &t).unwrap().ready().unwrap();
//! assert_eq!(out, Value::from(serde_json::json!({"author": "test"})));
//! ```

mod bound;
mod engine;
mod template;

pub use bound::BoundTemplate;
pub use engine::{Ported, Porter, port};
pub use template::{Deferred, Resolution, Resolve, Template};

pub use remold_access::{
    Accessor, AttributeWithDefault, Composite, KeyWithDefault, OnlyIfExists, Operation,
    StringTemplate, Subscript, Transform, get,
};
pub use remold_config::EngineConfig;
pub use remold_core::{Capability, Halt, Key, Map, Object, Outcome, PortError, SkipSignal, Value};
