//! Lazy accessor chains and composite operations.
//!
//! Build a path with [`get`] and the [`Accessor`] builder methods, or
//! configure one of the convenience operations. Everything here is an
//! [`Operation`], so any of it can be spliced into a chain or placed in a
//! template leaf.
//!
//! ```
//! use remold_access::{get, KeyWithDefault, Operation};
//! use remold_core::Value;
//!
//! let source = Value::from(serde_json::json!({"user": {"name": "u"}}));
//! let nick = get().index("user").index(KeyWithDefault::new("nick").or("anon"));
//! assert_eq!(nick.evaluate(&source).unwrap(), Value::from("anon"));
//! assert_eq!(Operation::apply(&nick, &source).unwrap(), Value::from("anon"));
//! ```

mod accessor;
mod format;
mod operation;
mod ops;

pub use accessor::{Accessor, Subscript, get};
pub use format::StringTemplate;
pub use operation::{Composite, Operation, Transform};
pub use ops::{AttributeWithDefault, KeyWithDefault, OnlyIfExists};
