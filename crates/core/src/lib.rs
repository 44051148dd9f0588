//! # remold core
//!
//! Value model and error taxonomy shared by every remold crate.
//! This crate has no engine logic; accessors, operations and the
//! resolution engine all build on the types defined here.

pub mod error;
pub mod value;

// Re-export key types at crate root for ergonomics
pub use error::{Halt, Outcome, PortError, Result, SkipSignal};
pub use value::{Capability, Key, Map, Object, Value};
