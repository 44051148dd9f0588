//! Convenience composite operations.

use crate::accessor::{Accessor, Subscript};
use crate::operation::{Operation, Transform};
use remold_core::{Halt, Outcome, PortError, SkipSignal, Value};
use tracing::trace;

/// Yield the looked-up value, or skip the element when it is absent.
///
/// Given a key, looks it up on the source. Given an operation (an accessor
/// chain, another convenience operation, any transform), runs it. Absence
/// failures and nested skips become a skip carrying the failure; every
/// other failure passes through untouched.
#[derive(Debug, Clone)]
pub struct OnlyIfExists {
    target: Subscript,
}

impl OnlyIfExists {
    pub fn new(target: impl Into<Subscript>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl Operation for OnlyIfExists {
    fn apply(&self, source: &Value) -> Outcome<Value> {
        let result = match &self.target {
            Subscript::Key(key) => source.get_index(key).map_err(Halt::from),
            Subscript::Apply(op) => op.apply(source),
        };

        match result {
            Ok(value) => Ok(value),
            Err(Halt::Skip(inner)) => Err(Halt::Skip(SkipSignal::wrap(inner))),
            Err(Halt::Fail(error)) if error.is_absence() => {
                trace!(%error, "value absent, skipping");
                Err(Halt::Skip(SkipSignal::because(error)))
            }
            Err(other) => Err(other),
        }
    }
}

/// Field lookup with an optional fallback.
#[derive(Debug, Clone)]
pub struct AttributeWithDefault {
    name: String,
    default: Option<Value>,
}

impl AttributeWithDefault {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// Fall back to `default` when the field is missing.
    pub fn or(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

impl Operation for AttributeWithDefault {
    fn apply(&self, source: &Value) -> Outcome<Value> {
        match (source.get_field(&self.name), &self.default) {
            (Err(PortError::FieldNotFound { .. }), Some(default)) => Ok(default.clone()),
            (result, _) => Ok(result?),
        }
    }
}

/// Key or index lookup with an optional fallback.
///
/// Without a fallback, a miss fails the way a direct lookup on that
/// container would: `KeyNotFound` for maps, `IndexOutOfRange` for
/// sequences.
#[derive(Debug, Clone)]
pub struct KeyWithDefault {
    key: Value,
    default: Option<Value>,
}

impl KeyWithDefault {
    pub fn new(key: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            default: None,
        }
    }

    /// Fall back to `default` when the key or index is missing.
    pub fn or(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

impl Operation for KeyWithDefault {
    fn apply(&self, source: &Value) -> Outcome<Value> {
        match (source.get_index(&self.key), &self.default) {
            (
                Err(PortError::KeyNotFound { .. } | PortError::IndexOutOfRange { .. }),
                Some(default),
            ) => Ok(default.clone()),
            (result, _) => Ok(result?),
        }
    }
}

macro_rules! splice_into_chain {
    ($($op:ty),* $(,)?) => {
        $(
            impl From<$op> for Subscript {
                fn from(op: $op) -> Self {
                    Subscript::Apply(Transform::new(op))
                }
            }
        )*
    };
}

splice_into_chain!(
    OnlyIfExists,
    AttributeWithDefault,
    KeyWithDefault,
    crate::format::StringTemplate,
);

impl Accessor {
    /// Shorthand for `OnlyIfExists::new(chain)`.
    pub fn only_if_exists(&self) -> OnlyIfExists {
        OnlyIfExists::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::get;
    use remold_core::Object;
    use serde_json::json;

    fn some_class() -> Value {
        Value::from(Object::new("SomeClass").with_field("the_attr", "test"))
    }

    #[test]
    fn attribute_exists() {
        let op = AttributeWithDefault::new("the_attr");
        assert_eq!(op.apply(&some_class()).unwrap(), Value::from("test"));
    }

    #[test]
    fn attribute_default_used() {
        let op = AttributeWithDefault::new("not_the_attr").or("but_default");
        assert_eq!(op.apply(&some_class()).unwrap(), Value::from("but_default"));
    }

    #[test]
    fn attribute_missing_without_default() {
        let err = AttributeWithDefault::new("not_the_attr")
            .apply(&some_class())
            .unwrap_err();
        assert!(matches!(err, Halt::Fail(PortError::FieldNotFound { .. })));
    }

    #[test]
    fn key_exists_on_map() {
        let source = Value::from(json!({"k": "test"}));
        assert_eq!(
            KeyWithDefault::new("k").apply(&source).unwrap(),
            Value::from("test")
        );
    }

    #[test]
    fn key_default_on_map() {
        let source = Value::from(json!({"k": "test"}));
        let op = KeyWithDefault::new("v").or("the_default");
        assert_eq!(op.apply(&source).unwrap(), Value::from("the_default"));
    }

    #[test]
    fn key_missing_on_map_is_key_not_found() {
        let source = Value::from(json!({"k": "test"}));
        let err = KeyWithDefault::new("v").apply(&source).unwrap_err();
        assert!(matches!(err, Halt::Fail(PortError::KeyNotFound { .. })));
    }

    #[test]
    fn index_exists_on_list() {
        let source = Value::from(json!([2, 5, "test"]));
        assert_eq!(
            KeyWithDefault::new(2).apply(&source).unwrap(),
            Value::from("test")
        );
    }

    #[test]
    fn index_default_on_list() {
        let source = Value::from(json!([2, 5, "test"]));
        let op = KeyWithDefault::new(3).or("the_default");
        assert_eq!(op.apply(&source).unwrap(), Value::from("the_default"));
    }

    #[test]
    fn index_missing_on_list_is_out_of_range() {
        let source = Value::from(json!([0, 5]));
        let err = KeyWithDefault::new(2).apply(&source).unwrap_err();
        assert!(matches!(err, Halt::Fail(PortError::IndexOutOfRange { .. })));
    }

    #[test]
    fn key_default_does_not_hide_type_mismatch() {
        let op = KeyWithDefault::new("k").or("fallback");
        let err = op.apply(&Value::Int(1)).unwrap_err();
        assert!(matches!(err, Halt::Fail(PortError::TypeMismatch(_))));
    }

    #[test]
    fn only_if_exists_index_present() {
        let source = Value::from(json!(["one"]));
        assert_eq!(
            OnlyIfExists::new(0).apply(&source).unwrap(),
            Value::from("one")
        );
    }

    #[test]
    fn only_if_exists_key_present() {
        let source = Value::from(json!({"k": "test"}));
        assert_eq!(
            OnlyIfExists::new("k").apply(&source).unwrap(),
            Value::from("test")
        );
    }

    #[test]
    fn only_if_exists_wraps_operation() {
        let source = Value::from(json!({"k": "test"}));
        let op = OnlyIfExists::new(KeyWithDefault::new("k"));
        assert_eq!(op.apply(&source).unwrap(), Value::from("test"));
    }

    #[test]
    fn only_if_exists_missing_key_skips() {
        let source = Value::from(json!({"k": "test"}));
        let err = OnlyIfExists::new("v").apply(&source).unwrap_err();
        assert!(err.is_skip());
        assert!(matches!(err.into_error(), PortError::KeyNotFound { .. }));
    }

    #[test]
    fn only_if_exists_missing_index_skips() {
        let source = Value::from(json!(["one", "two"]));
        assert!(OnlyIfExists::new(2).apply(&source).unwrap_err().is_skip());
    }

    #[test]
    fn only_if_exists_operation_absence_skips() {
        let source = Value::from(json!(["one", "two"]));
        let op = OnlyIfExists::new(KeyWithDefault::new(2));
        let err = op.apply(&source).unwrap_err();
        assert!(matches!(err.into_error(), PortError::IndexOutOfRange { .. }));
    }

    #[test]
    fn only_if_exists_nested_skip_keeps_cause() {
        let source = Value::from(json!({"a": 1}));
        let op = OnlyIfExists::new(Transform::new(OnlyIfExists::new("b")));
        let err = op.apply(&source).unwrap_err();
        assert!(err.is_skip());
        assert!(matches!(err.into_error(), PortError::KeyNotFound { .. }));
    }

    #[test]
    fn only_if_exists_reraises_other_failures() {
        let raise_io = Transform::from_fn(|_| {
            Err(Halt::Fail(PortError::Other(anyhow::anyhow!(
                std::io::Error::other("beep boop")
            ))))
        });
        let err = OnlyIfExists::new(raise_io)
            .apply(&Value::from(json!(["one", "two"])))
            .unwrap_err();
        assert!(matches!(err, Halt::Fail(PortError::Other(_))));
    }

    #[test]
    fn only_if_exists_on_chain() {
        let source = Value::from(json!({"post": {"title": "t"}}));
        let present = get().index("post").index("title").only_if_exists();
        let absent = get().index("post").index("not_title").only_if_exists();
        assert_eq!(present.apply(&source).unwrap(), Value::from("t"));
        assert!(absent.apply(&source).unwrap_err().is_skip());
    }

    #[test]
    fn operations_splice_into_chains() {
        let source = Value::from(json!({"user": {"name": "u"}}));
        let chain = get()
            .index("user")
            .index(KeyWithDefault::new("nick").or("anon"));
        assert_eq!(chain.evaluate(&source).unwrap(), Value::from("anon"));
    }
}
