//! String template substitution.
//!
//! Replacement fields follow the familiar brace syntax:
//!
//! ```text
//! {name}            named slot, looked up on a map (or an object's fields)
//! {0} {1}           positional slots, looked up on a list or tuple
//! {} {}             automatic numbering
//! {user[name]}      nested key lookup after the slot
//! {items[0]}        nested index lookup (digits are integers)
//! {record.title}    nested field lookup
//! {{ }}             literal braces
//! ```
//!
//! Conversions (`!r`) and format specs (`:>8`) are not supported.

use crate::accessor::Accessor;
use crate::operation::{Operation, Transform};
use remold_core::{Capability, Outcome, PortError, Value};

#[derive(Debug, Clone)]
enum Root {
    Name(String),
    Position(i64),
}

#[derive(Debug, Clone)]
enum Piece {
    Text(String),
    Slot { root: Root, path: Accessor },
}

#[derive(Clone, Copy)]
enum Numbering {
    Unset,
    Automatic(i64),
    Manual,
}

/// Substitute values from the source into a format string.
///
/// A map source supplies named slots, a list or tuple source supplies
/// positional slots. Missing slots fail like the direct lookup would:
/// `KeyNotFound` for names, `IndexOutOfRange` for positions.
#[derive(Debug, Clone)]
pub struct StringTemplate {
    format: String,
    pieces: Result<Vec<Piece>, String>,
    resolver: Option<Transform>,
}

impl StringTemplate {
    pub fn new(format: impl Into<String>) -> Self {
        let format = format.into();
        let pieces = compile(&format);
        Self {
            format,
            pieces,
            resolver: None,
        }
    }

    /// Transform the source before substituting.
    pub fn with_resolver(mut self, resolver: impl Operation + 'static) -> Self {
        self.resolver = Some(Transform::new(resolver));
        self
    }

    pub fn format(&self) -> &str {
        &self.format
    }
}

impl Operation for StringTemplate {
    fn apply(&self, source: &Value) -> Outcome<Value> {
        let pieces = self
            .pieces
            .as_ref()
            .map_err(|reason| PortError::Format(reason.clone()))?;

        let resolved;
        let namespace = match &self.resolver {
            Some(resolver) => {
                resolved = resolver.apply(source)?;
                &resolved
            }
            None => source,
        };

        let mut out = String::with_capacity(self.format.len());
        for piece in pieces {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Slot { root, path } => {
                    let slot = lookup(namespace, root)?;
                    let value = path.evaluate(&slot)?;
                    out.push_str(&value.to_string());
                }
            }
        }
        Ok(Value::Str(out))
    }
}

fn lookup(namespace: &Value, root: &Root) -> Result<Value, PortError> {
    match (root, namespace.capability()) {
        (Root::Name(name), Capability::Keyed) => namespace.get_index(&Value::from(name.as_str())),
        (Root::Name(name), Capability::Fielded) => namespace.get_field(name),
        (Root::Name(name), _) => Err(PortError::KeyNotFound {
            key: format!("{name:?}"),
        }),
        (Root::Position(index), Capability::Indexed) => namespace.get_index(&Value::Int(*index)),
        (Root::Position(index), _) => Err(PortError::IndexOutOfRange {
            kind: "positional slot".into(),
            index: *index,
            len: 0,
        }),
    }
}

fn compile(format: &str) -> Result<Vec<Piece>, String> {
    let mut pieces = Vec::new();
    let mut text = String::new();
    let mut numbering = Numbering::Unset;
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push('}');
            }
            '}' => return Err("single '}' encountered in format string".into()),
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') => return Err("unexpected '{' in field name".into()),
                        Some(c) => field.push(c),
                        None => return Err("expected '}' before end of string".into()),
                    }
                }
                if !text.is_empty() {
                    pieces.push(Piece::Text(std::mem::take(&mut text)));
                }
                pieces.push(parse_field(&field, &mut numbering)?);
            }
            c => text.push(c),
        }
    }

    if !text.is_empty() {
        pieces.push(Piece::Text(text));
    }
    Ok(pieces)
}

fn parse_field(field: &str, numbering: &mut Numbering) -> Result<Piece, String> {
    if field.contains(['!', ':']) {
        return Err(format!(
            "conversions and format specs are not supported: {{{field}}}"
        ));
    }

    let split = field.find(['.', '[']).unwrap_or(field.len());
    let (head, mut rest) = field.split_at(split);

    let root = if head.is_empty() {
        match *numbering {
            Numbering::Unset => {
                *numbering = Numbering::Automatic(1);
                Root::Position(0)
            }
            Numbering::Automatic(next) => {
                *numbering = Numbering::Automatic(next + 1);
                Root::Position(next)
            }
            Numbering::Manual => {
                return Err(
                    "cannot switch from manual field numbering to automatic field numbering"
                        .into(),
                );
            }
        }
    } else if head.chars().all(|c| c.is_ascii_digit()) {
        if let Numbering::Automatic(_) = numbering {
            return Err(
                "cannot switch from automatic field numbering to manual field specification"
                    .into(),
            );
        }
        *numbering = Numbering::Manual;
        Root::Position(parse_position(head)?)
    } else {
        Root::Name(head.to_string())
    };

    let mut path = Accessor::identity();
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            let end = after.find(['.', '[']).unwrap_or(after.len());
            let name = &after[..end];
            if name.is_empty() {
                return Err(format!("empty attribute in format field {{{field}}}"));
            }
            path = path.field(name);
            rest = &after[end..];
        } else if let Some(after) = rest.strip_prefix('[') {
            let end = after
                .find(']')
                .ok_or_else(|| format!("missing ']' in format field {{{field}}}"))?;
            let key = &after[..end];
            if key.is_empty() {
                return Err(format!("empty index in format field {{{field}}}"));
            }
            path = if key.chars().all(|c| c.is_ascii_digit()) {
                path.index(parse_position(key)?)
            } else {
                path.index(key)
            };
            rest = &after[end + 1..];
        } else {
            return Err(format!(
                "only '.' or '[' may follow ']' in format field {{{field}}}"
            ));
        }
    }

    Ok(Piece::Slot { root, path })
}

fn parse_position(digits: &str) -> Result<i64, String> {
    digits
        .parse()
        .map_err(|_| format!("field index {digits} is too large"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::get;
    use remold_core::{Halt, Object};
    use serde_json::json;

    fn render(format: &str, source: serde_json::Value) -> Outcome<Value> {
        StringTemplate::new(format).apply(&Value::from(source))
    }

    #[test]
    fn named_slots_from_map() {
        let out = render("Test value: {name}", json!({"name": "Test"})).unwrap();
        assert_eq!(out, Value::from("Test value: Test"));
    }

    #[test]
    fn positional_slots_from_list() {
        let source = json!(["test", "test2"]);
        assert_eq!(
            render("{0} vs {1}", source.clone()).unwrap(),
            Value::from("test vs test2")
        );
        assert_eq!(
            render("{} vs {}", source).unwrap(),
            Value::from("test vs test2")
        );
    }

    #[test]
    fn doubled_braces_are_literal() {
        let out = render("Test name {{name}}", json!({"name": "test"})).unwrap();
        assert_eq!(out, Value::from("Test name {name}"));
    }

    #[test]
    fn missing_name_is_key_not_found() {
        let err = render("test name: {name}", json!({"type": "test"})).unwrap_err();
        assert!(matches!(err, Halt::Fail(PortError::KeyNotFound { .. })));
    }

    #[test]
    fn missing_position_is_out_of_range() {
        let err = render("{0} {1} {2}", json!(["one"])).unwrap_err();
        assert!(matches!(err, Halt::Fail(PortError::IndexOutOfRange { .. })));
    }

    #[test]
    fn nested_paths() {
        let source = json!({
            "one": {"attr_a": "foo", "attr_b": ["works", "with", "arrays"]},
            "five": {"attr_c": ["and", "with", "tuples"]}
        });
        let out = render("{one[attr_b][0]} {five[attr_c][2]}", source).unwrap();
        assert_eq!(out, Value::from("works tuples"));
    }

    #[test]
    fn object_source_supplies_fields() {
        let source = Value::from(
            Object::new("Post")
                .with_field("title", "t")
                .with_field("meta", Object::new("Meta").with_field("lang", "en")),
        );
        let op = StringTemplate::new("{title} ({meta.lang})");
        assert_eq!(op.apply(&source).unwrap(), Value::from("t (en)"));
    }

    #[test]
    fn resolver_pretransforms_source() {
        let op = StringTemplate::new("by {name}").with_resolver(get().index("user"));
        let source = Value::from(json!({"user": {"name": "u"}}));
        assert_eq!(op.apply(&source).unwrap(), Value::from("by u"));
    }

    #[test]
    fn named_slot_on_list_is_key_not_found() {
        let err = render("{name}", json!(["a"])).unwrap_err();
        assert!(matches!(err, Halt::Fail(PortError::KeyNotFound { .. })));
    }

    #[test]
    fn positional_slot_on_map_is_out_of_range() {
        let err = render("{0}", json!({"a": 1})).unwrap_err();
        assert!(matches!(err, Halt::Fail(PortError::IndexOutOfRange { .. })));
    }

    #[test]
    fn scalar_source_is_absence() {
        let err = StringTemplate::new("{x}").apply(&Value::Int(1)).unwrap_err();
        assert!(matches!(err, Halt::Fail(ref e) if e.is_absence()));
    }

    #[test]
    fn non_string_values_render() {
        let out = render("{n}/{f}/{b}/{l}", json!({"n": 3, "f": 1.5, "b": true, "l": [1, 2]}))
            .unwrap();
        assert_eq!(out, Value::from("3/1.5/true/[1,2]"));
    }

    #[test]
    fn malformed_formats_fail() {
        for bad in ["{", "}", "{a{b}", "{0} {}", "{} {0}", "{x:>8}", "{x!r}", "{x[0}"] {
            let err = render(bad, json!({"x": 1, "a": 1})).unwrap_err();
            assert!(
                matches!(err, Halt::Fail(PortError::Format(_))),
                "expected format error for {bad:?}"
            );
        }
    }

    #[test]
    fn named_slot_after_automatic_on_list() {
        let out = render("{} {name}", json!(["pos"]));
        assert!(matches!(out, Err(Halt::Fail(PortError::KeyNotFound { .. }))));
    }
}
