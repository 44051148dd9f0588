//! The resolution engine.
//!
//! [`Porter::port`] walks a [`Template`] against a source value and builds
//! an output of the same shape. Resolution is synchronous unless a leaf
//! defers: only then does the enclosing container (and every container
//! around it) turn into a [`Deferred`] build. Deferred entries are awaited
//! in template order.

use crate::template::{Deferred, Resolution, Resolve, Template};
use remold_config::EngineConfig;
use remold_core::{Halt, Key, Map, Outcome, PortError, Value};
use tracing::{debug, trace, warn};

/// The result of porting a template.
#[derive(Debug)]
pub enum Ported<'a> {
    /// Every leaf resolved synchronously.
    Ready(Value),
    /// At least one leaf deferred; await this for the full output.
    Deferred(Deferred<'a, Value>),
}

impl<'a> Ported<'a> {
    pub fn is_deferred(&self) -> bool {
        matches!(self, Ported::Deferred(_))
    }

    /// The value, if resolution finished synchronously.
    pub fn ready(self) -> Option<Value> {
        match self {
            Ported::Ready(value) => Some(value),
            Ported::Deferred(_) => None,
        }
    }

    /// Wait for the final value.
    pub async fn resolve(self) -> Result<Value, PortError> {
        self.settle().await.map_err(Halt::into_error)
    }

    async fn settle(self) -> Outcome<Value> {
        match self {
            Ported::Ready(value) => Ok(value),
            Ported::Deferred(pending) => pending.await,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SeqKind {
    List,
    Tuple,
    Set,
}

impl SeqKind {
    fn build(self, items: Vec<Value>) -> Value {
        match self {
            SeqKind::List => Value::List(items),
            SeqKind::Tuple => Value::Tuple(items),
            SeqKind::Set => Value::set_from(items),
        }
    }
}

/// Resolves templates with a given [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct Porter {
    config: EngineConfig,
}

/// Port `template` against `source` with the default configuration.
///
/// Returns [`Ported::Ready`] whenever no leaf defers.
pub fn port<'a>(source: &'a Value, template: &Template) -> Result<Ported<'a>, PortError> {
    Porter::default().port(source, template)
}

impl Porter {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Port `template` against `source`.
    ///
    /// A skip that reaches the top level has no container to drop it from,
    /// so it surfaces as its underlying cause.
    pub fn port<'a>(
        &self,
        source: &'a Value,
        template: &Template,
    ) -> Result<Ported<'a>, PortError> {
        let ported = self.resolve(source, template, 0).map_err(Halt::into_error)?;
        Ok(match ported {
            Ported::Deferred(pending) => Ported::Deferred(Deferred::new(async move {
                pending.await.map_err(|halt| Halt::Fail(halt.into_error()))
            })),
            ready => ready,
        })
    }

    /// Port without collapsing a top-level skip.
    pub(crate) fn resolve<'a>(
        &self,
        source: &'a Value,
        template: &Template,
        depth: usize,
    ) -> Outcome<Ported<'a>> {
        match template {
            Template::Literal(value) => Ok(Ported::Ready(value.clone())),
            Template::Leaf(leaf) => self.resolve_leaf(source, leaf.as_ref(), depth),
            Template::Map(entries) => self.resolve_map(source, entries, depth),
            Template::List(items) => self.resolve_seq(source, items, SeqKind::List, depth),
            Template::Tuple(items) => self.resolve_seq(source, items, SeqKind::Tuple, depth),
            Template::Set(items) => self.resolve_seq(source, items, SeqKind::Set, depth),
        }
    }

    fn resolve_leaf<'a>(
        &self,
        source: &'a Value,
        leaf: &dyn Resolve,
        depth: usize,
    ) -> Outcome<Ported<'a>> {
        match leaf.resolve_within(source, self, depth)? {
            Resolution::Ready(value) => Ok(Ported::Ready(value)),
            Resolution::Deferred(pending) => Ok(Ported::Deferred(Deferred::new(
                self.clone().reenter(source, pending, depth),
            ))),
        }
    }

    /// Await a deferred leaf and resolve whatever it produced against the
    /// same source, until a concrete value comes out.
    async fn reenter<'a>(
        self,
        source: &'a Value,
        pending: Deferred<'a, Template>,
        depth: usize,
    ) -> Outcome<Value> {
        let depth = depth + 1;
        let limit = self.config.max_resolution_depth;
        if depth > limit {
            warn!(limit, "Deferred resolution exceeded the re-entry limit");
            return Err(Halt::Fail(PortError::ResolutionLimit { limit }));
        }

        let template = pending.await?;
        self.resolve(source, &template, depth)?.settle().await
    }

    fn resolve_map<'a>(
        &self,
        source: &'a Value,
        entries: &[(Template, Template)],
        depth: usize,
    ) -> Outcome<Ported<'a>> {
        let mut resolved = Vec::with_capacity(entries.len());
        let mut deferred = false;

        for (key, value) in entries {
            let Some(key) = self.absorb(self.resolve(source, key, depth))? else {
                continue;
            };
            let Some(value) = self.absorb(self.resolve(source, value, depth))? else {
                continue;
            };
            deferred |= key.is_deferred() || value.is_deferred();
            resolved.push((key, value));
        }

        if !deferred {
            let mut map = Map::with_capacity(resolved.len());
            for (key, value) in resolved {
                if let (Ported::Ready(key), Ported::Ready(value)) = (key, value) {
                    map.insert(Key::try_from(key)?, value);
                }
            }
            return Ok(Ported::Ready(Value::Map(map)));
        }

        debug!(entries = resolved.len(), "Map template escalated to deferred construction");
        Ok(Ported::Deferred(Deferred::new(self.clone().build_map(resolved))))
    }

    /// Await map entries in template order.
    async fn build_map(self, entries: Vec<(Ported<'_>, Ported<'_>)>) -> Outcome<Value> {
        let mut map = Map::with_capacity(entries.len());
        for (key, value) in entries {
            let Some(key) = self.absorb(key.settle().await)? else {
                continue;
            };
            let Some(value) = self.absorb(value.settle().await)? else {
                continue;
            };
            map.insert(Key::try_from(key)?, value);
        }
        Ok(Value::Map(map))
    }

    fn resolve_seq<'a>(
        &self,
        source: &'a Value,
        items: &[Template],
        kind: SeqKind,
        depth: usize,
    ) -> Outcome<Ported<'a>> {
        let mut resolved = Vec::with_capacity(items.len());
        let mut deferred = false;

        for item in items {
            if let Some(item) = self.absorb(self.resolve(source, item, depth))? {
                deferred |= item.is_deferred();
                resolved.push(item);
            }
        }

        if !deferred {
            let values = resolved.into_iter().filter_map(Ported::ready).collect();
            return Ok(Ported::Ready(kind.build(values)));
        }

        debug!(
            ?kind,
            items = resolved.len(),
            "Sequence template escalated to deferred construction"
        );
        Ok(Ported::Deferred(Deferred::new(self.clone().build_seq(resolved, kind))))
    }

    /// Await sequence elements in template order.
    async fn build_seq(self, items: Vec<Ported<'_>>, kind: SeqKind) -> Outcome<Value> {
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            if let Some(value) = self.absorb(item.settle().await)? {
                values.push(value);
            }
        }
        Ok(kind.build(values))
    }

    /// Turn a skip into "no entry"; pass everything else through.
    fn absorb<T>(&self, outcome: Outcome<T>) -> Result<Option<T>, Halt> {
        match outcome {
            Ok(value) => Ok(Some(value)),
            Err(Halt::Skip(signal)) => {
                if self.config.trace_skips {
                    trace!(%signal, "Dropping skipped template entry");
                }
                Ok(None)
            }
            Err(fail) => Err(fail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remold_access::{OnlyIfExists, get};
    use serde_json::json;

    fn source() -> Value {
        Value::from(json!({
            "post": {"title": "test title", "content": "lorem ipsum..."},
            "user": {"id": 0, "name": "test", "group": "Admin"}
        }))
    }

    fn ready(template: &Template) -> Value {
        let src = source();
        match port(&src, template).unwrap() {
            Ported::Ready(value) => value,
            Ported::Deferred(_) => panic!("synchronous template deferred"),
        }
    }

    #[test]
    fn literal_passes_through() {
        assert_eq!(ready(&Template::from("x")), Value::from("x"));
    }

    #[test]
    fn map_skips_absent_pair() {
        let template = Template::map([
            ("author", Template::from(get().index("user").index("name"))),
            ("title", Template::from(OnlyIfExists::new(get().index("post").index("not_title")))),
        ]);
        assert_eq!(ready(&template), Value::from(json!({"author": "test"})));
    }

    #[test]
    fn skipped_key_drops_pair() {
        let template = Template::map([
            (Template::from(OnlyIfExists::new("missing")), Template::from(1)),
            (Template::from("kept"), Template::from(2)),
        ]);
        assert_eq!(ready(&template), Value::from(json!({"kept": 2})));
    }

    #[test]
    fn duplicate_keys_overwrite_in_place() {
        let template = Template::map([
            (Template::from("a"), Template::from(1)),
            (Template::from("b"), Template::from(2)),
            (Template::accessor(get().index("user").index("name")), Template::from(3)),
            (Template::from("a"), Template::from(4)),
        ]);
        let Value::Map(map) = ready(&template) else {
            panic!("expected a map");
        };
        let keys: Vec<_> = map.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, [r#""a""#, r#""b""#, r#""test""#]);
        assert_eq!(map[&Key::from("a")], Value::Int(4));
    }

    #[test]
    fn resolved_keys_must_be_hashable() {
        let template = Template::map([(get().index("post"), Template::from(1))]);
        let src = source();
        let err = port(&src, &template).unwrap_err();
        assert!(matches!(err, PortError::TypeMismatch(_)));
    }

    #[test]
    fn sequence_kinds_are_preserved() {
        let tuple = Template::tuple([
            get().index("user").index("id"),
            get().index("user").index("name"),
        ]);
        assert_eq!(
            ready(&tuple),
            Value::Tuple(vec![Value::Int(0), Value::from("test")])
        );

        let set = Template::set([Template::from(1), Template::from(1), Template::from(2)]);
        assert_eq!(ready(&set), Value::Set(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn list_skips_shorten_output() {
        let template = Template::list([
            Template::from(OnlyIfExists::new("nope")),
            Template::from(get().index("user").index("group")),
            Template::from(OnlyIfExists::new(get().index("post").index("author"))),
            Template::from(5),
        ]);
        assert_eq!(ready(&template), Value::from(json!(["Admin", 5])));
    }

    #[test]
    fn top_level_skip_surfaces_cause() {
        let src = source();
        let err = port(&src, &Template::from(OnlyIfExists::new("absent"))).unwrap_err();
        assert!(matches!(err, PortError::KeyNotFound { .. }));
    }

    #[test]
    fn failure_aborts_whole_port() {
        let template = Template::map([
            ("ok", Template::from(get().index("user").index("name"))),
            ("bad", Template::from(get().index("user").index("doesnt_exist"))),
        ]);
        let src = source();
        assert!(matches!(
            port(&src, &template),
            Err(PortError::KeyNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn deferred_leaf_escalates_enclosing_containers() {
        let template = Template::map([(
            "outer",
            Template::list([
                Template::from(1),
                Template::deferred(|_| async { Outcome::Ok(Template::from(2)) }),
            ]),
        )]);
        let src = source();
        let ported = port(&src, &template).unwrap();
        assert!(ported.is_deferred());
        assert_eq!(
            ported.resolve().await.unwrap(),
            Value::from(json!({"outer": [1, 2]}))
        );
    }

    #[tokio::test]
    async fn reentry_limit_is_enforced() {
        fn forever() -> Template {
            Template::deferred(|_| async { Outcome::Ok(forever()) })
        }
        let porter = Porter::new(EngineConfig {
            max_resolution_depth: 8,
            ..EngineConfig::default()
        });
        let src = source();
        let err = porter
            .port(&src, &forever())
            .unwrap()
            .resolve()
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::ResolutionLimit { limit: 8 }));
    }
}
