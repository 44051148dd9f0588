//! Templates wrapped as reusable callables.

use crate::engine::{Porter, Ported};
use crate::template::{Deferred, Resolution, Resolve, Template};
use remold_access::{Operation, Subscript, Transform};
use remold_core::{Outcome, PortError, Value};
use tracing::debug;

/// A template bound into a callable.
///
/// Calling it ports the template against the argument. It can also sit
/// inside another template, or be spliced into an accessor chain, as a
/// leaf. Nested in a template, it runs with the enclosing [`Porter`] unless
/// one was set with [`BoundTemplate::with_porter`], and its re-entries count
/// toward the enclosing resolution's limit.
#[derive(Debug, Clone)]
pub struct BoundTemplate {
    template: Template,
    porter: Option<Porter>,
}

impl BoundTemplate {
    pub fn new(template: impl Into<Template>) -> Self {
        Self {
            template: template.into(),
            porter: None,
        }
    }

    pub fn with_porter(mut self, porter: Porter) -> Self {
        self.porter = Some(porter);
        self
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Same as porting the template against `source`.
    pub fn call<'a>(&self, source: &'a Value) -> Result<Ported<'a>, PortError> {
        self.porter.clone().unwrap_or_default().port(source, &self.template)
    }
}

impl Resolve for BoundTemplate {
    fn resolve<'a>(&self, source: &'a Value) -> Outcome<Resolution<'a>> {
        self.resolve_within(source, &Porter::default(), 0)
    }

    fn resolve_within<'a>(
        &self,
        source: &'a Value,
        porter: &Porter,
        depth: usize,
    ) -> Outcome<Resolution<'a>> {
        debug!(template = ?self.template, depth, "Invoking bound template");
        let porter = self.porter.as_ref().unwrap_or(porter);
        match porter.resolve(source, &self.template, depth)? {
            Ported::Ready(value) => Ok(Resolution::Ready(value)),
            Ported::Deferred(pending) => Ok(Resolution::Deferred(Deferred::new(
                literal_when_done(pending),
            ))),
        }
    }
}

async fn literal_when_done(pending: Deferred<'_, Value>) -> Outcome<Template> {
    pending.await.map(Template::Literal)
}

/// A bound template used as a chain step has no way to wait.
impl Operation for BoundTemplate {
    fn apply(&self, source: &Value) -> Outcome<Value> {
        let porter = self.porter.clone().unwrap_or_default();
        match porter.resolve(source, &self.template, 0)? {
            Ported::Ready(value) => Ok(value),
            Ported::Deferred(_) => Err(PortError::DeferredInSyncContext.into()),
        }
    }
}

impl From<BoundTemplate> for Template {
    fn from(bound: BoundTemplate) -> Self {
        Template::leaf(bound)
    }
}

impl From<BoundTemplate> for Subscript {
    fn from(bound: BoundTemplate) -> Self {
        Subscript::Apply(Transform::new(bound))
    }
}

impl Template {
    /// Wrap `template` as a callable leaf.
    pub fn bound(template: impl Into<Template>) -> Self {
        BoundTemplate::new(template).into()
    }
}
