//! Deferred resource outputs: values known only after apply.
//!
//! A declaration consuming another resource's output (a table ARN, an API
//! id) must not eagerly concatenate strings it does not have yet. [`Output`]
//! carries the producing resource's identity instead, so the planner can
//! order steps by data flow and render unresolved values as `${id.attr}`
//! placeholder tokens until the engine fills them in.

use crate::error::StackError;
use crate::resource::ResourceId;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Shared slot the engine writes a resolved attribute into.
pub(crate) type Slot = Arc<RwLock<Option<String>>>;

enum Node<T> {
    Literal(T),
    Attr {
        source: ResourceId,
        attr: &'static str,
        cell: Slot,
        read: Box<dyn Fn(&str) -> T + Send + Sync>,
    },
    Mapped {
        deps: Vec<ResourceId>,
        label: String,
        get: Box<dyn Fn() -> Option<T> + Send + Sync>,
    },
}

/// A value produced by a resource at apply time.
///
/// Before apply, an attribute output knows only which resource will produce
/// it; after apply the engine resolves the underlying slot and `value()`
/// returns `Some`. Derived outputs are built with [`Output::map`] and keep
/// the producer dependencies.
pub struct Output<T> {
    node: Arc<Node<T>>,
}

impl<T> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self { node: Arc::clone(&self.node) }
    }
}

impl<T> fmt::Debug for Output<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Output({})", self.label())
    }
}

impl<T> Output<T> {
    /// An already-known value.
    pub fn literal(value: T) -> Self {
        Self { node: Arc::new(Node::Literal(value)) }
    }

    /// Resources whose apply must complete before this value exists.
    pub fn dependencies(&self) -> Vec<ResourceId> {
        match &*self.node {
            Node::Literal(_) => Vec::new(),
            Node::Attr { source, .. } => vec![source.clone()],
            Node::Mapped { deps, .. } => deps.clone(),
        }
    }

    /// The `(resource, attribute)` this output reads, if it is a plain
    /// attribute reference. Used by the planner for placeholder tokens.
    pub(crate) fn reference(&self) -> Option<(&ResourceId, &'static str)> {
        match &*self.node {
            Node::Attr { source, attr, .. } => Some((source, attr)),
            _ => None,
        }
    }

    /// Human-readable origin, for diagnostics and `Unresolved` errors.
    pub fn label(&self) -> String {
        match &*self.node {
            Node::Literal(_) => "literal".into(),
            Node::Attr { source, attr, .. } => format!("{}.{}", source, attr),
            Node::Mapped { label, .. } => label.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Output<T> {
    /// The resolved value, if apply has produced it.
    pub fn value(&self) -> Option<T> {
        match &*self.node {
            Node::Literal(v) => Some(v.clone()),
            Node::Attr { cell, read, .. } => {
                let guard = cell.read().unwrap_or_else(|e| e.into_inner());
                guard.as_deref().map(|raw| read(raw))
            }
            Node::Mapped { get, .. } => get(),
        }
    }

    /// The resolved value, or [`StackError::Unresolved`] naming the origin.
    pub fn try_value(&self) -> Result<T, StackError> {
        self.value().ok_or_else(|| StackError::Unresolved(self.label()))
    }

    /// A derived output. The transform runs on demand against the resolved
    /// parent value; dependencies carry over unchanged.
    pub fn map<U, F>(&self, f: F) -> Output<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let parent = self.clone();
        let deps = self.dependencies();
        let label = format!("map({})", self.label());
        Output {
            node: Arc::new(Node::Mapped {
                deps,
                label,
                get: Box::new(move || parent.value().map(&f)),
            }),
        }
    }
}

impl Output<String> {
    /// An attribute of a declared resource, backed by a shared slot the
    /// engine resolves at apply time.
    pub(crate) fn attr(source: ResourceId, attr: &'static str, cell: Slot) -> Self {
        Self {
            node: Arc::new(Node::Attr {
                source,
                attr,
                cell,
                read: Box::new(str::to_owned),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKind;

    fn attr_output(name: &str, attr: &'static str) -> (Output<String>, Slot) {
        let cell: Slot = Arc::new(RwLock::new(None));
        let id = ResourceId::new(ResourceKind::Table, name);
        (Output::attr(id, attr, Arc::clone(&cell)), cell)
    }

    #[test]
    fn literal_is_always_resolved() {
        let out = Output::literal("tenants".to_string());
        assert_eq!(out.value().as_deref(), Some("tenants"));
        assert!(out.dependencies().is_empty());
    }

    #[test]
    fn attr_resolves_after_slot_write() {
        let (out, cell) = attr_output("tenants", "arn");
        assert_eq!(out.value(), None);
        assert!(matches!(out.try_value(), Err(StackError::Unresolved(_))));

        *cell.write().unwrap() = Some("arn:aws:dynamodb:::table/tenants-1".into());
        assert_eq!(out.try_value().unwrap(), "arn:aws:dynamodb:::table/tenants-1");
    }

    #[test]
    fn map_keeps_dependencies_and_defers_transform() {
        let (out, cell) = attr_output("tenants", "name");
        let upper = out.map(|n| n.to_uppercase());
        assert_eq!(upper.dependencies(), out.dependencies());
        assert_eq!(upper.value(), None);

        *cell.write().unwrap() = Some("tenants-ab12".into());
        assert_eq!(upper.value().as_deref(), Some("TENANTS-AB12"));
    }

    #[test]
    fn labels_name_the_producing_attribute() {
        let (out, _cell) = attr_output("tenants", "arn");
        assert_eq!(out.label(), "table.tenants.arn");
        assert_eq!(out.map(|v| v).label(), "map(table.tenants.arn)");
    }
}
