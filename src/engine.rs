//! Provisioning-engine boundary.
//!
//! The engine is the external collaborator that actually creates resources;
//! this crate only hands it descriptors in dependency order and feeds the
//! attributes it reports back into the stack's output slots. [`LocalEngine`]
//! is the in-memory implementation used by tests and the demo.

use crate::error::StackError;
use crate::plan::PlanStep;
use crate::resource::{ResourceId, ResourceKind};
use crate::stack::Stack;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use uuid::Uuid;

/// Output attributes an engine reports for one created resource.
pub type CreatedAttrs = HashMap<&'static str, String>;

/// One engine: creates a resource from its rendered descriptor.
#[async_trait]
pub trait ProvisioningEngine: Send + Sync {
    async fn create(&self, step: &PlanStep) -> Result<CreatedAttrs, StackError>;
}

/// Result of a full apply: the stack's named outputs, resolved.
#[derive(Clone, Debug)]
pub struct Applied {
    pub exports: BTreeMap<String, String>,
}

/// Apply a stack: walk the creation order, render each descriptor once its
/// references are resolved, create it, and resolve its attribute outputs so
/// dependents can render in turn.
pub async fn apply(stack: &Stack, engine: &dyn ProvisioningEngine) -> Result<Applied, StackError> {
    let order = stack.apply_order()?;
    for id in order {
        let descriptor = stack.render_descriptor(&id)?;
        let step = PlanStep { id: id.clone(), descriptor };
        tracing::info!(resource = %id, "creating");
        let attrs = engine.create(&step).await?;
        for attr in stack.attrs_for(&id) {
            let value = attrs.get(attr).ok_or_else(|| {
                StackError::Engine(format!("engine did not report {}.{}", id, attr))
            })?;
            stack.resolve_attr(&id, attr, value.clone())?;
        }
    }

    let mut exports = BTreeMap::new();
    for (name, output) in stack.exports() {
        exports.insert(name.to_string(), output.try_value()?);
    }
    tracing::info!(stack = %stack.name(), exports = exports.len(), "apply complete");
    Ok(Applied { exports })
}

/// In-memory engine: assigns uuid-suffixed physical names and ARN-shaped
/// identifiers. Region and account are fixed fakes.
#[derive(Default)]
pub struct LocalEngine {
    created: Mutex<Vec<ResourceId>>,
}

const REGION: &str = "us-east-1";
const ACCOUNT: &str = "123456789012";

impl LocalEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identities created so far, in creation order.
    pub fn created(&self) -> Vec<ResourceId> {
        self.created.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn suffix() -> String {
        Uuid::new_v4().simple().to_string()[..8].to_string()
    }
}

#[async_trait]
impl ProvisioningEngine for LocalEngine {
    async fn create(&self, step: &PlanStep) -> Result<CreatedAttrs, StackError> {
        // An apply-time descriptor must be fully concrete; a leftover
        // placeholder means a reference to something this engine never saw.
        let rendered = step.descriptor.to_string();
        if rendered.contains("${") {
            return Err(StackError::Engine(format!(
                "descriptor for {} still carries unresolved references",
                step.id
            )));
        }

        let logical = step.id.name.as_str();
        let mut attrs = CreatedAttrs::new();
        match step.id.kind {
            ResourceKind::Table => {
                let physical = format!("{}-{}", logical, Self::suffix());
                attrs.insert(
                    "arn",
                    format!("arn:aws:dynamodb:{}:{}:table/{}", REGION, ACCOUNT, physical),
                );
                attrs.insert("name", physical);
            }
            ResourceKind::Role => {
                let physical = format!("{}-{}", logical, Self::suffix());
                attrs.insert("arn", format!("arn:aws:iam::{}:role/{}", ACCOUNT, physical));
                attrs.insert("name", physical);
            }
            ResourceKind::Policy => {
                let physical = format!("{}-{}", logical, Self::suffix());
                attrs.insert("arn", format!("arn:aws:iam::{}:policy/{}", ACCOUNT, physical));
            }
            ResourceKind::Attachment | ResourceKind::Resolver => {}
            ResourceKind::Api => {
                let api_id = Self::suffix();
                attrs.insert(
                    "endpoint",
                    format!("https://{}.appsync-api.{}.amazonaws.com/graphql", api_id, REGION),
                );
                attrs.insert("id", api_id);
            }
            ResourceKind::ApiKey => {
                attrs.insert("value", format!("da2-{}", Uuid::new_v4().simple()));
            }
            ResourceKind::DataSource => {
                attrs.insert("name", format!("{}{}", logical.replace('-', ""), Self::suffix()));
            }
        }

        self.created
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(step.id.clone());
        Ok(attrs)
    }
}
