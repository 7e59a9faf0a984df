//! Render a stack into a dependency-ordered provisioning plan.
//!
//! Each step is a plain resource descriptor (the resource-description
//! protocol the engine consumes). Steps are ordered so that every resource
//! comes after the resources whose outputs it references; references that
//! are still unresolved render as `${resource.attr}` placeholder tokens.

use crate::error::StackError;
use crate::output::Output;
use crate::resource::ResourceId;
use crate::stack::{Declaration, Stack};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

/// One resource to create: identity plus its rendered descriptor.
#[derive(Clone, Debug)]
pub struct PlanStep {
    pub id: ResourceId,
    pub descriptor: Value,
}

/// Ordered set of creation steps for one stack.
#[derive(Clone, Debug, Default)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn step(&self, id: &ResourceId) -> Option<&PlanStep> {
        self.steps.iter().find(|s| &s.id == id)
    }
}

/// A resolved output renders as its value; a pending attribute reference
/// renders as a placeholder token. A pending derived output has no symbolic
/// form and cannot appear in a plan.
fn render_ref(output: &Output<String>) -> Result<String, StackError> {
    if let Some(value) = output.value() {
        return Ok(value);
    }
    match output.reference() {
        Some((source, attr)) => Ok(format!("${{{}.{}}}", source, attr)),
        None => Err(StackError::Unresolved(output.label())),
    }
}

impl Stack {
    /// Creation order: topological over output references, stable in
    /// declaration order among independent resources.
    pub fn apply_order(&self) -> Result<Vec<ResourceId>, StackError> {
        let resources = self.resources();
        let mut emitted: HashSet<ResourceId> = HashSet::new();
        let mut order = Vec::with_capacity(resources.len());
        while order.len() < resources.len() {
            let mut progressed = false;
            for resource in resources {
                if emitted.contains(&resource.id) {
                    continue;
                }
                if resource
                    .declaration
                    .dependencies()
                    .iter()
                    .all(|dep| emitted.contains(dep))
                {
                    emitted.insert(resource.id.clone());
                    order.push(resource.id.clone());
                    progressed = true;
                }
            }
            if !progressed {
                return Err(StackError::Validation(
                    "dependency cycle among declared resources".into(),
                ));
            }
        }
        Ok(order)
    }

    /// Render the full plan. Safe to call before apply; unresolved
    /// attribute references appear as placeholder tokens.
    pub fn plan(&self) -> Result<Plan, StackError> {
        let order = self.apply_order()?;
        let mut steps = Vec::with_capacity(order.len());
        for id in order {
            let descriptor = self.render_descriptor(&id)?;
            steps.push(PlanStep { id, descriptor });
        }
        tracing::debug!(stack = %self.name(), steps = steps.len(), "plan rendered");
        Ok(Plan { steps })
    }

    /// Descriptor for one resource, with references rendered at call time.
    /// The apply driver re-renders each step once its references resolve.
    pub(crate) fn render_descriptor(&self, id: &ResourceId) -> Result<Value, StackError> {
        let declaration = self
            .declaration(id)
            .ok_or_else(|| StackError::MissingReference { kind: "resource", id: id.to_string() })?;
        let properties = render_properties(declaration)?;
        Ok(json!({
            "id": id.to_string(),
            "type": id.kind.as_str(),
            "name": id.name,
            "properties": properties,
        }))
    }
}

fn render_properties(declaration: &Declaration) -> Result<Value, StackError> {
    let value = match declaration {
        Declaration::Table(spec) => {
            serde_json::to_value(spec).map_err(|e| StackError::Validation(e.to_string()))?
        }
        Declaration::Role(spec) => json!({
            "assumeRolePolicy": spec.trust().to_document(),
        }),
        Declaration::Policy(spec) => {
            let mut first_err = None;
            let document = spec.document().to_document(|output| {
                render_ref(output).unwrap_or_else(|e| {
                    first_err.get_or_insert(e);
                    String::new()
                })
            });
            if let Some(e) = first_err {
                return Err(e);
            }
            json!({ "policy": document })
        }
        Declaration::Attachment(spec) => json!({
            "role": render_ref(&spec.role_name)?,
            "policyArn": render_ref(&spec.policy_arn)?,
        }),
        Declaration::Api(spec) => json!({
            "authenticationType": spec.auth_mode().as_str(),
            "schema": spec.schema().text(),
        }),
        Declaration::ApiKey(spec) => {
            let mut properties = Map::new();
            properties.insert("apiId".into(), json!(render_ref(&spec.api_id)?));
            if let Some(expires) = spec.expires() {
                properties.insert("expires".into(), json!(expires.to_rfc3339()));
            }
            Value::Object(properties)
        }
        Declaration::DataSource(spec) => json!({
            "apiId": render_ref(&spec.api_id)?,
            "name": spec.name(),
            "type": "AMAZON_DYNAMODB",
            "dynamodbConfig": { "tableName": render_ref(&spec.table_name)? },
            "serviceRoleArn": render_ref(&spec.service_role_arn)?,
        }),
        Declaration::Resolver(spec) => json!({
            "apiId": render_ref(&spec.api_id)?,
            "dataSource": render_ref(&spec.data_source_name)?,
            "type": spec.operation_type().as_str(),
            "field": spec.field(),
            "requestTemplate": spec.request().to_vtl(),
            "responseTemplate": spec.response().to_vtl(),
        }),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{
        AuthMode, KeyType, OperationType, ResourceKind, Statement, TableSpec, TrustPolicy,
    };
    use crate::resource::iam::PolicyDocument;
    use crate::schema::SchemaDocument;
    use crate::stack::StackBuilder;
    use crate::template::{arg, RequestTemplate, ResponseTemplate};

    const SCHEMA: &str = r#"
        type Query { getTenantById(id: ID!): Tenant }
        type Mutation { addTenant(id: ID!, name: String!): Tenant! }
        type Tenant { id: ID! name: String }
    "#;

    fn tenants_stack() -> Stack {
        let mut builder = StackBuilder::new("tenants");
        let table = builder
            .declare_table(TableSpec::new("tenants", "id", KeyType::String))
            .unwrap();
        let role = builder
            .declare_role("api-role", TrustPolicy::service("appsync.amazonaws.com"))
            .unwrap();
        let policy = builder
            .declare_policy(
                "api-policy",
                PolicyDocument::new().statement(
                    Statement::allow()
                        .action("dynamodb:GetItem")
                        .action("dynamodb:PutItem")
                        .resource(table.arn.clone()),
                ),
            )
            .unwrap();
        builder.attach("api-policy-attachment", &role, &policy).unwrap();
        let api = builder
            .declare_api("tenants-api", AuthMode::ApiKey, SchemaDocument::parse(SCHEMA).unwrap())
            .unwrap();
        builder.declare_api_key("tenants-key", &api, None).unwrap();
        let ds = builder
            .declare_data_source("tenants-ds", &api, &table, &role)
            .unwrap();
        builder
            .declare_resolver(
                "get-resolver",
                &api,
                &ds,
                OperationType::Query,
                "getTenantById",
                RequestTemplate::get_item().key("id", arg("id")),
                ResponseTemplate::result_to_json(),
            )
            .unwrap();
        builder
            .declare_resolver(
                "add-resolver",
                &api,
                &ds,
                OperationType::Mutation,
                "addTenant",
                RequestTemplate::put_item()
                    .key("id", arg("id"))
                    .attribute("name", arg("name")),
                ResponseTemplate::result_to_json(),
            )
            .unwrap();
        builder.build().unwrap()
    }

    fn position(order: &[ResourceId], kind: ResourceKind, name: &str) -> usize {
        order
            .iter()
            .position(|id| id.kind == kind && id.name == name)
            .unwrap()
    }

    #[test]
    fn order_follows_output_references() {
        let order = tenants_stack().apply_order().unwrap();
        let table = position(&order, ResourceKind::Table, "tenants");
        let policy = position(&order, ResourceKind::Policy, "api-policy");
        let role = position(&order, ResourceKind::Role, "api-role");
        let attachment = position(&order, ResourceKind::Attachment, "api-policy-attachment");
        let api = position(&order, ResourceKind::Api, "tenants-api");
        let ds = position(&order, ResourceKind::DataSource, "tenants-ds");
        let get = position(&order, ResourceKind::Resolver, "get-resolver");

        assert!(table < policy);
        assert!(role < attachment && policy < attachment);
        assert!(api < ds && table < ds && role < ds);
        assert!(ds < get);
    }

    #[test]
    fn unresolved_references_render_as_placeholder_tokens() {
        let stack = tenants_stack();
        let plan = stack.plan().unwrap();
        let ds_id = ResourceId::new(ResourceKind::DataSource, "tenants-ds");
        let step = plan.step(&ds_id).unwrap();
        assert_eq!(
            step.descriptor["properties"]["dynamodbConfig"]["tableName"],
            "${table.tenants.name}"
        );
        assert_eq!(
            step.descriptor["properties"]["serviceRoleArn"],
            "${role.api-role.arn}"
        );
    }

    #[test]
    fn table_descriptor_carries_key_schema_and_capacity() {
        let stack = tenants_stack();
        let plan = stack.plan().unwrap();
        let step = plan.step(&ResourceId::new(ResourceKind::Table, "tenants")).unwrap();
        let props = &step.descriptor["properties"];
        assert_eq!(props["hashKey"], "id");
        assert_eq!(props["keyType"], "S");
        assert_eq!(props["readCapacity"], 1);
        assert_eq!(props["pointInTimeRecovery"], false);
    }

    #[test]
    fn resolver_descriptor_embeds_deployed_template_text() {
        let stack = tenants_stack();
        let plan = stack.plan().unwrap();
        let step = plan
            .step(&ResourceId::new(ResourceKind::Resolver, "add-resolver"))
            .unwrap();
        let props = &step.descriptor["properties"];
        assert_eq!(props["type"], "Mutation");
        assert_eq!(props["field"], "addTenant");
        let request = props["requestTemplate"].as_str().unwrap();
        assert!(request.contains("\"operation\" : \"PutItem\""));
        assert!(request.contains("$util.dynamodb.toDynamoDBJson($ctx.args.name)"));
        assert_eq!(props["responseTemplate"], "$util.toJson($ctx.result)");
    }
}
