//! Explicit resource-graph builder.
//!
//! All declarations register against a passed-in [`StackBuilder`]; there is
//! no ambient global registry. Each `declare_*` call validates its inputs
//! locally, hands back a typed handle whose attributes are deferred
//! [`Output`]s, and records the declaration for planning. Cross-resource
//! references only ever travel through those outputs, which is how the
//! dependency edges the planner orders by come into existence.

use crate::error::StackError;
use crate::output::{Output, Slot};
use crate::resource::api::{Api, ApiKey, ApiKeySpec, ApiSpec, AuthMode};
use crate::resource::binding::{DataSource, DataSourceSpec, OperationType, Resolver, ResolverSpec};
use crate::resource::iam::{
    Attachment, AttachmentSpec, Policy, PolicyDocument, PolicySpec, Role, RoleSpec, TrustPolicy,
};
use crate::resource::table::{Table, TableSpec};
use crate::resource::{ResourceId, ResourceKind};
use crate::schema::SchemaDocument;
use crate::template::{RequestTemplate, ResponseTemplate};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// One registered declaration.
#[derive(Clone, Debug)]
pub enum Declaration {
    Table(TableSpec),
    Role(RoleSpec),
    Policy(PolicySpec),
    Attachment(AttachmentSpec),
    Api(ApiSpec),
    ApiKey(ApiKeySpec),
    DataSource(DataSourceSpec),
    Resolver(ResolverSpec),
}

impl Declaration {
    /// Resources whose outputs this declaration consumes.
    pub(crate) fn dependencies(&self) -> Vec<ResourceId> {
        let outputs: Vec<&Output<String>> = match self {
            Self::Table(_) | Self::Role(_) | Self::Api(_) => Vec::new(),
            Self::Policy(spec) => spec
                .document()
                .statements()
                .iter()
                .flat_map(|s| s.resources())
                .collect(),
            Self::Attachment(spec) => vec![&spec.role_name, &spec.policy_arn],
            Self::ApiKey(spec) => vec![&spec.api_id],
            Self::DataSource(spec) => {
                vec![&spec.api_id, &spec.table_name, &spec.service_role_arn]
            }
            Self::Resolver(spec) => vec![&spec.api_id, &spec.data_source_name],
        };
        let mut deps: Vec<ResourceId> = outputs
            .into_iter()
            .flat_map(|o| o.dependencies())
            .collect();
        deps.sort();
        deps.dedup();
        deps
    }
}

#[derive(Debug)]
pub(crate) struct RegisteredResource {
    pub(crate) id: ResourceId,
    pub(crate) declaration: Declaration,
}

/// Builder for a stack of declarations. Finish with [`StackBuilder::build`].
pub struct StackBuilder {
    name: String,
    resources: Vec<RegisteredResource>,
    ids: HashSet<ResourceId>,
    resolver_bindings: HashMap<(ResourceId, OperationType, String), ResourceId>,
    slots: HashMap<(ResourceId, &'static str), Slot>,
    exports: Vec<(String, Output<String>)>,
}

impl StackBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: Vec::new(),
            ids: HashSet::new(),
            resolver_bindings: HashMap::new(),
            slots: HashMap::new(),
            exports: Vec::new(),
        }
    }

    fn register(&mut self, id: ResourceId, declaration: Declaration) -> Result<(), StackError> {
        if !self.ids.insert(id.clone()) {
            return Err(StackError::DuplicateName(id.to_string()));
        }
        self.resources.push(RegisteredResource { id, declaration });
        Ok(())
    }

    fn attr_output(&mut self, id: &ResourceId, attr: &'static str) -> Output<String> {
        let cell: Slot = Arc::new(RwLock::new(None));
        self.slots.insert((id.clone(), attr), Arc::clone(&cell));
        Output::attr(id.clone(), attr, cell)
    }

    fn require_declared(&self, id: &ResourceId, kind: &'static str) -> Result<(), StackError> {
        if self.ids.contains(id) {
            Ok(())
        } else {
            Err(StackError::MissingReference { kind, id: id.to_string() })
        }
    }

    /// Declare a key-value table. The key schema is fixed from here on.
    pub fn declare_table(&mut self, spec: TableSpec) -> Result<Table, StackError> {
        spec.validate()?;
        let id = ResourceId::new(ResourceKind::Table, spec.name());
        let name = self.attr_output(&id, "name");
        let arn = self.attr_output(&id, "arn");
        self.register(id.clone(), Declaration::Table(spec))?;
        Ok(Table { id, name, arn })
    }

    /// Declare a role assumable by the given service principal.
    pub fn declare_role(
        &mut self,
        name: impl Into<String>,
        trust: TrustPolicy,
    ) -> Result<Role, StackError> {
        trust.validate()?;
        let spec = RoleSpec::new(name, trust);
        let id = ResourceId::new(ResourceKind::Role, spec.name());
        let role_name = self.attr_output(&id, "name");
        let arn = self.attr_output(&id, "arn");
        self.register(id.clone(), Declaration::Role(spec))?;
        Ok(Role { id, name: role_name, arn })
    }

    /// Declare a permission policy.
    pub fn declare_policy(
        &mut self,
        name: impl Into<String>,
        document: PolicyDocument,
    ) -> Result<Policy, StackError> {
        document.validate()?;
        let spec = PolicySpec::new(name, document);
        let id = ResourceId::new(ResourceKind::Policy, spec.name());
        let arn = self.attr_output(&id, "arn");
        self.register(id.clone(), Declaration::Policy(spec))?;
        Ok(Policy { id, arn })
    }

    /// Bind a policy to a role. Both must be declared in this stack.
    pub fn attach(
        &mut self,
        name: impl Into<String>,
        role: &Role,
        policy: &Policy,
    ) -> Result<Attachment, StackError> {
        self.require_declared(&role.id, "role")?;
        self.require_declared(&policy.id, "policy")?;
        let spec = AttachmentSpec {
            name: name.into(),
            role: role.id.clone(),
            policy: policy.id.clone(),
            role_name: role.name.clone(),
            policy_arn: policy.arn.clone(),
        };
        let id = ResourceId::new(ResourceKind::Attachment, spec.name.clone());
        self.register(id.clone(), Declaration::Attachment(spec))?;
        Ok(Attachment { id })
    }

    /// Declare a managed GraphQL API. Auth mode is a required, explicit
    /// choice; there is no default.
    pub fn declare_api(
        &mut self,
        name: impl Into<String>,
        auth_mode: AuthMode,
        schema: SchemaDocument,
    ) -> Result<Api, StackError> {
        let spec = ApiSpec::new(name, auth_mode, schema);
        let id = ResourceId::new(ResourceKind::Api, spec.name());
        let api_id = self.attr_output(&id, "id");
        let endpoint = self.attr_output(&id, "endpoint");
        self.register(id.clone(), Declaration::Api(spec))?;
        Ok(Api { id, api_id, endpoint })
    }

    /// Declare an access credential for an API. `expires: None` declares a
    /// non-expiring key, which the lint pass will flag.
    pub fn declare_api_key(
        &mut self,
        name: impl Into<String>,
        api: &Api,
        expires: Option<DateTime<Utc>>,
    ) -> Result<ApiKey, StackError> {
        self.require_declared(&api.id, "api")?;
        let spec = ApiKeySpec {
            name: name.into(),
            api: api.id.clone(),
            api_id: api.api_id.clone(),
            expires,
        };
        let id = ResourceId::new(ResourceKind::ApiKey, spec.name.clone());
        let value = self.attr_output(&id, "value");
        self.register(id.clone(), Declaration::ApiKey(spec))?;
        Ok(ApiKey { id, value })
    }

    /// Bind an API to its backing table, invoked under the given role.
    pub fn declare_data_source(
        &mut self,
        name: impl Into<String>,
        api: &Api,
        table: &Table,
        role: &Role,
    ) -> Result<DataSource, StackError> {
        self.require_declared(&api.id, "api")?;
        self.require_declared(&table.id, "table")?;
        self.require_declared(&role.id, "role")?;
        let spec = DataSourceSpec {
            name: name.into(),
            api: api.id.clone(),
            api_id: api.api_id.clone(),
            table: table.id.clone(),
            table_name: table.name.clone(),
            role: role.id.clone(),
            service_role_arn: role.arn.clone(),
        };
        let id = ResourceId::new(ResourceKind::DataSource, spec.name.clone());
        let ds_name = self.attr_output(&id, "name");
        self.register(id.clone(), Declaration::DataSource(spec))?;
        Ok(DataSource { id, name: ds_name })
    }

    /// Bind one schema field to a data source through a template pair.
    ///
    /// The field must exist in the API's schema, and each
    /// `(operation type, field)` pair may be bound at most once per API;
    /// both are rejected here, before anything reaches an engine.
    #[allow(clippy::too_many_arguments)]
    pub fn declare_resolver(
        &mut self,
        name: impl Into<String>,
        api: &Api,
        data_source: &DataSource,
        operation_type: OperationType,
        field: impl Into<String>,
        request: RequestTemplate,
        response: ResponseTemplate,
    ) -> Result<Resolver, StackError> {
        self.require_declared(&api.id, "api")?;
        self.require_declared(&data_source.id, "data source")?;
        request.validate()?;

        let field = field.into();
        let schema = self
            .resources
            .iter()
            .find_map(|r| match &r.declaration {
                Declaration::Api(spec) if r.id == api.id => Some(spec.schema()),
                _ => None,
            })
            .ok_or_else(|| StackError::MissingReference {
                kind: "api",
                id: api.id.to_string(),
            })?;
        if !schema.has_field(operation_type, &field) {
            return Err(StackError::Validation(format!(
                "schema declares no field {} {}",
                operation_type.as_str(),
                field
            )));
        }

        let binding = (api.id.clone(), operation_type, field.clone());
        let id = ResourceId::new(ResourceKind::Resolver, name);
        if self.ids.contains(&id) {
            return Err(StackError::DuplicateName(id.to_string()));
        }
        if let Some(existing) = self.resolver_bindings.get(&binding) {
            tracing::debug!(%existing, operation = operation_type.as_str(), field = %field,
                "rejecting duplicate resolver binding");
            return Err(StackError::DuplicateResolver {
                operation: operation_type.as_str().into(),
                field,
            });
        }
        self.resolver_bindings.insert(binding, id.clone());

        let spec = ResolverSpec {
            name: id.name.clone(),
            api: api.id.clone(),
            api_id: api.api_id.clone(),
            data_source: data_source.id.clone(),
            data_source_name: data_source.name.clone(),
            operation_type,
            field,
            request,
            response,
        };
        self.register(id.clone(), Declaration::Resolver(spec))?;
        Ok(Resolver { id })
    }

    /// Name a stack output (e.g. the endpoint URI or the key secret).
    pub fn export(&mut self, name: impl Into<String>, output: Output<String>) {
        self.exports.push((name.into(), output));
    }

    /// Final referential-integrity pass, then freeze into a [`Stack`].
    pub fn build(self) -> Result<Stack, StackError> {
        for resource in &self.resources {
            for dep in resource.declaration.dependencies() {
                if !self.ids.contains(&dep) {
                    return Err(StackError::MissingReference {
                        kind: "resource",
                        id: format!("{} (consumed by {})", dep, resource.id),
                    });
                }
            }
        }
        for (name, output) in &self.exports {
            for dep in output.dependencies() {
                if !self.ids.contains(&dep) {
                    return Err(StackError::MissingReference {
                        kind: "export",
                        id: format!("{} (export '{}')", dep, name),
                    });
                }
            }
        }
        tracing::debug!(stack = %self.name, resources = self.resources.len(), "stack built");
        Ok(Stack {
            name: self.name,
            resources: self.resources,
            slots: self.slots,
            exports: self.exports,
        })
    }
}

/// A validated, immutable resource graph ready to plan and apply.
#[derive(Debug)]
pub struct Stack {
    name: String,
    resources: Vec<RegisteredResource>,
    slots: HashMap<(ResourceId, &'static str), Slot>,
    exports: Vec<(String, Output<String>)>,
}

impl Stack {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declarations in declaration order.
    pub fn declarations(&self) -> impl Iterator<Item = (&ResourceId, &Declaration)> {
        self.resources.iter().map(|r| (&r.id, &r.declaration))
    }

    pub fn declaration(&self, id: &ResourceId) -> Option<&Declaration> {
        self.resources
            .iter()
            .find(|r| &r.id == id)
            .map(|r| &r.declaration)
    }

    /// Named exports declared on the builder.
    pub fn exports(&self) -> impl Iterator<Item = (&str, &Output<String>)> {
        self.exports.iter().map(|(n, o)| (n.as_str(), o))
    }

    pub(crate) fn resources(&self) -> &[RegisteredResource] {
        &self.resources
    }

    /// Resolve one attribute slot; called by the apply driver as the engine
    /// reports created resources.
    pub(crate) fn resolve_attr(
        &self,
        id: &ResourceId,
        attr: &'static str,
        value: String,
    ) -> Result<(), StackError> {
        let slot = self
            .slots
            .get(&(id.clone(), attr))
            .ok_or_else(|| StackError::Engine(format!("no such attribute {}.{}", id, attr)))?;
        *slot.write().unwrap_or_else(|e| e.into_inner()) = Some(value);
        Ok(())
    }

    /// Attribute names the engine must produce for a resource of this kind.
    pub(crate) fn attrs_for(&self, id: &ResourceId) -> Vec<&'static str> {
        self.slots
            .keys()
            .filter(|(slot_id, _)| slot_id == id)
            .map(|(_, attr)| *attr)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{arg, RequestTemplate, ResponseTemplate};
    use crate::KeyType;

    const SCHEMA: &str = r#"
        type Query { getTenantById(id: ID!): Tenant }
        type Mutation { addTenant(id: ID!, name: String!): Tenant! }
        type Tenant { id: ID! name: String }
    "#;

    fn tenants_api(builder: &mut StackBuilder) -> (Api, DataSource) {
        let table = builder
            .declare_table(TableSpec::new("tenants", "id", KeyType::String))
            .unwrap();
        let role = builder
            .declare_role("api-role", TrustPolicy::service("appsync.amazonaws.com"))
            .unwrap();
        let api = builder
            .declare_api("tenants-api", AuthMode::ApiKey, SchemaDocument::parse(SCHEMA).unwrap())
            .unwrap();
        let ds = builder
            .declare_data_source("tenants-ds", &api, &table, &role)
            .unwrap();
        (api, ds)
    }

    #[test]
    fn duplicate_resolver_binding_is_rejected_locally() {
        let mut builder = StackBuilder::new("test");
        let (api, ds) = tenants_api(&mut builder);

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

        let err = builder
            .declare_resolver(
                "get-resolver-2",
                &api,
                &ds,
                OperationType::Query,
                "getTenantById",
                RequestTemplate::get_item().key("id", arg("id")),
                ResponseTemplate::result_to_json(),
            )
            .unwrap_err();
        assert!(matches!(err, StackError::DuplicateResolver { .. }));
    }

    #[test]
    fn same_field_name_under_both_operation_types_is_allowed() {
        // The binding key is the (operation type, field) pair, not the field
        // name alone.
        let mut builder = StackBuilder::new("test");
        let schema = SchemaDocument::parse(
            "type Query { tenant(id: ID!): Tenant }\n type Mutation { tenant(id: ID!): Tenant }\n type Tenant { id: ID! }",
        )
        .unwrap();
        let table = builder
            .declare_table(TableSpec::new("tenants", "id", KeyType::String))
            .unwrap();
        let role = builder
            .declare_role("api-role", TrustPolicy::service("appsync.amazonaws.com"))
            .unwrap();
        let api = builder.declare_api("api", AuthMode::Iam, schema).unwrap();
        let ds = builder
            .declare_data_source("ds", &api, &table, &role)
            .unwrap();

        for (name, op) in [("q", OperationType::Query), ("m", OperationType::Mutation)] {
            builder
                .declare_resolver(
                    name,
                    &api,
                    &ds,
                    op,
                    "tenant",
                    RequestTemplate::get_item().key("id", arg("id")),
                    ResponseTemplate::result_to_json(),
                )
                .unwrap();
        }
    }

    #[test]
    fn resolver_field_must_exist_in_schema() {
        let mut builder = StackBuilder::new("test");
        let (api, ds) = tenants_api(&mut builder);
        let err = builder
            .declare_resolver(
                "bad",
                &api,
                &ds,
                OperationType::Query,
                "noSuchField",
                RequestTemplate::get_item().key("id", arg("id")),
                ResponseTemplate::result_to_json(),
            )
            .unwrap_err();
        assert!(matches!(err, StackError::Validation(_)));
    }

    #[test]
    fn duplicate_logical_names_are_rejected() {
        let mut builder = StackBuilder::new("test");
        builder
            .declare_table(TableSpec::new("tenants", "id", KeyType::String))
            .unwrap();
        let err = builder
            .declare_table(TableSpec::new("tenants", "id", KeyType::String))
            .unwrap_err();
        assert!(matches!(err, StackError::DuplicateName(_)));
    }

    #[test]
    fn handles_from_another_stack_are_rejected() {
        let mut other = StackBuilder::new("other");
        let foreign_api = {
            let (api, _) = tenants_api(&mut other);
            api
        };

        let mut builder = StackBuilder::new("test");
        let err = builder
            .declare_api_key("key", &foreign_api, None)
            .unwrap_err();
        assert!(matches!(err, StackError::MissingReference { .. }));
    }

    #[test]
    fn build_checks_export_references() {
        let mut other = StackBuilder::new("other");
        let (api, _) = tenants_api(&mut other);

        let mut builder = StackBuilder::new("test");
        builder.export("endpoint", api.endpoint.clone());
        let err = builder.build().unwrap_err();
        assert!(matches!(err, StackError::MissingReference { .. }));
    }
}
