//! Data-source and resolver declarations: wiring the API to the table.

use crate::output::Output;
use crate::resource::ResourceId;
use crate::template::{RequestTemplate, ResponseTemplate};
use serde::Serialize;

/// Schema operation type a resolver binds under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum OperationType {
    Query,
    Mutation,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "Query",
            Self::Mutation => "Mutation",
        }
    }
}

/// Named binding from an API to its backing table, invoked under a role.
#[derive(Clone, Debug)]
pub struct DataSourceSpec {
    pub(crate) name: String,
    pub(crate) api: ResourceId,
    pub(crate) api_id: Output<String>,
    pub(crate) table: ResourceId,
    pub(crate) table_name: Output<String>,
    pub(crate) role: ResourceId,
    pub(crate) service_role_arn: Output<String>,
}

impl DataSourceSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn api(&self) -> &ResourceId {
        &self.api
    }

    pub fn table(&self) -> &ResourceId {
        &self.table
    }

    pub fn role(&self) -> &ResourceId {
        &self.role
    }
}

/// One schema field bound to a data source through a template pair.
#[derive(Clone, Debug)]
pub struct ResolverSpec {
    pub(crate) name: String,
    pub(crate) api: ResourceId,
    pub(crate) api_id: Output<String>,
    pub(crate) data_source: ResourceId,
    pub(crate) data_source_name: Output<String>,
    pub(crate) operation_type: OperationType,
    pub(crate) field: String,
    pub(crate) request: RequestTemplate,
    pub(crate) response: ResponseTemplate,
}

impl ResolverSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn api(&self) -> &ResourceId {
        &self.api
    }

    pub fn data_source(&self) -> &ResourceId {
        &self.data_source
    }

    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn request(&self) -> &RequestTemplate {
        &self.request
    }

    pub fn response(&self) -> &ResponseTemplate {
        &self.response
    }
}

/// Handle returned by `declare_data_source`.
#[derive(Clone, Debug)]
pub struct DataSource {
    pub id: ResourceId,
    /// Provider-registered data source name.
    pub name: Output<String>,
}

/// Handle returned by `declare_resolver`.
#[derive(Clone, Debug)]
pub struct Resolver {
    pub id: ResourceId,
}
