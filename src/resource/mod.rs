//! Typed resource declarations: table, role/policy, API, and bindings.

pub mod api;
pub mod binding;
pub mod iam;
pub mod table;

pub use api::{Api, ApiKey, ApiKeySpec, ApiSpec, AuthMode};
pub use binding::{DataSource, DataSourceSpec, OperationType, Resolver, ResolverSpec};
pub use iam::{
    Attachment, AttachmentSpec, Effect, Policy, PolicyDocument, PolicySpec, Role, RoleSpec,
    Statement, TrustPolicy,
};
pub use table::{KeyType, Table, TableSpec};

use serde::Serialize;
use std::fmt;

/// Kind of a declared resource, in the order the provider creates them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Table,
    Role,
    Policy,
    Attachment,
    Api,
    ApiKey,
    DataSource,
    Resolver,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Role => "role",
            Self::Policy => "policy",
            Self::Attachment => "attachment",
            Self::Api => "api",
            Self::ApiKey => "api-key",
            Self::DataSource => "data-source",
            Self::Resolver => "resolver",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one declared resource: kind plus logical (stack-local) name.
///
/// Logical names identify declarations; physical names are assigned by the
/// engine at apply time and only ever reach consumers through outputs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResourceId {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceId {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self { kind, name: name.into() }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}
