//! Appstack SDK: declarative stack builder for a DynamoDB-backed managed
//! GraphQL API. Declarations register against an explicit [`StackBuilder`],
//! cross-resource references travel as deferred [`Output`]s, and the built
//! stack can be linted, rendered into a dependency-ordered plan, and handed
//! to a [`ProvisioningEngine`].

pub mod engine;
pub mod error;
pub mod lint;
pub mod output;
pub mod plan;
pub mod resource;
pub mod schema;
pub mod stack;
pub mod template;

pub use engine::{apply, Applied, CreatedAttrs, LocalEngine, ProvisioningEngine};
pub use error::StackError;
pub use lint::{lint, Finding, Severity};
pub use output::Output;
pub use plan::{Plan, PlanStep};
pub use resource::{
    Api, ApiKey, AuthMode, DataSource, Effect, KeyType, OperationType, Policy, PolicyDocument,
    Resolver, ResourceId, ResourceKind, Role, Statement, Table, TableSpec, TrustPolicy,
};
pub use schema::SchemaDocument;
pub use stack::{Declaration, Stack, StackBuilder};
pub use template::{arg, DynamoValue, RequestTemplate, ResponseTemplate};
