//! Tenants API stack: a key-value table, a scoped access role, and a managed
//! GraphQL API with one query and one mutation resolver. Lints the stack,
//! prints the plan, applies it against the in-memory engine, and prints the
//! `endpoint` and `key` exports.

use appstack_sdk::resource::iam::PolicyDocument;
use appstack_sdk::template::{arg, RequestTemplate, ResponseTemplate};
use appstack_sdk::{
    apply, lint, AuthMode, KeyType, LocalEngine, OperationType, SchemaDocument, Stack, StackError,
    Statement, StackBuilder, TableSpec, TrustPolicy,
};
use chrono::{Duration, Utc};
use tracing_subscriber::EnvFilter;

const SCHEMA: &str = r#"
    type Query {
        getTenantById(id: ID!): Tenant
    }

    type Mutation {
        addTenant(id: ID!, name: String!): Tenant!
    }

    type Tenant {
        id: ID!
        name: String
    }

    schema {
        query: Query
        mutation: Mutation
    }
"#;

fn tenants_stack() -> Result<Stack, StackError> {
    let mut stack = StackBuilder::new("tenants");

    let table = stack.declare_table(
        TableSpec::new("tenants", "id", KeyType::String)
            .with_capacity(1, 1)
            .with_point_in_time_recovery(true)
            .with_server_side_encryption(true),
    )?;

    let role = stack.declare_role("api-role", TrustPolicy::service("appsync.amazonaws.com"))?;
    let policy = stack.declare_policy(
        "api-policy",
        PolicyDocument::new().statement(
            Statement::allow()
                .action("dynamodb:GetItem")
                .action("dynamodb:PutItem")
                .resource(table.arn.clone()),
        ),
    )?;
    stack.attach("api-policy-attachment", &role, &policy)?;

    // Key-based auth is a deliberate trade-off here: simplest mode for a
    // demo endpoint. The lint output below surfaces it.
    let api = stack.declare_api("tenants-api", AuthMode::ApiKey, SchemaDocument::parse(SCHEMA)?)?;
    let key = stack.declare_api_key("tenants-key", &api, Some(Utc::now() + Duration::days(30)))?;

    let data_source = stack.declare_data_source("tenants-ds", &api, &table, &role)?;

    stack.declare_resolver(
        "get-resolver",
        &api,
        &data_source,
        OperationType::Query,
        "getTenantById",
        RequestTemplate::get_item().key("id", arg("id")),
        ResponseTemplate::result_to_json(),
    )?;
    stack.declare_resolver(
        "add-resolver",
        &api,
        &data_source,
        OperationType::Mutation,
        "addTenant",
        RequestTemplate::put_item()
            .key("id", arg("id"))
            .attribute("name", arg("name")),
        ResponseTemplate::result_to_json(),
    )?;

    stack.export("endpoint", api.endpoint.clone());
    stack.export("key", key.value.clone());

    stack.build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("appstack_sdk=info".parse()?))
        .init();

    let stack = tenants_stack()?;

    for finding in lint(&stack) {
        eprintln!("{}", finding);
    }

    let plan = stack.plan()?;
    println!("plan ({} steps):", plan.steps.len());
    for step in &plan.steps {
        println!("  {}", step.id);
    }

    let engine = LocalEngine::new();
    let applied = apply(&stack, &engine).await?;
    for (name, value) in &applied.exports {
        println!("{} = {}", name, value);
    }
    Ok(())
}
