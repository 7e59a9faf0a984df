//! Static misconfiguration checks over a built stack.
//!
//! These are advisory: a stack with findings still plans and applies. Each
//! check corresponds to a weakness the declarations can express but should
//! not ship with — over-broad permission scope, non-expiring credentials,
//! and durability toggles left off.

use crate::resource::ResourceId;
use crate::stack::{Declaration, Stack};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Advice,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warning => "warning",
            Self::Advice => "advice",
        })
    }
}

/// One lint finding: stable code, severity, offending resource, message.
#[derive(Clone, Debug)]
pub struct Finding {
    pub code: &'static str,
    pub severity: Severity,
    pub resource: ResourceId,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}: {}", self.severity, self.code, self.resource, self.message)
    }
}

/// Run all checks against every declaration in the stack.
pub fn lint(stack: &Stack) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (id, declaration) in stack.declarations() {
        match declaration {
            Declaration::Policy(spec) => {
                for (i, statement) in spec.document().statements().iter().enumerate() {
                    let wildcard_resource = statement
                        .resources()
                        .iter()
                        .any(|r| r.value().as_deref() == Some("*"));
                    if wildcard_resource {
                        findings.push(Finding {
                            code: "wildcard-resource",
                            severity: Severity::Warning,
                            resource: id.clone(),
                            message: format!(
                                "statement {} grants access to every resource; scope it to the ARNs the resolvers touch",
                                i
                            ),
                        });
                    }
                    let wildcard_action = statement
                        .actions()
                        .iter()
                        .any(|a| a == "*" || a.ends_with(":*"));
                    if wildcard_action {
                        findings.push(Finding {
                            code: "wildcard-action",
                            severity: Severity::Warning,
                            resource: id.clone(),
                            message: format!(
                                "statement {} allows a wildcard action; list the exact operations instead",
                                i
                            ),
                        });
                    }
                }
            }
            Declaration::Api(spec) => {
                if spec.auth_mode() == crate::resource::AuthMode::ApiKey {
                    findings.push(Finding {
                        code: "api-key-auth",
                        severity: Severity::Advice,
                        resource: id.clone(),
                        message: "key-based auth is the weakest mode; prefer identity-based auth where callers support it"
                            .into(),
                    });
                }
            }
            Declaration::ApiKey(spec) => {
                if spec.expires().is_none() {
                    findings.push(Finding {
                        code: "key-without-expiry",
                        severity: Severity::Warning,
                        resource: id.clone(),
                        message: "credential never expires; set an expiry".into(),
                    });
                }
            }
            Declaration::Table(spec) => {
                if !spec.point_in_time_recovery() {
                    findings.push(Finding {
                        code: "no-point-in-time-recovery",
                        severity: Severity::Warning,
                        resource: id.clone(),
                        message: "point-in-time recovery is off".into(),
                    });
                }
                if !spec.server_side_encryption() {
                    findings.push(Finding {
                        code: "no-encryption-at-rest",
                        severity: Severity::Warning,
                        resource: id.clone(),
                        message: "server-side encryption is off".into(),
                    });
                }
            }
            _ => {}
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::iam::PolicyDocument;
    use crate::resource::{AuthMode, KeyType, Statement, TableSpec, TrustPolicy};
    use crate::schema::SchemaDocument;
    use crate::stack::StackBuilder;

    fn codes(findings: &[Finding]) -> Vec<&'static str> {
        findings.iter().map(|f| f.code).collect()
    }

    #[test]
    fn wildcard_resource_statement_is_flagged() {
        let mut builder = StackBuilder::new("test");
        let table = builder
            .declare_table(
                TableSpec::new("tenants", "id", KeyType::String)
                    .with_point_in_time_recovery(true)
                    .with_server_side_encryption(true),
            )
            .unwrap();
        builder
            .declare_policy(
                "api-policy",
                PolicyDocument::new()
                    .statement(
                        Statement::allow()
                            .action("dynamodb:GetItem")
                            .resource(table.arn.clone()),
                    )
                    .statement(Statement::allow().action("dynamodb:*").any_resource()),
            )
            .unwrap();
        let stack = builder.build().unwrap();

        let findings = lint(&stack);
        assert!(codes(&findings).contains(&"wildcard-resource"));
        assert!(codes(&findings).contains(&"wildcard-action"));
    }

    #[test]
    fn table_scoped_policy_is_clean() {
        let mut builder = StackBuilder::new("test");
        let table = builder
            .declare_table(
                TableSpec::new("tenants", "id", KeyType::String)
                    .with_point_in_time_recovery(true)
                    .with_server_side_encryption(true),
            )
            .unwrap();
        builder
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
        let stack = builder.build().unwrap();
        assert!(lint(&stack).is_empty());
    }

    #[test]
    fn non_expiring_key_is_flagged() {
        let mut builder = StackBuilder::new("test");
        let api = builder
            .declare_api(
                "api",
                AuthMode::Iam,
                SchemaDocument::parse("type Query { ping: String }").unwrap(),
            )
            .unwrap();
        builder.declare_api_key("key", &api, None).unwrap();
        let stack = builder.build().unwrap();

        let findings = lint(&stack);
        assert_eq!(codes(&findings), ["key-without-expiry"]);
    }

    #[test]
    fn expiring_key_is_not_flagged() {
        let mut builder = StackBuilder::new("test");
        let api = builder
            .declare_api(
                "api",
                AuthMode::Iam,
                SchemaDocument::parse("type Query { ping: String }").unwrap(),
            )
            .unwrap();
        builder
            .declare_api_key("key", &api, Some(chrono::Utc::now() + chrono::Duration::days(30)))
            .unwrap();
        let stack = builder.build().unwrap();
        assert!(lint(&stack).is_empty());
    }

    #[test]
    fn key_auth_mode_and_durability_toggles_are_surfaced() {
        let mut builder = StackBuilder::new("test");
        builder
            .declare_table(TableSpec::new("tenants", "id", KeyType::String))
            .unwrap();
        builder
            .declare_api(
                "api",
                AuthMode::ApiKey,
                SchemaDocument::parse("type Query { ping: String }").unwrap(),
            )
            .unwrap();
        let stack = builder.build().unwrap();

        let codes = codes(&lint(&stack));
        assert!(codes.contains(&"no-point-in-time-recovery"));
        assert!(codes.contains(&"no-encryption-at-rest"));
        assert!(codes.contains(&"api-key-auth"));

        let api_key_finding = lint(&stack)
            .into_iter()
            .find(|f| f.code == "api-key-auth")
            .unwrap();
        assert_eq!(api_key_finding.severity, Severity::Advice);
    }

    #[test]
    fn role_trust_policy_produces_no_findings() {
        let mut builder = StackBuilder::new("test");
        builder
            .declare_role("role", TrustPolicy::service("appsync.amazonaws.com"))
            .unwrap();
        let stack = builder.build().unwrap();
        assert!(lint(&stack).is_empty());
    }
}
