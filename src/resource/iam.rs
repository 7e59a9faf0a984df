//! Access role, permission policy, and attachment declarations.

use crate::error::StackError;
use crate::output::Output;
use crate::resource::ResourceId;
use serde::Serialize;
use serde_json::{json, Value};

/// Policy-language version both document kinds are pinned to.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Trust policy: names the one service principal allowed to assume a role.
#[derive(Clone, Debug, Serialize)]
pub struct TrustPolicy {
    service_principal: String,
}

impl TrustPolicy {
    pub fn service(principal: impl Into<String>) -> Self {
        Self { service_principal: principal.into() }
    }

    pub fn service_principal(&self) -> &str {
        &self.service_principal
    }

    /// The assume-role document the provider evaluates.
    pub fn to_document(&self) -> Value {
        json!({
            "Version": POLICY_VERSION,
            "Statement": [{
                "Action": "sts:AssumeRole",
                "Principal": { "Service": self.service_principal },
                "Effect": "Allow",
            }],
        })
    }

    pub(crate) fn validate(&self) -> Result<(), StackError> {
        if self.service_principal.is_empty() {
            return Err(StackError::Validation(
                "trust policy must name a service principal".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

/// One permission statement: actions, effect, and resource scope.
///
/// Resources are outputs so a statement can be scoped to an ARN that does
/// not exist until apply (e.g. the table the resolvers read and write).
#[derive(Clone, Debug)]
pub struct Statement {
    effect: Effect,
    actions: Vec<String>,
    resources: Vec<Output<String>>,
}

impl Statement {
    pub fn new(effect: Effect) -> Self {
        Self { effect, actions: Vec::new(), resources: Vec::new() }
    }

    pub fn allow() -> Self {
        Self::new(Effect::Allow)
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(action.into());
        self
    }

    pub fn resource(mut self, resource: Output<String>) -> Self {
        self.resources.push(resource);
        self
    }

    /// Scope the statement to every resource. Kept constructible so the
    /// lint pass has something to flag; never use this in a real stack.
    pub fn any_resource(self) -> Self {
        self.resource(Output::literal("*".into()))
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn resources(&self) -> &[Output<String>] {
        &self.resources
    }
}

/// A permission policy document: an ordered list of statements.
#[derive(Clone, Debug, Default)]
pub struct PolicyDocument {
    statements: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statement(mut self, statement: Statement) -> Self {
        self.statements.push(statement);
        self
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Render the document, resolving each resource output through `render`
    /// (the planner substitutes placeholder tokens for unresolved ARNs).
    pub fn to_document(&self, mut render: impl FnMut(&Output<String>) -> String) -> Value {
        let statements: Vec<Value> = self
            .statements
            .iter()
            .map(|s| {
                json!({
                    "Action": s.actions,
                    "Effect": s.effect.as_str(),
                    "Resource": s.resources.iter().map(&mut render).collect::<Vec<_>>(),
                })
            })
            .collect();
        json!({ "Version": POLICY_VERSION, "Statement": statements })
    }

    pub(crate) fn validate(&self) -> Result<(), StackError> {
        if self.statements.is_empty() {
            return Err(StackError::Validation("policy must contain at least one statement".into()));
        }
        for s in &self.statements {
            if s.actions.is_empty() {
                return Err(StackError::Validation("policy statement has no actions".into()));
            }
            if s.resources.is_empty() {
                return Err(StackError::Validation("policy statement has no resource scope".into()));
            }
        }
        Ok(())
    }
}

/// Declaration of a role assumable by one service principal.
#[derive(Clone, Debug)]
pub struct RoleSpec {
    pub(crate) name: String,
    pub(crate) trust: TrustPolicy,
}

impl RoleSpec {
    pub fn new(name: impl Into<String>, trust: TrustPolicy) -> Self {
        Self { name: name.into(), trust }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trust(&self) -> &TrustPolicy {
        &self.trust
    }
}

/// Declaration of a permission policy.
#[derive(Clone, Debug)]
pub struct PolicySpec {
    pub(crate) name: String,
    pub(crate) document: PolicyDocument,
}

impl PolicySpec {
    pub fn new(name: impl Into<String>, document: PolicyDocument) -> Self {
        Self { name: name.into(), document }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }
}

/// Binds one policy to one role; lifetime tied to both.
#[derive(Clone, Debug)]
pub struct AttachmentSpec {
    pub(crate) name: String,
    pub(crate) role: ResourceId,
    pub(crate) policy: ResourceId,
    pub(crate) role_name: Output<String>,
    pub(crate) policy_arn: Output<String>,
}

impl AttachmentSpec {
    pub fn role(&self) -> &ResourceId {
        &self.role
    }

    pub fn policy(&self) -> &ResourceId {
        &self.policy
    }
}

/// Handle returned by `declare_role`.
#[derive(Clone, Debug)]
pub struct Role {
    pub id: ResourceId,
    pub name: Output<String>,
    pub arn: Output<String>,
}

/// Handle returned by `declare_policy`.
#[derive(Clone, Debug)]
pub struct Policy {
    pub id: ResourceId,
    pub arn: Output<String>,
}

/// Handle returned by `attach`.
#[derive(Clone, Debug)]
pub struct Attachment {
    pub id: ResourceId,
}
