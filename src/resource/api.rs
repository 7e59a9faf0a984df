//! Managed GraphQL API and API-key declarations.

use crate::output::Output;
use crate::resource::ResourceId;
use crate::schema::SchemaDocument;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// How callers authenticate against the API (provider wire names).
///
/// Key-based auth is the weakest mode; it stays available because choosing
/// it must be an explicit decision, and the lint pass surfaces it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AuthMode {
    #[serde(rename = "API_KEY")]
    ApiKey,
    #[serde(rename = "AWS_IAM")]
    Iam,
    #[serde(rename = "AMAZON_COGNITO_USER_POOLS")]
    CognitoUserPools,
    #[serde(rename = "OPENID_CONNECT")]
    OpenidConnect,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiKey => "API_KEY",
            Self::Iam => "AWS_IAM",
            Self::CognitoUserPools => "AMAZON_COGNITO_USER_POOLS",
            Self::OpenidConnect => "OPENID_CONNECT",
        }
    }
}

/// Declaration of a managed GraphQL endpoint.
///
/// Schema text is part of the deployed contract; replacing it redeploys
/// every resolver bound to its fields.
#[derive(Clone, Debug)]
pub struct ApiSpec {
    pub(crate) name: String,
    pub(crate) auth_mode: AuthMode,
    pub(crate) schema: SchemaDocument,
}

impl ApiSpec {
    pub fn new(name: impl Into<String>, auth_mode: AuthMode, schema: SchemaDocument) -> Self {
        Self { name: name.into(), auth_mode, schema }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }

    pub fn schema(&self) -> &SchemaDocument {
        &self.schema
    }
}

/// Declaration of an access credential for one API.
///
/// `expires: None` means the key never expires; that is representable but
/// flagged by the lint pass.
#[derive(Clone, Debug)]
pub struct ApiKeySpec {
    pub(crate) name: String,
    pub(crate) api: ResourceId,
    pub(crate) api_id: Output<String>,
    pub(crate) expires: Option<DateTime<Utc>>,
}

impl ApiKeySpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn api(&self) -> &ResourceId {
        &self.api
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }
}

/// Handle returned by `declare_api`.
#[derive(Clone, Debug)]
pub struct Api {
    pub id: ResourceId,
    /// Provider-assigned API identifier.
    pub api_id: Output<String>,
    /// GraphQL endpoint URI, populated post-apply.
    pub endpoint: Output<String>,
}

/// Handle returned by `declare_api_key`.
#[derive(Clone, Debug)]
pub struct ApiKey {
    pub id: ResourceId,
    /// Generated secret value, populated post-apply.
    pub value: Output<String>,
}
