//! Resolver mapping templates.
//!
//! A request template turns incoming field arguments into a storage-operation
//! request document; a response template turns the raw storage result back
//! into the field's return value. The request document format is pinned to
//! version `2017-02-28` and the rendered template text is part of the
//! deployed contract, so both the text and a local evaluation of it are
//! modeled here. Evaluation mirrors what the provider's resolver runtime
//! does at invocation time, which is what makes the contract testable before
//! anything is applied.

use crate::error::StackError;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt::Write as _;

/// Storage request schema version every template is pinned to.
pub const REQUEST_VERSION: &str = "2017-02-28";

/// Storage operations the resolvers issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StorageOperation {
    GetItem,
    PutItem,
}

impl StorageOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetItem => "GetItem",
            Self::PutItem => "PutItem",
        }
    }
}

/// Typed attribute encoding used by the storage engine.
///
/// Serializes externally tagged, so `S("t1")` becomes `{"S": "t1"}` — the
/// exact wire shape `$util.dynamodb.toDynamoDBJson` produces.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum DynamoValue {
    S(String),
    N(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
}

impl DynamoValue {
    /// Encode a plain JSON argument value. Numbers are carried as strings,
    /// per the storage engine's number representation.
    pub fn encode(value: &Value) -> Result<Self, StackError> {
        match value {
            Value::String(s) => Ok(Self::S(s.clone())),
            Value::Number(n) => Ok(Self::N(n.to_string())),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Null => Ok(Self::Null(true)),
            other => Err(StackError::Template(format!(
                "cannot encode argument value {} as a scalar attribute",
                other
            ))),
        }
    }
}

/// Reference to one incoming field argument (`$ctx.args.<name>`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgBinding {
    arg: String,
}

/// Bind a template entry to the field argument with this name.
pub fn arg(name: impl Into<String>) -> ArgBinding {
    ArgBinding { arg: name.into() }
}

/// Template producing the storage-operation request document.
#[derive(Clone, Debug)]
pub struct RequestTemplate {
    operation: StorageOperation,
    key: Vec<(String, ArgBinding)>,
    attribute_values: Vec<(String, ArgBinding)>,
}

impl RequestTemplate {
    pub fn get_item() -> Self {
        Self::new(StorageOperation::GetItem)
    }

    pub fn put_item() -> Self {
        Self::new(StorageOperation::PutItem)
    }

    fn new(operation: StorageOperation) -> Self {
        Self { operation, key: Vec::new(), attribute_values: Vec::new() }
    }

    /// Bind one key attribute to an argument.
    pub fn key(mut self, attribute: impl Into<String>, binding: ArgBinding) -> Self {
        self.key.push((attribute.into(), binding));
        self
    }

    /// Bind one non-key attribute to an argument (write operations only).
    pub fn attribute(mut self, attribute: impl Into<String>, binding: ArgBinding) -> Self {
        self.attribute_values.push((attribute.into(), binding));
        self
    }

    pub fn operation(&self) -> StorageOperation {
        self.operation
    }

    pub(crate) fn validate(&self) -> Result<(), StackError> {
        if self.key.is_empty() {
            return Err(StackError::Template(format!(
                "{} template binds no key attribute",
                self.operation.as_str()
            )));
        }
        if self.operation == StorageOperation::GetItem && !self.attribute_values.is_empty() {
            return Err(StackError::Template(
                "GetItem template must not carry attributeValues".into(),
            ));
        }
        Ok(())
    }

    /// The deployed template text. This is the byte-for-byte artifact the
    /// provider's resolver runtime executes.
    pub fn to_vtl(&self) -> String {
        let mut out = String::new();
        out.push_str("{\n");
        let _ = writeln!(out, "    \"version\" : \"{}\",", REQUEST_VERSION);
        let _ = writeln!(out, "    \"operation\" : \"{}\",", self.operation.as_str());
        out.push_str("    \"key\" : {\n");
        write_bindings(&mut out, &self.key);
        out.push_str("    }");
        if !self.attribute_values.is_empty() {
            out.push_str(",\n    \"attributeValues\" : {\n");
            write_bindings(&mut out, &self.attribute_values);
            out.push_str("    }");
        }
        out.push_str("\n}\n");
        out
    }

    /// Evaluate the template against incoming arguments, producing the
    /// request document the runtime would send to the storage engine.
    pub fn evaluate(&self, args: &Map<String, Value>) -> Result<Value, StackError> {
        let mut doc = Map::new();
        doc.insert("version".into(), json!(REQUEST_VERSION));
        doc.insert("operation".into(), json!(self.operation.as_str()));
        doc.insert("key".into(), evaluate_bindings(&self.key, args)?);
        if !self.attribute_values.is_empty() {
            doc.insert(
                "attributeValues".into(),
                evaluate_bindings(&self.attribute_values, args)?,
            );
        }
        Ok(Value::Object(doc))
    }
}

fn write_bindings(out: &mut String, bindings: &[(String, ArgBinding)]) {
    let last = bindings.len().saturating_sub(1);
    for (i, (attribute, binding)) in bindings.iter().enumerate() {
        let _ = write!(
            out,
            "        \"{}\" : $util.dynamodb.toDynamoDBJson($ctx.args.{})",
            attribute, binding.arg
        );
        out.push_str(if i == last { "\n" } else { ",\n" });
    }
}

fn evaluate_bindings(
    bindings: &[(String, ArgBinding)],
    args: &Map<String, Value>,
) -> Result<Value, StackError> {
    let mut section = Map::new();
    for (attribute, binding) in bindings {
        let value = args.get(&binding.arg).ok_or_else(|| {
            StackError::Template(format!("missing argument '{}'", binding.arg))
        })?;
        let encoded = DynamoValue::encode(value)?;
        section.insert(attribute.clone(), serde_json::to_value(&encoded).map_err(
            |e| StackError::Template(e.to_string()),
        )?);
    }
    Ok(Value::Object(section))
}

/// Template producing the field's return value from the storage result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseTemplate {
    /// Echo the storage result as JSON, unchanged.
    ResultToJson,
}

impl ResponseTemplate {
    pub fn result_to_json() -> Self {
        Self::ResultToJson
    }

    pub fn to_vtl(&self) -> &'static str {
        match self {
            Self::ResultToJson => "$util.toJson($ctx.result)",
        }
    }

    /// Evaluate against a storage result, mirroring the runtime transform.
    pub fn evaluate(&self, result: &Value) -> Value {
        match self {
            Self::ResultToJson => result.clone(),
        }
    }
}
