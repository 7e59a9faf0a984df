//! Typed errors for declaration, validation, planning, and apply.

use thiserror::Error;

/// Errors raised while building, validating, planning, or applying a stack.
///
/// Everything here is detectable locally; provider-side failures surface
/// through [`StackError::Engine`] from whichever engine runs the plan.
#[derive(Error, Debug)]
pub enum StackError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate resolver binding: {operation} {field}")]
    DuplicateResolver { operation: String, field: String },
    #[error("duplicate logical name: {0}")]
    DuplicateName(String),
    #[error("schema: {0}")]
    Schema(String),
    #[error("template: {0}")]
    Template(String),
    #[error("output '{0}' is not resolved yet")]
    Unresolved(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("engine: {0}")]
    Engine(String),
}
