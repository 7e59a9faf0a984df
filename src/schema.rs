//! GraphQL schema-definition documents: raw text plus the operation fields
//! resolvers may bind. Full SDL validation stays with the provider; this
//! scan enforces only what must hold before a stack is worth submitting.

use crate::error::StackError;
use crate::resource::OperationType;
use regex::Regex;

/// A schema document: the deployed text and its Query/Mutation field names.
#[derive(Clone, Debug)]
pub struct SchemaDocument {
    text: String,
    query_fields: Vec<String>,
    mutation_fields: Vec<String>,
}

impl SchemaDocument {
    /// Parse schema text. A `Query` type with at least one field is
    /// required; a `Mutation` type is optional.
    pub fn parse(text: impl Into<String>) -> Result<Self, StackError> {
        let text = text.into();
        let block_re = Regex::new(r"(?m)^[ \t]*type\s+(\w+)[^{]*\{([^}]*)\}")
            .map_err(|e| StackError::Schema(e.to_string()))?;
        let args_re = Regex::new(r"\([^)]*\)").map_err(|e| StackError::Schema(e.to_string()))?;
        let field_re = Regex::new(r"(\w+)\s*:").map_err(|e| StackError::Schema(e.to_string()))?;

        // Field names are whatever precedes a colon once argument lists are
        // stripped from the type body.
        let field_names = |body: &str| -> Vec<String> {
            let body = args_re.replace_all(body, "");
            field_re
                .captures_iter(&body)
                .map(|f| f[1].to_string())
                .collect()
        };

        let mut query_fields = Vec::new();
        let mut mutation_fields = Vec::new();
        let mut saw_query = false;
        for caps in block_re.captures_iter(&text) {
            match &caps[1] {
                "Query" => {
                    saw_query = true;
                    query_fields = field_names(&caps[2]);
                }
                "Mutation" => mutation_fields = field_names(&caps[2]),
                _ => {}
            }
        }

        if !saw_query {
            return Err(StackError::Schema("schema must declare a Query type".into()));
        }
        if query_fields.is_empty() {
            return Err(StackError::Schema("Query type declares no fields".into()));
        }

        Ok(Self { text, query_fields, mutation_fields })
    }

    /// The exact text handed to the provider.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn fields(&self, operation: OperationType) -> &[String] {
        match operation {
            OperationType::Query => &self.query_fields,
            OperationType::Mutation => &self.mutation_fields,
        }
    }

    pub fn has_field(&self, operation: OperationType, field: &str) -> bool {
        self.fields(operation).iter().any(|f| f == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TENANT_SCHEMA: &str = r#"
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

    #[test]
    fn extracts_fields_per_operation_type() {
        let schema = SchemaDocument::parse(TENANT_SCHEMA).unwrap();
        assert_eq!(schema.fields(OperationType::Query), ["getTenantById"]);
        assert_eq!(schema.fields(OperationType::Mutation), ["addTenant"]);
        assert!(schema.has_field(OperationType::Query, "getTenantById"));
        assert!(!schema.has_field(OperationType::Query, "addTenant"));
    }

    #[test]
    fn rejects_schema_without_query_type() {
        let err = SchemaDocument::parse("type Tenant { id: ID! }").unwrap_err();
        assert!(matches!(err, StackError::Schema(_)));
    }

    #[test]
    fn mutation_type_is_optional() {
        let schema = SchemaDocument::parse("type Query { ping: String }").unwrap();
        assert!(schema.fields(OperationType::Mutation).is_empty());
    }

    #[test]
    fn keeps_raw_text_verbatim() {
        let schema = SchemaDocument::parse(TENANT_SCHEMA).unwrap();
        assert_eq!(schema.text(), TENANT_SCHEMA);
    }
}
