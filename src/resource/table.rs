//! Key-value table declaration.

use crate::error::StackError;
use crate::output::Output;
use crate::resource::ResourceId;
use serde::Serialize;

/// Scalar type of the hash key attribute (provider wire names).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum KeyType {
    #[serde(rename = "S")]
    String,
    #[serde(rename = "N")]
    Number,
    #[serde(rename = "B")]
    Binary,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "S",
            Self::Number => "N",
            Self::Binary => "B",
        }
    }
}

/// Declaration of a single-hash-key table.
///
/// The key schema is fixed at declaration time; capacity and the durability
/// toggles are the only knobs an update may touch. Physical name and ARN are
/// assigned by the engine and exposed on the [`Table`] handle.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSpec {
    name: String,
    hash_key: String,
    key_type: KeyType,
    read_capacity: u64,
    write_capacity: u64,
    point_in_time_recovery: bool,
    server_side_encryption: bool,
}

impl TableSpec {
    /// A table with the given logical name and hash key. Capacity defaults
    /// to one read/write unit; durability toggles default to off.
    pub fn new(name: impl Into<String>, hash_key: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            name: name.into(),
            hash_key: hash_key.into(),
            key_type,
            read_capacity: 1,
            write_capacity: 1,
            point_in_time_recovery: false,
            server_side_encryption: false,
        }
    }

    pub fn with_capacity(mut self, read: u64, write: u64) -> Self {
        self.read_capacity = read;
        self.write_capacity = write;
        self
    }

    pub fn with_point_in_time_recovery(mut self, enabled: bool) -> Self {
        self.point_in_time_recovery = enabled;
        self
    }

    pub fn with_server_side_encryption(mut self, enabled: bool) -> Self {
        self.server_side_encryption = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash_key(&self) -> &str {
        &self.hash_key
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn read_capacity(&self) -> u64 {
        self.read_capacity
    }

    pub fn write_capacity(&self) -> u64 {
        self.write_capacity
    }

    pub fn point_in_time_recovery(&self) -> bool {
        self.point_in_time_recovery
    }

    pub fn server_side_encryption(&self) -> bool {
        self.server_side_encryption
    }

    pub(crate) fn validate(&self) -> Result<(), StackError> {
        if self.name.is_empty() {
            return Err(StackError::Validation("table name must be non-empty".into()));
        }
        if self.hash_key.is_empty() {
            return Err(StackError::Validation(format!(
                "table '{}': hash key attribute must be non-empty",
                self.name
            )));
        }
        if self.read_capacity == 0 || self.write_capacity == 0 {
            return Err(StackError::Validation(format!(
                "table '{}': capacity units must be positive",
                self.name
            )));
        }
        Ok(())
    }
}

/// Handle returned by `declare_table`: identity plus deferred attributes.
#[derive(Clone, Debug)]
pub struct Table {
    pub id: ResourceId,
    /// Physical table name, assigned at apply time.
    pub name: Output<String>,
    /// ARN-equivalent reference for scoping permissions.
    pub arn: Output<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_minimal_capacity_with_toggles_off() {
        let spec = TableSpec::new("tenants", "id", KeyType::String);
        assert_eq!(spec.read_capacity(), 1);
        assert_eq!(spec.write_capacity(), 1);
        assert!(!spec.point_in_time_recovery());
        assert!(!spec.server_side_encryption());
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn empty_hash_key_is_rejected() {
        let spec = TableSpec::new("tenants", "", KeyType::String);
        assert!(matches!(spec.validate(), Err(StackError::Validation(_))));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let spec = TableSpec::new("tenants", "id", KeyType::String).with_capacity(0, 1);
        assert!(matches!(spec.validate(), Err(StackError::Validation(_))));
    }
}
