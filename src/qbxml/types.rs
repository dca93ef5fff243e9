use crate::recovery::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Business entity families exchanged with the Web Connector
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
    Customer,
    Item,
    Invoice,
    SalesOrder,
    PurchaseOrder,
    Vendor,
    Employee,
    Payment,
    Account,
    Terms,
    SalesRep,
    CustomerType,
    JobType,
    PriceLevel,
    Other(String),
}

impl EntityType {
    /// All known entity types, longest names first so prefix matching is unambiguous
    pub const KNOWN: [EntityType; 14] = [
        EntityType::PurchaseOrder,
        EntityType::CustomerType,
        EntityType::SalesOrder,
        EntityType::PriceLevel,
        EntityType::Customer,
        EntityType::Employee,
        EntityType::SalesRep,
        EntityType::Invoice,
        EntityType::Account,
        EntityType::Payment,
        EntityType::JobType,
        EntityType::Vendor,
        EntityType::Terms,
        EntityType::Item,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            EntityType::Customer => "Customer",
            EntityType::Item => "Item",
            EntityType::Invoice => "Invoice",
            EntityType::SalesOrder => "SalesOrder",
            EntityType::PurchaseOrder => "PurchaseOrder",
            EntityType::Vendor => "Vendor",
            EntityType::Employee => "Employee",
            EntityType::Payment => "Payment",
            EntityType::Account => "Account",
            EntityType::Terms => "Terms",
            EntityType::SalesRep => "SalesRep",
            EntityType::CustomerType => "CustomerType",
            EntityType::JobType => "JobType",
            EntityType::PriceLevel => "PriceLevel",
            EntityType::Other(name) => name,
        }
    }

    /// Element name of the per-record return collection (`CustomerRet`, ...)
    pub fn ret_element(&self) -> String {
        format!("{}Ret", self.as_str())
    }

    /// Split a message element name such as `CustomerQueryRs` or `ItemAddRq`
    /// into its entity type and operation.
    pub fn parse_message_name(name: &str) -> Option<(EntityType, Operation)> {
        let stem = name
            .strip_suffix("Rs")
            .or_else(|| name.strip_suffix("Rq"))?;

        Operation::ALL.iter().find_map(|operation| {
            stem.strip_suffix(operation.as_str())
                .filter(|entity| !entity.is_empty())
                .map(|entity| (EntityType::from(entity.to_string()), *operation))
        })
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for EntityType {
    fn from(value: String) -> Self {
        EntityType::KNOWN
            .iter()
            .find(|known| known.as_str().eq_ignore_ascii_case(&value))
            .cloned()
            .unwrap_or(EntityType::Other(value))
    }
}

impl From<EntityType> for String {
    fn from(value: EntityType) -> Self {
        value.as_str().to_string()
    }
}

impl FromStr for EntityType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(EntityType::from(s.to_string()))
    }
}

/// Message operation encoded in the element name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Operation {
    #[default]
    Query,
    Add,
    Mod,
    Del,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Query,
        Operation::Add,
        Operation::Mod,
        Operation::Del,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Query => "Query",
            Operation::Add => "Add",
            Operation::Mod => "Mod",
            Operation::Del => "Del",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
    pub code: String,
    pub severity: Severity,
}

impl ValidationIssue {
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: code.into(),
            severity,
        }
    }
}

/// Outcome of a validation pass; issues accumulate, nothing is thrown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl ValidationResult {
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>, code: &str) {
        self.push_error(ValidationIssue::new(field, message, code, Severity::Error));
    }

    pub fn add_critical(
        &mut self,
        field: impl Into<String>,
        message: impl Into<String>,
        code: &str,
    ) {
        self.push_error(ValidationIssue::new(field, message, code, Severity::Critical));
    }

    pub fn add_warning(
        &mut self,
        field: impl Into<String>,
        message: impl Into<String>,
        code: &str,
    ) {
        self.warnings
            .push(ValidationIssue::new(field, message, code, Severity::Warning));
    }

    fn push_error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
        self.is_valid = false;
    }

    /// Fold another result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.is_valid &= other.is_valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_name() {
        assert_eq!(
            EntityType::parse_message_name("CustomerQueryRs"),
            Some((EntityType::Customer, Operation::Query))
        );
        assert_eq!(
            EntityType::parse_message_name("SalesOrderAddRq"),
            Some((EntityType::SalesOrder, Operation::Add))
        );
        assert_eq!(
            EntityType::parse_message_name("ItemInventoryModRs"),
            Some((
                EntityType::Other("ItemInventory".to_string()),
                Operation::Mod
            ))
        );
        assert_eq!(EntityType::parse_message_name("QueryRs"), None);
        assert_eq!(EntityType::parse_message_name("CustomerRet"), None);
    }

    #[test]
    fn test_entity_type_string_roundtrip() {
        for known in EntityType::KNOWN.iter() {
            assert_eq!(&EntityType::from(known.to_string()), known);
        }
        assert_eq!(
            "customer".parse::<EntityType>().unwrap(),
            EntityType::Customer
        );
        assert_eq!(
            serde_json::to_string(&EntityType::PriceLevel).unwrap(),
            "\"PriceLevel\""
        );
    }

    #[test]
    fn test_validation_result_merge() {
        let mut first = ValidationResult::default();
        first.add_warning("a", "warn", "W");

        let mut second = ValidationResult::default();
        second.add_error("b", "err", "E");

        first.merge(second);
        assert!(!first.is_valid);
        assert_eq!(first.errors.len(), 1);
        assert_eq!(first.warnings.len(), 1);
    }
}
