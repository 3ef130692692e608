//! Field catalogs
//!
//! A catalog describes the exportable keys of one data type: the label shown
//! to users, the value type and an optional presentation hint. Catalogs are
//! supplied by the caller; two built-in catalogs cover the dashboard's
//! transaction list and its summary report.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Value type of a field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Date,
    Boolean,
}

/// Presentation hint refining a [`FieldType`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueFormat {
    #[default]
    Plain,
    Currency,
    Percentage,
    Integer,
    /// Transaction status ("completed", "pending", ...), coloured per variant
    Status,
}

/// Description of one exportable field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor {
    pub key: String,
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub format: ValueFormat,
    /// Workbook column width override, in character units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
}

impl FieldDescriptor {
    pub fn new(key: &str, label: &str, field_type: FieldType, format: ValueFormat) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            field_type,
            format,
            width: None,
        }
    }

    /// Descriptor used for keys the catalog does not know
    pub fn fallback(key: &str) -> Self {
        Self::new(key, key, FieldType::String, ValueFormat::Plain)
    }

    /// Whether the field carries a status value
    pub fn is_status(&self) -> bool {
        self.format == ValueFormat::Status
    }
}

/// Ordered set of field descriptors for one data type
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldCatalog {
    pub fields: Vec<FieldDescriptor>,
}

impl FieldCatalog {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self { fields }
    }

    /// Parse a catalog from a JSON array of descriptors
    pub fn from_json(json: &str) -> Result<Self> {
        let fields: Vec<FieldDescriptor> = serde_json::from_str(json)?;
        Ok(Self { fields })
    }

    /// Look up a descriptor by key
    pub fn get(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Descriptor for `key`, or a plain string descriptor labelled by the key
    pub fn resolve(&self, key: &str) -> FieldDescriptor {
        self.get(key)
            .cloned()
            .unwrap_or_else(|| FieldDescriptor::fallback(key))
    }

    /// Built-in catalog for a data type name
    pub fn builtin(data_type: &str) -> Option<Self> {
        match data_type {
            "transactions" => Some(Self::transactions()),
            "report_summary" => Some(Self::report_summary()),
            _ => None,
        }
    }

    /// Catalog of the exchange transaction list
    pub fn transactions() -> Self {
        use FieldType::*;
        use ValueFormat::*;

        Self::new(vec![
            FieldDescriptor::new("id", "ID", String, Plain),
            FieldDescriptor::new("date", "Date", Date, Plain),
            FieldDescriptor::new("client", "Client", String, Plain),
            FieldDescriptor::new("collaborator", "Collaborator", String, Plain),
            FieldDescriptor::new("operation_type", "Operation", String, Plain),
            FieldDescriptor::new("currency_from", "From", String, Plain),
            FieldDescriptor::new("currency_to", "To", String, Plain),
            FieldDescriptor::new("amount", "Amount", Number, Currency),
            FieldDescriptor::new("exchange_rate", "Rate", Number, Plain),
            FieldDescriptor::new("converted_amount", "Converted Amount", Number, Currency),
            FieldDescriptor::new("commission", "Commission", Number, Currency),
            FieldDescriptor::new("commission_rate", "Commission %", Number, Percentage),
            FieldDescriptor::new("status", "Status", String, Status),
            FieldDescriptor::new("verified", "Verified", Boolean, Plain),
        ])
    }

    /// Catalog of the per-collaborator summary report
    pub fn report_summary() -> Self {
        use FieldType::*;
        use ValueFormat::*;

        Self::new(vec![
            FieldDescriptor::new("period", "Period", String, Plain),
            FieldDescriptor::new("collaborator", "Collaborator", String, Plain),
            FieldDescriptor::new("transactions", "Transactions", Number, Integer),
            FieldDescriptor::new("volume", "Volume", Number, Currency),
            FieldDescriptor::new("commission", "Commission", Number, Currency),
            FieldDescriptor::new("growth", "Growth", Number, Percentage),
            FieldDescriptor::new("success_rate", "Success Rate", Number, Percentage),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_unknown_key_falls_back() {
        let catalog = FieldCatalog::transactions();
        let desc = catalog.resolve("internal_ref");
        assert_eq!(desc.label, "internal_ref");
        assert_eq!(desc.field_type, FieldType::String);
    }

    #[test]
    fn test_catalog_from_json() {
        let json = r#"[
            {"key": "amount", "label": "Monto", "type": "number", "format": "currency", "width": 18},
            {"key": "note", "label": "Note"}
        ]"#;
        let catalog = FieldCatalog::from_json(json).unwrap();
        let amount = catalog.get("amount").unwrap();
        assert_eq!(amount.format, ValueFormat::Currency);
        assert_eq!(amount.width, Some(18.0));
        assert_eq!(catalog.get("note").unwrap().field_type, FieldType::String);
    }

    #[test]
    fn test_builtin_catalogs() {
        assert!(FieldCatalog::builtin("transactions").unwrap().get("status").unwrap().is_status());
        assert!(FieldCatalog::builtin("report_summary").is_some());
        assert!(FieldCatalog::builtin("unknown").is_none());
    }
}
