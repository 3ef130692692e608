//! Field projection
//!
//! Reduces a full [`DomainRecord`] to the selected fields, in order, with
//! per-type formatting. A [`Projection`] resolves each field key to a
//! formatter tag once per export; rows are then projected by dispatching on
//! the tag.
//!
//! Projection is total: a missing or unparsable value becomes the zero or
//! empty value of its type instead of an error.

pub mod format;

use serde_json::Value;

use crate::config::FormatConfig;
use crate::model::{DomainRecord, FieldCatalog, FieldDescriptor, FieldType, ValueFormat};

use format::{
    NumberStyle, format_currency, format_fixed, format_percentage, format_trimmed, value_as_bool,
    value_as_date, value_as_f64, value_as_text,
};

/// Decimals kept for plain numbers in human-facing output
const PLAIN_MAX_DECIMALS: usize = 4;

/// Who reads the projected values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionStyle {
    /// Display strings: currency symbols, grouping, localized dates
    Human,
    /// Raw numbers, ISO dates and booleans for machine-readable formats
    Structured,
}

/// A projected value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Text form of the cell
    pub fn as_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }

    /// JSON form of the cell
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or_else(|| Value::from(0)),
            Cell::Bool(b) => Value::Bool(*b),
        }
    }
}

/// Formatter tag resolved for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormatter {
    Text,
    Number,
    Integer,
    Currency,
    Percentage,
    Date,
    Boolean,
    Status,
}

impl FieldFormatter {
    /// Pick the formatter for a descriptor
    pub fn for_descriptor(desc: &FieldDescriptor) -> Self {
        match (desc.field_type, desc.format) {
            (_, ValueFormat::Status) => FieldFormatter::Status,
            (FieldType::Date, _) => FieldFormatter::Date,
            (FieldType::Boolean, _) => FieldFormatter::Boolean,
            (FieldType::Number, ValueFormat::Currency) => FieldFormatter::Currency,
            (FieldType::Number, ValueFormat::Percentage) => FieldFormatter::Percentage,
            (FieldType::Number, ValueFormat::Integer) => FieldFormatter::Integer,
            (FieldType::Number, ValueFormat::Plain) => FieldFormatter::Number,
            (FieldType::String, _) => FieldFormatter::Text,
        }
    }

    /// Whether the formatter yields numbers in structured output
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldFormatter::Number
                | FieldFormatter::Integer
                | FieldFormatter::Currency
                | FieldFormatter::Percentage
        )
    }
}

/// One selected field with its resolved formatter
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub key: String,
    pub label: String,
    pub descriptor: FieldDescriptor,
    pub formatter: FieldFormatter,
}

/// Projects records onto fields using per-export formatting options
#[derive(Debug, Clone)]
pub struct FieldProjector {
    currency_symbol: String,
    date_format: String,
    numbers: NumberStyle,
}

impl FieldProjector {
    pub fn new(options: &FormatConfig) -> Self {
        Self {
            currency_symbol: options.currency_symbol.clone(),
            date_format: options.date_format.clone(),
            numbers: NumberStyle {
                thousands: Some(options.thousands_separator),
                decimal: options.decimal_separator,
            },
        }
    }

    /// Resolve the formatter registry for a field list
    ///
    /// # Arguments
    /// * `fields` - Ordered field keys
    /// * `catalog` - Catalog supplying labels and types
    /// * `style` - Human or structured output
    pub fn plan(&self, fields: &[String], catalog: &FieldCatalog, style: ProjectionStyle) -> Projection {
        let columns = fields
            .iter()
            .map(|key| {
                let descriptor = catalog.resolve(key);
                Column {
                    key: key.clone(),
                    label: descriptor.label.clone(),
                    formatter: FieldFormatter::for_descriptor(&descriptor),
                    descriptor,
                }
            })
            .collect();

        Projection {
            projector: self.clone(),
            columns,
            style,
        }
    }

    /// Project one record to `(label, value)` pairs
    pub fn project(
        &self,
        record: &DomainRecord,
        fields: &[String],
        catalog: &FieldCatalog,
        style: ProjectionStyle,
    ) -> Vec<(String, Cell)> {
        self.plan(fields, catalog, style).project_pairs(record)
    }

    fn format_cell(&self, formatter: FieldFormatter, value: Option<&Value>, style: ProjectionStyle) -> Cell {
        let value = value.filter(|v| !v.is_null());
        let number = || value.and_then(value_as_f64).unwrap_or(0.0);

        match (formatter, style) {
            (FieldFormatter::Text | FieldFormatter::Status, _) => {
                Cell::Text(value.map(value_as_text).unwrap_or_default())
            }

            (FieldFormatter::Currency, ProjectionStyle::Human) => {
                Cell::Text(format_currency(number(), &self.currency_symbol, self.numbers))
            }
            (FieldFormatter::Percentage, ProjectionStyle::Human) => {
                Cell::Text(format_percentage(number(), self.numbers))
            }
            (FieldFormatter::Integer, ProjectionStyle::Human) => {
                Cell::Text(format_fixed(number().round(), 0, self.numbers))
            }
            (FieldFormatter::Number, ProjectionStyle::Human) => {
                Cell::Text(format_trimmed(number(), PLAIN_MAX_DECIMALS, self.numbers))
            }
            (FieldFormatter::Integer, ProjectionStyle::Structured) => Cell::Number(number().round()),
            (
                FieldFormatter::Currency | FieldFormatter::Percentage | FieldFormatter::Number,
                ProjectionStyle::Structured,
            ) => Cell::Number(number()),

            (FieldFormatter::Date, style) => {
                let date = value.and_then(value_as_date);
                let text = match (date, style) {
                    (Some(d), ProjectionStyle::Human) => d.format(&self.date_format).to_string(),
                    (Some(d), ProjectionStyle::Structured) => d.format("%Y-%m-%d").to_string(),
                    (None, _) => String::new(),
                };
                Cell::Text(text)
            }

            (FieldFormatter::Boolean, ProjectionStyle::Human) => {
                let b = value.and_then(value_as_bool).unwrap_or(false);
                Cell::Text(if b { "Yes" } else { "No" }.to_string())
            }
            (FieldFormatter::Boolean, ProjectionStyle::Structured) => {
                Cell::Bool(value.and_then(value_as_bool).unwrap_or(false))
            }
        }
    }
}

impl Default for FieldProjector {
    fn default() -> Self {
        Self::new(&FormatConfig::default())
    }
}

/// Formatter registry for one export
#[derive(Debug, Clone)]
pub struct Projection {
    projector: FieldProjector,
    columns: Vec<Column>,
    style: ProjectionStyle,
}

impl Projection {
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn labels(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.label.clone()).collect()
    }

    pub fn style(&self) -> ProjectionStyle {
        self.style
    }

    /// Project a record to cells aligned with [`Projection::columns`]
    pub fn project_row(&self, record: &DomainRecord) -> Vec<Cell> {
        self.columns
            .iter()
            .map(|col| {
                self.projector
                    .format_cell(col.formatter, record.get(&col.key), self.style)
            })
            .collect()
    }

    /// Project a record to `(label, value)` pairs
    pub fn project_pairs(&self, record: &DomainRecord) -> Vec<(String, Cell)> {
        self.columns
            .iter()
            .zip(self.project_row(record))
            .map(|(col, cell)| (col.label.clone(), cell))
            .collect()
    }

    /// Project every record, preserving count and order
    pub fn project_all(&self, records: &[DomainRecord]) -> Vec<Vec<Cell>> {
        records.iter().map(|r| self.project_row(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> DomainRecord {
        value.as_object().cloned().unwrap()
    }

    fn fields(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_human_projection() {
        let projector = FieldProjector::default();
        let rec = record(json!({
            "id": "TX-1",
            "date": "2024-03-05",
            "amount": 1234.5,
            "commission_rate": 1.5,
            "verified": true,
            "exchange_rate": 17.125,
        }));
        let out = projector.project(
            &rec,
            &fields(&["id", "date", "amount", "commission_rate", "verified", "exchange_rate"]),
            &FieldCatalog::transactions(),
            ProjectionStyle::Human,
        );

        let values: Vec<String> = out.iter().map(|(_, c)| c.as_text()).collect();
        assert_eq!(
            values,
            vec!["TX-1", "05/03/2024", "$1,234.50", "1.50%", "Yes", "17.125"]
        );
        assert_eq!(out[2].0, "Amount");
    }

    #[test]
    fn test_structured_projection() {
        let projector = FieldProjector::default();
        let rec = record(json!({
            "date": "2024-03-05T09:00:00Z",
            "amount": "1500.25",
            "verified": "no",
        }));
        let out = projector.project(
            &rec,
            &fields(&["date", "amount", "verified"]),
            &FieldCatalog::transactions(),
            ProjectionStyle::Structured,
        );
        assert_eq!(out[0].1, Cell::Text("2024-03-05".into()));
        assert_eq!(out[1].1, Cell::Number(1500.25));
        assert_eq!(out[2].1, Cell::Bool(false));
    }

    #[test]
    fn test_missing_values_resolve_to_zero_or_empty() {
        let projector = FieldProjector::default();
        let rec = DomainRecord::new();
        let keys = fields(&["client", "date", "amount", "commission_rate", "verified"]);
        let catalog = FieldCatalog::transactions();

        let human: Vec<String> = projector
            .project(&rec, &keys, &catalog, ProjectionStyle::Human)
            .into_iter()
            .map(|(_, c)| c.as_text())
            .collect();
        assert_eq!(human, vec!["", "", "$0.00", "0.00%", "No"]);

        let structured = projector.project(&rec, &keys, &catalog, ProjectionStyle::Structured);
        assert_eq!(structured[2].1, Cell::Number(0.0));
        assert_eq!(structured[4].1, Cell::Bool(false));
    }

    #[test]
    fn test_unknown_field_is_plain_text() {
        let projector = FieldProjector::default();
        let rec = record(json!({ "branch": "Centro" }));
        let out = projector.project(
            &rec,
            &fields(&["branch"]),
            &FieldCatalog::transactions(),
            ProjectionStyle::Human,
        );
        assert_eq!(out, vec![("branch".to_string(), Cell::Text("Centro".into()))]);
    }

    #[test]
    fn test_registry_resolved_once() {
        let projector = FieldProjector::default();
        let plan = projector.plan(
            &fields(&["amount", "status", "transactions"]),
            &FieldCatalog::report_summary(),
            ProjectionStyle::Structured,
        );
        let tags: Vec<FieldFormatter> = plan.columns().iter().map(|c| c.formatter).collect();
        assert_eq!(
            tags,
            vec![FieldFormatter::Text, FieldFormatter::Text, FieldFormatter::Integer]
        );
    }

    #[test]
    fn test_project_all_preserves_count() {
        let projector = FieldProjector::default();
        let plan = projector.plan(
            &fields(&["id"]),
            &FieldCatalog::transactions(),
            ProjectionStyle::Human,
        );
        let rows = vec![DomainRecord::new(); 7];
        assert_eq!(plan.project_all(&rows).len(), 7);
    }
}
