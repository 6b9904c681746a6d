//! Query tables: the record source a report is generated from
//!
//! The JSON shape is the one query executors hand over:
//!
//! ```json
//! {
//!   "__fields__": ["dept", "name", "amount"],
//!   "__data__": [["Eng", "Ann", 10], ["Eng", "Bob", 20]],
//!   "__variables__": {"title": "Payroll"},
//!   "__coord_fill__": {"1,5": "printed"},
//!   "__sub__": {"detail": {"template": "detail.xml", "__fields__": [], "__data__": []}}
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ReportResult;
use crate::value::Value;

/// Field names plus the rows a query produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryTable {
    #[serde(rename = "__fields__", default)]
    pub fields: Vec<String>,
    #[serde(rename = "__data__", default)]
    pub rows: Vec<Vec<Value>>,
    /// Variables overriding the template's `[var]` section
    #[serde(rename = "__variables__", default)]
    pub variables: BTreeMap<String, Value>,
    /// `"row,col"` -> literal written over the generated grid
    #[serde(rename = "__coord_fill__", default)]
    pub coord_fill: BTreeMap<String, Value>,
    /// Named sub-reports for `[$name$]` tags
    #[serde(rename = "__sub__", default)]
    pub sub_reports: BTreeMap<String, SubReport>,
}

/// A sub-report: its own template plus its own query table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubReport {
    pub template: PathBuf,
    #[serde(flatten)]
    pub query: QueryTable,
}

impl QueryTable {
    /// Create a table; short rows are padded with nulls
    pub fn new<S: Into<String>>(fields: impl IntoIterator<Item = S>, rows: Vec<Vec<Value>>) -> Self {
        let mut table = Self {
            fields: fields.into_iter().map(Into::into).collect(),
            rows,
            ..Self::default()
        };
        table.normalize();
        table
    }

    /// Parse the JSON form
    pub fn from_json(json: &str) -> ReportResult<Self> {
        let mut table: QueryTable = serde_json::from_str(json)?;
        table.normalize();
        Ok(table)
    }

    /// Read the JSON form from a file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ReportResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Pad short rows with nulls and drop cells beyond the field count
    fn normalize(&mut self) {
        let width = self.fields.len();
        for (i, row) in self.rows.iter_mut().enumerate() {
            if row.len() > width {
                log::warn!(
                    "query row {} has {} values for {} fields, extra values dropped",
                    i + 1,
                    row.len(),
                    width
                );
            }
            row.resize(width, Value::None);
        }
        for sub in self.sub_reports.values_mut() {
            sub.query.normalize();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Records in query order
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |values| Record {
            fields: &self.fields,
            values,
        })
    }

    /// Parsed `__coord_fill__` entries as `(row, col, value)`; malformed keys
    /// are skipped with a warning
    pub fn coord_fills(&self) -> Vec<(u32, u32, &Value)> {
        let mut fills = Vec::new();
        for (key, value) in &self.coord_fill {
            let parsed = key.split_once(',').and_then(|(r, c)| {
                Some((r.trim().parse::<u32>().ok()?, c.trim().parse::<u32>().ok()?))
            });
            match parsed {
                Some((row, col)) if row > 0 && col > 0 => fills.push((row, col, value)),
                _ => log::warn!("ignoring malformed coordinate fill key '{}'", key),
            }
        }
        fills
    }
}

/// One row of a query table, addressed by field name
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    fields: &'a [String],
    values: &'a [Value],
}

impl<'a> Record<'a> {
    /// Value of a field, `None` when the table has no such field
    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.fields
            .iter()
            .position(|f| f == field)
            .and_then(|i| self.values.get(i))
    }

    pub fn fields(&self) -> &'a [String] {
        self.fields
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_contract() {
        let table = QueryTable::from_json(
            r#"{
                "__fields__": ["dept", "amount"],
                "__data__": [["Eng", 10], ["Sales"]],
                "__variables__": {"title": "Payroll"},
                "__coord_fill__": {"2,3": "x", "bad": 1},
                "__sub__": {"lines": {"template": "lines.xml", "__fields__": ["a"], "__data__": [[]]}}
            }"#,
        )
        .unwrap();
        assert_eq!(table.rows[1], vec![Value::str("Sales"), Value::None]);
        assert_eq!(table.variables["title"], Value::str("Payroll"));
        assert_eq!(table.coord_fills(), vec![(2, 3, &Value::str("x"))]);

        let sub = &table.sub_reports["lines"];
        assert_eq!(sub.template, PathBuf::from("lines.xml"));
        assert_eq!(sub.query.rows, vec![vec![Value::None]]);
    }

    #[test]
    fn test_record_lookup() {
        let table = QueryTable::new(["a", "b"], vec![vec![1.into(), "x".into()]]);
        let record = table.records().next().unwrap();
        assert_eq!(record.get("b"), Some(&Value::str("x")));
        assert_eq!(record.get("c"), None);
    }
}
