//! Row types produced by the query executor.
//!
//! `QueryRows` is the raw, column-agnostic store result (the model may select
//! anything, including `COUNT(...)`). `FlatRecord` is the fixed 23-column
//! inventory row the pivot and recap stages work on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query_schema::*;

/// Raw query result: column names plus rows of JSON scalars.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryRows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The single value of a one-row, one-column result such as
    /// `SELECT COUNT(CONTAINER) ...`. Anything wider is row-shaped.
    pub fn scalar(&self) -> Option<&Value> {
        match (self.columns.len(), self.rows.as_slice()) {
            (1, [row]) => row.first(),
            _ => None,
        }
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.trim().eq_ignore_ascii_case(name))
    }

    /// Required columns absent from this result, in the order given.
    pub fn missing_columns<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|name| self.column_index(name).is_none())
            .collect()
    }

    /// Map every row onto the fixed schema. Unknown columns are dropped and
    /// columns the query did not select stay `None`.
    pub fn to_records(&self) -> Vec<FlatRecord> {
        let index: HashMap<&str, usize> = COLUMNS
            .iter()
            .filter_map(|&name| self.column_index(name).map(|i| (name, i)))
            .collect();
        self.rows
            .iter()
            .map(|row| {
                let cell = |name: &str| index.get(name).and_then(|&i| row.get(i));
                let text = |name: &str| cell(name).and_then(scalar_text);
                FlatRecord {
                    state: text(COL_STATE),
                    container: text(COL_CONTAINER),
                    status_date: text(COL_STATUS_DATE),
                    days_count: cell(COL_DAYS_COUNT).and_then(scalar_int),
                    owner: text(COL_OWNER),
                    booking_no: text(COL_BOOKING_NO),
                    logistic: text(COL_LOGISTIC),
                    last_vessel: text(COL_LAST_VESSEL),
                    fixed_date: text(COL_FIXED_DATE),
                    yard_block: text(COL_YARD_BLOCK),
                    operation_id: text(COL_OPERATION_ID),
                    last_shipper: text(COL_LAST_SHIPPER),
                    last_consignee: text(COL_LAST_CONSIGNEE),
                    last_cargo: text(COL_LAST_CARGO),
                    container_type: text(COL_TYPE),
                    location: text(COL_LOCATION),
                    remark: text(COL_REMARK),
                    finding_damage: text(COL_FINDING_DAMAGE),
                    cross_check: text(COL_CROSS_CHECK),
                    free_user: text(COL_FREE_USER),
                    user_id: text(COL_USER_ID),
                    seal_no: text(COL_SEAL_NO),
                    grade: text(COL_GRADE),
                }
            })
            .collect()
    }
}

/// Text form of a scalar cell; `None` for SQL NULL.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn scalar_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// One container row of the inventory table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRecord {
    #[serde(rename = "STATE")]
    pub state: Option<String>,
    #[serde(rename = "CONTAINER")]
    pub container: Option<String>,
    #[serde(rename = "TGL. STATUS")]
    pub status_date: Option<String>,
    #[serde(rename = "JML. HARI")]
    pub days_count: Option<i64>,
    #[serde(rename = "OWNER")]
    pub owner: Option<String>,
    #[serde(rename = "BOOKNO")]
    pub booking_no: Option<String>,
    #[serde(rename = "LOGISTIC")]
    pub logistic: Option<String>,
    #[serde(rename = "VESSEL TERAKHIR")]
    pub last_vessel: Option<String>,
    #[serde(rename = "TGL FXD")]
    pub fixed_date: Option<String>,
    #[serde(rename = "CY BLOCK")]
    pub yard_block: Option<String>,
    #[serde(rename = "OPB ID")]
    pub operation_id: Option<String>,
    #[serde(rename = "SHIP. TERAKHIR")]
    pub last_shipper: Option<String>,
    #[serde(rename = "CONS. TERAKHIR")]
    pub last_consignee: Option<String>,
    #[serde(rename = "CARGO TERAKHIR")]
    pub last_cargo: Option<String>,
    #[serde(rename = "TYPE")]
    pub container_type: Option<String>,
    #[serde(rename = "LOKASI")]
    pub location: Option<String>,
    #[serde(rename = "REMARK")]
    pub remark: Option<String>,
    #[serde(rename = "FINDING DAMAGE")]
    pub finding_damage: Option<String>,
    #[serde(rename = "CROSS CHECK")]
    pub cross_check: Option<String>,
    #[serde(rename = "MLO FREEUSER")]
    pub free_user: Option<String>,
    #[serde(rename = "USER_ID")]
    pub user_id: Option<String>,
    #[serde(rename = "NO. SEAL")]
    pub seal_no: Option<String>,
    #[serde(rename = "CONTAINER GRADE")]
    pub grade: Option<String>,
}

impl FlatRecord {
    /// Shorthand for the four dimensions the pivot and recap group on.
    pub fn summary(location: &str, state: &str, container_type: &str, grade: &str) -> Self {
        Self {
            location: Some(location.to_string()),
            state: Some(state.to_string()),
            container_type: Some(container_type.to_string()),
            grade: Some(grade.to_string()),
            ..Self::default()
        }
    }

    /// (LOKASI, STATE, TYPE, GRADE) when all four are present.
    pub fn pivot_key(&self) -> Option<(&str, &str, &str, &str)> {
        Some((
            self.location.as_deref()?,
            self.state.as_deref()?,
            self.container_type.as_deref()?,
            self.grade.as_deref()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_scalar_only_for_single_cell() {
        let count = QueryRows::new(cols(&["COUNT(CONTAINER)"]), vec![vec![json!(42)]]);
        assert_eq!(count.scalar(), Some(&json!(42)));

        let wide = QueryRows::new(cols(&["LOKASI", "STATE"]), vec![vec![json!("A"), json!("B")]]);
        assert_eq!(wide.scalar(), None);

        let two = QueryRows::new(cols(&["n"]), vec![vec![json!(1)], vec![json!(2)]]);
        assert_eq!(two.scalar(), None);
    }

    #[test]
    fn test_to_records_maps_by_name_case_insensitive() {
        let rows = QueryRows::new(
            cols(&["lokasi", "STATE", "JML. HARI", "EXTRA", "CONTAINER GRADE"]),
            vec![vec![json!("AMBON"), json!("AV"), json!("12"), json!("x"), Value::Null]],
        );
        let records = rows.to_records();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.location.as_deref(), Some("AMBON"));
        assert_eq!(r.state.as_deref(), Some("AV"));
        assert_eq!(r.days_count, Some(12));
        assert_eq!(r.grade, None);
        assert_eq!(r.container_type, None);
        assert!(r.pivot_key().is_none());
    }

    #[test]
    fn test_every_field_reads_its_own_column_in_any_order() {
        let names: Vec<&str> = COLUMNS.iter().rev().copied().collect();
        let row = names
            .iter()
            .map(|&n| if n == COL_DAYS_COUNT { json!(7) } else { json!(n) })
            .collect();
        let rows = QueryRows::new(cols(&names), vec![row]);

        let v = serde_json::to_value(&rows.to_records()[0]).unwrap();
        for name in COLUMNS {
            if name == COL_DAYS_COUNT {
                assert_eq!(v[name], json!(7));
            } else {
                assert_eq!(v[name], json!(name), "column {}", name);
            }
        }
    }

    #[test]
    fn test_missing_columns() {
        let rows = QueryRows::new(cols(&["LOKASI", "TYPE"]), vec![]);
        assert_eq!(rows.missing_columns(&PIVOT_COLUMNS), vec!["STATE", "CONTAINER GRADE"]);
    }

    #[test]
    fn test_serializes_with_table_column_names() {
        let r = FlatRecord::summary("AMBON", "AV", "20", "A");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["LOKASI"], json!("AMBON"));
        assert_eq!(v["CONTAINER GRADE"], json!("A"));
    }
}
