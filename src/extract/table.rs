//! Raw table snapshots and their conversion into record batches.

use crate::record::RecordBatch;
use crate::schema::Schema;
use serde_json::Value;

/// Cell text of one table, captured during one page's extraction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTableSnapshot {
    /// Whether rows came from a `tbody`; `false` means every `tr` was used.
    pub has_body: bool,
    pub rows: Vec<RawRow>,
}

/// One `tr` of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based position among the table's rows, as rendered.
    pub position: usize,
    pub cells: Vec<String>,
}

/// A row that could not be read; the rest of the table is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDefect {
    /// 1-based row position in the raw table.
    pub row: usize,
    pub reason: String,
}

impl RawTableSnapshot {
    /// Rows numbered from 1 in the given order.
    pub fn new(has_body: bool, rows: Vec<Vec<String>>) -> Self {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, cells)| RawRow {
                position: i + 1,
                cells,
            })
            .collect();
        Self { has_body, rows }
    }

    /// Parse one entry of the page's table snapshot.
    ///
    /// A malformed table is an `Err`; malformed rows are skipped and returned
    /// as defects.
    pub fn from_value(value: &Value) -> Result<(Self, Vec<RowDefect>), String> {
        let object = value
            .as_object()
            .ok_or_else(|| format!("expected an object, got {}", kind(value)))?;
        let has_body = object.get("hasBody").and_then(Value::as_bool).unwrap_or(false);
        let raw_rows = object
            .get("rows")
            .and_then(Value::as_array)
            .ok_or_else(|| "missing 'rows' array".to_string())?;

        let mut rows = Vec::with_capacity(raw_rows.len());
        let mut defects = Vec::new();
        for (i, raw) in raw_rows.iter().enumerate() {
            match parse_row(raw) {
                Ok(cells) => rows.push(RawRow {
                    position: i + 1,
                    cells,
                }),
                Err(reason) => defects.push(RowDefect { row: i + 1, reason }),
            }
        }
        Ok((Self { has_body, rows }, defects))
    }

    /// Drop rows with no cells or only empty cells, keeping order and
    /// each survivor's position.
    pub fn data_rows(self) -> Vec<RawRow> {
        self.rows
            .into_iter()
            .filter(|row| row.cells.iter().any(|c| !c.is_empty()))
            .collect()
    }
}

fn parse_row(raw: &Value) -> Result<Vec<String>, String> {
    let cells = raw
        .as_array()
        .ok_or_else(|| format!("expected a cell array, got {}", kind(raw)))?;
    cells
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell {
            Value::String(s) => Ok(s.trim().to_string()),
            Value::Null => Ok(String::new()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(format!("cell {} is {}", i + 1, kind(other))),
        })
        .collect()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Result of turning one snapshot into a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOutcome {
    Batch(RecordBatch),
    /// The table had no rows at all.
    NoRows,
    /// Every row was empty; nothing is emitted.
    OnlyEmptyRows,
}

pub fn build_batch(page: u32, table: usize, schema: &Schema, snapshot: RawTableSnapshot) -> TableOutcome {
    if snapshot.rows.is_empty() {
        return TableOutcome::NoRows;
    }
    let rows = snapshot.data_rows();
    if rows.is_empty() {
        return TableOutcome::OnlyEmptyRows;
    }
    let located = rows.into_iter().map(|row| (row.position, row.cells));
    TableOutcome::Batch(RecordBatch::located(page, table, schema, located))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_rows_and_trims_cells() {
        let (snapshot, defects) = RawTableSnapshot::from_value(&json!({
            "hasBody": true,
            "rows": [["  a ", "b"], [null, 7]]
        }))
        .unwrap();
        assert!(defects.is_empty());
        assert!(snapshot.has_body);
        assert_eq!(snapshot, RawTableSnapshot::new(true, vec![
            vec!["a".into(), "b".into()],
            vec!["".into(), "7".into()],
        ]));
    }

    #[test]
    fn malformed_rows_are_isolated() {
        let (snapshot, defects) = RawTableSnapshot::from_value(&json!({
            "hasBody": false,
            "rows": [["ok"], "not a row", [["nested"]]]
        }))
        .unwrap();
        assert_eq!(snapshot.rows.len(), 1);
        assert_eq!(snapshot.rows[0].cells, vec!["ok"]);
        assert_eq!(defects.len(), 2);
        assert_eq!(defects[0].row, 2);
        assert_eq!(defects[1].row, 3);
    }

    #[test]
    fn survivors_keep_their_rendered_position() {
        let (snapshot, defects) = RawTableSnapshot::from_value(&json!({
            "hasBody": true,
            "rows": [["", ""], "broken", ["K1", "x"], [], ["K2", "y"]]
        }))
        .unwrap();
        assert_eq!(defects.len(), 1);
        let positions: Vec<usize> = snapshot.data_rows().iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![3, 5]);
    }

    #[test]
    fn malformed_table_is_an_error() {
        assert!(RawTableSnapshot::from_value(&json!([1, 2])).is_err());
        assert!(RawTableSnapshot::from_value(&json!({ "hasBody": true })).is_err());
    }

    #[test]
    fn empty_and_cell_less_rows_are_dropped() {
        let schema = Schema::new(["a", "b"]);
        let snapshot =
            RawTableSnapshot::new(true, vec![vec![], vec!["".into(), "".into()], vec!["x".into()]]);
        match build_batch(1, 1, &schema, snapshot) {
            TableOutcome::Batch(batch) => {
                assert_eq!(batch.len(), 1);
                assert_eq!(batch.rows()[0], vec!["x", ""]);
                assert_eq!(batch.position(0), Some(3));
            }
            other => panic!("expected a batch, got {other:?}"),
        }
    }

    #[test]
    fn all_empty_table_yields_no_batch() {
        let schema = Schema::new(["a"]);
        let snapshot = RawTableSnapshot::new(true, vec![vec!["".into()], vec![]]);
        assert_eq!(build_batch(1, 1, &schema, snapshot), TableOutcome::OnlyEmptyRows);

        let empty = RawTableSnapshot::new(false, vec![]);
        assert_eq!(build_batch(1, 2, &schema, empty), TableOutcome::NoRows);
    }
}
