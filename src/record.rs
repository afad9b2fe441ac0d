//! Normalized records and per-table batches.

use crate::schema::Schema;

/// Pad with empty cells or truncate so the row is exactly `width` wide.
pub fn normalize_row(mut cells: Vec<String>, width: usize) -> Vec<String> {
    cells.resize(width, String::new());
    cells
}

/// Schema-conformant rows extracted from one table on one page, plus the
/// enrichment slot of each row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBatch {
    pub page: u32,
    pub table: usize,
    rows: Vec<Vec<String>>,
    /// 1-based rendered position of each row in its table.
    positions: Vec<usize>,
    enrichment: Vec<Option<String>>,
}

impl RecordBatch {
    /// Build from contiguous raw rows, the first at position 1.
    pub fn new(page: u32, table: usize, schema: &Schema, raw_rows: Vec<Vec<String>>) -> Self {
        Self::located(page, table, schema, raw_rows.into_iter().enumerate().map(|(i, r)| (i + 1, r)))
    }

    /// Build from `(position, cells)` pairs, normalizing each row to the
    /// schema width.
    pub fn located<I>(page: u32, table: usize, schema: &Schema, raw_rows: I) -> Self
    where
        I: IntoIterator<Item = (usize, Vec<String>)>,
    {
        let (positions, rows): (Vec<usize>, Vec<Vec<String>>) = raw_rows
            .into_iter()
            .map(|(position, cells)| (position, normalize_row(cells, schema.width())))
            .unzip();
        let enrichment = vec![None; rows.len()];
        Self {
            page,
            table,
            rows,
            positions,
            enrichment,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn enrichment(&self) -> &[Option<String>] {
        &self.enrichment
    }

    /// Where row `row` sits in the rendered table.
    pub fn position(&self, row: usize) -> Option<usize> {
        self.positions.get(row).copied()
    }

    /// Cell `column` of row `row`, if both exist.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    /// Store an enrichment value at the exact row position it was read for.
    pub fn set_enrichment(&mut self, row: usize, value: String) {
        if let Some(slot) = self.enrichment.get_mut(row) {
            *slot = Some(value);
        }
    }

    /// Consume into (row, enrichment) pairs in row order.
    pub fn into_rows(self) -> impl Iterator<Item = (Vec<String>, Option<String>)> {
        self.rows.into_iter().zip(self.enrichment)
    }
}
