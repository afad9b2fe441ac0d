//! Final dataset assembly.

use crate::extract::PageArena;
use crate::schema::{ENRICHMENT_COLUMN, ExportRules, Schema};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Bool(bool),
    Empty,
}

impl Cell {
    fn text(value: String) -> Self {
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value)
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Empty => Ok(()),
        }
    }
}

/// Pruned, typed rows ready for export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Dataset {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell of `row` in the named column.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembly {
    Dataset(Dataset),
    /// Nothing was extracted.
    Empty,
}

enum Column {
    Text(usize),
    Bool(usize),
    Enrichment,
}

/// Concatenate batches in extraction order and shape them per `rules`.
pub fn assemble(arena: PageArena, schema: &Schema, rules: &ExportRules) -> Assembly {
    if arena.is_empty() {
        return Assembly::Empty;
    }

    let mut columns = Vec::new();
    let mut plan = Vec::new();
    for (index, name) in schema.columns().iter().enumerate() {
        if rules.drop_columns.contains(name) {
            continue;
        }
        columns.push(name.clone());
        plan.push(if rules.boolean_columns.contains(name) {
            Column::Bool(index)
        } else {
            Column::Text(index)
        });
    }
    if !rules.drop_columns.iter().any(|c| c == ENRICHMENT_COLUMN) {
        columns.push(ENRICHMENT_COLUMN.to_string());
        plan.push(Column::Enrichment);
    }

    let mut rows: Vec<Vec<Cell>> = arena
        .into_batches()
        .flat_map(|batch| batch.into_rows())
        .map(|(mut cells, enrichment)| {
            plan.iter()
                .map(|column| match *column {
                    Column::Text(i) => {
                        Cell::text(cells.get_mut(i).map(std::mem::take).unwrap_or_default())
                    }
                    Column::Bool(i) => {
                        Cell::Bool(cells.get(i).is_some_and(|c| *c == rules.checked_marker))
                    }
                    Column::Enrichment => enrichment.clone().map_or(Cell::Empty, Cell::text),
                })
                .collect()
        })
        .collect();

    let keep = rows.len().saturating_sub(rules.drop_trailing_rows);
    rows.truncate(keep);
    Assembly::Dataset(Dataset { columns, rows })
}
