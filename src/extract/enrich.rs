//! Per-row drill-down enrichment.

use crate::browser::Driver;
use crate::config::{Timing, ms};
use crate::error::HarvestError;
use crate::interact::{Interactor, Step};
use crate::record::RecordBatch;
use crate::schema::{KEY_FIELD, Schema};
use crate::status::StatusSink;
use crate::targets;
use tracing::{debug, warn};

/// What happened while enriching one batch.
#[derive(Debug, Default)]
pub struct EnrichmentSummary {
    /// Rows with a non-empty key field.
    pub attempted: usize,
    /// Rows whose enrichment slot was set.
    pub filled: usize,
    pub issues: Vec<HarvestError>,
}

/// Opens each keyed row's detail dialog, reads the value and closes it again.
pub struct RowEnricher<'a> {
    timing: &'a Timing,
}

impl<'a> RowEnricher<'a> {
    pub fn new(timing: &'a Timing) -> Self {
        Self { timing }
    }

    /// Enrich every row of `batch` whose key field is non-empty.
    ///
    /// Rows are processed in order and independently; a failed row leaves
    /// its slot unset.
    pub async fn enrich<D: Driver + ?Sized>(
        &self,
        interactor: &Interactor<'_, D>,
        schema: &Schema,
        batch: &mut RecordBatch,
        status: &dyn StatusSink,
    ) -> EnrichmentSummary {
        let mut summary = EnrichmentSummary::default();
        let Some(key_index) = schema.index_of(KEY_FIELD) else {
            warn!(field = KEY_FIELD, "Schema has no key field, skipping enrichment");
            status.warn(&format!("Column '{KEY_FIELD}' not found, skipping enrichment."));
            return summary;
        };

        for row in 0..batch.len() {
            let key = match batch.cell(row, key_index).map(str::trim) {
                Some(key) if !key.is_empty() => key.to_string(),
                _ => continue,
            };
            summary.attempted += 1;
            let position = batch.position(row).unwrap_or(row + 1);
            let short: String = key.chars().take(10).collect();
            status.info(&format!("Row {position}: opening detail for '{short}...'"));

            match self.enrich_row(interactor, position).await {
                Ok(Some(value)) => {
                    status.info(&format!("Row {position}: extracted '{value}'"));
                    batch.set_enrichment(row, value);
                    summary.filled += 1;
                }
                Ok(None) => {
                    status.warn(&format!("Row {position}: detail value is empty"));
                }
                Err(reason) => {
                    let error = HarvestError::Enrichment {
                        page: batch.page,
                        row: position,
                        reason,
                    };
                    status.error(&error.to_string());
                    summary.issues.push(error);
                }
            }
        }

        debug!(
            page = batch.page,
            table = batch.table,
            attempted = summary.attempted,
            filled = summary.filled,
            "Batch enriched"
        );
        summary
    }

    /// Returns the value to commit, `None` when the dialog held no text.
    async fn enrich_row<D: Driver + ?Sized>(
        &self,
        interactor: &Interactor<'_, D>,
        position: usize,
    ) -> Result<Option<String>, String> {
        let t = self.timing;
        let open = Step::click(targets::row_detail_open().at_row(position))
            .within(ms(t.detail_open_wait_ms))
            .settle(ms(t.detail_open_settle_ms));
        interactor
            .run(&open)
            .await
            .map_err(|e| format!("could not open detail: {e}"))?;

        let read = Step::read(targets::detail_value()).settle(ms(t.detail_read_settle_ms));
        let value = interactor.run(&read).await;

        // The dialog is closed even when the read failed.
        let close = Step::click(targets::detail_close()).settle(ms(t.detail_close_settle_ms));
        let closed = interactor.run(&close).await;

        let value = value.map_err(|e| format!("could not read detail: {e}"))?;
        closed.map_err(|e| format!("detail dialog did not close: {e}"))?;
        Ok(value.filter(|v| !v.is_empty()))
    }
}
