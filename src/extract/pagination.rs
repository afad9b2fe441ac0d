//! Pagination traversal as an explicit state machine.
//!
//! ```text
//! ReadCursor ──> ExtractPage ──> Advance ──> ReadCursor
//!     │              │              │
//!     └──────────────┴──────────────┴──> Done(StopReason)
//! ```
//!
//! Batches are threaded through the transitions in a [`PageArena`]; every
//! stop keeps whatever was gathered before it.

use super::enrich::RowEnricher;
use super::table::{RawTableSnapshot, TableOutcome, build_batch};
use crate::browser::Driver;
use crate::config::{Timing, ms};
use crate::error::{HarvestError, Issue};
use crate::interact::{Interactor, Step};
use crate::record::RecordBatch;
use crate::schema::Schema;
use crate::status::StatusSink;
use crate::targets;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Position reported by the grid's "Pagina n di m" status text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    pub current_page: u32,
    pub total_pages: u32,
}

impl PaginationCursor {
    /// Parse "Pagina `n` di `m`" (second and fourth whitespace tokens).
    pub fn parse(text: &str) -> Result<Self, String> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let number = |index: usize| -> Result<u32, String> {
            let token = tokens
                .get(index)
                .ok_or_else(|| format!("unexpected status text {text:?}"))?;
            token
                .parse()
                .map_err(|_| format!("{token:?} in {text:?} is not a page number"))
        };
        Ok(Self {
            current_page: number(1)?,
            total_pages: number(3)?,
        })
    }

    pub fn is_last(&self) -> bool {
        self.current_page >= self.total_pages
    }
}

/// Batches gathered so far, keyed by page.
#[derive(Debug, Default)]
pub struct PageArena {
    pages: BTreeMap<u32, Vec<RecordBatch>>,
}

impl PageArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch after the page's earlier tables.
    pub fn insert(&mut self, batch: RecordBatch) {
        self.pages.entry(batch.page).or_default().push(batch);
    }

    pub fn is_empty(&self) -> bool {
        self.pages.values().all(Vec::is_empty)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn row_count(&self) -> usize {
        self.batches().map(RecordBatch::len).sum()
    }

    /// Batches in extraction order: page, then table.
    pub fn batches(&self) -> impl Iterator<Item = &RecordBatch> {
        self.pages.values().flatten()
    }

    pub fn into_batches(self) -> impl Iterator<Item = RecordBatch> {
        self.pages.into_values().flatten()
    }
}

/// Why the traversal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum StopReason {
    /// The cursor reported the last page.
    LastPage,
    /// The status text could not be read or parsed.
    CursorRead,
    /// The next-page control could not be used.
    Advance,
    /// The page number did not increase after advancing.
    Stalled,
    /// As many pages were extracted as the grid reports in total.
    IterationLimit,
}

#[derive(Debug)]
pub struct PaginationReport {
    pub arena: PageArena,
    pub pages_visited: u32,
    pub stop: StopReason,
    pub issues: Vec<Issue>,
}

enum State {
    ReadCursor,
    ExtractPage(PaginationCursor),
    Advance(PaginationCursor),
    Done(StopReason),
}

/// Walks the grid page by page, extracting (and optionally enriching)
/// every table.
pub struct PaginationExtractor<'a> {
    schema: &'a Schema,
    timing: &'a Timing,
    enrich: bool,
}

impl<'a> PaginationExtractor<'a> {
    pub fn new(schema: &'a Schema, timing: &'a Timing) -> Self {
        Self {
            schema,
            timing,
            enrich: true,
        }
    }

    pub fn with_enrichment(mut self, enrich: bool) -> Self {
        self.enrich = enrich;
        self
    }

    pub async fn run<D: Driver + ?Sized>(
        &self,
        interactor: &Interactor<'_, D>,
        status: &dyn StatusSink,
    ) -> PaginationReport {
        let mut arena = PageArena::new();
        let mut issues = Vec::new();
        let mut pages_visited = 0u32;
        let mut previous_page: Option<u32> = None;
        let mut state = State::ReadCursor;

        let stop = loop {
            state = match state {
                State::ReadCursor => match self.read_cursor(interactor).await {
                    Ok(cursor) if previous_page.is_some_and(|p| cursor.current_page <= p) => {
                        status.warn(&format!(
                            "Still on page {} after advancing, stopping.",
                            cursor.current_page
                        ));
                        State::Done(StopReason::Stalled)
                    }
                    Ok(cursor) if pages_visited > 0 && pages_visited >= cursor.total_pages => {
                        status.warn(&format!(
                            "Visited {pages_visited} page(s) of {}, stopping.",
                            cursor.total_pages
                        ));
                        State::Done(StopReason::IterationLimit)
                    }
                    Ok(cursor) => {
                        status.info(&format!(
                            "Page {} of {}",
                            cursor.current_page, cursor.total_pages
                        ));
                        State::ExtractPage(cursor)
                    }
                    Err(error) => {
                        status.error(&error.to_string());
                        issues.push(Issue::from(error));
                        State::Done(StopReason::CursorRead)
                    }
                },

                State::ExtractPage(cursor) => {
                    pages_visited += 1;
                    self.extract_page(interactor, cursor.current_page, &mut arena, &mut issues, status)
                        .await;
                    if cursor.is_last() {
                        status.info("Last page reached.");
                        State::Done(StopReason::LastPage)
                    } else {
                        State::Advance(cursor)
                    }
                }

                State::Advance(cursor) => {
                    let step = Step::click(targets::next_page())
                        .within(ms(self.timing.advance_wait_ms))
                        .settle(ms(self.timing.advance_settle_ms));
                    match interactor.run(&step).await {
                        Ok(_) => {
                            debug!(from = cursor.current_page, "Advanced to next page");
                            previous_page = Some(cursor.current_page);
                            State::ReadCursor
                        }
                        Err(e) => {
                            let error = HarvestError::Advance {
                                page: cursor.current_page,
                                reason: e.to_string(),
                            };
                            status.error(&error.to_string());
                            issues.push(Issue::from(error));
                            State::Done(StopReason::Advance)
                        }
                    }
                }

                State::Done(reason) => break reason,
            };
        };

        info!(
            pages = pages_visited,
            rows = arena.row_count(),
            stop = %stop,
            "Pagination finished"
        );
        PaginationReport {
            arena,
            pages_visited,
            stop,
            issues,
        }
    }

    async fn read_cursor<D: Driver + ?Sized>(
        &self,
        interactor: &Interactor<'_, D>,
    ) -> Result<PaginationCursor, HarvestError> {
        let text = interactor
            .run(&Step::read(targets::pagination_status()))
            .await
            .map_err(|e| HarvestError::CursorRead(e.to_string()))?
            .ok_or_else(|| HarvestError::CursorRead("status text is empty".to_string()))?;
        PaginationCursor::parse(&text).map_err(HarvestError::CursorRead)
    }

    async fn extract_page<D: Driver + ?Sized>(
        &self,
        interactor: &Interactor<'_, D>,
        page: u32,
        arena: &mut PageArena,
        issues: &mut Vec<Issue>,
        status: &dyn StatusSink,
    ) {
        status.info(&format!("Extracting page {page}..."));
        let tables = match interactor.driver().snapshot_tables().await {
            Ok(tables) => tables,
            Err(e) => {
                // Table 0 stands for the whole page.
                let error = HarvestError::TableExtraction {
                    page,
                    table: 0,
                    reason: format!("page snapshot failed: {e}"),
                };
                status.error(&error.to_string());
                issues.push(Issue::from(error));
                return;
            }
        };
        status.info(&format!("Found {} table(s) on the page.", tables.len()));

        for (i, value) in tables.iter().enumerate() {
            let table = i + 1;
            let (snapshot, defects) = match RawTableSnapshot::from_value(value) {
                Ok(parsed) => parsed,
                Err(reason) => {
                    let error = HarvestError::TableExtraction { page, table, reason };
                    status.error(&error.to_string());
                    issues.push(Issue::from(error));
                    continue;
                }
            };
            for defect in defects {
                let error = HarvestError::RowParse {
                    page,
                    table,
                    row: defect.row,
                    reason: defect.reason,
                };
                status.warn(&error.to_string());
                issues.push(Issue::from(error));
            }
            if !snapshot.has_body {
                status.warn(&format!("Table #{table} has no tbody, using all rows."));
            }

            match build_batch(page, table, self.schema, snapshot) {
                TableOutcome::NoRows => {
                    status.info(&format!("Table #{table} has no rows, skipping."));
                }
                TableOutcome::OnlyEmptyRows => {
                    status.info(&format!("Table #{table} contains only empty rows, skipping."));
                }
                TableOutcome::Batch(mut batch) => {
                    status.info(&format!("Table #{table} extracted with {} rows", batch.len()));
                    if self.enrich {
                        let summary = RowEnricher::new(self.timing)
                            .enrich(interactor, self.schema, &mut batch, status)
                            .await;
                        issues.extend(summary.issues.into_iter().map(Issue::from));
                    }
                    arena.insert(batch);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::BrowserOptions;
    use crate::error::Severity;
    use crate::status::MemoryStatus;
    use crate::testing::{FakeDriver, FakePage};
    use serde_json::json;

    async fn traverse(driver: &FakeDriver) -> (PaginationReport, MemoryStatus) {
        let schema = Schema::activity();
        let timing = Timing::default();
        let status = MemoryStatus::new();
        let interactor = Interactor::new(driver, &BrowserOptions::default());
        let report = PaginationExtractor::new(&schema, &timing)
            .with_enrichment(false)
            .run(&interactor, &status)
            .await;
        (report, status)
    }

    #[test]
    fn parses_status_text() {
        assert_eq!(
            PaginationCursor::parse("Pagina 3 di 12"),
            Ok(PaginationCursor {
                current_page: 3,
                total_pages: 12
            })
        );
        assert!(PaginationCursor::parse("Pagina tre di 12").is_err());
        assert!(PaginationCursor::parse("Pagina 3").is_err());
        assert!(PaginationCursor::parse("").is_err());
    }

    #[test]
    fn arena_orders_by_page_then_table() {
        let schema = Schema::new(["a"]);
        let mut arena = PageArena::new();
        arena.insert(RecordBatch::new(2, 1, &schema, vec![vec!["p2".into()]]));
        arena.insert(RecordBatch::new(1, 1, &schema, vec![vec!["p1t1".into()]]));
        arena.insert(RecordBatch::new(1, 2, &schema, vec![vec!["p1t2".into()]]));

        let order: Vec<_> = arena.batches().map(|b| (b.page, b.table)).collect();
        assert_eq!(order, vec![(1, 1), (1, 2), (2, 1)]);
        assert_eq!(arena.page_count(), 2);
        assert_eq!(arena.row_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn visits_every_page_once() {
        for total in 1..=4u32 {
            let driver = FakeDriver::new();
            for current in 1..=total {
                let page = FakePage::new()
                    .cursor(current, total)
                    .table(vec![vec!["09:00", "10:00"]]);
                driver.push_page(if current < total { page.advancing() } else { page });
            }

            let (report, _) = traverse(&driver).await;
            assert_eq!(report.pages_visited, total);
            assert_eq!(report.stop, StopReason::LastPage);
            assert_eq!(report.arena.page_count(), total as usize);
            assert!(report.issues.is_empty());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cursor_failure_stops_immediately() {
        let driver = FakeDriver::new();
        driver.push_page(FakePage::new().table(vec![vec!["x"]]));

        let (report, _) = traverse(&driver).await;
        assert_eq!(report.stop, StopReason::CursorRead);
        assert_eq!(report.pages_visited, 0);
        assert!(report.arena.is_empty());
        assert_eq!(report.issues[0].severity, Severity::PhaseAborted);
    }

    #[tokio::test(start_paused = true)]
    async fn advance_failure_keeps_prior_pages() {
        let driver = FakeDriver::new();
        driver.push_page(FakePage::new().cursor(1, 3).table(vec![vec!["a"], vec!["b"]]));

        let (report, status) = traverse(&driver).await;
        assert_eq!(report.stop, StopReason::Advance);
        assert_eq!(report.pages_visited, 1);
        assert_eq!(report.arena.row_count(), 2);
        assert!(matches!(
            report.issues[0].error,
            HarvestError::Advance { page: 1, .. }
        ));
        assert!(status.contains("could not advance past page 1"));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_cursor_stops() {
        let driver = FakeDriver::new();
        // Clicking the arrow on the only page leaves the cursor unchanged.
        driver.push_page(FakePage::new().cursor(1, 5).table(vec![vec!["a"]]).advancing());

        let (report, _) = traverse(&driver).await;
        assert_eq!(report.stop, StopReason::Stalled);
        assert_eq!(report.pages_visited, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shrinking_total_hits_iteration_limit() {
        let driver = FakeDriver::new();
        driver.push_page(FakePage::new().cursor(1, 3).advancing());
        driver.push_page(FakePage::new().cursor(2, 3).advancing());
        driver.push_page(FakePage::new().cursor(3, 2));

        let (report, _) = traverse(&driver).await;
        assert_eq!(report.stop, StopReason::IterationLimit);
        assert_eq!(report.pages_visited, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_failure_still_advances() {
        let driver = FakeDriver::new();
        driver.push_page(FakePage::new().cursor(1, 2).snapshot_error("detached").advancing());
        driver.push_page(FakePage::new().cursor(2, 2).table(vec![vec!["kept"]]));

        let (report, _) = traverse(&driver).await;
        assert_eq!(report.stop, StopReason::LastPage);
        assert_eq!(report.pages_visited, 2);
        let pages: Vec<u32> = report.arena.batches().map(|b| b.page).collect();
        assert_eq!(pages, vec![2]);
        assert!(matches!(
            report.issues[0].error,
            HarvestError::TableExtraction { page: 1, table: 0, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn skips_empty_tables_and_isolates_bad_ones() {
        let driver = FakeDriver::new();
        driver.push_page(
            FakePage::new()
                .cursor(1, 1)
                .raw_table(json!({ "hasBody": true, "rows": [] }))
                .table(vec![vec!["", ""], vec![]])
                .raw_table(json!("garbage"))
                .raw_table(json!({ "hasBody": false, "rows": [["a"], 5] })),
        );

        let (report, status) = traverse(&driver).await;
        assert!(status.contains("Found 4 table(s) on the page."));
        assert!(status.contains("Table #1 has no rows"));
        assert!(status.contains("Table #2 contains only empty rows"));
        assert!(status.contains("Table #4 has no tbody"));
        assert!(status.contains("Table #4 extracted with 1 rows"));

        let tables: Vec<usize> = report.arena.batches().map(|b| b.table).collect();
        assert_eq!(tables, vec![4]);
        assert_eq!(report.issues.len(), 2);
        assert!(matches!(
            report.issues[0].error,
            HarvestError::TableExtraction { table: 3, .. }
        ));
        assert!(matches!(
            report.issues[1].error,
            HarvestError::RowParse { table: 4, row: 2, .. }
        ));
    }
}
