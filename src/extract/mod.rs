//! Grid extraction: pagination, table snapshots and row enrichment.

pub mod enrich;
pub mod pagination;
pub mod table;

pub use enrich::{EnrichmentSummary, RowEnricher};
pub use pagination::{PageArena, PaginationCursor, PaginationExtractor, PaginationReport, StopReason};
pub use table::{RawTableSnapshot, RowDefect, TableOutcome, build_batch};
