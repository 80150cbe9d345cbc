use std::time::Instant;

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::error::ImportResult;

use super::record::{is_blank, LineParser, RawRecord, RowAt};
use super::references::ReferenceCache;
use super::EntityKind;

/// One entity type's parsing and persistence rules.
pub(crate) trait ImportRow: Sized {
    const KIND: EntityKind;
    /// Positional field names of the member file.
    const FIELDS: &'static [&'static str];

    fn from_record(record: &RawRecord) -> ImportResult<Self>;

    /// Short human readable key for debug logs.
    fn describe(&self) -> String;

    /// Resolve foreign keys and persist. Returns `true` when the natural key
    /// was new.
    async fn upsert(
        &self,
        conn: &mut SqliteConnection,
        refs: &mut ReferenceCache,
        at: RowAt,
    ) -> ImportResult<bool>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySummary {
    pub rows: u64,
    pub created: u64,
    pub updated: u64,
    pub skipped_lines: u64,
    pub batches: u64,
    pub elapsed_ms: u64,
}

/// Import every line of one member.
///
/// Rows are handled one at a time straight off the lazy line iterator. With a
/// `batch_size`, the reference cache is dropped every `batch_size` rows; the
/// result does not depend on where those boundaries fall.
pub(crate) async fn run_pass<R, I>(
    lines: I,
    conn: &mut SqliteConnection,
    batch_size: Option<usize>,
) -> ImportResult<EntitySummary>
where
    R: ImportRow,
    I: IntoIterator<Item = ImportResult<String>>,
{
    let kind = R::KIND;
    let started = Instant::now();
    let mut summary = EntitySummary::default();
    let mut refs = ReferenceCache::default();
    let mut parser = LineParser::new();
    let mut in_batch = 0usize;

    info!(
        target: "usda_import",
        event = "pass_start",
        entity = %kind,
        member = kind.member(),
        batch_size = batch_size.unwrap_or(0)
    );

    for (index, line) in lines.into_iter().enumerate() {
        let line = line?;
        let line_no = index + 1;
        if is_blank(&line) {
            summary.skipped_lines += 1;
            continue;
        }

        let record = parser.record(kind, line_no, &line, R::FIELDS);
        let row = R::from_record(&record)?;
        let created = row.upsert(conn, &mut refs, record.at()).await?;
        summary.rows += 1;
        if created {
            summary.created += 1;
            debug!(target: "usda_import", event = "row_created", entity = %kind, line = line_no, key = %row.describe());
        } else {
            summary.updated += 1;
            debug!(target: "usda_import", event = "row_updated", entity = %kind, line = line_no, key = %row.describe());
        }

        in_batch += 1;
        if batch_size.is_some_and(|size| in_batch >= size) {
            summary.batches += 1;
            debug!(
                target: "usda_import",
                event = "batch_complete",
                entity = %kind,
                batch = summary.batches,
                rows = in_batch,
                cached_keys = refs.len()
            );
            refs.clear();
            in_batch = 0;
        }
    }
    if in_batch > 0 {
        summary.batches += 1;
    }

    summary.elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        target: "usda_import",
        event = "pass_complete",
        entity = %kind,
        rows = summary.rows,
        created = summary.created,
        updated = summary.updated,
        batches = summary.batches,
        elapsed_ms = summary.elapsed_ms,
        "created {} new {}, updated {} {}",
        summary.created,
        kind.label(),
        summary.updated,
        kind.label()
    );

    Ok(summary)
}
