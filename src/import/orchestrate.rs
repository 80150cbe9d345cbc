use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{error, info};

use crate::archive::SrArchive;
use crate::config::ImportConfig;
use crate::db::finish_tx;
use crate::error::{ImportError, ImportResult};
use crate::migrate::apply_migrations;

use super::pass::{run_pass, EntitySummary};
use super::report::{write_import_report, EntityReport, ImportReport};
use super::rows::{
    DataDerivationRow, DataSourceLinkRow, DataSourceRow, FoodGroupRow, FoodRow, FootnoteRow,
    NutrientDataRow, NutrientRow, SourceRow, WeightRow,
};
use super::table_order::in_import_order;
use super::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportState {
    Pending,
    Complete,
}

/// Drives one import run from archive verification to commit.
#[derive(Debug)]
pub struct Importer {
    config: ImportConfig,
    state: ImportState,
}

impl Importer {
    pub fn new(config: ImportConfig) -> Self {
        Self {
            config,
            state: ImportState::Pending,
        }
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Import the selected entity types in dependency order inside a single
    /// transaction. Archive problems are reported before anything is written;
    /// any row failure rolls the whole run back.
    pub async fn run(&mut self, pool: &SqlitePool) -> ImportResult<ImportReport> {
        let started_at = Utc::now();
        let clock = Instant::now();

        info!(
            target: "usda_import",
            event = "import_start",
            archive = %self.config.archive_path.display(),
            "verifying archive"
        );
        let mut archive = SrArchive::open(&self.config.archive_path, self.config.encoding)?;

        let kinds = in_import_order(self.config.selection.kinds());
        if self.config.selection.is_everything() {
            info!(target: "usda_import", event = "import_selection", "parsing all available data");
        } else {
            info!(
                target: "usda_import",
                event = "import_selection",
                kinds = %kinds.iter().map(|kind| kind.label()).collect::<Vec<_>>().join(", ")
            );
        }

        apply_migrations(pool).await.map_err(ImportError::Migration)?;

        let batch_size = self.config.effective_batch_size();
        let mut tx = pool.begin().await?;
        info!(target: "usda_import", event = "db_tx_begin");
        let outcome = run_passes(&mut archive, &mut tx, &kinds, batch_size).await;
        if let Err(err) = &outcome {
            error!(target: "usda_import", event = "import_failed", code = err.code(), error = %err);
        }
        let entities = finish_tx(tx, outcome).await?;
        self.state = ImportState::Complete;

        let report = ImportReport {
            archive_path: self.config.archive_path.display().to_string(),
            database_path: self.config.database_path.display().to_string(),
            started_at,
            finished_at: Utc::now(),
            elapsed_ms: clock.elapsed().as_millis() as u64,
            entities,
        };
        info!(
            target: "usda_import",
            event = "import_complete",
            created = report.total_created(),
            updated = report.total_updated(),
            elapsed_ms = report.elapsed_ms
        );

        if let Some(dir) = &self.config.report_dir {
            let path = write_import_report(dir, &report).map_err(|source| ImportError::Report {
                path: dir.clone(),
                source,
            })?;
            info!(target: "usda_import", event = "import_report_written", path = %path.display());
        }

        Ok(report)
    }
}

/// Run a full import with `config` against `pool`.
pub async fn run_import(pool: &SqlitePool, config: ImportConfig) -> ImportResult<ImportReport> {
    Importer::new(config).run(pool).await
}

async fn run_passes(
    archive: &mut SrArchive,
    conn: &mut SqliteConnection,
    kinds: &[EntityKind],
    batch_size: usize,
) -> ImportResult<Vec<EntityReport>> {
    let mut entities = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        let batch = kind.is_batched().then_some(batch_size);
        let summary = run_kind(archive, conn, kind, batch).await?;
        entities.push(EntityReport {
            entity: kind,
            member: kind.member().to_string(),
            summary,
        });
    }
    Ok(entities)
}

async fn run_kind(
    archive: &mut SrArchive,
    conn: &mut SqliteConnection,
    kind: EntityKind,
    batch: Option<usize>,
) -> ImportResult<EntitySummary> {
    info!(target: "usda_import", event = "member_read", member = kind.member());
    let lines = archive.member_lines(kind.member())?;
    match kind {
        EntityKind::FoodGroup => run_pass::<FoodGroupRow, _>(lines, conn, batch).await,
        EntityKind::Food => run_pass::<FoodRow, _>(lines, conn, batch).await,
        EntityKind::Weight => run_pass::<WeightRow, _>(lines, conn, batch).await,
        EntityKind::Nutrient => run_pass::<NutrientRow, _>(lines, conn, batch).await,
        EntityKind::Footnote => run_pass::<FootnoteRow, _>(lines, conn, batch).await,
        EntityKind::DataSource => run_pass::<DataSourceRow, _>(lines, conn, batch).await,
        EntityKind::DataDerivation => run_pass::<DataDerivationRow, _>(lines, conn, batch).await,
        EntityKind::Source => run_pass::<SourceRow, _>(lines, conn, batch).await,
        EntityKind::NutrientData => run_pass::<NutrientDataRow, _>(lines, conn, batch).await,
        EntityKind::DataSourceLink => run_pass::<DataSourceLinkRow, _>(lines, conn, batch).await,
    }
}
