use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pass::EntitySummary;
use super::EntityKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityReport {
    pub entity: EntityKind,
    pub member: String,
    #[serde(flatten)]
    pub summary: EntitySummary,
}

/// Outcome of a committed import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub archive_path: String,
    pub database_path: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub entities: Vec<EntityReport>,
}

impl ImportReport {
    pub fn entity(&self, kind: EntityKind) -> Option<&EntitySummary> {
        self.entities
            .iter()
            .find(|report| report.entity == kind)
            .map(|report| &report.summary)
    }

    pub fn total_created(&self) -> u64 {
        self.entities.iter().map(|report| report.summary.created).sum()
    }

    pub fn total_updated(&self) -> u64 {
        self.entities.iter().map(|report| report.summary.updated).sum()
    }
}

pub fn write_import_report(reports_dir: &Path, report: &ImportReport) -> Result<PathBuf> {
    fs::create_dir_all(reports_dir)
        .with_context(|| format!("create reports directory {}", reports_dir.display()))?;

    let timestamp = report.finished_at.format("import-%Y%m%d-%H%M%S.json");
    let path = reports_dir.join(timestamp.to_string());
    let json = serde_json::to_string_pretty(report).context("serialize import report")?;
    fs::write(&path, json).with_context(|| format!("write import report {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn report() -> ImportReport {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 5).unwrap();
        ImportReport {
            archive_path: "sr22.zip".into(),
            database_path: "usda.sqlite3".into(),
            started_at: at,
            finished_at: at,
            elapsed_ms: 12,
            entities: vec![EntityReport {
                entity: EntityKind::FoodGroup,
                member: "FD_GROUP.txt".into(),
                summary: EntitySummary {
                    rows: 2,
                    created: 2,
                    ..EntitySummary::default()
                },
            }],
        }
    }

    #[test]
    fn report_is_written_as_pretty_json() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("reports");
        let path = write_import_report(&dir, &report()).unwrap();
        assert_eq!(path.file_name().unwrap(), "import-20261016-093005.json");

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["entities"][0]["entity"], "food_group");
        assert_eq!(value["entities"][0]["created"], 2);
        assert_eq!(value["archivePath"], "sr22.zip");
    }

    #[test]
    fn totals_sum_every_entity() {
        let report = report();
        assert_eq!(report.total_created(), 2);
        assert_eq!(report.total_updated(), 0);
        assert!(report.entity(EntityKind::Food).is_none());
    }
}
