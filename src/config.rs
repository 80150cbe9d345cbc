use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::import::EntityKind;

pub const DEFAULT_ARCHIVE: &str = "sr22.zip";
pub const DEFAULT_DATABASE: &str = "usda.sqlite3";
/// Nutrient data rows handled per batch. Bounds the per-batch reference cache.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Character encoding of the archive members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceEncoding {
    /// ISO-8859-1, as shipped by the SR distributions.
    #[default]
    Latin1,
    /// UTF-8; invalid sequences are replaced.
    Utf8,
}

impl SourceEncoding {
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            SourceEncoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            SourceEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

impl FromStr for SourceEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "latin1" | "latin-1" | "iso-8859-1" => Ok(SourceEncoding::Latin1),
            "utf8" | "utf-8" => Ok(SourceEncoding::Utf8),
            other => Err(format!("unsupported encoding `{other}` (expected latin1 or utf8)")),
        }
    }
}

impl fmt::Display for SourceEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceEncoding::Latin1 => f.write_str("latin1"),
            SourceEncoding::Utf8 => f.write_str("utf8"),
        }
    }
}

/// Which record types to (re)import. With no flag set, everything is selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitySelection {
    pub all: bool,
    pub group: bool,
    pub food: bool,
    pub nutrient: bool,
    pub weight: bool,
    pub footnote: bool,
    pub datasource: bool,
    pub derivation: bool,
    pub source: bool,
    pub data: bool,
    pub link: bool,
}

impl EntitySelection {
    pub fn everything() -> Self {
        Self {
            all: true,
            ..Self::default()
        }
    }

    fn flag(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::FoodGroup => self.group,
            EntityKind::Food => self.food,
            EntityKind::Weight => self.weight,
            EntityKind::Nutrient => self.nutrient,
            EntityKind::Footnote => self.footnote,
            EntityKind::DataSource => self.datasource,
            EntityKind::DataDerivation => self.derivation,
            EntityKind::Source => self.source,
            EntityKind::NutrientData => self.data,
            EntityKind::DataSourceLink => self.link,
        }
    }

    /// True when `--all` was given or no per-type flag was set.
    pub fn is_everything(&self) -> bool {
        self.all || !EntityKind::ALL.iter().any(|kind| self.flag(*kind))
    }

    pub fn includes(&self, kind: EntityKind) -> bool {
        self.is_everything() || self.flag(kind)
    }

    /// Selected kinds, in no particular order.
    pub fn kinds(&self) -> Vec<EntityKind> {
        EntityKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.includes(*kind))
            .collect()
    }
}

/// Everything the orchestrator needs to run one import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportConfig {
    pub archive_path: PathBuf,
    pub database_path: PathBuf,
    pub selection: EntitySelection,
    pub batch_size: usize,
    pub encoding: SourceEncoding,
    pub report_dir: Option<PathBuf>,
    /// 0 = warnings only, 1 = info, 2+ = debug.
    pub verbosity: u8,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            archive_path: PathBuf::from(DEFAULT_ARCHIVE),
            database_path: PathBuf::from(DEFAULT_DATABASE),
            selection: EntitySelection::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            encoding: SourceEncoding::default(),
            report_dir: None,
            verbosity: 1,
        }
    }
}

impl ImportConfig {
    pub fn new(archive_path: impl Into<PathBuf>) -> Self {
        Self {
            archive_path: archive_path.into(),
            ..Self::default()
        }
    }

    /// Batch size actually used; zero falls back to the default.
    pub fn effective_batch_size(&self) -> usize {
        if self.batch_size == 0 {
            DEFAULT_BATCH_SIZE
        } else {
            self.batch_size
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_selects_everything() {
        let selection = EntitySelection::default();
        assert!(selection.is_everything());
        assert_eq!(selection.kinds().len(), EntityKind::ALL.len());
    }

    #[test]
    fn flags_select_exact_subset() {
        let selection = EntitySelection {
            food: true,
            data: true,
            ..EntitySelection::default()
        };
        assert!(!selection.is_everything());
        assert_eq!(
            selection.kinds(),
            vec![EntityKind::Food, EntityKind::NutrientData]
        );
    }

    #[test]
    fn all_flag_wins_over_subset() {
        let selection = EntitySelection {
            all: true,
            food: true,
            ..EntitySelection::default()
        };
        assert!(selection.includes(EntityKind::Footnote));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ImportConfig =
            serde_json::from_str(r#"{"archivePath":"sr28.zip","selection":{"food":true}}"#)
                .unwrap();
        assert_eq!(config.archive_path, PathBuf::from("sr28.zip"));
        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DATABASE));
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert!(config.selection.food);
        assert_eq!(config.encoding, SourceEncoding::Latin1);
    }

    #[test]
    fn encoding_parses_common_spellings() {
        assert_eq!("UTF-8".parse::<SourceEncoding>(), Ok(SourceEncoding::Utf8));
        assert_eq!("latin1".parse::<SourceEncoding>(), Ok(SourceEncoding::Latin1));
        assert!("ebcdic".parse::<SourceEncoding>().is_err());
    }
}
