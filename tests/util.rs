#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use sqlx::SqlitePool;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

#[path = "fixtures/sr22.rs"]
mod sr22;

pub const MEMBERS: [&str; 10] = [
    "FOOD_DES.txt",
    "FD_GROUP.txt",
    "NUT_DATA.txt",
    "NUTR_DEF.txt",
    "SRC_CD.txt",
    "DERIV_CD.txt",
    "WEIGHT.txt",
    "FOOTNOTE.txt",
    "DATSRCLN.txt",
    "DATA_SRC.txt",
];

/// Member bodies keyed by file name; members left unset are written empty.
#[derive(Debug, Clone, Default)]
pub struct Fixture {
    members: Vec<(String, Vec<u8>)>,
    omit: Vec<String>,
}

impl Fixture {
    /// Two groups, two foods, two nutrients with full supporting tables.
    pub fn sample() -> Self {
        sr22::SAMPLE_MEMBERS
            .iter()
            .fold(Self::default(), |fixture, (name, body)| fixture.member(name, body))
    }

    pub fn member(mut self, name: &str, body: impl AsRef<[u8]>) -> Self {
        self.members.retain(|(existing, _)| existing != name);
        self.members.push((name.to_string(), body.as_ref().to_vec()));
        self
    }

    pub fn without(mut self, name: &str) -> Self {
        self.omit.push(name.to_string());
        self
    }

    pub fn write(&self, dir: &Path) -> PathBuf {
        let path = dir.join("sr22.zip");
        let mut writer = ZipWriter::new(File::create(&path).unwrap());
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for name in MEMBERS {
            if self.omit.iter().any(|omitted| omitted == name) {
                continue;
            }
            let body = self
                .members
                .iter()
                .find(|(member, _)| member == name)
                .map(|(_, body)| body.as_slice())
                .unwrap_or_default();
            writer.start_file(name, options).unwrap();
            writer.write_all(body).unwrap();
        }
        writer.finish().unwrap();
        path
    }
}

pub async fn file_pool(dir: &Path, name: &str) -> SqlitePool {
    let pool = usda_import::db::open_sqlite_pool(&dir.join(name))
        .await
        .expect("open sqlite pool");
    usda_import::migrate::apply_migrations(&pool)
        .await
        .expect("apply migrations");
    pool
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Every table as sorted text rows, for whole-database comparisons.
pub async fn snapshot(pool: &SqlitePool) -> Vec<String> {
    let queries = [
        "SELECT code || '|' || description FROM food_group",
        "SELECT ndb_number || '|' || food_group_code || '|' || IFNULL(long_description, '') || '|' || survey || '|' || IFNULL(scientific_name, '') FROM food",
        "SELECT food_ndb_number || '|' || sequence || '|' || description || '|' || gram_weight FROM weight",
        "SELECT number || '|' || units || '|' || description FROM nutrient",
        "SELECT food_ndb_number || '|' || number || '|' || type || '|' || IFNULL(nutrient_number, '-') || '|' || text FROM footnote",
        "SELECT id || '|' || title FROM data_source",
        "SELECT code || '|' || description FROM data_derivation",
        "SELECT code || '|' || description FROM source",
        "SELECT food_ndb_number || '|' || nutrient_number || '|' || nutrient_value || '|' || data_points || '|' || IFNULL(data_derivation_code, '') FROM nutrient_data",
        "SELECT d.food_ndb_number || '|' || d.nutrient_number || '|' || s.source_code FROM nutrient_data_source s JOIN nutrient_data d ON d.id = s.nutrient_data_id",
        "SELECT d.food_ndb_number || '|' || d.nutrient_number || '|' || l.data_source_id FROM nutrient_data_data_source l JOIN nutrient_data d ON d.id = l.nutrient_data_id",
    ];
    let mut rows = Vec::new();
    for sql in queries {
        let mut table: Vec<String> = sqlx::query_scalar(sql).fetch_all(pool).await.unwrap();
        table.sort();
        rows.extend(table);
    }
    rows
}
