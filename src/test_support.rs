use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use sqlx::SqlitePool;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

#[path = "../tests/fixtures/sr22.rs"]
mod sr22;

/// The shared sample distribution, one entry per required member.
pub(crate) fn sample_members() -> Vec<(&'static str, String)> {
    sr22::SAMPLE_MEMBERS
        .iter()
        .map(|(name, body)| (*name, body.to_string()))
        .collect()
}

/// Replace one member's body in a member list.
pub(crate) fn with_member(
    mut members: Vec<(&'static str, String)>,
    name: &str,
    body: impl Into<String>,
) -> Vec<(&'static str, String)> {
    let body = body.into();
    for (member, existing) in members.iter_mut() {
        if *member == name {
            *existing = body.clone();
        }
    }
    members
}

pub(crate) fn write_archive(dir: &Path, members: &[(&str, String)]) -> PathBuf {
    let path = dir.join("sr22.zip");
    let file = File::create(&path).unwrap();
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, body) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
    path
}

/// Fresh single-connection pool on a file inside `dir`, schema applied.
pub(crate) async fn migrated_pool(dir: &Path) -> SqlitePool {
    let pool = crate::db::open_sqlite_pool(&dir.join("usda.sqlite3"))
        .await
        .unwrap();
    crate::migrate::apply_migrations(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::REQUIRED_MEMBERS;

    #[test]
    fn sample_covers_every_required_member_in_order() {
        let names: Vec<&str> = sample_members().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, REQUIRED_MEMBERS);
        assert!(sample_members().iter().all(|(_, body)| body.ends_with("\r\n")));
    }
}
