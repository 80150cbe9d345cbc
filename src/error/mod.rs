use std::io::Error as IoError;
use std::path::PathBuf;

use anyhow::Error as AnyhowError;
use sqlx::Error as SqlxError;
use thiserror::Error;

use crate::import::EntityKind;

pub type ImportResult<T> = std::result::Result<T, ImportError>;

/// Everything that can abort an import run.
///
/// Archive-level variants are raised before any write happens; row-level
/// variants abort the run and roll back the enclosing transaction.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{} does not exist", path.display())]
    ArchiveNotFound { path: PathBuf },
    #[error("{} is not a readable zip archive: {source}", path.display())]
    ArchiveCorrupt {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("archive does not appear to be a valid SR database; unable to extract {}", .0.join(", "))]
    MissingMembers(Vec<String>),
    #[error("failed to read archive member {member}: {source}")]
    MemberRead {
        member: &'static str,
        #[source]
        source: IoError,
    },
    #[error("{entity} line {line}: field {field} could not be parsed from {value:?}")]
    FieldParse {
        entity: EntityKind,
        line: usize,
        field: &'static str,
        value: String,
    },
    #[error("{entity} line {line}: {target} {key} has not been imported")]
    DanglingReference {
        entity: EntityKind,
        line: usize,
        target: EntityKind,
        key: String,
    },
    #[error("{entity} line {line}: natural key collision: {message}")]
    UniquenessViolation {
        entity: EntityKind,
        line: usize,
        message: String,
    },
    #[error("database error: {0}")]
    Database(#[from] SqlxError),
    #[error("failed to apply migrations: {0}")]
    Migration(#[source] AnyhowError),
    #[error("failed to write import report {}: {source}", path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: AnyhowError,
    },
}

impl ImportError {
    /// Machine readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::ArchiveNotFound { .. } => "ARCHIVE/NOT_FOUND",
            ImportError::ArchiveCorrupt { .. } => "ARCHIVE/CORRUPT",
            ImportError::MissingMembers(_) => "ARCHIVE/MISSING_MEMBERS",
            ImportError::MemberRead { .. } => "ARCHIVE/READ",
            ImportError::FieldParse { .. } => "ROW/FIELD_PARSE",
            ImportError::DanglingReference { .. } => "ROW/DANGLING_REFERENCE",
            ImportError::UniquenessViolation { .. } => "ROW/UNIQUENESS_VIOLATION",
            ImportError::Database(_) => "SQLX/DATABASE",
            ImportError::Migration(_) => "DB/MIGRATION",
            ImportError::Report { .. } => "REPORT/WRITE",
        }
    }

    /// Translate a store error raised while persisting one row. Unique
    /// constraint failures become [`ImportError::UniquenessViolation`].
    pub(crate) fn from_row_write(entity: EntityKind, line: usize, err: SqlxError) -> Self {
        if let SqlxError::Database(db_err) = &err {
            let code = db_err.code();
            let is_unique = matches!(code.as_deref(), Some("2067") | Some("1555"))
                || db_err.message().starts_with("UNIQUE constraint failed");
            if is_unique {
                return ImportError::UniquenessViolation {
                    entity,
                    line,
                    message: db_err.message().to_string(),
                };
            }
        }
        ImportError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_members_message_names_every_member() {
        let err = ImportError::MissingMembers(vec!["NUTR_DEF.txt".into(), "WEIGHT.txt".into()]);
        assert_eq!(err.code(), "ARCHIVE/MISSING_MEMBERS");
        let message = err.to_string();
        assert!(message.contains("NUTR_DEF.txt, WEIGHT.txt"), "{message}");
    }

    #[test]
    fn row_errors_carry_entity_and_line() {
        let err = ImportError::DanglingReference {
            entity: EntityKind::NutrientData,
            line: 12,
            target: EntityKind::Food,
            key: "1001".into(),
        };
        assert_eq!(err.code(), "ROW/DANGLING_REFERENCE");
        assert_eq!(
            err.to_string(),
            "nutrient data line 12: food 1001 has not been imported"
        );
    }

    #[tokio::test]
    async fn duplicate_natural_key_becomes_uniqueness_violation() {
        let tmp = tempfile::TempDir::new().unwrap();
        let pool = crate::test_support::migrated_pool(tmp.path()).await;
        sqlx::query("INSERT INTO food_group (code, description) VALUES (500, 'Poultry')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO food (ndb_number, food_group_code) VALUES (5, 500)")
            .execute(&pool)
            .await
            .unwrap();

        let insert = "INSERT INTO footnote (food_ndb_number, number, type, nutrient_number, text)
                      VALUES (5, 1, 'N', NULL, ?1)";
        sqlx::query(insert).bind("first").execute(&pool).await.unwrap();
        let raw = sqlx::query(insert)
            .bind("second")
            .execute(&pool)
            .await
            .unwrap_err();

        let err = ImportError::from_row_write(EntityKind::Footnote, 4, raw);
        assert_eq!(err.code(), "ROW/UNIQUENESS_VIOLATION");
        match &err {
            ImportError::UniquenessViolation {
                entity,
                line,
                message,
            } => {
                assert_eq!(*entity, EntityKind::Footnote);
                assert_eq!(*line, 4);
                assert!(message.contains("idx_footnote_natural_key"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_constraint_store_errors_stay_database_errors() {
        let err = ImportError::from_row_write(EntityKind::Food, 1, SqlxError::RowNotFound);
        assert!(matches!(err, ImportError::Database(SqlxError::RowNotFound)));
    }
}
