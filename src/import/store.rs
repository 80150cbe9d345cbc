//! Natural-key lookups and upserts, one statement set per table.
//!
//! Every upsert first checks whether the natural key already exists (that
//! answer drives the created/updated counters) and then writes through a single
//! `INSERT .. ON CONFLICT DO UPDATE`. Optional columns use
//! `COALESCE(excluded.col, table.col)` so a blank field never clears a value.

use sqlx::{Sqlite, SqliteConnection};

use super::rows::{
    DataDerivationRow, DataSourceLinkRow, DataSourceRow, FoodGroupRow, FoodRow, FootnoteRow,
    NutrientDataRow, NutrientRow, SourceRow, WeightRow,
};

async fn key_exists<'q, T>(conn: &mut SqliteConnection, sql: &'q str, key: T) -> sqlx::Result<bool>
where
    T: 'q + Send + sqlx::Encode<'q, Sqlite> + sqlx::Type<Sqlite>,
{
    let found: Option<i64> = sqlx::query_scalar(sql)
        .bind(key)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

pub(crate) async fn food_group_exists(conn: &mut SqliteConnection, code: i64) -> sqlx::Result<bool> {
    key_exists(conn, "SELECT 1 FROM food_group WHERE code = ?1", code).await
}

pub(crate) async fn food_exists(conn: &mut SqliteConnection, ndb_number: i64) -> sqlx::Result<bool> {
    key_exists(conn, "SELECT 1 FROM food WHERE ndb_number = ?1", ndb_number).await
}

pub(crate) async fn nutrient_exists(conn: &mut SqliteConnection, number: i64) -> sqlx::Result<bool> {
    key_exists(conn, "SELECT 1 FROM nutrient WHERE number = ?1", number).await
}

pub(crate) async fn source_exists(conn: &mut SqliteConnection, code: i64) -> sqlx::Result<bool> {
    key_exists(conn, "SELECT 1 FROM source WHERE code = ?1", code).await
}

pub(crate) async fn derivation_exists(conn: &mut SqliteConnection, code: &str) -> sqlx::Result<bool> {
    key_exists(conn, "SELECT 1 FROM data_derivation WHERE code = ?1", code).await
}

pub(crate) async fn data_source_exists(conn: &mut SqliteConnection, id: &str) -> sqlx::Result<bool> {
    key_exists(conn, "SELECT 1 FROM data_source WHERE id = ?1", id).await
}

/// Row id of the measurement for `(food, nutrient)`, if imported.
pub(crate) async fn measurement_id(
    conn: &mut SqliteConnection,
    food_ndb_number: i64,
    nutrient_number: i64,
) -> sqlx::Result<Option<i64>> {
    sqlx::query_scalar(
        "SELECT id FROM nutrient_data WHERE food_ndb_number = ?1 AND nutrient_number = ?2",
    )
    .bind(food_ndb_number)
    .bind(nutrient_number)
    .fetch_optional(&mut *conn)
    .await
}

pub(crate) async fn upsert_food_group(
    conn: &mut SqliteConnection,
    row: &FoodGroupRow,
) -> sqlx::Result<bool> {
    let created = !food_group_exists(conn, row.code).await?;
    sqlx::query(
        "INSERT INTO food_group (code, description) VALUES (?1, ?2)
         ON CONFLICT(code) DO UPDATE SET description = excluded.description",
    )
    .bind(row.code)
    .bind(&row.description)
    .execute(&mut *conn)
    .await?;
    Ok(created)
}

pub(crate) async fn upsert_food(conn: &mut SqliteConnection, row: &FoodRow) -> sqlx::Result<bool> {
    let created = !food_exists(conn, row.ndb_number).await?;
    sqlx::query(
        "INSERT INTO food (
            ndb_number, food_group_code, long_description, short_description, common_name,
            manufacturer_name, survey, refuse_description, refuse_percentage, scientific_name,
            nitrogen_factor, protein_factor, fat_factor, cho_factor
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, COALESCE(?7, 0), ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(ndb_number) DO UPDATE SET
            food_group_code = excluded.food_group_code,
            long_description = COALESCE(excluded.long_description, food.long_description),
            short_description = COALESCE(excluded.short_description, food.short_description),
            common_name = COALESCE(excluded.common_name, food.common_name),
            manufacturer_name = COALESCE(excluded.manufacturer_name, food.manufacturer_name),
            survey = COALESCE(?7, food.survey),
            refuse_description = COALESCE(excluded.refuse_description, food.refuse_description),
            refuse_percentage = COALESCE(excluded.refuse_percentage, food.refuse_percentage),
            scientific_name = COALESCE(excluded.scientific_name, food.scientific_name),
            nitrogen_factor = COALESCE(excluded.nitrogen_factor, food.nitrogen_factor),
            protein_factor = COALESCE(excluded.protein_factor, food.protein_factor),
            fat_factor = COALESCE(excluded.fat_factor, food.fat_factor),
            cho_factor = COALESCE(excluded.cho_factor, food.cho_factor)",
    )
    .bind(row.ndb_number)
    .bind(row.food_group_code)
    .bind(&row.long_description)
    .bind(&row.short_description)
    .bind(&row.common_name)
    .bind(&row.manufacturer_name)
    .bind(row.survey)
    .bind(&row.refuse_description)
    .bind(row.refuse_percentage)
    .bind(&row.scientific_name)
    .bind(row.nitrogen_factor)
    .bind(row.protein_factor)
    .bind(row.fat_factor)
    .bind(row.cho_factor)
    .execute(&mut *conn)
    .await?;
    Ok(created)
}

pub(crate) async fn upsert_weight(conn: &mut SqliteConnection, row: &WeightRow) -> sqlx::Result<bool> {
    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM weight WHERE food_ndb_number = ?1 AND sequence = ?2",
    )
    .bind(row.food_ndb_number)
    .bind(row.sequence)
    .fetch_optional(&mut *conn)
    .await?;
    sqlx::query(
        "INSERT INTO weight (
            food_ndb_number, sequence, amount, description, gram_weight,
            number_of_data_points, standard_deviation
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(food_ndb_number, sequence) DO UPDATE SET
            amount = excluded.amount,
            description = excluded.description,
            gram_weight = excluded.gram_weight,
            number_of_data_points = COALESCE(excluded.number_of_data_points, weight.number_of_data_points),
            standard_deviation = COALESCE(excluded.standard_deviation, weight.standard_deviation)",
    )
    .bind(row.food_ndb_number)
    .bind(row.sequence)
    .bind(row.amount)
    .bind(&row.description)
    .bind(row.gram_weight)
    .bind(row.number_of_data_points)
    .bind(row.standard_deviation)
    .execute(&mut *conn)
    .await?;
    Ok(existing.is_none())
}

pub(crate) async fn upsert_nutrient(
    conn: &mut SqliteConnection,
    row: &NutrientRow,
) -> sqlx::Result<bool> {
    let created = !nutrient_exists(conn, row.number).await?;
    sqlx::query(
        "INSERT INTO nutrient (number, units, tagname, description, decimals, sr_order)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(number) DO UPDATE SET
            units = excluded.units,
            tagname = COALESCE(excluded.tagname, nutrient.tagname),
            description = excluded.description,
            decimals = excluded.decimals,
            sr_order = excluded.sr_order",
    )
    .bind(row.number)
    .bind(&row.units)
    .bind(&row.tagname)
    .bind(&row.description)
    .bind(row.decimals)
    .bind(row.sr_order)
    .execute(&mut *conn)
    .await?;
    Ok(created)
}

/// Footnotes have a nullable part in their natural key, which `ON CONFLICT`
/// cannot target through the expression index, so they go through an explicit
/// lookup with `IS` and a separate insert or update.
pub(crate) async fn upsert_footnote(
    conn: &mut SqliteConnection,
    row: &FootnoteRow,
) -> sqlx::Result<bool> {
    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM footnote
         WHERE food_ndb_number = ?1 AND number = ?2 AND nutrient_number IS ?3",
    )
    .bind(row.food_ndb_number)
    .bind(row.number)
    .bind(row.nutrient_number)
    .fetch_optional(&mut *conn)
    .await?;

    match existing {
        Some(id) => {
            sqlx::query("UPDATE footnote SET type = ?1, text = ?2 WHERE id = ?3")
                .bind(row.kind.as_str())
                .bind(&row.text)
                .bind(id)
                .execute(&mut *conn)
                .await?;
            Ok(false)
        }
        None => {
            sqlx::query(
                "INSERT INTO footnote (food_ndb_number, number, type, nutrient_number, text)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(row.food_ndb_number)
            .bind(row.number)
            .bind(row.kind.as_str())
            .bind(row.nutrient_number)
            .bind(&row.text)
            .execute(&mut *conn)
            .await?;
            Ok(true)
        }
    }
}

pub(crate) async fn upsert_data_source(
    conn: &mut SqliteConnection,
    row: &DataSourceRow,
) -> sqlx::Result<bool> {
    let created = !data_source_exists(conn, &row.id).await?;
    sqlx::query(
        "INSERT INTO data_source (
            id, authors, title, year, journal, volume_or_city, issue_or_state, start_page, end_page
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(id) DO UPDATE SET
            authors = COALESCE(excluded.authors, data_source.authors),
            title = excluded.title,
            year = COALESCE(excluded.year, data_source.year),
            journal = COALESCE(excluded.journal, data_source.journal),
            volume_or_city = COALESCE(excluded.volume_or_city, data_source.volume_or_city),
            issue_or_state = COALESCE(excluded.issue_or_state, data_source.issue_or_state),
            start_page = COALESCE(excluded.start_page, data_source.start_page),
            end_page = COALESCE(excluded.end_page, data_source.end_page)",
    )
    .bind(&row.id)
    .bind(&row.authors)
    .bind(&row.title)
    .bind(row.year)
    .bind(&row.journal)
    .bind(&row.volume_or_city)
    .bind(&row.issue_or_state)
    .bind(row.start_page)
    .bind(row.end_page)
    .execute(&mut *conn)
    .await?;
    Ok(created)
}

pub(crate) async fn upsert_data_derivation(
    conn: &mut SqliteConnection,
    row: &DataDerivationRow,
) -> sqlx::Result<bool> {
    let created = !derivation_exists(conn, &row.code).await?;
    sqlx::query(
        "INSERT INTO data_derivation (code, description) VALUES (?1, ?2)
         ON CONFLICT(code) DO UPDATE SET description = excluded.description",
    )
    .bind(&row.code)
    .bind(&row.description)
    .execute(&mut *conn)
    .await?;
    Ok(created)
}

pub(crate) async fn upsert_source(conn: &mut SqliteConnection, row: &SourceRow) -> sqlx::Result<bool> {
    let created = !source_exists(conn, row.code).await?;
    sqlx::query(
        "INSERT INTO source (code, description) VALUES (?1, ?2)
         ON CONFLICT(code) DO UPDATE SET description = excluded.description",
    )
    .bind(row.code)
    .bind(&row.description)
    .execute(&mut *conn)
    .await?;
    Ok(created)
}

/// Upsert the measurement and return `(created, row id)`.
pub(crate) async fn upsert_nutrient_data(
    conn: &mut SqliteConnection,
    row: &NutrientDataRow,
) -> sqlx::Result<(bool, i64)> {
    let created = measurement_id(conn, row.food_ndb_number, row.nutrient_number)
        .await?
        .is_none();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO nutrient_data (
            food_ndb_number, nutrient_number, nutrient_value, data_points, standard_error,
            data_derivation_code, reference_ndb_number, added_nutrient, number_of_studies,
            minimum, maximum, degrees_of_freedom, lower_error_bound, upper_error_bound,
            statistical_comments, confidence_code
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, COALESCE(?8, 0), ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
         ON CONFLICT(food_ndb_number, nutrient_number) DO UPDATE SET
            nutrient_value = excluded.nutrient_value,
            data_points = excluded.data_points,
            standard_error = COALESCE(excluded.standard_error, nutrient_data.standard_error),
            data_derivation_code = COALESCE(excluded.data_derivation_code, nutrient_data.data_derivation_code),
            reference_ndb_number = COALESCE(excluded.reference_ndb_number, nutrient_data.reference_ndb_number),
            added_nutrient = COALESCE(?8, nutrient_data.added_nutrient),
            number_of_studies = COALESCE(excluded.number_of_studies, nutrient_data.number_of_studies),
            minimum = COALESCE(excluded.minimum, nutrient_data.minimum),
            maximum = COALESCE(excluded.maximum, nutrient_data.maximum),
            degrees_of_freedom = COALESCE(excluded.degrees_of_freedom, nutrient_data.degrees_of_freedom),
            lower_error_bound = COALESCE(excluded.lower_error_bound, nutrient_data.lower_error_bound),
            upper_error_bound = COALESCE(excluded.upper_error_bound, nutrient_data.upper_error_bound),
            statistical_comments = COALESCE(excluded.statistical_comments, nutrient_data.statistical_comments),
            confidence_code = COALESCE(excluded.confidence_code, nutrient_data.confidence_code)
         RETURNING id",
    )
    .bind(row.food_ndb_number)
    .bind(row.nutrient_number)
    .bind(row.value)
    .bind(row.data_points)
    .bind(row.standard_error)
    .bind(&row.derivation_code)
    .bind(row.reference_ndb_number)
    .bind(row.added_nutrient)
    .bind(row.number_of_studies)
    .bind(row.minimum)
    .bind(row.maximum)
    .bind(row.degrees_of_freedom)
    .bind(row.lower_error_bound)
    .bind(row.upper_error_bound)
    .bind(&row.statistical_comments)
    .bind(&row.confidence_code)
    .fetch_one(&mut *conn)
    .await?;
    Ok((created, id))
}

/// Associate a measurement with a source code. Existing pairs are kept.
pub(crate) async fn link_measurement_source(
    conn: &mut SqliteConnection,
    measurement_id: i64,
    source_code: i64,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO nutrient_data_source (nutrient_data_id, source_code) VALUES (?1, ?2)
         ON CONFLICT(nutrient_data_id, source_code) DO NOTHING",
    )
    .bind(measurement_id)
    .bind(source_code)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Link a measurement to a bibliographic data source; `true` when the pair
/// is new.
pub(crate) async fn upsert_data_source_link(
    conn: &mut SqliteConnection,
    measurement_id: i64,
    row: &DataSourceLinkRow,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        "INSERT INTO nutrient_data_data_source (nutrient_data_id, data_source_id) VALUES (?1, ?2)
         ON CONFLICT(nutrient_data_id, data_source_id) DO NOTHING",
    )
    .bind(measurement_id)
    .bind(&row.data_source_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
