//! Read-only lookups over an imported database.

use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::error::ImportResult;

pub const DEFAULT_LIST_LIMIT: i64 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodSummary {
    pub ndb_number: i64,
    pub food_group_code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
}

impl TryFrom<&SqliteRow> for FoodSummary {
    type Error = sqlx::Error;

    fn try_from(row: &SqliteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            ndb_number: row.try_get("ndb_number")?,
            food_group_code: row.try_get("food_group_code")?,
            long_description: row.try_get("long_description")?,
            short_description: row.try_get("short_description")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightEntry {
    pub sequence: i64,
    pub amount: f64,
    pub description: String,
    pub gram_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutrientValue {
    pub nutrient_number: i64,
    pub description: String,
    pub units: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_codes: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodDetail {
    pub ndb_number: i64,
    pub food_group_code: i64,
    pub food_group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
    pub survey: bool,
    pub weights: Vec<WeightEntry>,
    pub nutrients: Vec<NutrientValue>,
    pub footnotes: Vec<String>,
}

/// Foods ordered by databank number.
pub async fn list_foods(pool: &SqlitePool, limit: i64, offset: i64) -> ImportResult<Vec<FoodSummary>> {
    let rows = sqlx::query(
        "SELECT ndb_number, food_group_code, long_description, short_description
         FROM food ORDER BY ndb_number LIMIT ?1 OFFSET ?2",
    )
    .bind(limit.max(0))
    .bind(offset.max(0))
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| FoodSummary::try_from(row).map_err(Into::into))
        .collect()
}

pub async fn get_food(pool: &SqlitePool, ndb_number: i64) -> ImportResult<Option<FoodDetail>> {
    let Some(row) = sqlx::query(
        "SELECT f.ndb_number, f.food_group_code, g.description AS food_group,
                f.long_description, f.short_description, f.common_name,
                f.scientific_name, f.survey
         FROM food f JOIN food_group g ON g.code = f.food_group_code
         WHERE f.ndb_number = ?1",
    )
    .bind(ndb_number)
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };

    let weights = sqlx::query(
        "SELECT sequence, amount, description, gram_weight
         FROM weight WHERE food_ndb_number = ?1 ORDER BY sequence",
    )
    .bind(ndb_number)
    .fetch_all(pool)
    .await?
    .iter()
    .map(|w| -> Result<WeightEntry, sqlx::Error> {
        Ok(WeightEntry {
            sequence: w.try_get("sequence")?,
            amount: w.try_get("amount")?,
            description: w.try_get("description")?,
            gram_weight: w.try_get("gram_weight")?,
        })
    })
    .collect::<Result<Vec<_>, _>>()?;

    let nutrients = sqlx::query(
        "SELECT d.nutrient_number, n.description, n.units, d.nutrient_value,
                (SELECT group_concat(s.source_code)
                   FROM nutrient_data_source s WHERE s.nutrient_data_id = d.id) AS source_codes
         FROM nutrient_data d JOIN nutrient n ON n.number = d.nutrient_number
         WHERE d.food_ndb_number = ?1 ORDER BY n.sr_order, d.nutrient_number",
    )
    .bind(ndb_number)
    .fetch_all(pool)
    .await?
    .iter()
    .map(|n| -> Result<NutrientValue, sqlx::Error> {
        let codes: Option<String> = n.try_get("source_codes")?;
        Ok(NutrientValue {
            nutrient_number: n.try_get("nutrient_number")?,
            description: n.try_get("description")?,
            units: n.try_get("units")?,
            value: n.try_get("nutrient_value")?,
            source_codes: codes
                .unwrap_or_default()
                .split(',')
                .filter_map(|code| code.trim().parse().ok())
                .collect(),
        })
    })
    .collect::<Result<Vec<_>, _>>()?;

    let footnotes: Vec<String> = sqlx::query_scalar(
        "SELECT text FROM footnote WHERE food_ndb_number = ?1 ORDER BY number, id",
    )
    .bind(ndb_number)
    .fetch_all(pool)
    .await?;

    Ok(Some(FoodDetail {
        ndb_number: row.try_get("ndb_number")?,
        food_group_code: row.try_get("food_group_code")?,
        food_group: row.try_get("food_group")?,
        long_description: row.try_get("long_description")?,
        short_description: row.try_get("short_description")?,
        common_name: row.try_get("common_name")?,
        scientific_name: row.try_get("scientific_name")?,
        survey: row.try_get::<i64, _>("survey")? != 0,
        weights,
        nutrients,
        footnotes,
    }))
}
