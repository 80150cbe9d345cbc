use std::collections::{HashMap, HashSet};

use sqlx::SqliteConnection;

use crate::error::ImportResult;

use super::record::RowAt;
use super::store;
use super::EntityKind;

/// Memoized foreign-key existence checks for the current batch.
///
/// Only keys known to exist are remembered, so the cache never needs
/// invalidation inside a run; it is cleared between batches to bound memory.
#[derive(Debug, Default)]
pub(crate) struct ReferenceCache {
    food_groups: HashSet<i64>,
    foods: HashSet<i64>,
    nutrients: HashSet<i64>,
    sources: HashSet<i64>,
    derivations: HashSet<String>,
    data_sources: HashSet<String>,
    measurements: HashMap<(i64, i64), i64>,
}

impl ReferenceCache {
    pub(crate) fn clear(&mut self) {
        self.food_groups.clear();
        self.foods.clear();
        self.nutrients.clear();
        self.sources.clear();
        self.derivations.clear();
        self.data_sources.clear();
        self.measurements.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.food_groups.len()
            + self.foods.len()
            + self.nutrients.len()
            + self.sources.len()
            + self.derivations.len()
            + self.data_sources.len()
            + self.measurements.len()
    }

    pub(crate) async fn require_food_group(
        &mut self,
        conn: &mut SqliteConnection,
        code: i64,
        at: RowAt,
    ) -> ImportResult<()> {
        if self.food_groups.contains(&code) {
            return Ok(());
        }
        if !store::food_group_exists(conn, code).await.map_err(at.write_error())? {
            return Err(at.dangling(EntityKind::FoodGroup, code));
        }
        self.food_groups.insert(code);
        Ok(())
    }

    pub(crate) async fn require_food(
        &mut self,
        conn: &mut SqliteConnection,
        ndb_number: i64,
        at: RowAt,
    ) -> ImportResult<()> {
        if self.foods.contains(&ndb_number) {
            return Ok(());
        }
        if !store::food_exists(conn, ndb_number).await.map_err(at.write_error())? {
            return Err(at.dangling(EntityKind::Food, ndb_number));
        }
        self.foods.insert(ndb_number);
        Ok(())
    }

    pub(crate) async fn require_nutrient(
        &mut self,
        conn: &mut SqliteConnection,
        number: i64,
        at: RowAt,
    ) -> ImportResult<()> {
        if self.nutrients.contains(&number) {
            return Ok(());
        }
        if !store::nutrient_exists(conn, number).await.map_err(at.write_error())? {
            return Err(at.dangling(EntityKind::Nutrient, number));
        }
        self.nutrients.insert(number);
        Ok(())
    }

    pub(crate) async fn require_source(
        &mut self,
        conn: &mut SqliteConnection,
        code: i64,
        at: RowAt,
    ) -> ImportResult<()> {
        if self.sources.contains(&code) {
            return Ok(());
        }
        if !store::source_exists(conn, code).await.map_err(at.write_error())? {
            return Err(at.dangling(EntityKind::Source, code));
        }
        self.sources.insert(code);
        Ok(())
    }

    pub(crate) async fn require_derivation(
        &mut self,
        conn: &mut SqliteConnection,
        code: &str,
        at: RowAt,
    ) -> ImportResult<()> {
        if self.derivations.contains(code) {
            return Ok(());
        }
        if !store::derivation_exists(conn, code).await.map_err(at.write_error())? {
            return Err(at.dangling(EntityKind::DataDerivation, code));
        }
        self.derivations.insert(code.to_string());
        Ok(())
    }

    pub(crate) async fn require_data_source(
        &mut self,
        conn: &mut SqliteConnection,
        id: &str,
        at: RowAt,
    ) -> ImportResult<()> {
        if self.data_sources.contains(id) {
            return Ok(());
        }
        if !store::data_source_exists(conn, id).await.map_err(at.write_error())? {
            return Err(at.dangling(EntityKind::DataSource, id));
        }
        self.data_sources.insert(id.to_string());
        Ok(())
    }

    /// Row id of an imported measurement, keyed by `(food, nutrient)`.
    pub(crate) async fn require_measurement(
        &mut self,
        conn: &mut SqliteConnection,
        food_ndb_number: i64,
        nutrient_number: i64,
        at: RowAt,
    ) -> ImportResult<i64> {
        let key = (food_ndb_number, nutrient_number);
        if let Some(id) = self.measurements.get(&key) {
            return Ok(*id);
        }
        let id = store::measurement_id(conn, food_ndb_number, nutrient_number)
            .await
            .map_err(at.write_error())?
            .ok_or_else(|| {
                at.dangling(
                    EntityKind::NutrientData,
                    format!("{food_ndb_number}/{nutrient_number}"),
                )
            })?;
        self.measurements.insert(key, id);
        Ok(id)
    }
}
