use std::fmt;

use serde::{Deserialize, Serialize};

use crate::archive::{
    DATA_SRC, DATSRCLN, DERIV_CD, FD_GROUP, FOOD_DES, FOOTNOTE, NUTR_DEF, NUT_DATA, SRC_CD, WEIGHT,
};

/// The record types carried by an SR distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    FoodGroup,
    Food,
    Weight,
    Nutrient,
    Footnote,
    DataSource,
    DataDerivation,
    Source,
    NutrientData,
    DataSourceLink,
}

impl EntityKind {
    pub const ALL: [EntityKind; 10] = [
        EntityKind::FoodGroup,
        EntityKind::Food,
        EntityKind::Weight,
        EntityKind::Nutrient,
        EntityKind::Footnote,
        EntityKind::DataSource,
        EntityKind::DataDerivation,
        EntityKind::Source,
        EntityKind::NutrientData,
        EntityKind::DataSourceLink,
    ];

    /// Archive member holding this record type.
    pub fn member(self) -> &'static str {
        match self {
            EntityKind::FoodGroup => FD_GROUP,
            EntityKind::Food => FOOD_DES,
            EntityKind::Weight => WEIGHT,
            EntityKind::Nutrient => NUTR_DEF,
            EntityKind::Footnote => FOOTNOTE,
            EntityKind::DataSource => DATA_SRC,
            EntityKind::DataDerivation => DERIV_CD,
            EntityKind::Source => SRC_CD,
            EntityKind::NutrientData => NUT_DATA,
            EntityKind::DataSourceLink => DATSRCLN,
        }
    }

    /// Plural noun used in progress logs.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::FoodGroup => "food groups",
            EntityKind::Food => "foods",
            EntityKind::Weight => "weights",
            EntityKind::Nutrient => "nutrients",
            EntityKind::Footnote => "footnotes",
            EntityKind::DataSource => "data sources",
            EntityKind::DataDerivation => "data derivations",
            EntityKind::Source => "sources",
            EntityKind::NutrientData => "nutrient data",
            EntityKind::DataSourceLink => "data source links",
        }
    }

    /// Whether the pass for this kind is chunked into fixed-size batches.
    pub fn is_batched(self) -> bool {
        matches!(self, EntityKind::NutrientData | EntityKind::DataSourceLink)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::FoodGroup => "food group",
            EntityKind::Food => "food",
            EntityKind::Weight => "weight",
            EntityKind::Nutrient => "nutrient",
            EntityKind::Footnote => "footnote",
            EntityKind::DataSource => "data source",
            EntityKind::DataDerivation => "data derivation",
            EntityKind::Source => "source",
            EntityKind::NutrientData => "nutrient data",
            EntityKind::DataSourceLink => "data source link",
        };
        f.write_str(name)
    }
}
