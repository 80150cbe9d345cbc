use super::EntityKind;

const FOOD_GROUP_RANK: u16 = 0;
const FOOD_RANK: u16 = 10;
const FOOD_CHILD_RANK: u16 = 20;
const NUTRIENT_RANK: u16 = 30;
const FOOTNOTE_RANK: u16 = 40;
const REFERENCE_RANK: u16 = 50;
const MEASUREMENT_RANK: u16 = 60;
const MEASUREMENT_CHILD_RANK: u16 = 70;

/// Sort key placing every kind after the kinds its foreign keys point at.
pub(crate) fn import_order_key(kind: EntityKind) -> (u16, u16) {
    let rank = match kind {
        EntityKind::FoodGroup => FOOD_GROUP_RANK,
        EntityKind::Food => FOOD_RANK,
        EntityKind::Weight => FOOD_CHILD_RANK,
        EntityKind::Nutrient => NUTRIENT_RANK,
        EntityKind::Footnote => FOOTNOTE_RANK,
        EntityKind::DataSource | EntityKind::DataDerivation | EntityKind::Source => REFERENCE_RANK,
        EntityKind::NutrientData => MEASUREMENT_RANK,
        EntityKind::DataSourceLink => MEASUREMENT_CHILD_RANK,
    };
    // Reference tables share a rank; keep them in distribution order.
    let tie = match kind {
        EntityKind::DataSource => 0,
        EntityKind::DataDerivation => 1,
        EntityKind::Source => 2,
        _ => 0,
    };

    (rank, tie)
}

pub(crate) fn in_import_order(kinds: impl IntoIterator<Item = EntityKind>) -> Vec<EntityKind> {
    let mut ordered: Vec<EntityKind> = kinds.into_iter().collect();
    ordered.sort_by_key(|kind| import_order_key(*kind));
    ordered.dedup();
    ordered
}
