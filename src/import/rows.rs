use sqlx::SqliteConnection;

use crate::error::ImportResult;

use super::pass::ImportRow;
use super::record::{RawRecord, RowAt};
use super::references::ReferenceCache;
use super::store;
use super::EntityKind;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FoodGroupRow {
    pub code: i64,
    pub description: String,
}

impl ImportRow for FoodGroupRow {
    const KIND: EntityKind = EntityKind::FoodGroup;
    const FIELDS: &'static [&'static str] = &["fdgrp_cd", "fdgrp_desc"];

    fn from_record(record: &RawRecord) -> ImportResult<Self> {
        Ok(Self {
            code: record.required_int("fdgrp_cd")?,
            description: record.text("fdgrp_desc", 60),
        })
    }

    fn describe(&self) -> String {
        format!("{} {}", self.code, self.description)
    }

    async fn upsert(
        &self,
        conn: &mut SqliteConnection,
        _refs: &mut ReferenceCache,
        at: RowAt,
    ) -> ImportResult<bool> {
        store::upsert_food_group(conn, self)
            .await
            .map_err(at.write_error())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FoodRow {
    pub ndb_number: i64,
    pub food_group_code: i64,
    pub long_description: Option<String>,
    pub short_description: Option<String>,
    pub common_name: Option<String>,
    pub manufacturer_name: Option<String>,
    pub survey: Option<bool>,
    pub refuse_description: Option<String>,
    pub refuse_percentage: Option<i64>,
    pub scientific_name: Option<String>,
    pub nitrogen_factor: Option<f64>,
    pub protein_factor: Option<f64>,
    pub fat_factor: Option<f64>,
    pub cho_factor: Option<f64>,
}

impl ImportRow for FoodRow {
    const KIND: EntityKind = EntityKind::Food;
    const FIELDS: &'static [&'static str] = &[
        "ndb_no",
        "fdgrp_cd",
        "long_desc",
        "short_desc",
        "com_name",
        "manufac_name",
        "survey",
        "ref_desc",
        "refuse",
        "sci_name",
        "n_factor",
        "pro_factor",
        "fat_factor",
        "cho_factor",
    ];

    fn from_record(record: &RawRecord) -> ImportResult<Self> {
        Ok(Self {
            ndb_number: record.required_int("ndb_no")?,
            food_group_code: record.required_int("fdgrp_cd")?,
            long_description: record.optional_text("long_desc", 200),
            short_description: record.optional_text("short_desc", 60),
            common_name: record.optional_text("com_name", 100),
            manufacturer_name: record.optional_text("manufac_name", 65),
            survey: record.flag("survey"),
            refuse_description: record.optional_text("ref_desc", 135),
            refuse_percentage: record.optional_int("refuse")?,
            scientific_name: record.optional_text("sci_name", 65),
            nitrogen_factor: record.optional_float("n_factor")?,
            protein_factor: record.optional_float("pro_factor")?,
            fat_factor: record.optional_float("fat_factor")?,
            cho_factor: record.optional_float("cho_factor")?,
        })
    }

    fn describe(&self) -> String {
        match &self.long_description {
            Some(description) => format!("{} {}", self.ndb_number, description),
            None => self.ndb_number.to_string(),
        }
    }

    async fn upsert(
        &self,
        conn: &mut SqliteConnection,
        refs: &mut ReferenceCache,
        at: RowAt,
    ) -> ImportResult<bool> {
        refs.require_food_group(conn, self.food_group_code, at).await?;
        store::upsert_food(conn, self).await.map_err(at.write_error())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WeightRow {
    pub food_ndb_number: i64,
    pub sequence: i64,
    pub amount: f64,
    pub description: String,
    pub gram_weight: f64,
    pub number_of_data_points: Option<f64>,
    pub standard_deviation: Option<f64>,
}

impl ImportRow for WeightRow {
    const KIND: EntityKind = EntityKind::Weight;
    const FIELDS: &'static [&'static str] = &[
        "ndb_no",
        "seq",
        "amount",
        "msre_desc",
        "gm_wgt",
        "num_data_pts",
        "std_dev",
    ];

    fn from_record(record: &RawRecord) -> ImportResult<Self> {
        Ok(Self {
            food_ndb_number: record.required_int("ndb_no")?,
            sequence: record.required_int("seq")?,
            amount: record.required_float("amount")?,
            description: record.text("msre_desc", 80),
            gram_weight: record.required_float("gm_wgt")?,
            number_of_data_points: record.optional_float("num_data_pts")?,
            standard_deviation: record.optional_float("std_dev")?,
        })
    }

    fn describe(&self) -> String {
        format!("{}#{} {}", self.food_ndb_number, self.sequence, self.description)
    }

    async fn upsert(
        &self,
        conn: &mut SqliteConnection,
        refs: &mut ReferenceCache,
        at: RowAt,
    ) -> ImportResult<bool> {
        refs.require_food(conn, self.food_ndb_number, at).await?;
        store::upsert_weight(conn, self).await.map_err(at.write_error())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NutrientRow {
    pub number: i64,
    pub units: String,
    pub tagname: Option<String>,
    pub description: String,
    pub decimals: i64,
    pub sr_order: i64,
}

impl ImportRow for NutrientRow {
    const KIND: EntityKind = EntityKind::Nutrient;
    const FIELDS: &'static [&'static str] =
        &["nutr_no", "units", "tagname", "nutrdesc", "num_dec", "sr_order"];

    fn from_record(record: &RawRecord) -> ImportResult<Self> {
        Ok(Self {
            number: record.required_int("nutr_no")?,
            units: record.text("units", 7),
            tagname: record.optional_text("tagname", 20),
            description: record.text("nutrdesc", 60),
            decimals: record.required_int("num_dec")?,
            sr_order: record.required_int("sr_order")?,
        })
    }

    fn describe(&self) -> String {
        format!("{} {}", self.number, self.description)
    }

    async fn upsert(
        &self,
        conn: &mut SqliteConnection,
        _refs: &mut ReferenceCache,
        at: RowAt,
    ) -> ImportResult<bool> {
        store::upsert_nutrient(conn, self)
            .await
            .map_err(at.write_error())
    }
}

/// Footnote category. Anything unrecognised is treated as a nutrient note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FootnoteType {
    FoodDescription,
    Measure,
    Nutrient,
}

impl FootnoteType {
    pub(crate) fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("D") => FootnoteType::FoodDescription,
            Some("M") => FootnoteType::Measure,
            _ => FootnoteType::Nutrient,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            FootnoteType::FoodDescription => "D",
            FootnoteType::Measure => "M",
            FootnoteType::Nutrient => "N",
        }
    }
}

const DEFAULT_FOOTNOTE_NUMBER: i64 = 1;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FootnoteRow {
    pub food_ndb_number: i64,
    pub number: i64,
    pub kind: FootnoteType,
    pub nutrient_number: Option<i64>,
    pub text: String,
}

impl ImportRow for FootnoteRow {
    const KIND: EntityKind = EntityKind::Footnote;
    const FIELDS: &'static [&'static str] =
        &["ndb_no", "footnt_no", "footnt_typ", "nutr_no", "footnt_txt"];

    fn from_record(record: &RawRecord) -> ImportResult<Self> {
        Ok(Self {
            food_ndb_number: record.required_int("ndb_no")?,
            number: record
                .optional_int("footnt_no")?
                .unwrap_or(DEFAULT_FOOTNOTE_NUMBER),
            kind: FootnoteType::parse(record.get("footnt_typ")),
            nutrient_number: record.optional_int("nutr_no")?,
            text: record.text("footnt_txt", 200),
        })
    }

    fn describe(&self) -> String {
        match self.nutrient_number {
            Some(nutrient) => format!("{}#{}/{}", self.food_ndb_number, self.number, nutrient),
            None => format!("{}#{}", self.food_ndb_number, self.number),
        }
    }

    async fn upsert(
        &self,
        conn: &mut SqliteConnection,
        refs: &mut ReferenceCache,
        at: RowAt,
    ) -> ImportResult<bool> {
        refs.require_food(conn, self.food_ndb_number, at).await?;
        if let Some(nutrient) = self.nutrient_number {
            refs.require_nutrient(conn, nutrient, at).await?;
        }
        store::upsert_footnote(conn, self)
            .await
            .map_err(at.write_error())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DataSourceRow {
    pub id: String,
    pub authors: Option<String>,
    pub title: String,
    pub year: Option<i64>,
    pub journal: Option<String>,
    pub volume_or_city: Option<String>,
    pub issue_or_state: Option<String>,
    pub start_page: Option<i64>,
    pub end_page: Option<i64>,
}

impl ImportRow for DataSourceRow {
    const KIND: EntityKind = EntityKind::DataSource;
    const FIELDS: &'static [&'static str] = &[
        "datasrc_id",
        "authors",
        "title",
        "year",
        "journal",
        "vol_city",
        "issue_state",
        "start_page",
        "end_page",
    ];

    fn from_record(record: &RawRecord) -> ImportResult<Self> {
        Ok(Self {
            id: record.required_key("datasrc_id", 6)?,
            authors: record.optional_text("authors", 255),
            title: record.text("title", 255),
            year: record.optional_int("year")?,
            journal: record.optional_text("journal", 135),
            volume_or_city: record.optional_text("vol_city", 16),
            issue_or_state: record.optional_text("issue_state", 5),
            start_page: record.optional_int("start_page")?,
            end_page: record.optional_int("end_page")?,
        })
    }

    fn describe(&self) -> String {
        format!("{} {}", self.id, self.title)
    }

    async fn upsert(
        &self,
        conn: &mut SqliteConnection,
        _refs: &mut ReferenceCache,
        at: RowAt,
    ) -> ImportResult<bool> {
        store::upsert_data_source(conn, self)
            .await
            .map_err(at.write_error())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DataDerivationRow {
    pub code: String,
    pub description: String,
}

impl ImportRow for DataDerivationRow {
    const KIND: EntityKind = EntityKind::DataDerivation;
    const FIELDS: &'static [&'static str] = &["deriv_cd", "deriv_desc"];

    fn from_record(record: &RawRecord) -> ImportResult<Self> {
        Ok(Self {
            code: record.required_key("deriv_cd", 4)?,
            description: record.text("deriv_desc", 120),
        })
    }

    fn describe(&self) -> String {
        format!("{} {}", self.code, self.description)
    }

    async fn upsert(
        &self,
        conn: &mut SqliteConnection,
        _refs: &mut ReferenceCache,
        at: RowAt,
    ) -> ImportResult<bool> {
        store::upsert_data_derivation(conn, self)
            .await
            .map_err(at.write_error())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SourceRow {
    pub code: i64,
    pub description: String,
}

impl ImportRow for SourceRow {
    const KIND: EntityKind = EntityKind::Source;
    const FIELDS: &'static [&'static str] = &["src_cd", "srccd_desc"];

    fn from_record(record: &RawRecord) -> ImportResult<Self> {
        Ok(Self {
            code: record.required_int("src_cd")?,
            description: record.text("srccd_desc", 60),
        })
    }

    fn describe(&self) -> String {
        format!("{} {}", self.code, self.description)
    }

    async fn upsert(
        &self,
        conn: &mut SqliteConnection,
        _refs: &mut ReferenceCache,
        at: RowAt,
    ) -> ImportResult<bool> {
        store::upsert_source(conn, self).await.map_err(at.write_error())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NutrientDataRow {
    pub food_ndb_number: i64,
    pub nutrient_number: i64,
    pub value: f64,
    pub data_points: i64,
    pub standard_error: Option<f64>,
    pub source_code: Option<i64>,
    pub derivation_code: Option<String>,
    pub reference_ndb_number: Option<i64>,
    pub added_nutrient: Option<bool>,
    pub number_of_studies: Option<i64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub degrees_of_freedom: Option<i64>,
    pub lower_error_bound: Option<f64>,
    pub upper_error_bound: Option<f64>,
    pub statistical_comments: Option<String>,
    pub confidence_code: Option<String>,
}

impl ImportRow for NutrientDataRow {
    const KIND: EntityKind = EntityKind::NutrientData;
    const FIELDS: &'static [&'static str] = &[
        "ndb_no",
        "nutr_no",
        "nutr_val",
        "num_data_pts",
        "std_error",
        "src_cd",
        "deriv_cd",
        "ref_ndb_no",
        "add_nutr_mark",
        "num_studies",
        "min",
        "max",
        "df",
        "low_eb",
        "up_eb",
        "stat_cmt",
        "cc",
    ];

    fn from_record(record: &RawRecord) -> ImportResult<Self> {
        Ok(Self {
            food_ndb_number: record.required_int("ndb_no")?,
            nutrient_number: record.required_int("nutr_no")?,
            value: record.required_float("nutr_val")?,
            data_points: record.required_int("num_data_pts")?,
            standard_error: record.optional_float("std_error")?,
            source_code: record.optional_int("src_cd")?,
            derivation_code: record.optional_key("deriv_cd", 4),
            reference_ndb_number: record.optional_int("ref_ndb_no")?,
            added_nutrient: record.flag("add_nutr_mark"),
            number_of_studies: record.optional_int("num_studies")?,
            minimum: record.optional_float("min")?,
            maximum: record.optional_float("max")?,
            degrees_of_freedom: record.optional_int("df")?,
            lower_error_bound: record.optional_float("low_eb")?,
            upper_error_bound: record.optional_float("up_eb")?,
            statistical_comments: record.optional_text("stat_cmt", 10),
            confidence_code: record.optional_text("cc", 1),
        })
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.food_ndb_number, self.nutrient_number)
    }

    async fn upsert(
        &self,
        conn: &mut SqliteConnection,
        refs: &mut ReferenceCache,
        at: RowAt,
    ) -> ImportResult<bool> {
        refs.require_food(conn, self.food_ndb_number, at).await?;
        refs.require_nutrient(conn, self.nutrient_number, at).await?;
        if let Some(code) = &self.derivation_code {
            refs.require_derivation(conn, code, at).await?;
        }
        if let Some(code) = self.source_code {
            refs.require_source(conn, code, at).await?;
        }

        let (created, id) = store::upsert_nutrient_data(conn, self)
            .await
            .map_err(at.write_error())?;
        if let Some(code) = self.source_code {
            store::link_measurement_source(conn, id, code)
                .await
                .map_err(at.write_error())?;
        }
        Ok(created)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DataSourceLinkRow {
    pub food_ndb_number: i64,
    pub nutrient_number: i64,
    pub data_source_id: String,
}

impl ImportRow for DataSourceLinkRow {
    const KIND: EntityKind = EntityKind::DataSourceLink;
    const FIELDS: &'static [&'static str] = &["ndb_no", "nutr_no", "datasrc_id"];

    fn from_record(record: &RawRecord) -> ImportResult<Self> {
        Ok(Self {
            food_ndb_number: record.required_int("ndb_no")?,
            nutrient_number: record.required_int("nutr_no")?,
            data_source_id: record.required_key("datasrc_id", 6)?,
        })
    }

    fn describe(&self) -> String {
        format!(
            "{}/{} -> {}",
            self.food_ndb_number, self.nutrient_number, self.data_source_id
        )
    }

    async fn upsert(
        &self,
        conn: &mut SqliteConnection,
        refs: &mut ReferenceCache,
        at: RowAt,
    ) -> ImportResult<bool> {
        let measurement = refs
            .require_measurement(conn, self.food_ndb_number, self.nutrient_number, at)
            .await?;
        refs.require_data_source(conn, &self.data_source_id, at).await?;
        store::upsert_data_source_link(conn, measurement, self)
            .await
            .map_err(at.write_error())
    }
}
