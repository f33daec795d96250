use chrono::{Datelike, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Page size used when the list endpoint is called without `limit`
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// Upper bound applied to `limit` on the list endpoint
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Years a date of birth may fall in (four-digit calendar years only)
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1..=9999;

fn calendar_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let date = NaiveDate::deserialize(deserializer)?;
    if YEAR_RANGE.contains(&date.year()) {
        Ok(date)
    } else {
        Err(de::Error::custom(format!(
            "date {} is outside 0001-01-01..=9999-12-31",
            date
        )))
    }
}

/// Species accepted by the API
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum Species {
    #[default]
    European,
    British,
    Persian,
    NorwegianForestCat,
}

impl Species {
    pub fn as_str(self) -> &'static str {
        match self {
            Species::European => "european",
            Species::British => "british",
            Species::Persian => "persian",
            Species::NorwegianForestCat => "norwegian-forest-cat",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown species '{0}'")]
pub struct UnknownSpecies(pub String);

impl FromStr for Species {
    type Err = UnknownSpecies;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "european" => Ok(Species::European),
            "british" => Ok(Species::British),
            "persian" => Ok(Species::Persian),
            "norwegian-forest-cat" => Ok(Species::NorwegianForestCat),
            other => Err(UnknownSpecies(other.to_string())),
        }
    }
}

/// A cat as seen by API clients
///
/// `id` is empty until the record has been persisted; any value supplied on
/// creation is discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Cat {
    pub name: String,
    #[serde(deserialize_with = "calendar_date")]
    #[schema(value_type = String, format = Date, example = "2020-01-01")]
    pub date_of_birth: NaiveDate,
    pub weight: f64,
    #[serde(default)]
    pub species: Species,
    #[serde(default)]
    pub id: String,
}

/// A cat as persisted by the datastore; identity lives in the storage key
#[derive(Debug, Clone, PartialEq)]
pub struct CatRecord {
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub weight: f64,
    pub species: Species,
}

/// Query parameters for list endpoint
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

/// Pagination metadata of a list response
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Meta {
    /// Token resuming the listing, empty when there is nothing left
    pub cursor: String,
}

/// Response type for list endpoint
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ListResponse {
    pub data: Vec<Cat>,
    pub meta: Meta,
}
