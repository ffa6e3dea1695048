//! Diesel ORM models for the catalogue table.

use chrono::SecondsFormat;
use diesel::prelude::*;

use super::parse_datetime;
use super::util::to_diesel_error;
use crate::models::{CatalogRecord, Price, Rating};
use crate::schema;

/// Catalogue row from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::catalog_records)]
pub struct CatalogRecordRow {
    pub id: i32,
    pub title: String,
    pub rating: String,
    pub category: String,
    pub price_cents: i64,
    pub availability: String,
    pub observed_at: String,
}

/// New catalogue row for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::catalog_records)]
pub struct NewCatalogRecord<'a> {
    pub title: &'a str,
    pub rating: &'a str,
    pub category: &'a str,
    pub price_cents: i64,
    pub availability: &'a str,
    pub observed_at: String,
}

impl<'a> From<&'a CatalogRecord> for NewCatalogRecord<'a> {
    fn from(record: &'a CatalogRecord) -> Self {
        Self {
            title: &record.title,
            rating: record.rating.as_str(),
            category: &record.category,
            price_cents: record.price.cents(),
            availability: &record.availability,
            observed_at: record.observed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

impl TryFrom<CatalogRecordRow> for CatalogRecord {
    type Error = diesel::result::Error;

    fn try_from(row: CatalogRecordRow) -> Result<Self, Self::Error> {
        let rating = Rating::from_str(&row.rating)
            .ok_or_else(|| to_diesel_error(format!("unknown rating label {:?}", row.rating)))?;
        let price = Price::from_cents(row.price_cents)
            .ok_or_else(|| to_diesel_error(format!("negative price {}", row.price_cents)))?;

        Ok(CatalogRecord {
            title: row.title,
            rating,
            category: row.category,
            price,
            availability: row.availability,
            observed_at: parse_datetime(&row.observed_at),
        })
    }
}
