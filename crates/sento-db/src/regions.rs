//! Database operations for the `regions` table.
//!
//! A region row is written as soon as the trend source lists it. The
//! geometry columns stay `NULL` until geocoding succeeds, and are set once.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use sento_core::{Region, RegionGeometry};

use crate::DbError;

/// A row from the `regions` table with the point geometry unpacked.
///
/// The geometry fields are `None` for a region that was recorded but never
/// enriched.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RegionRow {
    pub woeid: i64,
    pub name: String,
    pub country: String,
    pub parent_woeid: Option<i64>,
    pub display_name: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub enriched_at: Option<DateTime<Utc>>,
}

/// Returns `true` if `woeid` has a row with its geometry stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn region_exists(pool: &PgPool, woeid: i64) -> Result<bool, DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM regions WHERE woeid = $1 AND the_geom IS NOT NULL)",
    )
    .bind(woeid)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Records a discovered region without geometry. A no-op when the woeid is
/// already present. Returns `true` when a row was inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn record_region(pool: &PgPool, region: &Region) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO regions (woeid, name, country, parent_woeid) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (woeid) DO NOTHING",
    )
    .bind(region.woeid)
    .bind(&region.name)
    .bind(&region.country)
    .bind(region.parent_woeid)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Attaches geometry to a region, inserting the row if it was never
/// recorded. Geometry that is already stored is left untouched.
///
/// The point is built from the numeric coordinates; the polygon comes from
/// the GeoJSON and falls back to the point when no geometry was returned.
/// Returns `true` when geometry was written.
///
/// # Errors
///
/// Returns [`DbError::Encode`] if the GeoJSON cannot be serialized, or
/// [`DbError::Sqlx`] if the write fails (including invalid GeoJSON).
pub async fn enrich_region(
    pool: &PgPool,
    region: &Region,
    geometry: &RegionGeometry,
) -> Result<bool, DbError> {
    let geojson = geometry
        .geojson
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| DbError::Encode {
            field: "geojson",
            reason: e.to_string(),
        })?;

    let result = sqlx::query(
        "INSERT INTO regions \
             (woeid, name, country, parent_woeid, display_name, coords, the_geom, enriched_at) \
         VALUES ($1, $2, $3, $4, $5, \
                 ST_SetSRID(ST_MakePoint($6, $7), 4326), \
                 ST_SetSRID(COALESCE(ST_GeomFromGeoJSON($8::TEXT), ST_MakePoint($6, $7)), 4326), \
                 NOW()) \
         ON CONFLICT (woeid) DO UPDATE SET \
             display_name = EXCLUDED.display_name, \
             coords = EXCLUDED.coords, \
             the_geom = EXCLUDED.the_geom, \
             enriched_at = EXCLUDED.enriched_at \
         WHERE regions.the_geom IS NULL",
    )
    .bind(region.woeid)
    .bind(&region.name)
    .bind(&region.country)
    .bind(region.parent_woeid)
    .bind(&geometry.display_name)
    .bind(geometry.longitude)
    .bind(geometry.latitude)
    .bind(geojson)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Fetches one region, enriched or not.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_region(pool: &PgPool, woeid: i64) -> Result<Option<RegionRow>, DbError> {
    let row = sqlx::query_as::<_, RegionRow>(
        "SELECT woeid, name, country, parent_woeid, display_name, \
                ST_X(coords) AS longitude, ST_Y(coords) AS latitude, \
                created_at, enriched_at \
         FROM regions \
         WHERE woeid = $1",
    )
    .bind(woeid)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
