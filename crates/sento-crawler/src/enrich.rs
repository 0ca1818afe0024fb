//! Region enrichment: attach geocoded geometry to regions, at most once.
//!
//! Only the geocoder's first candidate is used. An ambiguous place name can
//! therefore resolve to the wrong place; that is accepted rather than
//! second-guessed here.

use std::sync::Arc;

use sento_core::{GeocodeCandidate, Geocoder, Region, RegionGeometry, SourceError, Store};

use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::shutdown::Shutdown;
use crate::CrawlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// Geometry was already stored; no lookup was made.
    AlreadyEnriched,
    /// Geometry was looked up and written.
    Enriched,
    /// The geocoder had no candidate. The region stays un-enriched and is
    /// tried again next cycle.
    NotFound,
    /// The region's parent is not the crawl target.
    OutsideTarget,
}

/// Resolves a region to geometry through a [`Geocoder`] and stores it.
pub struct GeocodeEnricher<S, G> {
    store: Arc<S>,
    geocoder: Arc<G>,
    retry: RetryPolicy,
}

impl<S: Store, G: Geocoder> GeocodeEnricher<S, G> {
    pub fn new(store: Arc<S>, geocoder: Arc<G>, retry: RetryPolicy) -> Self {
        Self {
            store,
            geocoder,
            retry,
        }
    }

    /// Looks up and stores geometry for `region` unless it is already stored.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Store`] if the existence check or the write
    /// fails, and [`CrawlError::Source`] if the lookup fails after retries or
    /// the candidate's coordinates are unusable.
    pub async fn enrich(
        &self,
        region: &Region,
        shutdown: &Shutdown,
    ) -> Result<EnrichOutcome, CrawlError> {
        if self.store.region_exists(region.woeid).await? {
            return Ok(EnrichOutcome::AlreadyEnriched);
        }

        tracing::debug!(
            woeid = region.woeid,
            region = %region.name,
            country = %region.country,
            "requesting region geometry"
        );
        let geocoder = &*self.geocoder;
        let (city, country) = (region.name.as_str(), region.country.as_str());
        let candidates =
            retry_with_backoff(self.retry, shutdown, move || geocoder.lookup(city, country))
                .await?;

        let Some(candidate) = candidates.into_iter().next() else {
            tracing::info!(
                woeid = region.woeid,
                region = %region.name,
                country = %region.country,
                "no geocoding match for region"
            );
            return Ok(EnrichOutcome::NotFound);
        };

        let geometry = geometry_from_candidate(candidate)?;
        tracing::debug!(
            woeid = region.woeid,
            display_name = %geometry.display_name,
            lon = geometry.longitude,
            lat = geometry.latitude,
            "storing region geometry"
        );
        self.store.upsert_region(region, &geometry).await?;
        Ok(EnrichOutcome::Enriched)
    }
}

/// Converts a geocoder candidate's string coordinates into numbers.
///
/// # Errors
///
/// Returns [`SourceError::Malformed`] if either coordinate does not parse or
/// is out of range.
pub fn geometry_from_candidate(candidate: GeocodeCandidate) -> Result<RegionGeometry, SourceError> {
    let parse = |field: &str, raw: &str, limit: f64| -> Result<f64, SourceError> {
        let value: f64 = raw.trim().parse().map_err(|_| SourceError::Malformed {
            context: format!("geocode candidate '{}'", candidate.display_name),
            reason: format!("{field} '{raw}' is not a number"),
        })?;
        if !value.is_finite() || value.abs() > limit {
            return Err(SourceError::Malformed {
                context: format!("geocode candidate '{}'", candidate.display_name),
                reason: format!("{field} {value} out of range"),
            });
        }
        Ok(value)
    };

    let longitude = parse("lon", &candidate.lon, 180.0)?;
    let latitude = parse("lat", &candidate.lat, 90.0)?;
    Ok(RegionGeometry {
        display_name: candidate.display_name,
        longitude,
        latitude,
        geojson: candidate.geojson,
    })
}

/// Narrows the provider's regions to the crawl target and enriches them.
pub struct LocationEnricher<S, G> {
    geocode: GeocodeEnricher<S, G>,
    parent_woeid: i64,
}

impl<S: Store, G: Geocoder> LocationEnricher<S, G> {
    pub fn new(geocode: GeocodeEnricher<S, G>, parent_woeid: i64) -> Self {
        Self {
            geocode,
            parent_woeid,
        }
    }

    #[must_use]
    pub fn parent_woeid(&self) -> i64 {
        self.parent_woeid
    }

    #[must_use]
    pub fn is_target(&self, region: &Region) -> bool {
        region.parent_woeid == Some(self.parent_woeid)
    }

    /// Keeps only the regions whose parent is the crawl target.
    #[must_use]
    pub fn select(&self, regions: Vec<Region>) -> Vec<Region> {
        regions.into_iter().filter(|r| self.is_target(r)).collect()
    }

    /// Enriches `region` if it belongs to the crawl target.
    ///
    /// # Errors
    ///
    /// See [`GeocodeEnricher::enrich`].
    pub async fn enrich(
        &self,
        region: &Region,
        shutdown: &Shutdown,
    ) -> Result<EnrichOutcome, CrawlError> {
        if !self.is_target(region) {
            return Ok(EnrichOutcome::OutsideTarget);
        }
        self.geocode.enrich(region, shutdown).await
    }
}
