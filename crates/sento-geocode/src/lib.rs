//! Nominatim geocoding client used to attach geometry to trend regions.

pub mod client;
pub mod error;

pub use client::NominatimClient;
pub use error::GeocodeError;
