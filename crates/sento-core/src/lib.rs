//! Shared domain records, configuration, and the seams between the crawl
//! engine and its collaborators (store, trend provider, geocoder).

pub mod app_config;
pub mod config;
pub mod model;
pub mod source;
pub mod store;

use thiserror::Error;

pub use app_config::{AppConfig, LogFormat, LogOutput};
pub use config::{load_app_config, load_app_config_from_env};
pub use model::{
    GeoCircle, GeocodeCandidate, Post, PostBatch, RawPost, Ranking, Region, RegionGeometry,
    RelevantTrend, SearchPage, SearchRequest, Trend,
};
pub use source::{Geocoder, PostSearch, SourceError, TrendSource};
pub use store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
