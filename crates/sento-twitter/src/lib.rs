//! Twitter v1.1 API client: trend locations, trends per place, and post
//! search, with app-only bearer authentication.

pub mod client;
pub mod error;
pub mod normalize;
pub mod pagination;
mod source;
pub mod types;

pub use client::TwitterClient;
pub use error::TwitterError;
pub use pagination::extract_next_max_id;
