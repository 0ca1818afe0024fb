//! [`TrendSource`] and [`PostSearch`] over [`TwitterClient`].

use sento_core::{PostSearch, Region, SearchPage, SearchRequest, SourceError, Trend, TrendSource};

use crate::client::TwitterClient;

impl TrendSource for TwitterClient {
    async fn available_regions(&self) -> Result<Vec<Region>, SourceError> {
        Ok(self.trend_locations().await?)
    }

    async fn region_trends(&self, woeid: i64) -> Result<Vec<Trend>, SourceError> {
        Ok(self.place_trends(woeid).await?)
    }
}

impl PostSearch for TwitterClient {
    async fn search_posts(&self, request: &SearchRequest) -> Result<SearchPage, SourceError> {
        Ok(self.search(request).await?)
    }
}
