//! In-memory fakes for the store and the upstream seams.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sento_core::{
    GeocodeCandidate, Geocoder, Post, PostSearch, RawPost, Ranking, Region, RegionGeometry,
    RelevantTrend, SearchPage, SearchRequest, SourceError, Store, StoreError, Trend, TrendSource,
};

pub fn barcelona() -> Region {
    region(753_692, "Barcelona", Some(23_424_950))
}

pub fn region(woeid: i64, name: &str, parent_woeid: Option<i64>) -> Region {
    Region {
        woeid,
        name: name.to_owned(),
        country: "Spain".to_owned(),
        parent_woeid,
    }
}

pub fn trend(name: &str) -> Trend {
    Trend {
        name: name.to_owned(),
        query: name.to_owned(),
        url: None,
        tweet_volume: Some(12_000),
    }
}

pub fn candidate(lon: &str, lat: &str, display_name: &str) -> GeocodeCandidate {
    GeocodeCandidate {
        display_name: display_name.to_owned(),
        lon: lon.to_owned(),
        lat: lat.to_owned(),
        geojson: None,
    }
}

/// A relevant trend whose search query equals its id.
pub fn relevant(trend_id: &str, woeid: i64) -> RelevantTrend {
    RelevantTrend {
        trend_id: trend_id.to_owned(),
        query: trend_id.to_owned(),
        woeid,
        region_name: "Barcelona".to_owned(),
        latitude: 41.38,
        longitude: 2.17,
        radius_km: 12.5,
    }
}

/// A search page of posts with the given ids; every text carries a link.
pub fn page(ids: &[i64], next_max_id: Option<i64>) -> SearchPage {
    let created_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_else(Utc::now);
    SearchPage {
        posts: ids
            .iter()
            .map(|&id| RawPost {
                id,
                created_at,
                text: format!("post {id} https://t.co/x{id}"),
            })
            .collect(),
        next_max_id,
    }
}

#[derive(Default)]
pub struct MemoryStore {
    regions: Mutex<HashMap<i64, (Region, Option<RegionGeometry>)>>,
    trends: Mutex<HashMap<String, Trend>>,
    rankings: Mutex<Vec<Ranking>>,
    relevant: Mutex<VecDeque<Vec<RelevantTrend>>>,
    posts: Mutex<Vec<(String, i64, Post)>>,
    cursors: Mutex<HashMap<(String, i64), i64>>,
    pub relevant_calls: AtomicUsize,
    pub bulk_insert_calls: AtomicUsize,
}

impl MemoryStore {
    /// Scripts successive `relevant_trends` answers. The last one repeats.
    pub fn script_relevant(&self, answers: Vec<Vec<RelevantTrend>>) {
        *self.relevant.lock().unwrap() = answers.into();
    }

    pub fn region(&self, woeid: i64) -> Option<Region> {
        self.regions
            .lock()
            .unwrap()
            .get(&woeid)
            .map(|(region, _)| region.clone())
    }

    pub fn region_geometry(&self, woeid: i64) -> Option<RegionGeometry> {
        self.regions
            .lock()
            .unwrap()
            .get(&woeid)
            .and_then(|(_, geometry)| geometry.clone())
    }

    pub fn trend_count(&self) -> usize {
        self.trends.lock().unwrap().len()
    }

    pub fn rankings(&self) -> Vec<Ranking> {
        self.rankings.lock().unwrap().clone()
    }

    pub fn posts_for(&self, trend_id: &str, woeid: i64) -> Vec<Post> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, w, _)| t == trend_id && *w == woeid)
            .map(|(_, _, post)| post.clone())
            .collect()
    }

    pub fn cursor(&self, trend_id: &str, woeid: i64) -> Option<i64> {
        self.cursors
            .lock()
            .unwrap()
            .get(&(trend_id.to_owned(), woeid))
            .copied()
    }

    pub fn set_cursor(&self, trend_id: &str, woeid: i64, since_id: i64) {
        self.cursors
            .lock()
            .unwrap()
            .insert((trend_id.to_owned(), woeid), since_id);
    }
}

impl Store for MemoryStore {
    async fn record_region(&self, region: &Region) -> Result<bool, StoreError> {
        let mut regions = self.regions.lock().unwrap();
        if regions.contains_key(&region.woeid) {
            return Ok(false);
        }
        regions.insert(region.woeid, (region.clone(), None));
        Ok(true)
    }

    async fn region_exists(&self, woeid: i64) -> Result<bool, StoreError> {
        Ok(self.region_geometry(woeid).is_some())
    }

    async fn upsert_region(
        &self,
        region: &Region,
        geometry: &RegionGeometry,
    ) -> Result<bool, StoreError> {
        let mut regions = self.regions.lock().unwrap();
        let entry = regions.entry(region.woeid).or_insert_with(|| (region.clone(), None));
        if entry.1.is_some() {
            return Ok(false);
        }
        entry.1 = Some(geometry.clone());
        Ok(true)
    }

    async fn upsert_trend(&self, trend: &Trend) -> Result<(), StoreError> {
        self.trends
            .lock()
            .unwrap()
            .entry(trend.name.clone())
            .and_modify(|stored| {
                if trend.tweet_volume.is_some() {
                    stored.tweet_volume = trend.tweet_volume;
                }
            })
            .or_insert_with(|| trend.clone());
        Ok(())
    }

    async fn append_rankings(&self, rankings: &[Ranking]) -> Result<(), StoreError> {
        self.rankings.lock().unwrap().extend_from_slice(rankings);
        Ok(())
    }

    async fn relevant_trends(&self, _window: Duration) -> Result<Vec<RelevantTrend>, StoreError> {
        self.relevant_calls.fetch_add(1, Ordering::SeqCst);
        let mut scripted = self.relevant.lock().unwrap();
        if scripted.len() > 1 {
            return Ok(scripted.pop_front().unwrap_or_default());
        }
        Ok(scripted.front().cloned().unwrap_or_default())
    }

    async fn bulk_insert_posts(
        &self,
        posts: &[Post],
        trend_id: &str,
        woeid: i64,
    ) -> Result<u64, StoreError> {
        self.bulk_insert_calls.fetch_add(1, Ordering::SeqCst);
        let mut stored = self.posts.lock().unwrap();
        let existing: HashSet<i64> = stored
            .iter()
            .filter(|(t, w, _)| t == trend_id && *w == woeid)
            .map(|(_, _, post)| post.id)
            .collect();
        let mut written = 0;
        for post in posts.iter().filter(|p| !existing.contains(&p.id)) {
            stored.push((trend_id.to_owned(), woeid, post.clone()));
            written += 1;
        }
        Ok(written)
    }

    async fn load_cursor(&self, trend_id: &str, woeid: i64) -> Result<Option<i64>, StoreError> {
        Ok(self.cursor(trend_id, woeid))
    }

    async fn save_cursor(&self, trend_id: &str, woeid: i64, since_id: i64) -> Result<(), StoreError> {
        self.cursors
            .lock()
            .unwrap()
            .entry((trend_id.to_owned(), woeid))
            .and_modify(|current| *current = (*current).max(since_id))
            .or_insert(since_id);
        Ok(())
    }
}

pub enum ScriptedPage {
    Page(SearchPage),
    /// A rejected request; not retried.
    Fail,
    /// A timeout or 5xx; retried under the policy.
    Transient,
}

#[derive(Default)]
pub struct StubProvider {
    regions: Vec<Region>,
    trends: HashMap<i64, Vec<Trend>>,
    failing_regions: HashSet<i64>,
    fail_region_list: bool,
    pages: Mutex<HashMap<String, VecDeque<ScriptedPage>>>,
    requests: Mutex<Vec<SearchRequest>>,
    trend_requests: Mutex<Vec<i64>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub region_list_calls: AtomicUsize,
}

impl StubProvider {
    pub fn with_regions(mut self, regions: Vec<Region>) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_trends(mut self, woeid: i64, trends: Vec<Trend>) -> Self {
        self.trends.insert(woeid, trends);
        self
    }

    pub fn failing_region(mut self, woeid: i64) -> Self {
        self.failing_regions.insert(woeid);
        self
    }

    pub fn failing_region_list(mut self) -> Self {
        self.fail_region_list = true;
        self
    }

    /// Pages served in order for `query`; an empty page once they run out.
    pub fn with_pages(self, query: &str, pages: Vec<ScriptedPage>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(query.to_owned(), pages.into());
        self
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn trend_requests(&self) -> Vec<i64> {
        self.trend_requests.lock().unwrap().clone()
    }
}

impl TrendSource for StubProvider {
    async fn available_regions(&self) -> Result<Vec<Region>, SourceError> {
        self.region_list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_region_list {
            return Err(SourceError::Transient("trends/available timed out".to_owned()));
        }
        Ok(self.regions.clone())
    }

    async fn region_trends(&self, woeid: i64) -> Result<Vec<Trend>, SourceError> {
        self.trend_requests.lock().unwrap().push(woeid);
        if self.failing_regions.contains(&woeid) {
            return Err(SourceError::Rejected(format!("trends/place {woeid}")));
        }
        Ok(self.trends.get(&woeid).cloned().unwrap_or_default())
    }
}

impl PostSearch for StubProvider {
    async fn search_posts(&self, request: &SearchRequest) -> Result<SearchPage, SourceError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let next = self
            .pages
            .lock()
            .unwrap()
            .get_mut(&request.query)
            .and_then(VecDeque::pop_front);
        match next {
            Some(ScriptedPage::Page(page)) => Ok(page),
            Some(ScriptedPage::Fail) => Err(SourceError::Rejected(format!("search {}", request.query))),
            Some(ScriptedPage::Transient) => {
                Err(SourceError::Transient(format!("search {} timed out", request.query)))
            }
            None => Ok(SearchPage::default()),
        }
    }
}

#[derive(Default)]
pub struct StubGeocoder {
    candidates: HashMap<String, Vec<GeocodeCandidate>>,
    pub calls: AtomicUsize,
}

impl StubGeocoder {
    pub fn with(mut self, city: &str, candidates: Vec<GeocodeCandidate>) -> Self {
        self.candidates.insert(city.to_owned(), candidates);
        self
    }
}

impl Geocoder for StubGeocoder {
    async fn lookup(&self, city: &str, _country: &str) -> Result<Vec<GeocodeCandidate>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.candidates.get(city).cloned().unwrap_or_default())
    }
}
