/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Where log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    /// A file under `log_dir`, rolled over at midnight UTC.
    DailyRotatingFile,
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_level: String,
    pub log_format: LogFormat,
    pub log_output: LogOutput,
    pub log_dir: String,
    pub twitter_consumer_key: String,
    pub twitter_consumer_secret: String,
    pub twitter_api_base_url: String,
    pub nominatim_base_url: String,
    pub search_woeid: i64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub geocoder_min_interval_ms: u64,
    pub trends_interval_secs: u64,
    pub posts_interval_secs: u64,
    pub empty_poll_secs: u64,
    pub relevant_window_hours: u64,
    pub posts_group_size: usize,
    pub search_page_size: u32,
    pub search_lang: String,
    pub search_min_radius_km: f64,
    pub search_max_pages: usize,
    pub persist_cursors: bool,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("log_output", &self.log_output)
            .field("log_dir", &self.log_dir)
            .field("database_url", &"[redacted]")
            .field("twitter_consumer_key", &"[redacted]")
            .field("twitter_consumer_secret", &"[redacted]")
            .field("twitter_api_base_url", &self.twitter_api_base_url)
            .field("nominatim_base_url", &self.nominatim_base_url)
            .field("search_woeid", &self.search_woeid)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("geocoder_min_interval_ms", &self.geocoder_min_interval_ms)
            .field("trends_interval_secs", &self.trends_interval_secs)
            .field("posts_interval_secs", &self.posts_interval_secs)
            .field("empty_poll_secs", &self.empty_poll_secs)
            .field("relevant_window_hours", &self.relevant_window_hours)
            .field("posts_group_size", &self.posts_group_size)
            .field("search_page_size", &self.search_page_size)
            .field("search_lang", &self.search_lang)
            .field("search_min_radius_km", &self.search_min_radius_km)
            .field("search_max_pages", &self.search_max_pages)
            .field("persist_cursors", &self.persist_cursors)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .finish()
    }
}
