//! HTTP client for the Strava segment API with rate limiting.
//!
//! This module provides:
//! - OAuth helpers (authorize URL, code exchange, token refresh)
//! - Segment explore queries around a point
//! - Segment detail fetches backed by the [`SegmentCache`]
//! - Route-wide discovery of segments that overlap an uploaded track
//!
//! Calls are spaced by a minimum pause and capped per 15-minute window. A
//! 429 response is retried once after its `Retry-After` delay (30 s when
//! absent); a second 429 is returned as an HTTP error.

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::Settings;
use crate::error::{ClimbError, Result};
use crate::geo_utils::explore_bounds;
use crate::gpx::ParsedRoute;
use crate::sampling::sample_indices_along_distance;
use crate::segments::cache::SegmentCache;
use crate::segments::{match_segments, Segment, SegmentMatch};
use crate::GpsPoint;

pub const STRAVA_API_BASE: &str = "https://www.strava.com/api/v3";
pub const STRAVA_AUTHORIZE_URL: &str = "https://www.strava.com/oauth/authorize";
pub const STRAVA_TOKEN_URL: &str = "https://www.strava.com/oauth/token";

// API rate limits
const WINDOW_LIMIT: usize = 100; // Max requests per window
const WINDOW_MS: u64 = 900_000; // 15 minute window
const DEFAULT_RETRY_AFTER_S: u64 = 30;

// Concurrency for segment detail fetches
const MAX_CONCURRENCY: usize = 4;

/// OAuth token grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds
    pub expires_at: i64,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// API response for the segment explore endpoint
#[derive(Debug, Default, Deserialize)]
struct ExploreResponse {
    #[serde(default)]
    segments: Vec<Segment>,
}

/// Delay requested by a 429 response.
pub fn retry_after(headers: &HeaderMap) -> Duration {
    let seconds = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_S);
    Duration::from_secs(seconds)
}

/// Rate limiter using sliding window plus a minimum gap between requests
struct RateLimiter {
    min_interval: Duration,
    request_times: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            request_times: Mutex::new(VecDeque::with_capacity(WINDOW_LIMIT + 1)),
        }
    }

    async fn wait_if_needed(&self) {
        loop {
            let wait_time = {
                let mut times = self.request_times.lock().await;
                let now = Instant::now();

                // Prune old requests outside window
                let window = Duration::from_millis(WINDOW_MS);
                while times
                    .front()
                    .map_or(false, |&t| now.duration_since(t) >= window)
                {
                    times.pop_front();
                }

                if times.len() >= WINDOW_LIMIT {
                    times
                        .front()
                        .map(|&oldest| (oldest + window).saturating_duration_since(now))
                } else {
                    times
                        .back()
                        .map(|&last| (last + self.min_interval).saturating_duration_since(now))
                        .filter(|d| !d.is_zero())
                }
            };

            match wait_time {
                Some(duration) if !duration.is_zero() => {
                    debug!("Rate limit: waiting {:?}", duration);
                    tokio::time::sleep(duration).await;
                }
                _ => break,
            }
        }
    }

    async fn record_request(&self) {
        let mut times = self.request_times.lock().await;
        times.push_back(Instant::now());
    }
}

/// Authorization URL for the OAuth code flow.
pub fn authorize_url(settings: &Settings) -> Result<String> {
    let url = Url::parse_with_params(
        STRAVA_AUTHORIZE_URL,
        &[
            ("client_id", settings.strava_client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", settings.strava_redirect_uri.as_str()),
            ("approval_prompt", "auto"),
            ("scope", "read"),
        ],
    )
    .map_err(|e| ClimbError::ConfigError {
        message: format!("invalid authorize URL: {}", e),
    })?;
    Ok(url.to_string())
}

async fn post_token(client: &Client, form: &[(&str, &str)]) -> Result<TokenResponse> {
    let resp = client.post(STRAVA_TOKEN_URL).form(form).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClimbError::HttpError {
            message: format!("token request failed: {}", body),
            status_code: Some(status.as_u16()),
        });
    }
    Ok(resp.json::<TokenResponse>().await?)
}

/// Exchange an authorization code for tokens.
pub async fn exchange_token(settings: &Settings, code: &str) -> Result<TokenResponse> {
    let client = build_client()?;
    post_token(
        &client,
        &[
            ("client_id", settings.strava_client_id.as_str()),
            ("client_secret", settings.strava_client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ],
    )
    .await
}

/// Refresh an expired access token.
pub async fn refresh_token(settings: &Settings, refresh_token: &str) -> Result<TokenResponse> {
    let client = build_client()?;
    post_token(
        &client,
        &[
            ("client_id", settings.strava_client_id.as_str()),
            ("client_secret", settings.strava_client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ],
    )
    .await
}

fn build_client() -> Result<Client> {
    Client::builder()
        .pool_max_idle_per_host(MAX_CONCURRENCY)
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| ClimbError::HttpError {
            message: format!("Failed to create HTTP client: {}", e),
            status_code: None,
        })
}

/// Track points at which explore queries are issued.
pub fn explore_points(route: &ParsedRoute, sample_interval_m: f64) -> Vec<GpsPoint> {
    let gps = route.gps_points();
    sample_indices_along_distance(&route.distance_m(), sample_interval_m)
        .into_iter()
        .filter_map(|i| gps.get(i).copied())
        .collect()
}

/// Segment API client with rate limiting and a segment cache
pub struct SegmentClient {
    client: Client,
    access_token: String,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
    cache: Mutex<SegmentCache>,
}

impl SegmentClient {
    /// Create a client for `access_token`, pausing `settings.pause_between_calls_s` between calls.
    pub fn new(access_token: &str, cache: SegmentCache, settings: &Settings) -> Result<Self> {
        let pause = Duration::from_secs_f64(settings.pause_between_calls_s.max(0.0));
        Ok(Self {
            client: build_client()?,
            access_token: access_token.to_string(),
            base_url: STRAVA_API_BASE.to_string(),
            rate_limiter: Arc::new(RateLimiter::new(pause)),
            cache: Mutex::new(cache),
        })
    }

    /// Point the client at another API root.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut retried = false;

        loop {
            self.rate_limiter.wait_if_needed().await;

            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(query)
                .send()
                .await;

            self.rate_limiter.record_request().await;
            let resp = resp?;
            let status = resp.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if retried {
                    return Err(ClimbError::HttpError {
                        message: format!("rate limited on {}", path),
                        status_code: Some(status.as_u16()),
                    });
                }
                let wait = retry_after(resp.headers());
                warn!("[SegmentClient] 429 for {}, retrying after {:?}", path, wait);
                tokio::time::sleep(wait).await;
                retried = true;
                continue;
            }

            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ClimbError::HttpError {
                    message: format!("GET {} failed: {}", path, body),
                    status_code: Some(status.as_u16()),
                });
            }

            return Ok(resp.json::<T>().await?);
        }
    }

    /// Riding segments inside a square box of half-size `radius_m` around a point.
    pub async fn explore_segments(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: f64,
    ) -> Result<Vec<Segment>> {
        let bounds = explore_bounds(latitude, longitude, radius_m);
        let response: ExploreResponse = self
            .get_json(
                "/segments/explore",
                &[
                    ("bounds", bounds.to_query_value()),
                    ("activity_type", "riding".to_string()),
                ],
            )
            .await?;
        debug!(
            "[SegmentClient] Explore at ({:.5}, {:.5}) returned {} segments",
            latitude,
            longitude,
            response.segments.len()
        );
        Ok(response.segments)
    }

    /// Segment details, from the cache when present.
    pub async fn fetch_segment(&self, id: u64) -> Result<Segment> {
        if let Some(hit) = self.cache.lock().await.lookup(id)? {
            debug!("[SegmentClient] Cache hit for segment {}", id);
            return Ok(hit.segment);
        }

        let segment: Segment = self.get_json(&format!("/segments/{}", id), &[]).await?;
        self.cache.lock().await.store(&segment)?;
        Ok(segment)
    }

    /// Explore along the route, fetch every segment found and keep those that overlap it.
    pub async fn discover_matching_segments(
        &self,
        route: &ParsedRoute,
        settings: &Settings,
    ) -> Result<Vec<SegmentMatch>> {
        let samples = explore_points(route, settings.sample_interval_m);
        info!(
            "[SegmentClient] Exploring {} points along {:.1} km",
            samples.len(),
            route.distance_km.last().copied().unwrap_or(0.0)
        );

        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for point in &samples {
            let found = match self
                .explore_segments(point.latitude, point.longitude, settings.explore_radius_m)
                .await
            {
                Ok(found) => found,
                Err(e @ ClimbError::HttpError { status_code: Some(429), .. }) => return Err(e),
                Err(e) => {
                    warn!("[SegmentClient] Explore failed: {}", e);
                    continue;
                }
            };
            for segment in found {
                if seen.insert(segment.id) {
                    ids.push(segment.id);
                }
            }
        }

        let fetched: Vec<(u64, Result<Segment>)> = stream::iter(ids)
            .map(|id| async move { (id, self.fetch_segment(id).await) })
            .buffer_unordered(MAX_CONCURRENCY)
            .collect()
            .await;

        let mut segments = Vec::with_capacity(fetched.len());
        for (id, result) in fetched {
            match result {
                Ok(segment) => segments.push(segment),
                Err(e) => warn!("[SegmentClient] Segment {} not fetched: {}", id, e),
            }
        }

        let matches = match_segments(&segments, &route.gps_points(), &settings.match_config());
        info!(
            "[SegmentClient] {} of {} segments match the route",
            matches.len(),
            segments.len()
        );
        Ok(matches)
    }
}
