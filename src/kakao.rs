//! Kakao Local API client: address search and TM → WGS84 transcoding.
//!
//! Both endpoints answer with `{"documents": [{"x": .., "y": ..}, ..]}`. The
//! address endpoint sends x/y as strings, the transcoding one as numbers.

use crate::config::GeocodingConfig;
use crate::error::{Error, Result};
use crate::types::{GeoPoint, GridPoint};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const ADDRESS_PATH: &str = "/v2/local/search/address.json";
const TRANSCODE_PATH: &str = "/v2/local/geo/transcoord.json";

/// Remote collaborators used by the coordinate normalizer. Any `Err` is a
/// soft failure; callers fall back instead of propagating it.
#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// First result of a free-text address search.
    async fn search_address(&self, query: &str) -> Result<GeoPoint>;

    /// Convert one TM grid point to WGS84.
    async fn transcode(&self, grid: GridPoint) -> Result<GeoPoint>;
}

#[derive(Debug, Deserialize)]
struct DocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
}

#[derive(Debug, Deserialize)]
struct Document {
    x: NumOrText,
    y: NumOrText,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumOrText {
    Num(f64),
    Text(String),
}

impl NumOrText {
    fn value(&self) -> Option<f64> {
        match self {
            NumOrText::Num(v) => Some(*v),
            NumOrText::Text(s) => s.trim().parse().ok(),
        }
    }
}

fn first_point(resp: DocumentsResponse, what: &str) -> Result<GeoPoint> {
    let doc = resp
        .documents
        .first()
        .ok_or_else(|| Error::RemoteLookup(format!("no documents for {what}")))?;
    match (doc.x.value(), doc.y.value()) {
        (Some(x), Some(y)) => Ok(GeoPoint::new(x, y)),
        _ => Err(Error::RemoteLookup(format!("non-numeric x/y for {what}"))),
    }
}

#[derive(Debug, Clone)]
pub struct KakaoClient {
    client: reqwest::Client,
    base_url: String,
    rest_api_key: String,
}

impl KakaoClient {
    pub fn new(cfg: &GeocodingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fire_report/0.1")
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            rest_api_key: cfg.rest_api_key.clone(),
        })
    }

    async fn get_documents(&self, path: &str, query: &[(&str, String)], what: &str) -> Result<GeoPoint> {
        if self.rest_api_key.is_empty() {
            return Err(Error::RemoteLookup("REST API key is not configured".into()));
        }
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} ({})", url, what);

        let resp = self
            .client
            .get(&url)
            .header("Authorization", format!("KakaoAK {}", self.rest_api_key))
            .query(query)
            .send()
            .await
            .map_err(|e| Error::RemoteLookup(format!("HTTP error for {what}: {e}")))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::RemoteLookup(format!(
                "Kakao returned {} for {}: {}",
                status,
                what,
                body.chars().take(200).collect::<String>()
            )));
        }

        let payload: DocumentsResponse = resp
            .json()
            .await
            .map_err(|e| Error::RemoteLookup(format!("JSON parse error for {what}: {e}")))?;
        first_point(payload, what)
    }
}

#[async_trait]
impl GeoLookup for KakaoClient {
    async fn search_address(&self, query: &str) -> Result<GeoPoint> {
        self.get_documents(ADDRESS_PATH, &[("query", query.to_string())], query)
            .await
    }

    async fn transcode(&self, grid: GridPoint) -> Result<GeoPoint> {
        let what = format!("TM({}, {})", grid.x, grid.y);
        let query = [
            ("x", grid.x.to_string()),
            ("y", grid.y.to_string()),
            ("input_coord", "TM".to_string()),
            ("output_coord", "WGS84".to_string()),
        ];
        self.get_documents(TRANSCODE_PATH, &query, &what).await
    }
}
