use bytes::Bytes;
use prost::Message;
use reqwest::header::{ACCEPT, AUTHORIZATION};

use crate::error::{Error, Result};
use crate::gtfs_realtime::FeedMessage;

/// Scheme token the Transport for NSW API expects in front of the key.
const AUTH_SCHEME: &str = "apikey";

/// GTFS-RT API client for the vehicle-position feed
pub struct FeedClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl FeedClient {
    /// Create a new client for `url`, authenticating with `api_key`
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            url: url.into(),
            api_key: api_key.into(),
        })
    }

    /// Fetch the raw feed body
    pub async fn fetch(&self) -> Result<Bytes> {
        tracing::debug!(url = %self.url, "Fetching vehicle positions");

        let response = self
            .client
            .get(&self.url)
            .header(AUTHORIZATION, format!("{} {}", AUTH_SCHEME, self.api_key))
            .header(ACCEPT, "application/x-google-protobuf")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::FeedStatus(response.status()));
        }

        let bytes = response.bytes().await?;

        tracing::info!(bytes = bytes.len(), "Received data from API");
        Ok(bytes)
    }
}

/// Parse a GTFS-RT payload into a [`FeedMessage`]
pub fn decode_feed(data: &[u8]) -> Result<FeedMessage> {
    let feed = FeedMessage::decode(data)?;

    let feed_time = feed
        .header
        .timestamp
        .and_then(|t| i64::try_from(t).ok())
        .and_then(|t| chrono::DateTime::<chrono::Utc>::from_timestamp(t, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    tracing::info!(
        entities = feed.entity.len(),
        version = %feed.header.gtfs_realtime_version,
        feed_time = %feed_time,
        "Decoded protobuf feed"
    );
    Ok(feed)
}
