//! Remote city → country lookup
//!
//! `NominatimGeocoder` issues a single best-match search per call:
//!
//! ```text
//! GET {base_url}?q=<city>&format=json&addressdetails=1&limit=1&accept-language=en
//! User-Agent: <identifying agent>
//! ```
//!
//! The response is a JSON array; only `[0].address.country` is read.
//! Rate limiting is the caller's job (see `LocationResolver`).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{GeocodeError, GeocodeResult};
use crate::utils::constants::{
    DEFAULT_GEOCODER_TIMEOUT, DEFAULT_GEOCODER_URL, DEFAULT_GEOCODER_USER_AGENT,
};

/// Remote geocoding capability
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Country name for `city`, `Ok(None)` when the service knows nothing.
    async fn country_for(&self, city: &str) -> GeocodeResult<Option<String>>;
}

/// Connection settings for the geocoding service
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GeocoderSettings {
    pub base_url: String,
    pub user_agent: String,
    #[serde(with = "crate::config::duration_secs")]
    pub timeout: Duration,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEOCODER_URL.to_string(),
            user_agent: DEFAULT_GEOCODER_USER_AGENT.to_string(),
            timeout: DEFAULT_GEOCODER_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    address: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct Address {
    #[serde(default)]
    country: Option<String>,
}

/// OpenStreetMap Nominatim client
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(settings: &GeocoderSettings) -> GeocodeResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn country_for(&self, city: &str) -> GeocodeResult<Option<String>> {
        debug!(target: "job_harvest::location", "Geocoding '{city}'");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", city),
                ("format", "json"),
                ("addressdetails", "1"),
                ("limit", "1"),
                ("accept-language", "en"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let hits: Vec<SearchHit> =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Decode(e.to_string()))?;

        Ok(hits
            .into_iter()
            .next()
            .and_then(|hit| hit.address)
            .and_then(|address| address.country)
            .map(|country| country.trim().to_string())
            .filter(|country| !country.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn settings_for(server: &mockito::Server) -> GeocoderSettings {
        GeocoderSettings {
            base_url: format!("{}/search", server.url()),
            user_agent: "job-harvest-tests/1.0".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn reads_first_result_country() -> anyhow::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "Graz".into()),
                Matcher::UrlEncoded("format".into(), "json".into()),
                Matcher::UrlEncoded("addressdetails".into(), "1".into()),
                Matcher::UrlEncoded("limit".into(), "1".into()),
                Matcher::UrlEncoded("accept-language".into(), "en".into()),
            ]))
            .match_header("user-agent", "job-harvest-tests/1.0")
            .with_status(200)
            .with_body(
                r#"[{"display_name":"Graz, Styria, Austria","address":{"city":"Graz","country":"Austria"}},
                    {"address":{"country":"United States"}}]"#,
            )
            .create_async()
            .await;

        let geocoder = NominatimGeocoder::new(&settings_for(&server))?;
        assert_eq!(geocoder.country_for("Graz").await?, Some("Austria".to_string()));
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn empty_array_is_no_country() -> anyhow::Result<()> {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let geocoder = NominatimGeocoder::new(&settings_for(&server))?;
        assert_eq!(geocoder.country_for("Atlantis").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn missing_address_is_no_country() -> anyhow::Result<()> {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"display_name":"Somewhere"}]"#)
            .create_async()
            .await;

        let geocoder = NominatimGeocoder::new(&settings_for(&server))?;
        assert_eq!(geocoder.country_for("Somewhere").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn non_success_status_is_error() -> anyhow::Result<()> {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let geocoder = NominatimGeocoder::new(&settings_for(&server))?;
        let err = geocoder.country_for("Paris").await.unwrap_err();
        assert!(matches!(err, GeocodeError::Status(429)));
        Ok(())
    }
}
