//! Reverse geocoding.
//!
//! One request per call: no retry, caching or rate limiting. The provider
//! speaks the Google Geocoding JSON shape: a `status` field, an optional
//! `error_message` and a `results` array whose first `formatted_address` is
//! the answer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Resolves coordinates to a human-readable address.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve `latitude`/`longitude` to an address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] when no credential is configured,
    /// [`Error::Remote`] when the provider reports a failure and
    /// [`Error::Network`] when the request cannot be completed.
    async fn resolve(&self, latitude: f64, longitude: f64) -> Result<String>;
}

/// Geocoder backed by the Google Geocoding HTTP API.
#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    client: Client,
    endpoint: String,
    language: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    formatted_address: Option<String>,
}

impl GoogleGeocoder {
    /// Create a geocoder.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        language: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(client_setup_error)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            language: language.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    /// Whether a credential is available.
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn resolve(&self, latitude: f64, longitude: f64) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or(Error::MissingCredential)?;
        let latlng = format!("{latitude},{longitude}");

        debug!("Reverse geocoding {}", latlng);
        let response: GeocodeResponse = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("latlng", latlng.as_str()),
                ("language", self.language.as_str()),
                ("key", api_key),
            ])
            .send()
            .await?
            .json()
            .await?;

        address_from_response(response)
    }
}

/// A client that cannot be built is a local fault, not a transport one.
fn client_setup_error(err: reqwest::Error) -> Error {
    Error::internal(format!("building HTTP client: {err}"))
}

fn address_from_response(response: GeocodeResponse) -> Result<String> {
    if response.status != "OK" {
        let message = response
            .error_message
            .unwrap_or_else(|| response.status.clone());
        return Err(Error::remote(response.status, message));
    }

    response
        .results
        .into_iter()
        .next()
        .and_then(|result| result.formatted_address)
        .ok_or_else(|| Error::remote("ZERO_RESULTS", "no address found for these coordinates"))
}
