use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;

use crate::config::RuntimeConfig;
use crate::model::{ForecastSnapshot, SnapshotDecodeError, ValidationError};

pub mod open_meteo;

/// Raw HTTP outcome; bytes are kept even for non-success statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ProviderResponse {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

pub trait ProviderApi {
    fn get(&self, url: &str) -> Result<ProviderResponse, ProviderError>;

    fn fetch_forecast(&self, lat: f64, lon: f64) -> Result<ForecastSnapshot, ProviderError> {
        open_meteo::fetch_forecast(self, open_meteo::FORECAST_ENDPOINT, lat, lon)
    }
}

impl<P: ProviderApi + ?Sized> ProviderApi for &P {
    fn get(&self, url: &str) -> Result<ProviderResponse, ProviderError> {
        (**self).get(url)
    }

    fn fetch_forecast(&self, lat: f64, lon: f64) -> Result<ForecastSnapshot, ProviderError> {
        (**self).fetch_forecast(lat, lon)
    }
}

#[derive(Debug, Clone)]
pub struct HttpProviders {
    client: Client,
    endpoint: String,
}

impl HttpProviders {
    pub fn new(config: &RuntimeConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|error| ProviderError::Network(error.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.api_endpoint.clone(),
        })
    }
}

impl ProviderApi for HttpProviders {
    fn get(&self, url: &str) -> Result<ProviderResponse, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|error| ProviderError::Network(error.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|error| ProviderError::Network(error.to_string()))?;

        Ok(ProviderResponse {
            status,
            body: body.to_vec(),
        })
    }

    fn fetch_forecast(&self, lat: f64, lon: f64) -> Result<ForecastSnapshot, ProviderError> {
        open_meteo::fetch_forecast(self, &self.endpoint, lat, lon)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(#[from] ValidationError),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl ProviderError {
    pub fn is_user_error(&self) -> bool {
        matches!(self, ProviderError::InvalidCoordinates(_))
    }
}

impl From<SnapshotDecodeError> for ProviderError {
    fn from(value: SnapshotDecodeError) -> Self {
        ProviderError::Decode(value.to_string())
    }
}
