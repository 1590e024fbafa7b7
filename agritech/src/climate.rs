use crate::http::{apply_timeout, read_json, DEFAULT_PROVIDER_TIMEOUT};
use crate::resource::{FallbackPolicy, Fetcher, Resource};
use crate::simulate;
use crate::types::{ClimateData, Polygon};
use crate::{configured_key, Error};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.agromonitoring.com/agro/1.0";

/// Closed ring around a field west of central Paris, used when no polygon is given.
pub const DEFAULT_FIELD: [[f64; 2]; 5] = [
    [2.2769, 48.8589],
    [2.2769, 48.8719],
    [2.2969, 48.8719],
    [2.2969, 48.8589],
    [2.2769, 48.8589],
];

impl Polygon {
    #[must_use]
    pub fn default_field() -> Self {
        Self::new(DEFAULT_FIELD.to_vec())
    }
}

// Labels follow the French dashboard wording.
impl ClimateData {
    #[must_use]
    pub fn soil_moisture_category(&self) -> &'static str {
        match self.soil_moisture {
            m if m < 20.0 => "très sec",
            m if m < 35.0 => "sec",
            m if m < 50.0 => "modéré",
            m if m < 65.0 => "humide",
            _ => "très humide",
        }
    }

    #[must_use]
    pub fn ndvi_category(&self) -> &'static str {
        match self.ndvi {
            n if n < 0.2 => "faible végétation",
            n if n < 0.4 => "végétation modérée",
            n if n < 0.6 => "végétation saine",
            _ => "végétation abondante",
        }
    }

    #[must_use]
    pub fn precipitation_category(&self) -> &'static str {
        match self.precipitation {
            p if p < 5.0 => "négligeable",
            p if p < 10.0 => "légère",
            p if p < 20.0 => "modérée",
            _ => "importante",
        }
    }
}

/// Client for Agromonitoring-compatible polygon soil data.
pub struct ClimateClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct SoilRequest<'a> {
    polygon: &'a Polygon,
}

#[derive(Deserialize)]
struct SoilResponse {
    #[serde(default)]
    moisture: Option<f64>,
    #[serde(default)]
    ndvi: Option<f64>,
    #[serde(default)]
    precipitation: Option<f64>,
}

impl ClimateClient {
    /// Creates a client. A missing or placeholder key yields simulated data.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: configured_key(api_key),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Soil moisture, NDVI and precipitation for a field polygon.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or the response cannot be parsed.
    pub async fn climate(&self, polygon: &Polygon) -> Result<ClimateData, Error> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!("Agromonitoring API key is missing or a placeholder; using simulated climate data");
            return Ok(simulate::climate_now());
        };

        let request = self
            .client
            .post(format!("{}/soil", self.base_url.trim_end_matches('/')))
            .query(&[("polyid", "demo"), ("appid", api_key)])
            .json(&SoilRequest { polygon });
        let response = apply_timeout(request, self.timeout).send().await?;
        let raw: SoilResponse = read_json(response).await?;

        Ok(ClimateData {
            soil_moisture: raw.moisture.unwrap_or_default(),
            ndvi: raw.ndvi.unwrap_or_default(),
            precipitation: raw.precipitation.unwrap_or_default(),
            simulated: false,
        })
    }
}

#[async_trait]
impl Fetcher for ClimateClient {
    type Params = Polygon;
    type Output = ClimateData;

    fn name(&self) -> &'static str {
        "climate"
    }

    async fn fetch(&self, polygon: &Polygon) -> Result<ClimateData, Error> {
        self.climate(polygon).await
    }
}

/// Climate clears its data on failure and surfaces the message.
pub type ClimateResource = Resource<ClimateClient>;

impl ClimateResource {
    #[must_use]
    pub fn climate(client: ClimateClient) -> Self {
        Self::new(client, FallbackPolicy::ClearOnError)
    }
}
