use crate::cache::TtlCache;
use crate::http::{apply_timeout, read_json, HttpClient, DEFAULT_PROVIDER_TIMEOUT};
use crate::resource::{FallbackPolicy, Fetcher, Resource};
use crate::types::{AirQualityData, AqiCategory, Coordinates, Pollutants};
use crate::{configured_key, Error};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const AIRVISUAL_BASE_URL: &str = "https://api.airvisual.com/v2";

const CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// WHO guideline values used to pick the dominant pollutant.
const WHO_THRESHOLDS: [(&str, f64); 6] = [
    ("pm2.5", 10.0),
    ("pm10", 20.0),
    ("o3", 100.0),
    ("no2", 40.0),
    ("so2", 40.0),
    ("co", 4000.0),
];

impl AqiCategory {
    #[must_use]
    pub const fn from_aqi(aqi: u32) -> Self {
        match aqi {
            0..=50 => Self::Good,
            51..=100 => Self::Moderate,
            101..=150 => Self::UnhealthyForSensitiveGroups,
            151..=200 => Self::Unhealthy,
            201..=300 => Self::VeryUnhealthy,
            _ => Self::Hazardous,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            Self::Unhealthy => "Unhealthy",
            Self::VeryUnhealthy => "Very Unhealthy",
            Self::Hazardous => "Hazardous",
        }
    }

    #[must_use]
    pub const fn health_implications(self) -> &'static str {
        match self {
            Self::Good => "Air quality is satisfactory and air pollution poses little or no risk.",
            Self::Moderate => "Air quality is acceptable. Some pollutants may be a concern for a very small number of people who are unusually sensitive to air pollution.",
            Self::UnhealthyForSensitiveGroups => "Members of sensitive groups may experience health effects. The general public is not likely to be affected.",
            Self::Unhealthy => "Some members of the general public may experience health effects; members of sensitive groups may experience more serious effects.",
            Self::VeryUnhealthy => "Health warnings of emergency conditions. The entire population is more likely to be affected.",
            Self::Hazardous => "Health alert: everyone may experience more serious health effects.",
        }
    }

    #[must_use]
    pub const fn recommendations(self) -> &'static str {
        match self {
            Self::Good => "Ideal conditions for outdoor activities.",
            Self::Moderate => "Unusually sensitive people should consider limiting prolonged outdoor exertion.",
            Self::UnhealthyForSensitiveGroups => "Children, older adults and people with respiratory or heart disease should limit prolonged outdoor exertion.",
            Self::Unhealthy => "Children, older adults and people with respiratory or heart disease should avoid outdoor activity; everyone else should limit prolonged exertion.",
            Self::VeryUnhealthy => "Children, older adults and people with respiratory or heart disease should avoid all outdoor activity; everyone else should avoid outdoor exertion.",
            Self::Hazardous => "Everyone should avoid all outdoor activity.",
        }
    }
}

/// Maps the OpenWeather 1-5 index onto the US AQI scale.
#[must_use]
pub const fn openweather_to_us_aqi(index: u8) -> u32 {
    match index {
        1 => 25,
        2 => 75,
        3 => 125,
        4 => 200,
        5 => 300,
        _ => 150,
    }
}

/// Pollutant whose concentration is furthest above its WHO threshold.
#[must_use]
pub fn main_pollutant(components: &Components) -> &'static str {
    let values = [
        components.pm2_5,
        components.pm10,
        components.o3,
        components.no2,
        components.so2,
        components.co,
    ];
    let mut best = ("pm2.5", 0.0);
    for ((name, threshold), value) in WHO_THRESHOLDS.iter().zip(values) {
        let ratio = value / threshold;
        if ratio > best.1 {
            best = (name, ratio);
        }
    }
    best.0
}

/// Record for an OpenWeather 1-5 index and its raw components.
fn from_openweather_index(index: u8, components: &Components) -> AirQualityData {
    let pollutants = Pollutants {
        pm25: components.pm2_5,
        pm10: components.pm10,
        o3: components.o3,
        no2: components.no2,
        so2: components.so2,
        co: components.co / 1000.0,
    };
    build(
        openweather_to_us_aqi(index),
        main_pollutant(components).to_string(),
        pollutants,
    )
}

fn build(aqi: u32, main_pollutant: String, pollutants: Pollutants) -> AirQualityData {
    let category = AqiCategory::from_aqi(aqi);
    AirQualityData {
        aqi,
        main_pollutant,
        category,
        pollutants,
        health_implications: category.health_implications().to_string(),
        recommendations: category.recommendations().to_string(),
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// OpenWeather `air_pollution` components, all in µg/m³.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub co: f64,
    #[serde(default)]
    pub no2: f64,
    #[serde(default)]
    pub o3: f64,
    #[serde(default)]
    pub so2: f64,
    #[serde(default)]
    pub pm2_5: f64,
    #[serde(default)]
    pub pm10: f64,
}

#[derive(Deserialize)]
struct PollutionResponse {
    #[serde(default)]
    list: Vec<PollutionEntry>,
}

#[derive(Deserialize)]
struct PollutionEntry {
    main: PollutionIndex,
    components: Components,
}

#[derive(Deserialize)]
struct PollutionIndex {
    aqi: u8,
}

#[derive(Deserialize)]
struct NearestCity {
    current: NearestCityCurrent,
}

#[derive(Deserialize)]
struct NearestCityCurrent {
    pollution: AirVisualPollution,
}

#[derive(Deserialize)]
struct AirVisualPollution {
    aqius: u32,
    #[serde(default)]
    mainus: Option<String>,
    #[serde(default)]
    aqicn: Option<u32>,
}

/// The dashboard backend relays OpenWeather and may send `null` components.
#[derive(Deserialize)]
struct BackendAirQuality {
    aqi: u8,
    #[serde(default)]
    components: BackendComponents,
}

#[derive(Default, Deserialize)]
struct BackendComponents {
    co: Option<f64>,
    no2: Option<f64>,
    o3: Option<f64>,
    so2: Option<f64>,
    pm2_5: Option<f64>,
    pm10: Option<f64>,
}

impl From<BackendComponents> for Components {
    fn from(raw: BackendComponents) -> Self {
        Self {
            co: raw.co.unwrap_or_default(),
            no2: raw.no2.unwrap_or_default(),
            o3: raw.o3.unwrap_or_default(),
            so2: raw.so2.unwrap_or_default(),
            pm2_5: raw.pm2_5.unwrap_or_default(),
            pm10: raw.pm10.unwrap_or_default(),
        }
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// Air quality from OpenWeather, with AirVisual as a second source.
pub struct AirQualityClient {
    client: Client,
    openweather_key: Option<String>,
    openweather_base_url: String,
    airvisual_key: Option<String>,
    airvisual_base_url: String,
    timeout: Duration,
    cache: TtlCache<AirQualityData>,
}

impl AirQualityClient {
    #[must_use]
    pub fn new(openweather_key: Option<String>, airvisual_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            openweather_key: configured_key(openweather_key),
            openweather_base_url: OPENWEATHER_BASE_URL.to_string(),
            airvisual_key: configured_key(airvisual_key),
            airvisual_base_url: AIRVISUAL_BASE_URL.to_string(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
            cache: TtlCache::new(CACHE_TTL),
        }
    }

    #[must_use]
    pub fn with_openweather_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.openweather_base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_airvisual_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.airvisual_base_url = base_url.into();
        self
    }

    /// Applies to each provider call separately.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Current air quality, served from a 30 minute cache when possible.
    ///
    /// # Errors
    /// Returns the last provider error when every configured source fails,
    /// or an application error when no source is configured.
    pub async fn current(&self, coords: Coordinates) -> Result<AirQualityData, Error> {
        let key = coords.cache_key();
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(%key, "using cached air quality");
            return Ok(cached);
        }

        let mut last_error = None;
        if let Some(api_key) = self.openweather_key.as_deref() {
            match self.from_openweather(coords, api_key).await {
                Ok(data) => {
                    self.cache.insert(key, data.clone());
                    return Ok(data);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "OpenWeather air quality failed; trying AirVisual");
                    last_error = Some(err);
                }
            }
        }

        if let Some(api_key) = self.airvisual_key.as_deref() {
            let data = self.from_airvisual(coords, api_key).await?;
            self.cache.insert(key, data.clone());
            return Ok(data);
        }

        Err(last_error.unwrap_or_else(|| {
            Error::Application("No air quality provider is configured".to_string())
        }))
    }

    async fn from_openweather(&self, coords: Coordinates, api_key: &str) -> Result<AirQualityData, Error> {
        let request = self
            .client
            .get(format!(
                "{}/air_pollution",
                self.openweather_base_url.trim_end_matches('/')
            ))
            .query(&[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lon.to_string()),
                ("appid", api_key.to_string()),
            ]);
        let response = apply_timeout(request, self.timeout).send().await?;
        let raw: PollutionResponse = read_json(response).await?;
        let entry = raw.list.into_iter().next().ok_or_else(|| {
            Error::Application("OpenWeather air quality data is not available".to_string())
        })?;
        Ok(from_openweather_index(entry.main.aqi, &entry.components))
    }

    async fn from_airvisual(&self, coords: Coordinates, api_key: &str) -> Result<AirQualityData, Error> {
        let request = self
            .client
            .get(format!(
                "{}/nearest_city",
                self.airvisual_base_url.trim_end_matches('/')
            ))
            .query(&[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lon.to_string()),
                ("key", api_key.to_string()),
            ]);
        let response = apply_timeout(request, self.timeout).send().await?;

        let body: Value = read_json(response).await?;
        if body.get("status").and_then(Value::as_str) != Some("success") {
            let message = body
                .pointer("/data/message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(Error::Application(format!("AirVisual API error: {message}")));
        }
        let data = body
            .get("data")
            .cloned()
            .ok_or_else(|| Error::Application("AirVisual response has no data".to_string()))?;
        let city: NearestCity = serde_json::from_value(data)?;
        let pollution = city.current.pollution;

        // The free tier only reports the index; concentrations are estimated from it.
        let pollutants = Pollutants {
            pm25: f64::from(pollution.aqius),
            pm10: f64::from(pollution.aqicn.unwrap_or_default()),
            o3: 0.0,
            no2: 0.0,
            so2: 0.0,
            co: 0.0,
        };
        let main = pollution.mainus.unwrap_or_else(|| "pm25".to_string());
        Ok(build(pollution.aqius, main, pollutants))
    }
}

// =============================================================================
// RESOURCE
// =============================================================================

/// Air quality from the providers, then from the dashboard backend's
/// `airquality` route when every provider fails.
pub struct AirQualityFetcher {
    client: AirQualityClient,
    backend: Option<HttpClient>,
}

impl AirQualityFetcher {
    #[must_use]
    pub const fn new(client: AirQualityClient) -> Self {
        Self {
            client,
            backend: None,
        }
    }

    #[must_use]
    pub fn with_backend(mut self, backend: HttpClient) -> Self {
        self.backend = Some(backend);
        self
    }

    async fn from_backend(backend: &HttpClient, coords: Coordinates) -> Result<AirQualityData, Error> {
        let raw: BackendAirQuality = backend
            .get_with_query(
                "airquality",
                &[("lat", coords.lat.to_string()), ("lon", coords.lon.to_string())],
            )
            .await?;
        Ok(from_openweather_index(raw.aqi, &raw.components.into()))
    }
}

#[async_trait]
impl Fetcher for AirQualityFetcher {
    type Params = Coordinates;
    type Output = AirQualityData;

    fn name(&self) -> &'static str {
        "air_quality"
    }

    async fn fetch(&self, coords: &Coordinates) -> Result<AirQualityData, Error> {
        match (self.client.current(*coords).await, &self.backend) {
            (Ok(data), _) => Ok(data),
            (Err(err), Some(backend)) => {
                tracing::warn!(error = %err, "air quality providers failed; asking the backend");
                Self::from_backend(backend, *coords).await
            }
            (Err(err), None) => Err(err),
        }
    }
}

/// Air quality clears its data on failure; there is nothing to simulate.
pub type AirQualityResource = Resource<AirQualityFetcher>;

impl AirQualityResource {
    #[must_use]
    pub fn air_quality(fetcher: AirQualityFetcher) -> Self {
        Self::new(fetcher, FallbackPolicy::ClearOnError)
    }
}
