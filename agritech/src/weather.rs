use crate::cache::TtlCache;
use crate::http::{apply_timeout, read_json, DEFAULT_PROVIDER_TIMEOUT};
use crate::resource::{FallbackPolicy, Fetcher, Resource};
use crate::simulate;
use crate::types::{Coordinates, Forecast, WeatherData, WeatherReport};
use crate::{configured_key, Error};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

const CACHE_TTL: Duration = Duration::from_secs(10 * 60);
const PARIS: Coordinates = Coordinates::new(48.8566, 2.3522);
const PARIS_RADIUS: f64 = 0.05;

/// Client for OpenWeather-compatible current weather and forecast endpoints.
pub struct WeatherClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
    cache: TtlCache<WeatherData>,
}

impl WeatherClient {
    /// Creates a client. A missing or placeholder key makes every call
    /// return simulated data.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: configured_key(api_key),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
            cache: TtlCache::new(CACHE_TTL),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fails calls slower than `timeout` with [`Error::Timeout`].
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        coords: Coordinates,
        api_key: &str,
    ) -> Result<T, Error> {
        let request = self
            .client
            .get(format!("{}/{endpoint}", self.base_url.trim_end_matches('/')))
            .query(&[
                ("lat", coords.lat.to_string()),
                ("lon", coords.lon.to_string()),
                ("units", "metric".to_string()),
                ("appid", api_key.to_string()),
            ]);
        let response = apply_timeout(request, self.timeout).send().await?;
        read_json(response).await
    }

    /// Current conditions, served from a 10 minute cache when possible.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or the response cannot be parsed.
    pub async fn current(&self, coords: Coordinates) -> Result<WeatherData, Error> {
        let key = coords.cache_key();
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(%key, "using cached weather");
            return Ok(cached);
        }

        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!("OpenWeather API key is missing or a placeholder; using simulated weather");
            return Ok(simulate::weather_now(coords));
        };

        let raw: CurrentResponse = self.get("weather", coords, api_key).await?;
        let data = raw.into_weather_data(coords);
        self.cache.insert(key, data.clone());
        Ok(data)
    }

    /// Three-hourly forecast for the next five days.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or the response cannot be parsed.
    pub async fn forecast(&self, coords: Coordinates) -> Result<Forecast, Error> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!("OpenWeather API key is missing or a placeholder; using simulated forecast");
            return Ok(simulate::forecast_now(coords));
        };
        self.get("forecast", coords, api_key).await
    }

    /// UV index; a random index in 0..=10 when unconfigured.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or the response cannot be parsed.
    pub async fn uv_index(&self, coords: Coordinates) -> Result<f64, Error> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!("OpenWeather API key is missing or a placeholder; using simulated UV index");
            return Ok(f64::from(rand::random::<u8>() % 11));
        };
        let raw: UvResponse = self.get("uvi", coords, api_key).await?;
        Ok(raw.value)
    }
}

const COMPASS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

impl WeatherData {
    /// True between sunrise and sunset, both exclusive.
    #[must_use]
    pub const fn is_daytime_at(&self, unix_time: i64) -> bool {
        unix_time > self.sunrise && unix_time < self.sunset
    }

    #[must_use]
    pub fn is_daytime(&self) -> bool {
        self.is_daytime_at(time::OffsetDateTime::now_utc().unix_timestamp())
    }

    /// Wind direction rounded to the nearest of eight compass points.
    #[must_use]
    pub const fn wind_compass(&self) -> &'static str {
        COMPASS[((self.wind_direction % 360 + 22) / 45 % 8) as usize]
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Deserialize)]
struct CurrentResponse {
    main: CurrentMain,
    wind: CurrentWind,
    #[serde(default)]
    weather: Vec<CurrentCondition>,
    #[serde(default)]
    visibility: u32,
    clouds: CurrentClouds,
    sys: CurrentSys,
    #[serde(default)]
    rain: Option<Precipitation>,
    #[serde(default)]
    snow: Option<Precipitation>,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct CurrentMain {
    temp: f64,
    feels_like: f64,
    humidity: u32,
    pressure: u32,
}

#[derive(Deserialize)]
struct CurrentWind {
    speed: f64,
    #[serde(default)]
    deg: u32,
}

#[derive(Deserialize)]
struct CurrentCondition {
    description: String,
    icon: String,
}

#[derive(Deserialize)]
struct CurrentClouds {
    all: u32,
}

#[derive(Deserialize)]
struct CurrentSys {
    #[serde(default)]
    country: String,
    sunrise: i64,
    sunset: i64,
}

#[derive(Deserialize)]
struct Precipitation {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
}

#[derive(Deserialize)]
struct UvResponse {
    value: f64,
}

impl CurrentResponse {
    fn into_weather_data(self, coords: Coordinates) -> WeatherData {
        let (description, icon) = self
            .weather
            .into_iter()
            .next()
            .map(|condition| (condition.description, condition.icon))
            .unwrap_or_default();
        let city_name = if coords.is_near(&PARIS, PARIS_RADIUS) {
            "Paris".to_string()
        } else {
            self.name
        };

        WeatherData {
            temperature: self.main.temp,
            humidity: self.main.humidity,
            wind_speed: self.wind.speed,
            description,
            icon,
            feels_like: self.main.feels_like,
            pressure: self.main.pressure,
            visibility: self.visibility,
            clouds: self.clouds.all,
            sunrise: self.sys.sunrise,
            sunset: self.sys.sunset,
            wind_direction: self.wind.deg,
            rain1h: self.rain.and_then(|rain| rain.one_hour),
            snow1h: self.snow.and_then(|snow| snow.one_hour),
            country: self.sys.country,
            city_name,
            simulated: false,
        }
    }
}

// =============================================================================
// RESOURCE
// =============================================================================

/// Loads current conditions and forecast together.
///
/// A failed forecast alone is replaced by a simulated one without surfacing
/// an error; a failed current-conditions call fails the whole fetch.
pub struct WeatherFetcher {
    client: WeatherClient,
}

impl WeatherFetcher {
    #[must_use]
    pub const fn new(client: WeatherClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for WeatherFetcher {
    type Params = Coordinates;
    type Output = WeatherReport;

    fn name(&self) -> &'static str {
        "weather"
    }

    async fn fetch(&self, coords: &Coordinates) -> Result<WeatherReport, Error> {
        let current = self.client.current(*coords).await?;
        let forecast = match self.client.forecast(*coords).await {
            Ok(forecast) => forecast,
            Err(err) => {
                tracing::warn!(error = %err, "forecast unavailable; using simulated forecast");
                simulate::forecast_now(*coords)
            }
        };
        Ok(WeatherReport { current, forecast })
    }

    fn simulate(&self, coords: &Coordinates) -> Option<WeatherReport> {
        Some(WeatherReport {
            current: simulate::weather_now(*coords),
            forecast: simulate::forecast_now(*coords),
        })
    }
}

/// Weather never renders blank: failures keep the error and show simulated data.
pub type WeatherResource = Resource<WeatherFetcher>;

impl WeatherResource {
    #[must_use]
    pub fn weather(client: WeatherClient) -> Self {
        Self::new(WeatherFetcher::new(client), FallbackPolicy::FallbackToSimulated)
    }
}
