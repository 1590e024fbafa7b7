use serde::{Deserialize, Serialize};

// =============================================================================
// LOCATION
// =============================================================================

/// A point on the map, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Cache key with both coordinates rounded to two decimals.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{:.2}_{:.2}", self.lat, self.lon)
    }

    /// True when both coordinates are within `radius` degrees of `other`.
    #[must_use]
    pub fn is_near(&self, other: &Self, radius: f64) -> bool {
        (self.lat - other.lat).abs() < radius && (self.lon - other.lon).abs() < radius
    }
}

/// Field boundary as a ring of `[lon, lat]` points, compared by value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon(pub Vec<[f64; 2]>);

impl Polygon {
    #[must_use]
    pub fn new(points: Vec<[f64; 2]>) -> Self {
        Self(points)
    }

    #[must_use]
    pub fn points(&self) -> &[[f64; 2]] {
        &self.0
    }

    /// Mean of the polygon's points, or `None` for an empty polygon.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn centroid(&self) -> Option<Coordinates> {
        if self.0.is_empty() {
            return None;
        }
        let count = self.0.len() as f64;
        let lon = self.0.iter().map(|point| point[0]).sum::<f64>() / count;
        let lat = self.0.iter().map(|point| point[1]).sum::<f64>() / count;
        Some(Coordinates::new(lat, lon))
    }
}

// =============================================================================
// WEATHER
// =============================================================================

/// Current conditions as shown by the weather widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherData {
    /// Air temperature in °C
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: u32,
    /// Wind speed in m/s
    pub wind_speed: f64,
    /// Human readable description, e.g. "scattered clouds"
    pub description: String,
    /// OpenWeather icon code, e.g. "03d"
    pub icon: String,
    /// Perceived temperature in °C
    pub feels_like: f64,
    /// Sea-level pressure in hPa
    pub pressure: u32,
    /// Visibility in metres
    pub visibility: u32,
    /// Cloud cover in percent
    pub clouds: u32,
    /// Unix timestamp of sunrise
    pub sunrise: i64,
    /// Unix timestamp of sunset
    pub sunset: i64,
    /// Wind direction in degrees
    pub wind_direction: u32,
    /// Rain volume for the last hour in mm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain1h: Option<f64>,
    /// Snow volume for the last hour in mm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snow1h: Option<f64>,
    /// ISO country code
    pub country: String,
    /// Display label for the location
    pub city_name: String,
    /// Set when the record was generated locally instead of fetched
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub simulated: bool,
}

/// Five day / three hour forecast in the OpenWeather `forecast` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub list: Vec<ForecastEntry>,
    pub city: ForecastCity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    /// Unix timestamp of the forecast slot
    pub dt: i64,
    pub main: ForecastMain,
    pub weather: Vec<WeatherCondition>,
    pub clouds: Clouds,
    pub wind: Wind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain: Option<Rain>,
    /// Probability of precipitation, 0..1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pop: Option<f64>,
    /// Slot time as "YYYY-MM-DD HH:MM:SS" (UTC)
    pub dt_txt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMain {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub id: u32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clouds {
    pub all: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    pub deg: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rain {
    #[serde(rename = "3h", default, skip_serializing_if = "Option::is_none")]
    pub three_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastCity {
    pub name: String,
    pub country: String,
    pub sunrise: i64,
    pub sunset: i64,
}

/// Everything the weather resource exposes: current conditions plus forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub current: WeatherData,
    pub forecast: Forecast,
}

// =============================================================================
// SOIL & CLIMATE
// =============================================================================

/// Soil analysis returned by the dashboard backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilAnalysis {
    pub ph_level: f64,
    #[serde(default)]
    pub nitrogen: Option<f64>,
    #[serde(default)]
    pub phosphorus: Option<f64>,
    #[serde(default)]
    pub potassium: Option<f64>,
    #[serde(default)]
    pub organic_matter: Option<f64>,
    #[serde(default)]
    pub clay: Option<f64>,
    #[serde(default)]
    pub sand: Option<f64>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Field-level climate indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimateData {
    /// Soil moisture in percent
    pub soil_moisture: f64,
    /// Normalized Difference Vegetation Index
    pub ndvi: f64,
    /// Recent precipitation in mm
    pub precipitation: f64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub simulated: bool,
}

// =============================================================================
// AIR QUALITY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AqiCategory {
    Good,
    Moderate,
    #[serde(rename = "Unhealthy for Sensitive Groups")]
    UnhealthyForSensitiveGroups,
    Unhealthy,
    #[serde(rename = "Very Unhealthy")]
    VeryUnhealthy,
    Hazardous,
}

/// Pollutant concentrations; CO in mg/m³, everything else in µg/m³.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pollutants {
    pub pm25: f64,
    pub pm10: f64,
    pub o3: f64,
    pub no2: f64,
    pub so2: f64,
    pub co: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirQualityData {
    /// US AQI, 0..500
    pub aqi: u32,
    pub main_pollutant: String,
    pub category: AqiCategory,
    pub pollutants: Pollutants,
    pub health_implications: String,
    pub recommendations: String,
}

// =============================================================================
// AUTH
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Token plus profile, as returned by login and registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl LoginCredentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterData {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterData {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}
