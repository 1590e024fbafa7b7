use agritech::{AdviceClient, AirQualityClient, ClimateClient, HttpClient, WeatherClient};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use wiremock::matchers::{method, path_regex};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Query parameters carrying credentials are never matched on.
const SECRET_PARAMS: [&str; 2] = ["appid", "key"];

pub const TEST_KEY: &str = "test_key";

#[derive(Deserialize)]
pub struct Fixture {
    #[serde(rename = "_meta")]
    pub meta: Option<FixtureMeta>,
    pub request: FixtureRequest,
    pub response: FixtureResponse,
}

#[derive(Deserialize)]
pub struct FixtureMeta {
    pub query: Option<std::collections::HashMap<String, serde_json::Value>>,
}

#[derive(Deserialize)]
pub struct FixtureRequest {
    pub method: String,
    pub path_pattern: String,
}

#[derive(Deserialize)]
pub struct FixtureResponse {
    pub status_code: u16,
    pub body: serde_json::Value,
}

/// One mock server standing in for the backend and every third-party API.
///
/// Each API lives under its own path prefix: the backend under `/api`,
/// OpenWeather under `/data/2.5`, Agromonitoring under `/agro/1.0`,
/// AirVisual under `/v2` and OpenRouter under `/api/v1`.
pub struct AgriMock {
    pub server: MockServer,
}

impl AgriMock {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
    }

    pub async fn mount_fixture(&self, fixture_path: &str) {
        let full_path = Self::fixtures_dir().join(fixture_path);

        let content = fs::read_to_string(&full_path)
            .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", full_path.display(), e));

        let fixture: Fixture = serde_json::from_str(&content)
            .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", full_path.display(), e));

        let mut mock = Mock::given(method(fixture.request.method.as_str()))
            .and(path_regex(&fixture.request.path_pattern));

        if let Some(query) = fixture.meta.as_ref().and_then(|meta| meta.query.as_ref()) {
            for (key, value) in query {
                if SECRET_PARAMS.contains(&key.as_str()) {
                    continue;
                }
                if let Some(value) = query_value_to_string(value) {
                    mock = mock.and(query_param_normalized(key, value));
                }
            }
        }

        mock.respond_with(
            ResponseTemplate::new(fixture.response.status_code)
                .set_body_json(&fixture.response.body),
        )
        .mount(&self.server)
        .await;
    }

    #[allow(dead_code)]
    pub fn http_client(&self) -> HttpClient {
        HttpClient::new(format!("{}/api", self.server.uri()))
    }

    #[allow(dead_code)]
    pub fn weather_client(&self) -> WeatherClient {
        WeatherClient::new(Some(TEST_KEY.into()))
            .with_base_url(format!("{}/data/2.5", self.server.uri()))
    }

    #[allow(dead_code)]
    pub fn climate_client(&self) -> ClimateClient {
        ClimateClient::new(Some(TEST_KEY.into()))
            .with_base_url(format!("{}/agro/1.0", self.server.uri()))
    }

    #[allow(dead_code)]
    pub fn air_quality_client(&self) -> AirQualityClient {
        AirQualityClient::new(Some(TEST_KEY.into()), Some(TEST_KEY.into()))
            .with_openweather_base_url(format!("{}/data/2.5", self.server.uri()))
            .with_airvisual_base_url(format!("{}/v2", self.server.uri()))
    }

    #[allow(dead_code)]
    pub fn advice_client(&self) -> AdviceClient {
        AdviceClient::new(Some(TEST_KEY.into()))
            .with_base_url(format!("{}/api/v1", self.server.uri()))
    }

    /// Number of requests the server has seen so far.
    #[allow(dead_code)]
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or_default()
    }
}

fn query_value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(value) => Some(value.clone()),
        serde_json::Value::Number(value) => Some(value.to_string()),
        serde_json::Value::Bool(value) => Some(value.to_string()),
        serde_json::Value::Null => None,
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
    }
}

struct QueryParamNormalizedMatcher {
    key: String,
    expected: String,
}

fn query_param_normalized(
    key: impl Into<String>,
    expected: impl Into<String>,
) -> QueryParamNormalizedMatcher {
    QueryParamNormalizedMatcher {
        key: key.into(),
        expected: expected.into(),
    }
}

impl Match for QueryParamNormalizedMatcher {
    fn matches(&self, request: &Request) -> bool {
        request
            .url
            .query_pairs()
            .any(|(key, actual)| key == self.key.as_str() && values_match(&self.expected, &actual))
    }
}

/// Coordinates are compared numerically so `48.85660` matches `48.8566`.
fn values_match(expected: &str, actual: &str) -> bool {
    if expected == actual {
        return true;
    }

    match (expected.parse::<f64>(), actual.parse::<f64>()) {
        (Ok(expected), Ok(actual)) => (expected - actual).abs() < f64::EPSILON,
        _ => false,
    }
}
