mod common;

use agritech::types::{AqiCategory, Coordinates};
use agritech::{
    AirQualityClient, AirQualityFetcher, AirQualityResource, ErrorKind, ResourceStatus,
};
use common::mock_server::AgriMock;

const PARIS: Coordinates = Coordinates::new(48.8566, 2.3522);
const LYON: Coordinates = Coordinates::new(45.764, 4.8357);

fn resource_with_backend(mock: &AgriMock) -> AirQualityResource {
    AirQualityResource::air_quality(
        AirQualityFetcher::new(mock.air_quality_client()).with_backend(mock.http_client()),
    )
}

#[tokio::test]
async fn test_openweather_air_quality() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("air/openweather_valid.json").await;

    let air = mock.air_quality_client().current(PARIS).await.unwrap();

    assert_eq!(air.aqi, 75);
    assert_eq!(air.category, AqiCategory::Moderate);
    assert_eq!(air.main_pollutant, "o3");
    assert!((air.pollutants.co - 0.201_94).abs() < 1e-9);
    assert!((air.pollutants.pm25 - 0.5).abs() < f64::EPSILON);
    assert_eq!(air.health_implications, AqiCategory::Moderate.health_implications());
}

#[tokio::test]
async fn test_airvisual_used_when_openweather_fails() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("air/openweather_unauthorized.json").await;
    mock.mount_fixture("air/airvisual_valid.json").await;

    let air = mock.air_quality_client().current(PARIS).await.unwrap();

    assert_eq!(air.aqi, 58);
    assert_eq!(air.category, AqiCategory::Moderate);
    assert_eq!(air.main_pollutant, "p2");
}

#[tokio::test]
async fn test_airvisual_only_configuration() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("air/airvisual_valid.json").await;

    let client = AirQualityClient::new(None, Some("test_key".into()))
        .with_airvisual_base_url(format!("{}/v2", mock.server.uri()));
    let air = client.current(PARIS).await.unwrap();

    assert_eq!(air.aqi, 58);
    assert_eq!(mock.request_count().await, 1);
}

#[tokio::test]
async fn test_airvisual_fail_status_is_application_error() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("air/openweather_unauthorized.json").await;
    mock.mount_fixture("air/airvisual_fail.json").await;

    let err = mock.air_quality_client().current(PARIS).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Application);
    assert_eq!(err.to_string(), "AirVisual API error: api_key_expired");
}

#[tokio::test]
async fn test_no_provider_configured() {
    let client = AirQualityClient::new(Some("your_openweather_api_key_here".into()), None);

    let err = client.current(PARIS).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Application);
}

#[tokio::test]
async fn test_air_quality_is_cached() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("air/openweather_valid.json").await;

    let client = mock.air_quality_client();
    client.current(PARIS).await.unwrap();
    client.current(PARIS).await.unwrap();

    assert_eq!(mock.request_count().await, 1);
}

#[tokio::test]
async fn test_resource_falls_back_to_backend_route() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("air/openweather_unauthorized.json").await;
    mock.mount_fixture("air/airvisual_fail.json").await;
    mock.mount_fixture("air/backend_valid.json").await;

    let state = resource_with_backend(&mock).bind(PARIS).await;

    assert_eq!(state.status(), ResourceStatus::Success);
    let air = state.data.unwrap();
    assert_eq!(air.aqi, 125);
    assert_eq!(air.category, AqiCategory::UnhealthyForSensitiveGroups);
    assert_eq!(air.main_pollutant, "no2");
    assert!((air.pollutants.co - 0.3405).abs() < 1e-9);
}

#[tokio::test]
async fn test_resource_clears_data_when_every_source_fails() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("air/openweather_valid.json").await;

    let resource = resource_with_backend(&mock);
    assert_eq!(resource.bind(PARIS).await.status(), ResourceStatus::Success);

    mock.server.reset().await;
    mock.mount_fixture("air/openweather_unauthorized.json").await;
    mock.mount_fixture("air/airvisual_fail.json").await;
    mock.mount_fixture("air/backend_upstream_error.json").await;

    let state = resource.bind(LYON).await;

    assert_eq!(state.status(), ResourceStatus::Failure);
    assert!(state.data.is_none());
    assert_eq!(state.error.as_ref().map(agritech::Error::kind), Some(ErrorKind::Protocol));
    assert_eq!(state.error_message().as_deref(), Some("Erreur OpenWeather: 401"));
}

#[tokio::test]
async fn test_resource_without_backend_surfaces_provider_error() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("air/openweather_unauthorized.json").await;
    mock.mount_fixture("air/airvisual_fail.json").await;

    let resource = AirQualityResource::air_quality(AirQualityFetcher::new(mock.air_quality_client()));
    let state = resource.bind(PARIS).await;

    assert!(state.data.is_none());
    assert_eq!(
        state.error_message().as_deref(),
        Some("AirVisual API error: api_key_expired")
    );
}

#[tokio::test]
async fn test_stalled_provider_times_out() {
    let mock = AgriMock::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/data/2.5/air_pollution"))
        .respond_with(
            wiremock::ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "list": [] }))
                .set_delay(std::time::Duration::from_millis(500)),
        )
        .mount(&mock.server)
        .await;

    let client = AirQualityClient::new(Some("test_key".into()), None)
        .with_openweather_base_url(format!("{}/data/2.5", mock.server.uri()))
        .with_timeout(std::time::Duration::from_millis(50));
    let err = client.current(PARIS).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
}
