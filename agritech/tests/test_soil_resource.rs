mod common;

use agritech::types::Coordinates;
use agritech::{ErrorKind, HttpClient, ResourceStatus, SoilClient, SoilResource};
use common::mock_server::AgriMock;

const PARIS: Coordinates = Coordinates::new(48.8566, 2.3522);

#[tokio::test]
async fn test_soil_analysis_valid() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("soil/analysis_valid.json").await;

    let soil = SoilClient::new(mock.http_client()).analysis(PARIS).await.unwrap();

    assert!((soil.ph_level - 6.8).abs() < f64::EPSILON);
    assert_eq!(soil.nitrogen, Some(42.5));
    assert_eq!(soil.recommendations.len(), 2);
}

#[tokio::test]
async fn test_soil_analysis_optional_fields_missing() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("soil/analysis_minimal.json").await;

    let soil = SoilClient::new(mock.http_client()).analysis(PARIS).await.unwrap();

    assert_eq!(soil.nitrogen, None);
    assert_eq!(soil.sand, None);
    assert!(soil.recommendations.is_empty());
}

#[tokio::test]
async fn test_soil_error_field_is_application_failure() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("soil/analysis_error_field.json").await;

    let err = SoilClient::new(mock.http_client()).analysis(PARIS).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Application);
    assert_eq!(err.to_string(), "Aucune donnée pour cette parcelle");
}

#[tokio::test]
async fn test_soil_resource_rejected_call_clears_data() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("soil/analysis_not_found.json").await;

    let resource = SoilResource::soil(SoilClient::new(mock.http_client()));
    let state = resource.bind(PARIS).await;

    assert!(!state.loading);
    assert_eq!(state.status(), ResourceStatus::Failure);
    assert_eq!(state.error_message().as_deref(), Some("Error 404: Not Found"));
    assert!(state.data.is_none());
}

#[tokio::test]
async fn test_soil_resource_offline_clears_data() {
    let http = HttpClient::new("http://127.0.0.1:9/api");
    let resource = SoilResource::soil(SoilClient::new(http));
    let state = resource.bind(PARIS).await;

    assert!(!state.loading);
    assert!(state.error.is_some());
    assert!(state.data.is_none());
}

#[tokio::test]
async fn test_soil_resource_same_coordinates_fetch_once() {
    let mock = AgriMock::start().await;
    mock.mount_fixture("soil/analysis_valid.json").await;

    let resource = SoilResource::soil(SoilClient::new(mock.http_client()));
    resource.bind(PARIS).await;
    let state = resource.bind(PARIS).await;

    assert_eq!(state.status(), ResourceStatus::Success);
    assert_eq!(mock.request_count().await, 1);

    resource.refetch().await;
    assert_eq!(mock.request_count().await, 2);
}
