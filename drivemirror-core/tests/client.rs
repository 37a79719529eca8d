use drivemirror_core::{DriveClient, DriveError};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn create_folder_sends_metadata_and_bearer_header() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/drive/v3/files"))
        .and(query_param("fields", "id,name"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({
            "name": "docs",
            "mimeType": "application/vnd.google-apps.folder",
            "parents": ["root-id"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "D1",
            "name": "docs"
        })))
        .mount(&server)
        .await;

    let client = DriveClient::with_base_url(&server.uri(), "test-token").unwrap();
    let folder = client.create_folder("docs", "root-id").await.unwrap();

    assert_eq!(folder.id, "D1");
    assert_eq!(folder.name, "docs");
}

#[tokio::test]
async fn start_resumable_upload_returns_session_uri_from_location() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "resumable"))
        .and(body_json(json!({
            "name": "readme.txt",
            "parents": ["D1"]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("location", format!("{}/session/abc", server.uri()).as_str()),
        )
        .mount(&server)
        .await;

    let client = DriveClient::with_base_url(&server.uri(), "test-token").unwrap();
    let session = client
        .start_resumable_upload("readme.txt", "D1")
        .await
        .unwrap();

    assert_eq!(session.as_str(), format!("{}/session/abc", server.uri()));
}

#[tokio::test]
async fn start_resumable_upload_without_location_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = DriveClient::with_base_url(&server.uri(), "test-token").unwrap();
    let err = client
        .start_resumable_upload("readme.txt", "D1")
        .await
        .expect_err("expected missing session error");

    assert!(matches!(err, DriveError::MissingUploadSession));
}

#[tokio::test]
async fn delete_file_accepts_no_content() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/drive/v3/files/F1"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = DriveClient::with_base_url(&server.uri(), "test-token").unwrap();
    client.delete_file("F1").await.unwrap();
}

#[tokio::test]
async fn delete_file_surfaces_api_errors() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/drive/v3/files/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string("File not found"))
        .mount(&server)
        .await;

    let client = DriveClient::with_base_url(&server.uri(), "test-token").unwrap();
    let err = client.delete_file("gone").await.expect_err("expected 404");

    match err {
        DriveError::Api { status, body } => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(body, "File not found");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn create_folder_surfaces_api_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(403).set_body_string("rate limit"))
        .mount(&server)
        .await;

    let client = DriveClient::with_base_url(&server.uri(), "test-token").unwrap();
    let err = client
        .create_folder("docs", "root-id")
        .await
        .expect_err("expected 403");

    assert!(matches!(err, DriveError::Api { status, .. } if status.as_u16() == 403));
}
