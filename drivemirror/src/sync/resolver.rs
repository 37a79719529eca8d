use drivemirror_core::{DriveClient, DriveError};
use thiserror::Error;

use super::paths;
use super::state::{StateError, StateStore, SyncState};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("api error: {0}")]
    Api(#[from] DriveError),
    #[error("state error: {0}")]
    State(#[from] StateError),
}

/// Maps a local relative directory path onto a remote folder id, creating
/// only the missing suffix of the path.
///
/// Segments are walked left to right; a subpath already present in
/// `state.folders` is reused, anything else is created remotely under the
/// current parent and recorded (and persisted) before moving on. The empty
/// path is the sync root itself and resolves to `root_folder_id` without
/// any remote call.
pub async fn resolve_folder(
    client: &DriveClient,
    store: &StateStore,
    state: &mut SyncState,
    relative_path: &str,
    root_folder_id: &str,
) -> Result<String, ResolveError> {
    let mut current_parent = root_folder_id.to_string();
    let mut current_subpath = String::new();

    for segment in paths::segments(relative_path) {
        if !current_subpath.is_empty() {
            current_subpath.push('/');
        }
        current_subpath.push_str(segment);

        if let Some(existing) = state.folder_id(&current_subpath) {
            current_parent = existing.to_string();
            continue;
        }

        let folder = client.create_folder(segment, &current_parent).await?;
        eprintln!(
            "[drivemirror] created folder {current_subpath} ({})",
            folder.id
        );
        state.record_folder(current_subpath.clone(), folder.id.clone());
        store.save(state)?;
        current_parent = folder.id;
    }

    Ok(current_parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

    fn folder_mock(name: &str, parent: &str, id: &str) -> Mock {
        Mock::given(method("POST"))
            .and(path("/drive/v3/files"))
            .and(body_json(json!({
                "name": name,
                "mimeType": FOLDER_MIME,
                "parents": [parent]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": id,
                "name": name
            })))
    }

    #[tokio::test]
    async fn empty_path_resolves_to_root_without_remote_calls() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let mut state = SyncState::default();

        let client = DriveClient::with_base_url(&server.uri(), "t").unwrap();
        let id = resolve_folder(&client, &store, &mut state, "", "R")
            .await
            .unwrap();

        assert_eq!(id, "R");
        assert!(state.folders.is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn creates_only_the_missing_suffix() {
        let server = MockServer::start().await;
        folder_mock("b", "A1", "B1").expect(1).mount(&server).await;
        folder_mock("c", "B1", "C1").expect(1).mount(&server).await;

        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let mut state = SyncState::default();
        state.record_folder("a", "A1");

        let client = DriveClient::with_base_url(&server.uri(), "t").unwrap();
        let id = resolve_folder(&client, &store, &mut state, "a/b/c", "R")
            .await
            .unwrap();

        assert_eq!(id, "C1");
        assert_eq!(state.folder_id("a"), Some("A1"));
        assert_eq!(state.folder_id("a/b"), Some("B1"));
        assert_eq!(state.folder_id("a/b/c"), Some("C1"));
        // Persisted incrementally, so the saved file matches.
        assert_eq!(store.load(), state);
    }

    #[tokio::test]
    async fn reuses_fully_known_paths_without_remote_calls() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let mut state = SyncState::default();
        state.record_folder("a", "A1");
        state.record_folder("a/b", "B1");

        let client = DriveClient::with_base_url(&server.uri(), "t").unwrap();
        let id = resolve_folder(&client, &store, &mut state, "a/b", "R")
            .await
            .unwrap();

        assert_eq!(id, "B1");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_keeps_already_created_ancestors() {
        let server = MockServer::start().await;
        folder_mock("a", "R", "A1").expect(1).mount(&server).await;
        Mock::given(method("POST"))
            .and(path("/drive/v3/files"))
            .and(body_json(json!({
                "name": "b",
                "mimeType": FOLDER_MIME,
                "parents": ["A1"]
            })))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let mut state = SyncState::default();

        let client = DriveClient::with_base_url(&server.uri(), "t").unwrap();
        let err = resolve_folder(&client, &store, &mut state, "a/b", "R")
            .await
            .expect_err("expected create failure");

        assert!(matches!(err, ResolveError::Api(_)));
        // "a" survives for reuse on the next run, "a/b" was never recorded.
        assert_eq!(state.folder_id("a"), Some("A1"));
        assert_eq!(state.folder_id("a/b"), None);
        assert_eq!(store.load().folder_id("a"), Some("A1"));
    }
}
