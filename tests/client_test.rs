//! Tests for DriveClient and AuthSession with mocked HTTP responses.

use mockito::{Matcher, Server};
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;

use gcmd::client::Endpoints;
use gcmd::config::ConfigPaths;
use gcmd::error::DriveError;
use gcmd::models::{CredentialsFile, FileListResponse, FileMetadata, ResourceKind};
use gcmd::plan::ExportFormat;
use gcmd::{AuthSession, DriveClient, ListQuery, RemoteSource};

const TOKEN: &str = "test-token";

fn bearer() -> String {
    format!("Bearer {TOKEN}")
}

mod models {
    use super::*;

    #[test]
    fn test_file_metadata_deserialization() {
        let json = json!({
            "id": "file123",
            "name": "document.pdf",
            "mimeType": "application/pdf",
            "webViewLink": "https://drive.google.com/file/d/file123/view",
            "size": "2048"
        });

        let metadata: FileMetadata = serde_json::from_value(json).unwrap();

        assert_eq!(metadata.id, "file123");
        assert_eq!(metadata.name, "document.pdf");
        assert_eq!(metadata.mime_type, Some("application/pdf".to_string()));
        assert_eq!(metadata.size, Some(2048));
        assert_eq!(metadata.kind(), ResourceKind::BinaryFile);
    }

    #[test]
    fn test_file_metadata_without_size() {
        let json = json!({
            "id": "folder123",
            "name": "My Folder",
            "mimeType": "application/vnd.google-apps.folder"
        });

        let metadata: FileMetadata = serde_json::from_value(json).unwrap();

        assert_eq!(metadata.size, None);
        assert_eq!(metadata.kind(), ResourceKind::Unknown);
    }

    #[test]
    fn test_file_list_response_deserialization() {
        let json = json!({
            "files": [
                {"id": "f1", "name": "file1.txt"},
                {"id": "f2", "name": "file2.txt"}
            ],
            "nextPageToken": "token123"
        });

        let response: FileListResponse = serde_json::from_value(json).unwrap();

        assert_eq!(response.files.len(), 2);
        assert_eq!(response.next_page_token, Some("token123".to_string()));
    }

    #[test]
    fn test_compact_display() {
        let metadata: FileMetadata = serde_json::from_value(json!({
            "id": "abc123",
            "name": "Roadmap",
            "mimeType": "application/vnd.google-apps.document"
        }))
        .unwrap();

        let display = metadata.to_string();
        assert!(display.starts_with("[Doc"));
        assert!(display.contains("abc123"));
        assert!(display.ends_with("Roadmap"));
    }
}

mod credentials {
    use super::*;

    #[test]
    fn test_installed_client_secrets() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let creds_json = json!({
            "installed": {
                "client_id": "id.apps.googleusercontent.com",
                "client_secret": "secret",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token"
            }
        });
        temp_file.write_all(creds_json.to_string().as_bytes()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        let creds: CredentialsFile = serde_json::from_str(&content).unwrap();
        assert!(matches!(creds, CredentialsFile::Installed { .. }));
    }

    #[test]
    fn test_load_empty_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let session = AuthSession::load(ConfigPaths::in_dir(dir.path()));
        assert!(session.is_ok());
    }

    #[test]
    fn test_load_invalid_credentials() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("credentials.json"), b"not valid json").unwrap();

        let session = AuthSession::load(ConfigPaths::in_dir(dir.path()));
        assert!(matches!(session, Err(DriveError::Json(_))));
    }

    #[tokio::test]
    async fn test_missing_credentials_explain_setup() {
        let dir = tempfile::tempdir().unwrap();
        let session = AuthSession::load(ConfigPaths::in_dir(dir.path())).unwrap();

        match session.access_token().await {
            Err(DriveError::AuthenticationError(msg)) => {
                assert!(msg.contains("credentials.json"));
                assert!(msg.contains("Desktop app"));
            }
            other => panic!("expected AuthenticationError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_saved() {
        let mut server = Server::new_async().await;
        let token_mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "refresh-1".into()),
                Matcher::UrlEncoded("client_id".into(), "cid".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "fresh", "token_type": "Bearer", "expires_in": 3600}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let stale = json!({
            "token": "stale",
            "refresh_token": "refresh-1",
            "token_uri": format!("{}/token", server.url()),
            "client_id": "cid",
            "client_secret": "csecret",
            "scopes": [],
            "expiry": "2020-01-01T00:00:00Z"
        });
        std::fs::write(dir.path().join("token.json"), stale.to_string()).unwrap();

        let session = AuthSession::load(ConfigPaths::in_dir(dir.path())).unwrap();
        assert_eq!(session.access_token().await.unwrap(), "fresh");
        // Cached now; no second refresh.
        assert_eq!(session.access_token().await.unwrap(), "fresh");
        token_mock.assert_async().await;

        let saved: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("token.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(saved["token"], "fresh");
        assert_eq!(saved["refresh_token"], "refresh-1");
    }

    #[test]
    fn test_logout_removes_token() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConfigPaths::in_dir(dir.path());
        std::fs::write(paths.token_file(), b"{}").unwrap();

        assert!(AuthSession::logout(&paths).unwrap());
        assert!(!paths.token_file().exists());
        assert!(!AuthSession::logout(&paths).unwrap());
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn test_list_follows_pages_and_truncates() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/drive/v3/files")
            .match_header("authorization", bearer().as_str())
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("pageSize".into(), "3".into()),
                Matcher::UrlEncoded("q".into(), "trashed = false and mimeType = 'application/vnd.google-apps.spreadsheet'".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "files": [{"id": "a", "name": "A"}, {"id": "b", "name": "B"}],
                    "nextPageToken": "p2"
                })
                .to_string(),
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", "/drive/v3/files")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("pageToken".into(), "p2".into()),
                Matcher::UrlEncoded("pageSize".into(), "1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "files": [{"id": "c", "name": "C"}, {"id": "d", "name": "D"}],
                    "nextPageToken": "p3"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let auth = AuthSession::with_access_token(TOKEN);
        let client = DriveClient::with_endpoints(&auth, Endpoints::single(&server.url()));
        let query = ListQuery {
            mime_type: Some(ListQuery::mime_for_type("sheets")),
            max_results: 3,
            ..ListQuery::default()
        };

        let files = client.list_files(&query).await.unwrap();
        let ids: Vec<&str> = files.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_comments() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/drive/v3/files/doc1/comments")
            .match_query(Matcher::AllOf(vec![Matcher::UrlEncoded(
                "includeDeleted".into(),
                "false".into(),
            )]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "comments": [{
                        "id": "c1",
                        "content": "Please fix",
                        "author": {"displayName": "Ada"},
                        "resolved": false,
                        "replies": [{"content": "Done", "author": {"displayName": "Bob"}}]
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let auth = AuthSession::with_access_token(TOKEN);
        let client = DriveClient::with_endpoints(&auth, Endpoints::single(&server.url()));
        let comments = client.list_comments("doc1").await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].replies[0].content, "Done");
    }
}

mod remote_source {
    use super::*;

    async fn mock_json(server: &mut Server, path: &str, body: serde_json::Value) {
        server
            .mock("GET", path)
            .match_header("authorization", bearer().as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn test_document_metadata_lists_tabs() {
        let mut server = Server::new_async().await;
        mock_json(
            &mut server,
            "/drive/v3/files/doc1",
            json!({"id": "doc1", "name": "Plan", "mimeType": "application/vnd.google-apps.document"}),
        )
        .await;
        mock_json(
            &mut server,
            "/docs/v1/documents/doc1",
            json!({
                "documentId": "doc1",
                "tabs": [
                    {"tabProperties": {"tabId": "t.0", "title": "Intro"},
                     "childTabs": [{"tabProperties": {"tabId": "t.1", "title": "Nested"}}]},
                    {"tabProperties": {"tabId": "t.2", "title": "Details"}}
                ]
            }),
        )
        .await;

        let auth = AuthSession::with_access_token(TOKEN);
        let client = DriveClient::with_endpoints(&auth, Endpoints::single(&server.url()));
        let meta = client.fetch_metadata("doc1").await.unwrap();

        assert_eq!(meta.kind, ResourceKind::Document);
        assert_eq!(meta.title, "Plan");
        assert!(meta.is_multi_tab());
        let titles: Vec<&str> = meta.tabs.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Intro", "Nested", "Details"]);
    }

    #[tokio::test]
    async fn test_spreadsheet_metadata_orders_sheets() {
        let mut server = Server::new_async().await;
        mock_json(
            &mut server,
            "/drive/v3/files/s1",
            json!({"id": "s1", "name": "Budget", "mimeType": "application/vnd.google-apps.spreadsheet"}),
        )
        .await;
        mock_json(
            &mut server,
            "/sheets/v4/spreadsheets/s1",
            json!({
                "spreadsheetId": "s1",
                "properties": {"title": "Budget"},
                "sheets": [
                    {"properties": {"sheetId": 99, "title": "Feb", "index": 1}},
                    {"properties": {"sheetId": 0, "title": "Jan", "index": 0}}
                ]
            }),
        )
        .await;

        let auth = AuthSession::with_access_token(TOKEN);
        let client = DriveClient::with_endpoints(&auth, Endpoints::single(&server.url()));
        let meta = client.fetch_metadata("s1").await.unwrap();

        assert_eq!(meta.kind, ResourceKind::Spreadsheet);
        let ids: Vec<&str> = meta.tabs.iter().map(|t| t.tab_id.as_str()).collect();
        assert_eq!(ids, vec!["0", "99"]);
    }

    #[tokio::test]
    async fn test_content_routes() {
        let mut server = Server::new_async().await;
        let csv = server
            .mock("GET", "/spreadsheets/d/s1/export")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("format".into(), "csv".into()),
                Matcher::UrlEncoded("gid".into(), "99".into()),
            ]))
            .with_status(200)
            .with_body("a,b\n1,2\n")
            .create_async()
            .await;
        let markdown = server
            .mock("GET", "/drive/v3/files/doc1/export")
            .match_query(Matcher::UrlEncoded("mimeType".into(), "text/markdown".into()))
            .with_status(200)
            .with_body("# Plan\n")
            .create_async()
            .await;
        let media = server
            .mock("GET", "/drive/v3/files/bin1")
            .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
            .with_status(200)
            .with_body(vec![0u8, 159, 146, 150])
            .create_async()
            .await;

        let auth = AuthSession::with_access_token(TOKEN);
        let client = DriveClient::with_endpoints(&auth, Endpoints::single(&server.url()));

        let bytes = client
            .fetch_content("s1", Some("99"), ExportFormat::Csv)
            .await
            .unwrap();
        assert_eq!(bytes, b"a,b\n1,2\n");

        let bytes = client
            .fetch_content("doc1", None, ExportFormat::Markdown)
            .await
            .unwrap();
        assert_eq!(bytes, b"# Plan\n");

        let bytes = client
            .fetch_content("bin1", None, ExportFormat::Binary)
            .await
            .unwrap();
        assert_eq!(bytes, vec![0u8, 159, 146, 150]);

        csv.assert_async().await;
        markdown.assert_async().await;
        media.assert_async().await;
    }

    #[tokio::test]
    async fn test_tabs_rendered_from_one_document_fetch() {
        let mut server = Server::new_async().await;
        let document = server
            .mock("GET", "/docs/v1/documents/doc1")
            .match_query(Matcher::UrlEncoded("includeTabsContent".into(), "true".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "tabs": [{
                        "tabProperties": {"tabId": "t.0", "title": "Intro"},
                        "documentTab": {"body": {"content": [
                            {"paragraph": {
                                "elements": [{"textRun": {"content": "Welcome\n"}}],
                                "paragraphStyle": {"namedStyleType": "HEADING_2"}
                            }}
                        ]}}
                    }]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let auth = AuthSession::with_access_token(TOKEN);
        let client = DriveClient::with_endpoints(&auth, Endpoints::single(&server.url()));

        let bytes = client
            .fetch_content("doc1", Some("t.0"), ExportFormat::Markdown)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "## Welcome\n");

        let err = client
            .fetch_content("doc1", Some("t.9"), ExportFormat::Markdown)
            .await
            .unwrap_err();
        assert!(matches!(err, DriveError::TabNotFound { .. }));

        // The second tab lookup reuses the cached document.
        document.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_statuses_are_classified() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/drive/v3/files/busy")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body(r#"{"error": {"code": 429, "message": "Rate Limit Exceeded", "errors": [{"reason": "rateLimitExceeded"}]}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/drive/v3/files/gone")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error": {"code": 404, "message": "File not found: gone."}}"#)
            .create_async()
            .await;

        let auth = AuthSession::with_access_token(TOKEN);
        let client = DriveClient::with_endpoints(&auth, Endpoints::single(&server.url()));

        let err = client.get_file("busy", false).await.unwrap_err();
        assert!(err.is_retryable());

        match client.get_file("gone", false).await.unwrap_err() {
            DriveError::RemoteFatal { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "File not found: gone.");
            }
            other => panic!("expected RemoteFatal, got {other:?}"),
        }
    }
}

mod end_to_end {
    use super::*;
    use gcmd::plan::{plan_export, OutputTarget};
    use gcmd::retry::{RecordingSleeper, RetryPolicy};
    use gcmd::{execute_plan, FsWriter};
    use std::time::Duration;

    #[tokio::test]
    async fn test_spreadsheet_export_to_disk() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/drive/v3/files/s1")
            .match_query(Matcher::UrlEncoded("supportsAllDrives".into(), "true".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"id": "s1", "name": "Q1: Budget", "mimeType": "application/vnd.google-apps.spreadsheet"})
                    .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/sheets/v4/spreadsheets/s1")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "spreadsheetId": "s1",
                    "sheets": [
                        {"properties": {"sheetId": 0, "title": "Jan", "index": 0}},
                        {"properties": {"sheetId": 1, "title": "Feb", "index": 1}}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/spreadsheets/d/s1/export")
            .match_query(Matcher::UrlEncoded("gid".into(), "0".into()))
            .with_status(200)
            .with_body("jan\n")
            .create_async()
            .await;
        server
            .mock("GET", "/spreadsheets/d/s1/export")
            .match_query(Matcher::UrlEncoded("gid".into(), "1".into()))
            .with_status(200)
            .with_body("feb\n")
            .create_async()
            .await;

        let auth = AuthSession::with_access_token(TOKEN);
        let client = DriveClient::with_endpoints(&auth, Endpoints::single(&server.url()));
        let out = tempfile::tempdir().unwrap();

        let meta = client.fetch_metadata("s1").await.unwrap();
        let target = OutputTarget::resolve(Some(out.path()));
        let plan = plan_export(&meta, false, &target).unwrap();

        let policy = RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(10),
            inter_request_delay: Duration::from_millis(10),
        };
        let sleeper = RecordingSleeper::new();
        let summary = execute_plan(&plan, &client, &FsWriter, &sleeper, &policy).await;

        assert!(summary.is_success());
        let dir = out.path().join("Q1_ Budget");
        assert_eq!(std::fs::read_to_string(dir.join("Jan.csv")).unwrap(), "jan\n");
        assert_eq!(std::fs::read_to_string(dir.join("Feb.csv")).unwrap(), "feb\n");
        assert_eq!(sleeper.calls(), vec![Duration::from_millis(10)]);
    }
}
