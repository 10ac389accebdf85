//! Integration tests for the export pipeline.
//!
//! These tests run full exports against mock HTTP servers and write into
//! temporary directories.

use std::path::Path;
use std::sync::Arc;

use media_export::{
    ExportConfig, ExportError, Exporter, FetchOutcome, FilenameStrategy, HttpClient, LocalDisk,
    SourceProfile,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Pattern matching the mock server's loopback URLs.
const LOOPBACK_PATTERN: &str = r"127\.0\.0\.1";

/// Mounts a GET endpoint that must be hit exactly `hits` times.
async fn mount_file(server: &MockServer, path_str: &str, body: &[u8], hits: u64) {
    Mock::given(method("GET"))
        .and(path(path_str))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(hits)
        .mount(server)
        .await;
}

fn media_dir(temp_dir: &TempDir) -> String {
    format!("{}/", temp_dir.path().join("media").display())
}

fn host_pattern_config(temp_dir: &TempDir) -> ExportConfig {
    ExportConfig {
        data_path: temp_dir.path().join("data.json"),
        media_disk_path: media_dir(temp_dir),
        media_reference_path: "media/".to_string(),
        source: SourceProfile::HostPattern {
            pattern: LOOPBACK_PATTERN.to_string(),
            filename: FilenameStrategy::LastTwoSegments,
            annotate_original_urls: false,
        },
        ..ExportConfig::default()
    }
}

fn directus_config(temp_dir: &TempDir, base_url: &str) -> ExportConfig {
    ExportConfig {
        data_path: temp_dir.path().join("data.json"),
        media_disk_path: media_dir(temp_dir),
        media_reference_path: "media/".to_string(),
        source: SourceProfile::Directus {
            base_url: base_url.to_string(),
        },
        ..ExportConfig::default()
    }
}

fn exporter(config: ExportConfig) -> Exporter {
    let client = HttpClient::new().expect("client builds");
    Exporter::new(config, Arc::new(client), Arc::new(LocalDisk)).expect("valid config")
}

fn read_json(path: &Path) -> Value {
    let text = std::fs::read_to_string(path).expect("output written");
    serde_json::from_str(&text).expect("output is JSON")
}

#[tokio::test]
async fn test_export_rewrites_document_and_mirrors_media() {
    let mock_server = MockServer::start().await;
    mount_file(&mock_server, "/x/photo.png", b"PNG bytes", 1).await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let document = json!({
        "a": format!("{}/x/photo.png", mock_server.uri()),
        "b": 2
    });
    let report = exporter(host_pattern_config(&temp_dir))
        .run(&document)
        .await
        .expect("export succeeds");

    assert_eq!(report.document, json!({"a": "media/x-photo.png", "b": 2}));
    assert_eq!(report.summary.downloaded, 1);
    assert_eq!(report.summary.failed, 0);
    assert_eq!(read_json(&report.data_path), report.document);

    let media = std::fs::read(temp_dir.path().join("media/x-photo.png")).expect("media written");
    assert_eq!(media, b"PNG bytes");
}

#[tokio::test]
async fn test_export_fetches_repeated_url_once() {
    let mock_server = MockServer::start().await;
    mount_file(&mock_server, "/brand/logo.svg", b"<svg/>", 1).await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let logo = format!("{}/brand/logo.svg", mock_server.uri());
    let document = json!({
        "header": {"logo": logo},
        "footer": {"logo": logo},
        "pages": [{"icon": logo}]
    });
    let report = exporter(host_pattern_config(&temp_dir))
        .run(&document)
        .await
        .expect("export succeeds");

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.document["footer"]["logo"], "media/brand-logo.svg");
    assert_eq!(report.document["pages"][0]["icon"], "media/brand-logo.svg");
}

#[tokio::test]
async fn test_second_export_skips_existing_media() {
    let mock_server = MockServer::start().await;
    mount_file(&mock_server, "/p/1.jpg", b"one", 1).await;
    mount_file(&mock_server, "/p/2.jpg", b"two", 1).await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let document = json!([
        format!("{}/p/1.jpg", mock_server.uri()),
        format!("{}/p/2.jpg", mock_server.uri())
    ]);
    let exporter = exporter(host_pattern_config(&temp_dir));

    let first = exporter.run(&document).await.expect("first export");
    assert_eq!(first.summary.downloaded, 2);

    let second = exporter.run(&document).await.expect("second export");
    assert_eq!(second.summary.skipped, 2);
    assert_eq!(second.summary.downloaded, 0);
    assert!(
        second
            .results
            .iter()
            .all(|r| matches!(r.outcome, FetchOutcome::Skipped))
    );
    assert_eq!(second.document, first.document);
    // Mock expectations (one hit per file) are verified when the server drops.
}

#[tokio::test]
async fn test_export_without_skip_redownloads() {
    let mock_server = MockServer::start().await;
    mount_file(&mock_server, "/p/1.jpg", b"fresh", 2).await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let config = ExportConfig {
        skip_existing_files: false,
        ..host_pattern_config(&temp_dir)
    };
    let exporter = exporter(config);
    let document = json!({"p": format!("{}/p/1.jpg", mock_server.uri())});

    exporter.run(&document).await.expect("first export");
    let second = exporter.run(&document).await.expect("second export");

    assert_eq!(second.summary.downloaded, 1);
    assert_eq!(second.summary.skipped, 0);
}

#[tokio::test]
async fn test_directus_item_exports_reference_string() {
    let mock_server = MockServer::start().await;
    mount_file(&mock_server, "/u/1", b"cat", 1).await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let config = ExportConfig {
        source: SourceProfile::FileObject {
            file_table: "files".to_string(),
            base_url: mock_server.uri(),
            filename: FilenameStrategy::LastSegment,
        },
        ..directus_config(&temp_dir, "")
    };
    let document = json!({
        "cover": {
            "meta": {"type": "item", "table": "files"},
            "data": {"url": "/u/1", "name": "cat.jpg"}
        }
    });

    let report = exporter(config).run(&document).await.expect("export succeeds");

    assert_eq!(report.document, json!({"cover": "media/cat.jpg"}));
    assert_eq!(
        report.results[0].descriptor.external_url,
        format!("{}/u/1", mock_server.uri())
    );
    let media = std::fs::read(temp_dir.path().join("media/cat.jpg")).expect("media written");
    assert_eq!(media, b"cat");
}

#[tokio::test]
async fn test_directus_item_exports_full_object() {
    let mock_server = MockServer::start().await;
    mount_file(&mock_server, "/u/1", b"cat", 1).await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let config = ExportConfig {
        return_full_objects: true,
        source: SourceProfile::FileObject {
            file_table: "files".to_string(),
            base_url: mock_server.uri(),
            filename: FilenameStrategy::LastSegment,
        },
        ..directus_config(&temp_dir, "")
    };
    let document = json!({
        "meta": {"type": "item", "table": "files"},
        "data": {"url": "/u/1", "name": "cat.jpg"}
    });

    let report = exporter(config).run(&document).await.expect("export succeeds");

    assert_eq!(
        report.document,
        json!({
            "meta": {"type": "item", "table": "files"},
            "data": {"url": "media/cat.jpg", "name": "cat.jpg"}
        })
    );
    assert_eq!(read_json(&report.data_path), report.document);
}

#[tokio::test]
async fn test_collection_with_missing_file_still_writes_document() {
    let mock_server = MockServer::start().await;
    mount_file(&mock_server, "/files/1", b"first", 1).await;
    mount_file(&mock_server, "/files/3", b"third", 1).await;
    Mock::given(method("GET"))
        .and(path("/files/2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let document = json!({
        "gallery": {
            "meta": {"type": "collection", "table": "directus_files", "total": 3},
            "data": [
                {"id": 1, "url": "/files/1", "name": "one.png"},
                {"id": 2, "url": "/files/2", "name": "two.png"},
                {"id": 3, "url": "/files/3", "name": "three.png"}
            ]
        }
    });
    let report = exporter(directus_config(&temp_dir, &mock_server.uri()))
        .run(&document)
        .await
        .expect("partial failures do not abort the export");

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.summary.downloaded, 2);
    assert_eq!(report.summary.failed, 1);
    let failed: Vec<&str> = report
        .results
        .iter()
        .filter(|r| r.is_failed())
        .map(|r| r.descriptor.filename.as_str())
        .collect();
    assert_eq!(failed, ["two.png"]);

    let written = read_json(&temp_dir.path().join("data.json"));
    assert_eq!(written["gallery"]["data"][1]["url"], "media/two.png");
    assert_eq!(written["gallery"]["meta"]["total"], 3);
    assert!(temp_dir.path().join("media/one.png").exists());
    assert!(!temp_dir.path().join("media/two.png").exists());
    assert!(temp_dir.path().join("media/three.png").exists());
}

#[tokio::test]
async fn test_pretty_output_uses_four_space_indent() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let config = ExportConfig {
        prettify_json: true,
        ..host_pattern_config(&temp_dir)
    };

    let report = exporter(config)
        .run(&json!({"title": "no media"}))
        .await
        .expect("export succeeds");

    let text = std::fs::read_to_string(&report.data_path).expect("output written");
    assert_eq!(text, "{\n    \"title\": \"no media\"\n}");
    assert_eq!(report.summary.total(), 0);
}

#[tokio::test]
async fn test_output_parent_directories_created() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let config = ExportConfig {
        data_path: temp_dir.path().join("site/_data/book.json"),
        ..host_pattern_config(&temp_dir)
    };

    let report = exporter(config)
        .run(&json!({"k": [1, 2, 3]}))
        .await
        .expect("export succeeds");

    assert_eq!(read_json(&report.data_path), json!({"k": [1, 2, 3]}));
}

#[tokio::test]
async fn test_too_deep_document_aborts_before_writing() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let config = ExportConfig {
        max_nesting_depth: 4,
        ..host_pattern_config(&temp_dir)
    };
    let document = json!([[[[[["deep"]]]]]]);

    let result = exporter(config).run(&document).await;

    assert!(matches!(result, Err(ExportError::Rewrite(_))));
    assert!(!temp_dir.path().join("data.json").exists());
}

#[test]
fn test_invalid_config_rejected_by_exporter() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let config = ExportConfig {
        concurrency: 0,
        ..host_pattern_config(&temp_dir)
    };
    let client = HttpClient::new().expect("client builds");

    let result = Exporter::new(config, Arc::new(client), Arc::new(LocalDisk));

    assert!(matches!(result, Err(ExportError::Config(_))));
}
