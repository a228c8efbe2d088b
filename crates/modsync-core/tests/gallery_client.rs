//! `GalleryClient` against a mock OData feed.

use std::sync::Arc;

use serde_json::json;
use tokio::runtime::Runtime;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use modsync_core::error::ServiceError;
use modsync_core::gallery::{GalleryClient, ModuleGallery};
use modsync_core::http::HttpTransport;
use modsync_core::types::{Credential, ModuleVersion, RepositoryHandle};

const FEED_PATH: &str = "/api/v2/FindPackagesById()";

fn mock_feed() -> (Runtime, MockServer) {
    let runtime = Runtime::new().unwrap();
    let server = runtime.block_on(MockServer::start());
    (runtime, server)
}

fn client() -> GalleryClient {
    GalleryClient::new(Arc::new(HttpTransport::new().unwrap()))
}

fn repository(server: &MockServer) -> RepositoryHandle {
    RepositoryHandle {
        name: "MyModule-repository".to_string(),
        source_location: format!("{}/api/v2", server.uri()),
        credential: None,
    }
}

#[test]
fn follows_next_links_across_pages() {
    let (runtime, server) = mock_feed();
    runtime.block_on(
        Mock::given(method("GET"))
            .and(path(FEED_PATH))
            .and(query_param("id", "'MyModule'"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "d": {
                    "results": [
                        {"Id": "MyModule", "Version": "1.0.0"},
                        {"Id": "MyModule", "Version": "1.1.0"}
                    ],
                    "__next": format!("{}/api/v2/feed-page-2", server.uri())
                }
            })))
            .mount(&server),
    );
    runtime.block_on(
        Mock::given(method("GET"))
            .and(path("/api/v2/feed-page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "d": {
                    "results": [
                        {"Id": "MyModule", "Version": "2.0.0"},
                        {"Id": "MyModule", "Version": "2.1.0-beta1", "IsPrerelease": true}
                    ]
                }
            })))
            .mount(&server),
    );

    let found = client()
        .find_module("MyModule", &repository(&server), None, None)
        .unwrap()
        .unwrap();

    assert_eq!(found.version, ModuleVersion::parse("2.0.0").unwrap());
    let requests = runtime.block_on(server.received_requests()).unwrap();
    assert_eq!(requests.len(), 2);
}

#[test]
fn finds_exact_version_with_bearer_credential() {
    let (runtime, server) = mock_feed();
    runtime.block_on(
        Mock::given(method("GET"))
            .and(path(FEED_PATH))
            .and(header("authorization", "Bearer opaque-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "d": [
                    {"Id": "MyModule", "Version": "1.0.0"},
                    {"Id": "MyModule", "Version": "2.0.0"}
                ]
            })))
            .mount(&server),
    );

    let required = ModuleVersion::parse("1.0.0").unwrap();
    let credential = Credential::new("opaque-token");
    let found = client()
        .find_module("MyModule", &repository(&server), Some(&required), Some(&credential))
        .unwrap()
        .unwrap();

    assert_eq!(found.version.as_str(), "1.0.0");
}

#[test]
fn unknown_package_is_none() {
    let (_runtime, server) = mock_feed();

    let found = client()
        .find_module("Missing", &repository(&server), None, None)
        .unwrap();

    assert!(found.is_none());
}

#[test]
fn server_error_is_reported_with_status() {
    let (runtime, server) = mock_feed();
    runtime.block_on(
        Mock::given(method("GET"))
            .and(path(FEED_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server),
    );

    let err = client()
        .find_module("MyModule", &repository(&server), None, None)
        .unwrap_err();

    match err {
        ServiceError::Status { method, status, body, .. } => {
            assert_eq!(method, "GET");
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn undecodable_feed_is_a_decode_error() {
    let (runtime, server) = mock_feed();
    runtime.block_on(
        Mock::given(method("GET"))
            .and(path(FEED_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<feed/>"))
            .mount(&server),
    );

    let err = client()
        .find_module("MyModule", &repository(&server), None, None)
        .unwrap_err();

    assert!(matches!(err, ServiceError::Decode { .. }));
}
