//! HTTP plugin transport against a mock account-collector.

use account_sync::config::{PluginConfig, PluginEndpointConfig};
use account_sync::error::SyncError;
use account_sync::models::provider::PluginInfo;
use account_sync::plugins::{HttpPluginTransport, PluginTransport, SyncRequest};
use serde_json::{Map, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport(server: &MockServer) -> HttpPluginTransport {
    HttpPluginTransport::from_config(&PluginConfig {
        endpoints: vec![PluginEndpointConfig {
            plugin_id: "plugin-aws".to_string(),
            endpoint: format!("{}/", server.uri()),
            version: Some("1.0".to_string()),
        }],
        connect_timeout_ms: 1000,
    })
    .expect("client builds")
}

fn plugin_info() -> PluginInfo {
    PluginInfo {
        plugin_id: Some("plugin-aws".to_string()),
        version: Some("2.1".to_string()),
        ..Default::default()
    }
}

fn sync_request() -> SyncRequest {
    let mut secret_data = Map::new();
    secret_data.insert("aws_access_key_id".to_string(), json!("AKIATEST"));
    SyncRequest {
        options: Map::new(),
        secret_data,
        domain_id: "domain-test".to_string(),
        schema_id: Some("aws_access_key".to_string()),
    }
}

#[tokio::test]
async fn init_and_sync_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/account-collector/init"))
        .and(header("X-Plugin-Version", "2.1"))
        .and(body_partial_json(json!({ "options": { "region": "eu-west-1" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "metadata": {} })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/account-collector/sync"))
        .and(body_partial_json(json!({
            "domain_id": "domain-test",
            "secret_data": { "aws_access_key_id": "AKIATEST" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{
                "name": "acct-1",
                "resource_id": "r1",
                "location": [{ "name": "ws-a", "resource_id": "w1" }],
                "secret_data": { "key": "abc" },
                "secret_schema_id": "aws_assume_role"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport(&server);
    let endpoint = transport
        .resolve_endpoint(&plugin_info(), "domain-test")
        .await
        .unwrap();
    assert_eq!(endpoint.endpoint, server.uri());
    assert_eq!(endpoint.version.as_deref(), Some("2.1"));

    let mut options = Map::new();
    options.insert("region".to_string(), json!("eu-west-1"));
    transport.init(&endpoint, &options).await.unwrap();

    let response = transport.sync(&endpoint, &sync_request()).await.unwrap();
    assert_eq!(response.results.len(), 1);
    let record = &response.results[0];
    assert_eq!(record.name, "acct-1");
    assert_eq!(record.location[0].resource_id, "w1");
    assert!(record.secret_material().is_some());
}

#[tokio::test]
async fn non_success_status_is_plugin_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/account-collector/sync"))
        .respond_with(ResponseTemplate::new(503).set_body_string("collector overloaded"))
        .mount(&server)
        .await;

    let transport = transport(&server);
    let endpoint = transport
        .resolve_endpoint(&plugin_info(), "domain-test")
        .await
        .unwrap();
    let err = transport.sync(&endpoint, &sync_request()).await.unwrap_err();

    match err {
        SyncError::PluginInvocation(message) => {
            assert!(message.contains("503"));
            assert!(message.contains("collector overloaded"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_sync_body_is_plugin_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/account-collector/sync"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let transport = transport(&server);
    let endpoint = transport
        .resolve_endpoint(&plugin_info(), "domain-test")
        .await
        .unwrap();
    let err = transport.sync(&endpoint, &sync_request()).await.unwrap_err();
    assert!(matches!(err, SyncError::PluginInvocation(_)));
}

#[tokio::test]
async fn unknown_plugin_cannot_be_resolved() {
    let server = MockServer::start().await;
    let transport = transport(&server);

    let info = PluginInfo {
        plugin_id: Some("plugin-gcp".to_string()),
        ..Default::default()
    };
    let err = transport
        .resolve_endpoint(&info, "domain-test")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ERROR_PLUGIN_INVOCATION");
}
