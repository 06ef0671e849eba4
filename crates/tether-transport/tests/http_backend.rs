//! HTTP handlers against wiremock servers

use assert_matches::assert_matches;
use serde_json::json;
use std::sync::Arc;
use tether_core::{
    AccessToken, AuditConfig, AuditEffects, AuditRecord, AuditReference, CredentialKind,
    GatewayPatch, GatewayRegistration, HttpConfig, IdentityRegistryEffects, Owner,
    RadioPlaneEffects, RemoteOutcome, RightSet, StepName, TetherError, Topology,
};
use tether_provision::{ReconcileState, Reconciler};
use tether_testkit::{
    lns_request, test_desired_state, test_identity, RecordingArtifactWriter, TEST_DEVICE_ID,
};
use tether_transport::{HttpGatewayBackend, PostgrestAuditStore, GATEWAY_FIELD_MASK};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "NNSXS.TESTTOKEN";

fn topology(identity: &MockServer, radio: &MockServer) -> Topology {
    Topology::new(identity.uri(), radio.uri(), "nam1.cloud.thethings.network").unwrap()
}

fn backend(identity: &MockServer, radio: &MockServer) -> HttpGatewayBackend {
    HttpGatewayBackend::new(
        &AccessToken::new(TOKEN).unwrap(),
        topology(identity, radio),
        &HttpConfig::default(),
    )
    .unwrap()
}

fn gateway_path(suffix: &str) -> String {
    format!("/api/v3/gateways/{TEST_DEVICE_ID}{suffix}")
}

#[tokio::test]
async fn read_sends_field_mask_and_bearer() {
    let identity = MockServer::start().await;
    let radio = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(gateway_path("")))
        .and(query_param("field_mask", GATEWAY_FIELD_MASK))
        .and(header("Authorization", format!("Bearer {TOKEN}").as_str()))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ids": {"gateway_id": TEST_DEVICE_ID},
            "gateway_server_address": "nam1.cloud.thethings.network"
        })))
        .expect(1)
        .mount(&identity)
        .await;

    let response = backend(&identity, &radio)
        .get_gateway(&test_identity().device_id)
        .await;

    assert!(response.ok);
    assert_eq!(
        response.body["gateway_server_address"],
        "nam1.cloud.thethings.network"
    );
}

#[tokio::test]
async fn missing_gateway_is_not_found() {
    let identity = MockServer::start().await;
    let radio = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(gateway_path("")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"code": 5})))
        .mount(&identity)
        .await;

    let response = backend(&identity, &radio)
        .get_gateway(&test_identity().device_id)
        .await;

    assert_eq!(response.outcome(), RemoteOutcome::NotFound);
}

#[tokio::test]
async fn registration_posts_under_organization() {
    let identity = MockServer::start().await;
    let radio = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/organizations/cold-chain/gateways"))
        .and(body_partial_json(json!({
            "gateway": {
                "ids": {"gateway_id": TEST_DEVICE_ID, "eui": "00800000A00009EF"},
                "gateway_server_address": "nam1.cloud.thethings.network",
                "frequency_plan_ids": ["US_902_928_FSB_2"]
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ids": {"gateway_id": TEST_DEVICE_ID}})))
        .expect(1)
        .mount(&identity)
        .await;

    let backend = backend(&identity, &radio);
    let desired = test_desired_state();
    let registration = GatewayRegistration::from_desired(&desired, &topology(&identity, &radio));
    let response = backend
        .register_gateway(&Owner::organization("cold-chain"), &registration)
        .await;

    assert!(response.ok);
    assert_eq!(response.status, 201);
}

#[tokio::test]
async fn registration_refuses_owner_ids_that_escape_the_path() {
    let identity = MockServer::start().await;
    let radio = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&identity)
        .await;

    let backend = backend(&identity, &radio);
    let registration =
        GatewayRegistration::from_desired(&test_desired_state(), &topology(&identity, &radio));
    let response = backend
        .register_gateway(&Owner::user("ops/../../gateways/victim?x="), &registration)
        .await;

    assert!(!response.ok);
    assert_eq!(response.outcome(), RemoteOutcome::TransportFailure);
    assert!(identity.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn pointer_update_names_only_the_pointer() {
    let identity = MockServer::start().await;
    let radio = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(gateway_path("")))
        .and(body_partial_json(json!({
            "gateway": {
                "ids": {"gateway_id": TEST_DEVICE_ID},
                "gateway_server_address": "nam1.cloud.thethings.network"
            },
            "field_mask": {"paths": ["gateway_server_address"]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&identity)
        .await;

    let response = backend(&identity, &radio)
        .update_gateway(
            &test_identity().device_id,
            &GatewayPatch::ServerPointer("nam1.cloud.thethings.network".into()),
        )
        .await;

    assert!(response.ok);
    let requests = identity.received_requests().await.unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["gateway"].as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn delete_and_purge_use_distinct_paths() {
    let identity = MockServer::start().await;
    let radio = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(gateway_path("")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&identity)
        .await;
    Mock::given(method("DELETE"))
        .and(path(gateway_path("/purge")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&identity)
        .await;

    let backend = backend(&identity, &radio);
    let device_id = test_identity().device_id;
    let deleted = backend.delete_gateway(&device_id).await;
    let purged = backend.purge_gateway(&device_id).await;

    assert!(deleted.ok);
    assert_eq!(deleted.body, json!({}));
    assert!(purged.ok);
}

#[tokio::test]
async fn api_key_creation_sends_label_and_rights() {
    let identity = MockServer::start().await;
    let radio = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(gateway_path("/api-keys")))
        .and(body_partial_json(json!({
            "name": "Tether LNS Key - 20260101",
            "rights": ["RIGHT_GATEWAY_LINK"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "KEYID01",
            "key": "NNSXS.SECRET"
        })))
        .mount(&identity)
        .await;

    let response = backend(&identity, &radio)
        .create_api_key(
            &test_identity().device_id,
            "Tether LNS Key - 20260101",
            &RightSet::new(["RIGHT_GATEWAY_LINK"]),
        )
        .await;

    assert!(response.ok);
    assert_eq!(response.body["id"], "KEYID01");
}

#[tokio::test]
async fn connection_stats_go_to_radio_plane() {
    let identity = MockServer::start().await;
    let radio = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/api/v3/gs/gateways/{TEST_DEVICE_ID}/connection/stats"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "connected_at": "2026-01-01T00:00:00Z",
            "protocol": "ws"
        })))
        .expect(1)
        .mount(&radio)
        .await;

    let response = backend(&identity, &radio)
        .connection_stats(&test_identity().device_id)
        .await;

    assert!(response.ok);
    assert!(identity.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn non_json_body_is_not_ok() {
    let identity = MockServer::start().await;
    let radio = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>down for maintenance</html>"))
        .mount(&identity)
        .await;

    let response = backend(&identity, &radio)
        .list_api_keys(&test_identity().device_id)
        .await;

    assert!(!response.ok);
    assert_eq!(response.status, 200);
    assert_eq!(response.body["raw"], "<html>down for maintenance</html>");
}

#[tokio::test]
async fn unreachable_server_is_transport_failure() {
    let topology = Topology::new(
        "http://127.0.0.1:9",
        "http://127.0.0.1:9",
        "nam1.cloud.thethings.network",
    )
    .unwrap();
    let backend = HttpGatewayBackend::new(
        &AccessToken::new(TOKEN).unwrap(),
        topology,
        &HttpConfig::default(),
    )
    .unwrap();

    let response = backend.get_gateway(&test_identity().device_id).await;

    assert_eq!(response.status, 0);
    assert_eq!(response.outcome(), RemoteOutcome::TransportFailure);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn reconciler_runs_end_to_end_over_http() {
    let identity = MockServer::start().await;
    let radio = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(gateway_path("")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"code": 5})))
        .mount(&identity)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v3/users/field-ops/gateways"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .expect(1)
        .mount(&identity)
        .await;
    Mock::given(method("POST"))
        .and(path(gateway_path("/api-keys")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "KEYID01",
            "key": "NNSXS.E2ESECRET"
        })))
        .expect(1)
        .mount(&identity)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/api/v3/gs/gateways/{TEST_DEVICE_ID}/connection/stats"
        )))
        .respond_with(ResponseTemplate::new(404))
        .mount(&radio)
        .await;

    let writer = RecordingArtifactWriter::new();
    let reconciler = Reconciler::new(
        Arc::new(backend(&identity, &radio)),
        topology(&identity, &radio),
        Arc::new(writer.clone()),
    );
    let report = reconciler
        .reconcile(&test_desired_state().with_credential(lns_request()))
        .await;

    assert_eq!(report.state, ReconcileState::Verified);
    assert_eq!(report.log.succeeded_count(), 3);
    assert!(report.log.attempted(StepName::CreateKey(CredentialKind::Lns)));
    assert_eq!(writer.secrets(), vec!["NNSXS.E2ESECRET".to_string()]);
    assert!(!report.log.to_json_pretty().unwrap().contains("E2ESECRET"));
}

fn audit_record() -> AuditRecord {
    let desired = test_desired_state().with_audit(AuditReference {
        organization_id: "org-1".into(),
        site_id: None,
    });
    AuditRecord::from_desired(&desired, "nam1.cloud.thethings.network").unwrap()
}

fn audit_store(server: &MockServer) -> PostgrestAuditStore {
    let config = AuditConfig {
        url: format!("{}/rest/v1", server.uri()),
        table: "gateways".into(),
    };
    PostgrestAuditStore::new(
        &config,
        &AccessToken::new("service-role-key").unwrap(),
        &HttpConfig::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn audit_upsert_uses_conflict_key_and_service_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/gateways"))
        .and(query_param("on_conflict", "organization_id,gateway_eui"))
        .and(header("apikey", "service-role-key"))
        .and(header("Authorization", "Bearer service-role-key"))
        .and(header("Prefer", "resolution=merge-duplicates"))
        .and(body_partial_json(json!({
            "organization_id": "org-1",
            "gateway_eui": "00800000A00009EF",
            "status": "pending"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    audit_store(&server)
        .upsert_gateway(&audit_record())
        .await
        .unwrap();
}

#[tokio::test]
async fn audit_rejection_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "JWT expired"})))
        .mount(&server)
        .await;

    let err = audit_store(&server)
        .upsert_gateway(&audit_record())
        .await
        .unwrap_err();

    assert_matches!(err, TetherError::RemoteRejection { status: 401, .. });
}

#[test]
fn audit_store_rejects_non_http_url() {
    let config = AuditConfig {
        url: "postgres://db".into(),
        table: "gateways".into(),
    };
    let result = PostgrestAuditStore::new(
        &config,
        &AccessToken::new("key").unwrap(),
        &HttpConfig::default(),
    );
    assert_matches!(result, Err(TetherError::Config { .. }));
}
