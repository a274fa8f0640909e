//! # Resource and Login Flows
//!
//! Generated payloads against a live mock server, checked with the same
//! schema catalog on both sides of the wire.

use std::sync::Arc;

use apicheck_client::{
    expect_status, validate_body, ApiSession, CredentialCache, Credentials, HarnessConfig, Method,
};
use apicheck_core::{ApiError, ErrorKind, Keyword};
use apicheck_gen::{Mutation, PayloadGenerator};
use apicheck_mock::{spawn, AppState, RunningMock, MOCK_PASSWORD, MOCK_USERNAME};
use apicheck_schema::{catalog, SchemaRegistry};
use serde_json::{json, Value};

fn registry() -> Arc<SchemaRegistry> {
    Arc::new(SchemaRegistry::builtin().unwrap())
}

async fn start() -> (RunningMock, ApiSession) {
    let mock = spawn(AppState::new().unwrap()).await.unwrap();
    let config = HarnessConfig::local_mock(mock.port(), Credentials::new(MOCK_USERNAME, MOCK_PASSWORD)).unwrap();
    let session = ApiSession::with_cache(config, Arc::new(CredentialCache::new())).unwrap();
    (mock, session)
}

// ── /api/resources ───────────────────────────────────────────────────

#[tokio::test]
async fn generated_resource_survives_full_crud() {
    let (mock, session) = start().await;
    let registry = registry();
    let mut gen = PayloadGenerator::with_seed(registry.clone(), 7);
    let resources = session.resource("/api/resources").unauthenticated();

    let payload = gen.generate(catalog::RESOURCE_CREATE_REQUEST).unwrap();
    let created = resources
        .clone()
        .with_response_schema(registry.clone(), catalog::RESOURCE_CREATE_RESPONSE)
        .create(&payload)
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["name"], payload["name"]);
    assert!(mock.state().resources().contains_key(&id));

    let fetched = resources.read(&id).await.unwrap();
    assert_eq!(fetched, created);

    let change = gen.generate(catalog::RESOURCE_UPDATE_REQUEST).unwrap();
    let updated = resources
        .clone()
        .with_response_schema(registry.clone(), catalog::RESOURCE_UPDATE_RESPONSE)
        .update(&id, &change)
        .await
        .unwrap();
    assert_eq!(updated["id"], id.as_str());
    assert_eq!(updated["updateReason"], change["updateReason"]);

    resources.delete(&id).await.unwrap();
    let err = resources.read(&id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Request);
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn active_resource_without_activation_date_is_rejected() {
    let (_mock, session) = start().await;
    let registry = registry();
    let mut gen = PayloadGenerator::with_seed(registry, 11);

    let payload = gen
        .generate_mutated(
            catalog::RESOURCE_CREATE_REQUEST,
            &[
                Mutation::set("status", "active"),
                Mutation::set("activationDate", "2024-06-01T08:00:00Z"),
                Mutation::remove("activationDate"),
            ],
        )
        .unwrap();

    let resp = session
        .resource("/api/resources")
        .unauthenticated()
        .create_raw(&payload)
        .await
        .unwrap();
    expect_status(&resp, 400).unwrap();
    let errors = resp.json().unwrap()["errors"].as_array().cloned().unwrap();
    assert!(errors.iter().any(|e| {
        e["keyword"] == "dependentRequired" && e["context"]["missingProperty"] == "activationDate"
    }));
}

#[tokio::test]
async fn create_expecting_201_surfaces_400_as_request_error() {
    let (_mock, session) = start().await;
    let err = session
        .resource("/api/resources")
        .unauthenticated()
        .create(&json!({"status": "active"}))
        .await
        .unwrap_err();
    match err {
        ApiError::Request { method, status, body, .. } => {
            assert_eq!(method, "POST");
            assert_eq!(status, Some(400));
            assert!(body.contains("errors"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn name_length_boundary_is_enforced_by_server() {
    let (_mock, session) = start().await;
    let resources = session.resource("/api/resources").unauthenticated();

    let at_limit = json!({"name": "n".repeat(50)});
    let resp = resources.create_raw(&at_limit).await.unwrap();
    assert_eq!(resp.status, 201);

    let over = json!({"name": "n".repeat(51)});
    let resp = resources.create_raw(&over).await.unwrap();
    assert_eq!(resp.status, 400);
    let body = resp.json().unwrap();
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["keyword"], Keyword::MaxLength.as_str());
    assert_eq!(errors[0]["path"], "/name");
}

// ── /api/login ───────────────────────────────────────────────────────

async fn login(session: &ApiSession, body: Value) -> apicheck_client::ApiResponse {
    session
        .resource("/api/login")
        .unauthenticated()
        .send_raw(Method::POST, None, Some(&body))
        .await
        .unwrap()
}

#[tokio::test]
async fn login_outcomes() {
    let (_mock, session) = start().await;
    let registry = registry();

    let ok = login(&session, json!({"username": MOCK_USERNAME, "password": MOCK_PASSWORD})).await;
    expect_status(&ok, 200).unwrap();
    let body = validate_body(&ok, &registry, catalog::LOGIN_RESPONSE).unwrap().unwrap();
    assert_eq!(body["message"], "Login successful");

    let cases = [
        (json!({"password": "testData"}), 400, "both are required for login"),
        (json!({"username": "elevenchars", "password": "testData"}), 400, "user name can not be more than 10 character"),
        (json!({"username": "testData", "password": "1234"}), 400, "password can not be less than 5 character"),
        (json!({"username": "testData", "password": "wrong-one"}), 401, "Invalid credentials"),
    ];
    for (body, status, message) in cases {
        let resp = login(&session, body).await;
        assert_eq!(resp.status, status, "{}", resp.body);
        assert_eq!(resp.json().unwrap()["error"], message);
    }
}

#[tokio::test]
async fn generated_login_request_is_accepted_by_schema() {
    let registry = registry();
    let mut gen = PayloadGenerator::with_seed(registry.clone(), 3);
    let payload = gen.generate(catalog::LOGIN_REQUEST).unwrap();
    let compiled = registry
        .validator(catalog::LOGIN_REQUEST, apicheck_schema::CoercionPolicy::Strict)
        .unwrap();
    assert!(compiled.check(&payload).valid);
}

// ── /api/register ────────────────────────────────────────────────────

#[tokio::test]
async fn generated_user_registers() {
    let (mock, session) = start().await;
    let mut gen = PayloadGenerator::with_seed(registry(), 21);
    let user = gen.generate(catalog::USER_REGISTER_REQUEST).unwrap();

    let resp = session
        .resource("/api/register")
        .unauthenticated()
        .send_raw(Method::POST, None, Some(&user))
        .await
        .unwrap();
    expect_status(&resp, 201).unwrap();
    assert_eq!(resp.json().unwrap()["user"], user);
    assert_eq!(mock.state().users().len(), 1);
}
