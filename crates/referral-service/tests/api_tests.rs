//! Integration tests for the referral service API.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use identity_client::{HttpIdentityDirectory, HttpPhoneValidator};
use notify_client::{MessageTemplate, SignalNotifier};
use referral_service::{
    api::{create_router_with_rate_limit, AppState, RateLimitState},
    config::FeedConfig,
    ChangeFeed,
};
use referral_store::{MemoryReferralStore, ReferralRecord, ReferralStore};
use referral_workflow::{ChangeBatch, ChangeRecord, ReferralDispatcher, SignupFinalizer, SignupGate};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PHONE: &str = "+15551230000";
const CODE: &str = "ABC123";

/// Upstream services, all served by one mock server.
struct Harness {
    upstream: MockServer,
    store: Arc<MemoryReferralStore>,
}

impl Harness {
    async fn new(records: Vec<ReferralRecord>) -> Self {
        Self {
            upstream: MockServer::start().await,
            store: Arc::new(MemoryReferralStore::with_records(records)),
        }
    }

    fn app(&self, rate_limit: RateLimitState) -> Router {
        let uri = self.upstream.uri();
        let timeout = Duration::from_secs(5);

        let notifier = Arc::new(SignalNotifier::new(&uri, "+15550000000", timeout).unwrap());
        let directory =
            Arc::new(HttpIdentityDirectory::new(&uri, "token", "pool-1", timeout).unwrap());
        let validator = Arc::new(HttpPhoneValidator::new(&uri, timeout).unwrap());
        let store: Arc<dyn ReferralStore> = self.store.clone();

        let gate = SignupGate::new(store.clone(), validator, directory.clone());
        let finalizer = SignupFinalizer::new(
            notifier.clone(),
            store.clone(),
            directory,
            MessageTemplate::new("Welcome, {####}!").unwrap(),
        );
        let dispatcher = Arc::new(ReferralDispatcher::new(
            notifier,
            MessageTemplate::new("Your code is {####}.").unwrap(),
        ));

        let feed_config = FeedConfig {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
            capacity: 8,
        };
        let (feed, _worker) = ChangeFeed::spawn(dispatcher.clone(), &feed_config);

        let state = AppState {
            store,
            gate: Arc::new(gate),
            finalizer: Arc::new(finalizer),
            dispatcher,
            feed,
        };
        create_router_with_rate_limit(state, rate_limit)
    }

    async fn mock_phone_type(&self, phone_type: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/phone/validate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cleansed_phone_number_e164": PHONE,
                "phone_type": phone_type
            })))
            .mount(&self.upstream)
            .await;
    }

    async fn mock_existing_users(&self, users: Value) {
        Mock::given(method("GET"))
            .and(path("/v1/pools/pool-1/users"))
            .and(query_param("phone_number", PHONE))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "users": users })))
            .mount(&self.upstream)
            .await;
    }

    async fn mock_send(&self, expected: u64) {
        Mock::given(method("POST"))
            .and(path("/v2/send"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "timestamp": "1" })))
            .expect(expected)
            .mount(&self.upstream)
            .await;
    }

    async fn sent_messages(&self) -> Vec<Value> {
        self.upstream
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == "/v2/send")
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read(response).await
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read(response).await
}

async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn pre_sign_up_event(referral_code: Option<&str>) -> Value {
    let mut event = json!({
        "version": "1",
        "triggerSource": "PreSignUp_SignUp",
        "userPoolId": "pool-1",
        "userName": "alice",
        "request": { "userAttributes": { "phone_number": PHONE } },
        "response": {}
    });
    if let Some(code) = referral_code {
        event["request"]["validationData"] = json!({ "referral_code": code });
    }
    event
}

#[tokio::test]
async fn test_health_endpoint() {
    let harness = Harness::new(vec![ReferralRecord::new(PHONE, CODE, "P1")]).await;

    let (status, json) = get(harness.app(RateLimitState::permissive()), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["referral_count"], 1);
}

#[tokio::test]
async fn test_pre_sign_up_approves_and_redeems() {
    let harness = Harness::new(vec![ReferralRecord::new(PHONE, CODE, "P1")]).await;
    harness.mock_phone_type("MOBILE").await;
    harness.mock_existing_users(json!([])).await;

    let (status, json) = post_json(
        harness.app(RateLimitState::permissive()),
        "/v1/triggers/pre-sign-up",
        pre_sign_up_event(Some(CODE)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["response"]["autoConfirmUser"], true);
    assert_eq!(json["response"]["autoVerifyPhone"], true);
    assert_eq!(json["request"]["userAttributes"]["referrer_id"], "P1");
    // Unknown fields survive the round trip
    assert_eq!(json["version"], "1");
    assert_eq!(harness.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_pre_sign_up_without_code_is_rejected() {
    let harness = Harness::new(vec![]).await;

    let (status, json) = post_json(
        harness.app(RateLimitState::permissive()),
        "/v1/triggers/pre-sign-up",
        pre_sign_up_event(None),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "SIGNUP_REJECTED");
    assert_eq!(json["error"], "Referral code missing from sign up.");
    // No upstream call is made for a missing code
    assert!(harness.upstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_pre_sign_up_reports_every_failure() {
    let harness = Harness::new(vec![]).await;
    harness.mock_phone_type("LANDLINE").await;
    harness
        .mock_existing_users(json!([{ "username": "bob", "status": "CONFIRMED" }]))
        .await;

    let (status, json) = post_json(
        harness.app(RateLimitState::permissive()),
        "/v1/triggers/pre-sign-up",
        pre_sign_up_event(Some(CODE)),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let reasons: Vec<&str> = json["reasons"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["reason"].as_str().unwrap())
        .collect();
    assert_eq!(
        reasons,
        vec![
            "PHONE_ALREADY_REGISTERED",
            "INVALID_OR_NON_MOBILE_PHONE",
            "INVALID_REFERRAL_CODE"
        ]
    );
}

#[tokio::test]
async fn test_pre_sign_up_upstream_failure_is_generic() {
    let harness = Harness::new(vec![ReferralRecord::new(PHONE, CODE, "P1")]).await;
    harness.mock_existing_users(json!([])).await;
    Mock::given(method("POST"))
        .and(path("/v1/phone/validate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&harness.upstream)
        .await;

    let (status, json) = post_json(
        harness.app(RateLimitState::permissive()),
        "/v1/triggers/pre-sign-up",
        pre_sign_up_event(Some(CODE)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"], "Internal error. Please try again.");
    // The code is not consumed when the checks could not complete
    assert_eq!(harness.store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_post_confirmation_welcomes_and_links() {
    let harness = Harness::new(vec![ReferralRecord::new(PHONE, CODE, "P1")]).await;
    harness.mock_send(1).await;
    Mock::given(method("POST"))
        .and(path("/v1/pools/pool-1/users/alice/attributes"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&harness.upstream)
        .await;

    let event = json!({
        "triggerSource": "PostConfirmation_ConfirmSignUp",
        "userPoolId": "pool-1",
        "userName": "alice",
        "request": { "userAttributes": { "phone_number": PHONE, "name": "Alice" } },
        "response": {}
    });

    let (status, json) = post_json(
        harness.app(RateLimitState::permissive()),
        "/v1/triggers/post-confirmation",
        event,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["userName"], "alice");
    let sent = harness.sent_messages().await;
    assert_eq!(sent[0]["message"], "Welcome, Alice!");
    assert_eq!(sent[0]["recipients"], json!([PHONE]));
}

#[tokio::test]
async fn test_sign_up_then_confirmation_links_redeemed_referrer() {
    let harness = Harness::new(vec![
        ReferralRecord::new(PHONE, "AAA111", "P_OTHER"),
        ReferralRecord::new(PHONE, CODE, "P1"),
    ])
    .await;
    harness.mock_phone_type("MOBILE").await;
    harness.mock_existing_users(json!([])).await;
    harness.mock_send(1).await;
    Mock::given(method("POST"))
        .and(path("/v1/pools/pool-1/users/alice/attributes"))
        .and(body_json(json!({
            "attributes": [{ "name": "referrer_id", "value": "P1" }]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&harness.upstream)
        .await;

    let (status, mut event) = post_json(
        harness.app(RateLimitState::permissive()),
        "/v1/triggers/pre-sign-up",
        pre_sign_up_event(Some(CODE)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    event["triggerSource"] = json!("PostConfirmation_ConfirmSignUp");
    let (status, _) = post_json(
        harness.app(RateLimitState::permissive()),
        "/v1/triggers/post-confirmation",
        event,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        harness.store.query_by_phone(PHONE).await.unwrap(),
        Some(ReferralRecord::new(PHONE, "AAA111", "P_OTHER"))
    );
}

#[tokio::test]
async fn test_stream_batch_dispatches_inserts() {
    let harness = Harness::new(vec![]).await;
    harness.mock_send(1).await;

    let record = ReferralRecord::new(PHONE, CODE, "P1");
    let mut modify = ChangeRecord::insert(&record);
    modify.event_name = "MODIFY".into();
    let batch = ChangeBatch {
        records: vec![ChangeRecord::insert(&record), modify],
    };

    let (status, json) = post_json(
        harness.app(RateLimitState::permissive()),
        "/v1/streams/referrals",
        serde_json::to_value(&batch).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["dispatched"], 1);
    assert_eq!(json["skipped"], 1);
    assert_eq!(
        harness.sent_messages().await[0]["message"],
        "Your code is ABC123."
    );
}

#[tokio::test]
async fn test_create_referral_queues_invitation() {
    let harness = Harness::new(vec![]).await;
    harness.mock_send(1).await;

    let (status, json) = post_json(
        harness.app(RateLimitState::permissive()),
        "/v1/referrals",
        json!({ "phone_number": "+1 (555) 123-0000", "referral_code": CODE, "principal_id": "P1" }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["phone_number"], PHONE);
    assert_eq!(
        harness.store.get(PHONE, CODE).await.unwrap(),
        Some(ReferralRecord::new(PHONE, CODE, "P1"))
    );

    // The feed worker delivers in the background
    for _ in 0..50 {
        if !harness.sent_messages().await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(harness.sent_messages().await.len(), 1);
}

#[tokio::test]
async fn test_create_duplicate_referral_conflicts() {
    let harness = Harness::new(vec![ReferralRecord::new(PHONE, CODE, "P1")]).await;

    let (status, json) = post_json(
        harness.app(RateLimitState::permissive()),
        "/v1/referrals",
        json!({ "phone_number": PHONE, "referral_code": CODE, "principal_id": "P2" }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "DUPLICATE_KEY");
}

#[tokio::test]
async fn test_create_referral_rejects_reserved_code() {
    let harness = Harness::new(vec![]).await;

    let (status, json) = post_json(
        harness.app(RateLimitState::permissive()),
        "/v1/referrals",
        json!({ "phone_number": PHONE, "referral_code": "0", "principal_id": "P1" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_REFERRAL_CODE");
    assert_eq!(harness.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_get_referral() {
    let harness = Harness::new(vec![ReferralRecord::new(PHONE, CODE, "P1")]).await;

    let (status, json) = get(
        harness.app(RateLimitState::permissive()),
        "/v1/referrals/+15551230000",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["referral_code"], CODE);
    assert_eq!(json["principal_id"], "P1");
}

#[tokio::test]
async fn test_get_referral_not_found() {
    let harness = Harness::new(vec![]).await;

    let (status, _) = get(
        harness.app(RateLimitState::permissive()),
        "/v1/referrals/+15551230000",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rate_limit_applies_to_api_but_not_health() {
    let harness = Harness::new(vec![]).await;
    let app = harness.app(RateLimitState::new(1));

    let (first, _) = get(app.clone(), "/v1/referrals/+15551230000").await;
    let (second, json) = get(app.clone(), "/v1/referrals/+15551230000").await;
    let (health, _) = get(app, "/health").await;

    assert_eq!(first, StatusCode::NOT_FOUND);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["code"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(health, StatusCode::OK);
}
