//! End to end negotiation scenarios against a mock negotiation service
//!
//! Each test stands up its own wiremock server, connects a session to it
//! through the real HTTP client and retry layer, and checks both what went
//! over the wire and what the store ended up holding.

use inspection_negotiation::{
    NegotiationError, NegotiationSession, ValidationError,
    config::{ClientConfig, RetrySettings},
    http::StaticToken,
    loader::LoadOutcome,
    negotiation::{DateDecision, NegotiationStatus, OfferAmount, PartyRole, PriceDecision},
    payload::PayloadOverrides,
};
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{any, body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{NEGOTIATION_ID, sample_record_json};

const TOKEN: &str = "test-token";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fast_retries(max_retries: u32) -> RetrySettings {
    RetrySettings {
        max_retries,
        initial_delay_ms: 1,
        max_delay_ms: 2,
        jitter_factor: 0.0,
    }
}

fn connect(server: &MockServer, max_retries: u32) -> anyhow::Result<NegotiationSession> {
    let mut config = ClientConfig::new(&server.uri())?;
    config.retry = fast_retries(max_retries);
    let session =
        NegotiationSession::connect(NEGOTIATION_ID, &config, Arc::new(StaticToken::new(TOKEN)))?;
    Ok(session)
}

async fn mount_record(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/{NEGOTIATION_ID}")))
        .and(header("Authorization", format!("Bearer {TOKEN}").as_str()))
        .and(header_exists("X-Request-Id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": sample_record_json()
        })))
        .mount(server)
        .await;
}

/// Buyer counters the price while accepting the proposed date; the server's
/// reported status and next party land in the store.
#[tokio::test]
async fn scenario_a_buyer_counter_offer() -> anyhow::Result<()> {
    init_tracing();
    let server = MockServer::start().await;
    mount_record(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("/{NEGOTIATION_ID}/counter-offer")))
        .and(header_exists("Idempotency-Key"))
        .and(body_partial_json(json!({
            "status": "countered",
            "counterOffer": 45_000_000,
            "inspectionDateStatus": "available",
            "userId": "u1",
            "userType": "buyer"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"inspectionData": {"status": "countered", "pendingResponseFrom": "seller"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = connect(&server, 0)?;
    session.load(PartyRole::Buyer).await?;
    assert_eq!(
        session.store().state().actor.resolved(),
        Some(("u1", PartyRole::Buyer))
    );

    let store = session.store_mut();
    store.set_counter_offer(Some(OfferAmount::new(45_000_000)));
    store.set_price_decision(Some(PriceDecision::Counter));
    store.set_date_decision(Some(DateDecision::Available));

    session.submit_based_on_status(None).await?;

    let store = session.store();
    assert_eq!(store.negotiation_status(), Some(&NegotiationStatus::Countered));
    assert_eq!(store.pending_response_from(), Some(PartyRole::Seller));
    assert_eq!(store.state().counter_offer, None);
    assert_eq!(store.state().decision.price, None);
    assert!(!store.is_busy());
    Ok(())
}

/// Accepting without a resolved actor fails locally and sends nothing.
#[tokio::test]
async fn scenario_b_accept_without_identity() -> anyhow::Result<()> {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut session = connect(&server, 0)?;
    let result = session.accept_offer(PayloadOverrides::new()).await;

    assert_eq!(
        result,
        Err(NegotiationError::Validation(ValidationError::MissingIdentity))
    );
    assert_eq!(
        session.store().error(),
        Some("User ID and User Type are not set for the negotiation context.")
    );
    assert!(!session.store().state().loading.accepting);
    Ok(())
}

/// A second load of the same negotiation does not go back to the server.
#[tokio::test]
async fn scenario_c_load_is_idempotent() -> anyhow::Result<()> {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/{NEGOTIATION_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_record_json()))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = connect(&server, 0)?;

    assert_eq!(session.load(PartyRole::Seller).await?, LoadOutcome::Loaded);
    assert_eq!(
        session.load(PartyRole::Seller).await?,
        LoadOutcome::AlreadyLoaded
    );
    assert_eq!(
        session.store().state().actor.resolved(),
        Some(("owner-1", PartyRole::Seller))
    );
    Ok(())
}

/// The server refusing a rejection leaves the status alone and surfaces its
/// message verbatim.
#[tokio::test]
async fn scenario_d_reject_refused_by_server() -> anyhow::Result<()> {
    init_tracing();
    let server = MockServer::start().await;
    mount_record(&server).await;

    Mock::given(method("PUT"))
        .and(path(format!("/{NEGOTIATION_ID}/reject-offer")))
        .and(body_partial_json(json!({
            "status": "rejected",
            "rejectionReason": "Price too low"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Offer window closed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = connect(&server, 2)?;
    session.load(PartyRole::Seller).await?;
    session
        .store_mut()
        .set_rejection_reason(Some("Price too low".into()));

    let result = session.reject_offer(PayloadOverrides::new()).await;

    assert_eq!(
        result,
        Err(NegotiationError::Application {
            message: "Offer window closed".into()
        })
    );
    let store = session.store();
    assert_eq!(store.negotiation_status(), Some(&NegotiationStatus::Pending));
    assert_eq!(store.error(), Some("Offer window closed"));
    assert!(!store.is_busy());
    Ok(())
}

/// An error status that still carries the envelope is the service's answer
/// and is not retried.
#[tokio::test]
async fn enveloped_error_status_is_an_application_error() -> anyhow::Result<()> {
    init_tracing();
    let server = MockServer::start().await;
    mount_record(&server).await;

    Mock::given(method("PUT"))
        .and(path(format!("/{NEGOTIATION_ID}/accept-offer")))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "success": false,
            "message": "Negotiation already closed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = connect(&server, 2)?;
    session.load(PartyRole::Buyer).await?;
    let result = session.accept_offer(PayloadOverrides::new()).await;

    assert_eq!(
        session.store().error(),
        Some("Negotiation already closed")
    );
    assert!(matches!(result, Err(NegotiationError::Application { .. })));
    Ok(())
}

/// Transient failures are retried with the same idempotency key.
#[tokio::test]
async fn transient_failures_are_retried() -> anyhow::Result<()> {
    init_tracing();
    let server = MockServer::start().await;
    mount_record(&server).await;

    Mock::given(method("PUT"))
        .and(path(format!("/{NEGOTIATION_ID}/accept-offer")))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("/{NEGOTIATION_ID}/accept-offer")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"inspectionData": {"status": "accepted", "pendingResponseFrom": "seller"}}
        })))
        .with_priority(2)
        .mount(&server)
        .await;

    let mut session = connect(&server, 2)?;
    session.load(PartyRole::Buyer).await?;
    session.accept_offer(PayloadOverrides::new()).await?;

    assert_eq!(
        session.store().negotiation_status(),
        Some(&NegotiationStatus::Accepted)
    );

    let requests = server.received_requests().await.unwrap_or_default();
    let keys: Vec<_> = requests
        .iter()
        .filter(|request| request.url.path().ends_with("/accept-offer"))
        .filter_map(|request| request.headers.get("Idempotency-Key"))
        .map(|value| value.to_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(keys.len(), 3);
    assert!(keys.iter().all(|key| key == &keys[0]));
    Ok(())
}

/// Two counters with the same figure are two submissions, each with its own key.
#[tokio::test]
async fn repeated_submission_sends_new_key() -> anyhow::Result<()> {
    init_tracing();
    let server = MockServer::start().await;
    mount_record(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("/{NEGOTIATION_ID}/counter-offer")))
        .and(body_partial_json(json!({"counterOffer": 45_000_000})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Seller is reviewing another offer"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let mut session = connect(&server, 0)?;
    session.load(PartyRole::Buyer).await?;
    for _ in 0..2 {
        let overrides = PayloadOverrides::new().set_counter_offer(OfferAmount::new(45_000_000));
        let result = session.counter_offer(overrides).await;
        assert!(matches!(result, Err(NegotiationError::Application { .. })));
    }

    let requests = server.received_requests().await.unwrap_or_default();
    let keys: Vec<_> = requests
        .iter()
        .filter(|request| request.url.path().ends_with("/counter-offer"))
        .filter_map(|request| request.headers.get("Idempotency-Key"))
        .map(|value| value.to_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(keys.len(), 2);
    assert_ne!(keys[0], keys[1]);
    Ok(())
}

/// A server fault that is not transient is reported once, generically.
#[tokio::test]
async fn server_fault_is_a_transport_error() -> anyhow::Result<()> {
    init_tracing();
    let server = MockServer::start().await;
    mount_record(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("/{NEGOTIATION_ID}/counter-offer")))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = connect(&server, 2)?;
    session.load(PartyRole::Buyer).await?;
    session
        .store_mut()
        .set_counter_offer(Some(OfferAmount::new(41_000_000)));
    let result = session.counter_offer(PayloadOverrides::new()).await;

    assert_eq!(
        result,
        Err(NegotiationError::Transport {
            gerund: "countering"
        })
    );
    assert_eq!(
        session.store().error(),
        Some("An error occurred while countering the offer.")
    );
    assert_eq!(
        session.store().state().counter_offer,
        Some(OfferAmount::new(41_000_000))
    );
    assert!(!session.store().is_busy());
    Ok(())
}

/// A missing negotiation fails the load and leaves the session retryable.
#[tokio::test]
async fn failed_load_can_be_retried() -> anyhow::Result<()> {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/{NEGOTIATION_ID}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "message": "Negotiation not found"
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_record(&server).await;

    let mut session = connect(&server, 0)?;

    let first = session.load(PartyRole::Buyer).await;
    assert_eq!(
        first,
        Err(NegotiationError::Load {
            message: "Negotiation not found".into()
        })
    );
    assert_eq!(
        session.store().state().form_status,
        inspection_negotiation::store::FormStatus::Failed
    );

    assert_eq!(session.load(PartyRole::Buyer).await?, LoadOutcome::Loaded);
    assert_eq!(session.store().error(), None);
    Ok(())
}
