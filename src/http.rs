//! reqwest-backed [`NegotiationApi`].
//!
//! Routes, all relative to the configured base url:
//!
//! - `GET  {base}/{id}`              negotiation record
//! - `PUT  {base}/{id}/accept-offer`
//! - `PUT  {base}/{id}/reject-offer`
//! - `POST {base}/{id}/counter-offer`
//!
//! The negotiation id is percent-encoded as a single path segment.
//!
//! Every request carries `Authorization: Bearer <token>` and `X-Request-Id`.
//! Writes also carry the submission's `Idempotency-Key` so that a retried
//! submission can be recognised by the service.
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::Deserialize;

use super::api::{NegotiationApi, TransitionResponse};
use super::config::ClientConfig;
use super::error::ApiError;
use super::negotiation::{NegotiationRecord, PriceDecision};
use super::payload::SubmissionPayload;
use super::utils;

/// Supplies the bearer token. The token is opaque to this crate.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// A token fixed at construction.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken([REDACTED])")
    }
}

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// GET responses come either bare or wrapped in the usual envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordBody {
    Envelope {
        success: bool,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        data: Option<NegotiationRecord>,
    },
    Bare(NegotiationRecord),
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

pub struct HttpNegotiationApi {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenSource>,
}

impl HttpNegotiationApi {
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenSource>) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ApiError::InvalidUrl(config.base_url.clone()))?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            http,
            base_url,
            tokens,
        })
    }

    fn url_for(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn record_url(&self, negotiation_id: &str) -> Result<Url, ApiError> {
        self.url_for(&[negotiation_id])
    }

    fn transition_url(
        &self,
        negotiation_id: &str,
        transition: PriceDecision,
    ) -> Result<Url, ApiError> {
        self.url_for(&[negotiation_id, endpoint(transition)])
    }

    fn authorize(&self, builder: RequestBuilder, request_id: &str) -> Result<RequestBuilder, ApiError> {
        let token = self
            .tokens
            .bearer_token()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ApiError::MissingToken)?;

        Ok(builder.bearer_auth(token).header("X-Request-Id", request_id))
    }

    #[tracing::instrument(skip(self, payload), fields(request_id = tracing::field::Empty))]
    async fn send_transition(
        &self,
        transition: PriceDecision,
        negotiation_id: &str,
        payload: &SubmissionPayload,
        idempotency_key: &str,
    ) -> Result<TransitionResponse, ApiError> {
        let request_id = utils::new_request_id();
        tracing::Span::current().record("request_id", request_id.as_str());

        let body = payload.finalise()?;
        let builder = self
            .http
            .request(method(transition), self.transition_url(negotiation_id, transition)?)
            .header(CONTENT_TYPE, "application/json")
            .header("Idempotency-Key", idempotency_key)
            .body(body);

        let response = self.authorize(builder, &request_id)?.send().await?;
        tracing::debug!(status = %response.status(), "transition response");
        parse_transition(response).await
    }
}

fn endpoint(transition: PriceDecision) -> &'static str {
    match transition {
        PriceDecision::Accept => "accept-offer",
        PriceDecision::Reject => "reject-offer",
        PriceDecision::Counter => "counter-offer",
    }
}

// counters create a new offer; accept and reject update the current one
fn method(transition: PriceDecision) -> Method {
    match transition {
        PriceDecision::Counter => Method::POST,
        PriceDecision::Accept | PriceDecision::Reject => Method::PUT,
    }
}

/// A non-2xx response that still carries the envelope is the service's
/// answer, not a transport fault.
async fn parse_transition(response: Response) -> Result<TransitionResponse, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    match serde_json::from_str::<TransitionResponse>(&body) {
        Ok(envelope) => Ok(envelope),
        Err(err) if status.is_success() => Err(ApiError::Decode(err)),
        Err(_) => Err(ApiError::Status {
            status: status.as_u16(),
            body,
        }),
    }
}

async fn parse_record(response: Response) -> Result<NegotiationRecord, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty());
        let status_error = ApiError::Status {
            status: status.as_u16(),
            body,
        };
        // transient statuses stay retryable even when they carry a message
        return Err(match message {
            Some(message) if !status_error.is_transient() => ApiError::Rejected { message },
            _ => status_error,
        });
    }

    match serde_json::from_str::<RecordBody>(&body)? {
        RecordBody::Envelope {
            success: true,
            data: Some(record),
            ..
        } => Ok(record),
        RecordBody::Envelope { message, .. } => Err(ApiError::Rejected {
            message: message.unwrap_or_else(|| "Negotiation not found".to_string()),
        }),
        RecordBody::Bare(record) => Ok(record),
    }
}

#[async_trait]
impl NegotiationApi for HttpNegotiationApi {
    #[tracing::instrument(skip(self), fields(request_id = tracing::field::Empty))]
    async fn fetch_record(&self, negotiation_id: &str) -> Result<NegotiationRecord, ApiError> {
        let request_id = utils::new_request_id();
        tracing::Span::current().record("request_id", request_id.as_str());

        let builder = self.http.get(self.record_url(negotiation_id)?);
        let response = self.authorize(builder, &request_id)?.send().await?;
        parse_record(response).await
    }

    async fn accept_offer(
        &self,
        negotiation_id: &str,
        payload: &SubmissionPayload,
        idempotency_key: &str,
    ) -> Result<TransitionResponse, ApiError> {
        self.send_transition(PriceDecision::Accept, negotiation_id, payload, idempotency_key)
            .await
    }

    async fn reject_offer(
        &self,
        negotiation_id: &str,
        payload: &SubmissionPayload,
        idempotency_key: &str,
    ) -> Result<TransitionResponse, ApiError> {
        self.send_transition(PriceDecision::Reject, negotiation_id, payload, idempotency_key)
            .await
    }

    async fn counter_offer(
        &self,
        negotiation_id: &str,
        payload: &SubmissionPayload,
        idempotency_key: &str,
    ) -> Result<TransitionResponse, ApiError> {
        self.send_transition(PriceDecision::Counter, negotiation_id, payload, idempotency_key)
            .await
    }
}
