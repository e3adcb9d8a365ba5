//! Shared fixtures for the integration suites
#![allow(dead_code)]

use async_trait::async_trait;
use inspection_negotiation::api::{NegotiationApi, TransitionResponse};
use inspection_negotiation::error::ApiError;
use inspection_negotiation::negotiation::{NegotiationRecord, PriceDecision};
use inspection_negotiation::payload::SubmissionPayload;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;

pub const NEGOTIATION_ID: &str = "neg-1";

/// A record as the service sends it: populated owner, requester and property.
pub fn sample_record_json() -> serde_json::Value {
    json!({
        "_id": NEGOTIATION_ID,
        "propertyId": {
            "_id": "prop-1",
            "price": 50_000_000,
            "briefType": "Outright Sales",
            "owner": {"_id": "owner-1"}
        },
        "requestedBy": {"_id": "u1", "fullName": "Ada Buyer"},
        "owner": "owner-1",
        "status": "pending",
        "negotiatedPrice": 40_000_000,
        "inspectionDate": "2025-03-14T00:00:00.000Z",
        "inspectionTime": "10:00",
        "stage": "negotiation",
        "pendingResponseFrom": "buyer",
        "createdAt": "2025-03-01T09:30:00Z"
    })
}

pub fn sample_record() -> NegotiationRecord {
    serde_json::from_value(sample_record_json()).expect("sample record parses")
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Fetch(String),
    Submit {
        transition: PriceDecision,
        negotiation_id: String,
        payload: SubmissionPayload,
        idempotency_key: String,
    },
}

/// In-memory service that records every call and answers from queues.
/// Empty queues answer with the sample record and a bare success.
#[derive(Default)]
pub struct RecordingApi {
    calls: Mutex<Vec<Call>>,
    fetches: Mutex<VecDeque<Result<NegotiationRecord, ApiError>>>,
    transitions: Mutex<VecDeque<Result<TransitionResponse, ApiError>>>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_fetch(&self, result: Result<NegotiationRecord, ApiError>) {
        self.fetches.lock().unwrap().push_back(result);
    }

    pub fn push_transition(&self, result: Result<TransitionResponse, ApiError>) {
        self.transitions.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> Vec<(PriceDecision, SubmissionPayload)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Submit {
                    transition,
                    payload,
                    ..
                } => Some((transition, payload)),
                Call::Fetch(_) => None,
            })
            .collect()
    }

    pub fn idempotency_keys(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Submit {
                    idempotency_key, ..
                } => Some(idempotency_key),
                Call::Fetch(_) => None,
            })
            .collect()
    }

    fn record_submit(
        &self,
        transition: PriceDecision,
        negotiation_id: &str,
        payload: &SubmissionPayload,
        idempotency_key: &str,
    ) -> Result<TransitionResponse, ApiError> {
        self.calls.lock().unwrap().push(Call::Submit {
            transition,
            negotiation_id: negotiation_id.to_string(),
            payload: payload.clone(),
            idempotency_key: idempotency_key.to_string(),
        });
        self.transitions.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(TransitionResponse {
                success: true,
                message: None,
                data: None,
            })
        })
    }
}

#[async_trait]
impl NegotiationApi for RecordingApi {
    async fn fetch_record(&self, negotiation_id: &str) -> Result<NegotiationRecord, ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Fetch(negotiation_id.to_string()));
        self.fetches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(sample_record()))
    }

    async fn accept_offer(
        &self,
        negotiation_id: &str,
        payload: &SubmissionPayload,
        idempotency_key: &str,
    ) -> Result<TransitionResponse, ApiError> {
        self.record_submit(PriceDecision::Accept, negotiation_id, payload, idempotency_key)
    }

    async fn reject_offer(
        &self,
        negotiation_id: &str,
        payload: &SubmissionPayload,
        idempotency_key: &str,
    ) -> Result<TransitionResponse, ApiError> {
        self.record_submit(PriceDecision::Reject, negotiation_id, payload, idempotency_key)
    }

    async fn counter_offer(
        &self,
        negotiation_id: &str,
        payload: &SubmissionPayload,
        idempotency_key: &str,
    ) -> Result<TransitionResponse, ApiError> {
        self.record_submit(PriceDecision::Counter, negotiation_id, payload, idempotency_key)
    }
}
