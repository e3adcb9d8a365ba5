//! Seam between the session and the negotiation service
use super::error::ApiError;
use super::negotiation::{NegotiationRecord, NegotiationStatus, PartyRole, PriceDecision};
use super::payload::SubmissionPayload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Server-owned fields reported back after a transition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionData {
    #[serde(default)]
    pub status: Option<NegotiationStatus>,
    #[serde(default)]
    pub pending_response_from: Option<PartyRole>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionData {
    #[serde(default)]
    pub inspection_data: Option<InspectionData>,
}

/// `{success, message?, data: {inspectionData: {...}}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<TransitionData>,
}

impl TransitionResponse {
    pub fn succeeded(status: NegotiationStatus, pending_response_from: PartyRole) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(TransitionData {
                inspection_data: Some(InspectionData {
                    status: Some(status),
                    pending_response_from: Some(pending_response_from),
                }),
            }),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn inspection_data(&self) -> Option<&InspectionData> {
        self.data.as_ref().and_then(|d| d.inspection_data.as_ref())
    }

    /// Server message, if it sent a non-empty one.
    pub fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

/// Remote operations the session depends on.
///
/// Application-level failures come back as `Ok` with `success == false`;
/// `Err` is reserved for transport and protocol problems. Writes carry the
/// idempotency key of the submission they belong to; retries of one
/// submission pass the same key.
#[async_trait]
pub trait NegotiationApi: Send + Sync {
    async fn fetch_record(&self, negotiation_id: &str) -> Result<NegotiationRecord, ApiError>;

    async fn accept_offer(
        &self,
        negotiation_id: &str,
        payload: &SubmissionPayload,
        idempotency_key: &str,
    ) -> Result<TransitionResponse, ApiError>;

    async fn reject_offer(
        &self,
        negotiation_id: &str,
        payload: &SubmissionPayload,
        idempotency_key: &str,
    ) -> Result<TransitionResponse, ApiError>;

    async fn counter_offer(
        &self,
        negotiation_id: &str,
        payload: &SubmissionPayload,
        idempotency_key: &str,
    ) -> Result<TransitionResponse, ApiError>;

    async fn submit(
        &self,
        transition: PriceDecision,
        negotiation_id: &str,
        payload: &SubmissionPayload,
        idempotency_key: &str,
    ) -> Result<TransitionResponse, ApiError> {
        match transition {
            PriceDecision::Accept => {
                self.accept_offer(negotiation_id, payload, idempotency_key)
                    .await
            }
            PriceDecision::Reject => {
                self.reject_offer(negotiation_id, payload, idempotency_key)
                    .await
            }
            PriceDecision::Counter => {
                self.counter_offer(negotiation_id, payload, idempotency_key)
                    .await
            }
        }
    }
}
