//! Decision submission bodies
use super::negotiation::{DateDecision, DateTimeProposal, NegotiationStatus, OfferAmount, PartyRole};
use super::store::NegotiationState;
use serde::Serialize;

/// Body sent to the accept, reject and counter endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub status: NegotiationStatus,
    pub counter_date_time_obj: DateTimeProposal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspection_date_status: Option<DateDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_type: Option<PartyRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter_offer: Option<OfferAmount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SubmissionPayload {
    /// Serialises the body sent over the wire.
    pub fn finalise(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Caller-supplied fields. Anything set here wins over what the builder
/// would derive from the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadOverrides {
    status: Option<NegotiationStatus>,
    counter_date_time_obj: Option<DateTimeProposal>,
    inspection_date_status: Option<DateDecision>,
    user_id: Option<String>,
    user_type: Option<PartyRole>,
    rejection_reason: Option<String>,
    counter_offer: Option<OfferAmount>,
    message: Option<String>,
}

impl PayloadOverrides {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_status(mut self, status: NegotiationStatus) -> Self {
        self.status = Some(status);
        self
    }
    pub fn set_counter_date_time(mut self, proposal: DateTimeProposal) -> Self {
        self.counter_date_time_obj = Some(proposal);
        self
    }
    pub fn set_inspection_date_status(mut self, decision: DateDecision) -> Self {
        self.inspection_date_status = Some(decision);
        self
    }
    pub fn set_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
    pub fn set_user_type(mut self, role: PartyRole) -> Self {
        self.user_type = Some(role);
        self
    }
    pub fn set_rejection_reason(mut self, reason: impl Into<String>) -> Self {
        self.rejection_reason = Some(reason.into());
        self
    }
    pub fn set_counter_offer(mut self, amount: OfferAmount) -> Self {
        self.counter_offer = Some(amount);
        self
    }
    pub fn set_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn counter_offer(&self) -> Option<OfferAmount> {
        self.counter_offer
    }
    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Assemble a submission from the session state. Performs no validation.
pub fn build_payload(
    state: &NegotiationState,
    status: NegotiationStatus,
    overrides: PayloadOverrides,
) -> SubmissionPayload {
    SubmissionPayload {
        status: overrides.status.unwrap_or(status),
        counter_date_time_obj: overrides
            .counter_date_time_obj
            .unwrap_or_else(|| state.counter_date_time.clone()),
        inspection_date_status: overrides.inspection_date_status.or(state.decision.date),
        user_id: overrides.user_id.or_else(|| state.actor.id.clone()),
        user_type: overrides.user_type.or(state.actor.role),
        rejection_reason: overrides.rejection_reason,
        counter_offer: overrides.counter_offer,
        message: overrides.message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::ActorIdentity;
    use serde_json::json;

    fn state() -> NegotiationState {
        NegotiationState {
            actor: ActorIdentity::new("u1", PartyRole::Buyer),
            counter_date_time: DateTimeProposal::new("2025-03-14", "10:00"),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_come_from_state() {
        let payload = build_payload(&state(), NegotiationStatus::Accepted, PayloadOverrides::new());

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "status": "accepted",
                "counterDateTimeObj": {"selectedDate": "2025-03-14", "selectedTime": "10:00"},
                "userId": "u1",
                "userType": "buyer",
            })
        );
    }

    #[test]
    fn overrides_win() {
        let overrides = PayloadOverrides::new()
            .set_user_id("someone-else")
            .set_inspection_date_status(DateDecision::Unavailable)
            .set_status(NegotiationStatus::Other("withdrawn".into()));
        let payload = build_payload(&state(), NegotiationStatus::Accepted, overrides);

        assert_eq!(payload.user_id.as_deref(), Some("someone-else"));
        assert_eq!(payload.inspection_date_status, Some(DateDecision::Unavailable));
        assert_eq!(payload.status.as_str(), "withdrawn");
    }

    #[test]
    fn finalised_body_omits_unset_fields() {
        let overrides = PayloadOverrides::new()
            .set_counter_offer(OfferAmount::new(45_000_000))
            .set_message("Best I can do");
        let payload = build_payload(&state(), NegotiationStatus::Countered, overrides);

        let body: serde_json::Value = serde_json::from_slice(&payload.finalise().unwrap()).unwrap();

        assert_eq!(body["counterOffer"], json!(45_000_000));
        assert_eq!(body["message"], json!("Best I can do"));
        assert!(body.get("rejectionReason").is_none());
        assert!(body.get("inspectionDateStatus").is_none());
    }
}
