//! Network-backed offer transitions
use super::api::{NegotiationApi, TransitionResponse};
use super::error::{ApiError, NegotiationError, ValidationError};
use super::negotiation::PriceDecision;
use super::payload::{PayloadOverrides, build_payload};
use super::store::{NegotiationStore, StoreUpdate};
use super::utils;
use std::sync::Arc;

/// Runs accept, reject and counter against one negotiation.
///
/// Every outcome is written to the store: success reconciles the record
/// mirror, failure sets the error field. The operation's loading flag and
/// the aggregate submitting flag are always released before returning.
#[derive(Clone)]
pub struct TransitionExecutor {
    negotiation_id: String,
    api: Arc<dyn NegotiationApi>,
    // in future we could hold a per-session transition timeout here
}

impl TransitionExecutor {
    pub fn new(negotiation_id: impl Into<String>, api: Arc<dyn NegotiationApi>) -> Self {
        Self {
            negotiation_id: negotiation_id.into(),
            api,
        }
    }

    pub fn negotiation_id(&self) -> &str {
        &self.negotiation_id
    }

    /// Accept the current offer
    pub async fn accept_offer(
        &self,
        store: &mut NegotiationStore,
        overrides: PayloadOverrides,
    ) -> Result<(), NegotiationError> {
        self.execute(store, PriceDecision::Accept, overrides).await
    }

    /// Reject the current offer. The store's rejection reason is sent unless
    /// the caller supplies one.
    pub async fn reject_offer(
        &self,
        store: &mut NegotiationStore,
        overrides: PayloadOverrides,
    ) -> Result<(), NegotiationError> {
        self.execute(store, PriceDecision::Reject, overrides).await
    }

    /// Counter with a new price. Requires a non-zero counter amount, either
    /// from the caller or from the store's working counter.
    pub async fn counter_offer(
        &self,
        store: &mut NegotiationStore,
        overrides: PayloadOverrides,
    ) -> Result<(), NegotiationError> {
        self.execute(store, PriceDecision::Counter, overrides).await
    }

    #[tracing::instrument(
        skip(self, store, overrides),
        fields(negotiation_id = %self.negotiation_id, transition = transition.verb())
    )]
    async fn execute(
        &self,
        store: &mut NegotiationStore,
        transition: PriceDecision,
        overrides: PayloadOverrides,
    ) -> Result<(), NegotiationError> {
        store.apply(StoreUpdate::loading(transition, true));

        let result = self.submit(store, transition, overrides).await;
        let result = result.map_err(|err| store.record_error(err));

        // release on every path
        store.batch([
            StoreUpdate::loading(transition, false),
            StoreUpdate::Submitting(false),
        ]);
        result
    }

    async fn submit(
        &self,
        store: &mut NegotiationStore,
        transition: PriceDecision,
        overrides: PayloadOverrides,
    ) -> Result<(), NegotiationError> {
        let state = store.state();
        if !state.actor.is_complete() {
            return Err(ValidationError::MissingIdentity.into());
        }

        let overrides = match transition {
            PriceDecision::Accept => overrides,
            PriceDecision::Reject => match state.rejection_reason.clone() {
                Some(reason) if overrides.rejection_reason().is_none() => {
                    overrides.set_rejection_reason(reason)
                }
                _ => overrides,
            },
            PriceDecision::Counter => {
                let amount = overrides
                    .counter_offer()
                    .or(state.counter_offer)
                    .filter(|amount| !amount.is_zero())
                    .ok_or(ValidationError::MissingCounterOffer)?;
                let overrides = overrides.set_counter_offer(amount);
                match state.counter_message.clone() {
                    Some(message) if overrides.message().is_none() => overrides.set_message(message),
                    _ => overrides,
                }
            }
        };

        let payload = build_payload(state, transition.target_status(), overrides);
        // retries inside the api layer reuse this key, a new call gets a new one
        let idempotency_key = utils::new_idempotency_key();
        tracing::debug!(%idempotency_key, "submitting offer transition");
        let response = self
            .api
            .submit(transition, &self.negotiation_id, &payload, &idempotency_key)
            .await;

        self.reconcile(store, transition, response)
    }

    fn reconcile(
        &self,
        store: &mut NegotiationStore,
        transition: PriceDecision,
        response: Result<TransitionResponse, ApiError>,
    ) -> Result<(), NegotiationError> {
        match response {
            Ok(response) if response.success => {
                let mut updates: Vec<StoreUpdate> = Vec::new();
                if let Some(data) = response.inspection_data() {
                    updates.push(StoreUpdate::ReconcileInspection {
                        status: data.status.clone(),
                        pending_response_from: data.pending_response_from,
                    });
                }
                updates.extend(StoreUpdate::clear_offer_inputs());
                updates.push(StoreUpdate::Error(None));
                store.batch(updates);

                tracing::info!(
                    status = ?store.negotiation_status(),
                    pending_response_from = ?store.pending_response_from(),
                    "offer transition accepted by server"
                );
                Ok(())
            }
            Ok(response) => {
                let message = response
                    .message()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Failed to {} offer", transition.verb()));
                tracing::warn!(%message, "offer transition refused by server");
                Err(NegotiationError::Application { message })
            }
            Err(ApiError::Rejected { message }) => {
                tracing::warn!(%message, "offer transition refused by server");
                Err(NegotiationError::Application { message })
            }
            Err(err) => {
                tracing::error!(error = %err, "offer transition failed in transport");
                Err(NegotiationError::Transport {
                    gerund: transition.gerund(),
                })
            }
        }
    }
}
