//! Seeds a store from the service's negotiation record.
use super::api::NegotiationApi;
use super::error::{ApiError, NegotiationError};
use super::negotiation::{DateTimeProposal, NegotiationRecord, PartyRole};
use super::store::{FormStatus, NegotiationStore, StoreUpdate};
use std::collections::HashSet;
use std::sync::Arc;

const LOAD_FAILED: &str = "Failed to load negotiation details.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// This loader already seeded a store for the id; nothing was fetched.
    AlreadyLoaded,
}

pub struct SessionLoader {
    api: Arc<dyn NegotiationApi>,
    loaded: HashSet<String>,
}

impl SessionLoader {
    pub fn new(api: Arc<dyn NegotiationApi>) -> Self {
        Self {
            api,
            loaded: HashSet::new(),
        }
    }

    pub fn has_loaded(&self, negotiation_id: &str) -> bool {
        self.loaded.contains(negotiation_id)
    }

    /// Fetch and seed once per id. Later calls for the same id are no-ops;
    /// a failed load does not count, so it can be tried again.
    pub async fn load(
        &mut self,
        negotiation_id: &str,
        role: PartyRole,
        store: &mut NegotiationStore,
    ) -> Result<LoadOutcome, NegotiationError> {
        if self.has_loaded(negotiation_id) {
            tracing::debug!(negotiation_id, "negotiation already loaded, skipping fetch");
            return Ok(LoadOutcome::AlreadyLoaded);
        }
        self.reload(negotiation_id, role, store).await
    }

    /// Fetch and seed regardless of earlier loads.
    #[tracing::instrument(skip(self, store))]
    pub async fn reload(
        &mut self,
        negotiation_id: &str,
        role: PartyRole,
        store: &mut NegotiationStore,
    ) -> Result<LoadOutcome, NegotiationError> {
        store.set_form_status(FormStatus::Loading);

        match self.api.fetch_record(negotiation_id).await {
            Ok(record) => {
                store.batch(seed_updates(record, role));
                self.loaded.insert(negotiation_id.to_string());
                tracing::info!(
                    negotiation_type = ?store.state().negotiation_type,
                    "negotiation loaded"
                );
                Ok(LoadOutcome::Loaded)
            }
            Err(err) => {
                let message = match &err {
                    ApiError::Rejected { message } => message.clone(),
                    _ => LOAD_FAILED.to_string(),
                };
                tracing::error!(error = %err, "failed to load negotiation");
                store.batch([
                    StoreUpdate::FormStatus(FormStatus::Failed),
                    StoreUpdate::Error(Some(message.clone())),
                ]);
                Err(NegotiationError::Load { message })
            }
        }
    }
}

/// Everything derived from a freshly fetched record, as one batch.
pub fn seed_updates(record: NegotiationRecord, role: PartyRole) -> Vec<StoreUpdate> {
    let proposal = DateTimeProposal::from_record(&record);

    vec![
        StoreUpdate::NegotiationType(record.negotiation_type()),
        StoreUpdate::OriginalDateTime(proposal.clone()),
        StoreUpdate::CounterDateTime(proposal),
        StoreUpdate::Actor(record.actor_for(role)),
        StoreUpdate::ListingPrice(record.property.price),
        StoreUpdate::OfferPrice(record.negotiated_price),
        StoreUpdate::Details(Box::new(record)),
        StoreUpdate::FormStatus(FormStatus::Success),
        StoreUpdate::Error(None),
    ]
}
