//! One negotiation, owned by whoever is presenting it.
use super::api::NegotiationApi;
use super::config::ClientConfig;
use super::error::{ApiError, NegotiationError};
use super::executor::TransitionExecutor;
use super::http::{HttpNegotiationApi, TokenSource};
use super::loader::{LoadOutcome, SessionLoader};
use super::negotiation::{DateDecision, PartyRole};
use super::payload::PayloadOverrides;
use super::resolver;
use super::retry::RetryingApi;
use super::store::{NegotiationState, NegotiationStore};
use std::sync::Arc;
use tokio::sync::watch;

/// Store, loader and executor for a single negotiation id.
///
/// Transitions borrow the session mutably, so only one can be in flight
/// per session. Observers use [`NegotiationSession::subscribe`] to watch
/// loading flags while one runs.
pub struct NegotiationSession {
    store: NegotiationStore,
    loader: SessionLoader,
    executor: TransitionExecutor,
}

impl NegotiationSession {
    pub fn new(negotiation_id: impl Into<String>, api: Arc<dyn NegotiationApi>) -> Self {
        Self {
            store: NegotiationStore::new(),
            loader: SessionLoader::new(api.clone()),
            executor: TransitionExecutor::new(negotiation_id, api),
        }
    }

    /// HTTP-backed session with the configured retry policy.
    pub fn connect(
        negotiation_id: impl Into<String>,
        config: &ClientConfig,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, ApiError> {
        let http = HttpNegotiationApi::new(config, tokens)?;
        let api = RetryingApi::new(http, config.retry.policy());
        Ok(Self::new(negotiation_id, Arc::new(api)))
    }

    pub fn negotiation_id(&self) -> &str {
        self.executor.negotiation_id()
    }

    pub fn store(&self) -> &NegotiationStore {
        &self.store
    }

    /// For the presentation layer's setters. Mutation still goes through
    /// the store's own operations.
    pub fn store_mut(&mut self) -> &mut NegotiationStore {
        &mut self.store
    }

    pub fn subscribe(&self) -> watch::Receiver<NegotiationState> {
        self.store.subscribe()
    }

    pub async fn load(&mut self, role: PartyRole) -> Result<LoadOutcome, NegotiationError> {
        let id = self.executor.negotiation_id();
        self.loader.load(id, role, &mut self.store).await
    }

    pub async fn reload(&mut self, role: PartyRole) -> Result<LoadOutcome, NegotiationError> {
        let id = self.executor.negotiation_id();
        self.loader.reload(id, role, &mut self.store).await
    }

    pub async fn accept_offer(&mut self, overrides: PayloadOverrides) -> Result<(), NegotiationError> {
        self.executor.accept_offer(&mut self.store, overrides).await
    }

    pub async fn reject_offer(&mut self, overrides: PayloadOverrides) -> Result<(), NegotiationError> {
        self.executor.reject_offer(&mut self.store, overrides).await
    }

    pub async fn counter_offer(&mut self, overrides: PayloadOverrides) -> Result<(), NegotiationError> {
        self.executor.counter_offer(&mut self.store, overrides).await
    }

    pub async fn submit_based_on_status(
        &mut self,
        date_override: Option<DateDecision>,
    ) -> Result<(), NegotiationError> {
        resolver::submit_based_on_status(&self.executor, &mut self.store, date_override).await
    }
}
