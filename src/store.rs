//! Working state of one negotiation.
//!
//! The store is the only thing allowed to mutate session state and it never
//! performs I/O. Every change goes through a [`StoreUpdate`]; a batch that
//! changes nothing publishes nothing to subscribers.
use super::error::NegotiationError;
use super::negotiation::{
    ActorIdentity, DateDecision, DateTimeProposal, Decision, NegotiationRecord, NegotiationStatus,
    NegotiationType, OfferAmount, PartyRole, PriceDecision,
};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Failed,
}

/// Which dialog the presentation layer has open, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveModal {
    Accept,
    Reject,
    Counter,
    DateSelection,
}

/// UI-facing progress marker. Not interpreted by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentStep {
    #[default]
    Overview,
    PriceReview,
    DateReview,
    Confirmation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadingFlags {
    pub accepting: bool,
    pub rejecting: bool,
    pub countering: bool,
    /// Set while the decision resolver has a submission in flight.
    pub submitting: bool,
}

impl LoadingFlags {
    pub fn any(&self) -> bool {
        self.accepting || self.rejecting || self.countering || self.submitting
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NegotiationState {
    pub form_status: FormStatus,
    pub details: Option<NegotiationRecord>,
    pub negotiation_type: NegotiationType,
    pub original_date_time: DateTimeProposal,
    pub counter_date_time: DateTimeProposal,
    pub decision: Decision,
    pub actor: ActorIdentity,
    pub listing_price: Option<OfferAmount>,
    pub offer_price: Option<OfferAmount>,
    pub counter_offer: Option<OfferAmount>,
    pub counter_message: Option<String>,
    pub rejection_reason: Option<String>,
    pub active_modal: Option<ActiveModal>,
    pub loading: LoadingFlags,
    pub error: Option<String>,
    pub content_step: ContentStep,
}

/// One field change. Applied with exhaustive matching, never by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreUpdate {
    FormStatus(FormStatus),
    Details(Box<NegotiationRecord>),
    NegotiationType(NegotiationType),
    OriginalDateTime(DateTimeProposal),
    CounterDateTime(DateTimeProposal),
    PriceDecision(Option<PriceDecision>),
    DateDecision(Option<DateDecision>),
    Actor(ActorIdentity),
    ListingPrice(Option<OfferAmount>),
    OfferPrice(Option<OfferAmount>),
    CounterOffer(Option<OfferAmount>),
    CounterMessage(Option<String>),
    RejectionReason(Option<String>),
    ActiveModal(Option<ActiveModal>),
    Accepting(bool),
    Rejecting(bool),
    Countering(bool),
    Submitting(bool),
    Error(Option<String>),
    ContentStep(ContentStep),
    /// Merge server-reported status fields into the loaded record.
    ReconcileInspection {
        status: Option<NegotiationStatus>,
        pending_response_from: Option<PartyRole>,
    },
}

impl StoreUpdate {
    /// Loading flag owned by a transition.
    pub fn loading(transition: PriceDecision, on: bool) -> Self {
        match transition {
            PriceDecision::Accept => StoreUpdate::Accepting(on),
            PriceDecision::Reject => StoreUpdate::Rejecting(on),
            PriceDecision::Counter => StoreUpdate::Countering(on),
        }
    }

    /// Updates that clear the dialog and every offer input.
    pub fn clear_offer_inputs() -> [StoreUpdate; 6] {
        [
            StoreUpdate::ActiveModal(None),
            StoreUpdate::CounterOffer(None),
            StoreUpdate::CounterMessage(None),
            StoreUpdate::RejectionReason(None),
            StoreUpdate::PriceDecision(None),
            StoreUpdate::DateDecision(None),
        ]
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

fn apply_to(state: &mut NegotiationState, update: StoreUpdate) -> bool {
    match update {
        StoreUpdate::FormStatus(v) => replace(&mut state.form_status, v),
        StoreUpdate::Details(v) => replace(&mut state.details, Some(*v)),
        StoreUpdate::NegotiationType(v) => replace(&mut state.negotiation_type, v),
        StoreUpdate::OriginalDateTime(v) => replace(&mut state.original_date_time, v),
        StoreUpdate::CounterDateTime(v) => replace(&mut state.counter_date_time, v),
        StoreUpdate::PriceDecision(v) => replace(&mut state.decision.price, v),
        StoreUpdate::DateDecision(v) => replace(&mut state.decision.date, v),
        StoreUpdate::Actor(v) => replace(&mut state.actor, v),
        StoreUpdate::ListingPrice(v) => replace(&mut state.listing_price, v),
        StoreUpdate::OfferPrice(v) => replace(&mut state.offer_price, v),
        StoreUpdate::CounterOffer(v) => replace(&mut state.counter_offer, v),
        StoreUpdate::CounterMessage(v) => replace(&mut state.counter_message, v),
        StoreUpdate::RejectionReason(v) => replace(&mut state.rejection_reason, v),
        StoreUpdate::ActiveModal(v) => replace(&mut state.active_modal, v),
        StoreUpdate::Accepting(v) => replace(&mut state.loading.accepting, v),
        StoreUpdate::Rejecting(v) => replace(&mut state.loading.rejecting, v),
        StoreUpdate::Countering(v) => replace(&mut state.loading.countering, v),
        StoreUpdate::Submitting(v) => replace(&mut state.loading.submitting, v),
        StoreUpdate::Error(v) => replace(&mut state.error, v),
        StoreUpdate::ContentStep(v) => replace(&mut state.content_step, v),
        StoreUpdate::ReconcileInspection {
            status,
            pending_response_from,
        } => match state.details.as_mut() {
            Some(details) => details.merge_inspection(status.as_ref(), pending_response_from),
            None => false,
        },
    }
}

#[derive(Debug)]
pub struct NegotiationStore {
    state: NegotiationState,
    notifier: watch::Sender<NegotiationState>,
}

impl Default for NegotiationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NegotiationStore {
    pub fn new() -> Self {
        let state = NegotiationState::default();
        let (notifier, _) = watch::channel(state.clone());
        Self { state, notifier }
    }

    pub fn state(&self) -> &NegotiationState {
        &self.state
    }

    /// Receives a snapshot after every change that actually altered state.
    pub fn subscribe(&self) -> watch::Receiver<NegotiationState> {
        self.notifier.subscribe()
    }

    pub fn apply(&mut self, update: StoreUpdate) -> bool {
        self.batch([update])
    }

    /// Applies every update as one change. Returns false, and notifies no
    /// one, when none of the supplied values differ from current state.
    pub fn batch(&mut self, updates: impl IntoIterator<Item = StoreUpdate>) -> bool {
        let mut changed = false;
        for update in updates {
            changed |= apply_to(&mut self.state, update);
        }
        if changed {
            self.notifier.send_replace(self.state.clone());
        }
        changed
    }

    pub fn set_form_status(&mut self, status: FormStatus) -> bool {
        self.apply(StoreUpdate::FormStatus(status))
    }
    pub fn set_negotiation_type(&mut self, negotiation_type: NegotiationType) -> bool {
        self.apply(StoreUpdate::NegotiationType(negotiation_type))
    }
    pub fn set_actor(&mut self, actor: ActorIdentity) -> bool {
        self.apply(StoreUpdate::Actor(actor))
    }
    pub fn set_counter_date_time(&mut self, proposal: DateTimeProposal) -> bool {
        self.apply(StoreUpdate::CounterDateTime(proposal))
    }
    pub fn set_price_decision(&mut self, decision: Option<PriceDecision>) -> bool {
        self.apply(StoreUpdate::PriceDecision(decision))
    }
    pub fn set_date_decision(&mut self, decision: Option<DateDecision>) -> bool {
        self.apply(StoreUpdate::DateDecision(decision))
    }
    pub fn set_counter_offer(&mut self, amount: Option<OfferAmount>) -> bool {
        self.apply(StoreUpdate::CounterOffer(amount))
    }
    pub fn set_counter_message(&mut self, message: Option<String>) -> bool {
        self.apply(StoreUpdate::CounterMessage(message))
    }
    pub fn set_rejection_reason(&mut self, reason: Option<String>) -> bool {
        self.apply(StoreUpdate::RejectionReason(reason))
    }
    pub fn set_active_modal(&mut self, modal: Option<ActiveModal>) -> bool {
        self.apply(StoreUpdate::ActiveModal(modal))
    }
    pub fn set_content_step(&mut self, step: ContentStep) -> bool {
        self.apply(StoreUpdate::ContentStep(step))
    }
    pub fn set_error(&mut self, message: impl Into<String>) -> bool {
        self.apply(StoreUpdate::Error(Some(message.into())))
    }
    pub fn clear_error(&mut self) -> bool {
        self.apply(StoreUpdate::Error(None))
    }

    /// Parses a decision coming from the presentation layer. Unknown values
    /// leave the current decision alone and set the error field.
    pub fn choose_price_decision_str(&mut self, raw: &str) -> Result<PriceDecision, NegotiationError> {
        match raw.parse::<PriceDecision>() {
            Ok(decision) => {
                self.set_price_decision(Some(decision));
                Ok(decision)
            }
            Err(err) => Err(self.record_error(err.into())),
        }
    }

    /// Writes the error's message to the error field and hands it back.
    pub fn record_error(&mut self, err: NegotiationError) -> NegotiationError {
        self.set_error(err.to_string());
        err
    }

    /// Puts the working slot back to the original one and marks the date as
    /// available.
    pub fn reset_working_date(&mut self) -> bool {
        let original = self.state.original_date_time.clone();
        self.batch([
            StoreUpdate::CounterDateTime(original),
            StoreUpdate::DateDecision(Some(DateDecision::Available)),
        ])
    }

    /// Clears the dialog, loading flags and error. The loaded record stays.
    pub fn reset(&mut self) -> bool {
        self.batch([
            StoreUpdate::ActiveModal(None),
            StoreUpdate::Accepting(false),
            StoreUpdate::Rejecting(false),
            StoreUpdate::Countering(false),
            StoreUpdate::Submitting(false),
            StoreUpdate::Error(None),
        ])
    }

    /// Advisory: true while any transition is in flight.
    pub fn is_busy(&self) -> bool {
        self.state.loading.any()
    }

    pub fn negotiation_status(&self) -> Option<&NegotiationStatus> {
        self.state.details.as_ref().map(|d| &d.status)
    }

    pub fn pending_response_from(&self) -> Option<PartyRole> {
        self.state
            .details
            .as_ref()
            .and_then(|d| d.pending_response_from)
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }
}
