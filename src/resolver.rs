//! Picks the transition for the decision the actor has recorded.
use super::error::{NegotiationError, ValidationError};
use super::executor::TransitionExecutor;
use super::negotiation::{DateDecision, PriceDecision};
use super::payload::PayloadOverrides;
use super::store::{NegotiationStore, StoreUpdate};

/// Submit the store's price decision, folding the date axis into the payload.
///
/// `date_override` wins over the store's recorded date decision. Fails
/// without touching the network when no price decision was chosen, the
/// actor is unknown, or neither date source is set.
pub async fn submit_based_on_status(
    executor: &TransitionExecutor,
    store: &mut NegotiationStore,
    date_override: Option<DateDecision>,
) -> Result<(), NegotiationError> {
    let (price, date) = match resolve(store, date_override) {
        Ok(resolved) => resolved,
        Err(err) => return Err(store.record_error(err.into())),
    };

    tracing::debug!(
        negotiation_id = executor.negotiation_id(),
        ?price,
        ?date,
        "submitting negotiation decision"
    );
    store.apply(StoreUpdate::Submitting(true));

    let overrides = PayloadOverrides::new().set_inspection_date_status(date);
    match price {
        PriceDecision::Accept => executor.accept_offer(store, overrides).await,
        PriceDecision::Reject => executor.reject_offer(store, overrides).await,
        PriceDecision::Counter => executor.counter_offer(store, overrides).await,
    }
}

fn resolve(
    store: &NegotiationStore,
    date_override: Option<DateDecision>,
) -> Result<(PriceDecision, DateDecision), ValidationError> {
    let state = store.state();
    let price = state.decision.price.ok_or(ValidationError::MissingDecision)?;
    if !state.actor.is_complete() {
        return Err(ValidationError::MissingIdentity);
    }
    let date = date_override
        .or(state.decision.date)
        .ok_or(ValidationError::UnresolvedDateDecision)?;
    Ok((price, date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::{ActorIdentity, PartyRole};

    #[test]
    fn override_beats_recorded_date() {
        let mut store = NegotiationStore::new();
        store.set_actor(ActorIdentity::new("u1", PartyRole::Buyer));
        store.set_price_decision(Some(PriceDecision::Accept));
        store.set_date_decision(Some(DateDecision::Available));

        let resolved = resolve(&store, Some(DateDecision::Counter)).unwrap();
        assert_eq!(resolved, (PriceDecision::Accept, DateDecision::Counter));

        let resolved = resolve(&store, None).unwrap();
        assert_eq!(resolved, (PriceDecision::Accept, DateDecision::Available));
    }

    #[test]
    fn validation_order() {
        let mut store = NegotiationStore::new();
        assert_eq!(resolve(&store, None), Err(ValidationError::MissingDecision));

        store.set_price_decision(Some(PriceDecision::Reject));
        assert_eq!(resolve(&store, None), Err(ValidationError::MissingIdentity));

        store.set_actor(ActorIdentity::new("u1", PartyRole::Seller));
        assert_eq!(
            resolve(&store, None),
            Err(ValidationError::UnresolvedDateDecision)
        );

        store.set_date_decision(Some(DateDecision::None));
        assert!(resolve(&store, None).is_ok());
    }
}
