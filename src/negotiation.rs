//! Negotiation record and the values negotiated over it
use super::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which side of the deal a party is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Seller,
    Buyer,
}

impl PartyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyRole::Seller => "seller",
            PartyRole::Buyer => "buyer",
        }
    }
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listing category of the property under inspection. The server sends free
/// text ("Outright Sales", "Rent", "Joint Venture", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ListingCategory {
    Sale,
    Rent,
    JointVenture,
    Other(String),
}

impl ListingCategory {
    pub fn is_plain_sale_or_rent(&self) -> bool {
        matches!(self, ListingCategory::Sale | ListingCategory::Rent)
    }
}

impl From<String> for ListingCategory {
    fn from(value: String) -> Self {
        let key: String = value
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match key.as_str() {
            "sale" | "sales" | "outrightsale" | "outrightsales" | "forsale" => ListingCategory::Sale,
            "rent" | "rental" | "forrent" => ListingCategory::Rent,
            "jv" | "jointventure" => ListingCategory::JointVenture,
            _ => ListingCategory::Other(value),
        }
    }
}

impl From<ListingCategory> for String {
    fn from(value: ListingCategory) -> Self {
        match value {
            ListingCategory::Sale => "Outright Sales".into(),
            ListingCategory::Rent => "Rent".into(),
            ListingCategory::JointVenture => "Joint Venture".into(),
            ListingCategory::Other(raw) => raw,
        }
    }
}

/// Server-side status of the negotiation. Unknown values are carried through.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NegotiationStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Countered,
    Other(String),
}

impl NegotiationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            NegotiationStatus::Pending => "pending",
            NegotiationStatus::Accepted => "accepted",
            NegotiationStatus::Rejected => "rejected",
            NegotiationStatus::Countered => "countered",
            NegotiationStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for NegotiationStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => NegotiationStatus::Pending,
            "accepted" => NegotiationStatus::Accepted,
            "rejected" => NegotiationStatus::Rejected,
            "countered" => NegotiationStatus::Countered,
            _ => NegotiationStatus::Other(value),
        }
    }
}

impl From<NegotiationStatus> for String {
    fn from(value: NegotiationStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for NegotiationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-negative currency amount in whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct OfferAmount(u64);

impl OfferAmount {
    pub const ZERO: OfferAmount = OfferAmount(0);

    pub fn new(amount: u64) -> Self {
        Self(amount)
    }
    pub fn value(&self) -> u64 {
        self.0
    }
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for OfferAmount {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for OfferAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// prices arrive as integers, floats or formatted strings depending on the endpoint
impl<'de> Deserialize<'de> for OfferAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Float(f64),
            Text(String),
        }

        let float = match Raw::deserialize(deserializer)? {
            Raw::Int(value) => return Ok(Self(value)),
            Raw::Float(value) => value,
            Raw::Text(text) => {
                let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
                cleaned.parse::<f64>().map_err(|_| {
                    serde::de::Error::custom(format!("`{text}` is not a currency amount"))
                })?
            }
        };

        if !float.is_finite() || float < 0.0 {
            return Err(serde::de::Error::custom(format!(
                "currency amount must be non-negative, got {float}"
            )));
        }
        // u64::MAX as f64 rounds up to 2^64, which no u64 can hold
        let rounded = float.round();
        if rounded >= u64::MAX as f64 {
            return Err(serde::de::Error::custom(format!(
                "currency amount {float} is out of range"
            )));
        }
        Ok(Self(rounded as u64))
    }
}

/// A proposed inspection slot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeProposal {
    pub selected_date: String,
    pub selected_time: String,
}

impl DateTimeProposal {
    /// Placeholder used when the record has no date or time.
    pub const UNSET: &'static str = "N/A";

    pub fn new(selected_date: impl Into<String>, selected_time: impl Into<String>) -> Self {
        Self {
            selected_date: selected_date.into(),
            selected_time: selected_time.into(),
        }
    }

    /// Slot currently on the record. ISO timestamps are cut down to the
    /// calendar date.
    pub fn from_record(record: &NegotiationRecord) -> Self {
        let date = non_blank(record.inspection_date.as_deref())
            .map(|raw| match DateTime::parse_from_rfc3339(raw) {
                Ok(parsed) => parsed.format("%Y-%m-%d").to_string(),
                Err(_) => raw.to_string(),
            })
            .unwrap_or_else(|| Self::UNSET.to_string());
        let time = non_blank(record.inspection_time.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| Self::UNSET.to_string());

        Self::new(date, time)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A user reference. The service sends either a bare id or a populated object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawPartyRef")]
pub struct PartyRef {
    #[serde(rename = "_id")]
    pub id: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPartyRef {
    Id(String),
    Object {
        #[serde(rename = "_id", alias = "id")]
        id: String,
    },
}

impl From<RawPartyRef> for PartyRef {
    fn from(value: RawPartyRef) -> Self {
        match value {
            RawPartyRef::Id(id) | RawPartyRef::Object { id } => PartyRef { id },
        }
    }
}

impl PartyRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRef {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default)]
    pub price: Option<OfferAmount>,
    #[serde(rename = "briefType", alias = "listingCategory", default)]
    pub listing_category: Option<ListingCategory>,
    #[serde(default)]
    pub owner: Option<PartyRef>,
}

/// One inspection negotiation as held by the negotiation service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "propertyId", alias = "property", default)]
    pub property: PropertyRef,
    #[serde(alias = "buyer", default)]
    pub requested_by: Option<PartyRef>,
    #[serde(alias = "seller", default)]
    pub owner: Option<PartyRef>,
    #[serde(default)]
    pub status: NegotiationStatus,
    #[serde(default)]
    pub negotiated_price: Option<OfferAmount>,
    #[serde(alias = "counterPrice", default)]
    pub counter_offer: Option<OfferAmount>,
    #[serde(default)]
    pub inspection_date: Option<String>,
    #[serde(default)]
    pub inspection_time: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub pending_response_from: Option<PartyRole>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(alias = "loi", default)]
    pub letter_of_intention: Option<String>,
}

impl NegotiationRecord {
    pub fn has_letter_of_intention(&self) -> bool {
        non_blank(self.letter_of_intention.as_deref()).is_some()
    }

    pub fn negotiation_type(&self) -> NegotiationType {
        NegotiationType::derive(
            self.property.listing_category.as_ref(),
            self.has_letter_of_intention(),
        )
    }

    /// Identity of the viewer acting on this record. Sellers act as the
    /// property owner, falling back to the record's owner; buyers act as the
    /// requester.
    pub fn actor_for(&self, role: PartyRole) -> ActorIdentity {
        let id = match role {
            PartyRole::Seller => self
                .property
                .owner
                .as_ref()
                .map(|owner| owner.id.as_str())
                .and_then(|id| non_blank(Some(id)))
                .or_else(|| non_blank(self.owner.as_ref().map(|owner| owner.id.as_str()))),
            PartyRole::Buyer => non_blank(self.requested_by.as_ref().map(|r| r.id.as_str())),
        };

        ActorIdentity {
            id: id.map(str::to_string),
            role: Some(role),
        }
    }

    /// Merge the two server-owned fields a transition reports back. Fields
    /// the server leaves out keep their current value.
    pub fn merge_inspection(
        &mut self,
        status: Option<&NegotiationStatus>,
        pending_response_from: Option<PartyRole>,
    ) -> bool {
        let mut changed = false;
        if let Some(status) = status {
            if self.status != *status {
                self.status = status.clone();
                changed = true;
            }
        }
        if let Some(pending) = pending_response_from {
            if self.pending_response_from != Some(pending) {
                self.pending_response_from = Some(pending);
                changed = true;
            }
        }
        changed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NegotiationType {
    #[default]
    Normal,
    Loi,
}

impl NegotiationType {
    /// Plain sale or rent listings without a letter of intention negotiate
    /// normally; everything else goes through the LOI track.
    pub fn derive(category: Option<&ListingCategory>, has_letter_of_intention: bool) -> Self {
        match category {
            Some(category) if category.is_plain_sale_or_rent() && !has_letter_of_intention => {
                NegotiationType::Normal
            }
            _ => NegotiationType::Loi,
        }
    }
}

/// The party acting in this session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActorIdentity {
    pub id: Option<String>,
    pub role: Option<PartyRole>,
}

impl ActorIdentity {
    pub fn new(id: impl Into<String>, role: PartyRole) -> Self {
        Self {
            id: Some(id.into()),
            role: Some(role),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.resolved().is_some()
    }

    pub fn resolved(&self) -> Option<(&str, PartyRole)> {
        match (non_blank(self.id.as_deref()), self.role) {
            (Some(id), Some(role)) => Some((id, role)),
            _ => None,
        }
    }
}

/// What the actor decides about the price. Each choice is also a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceDecision {
    Accept,
    Reject,
    Counter,
}

impl PriceDecision {
    pub fn verb(&self) -> &'static str {
        match self {
            PriceDecision::Accept => "accept",
            PriceDecision::Reject => "reject",
            PriceDecision::Counter => "counter",
        }
    }
    pub fn gerund(&self) -> &'static str {
        match self {
            PriceDecision::Accept => "accepting",
            PriceDecision::Reject => "rejecting",
            PriceDecision::Counter => "countering",
        }
    }
    pub fn target_status(&self) -> NegotiationStatus {
        match self {
            PriceDecision::Accept => NegotiationStatus::Accepted,
            PriceDecision::Reject => NegotiationStatus::Rejected,
            PriceDecision::Counter => NegotiationStatus::Countered,
        }
    }
}

impl FromStr for PriceDecision {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept" => Ok(PriceDecision::Accept),
            "reject" => Ok(PriceDecision::Reject),
            "counter" => Ok(PriceDecision::Counter),
            _ => Err(ValidationError::InvalidStatus(s.to_string())),
        }
    }
}

/// What the actor decides about the proposed inspection date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateDecision {
    None,
    Available,
    Unavailable,
    Counter,
}

/// The two independent decision axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    #[serde(rename = "priceDecision")]
    pub price: Option<PriceDecision>,
    #[serde(rename = "dateDecision")]
    pub date: Option<DateDecision>,
}
