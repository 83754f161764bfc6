use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utility::{
    id::{HasId, Id},
    time::TimeOfDay,
};

use crate::{event::EventSignal, itinerary::ItineraryItem, trip::Trip};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplanTrigger {
    pub trip_id: Id<Trip>,
    pub event_signal_id: Id<EventSignal>,
    pub reason: String,
    pub priority: Priority,
    pub processed: bool,
}

impl HasId for ReplanTrigger {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacedItem {
    pub old_item_id: Id<ItineraryItem>,
    pub new_item: ItineraryItem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovedItem {
    pub item_id: Id<ItineraryItem>,
    pub new_day: u32,
    pub new_start_time: TimeOfDay,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProposalChanges {
    pub replaced: Vec<ReplacedItem>,
    pub moved: Vec<MovedItem>,
    pub removed: Vec<Id<ItineraryItem>>,
    pub added: Vec<ItineraryItem>,
}

impl ProposalChanges {
    pub fn is_empty(&self) -> bool {
        self.replaced.is_empty()
            && self.moved.is_empty()
            && self.removed.is_empty()
            && self.added.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalImpact {
    pub time_change_minutes: i64,
    pub cost_change: rust_decimal::Decimal,
    pub distance_change_km: f64,
    pub disruption_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplanProposal {
    pub trip_id: Id<Trip>,
    pub trigger_id: Id<ReplanTrigger>,
    pub score: f64,
    pub explanation: String,
    pub changes: ProposalChanges,
    pub impact: ProposalImpact,
}

impl HasId for ReplanProposal {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplanApplication {
    pub trip_id: Id<Trip>,
    pub proposal_id: Id<ReplanProposal>,
    pub applied_version: u32,
    pub rollback_available_until: DateTime<Utc>,
    pub rolled_back: bool,
    pub rolled_back_at: Option<DateTime<Utc>>,
    /// Caller-supplied idempotency key from the apply request; replaying the
    /// same key against a different proposal is rejected as a conflict.
    pub idempotency_key: String,
}

impl HasId for ReplanApplication {}

impl ReplanApplication {
    pub fn can_roll_back(&self, now: DateTime<Utc>) -> bool {
        !self.rolled_back && now < self.rollback_available_until
    }
}
