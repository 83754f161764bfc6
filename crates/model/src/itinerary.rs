use serde::{Deserialize, Serialize};
use utility::{
    id::{HasId, Id},
    time::TimeOfDay,
};

use crate::{location::Location, poi::Poi, trip::Trip};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Poi,
    Activity,
    Hotel,
    Transport,
    Meal,
    FreeTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Walking,
    Transit,
    Taxi,
    Drive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostConfidence {
    Fixed,
    Estimated,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub amount: rust_decimal::Decimal,
    pub currency: utility::money::Currency,
    pub confidence: CostConfidence,
}

/// Embedded on an item, describing how the traveler gets there from the
/// previous item in the day.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSegment {
    pub from_item_id: Option<Id<ItineraryItem>>,
    pub to_item_id: Id<ItineraryItem>,
    pub mode: TransportMode,
    pub distance_km: f64,
    pub duration_minutes: u32,
    pub cost_estimate: Option<CostEstimate>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryItem {
    pub trip_id: Id<Trip>,
    pub day: u32,
    pub item_type: ItemType,
    pub poi_id: Option<Id<Poi>>,
    pub name: String,
    pub location: Option<Location>,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub duration_minutes: u32,
    pub is_pinned: bool,
    pub order: u32,
    pub route_from_previous: Option<RouteSegment>,
    pub cost_estimate: Option<CostEstimate>,
    pub notes: Option<String>,
}

impl HasId for ItineraryItem {}

impl ItineraryItem {
    /// Whether `[start_time, end_time)` of `self` overlaps `[start_time,
    /// end_time)` of `other`.
    pub fn overlaps(&self, other: &ItineraryItem) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }
}
