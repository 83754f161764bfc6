use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utility::{id::HasId, money::Money, time::TimeOfDay};

use crate::{itinerary::ItineraryItem, preferences::Travelers, trip::Trip};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Failed,
    Canceled,
    Refunded,
}

impl BookingStatus {
    /// Valid state transitions for a booking. `from = None` models the
    /// initial `null -> pending` creation edge.
    pub fn can_transition(from: Option<BookingStatus>, to: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (from, to),
            (None, Pending)
                | (Some(Pending), Confirmed)
                | (Some(Pending), Failed)
                | (Some(Failed), Pending)
                | (Some(Confirmed), Canceled)
                | (Some(Confirmed), Refunded)
                | (Some(Canceled), Refunded)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationPolicy {
    pub cancellation: String,
    pub refund: String,
    pub cancellation_deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerDetails {
    pub travelers: Travelers,
    pub lead_traveler_name: String,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub email: String,
    pub phone: Option<String>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub trip_id: utility::id::Id<Trip>,
    pub item_id: Option<utility::id::Id<ItineraryItem>>,
    pub provider_id: String,
    pub provider_type: String,
    pub external_booking_id: Option<String>,
    pub status: BookingStatus,
    pub price: Option<Money>,
    pub policies: Option<CancellationPolicy>,
    pub voucher_url: Option<String>,
    pub voucher_data: Option<String>,
    pub confirmation_number: Option<String>,
    pub traveler_details: TravelerDetails,
    pub booking_date: NaiveDate,
    pub booking_time: Option<TimeOfDay>,
    pub contact_info: ContactInfo,
}

impl HasId for Booking {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingStateHistoryEntry {
    pub from_status: Option<BookingStatus>,
    pub to_status: BookingStatus,
    pub reason: Option<String>,
    pub changed_by: String,
    pub ts: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub key: String,
    pub booking_id: utility::id::Id<Booking>,
}

/// The provider-reported details a booking gains once a `createBooking`
/// call settles, applied together with the status transition in a single
/// store write.
#[derive(Debug, Clone, Default)]
pub struct BookingOutcome {
    pub price: Option<Money>,
    pub policies: Option<CancellationPolicy>,
    pub voucher_url: Option<String>,
    pub voucher_data: Option<String>,
    pub confirmation_number: Option<String>,
    pub external_booking_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_graph_edges_are_valid() {
        use BookingStatus::*;
        assert!(BookingStatus::can_transition(None, Pending));
        assert!(BookingStatus::can_transition(Some(Pending), Confirmed));
        assert!(BookingStatus::can_transition(Some(Pending), Failed));
        assert!(BookingStatus::can_transition(Some(Failed), Pending));
        assert!(BookingStatus::can_transition(Some(Confirmed), Canceled));
        assert!(BookingStatus::can_transition(Some(Confirmed), Refunded));
        assert!(BookingStatus::can_transition(Some(Canceled), Refunded));

        assert!(!BookingStatus::can_transition(Some(Pending), Canceled));
        assert!(!BookingStatus::can_transition(Some(Refunded), Pending));
        assert!(!BookingStatus::can_transition(Some(Confirmed), Pending));
        assert!(!BookingStatus::can_transition(None, Confirmed));
    }
}
