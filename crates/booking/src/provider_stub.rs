//! In-memory reference `ProviderAdapter`, standing in for a real booking
//! provider integration in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use model::{location::Location, preferences::Travelers};
use plan_core::{
    error::{PlanError, Result},
    provider::{
        Availability, CancelBookingResult, CreateBookingRequest, CreatedBooking, CreatedBookingStatus,
        ProviderAdapter, ProviderDetails, ProviderListing, ProviderSearchOptions, RefundStatus,
    },
};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use utility::money::Currency;

/// A single bookable listing this stub knows about.
#[derive(Debug, Clone)]
pub struct StubListing {
    pub id: String,
    pub name: String,
    pub location: Location,
    pub price: Decimal,
    pub currency: Currency,
    pub available: bool,
}

struct State {
    listings: Vec<StubListing>,
    bookings: HashMap<String, CreatedBooking>,
    seen_idempotency_keys: HashMap<String, String>,
    next_id: u64,
    fail_next_create: bool,
}

/// A reference `ProviderAdapter` backed by an in-process listing table.
/// `create_booking` is idempotent on `idempotency_key`, matching the
/// contract every real adapter must uphold.
pub struct StubProviderAdapter {
    state: Mutex<State>,
}

impl StubProviderAdapter {
    pub fn new(listings: Vec<StubListing>) -> Self {
        Self {
            state: Mutex::new(State {
                listings,
                bookings: HashMap::new(),
                seen_idempotency_keys: HashMap::new(),
                next_id: 1,
                fail_next_create: false,
            }),
        }
    }

    /// Forces the next `create_booking` call to fail, to exercise the
    /// `failed` transition and `findAlternatives`.
    pub async fn fail_next_create(&self) {
        self.state.lock().await.fail_next_create = true;
    }
}

#[async_trait]
impl ProviderAdapter for StubProviderAdapter {
    async fn search(&self, options: &ProviderSearchOptions) -> Result<Vec<ProviderListing>> {
        let state = self.state.lock().await;
        let radius_km = options.radius_km.unwrap_or(50.0);
        Ok(state
            .listings
            .iter()
            .filter(|listing| listing.location.distance_km(&options.location) <= radius_km)
            .map(|listing| ProviderListing {
                id: listing.id.clone(),
                name: listing.name.clone(),
                description: None,
                location: Some(listing.location),
                price: listing.price,
                currency: listing.currency,
                rating: None,
            })
            .collect())
    }

    async fn get_details(&self, id: &str) -> Result<ProviderDetails> {
        let state = self.state.lock().await;
        let listing = state
            .listings
            .iter()
            .find(|listing| listing.id == id)
            .ok_or_else(|| PlanError::NotFound(format!("provider listing {id}")))?;
        Ok(ProviderDetails {
            id: listing.id.clone(),
            name: listing.name.clone(),
            location: Some(listing.location),
            price: listing.price,
            currency: listing.currency,
            availability: listing.available,
            cancellation: "flexible".into(),
            refund: "full_until_24h".into(),
            rating: None,
        })
    }

    async fn check_availability(
        &self,
        id: &str,
        _date: NaiveDate,
        _travelers: &Travelers,
    ) -> Result<Availability> {
        let state = self.state.lock().await;
        let listing = state
            .listings
            .iter()
            .find(|listing| listing.id == id)
            .ok_or_else(|| PlanError::NotFound(format!("provider listing {id}")))?;
        Ok(Availability { available: listing.available, slots: None })
    }

    async fn create_booking(&self, request: &CreateBookingRequest) -> Result<CreatedBooking> {
        let mut state = self.state.lock().await;

        if let Some(external_id) = state.seen_idempotency_keys.get(&request.idempotency_key) {
            return Ok(state.bookings.get(external_id).cloned().expect("idempotency map is consistent"));
        }

        if state.fail_next_create {
            state.fail_next_create = false;
            return Err(PlanError::ProviderError {
                message: "provider declined the reservation".into(),
                transient: false,
            });
        }

        let listing = state
            .listings
            .iter()
            .find(|listing| listing.id == request.provider_item_id)
            .cloned()
            .ok_or_else(|| PlanError::NotFound(format!("provider listing {}", request.provider_item_id)))?;
        if !listing.available {
            return Err(PlanError::BookingFailed(format!("{} is no longer available", listing.id)));
        }

        let external_id = format!("stub-booking-{}", state.next_id);
        state.next_id += 1;

        let created = CreatedBooking {
            booking_id: external_id.clone(),
            status: CreatedBookingStatus::Confirmed,
            price: listing.price,
            currency: listing.currency,
            cancellation: "flexible".into(),
            refund: "full_until_24h".into(),
            voucher_url: None,
            voucher_data: None,
            confirmation_number: Some(external_id.clone()),
        };
        state.bookings.insert(external_id.clone(), created.clone());
        state.seen_idempotency_keys.insert(request.idempotency_key.clone(), external_id);
        Ok(created)
    }

    async fn get_booking_status(&self, booking_id: &str) -> Result<CreatedBookingStatus> {
        let state = self.state.lock().await;
        state
            .bookings
            .get(booking_id)
            .map(|booking| booking.status)
            .ok_or_else(|| PlanError::NotFound(format!("provider booking {booking_id}")))
    }

    async fn cancel_booking(&self, booking_id: &str) -> Result<CancelBookingResult> {
        let mut state = self.state.lock().await;
        let booking = state
            .bookings
            .get_mut(booking_id)
            .ok_or_else(|| PlanError::NotFound(format!("provider booking {booking_id}")))?;
        let refund_amount = booking.price;
        Ok(CancelBookingResult {
            booking_id: booking_id.to_string(),
            refund_amount: Some(refund_amount),
            refund_status: RefundStatus::Full,
        })
    }

    async fn health_check(&self) -> bool {
        true
    }
}
