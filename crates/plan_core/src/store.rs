use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{
    booking::{Booking, BookingOutcome, BookingStateHistoryEntry, BookingStatus, IdempotencyRecord},
    event::EventSignal,
    itinerary::ItineraryItem,
    preferences::TripPreferences,
    replan::{ReplanApplication, ReplanProposal, ReplanTrigger},
    trip::Trip,
    version::ItineraryVersion,
    WithId,
};
use std::future::Future;
use utility::id::Id;

use crate::error::Result;

#[async_trait]
pub trait TripRepo {
    async fn create_trip(&mut self, trip: Trip, preferences: TripPreferences) -> Result<WithId<Trip>>;
    async fn get_trip(&mut self, id: Id<Trip>) -> Result<WithId<Trip>>;
    async fn update_trip(&mut self, trip: WithId<Trip>) -> Result<WithId<Trip>>;
    async fn get_preferences(&mut self, trip_id: Id<Trip>) -> Result<TripPreferences>;
    async fn put_preferences(&mut self, trip_id: Id<Trip>, preferences: TripPreferences) -> Result<()>;

    /// Locks the trip's sentinel row for the duration of the enclosing
    /// transaction, serializing concurrent mutations against it.
    async fn lock_trip(&mut self, trip_id: Id<Trip>) -> Result<()>;
}

#[async_trait]
pub trait ItineraryRepo {
    async fn latest_version(&mut self, trip_id: Id<Trip>) -> Result<Option<WithId<ItineraryVersion>>>;
    async fn get_version(&mut self, trip_id: Id<Trip>, version: u32) -> Result<WithId<ItineraryVersion>>;
    /// Appends a new, immutable version. Callers compute `version` as
    /// `latest + 1`; implementations reject a version that is not exactly
    /// one past the current latest, under the trip's lock.
    async fn put_version(&mut self, version: ItineraryVersion) -> Result<WithId<ItineraryVersion>>;
    async fn get_item(&mut self, id: Id<ItineraryItem>) -> Result<WithId<ItineraryItem>>;
}

#[async_trait]
pub trait BookingRepo {
    async fn insert_booking(&mut self, booking: Booking) -> Result<WithId<Booking>>;
    async fn get_booking(&mut self, id: Id<Booking>) -> Result<WithId<Booking>>;
    async fn list_bookings_for_trip(&mut self, trip_id: Id<Trip>) -> Result<Vec<WithId<Booking>>>;
    async fn find_by_external_id(&mut self, external_booking_id: &str) -> Result<Option<WithId<Booking>>>;
    async fn update_booking_status(
        &mut self,
        id: Id<Booking>,
        status: BookingStatus,
        entry: BookingStateHistoryEntry,
    ) -> Result<WithId<Booking>>;
    /// Transitions `id` to `status` and records the provider-reported
    /// outcome in the same write.
    async fn record_outcome(
        &mut self,
        id: Id<Booking>,
        status: BookingStatus,
        outcome: BookingOutcome,
        entry: BookingStateHistoryEntry,
    ) -> Result<WithId<Booking>>;
    async fn booking_history(&mut self, id: Id<Booking>) -> Result<Vec<BookingStateHistoryEntry>>;
    async fn find_by_idempotency_key(&mut self, key: &str) -> Result<Option<IdempotencyRecord>>;
    async fn put_idempotency_record(&mut self, record: IdempotencyRecord) -> Result<()>;
}

#[async_trait]
pub trait EventRepo {
    async fn insert_event(&mut self, event: EventSignal) -> Result<WithId<EventSignal>>;
    async fn get_event(&mut self, id: Id<EventSignal>) -> Result<WithId<EventSignal>>;
    async fn mark_event_processed(&mut self, id: Id<EventSignal>, replan_triggered: bool) -> Result<()>;
    async fn unprocessed_events(&mut self, trip_id: Id<Trip>) -> Result<Vec<WithId<EventSignal>>>;
}

#[async_trait]
pub trait ReplanRepo {
    async fn insert_trigger(&mut self, trigger: ReplanTrigger) -> Result<WithId<ReplanTrigger>>;
    async fn get_trigger(&mut self, id: Id<ReplanTrigger>) -> Result<WithId<ReplanTrigger>>;
    async fn mark_trigger_processed(&mut self, id: Id<ReplanTrigger>) -> Result<()>;

    async fn insert_proposal(&mut self, proposal: ReplanProposal) -> Result<WithId<ReplanProposal>>;
    async fn get_proposal(&mut self, id: Id<ReplanProposal>) -> Result<WithId<ReplanProposal>>;
    async fn proposals_for_trigger(
        &mut self,
        trigger_id: Id<ReplanTrigger>,
    ) -> Result<Vec<WithId<ReplanProposal>>>;

    async fn insert_application(&mut self, application: ReplanApplication) -> Result<WithId<ReplanApplication>>;
    async fn get_application(&mut self, id: Id<ReplanApplication>) -> Result<WithId<ReplanApplication>>;
    async fn find_application_by_idempotency_key(
        &mut self,
        key: &str,
    ) -> Result<Option<WithId<ReplanApplication>>>;
    async fn mark_rolled_back(&mut self, id: Id<ReplanApplication>, at: DateTime<Utc>) -> Result<()>;
}

/// Every operation a unit of work against the plan store can perform.
#[async_trait]
pub trait PlanStoreOps:
    TripRepo + ItineraryRepo + BookingRepo + EventRepo + ReplanRepo + Send
{
}

impl<T> PlanStoreOps for T where T: TripRepo + ItineraryRepo + BookingRepo + EventRepo + ReplanRepo + Send {}

#[async_trait]
pub trait PlanStoreTransaction: PlanStoreOps {
    async fn commit(self) -> Result<()>;
    async fn rollback(self) -> Result<()>;
}

/// A handle to the plan store. Cheap to clone; every clone shares the same
/// underlying connection pool.
#[async_trait]
pub trait PlanStore: Clone + Send + Sync + Sized + 'static {
    type Transaction: PlanStoreTransaction + Send;
    type Autocommit: PlanStoreOps + Send;

    async fn begin(&self) -> Result<Self::Transaction>;

    fn auto(&self) -> Self::Autocommit;

    /// Runs `action` inside a transaction, committing on `Ok` and rolling
    /// back on `Err`. This is the contract every service crate uses to make
    /// a multi-step mutation atomic.
    async fn perform_transaction<T, F, Fut>(&self, action: F) -> Result<T>
    where
        T: Send,
        F: Send + FnOnce(&mut Self::Transaction) -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        let mut tx = self.begin().await?;
        match action(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }
}
