//! An in-memory `PlanStore` used by generator/editor/booking/replan unit
//! tests in place of the Postgres-backed `database` crate.

use std::{
    collections::HashMap,
    sync::Arc,
};

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
use plan_core::{
    error::{PlanError, Result},
    store::{
        BookingRepo, EventRepo, ItineraryRepo, PlanStore, PlanStoreOps, PlanStoreTransaction,
        ReplanRepo, TripRepo,
    },
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use utility::id::Id;

#[derive(Default, Clone)]
struct State {
    trips: HashMap<Id<Trip>, Trip>,
    preferences: HashMap<Id<Trip>, TripPreferences>,
    versions: HashMap<Id<Trip>, Vec<WithId<ItineraryVersion>>>,
    bookings: HashMap<Id<Booking>, Booking>,
    booking_history: HashMap<Id<Booking>, Vec<BookingStateHistoryEntry>>,
    idempotency: HashMap<String, IdempotencyRecord>,
    events: HashMap<Id<EventSignal>, EventSignal>,
    triggers: HashMap<Id<ReplanTrigger>, ReplanTrigger>,
    proposals: HashMap<Id<ReplanProposal>, ReplanProposal>,
    applications: HashMap<Id<ReplanApplication>, ReplanApplication>,
}

#[derive(Clone)]
pub struct InMemoryPlanStore {
    inner: Arc<Mutex<State>>,
}

impl Default for InMemoryPlanStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPlanStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(State::default())),
        }
    }
}

fn not_found<T>(what: &str, id: T) -> PlanError
where
    T: std::fmt::Display,
{
    PlanError::NotFound(format!("{what} {id}"))
}

/// Holds the whole store locked for the transaction's lifetime: correct but
/// coarse-grained, which is acceptable for a test double standing in for the
/// per-trip sentinel-row locking the Postgres store uses.
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<State>,
    snapshot: State,
}

#[async_trait]
impl TripRepo for InMemoryTransaction {
    async fn create_trip(&mut self, trip: Trip, preferences: TripPreferences) -> Result<WithId<Trip>> {
        let id = Id::generate();
        self.guard.trips.insert(id, trip.clone());
        self.guard.preferences.insert(id, preferences);
        Ok(WithId::new(id, trip))
    }

    async fn get_trip(&mut self, id: Id<Trip>) -> Result<WithId<Trip>> {
        self.guard
            .trips
            .get(&id)
            .cloned()
            .map(|trip| WithId::new(id, trip))
            .ok_or_else(|| not_found("trip", id))
    }

    async fn update_trip(&mut self, trip: WithId<Trip>) -> Result<WithId<Trip>> {
        if !self.guard.trips.contains_key(&trip.id) {
            return Err(not_found("trip", trip.id));
        }
        self.guard.trips.insert(trip.id, trip.content.clone());
        Ok(trip)
    }

    async fn get_preferences(&mut self, trip_id: Id<Trip>) -> Result<TripPreferences> {
        self.guard
            .preferences
            .get(&trip_id)
            .cloned()
            .ok_or_else(|| not_found("trip preferences for", trip_id))
    }

    async fn put_preferences(&mut self, trip_id: Id<Trip>, preferences: TripPreferences) -> Result<()> {
        self.guard.preferences.insert(trip_id, preferences);
        Ok(())
    }

    async fn lock_trip(&mut self, _trip_id: Id<Trip>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ItineraryRepo for InMemoryTransaction {
    async fn latest_version(&mut self, trip_id: Id<Trip>) -> Result<Option<WithId<ItineraryVersion>>> {
        Ok(self.guard.versions.get(&trip_id).and_then(|v| v.last().cloned()))
    }

    async fn get_version(&mut self, trip_id: Id<Trip>, version: u32) -> Result<WithId<ItineraryVersion>> {
        self.guard
            .versions
            .get(&trip_id)
            .and_then(|versions| versions.iter().find(|v| v.content.version == version).cloned())
            .ok_or_else(|| not_found("itinerary version", version))
    }

    async fn put_version(&mut self, version: ItineraryVersion) -> Result<WithId<ItineraryVersion>> {
        let versions = self.guard.versions.entry(version.trip_id).or_default();
        let expected = versions.last().map(|v| v.content.version + 1).unwrap_or(1);
        if version.version != expected {
            return Err(PlanError::Conflict(format!(
                "expected version {expected}, got {}",
                version.version
            )));
        }
        let id = Id::generate();
        let with_id = WithId::new(id, version);
        versions.push(with_id.clone());
        Ok(with_id)
    }

    async fn get_item(&mut self, id: Id<ItineraryItem>) -> Result<WithId<ItineraryItem>> {
        self.guard
            .versions
            .values()
            .filter_map(|versions| versions.last())
            .find_map(|version| version.content.find_item(id).cloned())
            .ok_or_else(|| not_found("itinerary item", id))
    }
}

#[async_trait]
impl BookingRepo for InMemoryTransaction {
    async fn insert_booking(&mut self, booking: Booking) -> Result<WithId<Booking>> {
        let id = Id::generate();
        self.guard.bookings.insert(id, booking.clone());
        self.guard.booking_history.entry(id).or_default();
        Ok(WithId::new(id, booking))
    }

    async fn get_booking(&mut self, id: Id<Booking>) -> Result<WithId<Booking>> {
        self.guard
            .bookings
            .get(&id)
            .cloned()
            .map(|booking| WithId::new(id, booking))
            .ok_or_else(|| not_found("booking", id))
    }

    async fn list_bookings_for_trip(&mut self, trip_id: Id<Trip>) -> Result<Vec<WithId<Booking>>> {
        Ok(self
            .guard
            .bookings
            .iter()
            .filter(|(_, booking)| booking.trip_id == trip_id)
            .map(|(id, booking)| WithId::new(*id, booking.clone()))
            .collect())
    }

    async fn update_booking_status(
        &mut self,
        id: Id<Booking>,
        status: BookingStatus,
        entry: BookingStateHistoryEntry,
    ) -> Result<WithId<Booking>> {
        let booking = self
            .guard
            .bookings
            .get_mut(&id)
            .ok_or_else(|| not_found("booking", id))?;
        if !BookingStatus::can_transition(Some(booking.status), status) {
            return Err(PlanError::Conflict(format!(
                "cannot transition booking {id} from {:?} to {status:?}",
                booking.status
            )));
        }
        booking.status = status;
        let snapshot = booking.clone();
        self.guard.booking_history.entry(id).or_default().push(entry);
        Ok(WithId::new(id, snapshot))
    }

    async fn find_by_external_id(&mut self, external_booking_id: &str) -> Result<Option<WithId<Booking>>> {
        Ok(self
            .guard
            .bookings
            .iter()
            .find(|(_, booking)| booking.external_booking_id.as_deref() == Some(external_booking_id))
            .map(|(id, booking)| WithId::new(*id, booking.clone())))
    }

    async fn record_outcome(
        &mut self,
        id: Id<Booking>,
        status: BookingStatus,
        outcome: BookingOutcome,
        entry: BookingStateHistoryEntry,
    ) -> Result<WithId<Booking>> {
        let booking = self
            .guard
            .bookings
            .get_mut(&id)
            .ok_or_else(|| not_found("booking", id))?;
        if !BookingStatus::can_transition(Some(booking.status), status) {
            return Err(PlanError::Conflict(format!(
                "cannot transition booking {id} from {:?} to {status:?}",
                booking.status
            )));
        }
        booking.status = status;
        booking.price = outcome.price;
        booking.policies = outcome.policies;
        booking.voucher_url = outcome.voucher_url;
        booking.voucher_data = outcome.voucher_data;
        booking.confirmation_number = outcome.confirmation_number;
        booking.external_booking_id = outcome.external_booking_id;
        let snapshot = booking.clone();
        self.guard.booking_history.entry(id).or_default().push(entry);
        Ok(WithId::new(id, snapshot))
    }

    async fn booking_history(&mut self, id: Id<Booking>) -> Result<Vec<BookingStateHistoryEntry>> {
        Ok(self.guard.booking_history.get(&id).cloned().unwrap_or_default())
    }

    async fn find_by_idempotency_key(&mut self, key: &str) -> Result<Option<IdempotencyRecord>> {
        Ok(self.guard.idempotency.get(key).cloned())
    }

    async fn put_idempotency_record(&mut self, record: IdempotencyRecord) -> Result<()> {
        self.guard.idempotency.insert(record.key.clone(), record);
        Ok(())
    }
}

#[async_trait]
impl EventRepo for InMemoryTransaction {
    async fn insert_event(&mut self, event: EventSignal) -> Result<WithId<EventSignal>> {
        let id = Id::generate();
        self.guard.events.insert(id, event.clone());
        Ok(WithId::new(id, event))
    }

    async fn get_event(&mut self, id: Id<EventSignal>) -> Result<WithId<EventSignal>> {
        self.guard
            .events
            .get(&id)
            .cloned()
            .map(|event| WithId::new(id, event))
            .ok_or_else(|| not_found("event signal", id))
    }

    async fn mark_event_processed(&mut self, id: Id<EventSignal>, replan_triggered: bool) -> Result<()> {
        let event = self
            .guard
            .events
            .get_mut(&id)
            .ok_or_else(|| not_found("event signal", id))?;
        event.processed = true;
        event.replan_triggered = replan_triggered;
        Ok(())
    }

    async fn unprocessed_events(&mut self, trip_id: Id<Trip>) -> Result<Vec<WithId<EventSignal>>> {
        Ok(self
            .guard
            .events
            .iter()
            .filter(|(_, event)| event.trip_id == trip_id && !event.processed)
            .map(|(id, event)| WithId::new(*id, event.clone()))
            .collect())
    }
}

#[async_trait]
impl ReplanRepo for InMemoryTransaction {
    async fn insert_trigger(&mut self, trigger: ReplanTrigger) -> Result<WithId<ReplanTrigger>> {
        let id = Id::generate();
        self.guard.triggers.insert(id, trigger.clone());
        Ok(WithId::new(id, trigger))
    }

    async fn get_trigger(&mut self, id: Id<ReplanTrigger>) -> Result<WithId<ReplanTrigger>> {
        self.guard
            .triggers
            .get(&id)
            .cloned()
            .map(|trigger| WithId::new(id, trigger))
            .ok_or_else(|| not_found("replan trigger", id))
    }

    async fn mark_trigger_processed(&mut self, id: Id<ReplanTrigger>) -> Result<()> {
        self.guard
            .triggers
            .get_mut(&id)
            .ok_or_else(|| not_found("replan trigger", id))?
            .processed = true;
        Ok(())
    }

    async fn insert_proposal(&mut self, proposal: ReplanProposal) -> Result<WithId<ReplanProposal>> {
        let id = Id::generate();
        self.guard.proposals.insert(id, proposal.clone());
        Ok(WithId::new(id, proposal))
    }

    async fn get_proposal(&mut self, id: Id<ReplanProposal>) -> Result<WithId<ReplanProposal>> {
        self.guard
            .proposals
            .get(&id)
            .cloned()
            .map(|proposal| WithId::new(id, proposal))
            .ok_or_else(|| not_found("replan proposal", id))
    }

    async fn proposals_for_trigger(
        &mut self,
        trigger_id: Id<ReplanTrigger>,
    ) -> Result<Vec<WithId<ReplanProposal>>> {
        Ok(self
            .guard
            .proposals
            .iter()
            .filter(|(_, proposal)| proposal.trigger_id == trigger_id)
            .map(|(id, proposal)| WithId::new(*id, proposal.clone()))
            .collect())
    }

    async fn insert_application(
        &mut self,
        application: ReplanApplication,
    ) -> Result<WithId<ReplanApplication>> {
        let id = Id::generate();
        self.guard.applications.insert(id, application.clone());
        Ok(WithId::new(id, application))
    }

    async fn get_application(&mut self, id: Id<ReplanApplication>) -> Result<WithId<ReplanApplication>> {
        self.guard
            .applications
            .get(&id)
            .cloned()
            .map(|application| WithId::new(id, application))
            .ok_or_else(|| not_found("replan application", id))
    }

    async fn find_application_by_idempotency_key(
        &mut self,
        key: &str,
    ) -> Result<Option<WithId<ReplanApplication>>> {
        Ok(self
            .guard
            .applications
            .iter()
            .find(|(_, application)| application.idempotency_key == key)
            .map(|(id, application)| WithId::new(*id, application.clone())))
    }

    async fn mark_rolled_back(&mut self, id: Id<ReplanApplication>, at: DateTime<Utc>) -> Result<()> {
        let application = self
            .guard
            .applications
            .get_mut(&id)
            .ok_or_else(|| not_found("replan application", id))?;
        application.rolled_back = true;
        application.rolled_back_at = Some(at);
        Ok(())
    }
}

#[async_trait]
impl PlanStoreTransaction for InMemoryTransaction {
    async fn commit(self) -> Result<()> {
        Ok(())
    }

    async fn rollback(mut self) -> Result<()> {
        *self.guard = self.snapshot;
        Ok(())
    }
}

/// Non-transactional handle for read-mostly call sites. Each call briefly
/// locks the store and releases it, same as a real autocommit connection.
pub struct InMemoryAutocommit {
    inner: Arc<Mutex<State>>,
}

async fn with_lock<F, Fut, T>(inner: &Arc<Mutex<State>>, body: F) -> Result<T>
where
    F: FnOnce(&mut InMemoryTransaction) -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let guard = inner.clone().lock_owned().await;
    let snapshot = guard.clone();
    let mut tx = InMemoryTransaction { guard, snapshot };
    body(&mut tx).await
}

#[async_trait]
impl TripRepo for InMemoryAutocommit {
    async fn create_trip(&mut self, trip: Trip, preferences: TripPreferences) -> Result<WithId<Trip>> {
        with_lock(&self.inner, |tx| tx.create_trip(trip, preferences)).await
    }

    async fn get_trip(&mut self, id: Id<Trip>) -> Result<WithId<Trip>> {
        with_lock(&self.inner, |tx| tx.get_trip(id)).await
    }

    async fn update_trip(&mut self, trip: WithId<Trip>) -> Result<WithId<Trip>> {
        with_lock(&self.inner, |tx| tx.update_trip(trip)).await
    }

    async fn get_preferences(&mut self, trip_id: Id<Trip>) -> Result<TripPreferences> {
        with_lock(&self.inner, |tx| tx.get_preferences(trip_id)).await
    }

    async fn put_preferences(&mut self, trip_id: Id<Trip>, preferences: TripPreferences) -> Result<()> {
        with_lock(&self.inner, |tx| tx.put_preferences(
            trip_id,
            preferences
        )).await
    }

    async fn lock_trip(&mut self, trip_id: Id<Trip>) -> Result<()> {
        with_lock(&self.inner, |tx| tx.lock_trip(trip_id)).await
    }
}

#[async_trait]
impl ItineraryRepo for InMemoryAutocommit {
    async fn latest_version(&mut self, trip_id: Id<Trip>) -> Result<Option<WithId<ItineraryVersion>>> {
        with_lock(&self.inner, |tx| tx.latest_version(trip_id)).await
    }

    async fn get_version(&mut self, trip_id: Id<Trip>, version: u32) -> Result<WithId<ItineraryVersion>> {
        with_lock(&self.inner, |tx| tx.get_version(
            trip_id, version
        )).await
    }

    async fn put_version(&mut self, version: ItineraryVersion) -> Result<WithId<ItineraryVersion>> {
        with_lock(&self.inner, |tx| tx.put_version(version)).await
    }

    async fn get_item(&mut self, id: Id<ItineraryItem>) -> Result<WithId<ItineraryItem>> {
        with_lock(&self.inner, |tx| tx.get_item(id)).await
    }
}

#[async_trait]
impl BookingRepo for InMemoryAutocommit {
    async fn insert_booking(&mut self, booking: Booking) -> Result<WithId<Booking>> {
        with_lock(&self.inner, |tx| tx.insert_booking(booking)).await
    }

    async fn get_booking(&mut self, id: Id<Booking>) -> Result<WithId<Booking>> {
        with_lock(&self.inner, |tx| tx.get_booking(id)).await
    }

    async fn list_bookings_for_trip(&mut self, trip_id: Id<Trip>) -> Result<Vec<WithId<Booking>>> {
        with_lock(&self.inner, |tx| tx.list_bookings_for_trip(
            trip_id
        )).await
    }

    async fn update_booking_status(
        &mut self,
        id: Id<Booking>,
        status: BookingStatus,
        entry: BookingStateHistoryEntry,
    ) -> Result<WithId<Booking>> {
        with_lock(&self.inner, |tx| tx.update_booking_status(
            id, status, entry
        )).await
    }

    async fn find_by_external_id(&mut self, external_booking_id: &str) -> Result<Option<WithId<Booking>>> {
        let external_booking_id = external_booking_id.to_string();
        with_lock(&self.inner, |tx| tx.find_by_external_id(&external_booking_id)).await
    }

    async fn record_outcome(
        &mut self,
        id: Id<Booking>,
        status: BookingStatus,
        outcome: BookingOutcome,
        entry: BookingStateHistoryEntry,
    ) -> Result<WithId<Booking>> {
        with_lock(&self.inner, |tx| tx.record_outcome(id, status, outcome, entry)).await
    }

    async fn booking_history(&mut self, id: Id<Booking>) -> Result<Vec<BookingStateHistoryEntry>> {
        with_lock(&self.inner, |tx| tx.booking_history(id)).await
    }

    async fn find_by_idempotency_key(&mut self, key: &str) -> Result<Option<IdempotencyRecord>> {
        let key = key.to_string();
        with_lock(&self.inner, |tx| tx.find_by_idempotency_key(
            &key
        )).await
    }

    async fn put_idempotency_record(&mut self, record: IdempotencyRecord) -> Result<()> {
        with_lock(&self.inner, |tx| tx.put_idempotency_record(
            record
        )).await
    }
}

#[async_trait]
impl EventRepo for InMemoryAutocommit {
    async fn insert_event(&mut self, event: EventSignal) -> Result<WithId<EventSignal>> {
        with_lock(&self.inner, |tx| tx.insert_event(event)).await
    }

    async fn get_event(&mut self, id: Id<EventSignal>) -> Result<WithId<EventSignal>> {
        with_lock(&self.inner, |tx| tx.get_event(id)).await
    }

    async fn mark_event_processed(&mut self, id: Id<EventSignal>, replan_triggered: bool) -> Result<()> {
        with_lock(&self.inner, |tx| tx.mark_event_processed(
            id,
            replan_triggered
        )).await
    }

    async fn unprocessed_events(&mut self, trip_id: Id<Trip>) -> Result<Vec<WithId<EventSignal>>> {
        with_lock(&self.inner, |tx| tx.unprocessed_events(
            trip_id
        )).await
    }
}

#[async_trait]
impl ReplanRepo for InMemoryAutocommit {
    async fn insert_trigger(&mut self, trigger: ReplanTrigger) -> Result<WithId<ReplanTrigger>> {
        with_lock(&self.inner, |tx| tx.insert_trigger(trigger)).await
    }

    async fn get_trigger(&mut self, id: Id<ReplanTrigger>) -> Result<WithId<ReplanTrigger>> {
        with_lock(&self.inner, |tx| tx.get_trigger(id)).await
    }

    async fn mark_trigger_processed(&mut self, id: Id<ReplanTrigger>) -> Result<()> {
        with_lock(&self.inner, |tx| tx.mark_trigger_processed(
            id
        )).await
    }

    async fn insert_proposal(&mut self, proposal: ReplanProposal) -> Result<WithId<ReplanProposal>> {
        with_lock(&self.inner, |tx| tx.insert_proposal(proposal)).await
    }

    async fn get_proposal(&mut self, id: Id<ReplanProposal>) -> Result<WithId<ReplanProposal>> {
        with_lock(&self.inner, |tx| tx.get_proposal(id)).await
    }

    async fn proposals_for_trigger(
        &mut self,
        trigger_id: Id<ReplanTrigger>,
    ) -> Result<Vec<WithId<ReplanProposal>>> {
        with_lock(&self.inner, |tx| tx.proposals_for_trigger(
            trigger_id
        )).await
    }

    async fn insert_application(
        &mut self,
        application: ReplanApplication,
    ) -> Result<WithId<ReplanApplication>> {
        with_lock(&self.inner, |tx| tx.insert_application(
            application
        )).await
    }

    async fn get_application(&mut self, id: Id<ReplanApplication>) -> Result<WithId<ReplanApplication>> {
        with_lock(&self.inner, |tx| tx.get_application(id)).await
    }

    async fn find_application_by_idempotency_key(
        &mut self,
        key: &str,
    ) -> Result<Option<WithId<ReplanApplication>>> {
        with_lock(&self.inner, |tx| tx.find_application_by_idempotency_key(key)).await
    }

    async fn mark_rolled_back(&mut self, id: Id<ReplanApplication>, at: DateTime<Utc>) -> Result<()> {
        with_lock(&self.inner, |tx| tx.mark_rolled_back(id, at)).await
    }
}

impl PlanStoreOps for InMemoryAutocommit {}

#[async_trait]
impl PlanStore for InMemoryPlanStore {
    type Transaction = InMemoryTransaction;
    type Autocommit = InMemoryAutocommit;

    async fn begin(&self) -> Result<Self::Transaction> {
        let guard = self.inner.clone().lock_owned().await;
        let snapshot = guard.clone();
        Ok(InMemoryTransaction { guard, snapshot })
    }

    fn auto(&self) -> Self::Autocommit {
        InMemoryAutocommit {
            inner: self.inner.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use model::owner::Owner;
    use plan_core::store::PlanStore as _;

    use super::*;

    fn sample_preferences() -> TripPreferences {
        use model::preferences::{Budget, Constraints, DailyWindow, DateRange, Travelers, TripStyle};
        use utility::{money::Currency, time::TimeOfDay};

        TripPreferences {
            destination: "Bangkok".into(),
            dates: DateRange {
                start: "2026-03-01".into(),
                end: "2026-03-02".into(),
            },
            travelers: Travelers::new(2, 0, 0).unwrap(),
            budget: Budget {
                total: None,
                per_day: None,
                currency: Currency::parse("THB").unwrap(),
            },
            style: TripStyle::Balanced,
            daily_window: DailyWindow::new(
                TimeOfDay::parse("09:00").unwrap(),
                TimeOfDay::parse("21:00").unwrap(),
            )
            .unwrap(),
            constraints: Constraints::default(),
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = InMemoryPlanStore::new();
        let trip = store
            .perform_transaction(|tx| {
                Box::pin(async move { tx.create_trip(Trip::new(Owner::guest(uuid::Uuid::new_v4())), sample_preferences()).await })
            })
            .await
            .unwrap();

        let fetched = store.auto().get_trip(trip.id).await.unwrap();
        assert_eq!(fetched.id, trip.id);
    }

    #[tokio::test]
    async fn rollback_discards_writes() {
        let store = InMemoryPlanStore::new();
        let trip_id = {
            let trip = store
                .perform_transaction(|tx| {
                    Box::pin(async move {
                        tx.create_trip(Trip::new(Owner::guest(uuid::Uuid::new_v4())), sample_preferences())
                            .await
                    })
                })
                .await
                .unwrap();
            trip.id
        };

        let mut tx = store.begin().await.unwrap();
        tx.update_trip(WithId::new(trip_id, {
            let mut trip = tx.get_trip(trip_id).await.unwrap().content;
            trip.status = model::trip::TripStatus::Cancelled;
            trip
        }))
        .await
        .unwrap();
        tx.rollback().await.unwrap();

        let fetched = store.auto().get_trip(trip_id).await.unwrap();
        assert_eq!(fetched.content.status, model::trip::TripStatus::Draft);
    }

    #[tokio::test]
    async fn version_numbers_must_be_sequential() {
        let store = InMemoryPlanStore::new();
        let mut tx = store.begin().await.unwrap();
        let trip_id = Id::generate();
        let err = tx
            .put_version(ItineraryVersion {
                trip_id,
                version: 2,
                change_type: model::version::ChangeType::Generate,
                changed_by: None,
                days: vec![],
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }
}
