//! Itinerary editing: mutating operations over an existing itinerary
//! plus the read-only validator.

pub mod validator;

pub use validator::{validate, Issue, IssueSeverity, IssueType, ValidationReport};

use model::{
    itinerary::ItineraryItem,
    poi::Poi,
    preferences::TripPreferences,
    trip::Trip,
    version::{ChangeType, ItineraryDay, ItineraryVersion},
    WithId,
};
use plan_core::{
    error::{PlanError, Result},
    store::{ItineraryRepo, PlanStore, TripRepo},
};
use utility::{
    id::Id,
    time::{TimeError, TimeOfDay},
};

const ADD_BUFFER_MINUTES: i64 = 15;

fn reflow_day(day: &mut ItineraryDay, window_start: TimeOfDay) -> std::result::Result<(), TimeError> {
    day.items.sort_by_key(|item| item.content.order);
    let mut cursor = window_start;
    for item in day.items.iter_mut() {
        if item.content.is_pinned {
            cursor = cursor.max(item.content.end_time);
        } else {
            let start = cursor;
            let end = start.add_minutes(item.content.duration_minutes as i64)?;
            item.content.start_time = start;
            item.content.end_time = end;
            cursor = end;
        }
    }
    Ok(())
}

fn renumber(day: &mut ItineraryDay) {
    day.items.sort_by_key(|item| item.content.order);
    for (index, item) in day.items.iter_mut().enumerate() {
        item.content.order = index as u32;
    }
}

fn find_day(days: &mut [ItineraryDay], day_number: u32) -> Result<&mut ItineraryDay> {
    days.iter_mut()
        .find(|day| day.day == day_number)
        .ok_or_else(|| PlanError::NotFound(format!("day {day_number}")))
}

fn find_item_day(days: &mut [ItineraryDay], item_id: Id<ItineraryItem>) -> Result<&mut ItineraryDay> {
    days.iter_mut()
        .find(|day| day.items.iter().any(|item| item.id == item_id))
        .ok_or_else(|| PlanError::NotFound(format!("item {item_id}")))
}

async fn load_days<S: PlanStore>(
    tx: &mut S::Transaction,
    trip_id: Id<Trip>,
) -> Result<(Vec<ItineraryDay>, u32, TripPreferences)> {
    let prior = tx
        .latest_version(trip_id)
        .await?
        .ok_or_else(|| PlanError::NotFound(format!("itinerary for trip {trip_id}")))?;
    let preferences = tx.get_preferences(trip_id).await?;
    Ok((prior.content.days, prior.content.version, preferences))
}

async fn persist<S: PlanStore>(
    tx: &mut S::Transaction,
    trip_id: Id<Trip>,
    version: u32,
    change_type: ChangeType,
    days: Vec<ItineraryDay>,
) -> Result<WithId<ItineraryVersion>> {
    tx.put_version(ItineraryVersion {
        trip_id,
        version: version + 1,
        change_type,
        changed_by: None,
        days,
    })
    .await
}

/// Sets each item's `order` to its position in `ordered_item_ids` and
/// re-flows the day. `ordered_item_ids` must be a permutation of the day's
/// current item ids.
pub async fn reorder<S: PlanStore>(
    store: &S,
    trip_id: Id<Trip>,
    day_number: u32,
    ordered_item_ids: Vec<Id<ItineraryItem>>,
) -> Result<WithId<ItineraryVersion>> {
    store
        .perform_transaction(|tx| {
            Box::pin(async move {
                tx.lock_trip(trip_id).await?;
                let (mut days, version, preferences) = load_days::<S>(tx, trip_id).await?;
                let window_start = preferences.daily_window.start;

                {
                    let day = find_day(&mut days, day_number)?;
                    let mut current_ids: Vec<_> = day.items.iter().map(|item| item.id).collect();
                    current_ids.sort_by_key(|id| id.raw());
                    let mut requested_ids = ordered_item_ids.clone();
                    requested_ids.sort_by_key(|id| id.raw());
                    if current_ids != requested_ids {
                        return Err(PlanError::Validation(
                            "ordered item ids must be a permutation of the day's items".into(),
                        ));
                    }

                    for (position, item_id) in ordered_item_ids.iter().enumerate() {
                        if let Some(item) = day.items.iter_mut().find(|item| item.id == *item_id) {
                            item.content.order = position as u32;
                        }
                    }
                    reflow_day(day, window_start).map_err(|err| PlanError::Validation(err.to_string()))?;
                }

                persist::<S>(tx, trip_id, version, ChangeType::Reorder, days).await
            })
        })
        .await
}

/// Sets an item's `is_pinned` flag. Does not re-flow the day.
pub async fn toggle_pin<S: PlanStore>(
    store: &S,
    trip_id: Id<Trip>,
    item_id: Id<ItineraryItem>,
    pinned: bool,
) -> Result<WithId<ItineraryVersion>> {
    store
        .perform_transaction(|tx| {
            Box::pin(async move {
                tx.lock_trip(trip_id).await?;
                let (mut days, version, _preferences) = load_days::<S>(tx, trip_id).await?;

                let day = find_item_day(&mut days, item_id)?;
                let item = day
                    .items
                    .iter_mut()
                    .find(|item| item.id == item_id)
                    .expect("item located by find_item_day");
                item.content.is_pinned = pinned;

                persist::<S>(tx, trip_id, version, ChangeType::TogglePin, days).await
            })
        })
        .await
}

/// Sets `start_time` (and recomputes `end_time` from `duration_minutes`),
/// then re-flows the containing day.
pub async fn set_start_time<S: PlanStore>(
    store: &S,
    trip_id: Id<Trip>,
    item_id: Id<ItineraryItem>,
    start_time: &str,
) -> Result<WithId<ItineraryVersion>> {
    let parsed = TimeOfDay::parse(start_time).map_err(|err| PlanError::Validation(err.to_string()))?;

    store
        .perform_transaction(|tx| {
            Box::pin(async move {
                tx.lock_trip(trip_id).await?;
                let (mut days, version, preferences) = load_days::<S>(tx, trip_id).await?;
                let window_start = preferences.daily_window.start;

                {
                    let day = find_item_day(&mut days, item_id)?;
                    let item = day
                        .items
                        .iter_mut()
                        .find(|item| item.id == item_id)
                        .expect("item located by find_item_day");
                    let end = parsed
                        .add_minutes(item.content.duration_minutes as i64)
                        .map_err(|err| PlanError::Validation(err.to_string()))?;
                    item.content.start_time = parsed;
                    item.content.end_time = end;
                    reflow_day(day, window_start).map_err(|err| PlanError::Validation(err.to_string()))?;
                }

                persist::<S>(tx, trip_id, version, ChangeType::SetStartTime, days).await
            })
        })
        .await
}

/// Deletes an item and re-flows the day. Pinned items cannot be removed
/// directly — the caller must unpin first.
pub async fn remove<S: PlanStore>(
    store: &S,
    trip_id: Id<Trip>,
    item_id: Id<ItineraryItem>,
) -> Result<WithId<ItineraryVersion>> {
    store
        .perform_transaction(|tx| {
            Box::pin(async move {
                tx.lock_trip(trip_id).await?;
                let (mut days, version, preferences) = load_days::<S>(tx, trip_id).await?;
                let window_start = preferences.daily_window.start;

                {
                    let day = find_item_day(&mut days, item_id)?;
                    let item = day
                        .items
                        .iter()
                        .find(|item| item.id == item_id)
                        .expect("item located by find_item_day");
                    if item.content.is_pinned {
                        return Err(PlanError::Validation("unpin first".into()));
                    }
                    day.items.retain(|item| item.id != item_id);
                    renumber(day);
                    reflow_day(day, window_start).map_err(|err| PlanError::Validation(err.to_string()))?;
                }

                persist::<S>(tx, trip_id, version, ChangeType::Remove, days).await
            })
        })
        .await
}

/// Appends `poi` as a new item on `day_number`. `start_time`, if given, is
/// used verbatim; otherwise it defaults to the last item's end plus a
/// 15-minute buffer, or the daily window start if the day is empty.
pub async fn add<S: PlanStore>(
    store: &S,
    trip_id: Id<Trip>,
    day_number: u32,
    poi_id: Id<Poi>,
    poi: Poi,
    start_time: Option<&str>,
) -> Result<WithId<ItineraryVersion>> {
    let explicit_start = start_time
        .map(TimeOfDay::parse)
        .transpose()
        .map_err(|err| PlanError::Validation(err.to_string()))?;

    store
        .perform_transaction(|tx| {
            Box::pin(async move {
                tx.lock_trip(trip_id).await?;
                let (mut days, version, preferences) = load_days::<S>(tx, trip_id).await?;
                let window_start = preferences.daily_window.start;

                let day = days
                    .iter_mut()
                    .find(|day| day.day == day_number)
                    .ok_or_else(|| PlanError::NotFound(format!("day {day_number}")))?;

                let start = match explicit_start {
                    Some(start) => start,
                    None => match day.items.iter().max_by_key(|item| item.content.order) {
                        Some(last) => last
                            .content
                            .end_time
                            .add_minutes(ADD_BUFFER_MINUTES)
                            .map_err(|err| PlanError::Validation(err.to_string()))?,
                        None => window_start,
                    },
                };
                let end = start
                    .add_minutes(poi.avg_duration_minutes as i64)
                    .map_err(|err| PlanError::Validation(err.to_string()))?;

                let order = day.items.len() as u32;
                let item = ItineraryItem {
                    trip_id,
                    day: day_number,
                    item_type: model::itinerary::ItemType::Poi,
                    poi_id: Some(poi_id),
                    name: poi.name.clone(),
                    location: Some(poi.location),
                    start_time: start,
                    end_time: end,
                    duration_minutes: poi.avg_duration_minutes,
                    is_pinned: false,
                    order,
                    route_from_previous: None,
                    cost_estimate: poi.price_range.map(|range| model::itinerary::CostEstimate {
                        amount: range.midpoint(),
                        currency: preferences.budget.currency,
                        confidence: model::itinerary::CostConfidence::Estimated,
                    }),
                    notes: None,
                };
                day.items.push(WithId::new(Id::generate(), item));

                persist::<S>(tx, trip_id, version, ChangeType::Add, days).await
            })
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use model::{
        itinerary::{CostConfidence, CostEstimate, ItemType},
        owner::Owner,
        preferences::{Budget, Constraints, DailyWindow, DateRange, Travelers, TripPreferences, TripStyle},
        version::ItineraryDay,
    };
    use plan_core::store::ItineraryRepo;
    use plan_store_memory::InMemoryPlanStore;
    use rust_decimal_macros::dec;
    use utility::money::Currency;
    use uuid::Uuid;

    fn make_item(name: &str, duration: u32, start: &str, end: &str, pinned: bool, order: u32) -> ItineraryItem {
        ItineraryItem {
            trip_id: Id::generate(),
            day: 1,
            item_type: ItemType::Activity,
            poi_id: None,
            name: name.into(),
            location: None,
            start_time: TimeOfDay::parse(start).unwrap(),
            end_time: TimeOfDay::parse(end).unwrap(),
            duration_minutes: duration,
            is_pinned: pinned,
            order,
            route_from_previous: None,
            cost_estimate: Some(CostEstimate {
                amount: dec!(100),
                currency: Currency::parse("THB").unwrap(),
                confidence: CostConfidence::Estimated,
            }),
            notes: None,
        }
    }

    async fn seed_trip_with_day(store: &InMemoryPlanStore, items: Vec<ItineraryItem>) -> (Id<Trip>, Vec<Id<ItineraryItem>>) {
        let preferences = TripPreferences {
            destination: "Bangkok".into(),
            dates: DateRange { start: "2025-03-01".into(), end: "2025-03-01".into() },
            travelers: Travelers::new(2, 0, 0).unwrap(),
            budget: Budget { total: None, per_day: None, currency: Currency::parse("THB").unwrap() },
            style: TripStyle::Balanced,
            daily_window: DailyWindow::new(
                TimeOfDay::parse("10:00").unwrap(),
                TimeOfDay::parse("20:00").unwrap(),
            )
            .unwrap(),
            constraints: Constraints::default(),
        };

        let mut autocommit = store.auto();
        let trip = TripRepo::create_trip(
            &mut autocommit,
            model::trip::Trip::new(Owner::Guest { guest_session_id: Uuid::new_v4() }),
            preferences,
        )
        .await
        .unwrap();

        let mut ids = Vec::new();
        let mut with_ids = Vec::new();
        for mut item in items {
            item.trip_id = trip.id;
            let id = Id::generate();
            ids.push(id);
            with_ids.push(WithId::new(id, item));
        }

        ItineraryRepo::put_version(
            &mut autocommit,
            ItineraryVersion {
                trip_id: trip.id,
                version: 1,
                change_type: ChangeType::Generate,
                changed_by: None,
                days: vec![ItineraryDay { day: 1, items: with_ids }],
            },
        )
        .await
        .unwrap();

        (trip.id, ids)
    }

    #[tokio::test]
    async fn reorder_reflows_unpinned_items_around_pinned_ones() {
        let store = InMemoryPlanStore::new();
        let x = make_item("X", 60, "10:00", "11:00", false, 0);
        let y = make_item("Y", 30, "11:00", "11:30", true, 1);
        let (trip_id, ids) = seed_trip_with_day(&store, vec![x, y]).await;
        let (x_id, y_id) = (ids[0], ids[1]);

        let version = reorder(&store, trip_id, 1, vec![y_id, x_id]).await.unwrap();
        assert_eq!(version.content.change_type, ChangeType::Reorder);

        let day = &version.content.days[0];
        let y_after = day.items.iter().find(|item| item.id == y_id).unwrap();
        let x_after = day.items.iter().find(|item| item.id == x_id).unwrap();

        assert_eq!(y_after.content.order, 0);
        assert_eq!(x_after.content.order, 1);
        assert_eq!(y_after.content.start_time.format(), "11:00");
        assert_eq!(y_after.content.end_time.format(), "11:30");
        assert_eq!(x_after.content.start_time.format(), "11:30");
        assert_eq!(x_after.content.end_time.format(), "12:30");

        let preferences = {
            let mut autocommit = store.auto();
            TripRepo::get_preferences(&mut autocommit, trip_id).await.unwrap()
        };
        let report = validate(&preferences, &version.content.days, &HashMap::new());
        assert!(report.valid);
        assert!(report.issues.is_empty());
    }

    #[tokio::test]
    async fn toggle_pin_does_not_reflow() {
        let store = InMemoryPlanStore::new();
        let x = make_item("X", 60, "10:00", "11:00", false, 0);
        let (trip_id, ids) = seed_trip_with_day(&store, vec![x]).await;

        let version = toggle_pin(&store, trip_id, ids[0], true).await.unwrap();
        let item = &version.content.days[0].items[0];
        assert!(item.content.is_pinned);
        assert_eq!(item.content.start_time.format(), "10:00");
    }

    #[tokio::test]
    async fn remove_reflows_remaining_items_and_renumbers() {
        let store = InMemoryPlanStore::new();
        let x = make_item("X", 60, "10:00", "11:00", false, 0);
        let y = make_item("Y", 30, "11:00", "11:30", false, 1);
        let z = make_item("Z", 45, "11:30", "12:15", false, 2);
        let (trip_id, ids) = seed_trip_with_day(&store, vec![x, y, z]).await;

        let version = remove(&store, trip_id, ids[1]).await.unwrap();
        let day = &version.content.days[0];
        assert_eq!(day.items.len(), 2);

        let x_after = day.items.iter().find(|item| item.id == ids[0]).unwrap();
        let z_after = day.items.iter().find(|item| item.id == ids[2]).unwrap();
        assert_eq!(x_after.content.order, 0);
        assert_eq!(z_after.content.order, 1);
        assert_eq!(z_after.content.start_time.format(), "11:00");
        assert_eq!(z_after.content.end_time.format(), "11:45");
    }

    #[tokio::test]
    async fn remove_rejects_pinned_item() {
        let store = InMemoryPlanStore::new();
        let x = make_item("X", 60, "10:00", "11:00", true, 0);
        let (trip_id, ids) = seed_trip_with_day(&store, vec![x]).await;

        let err = remove(&store, trip_id, ids[0]).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
