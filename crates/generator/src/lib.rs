//! Itinerary generation: builds a fresh `ItineraryDay[]` from trip
//! preferences and a selected POI set, optionally preserving pinned items
//! from a prior version, and persists the result as a new snapshot.

mod algorithm;

pub use algorithm::{plan_days, PoiOccurrence};

use std::collections::HashMap;

use model::{
    itinerary::ItineraryItem,
    trip::Trip,
    version::{ChangeType, ItineraryVersion},
    WithId,
};
use plan_core::{
    error::{PlanError, Result},
    store::{ItineraryRepo, PlanStore, TripRepo},
};
use utility::id::Id;

/// Whether this call is a from-scratch generation or an incremental
/// regeneration of an existing itinerary; governs the resulting
/// `ChangeType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerateMode {
    Fresh,
    Incremental,
}

fn pinned_items_by_day(prior: &ItineraryVersion) -> HashMap<u32, Vec<WithId<ItineraryItem>>> {
    let mut by_day: HashMap<u32, Vec<WithId<ItineraryItem>>> = HashMap::new();
    for day in &prior.days {
        let pinned: Vec<WithId<ItineraryItem>> =
            day.items.iter().filter(|item| item.content.is_pinned).cloned().collect();
        if !pinned.is_empty() {
            by_day.insert(day.day, pinned);
        }
    }
    by_day
}

/// Generates a fresh itinerary for `trip_id` and persists it as the next
/// version. When `preserve_pinned` is set and a prior version exists, pinned
/// items from that version are kept unchanged in their original day.
pub async fn generate<S: PlanStore>(
    store: &S,
    trip_id: Id<Trip>,
    pois: Vec<PoiOccurrence>,
    preserve_pinned: bool,
    mode: RegenerateMode,
) -> Result<WithId<ItineraryVersion>> {
    if pois.is_empty() {
        return Err(PlanError::Validation("no POI is resolvable".into()));
    }

    store
        .perform_transaction(|tx| {
            let pois = pois;
            Box::pin(async move {
                tx.lock_trip(trip_id).await?;
                let preferences = tx.get_preferences(trip_id).await?;
                let prior = tx.latest_version(trip_id).await?;

                let pinned_by_day = match (&prior, preserve_pinned) {
                    (Some(prior), true) => pinned_items_by_day(&prior.content),
                    _ => HashMap::new(),
                };

                let placed = algorithm::plan_days(&preferences, trip_id, pois, pinned_by_day)
                    .map_err(|err| PlanError::Validation(err.to_string()))?;
                let days = placed.into_iter().map(|(day, _cost)| day).collect();

                let version = ItineraryVersion {
                    trip_id,
                    version: prior.as_ref().map(|p| p.content.version + 1).unwrap_or(1),
                    change_type: match mode {
                        RegenerateMode::Fresh => ChangeType::Generate,
                        RegenerateMode::Incremental => ChangeType::Edit,
                    },
                    changed_by: None,
                    days,
                };

                tx.put_version(version).await
            })
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{
        owner::Owner,
        poi::{DayHours, PriceRange, WeeklyHours},
        preferences::{Budget, Constraints, DailyWindow, DateRange, Travelers, TripPreferences, TripStyle},
        trip::Trip,
    };
    use plan_store_memory::InMemoryPlanStore;
    use rust_decimal_macros::dec;
    use utility::{money::Currency, time::TimeOfDay};
    use uuid::Uuid;

    fn all_week_open(open: &str, close: &str) -> WeeklyHours {
        let hours = DayHours::open(TimeOfDay::parse(open).unwrap(), TimeOfDay::parse(close).unwrap());
        WeeklyHours {
            sunday: hours,
            monday: hours,
            tuesday: hours,
            wednesday: hours,
            thursday: hours,
            friday: hours,
            saturday: hours,
        }
    }

    fn poi(name: &str, duration: u32, open: &str, close: &str, price: i64) -> model::poi::Poi {
        model::poi::Poi {
            place_id: name.to_lowercase(),
            name: name.to_string(),
            location: model::location::Location::new(13.75, 100.50).unwrap(),
            hours: all_week_open(open, close),
            tags: vec![],
            avg_duration_minutes: duration,
            price_range: Some(PriceRange {
                min: rust_decimal::Decimal::from(price),
                max: rust_decimal::Decimal::from(price),
            }),
        }
    }

    async fn seed_trip(store: &InMemoryPlanStore) -> Id<Trip> {
        let preferences = TripPreferences {
            destination: "Bangkok".into(),
            dates: DateRange {
                start: "2025-03-01".into(),
                end: "2025-03-02".into(),
            },
            travelers: Travelers::new(2, 0, 0).unwrap(),
            budget: Budget {
                total: None,
                per_day: None,
                currency: Currency::parse("THB").unwrap(),
            },
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
            Trip::new(Owner::Guest { guest_session_id: Uuid::new_v4() }),
            preferences,
        )
        .await
        .unwrap();
        trip.id
    }

    #[tokio::test]
    async fn two_day_trip_matches_end_to_end_scenario() {
        let store = InMemoryPlanStore::new();
        let trip_id = seed_trip(&store).await;

        let pois = vec![
            PoiOccurrence { id: Id::generate(), poi: poi("A", 120, "09:00", "17:00", 500) },
            PoiOccurrence { id: Id::generate(), poi: poi("B", 90, "09:00", "18:00", 200) },
        ];

        let version = generate(&store, trip_id, pois, false, RegenerateMode::Fresh).await.unwrap();
        assert_eq!(version.content.version, 1);
        assert_eq!(version.content.change_type, ChangeType::Generate);
        assert_eq!(version.content.days.len(), 2);

        let day1 = &version.content.days[0];
        assert_eq!(day1.items.len(), 1);
        assert_eq!(day1.items[0].content.start_time.format(), "10:15");
        assert_eq!(day1.items[0].content.end_time.format(), "12:15");

        let day2 = &version.content.days[1];
        assert_eq!(day2.items.len(), 1);
        assert_eq!(day2.items[0].content.start_time.format(), "10:15");
        assert_eq!(day2.items[0].content.end_time.format(), "11:45");
    }

    #[tokio::test]
    async fn regenerate_preserves_pinned_items() {
        let store = InMemoryPlanStore::new();
        let trip_id = seed_trip(&store).await;

        let pois = vec![PoiOccurrence { id: Id::generate(), poi: poi("A", 120, "09:00", "17:00", 500) }];
        let first = generate(&store, trip_id, pois, false, RegenerateMode::Fresh).await.unwrap();
        let pinned_id = first.content.days[0].items[0].id;

        let mut autocommit = store.auto();
        let mut pinned_version = first.content.clone();
        pinned_version.version += 1;
        pinned_version.days[0].items[0].content.is_pinned = true;
        ItineraryRepo::put_version(&mut autocommit, pinned_version).await.unwrap();

        let more_pois = vec![PoiOccurrence { id: Id::generate(), poi: poi("B", 90, "09:00", "18:00", 200) }];
        let regenerated = generate(&store, trip_id, more_pois, true, RegenerateMode::Incremental)
            .await
            .unwrap();
        assert_eq!(regenerated.content.change_type, ChangeType::Edit);

        let day1 = &regenerated.content.days[0];
        let pinned = day1.items.iter().find(|item| item.id == pinned_id).expect("pinned item preserved");
        assert!(pinned.content.is_pinned);
        assert_eq!(pinned.content.start_time.format(), "10:15");
        assert_eq!(pinned.content.end_time.format(), "12:15");
    }

    #[tokio::test]
    async fn empty_poi_list_is_a_validation_error() {
        let store = InMemoryPlanStore::new();
        let trip_id = seed_trip(&store).await;

        let err = generate(&store, trip_id, vec![], false, RegenerateMode::Fresh).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
