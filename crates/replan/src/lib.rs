//! Event → replan pipeline: ingest a disruption report, propose scored
//! alternatives, and apply one transactionally with a rollback window.

pub mod apply;
pub mod config;
pub mod ingest;
pub mod propose;

pub use apply::{apply, rollback, ApplyOutcome};
pub use config::ReplanConfig;
pub use ingest::{ingest_event, IngestOutcome};
pub use propose::{propose, PoiCandidate};

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use model::{
        event::{EventDetails, Severity, TimeSlot},
        itinerary::{CostConfidence, CostEstimate, ItemType, ItineraryItem},
        location::Location,
        owner::Owner,
        poi::{DayHours, Poi, PriceRange, WeeklyHours},
        preferences::{Budget, Constraints, DailyWindow, DateRange, Travelers, TripPreferences, TripStyle},
        trip::Trip,
        version::{ChangeType, ItineraryDay, ItineraryVersion},
        WithId,
    };
    use plan_core::store::{ItineraryRepo, PlanStore, TripRepo};
    use plan_store_memory::InMemoryPlanStore;
    use rust_decimal_macros::dec;
    use utility::{id::Id, money::Currency, time::TimeOfDay};
    use uuid::Uuid;

    use super::*;

    fn bangkok() -> Location {
        Location::new(13.7563, 100.5018).unwrap()
    }

    fn nearby(offset: f64) -> Location {
        Location::new(13.7563 + offset, 100.5018 + offset).unwrap()
    }

    fn outdoor_poi() -> Poi {
        Poi {
            place_id: "lumpini-park".into(),
            name: "Lumpini Park".into(),
            location: bangkok(),
            hours: open_all_week(),
            tags: vec!["outdoor".into(), "park".into()],
            avg_duration_minutes: 90,
            price_range: None,
        }
    }

    fn indoor_candidate() -> propose::PoiCandidate {
        propose::PoiCandidate {
            id: Id::generate(),
            poi: Poi {
                place_id: "river-city-mall".into(),
                name: "River City Mall".into(),
                location: nearby(0.01),
                hours: open_all_week(),
                tags: vec!["indoor".into()],
                avg_duration_minutes: 60,
                price_range: Some(PriceRange { min: dec!(0), max: dec!(0) }),
            },
        }
    }

    /// Closer than `indoor_candidate` but not tagged indoor — exists to
    /// prove the weather replace strategy filters on `Poi::is_indoor`
    /// rather than picking whatever candidate happens to be nearest.
    fn non_indoor_candidate_closer_than_indoor() -> propose::PoiCandidate {
        propose::PoiCandidate {
            id: Id::generate(),
            poi: Poi {
                place_id: "street-food-stall".into(),
                name: "Street Food Stall".into(),
                location: nearby(0.001),
                hours: open_all_week(),
                tags: vec!["market".into()],
                avg_duration_minutes: 30,
                price_range: None,
            },
        }
    }

    fn open_all_week() -> WeeklyHours {
        let day = DayHours::open(TimeOfDay::parse("00:00").unwrap(), TimeOfDay::parse("23:59").unwrap());
        WeeklyHours {
            sunday: day,
            monday: day,
            tuesday: day,
            wednesday: day,
            thursday: day,
            friday: day,
            saturday: day,
        }
    }

    fn sample_preferences() -> TripPreferences {
        TripPreferences {
            destination: "Bangkok".into(),
            dates: DateRange { start: "2025-03-01".into(), end: "2025-03-03".into() },
            travelers: Travelers::new(2, 0, 0).unwrap(),
            budget: Budget { total: None, per_day: None, currency: Currency::parse("THB").unwrap() },
            style: TripStyle::Balanced,
            daily_window: DailyWindow::new(
                TimeOfDay::parse("09:00").unwrap(),
                TimeOfDay::parse("21:00").unwrap(),
            )
            .unwrap(),
            constraints: Constraints::default(),
        }
    }

    async fn seed_trip_with_outdoor_item(store: &InMemoryPlanStore) -> (Id<Trip>, Id<ItineraryItem>, Id<Poi>) {
        let mut autocommit = store.auto();
        let trip = TripRepo::create_trip(
            &mut autocommit,
            Trip::new(Owner::Guest { guest_session_id: Uuid::new_v4() }),
            sample_preferences(),
        )
        .await
        .unwrap();

        let poi = outdoor_poi();
        let poi_id = Id::generate();
        let item = ItineraryItem {
            trip_id: trip.id,
            day: 1,
            item_type: ItemType::Poi,
            poi_id: Some(poi_id),
            name: poi.name.clone(),
            location: Some(poi.location),
            start_time: TimeOfDay::parse("14:00").unwrap(),
            end_time: TimeOfDay::parse("15:30").unwrap(),
            duration_minutes: 90,
            is_pinned: false,
            order: 0,
            route_from_previous: None,
            cost_estimate: Some(CostEstimate {
                amount: dec!(0),
                currency: Currency::parse("THB").unwrap(),
                confidence: CostConfidence::Estimated,
            }),
            notes: None,
        };
        let item_id = Id::generate();
        ItineraryRepo::put_version(
            &mut autocommit,
            ItineraryVersion {
                trip_id: trip.id,
                version: 1,
                change_type: ChangeType::Generate,
                changed_by: None,
                days: vec![ItineraryDay { day: 1, items: vec![WithId::new(item_id, item)] }],
            },
        )
        .await
        .unwrap();

        (trip.id, item_id, poi_id)
    }

    #[tokio::test]
    async fn heavy_rain_ingest_triggers_replace_proposal_scoring_above_half() {
        let store = InMemoryPlanStore::new();
        let (trip_id, item_id, poi_id) = seed_trip_with_outdoor_item(&store).await;
        let config = ReplanConfig::default();

        let mut poi_lookup = HashMap::new();
        poi_lookup.insert(poi_id, outdoor_poi());

        let slot = TimeSlot {
            start: chrono::NaiveDate::parse_from_str("2025-03-01", "%Y-%m-%d")
                .unwrap()
                .and_hms_opt(13, 0, 0)
                .unwrap(),
            end: chrono::NaiveDate::parse_from_str("2025-03-01", "%Y-%m-%d")
                .unwrap()
                .and_hms_opt(17, 0, 0)
                .unwrap(),
        };

        let outcome = ingest::ingest_event(
            &store,
            trip_id,
            Severity::High,
            bangkok(),
            slot,
            EventDetails::Weather {
                condition: model::event::WeatherCondition::HeavyRain,
                temperature: None,
                humidity: None,
                wind_speed: None,
                impact: "flooding near the park".into(),
            },
            &poi_lookup,
            &config,
        )
        .await
        .unwrap();

        assert_eq!(outcome.event.content.affected_items, vec![item_id]);
        let trigger = outcome.trigger.expect("heavy rain at high severity must trigger a replan");
        assert_eq!(trigger.content.priority, model::replan::Priority::High);

        let near_non_indoor = non_indoor_candidate_closer_than_indoor();
        let indoor = indoor_candidate();
        let indoor_id = indoor.id;
        let candidates = vec![near_non_indoor, indoor];
        let proposals = propose::propose(&store, trigger.id, &poi_lookup, &candidates, 3, &config).await.unwrap();
        assert!(!proposals.is_empty());

        let replace_proposal = proposals
            .iter()
            .find(|p| !p.content.changes.replaced.is_empty())
            .expect("replace-with-indoor-poi strategy should have produced a proposal");
        assert_eq!(replace_proposal.content.changes.replaced[0].new_item.poi_id, Some(indoor_id));
        assert_eq!(replace_proposal.content.impact.disruption_score, 0.3);
        assert!(replace_proposal.content.score >= 0.5);
    }

    #[tokio::test]
    async fn apply_then_rollback_round_trips_to_the_prior_version() {
        let store = InMemoryPlanStore::new();
        let (trip_id, item_id, poi_id) = seed_trip_with_outdoor_item(&store).await;
        let config = ReplanConfig::default();

        let mut poi_lookup = HashMap::new();
        poi_lookup.insert(poi_id, outdoor_poi());

        let slot = TimeSlot {
            start: chrono::NaiveDate::parse_from_str("2025-03-01", "%Y-%m-%d")
                .unwrap()
                .and_hms_opt(13, 0, 0)
                .unwrap(),
            end: chrono::NaiveDate::parse_from_str("2025-03-01", "%Y-%m-%d")
                .unwrap()
                .and_hms_opt(17, 0, 0)
                .unwrap(),
        };
        let outcome = ingest::ingest_event(
            &store,
            trip_id,
            Severity::High,
            bangkok(),
            slot,
            EventDetails::Weather {
                condition: model::event::WeatherCondition::HeavyRain,
                temperature: None,
                humidity: None,
                wind_speed: None,
                impact: "flooding".into(),
            },
            &poi_lookup,
            &config,
        )
        .await
        .unwrap();
        let trigger = outcome.trigger.unwrap();

        let candidates = vec![indoor_candidate()];
        let proposals = propose::propose(&store, trigger.id, &poi_lookup, &candidates, 3, &config).await.unwrap();
        let chosen = proposals.into_iter().find(|p| !p.content.changes.replaced.is_empty()).unwrap();

        let before_apply = {
            let mut autocommit = store.auto();
            ItineraryRepo::latest_version(&mut autocommit, trip_id).await.unwrap().unwrap()
        };

        let applied = apply::apply(&store, chosen.id, "apply-key-1", &poi_lookup, &config).await.unwrap();
        assert_eq!(applied.application.content.applied_version, before_apply.content.version + 1);
        assert!(applied.version.content.days[0].items.iter().all(|item| item.id != item_id));

        let now = Utc::now();
        assert!(applied.application.content.rollback_available_until > now);

        let rolled_back = apply::rollback(&store, applied.application.id).await.unwrap();
        assert!(rolled_back.content.rolled_back);

        let restored = {
            let mut autocommit = store.auto();
            ItineraryRepo::latest_version(&mut autocommit, trip_id).await.unwrap().unwrap()
        };
        assert_eq!(restored.content.days[0].items.len(), before_apply.content.days[0].items.len());
        assert!(restored.content.days[0].items.iter().any(|item| item.id == item_id));

        let replayed = apply::rollback(&store, applied.application.id).await.unwrap_err();
        assert_eq!(replayed.code(), "ROLLBACK_EXPIRED");
    }

    #[tokio::test]
    async fn apply_is_idempotent_on_replayed_key_against_the_same_proposal() {
        let store = InMemoryPlanStore::new();
        let (trip_id, _item_id, poi_id) = seed_trip_with_outdoor_item(&store).await;
        let config = ReplanConfig::default();
        let mut poi_lookup = HashMap::new();
        poi_lookup.insert(poi_id, outdoor_poi());

        let slot = TimeSlot {
            start: chrono::NaiveDate::parse_from_str("2025-03-01", "%Y-%m-%d").unwrap().and_hms_opt(13, 0, 0).unwrap(),
            end: chrono::NaiveDate::parse_from_str("2025-03-01", "%Y-%m-%d").unwrap().and_hms_opt(17, 0, 0).unwrap(),
        };
        let outcome = ingest::ingest_event(
            &store,
            trip_id,
            Severity::High,
            bangkok(),
            slot,
            EventDetails::Weather {
                condition: model::event::WeatherCondition::HeavyRain,
                temperature: None,
                humidity: None,
                wind_speed: None,
                impact: "flooding".into(),
            },
            &poi_lookup,
            &config,
        )
        .await
        .unwrap();
        let trigger = outcome.trigger.unwrap();
        let candidates = vec![indoor_candidate()];
        let proposal =
            propose::propose(&store, trigger.id, &poi_lookup, &candidates, 1, &config).await.unwrap().remove(0);

        let first = apply::apply(&store, proposal.id, "replay-key", &poi_lookup, &config).await.unwrap();
        let second = apply::apply(&store, proposal.id, "replay-key", &poi_lookup, &config).await.unwrap();
        assert_eq!(first.application.id, second.application.id);
        assert_eq!(first.application.content.applied_version, second.application.content.applied_version);
    }

    #[tokio::test]
    async fn apply_replayed_against_a_different_proposal_is_a_conflict() {
        let store = InMemoryPlanStore::new();
        let (trip_id, _item_id, poi_id) = seed_trip_with_outdoor_item(&store).await;
        let config = ReplanConfig::default();
        let mut poi_lookup = HashMap::new();
        poi_lookup.insert(poi_id, outdoor_poi());

        let slot = TimeSlot {
            start: chrono::NaiveDate::parse_from_str("2025-03-01", "%Y-%m-%d").unwrap().and_hms_opt(13, 0, 0).unwrap(),
            end: chrono::NaiveDate::parse_from_str("2025-03-01", "%Y-%m-%d").unwrap().and_hms_opt(17, 0, 0).unwrap(),
        };
        let outcome = ingest::ingest_event(
            &store,
            trip_id,
            Severity::High,
            bangkok(),
            slot,
            EventDetails::Weather {
                condition: model::event::WeatherCondition::HeavyRain,
                temperature: None,
                humidity: None,
                wind_speed: None,
                impact: "flooding".into(),
            },
            &poi_lookup,
            &config,
        )
        .await
        .unwrap();
        let trigger = outcome.trigger.unwrap();
        let candidates = vec![indoor_candidate()];
        let proposals = propose::propose(&store, trigger.id, &poi_lookup, &candidates, 3, &config).await.unwrap();
        assert!(proposals.len() >= 2, "weather-high should yield replace + remove proposals at least");

        apply::apply(&store, proposals[0].id, "shared-key", &poi_lookup, &config).await.unwrap();
        let err = apply::apply(&store, proposals[1].id, "shared-key", &poi_lookup, &config).await.unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }
}
