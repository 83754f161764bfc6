//! Ingest: turns a raw disruption report into a persisted `EventSignal`,
//! computing which items it affects, and emits a `ReplanTrigger` when the
//! event crosses the severity threshold.

use std::collections::HashMap;

use model::{
    event::{EventDetails, Severity, TimeSlot, WeatherCondition},
    itinerary::ItineraryItem,
    location::Location,
    poi::Poi,
    preferences::TripPreferences,
    replan::{Priority, ReplanTrigger},
    trip::Trip,
    version::ItineraryDay,
    WithId,
};
use plan_core::{
    error::Result,
    store::{EventRepo, PlanStore, ReplanRepo, TripRepo},
};
use utility::{id::Id, time};

use crate::config::ReplanConfig;

/// Matches `Poi::is_outdoor_by_heuristic` for items whose POI did not
/// resolve in `poi_lookup` — name is the only signal left in that case.
fn looks_outdoor(name: &str, tags: &[String]) -> bool {
    const OUTDOOR_HINTS: &[&str] = &["outdoor", "park", "beach", "hiking", "walking", "tour", "market"];
    let lowered = name.to_lowercase();
    OUTDOOR_HINTS
        .iter()
        .any(|hint| lowered.contains(hint) || tags.iter().any(|tag| tag == hint))
}

fn item_outdoor(item: &ItineraryItem, poi_lookup: &HashMap<Id<Poi>, Poi>) -> bool {
    match item.poi_id.and_then(|id| poi_lookup.get(&id)) {
        Some(poi) => poi.is_outdoor_by_heuristic(),
        None => looks_outdoor(&item.name, &[]),
    }
}

fn item_time_slot(preferences: &TripPreferences, item: &ItineraryItem) -> Option<TimeSlot> {
    let date = time::date_for_day(&preferences.dates.start, item.day).ok()?;
    let date = chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()?;
    let start_minutes = item.start_time.minutes_since_midnight();
    let end_minutes = item.end_time.minutes_since_midnight();
    Some(TimeSlot {
        start: date.and_hms_opt((start_minutes / 60) as u32, (start_minutes % 60) as u32, 0)?,
        end: date.and_hms_opt((end_minutes / 60) as u32, (end_minutes % 60) as u32, 0)?,
    })
}

fn weather_affected(
    preferences: &TripPreferences,
    days: &[ItineraryDay],
    event_location: Location,
    event_slot: &TimeSlot,
    poi_lookup: &HashMap<Id<Poi>, Poi>,
    radius_km: f64,
) -> Vec<Id<ItineraryItem>> {
    days.iter()
        .flat_map(|day| day.items.iter())
        .filter(|item| {
            let Some(location) = item.content.location else { return false };
            let Some(slot) = item_time_slot(preferences, &item.content) else { return false };
            location.distance_km(&event_location) <= radius_km
                && slot.overlaps(event_slot)
                && item_outdoor(&item.content, poi_lookup)
        })
        .map(|item| item.id)
        .collect()
}

fn closure_affected(
    preferences: &TripPreferences,
    days: &[ItineraryDay],
    event_location: Location,
    event_slot: &TimeSlot,
    radius_km: f64,
) -> Vec<Id<ItineraryItem>> {
    days.iter()
        .flat_map(|day| day.items.iter())
        .filter(|item| {
            let Some(location) = item.content.location else { return false };
            let Some(slot) = item_time_slot(preferences, &item.content) else { return false };
            location.distance_km(&event_location) <= radius_km && slot.overlaps(event_slot)
        })
        .map(|item| item.id)
        .collect()
}

fn severity_to_priority(severity: Severity) -> Priority {
    match severity {
        Severity::Low => Priority::Low,
        Severity::Medium => Priority::Medium,
        Severity::High => Priority::High,
    }
}

/// Whether the ingested event clears the bar for a `ReplanTrigger`.
fn should_trigger(severity: Severity, details: &EventDetails) -> bool {
    match details {
        EventDetails::Weather { condition, .. } => {
            severity == Severity::High && *condition == WeatherCondition::HeavyRain
        }
        EventDetails::Closure { .. } => matches!(severity, Severity::Medium | Severity::High),
        _ => false,
    }
}

/// Result of ingesting a single disruption report.
pub struct IngestOutcome {
    pub event: WithId<model::event::EventSignal>,
    pub trigger: Option<WithId<ReplanTrigger>>,
}

/// Ingests a disruption report for `trip_id`. `poi_lookup` resolves
/// affected items' POIs for the outdoor heuristic; items whose
/// `poi_id` is absent from it fall back to a name-only heuristic, since the
/// POI catalog is external to this crate. `config` supplies the affect
/// radii instead of hard-coded constants.
pub async fn ingest_event<S: PlanStore>(
    store: &S,
    trip_id: Id<Trip>,
    severity: Severity,
    location: Location,
    time_slot: TimeSlot,
    details: EventDetails,
    poi_lookup: &HashMap<Id<Poi>, Poi>,
    config: &ReplanConfig,
) -> Result<IngestOutcome> {
    store
        .perform_transaction(|tx| {
            Box::pin(async move {
                let preferences = tx.get_preferences(trip_id).await?;
                let current = tx.latest_version(trip_id).await?;
                let days = current.map(|v| v.content.days).unwrap_or_default();

                let affected_items = match &details {
                    EventDetails::Weather { .. } => weather_affected(
                        &preferences,
                        &days,
                        location,
                        &time_slot,
                        poi_lookup,
                        config.weather_affect_radius_km,
                    ),
                    EventDetails::Closure { .. } => closure_affected(
                        &preferences,
                        &days,
                        location,
                        &time_slot,
                        config.closure_affect_radius_km,
                    ),
                    _ => Vec::new(),
                };

                let emits_trigger = should_trigger(severity, &details);
                let event = model::event::EventSignal {
                    trip_id,
                    severity,
                    location,
                    time_slot,
                    details,
                    affected_items,
                    processed: true,
                    replan_triggered: emits_trigger,
                };
                let inserted = tx.insert_event(event).await?;

                let trigger = if emits_trigger {
                    let reason = format!("{:?} severity {:?} event", severity, inserted.content.event_type());
                    let trigger = ReplanTrigger {
                        trip_id,
                        event_signal_id: inserted.id,
                        reason,
                        priority: severity_to_priority(severity),
                        processed: false,
                    };
                    Some(tx.insert_trigger(trigger).await?)
                } else {
                    None
                };

                log::info!(
                    "ingested event {} for trip {trip_id}, {} affected item(s), trigger={}",
                    inserted.id,
                    inserted.content.affected_items.len(),
                    trigger.is_some()
                );

                Ok(IngestOutcome { event: inserted, trigger })
            })
        })
        .await
}
