//! Propose: turns a `ReplanTrigger` into up to `maxProposals` scored
//! `ReplanProposal`s, one per applicable strategy that yields a non-empty
//! change set.

use std::collections::{HashMap, HashSet};

use model::{
    event::EventType,
    itinerary::{CostConfidence, CostEstimate, ItineraryItem},
    poi::Poi,
    preferences::DailyWindow,
    replan::{MovedItem, ProposalChanges, ProposalImpact, ReplacedItem, ReplanProposal, ReplanTrigger},
    version::ItineraryDay,
    WithId,
};
use plan_core::{
    error::{PlanError, Result},
    store::{EventRepo, PlanStore, ReplanRepo, TripRepo},
};
use rust_decimal::Decimal;
use utility::{id::Id, time::TimeOfDay};

use crate::config::ReplanConfig;

/// A replacement candidate the caller has already resolved from the POI
/// catalog (e.g. "indoor POIs within 3 km" or "POIs sharing tags nearby") —
/// the catalog itself is external to this crate, same convention as
/// `generator::PoiOccurrence`.
#[derive(Debug, Clone)]
pub struct PoiCandidate {
    pub id: Id<Poi>,
    pub poi: Poi,
}

fn nearest_within<'a>(
    candidates: &'a [PoiCandidate],
    origin: model::location::Location,
    radius_km: f64,
    exclude: &HashSet<Id<Poi>>,
    tag_filter: Option<&[String]>,
    require_indoor: bool,
) -> Option<&'a PoiCandidate> {
    candidates
        .iter()
        .filter(|candidate| !exclude.contains(&candidate.id))
        .filter(|candidate| candidate.poi.location.distance_km(&origin) <= radius_km)
        .filter(|candidate| !require_indoor || candidate.poi.is_indoor())
        .filter(|candidate| match tag_filter {
            Some(tags) => tags.iter().any(|tag| candidate.poi.has_tag(tag)),
            None => true,
        })
        .min_by(|a, b| {
            a.poi
                .location
                .distance_km(&origin)
                .partial_cmp(&b.poi.location.distance_km(&origin))
                .unwrap()
        })
}

fn find_free_slot(existing: &[&WithId<ItineraryItem>], window: DailyWindow, duration_minutes: u32) -> Option<TimeOfDay> {
    let mut sorted: Vec<_> = existing.to_vec();
    sorted.sort_by_key(|item| item.content.start_time);

    let mut cursor = window.start.minutes_since_midnight();
    let window_end = window.end.minutes_since_midnight();
    for item in &sorted {
        let item_start = item.content.start_time.minutes_since_midnight();
        if item_start > cursor && (item_start - cursor) as u32 >= duration_minutes {
            return TimeOfDay::from_minutes(cursor).ok();
        }
        cursor = cursor.max(item.content.end_time.minutes_since_midnight());
    }
    if window_end > cursor && (window_end - cursor) as u32 >= duration_minutes {
        return TimeOfDay::from_minutes(cursor).ok();
    }
    None
}

fn replace_strategy(
    affected: &[Id<ItineraryItem>],
    old_items: &HashMap<Id<ItineraryItem>, ItineraryItem>,
    poi_lookup: &HashMap<Id<Poi>, Poi>,
    candidates: &[PoiCandidate],
    radius_km: f64,
    match_original_tags: bool,
    require_indoor: bool,
    fallback_currency: utility::money::Currency,
) -> ProposalChanges {
    let mut changes = ProposalChanges::default();
    let mut used: HashSet<Id<Poi>> = HashSet::new();

    for &item_id in affected {
        let Some(old) = old_items.get(&item_id) else { continue };
        let Some(location) = old.location else { continue };
        let original_tags = match_original_tags
            .then(|| old.poi_id.and_then(|id| poi_lookup.get(&id)))
            .flatten()
            .map(|poi| poi.tags.clone());
        let candidate =
            nearest_within(candidates, location, radius_km, &used, original_tags.as_deref(), require_indoor);
        let Some(candidate) = candidate else { continue };
        let Ok(new_end) = old.start_time.add_minutes(candidate.poi.avg_duration_minutes as i64) else { continue };

        used.insert(candidate.id);
        let new_item = ItineraryItem {
            trip_id: old.trip_id,
            day: old.day,
            item_type: model::itinerary::ItemType::Poi,
            poi_id: Some(candidate.id),
            name: candidate.poi.name.clone(),
            location: Some(candidate.poi.location),
            start_time: old.start_time,
            end_time: new_end,
            duration_minutes: candidate.poi.avg_duration_minutes,
            is_pinned: false,
            order: old.order,
            route_from_previous: None,
            cost_estimate: candidate.poi.price_range.map(|range| CostEstimate {
                amount: range.midpoint(),
                currency: old.cost_estimate.as_ref().map(|c| c.currency).unwrap_or(fallback_currency),
                confidence: CostConfidence::Estimated,
            }),
            notes: old.notes.clone(),
        };
        changes.replaced.push(ReplacedItem { old_item_id: item_id, new_item });
    }

    changes
}

fn move_to_other_day_strategy(
    affected: &[Id<ItineraryItem>],
    old_items: &HashMap<Id<ItineraryItem>, ItineraryItem>,
    days: &[ItineraryDay],
    window: DailyWindow,
) -> ProposalChanges {
    let mut changes = ProposalChanges::default();

    for &item_id in affected {
        let Some(old) = old_items.get(&item_id) else { continue };
        let mut placed = false;
        for day in days {
            if day.day == old.day {
                continue;
            }
            let existing: Vec<&WithId<ItineraryItem>> = day.items.iter().collect();
            if let Some(start) = find_free_slot(&existing, window, old.duration_minutes) {
                changes.moved.push(MovedItem { item_id, new_day: day.day, new_start_time: start });
                placed = true;
                break;
            }
        }
        let _ = placed;
    }

    changes
}

fn move_within_day_strategy(
    affected: &[Id<ItineraryItem>],
    old_items: &HashMap<Id<ItineraryItem>, ItineraryItem>,
    days: &[ItineraryDay],
    window: DailyWindow,
) -> ProposalChanges {
    let mut changes = ProposalChanges::default();

    for &item_id in affected {
        let Some(old) = old_items.get(&item_id) else { continue };
        let Some(day) = days.iter().find(|day| day.day == old.day) else { continue };
        let existing: Vec<&WithId<ItineraryItem>> = day.items.iter().filter(|item| item.id != item_id).collect();
        if let Some(start) = find_free_slot(&existing, window, old.duration_minutes) {
            changes.moved.push(MovedItem { item_id, new_day: old.day, new_start_time: start });
        }
    }

    changes
}

fn remove_strategy(affected: &[Id<ItineraryItem>]) -> ProposalChanges {
    ProposalChanges { removed: affected.to_vec(), ..Default::default() }
}

fn compute_impact(changes: &ProposalChanges, old_items: &HashMap<Id<ItineraryItem>, ItineraryItem>) -> ProposalImpact {
    let mut time_change_minutes = 0i64;
    let mut cost_change = Decimal::ZERO;
    let mut distance_change_km = 0.0;

    for replaced in &changes.replaced {
        if let Some(old) = old_items.get(&replaced.old_item_id) {
            time_change_minutes += replaced.new_item.duration_minutes as i64 - old.duration_minutes as i64;
            let old_cost = old.cost_estimate.as_ref().map(|c| c.amount).unwrap_or(Decimal::ZERO);
            let new_cost = replaced.new_item.cost_estimate.as_ref().map(|c| c.amount).unwrap_or(Decimal::ZERO);
            cost_change += new_cost - old_cost;
            if let (Some(old_location), Some(new_location)) = (old.location, replaced.new_item.location) {
                distance_change_km += old_location.distance_km(&new_location);
            }
        }
    }

    let disruption_score = (0.3 * changes.replaced.len() as f64
        + 0.2 * changes.moved.len() as f64
        + 0.4 * changes.removed.len() as f64
        + 0.1 * changes.added.len() as f64)
        .min(1.0);

    ProposalImpact { time_change_minutes, cost_change, distance_change_km, disruption_score }
}

fn compute_score(impact: &ProposalImpact) -> f64 {
    let mut score = 1.0 - 0.5 * impact.disruption_score;
    if impact.cost_change < Decimal::ZERO {
        score += 0.2;
    } else if impact.cost_change > Decimal::ZERO {
        score -= 0.1;
    }
    if impact.time_change_minutes.abs() > 60 {
        score -= 0.1;
    }
    score.clamp(0.0, 1.0)
}

/// Generates, scores and persists up to `max_proposals` candidate proposals
/// for `trigger_id`. `candidates` is the pool of replacement POIs the caller
/// has already resolved from the catalog near the event's location. `config`
/// supplies the replacement search radii instead of hard-coded constants.
pub async fn propose<S: PlanStore>(
    store: &S,
    trigger_id: Id<ReplanTrigger>,
    poi_lookup: &HashMap<Id<Poi>, Poi>,
    candidates: &[PoiCandidate],
    max_proposals: usize,
    config: &ReplanConfig,
) -> Result<Vec<WithId<ReplanProposal>>> {
    store
        .perform_transaction(|tx| {
            Box::pin(async move {
                let trigger = tx.get_trigger(trigger_id).await?;
                let event = tx.get_event(trigger.content.event_signal_id).await?;
                let preferences = tx.get_preferences(trigger.content.trip_id).await?;
                let current = tx
                    .latest_version(trigger.content.trip_id)
                    .await?
                    .ok_or_else(|| PlanError::NotFound(format!("itinerary for trip {}", trigger.content.trip_id)))?;
                let days = current.content.days;

                let mut old_items: HashMap<Id<ItineraryItem>, ItineraryItem> = HashMap::new();
                for day in &days {
                    for item in &day.items {
                        old_items.insert(item.id, item.content.clone());
                    }
                }

                let affected: Vec<Id<ItineraryItem>> = event
                    .content
                    .affected_items
                    .iter()
                    .copied()
                    .filter(|id| old_items.get(id).is_some_and(|item| !item.is_pinned))
                    .collect();

                let mut candidate_changes: Vec<(&str, ProposalChanges)> = Vec::new();
                match event.content.event_type() {
                    EventType::Weather => {
                        candidate_changes.push((
                            "replace each affected outdoor item with the nearest indoor POI within 3 km",
                            replace_strategy(
                                &affected,
                                &old_items,
                                poi_lookup,
                                candidates,
                                config.weather_indoor_radius_km,
                                false,
                                true,
                                preferences.budget.currency,
                            ),
                        ));
                        candidate_changes.push((
                            "move each affected item to a different day with an available slot",
                            move_to_other_day_strategy(&affected, &old_items, &days, preferences.daily_window),
                        ));
                        candidate_changes.push(("remove the affected items", remove_strategy(&affected)));
                    }
                    EventType::Closure => {
                        candidate_changes.push((
                            "replace with a similar POI (shared tags) nearby",
                            replace_strategy(
                                &affected,
                                &old_items,
                                poi_lookup,
                                candidates,
                                config.closure_replacement_radius_km,
                                true,
                                false,
                                preferences.budget.currency,
                            ),
                        ));
                        candidate_changes.push((
                            "move to a different time slot on the same day",
                            move_within_day_strategy(&affected, &old_items, &days, preferences.daily_window),
                        ));
                    }
                    _ => {}
                }

                let mut proposals = Vec::new();
                for (explanation, changes) in candidate_changes {
                    if changes.is_empty() {
                        continue;
                    }
                    let impact = compute_impact(&changes, &old_items);
                    let score = compute_score(&impact);
                    let proposal = ReplanProposal {
                        trip_id: trigger.content.trip_id,
                        trigger_id,
                        score,
                        explanation: explanation.to_string(),
                        changes,
                        impact,
                    };
                    let inserted = tx.insert_proposal(proposal).await?;
                    proposals.push(inserted);
                }

                proposals.sort_by(|a, b| b.content.score.partial_cmp(&a.content.score).unwrap());
                proposals.truncate(max_proposals);

                log::info!(
                    "proposed {} alternative(s) for trigger {trigger_id} (priority {:?})",
                    proposals.len(),
                    trigger.content.priority
                );

                Ok(proposals)
            })
        })
        .await
}
