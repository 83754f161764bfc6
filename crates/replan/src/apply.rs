//! Apply + rollback: commits a `ReplanProposal`'s changes onto the
//! itinerary as a new version, with a bounded window to undo it.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, Utc};
use editor::ValidationReport;
use model::{
    itinerary::ItineraryItem,
    poi::Poi,
    replan::{ProposalChanges, ReplanApplication, ReplanProposal},
    version::{ChangeType, ItineraryDay, ItineraryVersion},
    WithId,
};
use plan_core::{
    error::{PlanError, Result},
    store::{ItineraryRepo, PlanStore, ReplanRepo, TripRepo},
};
use utility::id::Id;

use crate::config::ReplanConfig;

fn find_or_create_day(days: &mut Vec<ItineraryDay>, day_number: u32) -> &mut ItineraryDay {
    if let Some(index) = days.iter().position(|day| day.day == day_number) {
        return &mut days[index];
    }
    days.push(ItineraryDay { day: day_number, items: Vec::new() });
    days.sort_by_key(|day| day.day);
    days.iter_mut().find(|day| day.day == day_number).expect("just inserted")
}

/// Mutates `days` in place to fold in a proposal's change set. `days` must
/// already contain every item referenced by `changes` (i.e. be the
/// itinerary's current content, not a partial view).
fn apply_changes(days: &mut Vec<ItineraryDay>, changes: &ProposalChanges) -> Result<()> {
    let mut old_items: HashMap<Id<ItineraryItem>, ItineraryItem> = HashMap::new();
    for day in days.iter() {
        for item in &day.items {
            old_items.insert(item.id, item.content.clone());
        }
    }

    let mut removed_ids: HashSet<Id<ItineraryItem>> = changes.removed.iter().copied().collect();
    removed_ids.extend(changes.replaced.iter().map(|r| r.old_item_id));
    removed_ids.extend(changes.moved.iter().map(|m| m.item_id));

    for day in days.iter_mut() {
        day.items.retain(|item| !removed_ids.contains(&item.id));
    }

    for replaced in &changes.replaced {
        let day = find_or_create_day(days, replaced.new_item.day);
        day.items.push(WithId::new(Id::generate(), replaced.new_item.clone()));
    }
    for added in &changes.added {
        let day = find_or_create_day(days, added.day);
        day.items.push(WithId::new(Id::generate(), added.clone()));
    }

    for moved in &changes.moved {
        let original = old_items
            .get(&moved.item_id)
            .ok_or_else(|| PlanError::NotFound(format!("item {}", moved.item_id)))?;
        let new_end = moved
            .new_start_time
            .add_minutes(original.duration_minutes as i64)
            .map_err(|err| PlanError::Validation(err.to_string()))?;
        let mut relocated = original.clone();
        relocated.day = moved.new_day;
        relocated.start_time = moved.new_start_time;
        relocated.end_time = new_end;
        let day = find_or_create_day(days, moved.new_day);
        day.items.push(WithId::new(moved.item_id, relocated));
    }

    for day in days.iter_mut() {
        day.items.sort_by_key(|item| item.content.start_time);
        for (index, item) in day.items.iter_mut().enumerate() {
            item.content.order = index as u32;
        }
    }

    Ok(())
}

pub struct ApplyOutcome {
    pub application: WithId<ReplanApplication>,
    pub version: WithId<ItineraryVersion>,
    pub validation: ValidationReport,
}

/// Applies `proposal_id`'s changes. Replaying the same `idempotency_key`
/// against the same proposal is a no-op that returns the existing
/// application; replaying it against a different proposal is a `Conflict`.
pub async fn apply<S: PlanStore>(
    store: &S,
    proposal_id: Id<ReplanProposal>,
    idempotency_key: &str,
    poi_lookup: &HashMap<Id<Poi>, Poi>,
    config: &ReplanConfig,
) -> Result<ApplyOutcome> {
    let key = idempotency_key.to_string();
    let (application, version, trip_id) = store
        .perform_transaction(|tx| {
            let key = key.clone();
            Box::pin(async move {
                if let Some(existing) = tx.find_application_by_idempotency_key(&key).await? {
                    if existing.content.proposal_id != proposal_id {
                        return Err(PlanError::Conflict(format!(
                            "idempotency key {key} was already applied against a different proposal"
                        )));
                    }
                    let trip_id = existing.content.trip_id;
                    let version = tx.get_version(trip_id, existing.content.applied_version).await?;
                    return Ok((existing, version, trip_id));
                }

                let proposal = tx.get_proposal(proposal_id).await?;
                let trip_id = proposal.content.trip_id;
                tx.lock_trip(trip_id).await?;

                let current = tx
                    .latest_version(trip_id)
                    .await?
                    .ok_or_else(|| PlanError::NotFound(format!("itinerary for trip {trip_id}")))?;
                let mut days = current.content.days;
                apply_changes(&mut days, &proposal.content.changes)?;

                let new_version = tx
                    .put_version(ItineraryVersion {
                        trip_id,
                        version: current.content.version + 1,
                        change_type: ChangeType::Replan,
                        changed_by: None,
                        days,
                    })
                    .await?;

                let application = tx
                    .insert_application(ReplanApplication {
                        trip_id,
                        proposal_id,
                        applied_version: new_version.content.version,
                        rollback_available_until: Utc::now() + Duration::hours(config.rollback_window_hours),
                        rolled_back: false,
                        rolled_back_at: None,
                        idempotency_key: key,
                    })
                    .await?;

                tx.mark_trigger_processed(proposal.content.trigger_id).await?;

                log::info!(
                    "applied proposal {proposal_id} to trip {trip_id}, now at version {}",
                    new_version.content.version
                );

                Ok((application, new_version, trip_id))
            })
        })
        .await?;

    let validation = {
        let mut autocommit = store.auto();
        let preferences = autocommit.get_preferences(trip_id).await?;
        editor::validate(&preferences, &version.content.days, poi_lookup)
    };
    if !validation.valid {
        log::warn!(
            "post-apply validation found {} issue(s) for trip {trip_id}",
            validation.issues.len()
        );
    }

    Ok(ApplyOutcome { application, version, validation })
}

/// Undoes a still-rollback-eligible application. The version log never
/// rewinds, so this restores content by re-appending the pre-apply snapshot
/// as a fresh version rather than moving the version pointer back.
pub async fn rollback<S: PlanStore>(
    store: &S,
    application_id: Id<ReplanApplication>,
) -> Result<WithId<ReplanApplication>> {
    store
        .perform_transaction(|tx| {
            Box::pin(async move {
                let application = tx.get_application(application_id).await?;
                let now = Utc::now();
                if !application.content.can_roll_back(now) {
                    return Err(PlanError::ForbiddenRollback(format!(
                        "application {application_id} is past its rollback window or already rolled back"
                    )));
                }

                let trip_id = application.content.trip_id;
                tx.lock_trip(trip_id).await?;

                let restore_version = application.content.applied_version - 1;
                let snapshot = tx.get_version(trip_id, restore_version).await?;
                let current = tx
                    .latest_version(trip_id)
                    .await?
                    .ok_or_else(|| PlanError::NotFound(format!("itinerary for trip {trip_id}")))?;

                tx.put_version(ItineraryVersion {
                    trip_id,
                    version: current.content.version + 1,
                    change_type: ChangeType::Replan,
                    changed_by: None,
                    days: snapshot.content.days,
                })
                .await?;

                tx.mark_rolled_back(application_id, now).await?;

                log::info!("rolled back application {application_id} for trip {trip_id}");

                tx.get_application(application_id).await
            })
        })
        .await
}
