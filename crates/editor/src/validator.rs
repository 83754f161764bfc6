//! Validator: read-only checks over a built itinerary.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use model::{
    itinerary::TransportMode, poi::Poi, preferences::TripPreferences, version::ItineraryDay,
};
use utility::{id::Id, time};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueType {
    TimeConflict,
    OpeningHours,
    TimeWindow,
    Distance,
    Budget,
}

#[derive(Debug, Clone)]
pub struct Issue {
    pub issue_type: IssueType,
    pub severity: IssueSeverity,
    pub message: String,
    pub item_id: Option<Id<model::itinerary::ItineraryItem>>,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub valid: bool,
    pub issues: Vec<Issue>,
}

fn date_for_day(start: &str, day: u32) -> Option<NaiveDate> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").ok()?;
    Some(start + Duration::days((day - 1) as i64))
}

/// Checks a full set of days against a trip's preferences and, where
/// available, the POIs its items reference. `poi_hours` is a best-effort
/// lookup — items whose `poi_id` is absent from it are skipped for the
/// `opening_hours` check, since the POI catalog is external to this crate.
pub fn validate(
    preferences: &TripPreferences,
    days: &[ItineraryDay],
    poi_lookup: &HashMap<Id<Poi>, Poi>,
) -> ValidationReport {
    let mut issues = Vec::new();

    for day in days {
        let mut sorted: Vec<_> = day.items.iter().collect();
        sorted.sort_by_key(|item| item.content.order);

        let mut previous_end = None;
        let mut walking_distance_km = 0.0;
        let mut day_cost = rust_decimal::Decimal::ZERO;

        let date = date_for_day(&preferences.dates.start, day.day);
        let weekday = date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .and_then(|s| time::weekday_key(&s).ok());

        for item in &sorted {
            if let Some(previous_end) = previous_end {
                if item.content.start_time < previous_end {
                    issues.push(Issue {
                        issue_type: IssueType::TimeConflict,
                        severity: IssueSeverity::Error,
                        message: format!("item '{}' starts before the previous item ends", item.content.name),
                        item_id: Some(item.id),
                        suggestion: None,
                    });
                }
            }
            previous_end = Some(item.content.end_time);

            if item.content.start_time < preferences.daily_window.start
                || item.content.end_time > preferences.daily_window.end
            {
                issues.push(Issue {
                    issue_type: IssueType::TimeWindow,
                    severity: IssueSeverity::Warning,
                    message: format!("item '{}' falls outside the daily window", item.content.name),
                    item_id: Some(item.id),
                    suggestion: None,
                });
            }

            if let (Some(poi_id), Some(weekday)) = (item.content.poi_id, weekday) {
                if let Some(poi) = poi_lookup.get(&poi_id) {
                    match poi.hours.for_day(weekday) {
                        Some(hours) if hours.closed => {
                            issues.push(Issue {
                                issue_type: IssueType::OpeningHours,
                                severity: IssueSeverity::Error,
                                message: format!("'{}' is closed on this day", poi.name),
                                item_id: Some(item.id),
                                suggestion: None,
                            });
                        }
                        Some(hours) => {
                            let outside = hours.open.is_some_and(|open| item.content.start_time < open)
                                || hours.close.is_some_and(|close| item.content.end_time > close);
                            if outside {
                                issues.push(Issue {
                                    issue_type: IssueType::OpeningHours,
                                    severity: IssueSeverity::Error,
                                    message: format!("'{}' is scheduled outside its opening hours", poi.name),
                                    item_id: Some(item.id),
                                    suggestion: None,
                                });
                            }
                        }
                        None => {}
                    }
                }
            }

            if let Some(route) = &item.content.route_from_previous {
                if route.mode == TransportMode::Walking {
                    walking_distance_km += route.distance_km;
                }
            }
            if let Some(cost) = &item.content.cost_estimate {
                day_cost += cost.amount;
            }
        }

        if let Some(max_km) = preferences.constraints.max_walking_km_per_day {
            if walking_distance_km > max_km {
                issues.push(Issue {
                    issue_type: IssueType::Distance,
                    severity: IssueSeverity::Warning,
                    message: format!(
                        "day {} walking distance {walking_distance_km:.1} km exceeds the {max_km:.1} km limit",
                        day.day
                    ),
                    item_id: None,
                    suggestion: None,
                });
            }
        }

        if let Some(per_day) = preferences.budget.per_day {
            if day_cost > per_day {
                issues.push(Issue {
                    issue_type: IssueType::Budget,
                    severity: IssueSeverity::Warning,
                    message: format!("day {} estimated cost {day_cost} exceeds the per-day budget {per_day}", day.day),
                    item_id: None,
                    suggestion: None,
                });
            }
        }
    }

    if let Some(total) = preferences.budget.total {
        let grand_total: rust_decimal::Decimal = days
            .iter()
            .flat_map(|day| day.items.iter())
            .filter_map(|item| item.content.cost_estimate.as_ref())
            .map(|cost| cost.amount)
            .sum();
        if grand_total > total {
            issues.push(Issue {
                issue_type: IssueType::Budget,
                severity: IssueSeverity::Warning,
                message: format!("total estimated cost {grand_total} exceeds the trip budget {total}"),
                item_id: None,
                suggestion: None,
            });
        }
    }

    let valid = !issues.iter().any(|issue| issue.severity == IssueSeverity::Error);
    ValidationReport { valid, issues }
}
