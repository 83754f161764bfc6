//! Pure day-by-day placement algorithm. No I/O, no store, no provider
//! calls — everything here is a deterministic function of its inputs so it
//! can be exercised directly in tests without a `PlanStore`.

use chrono::{Duration, NaiveDate};
use model::{
    itinerary::{CostEstimate, CostConfidence, ItemType, ItineraryItem, RouteSegment, TransportMode},
    location::Location,
    poi::Poi,
    preferences::TripPreferences,
    trip::Trip,
    version::ItineraryDay,
    WithId,
};
use utility::{
    id::Id,
    time::{self, TimeOfDay},
};

/// A fixed placeholder for travel time between consecutive items when no
/// routing provider is available.
const PLACEHOLDER_TRAVEL_MINUTES: i64 = 20;
const LEADING_BUFFER_MINUTES: i64 = 15;

/// One POI occurrence to place. Duplicate ids across occurrences are the
/// caller's responsibility to de-duplicate (or not).
pub struct PoiOccurrence {
    pub id: Id<Poi>,
    pub poi: Poi,
}

fn date_for_day(start: &str, day: u32) -> Result<NaiveDate, time::TimeError> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .map_err(|_| time::TimeError::InvalidDate(start.to_owned()))?;
    Ok(start + Duration::days((day - 1) as i64))
}

fn round_robin_buckets(pois: Vec<PoiOccurrence>, days: u32) -> Vec<Vec<PoiOccurrence>> {
    let mut buckets: Vec<Vec<PoiOccurrence>> = (0..days).map(|_| Vec::new()).collect();
    for (index, occurrence) in pois.into_iter().enumerate() {
        buckets[index % days as usize].push(occurrence);
    }
    buckets
}

/// Builds one day's items: pinned items first (unmoved), then each POI
/// assigned to this day's bucket placed in order, skipping POIs that cannot
/// fit. Returns the built item list plus the total cost of newly placed
/// items (pinned items are not re-priced).
pub fn plan_day(
    trip_id: Id<Trip>,
    day: u32,
    date: &str,
    daily_window_start: TimeOfDay,
    daily_window_end: TimeOfDay,
    currency: utility::money::Currency,
    pinned: Vec<WithId<ItineraryItem>>,
    bucket: Vec<PoiOccurrence>,
) -> Result<(ItineraryDay, rust_decimal::Decimal), time::TimeError> {
    let weekday = time::weekday_key(date)?;

    let mut items: Vec<WithId<ItineraryItem>> = pinned;
    items.sort_by_key(|item| item.content.start_time);

    let mut cursor = items
        .last()
        .map(|item| item.content.end_time.max(daily_window_start))
        .unwrap_or(daily_window_start);

    let mut day_cost = rust_decimal::Decimal::ZERO;
    let mut previous_location: Option<Location> = items
        .last()
        .and_then(|item| item.content.location);

    for occurrence in bucket {
        let poi = &occurrence.poi;
        let hours = match poi.hours.for_day(weekday) {
            Some(hours) => hours,
            None => continue,
        };
        if hours.closed {
            log::warn!("poi {} closed on {weekday}, skipping", occurrence.id);
            continue;
        }
        let open = hours.open.unwrap_or(cursor);
        let close = match hours.close {
            Some(close) => close,
            None => continue,
        };

        let mut candidate_start = cursor.max(open);
        let extra_minutes = if previous_location.is_some() {
            PLACEHOLDER_TRAVEL_MINUTES + LEADING_BUFFER_MINUTES
        } else {
            LEADING_BUFFER_MINUTES
        };
        candidate_start = match candidate_start.add_minutes(extra_minutes) {
            Ok(t) => t,
            Err(_) => continue,
        };

        let candidate_end = match candidate_start.add_minutes(poi.avg_duration_minutes as i64) {
            Ok(t) => t,
            Err(_) => continue,
        };
        if candidate_end > close || candidate_end > daily_window_end {
            continue;
        }

        let item_id = Id::generate();
        let route_from_previous = previous_location.map(|from| RouteSegment {
            from_item_id: items.last().map(|item| item.id),
            to_item_id: item_id,
            mode: TransportMode::Walking,
            distance_km: from.distance_km(&poi.location),
            duration_minutes: PLACEHOLDER_TRAVEL_MINUTES as u32,
            cost_estimate: None,
        });

        let cost_estimate = poi.price_range.map(|range| CostEstimate {
            amount: range.midpoint(),
            currency,
            confidence: CostConfidence::Estimated,
        });
        if let Some(estimate) = &cost_estimate {
            day_cost += estimate.amount;
        }

        let item = ItineraryItem {
            trip_id,
            day,
            item_type: ItemType::Poi,
            poi_id: Some(occurrence.id),
            name: poi.name.clone(),
            location: Some(poi.location),
            start_time: candidate_start,
            end_time: candidate_end,
            duration_minutes: poi.avg_duration_minutes,
            is_pinned: false,
            order: 0,
            route_from_previous,
            cost_estimate,
            notes: None,
        };

        previous_location = Some(poi.location);
        cursor = candidate_end;
        items.push(WithId::new(item_id, item));
    }

    for (index, item) in items.iter_mut().enumerate() {
        item.content.order = index as u32;
    }

    Ok((ItineraryDay { day, items }, day_cost))
}

/// Distributes `pois` round-robin across `inclusive_day_count(dates)` days
/// and places each, returning the built days in order plus each day's cost.
pub fn plan_days(
    preferences: &TripPreferences,
    trip_id: Id<Trip>,
    pois: Vec<PoiOccurrence>,
    pinned_by_day: std::collections::HashMap<u32, Vec<WithId<ItineraryItem>>>,
) -> Result<Vec<(ItineraryDay, rust_decimal::Decimal)>, time::TimeError> {
    let days = time::inclusive_day_count(&preferences.dates.start, &preferences.dates.end)?;
    let mut buckets = round_robin_buckets(pois, days);
    buckets.reverse();

    let mut result = Vec::with_capacity(days as usize);
    for day in 1..=days {
        let date = date_for_day(&preferences.dates.start, day)?.format("%Y-%m-%d").to_string();
        let bucket = buckets.pop().unwrap_or_default();
        let pinned = pinned_by_day.get(&day).cloned().unwrap_or_default();
        result.push(plan_day(
            trip_id,
            day,
            &date,
            preferences.daily_window.start,
            preferences.daily_window.end,
            preferences.budget.currency,
            pinned,
            bucket,
        )?);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::poi::{DayHours, PriceRange, WeeklyHours};
    use rust_decimal_macros::dec;
    use utility::money::Currency;

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

    fn poi(name: &str, duration: u32, open: &str, close: &str, price: i64) -> Poi {
        Poi {
            place_id: name.to_lowercase(),
            name: name.to_string(),
            location: Location::new(13.75, 100.50).unwrap(),
            hours: all_week_open(open, close),
            tags: vec![],
            avg_duration_minutes: duration,
            price_range: Some(PriceRange {
                min: rust_decimal::Decimal::from(price),
                max: rust_decimal::Decimal::from(price),
            }),
        }
    }

    #[test]
    fn two_day_trip_matches_scenario_one() {
        let preferences = TripPreferences {
            destination: "Bangkok".into(),
            dates: model::preferences::DateRange {
                start: "2025-03-01".into(),
                end: "2025-03-02".into(),
            },
            travelers: model::preferences::Travelers::new(2, 0, 0).unwrap(),
            budget: model::preferences::Budget {
                total: None,
                per_day: None,
                currency: Currency::parse("THB").unwrap(),
            },
            style: model::preferences::TripStyle::Balanced,
            daily_window: model::preferences::DailyWindow::new(
                TimeOfDay::parse("10:00").unwrap(),
                TimeOfDay::parse("20:00").unwrap(),
            )
            .unwrap(),
            constraints: model::preferences::Constraints::default(),
        };

        let trip_id = Id::generate();
        let pois = vec![
            PoiOccurrence { id: Id::generate(), poi: poi("A", 120, "09:00", "17:00", 500) },
            PoiOccurrence { id: Id::generate(), poi: poi("B", 90, "09:00", "18:00", 200) },
        ];

        let days = plan_days(&preferences, trip_id, pois, Default::default()).unwrap();
        assert_eq!(days.len(), 2);

        let (day1, cost1) = &days[0];
        assert_eq!(day1.items.len(), 1);
        assert_eq!(day1.items[0].content.start_time.format(), "10:15");
        assert_eq!(day1.items[0].content.end_time.format(), "12:15");
        assert_eq!(*cost1, dec!(500));

        let (day2, cost2) = &days[1];
        assert_eq!(day2.items.len(), 1);
        assert_eq!(day2.items[0].content.start_time.format(), "10:15");
        assert_eq!(day2.items[0].content.end_time.format(), "11:45");
        assert_eq!(*cost2, dec!(200));
    }

    #[test]
    fn empty_day_is_not_an_error() {
        let preferences = TripPreferences {
            destination: "Bangkok".into(),
            dates: model::preferences::DateRange {
                start: "2025-03-01".into(),
                end: "2025-03-01".into(),
            },
            travelers: model::preferences::Travelers::new(1, 0, 0).unwrap(),
            budget: model::preferences::Budget {
                total: None,
                per_day: None,
                currency: Currency::parse("THB").unwrap(),
            },
            style: model::preferences::TripStyle::Relaxed,
            daily_window: model::preferences::DailyWindow::new(
                TimeOfDay::parse("10:00").unwrap(),
                TimeOfDay::parse("20:00").unwrap(),
            )
            .unwrap(),
            constraints: model::preferences::Constraints::default(),
        };

        let days = plan_days(&preferences, Id::generate(), vec![], Default::default()).unwrap();
        assert_eq!(days.len(), 1);
        assert!(days[0].0.items.is_empty());
    }

    #[test]
    fn poi_closed_on_day_is_skipped_not_errored() {
        let closed_hours = WeeklyHours {
            sunday: DayHours::closed(),
            monday: DayHours::closed(),
            tuesday: DayHours::closed(),
            wednesday: DayHours::closed(),
            thursday: DayHours::closed(),
            friday: DayHours::closed(),
            saturday: DayHours::closed(),
        };
        let mut closed_poi = poi("Closed", 60, "09:00", "17:00", 100);
        closed_poi.hours = closed_hours;

        let preferences = TripPreferences {
            destination: "Bangkok".into(),
            dates: model::preferences::DateRange {
                start: "2025-03-01".into(),
                end: "2025-03-01".into(),
            },
            travelers: model::preferences::Travelers::new(1, 0, 0).unwrap(),
            budget: model::preferences::Budget {
                total: None,
                per_day: None,
                currency: Currency::parse("THB").unwrap(),
            },
            style: model::preferences::TripStyle::Relaxed,
            daily_window: model::preferences::DailyWindow::new(
                TimeOfDay::parse("10:00").unwrap(),
                TimeOfDay::parse("20:00").unwrap(),
            )
            .unwrap(),
            constraints: model::preferences::Constraints::default(),
        };

        let days = plan_days(
            &preferences,
            Id::generate(),
            vec![PoiOccurrence { id: Id::generate(), poi: closed_poi }],
            Default::default(),
        )
        .unwrap();
        assert!(days[0].0.items.is_empty());
    }
}
