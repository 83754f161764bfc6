use serde::{Deserialize, Serialize};
use utility::{id::HasId, time::TimeOfDay};

use crate::location::Location;

/// A point in a single day's opening hours, keyed externally by lowercase
/// weekday name (`sunday`..`saturday`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayHours {
    pub open: Option<TimeOfDay>,
    pub close: Option<TimeOfDay>,
    pub closed: bool,
}

impl DayHours {
    pub fn closed() -> Self {
        Self {
            open: None,
            close: None,
            closed: true,
        }
    }

    pub fn open(open: TimeOfDay, close: TimeOfDay) -> Self {
        Self {
            open: Some(open),
            close: Some(close),
            closed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyHours {
    pub sunday: DayHours,
    pub monday: DayHours,
    pub tuesday: DayHours,
    pub wednesday: DayHours,
    pub thursday: DayHours,
    pub friday: DayHours,
    pub saturday: DayHours,
}

impl WeeklyHours {
    pub fn for_day(&self, weekday_key: &str) -> Option<&DayHours> {
        match weekday_key {
            "sunday" => Some(&self.sunday),
            "monday" => Some(&self.monday),
            "tuesday" => Some(&self.tuesday),
            "wednesday" => Some(&self.wednesday),
            "thursday" => Some(&self.thursday),
            "friday" => Some(&self.friday),
            "saturday" => Some(&self.saturday),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min: rust_decimal::Decimal,
    pub max: rust_decimal::Decimal,
}

impl PriceRange {
    pub fn midpoint(&self) -> rust_decimal::Decimal {
        (self.min + self.max) / rust_decimal::Decimal::from(2)
    }
}

/// A point of interest, read-only for the core: owned and resolved by the
/// external POI catalog, never created or mutated by this crate.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poi {
    pub place_id: String,
    pub name: String,
    pub location: Location,
    pub hours: WeeklyHours,
    pub tags: Vec<String>,
    pub avg_duration_minutes: u32,
    pub price_range: Option<PriceRange>,
}

impl HasId for Poi {}

impl Poi {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_indoor(&self) -> bool {
        self.has_tag("indoor")
    }

    pub fn is_outdoor_by_heuristic(&self) -> bool {
        const OUTDOOR_HINTS: &[&str] =
            &["outdoor", "park", "beach", "hiking", "walking", "tour", "market"];
        OUTDOOR_HINTS.iter().any(|hint| {
            self.has_tag(hint) || self.name.to_lowercase().contains(hint)
        })
    }
}
