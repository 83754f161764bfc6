use serde::{Deserialize, Serialize};
use utility::{money::Currency, time::TimeOfDay};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Travelers {
    pub adults: u32,
    pub children: u32,
    pub seniors: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTravelers;

impl Travelers {
    pub fn new(adults: u32, children: u32, seniors: u32) -> Result<Self, InvalidTravelers> {
        if adults < 1 {
            return Err(InvalidTravelers);
        }
        Ok(Self {
            adults,
            children,
            seniors,
        })
    }

    pub fn total(&self) -> u32 {
        self.adults + self.children + self.seniors
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub total: Option<rust_decimal::Decimal>,
    pub per_day: Option<rust_decimal::Decimal>,
    pub currency: Currency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStyle {
    Relaxed,
    Balanced,
    Packed,
    Adventure,
    Culture,
    Family,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidWindow;

impl DailyWindow {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self, InvalidWindow> {
        if start >= end {
            return Err(InvalidWindow);
        }
        Ok(Self { start, end })
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    pub max_walking_km_per_day: Option<f64>,
    pub has_children: bool,
    pub has_seniors: bool,
    pub needs_rest_time: bool,
    pub avoid_crowds: bool,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            max_walking_km_per_day: None,
            has_children: false,
            has_seniors: false,
            needs_rest_time: false,
            avoid_crowds: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// `YYYY-MM-DD`
    pub start: String,
    /// `YYYY-MM-DD`
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPreferences {
    pub destination: String,
    pub dates: DateRange,
    pub travelers: Travelers,
    pub budget: Budget,
    pub style: TripStyle,
    pub daily_window: DailyWindow,
    pub constraints: Constraints,
}
