use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{itinerary::ItineraryItem, location::Location, trip::Trip};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Sunny,
    LightRain,
    HeavyRain,
    Cloudy,
    Snow,
    Other(String),
}

/// The event-specific payload, modeled as a tagged union rather than
/// untyped JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventDetails {
    Weather {
        condition: WeatherCondition,
        temperature: Option<f64>,
        humidity: Option<f64>,
        wind_speed: Option<f64>,
        impact: String,
    },
    Closure {
        reason: Option<String>,
    },
    SoldOut {
        item_name: Option<String>,
    },
    Delay {
        delay_minutes: u32,
    },
    AvailabilityChanged {
        description: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Weather,
    Closure,
    SoldOut,
    Delay,
    AvailabilityChanged,
}

impl EventDetails {
    pub fn event_type(&self) -> EventType {
        match self {
            EventDetails::Weather { .. } => EventType::Weather,
            EventDetails::Closure { .. } => EventType::Closure,
            EventDetails::SoldOut { .. } => EventType::SoldOut,
            EventDetails::Delay { .. } => EventType::Delay,
            EventDetails::AvailabilityChanged { .. } => EventType::AvailabilityChanged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeSlot {
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSignal {
    pub trip_id: Id<Trip>,
    pub severity: Severity,
    pub location: Location,
    pub time_slot: TimeSlot,
    pub details: EventDetails,
    pub affected_items: Vec<Id<ItineraryItem>>,
    pub processed: bool,
    pub replan_triggered: bool,
}

impl HasId for EventSignal {}

impl EventSignal {
    pub fn event_type(&self) -> EventType {
        self.details.event_type()
    }
}
