use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{itinerary::ItineraryItem, trip::Trip, WithId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Generate,
    Edit,
    Reorder,
    TogglePin,
    SetStartTime,
    Remove,
    Add,
    Replan,
}

/// A single day's items, in display order. Each item keeps the stable id it
/// was created with so identity survives across versions and rollback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItineraryDay {
    pub day: u32,
    pub items: Vec<WithId<ItineraryItem>>,
}

/// A full snapshot of an itinerary at a given version. Append-only: once
/// written, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryVersion {
    pub trip_id: utility::id::Id<Trip>,
    pub version: u32,
    pub change_type: ChangeType,
    pub changed_by: Option<String>,
    pub days: Vec<ItineraryDay>,
}

impl HasId for ItineraryVersion {}

impl ItineraryVersion {
    pub fn items(&self) -> impl Iterator<Item = &WithId<ItineraryItem>> {
        self.days.iter().flat_map(|day| day.items.iter())
    }

    pub fn find_item(&self, id: Id<ItineraryItem>) -> Option<&WithId<ItineraryItem>> {
        self.items().find(|item| item.id == id)
    }
}
