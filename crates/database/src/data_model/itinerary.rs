use model::{
    itinerary::{CostEstimate, ItemType, ItineraryItem, RouteSegment},
    location::Location,
    version::{ChangeType, ItineraryDay, ItineraryVersion},
    WithId,
};
use sqlx::{prelude::FromRow, types::Json};
use utility::{id::Id, time::TimeOfDay};
use uuid::Uuid;

use crate::CorruptRow;

#[derive(Debug, Clone, FromRow)]
pub struct ItineraryItemRow {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub day: i32,
    pub item_type: String,
    pub poi_id: Option<Uuid>,
    pub name: String,
    pub location: Option<Json<Location>>,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: i32,
    pub is_pinned: bool,
    pub order: i32,
    pub route_from_previous: Option<Json<RouteSegment>>,
    pub cost_estimate: Option<Json<CostEstimate>>,
    pub notes: Option<String>,
}

impl ItineraryItemRow {
    pub fn to_model(&self) -> Result<WithId<ItineraryItem>, CorruptRow> {
        let item_type = item_type_from_str(&self.item_type)?;
        let item = ItineraryItem {
            trip_id: Id::new(self.trip_id),
            day: self.day as u32,
            item_type,
            poi_id: self.poi_id.map(Id::new),
            name: self.name.clone(),
            location: self.location.as_ref().map(|json| json.0),
            start_time: TimeOfDay::parse(&self.start_time)
                .map_err(|_| CorruptRow("unparsable item start_time"))?,
            end_time: TimeOfDay::parse(&self.end_time)
                .map_err(|_| CorruptRow("unparsable item end_time"))?,
            duration_minutes: self.duration_minutes as u32,
            is_pinned: self.is_pinned,
            order: self.order as u32,
            route_from_previous: self.route_from_previous.clone().map(|json| json.0),
            cost_estimate: self.cost_estimate.as_ref().map(|json| json.0),
            notes: self.notes.clone(),
        };
        Ok(WithId::new(Id::new(self.id), item))
    }
}

pub fn item_type_to_str(item_type: ItemType) -> &'static str {
    match item_type {
        ItemType::Poi => "poi",
        ItemType::Activity => "activity",
        ItemType::Hotel => "hotel",
        ItemType::Transport => "transport",
        ItemType::Meal => "meal",
        ItemType::FreeTime => "free_time",
    }
}

fn item_type_from_str(value: &str) -> Result<ItemType, CorruptRow> {
    Ok(match value {
        "poi" => ItemType::Poi,
        "activity" => ItemType::Activity,
        "hotel" => ItemType::Hotel,
        "transport" => ItemType::Transport,
        "meal" => ItemType::Meal,
        "free_time" => ItemType::FreeTime,
        _ => return Err(CorruptRow("unrecognized item_type")),
    })
}

#[derive(Debug, Clone, FromRow)]
pub struct ItineraryVersionRow {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub version: i32,
    pub change_type: String,
    pub changed_by: Option<String>,
    pub snapshot: Json<Vec<ItineraryDay>>,
}

impl ItineraryVersionRow {
    pub fn to_model(&self) -> Result<WithId<ItineraryVersion>, CorruptRow> {
        let change_type = change_type_from_str(&self.change_type)?;
        Ok(WithId::new(
            Id::new(self.id),
            ItineraryVersion {
                trip_id: Id::new(self.trip_id),
                version: self.version as u32,
                change_type,
                changed_by: self.changed_by.clone(),
                days: self.snapshot.0.clone(),
            },
        ))
    }
}

pub fn change_type_to_str(change_type: ChangeType) -> &'static str {
    match change_type {
        ChangeType::Generate => "generate",
        ChangeType::Edit => "edit",
        ChangeType::Reorder => "reorder",
        ChangeType::TogglePin => "toggle_pin",
        ChangeType::SetStartTime => "set_start_time",
        ChangeType::Remove => "remove",
        ChangeType::Add => "add",
        ChangeType::Replan => "replan",
    }
}

fn change_type_from_str(value: &str) -> Result<ChangeType, CorruptRow> {
    Ok(match value {
        "generate" => ChangeType::Generate,
        "edit" => ChangeType::Edit,
        "reorder" => ChangeType::Reorder,
        "toggle_pin" => ChangeType::TogglePin,
        "set_start_time" => ChangeType::SetStartTime,
        "remove" => ChangeType::Remove,
        "add" => ChangeType::Add,
        "replan" => ChangeType::Replan,
        _ => return Err(CorruptRow("unrecognized change_type")),
    })
}
