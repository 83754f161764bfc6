use model::{
    event::{EventDetails, EventSignal, Severity, TimeSlot},
    location::Location,
};
use sqlx::{prelude::FromRow, types::Json};
use utility::id::Id;
use uuid::Uuid;

use crate::CorruptRow;

#[derive(Debug, Clone, FromRow)]
pub struct EventSignalRow {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub severity: String,
    pub location: Json<Location>,
    pub time_slot: Json<TimeSlot>,
    pub details: Json<EventDetails>,
    pub affected_items: Vec<Uuid>,
    pub processed: bool,
    pub replan_triggered: bool,
}

impl EventSignalRow {
    pub fn to_model(&self) -> Result<EventSignal, CorruptRow> {
        let severity = match self.severity.as_str() {
            "low" => Severity::Low,
            "medium" => Severity::Medium,
            "high" => Severity::High,
            _ => return Err(CorruptRow("unrecognized event severity")),
        };
        Ok(EventSignal {
            trip_id: Id::new(self.trip_id),
            severity,
            location: self.location.0,
            time_slot: self.time_slot.0,
            details: self.details.0.clone(),
            affected_items: self.affected_items.iter().copied().map(Id::new).collect(),
            processed: self.processed,
            replan_triggered: self.replan_triggered,
        })
    }
}

pub fn severity_to_str(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "low",
        Severity::Medium => "medium",
        Severity::High => "high",
    }
}
