use model::{
    owner::Owner,
    preferences::{Budget, Constraints, DailyWindow, Travelers, TripPreferences},
    trip::{Trip, TripStatus},
};
use sqlx::{prelude::FromRow, types::Json};
use uuid::Uuid;

use crate::CorruptRow;

#[derive(Debug, Clone, FromRow)]
pub struct TripRow {
    pub id: Uuid,
    pub owner_user_id: Option<Uuid>,
    pub owner_guest_session_id: Option<Uuid>,
    pub status: String,
}

impl TripRow {
    pub fn to_model(&self) -> Result<Trip, CorruptRow> {
        let owner = match (self.owner_user_id, self.owner_guest_session_id) {
            (Some(user_id), None) => Owner::user(user_id),
            (None, Some(guest_session_id)) => Owner::guest(guest_session_id),
            _ => return Err(CorruptRow("trip has zero or two owner columns set")),
        };
        let status = match self.status.as_str() {
            "draft" => TripStatus::Draft,
            "planning" => TripStatus::Planning,
            "booked" => TripStatus::Booked,
            "active" => TripStatus::Active,
            "completed" => TripStatus::Completed,
            "cancelled" => TripStatus::Cancelled,
            _ => return Err(CorruptRow("unrecognized trip status")),
        };
        Ok(Trip { owner, status })
    }
}

pub fn status_to_str(status: TripStatus) -> &'static str {
    match status {
        TripStatus::Draft => "draft",
        TripStatus::Planning => "planning",
        TripStatus::Booked => "booked",
        TripStatus::Active => "active",
        TripStatus::Completed => "completed",
        TripStatus::Cancelled => "cancelled",
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TripPreferencesRow {
    pub destination: String,
    pub date_start: String,
    pub date_end: String,
    pub travelers: Json<Travelers>,
    pub budget: Json<Budget>,
    pub style: String,
    pub daily_window: Json<DailyWindow>,
    pub constraints: Json<Constraints>,
}

impl TripPreferencesRow {
    pub fn to_model(&self) -> Result<TripPreferences, CorruptRow> {
        use model::preferences::{DateRange, TripStyle};
        let style = match self.style.as_str() {
            "relaxed" => TripStyle::Relaxed,
            "balanced" => TripStyle::Balanced,
            "packed" => TripStyle::Packed,
            "adventure" => TripStyle::Adventure,
            "culture" => TripStyle::Culture,
            "family" => TripStyle::Family,
            _ => return Err(CorruptRow("unrecognized trip style")),
        };
        Ok(TripPreferences {
            destination: self.destination.clone(),
            dates: DateRange {
                start: self.date_start.clone(),
                end: self.date_end.clone(),
            },
            travelers: self.travelers.0,
            budget: self.budget.0.clone(),
            style,
            daily_window: self.daily_window.0,
            constraints: self.constraints.0.clone(),
        })
    }
}

pub fn style_to_str(style: model::preferences::TripStyle) -> &'static str {
    use model::preferences::TripStyle::*;
    match style {
        Relaxed => "relaxed",
        Balanced => "balanced",
        Packed => "packed",
        Adventure => "adventure",
        Culture => "culture",
        Family => "family",
    }
}
