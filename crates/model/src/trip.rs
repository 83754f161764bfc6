use serde::{Deserialize, Serialize};
use utility::id::HasId;

use crate::owner::Owner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Draft,
    Planning,
    Booked,
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub owner: Owner,
    pub status: TripStatus,
}

impl HasId for Trip {}

impl Trip {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            status: TripStatus::Draft,
        }
    }
}
