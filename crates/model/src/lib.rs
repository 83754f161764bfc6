use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

pub mod booking;
pub mod event;
pub mod itinerary;
pub mod location;
pub mod owner;
pub mod poi;
pub mod preferences;
pub mod replan;
pub mod trip;
pub mod version;

/// Pairs an entity with its id, the way every repo method returns rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithId<V: HasId> {
    pub id: Id<V>,
    #[serde(flatten)]
    pub content: V,
}

impl<V: HasId> WithId<V> {
    pub fn new(id: Id<V>, content: V) -> Self {
        Self { id, content }
    }
}
