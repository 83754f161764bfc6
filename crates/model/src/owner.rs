use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A trip is owned by exactly one of a registered user or an anonymous
/// guest session, never both — enforced by this being a sum type rather
/// than two nullable columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Owner {
    User { user_id: Uuid },
    Guest { guest_session_id: Uuid },
}

impl Owner {
    pub fn user(user_id: Uuid) -> Self {
        Self::User { user_id }
    }

    pub fn guest(guest_session_id: Uuid) -> Self {
        Self::Guest { guest_session_id }
    }
}
