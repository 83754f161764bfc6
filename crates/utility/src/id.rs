use std::{fmt, hash, marker::PhantomData};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marker trait for types that are identified by an [`Id<T>`].
///
/// Every entity in the plan aggregate (trip, item, booking, ...) implements
/// this so its id carries the entity type as a phantom parameter and ids of
/// different entities can never be confused, even though all of them are
/// backed by the same opaque 128-bit representation.
pub trait HasId {}

/// An opaque 128-bit token identifying a `T`.
pub struct Id<T: HasId>(Uuid, PhantomData<T>);

impl<T: HasId> Id<T> {
    pub fn new(inner: Uuid) -> Self {
        Self(inner, PhantomData)
    }

    pub fn generate() -> Self {
        Self::new(Uuid::new_v4())
    }

    pub fn raw(&self) -> Uuid {
        self.0
    }
}

impl<T: HasId> From<Uuid> for Id<T> {
    fn from(value: Uuid) -> Self {
        Self::new(value)
    }
}

impl<T: HasId> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Id").field(&self.0).finish()
    }
}

impl<T: HasId> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<T: HasId> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: HasId> Copy for Id<T> {}

impl<T: HasId> hash::Hash for Id<T> {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl<T: HasId> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq(&other.0)
    }
}

impl<T: HasId> Eq for Id<T> {}

impl<'de, T: HasId> Deserialize<'de> for Id<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Uuid::deserialize(deserializer).map(Id::new)
    }
}

impl<T: HasId> Serialize for Id<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Thing;
    impl HasId for Thing {}

    #[test]
    fn round_trips_through_serde() {
        let id: Id<Thing> = Id::generate();
        let json = serde_json::to_string(&id).unwrap();
        let back: Id<Thing> = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn equality_is_by_underlying_uuid() {
        let raw = Uuid::new_v4();
        let a: Id<Thing> = Id::new(raw);
        let b: Id<Thing> = Id::new(raw);
        assert_eq!(a, b);
    }
}
