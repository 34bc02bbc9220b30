//! Type-safe identifier wrappers around small integers.
//!
//! Every entity in the simulation is referenced by a strongly-typed handle
//! to prevent accidental mixing of identifiers at compile time. Handles are
//! plain integers handed out by a single [`ObjectCounter`], so two clients
//! replaying the same command stream always mint the same identifiers.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around an integer with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident($inner:ty)
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub $inner);

        impl $name {
            /// Wrap a raw handle value.
            pub const fn new(raw: $inner) -> Self {
                Self(raw)
            }

            /// Return the inner raw value.
            pub const fn into_inner(self) -> $inner {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(raw: $inner) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for $inner {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Index of a player slot (0-based, below [`MAX_PLAYERS`]).
    ///
    /// [`MAX_PLAYERS`]: crate::MAX_PLAYERS
    PlayerId(u8)
}

define_id! {
    /// Stable object identifier shared by every building kind (warehouses,
    /// harbors, production buildings, military buildings, building sites).
    ///
    /// Used as the final tie-breaker wherever candidate lists are sorted.
    ObjectId(u32)
}

define_id! {
    /// Handle of a road segment between two flags.
    RoadId(u32)
}

define_id! {
    /// Handle of a single transportable ware.
    WareId(u32)
}

define_id! {
    /// Handle of a ship.
    ShipId(u32)
}

define_id! {
    /// Identifier of a connected body of water.
    SeaId(u16)
}

impl PlayerId {
    /// Return the player slot as a `usize` for table lookups.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Monotonic source of object and ware handles.
///
/// The counter is part of the game snapshot: after a load the next handle
/// is exactly the one an uninterrupted run would have produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectCounter {
    /// The next raw value to hand out.
    next: u32,
}

impl ObjectCounter {
    /// Create a counter starting at `next`.
    pub const fn starting_at(next: u32) -> Self {
        Self { next }
    }

    /// Return the next raw value without consuming it.
    pub const fn peek(&self) -> u32 {
        self.next
    }

    /// Consume and return the next raw value.
    ///
    /// Returns `None` when the handle space is exhausted.
    pub const fn next_raw(&mut self) -> Option<u32> {
        let current = self.next;
        match current.checked_add(1) {
            Some(following) => {
                self.next = following;
                Some(current)
            }
            None => None,
        }
    }

    /// Mint a new [`ObjectId`].
    pub const fn next_object(&mut self) -> Option<ObjectId> {
        match self.next_raw() {
            Some(raw) => Some(ObjectId(raw)),
            None => None,
        }
    }

    /// Mint a new [`WareId`].
    pub const fn next_ware(&mut self) -> Option<WareId> {
        match self.next_raw() {
            Some(raw) => Some(WareId(raw)),
            None => None,
        }
    }
}

impl Default for ObjectCounter {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let object = ObjectId::new(7);
        let road = RoadId::new(7);
        // Same raw value, different types -- the compiler enforces no mixing.
        assert_eq!(object.into_inner(), road.into_inner());
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = ObjectId::new(42);
        let json = serde_json::to_string(&original).ok();
        assert_eq!(json.as_deref(), Some("42"));
        let restored: Result<ObjectId, _> = serde_json::from_str(json.as_deref().unwrap_or(""));
        assert_eq!(restored.ok(), Some(original));
    }

    #[test]
    fn counter_hands_out_sequential_handles() {
        let mut counter = ObjectCounter::default();
        assert_eq!(counter.next_object(), Some(ObjectId(1)));
        assert_eq!(counter.next_ware(), Some(WareId(2)));
        assert_eq!(counter.peek(), 3);
    }

    #[test]
    fn counter_reports_exhaustion() {
        let mut counter = ObjectCounter::starting_at(u32::MAX);
        assert_eq!(counter.next_raw(), None);
    }
}
