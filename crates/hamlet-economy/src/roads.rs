//! The player's view of a road: who works on it.

use hamlet_types::{GameData, MapPoint, ObjectId, Persist, RoadId, StreamError};

/// Staffing of one worker slot on a road.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Staffing {
    /// Nobody assigned.
    #[default]
    Vacant,
    /// Ordered from a warehouse, on the way.
    Ordered(ObjectId),
    /// Working on the road.
    Working,
}

impl Staffing {
    /// Whether someone is assigned, on the way or working.
    pub const fn is_staffed(self) -> bool {
        !matches!(self, Self::Vacant)
    }

    fn persist(self, out: &mut GameData) {
        match self {
            Self::Vacant => out.push_u8(0),
            Self::Ordered(wh) => {
                out.push_u8(1);
                out.push_object(wh);
            }
            Self::Working => out.push_u8(2),
        }
    }

    fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        match input.pop_u8()? {
            0 => Ok(Self::Vacant),
            1 => Ok(Self::Ordered(input.pop_object()?)),
            2 => Ok(Self::Working),
            other => Err(StreamError::InvalidValue {
                field: "road staffing",
                value: u32::from(other),
            }),
        }
    }
}

/// A road segment owned by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Road {
    /// Handle shared with the road graph.
    pub id: RoadId,
    /// First flag.
    pub a: MapPoint,
    /// Second flag.
    pub b: MapPoint,
    /// Whether the road crosses water and needs a boat.
    pub boat: bool,
    /// Carrier slot.
    pub carrier: Staffing,
    /// Pack donkey slot.
    pub donkey: Staffing,
    /// Productivity of the carrier in percent.
    pub carrier_productivity: u16,
    /// Whether traffic is heavy enough for a donkey.
    pub busy: bool,
}

impl Road {
    /// An unstaffed road.
    pub const fn new(id: RoadId, a: MapPoint, b: MapPoint, boat: bool) -> Self {
        Self {
            id,
            a,
            b,
            boat,
            carrier: Staffing::Vacant,
            donkey: Staffing::Vacant,
            carrier_productivity: 0,
            busy: false,
        }
    }

    /// Whether the road wants a pack donkey.
    ///
    /// Only busy land roads with a working carrier get one.
    pub const fn needs_donkey(&self) -> bool {
        self.busy
            && !self.boat
            && matches!(self.carrier, Staffing::Working)
            && !self.donkey.is_staffed()
    }

    /// Whether one end of the road is at `flag`.
    pub fn touches(&self, flag: MapPoint) -> bool {
        self.a == flag || self.b == flag
    }
}

impl Persist for Road {
    fn persist(&self, out: &mut GameData) -> Result<(), StreamError> {
        out.push_road(self.id);
        out.push_point(self.a);
        out.push_point(self.b);
        out.push_bool(self.boat);
        self.carrier.persist(out);
        self.donkey.persist(out);
        out.push_u16(self.carrier_productivity);
        out.push_bool(self.busy);
        Ok(())
    }

    fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        Ok(Self {
            id: input.pop_road()?,
            a: input.pop_point()?,
            b: input.pop_point()?,
            boat: input.pop_bool()?,
            carrier: Staffing::restore(input)?,
            donkey: Staffing::restore(input)?,
            carrier_productivity: input.pop_u16()?,
            busy: input.pop_bool()?,
        })
    }
}
