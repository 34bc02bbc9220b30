//! Wares in transit.

use hamlet_types::{GameData, MapPoint, ObjectId, Persist, StreamError, WareId, WareType};

/// Where a ware currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WareLocation {
    /// Lying at a flag, waiting for a carrier.
    AtFlag,
    /// Queued in a warehouse, waiting to be carried out.
    InWarehouse(ObjectId),
    /// Waiting in a harbor for a ship.
    WaitingForShip(ObjectId),
    /// On a carrier's back or on a ship.
    Carried,
}

/// A transportable unit of one ware type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ware {
    /// Handle.
    pub id: WareId,
    /// Ware type.
    pub kind: WareType,
    /// Road node the ware is at or heading from.
    pub pos: MapPoint,
    /// Where the ware is.
    pub location: WareLocation,
    /// Building the ware is delivered to; `None` for a lost ware.
    pub goal: Option<ObjectId>,
}

impl Ware {
    /// A ware without a goal at a flag.
    pub const fn lost_at(id: WareId, kind: WareType, pos: MapPoint) -> Self {
        Self {
            id,
            kind,
            pos,
            location: WareLocation::AtFlag,
            goal: None,
        }
    }

    /// Whether the ware has no goal.
    pub const fn is_lost(&self) -> bool {
        self.goal.is_none()
    }

    /// Whether the ware lies at a flag.
    pub const fn is_waiting_at_flag(&self) -> bool {
        matches!(self.location, WareLocation::AtFlag)
    }
}

impl Persist for Ware {
    fn persist(&self, out: &mut GameData) -> Result<(), StreamError> {
        out.push_ware(self.id);
        out.push_u8(self.kind.as_u8());
        out.push_point(self.pos);
        match self.location {
            WareLocation::AtFlag => out.push_u8(0),
            WareLocation::InWarehouse(wh) => {
                out.push_u8(1);
                out.push_object(wh);
            }
            WareLocation::WaitingForShip(harbor) => {
                out.push_u8(2);
                out.push_object(harbor);
            }
            WareLocation::Carried => out.push_u8(3),
        }
        out.push_object_ref(self.goal);
        Ok(())
    }

    fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        let id = input.pop_ware()?;
        let raw = input.pop_u8()?;
        let kind = WareType::from_u8(raw).ok_or(StreamError::InvalidValue {
            field: "ware type",
            value: u32::from(raw),
        })?;
        let pos = input.pop_point()?;
        let location = match input.pop_u8()? {
            0 => WareLocation::AtFlag,
            1 => WareLocation::InWarehouse(input.pop_object()?),
            2 => WareLocation::WaitingForShip(input.pop_object()?),
            3 => WareLocation::Carried,
            other => {
                return Err(StreamError::InvalidValue {
                    field: "ware location",
                    value: u32::from(other),
                });
            }
        };
        Ok(Self {
            id,
            kind,
            pos,
            location,
            goal: input.pop_object_ref()?,
        })
    }
}
