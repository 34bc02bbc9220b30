//! Carrier dispatch priorities per ware type.
//!
//! Each ware type belongs to one of [`TRANSPORT_GROUP_COUNT`] priority
//! groups. The player orders the groups; [`TransportPriorities`] maps every
//! ware to the position of its group in that order (lower = carried first).

use hamlet_types::{GameData, StreamError, WARE_TYPE_COUNT, WareType};

use crate::error::EconomyError;

/// Number of priority groups the player can reorder.
pub const TRANSPORT_GROUP_COUNT: usize = 14;

/// Default priority group of every ware type, indexed by ware.
pub const STD_TRANSPORT_PRIO: [u8; WARE_TYPE_COUNT] = [
    2, 12, 12, 12, 12, 12, 12, 12, 12, 12, 10, 10, 12, 12, 12, 13, 1, 3, 11, 11, 11, 1, 9, 7, 8, 1,
    1, 11, 0, 4, 5, 6, 11, 11, 1,
];

/// Per-ware transport priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportPriorities {
    prio: [u8; WARE_TYPE_COUNT],
}

impl Default for TransportPriorities {
    fn default() -> Self {
        Self {
            prio: STD_TRANSPORT_PRIO,
        }
    }
}

impl TransportPriorities {
    /// Priority of one ware type.
    pub fn priority(&self, ware: WareType) -> u8 {
        self.prio.get(ware.index()).copied().unwrap_or(u8::MAX)
    }

    /// Apply a new group order, as chosen in the transport settings window.
    ///
    /// `order[z]` names the standard group placed at position `z`.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidTransportOrder`] unless `order` is a
    /// permutation of the groups.
    pub fn convert_transport_data(
        &mut self,
        order: &[u8; TRANSPORT_GROUP_COUNT],
    ) -> Result<(), EconomyError> {
        let mut seen = [false; TRANSPORT_GROUP_COUNT];
        for group in order {
            let slot = seen
                .get_mut(usize::from(*group))
                .ok_or(EconomyError::InvalidTransportOrder)?;
            if *slot {
                return Err(EconomyError::InvalidTransportOrder);
            }
            *slot = true;
        }

        for (prio, std) in self.prio.iter_mut().zip(STD_TRANSPORT_PRIO) {
            if let Some(pos) = order.iter().position(|group| *group == std) {
                *prio = u8::try_from(pos).map_err(|_err| EconomyError::InvalidTransportOrder)?;
            }
        }
        Ok(())
    }

    /// The group order that produced the current priorities.
    pub fn transport_order(&self) -> [u8; TRANSPORT_GROUP_COUNT] {
        let mut order = [0_u8; TRANSPORT_GROUP_COUNT];
        for (prio, std) in self.prio.iter().zip(STD_TRANSPORT_PRIO) {
            if let Some(slot) = order.get_mut(usize::from(*prio)) {
                *slot = std;
            }
        }
        order
    }

    /// Write the raw priority bytes.
    pub fn persist(&self, out: &mut GameData) {
        out.push_raw(&self.prio);
    }

    /// Read the raw priority bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`StreamError`] if the stream is short or a priority is out
    /// of range.
    pub fn restore(input: &mut GameData) -> Result<Self, StreamError> {
        let raw = input.pop_raw(WARE_TYPE_COUNT)?;
        let mut prio = [0_u8; WARE_TYPE_COUNT];
        for (slot, value) in prio.iter_mut().zip(raw) {
            if usize::from(value) >= TRANSPORT_GROUP_COUNT {
                return Err(StreamError::InvalidValue {
                    field: "transport priority",
                    value: u32::from(value),
                });
            }
            *slot = value;
        }
        Ok(Self { prio })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn standard_order_is_identity() {
        let prios = TransportPriorities::default();
        let order = prios.transport_order();
        let expected: Vec<u8> = (0..14).collect();
        assert_eq!(order.to_vec(), expected);
        assert_eq!(prios.priority(WareType::Coins), 0);
        assert_eq!(prios.priority(WareType::Boat), 13);
    }

    #[test]
    fn reversed_order_flips_priorities() {
        let mut prios = TransportPriorities::default();
        let mut order = [0_u8; TRANSPORT_GROUP_COUNT];
        for (pos, slot) in order.iter_mut().enumerate() {
            *slot = u8::try_from(TRANSPORT_GROUP_COUNT - 1 - pos).unwrap();
        }
        prios.convert_transport_data(&order).unwrap();
        assert_eq!(prios.priority(WareType::Coins), 13);
        assert_eq!(prios.priority(WareType::Boat), 0);
        assert_eq!(prios.transport_order(), order);
    }

    #[test]
    fn duplicate_groups_are_rejected() {
        let mut prios = TransportPriorities::default();
        let order = [0_u8; TRANSPORT_GROUP_COUNT];
        assert!(matches!(
            prios.convert_transport_data(&order),
            Err(EconomyError::InvalidTransportOrder)
        ));
    }
}
