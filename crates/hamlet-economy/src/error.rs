//! Error types for the hamlet-economy crate.
//!
//! "Not found" outcomes (no warehouse, no path, no consumer) are ordinary
//! `Option` results and never appear here. [`EconomyError`] is reserved for
//! broken invariants: continuing after one of these would let two clients
//! drift apart, so the frame driver aborts instead.

use hamlet_ledger::LedgerError;
use hamlet_types::{
    BuildingType, Job, ObjectId, RoadId, ShipId, StatisticType, StreamError, WareId, WareType,
};

/// Errors that can occur during economy operations.
#[derive(Debug, thiserror::Error)]
pub enum EconomyError {
    /// A building site asked for its priority but is not registered, or its
    /// type is missing from the build order.
    #[error("building site {0} has no build priority")]
    SitePriorityNotFound(ObjectId),

    /// A statistic would become negative.
    #[error("statistic {stat:?} would drop below zero ({current} {change:+})")]
    StatisticUnderflow {
        /// The statistic being changed.
        stat: StatisticType,
        /// Value before the change.
        current: u32,
        /// Requested change.
        change: i64,
    },

    /// Not enough goods in an inventory.
    #[error("cannot remove {requested} {ware:?}, only {available} stored")]
    WareUnderflow {
        /// The ware being removed.
        ware: WareType,
        /// Quantity requested.
        requested: u32,
        /// Quantity available.
        available: u32,
    },

    /// Not enough people in an inventory.
    #[error("cannot remove {requested} {job:?}, only {available} present")]
    FigureUnderflow {
        /// The job being removed.
        job: Job,
        /// Quantity requested.
        requested: u32,
        /// Quantity available.
        available: u32,
    },

    /// An object with this id is already registered.
    #[error("object {0} is already registered")]
    DuplicateObject(ObjectId),

    /// A ware with this handle is already registered.
    #[error("ware {0} is already registered")]
    DuplicateWare(WareId),

    /// A ship with this handle is already registered.
    #[error("ship {0} is already registered")]
    DuplicateShip(ShipId),

    /// A road with this handle is already registered.
    #[error("road {0} is already registered")]
    DuplicateRoad(RoadId),

    /// No building with this id is registered.
    #[error("building not found: {0}")]
    BuildingNotFound(ObjectId),

    /// No road with this id is registered.
    #[error("road not found: {0}")]
    RoadNotFound(RoadId),

    /// No ware with this id is registered.
    #[error("ware not found: {0}")]
    WareNotFound(WareId),

    /// No ship with this id is registered.
    #[error("ship not found: {0}")]
    ShipNotFound(ShipId),

    /// A building of the wrong category was passed to a registry.
    #[error("building type {kind:?} cannot be registered as {expected}")]
    WrongBuildingType {
        /// The offending type.
        kind: BuildingType,
        /// The registry that rejected it.
        expected: &'static str,
    },

    /// A setting exceeds its scale.
    #[error("{setting}[{index}] = {value} exceeds maximum {max}")]
    SettingOutOfRange {
        /// Which settings vector.
        setting: &'static str,
        /// Position in the vector.
        index: usize,
        /// Offending value.
        value: u8,
        /// Allowed maximum.
        max: u8,
    },

    /// A build order is not a permutation of the buildable types.
    #[error("build order is not a permutation of the buildable types")]
    InvalidBuildOrder,

    /// A transport order is not a permutation of the priority groups.
    #[error("transport order is not a permutation of the priority groups")]
    InvalidTransportOrder,

    /// The object counter has no identifiers left.
    #[error("object identifiers exhausted")]
    IdsExhausted,

    /// An arithmetic operation overflowed.
    #[error("arithmetic overflow: {context}")]
    ArithmeticOverflow {
        /// What was being computed.
        context: &'static str,
    },

    /// Reading or writing the save stream failed.
    #[error("save stream error: {source}")]
    Stream {
        /// The underlying stream error.
        #[from]
        source: StreamError,
    },

    /// The pact ledger rejected an operation.
    #[error("diplomacy error: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: LedgerError,
    },
}
