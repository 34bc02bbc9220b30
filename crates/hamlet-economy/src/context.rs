//! Per-call access to the shared game services.

use hamlet_types::{ObjectCounter, ObjectId, WareId};
use hamlet_world::{PathQueryPort, SyncedRandom};

use crate::error::EconomyError;

/// Services an economy operation may use: path queries, the frame
/// number, the synchronized generator and the id counter.
///
/// The game driver builds one per frame and hands it to each player in
/// turn, so every client draws randomness and ids in the same order.
pub struct EconomyContext<'a> {
    /// Road and sea path queries.
    pub paths: &'a dyn PathQueryPort,
    /// Current game frame.
    pub gf: u32,
    /// Game-wide synchronized generator.
    pub rng: &'a mut SyncedRandom,
    /// Game-wide object counter.
    pub ids: &'a mut ObjectCounter,
}

impl<'a> EconomyContext<'a> {
    /// Bundle the services for one call.
    pub fn new(
        paths: &'a dyn PathQueryPort,
        gf: u32,
        rng: &'a mut SyncedRandom,
        ids: &'a mut ObjectCounter,
    ) -> Self {
        Self { paths, gf, rng, ids }
    }

    /// Mint a new object id.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::IdsExhausted`] once the counter runs out.
    pub fn next_object(&mut self) -> Result<ObjectId, EconomyError> {
        self.ids.next_object().ok_or(EconomyError::IdsExhausted)
    }

    /// Mint a new ware handle.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::IdsExhausted`] once the counter runs out.
    pub fn next_ware(&mut self) -> Result<WareId, EconomyError> {
        self.ids.next_ware().ok_or(EconomyError::IdsExhausted)
    }
}
