//! Game configuration, frame clock and lockstep driver for Hamlet.
//!
//! This crate owns the frame cycle that drives every player's economy and
//! routes the messages players exchange.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from YAML into strongly-typed
//!   structs.
//! - [`clock`] -- Frame counter and the intervals of the periodic checks.
//! - [`game`] -- [`Game`], the lockstep frame driver, with commands,
//!   diplomacy routing and whole-game save games.

pub mod clock;
pub mod config;
pub mod game;

pub use clock::{ClockError, GameClock};
pub use config::{ConfigError, GameConfig};
pub use game::{FrameEvent, FrameSummary, Game, GameCommand, GameError};
