//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Discrete cell steps, one tick at a time
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No networking or async dependencies

pub mod collision;
pub mod grid;
pub mod passengers;
pub mod state;
pub mod tick;
pub mod train;
pub mod zones;

pub use collision::{Candidate, DeathCause};
pub use grid::{Cell, Direction, GridWorld};
pub use passengers::{Passenger, PassengerRegistry};
pub use state::GameState;
pub use tick::{GameEvent, Intent, tick};
pub use train::{Steer, Train, TrainId, TrainState};
pub use zones::{DeliveryZone, ZoneRegistry};
