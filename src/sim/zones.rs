//! Delivery zones
//!
//! Zones are static rectangles. Entering one with wagons scores them.

use glam::IVec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::grid::{Cell, GridWorld};

/// Axis-aligned scoring rectangle in cell units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryZone {
    pub id: u32,
    /// Top-left cell
    pub origin: Cell,
    /// Width and height in cells
    pub size: IVec2,
}

impl DeliveryZone {
    pub fn new(id: u32, origin: Cell, size: IVec2) -> Self {
        Self { id, origin, size }
    }

    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        let rel = cell - self.origin;
        rel.x >= 0 && rel.y >= 0 && rel.x < self.size.x && rel.y < self.size.y
    }

    /// Zone for a room of `players`: side `isqrt(players)` with one
    /// dimension doubled, at a random offset that keeps it inside the walls
    pub fn random(id: u32, grid: &GridWorld, players: usize, rng: &mut Pcg32) -> Self {
        let side = (players.max(1) as u32).isqrt() as i32;
        let size = if rng.random_bool(0.5) {
            IVec2::new(side * 2, side)
        } else {
            IVec2::new(side, side * 2)
        };
        let max_x = (grid.width - 1 - size.x).max(0);
        let max_y = (grid.height - 1 - size.y).max(0);
        let origin = IVec2::new(rng.random_range(0..=max_x), rng.random_range(0..=max_y));
        Self::new(id, origin, size)
    }
}

/// All zones in a room
#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
    pub zones: Vec<DeliveryZone>,
}

impl ZoneRegistry {
    pub fn new(zones: Vec<DeliveryZone>) -> Self {
        let mut zones = zones;
        zones.sort_by_key(|z| z.id);
        Self { zones }
    }

    /// First zone containing the cell
    pub fn containing(&self, cell: Cell) -> Option<&DeliveryZone> {
        self.zones.iter().find(|z| z.contains(cell))
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.containing(cell).is_some()
    }
}
