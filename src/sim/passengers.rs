//! Passenger registry
//!
//! Passengers stack on a cell; a stack is removed once its count reaches zero.

use serde::{Deserialize, Serialize};

use super::grid::Cell;

/// A stack of passengers waiting on one cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passenger {
    pub id: u32,
    pub position: Cell,
    pub count: u32,
}

/// All passengers on the map (sorted by id for determinism)
#[derive(Debug, Clone)]
pub struct PassengerRegistry {
    pub passengers: Vec<Passenger>,
    next_id: u32,
    /// Largest stack a single cell may hold
    max_per_cell: u32,
    /// Ticks until the spawner runs again
    pub spawn_timer: u32,
}

impl PassengerRegistry {
    pub fn new(max_per_cell: u32) -> Self {
        Self {
            passengers: Vec::new(),
            next_id: 1,
            max_per_cell,
            spawn_timer: 0,
        }
    }

    /// Outstanding passengers on the map
    pub fn total(&self) -> u32 {
        self.passengers.iter().map(|p| p.count).sum()
    }

    pub fn count_at(&self, cell: Cell) -> u32 {
        self.passengers
            .iter()
            .find(|p| p.position == cell)
            .map_or(0, |p| p.count)
    }

    pub fn is_empty(&self) -> bool {
        self.passengers.is_empty()
    }

    /// Pick up one passenger at the cell; false when there is none
    pub fn take_one(&mut self, cell: Cell) -> bool {
        let Some(index) = self.passengers.iter().position(|p| p.position == cell) else {
            return false;
        };
        let passenger = &mut self.passengers[index];
        passenger.count = passenger.count.saturating_sub(1);
        if passenger.count == 0 {
            self.passengers.remove(index);
        }
        true
    }

    /// Whether the cell's stack can take one more passenger
    pub fn has_room(&self, cell: Cell) -> bool {
        self.count_at(cell) < self.max_per_cell
    }

    /// Add up to `count` passengers at the cell, stacking onto an existing
    /// entry without exceeding the per-cell cap. Returns how many were placed.
    pub fn deposit(&mut self, cell: Cell, count: u32) -> u32 {
        let placed = count.min(self.max_per_cell.saturating_sub(self.count_at(cell)));
        if placed == 0 {
            return 0;
        }
        if let Some(existing) = self.passengers.iter_mut().find(|p| p.position == cell) {
            existing.count += placed;
            return placed;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.passengers.push(Passenger {
            id,
            position: cell,
            count: placed,
        });
        placed
    }

    /// Advance the spawn timer; true when a spawn is due this tick
    pub fn spawn_due(&mut self, interval: u32) -> bool {
        if self.spawn_timer > 0 {
            self.spawn_timer -= 1;
            return false;
        }
        self.spawn_timer = interval.saturating_sub(1);
        true
    }

    pub fn normalize_order(&mut self) {
        self.passengers.sort_by_key(|p| p.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec2;

    #[test]
    fn test_take_one_removes_empty_stacks() {
        let mut registry = PassengerRegistry::new(3);
        let cell = IVec2::new(2, 3);
        registry.deposit(cell, 2);
        assert_eq!(registry.total(), 2);

        assert!(registry.take_one(cell));
        assert_eq!(registry.count_at(cell), 1);
        assert!(registry.take_one(cell));
        assert!(registry.is_empty());
        assert!(!registry.take_one(cell));
    }

    #[test]
    fn test_deposit_stacks_on_same_cell() {
        let mut registry = PassengerRegistry::new(3);
        let cell = IVec2::new(1, 1);
        registry.deposit(cell, 1);
        registry.deposit(cell, 1);
        registry.deposit(IVec2::new(4, 4), 0);
        assert_eq!(registry.passengers.len(), 1);
        assert_eq!(registry.count_at(cell), 2);
    }

    #[test]
    fn test_deposit_respects_cell_cap() {
        let mut registry = PassengerRegistry::new(3);
        let cell = IVec2::new(1, 1);
        assert_eq!(registry.deposit(cell, 2), 2);
        assert!(registry.has_room(cell));
        assert_eq!(registry.deposit(cell, 2), 1);
        assert!(!registry.has_room(cell));
        assert_eq!(registry.deposit(cell, 1), 0);
        assert_eq!(registry.count_at(cell), 3);
        assert_eq!(registry.passengers.len(), 1);
    }

    #[test]
    fn test_spawn_timer_cadence() {
        let mut registry = PassengerRegistry::new(3);
        let due: Vec<bool> = (0..7).map(|_| registry.spawn_due(3)).collect();
        assert_eq!(due, vec![true, false, false, true, false, false, true]);
    }
}
