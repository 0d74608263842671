//! Room simulation state
//!
//! Everything the tick function mutates lives here. Iteration order is always
//! by entity id and randomness only comes from the room's seeded RNG.

use glam::IVec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::grid::{Cell, Direction, GridWorld};
use super::passengers::PassengerRegistry;
use super::train::{Train, TrainId};
use super::zones::{DeliveryZone, ZoneRegistry};
use crate::config::RoomConfig;
use crate::consts::*;

/// Complete simulation state of one room
#[derive(Debug, Clone)]
pub struct GameState {
    /// Room seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub grid: GridWorld,
    pub config: RoomConfig,
    /// Trains (sorted by id for determinism)
    pub trains: Vec<Train>,
    pub passengers: PassengerRegistry,
    pub zones: ZoneRegistry,
    /// Passengers delivered by every train so far
    pub delivered_total: u64,
    /// Next entity ID
    next_id: u32,
}

impl GameState {
    /// Empty state: no trains, zones or passengers
    pub fn new(config: RoomConfig, grid: GridWorld, seed: u64) -> Self {
        let passengers = PassengerRegistry::new(config.max_passengers_per_cell);
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            time_ticks: 0,
            grid,
            config,
            trains: Vec::new(),
            passengers,
            zones: ZoneRegistry::default(),
            delivered_total: 0,
            next_id: 1,
        }
    }

    /// State for a match of `players`: grid sized to the room, one delivery
    /// zone and a full set of starting passengers
    pub fn for_players(config: RoomConfig, players: usize, seed: u64) -> Self {
        let grid = GridWorld::for_players(&config, players);
        let mut state = Self::new(config, grid, seed);
        let id = state.next_entity_id();
        let zone = DeliveryZone::random(id, &state.grid, players, &mut state.rng);
        log::debug!(
            "Delivery zone at {:?} size {:?} on {}x{} grid",
            zone.origin,
            zone.size,
            grid.width,
            grid.height
        );
        state.zones = ZoneRegistry::new(vec![zone]);
        state.fill_passengers();
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn train(&self, id: TrainId) -> Option<&Train> {
        self.trains.iter().find(|t| t.id == id)
    }

    pub fn train_mut(&mut self, id: TrainId) -> Option<&mut Train> {
        self.trains.iter_mut().find(|t| t.id == id)
    }

    /// Add a train at a safe spawn cell. Returns None when the grid has no
    /// free cell left.
    pub fn add_train(&mut self, nickname: &str) -> Option<TrainId> {
        let cell = self.find_spawn_cell()?;
        Some(self.add_train_at(nickname, cell, Direction::East))
    }

    /// Add a train at an explicit cell
    pub fn add_train_at(&mut self, nickname: &str, cell: Cell, direction: Direction) -> TrainId {
        let id = self.next_entity_id();
        self.trains.push(Train::new(id, nickname, cell, direction));
        self.normalize_order();
        id
    }

    pub fn remove_train(&mut self, id: TrainId) -> Option<Train> {
        let index = self.trains.iter().position(|t| t.id == id)?;
        Some(self.trains.remove(index))
    }

    /// Whether any live train's head or wagon covers the cell
    pub fn is_occupied(&self, cell: Cell) -> bool {
        self.trains.iter().any(|t| t.occupies(cell))
    }

    /// Inside the walls, not covered by a train, a zone or a passenger
    pub fn is_free(&self, cell: Cell) -> bool {
        self.grid.contains(cell)
            && !self.is_occupied(cell)
            && !self.zones.contains(cell)
            && self.passengers.count_at(cell) == 0
    }

    /// Free and at least `SPAWN_SAFE_ZONE` cells from walls and trains
    fn is_safe_spawn(&self, cell: Cell) -> bool {
        if !self.is_free(cell) || self.grid.wall_distance(cell) < SPAWN_SAFE_ZONE {
            return false;
        }
        self.trains
            .iter()
            .flat_map(|t| t.cells())
            .all(|c| chebyshev(c, cell) > SPAWN_SAFE_ZONE)
    }

    /// Pick a spawn cell: random safe cells first, then the center, then any
    /// free cell in row order
    pub fn find_spawn_cell(&mut self) -> Option<Cell> {
        let max = IVec2::new(self.grid.width - 1, self.grid.height - 1);
        for _ in 0..SPAWN_ATTEMPTS {
            let cell = IVec2::new(
                self.rng.random_range(0..=max.x.max(0)),
                self.rng.random_range(0..=max.y.max(0)),
            );
            if self.is_safe_spawn(cell) {
                return Some(cell);
            }
        }
        let center = self.grid.center();
        if self.is_free(center) {
            log::debug!("No safe spawn found, using grid center");
            return Some(center);
        }
        self.grid.cells().find(|&c| self.is_free(c))
    }

    /// Uniformly random free cell
    pub fn random_free_cell(&mut self) -> Option<Cell> {
        let free: Vec<Cell> = self.grid.cells().filter(|&c| self.is_free(c)).collect();
        if free.is_empty() {
            return None;
        }
        let index = self.rng.random_range(0..free.len());
        Some(free[index])
    }

    /// Spawn one passenger at a random free cell if the map is below its cap
    pub fn spawn_passenger(&mut self) -> Option<Cell> {
        if self.passengers.total() >= self.config.max_passengers {
            return None;
        }
        let cell = self.random_free_cell()?;
        (self.passengers.deposit(cell, 1) > 0).then_some(cell)
    }

    /// Top the map up to `max_passengers` and restart the spawn timer
    pub fn fill_passengers(&mut self) {
        while self.spawn_passenger().is_some() {}
        self.passengers.spawn_timer = self.config.passenger_spawn_interval_ticks;
    }

    /// Passengers currently riding in wagons
    pub fn carried_total(&self) -> u64 {
        self.trains.iter().map(|t| t.wagons() as u64).sum()
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.trains.sort_by_key(|t| t.id);
        self.passengers.normalize_order();
    }
}

fn chebyshev(a: Cell, b: Cell) -> i32 {
    let d = (a - b).abs();
    d.x.max(d.y)
}
