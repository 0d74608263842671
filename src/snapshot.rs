//! Per-tick world view
//!
//! The one read-only picture of a room every controller sees, local or
//! remote. Positions are in pixels (`cell * cell_size`).

use std::collections::BTreeMap;

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::controller::ControllerKind;
use crate::leaderboard::BestScores;
use crate::sim::{Direction, GameState, TrainId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridView {
    pub width: i32,
    pub height: i32,
    pub cell_size: i32,
}

impl GridView {
    /// Pixel position back to a cell (floor division)
    pub fn to_cell(&self, pixels: IVec2) -> IVec2 {
        pixels.div_euclid(IVec2::splat(self.cell_size.max(1)))
    }

    pub fn contains_cell(&self, cell: IVec2) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainView {
    pub id: TrainId,
    pub nickname: String,
    pub controller: ControllerKind,
    /// None while dead
    pub head: Option<IVec2>,
    pub direction: Direction,
    /// Wagons, nearest the head first
    pub body: Vec<IVec2>,
    pub alive: bool,
    pub respawn_remaining: u32,
    pub score: u64,
    pub boost_active: bool,
    pub boost_cooldown_remaining: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassengerView {
    pub position: IVec2,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneView {
    pub id: u32,
    /// Top-left corner
    pub position: IVec2,
    pub width: i32,
    pub height: i32,
}

impl ZoneView {
    pub fn contains(&self, pixels: IVec2) -> bool {
        let rel = pixels - self.position;
        rel.x >= 0 && rel.y >= 0 && rel.x < self.width && rel.y < self.height
    }
}

/// Complete room state as published after a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub grid: GridView,
    pub trains: Vec<TrainView>,
    pub passengers: Vec<PassengerView>,
    pub zones: Vec<ZoneView>,
    pub best_scores: BestScores,
    pub remaining_ticks: u64,
}

impl Snapshot {
    /// Capture the current state of a room
    pub fn capture(
        state: &GameState,
        controllers: &BTreeMap<TrainId, ControllerKind>,
        best_scores: &BestScores,
        remaining_ticks: u64,
    ) -> Self {
        let grid = &state.grid;
        let trains = state
            .trains
            .iter()
            .map(|t| TrainView {
                id: t.id,
                nickname: t.nickname.clone(),
                controller: controllers
                    .get(&t.id)
                    .copied()
                    .unwrap_or(ControllerKind::Fallback),
                head: t.head.map(|h| grid.to_pixels(h)),
                direction: t.direction,
                body: t.body.iter().map(|&c| grid.to_pixels(c)).collect(),
                alive: t.is_alive(),
                respawn_remaining: t.respawn_remaining(),
                score: t.score,
                boost_active: t.boost_active(),
                boost_cooldown_remaining: t.boost_cooldown_remaining,
            })
            .collect();

        let passengers = state
            .passengers
            .passengers
            .iter()
            .map(|p| PassengerView {
                position: grid.to_pixels(p.position),
                count: p.count,
            })
            .collect();

        let zones = state
            .zones
            .zones
            .iter()
            .map(|z| ZoneView {
                id: z.id,
                position: grid.to_pixels(z.origin),
                width: z.size.x * grid.cell_size,
                height: z.size.y * grid.cell_size,
            })
            .collect();

        Self {
            tick: state.time_ticks,
            grid: GridView {
                width: grid.width,
                height: grid.height,
                cell_size: grid.cell_size,
            },
            trains,
            passengers,
            zones,
            best_scores: best_scores.clone(),
            remaining_ticks,
        }
    }

    pub fn train(&self, id: TrainId) -> Option<&TrainView> {
        self.trains.iter().find(|t| t.id == id)
    }
}
