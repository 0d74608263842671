//! Built-in AI
//!
//! Greedy and cheap: head for the nearest passenger, or for the delivery zone
//! once enough wagons are in tow, among the moves that do not crash next step.

use std::collections::HashSet;

use glam::IVec2;

use super::{Controller, ControllerKind};
use crate::sim::{Direction, Intent, Steer, TrainId};
use crate::snapshot::Snapshot;

/// Wagons carried before heading for a zone
const DELIVER_AT: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct FallbackController {
    /// Last steer sent; repeated straight intents are skipped
    last: Option<Steer>,
}

impl FallbackController {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Controller for FallbackController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Fallback
    }

    fn compute_intent(&mut self, snapshot: &Snapshot, train: TrainId) -> Option<Intent> {
        let me = snapshot.train(train)?;
        let grid = snapshot.grid;
        let head = grid.to_cell(me.head?);

        let blocked: HashSet<IVec2> = snapshot
            .trains
            .iter()
            .flat_map(|t| t.head.iter().chain(t.body.iter()))
            .map(|&p| grid.to_cell(p))
            .collect();
        let is_open = |cell: IVec2| grid.contains_cell(cell) && !blocked.contains(&cell);

        let target = if me.body.len() >= DELIVER_AT || snapshot.passengers.is_empty() {
            nearest_zone_cell(snapshot, head)
        } else {
            snapshot
                .passengers
                .iter()
                .map(|p| grid.to_cell(p.position))
                .min_by_key(|&c| ((c - head).abs().element_sum(), c.x, c.y))
        };

        // Straight first so ties keep the current heading
        let options = [Steer::Straight, Steer::Left, Steer::Right];
        let best = options
            .iter()
            .copied()
            .map(|steer| (steer, head + steer.resolve(me.direction).delta()))
            .filter(|&(_, cell)| is_open(cell))
            .min_by_key(|&(_, cell)| {
                let distance = target.map_or(0, |t| (t - cell).abs().element_sum());
                let exits = Direction::ALL
                    .iter()
                    .filter(|d| is_open(cell + d.delta()))
                    .count();
                // A cell with no way out is a trap whatever the distance
                (exits == 0, distance)
            })
            .map(|(steer, _)| steer)
            .unwrap_or(Steer::Straight);

        if best == Steer::Straight && self.last == Some(Steer::Straight) {
            return None;
        }
        self.last = Some(best);
        Some(Intent::steer(best))
    }
}

fn nearest_zone_cell(snapshot: &Snapshot, head: IVec2) -> Option<IVec2> {
    let grid = snapshot.grid;
    snapshot
        .zones
        .iter()
        .map(|z| {
            let min = grid.to_cell(z.position);
            let max = grid.to_cell(z.position + IVec2::new(z.width, z.height)) - IVec2::ONE;
            head.clamp(min, max.max(min))
        })
        .min_by_key(|&c| (c - head).abs().element_sum())
}
