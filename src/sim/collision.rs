//! Movement conflict resolution
//!
//! Every live train proposes a candidate head cell, then all candidates are
//! judged against the pre-tick world at once. Nothing is mutated here, so the
//! outcome does not depend on the order trains are evaluated in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::grid::{Cell, GridWorld};
use super::train::{Train, TrainId};

/// Where a live train wants its head to be after this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub id: TrainId,
    /// Head before the tick
    pub from: Cell,
    /// Head after the tick (equals `from` when not stepping)
    pub to: Cell,
    pub moving: bool,
}

/// Why a train died
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    Wall,
    SelfCollision,
    /// Ran into another train's wagons or the cell its head is leaving
    Wagon(TrainId),
    /// Two heads claimed the same cell
    HeadOn(TrainId),
    /// Two heads swapped cells
    Swap(TrainId),
}

/// Judge every candidate. Returns the trains that die this tick.
///
/// A moving train dies on leaving the grid, entering its own wagons (when
/// `self_collision` is set) or entering another train's wagons. Wagons are
/// taken as they were before the tick, plus the head of every other moving
/// train: that cell becomes its first wagon whenever the train carries wagons
/// or picks up a passenger this tick. Any two trains with the same candidate
/// die together, as do two trains swapping heads.
pub fn resolve(
    grid: &GridWorld,
    trains: &[Train],
    candidates: &[Candidate],
    self_collision: bool,
) -> BTreeMap<TrainId, DeathCause> {
    let mut deaths = BTreeMap::new();

    for c in candidates {
        let Some(train) = trains.iter().find(|t| t.id == c.id) else {
            continue;
        };

        let cause = if c.moving && !grid.contains(c.to) {
            Some(DeathCause::Wall)
        } else if c.moving && self_collision && hits_own_wagons(train, c.to) {
            Some(DeathCause::SelfCollision)
        } else if let Some(other) = c.moving.then(|| wagon_owner(trains, candidates, c)).flatten() {
            Some(DeathCause::Wagon(other))
        } else if let Some(other) = candidates.iter().find(|o| o.id != c.id && o.to == c.to) {
            Some(DeathCause::HeadOn(other.id))
        } else {
            candidates
                .iter()
                .find(|o| {
                    o.id != c.id && c.moving && o.moving && o.to == c.from && c.to == o.from
                })
                .map(|o| DeathCause::Swap(o.id))
        };

        if let Some(cause) = cause {
            deaths.insert(c.id, cause);
        }
    }

    deaths
}

/// The trailing wagon moves away this tick, so only the others count
fn hits_own_wagons(train: &Train, to: Cell) -> bool {
    let len = train.body.len();
    train.body.iter().take(len.saturating_sub(1)).any(|&cell| cell == to)
}

fn wagon_owner(trains: &[Train], candidates: &[Candidate], c: &Candidate) -> Option<TrainId> {
    for other in trains.iter().filter(|t| t.id != c.id && t.is_alive()) {
        if other.body.contains(&c.to) {
            return Some(other.id);
        }
        let vacated =
            other.head == Some(c.to) && candidates.iter().any(|o| o.id == other.id && o.moving);
        if vacated {
            return Some(other.id);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::grid::Direction;
    use glam::IVec2;
    use proptest::prelude::*;

    fn train(id: TrainId, head: (i32, i32), body: &[(i32, i32)]) -> Train {
        let mut t = Train::new(id, format!("t{id}"), IVec2::new(head.0, head.1), Direction::East);
        t.body.extend(body.iter().map(|&(x, y)| IVec2::new(x, y)));
        t
    }

    fn moving(id: TrainId, from: (i32, i32), to: (i32, i32)) -> Candidate {
        Candidate {
            id,
            from: IVec2::new(from.0, from.1),
            to: IVec2::new(to.0, to.1),
            moving: true,
        }
    }

    fn grid() -> GridWorld {
        GridWorld::new(10, 10, 20)
    }

    #[test]
    fn test_wall() {
        let trains = [train(1, (9, 5), &[])];
        let deaths = resolve(&grid(), &trains, &[moving(1, (9, 5), (10, 5))], true);
        assert_eq!(deaths.get(&1), Some(&DeathCause::Wall));
    }

    #[test]
    fn test_same_target_kills_both() {
        let trains = [train(1, (2, 3), &[]), train(2, (4, 3), &[])];
        let candidates = [moving(1, (2, 3), (3, 3)), moving(2, (4, 3), (3, 3))];
        let deaths = resolve(&grid(), &trains, &candidates, true);
        assert_eq!(deaths.get(&1), Some(&DeathCause::HeadOn(2)));
        assert_eq!(deaths.get(&2), Some(&DeathCause::HeadOn(1)));

        // Reversed evaluation order gives the same result
        let reversed = [candidates[1], candidates[0]];
        assert_eq!(resolve(&grid(), &trains, &reversed, true), deaths);
    }

    #[test]
    fn test_head_swap_kills_both() {
        let trains = [train(1, (3, 3), &[]), train(2, (4, 3), &[])];
        let candidates = [moving(1, (3, 3), (4, 3)), moving(2, (4, 3), (3, 3))];
        let deaths = resolve(&grid(), &trains, &candidates, true);
        assert_eq!(deaths.get(&1), Some(&DeathCause::Swap(2)));
        assert_eq!(deaths.get(&2), Some(&DeathCause::Swap(1)));
    }

    #[test]
    fn test_vacated_head_of_empty_train_blocks() {
        // Train 2 may pick up at (5,3), turning (4,3) into its first wagon
        let trains = [train(1, (3, 3), &[]), train(2, (4, 3), &[])];
        let candidates = [moving(1, (3, 3), (4, 3)), moving(2, (4, 3), (5, 3))];
        let deaths = resolve(&grid(), &trains, &candidates, true);
        assert_eq!(deaths.get(&1), Some(&DeathCause::Wagon(2)));
        assert_eq!(deaths.len(), 1);
    }

    #[test]
    fn test_stopped_leader_is_a_head_on() {
        let trains = [train(1, (3, 3), &[]), train(2, (4, 3), &[])];
        let candidates = [
            moving(1, (3, 3), (4, 3)),
            Candidate {
                id: 2,
                from: IVec2::new(4, 3),
                to: IVec2::new(4, 3),
                moving: false,
            },
        ];
        let deaths = resolve(&grid(), &trains, &candidates, true);
        assert_eq!(deaths.get(&1), Some(&DeathCause::HeadOn(2)));
        assert_eq!(deaths.get(&2), Some(&DeathCause::HeadOn(1)));
    }

    #[test]
    fn test_vacated_head_of_train_with_wagons_blocks() {
        let trains = [train(1, (3, 3), &[]), train(2, (4, 3), &[(4, 4)])];
        let candidates = [moving(1, (3, 3), (4, 3)), moving(2, (4, 3), (5, 3))];
        let deaths = resolve(&grid(), &trains, &candidates, true);
        assert_eq!(deaths.get(&1), Some(&DeathCause::Wagon(2)));
        assert!(!deaths.contains_key(&2));
    }

    #[test]
    fn test_entering_wagons() {
        let trains = [train(1, (3, 3), &[]), train(2, (4, 5), &[(4, 4), (4, 3)])];
        let candidates = [
            moving(1, (3, 3), (4, 4)),
            Candidate {
                id: 2,
                from: IVec2::new(4, 5),
                to: IVec2::new(4, 5),
                moving: false,
            },
        ];
        let deaths = resolve(&grid(), &trains, &candidates, true);
        assert_eq!(deaths.get(&1), Some(&DeathCause::Wagon(2)));
        assert_eq!(deaths.len(), 1);
    }

    #[test]
    fn test_self_collision_is_configurable() {
        // Head at (3,3) with a loop of wagons; stepping north hits (3,2)
        let trains = [train(1, (3, 3), &[(2, 3), (2, 2), (3, 2), (4, 2), (4, 3)])];
        let candidates = [moving(1, (3, 3), (3, 2))];
        let deaths = resolve(&grid(), &trains, &candidates, true);
        assert_eq!(deaths.get(&1), Some(&DeathCause::SelfCollision));
        assert!(resolve(&grid(), &trains, &candidates, false).is_empty());
    }

    #[test]
    fn test_chasing_own_tail_is_safe() {
        let trains = [train(1, (3, 3), &[(2, 3), (2, 2), (3, 2)])];
        let candidates = [moving(1, (3, 3), (3, 2))];
        assert!(resolve(&grid(), &trains, &candidates, true).is_empty());
    }

    proptest! {
        #[test]
        fn prop_order_independent_and_no_shared_heads(
            heads in prop::collection::btree_set((0i32..6, 0i32..6), 1..6),
            dirs in prop::collection::vec(0usize..4, 6),
        ) {
            let grid = GridWorld::new(6, 6, 20);
            let trains: Vec<Train> = heads
                .iter()
                .enumerate()
                .map(|(i, &h)| train(i as TrainId + 1, h, &[]))
                .collect();
            let candidates: Vec<Candidate> = trains
                .iter()
                .zip(dirs.iter())
                .map(|(t, &d)| {
                    let from = t.head.unwrap();
                    Candidate { id: t.id, from, to: from + Direction::ALL[d].delta(), moving: true }
                })
                .collect();

            let deaths = resolve(&grid, &trains, &candidates, true);
            let mut reversed = candidates.clone();
            reversed.reverse();
            prop_assert_eq!(&resolve(&grid, &trains, &reversed, true), &deaths);

            let survivors: Vec<Cell> = candidates
                .iter()
                .filter(|c| !deaths.contains_key(&c.id))
                .map(|c| c.to)
                .collect();
            for (i, a) in survivors.iter().enumerate() {
                prop_assert!(grid.contains(*a));
                prop_assert!(!survivors[i + 1..].contains(a));
            }
        }
    }
}
