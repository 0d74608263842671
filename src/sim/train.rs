//! Train state machine
//!
//! A train is either alive on the grid or waiting out its respawn delay.
//! Movement is fractional: speed accumulates each tick and the train steps one
//! cell whenever a full cell of progress has built up.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::grid::{Cell, Direction};
use crate::config::RoomConfig;

pub type TrainId = u32;

/// Relative or absolute steering request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Steer {
    Straight,
    Left,
    Right,
    North,
    East,
    South,
    West,
}

impl Steer {
    /// Heading this request resolves to from the current heading
    pub fn resolve(self, current: Direction) -> Direction {
        match self {
            Steer::Straight => current,
            Steer::Left => current.turn_left(),
            Steer::Right => current.turn_right(),
            Steer::North => Direction::North,
            Steer::East => Direction::East,
            Steer::South => Direction::South,
            Steer::West => Direction::West,
        }
    }
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainState {
    Alive,
    DeadAwaitingRespawn { respawn_remaining: u32 },
}

/// A train entity
#[derive(Debug, Clone)]
pub struct Train {
    pub id: TrainId,
    /// Display name of the seat owner
    pub nickname: String,
    /// None while dead
    pub head: Option<Cell>,
    pub direction: Direction,
    /// Heading applied at the next step
    pub next_direction: Direction,
    /// Wagons, nearest the head first
    pub body: VecDeque<Cell>,
    /// Accumulated fractional movement (cells)
    pub progress: f32,
    pub boost_remaining: u32,
    pub boost_cooldown_remaining: u32,
    pub state: TrainState,
    pub score: u64,
}

impl Train {
    pub fn new(id: TrainId, nickname: impl Into<String>, head: Cell, direction: Direction) -> Self {
        Self {
            id,
            nickname: nickname.into(),
            head: Some(head),
            direction,
            next_direction: direction,
            body: VecDeque::new(),
            progress: 0.0,
            boost_remaining: 0,
            boost_cooldown_remaining: 0,
            state: TrainState::Alive,
            score: 0,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.state == TrainState::Alive
    }

    #[inline]
    pub fn wagons(&self) -> usize {
        self.body.len()
    }

    pub fn boost_active(&self) -> bool {
        self.boost_remaining > 0
    }

    pub fn respawn_remaining(&self) -> u32 {
        match self.state {
            TrainState::Alive => 0,
            TrainState::DeadAwaitingRespawn { respawn_remaining } => respawn_remaining,
        }
    }

    /// Cells per tick at the current wagon count
    pub fn speed(&self, config: &RoomConfig) -> f32 {
        let base = config.base_speed * config.speed_decay.powi(self.body.len() as i32);
        if self.boost_active() {
            base * config.boost_intensity
        } else {
            base
        }
    }

    /// Request a new heading. Reversals and requests from dead trains are
    /// ignored; returns whether the request was accepted.
    pub fn request_direction(&mut self, direction: Direction) -> bool {
        if !self.is_alive() || direction.is_opposite(self.direction) {
            return false;
        }
        self.next_direction = direction;
        true
    }

    /// Relative turns resolve against the heading the train is moving in now
    pub fn steer(&mut self, steer: Steer) -> bool {
        self.request_direction(steer.resolve(self.direction))
    }

    /// Accumulate one tick of movement; true when the train steps this tick.
    /// A train never covers more than one cell per tick.
    pub fn advance_progress(&mut self, config: &RoomConfig) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.progress += self.speed(config);
        if self.progress >= 1.0 {
            self.progress = (self.progress - 1.0).min(0.99);
            true
        } else {
            false
        }
    }

    /// Count down boost and cooldown timers
    pub fn tick_timers(&mut self) {
        self.boost_remaining = self.boost_remaining.saturating_sub(1);
        self.boost_cooldown_remaining = self.boost_cooldown_remaining.saturating_sub(1);
    }

    /// Count down the respawn delay; true once the train may re-enter
    pub fn tick_respawn(&mut self) -> bool {
        match &mut self.state {
            TrainState::Alive => false,
            TrainState::DeadAwaitingRespawn { respawn_remaining } => {
                *respawn_remaining = respawn_remaining.saturating_sub(1);
                *respawn_remaining == 0
            }
        }
    }

    /// Drop the trailing wagon for a speed boost. Returns the freed cell, or
    /// None (with no side effect) while dead, boosting, cooling down, or empty.
    pub fn try_drop_wagon(&mut self, config: &RoomConfig) -> Option<Cell> {
        if !self.is_alive() || self.boost_active() || self.boost_cooldown_remaining > 0 {
            return None;
        }
        let tail = self.body.pop_back()?;
        self.boost_remaining = config.boost_duration_ticks;
        self.boost_cooldown_remaining = config.boost_duration_ticks + config.boost_cooldown_ticks;
        Some(tail)
    }

    /// Move the head to `to`. The old head becomes the first wagon and the
    /// trailing cell is released and returned (the old head itself when the
    /// train had no wagons).
    pub fn advance_head(&mut self, to: Cell) -> Option<Cell> {
        let from = self.head.replace(to)?;
        self.direction = self.next_direction;
        self.body.push_front(from);
        self.body.pop_back()
    }

    /// Re-attach the cell released by `advance_head`, growing by one wagon
    pub fn grow(&mut self, released: Cell) {
        self.body.push_back(released);
    }

    /// Deliver every carried passenger; returns how many
    pub fn deliver(&mut self) -> u32 {
        let delivered = self.body.len() as u32;
        self.body.clear();
        self.score += delivered as u64;
        delivered
    }

    /// Collision: leave the grid and wait `respawn_delay` ticks
    pub fn kill(&mut self, respawn_delay: u32) {
        self.state = TrainState::DeadAwaitingRespawn {
            respawn_remaining: respawn_delay,
        };
        self.head = None;
        self.body.clear();
        self.progress = 0.0;
        self.boost_remaining = 0;
    }

    /// Re-enter the grid at `cell`, heading east with no wagons
    pub fn respawn(&mut self, cell: Cell) {
        self.state = TrainState::Alive;
        self.head = Some(cell);
        self.direction = Direction::East;
        self.next_direction = Direction::East;
        self.body.clear();
        self.progress = 0.0;
    }

    /// Whether the head or any wagon sits on the cell
    pub fn occupies(&self, cell: Cell) -> bool {
        self.head == Some(cell) || self.body.contains(&cell)
    }

    /// Head followed by wagons
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.head.into_iter().chain(self.body.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec2;

    fn unit_config() -> RoomConfig {
        RoomConfig {
            base_speed: 1.0,
            speed_decay: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_reversal_is_ignored() {
        let mut train = Train::new(1, "a", IVec2::new(5, 5), Direction::North);
        assert!(!train.request_direction(Direction::South));
        assert_eq!(train.next_direction, Direction::North);
        assert!(!train.steer(Steer::South));
        assert!(train.steer(Steer::Left));
        assert_eq!(train.next_direction, Direction::West);
    }

    #[test]
    fn test_left_twice_before_moving_is_left_once() {
        let mut train = Train::new(1, "a", IVec2::new(5, 5), Direction::North);
        train.steer(Steer::Left);
        train.steer(Steer::Left);
        assert_eq!(train.next_direction, Direction::West);
    }

    #[test]
    fn test_dead_train_rejects_steering() {
        let mut train = Train::new(1, "a", IVec2::new(5, 5), Direction::East);
        train.kill(10);
        assert!(!train.steer(Steer::Left));
        assert!(train.head.is_none());
        assert_eq!(train.respawn_remaining(), 10);
    }

    #[test]
    fn test_speed_decreases_with_wagons() {
        let config = RoomConfig::default();
        let mut train = Train::new(1, "a", IVec2::new(5, 5), Direction::East);
        let empty = train.speed(&config);
        train.body.push_back(IVec2::new(4, 5));
        assert!(train.speed(&config) < empty);
    }

    #[test]
    fn test_fractional_progress_is_deterministic() {
        let config = RoomConfig {
            base_speed: 0.25,
            speed_decay: 1.0,
            ..Default::default()
        };
        let mut train = Train::new(1, "a", IVec2::new(5, 5), Direction::East);
        let steps: Vec<bool> = (0..8).map(|_| train.advance_progress(&config)).collect();
        assert_eq!(
            steps,
            vec![false, false, false, true, false, false, false, true]
        );
    }

    #[test]
    fn test_advance_and_grow() {
        let mut train = Train::new(1, "a", IVec2::new(5, 5), Direction::East);
        let released = train.advance_head(IVec2::new(6, 5));
        assert_eq!(released, Some(IVec2::new(5, 5)));
        assert!(train.body.is_empty());

        train.grow(IVec2::new(5, 5));
        assert_eq!(train.wagons(), 1);

        let released = train.advance_head(IVec2::new(7, 5));
        assert_eq!(released, Some(IVec2::new(5, 5)));
        assert_eq!(train.body, VecDeque::from(vec![IVec2::new(6, 5)]));
    }

    #[test]
    fn test_drop_wagon_sets_boost_and_cooldown() {
        let config = unit_config();
        let mut train = Train::new(1, "a", IVec2::new(5, 5), Direction::East);
        assert_eq!(train.try_drop_wagon(&config), None);

        train.body.extend([IVec2::new(4, 5), IVec2::new(3, 5)]);
        assert_eq!(train.try_drop_wagon(&config), Some(IVec2::new(3, 5)));
        assert!(train.boost_active());
        assert_eq!(
            train.boost_cooldown_remaining,
            config.boost_duration_ticks + config.boost_cooldown_ticks
        );

        // Second drop during cooldown changes nothing
        let before = train.body.clone();
        assert_eq!(train.try_drop_wagon(&config), None);
        assert_eq!(train.body, before);
    }

    #[test]
    fn test_respawn_countdown() {
        let mut train = Train::new(1, "a", IVec2::new(5, 5), Direction::North);
        train.score = 7;
        train.kill(3);
        assert!(!train.tick_respawn());
        assert!(!train.tick_respawn());
        assert!(train.tick_respawn());
        train.respawn(IVec2::new(8, 8));
        assert!(train.is_alive());
        assert_eq!(train.direction, Direction::East);
        assert_eq!(train.score, 7);
    }

    #[test]
    fn test_deliver_scores_every_wagon() {
        let mut train = Train::new(1, "a", IVec2::new(5, 5), Direction::East);
        train.body.extend([IVec2::new(4, 5), IVec2::new(3, 5), IVec2::new(2, 5)]);
        assert_eq!(train.deliver(), 3);
        assert_eq!(train.score, 3);
        assert!(train.body.is_empty());
    }
}
