//! Fixed timestep simulation tick
//!
//! Advances a room by one discrete step. Order within a tick:
//! respawns, timers, intents, movement (plan, resolve, commit), pickup,
//! delivery, passenger spawns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::collision::{self, Candidate, DeathCause};
use super::grid::Cell;
use super::state::GameState;
use super::train::{Steer, TrainId};

/// What a controller wants its train to do next tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(default)]
    pub steer: Option<Steer>,
    #[serde(default)]
    pub drop_wagon: bool,
}

impl Intent {
    pub fn steer(steer: Steer) -> Self {
        Self {
            steer: Some(steer),
            drop_wagon: false,
        }
    }
}

/// Something that happened during a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    Died { train: TrainId, cause: DeathCause },
    Respawned { train: TrainId, cell: Cell },
    PickedUp { train: TrainId, cell: Cell },
    Delivered { train: TrainId, count: u32 },
    WagonDropped { train: TrainId, cell: Cell },
    PassengerSpawned { cell: Cell },
}

/// Advance the room by one tick using the latest intent of each train
pub fn tick(state: &mut GameState, intents: &BTreeMap<TrainId, Intent>) -> Vec<GameEvent> {
    let mut events = Vec::new();
    state.time_ticks += 1;

    respawn_trains(state, &mut events);

    // Boost and cooldown run on the clock, dead or alive
    for train in state.trains.iter_mut() {
        train.tick_timers();
    }

    apply_intents(state, intents, &mut events);
    move_trains(state, &mut events);

    if state
        .passengers
        .spawn_due(state.config.passenger_spawn_interval_ticks)
    {
        if let Some(cell) = state.spawn_passenger() {
            events.push(GameEvent::PassengerSpawned { cell });
        }
    }

    state.normalize_order();
    events
}

fn respawn_trains(state: &mut GameState, events: &mut Vec<GameEvent>) {
    let ready: Vec<TrainId> = state
        .trains
        .iter_mut()
        .filter(|t| !t.is_alive())
        .filter_map(|t| t.tick_respawn().then_some(t.id))
        .collect();

    for id in ready {
        // With no free cell the train stays down and retries next tick
        let Some(cell) = state.find_spawn_cell() else {
            log::warn!("No free cell to respawn train {id}");
            continue;
        };
        if let Some(train) = state.train_mut(id) {
            train.respawn(cell);
            events.push(GameEvent::Respawned { train: id, cell });
        }
    }
}

fn apply_intents(
    state: &mut GameState,
    intents: &BTreeMap<TrainId, Intent>,
    events: &mut Vec<GameEvent>,
) {
    for (&id, intent) in intents {
        let config = &state.config;
        let Some(train) = state.trains.iter_mut().find(|t| t.id == id) else {
            continue;
        };
        if let Some(steer) = intent.steer {
            train.steer(steer);
        }
        // A tail on a full stack has nowhere to leave its passenger
        let tail_has_room = train
            .body
            .back()
            .is_some_and(|&tail| state.passengers.has_room(tail));
        if intent.drop_wagon && tail_has_room {
            if let Some(cell) = train.try_drop_wagon(config) {
                state.passengers.deposit(cell, 1);
                events.push(GameEvent::WagonDropped { train: id, cell });
            }
        }
    }
}

fn move_trains(state: &mut GameState, events: &mut Vec<GameEvent>) {
    // Plan
    let mut candidates = Vec::with_capacity(state.trains.len());
    for train in state.trains.iter_mut() {
        let Some(from) = train.head else {
            continue;
        };
        let moving = train.advance_progress(&state.config);
        let to = if moving {
            state.grid.step(from, train.next_direction)
        } else {
            from
        };
        candidates.push(Candidate {
            id: train.id,
            from,
            to,
            moving,
        });
    }

    let deaths = collision::resolve(
        &state.grid,
        &state.trains,
        &candidates,
        state.config.self_collision,
    );

    // Commit
    for candidate in &candidates {
        let id = candidate.id;
        let Some(train) = state.trains.iter_mut().find(|t| t.id == id) else {
            continue;
        };

        if let Some(&cause) = deaths.get(&id) {
            log::debug!("Train {id} ({}) died: {cause:?}", train.nickname);
            train.kill(state.config.respawn_delay_ticks);
            events.push(GameEvent::Died { train: id, cause });
            continue;
        }
        if !candidate.moving {
            continue;
        }

        let released = train.advance_head(candidate.to);
        if state.passengers.take_one(candidate.to) {
            if let Some(cell) = released {
                train.grow(cell);
            }
            events.push(GameEvent::PickedUp {
                train: id,
                cell: candidate.to,
            });
        }

        if train.wagons() == 0 {
            continue;
        }
        let zones = &state.zones;
        let in_zone = zones.contains(candidate.to)
            || (state.config.deliver_from_body && train.body.iter().any(|&c| zones.contains(c)));
        if in_zone {
            let count = train.deliver();
            state.delivered_total += count as u64;
            events.push(GameEvent::Delivered { train: id, count });
        }
    }
}
