//! Intent producers
//!
//! Every train is driven by exactly one controller. Network controllers relay
//! what a remote client submitted; the fallback controller computes intents
//! locally and takes over disconnected seats and empty ones.

pub mod fallback;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::room::mailbox::IntentSlot;
use crate::sim::{Intent, TrainId};
use crate::snapshot::Snapshot;

pub use fallback::FallbackController;

/// Who is driving a train, as shown to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    /// Person at a keyboard
    Human,
    /// Remote program
    Agent,
    /// Built-in AI
    Fallback,
}

/// Produces at most one intent per tick from the latest snapshot
pub trait Controller: Send {
    fn kind(&self) -> ControllerKind;

    fn compute_intent(&mut self, snapshot: &Snapshot, train: TrainId) -> Option<Intent>;
}

/// Relays intents a connection task dropped into the seat's mailbox
pub struct NetworkController {
    kind: ControllerKind,
    slot: Arc<IntentSlot>,
}

impl NetworkController {
    pub fn new(kind: ControllerKind, slot: Arc<IntentSlot>) -> Self {
        Self { kind, slot }
    }
}

impl Controller for NetworkController {
    fn kind(&self) -> ControllerKind {
        self.kind
    }

    fn compute_intent(&mut self, _snapshot: &Snapshot, _train: TrainId) -> Option<Intent> {
        self.slot.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Steer;

    #[test]
    fn test_network_controller_takes_latest_once() {
        let slot = Arc::new(IntentSlot::default());
        let mut controller = NetworkController::new(ControllerKind::Agent, slot.clone());
        let snapshot: Snapshot = serde_json::from_str(
            r#"{"tick":0,"grid":{"width":5,"height":5,"cell_size":20},"trains":[],
                "passengers":[],"zones":[],"best_scores":[],"remaining_ticks":0}"#,
        )
        .unwrap();

        slot.submit(Intent::steer(Steer::Left));
        slot.submit(Intent::steer(Steer::Right));
        assert_eq!(
            controller.compute_intent(&snapshot, 1),
            Some(Intent::steer(Steer::Right))
        );
        assert_eq!(controller.compute_intent(&snapshot, 1), None);
        assert_eq!(controller.kind(), ControllerKind::Agent);
    }
}
