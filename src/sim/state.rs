//! Game phases, events, and configuration

use serde::{Deserialize, Serialize};

use crate::sim::die::{DieId, Face, Side};
use crate::sim::rigging::RigParameters;

/// Phase of the dice match
///
/// Side-specific phases carry the side as data rather than duplicating
/// variants per colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Nothing has happened yet; waiting for the match to start
    WaitingToStart,
    /// A side is choosing and picking up its dice
    PickingDice(Side),
    /// Dice are in the air or tumbling (prediction and replay happen here)
    DiceRolling(Side),
    /// Dead-face dice are being removed, one at a time
    DiceDestruction(Side),
    /// The throw is resolved; round bookkeeping runs here
    ThrowSettled(Side),
    /// Match over
    GameEnd,
}

impl GamePhase {
    /// The side whose turn this phase belongs to, if any
    pub fn side(&self) -> Option<Side> {
        match self {
            GamePhase::PickingDice(side)
            | GamePhase::DiceRolling(side)
            | GamePhase::DiceDestruction(side)
            | GamePhase::ThrowSettled(side) => Some(*side),
            GamePhase::WaitingToStart | GamePhase::GameEnd => None,
        }
    }
}

/// Notifications drained by the embedding layer (UI, audio, scripting) after
/// each tick. Internal phase handling always runs before the corresponding
/// event is pushed, so observers see completed transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Fired on every phase transition
    StateChanged { from: GamePhase, to: GamePhase },
    /// A side released its dice
    DiceThrown { side: Side, dice: Vec<DieId> },
    /// A die's outcome was steered away from its natural prediction
    DieRigged {
        die: DieId,
        natural: Option<Face>,
        rigged: Face,
    },
    /// A dead-face die left play
    DieDestroyed { die: DieId, side: Side },
    /// A throw fully resolved with these totals
    ThrowResolved { side: Side, white_total: i32, black_total: i32 },
    /// Match over; `None` is a draw
    GameEnded { winner: Option<Side> },
}

/// Score-policy tuning: the bounds rigging steers each throw into.
/// A fresh [`RigParameters`] is built from this for every throw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigTuning {
    /// Allowed white-minus-black differential
    pub min_score_delta: i32,
    pub max_score_delta: i32,
    /// Allowed total per side
    pub min_side_total: i32,
    pub max_side_total: i32,
}

impl Default for RigTuning {
    fn default() -> Self {
        // Keeps a three-dice match tense: neither side runs away, neither
        // side collapses
        Self {
            min_score_delta: -5,
            max_score_delta: 5,
            min_side_total: 3,
            max_side_total: 15,
        }
    }
}

impl RigTuning {
    pub fn to_parameters(self) -> RigParameters {
        RigParameters {
            min_score_delta: self.min_score_delta,
            max_score_delta: self.max_score_delta,
            min_side_total: [self.min_side_total; 2],
            max_side_total: [self.max_side_total; 2],
        }
    }
}

/// Match configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Rounds in a match (one round = both sides throw)
    pub num_rounds: u32,
    /// Dice each side starts with
    pub dice_per_side: u32,
    /// Seconds of sustained stillness before a throw counts as settled
    pub settle_duration: f32,
    /// Seconds the AI pretends to think before picking up its dice
    pub ai_pickup_delay: f32,
    /// The side that throws first (and is exempt from round-one destruction)
    pub first_side: Side,
    pub rig: RigTuning,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            num_rounds: 3,
            dice_per_side: 3,
            settle_duration: 0.4,
            ai_pickup_delay: 0.8,
            first_side: Side::White,
            rig: RigTuning::default(),
        }
    }
}

impl GameConfig {
    /// Parse a config from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_side() {
        assert_eq!(GamePhase::PickingDice(Side::Black).side(), Some(Side::Black));
        assert_eq!(GamePhase::DiceRolling(Side::White).side(), Some(Side::White));
        assert_eq!(GamePhase::WaitingToStart.side(), None);
        assert_eq!(GamePhase::GameEnd.side(), None);
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = GameConfig {
            num_rounds: 5,
            ..Default::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(GameConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_rig_tuning_expands_to_both_sides() {
        let params = RigTuning::default().to_parameters();
        assert_eq!(params.min_side_total[0], params.min_side_total[1]);
        assert_eq!(params.max_side_total[0], params.max_side_total[1]);
        assert!(params.min_score_delta <= params.max_score_delta);
    }
}
