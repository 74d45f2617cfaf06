//! Dice Rig - a dice-throw prediction and outcome-rigging engine
//!
//! Before a visible throw finishes, a hidden shadow copy of the physics world
//! runs the same throw to completion. The natural result is read off the
//! shadow dice, a design-mandated outcome is chosen, and the visible dice are
//! then driven through the recorded shadow trajectory with a rotation
//! correction blended into the tumbling motion. The player sees a physical
//! throw; the totals land where the game wants them.
//!
//! Core modules:
//! - `physics`: the rigid-body backend seam (trait) plus a deterministic
//!   reference backend for tests and the demo
//! - `sim`: shadow simulation, trajectory replay, outcome rigging, and the
//!   turn/round state machine
//! - `match_history`: records of finished matches

pub mod match_history;
pub mod physics;
pub mod sim;

pub use match_history::{MatchHistory, MatchRecord};
pub use sim::{DiceGame, Face, GameConfig, GameEvent, GamePhase, Side, TickInput};

/// Engine tuning constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Iteration ceiling for a shadow throw simulation. A throw that has not
    /// settled by now uses its last recorded frame as the resting state. The
    /// whole loop runs inside one tick, so this is also a latency bound.
    pub const MAX_SHADOW_STEPS: usize = 10_000;

    /// Squared-speed threshold below which a body counts as not moving
    /// (applies to both linear and angular speed)
    pub const MOVEMENT_EPSILON: f32 = 0.01;

    /// Longest rotation-correction blend window, in replay frames. Keeps a
    /// slow settle from delaying the correction indefinitely.
    pub const MAX_RIG_RAMP_FRAMES: u32 = 40;

    /// Minimum accumulated movement energy for a die to be eligible for
    /// rigging. A die that barely moved cannot be corrected plausibly.
    pub const MIN_RIG_ENERGY: f32 = 10.0;

    /// Fixed frames between dice release and the shadow simulation kickoff,
    /// letting the real throw clear the thrower's hand
    pub const THROW_SIM_DELAY_TICKS: u32 = 10;

    /// Ticks between consecutive die removals in a destruction sequence
    pub const DESTRUCTION_STAGGER_TICKS: u32 = 30;

    /// Die cube half extent, metres
    pub const DIE_HALF_EXTENT: f32 = 0.5;
}
