//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by die ID)
//! - No rendering or platform dependencies
//!
//! The shadow/replay split is the heart of the crate: `shadow` predicts a
//! throw before it visibly lands, `rigging` decides how the outcome should
//! differ, and `replay` drives the visible dice through the doctored
//! recording.

pub mod die;
pub mod replay;
pub mod rigging;
pub mod scheduler;
pub mod shadow;
pub mod state;
pub mod tick;

pub use die::{face_up, required_rotation_to_value, Die, DieId, Face, Side, DEAD_FACE};
pub use replay::ReplayBridge;
pub use rigging::{plan_rig, DieMeta, RigParameters, Rigged};
pub use scheduler::{Action, Scheduler};
pub use shadow::{Pairing, ShadowWorld};
pub use state::{GameConfig, GameEvent, GamePhase, RigTuning};
pub use tick::{DiceGame, ThrowCommand, TickInput};
