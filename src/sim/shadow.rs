//! Shadow world: hidden throw prediction
//!
//! A second, invisible physics world mirrors the real one: static geometry is
//! cloned once at construction, dice are cloned lazily the first time they
//! are thrown. [`ShadowWorld::simulate_throw`] copies the real dice's exact
//! kinematic state onto their clones, runs the shadow world to collective
//! rest inside a single call, and records every frame. The recording is what
//! the replay bridge later plays back onto the real dice.

use glam::{Quat, Vec3};

use crate::consts::{MAX_SHADOW_STEPS, MOVEMENT_EPSILON};
use crate::physics::{BodyHandle, PhysicsWorld};
use crate::sim::die::{self, Die, DieId, Face};

/// Linkage between a real die and its shadow clone, plus the recording of
/// the most recent throw.
///
/// Owned exclusively by [`ShadowWorld`]; everything else reads it through
/// queries. Created the first time a die is thrown and reused afterward,
/// with per-throw fields cleared at the start of each new throw.
#[derive(Debug, Clone)]
pub struct Pairing {
    pub die: DieId,
    pub real_body: BodyHandle,
    pub shadow_body: BodyHandle,
    /// Recorded clone positions, one per shadow step
    pub positions: Vec<Vec3>,
    /// Recorded clone orientations, one per shadow step
    pub rotations: Vec<Quat>,
    /// First frame in which the clone moved faster than the epsilon
    pub first_movement_frame: Option<u32>,
    /// Last frame in which the clone moved faster than the epsilon
    pub last_movement_frame: Option<u32>,
    /// Accumulated squared linear + angular speed over the throw
    pub movement_energy: f32,
    /// Rotation correction to blend in during replay; identity = unrigged
    pub rotation_adjustment: Quat,
}

impl Pairing {
    fn new(die: DieId, real_body: BodyHandle, shadow_body: BodyHandle) -> Self {
        Self {
            die,
            real_body,
            shadow_body,
            positions: Vec::new(),
            rotations: Vec::new(),
            first_movement_frame: None,
            last_movement_frame: None,
            movement_energy: 0.0,
            rotation_adjustment: Quat::IDENTITY,
        }
    }

    /// Clear everything belonging to a single throw. Stale samples from a
    /// previous throw must never leak into a new one.
    fn clear_throw_data(&mut self) {
        self.positions.clear();
        self.rotations.clear();
        self.first_movement_frame = None;
        self.last_movement_frame = None;
        self.movement_energy = 0.0;
        self.rotation_adjustment = Quat::IDENTITY;
    }

    /// The clone's resting orientation: the last recorded frame (which is the
    /// settled pose, or the ceiling frame for a throw that never settled)
    pub fn resting_rotation(&self) -> Option<Quat> {
        self.rotations.last().copied()
    }

    /// Number of recorded frames
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Owner of the invisible prediction world and all die pairings
pub struct ShadowWorld<W: PhysicsWorld> {
    world: W,
    pairings: Vec<Pairing>,
}

impl<W: PhysicsWorld + Default> ShadowWorld<W> {
    /// Build a shadow world mirroring the real world's static geometry.
    /// Done once; dice clones are added lazily per throw.
    pub fn mirroring(real: &W) -> Self {
        let mut world = W::default();
        for collider in real.static_colliders() {
            world.add_static(collider);
        }
        Self {
            world,
            pairings: Vec::new(),
        }
    }
}

impl<W: PhysicsWorld> ShadowWorld<W> {
    /// Advance the shadow world by one tick (continuous background stepping)
    pub fn step(&mut self, dt: f32) {
        self.world.step(dt);
    }

    fn pairing(&self, die: DieId) -> Option<&Pairing> {
        self.pairings.iter().find(|p| p.die == die)
    }

    fn find_or_create_pairing(&mut self, real: &W, die: &Die) -> usize {
        if let Some(index) = self.pairings.iter().position(|p| p.die == die.id) {
            return index;
        }
        // First throw for this die: clone it into the shadow world. The clone
        // is physics-only; there is nothing visual to strip here.
        let shadow_body = self
            .world
            .spawn_dynamic(real.body_state(die.body), real.body_shape(die.body));
        self.pairings
            .push(Pairing::new(die.id, die.body, shadow_body));
        self.pairings.len() - 1
    }

    /// Run the entire throw to rest in the shadow world, recording every
    /// frame, then take kinematic control of the real dice so the recording
    /// can be played back onto them.
    ///
    /// Returns the number of shadow steps executed. Rig corrections are reset
    /// to identity; deciding them is a separate, later step.
    pub fn simulate_throw(&mut self, real: &mut W, dice: &[Die], dt: f32) -> usize {
        for pairing in &mut self.pairings {
            pairing.clear_throw_data();
        }

        let mut simulated: Vec<usize> = Vec::with_capacity(dice.len());
        for die in dice {
            let index = self.find_or_create_pairing(real, die);
            let pairing = &self.pairings[index];
            // Start the prediction from the real throw's exact conditions
            self.world
                .set_body_state(pairing.shadow_body, real.body_state(pairing.real_body));
            self.world.set_kinematic(pairing.shadow_body, false);
            simulated.push(index);
        }

        let mut steps = 0;
        let mut settled = false;
        for frame in 0..MAX_SHADOW_STEPS {
            self.world.step(dt);
            steps = frame + 1;

            let mut any_moving = false;
            for &index in &simulated {
                let pairing = &mut self.pairings[index];
                let state = self.world.body_state(pairing.shadow_body);
                pairing.positions.push(state.position);
                pairing.rotations.push(state.rotation);

                let movement = state.movement();
                if movement > MOVEMENT_EPSILON {
                    any_moving = true;
                    pairing.last_movement_frame = Some(frame as u32);
                    if pairing.first_movement_frame.is_none() {
                        pairing.first_movement_frame = Some(frame as u32);
                    }
                    pairing.movement_energy += movement;
                }
            }

            // Settling is detected collectively so every recording in the
            // batch has the same length.
            if !any_moving {
                settled = true;
                break;
            }
        }

        if !settled && !simulated.is_empty() {
            // Tolerated: the last recorded frame stands in for the rest pose
            log::warn!("shadow throw hit step ceiling without settling");
        }

        for &index in &simulated {
            let pairing = &mut self.pairings[index];
            real.set_kinematic(pairing.real_body, true);
            pairing.rotation_adjustment = Quat::IDENTITY;
        }

        steps
    }

    /// Predicted resting face for a die, from its clone's final orientation.
    /// `None` for a die with no recorded throw.
    pub fn predicted_value(&self, die: DieId) -> Option<Face> {
        self.pairing(die)
            .and_then(Pairing::resting_rotation)
            .map(die::face_up)
    }

    /// Total movement energy recorded for a die's last throw; zero for a die
    /// with no recorded throw.
    pub fn movement_energy(&self, die: DieId) -> f32 {
        self.pairing(die).map_or(0.0, |p| p.movement_energy)
    }

    /// Store the rotation correction that steers this die's replayed final
    /// orientation onto `target`. Recorded samples are untouched; the
    /// correction is blended in at replay time.
    pub fn rig_die_result(&mut self, die: DieId, target: Face) {
        let Some(pairing) = self.pairings.iter_mut().find(|p| p.die == die) else {
            return;
        };
        let Some(resting) = pairing.rotations.last().copied() else {
            return;
        };
        pairing.rotation_adjustment = die::required_rotation_to_value(resting, target);
    }

    /// All pairings, for the replay bridge
    pub(crate) fn pairings_mut(&mut self) -> &mut [Pairing] {
        &mut self.pairings
    }

    #[cfg(test)]
    pub(crate) fn pairings(&self) -> &[Pairing] {
        &self.pairings
    }
}
