//! Trajectory replay with blended rig correction
//!
//! After a throw is simulated ahead of time, the real dice are driven frame
//! by frame through the recorded shadow trajectory. The rig correction is not
//! snapped on at the end: it is slerped in from identity across the die's
//! motion window, so the correction hides inside the natural tumbling. That
//! gradual blend is the whole illusion.

use glam::Quat;

use crate::consts::MAX_RIG_RAMP_FRAMES;
use crate::physics::PhysicsWorld;
use crate::sim::shadow::{Pairing, ShadowWorld};

/// Drives real bodies through recorded shadow samples, one frame per tick,
/// all dice in lockstep
#[derive(Debug, Default)]
pub struct ReplayBridge {
    /// Current replay frame; `None` when not replaying
    frame: Option<u32>,
}

impl ReplayBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start playback from the first recorded frame
    pub fn begin(&mut self) {
        self.frame = Some(0);
    }

    pub fn is_replaying(&self) -> bool {
        self.frame.is_some()
    }

    /// Abandon playback without releasing bodies (game reset path)
    pub fn cancel(&mut self) {
        self.frame = None;
    }

    /// How far the rig correction has ramped in at `frame`: 0 at the start of
    /// the die's motion window, 1 from its last movement frame on. The window
    /// is clamped so a long quiet tail cannot postpone the correction.
    fn blend_factor(pairing: &Pairing, frame: u32) -> f32 {
        let first = pairing.first_movement_frame.unwrap_or(0);
        let last = pairing.last_movement_frame.unwrap_or(first);
        let window = last.saturating_sub(first).clamp(1, MAX_RIG_RAMP_FRAMES);
        let progress = frame.saturating_sub(first) as f32 / window as f32;
        progress.clamp(0.0, 1.0)
    }

    /// Per-tick update: step the shadow world (keeps statics and any in-flight
    /// clones current), then drive every real body that still has recorded
    /// samples. Runs after the real world's own physics step.
    pub fn tick<W: PhysicsWorld>(&mut self, shadow: &mut ShadowWorld<W>, real: &mut W, dt: f32) {
        shadow.step(dt);

        let Some(frame) = self.frame else {
            return;
        };

        let mut any_replayed = false;
        for pairing in shadow.pairings_mut() {
            let index = frame as usize;
            if index >= pairing.positions.len() {
                continue;
            }
            any_replayed = true;

            let blend = Self::blend_factor(pairing, frame);
            let correction = Quat::IDENTITY.slerp(pairing.rotation_adjustment, blend);
            real.set_pose(
                pairing.real_body,
                pairing.positions[index],
                correction * pairing.rotations[index],
            );
        }

        if any_replayed {
            self.frame = Some(frame + 1);
        } else {
            // Playback exhausted: hand the dice back to live physics for any
            // residual settling. Velocities still hold the release-time
            // snapshot, so they are zeroed before the handback.
            for pairing in shadow.pairings_mut() {
                if pairing.positions.is_empty() {
                    continue;
                }
                let mut state = real.body_state(pairing.real_body);
                state.linvel = glam::Vec3::ZERO;
                state.angvel = glam::Vec3::ZERO;
                real.set_body_state(pairing.real_body, state);
                real.set_kinematic(pairing.real_body, false);
            }
            self.frame = None;
            log::debug!("replay complete after {frame} frames");
        }
    }
}
