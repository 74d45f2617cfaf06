//! Dice: faces, sides, and orientation math
//!
//! A die is a plain entity: identity, owning side, physics body, current
//! value. The interesting part is the fixed face-to-orientation mapping and
//! [`required_rotation_to_value`], the pure function the rigging pipeline
//! uses to steer a replayed die onto a chosen face.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::physics::BodyHandle;

/// The two competing sides. White throws first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opponent(&self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    /// Stable index for per-side tables
    pub fn index(&self) -> usize {
        match self {
            Side::White => 0,
            Side::Black => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Side::White => "white",
            Side::Black => "black",
        }
    }
}

/// A die face, 1 through 6
///
/// Face 1 is the designated dead face: it scores nothing and a die resting on
/// it is removed from play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Face(u8);

/// The face that kills a die
pub const DEAD_FACE: Face = Face(1);

impl Face {
    /// Build a face from a raw value, clamping into 1..=6. Values at or below
    /// the dead value collapse onto the dead face.
    pub fn clamped(value: i32) -> Face {
        Face(value.clamp(1, 6) as u8)
    }

    pub fn new(value: u8) -> Option<Face> {
        (1..=6).contains(&value).then_some(Face(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_dead(&self) -> bool {
        *self == DEAD_FACE
    }

    /// Scoring contribution: the face value, except the dead face scores zero
    pub fn score(&self) -> i32 {
        if self.is_dead() { 0 } else { i32::from(self.0) }
    }

    /// All six faces, ascending
    pub fn all() -> impl Iterator<Item = Face> {
        (1..=6).map(Face)
    }
}

/// Local "up" normal for each face, standard western layout: opposite faces
/// sum to seven.
const FACE_NORMALS: [(Face, Vec3); 6] = [
    (Face(1), Vec3::Y),
    (Face(2), Vec3::Z),
    (Face(3), Vec3::X),
    (Face(4), Vec3::NEG_X),
    (Face(5), Vec3::NEG_Z),
    (Face(6), Vec3::NEG_Y),
];

/// Local face normal for a face
fn face_normal(face: Face) -> Vec3 {
    FACE_NORMALS
        .iter()
        .find(|(f, _)| *f == face)
        .map(|(_, n)| *n)
        .unwrap_or(Vec3::Y)
}

/// The face pointing up for a die in the given orientation: the face whose
/// rotated normal is most aligned with world up.
pub fn face_up(rotation: Quat) -> Face {
    let mut best = Face(1);
    let mut best_dot = f32::MIN;
    for (face, normal) in FACE_NORMALS {
        let dot = (rotation * normal).dot(Vec3::Y);
        if dot > best_dot {
            best_dot = dot;
            best = face;
        }
    }
    best
}

/// The world-space rotation that, composed onto `rotation`, brings
/// `target`'s face normal to world up.
///
/// Pure: a function of the fixed face mapping only. The shortest-arc rotation
/// is used, so the die's yaw is preserved as far as the correction allows.
/// Callers compose the result with the orientation it was computed from:
/// `corrected = required * rotation`.
pub fn required_rotation_to_value(rotation: Quat, target: Face) -> Quat {
    let world_normal = (rotation * face_normal(target)).normalize();
    Quat::from_rotation_arc(world_normal, Vec3::Y)
}

/// Stable die identity, usable as an arena index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DieId(pub u32);

/// A visible die
#[derive(Debug, Clone)]
pub struct Die {
    pub id: DieId,
    /// Display name for logs and UI ("white-1"); identity is `id`
    pub name: String,
    pub side: Side,
    /// Body in the real physics world
    pub body: BodyHandle,
    /// Face currently up; `None` for a die that has been destroyed (or has
    /// not settled yet this game)
    pub value: Option<Face>,
    /// Dead dice are deactivated, never dropped; a reset reactivates them
    pub active: bool,
    pub spawn_position: Vec3,
    pub spawn_rotation: Quat,
}

impl Die {
    pub fn new(id: DieId, side: Side, body: BodyHandle, spawn_position: Vec3) -> Self {
        Self {
            id,
            name: format!("{}-{}", side.name(), id.0),
            side,
            body,
            value: None,
            active: true,
            spawn_position,
            spawn_rotation: Quat::IDENTITY,
        }
    }

    /// Scoring contribution of this die (zero when destroyed or unsettled)
    pub fn score(&self) -> i32 {
        match (self.active, self.value) {
            (true, Some(face)) => face.score(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identity_orientation_shows_one() {
        assert_eq!(face_up(Quat::IDENTITY), Face(1));
    }

    #[test]
    fn test_opposite_faces_sum_to_seven() {
        for (face, normal) in FACE_NORMALS {
            let opposite = FACE_NORMALS
                .iter()
                .find(|(_, n)| *n == -normal)
                .map(|(f, _)| *f)
                .unwrap();
            assert_eq!(face.value() + opposite.value(), 7);
        }
    }

    #[test]
    fn test_required_rotation_round_trip_all_faces() {
        let start = Quat::from_euler(glam::EulerRot::XYZ, 0.4, 1.3, -0.7);
        for target in Face::all() {
            let correction = required_rotation_to_value(start, target);
            assert_eq!(face_up(correction * start), target);
        }
    }

    #[test]
    fn test_required_rotation_is_identity_when_face_already_up() {
        let correction = required_rotation_to_value(Quat::IDENTITY, Face(1));
        assert!(correction.angle_between(Quat::IDENTITY) < 1e-5);
    }

    #[test]
    fn test_dead_face_scoring() {
        assert_eq!(DEAD_FACE.score(), 0);
        assert_eq!(Face::clamped(0), DEAD_FACE);
        assert_eq!(Face::clamped(-3), DEAD_FACE);
        assert_eq!(Face::clamped(9), Face(6));
        assert_eq!(Face::clamped(4).score(), 4);
    }

    #[test]
    fn test_destroyed_die_scores_zero() {
        let mut die = Die::new(DieId(0), Side::White, crate::physics::BodyHandle(0), Vec3::ZERO);
        die.value = Some(Face(5));
        assert_eq!(die.score(), 5);
        die.active = false;
        assert_eq!(die.score(), 0);
    }

    proptest! {
        #[test]
        fn prop_face_round_trip(
            yaw in 0.0f32..std::f32::consts::TAU,
            pitch in -1.5f32..1.5,
            roll in 0.0f32..std::f32::consts::TAU,
            face in 1u8..=6,
        ) {
            let start = Quat::from_euler(glam::EulerRot::YXZ, yaw, pitch, roll);
            let target = Face::new(face).unwrap();
            let correction = required_rotation_to_value(start, target);
            prop_assert_eq!(face_up(correction * start), target);
        }
    }
}
