//! Rigid-body backend seam
//!
//! The engine never talks to a physics library directly. Everything it needs
//! from one fits through [`PhysicsWorld`]: a deterministic fixed step,
//! per-body kinematic state read/write, a kinematic toggle for scripted
//! driving, and enough collider information to clone a world's static
//! geometry into a second, invisible world.
//!
//! [`tabletop::TabletopWorld`] is the deterministic reference implementation
//! used by the demo binary and the test suite.

pub mod tabletop;

pub use tabletop::TabletopWorld;

use glam::{Quat, Vec3};

/// Stable handle to a rigid body inside a [`PhysicsWorld`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub u32);

/// Collider shapes the engine knows how to clone
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Axis-aligned box, given as half extents
    Cuboid { half_extents: Vec3 },
    /// Infinite horizontal floor at a given height
    Floor { y: f32 },
}

/// A static collider, as enumerated for shadow-world cloning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderDesc {
    pub shape: Shape,
    pub position: Vec3,
}

/// Full kinematic state of a body, as copied between worlds
///
/// Drag and mass ride along so a cloned body responds to forces exactly like
/// its source; a prediction is only as good as its starting conditions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: Vec3,
    pub rotation: Quat,
    pub linvel: Vec3,
    pub angvel: Vec3,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub mass: f32,
}

impl Default for BodyState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            linvel: Vec3::ZERO,
            angvel: Vec3::ZERO,
            linear_damping: 0.05,
            angular_damping: 0.05,
            mass: 1.0,
        }
    }
}

impl BodyState {
    /// Squared linear plus squared angular speed
    pub fn movement(&self) -> f32 {
        self.linvel.length_squared() + self.angvel.length_squared()
    }
}

/// A deterministic rigid-body world
///
/// Implementations must be deterministic: stepping two worlds with identical
/// bodies and identical inputs must produce identical states. The whole
/// prediction scheme rests on that.
pub trait PhysicsWorld {
    /// Advance the world by a fixed timestep
    fn step(&mut self, dt: f32);

    /// Spawn a dynamic body with the given state and collision shape
    fn spawn_dynamic(&mut self, state: BodyState, shape: Shape) -> BodyHandle;

    /// Add a static collider
    fn add_static(&mut self, collider: ColliderDesc);

    /// Enumerate static colliders, for cloning into another world
    fn static_colliders(&self) -> Vec<ColliderDesc>;

    /// Read a body's full kinematic state
    fn body_state(&self, body: BodyHandle) -> BodyState;

    /// Overwrite a body's full kinematic state
    fn set_body_state(&mut self, body: BodyHandle, state: BodyState);

    /// The collision shape a body was spawned with
    fn body_shape(&self, body: BodyHandle) -> Shape;

    /// Toggle kinematic mode. A kinematic body ignores forces and integration
    /// and moves only through [`PhysicsWorld::set_pose`].
    fn set_kinematic(&mut self, body: BodyHandle, kinematic: bool);

    /// Whether a body is currently kinematic
    fn is_kinematic(&self, body: BodyHandle) -> bool;

    /// Drive a body to a pose directly (scripted motion)
    fn set_pose(&mut self, body: BodyHandle, position: Vec3, rotation: Quat);
}
