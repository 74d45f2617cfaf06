//! Deterministic tabletop physics backend
//!
//! A minimal rigid-body world for dice on a table: ballistic integration,
//! damping, floor and wall response with restitution, and low-energy rest
//! snapping so every throw settles in finite time. Dice are approximated by
//! their inscribed sphere for contact; orientation integrates torque-free.
//!
//! This is deliberately not a general physics engine - no broadphase, no
//! contact solver, no body-vs-body collision. It exists so the engine has a
//! deterministic step function to consume without an external dependency.

use glam::{Quat, Vec3};

use super::{BodyHandle, BodyState, ColliderDesc, PhysicsWorld, Shape};
use crate::consts::MOVEMENT_EPSILON;

/// Energy lost on every bounce (ratio of speed kept)
const RESTITUTION: f32 = 0.45;
/// Tangential speed kept on floor contact
const FRICTION_KEEP: f32 = 0.92;
/// Spin kept on floor contact
const SPIN_KEEP: f32 = 0.8;
/// Vertical speed below which a bounce becomes resting contact
const BOUNCE_MIN_SPEED: f32 = 0.5;

#[derive(Debug, Clone)]
struct Body {
    state: BodyState,
    shape: Shape,
    kinematic: bool,
}

/// Deterministic reference implementation of [`PhysicsWorld`]
#[derive(Debug, Clone)]
pub struct TabletopWorld {
    gravity: Vec3,
    bodies: Vec<Body>,
    statics: Vec<ColliderDesc>,
}

impl Default for TabletopWorld {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            bodies: Vec::new(),
            statics: Vec::new(),
        }
    }
}

impl TabletopWorld {
    /// Empty world with default gravity
    pub fn new() -> Self {
        Self::default()
    }

    /// A square table: floor at y = 0 and four walls `half_size` out from the
    /// centre
    pub fn table(half_size: f32) -> Self {
        let mut world = Self::new();
        world.add_static(ColliderDesc {
            shape: Shape::Floor { y: 0.0 },
            position: Vec3::ZERO,
        });
        let across_x = Vec3::new(0.2, 2.0, half_size);
        let across_z = Vec3::new(half_size, 2.0, 0.2);
        for (dir, half_extents) in [
            (Vec3::X, across_x),
            (Vec3::NEG_X, across_x),
            (Vec3::Z, across_z),
            (Vec3::NEG_Z, across_z),
        ] {
            world.add_static(ColliderDesc {
                shape: Shape::Cuboid { half_extents },
                position: dir * half_size + Vec3::new(0.0, 2.0, 0.0),
            });
        }
        world
    }

    fn body(&self, handle: BodyHandle) -> &Body {
        &self.bodies[handle.0 as usize]
    }

    fn body_mut(&mut self, handle: BodyHandle) -> &mut Body {
        &mut self.bodies[handle.0 as usize]
    }

    /// Contact radius: the inscribed sphere of the body's shape
    fn contact_radius(shape: Shape) -> f32 {
        match shape {
            Shape::Cuboid { half_extents } => half_extents.min_element(),
            Shape::Floor { .. } => 0.0,
        }
    }

    fn resolve_contacts(state: &mut BodyState, radius: f32, statics: &[ColliderDesc]) {
        for collider in statics {
            match collider.shape {
                Shape::Floor { y } => {
                    let floor = y + radius;
                    if state.position.y < floor {
                        state.position.y = floor;
                        if state.linvel.y < -BOUNCE_MIN_SPEED {
                            state.linvel.y = -state.linvel.y * RESTITUTION;
                        } else if state.linvel.y < 0.0 {
                            state.linvel.y = 0.0;
                        }
                        state.linvel.x *= FRICTION_KEEP;
                        state.linvel.z *= FRICTION_KEEP;
                        state.angvel *= SPIN_KEEP;
                    }
                }
                Shape::Cuboid { half_extents } => {
                    let rel = state.position - collider.position;
                    let closest = rel.clamp(-half_extents, half_extents);
                    let delta = rel - closest;
                    let dist_sq = delta.length_squared();
                    let (normal, depth) = if dist_sq >= radius * radius {
                        continue;
                    } else if dist_sq > 0.0 {
                        let dist = dist_sq.sqrt();
                        (delta / dist, radius - dist)
                    } else {
                        // Centre inside the box (fast body): push out along
                        // the least-penetrated axis
                        let pen = half_extents - rel.abs() + Vec3::splat(radius);
                        let axis = if pen.x <= pen.y && pen.x <= pen.z {
                            Vec3::X * rel.x.signum()
                        } else if pen.y <= pen.z {
                            Vec3::Y * rel.y.signum()
                        } else {
                            Vec3::Z * rel.z.signum()
                        };
                        (axis, pen.min_element())
                    };
                    state.position += normal * depth;
                    let approach = state.linvel.dot(normal);
                    if approach < 0.0 {
                        state.linvel -= normal * approach * (1.0 + RESTITUTION);
                        state.angvel *= SPIN_KEEP;
                    }
                }
            }
        }
    }
}

impl PhysicsWorld for TabletopWorld {
    fn step(&mut self, dt: f32) {
        let statics = std::mem::take(&mut self.statics);
        for body in &mut self.bodies {
            if body.kinematic {
                continue;
            }
            let radius = Self::contact_radius(body.shape);
            let state = &mut body.state;

            state.linvel += self.gravity * dt;
            state.linvel /= 1.0 + state.linear_damping * dt;
            state.angvel /= 1.0 + state.angular_damping * dt;

            state.position += state.linvel * dt;
            state.rotation = (Quat::from_scaled_axis(state.angvel * dt) * state.rotation)
                .normalize();

            Self::resolve_contacts(state, radius, &statics);

            // Rest snap: a nearly still, supported body stops completely so
            // settle detection terminates.
            let supported = statics.iter().any(|c| match c.shape {
                Shape::Floor { y } => state.position.y <= y + radius + 1e-4,
                _ => false,
            });
            if supported && state.movement() < MOVEMENT_EPSILON {
                state.linvel = Vec3::ZERO;
                state.angvel = Vec3::ZERO;
            }
        }
        self.statics = statics;
    }

    fn spawn_dynamic(&mut self, state: BodyState, shape: Shape) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len() as u32);
        self.bodies.push(Body {
            state,
            shape,
            kinematic: false,
        });
        handle
    }

    fn add_static(&mut self, collider: ColliderDesc) {
        self.statics.push(collider);
    }

    fn static_colliders(&self) -> Vec<ColliderDesc> {
        self.statics.clone()
    }

    fn body_state(&self, body: BodyHandle) -> BodyState {
        self.body(body).state
    }

    fn set_body_state(&mut self, body: BodyHandle, state: BodyState) {
        self.body_mut(body).state = state;
    }

    fn body_shape(&self, body: BodyHandle) -> Shape {
        self.body(body).shape
    }

    fn set_kinematic(&mut self, body: BodyHandle, kinematic: bool) {
        self.body_mut(body).kinematic = kinematic;
    }

    fn is_kinematic(&self, body: BodyHandle) -> bool {
        self.body(body).kinematic
    }

    fn set_pose(&mut self, body: BodyHandle, position: Vec3, rotation: Quat) {
        let body = self.body_mut(body);
        body.state.position = position;
        body.state.rotation = rotation;
    }
}
