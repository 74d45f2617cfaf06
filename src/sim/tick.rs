//! Turn state machine and fixed-timestep driver
//!
//! One [`DiceGame`] owns the real physics world, the shadow world, the replay
//! bridge, the scheduler, and the dice, and advances all of them from a
//! single fixed tick. Per throw the pipeline runs exactly once:
//! release -> (short delay) -> shadow simulation -> rigging -> replay ->
//! settle -> dead-die destruction -> round bookkeeping.

use glam::Vec3;
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::consts::{
    DESTRUCTION_STAGGER_TICKS, DIE_HALF_EXTENT, MOVEMENT_EPSILON, SIM_DT, THROW_SIM_DELAY_TICKS,
};
use crate::physics::{BodyState, PhysicsWorld, Shape, TabletopWorld};
use crate::sim::die::{self, Die, DieId, Side};
use crate::sim::replay::ReplayBridge;
use crate::sim::rigging;
use crate::sim::scheduler::{Action, Scheduler};
use crate::sim::shadow::ShadowWorld;
use crate::sim::state::{GameConfig, GameEvent, GamePhase};

/// A die released by the player's picker, with the velocities it left the
/// hand with
#[derive(Debug, Clone, Copy)]
pub struct ThrowCommand {
    pub die: DieId,
    pub velocity: Vec3,
    pub spin: Vec3,
}

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Start the match from [`GamePhase::WaitingToStart`]
    pub start: bool,
    /// Dice the player releases this tick (their picking phase only)
    pub throw: Vec<ThrowCommand>,
    /// Demo mode: the AI plays the player side too
    pub idle_mode: bool,
}

/// The dice match: state machine plus every collaborator it drives.
/// Collaborators are injected at construction and owned directly; there is
/// no global registry.
pub struct DiceGame<W: PhysicsWorld> {
    config: GameConfig,
    world: W,
    shadow: ShadowWorld<W>,
    replay: ReplayBridge,
    scheduler: Scheduler,
    dice: Vec<Die>,
    phase: GamePhase,
    /// Current round, 1-based once the match starts
    round: u32,
    /// Seconds of sustained stillness in the current throw
    settle_timer: f32,
    /// Dice of the throw being resolved
    thrown: Vec<DieId>,
    pending_destructions: u32,
    rng: Pcg32,
    time_ticks: u64,
    /// Notifications for the embedding layer, drained after each tick
    pub events: Vec<GameEvent>,
}

impl DiceGame<TabletopWorld> {
    /// A ready-to-run match on the reference backend: square table, each
    /// side's dice racked along its own edge.
    pub fn standard(config: GameConfig, seed: u64) -> Self {
        let mut world = TabletopWorld::table(8.0);
        let shape = Shape::Cuboid {
            half_extents: Vec3::splat(DIE_HALF_EXTENT),
        };

        let mut dice = Vec::new();
        for side in [Side::White, Side::Black] {
            for i in 0..config.dice_per_side {
                let offset = i as f32 - (config.dice_per_side as f32 - 1.0) / 2.0;
                let rack_z = match side {
                    Side::White => 6.5,
                    Side::Black => -6.5,
                };
                let position = Vec3::new(offset * 1.5, DIE_HALF_EXTENT, rack_z);
                let body = world.spawn_dynamic(
                    BodyState {
                        position,
                        ..Default::default()
                    },
                    shape,
                );
                let id = DieId(side.index() as u32 * config.dice_per_side + i);
                dice.push(Die::new(id, side, body, position));
            }
        }

        Self::new(config, world, dice, seed)
    }
}

impl<W: PhysicsWorld + Default> DiceGame<W> {
    /// Build a match over an existing world and dice. The shadow world is
    /// created here, mirroring the real world's static geometry.
    pub fn new(config: GameConfig, world: W, dice: Vec<Die>, seed: u64) -> Self {
        let shadow = ShadowWorld::mirroring(&world);
        Self {
            config,
            world,
            shadow,
            replay: ReplayBridge::new(),
            scheduler: Scheduler::new(),
            dice,
            phase: GamePhase::WaitingToStart,
            round: 0,
            settle_timer: 0.0,
            thrown: Vec::new(),
            pending_destructions: 0,
            rng: Pcg32::seed_from_u64(seed),
            time_ticks: 0,
            events: Vec::new(),
        }
    }
}

impl<W: PhysicsWorld> DiceGame<W> {
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Ticks elapsed since construction
    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    /// The side whose turn it currently is, if any
    pub fn side_to_move(&self) -> Option<Side> {
        self.phase.side()
    }

    pub fn dice(&self) -> &[Die] {
        &self.dice
    }

    /// A side's current total, dead and destroyed dice excluded
    pub fn total(&self, side: Side) -> i32 {
        self.dice
            .iter()
            .filter(|d| d.side == side)
            .map(Die::score)
            .sum()
    }

    pub fn totals(&self) -> (i32, i32) {
        (self.total(Side::White), self.total(Side::Black))
    }

    /// Back to the opening state: dice reactivated and racked at their spawn
    /// poses, all scheduled work cancelled.
    pub fn reset(&mut self) {
        self.scheduler.clear();
        self.replay.cancel();
        self.thrown.clear();
        self.pending_destructions = 0;
        self.settle_timer = 0.0;
        self.round = 0;
        for die in &mut self.dice {
            die.active = true;
            die.value = None;
            self.world.set_kinematic(die.body, false);
            self.world.set_body_state(
                die.body,
                BodyState {
                    position: die.spawn_position,
                    rotation: die.spawn_rotation,
                    ..Default::default()
                },
            );
        }
        self.set_phase(GamePhase::WaitingToStart);
    }

    /// Advance the match by one fixed timestep
    pub fn tick(&mut self, input: &TickInput, dt: f32) {
        self.time_ticks += 1;

        for action in self.scheduler.advance() {
            self.run_action(action, dt);
        }

        self.world.step(dt);
        self.replay.tick(&mut self.shadow, &mut self.world, dt);

        match self.phase {
            GamePhase::WaitingToStart => {
                if input.start {
                    self.round = 1;
                    self.set_phase(GamePhase::PickingDice(self.config.first_side));
                }
            }
            GamePhase::PickingDice(side) => self.tick_picking(side, input),
            GamePhase::DiceRolling(side) => self.tick_rolling(side, dt),
            GamePhase::DiceDestruction(_) => {
                // Waiting on scheduled destruction actions
            }
            GamePhase::ThrowSettled(side) => self.resolve_settlement(side),
            GamePhase::GameEnd => {}
        }
    }

    fn tick_picking(&mut self, side: Side, input: &TickInput) {
        if self.active_dice(side).next().is_none() {
            // Nothing left to throw: the side forfeits this throw
            self.set_phase(GamePhase::ThrowSettled(side));
            return;
        }

        let ai_turn = side == Side::Black || input.idle_mode;
        if ai_turn {
            if !self.scheduler.has_pending(|a| matches!(a, Action::AiThrow)) {
                let delay = (self.config.ai_pickup_delay / SIM_DT) as u32;
                self.scheduler.schedule(delay, Action::AiThrow);
            }
            return;
        }

        // Player release: only the mover's own active dice count. An empty
        // or entirely invalid release leaves the phase as it is.
        let commands: Vec<ThrowCommand> = input
            .throw
            .iter()
            .filter(|cmd| {
                self.dice
                    .iter()
                    .any(|d| d.id == cmd.die && d.side == side && d.active)
            })
            .copied()
            .collect();
        if !commands.is_empty() {
            self.begin_throw(side, &commands);
        }
    }

    fn tick_rolling(&mut self, side: Side, dt: f32) {
        // Settle timer: resets while anything is still moving. Motion here
        // means linear and angular speed both above threshold.
        let moving = self.thrown.iter().any(|id| {
            let Some(die) = self.dice.iter().find(|d| d.id == *id) else {
                return false;
            };
            let state = self.world.body_state(die.body);
            state.linvel.length_squared() > MOVEMENT_EPSILON
                && state.angvel.length_squared() > MOVEMENT_EPSILON
        });
        if moving {
            self.settle_timer = 0.0;
        } else {
            self.settle_timer += dt;
        }

        let prediction_pending = self
            .scheduler
            .has_pending(|a| matches!(a, Action::SimulateThrow));
        if self.settle_timer < self.config.settle_duration
            || self.replay.is_replaying()
            || prediction_pending
        {
            return;
        }

        // Throw is down: read the resting faces off the real bodies
        for id in self.thrown.clone() {
            if let Some(die) = self.dice.iter_mut().find(|d| d.id == id) {
                let rotation = self.world.body_state(die.body).rotation;
                die.value = Some(die::face_up(rotation));
            }
        }

        let doomed = doomed_dice(&self.dice, self.round, self.config.first_side);
        self.set_phase(GamePhase::DiceDestruction(side));
        if doomed.is_empty() {
            self.set_phase(GamePhase::ThrowSettled(side));
        } else {
            self.pending_destructions = doomed.len() as u32;
            for (i, die) in doomed.into_iter().enumerate() {
                self.scheduler
                    .schedule(i as u32 * DESTRUCTION_STAGGER_TICKS, Action::DestroyDie(die));
            }
        }
    }

    fn resolve_settlement(&mut self, side: Side) {
        let (white_total, black_total) = self.totals();
        self.events.push(GameEvent::ThrowResolved {
            side,
            white_total,
            black_total,
        });

        let closing_side = self.config.first_side.opponent();
        if side == closing_side {
            if self.round >= self.config.num_rounds {
                self.finish_game();
                return;
            }
            self.round += 1;
            self.set_phase(GamePhase::PickingDice(self.config.first_side));
        } else {
            self.set_phase(GamePhase::PickingDice(side.opponent()));
        }
    }

    fn finish_game(&mut self) {
        let (white, black) = self.totals();
        let winner = match white.cmp(&black) {
            std::cmp::Ordering::Greater => Some(Side::White),
            std::cmp::Ordering::Less => Some(Side::Black),
            std::cmp::Ordering::Equal => None,
        };
        log::info!("match over: white {white}, black {black}, winner {winner:?}");
        self.set_phase(GamePhase::GameEnd);
        self.events.push(GameEvent::GameEnded { winner });
    }

    fn run_action(&mut self, action: Action, dt: f32) {
        match action {
            Action::AiThrow => {
                if let GamePhase::PickingDice(side) = self.phase {
                    let commands = self.ai_throw_commands(side);
                    self.begin_throw(side, &commands);
                }
            }
            Action::SimulateThrow => self.simulate_and_rig(dt),
            Action::DestroyDie(id) => self.destroy_die(id),
        }
    }

    /// Release a batch of dice: position them over the table with their
    /// release velocities and start the rolling phase.
    fn begin_throw(&mut self, side: Side, commands: &[ThrowCommand]) {
        if commands.is_empty() {
            return;
        }

        self.thrown.clear();
        for (i, cmd) in commands.iter().enumerate() {
            let Some(die) = self.dice.iter_mut().find(|d| d.id == cmd.die) else {
                continue;
            };
            die.value = None;
            let origin = throw_origin(side, i);
            self.world.set_kinematic(die.body, false);
            let mut state = self.world.body_state(die.body);
            state.position = origin;
            state.linvel = cmd.velocity;
            state.angvel = cmd.spin;
            self.world.set_body_state(die.body, state);
            self.thrown.push(cmd.die);
        }

        self.settle_timer = 0.0;
        self.scheduler
            .schedule(THROW_SIM_DELAY_TICKS, Action::SimulateThrow);
        self.set_phase(GamePhase::DiceRolling(side));
        self.events.push(GameEvent::DiceThrown {
            side,
            dice: self.thrown.clone(),
        });
    }

    /// The once-per-throw prediction and rigging pass: run the whole throw in
    /// the shadow world, then steer it. The replay bridge takes over from the
    /// next tick.
    fn simulate_and_rig(&mut self, dt: f32) {
        let throw_dice: Vec<Die> = self
            .dice
            .iter()
            .filter(|d| self.thrown.contains(&d.id))
            .cloned()
            .collect();
        if throw_dice.is_empty() {
            return;
        }

        let steps = self.shadow.simulate_throw(&mut self.world, &throw_dice, dt);
        self.replay.begin();
        log::debug!("shadow throw recorded {steps} frames");

        let params = self.config.rig.to_parameters();
        let plan = rigging::rig_throw(&mut self.shadow, &throw_dice, &params);
        for rigged in plan {
            self.events.push(GameEvent::DieRigged {
                die: rigged.die,
                natural: rigged.from,
                rigged: rigged.to,
            });
        }
    }

    fn destroy_die(&mut self, id: DieId) {
        if let Some(die) = self.dice.iter_mut().find(|d| d.id == id && d.active) {
            die.active = false;
            die.value = None;
            // Parked out of play, not despawned; a reset brings it back
            self.world.set_kinematic(die.body, true);
            self.world
                .set_pose(die.body, die.spawn_position - Vec3::Y * 50.0, die.spawn_rotation);
            let side = die.side;
            log::info!("die {} destroyed", die.name);
            self.events.push(GameEvent::DieDestroyed { die: id, side });
        }

        self.pending_destructions = self.pending_destructions.saturating_sub(1);
        if self.pending_destructions == 0 {
            if let GamePhase::DiceDestruction(side) = self.phase {
                self.set_phase(GamePhase::ThrowSettled(side));
            }
        }
    }

    fn active_dice(&self, side: Side) -> impl Iterator<Item = &Die> {
        self.dice
            .iter()
            .filter(move |d| d.side == side && d.active)
    }

    fn ai_throw_commands(&mut self, side: Side) -> Vec<ThrowCommand> {
        let ids: Vec<DieId> = self.active_dice(side).map(|d| d.id).collect();
        let toward_centre = match side {
            Side::White => -1.0,
            Side::Black => 1.0,
        };
        ids.into_iter()
            .map(|die| ThrowCommand {
                die,
                velocity: Vec3::new(
                    self.rng.random_range(-1.0..1.0),
                    self.rng.random_range(0.3..1.2),
                    toward_centre * self.rng.random_range(3.0..5.0),
                ),
                spin: Vec3::new(
                    self.rng.random_range(-8.0..8.0),
                    self.rng.random_range(-8.0..8.0),
                    self.rng.random_range(-8.0..8.0),
                ),
            })
            .collect()
    }

    /// Transition helper: internal bookkeeping is already done by the time
    /// this runs, so observers always see a completed transition.
    fn set_phase(&mut self, to: GamePhase) {
        if self.phase == to {
            return;
        }
        let from = self.phase;
        log::debug!("game state {from:?} -> {to:?}");
        self.phase = to;
        self.events.push(GameEvent::StateChanged { from, to });
    }
}

/// Active dice resting on the dead face, minus the opening side's round-one
/// exemption (the side that throws first cannot lose dice on the very first
/// round, which would be an unwinnable start).
fn doomed_dice(dice: &[Die], round: u32, first_side: Side) -> Vec<DieId> {
    dice.iter()
        .filter(|d| d.active && d.value.map(|f| f.is_dead()).unwrap_or(false))
        .filter(|d| !(round == 1 && d.side == first_side))
        .map(|d| d.id)
        .collect()
}

/// Where a thrown die enters the table from, by throw order
fn throw_origin(side: Side, index: usize) -> Vec3 {
    let edge_z = match side {
        Side::White => 5.0,
        Side::Black => -5.0,
    };
    Vec3::new((index as f32 - 1.0) * 1.2, 1.6, edge_z)
}
