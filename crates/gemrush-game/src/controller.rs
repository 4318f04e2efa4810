//! The simulation core. Owns the physics world, the entity registry,
//! the phase machine, and the per-tick rules: wave spawning, combat,
//! input application, and collision response.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use gemrush_core::TILE_SIZE;
use gemrush_core::controls::Controls;
use gemrush_core::level::LevelDef;
use gemrush_core::net::messages::{BombSnapshot, DiamondSnapshot, PlayerSnapshot};
use gemrush_core::phase::{GamePhase, PhaseListener, PhaseMachine};
use gemrush_core::player::PLAYER_SLOTS;

use crate::entity::{
    ATTACK_WINDOW_MS, Bomb, Diamond, Entity, EntityId, PLAYER_HALF_EXTENT, Player,
};
use crate::level::build_level;
use crate::physics::{ColliderRole, ContactEvent, ContactSide, PhysicsWorld};

/// Horizontal run speed in px/s.
pub const RUN_SPEED: f32 = 166.0;
/// Jump impulse in px/s (upward, so applied negative).
pub const JUMP_SPEED: f32 = 300.0;
/// Diamonds spawned per wave.
pub const DIAMONDS_PER_WAVE: u32 = 15;
/// Delay between the last death and the match ending.
pub const GAME_OVER_GRACE_MS: f32 = 3000.0;
/// Initial bomb speed on each axis.
pub const BOMB_LAUNCH_SPEED: f32 = 150.0;

/// Spawn height above the ground: slightly airborne, so the first tick
/// produces a fresh ground-contact event even after a position reset.
const SPAWN_HEIGHT_TILES: f32 = 1.75;

#[derive(Debug)]
pub enum GameError {
    InvalidPlayerCount(usize),
}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPlayerCount(n) => {
                write!(f, "invalid player count {n} (supported: 1..={})", PLAYER_SLOTS.len())
            },
        }
    }
}

impl std::error::Error for GameError {}

/// Authoritative match simulation. One instance per match; rooms own
/// exactly one and drive it from a single tick task.
pub struct GameController {
    phase: PhaseMachine,
    world: PhysicsWorld,
    entities: HashMap<EntityId, Entity>,
    next_entity_id: u64,
    /// Registered players in slot order.
    players: Vec<EntityId>,
    /// Latest control command per slot; applied at the next tick.
    controls: Vec<Controls>,
    level_def: LevelDef,
    expected_players: usize,
    active_diamonds: u32,
    level: u32,
    game_over_countdown_ms: f32,
    start_requested: bool,
    rng: StdRng,
    contact_buf: Vec<ContactEvent>,
}

impl GameController {
    /// Create a controller for an arena of the given size. The player
    /// count is validated here; a bad count never produces a match.
    pub fn new(width: f32, height: f32, expected_players: usize) -> Result<Self, GameError> {
        Self::with_rng(width, height, expected_players, StdRng::from_os_rng())
    }

    /// Seeded variant for reproducible simulations.
    pub fn with_seed(
        width: f32,
        height: f32,
        expected_players: usize,
        seed: u64,
    ) -> Result<Self, GameError> {
        Self::with_rng(width, height, expected_players, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        width: f32,
        height: f32,
        expected_players: usize,
        rng: StdRng,
    ) -> Result<Self, GameError> {
        if expected_players == 0 || expected_players > PLAYER_SLOTS.len() {
            return Err(GameError::InvalidPlayerCount(expected_players));
        }

        let mut controller = Self {
            phase: PhaseMachine::new(),
            world: PhysicsWorld::new(),
            entities: HashMap::new(),
            next_entity_id: 0,
            players: Vec::new(),
            controls: Vec::new(),
            level_def: LevelDef::standard(width, height),
            expected_players,
            active_diamonds: 0,
            level: 0,
            game_over_countdown_ms: 0.0,
            start_requested: false,
            rng,
            contact_buf: Vec::new(),
        };

        let mut counter = controller.next_entity_id;
        let platforms = build_level(&mut controller.world, &controller.level_def, &mut || {
            counter += 1;
            EntityId(counter)
        });
        controller.next_entity_id = counter;
        for (id, platform) in platforms {
            controller.entities.insert(id, Entity::Platform(platform));
        }

        Ok(controller)
    }

    fn alloc_entity_id(&mut self) -> EntityId {
        self.next_entity_id += 1;
        EntityId(self.next_entity_id)
    }

    /// Register the next player slot. Returns the assigned slot, or
    /// `None` once the configured count is reached (speculative double
    /// registration is capped, not fatal). Reaching the expected count
    /// moves the match from Waiting to Ready.
    pub fn register_player(&mut self) -> Option<u8> {
        if self.players.len() >= self.expected_players {
            tracing::warn!(
                expected = self.expected_players,
                "Registration ignored: match is full"
            );
            return None;
        }
        let slot = self.players.len();
        let config = &PLAYER_SLOTS[slot];
        let id = self.alloc_entity_id();
        let y = self.level_def.height - SPAWN_HEIGHT_TILES * TILE_SIZE;
        let player = Player::spawn(&mut self.world, id, slot, config, config.start_x, y);
        self.entities.insert(id, Entity::Player(player));
        self.players.push(id);
        self.controls.push(Controls::default());

        if self.players.len() == self.expected_players {
            self.phase.transition(GamePhase::Ready);
        }
        Some(slot as u8)
    }

    /// Buffer the latest control command for a slot (last write wins).
    /// Unknown slots are ignored.
    pub fn set_player_controls(&mut self, slot: usize, controls: Controls) {
        match self.controls.get_mut(slot) {
            Some(buffered) => *buffered = controls,
            None => tracing::debug!(slot, "Controls for unregistered slot ignored"),
        }
    }

    /// Request the Ready→Playing transition. Takes effect at the next
    /// tick once every expected slot is registered. A no-op outside
    /// Ready.
    pub fn start(&mut self) {
        if self.phase.phase() == GamePhase::Ready {
            self.start_requested = true;
        } else {
            tracing::debug!(phase = ?self.phase.phase(), "Start signal ignored");
        }
    }

    pub fn pause(&mut self) {
        self.phase.transition(GamePhase::Paused);
    }

    pub fn resume(&mut self) {
        if self.phase.phase() == GamePhase::Paused {
            self.phase.transition(GamePhase::Playing);
        }
    }

    /// Advance the match by one tick.
    pub fn step(&mut self, delta_ms: f32) {
        if self.phase.phase() != GamePhase::Playing {
            if self.phase.phase() == GamePhase::Ready
                && self.start_requested
                && self.players.len() == self.expected_players
            {
                self.phase.transition(GamePhase::Playing);
            }
            return;
        }

        self.game_over_countdown_ms -= delta_ms;
        let all_dead = self
            .players
            .iter()
            .all(|id| matches!(self.entities.get(id), Some(Entity::Player(p)) if p.dead));
        if all_dead && self.game_over_countdown_ms < 0.0 {
            self.phase.transition(GamePhase::GameOver);
            return;
        }

        // Wave boundary: spawn the next wave and skip physics this tick.
        if self.active_diamonds == 0 {
            self.level += 1;
            self.spawn_wave();
            return;
        }

        self.resolve_combat();
        self.apply_controls(delta_ms);

        let mut events = std::mem::take(&mut self.contact_buf);
        events.clear();
        self.world.step(delta_ms, &mut events);
        for i in 0..events.len() {
            let ev = events[i];
            if ev.started {
                self.on_contact_start(ev.a, ev.b);
            } else {
                self.on_contact_end(ev.a, ev.b);
            }
        }
        self.contact_buf = events;
    }

    /// Player-vs-player combat is a discrete pairwise overlap check,
    /// layered on top of (and decoupled from) the rigid-body simulation:
    /// the physics filter keeps player bodies from ever colliding.
    fn resolve_combat(&mut self) {
        let mut views = Vec::with_capacity(self.players.len());
        for &id in &self.players {
            if let Some(Entity::Player(p)) = self.entities.get(&id) {
                let (x, y) = self.world.position(&p.body);
                views.push((id, x, y, p.attacking(), p.dizzy()));
            }
        }
        let size = 2.0 * PLAYER_HALF_EXTENT;
        for i in 0..views.len() {
            for j in (i + 1)..views.len() {
                let (id_a, xa, ya, attacking_a, dizzy_a) = views[i];
                let (id_b, xb, yb, attacking_b, dizzy_b) = views[j];
                let overlapping = (xa - xb).abs() < size && (ya - yb).abs() < size;
                if !overlapping {
                    continue;
                }
                if attacking_a && !dizzy_b {
                    self.punch(id_b);
                }
                if attacking_b && !dizzy_a {
                    self.punch(id_a);
                }
            }
        }
    }

    fn punch(&mut self, id: EntityId) {
        if let Some(Entity::Player(p)) = self.entities.get_mut(&id) {
            p.take_punch();
        }
    }

    fn apply_controls(&mut self, delta_ms: f32) {
        for slot in 0..self.players.len() {
            let controls = self.controls[slot];
            let id = self.players[slot];
            let Some(Entity::Player(p)) = self.entities.get_mut(&id) else {
                continue;
            };

            if p.dead || p.dizzy() {
                // Input ignored; horizontal control suppressed. Gravity
                // still applies through the body's vertical velocity.
                let (_, vy) = self.world.velocity(&p.body);
                self.world.set_velocity(&p.body, 0.0, vy);
                p.tick_timers(delta_ms);
                continue;
            }

            if controls.action_key {
                p.attack_ms = ATTACK_WINDOW_MS;
            }

            let (_, vy) = self.world.velocity(&p.body);
            let vx = if controls.right && !controls.left {
                p.facing_left = false;
                RUN_SPEED
            } else if controls.left && !controls.right {
                p.facing_left = true;
                -RUN_SPEED
            } else {
                0.0
            };
            let vy = if controls.up && p.can_jump() {
                -JUMP_SPEED
            } else {
                vy
            };
            self.world.set_velocity(&p.body, vx, vy);
            p.tick_timers(delta_ms);
        }
    }

    fn on_contact_start(&mut self, a: ContactSide, b: ContactSide) {
        use ColliderRole::*;
        match (a.role, b.role) {
            (PlayerBody, Diamond) => self.on_player_diamond(a.entity, b.entity),
            (Diamond, PlayerBody) => self.on_player_diamond(b.entity, a.entity),
            (GroundSensor, Static) => self.on_feet_ground(a.entity, true),
            (Static, GroundSensor) => self.on_feet_ground(b.entity, true),
            (PlayerBody, Bomb) => self.on_player_bomb(a.entity),
            (Bomb, PlayerBody) => self.on_player_bomb(b.entity),
            _ => {},
        }
    }

    fn on_contact_end(&mut self, a: ContactSide, b: ContactSide) {
        use ColliderRole::*;
        match (a.role, b.role) {
            (GroundSensor, Static) => self.on_feet_ground(a.entity, false),
            (Static, GroundSensor) => self.on_feet_ground(b.entity, false),
            _ => {},
        }
    }

    /// Collecting a diamond mutates state exactly once: the mark guards
    /// against a second contact event in the same tick (e.g. both
    /// players touching the same diamond).
    fn on_player_diamond(&mut self, player_id: EntityId, diamond_id: EntityId) {
        let value = match self.entities.get_mut(&diamond_id) {
            Some(Entity::Diamond(d)) if !d.marked_for_deletion => {
                d.marked_for_deletion = true;
                d.value
            },
            _ => return,
        };
        self.active_diamonds = self.active_diamonds.saturating_sub(1);
        if let Some(Entity::Player(p)) = self.entities.get_mut(&player_id) {
            p.score += value;
        }
    }

    fn on_feet_ground(&mut self, player_id: EntityId, started: bool) {
        if let Some(Entity::Player(p)) = self.entities.get_mut(&player_id) {
            if started {
                p.ground_contacts += 1;
            } else {
                p.ground_contacts = p.ground_contacts.saturating_sub(1);
            }
        }
    }

    fn on_player_bomb(&mut self, player_id: EntityId) {
        if let Some(Entity::Player(p)) = self.entities.get_mut(&player_id) {
            p.kill();
        }
        self.game_over_countdown_ms = GAME_OVER_GRACE_MS;
    }

    fn spawn_wave(&mut self) {
        for i in 0..DIAMONDS_PER_WAVE {
            let x = TILE_SIZE + i as f32 * 2.0 * TILE_SIZE;
            self.add_diamond(x, TILE_SIZE / 2.0);
        }
        self.add_bomb();
    }

    fn add_diamond(&mut self, x: f32, y: f32) {
        let id = self.alloc_entity_id();
        let diamond = Diamond::spawn(&mut self.world, id, x, y, &mut self.rng);
        self.entities.insert(id, Entity::Diamond(diamond));
        self.active_diamonds += 1;
    }

    fn add_bomb(&mut self) {
        let id = self.alloc_entity_id();
        let x = self
            .rng
            .random_range(TILE_SIZE..self.level_def.width - TILE_SIZE);
        let bomb = Bomb::spawn(&mut self.world, id, x, TILE_SIZE / 2.0);
        let direction = if self.rng.random_bool(0.5) { 1.0 } else { -1.0 };
        let mass = self.world.body_mass(&bomb.body);
        self.world.apply_impulse(
            &bomb.body,
            direction * BOMB_LAUNCH_SPEED * mass,
            BOMB_LAUNCH_SPEED * mass,
        );
        self.entities.insert(id, Entity::Bomb(bomb));
    }

    /// Sweep: remove every non-static entity marked for deletion from
    /// the physics world and the registry. A no-op when nothing is
    /// marked.
    pub fn cleanup(&mut self) {
        let doomed: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, e)| !e.is_static() && e.marked_for_deletion())
            .map(|(&id, _)| id)
            .collect();
        for id in doomed {
            if let Some(entity) = self.entities.remove(&id) {
                for body in entity.bodies() {
                    self.world.remove_body(&body);
                }
            }
        }
    }

    /// Reset the match for another round: players back to spawn state,
    /// all diamonds and bombs destroyed, a fresh wave spawned. Only
    /// valid from GameOver.
    pub fn restart(&mut self) {
        if !self.phase.transition(GamePhase::Ready) {
            return;
        }
        self.level = 1;
        self.game_over_countdown_ms = 0.0;

        let doomed: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, e)| matches!(e, Entity::Diamond(_) | Entity::Bomb(_)))
            .map(|(&id, _)| id)
            .collect();
        for id in doomed {
            if let Some(entity) = self.entities.remove(&id) {
                for body in entity.bodies() {
                    self.world.remove_body(&body);
                }
            }
        }
        self.active_diamonds = 0;

        for &id in &self.players {
            if let Some(Entity::Player(p)) = self.entities.get_mut(&id) {
                p.score = 0;
                p.dead = false;
                p.dizzy_ms = 0.0;
                p.attack_ms = 0.0;
                p.facing_left = p.spawn_facing_left;
                p.ground_contacts = 0;
                self.world.set_position(&p.body, p.spawn_x, p.spawn_y);
                self.world.set_velocity(&p.body, 0.0, 0.0);
            }
        }

        self.spawn_wave();
    }

    /// Tear down the match: clears the physics world and the registry
    /// and moves to the terminal phase.
    pub fn dispose(&mut self) {
        self.world.clear();
        self.entities.clear();
        self.players.clear();
        self.controls.clear();
        self.phase.transition(GamePhase::Terminated);
    }

    pub fn phase(&self) -> GamePhase {
        self.phase.phase()
    }

    pub fn subscribe_phase(&mut self, listener: PhaseListener) {
        self.phase.subscribe(listener);
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn level_def(&self) -> &LevelDef {
        &self.level_def
    }

    pub fn active_diamonds(&self) -> u32 {
        self.active_diamonds
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn expected_players(&self) -> usize {
        self.expected_players
    }

    pub fn body_count(&self) -> usize {
        self.world.body_count()
    }

    pub fn player(&self, slot: usize) -> Option<&Player> {
        let id = self.players.get(slot)?;
        match self.entities.get(id) {
            Some(Entity::Player(p)) => Some(p),
            _ => None,
        }
    }

    /// Replicated player state, in slot order.
    pub fn player_snapshots(&self) -> Vec<PlayerSnapshot> {
        self.players
            .iter()
            .filter_map(|id| match self.entities.get(id) {
                Some(Entity::Player(p)) => {
                    let (x, y) = self.world.position(&p.body);
                    let (vx, vy) = self.world.velocity(&p.body);
                    Some(PlayerSnapshot {
                        id: id.to_string(),
                        x,
                        y,
                        velocity_x: vx,
                        velocity_y: vy,
                        score: p.score,
                        dead: p.dead,
                    })
                },
                _ => None,
            })
            .collect()
    }

    /// Replicated diamond state. Marked entities are already collected
    /// and excluded.
    pub fn diamond_snapshots(&self) -> Vec<DiamondSnapshot> {
        let mut snapshots: Vec<DiamondSnapshot> = self
            .entities
            .iter()
            .filter_map(|(id, e)| match e {
                Entity::Diamond(d) if !d.marked_for_deletion => {
                    let (x, y) = self.world.position(&d.body);
                    let (vx, vy) = self.world.velocity(&d.body);
                    Some(DiamondSnapshot {
                        id: id.to_string(),
                        x,
                        y,
                        velocity_x: vx,
                        velocity_y: vy,
                        value: d.value,
                    })
                },
                _ => None,
            })
            .collect();
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        snapshots
    }

    pub fn bomb_snapshots(&self) -> Vec<BombSnapshot> {
        let mut snapshots: Vec<BombSnapshot> = self
            .entities
            .iter()
            .filter_map(|(id, e)| match e {
                Entity::Bomb(b) if !b.marked_for_deletion => {
                    let (x, y) = self.world.position(&b.body);
                    let (vx, vy) = self.world.velocity(&b.body);
                    Some(BombSnapshot {
                        id: id.to_string(),
                        x,
                        y,
                        velocity_x: vx,
                        velocity_y: vy,
                    })
                },
                _ => None,
            })
            .collect();
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        snapshots
    }
}
