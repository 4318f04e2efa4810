//! Game entities: each pairs one or two physics bodies with gameplay
//! attributes. Entities live in the controller's registry keyed by
//! [`EntityId`]; physics bodies carry the id (not a reference), and
//! collision handlers resolve it back through the registry.

use rand::Rng;

use gemrush_core::player::{PlayerColor, PlayerSlotConfig};

use crate::physics::{
    BodyDesc, ColliderRole, CombineRule, FilterGroup, Material, PhysicsBody, PhysicsWorld,
};

/// Stable integer id for an entity. Replicated as a string identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Half extent of a player's square body (a full tile).
pub const PLAYER_HALF_EXTENT: f32 = 16.0;
/// Half extent of diamonds and bombs (half a tile).
pub const PICKUP_HALF_EXTENT: f32 = 8.0;

/// How long a punch leaves the victim unable to act.
pub const DIZZY_DURATION_MS: f32 = 2500.0;
/// How long an attack stays active after the action key is seen.
pub const ATTACK_WINDOW_MS: f32 = 250.0;

pub const DIAMOND_VALUE_HIGH: u32 = 25;
pub const DIAMOND_VALUE_LOW: u32 = 10;
/// Probability that a spawned diamond is the high-value tier.
pub const DIAMOND_HIGH_PROBABILITY: f64 = 0.25;

pub const PLATFORM_SMALL_WIDTH: f32 = 160.0;
pub const PLATFORM_LARGE_WIDTH: f32 = 320.0;
/// Inset of the friction surface from each platform edge.
const PLATFORM_SURFACE_PADDING: f32 = 4.0;
const PLATFORM_HALF_HEIGHT: f32 = 16.0;

/// A registered player. Reset (not destroyed) on restart; removed only
/// when the match terminates.
#[derive(Debug)]
pub struct Player {
    pub body: PhysicsBody,
    pub slot: usize,
    pub facing_left: bool,
    pub score: u32,
    pub dead: bool,
    pub dizzy_ms: f32,
    pub attack_ms: f32,
    pub ground_contacts: u32,
    pub color: PlayerColor,
    pub spawn_x: f32,
    pub spawn_y: f32,
    pub spawn_facing_left: bool,
    pub marked_for_deletion: bool,
}

impl Player {
    pub fn spawn(
        world: &mut PhysicsWorld,
        id: EntityId,
        slot: usize,
        config: &PlayerSlotConfig,
        x: f32,
        y: f32,
    ) -> Self {
        let body = world.create_body(
            &BodyDesc::dynamic(
                id,
                ColliderRole::PlayerBody,
                PLAYER_HALF_EXTENT,
                PLAYER_HALF_EXTENT,
            )
            .at(x, y)
            .with_group(FilterGroup::Players),
        );
        // Narrower than the body so brushing a wall does not count as
        // standing on it.
        world.add_ground_sensor(
            &body,
            id,
            PLAYER_HALF_EXTENT,
            PLAYER_HALF_EXTENT - 4.0,
            4.0,
            FilterGroup::Players,
        );
        Self {
            body,
            slot,
            facing_left: config.facing_left,
            score: 0,
            dead: false,
            dizzy_ms: 0.0,
            attack_ms: 0.0,
            ground_contacts: 0,
            color: config.color,
            spawn_x: x,
            spawn_y: y,
            spawn_facing_left: config.facing_left,
            marked_for_deletion: false,
        }
    }

    pub fn dizzy(&self) -> bool {
        self.dizzy_ms > 0.0
    }

    pub fn attacking(&self) -> bool {
        self.attack_ms > 0.0
    }

    pub fn can_jump(&self) -> bool {
        self.ground_contacts > 0
    }

    /// Death is idempotent: a second bomb hit changes nothing here.
    pub fn kill(&mut self) {
        self.dead = true;
    }

    /// A landed punch. Has no effect while already dizzy.
    pub fn take_punch(&mut self) {
        if !self.dizzy() {
            self.dizzy_ms = DIZZY_DURATION_MS;
        }
    }

    /// Decrement countdowns, clamping at zero.
    pub fn tick_timers(&mut self, delta_ms: f32) {
        self.dizzy_ms = (self.dizzy_ms - delta_ms).max(0.0);
        self.attack_ms = (self.attack_ms - delta_ms).max(0.0);
    }
}

/// A collectible. Created in batches per wave, destroyed on collection.
#[derive(Debug)]
pub struct Diamond {
    pub body: PhysicsBody,
    pub value: u32,
    pub marked_for_deletion: bool,
}

impl Diamond {
    pub fn spawn<R: Rng>(
        world: &mut PhysicsWorld,
        id: EntityId,
        x: f32,
        y: f32,
        rng: &mut R,
    ) -> Self {
        let value = if rng.random_bool(DIAMOND_HIGH_PROBABILITY) {
            DIAMOND_VALUE_HIGH
        } else {
            DIAMOND_VALUE_LOW
        };
        let body = world.create_body(
            &BodyDesc::dynamic(
                id,
                ColliderRole::Diamond,
                PICKUP_HALF_EXTENT,
                PICKUP_HALF_EXTENT,
            )
            .at(x, y)
            .with_material(Material {
                restitution: rng.random_range(0.8..0.95),
                ..Material::default()
            }),
        );
        Self {
            body,
            value,
            marked_for_deletion: false,
        }
    }
}

/// The wave hazard: no gravity, perfectly elastic, bounces until the
/// match restarts.
#[derive(Debug)]
pub struct Bomb {
    pub body: PhysicsBody,
    pub marked_for_deletion: bool,
}

impl Bomb {
    pub fn spawn(world: &mut PhysicsWorld, id: EntityId, x: f32, y: f32) -> Self {
        let body = world.create_body(
            &BodyDesc::dynamic(id, ColliderRole::Bomb, PICKUP_HALF_EXTENT, PICKUP_HALF_EXTENT)
                .at(x, y)
                .with_gravity_scale(0.0)
                .with_group(FilterGroup::Hazards)
                .with_material(Material {
                    restitution: 1.0,
                    friction: 0.0,
                    restitution_combine: CombineRule::Max,
                    friction_combine: CombineRule::Min,
                    ..Material::default()
                }),
        );
        Self {
            body,
            marked_for_deletion: false,
        }
    }
}

/// A static platform: a friction surface the width of the visible top,
/// overlapped by a frictionless full-width body so players sliding off
/// the side do not stick to the edge.
#[derive(Debug)]
pub struct Platform {
    pub surface: PhysicsBody,
    pub slide: PhysicsBody,
    pub is_small: bool,
    pub marked_for_deletion: bool,
}

impl Platform {
    pub fn spawn(world: &mut PhysicsWorld, id: EntityId, x: f32, y: f32, is_small: bool) -> Self {
        let width = if is_small {
            PLATFORM_SMALL_WIDTH
        } else {
            PLATFORM_LARGE_WIDTH
        };
        let surface = world.create_body(
            &BodyDesc::fixed(
                id,
                width / 2.0 - PLATFORM_SURFACE_PADDING,
                PLATFORM_HALF_HEIGHT,
            )
            .at(x, y),
        );
        let slide = world.create_body(
            &BodyDesc::fixed(id, width / 2.0, PLATFORM_HALF_HEIGHT)
                .at(x, y)
                .with_material(Material {
                    friction: 0.0,
                    ..Material::default()
                }),
        );
        Self {
            surface,
            slide,
            is_small,
            marked_for_deletion: false,
        }
    }
}

/// The closed set of entity variants owned by the controller's world.
#[derive(Debug)]
pub enum Entity {
    Player(Player),
    Diamond(Diamond),
    Bomb(Bomb),
    Platform(Platform),
}

impl Entity {
    pub fn is_static(&self) -> bool {
        matches!(self, Entity::Platform(_))
    }

    pub fn marked_for_deletion(&self) -> bool {
        match self {
            Entity::Player(p) => p.marked_for_deletion,
            Entity::Diamond(d) => d.marked_for_deletion,
            Entity::Bomb(b) => b.marked_for_deletion,
            Entity::Platform(p) => p.marked_for_deletion,
        }
    }

    /// All physics bodies owned by this entity.
    pub fn bodies(&self) -> Vec<PhysicsBody> {
        match self {
            Entity::Player(p) => vec![p.body],
            Entity::Diamond(d) => vec![d.body],
            Entity::Bomb(b) => vec![b.body],
            Entity::Platform(p) => vec![p.surface, p.slide],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemrush_core::player::PLAYER_SLOTS;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn spawn_player(world: &mut PhysicsWorld) -> Player {
        Player::spawn(world, EntityId(1), 0, &PLAYER_SLOTS[0], 128.0, 584.0)
    }

    #[test]
    fn punch_makes_dizzy_once() {
        let mut world = PhysicsWorld::new();
        let mut p = spawn_player(&mut world);
        assert!(!p.dizzy());
        p.take_punch();
        assert!(p.dizzy());
        assert_eq!(p.dizzy_ms, DIZZY_DURATION_MS);

        // A second punch mid-dizzy does not extend the countdown.
        p.tick_timers(1000.0);
        p.take_punch();
        assert_eq!(p.dizzy_ms, DIZZY_DURATION_MS - 1000.0);
    }

    #[test]
    fn timers_clamp_at_zero() {
        let mut world = PhysicsWorld::new();
        let mut p = spawn_player(&mut world);
        p.take_punch();
        p.attack_ms = ATTACK_WINDOW_MS;
        p.tick_timers(10_000.0);
        assert_eq!(p.dizzy_ms, 0.0);
        assert_eq!(p.attack_ms, 0.0);
        assert!(!p.dizzy());
        assert!(!p.attacking());
    }

    #[test]
    fn death_is_idempotent() {
        let mut world = PhysicsWorld::new();
        let mut p = spawn_player(&mut world);
        p.kill();
        assert!(p.dead);
        p.kill();
        assert!(p.dead);
    }

    #[test]
    fn can_jump_follows_ground_contacts() {
        let mut world = PhysicsWorld::new();
        let mut p = spawn_player(&mut world);
        assert!(!p.can_jump());
        p.ground_contacts = 2;
        assert!(p.can_jump());
        p.ground_contacts = 0;
        assert!(!p.can_jump());
    }

    #[test]
    fn diamond_values_come_in_two_tiers() {
        let mut world = PhysicsWorld::new();
        let mut rng = StdRng::seed_from_u64(7);
        let mut high = 0usize;
        let mut low = 0usize;
        for i in 0..200 {
            let d = Diamond::spawn(&mut world, EntityId(i), 0.0, 0.0, &mut rng);
            match d.value {
                DIAMOND_VALUE_HIGH => high += 1,
                DIAMOND_VALUE_LOW => low += 1,
                other => panic!("unexpected diamond value {other}"),
            }
        }
        assert!(high > 0 && low > 0);
        assert!(low > high, "low tier should dominate at p=0.25");
    }

    #[test]
    fn platform_owns_two_bodies() {
        let mut world = PhysicsWorld::new();
        let p = Platform::spawn(&mut world, EntityId(1), 480.0, 352.0, false);
        assert_eq!(Entity::Platform(p).bodies().len(), 2);
        assert_eq!(world.body_count(), 2);
    }
}
