//! Thin adapter over rapier2d exposing the small rigid-body surface the
//! game needs: cuboid body creation with materials and filter groups,
//! velocity/impulse access, sensor colliders, and a stepping function
//! that drains collision start/end events.
//!
//! Coordinates are Y-down pixels. Every collider carries its owning
//! entity id plus a role tag in `user_data`, so collision handlers
//! resolve ids through the controller's lookup table instead of holding
//! live references into the engine.

use std::sync::Mutex;

use rapier2d::prelude::*;

use crate::entity::EntityId;

/// Downward gravity in px/s^2, tuned so a jump clears one platform row.
pub const GRAVITY: f32 = 300.0;

/// The kind of rigid body to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Dynamic,
    Fixed,
}

/// Role a collider plays in collision dispatch. A closed set: handlers
/// match on role pairs, never on dynamically attached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColliderRole {
    PlayerBody = 1,
    GroundSensor = 2,
    Diamond = 3,
    Bomb = 4,
    Static = 5,
}

impl ColliderRole {
    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::PlayerBody),
            2 => Some(Self::GroundSensor),
            3 => Some(Self::Diamond),
            4 => Some(Self::Bomb),
            5 => Some(Self::Static),
            _ => None,
        }
    }
}

/// Collision filter group. Members of a self-excluding group never
/// generate contacts with each other; all other pairs collide normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterGroup {
    #[default]
    None,
    /// Players pass through each other; combat is a discrete check.
    Players,
    /// Hazards (bombs) pass through each other.
    Hazards,
}

impl FilterGroup {
    fn interaction_groups(self) -> InteractionGroups {
        match self {
            FilterGroup::None => InteractionGroups::all(),
            FilterGroup::Players => {
                InteractionGroups::new(Group::GROUP_1, Group::ALL & !Group::GROUP_1)
            },
            FilterGroup::Hazards => {
                InteractionGroups::new(Group::GROUP_2, Group::ALL & !Group::GROUP_2)
            },
        }
    }
}

/// How a material coefficient combines with the other collider's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombineRule {
    #[default]
    Average,
    Min,
    Max,
}

impl CombineRule {
    fn to_rapier(self) -> CoefficientCombineRule {
        match self {
            CombineRule::Average => CoefficientCombineRule::Average,
            CombineRule::Min => CoefficientCombineRule::Min,
            CombineRule::Max => CoefficientCombineRule::Max,
        }
    }
}

/// Physical material for a collider.
#[derive(Debug, Clone, Copy)]
pub struct Material {
    pub restitution: f32,
    pub friction: f32,
    pub density: f32,
    pub restitution_combine: CombineRule,
    pub friction_combine: CombineRule,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            restitution: 0.0,
            friction: 0.1,
            density: 1.0,
            restitution_combine: CombineRule::Average,
            friction_combine: CombineRule::Average,
        }
    }
}

/// Description of a cuboid rigid body before creation.
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub entity: EntityId,
    pub role: ColliderRole,
    pub x: f32,
    pub y: f32,
    pub half_width: f32,
    pub half_height: f32,
    pub material: Material,
    pub gravity_scale: f32,
    pub group: FilterGroup,
}

impl BodyDesc {
    pub fn dynamic(
        entity: EntityId,
        role: ColliderRole,
        half_width: f32,
        half_height: f32,
    ) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            entity,
            role,
            x: 0.0,
            y: 0.0,
            half_width,
            half_height,
            material: Material::default(),
            gravity_scale: 1.0,
            group: FilterGroup::None,
        }
    }

    pub fn fixed(entity: EntityId, half_width: f32, half_height: f32) -> Self {
        Self {
            kind: BodyKind::Fixed,
            entity,
            role: ColliderRole::Static,
            x: 0.0,
            y: 0.0,
            half_width,
            half_height,
            material: Material {
                friction: 1.0,
                ..Material::default()
            },
            gravity_scale: 0.0,
            group: FilterGroup::None,
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    pub fn with_group(mut self, group: FilterGroup) -> Self {
        self.group = group;
        self
    }
}

/// Handle pair referencing engine internals for one body.
#[derive(Debug, Clone, Copy)]
pub struct PhysicsBody {
    pub body_handle: RigidBodyHandle,
    pub collider_handle: ColliderHandle,
}

/// One side of a contact, resolved from collider `user_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactSide {
    pub entity: EntityId,
    pub role: ColliderRole,
}

/// A collision start/end event between two tagged colliders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    pub a: ContactSide,
    pub b: ContactSide,
    pub started: bool,
}

fn pack_user_data(entity: EntityId, role: ColliderRole) -> u128 {
    (entity.0 as u128) | ((role as u8 as u128) << 64)
}

fn unpack_user_data(data: u128) -> Option<ContactSide> {
    let role = ColliderRole::from_tag((data >> 64) as u8)?;
    Some(ContactSide {
        entity: EntityId(data as u64),
        role,
    })
}

struct CollisionEventCollector {
    collisions: Mutex<Vec<CollisionEvent>>,
}

impl CollisionEventCollector {
    fn new() -> Self {
        Self {
            collisions: Mutex::new(Vec::new()),
        }
    }

    fn drain(&self) -> Vec<CollisionEvent> {
        std::mem::take(&mut *self.collisions.lock().unwrap())
    }
}

impl EventHandler for CollisionEventCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        self.collisions.lock().unwrap().push(event);
    }

    fn handle_contact_force_event(
        &self,
        _dt: f32,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: f32,
    ) {
        // Contact forces are not used.
    }
}

/// Wraps the rapier pipeline into one struct owned by the controller.
pub struct PhysicsWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    event_collector: CollisionEventCollector,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            gravity: vector![0.0, GRAVITY],
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            event_collector: CollisionEventCollector::new(),
        }
    }

    /// Create a rigid body + cuboid collider. Never fails under valid
    /// numeric input.
    pub fn create_body(&mut self, desc: &BodyDesc) -> PhysicsBody {
        let body_type = match desc.kind {
            BodyKind::Dynamic => RigidBodyType::Dynamic,
            BodyKind::Fixed => RigidBodyType::Fixed,
        };
        let user_data = pack_user_data(desc.entity, desc.role);
        let rb = RigidBodyBuilder::new(body_type)
            .translation(vector![desc.x, desc.y])
            .gravity_scale(desc.gravity_scale)
            .locked_axes(LockedAxes::ROTATION_LOCKED)
            .user_data(user_data)
            .build();
        let body_handle = self.bodies.insert(rb);

        let collider = ColliderBuilder::cuboid(desc.half_width, desc.half_height)
            .restitution(desc.material.restitution)
            .restitution_combine_rule(desc.material.restitution_combine.to_rapier())
            .friction(desc.material.friction)
            .friction_combine_rule(desc.material.friction_combine.to_rapier())
            .density(desc.material.density)
            .collision_groups(desc.group.interaction_groups())
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .user_data(user_data)
            .build();
        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);

        PhysicsBody {
            body_handle,
            collider_handle,
        }
    }

    /// Attach a non-solid sensor collider to an existing body, offset
    /// from its center. Used for the players' ground-contact sensor.
    pub fn add_ground_sensor(
        &mut self,
        body: &PhysicsBody,
        entity: EntityId,
        offset_y: f32,
        half_width: f32,
        half_height: f32,
        group: FilterGroup,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_width, half_height)
            .translation(vector![0.0, offset_y])
            .sensor(true)
            .collision_groups(group.interaction_groups())
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .user_data(pack_user_data(entity, ColliderRole::GroundSensor))
            .build();
        self.colliders
            .insert_with_parent(collider, body.body_handle, &mut self.bodies)
    }

    pub fn remove_body(&mut self, body: &PhysicsBody) {
        self.bodies.remove(
            body.body_handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    pub fn set_velocity(&mut self, body: &PhysicsBody, vx: f32, vy: f32) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            rb.set_linvel(vector![vx, vy], true);
        }
    }

    pub fn velocity(&self, body: &PhysicsBody) -> (f32, f32) {
        self.bodies
            .get(body.body_handle)
            .map(|rb| (rb.linvel().x, rb.linvel().y))
            .unwrap_or((0.0, 0.0))
    }

    pub fn set_position(&mut self, body: &PhysicsBody, x: f32, y: f32) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            rb.set_translation(vector![x, y], true);
        }
    }

    pub fn position(&self, body: &PhysicsBody) -> (f32, f32) {
        self.bodies
            .get(body.body_handle)
            .map(|rb| (rb.translation().x, rb.translation().y))
            .unwrap_or((0.0, 0.0))
    }

    /// Apply an instantaneous impulse (mass * delta-velocity).
    pub fn apply_impulse(&mut self, body: &PhysicsBody, ix: f32, iy: f32) {
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            rb.apply_impulse(vector![ix, iy], true);
        }
    }

    pub fn body_mass(&self, body: &PhysicsBody) -> f32 {
        self.bodies
            .get(body.body_handle)
            .map(|rb| rb.mass())
            .unwrap_or(0.0)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Advance the simulation by `dt_ms` and append resolved collision
    /// start/end events to `events`.
    pub fn step(&mut self, dt_ms: f32, events: &mut Vec<ContactEvent>) {
        self.integration_parameters.dt = dt_ms / 1000.0;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.event_collector,
        );

        for event in self.event_collector.drain() {
            let (h1, h2, started) = match event {
                CollisionEvent::Started(h1, h2, _) => (h1, h2, true),
                CollisionEvent::Stopped(h1, h2, _) => (h1, h2, false),
            };
            let a = self.resolve_collider(h1);
            let b = self.resolve_collider(h2);
            if let (Some(a), Some(b)) = (a, b) {
                events.push(ContactEvent { a, b, started });
            }
        }
    }

    fn resolve_collider(&self, handle: ColliderHandle) -> Option<ContactSide> {
        self.colliders
            .get(handle)
            .and_then(|c| unpack_user_data(c.user_data))
    }

    /// Drop every body and collider. Used on match disposal.
    pub fn clear(&mut self) {
        self.bodies = RigidBodySet::new();
        self.colliders = ColliderSet::new();
        self.impulse_joints = ImpulseJointSet::new();
        self.multibody_joints = MultibodyJointSet::new();
        self.island_manager = IslandManager::new();
        self.broad_phase = DefaultBroadPhase::new();
        self.narrow_phase = NarrowPhase::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dyn_body(world: &mut PhysicsWorld, id: u64, x: f32, y: f32) -> PhysicsBody {
        world.create_body(
            &BodyDesc::dynamic(EntityId(id), ColliderRole::Diamond, 8.0, 8.0).at(x, y),
        )
    }

    #[test]
    fn gravity_pulls_bodies_down() {
        let mut world = PhysicsWorld::new();
        let body = dyn_body(&mut world, 1, 100.0, 100.0);
        let mut events = Vec::new();
        for _ in 0..10 {
            world.step(50.0, &mut events);
        }
        let (_, y) = world.position(&body);
        assert!(y > 100.0, "Y-down gravity should increase y, got {y}");
    }

    #[test]
    fn gravity_scale_zero_floats() {
        let mut world = PhysicsWorld::new();
        let body = world.create_body(
            &BodyDesc::dynamic(EntityId(1), ColliderRole::Bomb, 8.0, 8.0)
                .at(100.0, 100.0)
                .with_gravity_scale(0.0),
        );
        let mut events = Vec::new();
        for _ in 0..10 {
            world.step(50.0, &mut events);
        }
        let (_, y) = world.position(&body);
        assert!((y - 100.0).abs() < 1e-3, "No-gravity body should not fall");
    }

    #[test]
    fn falling_body_reports_contact_with_static(){
        let mut world = PhysicsWorld::new();
        let _floor = world.create_body(&BodyDesc::fixed(EntityId(1), 200.0, 16.0).at(0.0, 100.0));
        let ball = dyn_body(&mut world, 2, 0.0, 40.0);

        let mut events = Vec::new();
        for _ in 0..40 {
            world.step(50.0, &mut events);
        }
        assert!(
            events.iter().any(|e| e.started
                && (e.a.role == ColliderRole::Static || e.b.role == ColliderRole::Static)),
            "Expected a collision-start against the floor"
        );
        let (_, y) = world.position(&ball);
        assert!(y < 100.0, "Body should rest above the floor, got {y}");
    }

    #[test]
    fn self_excluding_group_members_pass_through() {
        let mut world = PhysicsWorld::new();
        let a = world.create_body(
            &BodyDesc::dynamic(EntityId(1), ColliderRole::PlayerBody, 16.0, 16.0)
                .at(0.0, 0.0)
                .with_gravity_scale(0.0)
                .with_group(FilterGroup::Players),
        );
        let _b = world.create_body(
            &BodyDesc::dynamic(EntityId(2), ColliderRole::PlayerBody, 16.0, 16.0)
                .at(60.0, 0.0)
                .with_gravity_scale(0.0)
                .with_group(FilterGroup::Players),
        );
        world.set_velocity(&a, 100.0, 0.0);

        let mut events = Vec::new();
        for _ in 0..30 {
            world.step(50.0, &mut events);
        }
        assert!(
            events.is_empty(),
            "Players must never physically collide: {events:?}"
        );
        let (x, _) = world.position(&a);
        assert!(x > 60.0, "Player should pass through the other, got x={x}");
    }

    #[test]
    fn ground_sensor_reports_start_and_end() {
        let mut world = PhysicsWorld::new();
        let _floor = world.create_body(&BodyDesc::fixed(EntityId(1), 200.0, 16.0).at(0.0, 100.0));
        let player = world.create_body(
            &BodyDesc::dynamic(EntityId(2), ColliderRole::PlayerBody, 16.0, 16.0).at(0.0, 30.0),
        );
        world.add_ground_sensor(&player, EntityId(2), 16.0, 12.0, 4.0, FilterGroup::None);

        let mut events = Vec::new();
        for _ in 0..40 {
            world.step(50.0, &mut events);
        }
        let is_sensor = |e: &ContactEvent| {
            e.a.role == ColliderRole::GroundSensor || e.b.role == ColliderRole::GroundSensor
        };
        let sensor_start = events.iter().any(|e| e.started && is_sensor(e));
        assert!(sensor_start, "Sensor should report ground contact");

        // Launch the player upward and expect a contact-end.
        events.clear();
        world.set_velocity(&player, 0.0, -300.0);
        for _ in 0..10 {
            world.step(50.0, &mut events);
        }
        let sensor_end = events.iter().any(|e| !e.started && is_sensor(e));
        assert!(sensor_end, "Sensor should report leaving the ground");
    }

    #[test]
    fn remove_body_shrinks_count() {
        let mut world = PhysicsWorld::new();
        let a = dyn_body(&mut world, 1, 0.0, 0.0);
        let _b = dyn_body(&mut world, 2, 50.0, 0.0);
        assert_eq!(world.body_count(), 2);
        world.remove_body(&a);
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn user_data_roundtrip() {
        let side = unpack_user_data(pack_user_data(EntityId(42), ColliderRole::Bomb)).unwrap();
        assert_eq!(side.entity, EntityId(42));
        assert_eq!(side.role, ColliderRole::Bomb);
        assert!(unpack_user_data(0).is_none());
    }
}
