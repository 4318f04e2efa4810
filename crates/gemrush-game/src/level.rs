//! Level factory: turns a declarative [`LevelDef`] into static physics
//! bodies — the platforms plus four boundary walls enclosing the arena.

use gemrush_core::level::LevelDef;

use crate::entity::{EntityId, Platform};
use crate::physics::{BodyDesc, Material, PhysicsWorld};

/// Boundary wall thickness.
pub const WALL_THICKNESS: f32 = 32.0;

/// Build the level's static bodies. Platforms are returned as entities
/// for the controller's registry; the boundary walls are plain static
/// bodies that never participate in gameplay beyond collision.
///
/// Deterministic: the same `def` always produces the same body set.
pub fn build_level(
    world: &mut PhysicsWorld,
    def: &LevelDef,
    next_id: &mut impl FnMut() -> EntityId,
) -> Vec<(EntityId, Platform)> {
    let mut platforms = Vec::with_capacity(def.platforms.len());
    for p in &def.platforms {
        let id = next_id();
        let platform = Platform::spawn(
            world,
            id,
            def.width * p.x_frac,
            def.height * p.y_frac,
            p.is_small,
        );
        platforms.push((id, platform));
    }

    build_boundaries(world, def.width, def.height, next_id);
    platforms
}

/// Four walls just outside the visible bounds. The bottom wall doubles
/// as the ground and keeps full friction; the others are frictionless so
/// nothing sticks to them.
fn build_boundaries(
    world: &mut PhysicsWorld,
    width: f32,
    height: f32,
    next_id: &mut impl FnMut() -> EntityId,
) {
    let half = WALL_THICKNESS / 2.0;
    let slick = Material {
        friction: 0.0,
        ..Material::default()
    };

    // top
    world.create_body(
        &BodyDesc::fixed(next_id(), width / 2.0, half)
            .at(width / 2.0, -half)
            .with_material(slick),
    );
    // left
    world.create_body(
        &BodyDesc::fixed(next_id(), half, height / 2.0)
            .at(-half, height / 2.0)
            .with_material(slick),
    );
    // right
    world.create_body(
        &BodyDesc::fixed(next_id(), half, height / 2.0)
            .at(width + half, height / 2.0)
            .with_material(slick),
    );
    // bottom: the ground, flush with the arena's lower edge
    world.create_body(
        &BodyDesc::fixed(next_id(), width / 2.0, half).at(width / 2.0, height - half),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(world: &mut PhysicsWorld) -> Vec<(EntityId, Platform)> {
        let def = LevelDef::standard(960.0, 640.0);
        let mut counter = 0u64;
        let mut next_id = || {
            counter += 1;
            EntityId(counter)
        };
        build_level(world, &def, &mut next_id)
    }

    #[test]
    fn builds_platforms_and_walls() {
        let mut world = PhysicsWorld::new();
        let platforms = build(&mut world);
        assert_eq!(platforms.len(), 6);
        // Six platforms at two bodies each, plus four walls.
        assert_eq!(world.body_count(), 16);
    }

    #[test]
    fn deterministic_for_same_level() {
        let mut world_a = PhysicsWorld::new();
        let mut world_b = PhysicsWorld::new();
        let a = build(&mut world_a);
        let b = build(&mut world_b);
        assert_eq!(world_a.body_count(), world_b.body_count());
        for ((_, pa), (_, pb)) in a.iter().zip(b.iter()) {
            assert_eq!(pa.is_small, pb.is_small);
            assert_eq!(
                world_a.position(&pa.surface),
                world_b.position(&pb.surface)
            );
        }
    }

    #[test]
    fn platforms_sit_at_fractional_positions() {
        let mut world = PhysicsWorld::new();
        let platforms = build(&mut world);
        let (x, y) = world.position(&platforms[0].1.surface);
        assert!((x - 480.0).abs() < 1e-3);
        assert!((y - 179.2).abs() < 0.1);
    }
}
