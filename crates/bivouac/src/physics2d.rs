//! # 2D Physics via Rapier
//!
//! Attach a [`PhysicsComponent`] next to a [`Locus`] and register a
//! [`PhysicsSystem`]. The system owns the Rapier simulation; each update it
//!
//! 1. creates a body and collider for every component it has not seen yet,
//!    placed at the entity's locus position and rotation,
//! 2. pushes kinematic loci into their bodies,
//! 3. steps the simulation at a fixed rate, consuming the frame's `dt`,
//! 4. writes dynamic body positions and angles back to the loci.
//!
//! Bodies are removed when their entity is destroyed or the component is
//! removed. Positions are in the same pixel space as everything else, so
//! gravity defaults to a y-down `980` units per second squared.
//!
//! The locus is treated as world space: a parent on a physics entity is
//! ignored by the simulation.

use std::collections::HashMap;

use rapier2d::prelude::*;

use crate::ecs::{Entity, Event, Subscriptions, System, World};
use crate::locus::Locus;
use crate::math::Vec2;

/// Maximum frame time fed to the accumulator, in seconds.
const MAX_FRAME_TIME: f32 = 0.25;

/// How the body reacts to forces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Dynamic,
    Fixed,
    /// Follows its locus; pushes dynamic bodies out of the way.
    Kinematic,
}

impl BodyKind {
    fn to_rapier(self) -> RigidBodyType {
        match self {
            BodyKind::Dynamic => RigidBodyType::Dynamic,
            BodyKind::Fixed => RigidBodyType::Fixed,
            BodyKind::Kinematic => RigidBodyType::KinematicPositionBased,
        }
    }
}

/// Collider geometry, centred on the locus position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Ball { radius: f32 },
    Cuboid { half_width: f32, half_height: f32 },
    CapsuleY { half_height: f32, radius: f32 },
    CapsuleX { half_width: f32, radius: f32 },
}

impl Shape {
    pub fn ball(radius: f32) -> Self {
        Shape::Ball { radius }
    }

    /// A box `width` by `height`.
    pub fn rect(width: f32, height: f32) -> Self {
        Shape::Cuboid {
            half_width: width * 0.5,
            half_height: height * 0.5,
        }
    }

    fn builder(self) -> ColliderBuilder {
        match self {
            Shape::Ball { radius } => ColliderBuilder::ball(radius),
            Shape::Cuboid {
                half_width,
                half_height,
            } => ColliderBuilder::cuboid(half_width, half_height),
            Shape::CapsuleY {
                half_height,
                radius,
            } => ColliderBuilder::capsule_y(half_height, radius),
            Shape::CapsuleX { half_width, radius } => ColliderBuilder::capsule_x(half_width, radius),
        }
    }
}

/// A rigid body with one collider.
///
/// The fields describe the body when it is created. Changing them afterwards
/// has no effect; remove and re-assign the component to rebuild the body.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsComponent {
    pub kind: BodyKind,
    pub shape: Shape,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub gravity_scale: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub ccd: bool,
    pub restitution: f32,
    pub friction: f32,
    pub density: f32,
    pub sensor: bool,
    handle: Option<RigidBodyHandle>,
}

impl PhysicsComponent {
    pub fn new(kind: BodyKind, shape: Shape) -> Self {
        Self {
            kind,
            shape,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            gravity_scale: 1.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            ccd: false,
            restitution: 0.0,
            friction: 0.5,
            density: 1.0,
            sensor: false,
            handle: None,
        }
    }

    pub fn dynamic(shape: Shape) -> Self {
        Self::new(BodyKind::Dynamic, shape)
    }

    pub fn fixed(shape: Shape) -> Self {
        Self::new(BodyKind::Fixed, shape)
    }

    pub fn kinematic(shape: Shape) -> Self {
        Self::new(BodyKind::Kinematic, shape)
    }

    pub fn with_velocity(mut self, v: Vec2) -> Self {
        self.linear_velocity = v;
        self
    }

    pub fn with_angular_velocity(mut self, v: f32) -> Self {
        self.angular_velocity = v;
        self
    }

    pub fn with_gravity_scale(mut self, s: f32) -> Self {
        self.gravity_scale = s;
        self
    }

    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    pub fn with_ccd(mut self, enabled: bool) -> Self {
        self.ccd = enabled;
        self
    }

    pub fn with_restitution(mut self, r: f32) -> Self {
        self.restitution = r;
        self
    }

    pub fn with_friction(mut self, f: f32) -> Self {
        self.friction = f;
        self
    }

    pub fn with_density(mut self, d: f32) -> Self {
        self.density = d;
        self
    }

    pub fn with_sensor(mut self, s: bool) -> Self {
        self.sensor = s;
        self
    }

    /// Whether the system has built a body for this component.
    pub fn is_simulated(&self) -> bool {
        self.handle.is_some()
    }
}

/// Owns the Rapier world and keeps it in step with the ECS.
pub struct PhysicsSystem {
    gravity: Vec2,
    pipeline: PhysicsPipeline,
    params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    entity_to_body: HashMap<Entity, RigidBodyHandle>,
    accumulator: f32,
}

impl std::fmt::Debug for PhysicsSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsSystem")
            .field("gravity", &self.gravity)
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .finish()
    }
}

impl PhysicsSystem {
    pub fn new() -> Self {
        Self {
            gravity: Vec2::new(0.0, 980.0),
            pipeline: PhysicsPipeline::new(),
            params: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            entity_to_body: HashMap::new(),
            accumulator: 0.0,
        }
    }

    pub fn with_gravity(mut self, g: Vec2) -> Self {
        self.gravity = g;
        self
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    /// Seconds per simulation step.
    pub fn timestep(&self) -> f32 {
        self.params.dt
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Current linear velocity of `entity`'s body.
    pub fn velocity(&self, entity: Entity) -> Option<Vec2> {
        let handle = self.entity_to_body.get(&entity)?;
        self.bodies.get(*handle).map(|b| b.linvel())
    }

    /// Apply an instantaneous impulse to `entity`'s body.
    pub fn apply_impulse(&mut self, entity: Entity, impulse: Vec2) {
        let Some(handle) = self.entity_to_body.get(&entity) else {
            return;
        };
        if let Some(body) = self.bodies.get_mut(*handle) {
            body.apply_impulse(impulse, true);
        }
    }

    fn remove_body(&mut self, entity: Entity) {
        let Some(handle) = self.entity_to_body.remove(&entity) else {
            return;
        };
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        log::trace!("Removed physics body of {entity:?}");
    }

    fn create_bodies(&mut self, world: &mut World) {
        let mut fresh: Vec<(Entity, PhysicsComponent, Vec2, f32)> = Vec::new();
        world.query::<(&PhysicsComponent, &Locus)>(|entity, (physics, locus)| {
            if physics.handle.is_none() {
                fresh.push((entity, physics.clone(), locus.position, locus.rotation));
            }
        });

        for (entity, desc, position, angle) in fresh {
            // a re-assigned component replaces the old body
            self.remove_body(entity);

            let body = RigidBodyBuilder::new(desc.kind.to_rapier())
                .translation(position)
                .rotation(angle)
                .linvel(desc.linear_velocity)
                .angvel(desc.angular_velocity)
                .gravity_scale(desc.gravity_scale)
                .linear_damping(desc.linear_damping)
                .angular_damping(desc.angular_damping)
                .ccd_enabled(desc.ccd)
                .build();
            let handle = self.bodies.insert(body);

            let collider = desc
                .shape
                .builder()
                .restitution(desc.restitution)
                .friction(desc.friction)
                .density(desc.density)
                .sensor(desc.sensor)
                .build();
            self.colliders
                .insert_with_parent(collider, handle, &mut self.bodies);

            self.entity_to_body.insert(entity, handle);
            if let Some(physics) = world.component_mut::<PhysicsComponent>(entity) {
                physics.handle = Some(handle);
            }
        }
    }

    fn push_kinematic(&mut self, world: &mut World) {
        let bodies = &mut self.bodies;
        world.query::<(&PhysicsComponent, &Locus)>(|_, (physics, locus)| {
            if physics.kind != BodyKind::Kinematic {
                return;
            }
            if let Some(body) = physics.handle.and_then(|h| bodies.get_mut(h)) {
                body.set_next_kinematic_position(Pose::new(locus.position, locus.rotation));
            }
        });
    }

    fn pull_dynamic(&self, world: &mut World) {
        let bodies = &self.bodies;
        world.query::<(&mut Locus, &PhysicsComponent)>(|_, (locus, physics)| {
            if physics.kind != BodyKind::Dynamic {
                return;
            }
            if let Some(body) = physics.handle.and_then(|h| bodies.get(h)) {
                locus.position = body.translation();
                locus.rotation = body.rotation().angle();
            }
        });
    }
}

impl Default for PhysicsSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for PhysicsSystem {
    fn configure(&mut self, subscriptions: &mut Subscriptions) {
        subscriptions.removed::<PhysicsComponent>().destroyed();
    }

    fn receive(&mut self, _world: &mut World, event: &Event) {
        self.remove_body(event.entity());
    }

    fn update(&mut self, world: &mut World, dt: f64) {
        self.create_bodies(world);
        self.push_kinematic(world);

        self.accumulator += (dt as f32).clamp(0.0, MAX_FRAME_TIME);
        let fixed_dt = self.params.dt;
        let mut steps = 0;
        while self.accumulator >= fixed_dt {
            self.pipeline.step(
                self.gravity,
                &self.params,
                &mut self.islands,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                &(),
                &(),
            );
            self.accumulator -= fixed_dt;
            steps += 1;
        }

        if steps > 0 {
            self.pull_dynamic(world);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::SystemManager;

    fn setup() -> (World, SystemManager) {
        let mut systems = SystemManager::new();
        systems.add(PhysicsSystem::new());
        systems.configure();
        (World::new(), systems)
    }

    fn body_count(systems: &SystemManager) -> usize {
        systems.system::<PhysicsSystem>().map_or(0, |p| p.body_count())
    }

    #[test]
    fn dynamic_body_falls_down_screen() {
        let (mut world, mut systems) = setup();
        let ball = world.spawn((Locus::at(100.0, 100.0), PhysicsComponent::dynamic(Shape::ball(8.0))));

        for _ in 0..30 {
            systems.update::<PhysicsSystem>(&mut world, 1.0 / 60.0);
        }
        let locus = world.component::<Locus>(ball).copied().unwrap_or_default();
        assert!(locus.position.y > 100.0, "y = {}", locus.position.y);
        assert!((locus.position.x - 100.0).abs() < 1e-3);
        assert!(world.component::<PhysicsComponent>(ball).is_some_and(|p| p.is_simulated()));
    }

    #[test]
    fn fixed_body_stays_put() {
        let (mut world, mut systems) = setup();
        let floor = world.spawn((Locus::at(0.0, 300.0), PhysicsComponent::fixed(Shape::rect(400.0, 20.0))));
        for _ in 0..10 {
            systems.update::<PhysicsSystem>(&mut world, 1.0 / 60.0);
        }
        assert_eq!(world.component::<Locus>(floor).map(|l| l.position), Some(Vec2::new(0.0, 300.0)));
    }

    #[test]
    fn short_frames_accumulate() {
        let (mut world, mut systems) = setup();
        let ball = world.spawn((Locus::at(0.0, 0.0), PhysicsComponent::dynamic(Shape::ball(1.0))));

        systems.update::<PhysicsSystem>(&mut world, 0.001);
        assert_eq!(world.component::<Locus>(ball).map(|l| l.position.y), Some(0.0));

        for _ in 0..20 {
            systems.update::<PhysicsSystem>(&mut world, 0.001);
        }
        assert!(world.component::<Locus>(ball).is_some_and(|l| l.position.y > 0.0));
    }

    #[test]
    fn destroy_and_remove_drop_bodies() {
        let (mut world, mut systems) = setup();
        let a = world.spawn((Locus::default(), PhysicsComponent::dynamic(Shape::ball(1.0))));
        let b = world.spawn((Locus::default(), PhysicsComponent::dynamic(Shape::ball(1.0))));
        systems.update::<PhysicsSystem>(&mut world, 0.0);
        assert_eq!(body_count(&systems), 2);

        world.destroy(a);
        world.remove::<PhysicsComponent>(b);
        systems.update::<PhysicsSystem>(&mut world, 0.0);
        assert_eq!(body_count(&systems), 0);
    }

    #[test]
    fn reassign_rebuilds_body() {
        let (mut world, mut systems) = setup();
        let e = world.spawn((Locus::default(), PhysicsComponent::dynamic(Shape::ball(1.0))));
        systems.update::<PhysicsSystem>(&mut world, 0.0);
        world.assign(e, PhysicsComponent::fixed(Shape::ball(2.0)));
        systems.update::<PhysicsSystem>(&mut world, 0.0);
        assert_eq!(body_count(&systems), 1);
    }

    #[test]
    fn needs_a_locus() {
        let (mut world, mut systems) = setup();
        let e = world.spawn((PhysicsComponent::dynamic(Shape::ball(1.0)),));
        systems.update::<PhysicsSystem>(&mut world, 0.1);
        assert_eq!(body_count(&systems), 0);

        world.assign(e, Locus::default());
        systems.update::<PhysicsSystem>(&mut world, 0.1);
        assert_eq!(body_count(&systems), 1);
    }

    #[test]
    fn kinematic_follows_locus() {
        let (mut world, mut systems) = setup();
        let paddle = world.spawn((Locus::at(10.0, 10.0), PhysicsComponent::kinematic(Shape::rect(4.0, 4.0))));
        systems.update::<PhysicsSystem>(&mut world, 1.0 / 60.0);
        if let Some(locus) = world.component_mut::<Locus>(paddle) {
            locus.position.x = 50.0;
        }
        systems.update::<PhysicsSystem>(&mut world, 1.0 / 60.0);
        assert_eq!(world.component::<Locus>(paddle).map(|l| l.position.x), Some(50.0));
    }
}
