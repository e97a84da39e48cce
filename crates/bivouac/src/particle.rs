//! # Particles: Emitters and Verlet Integration
//!
//! A [`ParticleEmitter`] on an entity with a [`Locus`] spawns particle
//! entities at a steady rate. Each particle carries a [`Particle`] (its
//! verlet state), its own `Locus` and a small box [`Mesh`], so the batch
//! renderer draws it like anything else.
//!
//! ## Verlet Step
//!
//! ```text
//! velocity = position - previous
//! previous = position
//! position = position + velocity * friction + gravity * dt²
//! ```
//!
//! `x`/`y` go to the particle's locus position and `z` to its render layer.
//! A particle whose life reaches zero is destroyed. Existing particles are
//! stepped before new ones are emitted, so a fresh particle starts its first
//! frame at the emitter.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ecs::{Entity, System, World};
use crate::locus::{Locus, world_matrix};
use crate::math::{Rect, Vec2, Vec3};
use crate::mesh::Mesh;
use crate::render::batch::{BlendPass, RenderData};

/// Spawns particles from its entity's locus.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleEmitter {
    /// Particles per second.
    pub rate: f32,
    /// Launch direction; need not be normalized.
    pub direction: Vec2,
    /// Random deviation either side of `direction`, in radians.
    pub spread: f32,
    /// Launch speed in units per second.
    pub speed: f32,
    /// Seconds each particle lives.
    pub life: f32,
    /// Fraction of velocity kept per step; 1 keeps it all.
    pub friction: f32,
    pub color: [u8; 4],
    /// Edge length of each particle's box mesh.
    pub size: f32,
    pub pass: BlendPass,
    pub enabled: bool,
    accumulator: f32,
}

impl ParticleEmitter {
    pub fn new(rate: f32) -> Self {
        Self {
            rate,
            ..Self::default()
        }
    }

    pub fn with_direction(mut self, direction: Vec2, spread: f32) -> Self {
        self.direction = direction;
        self.spread = spread;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_life(mut self, life: f32) -> Self {
        self.life = life;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_color(mut self, color: [u8; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn with_pass(mut self, pass: BlendPass) -> Self {
        self.pass = pass;
        self
    }

    /// Particles due after `dt` more seconds; the fraction carries over.
    fn due(&mut self, dt: f32) -> usize {
        if !self.enabled || self.rate <= 0.0 {
            return 0;
        }
        self.accumulator += self.rate * dt;
        let count = self.accumulator.floor();
        self.accumulator -= count;
        count as usize
    }
}

impl Default for ParticleEmitter {
    fn default() -> Self {
        Self {
            rate: 30.0,
            direction: Vec2::new(0.0, -1.0),
            spread: 0.3,
            speed: 120.0,
            life: 1.5,
            friction: 0.98,
            color: [255, 255, 255, 255],
            size: 4.0,
            pass: BlendPass::Normal,
            enabled: true,
            accumulator: 0.0,
        }
    }
}

/// Verlet state of one particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    pub previous: Vec3,
    pub friction: f32,
    /// Seconds left.
    pub life: f32,
    pub rotation: f32,
    pub scale: Vec2,
}

impl Particle {
    /// A particle at rest at `position`.
    pub fn at(position: Vec3, life: f32) -> Self {
        Self {
            position,
            previous: position,
            friction: 1.0,
            life,
            rotation: 0.0,
            scale: Vec2::ONE,
        }
    }

    /// Give the particle `velocity` (units per second) for steps of `dt`.
    pub fn launched(mut self, velocity: Vec3, dt: f32) -> Self {
        self.previous = self.position - velocity * dt;
        self
    }

    fn integrate(&mut self, gravity: Vec3, dt: f32) {
        let position = self.position;
        let velocity = position - self.previous;
        self.position = position + velocity * self.friction + gravity * dt * dt;
        self.previous = position;
    }

    fn sync(&self, locus: &mut Locus) {
        locus.position = Vec2::new(self.position.x, self.position.y);
        locus.render_layer = self.position.z as i32;
        locus.rotation = self.rotation;
        locus.scale = self.scale;
    }
}

/// Emits and integrates particles.
#[derive(Debug)]
pub struct ParticleSystem {
    gravity: Vec3,
    rng: StdRng,
}

impl ParticleSystem {
    pub fn new() -> Self {
        Self {
            gravity: Vec3::ZERO,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic launch directions.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            gravity: Vec3::ZERO,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Units per second squared; y down.
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    fn emit(&mut self, world: &mut World, dt: f32) {
        let mut spawns: Vec<(ParticleEmitter, Vec3, usize)> = Vec::new();
        for entity in world.matching::<(&ParticleEmitter, &Locus)>() {
            let origin = {
                let Some(locus) = world.component::<Locus>(entity) else {
                    continue;
                };
                let at = world_matrix(world, entity).translation;
                Vec3::new(at.x, at.y, locus.render_layer as f32)
            };
            let Some(emitter) = world.component_mut::<ParticleEmitter>(entity) else {
                continue;
            };
            let count = emitter.due(dt);
            if count > 0 {
                spawns.push((emitter.clone(), origin, count));
            }
        }

        for (emitter, origin, count) in spawns {
            for _ in 0..count {
                self.spawn_particle(world, &emitter, origin, dt);
            }
        }
    }

    fn spawn_particle(&mut self, world: &mut World, emitter: &ParticleEmitter, origin: Vec3, dt: f32) -> Entity {
        let deviation = if emitter.spread > 0.0 {
            self.rng.gen_range(-emitter.spread..=emitter.spread)
        } else {
            0.0
        };
        let heading = Vec2::from_angle(deviation).rotate(emitter.direction.normalize_or_zero());
        let velocity = (heading * emitter.speed).extend(0.0);

        let mut particle = Particle::at(origin, emitter.life).launched(velocity, dt.max(1.0 / 60.0));
        particle.friction = emitter.friction;
        particle.rotation = self.rng.gen_range(0.0..std::f32::consts::TAU);

        let mut locus = Locus::default();
        particle.sync(&mut locus);
        let mut mesh = Mesh::from_box(Rect::centered(Vec2::splat(emitter.size)));
        mesh.set_color(emitter.color);

        let entity = world.spawn((particle, locus, mesh));
        if emitter.pass != BlendPass::Normal {
            world.assign(entity, RenderData::of(entity).with_pass(emitter.pass));
        }
        entity
    }

    fn integrate(&mut self, world: &mut World, dt: f32) {
        let gravity = self.gravity;
        let mut dead: Vec<Entity> = Vec::new();
        world.query::<(&mut Particle, &mut Locus)>(|entity, (particle, locus)| {
            particle.life -= dt;
            if particle.life > 0.0 {
                particle.integrate(gravity, dt);
                particle.sync(locus);
            } else {
                dead.push(entity);
            }
        });
        for entity in dead {
            world.destroy(entity);
        }
    }
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ParticleSystem {
    fn update(&mut self, world: &mut World, dt: f64) {
        let dt = dt as f32;
        self.integrate(world, dt);
        self.emit(world, dt);
    }
}
