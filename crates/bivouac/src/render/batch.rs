//! # Batch Render System: Every Mesh in One Strip
//!
//! Each frame the [`BatchRenderSystem`] concatenates every visible [`Mesh`]
//! into one triangle strip per [`BlendPass`] and draws each strip with a
//! single call.
//!
//! ## Gathering
//!
//! The cached geometry list holds (mesh entity, locus entity, layer override,
//! pass):
//!
//! - every entity with both a [`Locus`] and a [`Mesh`], on its locus'
//!   `render_layer`, in the normal pass;
//! - every entity with a [`RenderData`] whose mesh and locus entities are
//!   alive, on the override layer (or the locus layer) and in its pass. Such
//!   an entity is not gathered a second time as a plain pair.
//!
//! It is only rebuilt when empty; any Mesh, Locus or RenderData being added
//! or removed, or an entity holding one being destroyed, empties it. Every
//! update re-reads each locus' `render_layer` and stable-sorts the list, so
//! re-layering in place takes effect on the next update and meshes on the
//! same layer keep their order.
//!
//! ## Joining Strips
//!
//! ```text
//! mesh A: a0 a1 a2 a3          mesh B: b0 b1 b2 b3
//! strip:  a0 a1 a2 a3 a3 b0 b0 b1 b2 b3
//!                     └─┬─┘
//!            degenerate pair: zero-area triangles
//! ```
//!
//! `n` meshes with `V` vertices in total give `V + 2(n − 1)` vertices.

use crate::ecs::{Entity, Event, Subscriptions, System, World};
use crate::locus::{Locus, world_matrix};
use crate::mesh::{Mesh, Vertex};

use super::gpu::GpuContext;
use super::strip::{StripRenderer, StripVertex};
use super::texture::{TextureHandle, TextureStore};

/// How a strip is composited onto what is already drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendPass {
    /// Premultiplied alpha over.
    #[default]
    Normal,
    /// Added to the framebuffer, for glows and sparks.
    Additive,
}

impl BlendPass {
    /// Draw order.
    pub const ALL: [BlendPass; 2] = [BlendPass::Normal, BlendPass::Additive];

    pub(crate) fn index(self) -> usize {
        match self {
            BlendPass::Normal => 0,
            BlendPass::Additive => 1,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            BlendPass::Normal => "normal strip",
            BlendPass::Additive => "additive strip",
        }
    }
}

/// Draw another entity's mesh at a third entity's locus, optionally on a
/// different layer or pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderData {
    pub mesh: Entity,
    pub locus: Entity,
    /// Replaces the locus' `render_layer` when set.
    pub layer: Option<i32>,
    pub pass: BlendPass,
}

impl RenderData {
    pub fn new(mesh: Entity, locus: Entity) -> Self {
        Self {
            mesh,
            locus,
            layer: None,
            pass: BlendPass::Normal,
        }
    }

    /// Mesh and locus both on `entity`.
    pub fn of(entity: Entity) -> Self {
        Self::new(entity, entity)
    }

    pub fn with_layer(mut self, layer: i32) -> Self {
        self.layer = Some(layer);
        self
    }

    pub fn with_pass(mut self, pass: BlendPass) -> Self {
        self.pass = pass;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Geometry {
    mesh: Entity,
    locus: Entity,
    layer_override: Option<i32>,
    /// Sort key as of the last update.
    layer: i32,
    pass: BlendPass,
}

/// Assembles and draws every mesh.
#[derive(Debug, Default)]
pub struct BatchRenderSystem {
    geometry: Vec<Geometry>,
    vertices: [Vec<Vertex>; 2],
    texture: TextureHandle,
}

impl BatchRenderSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `texture` for every mesh.
    pub fn set_texture(&mut self, texture: TextureHandle) {
        self.texture = texture;
    }

    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    /// Drop the cached geometry list; it is rebuilt on the next update.
    pub fn invalidate(&mut self) {
        self.geometry.clear();
    }

    /// The assembled normal-pass strip.
    pub fn vertices(&self) -> &[Vertex] {
        self.vertices_for(BlendPass::Normal)
    }

    pub fn vertices_for(&self, pass: BlendPass) -> &[Vertex] {
        &self.vertices[pass.index()]
    }

    /// Mesh entities in draw order, as of the last update.
    pub fn drawn_entities(&self) -> Vec<Entity> {
        self.geometry.iter().map(|g| g.mesh).collect()
    }

    fn rebuild(&mut self, world: &World) {
        self.geometry.clear();
        for entity in world.entities() {
            if let Some(data) = world.component::<RenderData>(entity) {
                let (Some(locus), true) = (world.component::<Locus>(data.locus), world.has::<Mesh>(data.mesh))
                else {
                    continue;
                };
                self.geometry.push(Geometry {
                    mesh: data.mesh,
                    locus: data.locus,
                    layer_override: data.layer,
                    layer: data.layer.unwrap_or(locus.render_layer),
                    pass: data.pass,
                });
            } else if let (Some(locus), true) = (world.component::<Locus>(entity), world.has::<Mesh>(entity)) {
                self.geometry.push(Geometry {
                    mesh: entity,
                    locus: entity,
                    layer_override: None,
                    layer: locus.render_layer,
                    pass: BlendPass::Normal,
                });
            }
        }
        log::debug!("Rebuilt render geometry: {} mesh(es)", self.geometry.len());
    }

    /// Pick up live `render_layer`s and restore layer order.
    fn sort(&mut self, world: &World) {
        for g in &mut self.geometry {
            if let Some(layer) = g.layer_override {
                g.layer = layer;
            } else if let Some(locus) = world.component::<Locus>(g.locus) {
                g.layer = locus.render_layer;
            }
        }
        self.geometry.sort_by_key(|g| g.layer);
    }

    fn assemble(&mut self, world: &World) {
        for strip in &mut self.vertices {
            strip.clear();
        }
        for g in &self.geometry {
            let (Some(mesh), true) = (world.component::<Mesh>(g.mesh), world.has::<Locus>(g.locus)) else {
                continue;
            };
            if mesh.is_empty() {
                continue;
            }
            let matrix = world_matrix(world, g.locus);
            let transform = |v: &Vertex| Vertex {
                position: matrix.transform_point2(v.position),
                ..*v
            };

            let strip = &mut self.vertices[g.pass.index()];
            if let Some(&last) = strip.last() {
                strip.push(last);
                strip.push(transform(&mesh.vertices[0]));
            }
            strip.extend(mesh.vertices.iter().map(transform));
        }
    }

    /// Upload the assembled strips to the renderer's vertex buffers.
    pub fn prepare(&self, renderer: &mut StripRenderer, gpu: &GpuContext) {
        for pass in BlendPass::ALL {
            let strip: Vec<StripVertex> = self.vertices_for(pass).iter().map(StripVertex::from).collect();
            renderer.upload(gpu, pass, &strip);
        }
    }

    /// Record one draw per non-empty pass, normal first.
    pub fn draw(&self, renderer: &StripRenderer, textures: &TextureStore, render_pass: &mut wgpu::RenderPass<'_>) {
        let texture = textures.bind_group(self.texture);
        for pass in BlendPass::ALL {
            if !self.vertices_for(pass).is_empty() {
                renderer.draw(render_pass, pass, texture);
            }
        }
    }
}

impl System for BatchRenderSystem {
    fn configure(&mut self, subscriptions: &mut Subscriptions) {
        subscriptions
            .added::<Mesh>()
            .removed::<Mesh>()
            .added::<RenderData>()
            .removed::<RenderData>()
            .added::<Locus>()
            .removed::<Locus>()
            .destroyed();
    }

    fn receive(&mut self, world: &mut World, event: &Event) {
        match event {
            Event::EntityDestroyed { entity, .. } => {
                let entity = *entity;
                let referenced = self.geometry.iter().any(|g| g.mesh == entity || g.locus == entity);
                if referenced || event.had::<Mesh>(world) || event.had::<RenderData>(world) {
                    self.invalidate();
                }
            }
            _ => self.invalidate(),
        }
    }

    fn update(&mut self, world: &mut World, _dt: f64) {
        if self.geometry.is_empty() {
            self.rebuild(world);
        }
        self.sort(world);
        self.assemble(world);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::SystemManager;
    use crate::math::{Rect, Vec2};

    fn setup() -> (World, SystemManager) {
        let mut systems = SystemManager::new();
        systems.add(BatchRenderSystem::new());
        systems.configure();
        (World::new(), systems)
    }

    fn unit_box() -> Mesh {
        Mesh::from_box(Rect::new(0.0, 0.0, 1.0, 1.0))
    }

    fn render(world: &mut World, systems: &mut SystemManager) {
        systems.update::<BatchRenderSystem>(world, 0.016);
    }

    fn batch(systems: &SystemManager) -> &BatchRenderSystem {
        systems
            .system::<BatchRenderSystem>()
            .unwrap_or_else(|| panic!("BatchRenderSystem not registered"))
    }

    #[test]
    fn vertex_count_includes_degenerates() {
        let (mut world, mut systems) = setup();
        world.spawn((Locus::at(0.0, 0.0), unit_box()));
        world.spawn((Locus::at(10.0, 0.0), unit_box()));
        let mut circle = Mesh::default();
        circle.set_as_circle(Vec2::splat(5.0), 0.0, std::f32::consts::TAU, 3);
        world.spawn((Locus::at(20.0, 0.0), circle));
        render(&mut world, &mut systems);

        let v = batch(&systems).vertices();
        assert_eq!(v.len(), 4 + 4 + 15 + 2 * 2);
        // degenerate pair between the first two boxes
        assert_eq!(v[4], v[3]);
        assert_eq!(v[5], v[6]);
        assert_eq!(v[6].position, Vec2::new(11.0, 0.0));
    }

    #[test]
    fn single_mesh_has_no_degenerates() {
        let (mut world, mut systems) = setup();
        world.spawn((Locus::default(), unit_box()));
        render(&mut world, &mut systems);
        assert_eq!(batch(&systems).vertices().len(), 4);
    }

    #[test]
    fn empty_world_draws_nothing() {
        let (mut world, mut systems) = setup();
        render(&mut world, &mut systems);
        assert!(batch(&systems).vertices().is_empty());
        assert!(batch(&systems).vertices_for(BlendPass::Additive).is_empty());
    }

    #[test]
    fn vertices_are_transformed_by_locus() {
        let (mut world, mut systems) = setup();
        let parent = world.spawn((Locus::at(100.0, 50.0),));
        world.spawn((
            Locus::at(10.0, 20.0).with_scale(Vec2::splat(2.0)).with_parent(parent),
            unit_box(),
        ));
        render(&mut world, &mut systems);
        let v = batch(&systems).vertices();
        // upper-right (1, 0) scaled by 2 then moved by both loci
        assert_eq!(v[0].position, Vec2::new(112.0, 70.0));
        assert_eq!(v[3].position, Vec2::new(110.0, 72.0));
    }

    #[test]
    fn stable_sort_by_layer() {
        let (mut world, mut systems) = setup();
        let a = world.spawn((Locus::default().with_layer(1), unit_box()));
        let b = world.spawn((Locus::default().with_layer(0), unit_box()));
        let c = world.spawn((Locus::default().with_layer(1), unit_box()));
        let d = world.spawn((Locus::default().with_layer(0), unit_box()));
        let e = world.spawn((Locus::default().with_layer(-3), unit_box()));
        render(&mut world, &mut systems);
        assert_eq!(batch(&systems).drawn_entities(), vec![e, b, d, a, c]);
    }

    #[test]
    fn new_mesh_invalidates_cache() {
        let (mut world, mut systems) = setup();
        world.spawn((Locus::default(), unit_box()));
        render(&mut world, &mut systems);
        assert_eq!(batch(&systems).drawn_entities().len(), 1);

        world.spawn((Locus::default(), unit_box()));
        render(&mut world, &mut systems);
        assert_eq!(batch(&systems).drawn_entities().len(), 2);
        assert_eq!(batch(&systems).vertices().len(), 10);
    }

    #[test]
    fn relayering_in_place_resorts() {
        let (mut world, mut systems) = setup();
        let a = world.spawn((Locus::default(), unit_box()));
        let b = world.spawn((Locus::default(), unit_box()));
        let c = world.spawn((Locus::default(), unit_box()));
        render(&mut world, &mut systems);
        assert_eq!(batch(&systems).drawn_entities(), vec![a, b, c]);

        if let Some(locus) = world.component_mut::<Locus>(a) {
            locus.render_layer = 5;
        }
        render(&mut world, &mut systems);
        assert_eq!(batch(&systems).drawn_entities(), vec![b, c, a]);

        if let Some(locus) = world.component_mut::<Locus>(a) {
            locus.render_layer = -1;
        }
        render(&mut world, &mut systems);
        assert_eq!(batch(&systems).drawn_entities(), vec![a, b, c]);
    }

    #[test]
    fn moving_particles_are_resorted() {
        use crate::math::Vec3;
        use crate::particle::{ParticleEmitter, ParticleSystem};

        let (mut world, mut systems) = setup();
        systems.add(ParticleSystem::with_seed(3).with_gravity(Vec3::new(0.0, 0.0, 4000.0)));
        let emitter = world.spawn((Locus::default(), ParticleEmitter::new(120.0).with_life(10.0)));
        let wall = world.spawn((Locus::default().with_layer(5), unit_box()));

        systems.update::<ParticleSystem>(&mut world, 1.0 / 60.0);
        render(&mut world, &mut systems);
        let particle = batch(&systems).drawn_entities()[0];
        assert_ne!(particle, wall);
        assert_ne!(particle, emitter);

        for _ in 0..5 {
            systems.update::<ParticleSystem>(&mut world, 1.0 / 60.0);
            render(&mut world, &mut systems);
        }
        let layer = world.component::<Locus>(particle).map_or(0, |l| l.render_layer);
        assert!(layer > 5, "particle layer {layer}");
        let order = batch(&systems).drawn_entities();
        let wall_at = order.iter().position(|&e| e == wall);
        let particle_at = order.iter().position(|&e| e == particle);
        assert!(wall_at < particle_at, "draw order {order:?}");
    }

    #[test]
    fn destroyed_entity_is_not_drawn() {
        let (mut world, mut systems) = setup();
        let a = world.spawn((Locus::default(), unit_box()));
        let b = world.spawn((Locus::default(), unit_box()));
        render(&mut world, &mut systems);

        world.destroy(a);
        render(&mut world, &mut systems);
        assert_eq!(batch(&systems).drawn_entities(), vec![b]);
        assert_eq!(batch(&systems).vertices().len(), 4);
    }

    #[test]
    fn removed_mesh_is_not_drawn() {
        let (mut world, mut systems) = setup();
        let a = world.spawn((Locus::default(), unit_box()));
        render(&mut world, &mut systems);
        world.remove::<Mesh>(a);
        render(&mut world, &mut systems);
        assert!(batch(&systems).drawn_entities().is_empty());
    }

    #[test]
    fn render_data_overrides_layer_and_pass() {
        let (mut world, mut systems) = setup();
        let plain = world.spawn((Locus::default(), unit_box()));
        let shared_mesh = world.spawn((unit_box(),));
        let anchor = world.spawn((Locus::at(5.0, 5.0).with_layer(10),));
        let glow = world.spawn((
            RenderData::new(shared_mesh, anchor)
                .with_layer(-1)
                .with_pass(BlendPass::Additive),
        ));
        let _ = glow;
        render(&mut world, &mut systems);

        let system = batch(&systems);
        assert_eq!(system.drawn_entities(), vec![shared_mesh, plain]);
        assert_eq!(system.vertices().len(), 4);
        let additive = system.vertices_for(BlendPass::Additive);
        assert_eq!(additive.len(), 4);
        assert_eq!(additive[1].position, Vec2::new(5.0, 5.0));
    }

    #[test]
    fn own_render_data_is_not_gathered_twice() {
        let (mut world, mut systems) = setup();
        let e = world.spawn((Locus::default(), unit_box()));
        world.assign(e, RenderData::of(e).with_pass(BlendPass::Additive));
        render(&mut world, &mut systems);
        let system = batch(&systems);
        assert_eq!(system.drawn_entities(), vec![e]);
        assert!(system.vertices().is_empty());
        assert_eq!(system.vertices_for(BlendPass::Additive).len(), 4);
    }

    #[test]
    fn render_data_with_dead_reference_is_skipped() {
        let (mut world, mut systems) = setup();
        let mesh = world.spawn((unit_box(),));
        let anchor = world.spawn((Locus::default(),));
        world.spawn((RenderData::new(mesh, anchor),));
        world.destroy(anchor);
        render(&mut world, &mut systems);
        assert!(batch(&systems).drawn_entities().is_empty());
    }

    #[test]
    fn colors_and_tex_coords_pass_through() {
        let (mut world, mut systems) = setup();
        let mut mesh = unit_box();
        mesh.set_color([1, 2, 3, 4]);
        mesh.vertices[2].tex_coord = Vec2::new(0.5, 0.75);
        world.spawn((Locus::at(3.0, 3.0), mesh));
        render(&mut world, &mut systems);
        let v = batch(&systems).vertices();
        assert!(v.iter().all(|v| v.color == [1, 2, 3, 4]));
        assert_eq!(v[2].tex_coord, Vec2::new(0.5, 0.75));
    }
}
