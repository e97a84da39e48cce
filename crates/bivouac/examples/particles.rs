//! Particle fountains.
//!
//! One emitter follows the mouse, another circles the centre under a
//! script. Hold the left button to switch the cursor emitter to additive
//! blending; press space for a burst that fades out on its own.

use bivouac::prelude::*;

fn main() {
    App::new("bivouac: particles")
        .size(1024, 768)
        .setup(setup)
        .update(update)
        .run();
}

fn setup(ctx: &mut Context) {
    ctx.systems.add(ScriptSystem);
    ctx.systems.add(ParticleSystem::new().with_gravity(Vec3::new(0.0, 300.0, 0.0)));
    ctx.systems.add(ExpiresSystem);
    ctx.systems.add(BatchRenderSystem::new());

    ctx.world.spawn((
        Tag::new("cursor"),
        Locus::at(512.0, 384.0),
        ParticleEmitter::new(120.0)
            .with_direction(Vec2::new(0.0, -1.0), 0.4)
            .with_speed(260.0)
            .with_life(1.6)
            .with_color([255, 160, 60, 200])
            .with_size(5.0),
    ));

    let mut elapsed = 0.0f64;
    ctx.world.spawn((
        Locus::at(512.0, 384.0),
        ParticleEmitter::new(60.0)
            .with_direction(Vec2::new(1.0, 0.0), std::f32::consts::PI)
            .with_speed(80.0)
            .with_life(2.5)
            .with_friction(0.98)
            .with_color([120, 200, 255, 180])
            .with_size(3.0)
            .with_pass(BlendPass::Additive),
        ScriptComponent::new(move |me, world, dt| {
            elapsed += dt;
            if let Some(locus) = world.component_mut::<Locus>(me) {
                let angle = elapsed as f32 * 1.2;
                locus.position = Vec2::new(512.0, 384.0) + Vec2::from_angle(angle) * 220.0;
            }
        }),
    ));
}

fn update(ctx: &mut Context, dt: f64) {
    if ctx.keys().just_pressed(KeyCode::Escape) {
        ctx.exit();
    }
    let cursor = ctx.cursor().0;
    let additive = ctx.mouse().pressed(MouseButton::Left);
    let burst = ctx.keys().just_pressed(KeyCode::Space);

    if let Some(emitter) = ctx.world.find_tagged("cursor") {
        if let Some(locus) = ctx.world.component_mut::<Locus>(emitter) {
            locus.position = cursor;
        }
        if let Some(settings) = ctx.world.component_mut::<ParticleEmitter>(emitter) {
            settings.pass = if additive { BlendPass::Additive } else { BlendPass::Normal };
        }
    }

    if burst {
        ctx.world.spawn((
            Locus::new(cursor),
            ParticleEmitter::new(600.0)
                .with_direction(Vec2::new(0.0, -1.0), std::f32::consts::PI)
                .with_speed(400.0)
                .with_life(0.8)
                .with_color([255, 255, 255, 255])
                .with_pass(BlendPass::Additive),
            Expires::after(0.15),
        ));
    }

    ctx.systems.update::<ScriptSystem>(&mut ctx.world, dt);
    ctx.systems.update::<ParticleSystem>(&mut ctx.world, dt);
    ctx.systems.update::<ExpiresSystem>(&mut ctx.world, dt);
    ctx.systems.update::<BatchRenderSystem>(&mut ctx.world, dt);
}
