//! Animated sprites from a procedurally drawn atlas.
//!
//! The atlas image is painted in code and described with the same JSON the
//! loader reads from disk. Left/right arrows change the playback speed of
//! every sprite; a negative speed plays backwards.

use bivouac::prelude::*;
use image::{Rgba, RgbaImage};

const FRAME: u32 = 32;
const FRAMES: u32 = 6;

const ANIMATIONS: &str = r#"{
    "pulse": { "fps": 10, "frames": [["blob-0", 1], ["blob-1", 1], ["blob-2", 1], ["blob-3", 1], ["blob-4", 1], ["blob-5", 2]] },
    "blink": { "fps": 4,  "frames": [["blob-0", 3], ["blob-5", 1]] }
}"#;

fn main() {
    App::new("bivouac: sprites")
        .size(800, 600)
        .clear_color(ClearColor::rgb(0.2, 0.2, 0.25))
        .setup(setup)
        .update(update)
        .run();
}

/// A strip of blobs that grow from frame to frame.
fn paint_atlas() -> RgbaImage {
    let mut image = RgbaImage::new(FRAME * FRAMES, FRAME);
    let centre = FRAME as f32 * 0.5;
    for frame in 0..FRAMES {
        let radius = 4.0 + frame as f32 * 2.2;
        let [r, g, b, _] = hsv_to_rgba8(frame as f32 / FRAMES as f32, 0.7, 1.0);
        for y in 0..FRAME {
            for x in 0..FRAME {
                let d = Vec2::new(x as f32 + 0.5 - centre, y as f32 + 0.5 - centre).length();
                let alpha = ((radius - d) * 255.0).clamp(0.0, 255.0) as u8;
                image.put_pixel(frame * FRAME + x, y, Rgba([r, g, b, alpha]));
            }
        }
    }
    image
}

fn describe_atlas() -> String {
    let sprites: Vec<String> = (0..FRAMES)
        .map(|i| {
            format!(
                r#"{{ "name": "blob-{i}", "frame": {{ "x": {}, "y": 0, "w": {FRAME}, "h": {FRAME} }}, "registration": [{}, {}] }}"#,
                i * FRAME,
                FRAME / 2,
                FRAME / 2
            )
        })
        .collect();
    format!(r#"{{ "sprites": [{}] }}"#, sprites.join(","))
}

fn setup(ctx: &mut Context) {
    let atlas = match TextureAtlas::from_image(paint_atlas(), &describe_atlas()) {
        Ok(atlas) => atlas,
        Err(e) => {
            log::error!("Could not build atlas: {e}");
            return;
        }
    };
    let texture = upload_atlas(&mut ctx.world, &atlas);

    let animations = ctx.systems.add(SpriteAnimationSystem::from_json(&atlas, ANIMATIONS));
    let pulse = animations.sprite_animation("pulse");
    let blink = animations.sprite_animation("blink");

    ctx.systems.add(BatchRenderSystem::new()).set_texture(texture);

    for row in 0..6 {
        for col in 0..8 {
            let animation = if (row + col) % 3 == 0 { blink } else { pulse };
            let locus = Locus::at(80.0 + col as f32 * 90.0, 70.0 + row as f32 * 90.0)
                .with_scale(Vec2::splat(2.0));
            ctx.world
                .spawn((locus, animation.starting_at((row * 8 + col) as usize % FRAMES as usize)));
        }
    }
}

fn update(ctx: &mut Context, dt: f64) {
    if ctx.keys().just_pressed(KeyCode::Escape) {
        ctx.exit();
    }
    let keys = ctx.keys();
    let change = match (keys.just_pressed(KeyCode::ArrowLeft), keys.just_pressed(KeyCode::ArrowRight)) {
        (true, false) => -0.5,
        (false, true) => 0.5,
        _ => 0.0,
    };
    if change != 0.0 {
        ctx.world.query::<(&mut SpriteAnimation,)>(|_, (animation,)| {
            animation.speed += change;
        });
    }

    ctx.systems.update::<SpriteAnimationSystem>(&mut ctx.world, dt);
    ctx.systems.update::<BatchRenderSystem>(&mut ctx.world, dt);
}
