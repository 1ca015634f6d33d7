//! Layer-level scenarios: property-driven frame loading, playback
//! scheduling with uneven delays, and draw emission details.

use celgraph::{
    AnimationType, Blend, Canvas, Flip, Layer, MemoryProperty, PlayState, Point, RecordingRenderer,
    Tick, populate_layer,
};

fn solid_frame(argb: u32, delay: i64, w: u32, h: u32) -> MemoryProperty {
    MemoryProperty::canvas(Canvas::solid(w, h, argb, Point::ZERO))
        .with_child("delay", MemoryProperty::int(delay))
}

fn emit_quads(layer: &mut Layer, t: Tick) -> Vec<celgraph::DrawQuad> {
    let (mut renderer, log) = RecordingRenderer::new();
    layer.update(t);
    layer
        .emit(&mut renderer, Point::ZERO, Point::ZERO, (800, 600), t)
        .unwrap();
    let quads = log.borrow().quads();
    quads
}

#[test]
fn populated_sprite_plays_with_uneven_delays() {
    let sprite = MemoryProperty::map()
        .with_child("0", solid_frame(0xFF11_0000, 120, 8, 8))
        .with_child("1", solid_frame(0xFF22_0000, 80, 8, 8))
        .with_child("2", solid_frame(0xFF33_0000, 100, 8, 8));
    let mut layer = Layer::new(0, 0, 8, 8, 0);
    populate_layer(&mut layer, &sprite, Tick(0)).unwrap();
    layer.animate(AnimationType::Loop, 1000, -1).unwrap();

    layer.update(Tick(0));
    assert_eq!(layer.current_frame(), 0);
    layer.update(Tick(119));
    assert_eq!(layer.current_frame(), 0);
    layer.update(Tick(120));
    assert_eq!(layer.current_frame(), 1);
    layer.update(Tick(200));
    assert_eq!(layer.current_frame(), 2);
    // Full cycle is 300ms; loop position is exact even after a long gap:
    // 620 sits 20ms into the third cycle, inside frame 0.
    layer.update(Tick(620));
    assert_eq!(layer.current_frame(), 0);
    layer.update(Tick(750));
    assert_eq!(layer.current_frame(), 1);
    assert_eq!(layer.play_state(), PlayState::Playing);
}

#[test]
fn zoom_envelope_scales_the_emitted_quad() {
    let mut layer = Layer::new(0, 0, 0, 0, 0);
    let canvas = Canvas::solid(100, 50, 0xFFFF_FFFF, Point::ZERO);
    layer.insert_frame(canvas, 200, 255, 255, 500, 1000);

    let at_start = emit_quads(&mut layer, Tick(0));
    assert_eq!((at_start[0].width, at_start[0].height), (50, 25));

    let mut layer2 = Layer::new(0, 0, 0, 0, 0);
    let canvas = Canvas::solid(100, 50, 0xFFFF_FFFF, Point::ZERO);
    layer2.insert_frame(canvas, 200, 255, 255, 500, 1000);
    layer2.update(Tick(0));
    let at_end = emit_quads(&mut layer2, Tick(200));
    assert_eq!((at_end[0].width, at_end[0].height), (100, 50));
}

#[test]
fn origin_is_subtracted_scaled_by_zoom() {
    let mut layer = Layer::new(300, 200, 0, 0, 0);
    let canvas = Canvas::solid(40, 40, 0xFFFF_FFFF, Point::new(20, 40));
    layer.insert_frame(canvas, 100, 255, 255, 500, 500);
    layer.set_screen_space(true, false);
    let quads = emit_quads(&mut layer, Tick(0));
    // Origin (20, 40) at half zoom pulls the quad back by (10, 20).
    assert_eq!((quads[0].x, quads[0].y), (290, 180));
    assert_eq!((quads[0].width, quads[0].height), (20, 20));
}

#[test]
fn blend_and_flip_reach_the_draw_call() {
    let mut layer = Layer::new(0, 0, 0, 0, 0);
    let canvas = Canvas::solid(4, 4, 0xFFFF_FFFF, Point::ZERO);
    layer.insert_frame(canvas, 100, 255, 255, 1000, 1000);
    layer.set_blend(2);
    layer.set_flip(Flip::Horizontal);
    let quads = emit_quads(&mut layer, Tick(0));
    assert_eq!(quads[0].blend, Blend::Add);
    assert_eq!(quads[0].flip, Flip::Horizontal);
}

#[test]
fn fade_in_ramp_modulates_emitted_alpha() {
    let sprite = MemoryProperty::map()
        .with_child("0", solid_frame(0xFFFF_FFFF, 100, 4, 4))
        .with_child("1", solid_frame(0xFFFF_FFFF, 100, 4, 4))
        .with_child("a0", MemoryProperty::int(0));
    let mut layer = Layer::new(0, 0, 4, 4, 0);
    populate_layer(&mut layer, &sprite, Tick(0)).unwrap();

    layer.update(Tick(0));
    assert_eq!(layer.color(Tick(0)).a, 0);
    assert_eq!(layer.color(Tick(100)).a, 127);
    assert_eq!(layer.color(Tick(200)).a, 255);
    assert_eq!(layer.color(Tick(9999)).a, 255);
}

#[test]
fn hidden_or_empty_layers_emit_nothing() {
    let (mut renderer, log) = RecordingRenderer::new();
    let mut empty = Layer::new(0, 0, 4, 4, 0);
    empty.update(Tick(0));
    empty
        .emit(&mut renderer, Point::ZERO, Point::ZERO, (100, 100), Tick(0))
        .unwrap();
    assert!(log.borrow().ops.is_empty());

    let mut hidden = Layer::new(0, 0, 4, 4, 0);
    let canvas = Canvas::solid(4, 4, 0xFFFF_FFFF, Point::ZERO);
    hidden.insert_frame(canvas, 100, 255, 255, 1000, 1000);
    hidden.set_visible(false);
    hidden.update(Tick(0));
    hidden
        .emit(&mut renderer, Point::ZERO, Point::ZERO, (100, 100), Tick(0))
        .unwrap();
    assert!(log.borrow().ops.is_empty());
}

#[test]
fn tiled_layer_covers_the_viewport() {
    let mut layer = Layer::new(130, 0, 0, 0, 0);
    let canvas = Canvas::solid(100, 600, 0xFF44_8844, Point::ZERO);
    layer.insert_frame(canvas, 100, 255, 255, 1000, 1000);
    layer.set_screen_space(true, false);
    layer.set_tiling(100, 0);
    let quads = emit_quads(&mut layer, Tick(0));
    let xs: Vec<i32> = quads.iter().map(|q| q.x).collect();
    // Starts left of the viewport edge and covers through 800px.
    assert_eq!(xs, vec![-70, 30, 130, 230, 330, 430, 530, 630, 730]);
    assert!(quads.iter().all(|q| q.y == 0));
}

#[test]
fn animated_position_vector_moves_the_layer() {
    let mut layer = Layer::new(0, 0, 0, 0, 0);
    let canvas = Canvas::solid(4, 4, 0xFFFF_FFFF, Point::ZERO);
    layer.insert_frame(canvas, 100, 255, 255, 1000, 1000);
    layer.set_screen_space(true, false);
    layer
        .position_vector()
        .rel_move(200, 0, Tick(0), Tick(400), false, false, false);

    let quads = emit_quads(&mut layer, Tick(200));
    assert_eq!(quads[0].x, 100);
    assert_eq!(layer.left(), 100);
}
