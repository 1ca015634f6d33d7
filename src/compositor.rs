//! Z-sorted layer compositor.
//!
//! Owns the layer set, the camera vector and the attached renderer, and
//! drives one `render_frame` per host tick: clear, update + emit each
//! layer in z order, optional full-screen tone pass, present. Frames
//! arriving faster than the target frame time are skipped without touching
//! layer state.

use std::cell::RefCell;
use std::rc::Rc;

use crate::anim::AnimVector;
use crate::error::{CelError, CelResult};
use crate::geom::{Point, Rect, Tick};
use crate::layer::Layer;
use crate::renderer::{Blend, Renderer};

/// Shared ownership of a layer; the compositor keeps one, hosts may keep
/// others.
pub type LayerHandle = Rc<RefCell<Layer>>;

pub struct Compositor {
    width: u32,
    height: u32,
    back_color: u32,
    layers: Vec<LayerHandle>,
    z_dirty: bool,
    camera: AnimVector,
    red_tone: AnimVector,
    green_blue_tone: AnimVector,
    renderer: Option<Box<dyn Renderer>>,
    /// Minimum milliseconds between rendered frames.
    target_frame_time: i32,
    last_frame: i32,
    fps100: u32,
    frame_counter: i32,
    fps_window_start: i32,
}

impl Compositor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            back_color: 0xFF00_0000,
            layers: Vec::new(),
            z_dirty: false,
            camera: AnimVector::new(),
            red_tone: AnimVector::at(255, 0),
            green_blue_tone: AnimVector::at(255, 255),
            renderer: None,
            target_frame_time: 16,
            last_frame: 0,
            fps100: 0,
            frame_counter: 0,
            fps_window_start: 0,
        }
    }

    /// Attaches the output renderer and aligns the frame clock to its
    /// ticks. Idempotent: a second call keeps the first renderer.
    pub fn initialize(&mut self, renderer: Box<dyn Renderer>) {
        if self.renderer.is_some() {
            return;
        }
        let now = renderer.ticks_ms().0;
        // First render_frame must not be gated away.
        self.last_frame = now - self.target_frame_time;
        self.fps_window_start = now;
        self.frame_counter = 0;
        self.renderer = Some(renderer);
    }

    pub fn is_initialized(&self) -> bool {
        self.renderer.is_some()
    }

    /// Drops all layers (newest first) and the renderer.
    pub fn shutdown(&mut self) {
        while self.layers.pop().is_some() {}
        self.renderer = None;
    }

    // --- layers ----------------------------------------------------------

    pub fn create_layer(&mut self, left: i32, top: i32, width: u32, height: u32, z: i32) -> LayerHandle {
        let handle = Rc::new(RefCell::new(Layer::new(left, top, width, height, z)));
        self.layers.push(handle.clone());
        self.z_dirty = true;
        handle
    }

    pub fn remove_layer(&mut self, layer: &LayerHandle) {
        self.layers.retain(|l| !Rc::ptr_eq(l, layer));
    }

    pub fn clear_layers(&mut self) {
        self.layers.clear();
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Call after changing a layer's z so the next frame re-sorts.
    pub fn mark_z_dirty(&mut self) {
        self.z_dirty = true;
    }

    // --- camera and screen -----------------------------------------------

    /// Camera position vector; pans and shakes go through the usual
    /// animation commands.
    pub fn camera(&self) -> &AnimVector {
        &self.camera
    }

    pub fn red_tone_vector(&self) -> &AnimVector {
        &self.red_tone
    }

    pub fn green_blue_tone_vector(&self) -> &AnimVector {
        &self.green_blue_tone
    }

    pub fn set_back_color(&mut self, argb: u32) {
        self.back_color = argb;
    }

    pub fn back_color(&self) -> u32 {
        self.back_color
    }

    pub fn set_target_frame_time(&mut self, ms: i32) {
        self.target_frame_time = ms.max(0);
    }

    /// Frames per second over the last completed window, times 100.
    pub fn fps100(&self) -> u32 {
        self.fps100
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn center(&self) -> Point {
        Point::new(self.width as i32 / 2, self.height as i32 / 2)
    }

    pub fn screen_to_world(&self, p: Point, t: Tick) -> Point {
        p - self.center() + self.camera.position(t)
    }

    pub fn world_to_screen(&self, p: Point, t: Tick) -> Point {
        p - self.camera.position(t) + self.center()
    }

    // --- frame loop ------------------------------------------------------

    /// Renders one frame at host time `t`. Returns `Ok(false)` when the
    /// frame was skipped by the frame-time gate.
    #[tracing::instrument(skip(self), fields(t = t.0))]
    pub fn render_frame(&mut self, t: Tick) -> CelResult<bool> {
        if self.renderer.is_none() {
            return Err(CelError::fatal("render_frame called without a renderer"));
        }
        if t.0 < self.last_frame + self.target_frame_time {
            return Ok(false);
        }

        if self.z_dirty {
            // Stable: equal-z layers keep creation order.
            self.layers.sort_by_key(|l| l.borrow().z());
            self.z_dirty = false;
        }

        let center = self.center();
        let camera = self.camera.position(t);
        let viewport = (self.width, self.height);
        let screen = Rect::sized(0, 0, self.width as i32, self.height as i32);
        let tone_r = self.red_tone.x(t).clamp(0, 255);
        let tone_g = self.green_blue_tone.x(t).clamp(0, 255);
        let tone_b = self.green_blue_tone.y(t).clamp(0, 255);
        let back = self.back_color;

        let renderer = match self.renderer.as_deref_mut() {
            Some(r) => r,
            None => return Err(CelError::fatal("renderer detached mid-frame")),
        };
        renderer.fill_rect(screen, back, Blend::Alpha)?;
        for layer in &self.layers {
            let mut layer = layer.borrow_mut();
            layer.update(t);
            layer.emit(renderer, camera, center, viewport, t)?;
        }
        if (tone_r, tone_g, tone_b) != (255, 255, 255) {
            let argb = 0xFF00_0000 | (tone_r as u32) << 16 | (tone_g as u32) << 8 | tone_b as u32;
            renderer.fill_rect(screen, argb, Blend::Multiply)?;
        }
        renderer.present()?;

        self.frame_counter += 1;
        let elapsed = t.0 - self.fps_window_start;
        if elapsed >= 1000 {
            self.fps100 = (i64::from(self.frame_counter) * 100_000 / i64::from(elapsed)) as u32;
            self.frame_counter = 0;
            self.fps_window_start = t.0;
        }
        self.last_frame = t.0;
        Ok(true)
    }
}
