//! Frame-sequenced layers.
//!
//! A layer owns an ordered list of frames (canvas + delay + alpha/zoom
//! envelope), a frame-advance state machine, and four animation vectors:
//! position, alpha, red tone and green-blue tone. `update` advances the
//! frame machine against the host clock; `emit` turns the current frame
//! into renderer draw calls with parallax, tiling, zoom, flip and color
//! modulation applied.

use crate::anim::AnimVector;
use crate::canvas::CanvasHandle;
use crate::error::{CelError, CelResult};
use crate::geom::{Color, Flip, Point, Tick};
use crate::renderer::{Blend, DrawQuad, Renderer, TextureId};

/// Frame-advance mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AnimationType {
    /// Forward once, then stop on the last frame.
    #[default]
    Normal,
    /// Forward forever (or until the repeat budget runs out).
    Loop,
    /// Forward then backward, reversing at both ends.
    PingPong,
    /// Backward once from the last frame.
    Reverse,
    /// Backward forever.
    ReverseLoop,
    /// Like `Normal` but restarts from frame 0.
    First,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayState {
    /// Never animated; shows the current frame statically.
    #[default]
    Idle,
    Playing,
    Stopped,
}

/// One cel: pixels plus its timing and fade/zoom envelope.
#[derive(Clone, Debug)]
pub struct Frame {
    pub canvas: CanvasHandle,
    /// Registration point inside the canvas; copied from the canvas at
    /// insertion but overridable per frame.
    pub origin: Point,
    pub delay_ms: i32,
    pub alpha0: u8,
    pub alpha1: u8,
    /// Zoom per-mille at frame start / end (1000 = native size).
    pub zoom0: i32,
    pub zoom1: i32,
    pub(crate) texture: Option<TextureId>,
}

#[derive(Debug)]
pub struct Layer {
    width: u32,
    height: u32,
    z: i32,
    visible: bool,
    screen_space: bool,
    center_based: bool,
    flip: Flip,
    blend_raw: i32,
    tile_x: i32,
    tile_y: i32,
    parallax_rx: i32,
    parallax_ry: i32,

    frames: Vec<Frame>,
    current: usize,

    state: PlayState,
    mode: AnimationType,
    reverse: bool,
    /// Per-mille multiplier on frame delays (1000 = native speed).
    delay_rate: i32,
    repeat_count: i32,
    repeat_counter: i32,
    /// Tick at which the current frame started.
    frame_clock: Option<i32>,

    cur_alpha: u8,
    cur_zoom: i32,
    render_disabled: bool,
    left: i32,
    top: i32,

    position: AnimVector,
    alpha: AnimVector,
    red_tone: AnimVector,
    green_blue_tone: AnimVector,
}

impl Layer {
    pub fn new(left: i32, top: i32, width: u32, height: u32, z: i32) -> Self {
        Self {
            width,
            height,
            z,
            visible: true,
            screen_space: false,
            center_based: false,
            flip: Flip::None,
            blend_raw: 0,
            tile_x: 0,
            tile_y: 0,
            parallax_rx: 0,
            parallax_ry: 0,
            frames: Vec::new(),
            current: 0,
            state: PlayState::Idle,
            mode: AnimationType::Normal,
            reverse: false,
            delay_rate: 1000,
            repeat_count: -1,
            repeat_counter: 0,
            frame_clock: None,
            cur_alpha: 255,
            cur_zoom: 1000,
            render_disabled: false,
            left,
            top,
            position: AnimVector::at(left, top),
            alpha: AnimVector::at(255, 0),
            red_tone: AnimVector::at(255, 0),
            green_blue_tone: AnimVector::at(255, 255),
        }
    }

    // --- frame list ------------------------------------------------------

    /// Appends a frame; `delay_ms` is clamped to at least 1. Returns the
    /// new frame's index.
    pub fn insert_frame(
        &mut self,
        canvas: CanvasHandle,
        delay_ms: i32,
        alpha0: u8,
        alpha1: u8,
        zoom0: i32,
        zoom1: i32,
    ) -> usize {
        let origin = canvas.origin();
        self.frames.push(Frame {
            canvas,
            origin,
            delay_ms: delay_ms.max(1),
            alpha0,
            alpha1,
            zoom0,
            zoom1,
            texture: None,
        });
        self.frames.len() - 1
    }

    pub fn remove_frame(&mut self, index: usize) {
        if index < self.frames.len() {
            self.frames.remove(index);
            if self.current >= self.frames.len() {
                self.current = self.frames.len().saturating_sub(1);
            }
        }
    }

    pub fn clear_frames(&mut self) {
        self.frames.clear();
        self.current = 0;
        self.state = PlayState::Idle;
        self.frame_clock = None;
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn current_frame(&self) -> usize {
        self.current
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn frame_mut(&mut self, index: usize) -> Option<&mut Frame> {
        self.frames.get_mut(index)
    }

    pub fn current_canvas(&self) -> Option<&CanvasHandle> {
        self.frames.get(self.current).map(|f| &f.canvas)
    }

    pub fn set_current_frame(&mut self, index: usize) {
        if index < self.frames.len() {
            self.current = index;
            self.frame_clock = None;
        }
    }

    /// Selects a frame by index modulo the frame count (negative indices
    /// wrap from the end).
    pub fn shift_frame(&mut self, index: i32) {
        let len = self.frames.len() as i32;
        if len > 0 {
            self.current = index.rem_euclid(len) as usize;
            self.frame_clock = None;
        }
    }

    // --- playback --------------------------------------------------------

    /// Starts frame animation. Needs at least two frames. `delay_rate` is
    /// per-mille of native speed; `repeat < 0` plays unbounded, otherwise
    /// playback stops after that many full cycles.
    ///
    /// Forward modes resume from the current frame; `First` restarts at
    /// frame 0 and the reverse modes start from the tail.
    pub fn animate(&mut self, mode: AnimationType, delay_rate: i32, repeat: i32) -> CelResult<()> {
        if self.frames.len() < 2 {
            return Err(CelError::invalid_argument(format!(
                "animate requires at least 2 frames, layer has {}",
                self.frames.len()
            )));
        }
        self.mode = mode;
        self.delay_rate = delay_rate;
        self.repeat_count = repeat;
        self.repeat_counter = 0;
        self.reverse = matches!(mode, AnimationType::Reverse | AnimationType::ReverseLoop);
        self.current = match mode {
            AnimationType::First => 0,
            AnimationType::Reverse | AnimationType::ReverseLoop => self.frames.len() - 1,
            _ => self.current.min(self.frames.len() - 1),
        };
        self.state = PlayState::Playing;
        self.frame_clock = None;
        Ok(())
    }

    pub fn stop_animation(&mut self) {
        if self.state == PlayState::Playing {
            self.state = PlayState::Stopped;
        }
    }

    pub fn play_state(&self) -> PlayState {
        self.state
    }

    pub fn animation_type(&self) -> AnimationType {
        self.mode
    }

    pub fn repeat_counter(&self) -> i32 {
        self.repeat_counter
    }

    fn effective_delay(&self, index: usize) -> i32 {
        let delay = i64::from(self.frames[index].delay_ms) * i64::from(self.delay_rate) / 1000;
        (delay as i32).max(1)
    }

    fn bump_repeat(&mut self) {
        self.repeat_counter += 1;
        if self.repeat_count >= 0 && self.repeat_counter >= self.repeat_count {
            self.state = PlayState::Stopped;
        }
    }

    fn advance(&mut self) {
        let last = self.frames.len() - 1;
        match self.mode {
            AnimationType::Normal | AnimationType::First | AnimationType::Reverse => {
                let at_end = if self.reverse {
                    self.current == 0
                } else {
                    self.current == last
                };
                if at_end {
                    self.state = PlayState::Stopped;
                } else if self.reverse {
                    self.current -= 1;
                } else {
                    self.current += 1;
                }
            }
            AnimationType::Loop | AnimationType::ReverseLoop => {
                let at_end = if self.reverse {
                    self.current == 0
                } else {
                    self.current == last
                };
                if at_end {
                    self.current = if self.reverse { last } else { 0 };
                    self.bump_repeat();
                } else if self.reverse {
                    self.current -= 1;
                } else {
                    self.current += 1;
                }
            }
            AnimationType::PingPong => {
                if self.reverse {
                    if self.current == 0 {
                        self.reverse = false;
                        self.current += 1;
                        self.bump_repeat();
                    } else {
                        self.current -= 1;
                    }
                } else if self.current == last {
                    self.reverse = true;
                    self.current -= 1;
                } else {
                    self.current += 1;
                }
            }
        }
    }

    /// Advances the frame machine to `t` and refreshes the interpolated
    /// alpha/zoom and the cached position. The frame clock steps by whole
    /// delays so loop positions stay exact regardless of call cadence.
    pub fn update(&mut self, t: Tick) {
        self.left = self.position.x(t);
        self.top = self.position.y(t);

        if self.state == PlayState::Playing && self.frames.len() >= 2 {
            let mut clock = self.frame_clock.unwrap_or(t.0);
            loop {
                let delay = self.effective_delay(self.current);
                if t.0 - clock < delay {
                    break;
                }
                clock += delay;
                self.advance();
                if self.state != PlayState::Playing {
                    break;
                }
            }
            self.frame_clock = Some(clock);
        } else if self.frame_clock.is_none() {
            self.frame_clock = Some(t.0);
        }

        self.interpolate(t);
    }

    fn interpolate(&mut self, t: Tick) {
        let Some(frame) = self.frames.get(self.current) else {
            return;
        };
        let delay = self.effective_delay(self.current);
        let started = self.frame_clock.unwrap_or(t.0);
        let elapsed = (t.0 - started).clamp(0, delay);
        let lerp = |a: i32, b: i32| a + (b - a) * elapsed / delay;
        self.cur_alpha = lerp(i32::from(frame.alpha0), i32::from(frame.alpha1)).clamp(0, 255) as u8;
        self.cur_zoom = lerp(frame.zoom0, frame.zoom1);
    }

    // --- appearance ------------------------------------------------------

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_z(&mut self, z: i32) {
        self.z = z;
    }

    pub fn z(&self) -> i32 {
        self.z
    }

    /// Pins the layer to the screen, ignoring the camera. With
    /// `center_based` the position is relative to the screen midpoint.
    pub fn set_screen_space(&mut self, screen_space: bool, center_based: bool) {
        self.screen_space = screen_space;
        self.center_based = center_based;
    }

    pub fn set_flip(&mut self, flip: Flip) {
        self.flip = flip;
    }

    pub fn set_blend(&mut self, raw: i32) {
        self.blend_raw = raw;
    }

    /// Horizontal/vertical tiling periods in pixels; 0 disables tiling on
    /// that axis.
    pub fn set_tiling(&mut self, tile_x: i32, tile_y: i32) {
        self.tile_x = tile_x.max(0);
        self.tile_y = tile_y.max(0);
    }

    /// Parallax factors: `rx ≤ 0` follows the camera fully, `rx > 0`
    /// scales the camera displacement by `rx / 100`.
    pub fn set_parallax(&mut self, rx: i32, ry: i32) {
        self.parallax_rx = rx;
        self.parallax_ry = ry;
    }

    pub fn set_position(&mut self, left: i32, top: i32) {
        self.left = left;
        self.top = top;
        self.position.move_to(left, top);
    }

    pub fn left(&self) -> i32 {
        self.left
    }

    pub fn top(&self) -> i32 {
        self.top
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sets all four color channels at once from a packed ARGB value.
    pub fn set_color(&mut self, argb: u32) {
        let c = Color::from_argb(argb);
        self.alpha.move_to(i32::from(c.a), 0);
        self.red_tone.move_to(i32::from(c.r), 0);
        self.green_blue_tone
            .move_to(i32::from(c.g), i32::from(c.b));
    }

    /// Evaluated modulation color at `t`, combined with the current
    /// frame's interpolated alpha. Channels saturate into `0..=255`.
    pub fn color(&self, t: Tick) -> Color {
        let clamp = |v: i32| v.clamp(0, 255) as u8;
        let layer_alpha = i32::from(clamp(self.alpha.x(t)));
        Color {
            a: (layer_alpha * i32::from(self.cur_alpha) / 255) as u8,
            r: clamp(self.red_tone.x(t)),
            g: clamp(self.green_blue_tone.x(t)),
            b: clamp(self.green_blue_tone.y(t)),
        }
    }

    /// Position vector; animate it to move the layer.
    pub fn position_vector(&self) -> &AnimVector {
        &self.position
    }

    pub fn alpha_vector(&self) -> &AnimVector {
        &self.alpha
    }

    pub fn red_tone_vector(&self) -> &AnimVector {
        &self.red_tone
    }

    pub fn green_blue_tone_vector(&self) -> &AnimVector {
        &self.green_blue_tone
    }

    // --- emission --------------------------------------------------------

    /// Draws the current frame. `camera` is the evaluated camera position,
    /// `center` the screen midpoint, `viewport` the output size in pixels.
    ///
    /// A missing frame is skipped silently. A failed texture upload logs
    /// once and render-disables the layer for the rest of the session; the
    /// call still succeeds so one bad layer cannot stall the pass.
    pub fn emit(
        &mut self,
        renderer: &mut dyn Renderer,
        camera: Point,
        center: Point,
        viewport: (u32, u32),
        t: Tick,
    ) -> CelResult<()> {
        if !self.visible || self.render_disabled || self.frames.is_empty() {
            return Ok(());
        }

        let (canvas, origin) = {
            let frame = &self.frames[self.current];
            (frame.canvas.clone(), frame.origin)
        };
        let texture = match self.frames[self.current].texture {
            Some(id) => id,
            None => match renderer.create_texture(
                canvas.width(),
                canvas.height(),
                canvas.pitch(),
                canvas.pixels(),
            ) {
                Ok(id) => {
                    self.frames[self.current].texture = Some(id);
                    id
                }
                Err(e) => {
                    tracing::warn!(error = %e, z = self.z, "texture upload failed, disabling layer");
                    self.render_disabled = true;
                    return Ok(());
                }
            },
        };

        let zoom = self.cur_zoom;
        let rw = (i64::from(canvas.width()) * i64::from(zoom) / 1000) as i32;
        let rh = (i64::from(canvas.height()) * i64::from(zoom) / 1000) as i32;
        if rw <= 0 || rh <= 0 {
            return Ok(());
        }
        let ox = (i64::from(origin.x) * i64::from(zoom) / 1000) as i32;
        let oy = (i64::from(origin.y) * i64::from(zoom) / 1000) as i32;

        let base = if self.screen_space {
            let anchor = if self.center_based { center } else { Point::ZERO };
            Point::new(self.left + anchor.x, self.top + anchor.y)
        } else {
            let cam_x = if self.parallax_rx <= 0 {
                camera.x
            } else {
                (i64::from(camera.x) * i64::from(self.parallax_rx) / 100) as i32
            };
            let cam_y = if self.parallax_ry <= 0 {
                camera.y
            } else {
                (i64::from(camera.y) * i64::from(self.parallax_ry) / 100) as i32
            };
            Point::new(
                self.left + center.x - cam_x,
                self.top + center.y - cam_y,
            )
        };
        let render_x = base.x - ox;
        let render_y = base.y - oy;

        let color = self.color(t);
        let rotation_deg = self.position.angle(t).to_degrees();
        let blend = Blend::from_raw(self.blend_raw);
        let (vw, vh) = (viewport.0 as i32, viewport.1 as i32);

        let xs = tile_positions(render_x, self.tile_x, vw);
        let ys = tile_positions(render_y, self.tile_y, vh);
        for &y in &ys {
            if y + rh <= 0 || y >= vh {
                continue;
            }
            for &x in &xs {
                if x + rw <= 0 || x >= vw {
                    continue;
                }
                renderer.draw_quad(&DrawQuad {
                    texture,
                    x,
                    y,
                    width: rw,
                    height: rh,
                    rotation_deg,
                    flip: self.flip,
                    color,
                    blend,
                })?;
            }
        }
        Ok(())
    }
}

/// Tile start positions along one axis: from the leftmost period-aligned
/// spot at or before the viewport edge, up to the far edge.
fn tile_positions(start: i32, period: i32, extent: i32) -> Vec<i32> {
    if period <= 0 {
        return vec![start];
    }
    let mut s = start % period;
    if s > 0 {
        s -= period;
    }
    let mut out = Vec::new();
    let mut x = s;
    while x < extent {
        out.push(x);
        x += period;
    }
    out
}
