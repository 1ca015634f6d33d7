//! Renderer boundary.
//!
//! The compositor drives a [`Renderer`] through a handful of retained-mode
//! calls: upload a texture once, then draw positioned quads each pass. The
//! crate ships no GPU or window backend; hosts implement the trait and a
//! [`RecordingRenderer`] is provided for tests and headless use.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{CelError, CelResult};
use crate::geom::{Color, Flip, Rect, Tick};

/// Opaque handle to an uploaded texture, issued by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TextureId(pub u32);

/// Pixel blend applied when drawing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Blend {
    /// Source-over with straight alpha.
    #[default]
    Alpha,
    /// Additive.
    Add,
    /// Component-wise multiply, used by the screen tone pass.
    Multiply,
}

impl Blend {
    /// Maps the integer blend mode stored in layer assets.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            2 => Self::Add,
            3 => Self::Multiply,
            _ => Self::Alpha,
        }
    }
}

/// One textured quad, fully resolved: screen-space geometry, color
/// modulation, rotation in degrees about the quad center.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DrawQuad {
    pub texture: TextureId,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub rotation_deg: f64,
    pub flip: Flip,
    pub color: Color,
    pub blend: Blend,
}

/// Host-provided drawing surface.
///
/// All calls are made from the compositor's thread; implementations need no
/// internal synchronization.
pub trait Renderer {
    /// Uploads an RGBA8 buffer and returns a handle for later draws.
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        pitch: u32,
        pixels: &[u8],
    ) -> CelResult<TextureId>;

    /// Draws one quad with the given blend and color modulation.
    fn draw_quad(&mut self, quad: &DrawQuad) -> CelResult<()>;

    /// Fills a screen-space rectangle with a solid ARGB color.
    fn fill_rect(&mut self, rect: Rect, argb: u32, blend: Blend) -> CelResult<()>;

    /// Flips the finished frame to the screen.
    fn present(&mut self) -> CelResult<()>;

    /// Monotonic host clock in milliseconds.
    fn ticks_ms(&self) -> Tick;
}

/// Everything a [`RecordingRenderer`] saw, in call order.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum RenderOp {
    Upload {
        id: TextureId,
        width: u32,
        height: u32,
    },
    Quad(DrawQuad),
    Fill {
        rect: Rect,
        argb: u32,
        blend: Blend,
    },
    Present,
}

/// Shared command log; the test half keeps a handle while the compositor
/// owns the renderer.
#[derive(Debug, Default)]
pub struct RenderLog {
    pub ops: Vec<RenderOp>,
    /// When set, `create_texture` reports resource exhaustion.
    pub fail_uploads: bool,
    /// Value returned by `ticks_ms`.
    pub now: Tick,
    next_texture: u32,
}

impl RenderLog {
    /// Quads drawn since the log was last cleared, in draw order.
    pub fn quads(&self) -> Vec<DrawQuad> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                RenderOp::Quad(q) => Some(*q),
                _ => None,
            })
            .collect()
    }

    pub fn present_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, RenderOp::Present))
            .count()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

/// Renderer test double that records every call into a [`RenderLog`].
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    log: Rc<RefCell<RenderLog>>,
}

impl RecordingRenderer {
    /// Returns the renderer and a shared handle to its log.
    pub fn new() -> (Self, Rc<RefCell<RenderLog>>) {
        let log = Rc::new(RefCell::new(RenderLog::default()));
        (Self { log: log.clone() }, log)
    }
}

impl Renderer for RecordingRenderer {
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        pitch: u32,
        pixels: &[u8],
    ) -> CelResult<TextureId> {
        let mut log = self.log.borrow_mut();
        if log.fail_uploads {
            return Err(CelError::resource_exhausted(format!(
                "texture upload refused ({width}x{height})"
            )));
        }
        if pixels.len() as u32 != pitch * height {
            return Err(CelError::invalid_argument(format!(
                "texture buffer is {} bytes, expected {}",
                pixels.len(),
                pitch * height
            )));
        }
        let id = TextureId(log.next_texture);
        log.next_texture += 1;
        log.ops.push(RenderOp::Upload { id, width, height });
        Ok(id)
    }

    fn draw_quad(&mut self, quad: &DrawQuad) -> CelResult<()> {
        self.log.borrow_mut().ops.push(RenderOp::Quad(*quad));
        Ok(())
    }

    fn fill_rect(&mut self, rect: Rect, argb: u32, blend: Blend) -> CelResult<()> {
        self.log
            .borrow_mut()
            .ops
            .push(RenderOp::Fill { rect, argb, blend });
        Ok(())
    }

    fn present(&mut self) -> CelResult<()> {
        self.log.borrow_mut().ops.push(RenderOp::Present);
        Ok(())
    }

    fn ticks_ms(&self) -> Tick {
        self.log.borrow().now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_renderer_logs_in_call_order() {
        let (mut r, log) = RecordingRenderer::new();
        let id = r.create_texture(2, 2, 8, &[0u8; 16]).unwrap();
        r.fill_rect(Rect::sized(0, 0, 4, 4), 0xFF00_0000, Blend::Alpha)
            .unwrap();
        r.draw_quad(&DrawQuad {
            texture: id,
            x: 1,
            y: 2,
            width: 2,
            height: 2,
            rotation_deg: 0.0,
            flip: Flip::None,
            color: Color::WHITE,
            blend: Blend::Alpha,
        })
        .unwrap();
        r.present().unwrap();

        let log = log.borrow();
        assert_eq!(log.ops.len(), 4);
        assert!(matches!(log.ops[0], RenderOp::Upload { .. }));
        assert_eq!(log.quads().len(), 1);
        assert_eq!(log.quads()[0].x, 1);
        assert_eq!(log.present_count(), 1);
    }

    #[test]
    fn texture_ids_are_sequential() {
        let (mut r, _log) = RecordingRenderer::new();
        let a = r.create_texture(1, 1, 4, &[0u8; 4]).unwrap();
        let b = r.create_texture(1, 1, 4, &[0u8; 4]).unwrap();
        assert_eq!(a, TextureId(0));
        assert_eq!(b, TextureId(1));
    }

    #[test]
    fn fail_uploads_reports_exhaustion() {
        let (mut r, log) = RecordingRenderer::new();
        log.borrow_mut().fail_uploads = true;
        let err = r.create_texture(1, 1, 4, &[0u8; 4]).unwrap_err();
        assert!(matches!(err, CelError::ResourceExhausted(_)));
    }

    #[test]
    fn blend_from_raw_defaults_to_alpha() {
        assert_eq!(Blend::from_raw(0), Blend::Alpha);
        assert_eq!(Blend::from_raw(1), Blend::Alpha);
        assert_eq!(Blend::from_raw(2), Blend::Add);
        assert_eq!(Blend::from_raw(3), Blend::Multiply);
        assert_eq!(Blend::from_raw(99), Blend::Alpha);
    }
}
