//! # celgraph
//!
//! Animated 2D layer scene graph and compositor: the display core of a
//! side-scrolling game client. Three subsystems build on each other:
//!
//! - [`AnimVector`]: an integer 2D point/angle animated by a chain of
//!   phase-ordered nodes — easing, ratio following, wrap/clip, eased
//!   rotation and cubic-Hermite "fly" paths — with parent/child origins.
//! - [`Layer`]: a sequence of frames (canvas + delay + alpha/zoom
//!   envelope) with a frame-advance state machine and per-channel
//!   animation vectors for position, alpha and color tone.
//! - [`Compositor`]: the z-sorted layer set, camera vector and
//!   frame-rate-limited render loop, drawing through a host [`Renderer`].
//!
//! Time is explicit everywhere: hosts pass a monotonic [`Tick`] into every
//! read and every `render_frame`, and animation commands carry absolute
//! start/end times. All state lives on one thread; cross-vector links are
//! weak handles that degrade to no-ops when their target is gone.
//!
//! ```
//! use celgraph::{AnimationType, Canvas, Compositor, Point, RecordingRenderer, Tick};
//!
//! # fn main() -> celgraph::CelResult<()> {
//! let (renderer, log) = RecordingRenderer::new();
//! let mut comp = Compositor::new(800, 600);
//! comp.initialize(Box::new(renderer));
//!
//! let layer = comp.create_layer(0, 0, 32, 32, 0);
//! {
//!     let mut layer = layer.borrow_mut();
//!     for argb in [0xFFFF_0000u32, 0xFF00_FF00] {
//!         let canvas = Canvas::solid(32, 32, argb, Point::ZERO);
//!         layer.insert_frame(canvas, 100, 255, 255, 1000, 1000);
//!     }
//!     layer.animate(AnimationType::Loop, 1000, -1)?;
//! }
//!
//! comp.render_frame(Tick(0))?;
//! assert_eq!(log.borrow().present_count(), 1);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod anim;
pub mod canvas;
pub mod compositor;
pub mod error;
pub mod geom;
pub mod layer;
pub mod property;
pub mod renderer;

pub use anim::{AnimVector, FlyKeyframe, VectorSnapshot, WeakAnim};
pub use canvas::{Canvas, CanvasHandle};
pub use compositor::{Compositor, LayerHandle};
pub use error::{CelError, CelResult};
pub use geom::{Color, Flip, Point, Rect, Tick};
pub use layer::{AnimationType, Frame, Layer, PlayState};
pub use property::{MemoryProperty, PropValue, Property, populate_layer};
pub use renderer::{
    Blend, DrawQuad, RecordingRenderer, RenderLog, RenderOp, Renderer, TextureId,
};
