use std::sync::Arc;

use crate::error::{CelError, CelResult};
use crate::geom::Point;

/// Shared handle to an immutable pixel buffer.
pub type CanvasHandle = Arc<Canvas>;

/// Immutable RGBA8 pixel rectangle with a registration origin.
///
/// The origin is the point inside the bitmap that should land on the layer
/// position when drawn, so a character sprite with origin at its feet stays
/// planted while frames of different sizes cycle.
#[derive(Clone, Debug)]
pub struct Canvas {
    width: u32,
    height: u32,
    origin: Point,
    pixels: Vec<u8>,
}

impl Canvas {
    /// Wraps a raw RGBA8 buffer. `pixels.len()` must equal `width * height * 4`.
    pub fn from_rgba8(
        width: u32,
        height: u32,
        origin: Point,
        pixels: Vec<u8>,
    ) -> CelResult<CanvasHandle> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(CelError::invalid_argument(format!(
                "canvas buffer is {} bytes, expected {expected} for {width}x{height} RGBA8",
                pixels.len()
            )));
        }
        Ok(Arc::new(Self {
            width,
            height,
            origin,
            pixels,
        }))
    }

    /// Takes ownership of a decoded image.
    pub fn from_image(image: image::RgbaImage, origin: Point) -> CanvasHandle {
        let (width, height) = image.dimensions();
        Arc::new(Self {
            width,
            height,
            origin,
            pixels: image.into_raw(),
        })
    }

    /// Single-color canvas, handy for placeholders and tests.
    pub fn solid(width: u32, height: u32, argb: u32, origin: Point) -> CanvasHandle {
        let a = ((argb >> 24) & 0xFF) as u8;
        let r = ((argb >> 16) & 0xFF) as u8;
        let g = ((argb >> 8) & 0xFF) as u8;
        let b = (argb & 0xFF) as u8;
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..width as usize * height as usize {
            pixels.extend_from_slice(&[r, g, b, a]);
        }
        Arc::new(Self {
            width,
            height,
            origin,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    /// Row stride in bytes.
    pub fn pitch(&self) -> u32 {
        self.width * 4
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}
