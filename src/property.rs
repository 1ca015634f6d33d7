//! Read-only asset property trees.
//!
//! Sprite data reaches the core as a tree of named properties. The
//! [`Property`] trait is the minimal read surface the core needs; hosts
//! back it with their own asset store, and [`MemoryProperty`] provides an
//! owned in-memory implementation for tests and programmatic assets.
//!
//! [`populate_layer`] applies the sprite frame conventions: numbered
//! children `"0"`, `"1"`, … are frames with optional `origin`, `delay`,
//! `a0`/`a1` and `z0`/`z1` children, and the sprite parent may carry `z`,
//! `blendMode` and a one-shot `a0` fade-in.

use crate::anim::command::parse_point;
use crate::canvas::CanvasHandle;
use crate::error::{CelError, CelResult};
use crate::geom::{Point, Tick};
use crate::layer::Layer;

pub trait Property {
    fn child(&self, name: &str) -> Option<&dyn Property>;

    /// Enumerates the direct children in storage order.
    fn children(&self) -> Box<dyn Iterator<Item = (&str, &dyn Property)> + '_>;

    /// Canvas payload, if this node holds one.
    fn canvas(&self) -> Option<CanvasHandle>;

    /// Vector payload; string nodes in the `"(x, y)"` or tab form parse.
    fn vector(&self) -> Option<Point>;

    fn int(&self, default: i32) -> i32;

    fn string(&self, default: &str) -> String;
}

/// Payload of one in-memory property node.
#[derive(Clone, Debug, Default)]
pub enum PropValue {
    #[default]
    None,
    Int(i64),
    String(String),
    Vector(Point),
    Canvas(CanvasHandle),
}

/// Owned property tree node.
#[derive(Clone, Debug, Default)]
pub struct MemoryProperty {
    value: PropValue,
    children: Vec<(String, MemoryProperty)>,
}

impl MemoryProperty {
    pub fn map() -> Self {
        Self::default()
    }

    pub fn int(value: i64) -> Self {
        Self {
            value: PropValue::Int(value),
            children: Vec::new(),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value: PropValue::String(value.into()),
            children: Vec::new(),
        }
    }

    pub fn vector(value: Point) -> Self {
        Self {
            value: PropValue::Vector(value),
            children: Vec::new(),
        }
    }

    pub fn canvas(value: CanvasHandle) -> Self {
        Self {
            value: PropValue::Canvas(value),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, name: impl Into<String>, child: MemoryProperty) -> Self {
        self.children.push((name.into(), child));
        self
    }
}

impl Property for MemoryProperty {
    fn child(&self, name: &str) -> Option<&dyn Property> {
        self.children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c as &dyn Property)
    }

    fn children(&self) -> Box<dyn Iterator<Item = (&str, &dyn Property)> + '_> {
        Box::new(
            self.children
                .iter()
                .map(|(n, c)| (n.as_str(), c as &dyn Property)),
        )
    }

    fn canvas(&self) -> Option<CanvasHandle> {
        match &self.value {
            PropValue::Canvas(c) => Some(c.clone()),
            _ => None,
        }
    }

    fn vector(&self) -> Option<Point> {
        match &self.value {
            PropValue::Vector(p) => Some(*p),
            PropValue::String(s) => parse_point(s).ok(),
            _ => None,
        }
    }

    fn int(&self, default: i32) -> i32 {
        match &self.value {
            PropValue::Int(v) => *v as i32,
            PropValue::String(s) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    fn string(&self, default: &str) -> String {
        match &self.value {
            PropValue::String(s) => s.clone(),
            PropValue::Int(v) => v.to_string(),
            _ => default.to_string(),
        }
    }
}

/// Loads sprite frames from a property tree into `layer`. Returns the
/// number of frames added. A numbered frame without a canvas is a
/// `resource-missing` error.
#[tracing::instrument(skip(layer, prop), fields(t = now.0))]
pub fn populate_layer(layer: &mut Layer, prop: &dyn Property, now: Tick) -> CelResult<usize> {
    let mut count = 0usize;
    while let Some(frame) = prop.child(&count.to_string()) {
        let canvas = frame
            .canvas()
            .ok_or_else(|| CelError::resource_missing(format!("sprite frame {count} has no canvas")))?;
        let delay = frame.child("delay").map_or(100, |p| p.int(100));
        let a0 = frame.child("a0").map_or(255, |p| p.int(255)).clamp(0, 255);
        let a1 = frame.child("a1").map_or(255, |p| p.int(255)).clamp(0, 255);
        let z0 = frame.child("z0").map_or(1000, |p| p.int(1000));
        let z1 = frame.child("z1").map_or(1000, |p| p.int(1000));
        let idx = layer.insert_frame(canvas, delay, a0 as u8, a1 as u8, z0, z1);
        if let Some(origin) = frame.child("origin").and_then(Property::vector) {
            if let Some(f) = layer.frame_mut(idx) {
                f.origin = origin;
            }
        }
        count += 1;
    }

    if let Some(z) = prop.child("z") {
        let current = layer.z();
        layer.set_z(z.int(current));
    }
    if let Some(blend) = prop.child("blendMode") {
        layer.set_blend(blend.int(0));
    }
    // One-shot fade-in over the whole sequence, only while the layer alpha
    // is still untouched at full.
    if let Some(a0) = prop.child("a0") {
        let start = a0.int(255).clamp(0, 255);
        if start < 255 && layer.alpha_vector().x(now) == 255 {
            let total: i32 = (0..layer.frame_count())
                .filter_map(|i| layer.frame(i))
                .map(|f| f.delay_ms)
                .sum();
            let alpha = layer.alpha_vector();
            alpha.move_to(start, 0);
            alpha.rel_move(255 - start, 0, now, Tick(now.0 + total.max(1)), false, false, true);
        }
    }

    tracing::debug!(frames = count, "populated layer");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;

    fn sprite_frame(argb: u32, delay: i64) -> MemoryProperty {
        MemoryProperty::canvas(Canvas::solid(8, 8, argb, Point::ZERO))
            .with_child("delay", MemoryProperty::int(delay))
            .with_child("origin", MemoryProperty::string("(4, 8)"))
    }

    #[test]
    fn populate_reads_numbered_frames_in_order() {
        let sprite = MemoryProperty::map()
            .with_child("0", sprite_frame(0xFF00_0000, 120))
            .with_child("1", sprite_frame(0xFF00_FF00, 80))
            .with_child("z", MemoryProperty::int(7))
            .with_child("blendMode", MemoryProperty::int(2));
        let mut layer = Layer::new(0, 0, 8, 8, 0);
        let n = populate_layer(&mut layer, &sprite, Tick(0)).unwrap();
        assert_eq!(n, 2);
        assert_eq!(layer.frame_count(), 2);
        assert_eq!(layer.frame(0).unwrap().delay_ms, 120);
        assert_eq!(layer.frame(0).unwrap().origin, Point::new(4, 8));
        assert_eq!(layer.frame(1).unwrap().delay_ms, 80);
        assert_eq!(layer.z(), 7);
    }

    #[test]
    fn populate_defaults_missing_children() {
        let sprite = MemoryProperty::map().with_child(
            "0",
            MemoryProperty::canvas(Canvas::solid(2, 2, 0, Point::new(1, 1))),
        );
        let mut layer = Layer::new(0, 0, 2, 2, 0);
        populate_layer(&mut layer, &sprite, Tick(0)).unwrap();
        let f = layer.frame(0).unwrap();
        assert_eq!(f.delay_ms, 100);
        assert_eq!((f.alpha0, f.alpha1), (255, 255));
        assert_eq!((f.zoom0, f.zoom1), (1000, 1000));
        // Origin falls back to the canvas registration point.
        assert_eq!(f.origin, Point::new(1, 1));
    }

    #[test]
    fn populate_rejects_frame_without_canvas() {
        let sprite = MemoryProperty::map().with_child("0", MemoryProperty::int(3));
        let mut layer = Layer::new(0, 0, 2, 2, 0);
        assert!(matches!(
            populate_layer(&mut layer, &sprite, Tick(0)),
            Err(CelError::ResourceMissing(_))
        ));
    }

    #[test]
    fn parent_a0_installs_fade_in_ramp() {
        let sprite = MemoryProperty::map()
            .with_child("0", sprite_frame(0, 100))
            .with_child("1", sprite_frame(0, 100))
            .with_child("a0", MemoryProperty::int(0));
        let mut layer = Layer::new(0, 0, 8, 8, 0);
        populate_layer(&mut layer, &sprite, Tick(0)).unwrap();
        assert_eq!(layer.alpha_vector().x(Tick(0)), 0);
        assert_eq!(layer.alpha_vector().x(Tick(100)), 127);
        assert_eq!(layer.alpha_vector().x(Tick(200)), 255);
    }

    #[test]
    fn children_enumerate_through_trait_object() {
        let sprite = MemoryProperty::map()
            .with_child("0", sprite_frame(0, 100))
            .with_child("1", sprite_frame(0, 80))
            .with_child("z", MemoryProperty::int(7));
        let dynamic: &dyn Property = &sprite;
        let names: Vec<&str> = dynamic.children().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["0", "1", "z"]);
        let delays: Vec<i32> = dynamic
            .children()
            .filter(|(n, _)| n.chars().all(|c| c.is_ascii_digit()))
            .map(|(_, c)| c.child("delay").map_or(0, |d| d.int(0)))
            .collect();
        assert_eq!(delays, vec![100, 80]);
    }

    #[test]
    fn memory_property_value_coercions() {
        let p = MemoryProperty::map()
            .with_child("n", MemoryProperty::string("42"))
            .with_child("v", MemoryProperty::vector(Point::new(2, 3)))
            .with_child("s", MemoryProperty::int(9));
        assert_eq!(p.child("n").unwrap().int(0), 42);
        assert_eq!(p.child("v").unwrap().vector(), Some(Point::new(2, 3)));
        assert_eq!(p.child("s").unwrap().string(""), "9");
        assert_eq!(p.child("missing").map(|_| ()), None);
        assert_eq!(p.int(5), 5);
    }
}
