//! Animation node variants.
//!
//! Every node carries a 32-bit type id: phase in the low 16 bits, kind in
//! the high 16. Chains keep nodes sorted by phase and evaluate them in
//! order; a node that reports completion is absorbed into the chain's base
//! values and removed.

use crate::geom::{Point, Tick};

use super::vector::WeakAnim;

pub(crate) const TYPE_EASING: u32 = 0x0000_0001;
pub(crate) const TYPE_RATIO: u32 = 0x000A_0001;
pub(crate) const TYPE_FLY: u32 = 0x0032_0000;
pub(crate) const TYPE_WRAP_CLIP: u32 = 0x0014_0002;
pub(crate) const TYPE_ROTATE: u32 = 0x0028_0003;

/// Milliseconds between stepped-motion updates when a loose level is set.
const LOOSE_STEP_MS: i32 = 30;

/// One control point on a fly path. `point` is sampled at evaluation time,
/// so a moving control point bends the spline while in flight.
#[derive(Clone, Debug, Default)]
pub struct FlyKeyframe {
    pub point: WeakAnim,
    pub velocity: kurbo::Vec2,
    pub acceleration: kurbo::Vec2,
    pub time: Tick,
}

#[derive(Clone, Debug)]
pub(crate) enum AnimNode {
    Easing(EasingNode),
    Ratio(RatioNode),
    Fly(FlyNode),
    WrapClip(WrapClipNode),
    Rotate(RotateNode),
}

impl AnimNode {
    pub(crate) fn type_id(&self) -> u32 {
        match self {
            Self::Easing(_) => TYPE_EASING,
            Self::Ratio(_) => TYPE_RATIO,
            Self::Fly(_) => TYPE_FLY,
            Self::WrapClip(_) => TYPE_WRAP_CLIP,
            Self::Rotate(_) => TYPE_ROTATE,
        }
    }

    pub(crate) fn phase(&self) -> u16 {
        (self.type_id() & 0xFFFF) as u16
    }

    /// Positional evaluation for phase 0..=2 nodes. Returns true when the
    /// node has run to completion and should be absorbed.
    pub(crate) fn eval_pos(&mut self, pos: &mut Point, t: Tick, commit: bool) -> bool {
        match self {
            Self::Easing(n) => n.eval_pos(pos, t, commit),
            Self::Ratio(n) => n.eval_pos(pos, t),
            Self::Fly(n) => n.eval_pos(pos, t),
            Self::WrapClip(n) => n.eval_pos(pos, t),
            Self::Rotate(_) => false,
        }
    }

    /// Angular evaluation for phase 3 nodes.
    pub(crate) fn eval_angle(&mut self, angle: &mut f64, t: Tick) -> bool {
        match self {
            Self::Rotate(n) => n.eval_angle(angle, t),
            _ => false,
        }
    }
}

/// Linear interpolation of a positional delta over `[start, end)`, with
/// optional bounce (keep accumulating whole deltas each cycle) and pingpong
/// (reverse direction each cycle). Stepped motion via `loose_level`.
#[derive(Clone, Debug)]
pub(crate) struct EasingNode {
    pub delta: Point,
    pub accum: Point,
    pub start: i32,
    pub end: i32,
    pub bounce: bool,
    pub pingpong: bool,
    pub loose_level: i32,
    pub loose_timer: i32,
}

impl EasingNode {
    fn eval_pos(&mut self, pos: &mut Point, t: Tick, commit: bool) -> bool {
        let frame = t.0;
        let (mut ax, mut ay) = (self.accum.x, self.accum.y);
        let (mut st, mut et) = (self.start, self.end);
        let (mut dx, mut dy) = (self.delta.x, self.delta.y);

        // Instant animation.
        if et - st <= 0 {
            pos.x += dx;
            pos.y += dy;
            return true;
        }

        if frame >= et {
            if self.pingpong {
                // Reverse direction each elapsed cycle.
                loop {
                    ax = if ax != 0 { 0 } else { dx };
                    ay = if ay != 0 { 0 } else { dy };
                    let period = et - st;
                    dx = -dx;
                    dy = -dy;
                    st = et;
                    et += period;
                    if frame < et {
                        break;
                    }
                }
                if commit {
                    // The whole cycle state moves together; committing the
                    // flipped delta alone would desync an exact-boundary
                    // read from the stale window.
                    self.delta = Point::new(dx, dy);
                    self.accum = Point::new(ax, ay);
                    self.start = st;
                    self.end = et;
                }
            } else if self.bounce {
                // Accumulate one full delta per elapsed cycle.
                while frame >= et {
                    ax += dx;
                    ay += dy;
                    let period = et - st;
                    st = et;
                    et += period;
                }
            } else {
                pos.x += dx;
                pos.y += dy;
                return true;
            }
        }

        pos.x += ax;
        pos.y += ay;
        if frame > st {
            let total = f64::from(et - st);
            let progress = f64::from(frame - st);
            pos.x += (f64::from(dx) * progress / total) as i32;
            pos.y += (f64::from(dy) * progress / total) as i32;

            if commit {
                let mut loose = 0;
                if frame - self.loose_timer >= LOOSE_STEP_MS {
                    loose = self.loose_level;
                    self.loose_timer = frame;
                }
                self.start = st;
                self.end = et - loose;
                self.accum = Point::new(ax, ay);
            }
        }
        false
    }
}

/// Tracks another vector at a rational scale. Never completes.
#[derive(Clone, Debug)]
pub(crate) struct RatioNode {
    pub target: WeakAnim,
    pub denom: Point,
    pub scale: Point,
}

impl RatioNode {
    fn eval_pos(&mut self, pos: &mut Point, t: Tick) -> bool {
        // Dead or busy target: node contributes nothing this pass.
        if let Some(target) = self.target.probe_xy(t) {
            pos.x += (i64::from(self.scale.x) * i64::from(target.x) / i64::from(self.denom.x)) as i32;
            pos.y += (i64::from(self.scale.y) * i64::from(target.y) / i64::from(self.denom.y)) as i32;
        }
        false
    }
}

/// Cubic Hermite spline through time-stamped control points. The spline
/// value replaces the position outright rather than adding to it.
#[derive(Clone, Debug)]
pub(crate) struct FlyNode {
    pub keys: Vec<FlyKeyframe>,
    pub completion: Option<WeakAnim>,
}

impl FlyNode {
    fn eval_pos(&mut self, pos: &mut Point, t: Tick) -> bool {
        let Some(last) = self.keys.last() else {
            return true;
        };
        let frame = t.0;
        if frame >= last.time.0 {
            // Land exactly on the final control point.
            if let Some(p) = last.point.probe_xy(t) {
                *pos = p;
            }
            return true;
        }
        if frame < self.keys[0].time.0 {
            return false;
        }

        let seg = self.keys.partition_point(|k| k.time.0 <= frame) - 1;
        let a = &self.keys[seg];
        let b = &self.keys[seg + 1];
        let p0: kurbo::Point = a.point.probe_xy(t).unwrap_or_default().into();
        let p1: kurbo::Point = b.point.probe_xy(t).unwrap_or_default().into();

        let u = f64::from(frame - a.time.0) / f64::from(b.time.0 - a.time.0);
        let u2 = u * u;
        let u3 = u2 * u;
        let h00 = 2.0 * u3 - 3.0 * u2 + 1.0;
        let h10 = u3 - 2.0 * u2 + u;
        let h01 = -2.0 * u3 + 3.0 * u2;
        let h11 = u3 - u2;

        pos.x = (h00 * p0.x + h10 * a.velocity.x + h11 * a.acceleration.x + h01 * p1.x) as i32;
        pos.y = (h00 * p0.y + h10 * a.velocity.y + h11 * a.acceleration.y + h01 * p1.y) as i32;
        false
    }
}

/// Wraps or clamps the world position into a rectangle anchored on an
/// optional bounds vector. Never completes.
#[derive(Clone, Debug)]
pub(crate) struct WrapClipNode {
    pub bounds: Option<WeakAnim>,
    pub rect: crate::geom::Rect,
    pub clamp: bool,
}

impl WrapClipNode {
    fn eval_pos(&mut self, pos: &mut Point, t: Tick) -> bool {
        let anchor = match &self.bounds {
            Some(bounds) => match bounds.probe_xy(t) {
                Some(p) => p,
                // Bounds vector exists but is unreadable this pass.
                None => return false,
            },
            None => Point::ZERO,
        };

        let left = self.rect.left + anchor.x;
        let top = self.rect.top + anchor.y;
        let w = self.rect.width();
        let h = self.rect.height();

        if self.clamp {
            pos.x = clamp_val(pos.x, left, w);
            pos.y = clamp_val(pos.y, top, h);
        } else {
            pos.x = wrap_val(pos.x, left, w);
            pos.y = wrap_val(pos.y, top, h);
        }
        false
    }
}

/// Maps `val` into `[start, start + size)` by modular wrapping.
fn wrap_val(val: i32, start: i32, size: i32) -> i32 {
    if size <= 0 {
        return start;
    }
    let diff = val - start;
    if diff > 0 {
        return diff % size + start;
    }
    let neg = (-diff) % size;
    if neg != 0 { size - neg + start } else { start }
}

/// Clamps `val` into `[start, start + size)`.
fn clamp_val(val: i32, start: i32, size: i32) -> i32 {
    if size <= 0 {
        return start;
    }
    if val < start {
        start
    } else if val >= start + size {
        start + size - 1
    } else {
        val
    }
}

/// Angular animation: a finite turn of `total` radians over `period_ms`
/// with quadratic ease-in/out ramps, or (when `total` is zero) a continuous
/// spin at one revolution per `period_ms`.
#[derive(Clone, Debug)]
pub(crate) struct RotateNode {
    pub total: f64,
    pub start: i32,
    pub period_ms: i32,
    pub ease_ms: i32,
}

impl RotateNode {
    fn eval_angle(&mut self, angle: &mut f64, t: Tick) -> bool {
        let frame = t.0;
        if self.total.abs() < 1.0e-10 {
            // Continuous rotation.
            if self.period_ms == 0 {
                return true;
            }
            let elapsed = frame - self.start;
            let pd = f64::from(self.period_ms);
            let ease = self.ease_ms;
            if ease > 0 && elapsed < ease {
                *angle += std::f64::consts::TAU / pd / f64::from(ease)
                    * f64::from(elapsed)
                    * f64::from(elapsed)
                    * 0.5;
                return false;
            }
            let cycle = if ease > 0 {
                elapsed % self.period_ms - ease / 2
            } else {
                elapsed % self.period_ms
            };
            *angle += f64::from(cycle) * std::f64::consts::TAU / pd;
            return false;
        }

        // Finite rotation.
        if self.period_ms == 0 || frame >= self.start + self.period_ms {
            *angle += self.total;
            return true;
        }
        let elapsed = frame - self.start;
        if elapsed <= 0 {
            return false;
        }
        let dur = f64::from(self.period_ms);
        if self.ease_ms == 0 {
            *angle += self.total * f64::from(elapsed) / dur;
            return false;
        }

        // Ease-in, coast, ease-out. The ramps trade speed for time so the
        // full turn still sums to `total`.
        let ease = f64::from(self.ease_ms);
        let coast = dur - 2.0 * ease;
        let rate = self.total / (coast + ease);
        let e = f64::from(elapsed);
        *angle += if e < ease {
            rate / ease * e * e * 0.5
        } else if e < coast + ease {
            rate * (e - ease) + ease * rate * 0.5
        } else {
            let tail = e - coast - ease;
            (2.0 * rate - rate / ease * tail) * tail * 0.5 + coast * rate + ease * rate * 0.5
        };
        false
    }
}
