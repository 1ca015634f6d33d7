//! Shared animation vector handles.
//!
//! An [`AnimVector`] is a cheaply clonable handle to a 2D point/angle with
//! an optional chain of animation nodes. Cross-vector references (origin
//! parents, ratio targets, wrap bounds, fly control points) are weak and
//! re-checked on every evaluation: a dead or re-entrant reference turns the
//! referring node into a no-op for that pass instead of failing.
//!
//! There is no global clock. Every read takes an explicit [`Tick`] and
//! every animation command carries absolute times; within one tick a
//! committed evaluation is cached and repeated reads are idempotent.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::error::{CelError, CelResult};
use crate::geom::{Point, Rect, Tick};

use super::chain::AnimChain;
use super::node::{
    AnimNode, EasingNode, FlyKeyframe, FlyNode, RatioNode, RotateNode, TYPE_EASING, TYPE_FLY,
    TYPE_RATIO, TYPE_ROTATE, WrapClipNode,
};

/// Longest origin chain accepted when reparenting.
const MAX_ORIGIN_DEPTH: usize = 32;

#[derive(Debug, Default)]
struct VectorState {
    pos: Point,
    chain: Option<AnimChain>,
}

impl VectorState {
    fn chain_mut(&mut self) -> &mut AnimChain {
        let pos = self.pos;
        self.chain.get_or_insert_with(|| AnimChain::new(pos))
    }

    fn world(&mut self, t: Tick) -> Point {
        match &mut self.chain {
            Some(chain) => {
                if !chain.is_fresh(t) {
                    chain.evaluate(t, true);
                }
                chain.cache.world
            }
            None => self.pos,
        }
    }

    fn probe(&mut self, t: Tick) -> ParentInfo {
        match &mut self.chain {
            Some(chain) => {
                if !chain.is_fresh(t) {
                    chain.evaluate(t, true);
                }
                ParentInfo {
                    world: chain.cache.world,
                    total_angle: chain.cache.total_angle,
                    flip: chain.cache.flip & 1 != 0,
                }
            }
            None => ParentInfo {
                world: self.pos,
                total_angle: 0.0,
                flip: false,
            },
        }
    }
}

/// Parent-facing view of an evaluated vector.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ParentInfo {
    pub world: Point,
    pub total_angle: f64,
    pub flip: bool,
}

/// Weak handle used for every cross-vector reference.
#[derive(Clone, Debug, Default)]
pub struct WeakAnim(Weak<RefCell<VectorState>>);

impl WeakAnim {
    pub fn upgrade(&self) -> Option<AnimVector> {
        self.0.upgrade().map(|inner| AnimVector { inner })
    }

    /// Evaluated world position, or `None` when the vector is gone or is
    /// already being evaluated further up the call stack.
    pub(crate) fn probe_xy(&self, t: Tick) -> Option<Point> {
        let rc = self.0.upgrade()?;
        let mut state = rc.try_borrow_mut().ok()?;
        Some(state.world(t))
    }

    pub(crate) fn probe(&self, t: Tick) -> Option<ParentInfo> {
        let rc = self.0.upgrade()?;
        let mut state = rc.try_borrow_mut().ok()?;
        Some(state.probe(t))
    }
}

/// Full evaluated state of a vector at one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VectorSnapshot {
    pub x: i32,
    pub y: i32,
    pub local_x: i32,
    pub local_y: i32,
    pub origin_x: i32,
    pub origin_y: i32,
    /// World angle in radians, normalized to `[0, 2π)`.
    pub angle: f64,
    pub local_angle: f64,
}

/// Shared handle to an animated 2D point. Cloning shares the underlying
/// state; use [`AnimVector::downgrade`] for non-owning references.
#[derive(Clone, Debug, Default)]
pub struct AnimVector {
    inner: Rc<RefCell<VectorState>>,
}

impl AnimVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(x: i32, y: i32) -> Self {
        let v = Self::default();
        v.inner.borrow_mut().pos = Point::new(x, y);
        v
    }

    pub fn downgrade(&self) -> WeakAnim {
        WeakAnim(Rc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // --- evaluated reads -------------------------------------------------

    /// World X at `t`. Idempotent within a tick.
    pub fn x(&self, t: Tick) -> i32 {
        self.inner.borrow_mut().world(t).x
    }

    /// World Y at `t`.
    pub fn y(&self, t: Tick) -> i32 {
        self.inner.borrow_mut().world(t).y
    }

    pub fn position(&self, t: Tick) -> Point {
        self.inner.borrow_mut().world(t)
    }

    /// Local (pre-parent) X at `t`.
    pub fn local_x(&self, t: Tick) -> i32 {
        let mut state = self.inner.borrow_mut();
        state.world(t);
        match &state.chain {
            Some(chain) => chain.cache.local.x,
            None => state.pos.x,
        }
    }

    pub fn local_y(&self, t: Tick) -> i32 {
        let mut state = self.inner.borrow_mut();
        state.world(t);
        match &state.chain {
            Some(chain) => chain.cache.local.y,
            None => state.pos.y,
        }
    }

    /// World angle in radians, normalized to `[0, 2π)`.
    pub fn angle(&self, t: Tick) -> f64 {
        let mut state = self.inner.borrow_mut();
        state.world(t);
        match &state.chain {
            Some(chain) => normalize_angle(chain.cache.total_angle),
            None => 0.0,
        }
    }

    pub fn local_angle(&self, t: Tick) -> f64 {
        let mut state = self.inner.borrow_mut();
        state.world(t);
        match &state.chain {
            Some(chain) => normalize_angle(chain.cache.local_angle),
            None => 0.0,
        }
    }

    /// Mirror parity accumulated down the origin chain.
    pub fn flip(&self, t: Tick) -> bool {
        let mut state = self.inner.borrow_mut();
        state.world(t);
        match &state.chain {
            Some(chain) => chain.cache.flip & 1 != 0,
            None => false,
        }
    }

    /// Full evaluated state. Commits node progress only when the requested
    /// time equals `now`; historical or future peeks leave the vector
    /// untouched.
    pub fn snapshot(&self, time: Option<Tick>, now: Tick) -> VectorSnapshot {
        let t = time.unwrap_or(now);
        let commit = t == now;
        let mut state = self.inner.borrow_mut();
        match &mut state.chain {
            Some(chain) => {
                if !(commit && chain.is_fresh(t)) {
                    chain.evaluate(t, commit);
                }
                VectorSnapshot {
                    x: chain.cache.world.x,
                    y: chain.cache.world.y,
                    local_x: chain.cache.local.x,
                    local_y: chain.cache.local.y,
                    origin_x: chain.cache.parent.x,
                    origin_y: chain.cache.parent.y,
                    angle: normalize_angle(chain.cache.total_angle),
                    local_angle: normalize_angle(chain.cache.local_angle),
                }
            }
            None => VectorSnapshot {
                x: state.pos.x,
                y: state.pos.y,
                local_x: state.pos.x,
                local_y: state.pos.y,
                ..VectorSnapshot::default()
            },
        }
    }

    // --- direct state ----------------------------------------------------

    pub fn set_x(&self, x: i32) {
        let mut state = self.inner.borrow_mut();
        state.pos.x = x;
        if let Some(chain) = &mut state.chain {
            chain.base.x = x;
            chain.invalidate();
        }
    }

    pub fn set_y(&self, y: i32) {
        let mut state = self.inner.borrow_mut();
        state.pos.y = y;
        if let Some(chain) = &mut state.chain {
            chain.base.y = y;
            chain.invalidate();
        }
    }

    /// Teleports and clears every node, origin and offset.
    pub fn move_to(&self, x: i32, y: i32) {
        let mut state = self.inner.borrow_mut();
        state.pos = Point::new(x, y);
        state.chain = None;
    }

    pub fn offset(&self, dx: i32, dy: i32) {
        let mut state = self.inner.borrow_mut();
        let delta = Point::new(dx, dy);
        state.pos += delta;
        if let Some(chain) = &mut state.chain {
            chain.offset += delta;
            chain.invalidate();
        }
    }

    pub fn set_angle(&self, angle_rad: f64) {
        let mut state = self.inner.borrow_mut();
        let chain = state.chain_mut();
        chain.base_angle = angle_rad;
        chain.invalidate();
    }

    pub fn set_flip(&self, on: bool) {
        let mut state = self.inner.borrow_mut();
        let chain = state.chain_mut();
        chain.flip_accum = i32::from(on);
        chain.invalidate();
    }

    // --- origin ----------------------------------------------------------

    pub fn origin(&self) -> Option<AnimVector> {
        self.inner.borrow().chain.as_ref()?.parent.upgrade()
    }

    /// Reparents the vector, preserving its local position. A parent chain
    /// that would loop back to this vector (or run deeper than 32 links)
    /// leaves the origin unchanged.
    pub fn set_origin(&self, parent: Option<&AnimVector>, now: Tick) {
        if let Some(p) = parent {
            if self.reaches_self(p) {
                tracing::debug!("origin change rejected: would create a cycle");
                return;
            }
        }
        let mut state = self.inner.borrow_mut();
        let chain = state.chain_mut();
        chain.evaluate(now, true);
        let local = chain.cache.local;
        chain.reset(Point::ZERO);
        chain.parent = parent.map(AnimVector::downgrade).unwrap_or_default();
        chain.evaluate(now, true);
        chain.base += local - chain.cache.local;
        chain.invalidate();
    }

    fn reaches_self(&self, candidate: &AnimVector) -> bool {
        let mut cur = Some(candidate.clone());
        for _ in 0..MAX_ORIGIN_DEPTH {
            let Some(v) = cur else {
                return false;
            };
            if self.ptr_eq(&v) {
                return true;
            }
            cur = v.origin();
        }
        true
    }

    // --- animation commands ----------------------------------------------

    /// Eases by `(dx, dy)` from the current local position over
    /// `[t0, t1)`. `t1 ≤ t0` teleports immediately. `bounce` re-applies the
    /// delta each period; `pingpong` retraces it; `replace` absorbs any
    /// in-flight easing first.
    pub fn rel_move(
        &self,
        dx: i32,
        dy: i32,
        t0: Tick,
        t1: Tick,
        bounce: bool,
        pingpong: bool,
        replace: bool,
    ) {
        let mut state = self.inner.borrow_mut();
        let delta = Point::new(dx, dy);
        if t1 <= t0 {
            match &mut state.chain {
                Some(chain) => {
                    if replace {
                        chain.remove_kind_absorbing(TYPE_EASING, t0);
                    }
                    chain.base += delta;
                    chain.invalidate();
                }
                None => state.pos += delta,
            }
            return;
        }
        let chain = state.chain_mut();
        if replace {
            chain.remove_kind_absorbing(TYPE_EASING, t0);
        }
        chain.insert(AnimNode::Easing(EasingNode {
            delta,
            accum: Point::ZERO,
            start: t0.0,
            end: t1.0,
            bounce,
            pingpong,
            loose_level: 0,
            loose_timer: t0.0,
        }));
        chain.invalidate();
    }

    /// Plain additive easing segment.
    pub fn rel_offset(&self, dx: i32, dy: i32, t0: Tick, t1: Tick) {
        self.rel_move(dx, dy, t0, t1, false, false, false);
    }

    pub fn loose_level(&self) -> i32 {
        self.inner
            .borrow()
            .chain
            .as_ref()
            .map_or(0, AnimChain::loose_level)
    }

    pub fn set_loose_level(&self, level: i32) {
        if let Some(chain) = &mut self.inner.borrow_mut().chain {
            chain.set_loose_level(level);
        }
    }

    /// Follows `target` at `scale/denom` of its evaluated position, added
    /// to this vector's base. Re-issuing replaces the previous ratio.
    pub fn ratio(
        &self,
        target: &AnimVector,
        denom_x: i32,
        denom_y: i32,
        scale_x: i32,
        scale_y: i32,
    ) -> CelResult<()> {
        if denom_x == 0 || denom_y == 0 {
            return Err(CelError::invalid_argument(
                "ratio denominator must be non-zero",
            ));
        }
        let mut state = self.inner.borrow_mut();
        let chain = state.chain_mut();
        chain.remove_kind(TYPE_RATIO);
        chain.insert(AnimNode::Ratio(RatioNode {
            target: target.downgrade(),
            denom: Point::new(denom_x, denom_y),
            scale: Point::new(scale_x, scale_y),
        }));
        chain.invalidate();
        Ok(())
    }

    /// Wraps (or clamps) the world position into `rect`, translated by the
    /// bounds vector when given. Re-issuing replaces the previous node.
    pub fn wrap_clip(&self, bounds: Option<&AnimVector>, rect: Rect, clamp: bool) {
        let mut state = self.inner.borrow_mut();
        let chain = state.chain_mut();
        chain.insert(AnimNode::WrapClip(WrapClipNode {
            bounds: bounds.map(AnimVector::downgrade),
            rect,
            clamp,
        }));
        chain.invalidate();
    }

    /// Rotates by `angle_rad` over `period_ms` starting at `now`, with
    /// quadratic ease-in/out windows of `ease_ms`. `period_ms == 0` turns
    /// instantly; `angle_rad == 0` spins continuously at one revolution per
    /// period. Replaces any in-flight rotation, keeping its progress.
    pub fn rotate(&self, angle_rad: f64, period_ms: i32, ease_ms: i32, now: Tick) {
        let mut state = self.inner.borrow_mut();
        let chain = state.chain_mut();
        chain.remove_kind_absorbing_angle(TYPE_ROTATE, now);
        let period = period_ms.max(0);
        chain.insert(AnimNode::Rotate(RotateNode {
            total: angle_rad,
            start: now.0,
            period_ms: period,
            ease_ms: ease_ms.clamp(0, period / 2),
        }));
        chain.invalidate();
    }

    /// Flies along a cubic Hermite spline through `keys`. Keyframe times
    /// must be strictly increasing; an empty list is a no-op. On completion
    /// the base is set to `completion`'s evaluated position (or the landing
    /// point) once, and the node is removed.
    pub fn fly(&self, keys: Vec<FlyKeyframe>, completion: Option<&AnimVector>) -> CelResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        if keys.windows(2).any(|w| w[1].time <= w[0].time) {
            return Err(CelError::invalid_argument(
                "fly keyframe times must be strictly increasing",
            ));
        }
        let mut state = self.inner.borrow_mut();
        let chain = state.chain_mut();
        chain.remove_kind(TYPE_FLY);
        chain.insert(AnimNode::Fly(FlyNode {
            keys,
            completion: completion.map(AnimVector::downgrade),
        }));
        chain.invalidate();
        Ok(())
    }

    /// Rescales the world position about `center`. A zero divisor is a
    /// silent no-op. Clears the chain like `move_to`.
    pub fn scale(&self, sx: i32, div_x: i32, sy: i32, div_y: i32, center: Point, now: Tick) {
        if div_x == 0 || div_y == 0 {
            return;
        }
        let mut state = self.inner.borrow_mut();
        let world = state.world(now);
        let nx = center.x
            + (i64::from(world.x - center.x) * i64::from(sx) / i64::from(div_x)) as i32;
        let ny = center.y
            + (i64::from(world.y - center.y) * i64::from(sy) / i64::from(div_y)) as i32;
        state.pos = Point::new(nx, ny);
        state.chain = None;
    }
}

fn normalize_angle(a: f64) -> f64 {
    a.rem_euclid(std::f64::consts::TAU)
}
