//! Phase-ordered node chain behind every animation vector.
//!
//! Evaluation runs a fixed pipeline: query the parent, apply fly nodes to
//! the parent position, apply easing/ratio nodes to the local position,
//! rotate the local position by the parent angle, add the offset, apply
//! wrap/clip to the world position, then apply rotate nodes to the angle.
//! Completed nodes are folded into the base values so motion never jumps
//! when a node expires.

use crate::geom::{Point, Tick};

use super::node::{AnimNode, TYPE_WRAP_CLIP};
use super::vector::WeakAnim;

/// Results of the most recent evaluation.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ChainCache {
    pub parent: Point,
    pub local: Point,
    pub world: Point,
    pub local_angle: f64,
    pub total_angle: f64,
    pub parent_angle: f64,
    pub flip: i32,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct AnimChain {
    pub parent: WeakAnim,
    pub base: Point,
    pub offset: Point,
    pub base_angle: f64,
    pub flip_accum: i32,
    nodes: Vec<AnimNode>,
    evaluated_at: Option<Tick>,
    pub cache: ChainCache,
}

impl AnimChain {
    pub(crate) fn new(base: Point) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    pub(crate) fn reset(&mut self, base: Point) {
        *self = Self::new(base);
    }

    pub(crate) fn invalidate(&mut self) {
        self.evaluated_at = None;
    }

    pub(crate) fn is_fresh(&self, t: Tick) -> bool {
        self.evaluated_at == Some(t)
    }

    pub(crate) fn has_nodes(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// First easing node's loose level, if any.
    pub(crate) fn loose_level(&self) -> i32 {
        self.nodes
            .iter()
            .find_map(|n| match n {
                AnimNode::Easing(e) => Some(e.loose_level),
                _ => None,
            })
            .unwrap_or(0)
    }

    pub(crate) fn set_loose_level(&mut self, level: i32) {
        for n in &mut self.nodes {
            if let AnimNode::Easing(e) = n {
                e.loose_level = level;
            }
        }
    }

    /// Inserts keeping nodes sorted by phase; among equal phases the new
    /// node lands last. Wrap/clip nodes replace any existing one.
    pub(crate) fn insert(&mut self, node: AnimNode) {
        if node.type_id() == TYPE_WRAP_CLIP {
            self.nodes.retain(|n| n.type_id() != TYPE_WRAP_CLIP);
        }
        let phase = node.phase();
        let at = self.nodes.partition_point(|n| n.phase() <= phase);
        self.nodes.insert(at, node);
    }

    /// Removes every node of the given kind, folding the positional delta
    /// each would have produced at `t` into the base so nothing jumps.
    pub(crate) fn remove_kind_absorbing(&mut self, type_id: u32, t: Tick) {
        let mut i = 0;
        while i < self.nodes.len() {
            if self.nodes[i].type_id() != type_id {
                i += 1;
                continue;
            }
            let mut probe = self.base;
            let before = probe;
            self.nodes[i].eval_pos(&mut probe, t, false);
            self.base += probe - before;
            self.nodes.remove(i);
        }
    }

    /// Removes every node of the given kind without absorbing anything.
    pub(crate) fn remove_kind(&mut self, type_id: u32) {
        self.nodes.retain(|n| n.type_id() != type_id);
    }

    /// Like [`Self::remove_kind_absorbing`] but for angular nodes: folds
    /// the angle each would have produced at `t` into the base angle.
    pub(crate) fn remove_kind_absorbing_angle(&mut self, type_id: u32, t: Tick) {
        let mut i = 0;
        while i < self.nodes.len() {
            if self.nodes[i].type_id() != type_id {
                i += 1;
                continue;
            }
            let mut probe = self.base_angle;
            let before = probe;
            self.nodes[i].eval_angle(&mut probe, t);
            self.base_angle += probe - before;
            self.nodes.remove(i);
        }
    }

    pub(crate) fn evaluate(&mut self, t: Tick, commit: bool) {
        if commit {
            self.evaluated_at = Some(t);
        }

        let mut par = Point::ZERO;
        let mut par_angle = 0.0;
        let mut par_flip = 0;
        if let Some(info) = self.parent.probe(t) {
            par = info.world;
            par_angle = info.total_angle;
            par_flip = i32::from(info.flip);
        }
        let flip = par_flip + self.flip_accum;

        // Phase 0: fly nodes reshape the inherited position.
        let mut i = 0;
        while i < self.nodes.len() && self.nodes[i].phase() == 0 {
            let before = par;
            let done = self.nodes[i].eval_pos(&mut par, t, commit);
            if done && commit {
                let landed = (par != before).then_some(par);
                let completion = match &mut self.nodes[i] {
                    AnimNode::Fly(f) => f.completion.take(),
                    _ => None,
                };
                self.nodes.remove(i);
                if let Some(p) = completion.and_then(|c| c.probe_xy(t)).or(landed) {
                    self.base = p;
                }
                par = before;
                continue;
            }
            i += 1;
        }

        // Phase 1: easing and ratio nodes move the local position.
        let mut local = self.base;
        while i < self.nodes.len() && self.nodes[i].phase() == 1 {
            let before = local;
            let done = self.nodes[i].eval_pos(&mut local, t, commit);
            if done && commit {
                self.base += local - before;
                self.nodes.remove(i);
                continue;
            }
            i += 1;
        }

        // Rotate the local position into the parent's frame.
        let mut rotated = local;
        if par_angle != 0.0 {
            let (sin, cos) = par_angle.sin_cos();
            let fx = f64::from(local.x) * cos - f64::from(local.y) * sin;
            let fy = f64::from(local.x) * sin + f64::from(local.y) * cos;
            let mut rx = fx.round() as i32;
            let mut ry = fy.round() as i32;
            // Symmetric rounding: rotating the negated point must negate
            // the result exactly.
            let nx = (f64::from(-local.x) * cos - f64::from(-local.y) * sin).round() as i32;
            let ny = (f64::from(-local.x) * sin + f64::from(-local.y) * cos).round() as i32;
            if nx + rx != 0 {
                rx = -nx;
            }
            if ny + ry != 0 {
                ry = -ny;
            }
            rotated = Point::new(rx, ry);
        }

        let mut world = par + rotated + self.offset;

        // Phase 2: wrap/clip reshapes the world position.
        while i < self.nodes.len() && self.nodes[i].phase() == 2 {
            let before = world;
            let done = self.nodes[i].eval_pos(&mut world, t, commit);
            if done && commit {
                self.offset += world - before;
                self.nodes.remove(i);
                continue;
            }
            i += 1;
        }

        // Phase 3: rotate nodes advance the angle.
        let mut angle = self.base_angle;
        while i < self.nodes.len() && self.nodes[i].phase() == 3 {
            let before = angle;
            let done = self.nodes[i].eval_angle(&mut angle, t);
            if done && commit {
                self.base_angle += angle - before;
                self.nodes.remove(i);
                continue;
            }
            i += 1;
        }

        self.cache = ChainCache {
            parent: par,
            local,
            world,
            local_angle: angle,
            total_angle: angle + par_angle,
            parent_angle: par_angle,
            flip,
        };
    }
}
