//! Animation vector subsystem: shared vector handles, phase-ordered node
//! chains, and the serializable command layer.

pub mod command;

mod chain;
mod node;
mod vector;

pub use node::FlyKeyframe;
pub use vector::{AnimVector, VectorSnapshot, WeakAnim};
