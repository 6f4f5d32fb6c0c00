//! Issuance forest reconstruction and rendering.
//!
//! The issued-by relation is plain string equality between one record's
//! issuer and another record's subject. Nothing guarantees it is acyclic
//! or that parents are unique, so rendering bounds its depth by the
//! number of records.

mod graph;
mod index;
mod render;

pub use graph::*;
pub use index::*;
pub use render::*;
