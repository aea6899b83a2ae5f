//! Input data structures for the interaction model.
//!
//! - [`types`] – basis types, interaction modes and per-family styles.
//! - [`topology`] – CG types, sites, bonded lists, three-body triplets and density groups.
//! - [`frame`] – site positions and the periodic box of one frame.

pub mod frame;
pub mod topology;
pub mod types;
