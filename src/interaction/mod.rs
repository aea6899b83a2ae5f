//! Interaction families and their design-matrix contributions.
//!
//! Each family is described by an [`InteractionClassSpec`], built once by
//! the setup pipeline, and evaluated per frame by an
//! [`InteractionClassComputer`] that borrows it.

mod computer;
mod density;
mod family;
mod spec;
mod three_body;

pub use computer::{ForceGrid, InteractionClassComputer};
pub use density::{DensityParameters, WeightFunction};
pub use family::{InteractionFamily, RangeSource};
pub use spec::{FamilyDetails, InteractionClassSpec};
pub use three_body::{ThreeBodyParameters, ThreeBodyTerm};
