//! Model construction: configuration, errors and the [`CgModel`] pipeline.

mod config;
mod error;
mod model;

pub use config::{
    AngularConfig, Binning, ClassConfig, DensityConfig, DihedralConfig, ModelConfig,
    ThreeBodyConfig,
};
pub use error::{Error, SetupStage};
pub use model::CgModel;
