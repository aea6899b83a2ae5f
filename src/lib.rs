//! A pure Rust library for setting up force-matching fits of coarse-grained
//! interaction models.
//!
//! It enumerates the interactions a coarse-grained topology can contain,
//! reads their ranges and tabulated forces, lays out the columns of the
//! force-matching design matrix, and accumulates each frame's contributions
//! into any matrix backend.
//!
//! # Features
//!
//! - **Six interaction families** — pair nonbonded, pair bonded, angular,
//!   dihedral, local density and three-body nonbonded interactions
//! - **Spline bases** — clamped B-splines of any order or linear splines,
//!   with cutoffs snapped to the basis grid
//! - **Tabulated forces** — known forces subtracted from the fit target
//! - **Periodic geometry** — minimum-image distances, angles, dihedrals and
//!   Stillinger-Weber terms with analytic derivatives
//! - **Output** — force grids, LAMMPS tables and spline coefficient records
//!
//! # Quick Start
//!
//! The main entry point is [`CgModel::build`], which takes a [`ModelConfig`],
//! a [`Topology`] and the range (and optional table) files:
//!
//! ```
//! use fm_forge::{CgModel, DenseMatrix, Frame, InteractionFamily, ModelConfig, Topology};
//! use std::io::Cursor;
//!
//! let config = ModelConfig::from_toml_str("[pair_nonbonded]\nfm_binwidth = 0.5\n")?;
//! let topology = Topology::from_toml_str(
//!     r#"
//! types = ["A", "B"]
//! sites = [1, 2, 2]
//! bonds = [[0, 1], [1, 2]]
//! "#,
//! )?;
//!
//! let nonbonded = "A A 0.0 10.0 fm\nA B 0.0 10.0 fm\nB B 0.0 10.0 none\n";
//! let bonded = "A B 0.8 2.0 fm\nB B 0.8 2.0 fm\n";
//!
//! let model = CgModel::build(
//!     config,
//!     topology,
//!     Cursor::new(nonbonded),
//!     Cursor::new(bonded),
//!     None::<Cursor<&str>>,
//! )?;
//!
//! // Two nonbonded cubic B-splines on [0, 10] with 21 break points each.
//! let ranges = model.column_ranges();
//! assert_eq!(ranges[0], (InteractionFamily::PairNonbonded, 0..46));
//!
//! // Accumulate one frame: three sites, three rows each.
//! let frame = Frame::new(
//!     vec![[0.0, 0.0, 0.0], [1.1, 0.0, 0.0], [2.0, 0.8, 0.0]],
//!     [20.0, 20.0, 20.0],
//! );
//! let mut matrix = DenseMatrix::new(9, model.n_columns());
//! let count = model.accumulate_frame(&mut matrix, 0, &frame, &[[0, 1], [0, 2], [1, 2]])?;
//! assert_eq!(count, 3);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Module Organization
//!
//! - [`geometry`] — Geometric parameters and their derivatives
//! - [`hashing`] — Dense indices for type pairs, triples and quadruples
//! - [`basis`] — Spline basis evaluation and tabulated forces
//! - [`matrix`] — The [`DesignMatrix`] accumulation interface
//! - [`model`] — Basis and style enums, topology and frames
//! - [`interaction`] — Interaction families, specs and computers
//! - [`io`] — Range, table and solution readers and output writers
//! - [`setup`] — Configuration, errors and the [`CgModel`] pipeline
//!
//! # Data Types
//!
//! ## Inputs
//!
//! - [`ModelConfig`] — Basis, binwidths, cutoffs and family styles
//! - [`Topology`] — CG type names, site types and bonded lists
//! - [`Frame`] — Site positions and periodic box of one snapshot
//!
//! ## Model
//!
//! - [`CgModel`] — All interaction classes and their column layout
//! - [`InteractionClassSpec`] — Defined, matched and tabulated interactions
//!   of one family
//! - [`InteractionClassComputer`] — Per-frame accumulation and post-fit
//!   force grids
//! - [`InteractionFamily`] — Pair nonbonded, pair bonded, angular, dihedral,
//!   density or three-body
//!
//! ## Bases and Results
//!
//! - [`SplineComputer`] — B-spline and linear-spline basis evaluation
//! - [`TabulatedForce`] — Externally tabulated force curve
//! - [`ForceGrid`] — Fitted force (and derivative) on an output grid

pub mod basis;
pub mod geometry;
pub mod hashing;
pub mod interaction;
pub mod io;
pub mod matrix;
pub mod model;
pub mod setup;

pub use basis::{SplineComputer, SplineGrid, TabulatedForce};
pub use interaction::{
    ForceGrid, InteractionClassComputer, InteractionClassSpec, InteractionFamily,
};
pub use matrix::{DenseMatrix, DesignMatrix};
pub use model::frame::Frame;
pub use model::topology::{DensityGroup, ThreeBodyEntry, Topology};
pub use model::types::{
    AngleStyle, BasisType, DensityWeightStyle, DihedralStyle, InteractionMode, ThreeBodyStyle,
};
pub use setup::{CgModel, Error, ModelConfig, SetupStage};
