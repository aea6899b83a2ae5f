//! Plain-text formats read and written around the interaction model.
//!
//! - [`range`] – per-interaction `lower upper mode` range specifications.
//! - [`table`] – externally tabulated force splines.
//! - [`solution`] – whitespace-separated solution (coefficient) vectors.
//! - [`output`] – force tables, LAMMPS tables and spline coefficient records.
//!
//! Readers report malformed input as [`Error::Parse`] with the offending
//! line number.

use std::fmt;

pub mod error;
pub mod output;
pub mod range;
pub mod solution;
pub mod table;
pub(crate) mod util;

pub use error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Range,
    Table,
    Solution,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Range => write!(f, "range"),
            Format::Table => write!(f, "table"),
            Format::Solution => write!(f, "solution"),
        }
    }
}
