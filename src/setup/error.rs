//! Error types for building an interaction model.
//!
//! Every failure of the setup pipeline (configuration, topology, range file,
//! table file) and of the post-fit queries is reported through [`Error`].
//! Nothing in the library terminates the process; the caller decides.

use crate::interaction::InteractionFamily;
use crate::io;
use crate::model::types::BasisType;
use thiserror::Error;

/// Stage reached by a model's setup pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SetupStage {
    /// Defined interactions are known.
    Defined,
    /// Ranges are read and cutoffs adjusted.
    RangesRead,
    /// Design-matrix columns are assigned.
    ColumnsAssigned,
    /// External tables are read.
    TablesRead,
}

impl std::fmt::Display for SetupStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SetupStage::Defined => "defined",
            SetupStage::RangesRead => "ranges read",
            SetupStage::ColumnsAssigned => "columns assigned",
            SetupStage::TablesRead => "tables read",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while setting up or querying an interaction model.
#[derive(Debug, Error)]
pub enum Error {
    /// A range, table or solution file could not be read or parsed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Failed to parse a TOML configuration or topology.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The topology is inconsistent.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// A table section header names a different family than expected.
    #[error("table section at line {line} is '{found}' but '{expected}' was expected")]
    TableFamilyMismatch {
        /// Line of the section header.
        line: usize,
        expected: &'static str,
        found: String,
    },

    /// A table section declares a different number of interactions than
    /// the range file marked as tabulated.
    #[error(
        "table section '{family}' at line {line} declares {declared} interactions \
         but {expected} are tabulated"
    )]
    TableCountMismatch {
        line: usize,
        family: &'static str,
        declared: usize,
        expected: usize,
    },

    /// A tabulated block names an interaction that is not tabulated.
    #[error(
        "table entry at line {line} names {family} interaction '{types}' which is not tabulated"
    )]
    UndefinedTabulatedInteraction {
        line: usize,
        family: &'static str,
        types: String,
    },

    /// A force-matched nonbonded range reaches past the nonbonded cutoff.
    #[error(
        "nonbonded upper cutoff {upper} is larger than the pair nonbonded cutoff {cutoff}; \
         adjust the range file"
    )]
    NonbondedCutoffExceeded { upper: f64, cutoff: f64 },

    /// An operation is not available for the configured basis.
    #[error("{operation} is not supported for {basis} bases")]
    UnsupportedBasis {
        operation: &'static str,
        basis: BasisType,
    },

    /// A setup pass was called out of order.
    #[error("setup pass requires stage '{expected}', but the model is at '{found}'")]
    SetupOrder {
        expected: SetupStage,
        found: SetupStage,
    },

    /// A candidate tuple has the wrong number of particles for its family.
    #[error("{family} interactions take {expected} particles, got {found}")]
    TupleArity {
        family: InteractionFamily,
        expected: usize,
        found: usize,
    },

    /// A query names an interaction that is not force matched.
    #[error("{family} interaction {index} is not force matched")]
    NotMatched {
        family: InteractionFamily,
        index: usize,
    },

    /// A force curve was requested for a term fitted by one coefficient.
    #[error("{family} interaction {index} has a single coefficient and no force curve")]
    SingleCoefficient {
        family: InteractionFamily,
        index: usize,
    },

    /// A solution vector is shorter than the model's columns require.
    #[error("solution has {found} coefficients but at least {expected} are required")]
    SolutionLength { expected: usize, found: usize },
}

impl Error {
    /// Creates an [`InvalidConfig`](Error::InvalidConfig) error.
    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig(details.into())
    }

    /// Creates an [`InvalidTopology`](Error::InvalidTopology) error.
    pub fn invalid_topology(details: impl Into<String>) -> Self {
        Self::InvalidTopology(details.into())
    }

    pub(crate) fn setup_order(expected: SetupStage, found: SetupStage) -> Self {
        Self::SetupOrder { expected, found }
    }

    /// Line number in the offending input file, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::Io(e) => e.line(),
            Error::TableFamilyMismatch { line, .. }
            | Error::TableCountMismatch { line, .. }
            | Error::UndefinedTabulatedInteraction { line, .. } => Some(*line),
            _ => None,
        }
    }
}
