//! Definitions, ranges and column layout of one interaction family.
//!
//! An [`InteractionClassSpec`] is filled in by sequential passes, each over
//! every defined interaction:
//!
//! 1. **define** – which type (or density group) combinations exist;
//! 2. **ranges** – `lower upper mode` per defined interaction, with cutoffs
//!    snapped to the basis grid for force-matched ones;
//! 3. **columns** – the block of design-matrix columns of each matched
//!    interaction;
//! 4. **tables** – control points of externally tabulated interactions.

use super::density::DensityParameters;
use super::family::{InteractionFamily, RangeSource};
use super::three_body::ThreeBodyParameters;
use crate::basis::{SplineGrid, TabulatedForce, basis_function_count};
use crate::hashing;
use crate::io::{self, range::RangeReader, table::TableReader};
use crate::model::topology::Topology;
use crate::model::types::{AngleStyle, BasisType, DihedralStyle, ThreeBodyStyle};
use crate::setup::{Binning, Error, ModelConfig};
use std::ops::Range;

/// Tolerance used when snapping cutoffs onto a grid.
const GRID_TOLERANCE: f64 = 1.0e-6;

/// Interactions needing more basis functions than this are reported.
const BASIS_FUNCTION_WARNING: usize = 1000;

/// Family-specific settings and tables.
#[derive(Debug, Clone, PartialEq)]
pub enum FamilyDetails {
    Plain,
    Angular(AngleStyle),
    Dihedral(DihedralStyle),
    ThreeBody(ThreeBodyParameters),
    Density(DensityParameters),
}

/// Defined, matched and tabulated interactions of one family.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionClassSpec {
    family: InteractionFamily,
    basis: BasisType,
    binning: Binning,
    cutoff: f64,
    /// Names of the types (or density groups) interactions are built from.
    labels: Vec<String>,
    n_defined: usize,
    /// Hash of each defined interaction; empty when the hash is the index.
    defined_to_possible: Vec<usize>,
    defined_to_matched: Vec<usize>,
    defined_to_tabulated: Vec<usize>,
    lower_cutoffs: Vec<f64>,
    upper_cutoffs: Vec<f64>,
    column_indices: Vec<usize>,
    n_matched: usize,
    n_tabulated: usize,
    tables: Vec<Option<TabulatedForce>>,
    details: FamilyDetails,
}

impl InteractionClassSpec {
    /// Runs the define pass for `family`.
    pub fn define(
        family: InteractionFamily,
        config: &ModelConfig,
        topology: &Topology,
    ) -> Result<Self, Error> {
        let n_types = topology.n_types();
        let mut spec = Self::empty(family, config, topology.types.clone());

        if family.is_topology_filtered() {
            spec.defined_to_possible = topology.active_hashes(family.n_body());
            spec.n_defined = spec.defined_to_possible.len();
        }

        match family {
            InteractionFamily::PairNonbonded => {
                spec.cutoff = config.pair_nonbonded_cutoff;
                spec.n_defined = hashing::n_distinct_pairs(n_types);
            }
            InteractionFamily::PairBonded => {}
            InteractionFamily::Angular => {
                spec.details = FamilyDetails::Angular(config.angular.style);
            }
            InteractionFamily::Dihedral => {
                spec.details = FamilyDetails::Dihedral(config.dihedral.style);
            }
            InteractionFamily::ThreeBodyNonbonded => {
                let (hashes, parameters) = ThreeBodyParameters::define(config, topology)?;
                spec.cutoff = parameters.max_cutoff();
                spec.n_defined = hashes.len();
                spec.defined_to_possible = hashes;
                spec.details = FamilyDetails::ThreeBody(parameters);
            }
            InteractionFamily::Density => {
                let parameters = DensityParameters::define(config, topology)?;
                spec.cutoff = parameters.cutoff();
                spec.labels = parameters.group_names().to_vec();
                spec.n_defined = parameters.n_defined();
                spec.details = FamilyDetails::Density(parameters);
            }
        }

        spec.defined_to_matched = vec![0; spec.n_defined];
        spec.defined_to_tabulated = vec![0; spec.n_defined];
        spec.lower_cutoffs = vec![0.0; spec.n_defined];
        spec.upper_cutoffs = vec![0.0; spec.n_defined];

        if family == InteractionFamily::ThreeBodyNonbonded {
            // Every three-body triplet is fitted over the whole angle range.
            for i in 0..spec.n_defined {
                spec.defined_to_matched[i] = i + 1;
                spec.upper_cutoffs[i] = 180.0;
            }
            spec.n_matched = spec.n_defined;
        }

        log::debug!("defined {} {} interactions", spec.n_defined, family);
        Ok(spec)
    }

    fn empty(family: InteractionFamily, config: &ModelConfig, labels: Vec<String>) -> Self {
        Self {
            family,
            basis: config.basis,
            binning: config.binning(family),
            cutoff: 0.0,
            labels,
            n_defined: 0,
            defined_to_possible: Vec::new(),
            defined_to_matched: Vec::new(),
            defined_to_tabulated: Vec::new(),
            lower_cutoffs: Vec::new(),
            upper_cutoffs: Vec::new(),
            column_indices: vec![0],
            n_matched: 0,
            n_tabulated: 0,
            tables: Vec::new(),
            details: FamilyDetails::Plain,
        }
    }

    /// Reads one range record per defined interaction and adjusts the
    /// cutoffs of force-matched ones.
    pub(crate) fn read_ranges(&mut self, reader: &mut RangeReader) -> Result<(), Error> {
        if self.n_defined == 0 || self.family.range_source() == RangeSource::Builtin {
            return Ok(());
        }
        log::info!(
            "Reading interaction ranges for {} {} interactions",
            self.n_defined,
            self.family
        );

        for i in 0..self.n_defined {
            let record = reader.next_record(self.family.n_body())?;
            self.check_names(i, &record.names, record.line);

            self.lower_cutoffs[i] = record.lower;
            self.upper_cutoffs[i] = record.upper;

            if record.mode.is_matched() {
                self.n_matched += 1;
                self.defined_to_matched[i] = self.n_matched;
                self.adjust_cutoffs_for_basis(i);
                self.adjust_cutoffs_for_type(i);
                if !(self.upper_cutoffs[i] > self.lower_cutoffs[i]) {
                    return Err(io::Error::parse(
                        io::Format::Range,
                        record.line,
                        format!(
                            "range [{}, {}] is empty after snapping to the basis grid",
                            self.lower_cutoffs[i], self.upper_cutoffs[i]
                        ),
                    )
                    .into());
                }
            }
            if record.mode.is_tabulated() {
                self.n_tabulated += 1;
                self.defined_to_tabulated[i] = self.n_tabulated;
            }
            if let FamilyDetails::Density(parameters) = &mut self.details {
                parameters.set_weight_parameters(i, &record.extra);
            }
        }

        log::info!(
            "Will force match {} {} interactions; {} are tabulated",
            self.n_matched,
            self.family,
            self.n_tabulated
        );
        Ok(())
    }

    fn check_names(&self, index: usize, names: &[String], line: usize) {
        let expected = self.interaction_labels(index);
        let forward = names.iter().map(String::as_str).eq(expected.iter().copied());
        let reverse = names
            .iter()
            .map(String::as_str)
            .eq(expected.iter().rev().copied());
        if !forward && !reverse {
            log::warn!(
                "range line {} names '{}' but the {} interaction at this position is '{}'",
                line,
                names.join(" "),
                self.family,
                expected.join(" ")
            );
        }
    }

    fn adjust_cutoffs_for_basis(&mut self, i: usize) {
        let Binning {
            fm_binwidth,
            output_binwidth,
            ..
        } = self.binning;
        match self.basis {
            BasisType::LinearSpline => {
                let lower = ((self.lower_cutoffs[i] / output_binwidth + 0.5).floor()
                    * output_binwidth)
                    .max(0.0);
                let steps = ((self.upper_cutoffs[i] - lower) / fm_binwidth + 0.5).floor();
                self.lower_cutoffs[i] = lower;
                self.upper_cutoffs[i] = lower + steps * fm_binwidth;
            }
            BasisType::BSpline => {
                let upper_bins = (self.upper_cutoffs[i] / output_binwidth - GRID_TOLERANCE).ceil();
                let upper = upper_bins * output_binwidth;
                let steps = ((upper - self.lower_cutoffs[i]) / fm_binwidth - GRID_TOLERANCE).ceil();
                self.upper_cutoffs[i] = upper;
                self.lower_cutoffs[i] = upper - steps * fm_binwidth;
            }
        }
    }

    fn adjust_cutoffs_for_type(&mut self, i: usize) {
        if self.basis == BasisType::LinearSpline
            && self.family == InteractionFamily::PairNonbonded
            && (self.upper_cutoffs[i] - self.cutoff - self.binning.fm_binwidth).abs()
                < GRID_TOLERANCE
        {
            self.upper_cutoffs[i] -= self.binning.fm_binwidth;
        }
        if matches!(self.details, FamilyDetails::Dihedral(DihedralStyle::Degrees)) {
            self.lower_cutoffs[i] -= 180.0;
            self.upper_cutoffs[i] -= 180.0;
        }
    }

    /// Fails if a matched nonbonded range reaches past the nonbonded cutoff
    /// by more than one output bin.
    pub(crate) fn check_nonbonded_cutoffs(&self) -> Result<(), Error> {
        if self.family != InteractionFamily::PairNonbonded {
            return Ok(());
        }
        let limit = self.cutoff + self.binning.output_binwidth + 1.0e-14;
        for i in 0..self.n_defined {
            if self.defined_to_matched[i] != 0 && self.upper_cutoffs[i] > limit {
                return Err(Error::NonbondedCutoffExceeded {
                    upper: self.upper_cutoffs[i],
                    cutoff: self.cutoff,
                });
            }
        }
        Ok(())
    }

    /// Assigns each matched interaction its block of columns, in defined order.
    pub(crate) fn assign_columns(&mut self) {
        let mut column_indices = Vec::with_capacity(self.n_matched + 1);
        column_indices.push(0);
        for i in 0..self.n_defined {
            if self.defined_to_matched[i] == 0 {
                continue;
            }
            let n_break = self.n_break(i);
            if n_break > BASIS_FUNCTION_WARNING {
                log::warn!(
                    "{} interaction '{}' has {} bins; check that this is intentional \
                     and that the angle and dihedral styles are right",
                    self.family,
                    self.interaction_name(i),
                    n_break
                );
            }
            let last = column_indices.last().copied().unwrap_or(0);
            column_indices.push(last + self.n_basis_for_break(n_break));
        }
        self.column_indices = column_indices;
    }

    fn n_basis_for_break(&self, n_break: usize) -> usize {
        match &self.details {
            FamilyDetails::ThreeBody(p) if p.style == ThreeBodyStyle::StillingerWeber => 1,
            _ => basis_function_count(self.basis, self.binning.bspline_k, n_break),
        }
    }

    /// Reads this family's section of a table file.
    pub(crate) fn read_table(&mut self, reader: &mut TableReader) -> Result<(), Error> {
        let header = reader.next_header()?;
        let table_name = self.family.table_name();
        if header.name != table_name {
            return Err(Error::TableFamilyMismatch {
                line: header.line,
                expected: table_name,
                found: header.name,
            });
        }
        if header.count != self.n_tabulated {
            return Err(Error::TableCountMismatch {
                line: header.line,
                family: table_name,
                declared: header.count,
                expected: self.n_tabulated,
            });
        }

        self.tables = vec![None; self.n_tabulated];
        for _ in 0..header.count {
            let block = reader.next_block(self.family.n_body(), header.binwidth)?;
            let undefined = || Error::UndefinedTabulatedInteraction {
                line: block.line,
                family: table_name,
                types: block.names.join(" "),
            };
            let types = block
                .names
                .iter()
                .map(|name| self.resolve_label(name))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(undefined)?;
            let tabulated = self
                .hash_types(&types)
                .and_then(|hash| self.index_from_hash(hash))
                .map(|index| self.defined_to_tabulated[index])
                .filter(|&t| t != 0)
                .ok_or_else(undefined)?;
            self.tables[tabulated - 1] = Some(block.force);
        }
        Ok(())
    }

    /// 1-based type of a label, given by name or directly as a number.
    fn resolve_label(&self, name: &str) -> Option<usize> {
        match name.parse::<usize>() {
            Ok(t) if (1..=self.labels.len()).contains(&t) => Some(t),
            Ok(_) => None,
            Err(_) => self.labels.iter().position(|l| l == name).map(|i| i + 1),
        }
    }

    /// Hash of a tuple of 1-based types (or density groups).
    pub fn hash_types(&self, types: &[usize]) -> Option<usize> {
        match self.family {
            InteractionFamily::Density => {
                let n = self.labels.len();
                match *types {
                    [g1, g2] if (1..=n).contains(&g1) && (1..=n).contains(&g2) => {
                        Some((g1 - 1) * n + (g2 - 1))
                    }
                    _ => None,
                }
            }
            _ if types.len() == self.family.n_body() => {
                hashing::interaction_hash(types, self.labels.len())
            }
            _ => None,
        }
    }

    /// Defined index of an interaction hash.
    pub fn index_from_hash(&self, hash: usize) -> Option<usize> {
        if self.defined_to_possible.is_empty() {
            (hash < self.n_defined).then_some(hash)
        } else {
            self.defined_to_possible.binary_search(&hash).ok()
        }
    }

    pub fn hash_from_index(&self, index: usize) -> usize {
        if self.defined_to_possible.is_empty() {
            index
        } else {
            self.defined_to_possible[index]
        }
    }

    /// 1-based types (or density groups) of a defined interaction.
    pub fn interaction_types(&self, index: usize) -> Vec<usize> {
        let n = self.labels.len();
        match self.family {
            InteractionFamily::Density => vec![index / n + 1, index % n + 1],
            _ => hashing::invert_interaction_hash(
                self.hash_from_index(index),
                self.family.n_body(),
                n,
            ),
        }
    }

    pub fn interaction_labels(&self, index: usize) -> Vec<&str> {
        self.interaction_types(index)
            .into_iter()
            .map(|t| self.labels.get(t - 1).map_or("?", String::as_str))
            .collect()
    }

    /// `type1_type2[_..._typeN][_short]`.
    pub fn interaction_name(&self, index: usize) -> String {
        let mut name = self.interaction_labels(index).join("_");
        let short = self.family.short_name();
        if !short.is_empty() {
            name.push('_');
            name.push_str(short);
        }
        name
    }

    #[inline]
    pub fn family(&self) -> InteractionFamily {
        self.family
    }

    #[inline]
    pub fn basis(&self) -> BasisType {
        self.basis
    }

    #[inline]
    pub fn binning(&self) -> Binning {
        self.binning
    }

    /// Nonbonded cutoff, density cutoff or largest three-body cutoff.
    #[inline]
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    #[inline]
    pub fn n_defined(&self) -> usize {
        self.n_defined
    }

    #[inline]
    pub fn n_matched(&self) -> usize {
        self.n_matched
    }

    #[inline]
    pub fn n_tabulated(&self) -> usize {
        self.n_tabulated
    }

    pub fn details(&self) -> &FamilyDetails {
        &self.details
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn defined_to_possible(&self) -> &[usize] {
        &self.defined_to_possible
    }

    /// 0 when not matched, else the 1-based position among matched interactions.
    pub fn defined_to_matched(&self) -> &[usize] {
        &self.defined_to_matched
    }

    /// 0 when not tabulated, else the 1-based position among tabulated interactions.
    pub fn defined_to_tabulated(&self) -> &[usize] {
        &self.defined_to_tabulated
    }

    pub fn lower_cutoffs(&self) -> &[f64] {
        &self.lower_cutoffs
    }

    pub fn upper_cutoffs(&self) -> &[f64] {
        &self.upper_cutoffs
    }

    /// Starting column of each matched interaction, then the total.
    pub fn column_indices(&self) -> &[usize] {
        &self.column_indices
    }

    /// Number of columns of the whole family.
    pub fn n_columns(&self) -> usize {
        self.column_indices.last().copied().unwrap_or(0)
    }

    /// Columns of a matched interaction, relative to the family's block.
    pub fn column_range(&self, index: usize) -> Option<Range<usize>> {
        let m = *self.defined_to_matched.get(index)?;
        if m == 0 || m >= self.column_indices.len() {
            return None;
        }
        Some(self.column_indices[m - 1]..self.column_indices[m])
    }

    /// Number of break points of a defined interaction's range.
    pub fn n_break(&self, index: usize) -> usize {
        let width = self.upper_cutoffs[index] - self.lower_cutoffs[index];
        (width / self.binning.fm_binwidth + 0.5).floor().max(0.0) as usize + 1
    }

    /// Basis grid of a defined interaction.
    pub fn grid(&self, index: usize) -> SplineGrid {
        SplineGrid::new(
            self.lower_cutoffs[index],
            self.binning.fm_binwidth,
            self.n_break(index),
        )
    }

    /// External table of a tabulated interaction, once read.
    pub fn table(&self, index: usize) -> Option<&TabulatedForce> {
        let t = *self.defined_to_tabulated.get(index)?;
        self.tables.get(t.checked_sub(1)?)?.as_ref()
    }

    /// Whether `value` lies in a matched interaction's range.
    #[inline]
    pub fn in_range(&self, index: usize, value: f64) -> bool {
        self.lower_cutoffs[index] <= value && value <= self.upper_cutoffs[index]
    }
}
