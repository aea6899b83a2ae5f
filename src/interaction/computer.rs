//! Per-frame evaluation of one interaction family.
//!
//! An [`InteractionClassComputer`] borrows a finished
//! [`InteractionClassSpec`] together with the family's first global column,
//! and owns the scratch buffers of its basis evaluator. For every candidate
//! tuple it resolves the defined interaction from the site types, evaluates
//! the geometric parameter and its derivatives, and adds
//! `B_b(param) · ∂param/∂x` to the design matrix for each non-zero basis
//! function `b` of a force-matched interaction. Known forces of tabulated
//! interactions are subtracted from the target instead.

use super::family::InteractionFamily;
use super::spec::{FamilyDetails, InteractionClassSpec};
use crate::basis::SplineComputer;
use crate::geometry::{self, Vec3};
use crate::matrix::DesignMatrix;
use crate::model::frame::Frame;
use crate::model::types::{AngleStyle, BasisType, DihedralStyle, ThreeBodyStyle};
use crate::setup::Error;

/// Force curve of one interaction on a uniform output grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForceGrid {
    pub axis: Vec<f64>,
    pub force: Vec<f64>,
    /// First derivative of the force; empty unless requested.
    pub derivative: Vec<f64>,
}

/// Geometric parameter of up to four sites, with the derivative of the
/// parameter with respect to every participating site.
#[derive(Debug, Clone, Copy)]
struct Parameter {
    value: f64,
    sites: [usize; 4],
    derivatives: [Vec3; 4],
    n_sites: usize,
}

impl Parameter {
    fn pair(sites: [usize; 2], p: geometry::GeometricParameter<1>) -> Self {
        Self {
            value: p.value,
            sites: [sites[0], sites[1], 0, 0],
            derivatives: [p.derivatives[0], p.last_derivative(), [0.0; 3], [0.0; 3]],
            n_sites: 2,
        }
    }

    fn participants(&self) -> impl Iterator<Item = (usize, &Vec3)> {
        self.sites
            .iter()
            .copied()
            .zip(self.derivatives.iter())
            .take(self.n_sites)
    }
}

pub struct InteractionClassComputer<'a> {
    pub(super) spec: &'a InteractionClassSpec,
    pub(super) column_offset: usize,
    pub(super) splines: SplineComputer,
}

impl<'a> InteractionClassComputer<'a> {
    /// Creates a computer whose columns start at `column_offset`.
    pub fn new(spec: &'a InteractionClassSpec, column_offset: usize) -> Self {
        Self {
            spec,
            column_offset,
            splines: SplineComputer::new(spec.basis(), spec.binning().bspline_k),
        }
    }

    #[inline]
    pub fn spec(&self) -> &'a InteractionClassSpec {
        self.spec
    }

    #[inline]
    pub fn family(&self) -> InteractionFamily {
        self.spec.family()
    }

    #[inline]
    pub fn column_offset(&self) -> usize {
        self.column_offset
    }

    /// Interaction hash of a tuple of 1-based site types.
    ///
    /// Density interactions cannot be identified from a single tuple since
    /// a type may belong to several groups; they always yield `None`.
    pub fn calculate_hash_number(&self, types: &[usize]) -> Option<usize> {
        match self.spec.family() {
            InteractionFamily::Density => None,
            _ => self.spec.hash_types(types),
        }
    }

    /// Adds the contributions of every candidate tuple of one frame.
    ///
    /// `site_types` holds the 1-based type of each site and `row_offset` the
    /// first matrix row of the frame; site `s` owns rows
    /// `row_offset + 3s .. row_offset + 3s + 3`. Tuples are pairs for pair and
    /// density families, `[end, center, end]` triples for angular and
    /// three-body families and chains of four for dihedrals. The candidates
    /// are iterated twice for density interactions.
    ///
    /// Returns the number of tuples that contributed.
    pub fn accumulate<M, I, const N: usize>(
        &mut self,
        matrix: &mut M,
        row_offset: usize,
        frame: &Frame,
        site_types: &[usize],
        candidates: I,
    ) -> Result<usize, Error>
    where
        M: DesignMatrix + ?Sized,
        I: IntoIterator<Item = [usize; N]> + Clone,
    {
        let family = self.spec.family();
        if N != family.n_body() {
            return Err(Error::TupleArity {
                family,
                expected: family.n_body(),
                found: N,
            });
        }
        let spec = self.spec;
        let count = match spec.details() {
            FamilyDetails::ThreeBody(parameters) => self.accumulate_three_body(
                parameters, matrix, row_offset, frame, site_types, candidates,
            ),
            FamilyDetails::Density(parameters) => self.accumulate_density(
                parameters, matrix, row_offset, frame, site_types, candidates,
            ),
            _ => self.accumulate_tuples(matrix, row_offset, frame, site_types, candidates),
        };
        log::trace!("{} {} tuples contributed", count, family);
        Ok(count)
    }

    fn accumulate_tuples<M, I, const N: usize>(
        &mut self,
        matrix: &mut M,
        row_offset: usize,
        frame: &Frame,
        site_types: &[usize],
        candidates: I,
    ) -> usize
    where
        M: DesignMatrix + ?Sized,
        I: IntoIterator<Item = [usize; N]>,
    {
        let spec = self.spec;
        let mut count = 0;
        for ids in candidates {
            let types = ids.map(|s| site_types.get(s).copied().unwrap_or(0));
            let Some(index) = self
                .calculate_hash_number(&types)
                .and_then(|hash| spec.index_from_hash(hash))
            else {
                continue;
            };
            let matched = spec.defined_to_matched()[index];
            let table = spec.table(index);
            if matched == 0 && table.is_none() {
                continue;
            }
            let Some(parameter) = self.evaluate_parameter(&ids, index, frame) else {
                continue;
            };

            let mut contributed = false;
            if matched != 0 && spec.in_range(index, parameter.value) {
                let grid = spec.grid(index);
                let first = self.splines.evaluate(&grid, parameter.value);
                let column = self.column_offset + spec.column_indices()[matched - 1] + first;
                for (j, &b) in self.splines.values().iter().enumerate() {
                    for (site, derivative) in parameter.participants() {
                        for dim in 0..3 {
                            let row = row_offset + 3 * site + dim;
                            matrix.add(row, column + j, b * derivative[dim]);
                        }
                    }
                }
                contributed = true;
            }
            if let Some(force) = table.and_then(|t| t.evaluate(parameter.value)) {
                for (site, derivative) in parameter.participants() {
                    for dim in 0..3 {
                        let row = row_offset + 3 * site + dim;
                        matrix.subtract_from_target(row, force * derivative[dim]);
                    }
                }
                contributed = true;
            }
            if contributed {
                count += 1;
            }
        }
        count
    }

    /// Squared distance beyond which a nonbonded pair cannot contribute.
    fn nonbonded_reach2(&self, index: usize) -> f64 {
        let mut reach: f64 = 0.0;
        if self.spec.defined_to_matched()[index] != 0 {
            reach = self.spec.upper_cutoffs()[index];
        }
        if let Some(table) = self.spec.table(index) {
            reach = reach.max(table.upper);
        }
        reach * reach
    }

    fn evaluate_parameter(&self, ids: &[usize], index: usize, frame: &Frame) -> Option<Parameter> {
        let positions = &frame.positions;
        let half_box = &frame.half_box;
        let pair = |a: usize, b: usize, cutoff2: f64| {
            geometry::distance([a, b], positions, half_box, cutoff2)
                .map(|p| Parameter::pair([a, b], p))
        };

        match (self.spec.family(), self.spec.details()) {
            (InteractionFamily::PairNonbonded, _) => {
                pair(ids[0], ids[1], self.nonbonded_reach2(index))
            }
            (InteractionFamily::PairBonded, _) => pair(ids[0], ids[1], f64::MAX),
            (_, FamilyDetails::Angular(AngleStyle::Distance)) => pair(ids[0], ids[2], f64::MAX),
            (_, FamilyDetails::Angular(AngleStyle::Degrees)) => {
                let ids = [ids[0], ids[1], ids[2]];
                let p = geometry::angle(ids, positions, half_box, f64::MAX)?;
                Some(Parameter {
                    value: p.value,
                    sites: [ids[0], ids[1], ids[2], 0],
                    derivatives: [
                        p.derivatives[0],
                        p.derivatives[1],
                        p.last_derivative(),
                        [0.0; 3],
                    ],
                    n_sites: 3,
                })
            }
            (_, FamilyDetails::Dihedral(DihedralStyle::Distance)) => pair(ids[0], ids[3], f64::MAX),
            (_, FamilyDetails::Dihedral(DihedralStyle::Degrees)) => {
                let ids = [ids[0], ids[1], ids[2], ids[3]];
                let p = geometry::dihedral(ids, positions, half_box);
                Some(Parameter {
                    value: p.value,
                    sites: ids,
                    derivatives: [
                        p.derivatives[0],
                        p.derivatives[1],
                        p.derivatives[2],
                        p.last_derivative(),
                    ],
                    n_sites: 4,
                })
            }
            _ => None,
        }
    }

    /// Coefficients of a matched interaction within the global solution.
    fn local_coefficients<'s>(
        &self,
        solution: &'s [f64],
        index: usize,
    ) -> Result<&'s [f64], Error> {
        let not_matched = || Error::NotMatched {
            family: self.spec.family(),
            index,
        };
        let local = self.spec.column_range(index).ok_or_else(not_matched)?;
        let range = self.column_offset + local.start..self.column_offset + local.end;
        solution.get(range.clone()).ok_or(Error::SolutionLength {
            expected: range.end,
            found: solution.len(),
        })
    }

    fn check_curve(&self, index: usize) -> Result<(), Error> {
        if let FamilyDetails::ThreeBody(p) = self.spec.details() {
            if p.style == ThreeBodyStyle::StillingerWeber {
                return Err(Error::SingleCoefficient {
                    family: self.spec.family(),
                    index,
                });
            }
        }
        Ok(())
    }

    /// Output axis `(trunc(lower/bw) + 1)·bw + i·bw` for every point below
    /// the upper cutoff.
    fn output_axis(&self, index: usize, binwidth: f64) -> Vec<f64> {
        let lower = self.spec.lower_cutoffs()[index];
        let upper = self.spec.upper_cutoffs()[index];
        let start = ((lower / binwidth).trunc() + 1.0) * binwidth;
        (0..)
            .map(|i| start + i as f64 * binwidth)
            .take_while(|&x| x < upper)
            .collect()
    }

    /// Fitted force of a matched interaction on the output grid.
    pub fn grid_of_force_values(
        &mut self,
        solution: &[f64],
        index: usize,
        binwidth: f64,
    ) -> Result<ForceGrid, Error> {
        let coefficients = self.local_coefficients(solution, index)?;
        self.check_curve(index)?;
        let grid = self.spec.grid(index);
        let axis = self.output_axis(index, binwidth);
        let force = axis
            .iter()
            .map(|&x| self.splines.evaluate_spline(&grid, coefficients, x))
            .collect();
        Ok(ForceGrid {
            axis,
            force,
            derivative: Vec::new(),
        })
    }

    /// Fitted force and its first derivative; B-spline bases only.
    pub fn grid_of_force_and_derivative_values(
        &mut self,
        solution: &[f64],
        index: usize,
        binwidth: f64,
    ) -> Result<ForceGrid, Error> {
        if self.spec.basis() != BasisType::BSpline {
            return Err(Error::UnsupportedBasis {
                operation: "force derivative output",
                basis: self.spec.basis(),
            });
        }
        let mut grid_values = self.grid_of_force_values(solution, index, binwidth)?;
        let coefficients = self.local_coefficients(solution, index)?;
        let grid = self.spec.grid(index);
        grid_values.derivative = grid_values
            .axis
            .iter()
            .map(|&x| self.splines.evaluate_spline_derivative(&grid, coefficients, x))
            .collect();
        Ok(grid_values)
    }
}
