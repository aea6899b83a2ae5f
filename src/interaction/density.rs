//! Local-density interactions.
//!
//! For a pair of density groups `(g1, g2)`, every site whose type belongs to
//! `g1` carries a density
//!
//! ```text
//! ρ_i = Σ_j w_g2(type_j) · W(r_ij)
//! ```
//!
//! summed over neighbors `j` whose type belongs to `g2`. The fitted basis
//! represents `f(ρ) = −dU/dρ`, so the force on a site `x` is
//! `Σ_i f(ρ_i) · ∂ρ_i/∂x`.
//!
//! Densities of a frame must be complete before any force term is known,
//! which is why accumulation makes two passes over the neighbor pairs.

use super::computer::InteractionClassComputer;
use crate::geometry;
use crate::matrix::DesignMatrix;
use crate::model::frame::Frame;
use crate::model::topology::Topology;
use crate::model::types::DensityWeightStyle;
use crate::setup::{Error, ModelConfig};

const DEFAULT_SIGMA: f64 = 1.0;
const DEFAULT_SWITCH: f64 = 0.5;

/// Radial weight `W(r)` of a density interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightFunction {
    /// Gaussian shifted so that both `W` and `W′` vanish at the cutoff.
    Gaussian { sigma: f64, cutoff: f64 },
    /// `½(1 − tanh((r − r_s)/σ))` with `r_s = switch · cutoff`.
    Switching { sigma: f64, center: f64, cutoff: f64 },
    /// Lucy kernel `(1 + 3r/rc)(1 − r/rc)³`.
    Lucy { cutoff: f64 },
}

impl WeightFunction {
    /// Weight function of a style; `None` for [`DensityWeightStyle::None`].
    pub fn new(style: DensityWeightStyle, cutoff: f64, sigma: f64, switch: f64) -> Option<Self> {
        match style {
            DensityWeightStyle::None => None,
            DensityWeightStyle::Gaussian => Some(Self::Gaussian { sigma, cutoff }),
            DensityWeightStyle::Switching => Some(Self::Switching {
                sigma,
                center: switch * cutoff,
                cutoff,
            }),
            DensityWeightStyle::Lucy => Some(Self::Lucy { cutoff }),
        }
    }

    pub fn cutoff(&self) -> f64 {
        match *self {
            Self::Gaussian { cutoff, .. }
            | Self::Switching { cutoff, .. }
            | Self::Lucy { cutoff } => cutoff,
        }
    }

    /// `(W(r), dW/dr)`, both zero at and beyond the cutoff.
    pub fn evaluate(&self, r: f64) -> (f64, f64) {
        if r >= self.cutoff() {
            return (0.0, 0.0);
        }
        match *self {
            Self::Gaussian { sigma, cutoff } => {
                let (g, dg) = gaussian(r, sigma);
                let (g_c, dg_c) = gaussian(cutoff, sigma);
                (g - g_c - (r - cutoff) * dg_c, dg - dg_c)
            }
            Self::Switching { sigma, center, .. } => {
                let t = ((r - center) / sigma).tanh();
                (0.5 * (1.0 - t), -0.5 / sigma * (1.0 - t * t))
            }
            Self::Lucy { cutoff } => {
                let x = r / cutoff;
                let gap = 1.0 - x;
                (
                    (1.0 + 3.0 * x) * gap * gap * gap,
                    -12.0 * r / (cutoff * cutoff) * gap * gap,
                )
            }
        }
    }
}

fn gaussian(r: f64, sigma: f64) -> (f64, f64) {
    let g = (-r * r / (2.0 * sigma * sigma)).exp();
    (g, -r / (sigma * sigma) * g)
}

/// Density groups and weight parameters of the density family.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityParameters {
    style: DensityWeightStyle,
    cutoff: f64,
    group_names: Vec<String>,
    /// `member_weights[g][t − 1]` is the weight of type `t` in group `g`.
    member_weights: Vec<Vec<Option<f64>>>,
    sigma: Vec<f64>,
    switch: Vec<f64>,
}

impl DensityParameters {
    pub(crate) fn define(config: &ModelConfig, topology: &Topology) -> Result<Self, Error> {
        let style = config.density.style;
        let mut parameters = Self {
            style,
            cutoff: config.density_cutoff(),
            group_names: Vec::new(),
            member_weights: Vec::new(),
            sigma: Vec::new(),
            switch: Vec::new(),
        };
        if style == DensityWeightStyle::None {
            return Ok(parameters);
        }

        for group in &topology.density_groups {
            if parameters.group_names.contains(&group.name) {
                return Err(Error::invalid_topology(format!(
                    "density group '{}' is declared twice",
                    group.name
                )));
            }
            if let Some(weights) = &group.weights {
                if weights.len() != group.members.len() {
                    return Err(Error::invalid_topology(format!(
                        "density group '{}' has {} members but {} weights",
                        group.name,
                        group.members.len(),
                        weights.len()
                    )));
                }
            }
            let mut row = vec![None; topology.n_types()];
            for (m, member) in group.members.iter().enumerate() {
                let t = topology.type_index(member).ok_or_else(|| {
                    Error::invalid_topology(format!(
                        "density group '{}' names unknown type '{}'",
                        group.name, member
                    ))
                })?;
                let weight = group.weights.as_ref().map_or(1.0, |w| w[m]);
                row[t - 1] = Some(weight);
            }
            parameters.group_names.push(group.name.clone());
            parameters.member_weights.push(row);
        }

        let n_defined = parameters.n_defined();
        parameters.sigma = vec![DEFAULT_SIGMA; n_defined];
        parameters.switch = vec![DEFAULT_SWITCH; n_defined];
        Ok(parameters)
    }

    pub fn style(&self) -> DensityWeightStyle {
        self.style
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn group_names(&self) -> &[String] {
        &self.group_names
    }

    pub fn n_groups(&self) -> usize {
        self.group_names.len()
    }

    /// One interaction per ordered pair of groups.
    pub fn n_defined(&self) -> usize {
        self.n_groups() * self.n_groups()
    }

    /// Weight of 1-based type `t` in `group`, `None` for non-members.
    pub fn member_weight(&self, group: usize, t: usize) -> Option<f64> {
        self.member_weights
            .get(group)?
            .get(t.checked_sub(1)?)
            .copied()
            .flatten()
    }

    /// Applies the optional `sigma switch` columns of a range line.
    pub(crate) fn set_weight_parameters(&mut self, index: usize, extra: &[f64]) {
        if let Some(&sigma) = extra.first() {
            self.sigma[index] = sigma;
        }
        if let Some(&switch) = extra.get(1) {
            self.switch[index] = switch;
        }
    }

    pub fn weight_function(&self, index: usize) -> Option<WeightFunction> {
        WeightFunction::new(self.style, self.cutoff, self.sigma[index], self.switch[index])
    }
}

/// Per-site state of one active density interaction after the first pass.
#[derive(Debug, Clone, Default)]
struct SiteDensity {
    /// Index of the first non-zero basis function when `ρ` is in range.
    first: Option<usize>,
    /// Tabulated `f(ρ)`.
    tabulated: Option<f64>,
}

impl InteractionClassComputer<'_> {
    pub(super) fn accumulate_density<M, I, const N: usize>(
        &mut self,
        parameters: &DensityParameters,
        matrix: &mut M,
        row_offset: usize,
        frame: &Frame,
        site_types: &[usize],
        candidates: I,
    ) -> usize
    where
        M: DesignMatrix + ?Sized,
        I: IntoIterator<Item = [usize; N]> + Clone,
    {
        let spec = self.spec;
        let n_groups = parameters.n_groups();
        let active: Vec<(usize, WeightFunction)> = (0..spec.n_defined())
            .filter(|&i| spec.defined_to_matched()[i] != 0 || spec.defined_to_tabulated()[i] != 0)
            .filter_map(|i| parameters.weight_function(i).map(|w| (i, w)))
            .collect();
        if active.is_empty() {
            return 0;
        }

        let n_sites = frame.n_sites();
        let type_of = |s: usize| site_types.get(s).copied().unwrap_or(0);
        let cutoff2 = parameters.cutoff() * parameters.cutoff();

        let mut densities = vec![0.0; active.len() * n_sites];
        for tuple in candidates.clone() {
            let (a, b) = (tuple[0], tuple[1]);
            if a >= n_sites || b >= n_sites {
                continue;
            }
            let Some(r) = geometry::distance([a, b], &frame.positions, &frame.half_box, cutoff2)
            else {
                continue;
            };
            for (k, &(index, weight)) in active.iter().enumerate() {
                let (g1, g2) = (index / n_groups, index % n_groups);
                let (w, _) = weight.evaluate(r.value);
                for (center, other) in [(a, b), (b, a)] {
                    if parameters.member_weight(g1, type_of(center)).is_some() {
                        if let Some(scale) = parameters.member_weight(g2, type_of(other)) {
                            densities[k * n_sites + center] += scale * w;
                        }
                    }
                }
            }
        }

        let support = self.splines.support();
        let mut sites = vec![SiteDensity::default(); active.len() * n_sites];
        let mut basis_values = vec![0.0; active.len() * n_sites * support];
        for (k, &(index, _)) in active.iter().enumerate() {
            let g1 = index / n_groups;
            let matched = spec.defined_to_matched()[index] != 0;
            let grid = spec.grid(index);
            let table = spec.table(index);
            for site in 0..n_sites {
                if parameters.member_weight(g1, type_of(site)).is_none() {
                    continue;
                }
                let slot = k * n_sites + site;
                let rho = densities[slot];
                if matched && spec.in_range(index, rho) {
                    let first = self.splines.evaluate(&grid, rho);
                    basis_values[slot * support..(slot + 1) * support]
                        .copy_from_slice(self.splines.values());
                    sites[slot].first = Some(first);
                }
                sites[slot].tabulated = table.and_then(|t| t.evaluate(rho));
            }
        }
        log::trace!(
            "evaluated {} densities over {} sites",
            active.len(),
            n_sites
        );

        let mut count = 0;
        for tuple in candidates {
            let (a, b) = (tuple[0], tuple[1]);
            if a >= n_sites || b >= n_sites {
                continue;
            }
            let Some(r) = geometry::distance([a, b], &frame.positions, &frame.half_box, cutoff2)
            else {
                continue;
            };
            let dr_a = r.derivatives[0];
            let dr_b = geometry::scale(&dr_a, -1.0);
            let mut contributed = false;

            for (k, &(index, weight)) in active.iter().enumerate() {
                let (g1, g2) = (index / n_groups, index % n_groups);
                let (_, dw) = weight.evaluate(r.value);
                for (center, other, dr_center) in [(a, b, dr_a), (b, a, dr_b)] {
                    if parameters.member_weight(g1, type_of(center)).is_none() {
                        continue;
                    }
                    let Some(scale) = parameters.member_weight(g2, type_of(other)) else {
                        continue;
                    };
                    let slot = k * n_sites + center;
                    let factor = scale * dw;

                    if let Some(first) = sites[slot].first {
                        let m = spec.defined_to_matched()[index];
                        let column = self.column_offset + spec.column_indices()[m - 1] + first;
                        for j in 0..support {
                            let b_j = basis_values[slot * support + j] * factor;
                            for dim in 0..3 {
                                let value = b_j * dr_center[dim];
                                matrix.add(row_offset + 3 * center + dim, column + j, value);
                                matrix.add(row_offset + 3 * other + dim, column + j, -value);
                            }
                        }
                        contributed = true;
                    }
                    if let Some(f) = sites[slot].tabulated {
                        for dim in 0..3 {
                            let value = f * factor * dr_center[dim];
                            matrix.subtract_from_target(row_offset + 3 * center + dim, value);
                            matrix.subtract_from_target(row_offset + 3 * other + dim, -value);
                        }
                        contributed = true;
                    }
                }
            }
            if contributed {
                count += 1;
            }
        }
        count
    }
}
