//! Three-body nonbonded interactions.
//!
//! Triplets are declared in the topology as a center type with two end
//! types, each with its own switching distance `a` and reference angle θ₀.
//! A triplet `[end, center, end]` of sites contributes when both arms are
//! shorter than `a`. The radial factor
//!
//! ```text
//! E(r1, r2) = exp(γ/(r1 − a)) · exp(γ/(r2 − a))
//! ```
//!
//! multiplies either a spline in the angle θ (`spline` style) or the
//! Stillinger-Weber term `(cos θ − cos θ₀)²` with a single coefficient λ
//! (`stillinger-weber` style).

use super::computer::InteractionClassComputer;
use crate::geometry::{self, DEGREES_PER_RADIAN, Vec3};
use crate::hashing;
use crate::matrix::DesignMatrix;
use crate::model::frame::Frame;
use crate::model::topology::Topology;
use crate::model::types::ThreeBodyStyle;
use crate::setup::{Error, ModelConfig};

/// Parameters of one defined triplet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreeBodyTerm {
    /// Switching distance `a`.
    pub cutoff: f64,
    /// Reference angle θ₀ in degrees.
    pub theta0: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThreeBodyParameters {
    pub style: ThreeBodyStyle,
    pub gamma: f64,
    /// One term per defined triplet, in defined order.
    pub terms: Vec<ThreeBodyTerm>,
}

impl ThreeBodyParameters {
    /// Resolves the topology's triplets, returning their hashes in defined
    /// (ascending hash) order together with the matching parameters.
    pub(crate) fn define(
        config: &ModelConfig,
        topology: &Topology,
    ) -> Result<(Vec<usize>, Self), Error> {
        let mut parameters = Self {
            style: config.three_body.style,
            gamma: config.three_body.gamma,
            terms: Vec::new(),
        };
        if parameters.style == ThreeBodyStyle::None {
            return Ok((Vec::new(), parameters));
        }

        let resolve = |name: &str| {
            topology.type_index(name).ok_or_else(|| {
                Error::invalid_topology(format!("three-body triplet names unknown type '{name}'"))
            })
        };

        let mut entries = Vec::with_capacity(topology.three_body.len());
        for entry in &topology.three_body {
            let center = resolve(&entry.center)?;
            let end1 = resolve(&entry.ends[0])?;
            let end2 = resolve(&entry.ends[1])?;
            if !(entry.cutoff > 0.0) {
                return Err(Error::invalid_topology(format!(
                    "three-body triplet {}-{}-{} has non-positive cutoff {}",
                    entry.ends[0], entry.center, entry.ends[1], entry.cutoff
                )));
            }
            let hash = hashing::triple_hash(end1, center, end2, topology.n_types());
            entries.push((
                hash,
                ThreeBodyTerm {
                    cutoff: entry.cutoff,
                    theta0: entry.theta0,
                },
            ));
        }
        entries.sort_by_key(|&(hash, _)| hash);
        if let Some(pair) = entries.windows(2).find(|w| w[0].0 == w[1].0) {
            let [e1, c, e2] = hashing::invert_triple_hash(pair[0].0, topology.n_types());
            let name = |t| topology.type_name(t).unwrap_or("?");
            return Err(Error::invalid_topology(format!(
                "three-body triplet {}-{}-{} is declared twice",
                name(e1),
                name(c),
                name(e2)
            )));
        }

        let (hashes, terms): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
        parameters.terms = terms;
        Ok((hashes, parameters))
    }

    /// Largest switching distance of any triplet.
    pub fn max_cutoff(&self) -> f64 {
        self.terms.iter().map(|t| t.cutoff).fold(0.0, f64::max)
    }
}

impl InteractionClassComputer<'_> {
    pub(super) fn accumulate_three_body<M, I, const N: usize>(
        &mut self,
        parameters: &ThreeBodyParameters,
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

        for tuple in candidates {
            let ids = [tuple[0], tuple[1], tuple[2]];
            let types = ids.map(|s| site_types.get(s).copied().unwrap_or(0));
            let Some(index) = self
                .calculate_hash_number(&types)
                .and_then(|hash| spec.index_from_hash(hash))
            else {
                continue;
            };
            let matched = spec.defined_to_matched()[index];
            let term = parameters.terms[index];
            let Some(sw) = geometry::stillinger_weber_angle(
                ids,
                &frame.positions,
                &frame.half_box,
                term.cutoff * term.cutoff,
                parameters.gamma,
                term.cutoff,
            ) else {
                continue;
            };

            let theta = sw.angle.value;
            let d_theta = [
                sw.angle.derivatives[0],
                sw.angle.derivatives[1],
                sw.angle.last_derivative(),
            ];
            let de_end1 = geometry::scale(&sw.arms[0].derivatives[0], sw.radial_derivatives[0]);
            let de_end2 = geometry::scale(&sw.arms[1].derivatives[0], sw.radial_derivatives[1]);
            let d_prefactor = [
                de_end1,
                geometry::scale(&geometry::add(&de_end1, &de_end2), -1.0),
                de_end2,
            ];
            let column = self.column_offset + spec.column_indices()[matched - 1];

            match parameters.style {
                ThreeBodyStyle::Spline => {
                    let grid = spec.grid(index);
                    let first = self.splines.evaluate_with_derivative(&grid, theta);
                    let support = self.splines.support();
                    for j in 0..support {
                        let b = self.splines.values()[j];
                        let db = self.splines.derivatives()[j];
                        add_three_body_row(matrix, row_offset, ids, column + first + j, |s| {
                            combine(db * sw.prefactor, &d_theta[s], b, &d_prefactor[s])
                        });
                    }
                }
                ThreeBodyStyle::StillingerWeber => {
                    let radians = theta / DEGREES_PER_RADIAN;
                    let delta = radians.cos() - (term.theta0 / DEGREES_PER_RADIAN).cos();
                    let d_angular = -2.0 * delta * radians.sin() / DEGREES_PER_RADIAN;
                    let angular = delta * delta;
                    add_three_body_row(matrix, row_offset, ids, column, |s| {
                        combine(d_angular * sw.prefactor, &d_theta[s], angular, &d_prefactor[s])
                    });
                }
                ThreeBodyStyle::None => continue,
            }
            count += 1;
        }
        count
    }
}

/// `a·u + b·v`.
fn combine(a: f64, u: &Vec3, b: f64, v: &Vec3) -> Vec3 {
    geometry::add(&geometry::scale(u, a), &geometry::scale(v, b))
}

/// Adds the force `−∂U/∂x` of one column to the rows of a triplet's sites,
/// given `∂U/∂x` per site position in the triplet.
fn add_three_body_row<M, F>(
    matrix: &mut M,
    row_offset: usize,
    ids: [usize; 3],
    column: usize,
    gradient: F,
) where
    M: DesignMatrix + ?Sized,
    F: Fn(usize) -> Vec3,
{
    for (s, &site) in ids.iter().enumerate() {
        let g = gradient(s);
        for (dim, value) in g.iter().enumerate() {
            matrix.add(row_offset + 3 * site + dim, column, -value);
        }
    }
}
