//! One-dimensional basis sets for force curves.
//!
//! A [`SplineGrid`] describes the uniform break points of a single
//! interaction. A [`SplineComputer`] evaluates the non-zero basis functions of
//! that grid at a parameter value, reusing internal scratch buffers so the
//! accumulation loop does not allocate.

use crate::model::types::BasisType;

/// Uniform break points `lower + i·binwidth` for `i` in `0..n_break`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplineGrid {
    pub lower: f64,
    pub binwidth: f64,
    pub n_break: usize,
}

impl SplineGrid {
    pub fn new(lower: f64, binwidth: f64, n_break: usize) -> Self {
        Self {
            lower,
            binwidth,
            n_break,
        }
    }

    pub fn upper(&self) -> f64 {
        self.lower + (self.n_break.saturating_sub(1)) as f64 * self.binwidth
    }

    /// Clamped knot `i` of an order-`k` B-spline on this grid.
    fn knot(&self, degree: usize, i: usize) -> f64 {
        let idx = i.saturating_sub(degree).min(self.n_break - 1);
        self.lower + idx as f64 * self.binwidth
    }
}

/// Number of basis functions for `n_break` break points.
pub fn basis_function_count(basis: BasisType, bspline_k: usize, n_break: usize) -> usize {
    match basis {
        BasisType::BSpline => n_break + bspline_k - 2,
        BasisType::LinearSpline => n_break,
    }
}

/// Evaluator for the non-zero basis functions at a point.
#[derive(Debug, Clone)]
pub struct SplineComputer {
    basis: BasisType,
    order: usize,
    values: Vec<f64>,
    derivatives: Vec<f64>,
    lower_order: Vec<f64>,
    left: Vec<f64>,
    right: Vec<f64>,
}

impl SplineComputer {
    /// Creates an evaluator; `bspline_k` is ignored for linear splines.
    pub fn new(basis: BasisType, bspline_k: usize) -> Self {
        let order = match basis {
            BasisType::BSpline => bspline_k.max(2),
            BasisType::LinearSpline => 2,
        };
        Self {
            basis,
            order,
            values: vec![0.0; order],
            derivatives: vec![0.0; order],
            lower_order: vec![0.0; order],
            left: vec![0.0; order + 1],
            right: vec![0.0; order + 1],
        }
    }

    /// Number of basis functions that can be non-zero at one point.
    pub fn support(&self) -> usize {
        self.order
    }

    pub fn n_basis(&self, grid: &SplineGrid) -> usize {
        basis_function_count(self.basis, self.order, grid.n_break)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn derivatives(&self) -> &[f64] {
        &self.derivatives
    }

    /// Evaluates the basis at `x` and returns the index of the first
    /// non-zero function; the values are available through [`values`](Self::values).
    pub fn evaluate(&mut self, grid: &SplineGrid, x: f64) -> usize {
        self.evaluate_inner(grid, x, false)
    }

    /// Like [`evaluate`](Self::evaluate), also filling [`derivatives`](Self::derivatives).
    pub fn evaluate_with_derivative(&mut self, grid: &SplineGrid, x: f64) -> usize {
        self.evaluate_inner(grid, x, true)
    }

    /// Value of `Σ coefficients[b] · B_b(x)` with coefficients local to the grid.
    pub fn evaluate_spline(&mut self, grid: &SplineGrid, coefficients: &[f64], x: f64) -> f64 {
        let first = self.evaluate(grid, x);
        combine(&self.values, coefficients, first)
    }

    /// First derivative of `Σ coefficients[b] · B_b(x)`.
    pub fn evaluate_spline_derivative(
        &mut self,
        grid: &SplineGrid,
        coefficients: &[f64],
        x: f64,
    ) -> f64 {
        let first = self.evaluate_with_derivative(grid, x);
        combine(&self.derivatives, coefficients, first)
    }

    fn evaluate_inner(&mut self, grid: &SplineGrid, x: f64, with_derivative: bool) -> usize {
        self.values.iter_mut().for_each(|v| *v = 0.0);
        self.derivatives.iter_mut().for_each(|v| *v = 0.0);
        if grid.n_break < 2 || grid.binwidth <= 0.0 {
            return 0;
        }

        match self.basis {
            BasisType::LinearSpline => self.evaluate_linear(grid, x),
            BasisType::BSpline => self.evaluate_bspline(grid, x, with_derivative),
        }
    }

    fn evaluate_linear(&mut self, grid: &SplineGrid, x: f64) -> usize {
        let position = (x - grid.lower) / grid.binwidth;
        let bin = (position.floor().max(0.0) as usize).min(grid.n_break - 2);
        let t = position - bin as f64;
        self.values[0] = 1.0 - t;
        self.values[1] = t;
        self.derivatives[0] = -1.0 / grid.binwidth;
        self.derivatives[1] = 1.0 / grid.binwidth;
        bin
    }

    fn evaluate_bspline(&mut self, grid: &SplineGrid, x: f64, with_derivative: bool) -> usize {
        let degree = self.order - 1;
        let n_basis = grid.n_break + degree - 1;
        let position = ((x - grid.lower) / grid.binwidth).floor().max(0.0) as usize;
        let span = (degree + position).min(n_basis - 1);

        cox_de_boor(
            grid,
            degree,
            span,
            x,
            degree,
            &mut self.values,
            &mut self.left,
            &mut self.right,
        );

        if with_derivative && degree > 0 {
            cox_de_boor(
                grid,
                degree,
                span,
                x,
                degree - 1,
                &mut self.lower_order,
                &mut self.left,
                &mut self.right,
            );
            let first = span - degree;
            for r in 0..=degree {
                let a = first + r;
                let mut v = 0.0;
                if r >= 1 {
                    let denom = grid.knot(degree, a + degree) - grid.knot(degree, a);
                    if denom > 0.0 {
                        v += self.lower_order[r - 1] / denom;
                    }
                }
                if r < degree {
                    let denom = grid.knot(degree, a + degree + 1) - grid.knot(degree, a + 1);
                    if denom > 0.0 {
                        v -= self.lower_order[r] / denom;
                    }
                }
                self.derivatives[r] = degree as f64 * v;
            }
        }

        span - degree
    }
}

fn combine(values: &[f64], coefficients: &[f64], first: usize) -> f64 {
    values
        .iter()
        .enumerate()
        .filter_map(|(j, v)| coefficients.get(first + j).map(|c| c * v))
        .sum()
}

/// Non-zero B-spline basis functions of `degree` on knot span `span`.
///
/// Knots are those of the clamped grid for `knot_degree`; writes
/// `degree + 1` values into `out`.
#[allow(clippy::too_many_arguments)]
fn cox_de_boor(
    grid: &SplineGrid,
    knot_degree: usize,
    span: usize,
    x: f64,
    degree: usize,
    out: &mut [f64],
    left: &mut [f64],
    right: &mut [f64],
) {
    out[0] = 1.0;
    for j in 1..=degree {
        left[j] = x - grid.knot(knot_degree, span + 1 - j);
        right[j] = grid.knot(knot_degree, span + j) - x;
        let mut saved = 0.0;
        for r in 0..j {
            let temp = out[r] / (right[r + 1] + left[j - r]);
            out[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        out[j] = saved;
    }
}

/// Externally tabulated force curve, interpolated linearly between control points.
#[derive(Debug, Clone, PartialEq)]
pub struct TabulatedForce {
    pub lower: f64,
    pub upper: f64,
    pub binwidth: f64,
    pub values: Vec<f64>,
}

impl TabulatedForce {
    /// Number of control points for a table spanning `[lower, upper]`.
    pub fn control_point_count(lower: f64, upper: f64, binwidth: f64) -> usize {
        ((upper - lower) / binwidth + 0.5).floor().max(0.0) as usize + 1
    }

    /// Interpolated force at `x`, or `None` outside the table's range.
    pub fn evaluate(&self, x: f64) -> Option<f64> {
        if x < self.lower || x > self.upper || self.values.is_empty() {
            return None;
        }
        if self.values.len() == 1 {
            return Some(self.values[0]);
        }
        let position = (x - self.lower) / self.binwidth;
        let bin = (position.floor() as usize).min(self.values.len() - 2);
        let t = position - bin as f64;
        Some(self.values[bin] * (1.0 - t) + self.values[bin + 1] * t)
    }
}
