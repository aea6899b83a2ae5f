//! Least-squares design matrix abstraction.
//!
//! Interaction classes only ever add into cells of the design matrix and
//! subtract known (tabulated) forces from its target vector. Any backend that
//! can do that implements [`DesignMatrix`].

/// Accumulation target for force-matching contributions.
pub trait DesignMatrix {
    /// Total number of basis-function columns.
    fn n_columns(&self) -> usize;

    /// Adds `value` to the cell at (`row`, `column`).
    fn add(&mut self, row: usize, column: usize, value: f64);

    /// Subtracts `value` from the target (reference force) of `row`.
    fn subtract_from_target(&mut self, _row: usize, _value: f64) {}
}

/// Row-major dense matrix with a target vector.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    n_rows: usize,
    n_columns: usize,
    values: Vec<f64>,
    target: Vec<f64>,
}

impl DenseMatrix {
    pub fn new(n_rows: usize, n_columns: usize) -> Self {
        Self {
            n_rows,
            n_columns,
            values: vec![0.0; n_rows * n_columns],
            target: vec![0.0; n_rows],
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.values[row * self.n_columns + column]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.n_columns..(row + 1) * self.n_columns]
    }

    pub fn target(&self) -> &[f64] {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut [f64] {
        &mut self.target
    }

    /// Sum of all entries in `column`.
    pub fn column_sum(&self, column: usize) -> f64 {
        (0..self.n_rows).map(|r| self.get(r, column)).sum()
    }

    /// Whether every cell outside `columns` is zero.
    pub fn is_zero_outside(&self, columns: std::ops::Range<usize>) -> bool {
        (0..self.n_rows).all(|r| {
            self.row(r)
                .iter()
                .enumerate()
                .all(|(c, v)| columns.contains(&c) || *v == 0.0)
        })
    }
}

impl DesignMatrix for DenseMatrix {
    fn n_columns(&self) -> usize {
        self.n_columns
    }

    fn add(&mut self, row: usize, column: usize, value: f64) {
        self.values[row * self.n_columns + column] += value;
    }

    fn subtract_from_target(&mut self, row: usize, value: f64) {
        self.target[row] -= value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_into_cells() {
        let mut m = DenseMatrix::new(3, 4);
        m.add(1, 2, 0.5);
        m.add(1, 2, 0.25);
        assert_eq!(m.n_columns(), 4);
        assert_eq!(m.get(1, 2), 0.75);
        assert_eq!(m.row(1), &[0.0, 0.0, 0.75, 0.0]);
        assert_eq!(m.column_sum(2), 0.75);
        assert!(m.is_zero_outside(2..3));
        assert!(!m.is_zero_outside(0..2));
    }

    #[test]
    fn subtracts_from_target() {
        let mut m = DenseMatrix::new(2, 1);
        m.target_mut()[0] = 3.0;
        m.subtract_from_target(0, 1.0);
        assert_eq!(m.target(), &[2.0, 0.0]);
    }
}
