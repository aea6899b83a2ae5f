//! Writers for fitted interactions.
//!
//! All writers take plain slices so they can be fed from any model: an axis
//! of parameter values, the fitted force at each point and, where needed, the
//! potential integrated from it.

use super::error::Error;
use std::io::Write;

/// Formats `value` like C's `%.{precision}le`: `1.500000e+00`.
pub fn format_exponential(value: f64, precision: usize) -> String {
    let raw = format!("{:.*e}", precision, value);
    match raw.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exp) => {
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exp.abs())
            }
            Err(_) => raw,
        },
        None => raw,
    }
}

fn sci(value: f64) -> String {
    format_exponential(value, 15)
}

/// Potential from a force curve by trapezoidal integration.
///
/// The potential is zero at the last axis point and `F = −dU/dx`.
pub fn integrate_force(axis: &[f64], force: &[f64]) -> Vec<f64> {
    let n = axis.len().min(force.len());
    let mut potential = vec![0.0; n];
    for i in (0..n.saturating_sub(1)).rev() {
        let width = axis[i + 1] - axis[i];
        potential[i] = potential[i + 1] + 0.5 * width * (force[i] + force[i + 1]);
    }
    potential
}

/// Index of the smallest value; the first one on ties.
pub fn min_index(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |(best, min), (i, &v)| {
            if v < min { (i, v) } else { (best, min) }
        })
        .0
}

/// Shifts a potential so that its minimum is zero.
pub fn standardize_potential(potential: &mut [f64]) {
    if potential.is_empty() {
        return;
    }
    let min = potential[min_index(potential)];
    potential.iter_mut().for_each(|v| *v -= min);
}

/// Bootstrap standard error of each point over the master and all estimates.
///
/// With `N` estimates, `sqrt(Σx² − (Σx)²/(N+1)) / (N+1)`.
pub fn bootstrap_standard_error(master: &[f64], estimates: &[Vec<f64>]) -> Vec<f64> {
    let n = (estimates.len() + 1) as f64;
    master
        .iter()
        .enumerate()
        .map(|(i, &m)| {
            let (sum, squared) = estimates
                .iter()
                .filter_map(|e| e.get(i))
                .fold((m, m * m), |(s, q), &x| (s + x, q + x * x));
            (squared - sum * sum / n).max(0.0).sqrt() / n
        })
        .collect()
}

/// Two-column `axis force` table.
pub fn write_force_table<W: Write>(
    mut writer: W,
    axis: &[f64],
    force: &[f64],
) -> Result<(), Error> {
    for (x, f) in axis.iter().zip(force) {
        writeln!(writer, "{:.6} {}", x, sci(*f))?;
    }
    Ok(())
}

/// Three-column `axis force derivative` table.
pub fn write_force_derivative_table<W: Write>(
    mut writer: W,
    axis: &[f64],
    force: &[f64],
    derivative: &[f64],
) -> Result<(), Error> {
    for ((x, f), d) in axis.iter().zip(force).zip(derivative) {
        writeln!(writer, "{:.6} {} {}", x, sci(*f), sci(*d))?;
    }
    Ok(())
}

/// Force table for a bootstrapped fit.
///
/// With `full`, every estimate follows the master force on each line;
/// otherwise only the standard error does.
pub fn write_bootstrap_force_table<W: Write>(
    mut writer: W,
    axis: &[f64],
    master: &[f64],
    estimates: &[Vec<f64>],
    full: bool,
) -> Result<(), Error> {
    if full {
        for (i, (x, f)) in axis.iter().zip(master).enumerate() {
            write!(writer, "{:.6}\t{:.6}\t", x, f)?;
            for estimate in estimates {
                write!(writer, " {}", sci(estimate.get(i).copied().unwrap_or(0.0)))?;
            }
            writeln!(writer)?;
        }
    } else {
        let error = bootstrap_standard_error(master, estimates);
        for ((x, f), e) in axis.iter().zip(master).zip(&error) {
            writeln!(writer, "{:.6}\t{:.6}\t{:.6}", x, f, e)?;
        }
    }
    Ok(())
}

/// LAMMPS tabulated potential.
///
/// `char_id` selects the keyword line: `n` pair, `b` bond, `a` angle and
/// `d` dihedral. Bonded potentials are shifted to a zero minimum first.
pub fn write_lammps_table<W: Write>(
    mut writer: W,
    char_id: char,
    name: &str,
    axis: &[f64],
    potential: &[f64],
    force: &[f64],
) -> Result<(), Error> {
    let mut potential = potential.to_vec();
    if matches!(char_id, 'b' | 'a' | 'd') {
        standardize_potential(&mut potential);
    }

    writeln!(writer, "# Header information on force file")?;
    writeln!(writer)?;
    writeln!(writer, "{}", name)?;

    let n = axis.len();
    match char_id {
        'n' if n > 0 => writeln!(writer, "N {} R {:.6} {:.6}", n, axis[0], axis[n - 1])?,
        'b' | 'a' if n > 0 => writeln!(
            writer,
            "N {} FP 0.0 0.0 EQ {:.6}",
            n,
            axis[min_index(&potential)]
        )?,
        'd' => writeln!(writer, "N {} DEGREES", n)?,
        _ => {}
    }
    writeln!(writer)?;

    for (k, ((x, u), f)) in axis.iter().zip(&potential).zip(force).enumerate() {
        writeln!(writer, "{} {:.6} {:.6} {:.6}", k + 1, x, u, f)?;
    }
    Ok(())
}

/// Header of one record in a `b-spline.out` coefficient file.
#[derive(Debug, Clone, PartialEq)]
pub struct SplineRecord<'a> {
    pub char_id: char,
    pub names: &'a [String],
    pub bspline_k: usize,
    pub n_break: usize,
    pub lower: f64,
    pub upper: f64,
}

/// Writes `<char>: <names> <k> <n_break> <lower> <upper>` and one line of
/// coefficients per entry of `rows`.
pub fn write_bspline_record<W: Write>(
    mut writer: W,
    record: &SplineRecord<'_>,
    rows: &[&[f64]],
) -> Result<(), Error> {
    write!(writer, "{}: ", record.char_id)?;
    for name in record.names {
        write!(writer, "{} ", name)?;
    }
    writeln!(
        writer,
        "{} {} {} {}",
        record.bspline_k,
        record.n_break,
        sci(record.lower),
        sci(record.upper)
    )?;
    for row in rows {
        for c in *row {
            write!(writer, "{} ", sci(*c))?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Linear-spline coefficients next to their break points.
pub fn write_linear_spline_coefficients<W: Write>(
    mut writer: W,
    lower: f64,
    fm_binwidth: f64,
    coefficients: &[f64],
) -> Result<(), Error> {
    for (j, c) in coefficients.iter().enumerate() {
        writeln!(writer, "{:.6} {}", lower + fm_binwidth * j as f64, sci(*c))?;
    }
    Ok(())
}

/// One value per line, as used for single-coefficient three-body fits.
pub fn write_values<W: Write>(mut writer: W, values: &[f64]) -> Result<(), Error> {
    for v in values {
        writeln!(writer, "{}", sci(*v))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() <= eps
    }

    fn render<F: FnOnce(&mut Vec<u8>) -> Result<(), Error>>(f: F) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn exponential_matches_c_layout() {
        assert_eq!(format_exponential(1.5, 6), "1.500000e+00");
        assert_eq!(format_exponential(-0.00123, 3), "-1.230e-03");
        assert_eq!(format_exponential(0.0, 2), "0.00e+00");
        assert_eq!(format_exponential(6.02e123, 2), "6.02e+123");
        assert_eq!(format_exponential(1.0, 15), "1.000000000000000e+00");
    }

    #[test]
    fn integrates_constant_force() {
        let axis = [0.0, 1.0, 2.0, 3.0];
        let potential = integrate_force(&axis, &[2.0; 4]);
        assert_eq!(potential, vec![6.0, 4.0, 2.0, 0.0]);
        assert!(integrate_force(&[], &[]).is_empty());
    }

    #[test]
    fn standardizes_to_zero_minimum() {
        let mut potential = vec![3.0, 1.0, 2.0, 1.0];
        assert_eq!(min_index(&potential), 1);
        standardize_potential(&mut potential);
        assert_eq!(potential, vec![2.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn bootstrap_error_of_identical_estimates_is_zero() {
        let master = vec![1.0, 2.0];
        let estimates = vec![vec![1.0, 2.0], vec![1.0, 2.0]];
        let error = bootstrap_standard_error(&master, &estimates);
        assert!(error.iter().all(|e| approx_eq(*e, 0.0, 1e-12)));
    }

    #[test]
    fn bootstrap_error_formula() {
        // Values 1 and 3: Σx² = 10, (Σx)²/2 = 8, sqrt(2)/2.
        let error = bootstrap_standard_error(&[1.0], &[vec![3.0]]);
        assert!(approx_eq(error[0], 2f64.sqrt() / 2.0, 1e-12));
    }

    #[test]
    fn force_table_layout() {
        let text = render(|w| write_force_table(w, &[0.5, 1.0], &[2.0, -1.0]));
        assert_eq!(
            text,
            "0.500000 2.000000000000000e+00\n1.000000 -1.000000000000000e+00\n"
        );
    }

    #[test]
    fn lammps_pair_header() {
        let text = render(|w| {
            write_lammps_table(w, 'n', "A_B", &[1.0, 2.0], &[1.0, 0.0], &[1.0, 1.0])
        });
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[2], "A_B");
        assert_eq!(lines[3], "N 2 R 1.000000 2.000000");
        assert_eq!(lines[5], "1 1.000000 1.000000 1.000000");
    }

    #[test]
    fn lammps_bond_header_uses_minimum() {
        let text = render(|w| {
            write_lammps_table(w, 'b', "A_B_bon", &[1.0, 1.5, 2.0], &[5.0, 2.0, 4.0], &[0.0; 3])
        });
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[3], "N 3 FP 0.0 0.0 EQ 1.500000");
        assert_eq!(lines[6], "2 1.500000 0.000000 0.000000");
    }

    #[test]
    fn lammps_dihedral_header() {
        let text = render(|w| write_lammps_table(w, 'd', "x", &[-180.0], &[0.0], &[0.0]));
        assert!(text.contains("N 1 DEGREES\n"));
    }

    #[test]
    fn bspline_record_layout() {
        let names = vec!["A".to_string(), "B".to_string()];
        let record = SplineRecord {
            char_id: 'n',
            names: &names,
            bspline_k: 4,
            n_break: 2,
            lower: 0.0,
            upper: 1.0,
        };
        let coefficients = [1.0, 2.0, 3.0, 4.0];
        let text = render(|w| write_bspline_record(w, &record, &[&coefficients]));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "n: A B 4 2 0.000000000000000e+00 1.000000000000000e+00"
        );
        assert_eq!(lines[1].split_whitespace().count(), 4);
    }

    #[test]
    fn bootstrap_table_layouts() {
        let axis = [1.0];
        let master = [2.0];
        let estimates = vec![vec![2.0], vec![2.0]];
        let summary = render(|w| write_bootstrap_force_table(w, &axis, &master, &estimates, false));
        assert_eq!(summary, "1.000000\t2.000000\t0.000000\n");
        let full = render(|w| write_bootstrap_force_table(w, &axis, &master, &estimates, true));
        assert_eq!(full.split_whitespace().count(), 4);
    }

    #[test]
    fn linear_spline_coefficients_follow_break_points() {
        let text = render(|w| write_linear_spline_coefficients(w, 1.0, 0.5, &[3.0, 4.0]));
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[1].starts_with("1.500000 "));
    }
}
