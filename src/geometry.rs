//! Translation-invariant geometric parameters under periodic boundary conditions.
//!
//! Every conditional routine takes a fixed-size tuple of particle indices, the
//! particle positions, the periodic box half lengths, and (where applicable) a
//! squared cutoff. It returns a [`GeometricParameter`] holding the scalar value
//! and its derivatives with respect to the first `n − 1` particles. The
//! derivative with respect to the last particle is the negated sum of the
//! others and is never stored; see [`GeometricParameter::last_derivative`].
//!
//! Derivatives are expressed in the parameter's own units: length for
//! distances, length² for squared distances and degrees for angles and
//! dihedrals.
//!
//! All displacements are reduced to their minimum image before any dot or
//! cross product is taken.

/// Cartesian vector.
pub type Vec3 = [f64; 3];

pub const DEGREES_PER_RADIAN: f64 = 57.295779513082320876798;

/// Distance of the clamped cosine from ±1 in angle and dihedral evaluation.
///
/// Keeps `sin θ` away from zero at colinear configurations. Force values near
/// those configurations depend on this constant, so it must not change
/// between runs that are meant to be compared.
pub const COSINE_CLAMP: f64 = 1.0e-6;

/// Scalar parameter with derivatives for the first `M` participating particles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricParameter<const M: usize> {
    pub value: f64,
    pub derivatives: [Vec3; M],
}

impl<const M: usize> GeometricParameter<M> {
    /// Derivative with respect to the last particle of the tuple.
    pub fn last_derivative(&self) -> Vec3 {
        let mut last = [0.0; 3];
        for d in &self.derivatives {
            for k in 0..3 {
                last[k] -= d[k];
            }
        }
        last
    }
}

/// Angle parameter plus the Stillinger-Weber radial switching terms.
///
/// For the angle tuple `[a, vertex, b]`, arm 0 is the `a`–vertex distance and
/// arm 1 the `b`–vertex distance, each stored with its derivative with
/// respect to the end particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StillingerWeberTerms {
    pub angle: GeometricParameter<2>,
    pub arms: [GeometricParameter<1>; 2],
    /// `exp(γ/(r1 − a)) · exp(γ/(r2 − a))`.
    pub prefactor: f64,
    /// Derivatives of the prefactor with respect to `r1` and `r2`.
    pub radial_derivatives: [f64; 2],
}

pub fn sub(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn add(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub fn scale(a: &Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

pub fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn cross(a: &Vec3, b: &Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn norm(a: &Vec3) -> f64 {
    dot(a, a).sqrt()
}

/// Wraps a displacement to its nearest periodic image.
///
/// Each component whose magnitude exceeds the half box length in that
/// dimension is shifted by one full box length.
pub fn minimum_image(mut displacement: Vec3, half_box: &Vec3) -> Vec3 {
    for k in 0..3 {
        if displacement[k] > half_box[k] {
            displacement[k] -= 2.0 * half_box[k];
        } else if displacement[k] < -half_box[k] {
            displacement[k] += 2.0 * half_box[k];
        }
    }
    displacement
}

/// Minimum-image displacement `x[to] − x[from]`.
pub fn displacement(from: usize, to: usize, positions: &[Vec3], half_box: &Vec3) -> Vec3 {
    minimum_image(sub(&positions[to], &positions[from]), half_box)
}

pub fn squared_distance(
    ids: [usize; 2],
    positions: &[Vec3],
    half_box: &Vec3,
    cutoff2: f64,
) -> Option<GeometricParameter<1>> {
    let d = displacement(ids[0], ids[1], positions, half_box);
    let rr = dot(&d, &d);
    if rr > cutoff2 {
        return None;
    }
    Some(GeometricParameter {
        value: rr,
        derivatives: [scale(&d, -2.0)],
    })
}

pub fn distance(
    ids: [usize; 2],
    positions: &[Vec3],
    half_box: &Vec3,
    cutoff2: f64,
) -> Option<GeometricParameter<1>> {
    let d = displacement(ids[0], ids[1], positions, half_box);
    let rr = dot(&d, &d);
    if rr > cutoff2 {
        return None;
    }
    Some(distance_from_displacement(&d, rr))
}

fn distance_from_displacement(d: &Vec3, rr: f64) -> GeometricParameter<1> {
    let r = rr.sqrt();
    let derivative = if r > 0.0 {
        scale(d, -1.0 / r)
    } else {
        [0.0; 3]
    };
    GeometricParameter {
        value: r,
        derivatives: [derivative],
    }
}

/// Bond angle at the middle particle of `[a, vertex, b]`, in degrees.
///
/// Both arms are tested against `cutoff2` independently; the angle is only
/// evaluated when both pass.
pub fn angle(
    ids: [usize; 3],
    positions: &[Vec3],
    half_box: &Vec3,
    cutoff2: f64,
) -> Option<GeometricParameter<2>> {
    let arm_a = distance([ids[1], ids[0]], positions, half_box, cutoff2)?;
    let arm_b = distance([ids[1], ids[2]], positions, half_box, cutoff2)?;
    let u = displacement(ids[1], ids[0], positions, half_box);
    let w = displacement(ids[1], ids[2], positions, half_box);
    Some(angle_from_arms(&u, arm_a.value, &w, arm_b.value))
}

fn clamped_cosine(c: f64) -> f64 {
    c.clamp(-1.0 + COSINE_CLAMP, 1.0 - COSINE_CLAMP)
}

fn angle_from_arms(u: &Vec3, ru: f64, w: &Vec3, rw: f64) -> GeometricParameter<2> {
    let ruw = ru * rw;
    if ruw == 0.0 {
        return GeometricParameter {
            value: clamped_cosine(1.0).acos() * DEGREES_PER_RADIAN,
            derivatives: [[0.0; 3]; 2],
        };
    }

    let c = clamped_cosine(dot(u, w) / ruw);
    let s = (1.0 - c * c).sqrt();
    let factor = DEGREES_PER_RADIAN / s;

    let da = scale(&sub(&scale(w, 1.0 / ruw), &scale(u, c / (ru * ru))), -factor);
    let db = scale(&sub(&scale(u, 1.0 / ruw), &scale(w, c / (rw * rw))), -factor);
    let dv = scale(&add(&da, &db), -1.0);

    GeometricParameter {
        value: c.acos() * DEGREES_PER_RADIAN,
        derivatives: [da, dv],
    }
}

/// Signed torsion angle of the chain `[a, b, c, d]`, in degrees on (−180, 180].
///
/// There is no cutoff test. The sign is negative when the normal of the
/// `a-b-c` plane points along the third bond.
pub fn dihedral(ids: [usize; 4], positions: &[Vec3], half_box: &Vec3) -> GeometricParameter<3> {
    let b1 = displacement(ids[0], ids[1], positions, half_box);
    let b2 = displacement(ids[1], ids[2], positions, half_box);
    let b3 = displacement(ids[2], ids[3], positions, half_box);

    let m = cross(&b1, &b2);
    let n = cross(&b2, &b3);
    let mm = dot(&m, &m);
    let nn = dot(&n, &n);
    let b22 = dot(&b2, &b2);

    if mm == 0.0 || nn == 0.0 || b22 == 0.0 {
        // Colinear chain: the torsion is undefined, report the clamped cis value.
        return GeometricParameter {
            value: clamped_cosine(1.0).acos() * DEGREES_PER_RADIAN,
            derivatives: [[0.0; 3]; 3],
        };
    }

    let c = clamped_cosine(dot(&m, &n) / (mm * nn).sqrt());
    let theta = c.acos() * DEGREES_PER_RADIAN;
    let value = if dot(&m, &b3) > 0.0 { -theta } else { theta };

    let b2_len = b22.sqrt();
    let fa = scale(&m, b2_len / mm * DEGREES_PER_RADIAN);
    let fd = scale(&n, -b2_len / nn * DEGREES_PER_RADIAN);
    let p = dot(&b1, &b2) / b22;
    let q = dot(&b3, &b2) / b22;
    let fb = add(&scale(&fa, -(1.0 + p)), &scale(&fd, q));
    let fc = scale(&add(&add(&fa, &fb), &fd), -1.0);

    GeometricParameter {
        value,
        derivatives: [fa, fb, fc],
    }
}

/// Angle of `[a, vertex, b]` together with the Stillinger-Weber radial factors.
///
/// Fails when either arm is beyond `cutoff2` or not strictly inside the
/// switching distance `sw_cutoff`, where the exponential factors are singular.
pub fn stillinger_weber_angle(
    ids: [usize; 3],
    positions: &[Vec3],
    half_box: &Vec3,
    cutoff2: f64,
    gamma: f64,
    sw_cutoff: f64,
) -> Option<StillingerWeberTerms> {
    let arm_a = distance([ids[0], ids[1]], positions, half_box, cutoff2)?;
    let arm_b = distance([ids[2], ids[1]], positions, half_box, cutoff2)?;
    if arm_a.value >= sw_cutoff || arm_b.value >= sw_cutoff {
        return None;
    }

    let u = displacement(ids[1], ids[0], positions, half_box);
    let w = displacement(ids[1], ids[2], positions, half_box);
    let angle = angle_from_arms(&u, arm_a.value, &w, arm_b.value);

    let (e1, de1) = switching_factor(arm_a.value, gamma, sw_cutoff);
    let (e2, de2) = switching_factor(arm_b.value, gamma, sw_cutoff);

    Some(StillingerWeberTerms {
        angle,
        arms: [arm_a, arm_b],
        prefactor: e1 * e2,
        radial_derivatives: [de1 * e2, e1 * de2],
    })
}

fn switching_factor(r: f64, gamma: f64, sw_cutoff: f64) -> (f64, f64) {
    let gap = r - sw_cutoff;
    let e = (gamma / gap).exp();
    (e, -gamma / (gap * gap) * e)
}

pub fn distance_unconditional(ids: [usize; 2], positions: &[Vec3], half_box: &Vec3) -> f64 {
    let d = displacement(ids[0], ids[1], positions, half_box);
    distance_from_displacement(&d, dot(&d, &d)).value
}

pub fn angle_unconditional(ids: [usize; 3], positions: &[Vec3], half_box: &Vec3) -> f64 {
    let u = displacement(ids[1], ids[0], positions, half_box);
    let w = displacement(ids[1], ids[2], positions, half_box);
    angle_from_arms(&u, norm(&u), &w, norm(&w)).value
}

pub fn dihedral_unconditional(ids: [usize; 4], positions: &[Vec3], half_box: &Vec3) -> f64 {
    dihedral(ids, positions, half_box).value
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN: Vec3 = [1.0e6, 1.0e6, 1.0e6];
    const FAR: f64 = f64::MAX;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() <= eps
    }

    fn vec_approx_eq(a: &Vec3, b: &Vec3, eps: f64) -> bool {
        (0..3).all(|k| approx_eq(a[k], b[k], eps))
    }

    fn full_derivatives<const M: usize>(p: &GeometricParameter<M>) -> Vec<Vec3> {
        let mut all: Vec<Vec3> = p.derivatives.to_vec();
        all.push(p.last_derivative());
        all
    }

    fn check_finite_differences<F>(positions: &[Vec3], analytic: &[Vec3], f: F)
    where
        F: Fn(&[Vec3]) -> f64,
    {
        let h = 1.0e-6;
        for (p, expected) in analytic.iter().enumerate() {
            for k in 0..3 {
                let mut plus = positions.to_vec();
                let mut minus = positions.to_vec();
                plus[p][k] += h;
                minus[p][k] -= h;
                let numeric = (f(&plus) - f(&minus)) / (2.0 * h);
                assert!(
                    approx_eq(numeric, expected[k], 1.0e-4 * numeric.abs().max(1.0)),
                    "particle {p} dim {k}: numeric {numeric} analytic {}",
                    expected[k]
                );
            }
        }
    }

    #[test]
    fn minimum_image_wraps_each_component() {
        let half = [5.0, 5.0, 5.0];
        let wrapped = minimum_image([6.0, -7.0, 2.0], &half);
        assert!(vec_approx_eq(&wrapped, &[-4.0, 3.0, 2.0], 1e-12));
    }

    #[test]
    fn minimum_image_is_idempotent() {
        let half = [5.0, 3.0, 7.5];
        let samples = [
            [9.9, -5.9, 14.0],
            [-4.0, 3.1, -8.0],
            [0.0, 0.0, 0.0],
            [5.0, -3.0, 7.5],
            [-9.2, 5.5, 1.0],
        ];
        for disp in samples {
            let once = minimum_image(disp, &half);
            let twice = minimum_image(once, &half);
            assert_eq!(once, twice);
            for k in 0..3 {
                assert!(once[k].abs() <= half[k]);
            }
        }
    }

    #[test]
    fn distance_respects_periodic_images() {
        let positions = [[0.5, 0.0, 0.0], [9.5, 0.0, 0.0]];
        let half = [5.0, 5.0, 5.0];
        let r = distance([0, 1], &positions, &half, FAR).unwrap();
        assert!(approx_eq(r.value, 1.0, 1e-12));
        // Through the boundary, particle 1 sits at -0.5, so moving 0 right increases r.
        assert!(vec_approx_eq(&r.derivatives[0], &[1.0, 0.0, 0.0], 1e-12));
    }

    #[test]
    fn distance_fails_beyond_cutoff() {
        let positions = [[0.0, 0.0, 0.0], [3.0, 4.0, 0.0]];
        assert!(distance([0, 1], &positions, &OPEN, 24.9).is_none());
        assert!(distance([0, 1], &positions, &OPEN, 25.0).is_some());
        assert!(squared_distance([0, 1], &positions, &OPEN, 24.9).is_none());
    }

    #[test]
    fn squared_distance_derivative() {
        let positions = [[0.1, 0.2, -0.3], [1.0, -0.5, 0.7]];
        let p = squared_distance([0, 1], &positions, &OPEN, FAR).unwrap();
        check_finite_differences(&positions, &full_derivatives(&p), |x| {
            squared_distance([0, 1], x, &OPEN, FAR).unwrap().value
        });
    }

    #[test]
    fn right_angle_and_derivatives() {
        let positions = [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let p = angle([0, 1, 2], &positions, &OPEN, FAR).unwrap();
        assert!(approx_eq(p.value, 90.0, 1e-9));
        assert!(vec_approx_eq(
            &p.derivatives[0],
            &[0.0, -DEGREES_PER_RADIAN, 0.0],
            1e-9
        ));
        assert!(vec_approx_eq(
            &p.derivatives[1],
            &[DEGREES_PER_RADIAN, DEGREES_PER_RADIAN, 0.0],
            1e-9
        ));
        assert!(vec_approx_eq(
            &p.last_derivative(),
            &[-DEGREES_PER_RADIAN, 0.0, 0.0],
            1e-9
        ));
    }

    #[test]
    fn angle_requires_both_arms_within_cutoff() {
        let positions = [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 3.0, 0.0]];
        assert!(angle([0, 1, 2], &positions, &OPEN, 4.0).is_none());
        assert!(angle([0, 1, 2], &positions, &OPEN, 9.0).is_some());
    }

    #[test]
    fn angle_matches_finite_differences() {
        let positions = [[1.2, 0.3, -0.4], [0.1, -0.2, 0.3], [-0.5, 1.1, 0.9]];
        let p = angle([0, 1, 2], &positions, &OPEN, FAR).unwrap();
        check_finite_differences(&positions, &full_derivatives(&p), |x| {
            angle([0, 1, 2], x, &OPEN, FAR).unwrap().value
        });
    }

    #[test]
    fn angle_is_translation_invariant() {
        let positions = [[1.2, 0.3, -0.4], [0.1, -0.2, 0.3], [-0.5, 1.1, 0.9]];
        let shift = [3.7, -2.2, 11.0];
        let moved: Vec<Vec3> = positions.iter().map(|x| add(x, &shift)).collect();

        let a = angle([0, 1, 2], &positions, &OPEN, FAR).unwrap();
        let b = angle([0, 1, 2], &moved, &OPEN, FAR).unwrap();
        assert!(approx_eq(a.value, b.value, 1e-9));
        for p in 0..2 {
            assert!(vec_approx_eq(&a.derivatives[p], &b.derivatives[p], 1e-8));
        }
    }

    #[test]
    fn angle_reflection_flips_derivatives() {
        let positions = [[1.2, 0.3, -0.4], [0.1, -0.2, 0.3], [-0.5, 1.1, 0.9]];
        let reflected: Vec<Vec3> = positions.iter().map(|x| scale(x, -1.0)).collect();

        let a = angle([0, 1, 2], &positions, &OPEN, FAR).unwrap();
        let b = angle([0, 1, 2], &reflected, &OPEN, FAR).unwrap();
        assert!(approx_eq(a.value, b.value, 1e-9));
        for p in 0..2 {
            assert!(vec_approx_eq(
                &a.derivatives[p],
                &scale(&b.derivatives[p], -1.0),
                1e-8
            ));
        }
    }

    #[test]
    fn colinear_angle_is_clamped_not_singular() {
        let positions = [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [-2.0, 0.0, 0.0]];
        let p = angle([0, 1, 2], &positions, &OPEN, FAR).unwrap();
        let expected = (-1.0 + COSINE_CLAMP).acos() * DEGREES_PER_RADIAN;
        assert!(approx_eq(p.value, expected, 1e-12));
        assert!(p.value < 180.0);
        for d in full_derivatives(&p) {
            assert!(d.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn planar_dihedrals_are_cis_or_trans() {
        let cis = [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]];
        let trans = [
            [1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [-1.0, 1.0, 0.0],
        ];
        let phi_cis = dihedral([0, 1, 2, 3], &cis, &OPEN).value;
        let phi_trans = dihedral([0, 1, 2, 3], &trans, &OPEN).value;
        assert!(approx_eq(phi_cis, 0.0, 0.1));
        assert!(approx_eq(phi_trans.abs(), 180.0, 0.1));
    }

    #[test]
    fn dihedral_sign_follows_third_bond() {
        let base = [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let up = [base[0], base[1], base[2], [0.0, 1.0, 1.0]];
        let down = [base[0], base[1], base[2], [0.0, 1.0, -1.0]];
        assert!(approx_eq(dihedral([0, 1, 2, 3], &up, &OPEN).value, 90.0, 1e-9));
        assert!(approx_eq(dihedral([0, 1, 2, 3], &down, &OPEN).value, -90.0, 1e-9));
    }

    #[test]
    fn dihedral_sign_of_skewed_chains() {
        let skewed = [
            [1.1, 0.2, -0.3],
            [0.0, 0.1, 0.2],
            [0.3, 1.2, -0.1],
            [1.0, 1.6, 0.8],
        ];
        let value = dihedral([0, 1, 2, 3], &skewed, &OPEN).value;
        assert!(approx_eq(value, 81.111_601_784, 1e-6));

        let trans_like = [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [-1.0, 1.0, 1.0]];
        let value = dihedral([0, 1, 2, 3], &trans_like, &OPEN).value;
        assert!(approx_eq(value, 135.0, 1e-9));

        let reversed = dihedral([3, 2, 1, 0], &skewed, &OPEN).value;
        assert!(approx_eq(reversed, 81.111_601_784, 1e-6));
    }

    #[test]
    fn dihedral_matches_finite_differences() {
        let positions = [
            [1.1, 0.2, -0.3],
            [0.0, 0.1, 0.2],
            [0.3, 1.2, -0.1],
            [1.0, 1.6, 0.8],
        ];
        let p = dihedral([0, 1, 2, 3], &positions, &OPEN);
        check_finite_differences(&positions, &full_derivatives(&p), |x| {
            dihedral([0, 1, 2, 3], x, &OPEN).value
        });
    }

    #[test]
    fn dihedral_wraps_bond_vectors() {
        let half = [5.0, 5.0, 5.0];
        let inside = [
            [1.1, 0.2, -0.3],
            [0.0, 0.1, 0.2],
            [0.3, 1.2, -0.1],
            [1.0, 1.6, 0.8],
        ];
        let mut split = inside;
        split[3][0] += 10.0;
        let a = dihedral([0, 1, 2, 3], &inside, &half).value;
        let b = dihedral([0, 1, 2, 3], &split, &half).value;
        assert!(approx_eq(a, b, 1e-9));
    }

    #[test]
    fn unconditional_variants_match() {
        let positions = [
            [1.1, 0.2, -0.3],
            [0.0, 0.1, 0.2],
            [0.3, 1.2, -0.1],
            [1.0, 1.6, 0.8],
        ];
        let half = [1.0, 1.0, 1.0];
        assert_eq!(
            distance_unconditional([0, 3], &positions, &half),
            distance([0, 3], &positions, &half, FAR).unwrap().value
        );
        assert_eq!(
            angle_unconditional([0, 1, 2], &positions, &half),
            angle([0, 1, 2], &positions, &half, FAR).unwrap().value
        );
        assert_eq!(
            dihedral_unconditional([0, 1, 2, 3], &positions, &half),
            dihedral([0, 1, 2, 3], &positions, &half).value
        );
    }

    #[test]
    fn stillinger_weber_terms() {
        let positions = [[1.0, 0.2, 0.0], [0.0, 0.0, 0.0], [-0.3, 1.1, 0.4]];
        let (gamma, a) = (1.2, 1.8);
        let terms = stillinger_weber_angle([0, 1, 2], &positions, &OPEN, FAR, gamma, a).unwrap();

        let r1 = norm(&positions[0]);
        let r2 = norm(&positions[2]);
        let expected = (gamma / (r1 - a)).exp() * (gamma / (r2 - a)).exp();
        assert!(approx_eq(terms.prefactor, expected, 1e-12));
        assert!(approx_eq(terms.arms[0].value, r1, 1e-12));
        assert!(approx_eq(
            terms.angle.value,
            angle([0, 1, 2], &positions, &OPEN, FAR).unwrap().value,
            1e-12
        ));

        let h = 1e-6;
        let e = |r: f64| (gamma / (r - a)).exp();
        let de1 = (e(r1 + h) - e(r1 - h)) / (2.0 * h) * e(r2);
        let de2 = e(r1) * (e(r2 + h) - e(r2 - h)) / (2.0 * h);
        assert!(approx_eq(terms.radial_derivatives[0], de1, 1e-6));
        assert!(approx_eq(terms.radial_derivatives[1], de2, 1e-6));
    }

    #[test]
    fn stillinger_weber_rejects_arms_at_switching_distance() {
        let positions = [[1.8, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        assert!(stillinger_weber_angle([0, 1, 2], &positions, &OPEN, FAR, 1.2, 1.8).is_none());
    }
}
