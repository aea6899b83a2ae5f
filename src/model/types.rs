use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("interaction mode '{0}' is not recognized (expected none, fm, tab, or fm+tab)")]
pub struct ParseModeError(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid basis type: '{0}'")]
pub struct ParseBasisError(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} style: '{value}'")]
pub struct ParseStyleError {
    kind: &'static str,
    value: String,
}

/// Family of one-dimensional basis functions used to represent a force curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BasisType {
    /// Piecewise-linear hat functions on the force-matching grid.
    #[serde(alias = "linear")]
    LinearSpline,
    /// Clamped uniform B-splines of order `bspline_k`.
    #[default]
    #[serde(alias = "bspline")]
    BSpline,
}

impl fmt::Display for BasisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasisType::LinearSpline => write!(f, "linear spline"),
            BasisType::BSpline => write!(f, "B-spline"),
        }
    }
}

impl FromStr for BasisType {
    type Err = ParseBasisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear-spline" | "linear" | "0" => Ok(BasisType::LinearSpline),
            "b-spline" | "bspline" | "1" => Ok(BasisType::BSpline),
            _ => Err(ParseBasisError(s.to_string())),
        }
    }
}

/// How a defined interaction takes part in the model.
///
/// The keyword comes from the third column after the type names of
/// each range-file line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionMode {
    /// Not part of the model.
    None,
    /// Fitted by force matching.
    ForceMatch,
    /// Read from an external table.
    Tabulated,
    /// Both fitted and tabulated.
    ForceMatchAndTabulated,
}

impl InteractionMode {
    pub fn is_matched(self) -> bool {
        matches!(
            self,
            InteractionMode::ForceMatch | InteractionMode::ForceMatchAndTabulated
        )
    }

    pub fn is_tabulated(self) -> bool {
        matches!(
            self,
            InteractionMode::Tabulated | InteractionMode::ForceMatchAndTabulated
        )
    }
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionMode::None => write!(f, "none"),
            InteractionMode::ForceMatch => write!(f, "fm"),
            InteractionMode::Tabulated => write!(f, "tab"),
            InteractionMode::ForceMatchAndTabulated => write!(f, "fm+tab"),
        }
    }
}

impl FromStr for InteractionMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(InteractionMode::None),
            "fm" => Ok(InteractionMode::ForceMatch),
            "tab" => Ok(InteractionMode::Tabulated),
            "fm+tab" | "tab+fm" => Ok(InteractionMode::ForceMatchAndTabulated),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Parameter used for angular interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AngleStyle {
    /// Bond angle in degrees.
    #[default]
    Degrees,
    /// Distance between the two end sites.
    Distance,
}

/// Parameter used for dihedral interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DihedralStyle {
    /// Signed torsion angle in degrees, on (-180, 180].
    #[default]
    Degrees,
    /// Distance between the first and last sites.
    Distance,
}

/// Functional form of three-body nonbonded interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThreeBodyStyle {
    /// No three-body interactions.
    #[default]
    None,
    /// Spline in the angle, damped by Stillinger-Weber radial terms.
    Spline,
    /// Single-coefficient Stillinger-Weber form `λ (cosθ − cosθ0)² e1 e2`.
    #[serde(alias = "sw")]
    StillingerWeber,
}

/// Weight function used to accumulate local densities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DensityWeightStyle {
    /// No density interactions.
    #[default]
    None,
    /// Gaussian shifted so that value and slope vanish at the cutoff.
    Gaussian,
    /// Hyperbolic-tangent switch centered at a fraction of the cutoff.
    Switching,
    /// Lucy kernel `(1 + 3r/rc)(1 − r/rc)³`.
    Lucy,
}

macro_rules! style_from_str {
    ($ty:ty, $kind:literal, { $($pat:pat => $val:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = ParseStyleError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($pat => Ok($val),)+
                    _ => Err(ParseStyleError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

style_from_str!(AngleStyle, "angle", {
    "degrees" | "0" => AngleStyle::Degrees,
    "distance" | "1" => AngleStyle::Distance,
});

style_from_str!(DihedralStyle, "dihedral", {
    "degrees" | "0" => DihedralStyle::Degrees,
    "distance" | "1" => DihedralStyle::Distance,
});

style_from_str!(ThreeBodyStyle, "three-body", {
    "none" | "0" => ThreeBodyStyle::None,
    "spline" | "1" | "2" => ThreeBodyStyle::Spline,
    "stillinger-weber" | "sw" | "3" => ThreeBodyStyle::StillingerWeber,
});

style_from_str!(DensityWeightStyle, "density", {
    "none" | "0" => DensityWeightStyle::None,
    "gaussian" | "1" => DensityWeightStyle::Gaussian,
    "switching" | "2" => DensityWeightStyle::Switching,
    "lucy" | "3" => DensityWeightStyle::Lucy,
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_from_str_variants() {
        assert_eq!(
            InteractionMode::from_str("none").unwrap(),
            InteractionMode::None
        );
        assert_eq!(
            InteractionMode::from_str("fm").unwrap(),
            InteractionMode::ForceMatch
        );
        assert_eq!(
            InteractionMode::from_str("tab").unwrap(),
            InteractionMode::Tabulated
        );
        assert_eq!(
            InteractionMode::from_str("fm+tab").unwrap(),
            InteractionMode::ForceMatchAndTabulated
        );
        assert_eq!(
            InteractionMode::from_str("tab+fm").unwrap(),
            InteractionMode::ForceMatchAndTabulated
        );
    }

    #[test]
    fn mode_from_str_rejects_unknown_keyword() {
        let err = InteractionMode::from_str("bogus").unwrap_err();
        assert!(err.to_string().contains("not recognized"));
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn mode_is_case_sensitive() {
        assert!(InteractionMode::from_str("FM").is_err());
    }

    #[test]
    fn mode_flags() {
        assert!(!InteractionMode::None.is_matched());
        assert!(!InteractionMode::None.is_tabulated());
        assert!(InteractionMode::ForceMatch.is_matched());
        assert!(!InteractionMode::ForceMatch.is_tabulated());
        assert!(!InteractionMode::Tabulated.is_matched());
        assert!(InteractionMode::Tabulated.is_tabulated());
        assert!(InteractionMode::ForceMatchAndTabulated.is_matched());
        assert!(InteractionMode::ForceMatchAndTabulated.is_tabulated());
    }

    #[test]
    fn mode_display_round_trips() {
        for mode in [
            InteractionMode::None,
            InteractionMode::ForceMatch,
            InteractionMode::Tabulated,
            InteractionMode::ForceMatchAndTabulated,
        ] {
            assert_eq!(InteractionMode::from_str(&mode.to_string()).unwrap(), mode);
        }
    }

    #[test]
    fn basis_from_str_variants() {
        assert_eq!(
            BasisType::from_str("b-spline").unwrap(),
            BasisType::BSpline
        );
        assert_eq!(BasisType::from_str("BSpline").unwrap(), BasisType::BSpline);
        assert_eq!(
            BasisType::from_str("linear").unwrap(),
            BasisType::LinearSpline
        );
        assert_eq!(
            BasisType::from_str("quadratic").unwrap_err().to_string(),
            "invalid basis type: 'quadratic'"
        );
    }

    #[test]
    fn styles_accept_numeric_flags() {
        assert_eq!(
            ThreeBodyStyle::from_str("3").unwrap(),
            ThreeBodyStyle::StillingerWeber
        );
        assert_eq!(
            DensityWeightStyle::from_str("Lucy").unwrap(),
            DensityWeightStyle::Lucy
        );
        assert_eq!(
            DihedralStyle::from_str("1").unwrap(),
            DihedralStyle::Distance
        );
        let err = AngleStyle::from_str("radians").unwrap_err();
        assert_eq!(err.to_string(), "invalid angle style: 'radians'");
    }

    #[test]
    fn defaults() {
        assert_eq!(BasisType::default(), BasisType::BSpline);
        assert_eq!(AngleStyle::default(), AngleStyle::Degrees);
        assert_eq!(DihedralStyle::default(), DihedralStyle::Degrees);
        assert_eq!(ThreeBodyStyle::default(), ThreeBodyStyle::None);
        assert_eq!(DensityWeightStyle::default(), DensityWeightStyle::None);
    }
}
