//! Model configuration.
//!
//! [`ModelConfig`] is read from TOML. Every key is optional:
//!
//! ```toml
//! basis = "b-spline"
//! pair_nonbonded_cutoff = 12.0
//!
//! [pair_nonbonded]
//! fm_binwidth = 0.1
//!
//! [dihedral]
//! style = "degrees"
//!
//! [density]
//! style = "lucy"
//! cutoff = 8.0
//! ```

use super::error::Error;
use crate::interaction::InteractionFamily;
use crate::model::types::{
    AngleStyle, BasisType, DensityWeightStyle, DihedralStyle, ThreeBodyStyle,
};
use serde::Deserialize;

/// Grid spacing and spline order used by one interaction family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binning {
    /// Spacing of basis break points.
    pub fm_binwidth: f64,
    /// Spacing of output grids, and of the B-spline upper-cutoff snap.
    pub output_binwidth: f64,
    pub bspline_k: usize,
}

/// Per-family overrides of the binning defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClassConfig {
    pub fm_binwidth: Option<f64>,
    pub output_binwidth: Option<f64>,
    pub bspline_k: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AngularConfig {
    #[serde(flatten)]
    pub binning: ClassConfig,
    pub style: AngleStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DihedralConfig {
    #[serde(flatten)]
    pub binning: ClassConfig,
    pub style: DihedralStyle,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ThreeBodyConfig {
    #[serde(flatten)]
    pub binning: ClassConfig,
    pub style: ThreeBodyStyle,
    /// Decay constant of the Stillinger-Weber radial factors.
    pub gamma: f64,
}

fn default_gamma() -> f64 {
    1.2
}

impl Default for ThreeBodyConfig {
    fn default() -> Self {
        Self {
            binning: ClassConfig::default(),
            style: ThreeBodyStyle::default(),
            gamma: default_gamma(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DensityConfig {
    #[serde(flatten)]
    pub binning: ClassConfig,
    pub style: DensityWeightStyle,
    /// Weight-function cutoff; the pair nonbonded cutoff when absent.
    pub cutoff: Option<f64>,
}

/// Configuration of a coarse-grained interaction model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub basis: BasisType,
    #[serde(default = "default_bspline_k")]
    pub bspline_k: usize,
    #[serde(default = "default_pair_nonbonded_cutoff")]
    pub pair_nonbonded_cutoff: f64,
    #[serde(default)]
    pub pair_nonbonded: ClassConfig,
    #[serde(default)]
    pub pair_bonded: ClassConfig,
    #[serde(default)]
    pub angular: AngularConfig,
    #[serde(default)]
    pub dihedral: DihedralConfig,
    #[serde(default)]
    pub three_body: ThreeBodyConfig,
    #[serde(default)]
    pub density: DensityConfig,
}

fn default_bspline_k() -> usize {
    4
}
fn default_pair_nonbonded_cutoff() -> f64 {
    10.0
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            basis: BasisType::default(),
            bspline_k: default_bspline_k(),
            pair_nonbonded_cutoff: default_pair_nonbonded_cutoff(),
            pair_nonbonded: ClassConfig::default(),
            pair_bonded: ClassConfig::default(),
            angular: AngularConfig::default(),
            dihedral: DihedralConfig::default(),
            three_body: ThreeBodyConfig::default(),
            density: DensityConfig::default(),
        }
    }
}

fn default_binwidths(family: InteractionFamily) -> (f64, f64) {
    match family {
        InteractionFamily::PairNonbonded => (0.05, 0.01),
        InteractionFamily::PairBonded => (0.01, 0.001),
        InteractionFamily::Angular => (1.0, 0.1),
        InteractionFamily::Dihedral => (5.0, 1.0),
        InteractionFamily::ThreeBodyNonbonded => (1.0, 0.1),
        InteractionFamily::Density => (0.1, 0.01),
    }
}

impl ModelConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, Error> {
        let config: ModelConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn class_config(&self, family: InteractionFamily) -> &ClassConfig {
        match family {
            InteractionFamily::PairNonbonded => &self.pair_nonbonded,
            InteractionFamily::PairBonded => &self.pair_bonded,
            InteractionFamily::Angular => &self.angular.binning,
            InteractionFamily::Dihedral => &self.dihedral.binning,
            InteractionFamily::ThreeBodyNonbonded => &self.three_body.binning,
            InteractionFamily::Density => &self.density.binning,
        }
    }

    /// Effective binning of a family after applying overrides.
    pub fn binning(&self, family: InteractionFamily) -> Binning {
        let (fm, output) = default_binwidths(family);
        let overrides = self.class_config(family);
        Binning {
            fm_binwidth: overrides.fm_binwidth.unwrap_or(fm),
            output_binwidth: overrides.output_binwidth.unwrap_or(output),
            bspline_k: overrides.bspline_k.unwrap_or(self.bspline_k),
        }
    }

    /// Density weight cutoff, clamped to the pair nonbonded cutoff.
    pub fn density_cutoff(&self) -> f64 {
        match self.density.cutoff {
            Some(c) if c > self.pair_nonbonded_cutoff => {
                log::warn!(
                    "density cutoff {} exceeds the pair nonbonded cutoff {}; using the latter",
                    c,
                    self.pair_nonbonded_cutoff
                );
                self.pair_nonbonded_cutoff
            }
            Some(c) => c,
            None => self.pair_nonbonded_cutoff,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(self.pair_nonbonded_cutoff > 0.0) {
            return Err(Error::invalid_config(format!(
                "pair_nonbonded_cutoff must be positive, got {}",
                self.pair_nonbonded_cutoff
            )));
        }
        if let Some(c) = self.density.cutoff {
            if !(c > 0.0) {
                return Err(Error::invalid_config(format!(
                    "density.cutoff must be positive, got {c}"
                )));
            }
        }
        for family in InteractionFamily::ALL {
            let binning = self.binning(family);
            if !(binning.fm_binwidth > 0.0) || !(binning.output_binwidth > 0.0) {
                return Err(Error::invalid_config(format!(
                    "{family} binwidths must be positive (fm {}, output {})",
                    binning.fm_binwidth, binning.output_binwidth
                )));
            }
            if binning.bspline_k < 2 {
                return Err(Error::invalid_config(format!(
                    "{family} bspline_k must be at least 2, got {}",
                    binning.bspline_k
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = ModelConfig::default();
        assert_eq!(config.basis, BasisType::BSpline);
        assert_eq!(config.bspline_k, 4);
        assert_eq!(config.pair_nonbonded_cutoff, 10.0);
        assert_eq!(config.angular.style, AngleStyle::Degrees);
        assert_eq!(config.three_body.style, ThreeBodyStyle::None);
        assert_eq!(config.three_body.gamma, 1.2);
        assert_eq!(config.density.style, DensityWeightStyle::None);
        assert!(config.validate().is_ok());

        let nb = config.binning(InteractionFamily::PairNonbonded);
        assert_eq!((nb.fm_binwidth, nb.output_binwidth, nb.bspline_k), (0.05, 0.01, 4));
        let dih = config.binning(InteractionFamily::Dihedral);
        assert_eq!((dih.fm_binwidth, dih.output_binwidth), (5.0, 1.0));
    }

    #[test]
    fn empty_toml_equals_default() {
        assert_eq!(ModelConfig::from_toml_str("").unwrap(), ModelConfig::default());
    }

    #[test]
    fn parses_overrides() {
        let text = r#"
basis = "linear-spline"
pair_nonbonded_cutoff = 12.0

[pair_nonbonded]
fm_binwidth = 0.5

[angular]
style = "distance"
bspline_k = 6

[three_body]
style = "stillinger-weber"
gamma = 1.5

[density]
style = "lucy"
cutoff = 6.0
"#;
        let config = ModelConfig::from_toml_str(text).unwrap();
        assert_eq!(config.basis, BasisType::LinearSpline);
        assert_eq!(
            config.binning(InteractionFamily::PairNonbonded).fm_binwidth,
            0.5
        );
        assert_eq!(
            config.binning(InteractionFamily::PairNonbonded).output_binwidth,
            0.01
        );
        assert_eq!(config.angular.style, AngleStyle::Distance);
        assert_eq!(config.binning(InteractionFamily::Angular).bspline_k, 6);
        assert_eq!(config.three_body.style, ThreeBodyStyle::StillingerWeber);
        assert_eq!(config.three_body.gamma, 1.5);
        assert_eq!(config.density.style, DensityWeightStyle::Lucy);
        assert_eq!(config.density_cutoff(), 6.0);
    }

    #[test]
    fn density_cutoff_is_clamped() {
        let mut config = ModelConfig::default();
        assert_eq!(config.density_cutoff(), 10.0);
        config.density.cutoff = Some(15.0);
        assert_eq!(config.density_cutoff(), 10.0);
    }

    #[test]
    fn rejects_invalid_values() {
        let err = ModelConfig::from_toml_str("[dihedral]\nfm_binwidth = 0.0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = ModelConfig::from_toml_str("bspline_k = 1\n").unwrap_err();
        assert!(err.to_string().contains("bspline_k"));

        let err = ModelConfig::from_toml_str("basis = \"cubic\"\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }
}
