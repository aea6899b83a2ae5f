use crate::hashing;
use serde::Deserialize;

/// Three-body nonbonded triplet: a center type with an unordered pair of end
/// types, plus its Stillinger-Weber parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThreeBodyEntry {
    pub center: String,
    pub ends: [String; 2],
    /// Switching distance `a` of the radial factors.
    pub cutoff: f64,
    /// Reference angle in degrees.
    #[serde(default = "default_theta0")]
    pub theta0: f64,
}

fn default_theta0() -> f64 {
    109.47
}

/// Set of CG types whose local density is tracked.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DensityGroup {
    pub name: String,
    /// Names of the member types.
    pub members: Vec<String>,
    /// Contribution of each member type; unit weights when absent.
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
}

/// Coarse-grained topology.
///
/// Types are referred to by 1-based index in `sites` and by name everywhere
/// else. Bonded lists hold 0-based site indices.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Topology {
    pub types: Vec<String>,
    #[serde(default)]
    pub sites: Vec<usize>,
    #[serde(default)]
    pub bonds: Vec<[usize; 2]>,
    /// Angles as `[end, center, end]`.
    #[serde(default)]
    pub angles: Vec<[usize; 3]>,
    #[serde(default)]
    pub dihedrals: Vec<[usize; 4]>,
    #[serde(default)]
    pub three_body: Vec<ThreeBodyEntry>,
    #[serde(default)]
    pub density_groups: Vec<DensityGroup>,
}

impl Topology {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    #[inline]
    pub fn n_types(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn n_sites(&self) -> usize {
        self.sites.len()
    }

    /// 1-based index of the type called `name`.
    pub fn type_index(&self, name: &str) -> Option<usize> {
        self.types.iter().position(|t| t == name).map(|i| i + 1)
    }

    /// Name of the 1-based type `t`.
    pub fn type_name(&self, t: usize) -> Option<&str> {
        t.checked_sub(1)
            .and_then(|i| self.types.get(i))
            .map(String::as_str)
    }

    /// 1-based type of a site.
    #[inline]
    pub fn site_type(&self, site: usize) -> usize {
        self.sites[site]
    }

    /// Sorted, deduplicated hashes of the type tuples present in a bonded list.
    ///
    /// `n_body` selects bonds (2), angles (3) or dihedrals (4).
    pub fn active_hashes(&self, n_body: usize) -> Vec<usize> {
        let tuples: Box<dyn Iterator<Item = Vec<usize>> + '_> = match n_body {
            2 => Box::new(self.bonds.iter().map(|ids| self.tuple_types(ids))),
            3 => Box::new(self.angles.iter().map(|ids| self.tuple_types(ids))),
            4 => Box::new(self.dihedrals.iter().map(|ids| self.tuple_types(ids))),
            _ => Box::new(std::iter::empty()),
        };
        let mut hashes: Vec<usize> = tuples
            .filter_map(|types| hashing::interaction_hash(&types, self.n_types()))
            .collect();
        hashes.sort_unstable();
        hashes.dedup();
        hashes
    }

    fn tuple_types(&self, ids: &[usize]) -> Vec<usize> {
        ids.iter()
            .map(|&s| self.sites.get(s).copied().unwrap_or(0))
            .collect()
    }
}
