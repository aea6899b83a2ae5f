use std::fmt;

/// The six kinds of interaction a model can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InteractionFamily {
    PairNonbonded,
    PairBonded,
    Angular,
    Dihedral,
    Density,
    ThreeBodyNonbonded,
}

/// Where a family's range lines come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSource {
    Nonbonded,
    Bonded,
    /// Ranges are fixed at definition time.
    Builtin,
}

impl InteractionFamily {
    /// Families in column order: each family's block of design-matrix
    /// columns follows the previous one's.
    pub const ALL: [InteractionFamily; 6] = [
        InteractionFamily::PairNonbonded,
        InteractionFamily::PairBonded,
        InteractionFamily::Angular,
        InteractionFamily::Dihedral,
        InteractionFamily::Density,
        InteractionFamily::ThreeBodyNonbonded,
    ];

    /// Families with a section in range and table files, in file order.
    pub const TABULATABLE: [InteractionFamily; 5] = [
        InteractionFamily::PairNonbonded,
        InteractionFamily::PairBonded,
        InteractionFamily::Angular,
        InteractionFamily::Dihedral,
        InteractionFamily::Density,
    ];

    /// Number of particles (or density groups) named per interaction.
    pub fn n_body(self) -> usize {
        match self {
            InteractionFamily::PairNonbonded
            | InteractionFamily::PairBonded
            | InteractionFamily::Density => 2,
            InteractionFamily::Angular | InteractionFamily::ThreeBodyNonbonded => 3,
            InteractionFamily::Dihedral => 4,
        }
    }

    pub fn full_name(self) -> &'static str {
        match self {
            InteractionFamily::PairNonbonded => "pair nonbonded",
            InteractionFamily::PairBonded => "pair bonded",
            InteractionFamily::Angular => "angular bonded",
            InteractionFamily::Dihedral => "dihedral bonded",
            InteractionFamily::ThreeBodyNonbonded => "three body nonbonded",
            InteractionFamily::Density => "density",
        }
    }

    /// Suffix appended to interaction names; empty for none.
    pub fn short_name(self) -> &'static str {
        match self {
            InteractionFamily::PairNonbonded | InteractionFamily::ThreeBodyNonbonded => "",
            InteractionFamily::PairBonded => "bon",
            InteractionFamily::Angular => "ang",
            InteractionFamily::Dihedral => "dih",
            InteractionFamily::Density => "den",
        }
    }

    /// Section name in table files.
    pub fn table_name(self) -> &'static str {
        match self {
            InteractionFamily::PairNonbonded => "short_range",
            InteractionFamily::PairBonded => "bond",
            InteractionFamily::Angular => "angle",
            InteractionFamily::Dihedral => "dihedral",
            InteractionFamily::ThreeBodyNonbonded => "three_body",
            InteractionFamily::Density => "density",
        }
    }

    /// Single-character tag used in coefficient records and table headers.
    pub fn char_id(self) -> char {
        match self {
            InteractionFamily::PairNonbonded => 'n',
            InteractionFamily::PairBonded => 'b',
            InteractionFamily::Angular => 'a',
            InteractionFamily::Dihedral => 'd',
            InteractionFamily::ThreeBodyNonbonded => '3',
            InteractionFamily::Density => 'p',
        }
    }

    pub fn range_source(self) -> RangeSource {
        match self {
            InteractionFamily::PairNonbonded => RangeSource::Nonbonded,
            InteractionFamily::ThreeBodyNonbonded => RangeSource::Builtin,
            _ => RangeSource::Bonded,
        }
    }

    /// Whether the defined interactions are the bonded type tuples actually
    /// present in the topology.
    pub fn is_topology_filtered(self) -> bool {
        matches!(
            self,
            InteractionFamily::PairBonded
                | InteractionFamily::Angular
                | InteractionFamily::Dihedral
        )
    }
}

impl fmt::Display for InteractionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tags_are_unique() {
        let chars: HashSet<char> = InteractionFamily::ALL.iter().map(|f| f.char_id()).collect();
        let tables: HashSet<&str> = InteractionFamily::ALL
            .iter()
            .map(|f| f.table_name())
            .collect();
        assert_eq!(chars.len(), 6);
        assert_eq!(tables.len(), 6);
    }

    #[test]
    fn body_counts() {
        assert_eq!(InteractionFamily::PairNonbonded.n_body(), 2);
        assert_eq!(InteractionFamily::Angular.n_body(), 3);
        assert_eq!(InteractionFamily::Dihedral.n_body(), 4);
        assert_eq!(InteractionFamily::ThreeBodyNonbonded.n_body(), 3);
        assert_eq!(InteractionFamily::Density.n_body(), 2);
    }

    #[test]
    fn range_sources() {
        assert_eq!(
            InteractionFamily::PairNonbonded.range_source(),
            RangeSource::Nonbonded
        );
        assert_eq!(InteractionFamily::Density.range_source(), RangeSource::Bonded);
        assert_eq!(
            InteractionFamily::ThreeBodyNonbonded.range_source(),
            RangeSource::Builtin
        );
        assert!(!InteractionFamily::TABULATABLE.contains(&InteractionFamily::ThreeBodyNonbonded));
    }

    #[test]
    fn display_uses_full_name() {
        assert_eq!(InteractionFamily::Dihedral.to_string(), "dihedral bonded");
    }
}
