use super::config::ModelConfig;
use super::error::{Error, SetupStage};
use crate::interaction::{
    InteractionClassComputer, InteractionClassSpec, InteractionFamily, RangeSource,
};
use crate::io::{range::RangeReader, table::TableReader};
use crate::matrix::DesignMatrix;
use crate::model::frame::Frame;
use crate::model::topology::Topology;
use std::collections::HashSet;
use std::io::BufRead;
use std::ops::Range;

/// Coarse-grained interaction model: one [`InteractionClassSpec`] per
/// family plus the global column layout.
///
/// The setup passes must run in order: [`new`](Self::new) defines the
/// interactions, then [`read_ranges`](Self::read_ranges),
/// [`assign_columns`](Self::assign_columns) and, when any interaction is
/// tabulated, [`read_tables`](Self::read_tables). [`build`](Self::build)
/// runs them all.
#[derive(Debug, Clone)]
pub struct CgModel {
    config: ModelConfig,
    topology: Topology,
    /// Classes in [`InteractionFamily::ALL`] order.
    classes: Vec<InteractionClassSpec>,
    /// First global column of each class, then the total.
    column_offsets: Vec<usize>,
    stage: SetupStage,
}

impl CgModel {
    /// Validates the inputs and defines every family's interactions.
    pub fn new(config: ModelConfig, topology: Topology) -> Result<Self, Error> {
        config.validate()?;
        validate_topology(&topology)?;

        let classes = InteractionFamily::ALL
            .iter()
            .map(|&family| InteractionClassSpec::define(family, &config, &topology))
            .collect::<Result<Vec<_>, _>>()?;
        log::info!(
            "Defined interactions for {} CG types and {} sites",
            topology.n_types(),
            topology.n_sites()
        );

        Ok(Self {
            config,
            topology,
            classes,
            column_offsets: Vec::new(),
            stage: SetupStage::Defined,
        })
    }

    /// Runs the whole setup pipeline.
    ///
    /// `table` is only read when some interaction is tabulated; it is an
    /// error to tabulate interactions without one.
    pub fn build<N, B, T>(
        config: ModelConfig,
        topology: Topology,
        nonbonded_ranges: N,
        bonded_ranges: B,
        table: Option<T>,
    ) -> Result<Self, Error>
    where
        N: BufRead,
        B: BufRead,
        T: BufRead,
    {
        let mut model = Self::new(config, topology)?;
        model.read_ranges(nonbonded_ranges, bonded_ranges)?;
        model.assign_columns()?;
        match table {
            Some(reader) if model.n_tabulated() > 0 => model.read_tables(reader)?,
            Some(_) => log::info!("No interactions are tabulated; ignoring the table file"),
            None if model.n_tabulated() > 0 => {
                return Err(Error::invalid_config(format!(
                    "{} interactions are tabulated but no table file was given",
                    model.n_tabulated()
                )));
            }
            None => {}
        }
        Ok(model)
    }

    fn require(&self, expected: SetupStage) -> Result<(), Error> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(Error::setup_order(expected, self.stage))
        }
    }

    /// Reads the nonbonded and bonded range files and adjusts cutoffs.
    pub fn read_ranges<N: BufRead, B: BufRead>(
        &mut self,
        nonbonded: N,
        bonded: B,
    ) -> Result<(), Error> {
        self.require(SetupStage::Defined)?;
        let mut nonbonded = RangeReader::new(nonbonded)?;
        let mut bonded = RangeReader::new(bonded)?;

        for class in &mut self.classes {
            match class.family().range_source() {
                RangeSource::Nonbonded => class.read_ranges(&mut nonbonded)?,
                RangeSource::Bonded => class.read_ranges(&mut bonded)?,
                RangeSource::Builtin => {}
            }
        }
        if !nonbonded.is_exhausted() {
            log::warn!("Nonbonded range file has more lines than defined interactions");
        }
        if !bonded.is_exhausted() {
            log::warn!("Bonded range file has more lines than defined interactions");
        }

        self.class(InteractionFamily::PairNonbonded)
            .check_nonbonded_cutoffs()?;
        self.stage = SetupStage::RangesRead;
        Ok(())
    }

    /// Lays out the design-matrix columns of every family.
    pub fn assign_columns(&mut self) -> Result<(), Error> {
        self.require(SetupStage::RangesRead)?;
        let mut offsets = Vec::with_capacity(self.classes.len() + 1);
        let mut next = 0;
        for class in &mut self.classes {
            class.assign_columns();
            offsets.push(next);
            next += class.n_columns();
            log::debug!(
                "{} columns {}..{}",
                class.family(),
                offsets[offsets.len() - 1],
                next
            );
        }
        offsets.push(next);
        log::info!("Assigned {} design-matrix columns", next);
        self.column_offsets = offsets;
        self.stage = SetupStage::ColumnsAssigned;
        Ok(())
    }

    /// Reads the external force tables of all tabulatable families.
    pub fn read_tables<R: BufRead>(&mut self, reader: R) -> Result<(), Error> {
        self.require(SetupStage::ColumnsAssigned)?;
        let mut reader = TableReader::new(reader)?;
        for family in InteractionFamily::TABULATABLE {
            let slot = Self::slot(family);
            self.classes[slot].read_table(&mut reader)?;
        }
        log::info!("Read {} tabulated interactions", self.n_tabulated());
        self.stage = SetupStage::TablesRead;
        Ok(())
    }

    #[inline]
    fn slot(family: InteractionFamily) -> usize {
        InteractionFamily::ALL
            .iter()
            .position(|&f| f == family)
            .unwrap_or_default()
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn stage(&self) -> SetupStage {
        self.stage
    }

    pub fn class(&self, family: InteractionFamily) -> &InteractionClassSpec {
        &self.classes[Self::slot(family)]
    }

    /// All classes in column order.
    pub fn classes(&self) -> &[InteractionClassSpec] {
        &self.classes
    }

    /// Total number of design-matrix columns; zero before column assignment.
    pub fn n_columns(&self) -> usize {
        self.column_offsets.last().copied().unwrap_or(0)
    }

    pub fn n_tabulated(&self) -> usize {
        self.classes.iter().map(|c| c.n_tabulated()).sum()
    }

    /// Disjoint global column interval of every family, in column order.
    pub fn column_ranges(&self) -> Vec<(InteractionFamily, Range<usize>)> {
        self.column_offsets
            .windows(2)
            .zip(InteractionFamily::ALL)
            .map(|(w, family)| (family, w[0]..w[1]))
            .collect()
    }

    /// First global column of a family.
    pub fn column_offset(&self, family: InteractionFamily) -> Result<usize, Error> {
        if self.stage < SetupStage::ColumnsAssigned {
            return Err(Error::setup_order(SetupStage::ColumnsAssigned, self.stage));
        }
        Ok(self.column_offsets[Self::slot(family)])
    }

    /// Computer for one family, available once columns are assigned.
    pub fn computer(
        &self,
        family: InteractionFamily,
    ) -> Result<InteractionClassComputer<'_>, Error> {
        let offset = self.column_offset(family)?;
        Ok(InteractionClassComputer::new(self.class(family), offset))
    }

    /// Accumulates every family's contributions for one frame.
    ///
    /// `pairs` lists each nonbonded neighbor pair within the nonbonded cutoff
    /// once. Directly bonded pairs are excluded from the pair nonbonded
    /// family. Bonded tuples come from the topology and three-body triplets
    /// from the pairs sharing a site.
    pub fn accumulate_frame<M: DesignMatrix + ?Sized>(
        &self,
        matrix: &mut M,
        row_offset: usize,
        frame: &Frame,
        pairs: &[[usize; 2]],
    ) -> Result<usize, Error> {
        if frame.n_sites() != self.topology.n_sites() {
            return Err(Error::invalid_topology(format!(
                "frame has {} sites but the topology has {}",
                frame.n_sites(),
                self.topology.n_sites()
            )));
        }
        if let Some(&[a, b]) = pairs.iter().find(|p| p.iter().any(|&s| s >= frame.n_sites())) {
            return Err(Error::invalid_topology(format!(
                "neighbor pair ({a}, {b}) refers to a site outside the {}-site frame",
                frame.n_sites()
            )));
        }
        let types = &self.topology.sites;
        let bonded: HashSet<[usize; 2]> = self
            .topology
            .bonds
            .iter()
            .map(|&[a, b]| [a.min(b), a.max(b)])
            .collect();
        let nonbonded = pairs
            .iter()
            .copied()
            .filter(|&[a, b]| !bonded.contains(&[a.min(b), a.max(b)]));

        let mut count = 0;
        for family in InteractionFamily::ALL {
            if self.class(family).n_defined() == 0 {
                continue;
            }
            let mut computer = self.computer(family)?;
            count += match family {
                InteractionFamily::PairNonbonded => {
                    computer.accumulate(matrix, row_offset, frame, types, nonbonded.clone())?
                }
                InteractionFamily::PairBonded => computer.accumulate(
                    matrix,
                    row_offset,
                    frame,
                    types,
                    self.topology.bonds.iter().copied(),
                )?,
                InteractionFamily::Angular => computer.accumulate(
                    matrix,
                    row_offset,
                    frame,
                    types,
                    self.topology.angles.iter().copied(),
                )?,
                InteractionFamily::Dihedral => computer.accumulate(
                    matrix,
                    row_offset,
                    frame,
                    types,
                    self.topology.dihedrals.iter().copied(),
                )?,
                InteractionFamily::Density => {
                    computer.accumulate(matrix, row_offset, frame, types, pairs.iter().copied())?
                }
                InteractionFamily::ThreeBodyNonbonded => {
                    let triplets = triplets_from_pairs(pairs, frame.n_sites());
                    computer.accumulate(matrix, row_offset, frame, types, triplets)?
                }
            };
        }
        Ok(count)
    }
}

/// Every `[end, center, end]` triplet whose two arms are listed pairs.
fn triplets_from_pairs(pairs: &[[usize; 2]], n_sites: usize) -> Vec<[usize; 3]> {
    let mut neighbors = vec![Vec::new(); n_sites];
    for &[a, b] in pairs {
        if a < n_sites && b < n_sites && a != b {
            neighbors[a].push(b);
            neighbors[b].push(a);
        }
    }
    let mut triplets = Vec::new();
    for (center, around) in neighbors.iter().enumerate() {
        for (i, &end1) in around.iter().enumerate() {
            for &end2 in &around[i + 1..] {
                triplets.push([end1, center, end2]);
            }
        }
    }
    triplets
}

fn validate_topology(topology: &Topology) -> Result<(), Error> {
    if topology.types.is_empty() {
        return Err(Error::invalid_topology("no CG types are declared"));
    }
    let mut seen = HashSet::new();
    for name in &topology.types {
        if !seen.insert(name.as_str()) {
            return Err(Error::invalid_topology(format!(
                "CG type '{name}' is declared twice"
            )));
        }
    }
    if let Some((site, &t)) = topology
        .sites
        .iter()
        .enumerate()
        .find(|&(_, &t)| t == 0 || t > topology.n_types())
    {
        return Err(Error::invalid_topology(format!(
            "site {site} has type {t}, but types are numbered 1..={}",
            topology.n_types()
        )));
    }

    let n_sites = topology.n_sites();
    let check = |kind: &str, ids: &[usize]| -> Result<(), Error> {
        if let Some(&bad) = ids.iter().find(|&&s| s >= n_sites) {
            return Err(Error::invalid_topology(format!(
                "{kind} {ids:?} names site {bad}, but there are {n_sites} sites"
            )));
        }
        if ids.iter().enumerate().any(|(i, s)| ids[i + 1..].contains(s)) {
            return Err(Error::invalid_topology(format!(
                "{kind} {ids:?} repeats a site"
            )));
        }
        Ok(())
    };
    topology.bonds.iter().try_for_each(|ids| check("bond", ids))?;
    topology.angles.iter().try_for_each(|ids| check("angle", ids))?;
    topology
        .dihedrals
        .iter()
        .try_for_each(|ids| check("dihedral", ids))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DenseMatrix;
    use crate::model::topology::{DensityGroup, ThreeBodyEntry};
    use crate::model::types::{BasisType, DensityWeightStyle, ThreeBodyStyle};
    use std::io::Cursor;

    const TOPOLOGY: &str = r#"
types = ["A", "B"]
sites = [1, 2, 2, 1]
bonds = [[0, 1], [1, 2], [2, 3]]
angles = [[0, 1, 2], [1, 2, 3]]
dihedrals = [[0, 1, 2, 3]]
"#;

    const NONBONDED: &str = "\
# type1 type2 lower upper mode
A A 0.0 10.0 fm
A B 0.0 10.0 fm
B B 0.0 10.0 tab
";
    const BONDED: &str = "A B 0.8 2.0 fm\nB B 0.8 2.0 fm\nA B B 60 180 fm\nA B B A 0 360 fm+tab\n";
    const TABLE: &str = "\
short_range 1 5.0
B B
0.0 10.0
2.0
1.0
0.0
bond 0 0.01
angle 0 0.1
dihedral 1 90.0
A B B A
-180.0 180.0
0.0
1.0
0.0
-1.0
0.0
density 0 0.1
";

    fn config() -> ModelConfig {
        ModelConfig::from_toml_str(
            "[pair_nonbonded]\nfm_binwidth = 0.5\n\
             [pair_bonded]\nfm_binwidth = 0.1\n\
             [angular]\nfm_binwidth = 10.0\n\
             [dihedral]\nfm_binwidth = 30.0\n",
        )
        .unwrap()
    }

    fn topology() -> Topology {
        Topology::from_toml_str(TOPOLOGY).unwrap()
    }

    fn model() -> CgModel {
        CgModel::build(
            config(),
            topology(),
            Cursor::new(NONBONDED),
            Cursor::new(BONDED),
            Some(Cursor::new(TABLE)),
        )
        .unwrap()
    }

    #[test]
    fn builds_full_pipeline() {
        let model = model();
        assert_eq!(model.stage(), SetupStage::TablesRead);
        assert_eq!(model.n_tabulated(), 2);
        assert_eq!(model.class(InteractionFamily::PairNonbonded).n_matched(), 2);
        assert_eq!(model.class(InteractionFamily::PairBonded).n_matched(), 2);
        assert_eq!(model.class(InteractionFamily::Angular).n_matched(), 1);
        assert!(model.class(InteractionFamily::Dihedral).table(0).is_some());
    }

    #[test]
    fn column_ranges_are_disjoint_and_ordered() {
        let model = model();
        let ranges = model.column_ranges();
        assert_eq!(ranges.len(), InteractionFamily::ALL.len());
        assert_eq!(ranges[0].1.start, 0);
        for w in ranges.windows(2) {
            assert_eq!(w[0].1.end, w[1].1.start);
        }
        assert_eq!(ranges.last().unwrap().1.end, model.n_columns());
        // Two nonbonded interactions of 23 B-spline columns each.
        assert_eq!(ranges[0], (InteractionFamily::PairNonbonded, 0..46));
        assert_eq!(
            model.column_offset(InteractionFamily::PairBonded).unwrap(),
            46
        );
    }

    #[test]
    fn passes_must_run_in_order() {
        let mut model = CgModel::new(config(), topology()).unwrap();
        assert!(matches!(
            model.assign_columns(),
            Err(Error::SetupOrder {
                expected: SetupStage::RangesRead,
                found: SetupStage::Defined
            })
        ));
        assert!(model.computer(InteractionFamily::PairBonded).is_err());
        model
            .read_ranges(Cursor::new(NONBONDED), Cursor::new(BONDED))
            .unwrap();
        assert!(model.read_tables(Cursor::new(TABLE)).is_err());
        assert!(
            model
                .read_ranges(Cursor::new(NONBONDED), Cursor::new(BONDED))
                .is_err()
        );
    }

    #[test]
    fn tabulated_interactions_need_a_table() {
        let err = CgModel::build(
            config(),
            topology(),
            Cursor::new(NONBONDED),
            Cursor::new(BONDED),
            None::<Cursor<&str>>,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn bogus_mode_stops_before_any_columns() {
        let mut model = CgModel::new(config(), topology()).unwrap();
        let err = model
            .read_ranges(
                Cursor::new("A A 0 10 fm\nA B 0 10 bogus\nB B 0 10 none\n"),
                Cursor::new(BONDED),
            )
            .unwrap_err();
        assert!(err.to_string().contains("not recognized"));
        assert_eq!(err.line(), Some(2));
        assert_eq!(model.n_columns(), 0);
    }

    #[test]
    fn table_count_mismatch_is_reported_with_line() {
        let table = TABLE.replace("short_range 1 5.0", "short_range 3 5.0");
        let err = CgModel::build(
            config(),
            topology(),
            Cursor::new(NONBONDED),
            Cursor::new(BONDED),
            Some(Cursor::new(table)),
        )
        .unwrap_err();
        assert!(matches!(err, Error::TableCountMismatch { line: 1, .. }));
    }

    #[test]
    fn rejects_inconsistent_topology() {
        let mut bad = topology();
        bad.sites[2] = 3;
        assert!(matches!(
            CgModel::new(config(), bad),
            Err(Error::InvalidTopology(_))
        ));

        let mut bad = topology();
        bad.bonds.push([1, 1]);
        assert!(matches!(
            CgModel::new(config(), bad),
            Err(Error::InvalidTopology(_))
        ));

        let mut bad = topology();
        bad.angles.push([0, 1, 9]);
        assert!(matches!(
            CgModel::new(config(), bad),
            Err(Error::InvalidTopology(_))
        ));
    }

    #[test]
    fn frame_accumulation_stays_in_column_ranges() {
        let model = model();
        let frame = Frame::new(
            vec![
                [0.1, 0.2, 0.0],
                [1.2, 0.3, 0.1],
                [1.9, 1.4, -0.2],
                [3.1, 1.6, 0.6],
            ],
            [30.0, 30.0, 30.0],
        );
        let pairs = [[0, 1], [0, 2], [0, 3], [1, 2], [1, 3], [2, 3]];
        let mut matrix = DenseMatrix::new(12, model.n_columns());
        let count = model
            .accumulate_frame(&mut matrix, 0, &frame, &pairs)
            .unwrap();
        // Three nonbonded pairs survive bond exclusion; [0, 3] is A–A.
        assert!(count > 0);
        let nonbonded = model.column_ranges()[0].1.clone();
        let used: f64 = nonbonded.clone().map(|c| matrix.column_sum(c).abs()).sum();
        assert!(used > 0.0);
        // The tabulated B–B pair [1, 2] is bonded and excluded, and the
        // dihedral table subtracts from the target.
        assert!(matrix.target().iter().any(|&t| t != 0.0));
    }

    #[test]
    fn builds_density_and_three_body_families_last() {
        let mut config = config();
        config.basis = BasisType::LinearSpline;
        config.density.style = DensityWeightStyle::Gaussian;
        config.density.cutoff = Some(4.0);
        config.density.binning.fm_binwidth = Some(0.5);
        config.three_body.style = ThreeBodyStyle::StillingerWeber;
        let mut topology = topology();
        topology.density_groups.push(DensityGroup {
            name: "all".into(),
            members: vec!["A".into(), "B".into()],
            weights: None,
        });
        topology.three_body.push(ThreeBodyEntry {
            center: "B".into(),
            ends: ["A".into(), "B".into()],
            cutoff: 2.5,
            theta0: 109.47,
        });
        let bonded = "A B 0.8 2.0 fm\nB B 0.8 2.0 fm\nA B B 60 180 fm\n\
                      A B B A 0 360 none\nall all 0 3 fm 1.5\n";
        let model = CgModel::build(
            config,
            topology,
            Cursor::new("A A 0 10 fm\nA B 0 10 fm\nB B 0 10 none\n"),
            Cursor::new(bonded),
            None::<Cursor<&str>>,
        )
        .unwrap();

        let ranges = model.column_ranges();
        let (family, density) = ranges[4].clone();
        assert_eq!(family, InteractionFamily::Density);
        assert_eq!(density.len(), 7);
        let (family, three_body) = ranges[5].clone();
        assert_eq!(family, InteractionFamily::ThreeBodyNonbonded);
        assert_eq!(three_body, density.end..density.end + 1);
        assert_eq!(three_body.end, model.n_columns());

        let frame = Frame::open(vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.2, 0.0],
            [1.6, 1.1, 0.0],
            [2.9, 1.0, 0.3],
        ]);
        let pairs = [[0, 1], [0, 2], [1, 2], [1, 3], [2, 3]];
        let mut matrix = DenseMatrix::new(12, model.n_columns());
        model
            .accumulate_frame(&mut matrix, 0, &frame, &pairs)
            .unwrap();
        assert!(density.clone().any(|c| (0..12).any(|r| matrix.get(r, c) != 0.0)));
        assert!((0..12).any(|r| matrix.get(r, three_body.start) != 0.0));
    }

    #[test]
    fn pair_outside_frame_is_rejected() {
        let mut config = config();
        config.density.style = DensityWeightStyle::Gaussian;
        config.density.cutoff = Some(4.0);
        config.density.binning.fm_binwidth = Some(0.5);
        let mut topology = topology();
        topology.density_groups.push(DensityGroup {
            name: "all".into(),
            members: vec!["A".into(), "B".into()],
            weights: None,
        });
        let bonded = "A B 0.8 2.0 fm\nB B 0.8 2.0 fm\nA B B 60 180 fm\n\
                      A B B A 0 360 none\nall all 0 3 fm 1.5\n";
        let model = CgModel::build(
            config,
            topology,
            Cursor::new("A A 0 10 fm\nA B 0 10 fm\nB B 0 10 none\n"),
            Cursor::new(bonded),
            None::<Cursor<&str>>,
        )
        .unwrap();

        let frame = Frame::open(vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.2, 0.0],
            [1.6, 1.1, 0.0],
            [2.9, 1.0, 0.3],
        ]);
        let mut matrix = DenseMatrix::new(12, model.n_columns());
        let err = model
            .accumulate_frame(&mut matrix, 0, &frame, &[[0, 1], [2, 7]])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTopology(_)));
        assert!(err.to_string().contains("(2, 7)"));
        assert!(matrix.target().iter().all(|&t| t == 0.0));
    }

    #[test]
    fn triplets_pair_up_neighbors_of_each_center() {
        let triplets = triplets_from_pairs(&[[0, 1], [1, 2], [1, 3]], 4);
        assert_eq!(triplets, vec![[0, 1, 2], [0, 1, 3], [2, 1, 3]]);
    }
}
