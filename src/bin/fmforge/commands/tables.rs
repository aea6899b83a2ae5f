use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};

use fm_forge::io::output::{
    SplineRecord, integrate_force, write_bootstrap_force_table, write_bspline_record,
    write_force_derivative_table, write_force_table, write_lammps_table,
    write_linear_spline_coefficients, write_values,
};
use fm_forge::io::solution;
use fm_forge::{BasisType, CgModel, ForceGrid, InteractionClassComputer, InteractionFamily};

use crate::cli::{TableOutputOptions, TablesArgs};
use crate::commands::model::load_model;
use crate::display::{Context as DisplayContext, Progress, print_written_files};
use crate::io::{OutputDir, open_input};
use crate::util::text::count_noun;

const TOTAL_STEPS: u8 = 4;

const BSPLINE_FILE: &str = "b-spline.out";
const THREE_BODY_FILE: &str = "three_body_lambda.dat";

/// Master solution and its bootstrap estimates.
struct Solutions {
    master: Vec<f64>,
    estimates: Vec<Vec<f64>>,
}

pub fn run_tables(args: TablesArgs, ctx: DisplayContext) -> Result<()> {
    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);
    let model = load_model(&args.model, &mut progress)?;

    progress.step("Reading solutions");
    let solutions = read_solutions(&args.output, model.n_columns())?;
    progress.complete_step(
        "Reading solutions",
        &[
            count_noun(model.n_columns(), "coefficient"),
            count_noun(solutions.estimates.len(), "bootstrap estimate"),
        ],
    );

    progress.step("Writing force tables");
    let mut outputs = OutputDir::new(&args.output.output_dir)?;
    let mut writer = TableWriter::new(&model, &solutions, &args.output, &mut outputs)?;
    for family in InteractionFamily::ALL {
        writer.write_family(family)?;
    }
    let details = writer.finish()?;
    progress.complete_step("Writing force tables", &details);
    progress.finish("Tables written");

    if ctx.interactive {
        print_written_files(outputs.written());
    }

    Ok(())
}

fn read_solutions(options: &TableOutputOptions, n_columns: usize) -> Result<Solutions> {
    let mut vectors = options
        .solution
        .iter()
        .map(|path| {
            solution::read_exact(open_input(path)?, n_columns)
                .with_context(|| format!("Invalid solution file: {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let master = if vectors.is_empty() {
        anyhow::bail!("No solution file given");
    } else {
        vectors.remove(0)
    };
    Ok(Solutions {
        master,
        estimates: vectors,
    })
}

/// Writes the per-interaction files of every family plus the shared
/// coefficient records.
struct TableWriter<'a> {
    model: &'a CgModel,
    solutions: &'a Solutions,
    options: &'a TableOutputOptions,
    outputs: &'a mut OutputDir,
    bspline_out: Option<BufWriter<File>>,
    three_body_lambda: Vec<f64>,
    n_tables: usize,
}

impl<'a> TableWriter<'a> {
    fn new(
        model: &'a CgModel,
        solutions: &'a Solutions,
        options: &'a TableOutputOptions,
        outputs: &'a mut OutputDir,
    ) -> Result<Self> {
        let has_bspline_family = model
            .classes()
            .iter()
            .any(|c| c.n_matched() > 0 && c.basis() == BasisType::BSpline);
        let bspline_out = if has_bspline_family {
            Some(outputs.create(BSPLINE_FILE)?)
        } else {
            None
        };
        Ok(Self {
            model,
            solutions,
            options,
            outputs,
            bspline_out,
            three_body_lambda: Vec::new(),
            n_tables: 0,
        })
    }

    fn write_family(&mut self, family: InteractionFamily) -> Result<()> {
        let model = self.model;
        let mut computer = model.computer(family)?;
        let spec = computer.spec();
        for index in 0..spec.n_defined() {
            let Some(columns) = spec.column_range(index) else {
                continue;
            };
            let name = spec.interaction_name(index);
            match self.force_grid(&mut computer, index) {
                Err(fm_forge::Error::SingleCoefficient { .. }) => {
                    let column = computer.column_offset() + columns.start;
                    self.three_body_lambda.push(self.solutions.master[column]);
                    continue;
                }
                result => {
                    let grid = result.with_context(|| format!("Cannot evaluate '{name}'"))?;
                    self.write_force_file(&mut computer, index, &name, &grid)?;
                    if !self.options.no_lammps {
                        self.write_lammps_file(family, &name, &grid)?;
                    }
                }
            }
            self.write_coefficients(&computer, index, &name)?;
            self.n_tables += 1;
        }
        Ok(())
    }

    fn force_grid(
        &self,
        computer: &mut InteractionClassComputer<'_>,
        index: usize,
    ) -> Result<ForceGrid, fm_forge::Error> {
        let binwidth = computer.spec().binning().output_binwidth;
        if self.options.derivatives {
            computer.grid_of_force_and_derivative_values(&self.solutions.master, index, binwidth)
        } else {
            computer.grid_of_force_values(&self.solutions.master, index, binwidth)
        }
    }

    fn write_force_file(
        &mut self,
        computer: &mut InteractionClassComputer<'_>,
        index: usize,
        name: &str,
        grid: &ForceGrid,
    ) -> Result<()> {
        let file_name = format!("{name}.dat");
        if self.solutions.estimates.is_empty() {
            let mut writer = self.outputs.create(&file_name)?;
            let written = if self.options.derivatives {
                write_force_derivative_table(&mut writer, &grid.axis, &grid.force, &grid.derivative)
            } else {
                write_force_table(&mut writer, &grid.axis, &grid.force)
            };
            written.with_context(|| format!("Failed to write {file_name}"))?;
            return finish_file(writer, &file_name);
        }

        let binwidth = computer.spec().binning().output_binwidth;
        let estimates = self
            .solutions
            .estimates
            .iter()
            .map(|e| computer.grid_of_force_values(e, index, binwidth).map(|g| g.force))
            .collect::<Result<Vec<_>, _>>()?;
        let mut writer = self.outputs.create(&file_name)?;
        write_bootstrap_force_table(
            &mut writer,
            &grid.axis,
            &grid.force,
            &estimates,
            self.options.full_bootstrap,
        )
        .with_context(|| format!("Failed to write {file_name}"))?;
        finish_file(writer, &file_name)
    }

    fn write_lammps_file(
        &mut self,
        family: InteractionFamily,
        name: &str,
        grid: &ForceGrid,
    ) -> Result<()> {
        let char_id = family.char_id();
        if !matches!(char_id, 'n' | 'b' | 'a' | 'd') {
            return Ok(());
        }
        let file_name = format!("{name}.table");
        let potential = integrate_force(&grid.axis, &grid.force);
        let mut writer = self.outputs.create(&file_name)?;
        write_lammps_table(&mut writer, char_id, name, &grid.axis, &potential, &grid.force)
            .with_context(|| format!("Failed to write {file_name}"))?;
        finish_file(writer, &file_name)
    }

    fn write_coefficients(
        &mut self,
        computer: &InteractionClassComputer<'_>,
        index: usize,
        name: &str,
    ) -> Result<()> {
        let spec = computer.spec();
        let Some(columns) = spec.column_range(index) else {
            return Ok(());
        };
        let offset = computer.column_offset();
        let global = columns.start + offset..columns.end + offset;

        match spec.basis() {
            BasisType::BSpline => {
                let Some(out) = self.bspline_out.as_mut() else {
                    return Ok(());
                };
                let names: Vec<String> = spec
                    .interaction_labels(index)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                let record = SplineRecord {
                    char_id: spec.family().char_id(),
                    names: &names,
                    bspline_k: spec.binning().bspline_k,
                    n_break: spec.n_break(index),
                    lower: spec.lower_cutoffs()[index],
                    upper: spec.upper_cutoffs()[index],
                };
                let rows: Vec<&[f64]> = std::iter::once(&self.solutions.master)
                    .chain(&self.solutions.estimates)
                    .map(|s| &s[global.clone()])
                    .collect();
                write_bspline_record(out, &record, &rows)
                    .with_context(|| format!("Failed to write {BSPLINE_FILE}"))?;
            }
            BasisType::LinearSpline => {
                let file_name = format!("{name}.spline");
                let mut writer = self.outputs.create(&file_name)?;
                write_linear_spline_coefficients(
                    &mut writer,
                    spec.lower_cutoffs()[index],
                    spec.binning().fm_binwidth,
                    &self.solutions.master[global],
                )
                .with_context(|| format!("Failed to write {file_name}"))?;
                finish_file(writer, &file_name)?;
            }
        }
        Ok(())
    }

    /// Flushes the shared files and returns a summary for the progress log.
    fn finish(self) -> Result<Vec<String>> {
        if let Some(out) = self.bspline_out {
            finish_file(out, BSPLINE_FILE)?;
        }
        if !self.three_body_lambda.is_empty() {
            let mut writer = self.outputs.create(THREE_BODY_FILE)?;
            write_values(&mut writer, &self.three_body_lambda)
                .with_context(|| format!("Failed to write {THREE_BODY_FILE}"))?;
            finish_file(writer, THREE_BODY_FILE)?;
        }

        let mut details = vec![count_noun(self.n_tables, "force table")];
        if !self.three_body_lambda.is_empty() {
            details.push(count_noun(
                self.three_body_lambda.len(),
                "Stillinger-Weber coefficient",
            ));
        }
        details.push(format!("Into {}", self.options.output_dir.display()));
        Ok(details)
    }
}

fn finish_file(mut writer: BufWriter<File>, file_name: &str) -> Result<()> {
    writer
        .flush()
        .with_context(|| format!("Failed to write {file_name}"))
}
