use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "fmforge",
    about = "Coarse-grained force-matching model setup",
    version,
    author,
    before_help = crate::display::banner_for_help(),
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build the interaction model and report its column layout
    #[command(visible_alias = "l")]
    Layout(LayoutArgs),

    /// Write force tables and spline coefficients for a fitted solution
    #[command(visible_alias = "t")]
    Tables(TablesArgs),
}

/// Model definition files shared by all commands.
#[derive(Args)]
#[command(next_help_heading = "Model")]
pub struct ModelOptions {
    /// Model configuration (TOML); defaults apply if omitted
    #[arg(short, long, value_name = "FILE")]
    pub control: Option<PathBuf>,

    /// Coarse-grained topology (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub topology: PathBuf,

    /// Pair nonbonded range file
    #[arg(long, value_name = "FILE", default_value = "rmin.in")]
    pub nonbonded_ranges: PathBuf,

    /// Bonded, angular, dihedral and density range file
    #[arg(long, value_name = "FILE", default_value = "rmin_b.in")]
    pub bonded_ranges: PathBuf,

    /// Tabulated forces, required when a range file marks entries as tabulated
    #[arg(long, value_name = "FILE")]
    pub table: Option<PathBuf>,
}

/// Output verbosity options shared by all commands.
#[derive(Args)]
pub struct CommonOptions {
    /// Suppress progress output (for scripting)
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Args)]
pub struct LayoutArgs {
    #[command(flatten)]
    pub model: ModelOptions,

    #[command(flatten)]
    pub common: CommonOptions,
}

#[derive(Args)]
pub struct TablesArgs {
    #[command(flatten)]
    pub model: ModelOptions,

    #[command(flatten)]
    pub output: TableOutputOptions,

    #[command(flatten)]
    pub common: CommonOptions,
}

#[derive(Args)]
#[command(next_help_heading = "Output")]
pub struct TableOutputOptions {
    /// Solution file(s): the master fit first, then bootstrap estimates
    #[arg(short, long, value_name = "FILE", action = ArgAction::Append, required = true)]
    pub solution: Vec<PathBuf>,

    /// Directory receiving the generated files
    #[arg(short = 'o', long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Also write force derivatives (B-spline bases only)
    #[arg(long)]
    pub derivatives: bool,

    /// Write every bootstrap estimate instead of the standard error
    #[arg(long)]
    pub full_bootstrap: bool,

    /// Skip LAMMPS table files
    #[arg(long)]
    pub no_lammps: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}
