use std::io::{self, Write};

use anyhow::Error;

use crate::util::text::wrap;

const TOP: &str = "   ╔══════════════════════════════════════════════════════════════╗";
const RULE: &str = "   ╟──────────────────────────────────────────────────────────────╢";
const BOTTOM: &str = "   ╚══════════════════════════════════════════════════════════════╝";

#[rustfmt::skip]
pub fn print_error(err: &Error) {
    let mut stderr = io::stderr().lock();

    let _ = writeln!(stderr);
    let _ = writeln!(stderr, "{TOP}");
    let _ = writeln!(stderr, "   ║  {:<60}║", "✗ Error");
    let _ = writeln!(stderr, "{RULE}");

    for line in wrap(&err.to_string(), 59) {
        let _ = writeln!(stderr, "   ║  {:<59} ║", line);
    }

    for cause in err.chain().skip(1) {
        let _ = writeln!(stderr, "{RULE}");
        let _ = writeln!(stderr, "   ║  {:<60}║", "Caused by:");
        for line in wrap(&cause.to_string(), 57) {
            let _ = writeln!(stderr, "   ║    {:<57} ║", line);
        }
    }

    let hints = HintCollector::collect(err);
    if !hints.is_empty() {
        let _ = writeln!(stderr, "{RULE}");
        let _ = writeln!(stderr, "   ║  {:<60}║", "Hints:");
        for hint in hints {
            let wrapped = wrap(&hint, 55);
            if let Some((first, rest)) = wrapped.split_first() {
                let _ = writeln!(stderr, "   ║    • {:<55} ║", first);
                for line in rest {
                    let _ = writeln!(stderr, "   ║      {:<55} ║", line);
                }
            }
        }
    }

    let _ = writeln!(stderr, "{BOTTOM}");
    let _ = writeln!(stderr);
}

#[derive(Default)]
struct HintCollector {
    hints: Vec<String>,
}

impl HintCollector {
    fn collect(err: &Error) -> Vec<String> {
        let mut collector = Self::default();

        if let Some(setup_err) = err.downcast_ref::<fm_forge::Error>() {
            collector.collect_setup_hints(setup_err);
        } else if let Some(io_err) = err.downcast_ref::<fm_forge::io::Error>() {
            collector.collect_io_hints(io_err);
        } else if let Some(source) = err.downcast_ref::<std::io::Error>() {
            collector.collect_std_io_hints(source);
        }

        collector.hints
    }

    fn add(&mut self, hint: impl Into<String>) {
        self.hints.push(hint.into());
    }

    fn collect_setup_hints(&mut self, err: &fm_forge::Error) {
        use fm_forge::Error as SetupError;

        match err {
            SetupError::Io(io_err) => self.collect_io_hints(io_err),

            SetupError::ConfigParse(_) => {
                self.add("Check the TOML syntax of the configuration or topology file");
                self.add("Style keywords are kebab-case, e.g. 'stillinger-weber'");
            }

            SetupError::InvalidConfig(_) => {
                self.add("Binwidths and cutoffs must be positive");
                self.add("B-spline order must be at least 2");
            }

            SetupError::InvalidTopology(_) => {
                self.add("Site types are 1-based indices into 'types'");
                self.add("Bond, angle and dihedral entries are 0-based site indices");
            }

            SetupError::TableFamilyMismatch { expected, .. } => {
                self.add(format!("The next table section must be '{}'", expected));
                self.add("Sections follow the order: short_range, bond, angle, dihedral, density");
                self.add("Write a header with count 0 for families with nothing tabulated");
            }

            SetupError::TableCountMismatch { .. } => {
                self.add("Each header count must equal the number of 'tab' range entries");
            }

            SetupError::UndefinedTabulatedInteraction { .. } => {
                self.add("Mark the interaction as 'tab' or 'fm+tab' in the range file");
                self.add("Type labels may be names or 1-based type numbers");
            }

            SetupError::NonbondedCutoffExceeded { cutoff, .. } => {
                self.add(format!(
                    "Lower the nonbonded upper range to at most {}",
                    cutoff
                ));
                self.add("Or raise 'pair_nonbonded_cutoff' in the configuration");
            }

            SetupError::UnsupportedBasis { .. } => {
                self.add("Force derivatives need a B-spline basis");
                self.add("Drop --derivatives or set basis = \"b-spline\"");
            }

            SetupError::SolutionLength { expected, .. } => {
                self.add(format!(
                    "The model has {} columns; was the solution fitted with these range files?",
                    expected
                ));
            }

            SetupError::SetupOrder { .. }
            | SetupError::TupleArity { .. }
            | SetupError::NotMatched { .. }
            | SetupError::SingleCoefficient { .. } => {}
        }
    }

    fn collect_io_hints(&mut self, err: &fm_forge::io::Error) {
        use fm_forge::io::{Error as IoError, Format};

        match err {
            IoError::Io { source } => self.collect_std_io_hints(source),

            IoError::Parse { format, line, .. } => {
                self.add(format!(
                    "Inspect the {} file around line {}",
                    format, line
                ));
                match format {
                    Format::Range => {
                        self.add("Range lines are '<names> <lower> <upper> <mode>'");
                        self.add("Modes: none, fm, tab, fm+tab");
                        self.add("Every defined interaction needs a line, in definition order");
                    }
                    Format::Table => {
                        self.add("Section headers are '<name> <count> <binwidth>'");
                        self.add("Each block has a type line and a 'lower upper' line");
                        self.add("Table values follow one per line");
                    }
                    Format::Solution => {
                        self.add("Solutions are whitespace-separated numbers");
                    }
                }
            }
        }
    }

    fn collect_std_io_hints(&mut self, source: &std::io::Error) {
        use std::io::ErrorKind;

        match source.kind() {
            ErrorKind::NotFound => {
                self.add("Check the path spelling and ensure the file exists");
                self.add("Range files default to rmin.in and rmin_b.in");
            }

            ErrorKind::PermissionDenied => {
                self.add("Check file permissions with `ls -la`");
            }

            ErrorKind::WriteZero => {
                self.add("Check available disk space");
            }

            _ => {
                self.add("Check file path, permissions, and disk space");
            }
        }
    }
}
