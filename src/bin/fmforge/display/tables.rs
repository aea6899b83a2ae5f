use std::io::{self, Write};
use std::path::PathBuf;

use fm_forge::{CgModel, InteractionClassSpec};

use crate::util::text::{column_span, count_noun, truncate};

const INDENT: &str = "      ";

const BOX_INNER_WIDTH: usize = 62;
const SAFE_TABLE_WIDTH: usize = BOX_INNER_WIDTH - INDENT.len();

const NAME_WIDTH: usize = 24;

/// Per-family counts and column blocks, on stderr.
pub fn print_model_summary(model: &CgModel) {
    let mut stderr = io::stderr().lock();
    let config = model.config();
    let topology = model.topology();

    let _ = writeln!(stderr);
    print_kv_table(
        &mut stderr,
        "Model",
        &[
            ("Types", topology.n_types().to_string()),
            ("Sites", topology.n_sites().to_string()),
            ("Basis", format!("{} (k = {})", config.basis, config.bspline_k)),
            ("Cutoff", format!("{:.3}", config.pair_nonbonded_cutoff)),
            ("Columns", model.n_columns().to_string()),
            ("Tabulated", model.n_tabulated().to_string()),
        ],
    );

    let rows: Vec<(&str, String)> = model
        .column_ranges()
        .into_iter()
        .map(|(family, range)| {
            let spec = model.class(family);
            (
                family.full_name(),
                format!(
                    "{} / {} matched  {}",
                    spec.n_matched(),
                    spec.n_defined(),
                    column_span(range.start, range.end)
                ),
            )
        })
        .collect();

    let _ = writeln!(stderr);
    print_kv_table(&mut stderr, "Interaction families", &rows);
    let _ = writeln!(stderr);
}

/// Every defined interaction with its mode, range and global columns.
pub fn print_column_layout(out: &mut impl Write, model: &CgModel) -> io::Result<()> {
    for ((family, range), spec) in model.column_ranges().into_iter().zip(model.classes()) {
        if spec.n_defined() == 0 {
            continue;
        }
        let binning = spec.binning();
        writeln!(
            out,
            "# {}: {}, {}, fm binwidth {}, columns {}",
            family,
            count_noun(spec.n_defined(), "interaction"),
            spec.basis(),
            binning.fm_binwidth,
            column_span(range.start, range.end)
        )?;
        for index in 0..spec.n_defined() {
            print_interaction_row(out, spec, index, range.start)?;
        }
        writeln!(out)?;
    }
    writeln!(out, "# total columns: {}", model.n_columns())
}

fn print_interaction_row(
    out: &mut impl Write,
    spec: &InteractionClassSpec,
    index: usize,
    offset: usize,
) -> io::Result<()> {
    let matched = spec.defined_to_matched()[index] > 0;
    let tabulated = spec.defined_to_tabulated()[index] > 0;
    let mode = match (matched, tabulated) {
        (true, true) => "fm+tab",
        (true, false) => "fm",
        (false, true) => "tab",
        (false, false) => "none",
    };
    let columns = spec
        .column_range(index)
        .map(|r| column_span(r.start + offset, r.end + offset))
        .unwrap_or_else(|| column_span(0, 0));

    writeln!(
        out,
        "{:<name_w$} {:<6} {:>10.4} {:>10.4} {:>12}",
        truncate(&spec.interaction_name(index), NAME_WIDTH),
        mode,
        spec.lower_cutoffs()[index],
        spec.upper_cutoffs()[index],
        columns,
        name_w = NAME_WIDTH
    )
}

pub fn print_written_files(paths: &[PathBuf]) {
    let mut stderr = io::stderr().lock();
    let rows: Vec<(&str, String)> = paths
        .iter()
        .map(|p| {
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
            (name, p.display().to_string())
        })
        .collect();
    let _ = writeln!(stderr);
    print_kv_table(&mut stderr, "Written files", &rows);
    let _ = writeln!(stderr);
}

fn print_kv_table(out: &mut impl Write, title: &str, rows: &[(&str, String)]) {
    let key_w = 20usize;
    let val_w = SAFE_TABLE_WIDTH.saturating_sub(key_w + 6);
    let k_line = "─".repeat(key_w + 2);
    let v_line = "─".repeat(val_w + 2);

    let _ = writeln!(
        out,
        "{}┌─ {} ─┐",
        INDENT,
        truncate(title, SAFE_TABLE_WIDTH - 6)
    );
    let _ = writeln!(out, "{INDENT}┌{k_line}┬{v_line}┐");
    for (key, val) in rows {
        let _ = writeln!(
            out,
            "{}│ {:<key_w$} │ {:>val_w$} │",
            INDENT,
            truncate(key, key_w),
            truncate(val, val_w),
        );
    }
    let _ = writeln!(out, "{INDENT}└{k_line}┴{v_line}┘");
}
