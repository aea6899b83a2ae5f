//! Reader for interaction range specifications.
//!
//! Each data line names the interaction's types (or density groups) followed
//! by `lower upper mode` and, for density interactions, optional extra
//! numeric columns:
//!
//! ```text
//! # types   lower  upper  mode
//! CG1 CG2   0.0    10.0   fm
//! CG1 CG1   2.0    12.0   fm+tab
//! ```

use super::{Format, error::Error, util::DataLines, util::parse_field};
use crate::model::types::InteractionMode;
use std::io::BufRead;

/// One parsed range line.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeRecord {
    pub line: usize,
    pub names: Vec<String>,
    pub lower: f64,
    pub upper: f64,
    pub mode: InteractionMode,
    /// Numeric columns after the mode keyword.
    pub extra: Vec<f64>,
}

/// Sequential reader handing out one [`RangeRecord`] per defined interaction.
#[derive(Debug, Clone)]
pub struct RangeReader {
    lines: DataLines,
}

impl RangeReader {
    pub fn new<R: BufRead>(reader: R) -> Result<Self, Error> {
        Ok(Self {
            lines: DataLines::read(reader, Format::Range)?,
        })
    }

    /// Reads the next record with `n_body` leading names.
    pub fn next_record(&mut self, n_body: usize) -> Result<RangeRecord, Error> {
        let (line, content) = self
            .lines
            .require(&format!("a range line for a {n_body}-body interaction"))?;
        parse_record(&content, line, n_body)
    }

    /// Whether every data line has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.lines.is_exhausted()
    }
}

fn parse_record(content: &str, line: usize, n_body: usize) -> Result<RangeRecord, Error> {
    let tokens: Vec<&str> = content.split_whitespace().collect();
    if tokens.len() < n_body + 3 {
        return Err(Error::parse(
            Format::Range,
            line,
            format!(
                "expected {n_body} names followed by 'lower upper mode', found {} fields",
                tokens.len()
            ),
        ));
    }

    let names = tokens[..n_body].iter().map(|s| s.to_string()).collect();
    let lower: f64 = parse_field(tokens[n_body], "lower cutoff", Format::Range, line)?;
    let upper: f64 = parse_field(tokens[n_body + 1], "upper cutoff", Format::Range, line)?;
    let mode = tokens[n_body + 2]
        .parse::<InteractionMode>()
        .map_err(|e| Error::parse(Format::Range, line, e.to_string()))?;
    let extra = tokens[n_body + 3..]
        .iter()
        .map(|t| parse_field::<f64>(t, "parameter", Format::Range, line))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RangeRecord {
        line,
        names,
        lower,
        upper,
        mode,
        extra,
    })
}
