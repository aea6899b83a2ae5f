//! Reader for externally tabulated force splines.
//!
//! The file holds one section per interaction class:
//!
//! ```text
//! short_range 1 0.5
//! A B
//! 1.0 2.0
//! 4.0
//! 2.0
//! 0.0
//! ```
//!
//! A header `<table-name> <count> <binwidth>` is followed by `count` blocks.
//! Each block is a type line, a `lower upper` line and one control-point
//! value per line, `floor((upper − lower)/binwidth + 0.5) + 1` of them.

use super::{Format, error::Error, util::DataLines, util::parse_field};
use crate::basis::TabulatedForce;
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq)]
pub struct TableHeader {
    pub line: usize,
    pub name: String,
    pub count: usize,
    pub binwidth: f64,
}

/// One tabulated interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBlock {
    /// Line of the type tuple.
    pub line: usize,
    pub names: Vec<String>,
    pub force: TabulatedForce,
}

#[derive(Debug, Clone)]
pub struct TableReader {
    lines: DataLines,
}

impl TableReader {
    pub fn new<R: BufRead>(reader: R) -> Result<Self, Error> {
        Ok(Self {
            lines: DataLines::read(reader, Format::Table)?,
        })
    }

    pub fn next_header(&mut self) -> Result<TableHeader, Error> {
        let (line, content) = self.lines.require("a table header")?;
        let tokens: Vec<&str> = content.split_whitespace().collect();
        if tokens.len() < 3 {
            return Err(Error::parse(
                Format::Table,
                line,
                "table header must be '<name> <count> <binwidth>'",
            ));
        }
        let count = parse_field(tokens[1], "table count", Format::Table, line)?;
        let binwidth: f64 = parse_field(tokens[2], "table binwidth", Format::Table, line)?;
        if binwidth <= 0.0 {
            return Err(Error::parse(
                Format::Table,
                line,
                format!("table binwidth must be positive, got {binwidth}"),
            ));
        }
        Ok(TableHeader {
            line,
            name: tokens[0].to_string(),
            count,
            binwidth,
        })
    }

    /// Reads one block of an `n_body` interaction on a grid of `binwidth`.
    pub fn next_block(&mut self, n_body: usize, binwidth: f64) -> Result<TableBlock, Error> {
        let (line, content) = self.lines.require("a tabulated interaction's types")?;
        let names: Vec<String> = content
            .split_whitespace()
            .take(n_body)
            .map(str::to_string)
            .collect();
        if names.len() != n_body {
            return Err(Error::parse(
                Format::Table,
                line,
                format!("expected {n_body} types, found {}", names.len()),
            ));
        }

        let (range_line, range) = self.lines.require("a 'lower upper' line")?;
        let bounds: Vec<&str> = range.split_whitespace().collect();
        if bounds.len() < 2 {
            return Err(Error::parse(
                Format::Table,
                range_line,
                "expected 'lower upper'",
            ));
        }
        let lower: f64 = parse_field(bounds[0], "lower cutoff", Format::Table, range_line)?;
        let upper: f64 = parse_field(bounds[1], "upper cutoff", Format::Table, range_line)?;
        if upper < lower {
            return Err(Error::parse(
                Format::Table,
                range_line,
                format!("upper cutoff {upper} is below lower cutoff {lower}"),
            ));
        }

        let n_points = TabulatedForce::control_point_count(lower, upper, binwidth);
        let mut values = Vec::with_capacity(n_points);
        for _ in 0..n_points {
            let (value_line, value) = self.lines.require("a control-point value")?;
            let token = value.split_whitespace().next().unwrap_or_default();
            values.push(parse_field(token, "control-point value", Format::Table, value_line)?);
        }

        Ok(TableBlock {
            line,
            names,
            force: TabulatedForce {
                lower,
                upper,
                binwidth,
                values,
            },
        })
    }
}
