//! Reader for solution vectors: whitespace-separated coefficients, one global
//! column after another, spread over any number of lines.

use super::{Format, error::Error, util::DataLines, util::parse_field};
use std::io::BufRead;

pub fn read<R: BufRead>(reader: R) -> Result<Vec<f64>, Error> {
    let mut lines = DataLines::read(reader, Format::Solution)?;
    let mut values = Vec::new();
    while let Some((line, content)) = lines.next_data_line() {
        for token in content.split_whitespace() {
            values.push(parse_field(token, "coefficient", Format::Solution, line)?);
        }
    }
    Ok(values)
}

/// Reads a solution and checks it has exactly `n_columns` entries.
pub fn read_exact<R: BufRead>(reader: R, n_columns: usize) -> Result<Vec<f64>, Error> {
    let values = read(reader)?;
    if values.len() != n_columns {
        return Err(Error::parse(
            Format::Solution,
            1,
            format!(
                "solution has {} coefficients but the model has {n_columns} columns",
                values.len()
            ),
        ));
    }
    Ok(values)
}
