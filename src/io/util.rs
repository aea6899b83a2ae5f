use super::{Format, error::Error};
use std::io::BufRead;
use std::str::FromStr;

/// Numbered lines of a text file with a cursor over its data lines.
///
/// Blank lines and lines starting with `#` are skipped.
#[derive(Debug, Clone)]
pub(crate) struct DataLines {
    format: Format,
    lines: Vec<(usize, String)>,
    cursor: usize,
}

impl DataLines {
    pub fn read<R: BufRead>(reader: R, format: Format) -> Result<Self, Error> {
        Ok(Self {
            format,
            lines: collect_lines(reader)?,
            cursor: 0,
        })
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn next_data_line(&mut self) -> Option<(usize, String)> {
        next_data_line(&self.lines, &mut self.cursor)
    }

    /// Next data line, or a parse error naming `expected` at end of input.
    pub fn require(&mut self, expected: &str) -> Result<(usize, String), Error> {
        let end = self.lines.last().map_or(1, |(ln, _)| ln + 1);
        self.next_data_line().ok_or_else(|| {
            Error::parse(
                self.format,
                end,
                format!("unexpected end of input, expected {expected}"),
            )
        })
    }

    /// Whether any data lines remain.
    pub fn is_exhausted(&self) -> bool {
        let mut lookahead = self.cursor;
        next_data_line(&self.lines, &mut lookahead).is_none()
    }
}

fn collect_lines<R: BufRead>(reader: R) -> Result<Vec<(usize, String)>, Error> {
    reader
        .lines()
        .enumerate()
        .map(|(i, line)| {
            line.map(|v| (i + 1, v))
                .map_err(|e| Error::Io { source: e })
        })
        .collect()
}

fn next_data_line(lines: &[(usize, String)], cursor: &mut usize) -> Option<(usize, String)> {
    while *cursor < lines.len() {
        let (ln, content) = &lines[*cursor];
        *cursor += 1;
        let trimmed = content.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        return Some((*ln, content.clone()));
    }
    None
}

pub(crate) fn parse_field<T: FromStr>(
    token: &str,
    what: &str,
    format: Format,
    line: usize,
) -> Result<T, Error> {
    token
        .parse::<T>()
        .map_err(|_| Error::parse(format, line, format!("invalid {what} '{token}'")))
}
