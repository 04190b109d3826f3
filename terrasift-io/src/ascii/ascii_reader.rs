use anyhow::{bail, Context, Result};
use itertools::{EitherOrBoth::*, Itertools};
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use terrasift_core::containers::{PointId, PointSet};
use terrasift_core::layout::PointLayout;

use super::{layout_from_columns, parse_format, ColumnFormat};
use crate::base::PointSetLoader;

/// Reader for delimited text point files. Each non-empty line is one point, the columns are described by
/// a format string of single-character literals (`x`, `y`, `z`, `i`, `r`, `n`, `c`, `u`, `p`, `a`, `t`,
/// and `s` to skip a column). Lines starting with `#` are comments.
///
/// ```
/// # use terrasift_io::ascii::AsciiReader;
/// # use terrasift_core::layout::dimensions;
/// let data = "1.0,2.0,3.0,2\n4.0,5.0,6.0,6\n";
/// let mut reader = AsciiReader::from_read(data.as_bytes(), "xyzc", ",").unwrap();
/// let points = reader.read_all().unwrap();
/// assert_eq!(2, points.len());
/// assert_eq!(6.0, points.get_field(dimensions::CLASSIFICATION.id(), 1));
/// ```
pub struct AsciiReader<R: BufRead> {
    reader: R,
    delimiter: String,
    columns: Vec<ColumnFormat>,
    layout: PointLayout,
}

impl<R: BufRead> AsciiReader<R> {
    pub fn from_read(read: R, format: &str, delimiter: &str) -> Result<Self> {
        let columns = parse_format(format)?;
        let layout = layout_from_columns(&columns);
        Ok(Self {
            reader: read,
            delimiter: delimiter.to_owned(),
            columns,
            layout,
        })
    }

    /// The layout of the points produced by this reader
    pub fn point_layout(&self) -> &PointLayout {
        &self.layout
    }

    /// Reads all remaining lines into a new `PointSet`
    pub fn read_all(&mut self) -> Result<PointSet> {
        let mut points = PointSet::new(self.layout.clone());
        let mut line = String::new();
        let mut line_number = 0;
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                break;
            }
            line_number += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let id = points.push_default();
            self.parse_point(trimmed, &mut points, id)
                .with_context(|| format!("Could not parse point in line {}", line_number))?;
        }
        Ok(points)
    }

    fn parse_point(&self, line: &str, points: &mut PointSet, id: PointId) -> Result<()> {
        let values: Vec<&str> = if self.delimiter.trim().is_empty() {
            line.split_whitespace().collect()
        } else {
            line.split(self.delimiter.as_str()).map(str::trim).collect()
        };
        for pair in values.iter().zip_longest(self.columns.iter()) {
            match pair {
                Both(value_str, ColumnFormat::Dimension(dimension)) => {
                    let value = value_str.parse::<f64>().map_err(|_| {
                        anyhow::anyhow!(
                            "ParseError expected a number for {} found '{}'.",
                            dimension,
                            value_str
                        )
                    })?;
                    if !dimension.datatype().is_floating_point() && value.fract() != 0.0 {
                        bail!(
                            "ParseError expected an integer for {} found '{}'.",
                            dimension,
                            value_str
                        );
                    }
                    points.set_field(dimension.id(), id, value)?;
                }
                Both(_, ColumnFormat::Skip) | Left(_) => {}
                Right(_) => {
                    bail!("Input format string expected more items in the line. Found End-of-Line.")
                }
            }
        }
        Ok(())
    }
}

impl AsciiReader<BufReader<File>> {
    pub fn from_path<P: AsRef<Path>>(path: P, format: &str, delimiter: &str) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Could not open file {}", path.as_ref().display()))?;
        Self::from_read(BufReader::new(file), format, delimiter)
    }
}

/// [`PointSetLoader`] that reads delimited text files, interpreting the name of the set as a file path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiLoader {
    format: String,
    delimiter: String,
}

impl AsciiLoader {
    pub fn new(format: &str, delimiter: &str) -> Self {
        Self {
            format: format.to_owned(),
            delimiter: delimiter.to_owned(),
        }
    }
}

impl Default for AsciiLoader {
    fn default() -> Self {
        Self::new("xyzc", ",")
    }
}

impl PointSetLoader for AsciiLoader {
    fn load(&self, name: &str) -> Result<PointSet> {
        let points = AsciiReader::from_path(name, &self.format, &self.delimiter)?
            .read_all()
            .with_context(|| format!("Could not load point set {}", name))?;
        debug!("Loaded {} points from {}", points.len(), name);
        Ok(points)
    }
}
