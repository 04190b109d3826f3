use anyhow::{bail, Result};
use terrasift_core::layout::{dimensions, DimensionDefinition, PointLayout};

/// One column of a delimited text file, as described by a single format literal
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColumnFormat {
    Skip,
    Dimension(DimensionDefinition),
}

// Format literals follow LAStools:
// s - skip this column
// x, y, z - coordinates
// i - intensity
// r - return number
// n - number of returns of the pulse
// c - classification
// u - user data
// p - point source ID
// a - scan angle rank
// t - gps time
pub(crate) fn parse_format(format: &str) -> Result<Vec<ColumnFormat>> {
    let mut columns = Vec::with_capacity(format.len());
    for literal in format.chars() {
        let dimension = match literal {
            's' => {
                columns.push(ColumnFormat::Skip);
                continue;
            }
            'x' => dimensions::X,
            'y' => dimensions::Y,
            'z' => dimensions::Z,
            'i' => dimensions::INTENSITY,
            'r' => dimensions::RETURN_NUMBER,
            'n' => dimensions::NUMBER_OF_RETURNS,
            'c' => dimensions::CLASSIFICATION,
            'u' => dimensions::USER_DATA,
            'p' => dimensions::POINT_SOURCE_ID,
            'a' => dimensions::SCAN_ANGLE_RANK,
            't' => dimensions::GPS_TIME,
            _ => bail!(
                "FormatError can't interpret format literal '{}' in format string '{}'.",
                literal,
                format
            ),
        };
        if columns
            .iter()
            .any(|column| *column == ColumnFormat::Dimension(dimension.clone()))
        {
            bail!(
                "FormatError format literal '{}' appears more than once in format string '{}'.",
                literal,
                format
            );
        }
        columns.push(ColumnFormat::Dimension(dimension));
    }
    Ok(columns)
}

/// The layout of the points described by the given columns, in column order
pub(crate) fn layout_from_columns(columns: &[ColumnFormat]) -> PointLayout {
    let mut layout = PointLayout::new();
    for column in columns {
        if let ColumnFormat::Dimension(dimension) = column {
            layout.register_dim(dimension);
        }
    }
    layout
}
