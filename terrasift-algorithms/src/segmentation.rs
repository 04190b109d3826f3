use anyhow::{bail, Result};
use terrasift_core::{
    containers::PointSet,
    domain::DomainRange,
    layout::dimensions,
};

/// Splits `points` into the points that match `ignore` and all remaining points, both in their original
/// order. Without an `ignore` range, the first set is empty and the second one holds all points.
///
/// `ignore` must have been resolved against the layout of `points`.
pub fn split_ignored(points: &PointSet, ignore: Option<&DomainRange>) -> Result<(PointSet, PointSet)> {
    let ignore = match ignore {
        Some(ignore) => ignore,
        None => return Ok((points.make_empty_like(), points.clone())),
    };
    let mut ignored = points.make_empty_like();
    let mut kept = points.make_empty_like();
    for id in 0..points.len() {
        if ignore.point_passes(points, id)? {
            ignored.push_point_from(points, id);
        } else {
            kept.push_point_from(points, id);
        }
    }
    Ok((ignored, kept))
}

/// Splits `points` into last returns (`ReturnNumber == NumberOfReturns`) and all other points, both in
/// their original order. Returns `(last, non_last)`. Fails if either return dimension is missing.
pub fn split_last_returns(points: &PointSet) -> Result<(PointSet, PointSet)> {
    let return_number = dimensions::RETURN_NUMBER.id();
    let number_of_returns = dimensions::NUMBER_OF_RETURNS.id();
    if !points.layout().has_dim(return_number) || !points.layout().has_dim(number_of_returns) {
        bail!("Can't split last returns: point layout has no ReturnNumber or NumberOfReturns dimension");
    }
    let mut last = points.make_empty_like();
    let mut non_last = points.make_empty_like();
    for id in 0..points.len() {
        if points.get_field(return_number, id) == points.get_field(number_of_returns, id) {
            last.push_point_from(points, id);
        } else {
            non_last.push_point_from(points, id);
        }
    }
    Ok((last, non_last))
}
