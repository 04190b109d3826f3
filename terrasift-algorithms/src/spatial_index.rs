use anyhow::{bail, Result};
use float_ord::FloatOrd;
use kd_tree::{KdPoint, KdTree};
use terrasift_core::{
    containers::{PointId, PointSet},
    layout::{dimensions, DimensionDefinition},
};

macro_rules! spatial_index {
    ($(#[$doc:meta])* $index:ident, $point:ident, $dim:ty, $n:expr, [$($axis:expr),+]) => {
        /// Coordinates of a single indexed point together with its identifier
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub struct $point {
            coordinates: [f64; $n],
            id: PointId,
        }

        impl KdPoint for $point {
            type Scalar = f64;
            type Dim = $dim;
            fn at(&self, k: usize) -> f64 {
                self.coordinates[k]
            }
        }

        $(#[$doc])*
        pub struct $index {
            tree: Option<KdTree<$point>>,
            len: usize,
        }

        impl $index {
            /// Builds the index over the coordinates of all points in `points`. Fails if the layout of
            /// `points` lacks one of the coordinate dimensions.
            pub fn build(points: &PointSet) -> Result<Self> {
                let axes: [&DimensionDefinition; $n] = [$(&$axis),+];
                for axis in axes.iter() {
                    if !points.layout().has_dim(axis.id()) {
                        bail!(
                            "Can't build a {}D spatial index: dimension {} is missing from the point layout",
                            $n,
                            axis.name()
                        );
                    }
                }
                Ok(Self::from_coordinates((0..points.len()).map(|id| {
                    let mut coordinates = [0.0; $n];
                    for (coordinate, axis) in coordinates.iter_mut().zip(axes.iter()) {
                        *coordinate = points.get_field(axis.id(), id);
                    }
                    coordinates
                })))
            }

            /// Builds the index over arbitrary coordinates. The identifier of each coordinate is its
            /// position in `coordinates`.
            pub fn from_coordinates<I: IntoIterator<Item = [f64; $n]>>(coordinates: I) -> Self {
                let points = coordinates
                    .into_iter()
                    .enumerate()
                    .map(|(id, coordinates)| $point { coordinates, id })
                    .collect::<Vec<_>>();
                let len = points.len();
                let tree = if points.is_empty() {
                    None
                } else {
                    Some(KdTree::build_by_ordered_float(points))
                };
                Self { tree, len }
            }

            pub fn len(&self) -> usize {
                self.len
            }

            pub fn is_empty(&self) -> bool {
                self.len == 0
            }

            /// Returns the identifiers of the `min(k, len)` points closest to `coordinates`, ordered by
            /// ascending Euclidean distance. If `coordinates` belong to an indexed point, that point is
            /// part of the result (at distance zero).
            pub fn k_nearest(&self, coordinates: [f64; $n], k: usize) -> Vec<PointId> {
                self.k_nearest_with_distances(coordinates, k)
                    .into_iter()
                    .map(|(id, _)| id)
                    .collect()
            }

            /// Like [`k_nearest`](Self::k_nearest), but also returns the Euclidean distance of each
            /// neighbor
            pub fn k_nearest_with_distances(
                &self,
                coordinates: [f64; $n],
                k: usize,
            ) -> Vec<(PointId, f64)> {
                let tree = match &self.tree {
                    Some(tree) if k > 0 => tree,
                    _ => return vec![],
                };
                let query = $point {
                    coordinates,
                    id: PointId::MAX,
                };
                let mut neighbors = tree.nearests(&query, k.min(self.len));
                neighbors.sort_by_key(|neighbor| FloatOrd(neighbor.squared_distance));
                neighbors
                    .into_iter()
                    .map(|neighbor| (neighbor.item.id, neighbor.squared_distance.sqrt()))
                    .collect()
            }

            /// Returns the identifier of the point closest to `coordinates`, or `None` if the index is empty
            pub fn nearest(&self, coordinates: [f64; $n]) -> Option<PointId> {
                let query = $point {
                    coordinates,
                    id: PointId::MAX,
                };
                self.tree
                    .as_ref()
                    .and_then(|tree| tree.nearest(&query))
                    .map(|neighbor| neighbor.item.id)
            }
        }
    };
}

spatial_index!(
    /// Nearest-neighbor index over the X and Y coordinates of a point set. The index is built once and
    /// is immutable afterwards, so it can be queried concurrently.
    SpatialIndex2D,
    IndexedPoint2D,
    typenum::U2,
    2,
    [dimensions::X, dimensions::Y]
);

spatial_index!(
    /// Nearest-neighbor index over the X, Y and Z coordinates of a point set. The index is built once and
    /// is immutable afterwards, so it can be queried concurrently.
    SpatialIndex3D,
    IndexedPoint3D,
    typenum::U3,
    3,
    [dimensions::X, dimensions::Y, dimensions::Z]
);

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use terrasift_core::layout::PointLayout;

    fn random_points(count: usize, seed: u64) -> PointSet {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut points = PointSet::with_len(PointLayout::xyz_classification(), count);
        for id in 0..count {
            for axis in [dimensions::X, dimensions::Y, dimensions::Z].iter() {
                points
                    .set_field(axis.id(), id, rng.gen_range(-50.0..50.0))
                    .unwrap();
            }
        }
        points
    }

    fn brute_force_distances(points: &PointSet, query: [f64; 3], k: usize) -> Vec<f64> {
        let mut distances = (0..points.len())
            .map(|id| {
                let dx = points.get_field(dimensions::X.id(), id) - query[0];
                let dy = points.get_field(dimensions::Y.id(), id) - query[1];
                let dz = points.get_field(dimensions::Z.id(), id) - query[2];
                (dx * dx + dy * dy + dz * dz).sqrt()
            })
            .collect::<Vec<_>>();
        distances.sort_by_key(|distance| FloatOrd(*distance));
        distances.truncate(k);
        distances
    }

    #[test]
    fn test_k_nearest_matches_brute_force() {
        let points = random_points(500, 42);
        let index = SpatialIndex3D::build(&points).unwrap();
        let mut rng = StdRng::seed_from_u64(43);
        for _ in 0..50 {
            let query = [
                rng.gen_range(-60.0..60.0),
                rng.gen_range(-60.0..60.0),
                rng.gen_range(-60.0..60.0),
            ];
            let expected = brute_force_distances(&points, query, 8);
            let actual = index.k_nearest_with_distances(query, 8);
            assert_eq!(expected.len(), actual.len());
            for (expected, (_, actual)) in expected.iter().zip(actual.iter()) {
                assert_approx_eq!(*expected, *actual, 1e-9);
            }
        }
    }

    #[test]
    fn test_query_point_is_its_own_nearest_neighbor() {
        let points = random_points(100, 1);
        let index = SpatialIndex3D::build(&points).unwrap();
        for id in 0..points.len() {
            let query = [
                points.get_field(dimensions::X.id(), id),
                points.get_field(dimensions::Y.id(), id),
                points.get_field(dimensions::Z.id(), id),
            ];
            assert_eq!(id, index.k_nearest(query, 3)[0]);
        }
    }

    #[test]
    fn test_k_larger_than_point_count() {
        let points = random_points(5, 2);
        let index = SpatialIndex3D::build(&points).unwrap();
        let mut neighbors = index.k_nearest([0.0, 0.0, 0.0], 20);
        neighbors.sort_unstable();
        assert_eq!(vec![0, 1, 2, 3, 4], neighbors);
        assert!(index.k_nearest([0.0, 0.0, 0.0], 0).is_empty());
    }

    #[test]
    fn test_empty_index_is_usable() {
        let points = random_points(0, 3);
        let index = SpatialIndex2D::build(&points).unwrap();
        assert!(index.is_empty());
        assert!(index.k_nearest([1.0, 2.0], 4).is_empty());
        assert_eq!(None, index.nearest([1.0, 2.0]));
    }

    #[test]
    fn test_2d_index_ignores_elevation() {
        let index = SpatialIndex2D::from_coordinates(vec![[0.0, 0.0], [10.0, 0.0], [0.0, 3.0]]);
        assert_eq!(Some(2), index.nearest([0.0, 2.0]));
        assert_eq!(vec![1, 2, 0], index.k_nearest([9.0, 4.0], 3));
    }

    #[test]
    fn test_build_requires_coordinates() {
        let points = PointSet::with_len(
            PointLayout::from_dimensions(&[&dimensions::X, &dimensions::Y]),
            3,
        );
        assert!(SpatialIndex2D::build(&points).is_ok());
        assert!(SpatialIndex3D::build(&points).is_err());
    }
}
