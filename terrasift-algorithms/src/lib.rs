#![warn(clippy::all)]
//! Filters that reclassify points using their spatial neighborhood.
//!
//! terrasift-algorithms contains the progressive morphological ground filter (`filters.pmf`), the KNN
//! majority vote filter (`filters.knnassign`) and the building blocks they share.

// Registry of all filters behind a common trait.
pub mod filter;
// Reassigns a dimension (usually Classification) by majority vote of the k nearest neighbors.
pub mod knn_assign;
// Grayscale erosion, dilation and opening of rasters with a diamond structuring element.
pub mod morphology;
// Ground classification with the Progressive Morphological Filter (Zhang et al., 2003).
pub mod pmf;
// Minimum-elevation rasters over the XY extent of a point set.
pub mod raster;
// Splitting of point sets by domain range and by return number.
pub mod segmentation;
// kd-tree backed k-nearest-neighbor search in 2D and 3D.
pub mod spatial_index;
