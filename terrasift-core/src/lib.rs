#![warn(clippy::all)]

//! Core data structures for terrasift filters
//!
//! terrasift-core provides the in-memory point set that the classification filters operate on, the
//! [layout](crate::layout::PointLayout) that names and types its dimensions, and the
//! [domain ranges](crate::domain::DomainRange) used to select points by value.

pub extern crate nalgebra;

/// Point containers
pub mod containers;
/// Value-range selection of points
pub mod domain;
/// Errors shared by all filters
pub mod error;
/// Defines dimensions and the layout of point data
pub mod layout;
/// Useful mathematical tools when working with point cloud data
pub mod math;
