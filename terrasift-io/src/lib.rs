#![warn(clippy::all)]
//! I/O for terrasift. Point formats are not the business of terrasift, this crate only provides what the
//! filters need to pull in a reference point set: the [`PointSetLoader`](base::PointSetLoader) capability
//! and a delimited-text implementation of it.

pub mod ascii;
pub mod base;
