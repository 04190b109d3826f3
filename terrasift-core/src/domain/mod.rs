//! Textual value-range selectors over a single dimension, e.g. `Classification[2:2]`,
//! `Z(,100]` or `Intensity>=300<1000`.
//!
//! A range is written as a dimension name followed by one or more constraints, all of which must hold
//! for a value to pass:
//!
//! | constraint | meaning |
//! |---|---|
//! | `[a:b]`, `[a,b]` | `a <= v <= b`, `(` / `)` make the respective bound exclusive |
//! | `[a:]`, `(:b)` | a missing bound is unbounded |
//! | `[a]` | `v == a` |
//! | `![a:b]` | `v` is *not* in the interval |
//! | `<a`, `<=a`, `>a`, `>=a`, `==a`, `!=a` | comparison against `a` |
//!
//! ```
//! # use terrasift_core::domain::DomainRange;
//! # use terrasift_core::layout::PointLayout;
//! let mut range: DomainRange = "Classification[5,6)".parse().unwrap();
//! range.resolve(&PointLayout::xyz_classification()).unwrap();
//! assert!(range.value_passes(5.0));
//! assert!(!range.value_passes(6.0));
//! ```

use std::{
    fmt::Display,
    ops::{Bound, RangeBounds},
    str::FromStr,
};

use anyhow::{anyhow, Result};

use crate::{
    containers::{PointId, PointSet},
    layout::{DimensionId, PointLayout},
};

mod parser;

/// Error that describes why a domain range text could not be parsed
#[derive(Debug, Clone, PartialEq)]
pub struct DomainParseError {
    text: String,
    position: usize,
    reason: String,
}

impl DomainParseError {
    /// The complete text that failed to parse
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Byte offset into [`text`](Self::text) at which parsing failed
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Display for DomainParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}': {} (at offset {})",
            self.text, self.reason, self.position
        )
    }
}

impl std::error::Error for DomainParseError {}

/// Comparison operators that can be used as a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Comparison {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
}

/// A single constraint of a [`DomainRange`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Constraint {
    Interval {
        lower: Bound<f64>,
        upper: Bound<f64>,
        negated: bool,
    },
    Compare {
        comparison: Comparison,
        value: f64,
    },
}

impl Constraint {
    pub fn passes(&self, value: f64) -> bool {
        match *self {
            Constraint::Interval {
                lower,
                upper,
                negated,
            } => (lower, upper).contains(&value) != negated,
            Constraint::Compare { comparison, value: rhs } => match comparison {
                Comparison::Less => value < rhs,
                Comparison::LessOrEqual => value <= rhs,
                Comparison::Greater => value > rhs,
                Comparison::GreaterOrEqual => value >= rhs,
                Comparison::Equal => value == rhs,
                Comparison::NotEqual => value != rhs,
            },
        }
    }
}

/// A dimension together with a set of constraints on its values. A freshly parsed range only knows the
/// name of its dimension; it has to be [resolved](DomainRange::resolve) against a concrete
/// [`PointLayout`] before it can be evaluated against points.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainRange {
    text: String,
    name: String,
    id: Option<DimensionId>,
    constraints: Vec<Constraint>,
}

impl DomainRange {
    /// Parses a range from its textual form
    pub fn parse(text: &str) -> Result<Self, DomainParseError> {
        let (name, constraints) = parser::parse(text)?;
        Ok(Self {
            text: text.to_owned(),
            name,
            id: None,
            constraints,
        })
    }

    /// The text this range was parsed from
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Name of the dimension this range selects on
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved dimension, `None` until [`resolve`](Self::resolve) succeeded
    pub fn id(&self) -> Option<DimensionId> {
        self.id
    }

    /// Binds the dimension name of this range to its identifier in `layout`. Returns `None` if the
    /// layout has no dimension with this name, in which case the range stays unresolved.
    pub fn resolve(&mut self, layout: &PointLayout) -> Option<DimensionId> {
        self.id = layout.find_dim(&self.name);
        self.id
    }

    /// Does `value` satisfy all constraints of this range?
    pub fn value_passes(&self, value: f64) -> bool {
        self.constraints
            .iter()
            .all(|constraint| constraint.passes(value))
    }

    /// Evaluates this range against the value of point `id` in `points`. Fails if the range has not been
    /// resolved yet.
    pub fn point_passes(&self, points: &PointSet, id: PointId) -> Result<bool> {
        let dim = self
            .id
            .ok_or_else(|| anyhow!("Domain range '{}' was used before being resolved", self.text))?;
        Ok(self.value_passes(points.get_field(dim, id)))
    }
}

impl FromStr for DomainRange {
    type Err = DomainParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for DomainRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Sorts `ranges` by their resolved dimension. The sort is stable, so ranges on the same dimension keep
/// their configured order. Unresolved ranges go last.
pub fn sort_ranges(ranges: &mut [DomainRange]) {
    ranges.sort_by_key(|range| (range.id.is_none(), range.id));
}
