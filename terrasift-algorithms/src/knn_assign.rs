use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Context, Result};
use float_ord::FloatOrd;
use log::debug;
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::Value;
use terrasift_core::{
    containers::{PointId, PointSet},
    domain::{sort_ranges, DomainRange},
    error::ConfigurationError,
    layout::{dimensions, DimensionId, PointLayout},
};
use terrasift_io::{ascii::AsciiLoader, base::PointSetLoader};

use crate::{
    filter::{options_from_json, Filter},
    spatial_index::SpatialIndex3D,
};

/// Options of the [`KnnAssignFilter`]. `k` is required, all other fields take their default values when
/// deserializing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KnnAssignOptions {
    /// Only points that pass at least one of these domain ranges are reclassified. An empty list selects
    /// all points.
    pub domain: Vec<String>,
    /// Number of neighbors that vote
    pub k: Option<usize>,
    /// Name of the reference point set whose values are voted on. If empty, the points being classified
    /// are their own reference.
    pub candidate: String,
    /// The dimension that is voted on and overwritten
    pub dimension: String,
    /// Column format of the candidate file
    pub candidate_format: String,
    /// Column delimiter of the candidate file
    pub candidate_delimiter: String,
}

impl Default for KnnAssignOptions {
    fn default() -> Self {
        Self {
            domain: vec![],
            k: None,
            candidate: String::new(),
            dimension: dimensions::CLASSIFICATION.name().to_owned(),
            candidate_format: "xyzc".to_owned(),
            candidate_delimiter: ",".to_owned(),
        }
    }
}

/// Reference points that vote, together with their spatial index
struct Reference {
    points: PointSet,
    dimension: DimensionId,
    index: SpatialIndex3D,
}

impl Reference {
    fn new(points: PointSet, dimension_name: &str) -> Result<Self> {
        let dimension = points.layout().find_dim(dimension_name).ok_or_else(|| {
            anyhow!(
                "Reference points have no dimension named '{}' (layout is {})",
                dimension_name,
                points.layout()
            )
        })?;
        let index = SpatialIndex3D::build(&points)?;
        Ok(Self {
            points,
            dimension,
            index,
        })
    }

    /// Value of the voting dimension that holds a strict majority among the `k` reference points closest
    /// to `position`. Ties between equally frequent values are broken by the smaller value.
    fn majority(&self, position: [f64; 3], k: usize) -> Option<f64> {
        let neighbors = self.index.k_nearest(position, k);
        let mut counts: BTreeMap<FloatOrd<f64>, usize> = BTreeMap::new();
        for neighbor in &neighbors {
            *counts
                .entry(FloatOrd(self.points.get_field(self.dimension, *neighbor)))
                .or_insert(0) += 1;
        }
        let (value, count) = counts.into_iter().fold(None, |best, (value, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((value, count)),
        })?;
        if count > neighbors.len() / 2 {
            Some(value.0)
        } else {
            None
        }
    }
}

fn position(points: &PointSet, id: PointId) -> [f64; 3] {
    [
        points.get_field(dimensions::X.id(), id),
        points.get_field(dimensions::Y.id(), id),
        points.get_field(dimensions::Z.id(), id),
    ]
}

/// Reclassifies points by a majority vote of their `k` nearest neighbors.
///
/// For every point that passes the domain, the values of the voting dimension (Classification by
/// default) of its `k` nearest neighbors in the reference set are counted. If one value is held by more
/// than half of the neighbors and differs from the current value of the point, the point takes that
/// value. The reference set is either an external candidate set, loaded once through a
/// [`PointSetLoader`], or the points themselves as they were before the filter ran. A point is its own
/// neighbor in the latter case.
///
/// Without a candidate set, every vote reads the values from before the run. Unlike in-place sequential
/// voting, a point that was reassigned earlier in the same run still votes with its old value, so the
/// result does not depend on the order in which points are visited.
pub struct KnnAssignFilter {
    options: KnnAssignOptions,
    k: usize,
    domain: Vec<DomainRange>,
    dimension: Option<DimensionId>,
    loader: Box<dyn PointSetLoader>,
    candidate: Option<Reference>,
}

impl KnnAssignFilter {
    pub const NAME: &'static str = "filters.knnassign";

    /// Creates a new filter, validating `options`. Candidate files are read as delimited text.
    pub fn new(options: KnnAssignOptions) -> Result<Self> {
        let k = match options.k {
            None => {
                return Err(ConfigurationError::MissingOption { option: "k".into() }.into());
            }
            Some(0) => {
                return Err(ConfigurationError::invalid_option("k", "k must be at least 1").into());
            }
            Some(k) => k,
        };
        let domain = options
            .domain
            .iter()
            .map(|text| {
                DomainRange::parse(text).map_err(|source| ConfigurationError::InvalidDomain {
                    option: "domain".into(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let loader = AsciiLoader::new(&options.candidate_format, &options.candidate_delimiter);
        Ok(Self {
            options,
            k,
            domain,
            dimension: None,
            loader: Box::new(loader),
            candidate: None,
        })
    }

    /// Creates a new filter from JSON options, e.g. `{"k": 8, "domain": ["Classification[1:1]"]}`
    pub fn from_json(options: &Value) -> Result<Self> {
        Self::new(options_from_json(Self::NAME, options)?)
    }

    /// Replaces the loader that reads the candidate set
    pub fn with_loader<L: PointSetLoader + 'static>(mut self, loader: L) -> Self {
        self.loader = Box::new(loader);
        self.candidate = None;
        self
    }

    pub fn options(&self) -> &KnnAssignOptions {
        &self.options
    }

    /// The domain ranges of this filter, sorted by dimension after [`prepare`](Filter::prepare)
    pub fn domain(&self) -> &[DomainRange] {
        &self.domain
    }

    fn is_eligible(&self, points: &PointSet, id: PointId) -> Result<bool> {
        if self.domain.is_empty() {
            return Ok(true);
        }
        // Ranges are checked in sorted order and the first passing range decides
        for range in &self.domain {
            if range.point_passes(points, id)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn load_candidate(&mut self) -> Result<()> {
        if self.candidate.is_some() || self.options.candidate.is_empty() {
            return Ok(());
        }
        let points = self
            .loader
            .load(&self.options.candidate)
            .with_context(|| format!("{} could not load candidate points", Self::NAME))?;
        debug!(
            "{} loaded {} candidate points from {}",
            Self::NAME,
            points.len(),
            self.options.candidate
        );
        self.candidate = Some(Reference::new(points, &self.options.dimension)?);
        Ok(())
    }

    fn assign(&self, points: &mut PointSet, dimension: DimensionId, reference: &Reference) -> Result<()> {
        let votes = (0..points.len())
            .into_par_iter()
            .map(|id| -> Result<Option<f64>> {
                if !self.is_eligible(points, id)? {
                    return Ok(None);
                }
                Ok(reference
                    .majority(position(points, id), self.k)
                    .filter(|value| *value != points.get_field(dimension, id)))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut reassigned = 0;
        for (id, vote) in votes.into_iter().enumerate() {
            if let Some(value) = vote {
                points.set_field(dimension, id, value)?;
                reassigned += 1;
            }
        }
        debug!("{} reassigned {} of {} points", Self::NAME, reassigned, points.len());
        Ok(())
    }
}

impl Filter for KnnAssignFilter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn declare_dimensions(&self, _layout: &mut PointLayout) {}

    fn prepare(&mut self, layout: &PointLayout) -> Result<()> {
        for range in &mut self.domain {
            if range.resolve(layout).is_none() {
                return Err(ConfigurationError::unknown_dimension("domain", range.name()).into());
            }
        }
        sort_ranges(&mut self.domain);
        let dimension = layout.find_dim(&self.options.dimension).ok_or_else(|| {
            ConfigurationError::unknown_dimension("dimension", &self.options.dimension)
        })?;
        for axis in [dimensions::X, dimensions::Y, dimensions::Z] {
            if !layout.has_dim(axis.id()) {
                bail!(
                    "{} requires dimension {} but the point layout is {}",
                    Self::NAME,
                    axis.name(),
                    layout
                );
            }
        }
        self.dimension = Some(dimension);
        Ok(())
    }

    fn run(&mut self, mut input: PointSet) -> Result<Vec<PointSet>> {
        let dimension = self
            .dimension
            .ok_or_else(|| anyhow!("{} was run before being prepared", Self::NAME))?;
        self.load_candidate()?;
        match &self.candidate {
            Some(candidate) => self.assign(&mut input, dimension, candidate)?,
            None => {
                // Votes must not see reassignments of this run
                let snapshot = Reference::new(input.clone(), &self.options.dimension)?;
                self.assign(&mut input, dimension, &snapshot)?;
            }
        }
        Ok(vec![input])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrasift_core::layout::PointLayout;

    fn reference(classes: &[f64]) -> Reference {
        let mut points = PointSet::with_len(PointLayout::xyz_classification(), classes.len());
        for (id, class) in classes.iter().enumerate() {
            points.set_field(dimensions::X.id(), id, id as f64).unwrap();
            points
                .set_field(dimensions::CLASSIFICATION.id(), id, *class)
                .unwrap();
        }
        Reference::new(points, "Classification").unwrap()
    }

    #[test]
    fn test_majority_requires_more_than_half() {
        let tie = reference(&[2.0, 2.0, 5.0, 5.0]);
        assert_eq!(None, tie.majority([1.5, 0.0, 0.0], 4));

        let majority = reference(&[2.0, 5.0, 5.0, 5.0, 2.0]);
        assert_eq!(Some(5.0), majority.majority([2.0, 0.0, 0.0], 5));
        assert_eq!(Some(5.0), majority.majority([2.0, 0.0, 0.0], 3));
    }

    #[test]
    fn test_majority_counts_returned_neighbors() {
        let small = reference(&[6.0, 6.0]);
        assert_eq!(Some(6.0), small.majority([0.0, 0.0, 0.0], 10));
    }

    #[test]
    fn test_majority_with_single_neighbor() {
        let points = reference(&[3.0, 4.0, 9.0]);
        assert_eq!(Some(9.0), points.majority([2.1, 0.0, 0.0], 1));
    }

    #[test]
    fn test_options_validation() {
        let missing = KnnAssignFilter::new(Default::default()).err().unwrap();
        assert_eq!(
            Some(&ConfigurationError::MissingOption { option: "k".into() }),
            missing.downcast_ref::<ConfigurationError>()
        );

        let zero = KnnAssignFilter::from_json(&serde_json::json!({ "k": 0 }))
            .err()
            .unwrap();
        assert!(matches!(
            zero.downcast_ref::<ConfigurationError>(),
            Some(ConfigurationError::InvalidOption { .. })
        ));

        let bad_domain = KnnAssignFilter::from_json(&serde_json::json!({
            "k": 3,
            "domain": ["Classification[2:2]", "Classification[[2]"]
        }))
        .err()
        .unwrap();
        match bad_domain.downcast_ref::<ConfigurationError>() {
            Some(ConfigurationError::InvalidDomain { option, source }) => {
                assert_eq!("domain", option);
                assert_eq!("Classification[[2]", source.text());
            }
            other => panic!("Unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_prepare_sorts_domain_and_resolves_dimension() {
        let options = KnnAssignOptions {
            k: Some(3),
            domain: vec!["Classification[1:1]".into(), "Z<10".into(), "X>0".into()],
            ..Default::default()
        };
        let mut filter = KnnAssignFilter::new(options).unwrap();
        filter.prepare(&PointLayout::xyz_classification()).unwrap();
        let names = filter
            .domain()
            .iter()
            .map(|range| range.name())
            .collect::<Vec<_>>();
        assert_eq!(vec!["X", "Z", "Classification"], names);
    }

    #[test]
    fn test_prepare_rejects_unknown_names() {
        let options = KnnAssignOptions {
            k: Some(3),
            domain: vec!["Reflectance>5".into()],
            ..Default::default()
        };
        let mut filter = KnnAssignFilter::new(options).unwrap();
        let error = filter
            .prepare(&PointLayout::xyz_classification())
            .unwrap_err();
        assert_eq!(
            Some(&ConfigurationError::unknown_dimension("domain", "Reflectance")),
            error.downcast_ref::<ConfigurationError>()
        );

        let options = KnnAssignOptions {
            k: Some(3),
            dimension: "UserData".into(),
            ..Default::default()
        };
        let mut filter = KnnAssignFilter::new(options).unwrap();
        assert!(filter.prepare(&PointLayout::xyz_classification()).is_err());
    }

    #[test]
    fn test_run_before_prepare_fails() {
        let options = KnnAssignOptions {
            k: Some(1),
            ..Default::default()
        };
        let mut filter = KnnAssignFilter::new(options).unwrap();
        assert!(filter
            .run(PointSet::with_len(PointLayout::xyz_classification(), 2))
            .is_err());
    }
}
