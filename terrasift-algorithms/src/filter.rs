use std::collections::BTreeMap;

use anyhow::Result;
use lazy_static::lazy_static;
use serde::de::DeserializeOwned;
use serde_json::Value;
use terrasift_core::{containers::PointSet, error::ConfigurationError, layout::PointLayout};

use crate::{knn_assign::KnnAssignFilter, pmf::ProgressiveMorphologicalFilter};

/// A processing stage that reclassifies the points of a [`PointSet`]
///
/// The lifecycle of a filter is:
/// 1. Construction from typed or JSON options. Invalid options are reported as [`ConfigurationError`].
/// 2. [`declare_dimensions`](Filter::declare_dimensions) adds the dimensions that the filter writes to the
///    layout of the point data.
/// 3. [`prepare`](Filter::prepare) binds dimension names in the options to the concrete layout.
/// 4. [`run`](Filter::run), possibly many times for point sets with the prepared layout.
pub trait Filter: Send {
    /// The registered name of this filter, e.g. `filters.pmf`
    fn name(&self) -> &'static str;
    /// Registers all dimensions that this filter writes into `layout`
    fn declare_dimensions(&self, layout: &mut PointLayout);
    /// Resolves dimension names against `layout`. Fails with a [`ConfigurationError`] if a name can't be
    /// resolved.
    fn prepare(&mut self, layout: &PointLayout) -> Result<()>;
    /// Processes `input` and returns the resulting point sets
    fn run(&mut self, input: PointSet) -> Result<Vec<PointSet>>;

    /// Prepares this filter for the layout of `input` and runs it
    fn execute(&mut self, input: PointSet) -> Result<Vec<PointSet>> {
        self.prepare(input.layout())?;
        self.run(input)
    }
}

/// Creates a filter from its JSON options
pub type FilterFactory = fn(&Value) -> Result<Box<dyn Filter>>;

/// Name-keyed table of filter factories
#[derive(Default)]
pub struct FilterRegistry {
    factories: BTreeMap<&'static str, FilterFactory>,
}

impl FilterRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a registry that knows all filters of this crate
    pub fn with_builtin_filters() -> Self {
        let mut registry = Self::new();
        registry.register(ProgressiveMorphologicalFilter::NAME, |options| {
            Ok(Box::new(ProgressiveMorphologicalFilter::from_json(options)?))
        });
        registry.register(KnnAssignFilter::NAME, |options| {
            Ok(Box::new(KnnAssignFilter::from_json(options)?))
        });
        registry
    }

    /// Registers `factory` under `name`, replacing any factory previously registered under that name
    pub fn register(&mut self, name: &'static str, factory: FilterFactory) {
        self.factories.insert(name, factory);
    }

    /// Creates the filter registered as `name` from the given options
    pub fn create(&self, name: &str, options: &Value) -> Result<Box<dyn Filter>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ConfigurationError::UnknownFilter {
                name: name.to_owned(),
            })?;
        factory(options)
    }

    /// Names of all registered filters in ascending order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }
}

lazy_static! {
    static ref FILTER_REGISTRY: FilterRegistry = FilterRegistry::with_builtin_filters();
}

/// Creates one of the built-in filters by name
///
/// ```
/// # use terrasift_algorithms::filter::create_filter;
/// let filter = create_filter("filters.knnassign", &serde_json::json!({ "k": 5 })).unwrap();
/// assert_eq!("filters.knnassign", filter.name());
/// ```
pub fn create_filter(name: &str, options: &Value) -> Result<Box<dyn Filter>> {
    FILTER_REGISTRY.create(name, options)
}

/// Names of all built-in filters
pub fn builtin_filters() -> Vec<&'static str> {
    FILTER_REGISTRY.names().collect()
}

/// Deserializes the options of filter `filter`. A JSON `null` means that all options take their
/// defaults.
pub(crate) fn options_from_json<T: DeserializeOwned>(filter: &str, options: &Value) -> Result<T> {
    let options = match options {
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    };
    serde_json::from_value(options)
        .map_err(|e| ConfigurationError::invalid_option(filter, e.to_string()).into())
}

/// Returns a [`ConfigurationError`] if `value` is NaN or infinite
pub(crate) fn require_finite(option: &str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigurationError::invalid_option(
            option,
            format!("{} is not a finite number", value),
        ))
    }
}
