use anyhow::{bail, Result};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use terrasift_core::{
    containers::{PointId, PointSet},
    domain::{DomainRange, DomainParseError},
    error::ConfigurationError,
    layout::{dimensions, PointLayout, CLASSIFICATION_GROUND, CLASSIFICATION_UNCLASSIFIED},
};

use crate::{
    filter::{options_from_json, require_finite, Filter},
    morphology,
    raster::Grid,
    segmentation::{split_ignored, split_last_returns},
};

/// Options of the [`ProgressiveMorphologicalFilter`]. Missing fields take their default values when
/// deserializing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PmfOptions {
    /// Edge length of a raster cell
    pub cell_size: f64,
    /// Grow the window size exponentially instead of linearly
    pub exponential: bool,
    /// Domain range of points that are passed through without being classified
    pub ignore: Option<String>,
    /// Height threshold of the first iteration
    pub initial_distance: f64,
    /// Only classify last returns
    pub last: bool,
    /// Upper limit of the height threshold
    pub max_distance: f64,
    /// The window sequence ends with the first window that is at least this large
    pub max_window_size: f64,
    /// Terrain slope used to scale the height threshold between iterations
    pub slope: f64,
}

impl Default for PmfOptions {
    fn default() -> Self {
        Self {
            cell_size: 1.0,
            exponential: true,
            ignore: None,
            initial_distance: 0.15,
            last: true,
            max_distance: 2.5,
            max_window_size: 33.0,
            slope: 1.0,
        }
    }
}

/// Largest supported window, measured in raster cells. Linear window growth takes one iteration per
/// four cells, so this also bounds the number of iterations.
pub const MAX_WINDOW_CELLS: f64 = 65536.0;

/// One step of the progressive filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub size: f64,
    pub height_threshold: f64,
}

impl Window {
    /// Radius (in cells) of the diamond used to open the surface with this window
    pub fn radius(&self) -> usize {
        ((self.size - 1.0) / 2.0).floor().max(0.0) as usize
    }
}

/// Computes the windows of all iterations of the progressive filter. The sequence ends with the first
/// window whose size reaches `max_window_size`, and is empty if `max_window_size` is not positive.
pub fn window_sequence(options: &PmfOptions) -> Vec<Window> {
    let mut windows: Vec<Window> = vec![];
    let mut size = 0.0;
    let mut iteration = 0;
    while size < options.max_window_size {
        size = if options.exponential {
            options.cell_size * (2.0 * 2.0_f64.powi(iteration) + 1.0)
        } else {
            options.cell_size * (2.0 * (iteration + 1) as f64 * 2.0 + 1.0)
        };
        let height_threshold = match windows.last() {
            None => options.initial_distance,
            Some(previous) => {
                options.slope * (size - previous.size) * options.cell_size
                    + options.initial_distance
            }
        };
        windows.push(Window {
            size,
            height_threshold: height_threshold.min(options.max_distance),
        });
        iteration += 1;
    }
    windows
}

/// Ground classification with the Progressive Morphological Filter of Zhang et al. (2003).
///
/// The lowest points are rasterized into a minimum-elevation surface which is then opened with
/// windows of growing size. A point stays a ground candidate as long as it lies less than the height
/// threshold of the current window above the opened surface. All points that survive every window are
/// classified as ground (2), all other processed points as unclassified (1).
///
/// ```
/// # use terrasift_algorithms::{filter::Filter, pmf::*};
/// # use terrasift_core::{containers::PointSet, layout::*};
/// let mut points = PointSet::with_len(PointLayout::xyz_classification(), 9);
/// for id in 0..9 {
///     points.set_field(dimensions::X.id(), id, (id % 3) as f64).unwrap();
///     points.set_field(dimensions::Y.id(), id, (id / 3) as f64).unwrap();
/// }
/// let options = PmfOptions { last: false, ..Default::default() };
/// let mut pmf = ProgressiveMorphologicalFilter::new(options).unwrap();
/// let result = pmf.execute(points).unwrap();
/// assert!(result[0]
///     .field_values(dimensions::CLASSIFICATION.id())
///     .iter()
///     .all(|class| *class == 2.0));
/// ```
#[derive(Debug, Clone)]
pub struct ProgressiveMorphologicalFilter {
    options: PmfOptions,
    ignore: Option<DomainRange>,
    last: bool,
}

impl ProgressiveMorphologicalFilter {
    pub const NAME: &'static str = "filters.pmf";

    /// Creates a new filter, validating `options`
    pub fn new(options: PmfOptions) -> Result<Self> {
        for (option, value) in [
            ("cell_size", options.cell_size),
            ("initial_distance", options.initial_distance),
            ("max_distance", options.max_distance),
            ("max_window_size", options.max_window_size),
            ("slope", options.slope),
        ] {
            require_finite(option, value)?;
        }
        if options.cell_size <= 0.0 {
            return Err(ConfigurationError::invalid_option(
                "cell_size",
                format!("cell size must be positive, found {}", options.cell_size),
            )
            .into());
        }
        if options.max_window_size / options.cell_size > MAX_WINDOW_CELLS {
            return Err(ConfigurationError::invalid_option(
                "max_window_size",
                format!(
                    "window of {} spans more than {} cells of size {}",
                    options.max_window_size, MAX_WINDOW_CELLS, options.cell_size
                ),
            )
            .into());
        }
        let ignore = options
            .ignore
            .as_deref()
            .map(DomainRange::parse)
            .transpose()
            .map_err(|source: DomainParseError| ConfigurationError::InvalidDomain {
                option: "ignore".into(),
                source,
            })?;
        Ok(Self {
            last: options.last,
            options,
            ignore,
        })
    }

    /// Creates a new filter from JSON options, e.g. `{"cell_size": 2.0, "last": false}`
    pub fn from_json(options: &Value) -> Result<Self> {
        Self::new(options_from_json(Self::NAME, options)?)
    }

    pub fn options(&self) -> &PmfOptions {
        &self.options
    }

    /// Whether the filter only classifies last returns. This is `false` after preparing for a layout
    /// without return information, even if the `last` option is set.
    pub fn uses_last_returns(&self) -> bool {
        self.last
    }

    /// Identifiers (within `points`) of all points that survive every window of the progressive filter
    fn find_ground(&self, points: &PointSet) -> Vec<PointId> {
        let grid = match Grid::covering(points, self.options.cell_size) {
            Some(grid) => grid,
            None => return vec![],
        };
        let cells = (0..points.len())
            .map(|id| {
                grid.cell_index(
                    points.get_field(dimensions::X.id(), id),
                    points.get_field(dimensions::Y.id(), id),
                )
            })
            .collect::<Vec<_>>();

        let mut surface = grid.fill_gaps(&grid.minimum_surface(points));
        let mut ground = (0..points.len()).collect::<Vec<_>>();
        for (iteration, window) in window_sequence(&self.options).iter().enumerate() {
            let opened = morphology::open(&surface, grid.cols(), window.radius());
            ground.retain(|id| {
                points.get_field(dimensions::Z.id(), *id) - opened[cells[*id]]
                    < window.height_threshold
            });
            debug!(
                "PMF iteration {}: window size {}, height threshold {}, {} ground candidates left",
                iteration,
                window.size,
                window.height_threshold,
                ground.len()
            );
            surface = opened;
        }
        ground
    }
}

fn set_classification(points: &mut PointSet, id: PointId, class: u8) -> Result<()> {
    points.set_field(dimensions::CLASSIFICATION.id(), id, class as f64)
}

impl Filter for ProgressiveMorphologicalFilter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn declare_dimensions(&self, layout: &mut PointLayout) {
        layout.register_dim(&dimensions::CLASSIFICATION);
    }

    fn prepare(&mut self, layout: &PointLayout) -> Result<()> {
        if let Some(ignore) = &mut self.ignore {
            if ignore.resolve(layout).is_none() {
                return Err(ConfigurationError::unknown_dimension("ignore", ignore.name()).into());
            }
        }
        for dimension in [
            dimensions::X,
            dimensions::Y,
            dimensions::Z,
            dimensions::CLASSIFICATION,
        ] {
            if !layout.has_dim(dimension.id()) {
                bail!(
                    "{} requires dimension {} but the point layout is {}",
                    Self::NAME,
                    dimension.name(),
                    layout
                );
            }
        }
        self.last = self.options.last;
        if self.last
            && (!layout.has_dim(dimensions::RETURN_NUMBER.id())
                || !layout.has_dim(dimensions::NUMBER_OF_RETURNS.id()))
        {
            warn!(
                "Point layout has no ReturnNumber or NumberOfReturns dimension, {} processes all returns",
                Self::NAME
            );
            self.last = false;
        }
        Ok(())
    }

    fn run(&mut self, input: PointSet) -> Result<Vec<PointSet>> {
        if input.is_empty() {
            return Ok(vec![]);
        }
        if !input.layout().has_dim(dimensions::CLASSIFICATION.id()) {
            bail!("{} can't run on points without Classification dimension", Self::NAME);
        }

        let (mut output, mut kept) = split_ignored(&input, self.ignore.as_ref())?;
        drop(input);
        for id in 0..kept.len() {
            set_classification(&mut kept, id, CLASSIFICATION_UNCLASSIFIED)?;
        }

        let (mut candidates, non_last) = if self.last {
            split_last_returns(&kept)?
        } else {
            (kept, PointSet::new(output.layout().clone()))
        };

        for id in self.find_ground(&candidates) {
            set_classification(&mut candidates, id, CLASSIFICATION_GROUND)?;
        }

        output.append(&non_last)?;
        output.append(&candidates)?;
        Ok(vec![output])
    }
}
