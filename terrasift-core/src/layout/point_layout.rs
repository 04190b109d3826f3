use std::fmt::Display;

use super::{dimensions, DimensionDataType, DimensionDefinition, DimensionId};

/// Describes the dimensions that every point of a point set carries. The order of the dimensions is the
/// order in which they were registered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PointLayout {
    dimensions: Vec<DimensionDefinition>,
}

impl PointLayout {
    /// Creates a new empty PointLayout
    /// ```
    /// # use terrasift_core::layout::*;
    /// let layout = PointLayout::new();
    /// # assert_eq!(0, layout.dimensions().count());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new PointLayout from the given sequence of dimensions. Registering the same dimension
    /// twice has no effect.
    /// ```
    /// # use terrasift_core::layout::*;
    /// let layout = PointLayout::from_dimensions(&[&dimensions::X, &dimensions::Y, &dimensions::Z]);
    /// # assert_eq!(3, layout.dimensions().count());
    /// ```
    pub fn from_dimensions(dimensions: &[&DimensionDefinition]) -> Self {
        let mut layout = Self::new();
        for dimension in dimensions {
            layout.register_dim(dimension);
        }
        layout
    }

    /// A layout with X, Y, Z and Classification, the minimum that the classification filters operate on
    pub fn xyz_classification() -> Self {
        Self::from_dimensions(&[
            &dimensions::X,
            &dimensions::Y,
            &dimensions::Z,
            &dimensions::CLASSIFICATION,
        ])
    }

    /// Declares the given dimension as part of this layout. The call is idempotent: if a dimension with the
    /// same identifier is already registered, nothing changes.
    ///
    /// # Panics
    ///
    /// If a different dimension with the same name is already registered
    /// ```
    /// # use terrasift_core::layout::*;
    /// let mut layout = PointLayout::new();
    /// layout.register_dim(&dimensions::CLASSIFICATION);
    /// layout.register_dim(&dimensions::CLASSIFICATION);
    /// assert_eq!(1, layout.dimensions().count());
    /// ```
    pub fn register_dim(&mut self, dimension: &DimensionDefinition) {
        if self.has_dim(dimension.id()) {
            return;
        }
        if let Some(existing) = self.find_dim(dimension.name()) {
            panic!(
                "Dimension {} clashes with the already registered dimension {}",
                dimension, existing
            );
        }
        self.dimensions.push(dimension.clone());
    }

    /// Registers a custom dimension with the given name and returns its identifier. If a dimension with
    /// this name already exists, its identifier is returned instead.
    /// ```
    /// # use terrasift_core::layout::*;
    /// let mut layout = PointLayout::new();
    /// let height = layout.register_custom("HeightAboveGround", DimensionDataType::F32);
    /// assert!(!height.is_builtin());
    /// assert_eq!(height, layout.register_custom("HeightAboveGround", DimensionDataType::F32));
    /// ```
    pub fn register_custom(&mut self, name: &str, datatype: DimensionDataType) -> DimensionId {
        if let Some(id) = self.find_dim(name) {
            return id;
        }
        if let Some(builtin) = dimensions::find_builtin(name) {
            let definition = builtin.with_custom_datatype(datatype);
            self.dimensions.push(definition);
            return builtin.id();
        }
        let id = self
            .dimensions
            .iter()
            .map(|dimension| dimension.id())
            .filter(|id| !id.is_builtin())
            .max()
            .map(|max| DimensionId::from_raw(max.raw() + 1))
            .unwrap_or(DimensionId::FIRST_CUSTOM);
        self.dimensions
            .push(DimensionDefinition::new(id, name, datatype));
        id
    }

    /// Resolves a dimension name (ignoring ASCII case) to its identifier. Returns `None` if this layout
    /// has no such dimension.
    /// ```
    /// # use terrasift_core::layout::*;
    /// let layout = PointLayout::xyz_classification();
    /// assert_eq!(Some(dimensions::CLASSIFICATION.id()), layout.find_dim("classification"));
    /// assert_eq!(None, layout.find_dim("Intensity"));
    /// ```
    pub fn find_dim(&self, name: &str) -> Option<DimensionId> {
        self.dimensions
            .iter()
            .find(|dimension| dimension.name().eq_ignore_ascii_case(name))
            .map(|dimension| dimension.id())
    }

    pub fn has_dim(&self, id: DimensionId) -> bool {
        self.index_of(id).is_some()
    }

    /// Returns the definition of the dimension with the given identifier
    pub fn get_dim(&self, id: DimensionId) -> Option<&DimensionDefinition> {
        self.dimensions.iter().find(|dimension| dimension.id() == id)
    }

    /// Returns the position of the given dimension within this layout
    /// ```
    /// # use terrasift_core::layout::*;
    /// let layout = PointLayout::xyz_classification();
    /// assert_eq!(Some(0), layout.index_of(dimensions::X.id()));
    /// assert_eq!(Some(3), layout.index_of(dimensions::CLASSIFICATION.id()));
    /// assert_eq!(None, layout.index_of(dimensions::GPS_TIME.id()));
    /// ```
    pub fn index_of(&self, id: DimensionId) -> Option<usize> {
        self.dimensions
            .iter()
            .position(|dimension| dimension.id() == id)
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &DimensionDefinition> + '_ {
        self.dimensions.iter()
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }
}

impl Display for PointLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "PointLayout {{")?;
        for dimension in &self.dimensions {
            writeln!(f, "\t{} {}", dimension.id(), dimension)?;
        }
        write!(f, "}}")
    }
}
