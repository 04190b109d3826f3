use anyhow::{anyhow, bail, Result};
use nalgebra::Point3;
use num_traits::NumCast;

use crate::{
    layout::{dimensions, DimensionDataType, DimensionId, PointLayout},
    math::AABB,
};

/// Zero-based identifier of a point within a [`PointSet`]
pub type PointId = usize;

/// Typed storage of a single dimension
#[derive(Debug, Clone, PartialEq)]
enum Column {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    U64(Vec<u64>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! with_column {
    ($column:expr, $values:ident => $body:expr) => {
        match $column {
            Column::U8($values) => $body,
            Column::I8($values) => $body,
            Column::U16($values) => $body,
            Column::I16($values) => $body,
            Column::U32($values) => $body,
            Column::I32($values) => $body,
            Column::U64($values) => $body,
            Column::I64($values) => $body,
            Column::F32($values) => $body,
            Column::F64($values) => $body,
        }
    };
}

macro_rules! with_column_pair {
    ($target:expr, $source:expr, $target_values:ident, $source_values:ident => $body:expr) => {
        match ($target, $source) {
            (Column::U8($target_values), Column::U8($source_values)) => $body,
            (Column::I8($target_values), Column::I8($source_values)) => $body,
            (Column::U16($target_values), Column::U16($source_values)) => $body,
            (Column::I16($target_values), Column::I16($source_values)) => $body,
            (Column::U32($target_values), Column::U32($source_values)) => $body,
            (Column::I32($target_values), Column::I32($source_values)) => $body,
            (Column::U64($target_values), Column::U64($source_values)) => $body,
            (Column::I64($target_values), Column::I64($source_values)) => $body,
            (Column::F32($target_values), Column::F32($source_values)) => $body,
            (Column::F64($target_values), Column::F64($source_values)) => $body,
            _ => unreachable!("Columns of identical layouts always have the same datatype"),
        }
    };
}

impl Column {
    fn new(datatype: DimensionDataType) -> Self {
        match datatype {
            DimensionDataType::U8 => Column::U8(vec![]),
            DimensionDataType::I8 => Column::I8(vec![]),
            DimensionDataType::U16 => Column::U16(vec![]),
            DimensionDataType::I16 => Column::I16(vec![]),
            DimensionDataType::U32 => Column::U32(vec![]),
            DimensionDataType::I32 => Column::I32(vec![]),
            DimensionDataType::U64 => Column::U64(vec![]),
            DimensionDataType::I64 => Column::I64(vec![]),
            DimensionDataType::F32 => Column::F32(vec![]),
            DimensionDataType::F64 => Column::F64(vec![]),
        }
    }

    fn is_floating_point(&self) -> bool {
        matches!(self, Column::F32(_) | Column::F64(_))
    }

    fn get(&self, id: PointId) -> f64 {
        with_column!(self, values => values[id] as f64)
    }

    fn set(&mut self, id: PointId, value: f64) -> Option<()> {
        // Integer storage rounds to the nearest integer, so that every value read from an integer
        // dimension can be written back unchanged
        let value = if self.is_floating_point() {
            value
        } else {
            value.round()
        };
        with_column!(self, values => {
            values[id] = match NumCast::from(value) {
                Some(converted) => converted,
                None => return None,
            };
        });
        Some(())
    }

    fn resize(&mut self, len: usize) {
        with_column!(self, values => values.resize(len, Default::default()))
    }
}

/// In-memory, ordered and mutable collection of points that share one [`PointLayout`]. Data is stored
/// per dimension in its native width, all accessors exchange values as `f64`.
///
/// ```
/// # use terrasift_core::{containers::PointSet, layout::*};
/// let mut points = PointSet::new(PointLayout::xyz_classification());
/// let id = points.push_default();
/// points.set_field(dimensions::Z.id(), id, 12.5).unwrap();
/// points.set_field(dimensions::CLASSIFICATION.id(), id, 2.0).unwrap();
/// assert_eq!(12.5, points.get_field(dimensions::Z.id(), id));
/// assert_eq!(2.0, points.get_field(dimensions::CLASSIFICATION.id(), id));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    layout: PointLayout,
    columns: Vec<Column>,
    len: usize,
}

impl PointSet {
    /// Creates a new empty `PointSet` with the given layout
    pub fn new(layout: PointLayout) -> Self {
        let columns = layout
            .dimensions()
            .map(|dimension| Column::new(dimension.datatype()))
            .collect();
        Self {
            layout,
            columns,
            len: 0,
        }
    }

    /// Creates a new `PointSet` with `len` points whose fields are all zero
    pub fn with_len(layout: PointLayout, len: usize) -> Self {
        let mut points = Self::new(layout);
        points.resize(len);
        points
    }

    pub fn layout(&self) -> &PointLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Creates an empty `PointSet` with the same layout as this one
    pub fn make_empty_like(&self) -> Self {
        Self::new(self.layout.clone())
    }

    /// Resizes this `PointSet` to `len` points. New points have all fields set to zero
    pub fn resize(&mut self, len: usize) {
        for column in &mut self.columns {
            column.resize(len);
        }
        self.len = len;
    }

    /// Appends a new point with all fields set to zero and returns its identifier
    pub fn push_default(&mut self) -> PointId {
        let id = self.len;
        self.resize(id + 1);
        id
    }

    /// Returns the value of dimension `dim` of the point `id`, converted to `f64`
    ///
    /// # Panics
    ///
    /// If `dim` is not part of the layout of this `PointSet`, or if `id` is out of bounds
    pub fn get_field(&self, dim: DimensionId, id: PointId) -> f64 {
        self.column(dim).get(id)
    }

    /// Sets dimension `dim` of point `id` to `value`. Values written into an integer dimension are rounded
    /// to the nearest integer. Returns an error if the value can't be represented by the storage type of
    /// the dimension.
    ///
    /// # Panics
    ///
    /// If `dim` is not part of the layout of this `PointSet`, or if `id` is out of bounds
    pub fn set_field(&mut self, dim: DimensionId, id: PointId, value: f64) -> Result<()> {
        if id >= self.len {
            panic!("Point {} out of bounds (PointSet has {} points)", id, self.len);
        }
        let index = self.column_index(dim);
        self.columns[index].set(id, value).ok_or_else(|| {
            let dimension = self
                .layout
                .dimensions()
                .nth(index)
                .map(|dimension| dimension.to_string())
                .unwrap_or_default();
            anyhow!(
                "Unable to store value {} in dimension {} of point {}",
                value,
                dimension,
                id
            )
        })
    }

    /// Returns all values of dimension `dim` in point order
    pub fn field_values(&self, dim: DimensionId) -> Vec<f64> {
        let column = self.column(dim);
        (0..self.len).map(|id| column.get(id)).collect()
    }

    /// Appends a copy of point `id` of `other` to this `PointSet`. Both sets must share the same layout.
    ///
    /// # Panics
    ///
    /// If the layouts differ or `id` is out of bounds in `other`
    pub fn push_point_from(&mut self, other: &PointSet, id: PointId) {
        if self.layout != other.layout {
            panic!("Can't copy points between PointSets with different layouts");
        }
        for (target, source) in self.columns.iter_mut().zip(other.columns.iter()) {
            with_column_pair!(target, source, target_values, source_values => {
                target_values.push(source_values[id])
            });
        }
        self.len += 1;
    }

    /// Appends all points of `other` to this `PointSet`
    pub fn append(&mut self, other: &PointSet) -> Result<()> {
        if self.layout != other.layout {
            bail!(
                "Can't append points with layout {} to a PointSet with layout {}",
                other.layout,
                self.layout
            );
        }
        for (target, source) in self.columns.iter_mut().zip(other.columns.iter()) {
            with_column_pair!(target, source, target_values, source_values => {
                target_values.extend_from_slice(source_values)
            });
        }
        self.len += other.len;
        Ok(())
    }

    /// Calculates the bounding box of all points. Returns `None` if this set is empty or if its layout
    /// is missing one of the X, Y and Z dimensions.
    /// ```
    /// # use terrasift_core::{containers::PointSet, layout::*};
    /// let mut points = PointSet::with_len(PointLayout::xyz_classification(), 2);
    /// points.set_field(dimensions::X.id(), 1, 4.0).unwrap();
    /// points.set_field(dimensions::Z.id(), 0, -1.0).unwrap();
    /// let bounds = points.bounds().unwrap();
    /// assert_eq!(4.0, bounds.extent().x);
    /// assert_eq!(1.0, bounds.extent().z);
    /// ```
    pub fn bounds(&self) -> Option<AABB<f64>> {
        if self.is_empty() {
            return None;
        }
        let axes = [dimensions::X.id(), dimensions::Y.id(), dimensions::Z.id()];
        let columns = axes
            .iter()
            .map(|dim| self.layout.index_of(*dim).map(|index| &self.columns[index]))
            .collect::<Option<Vec<_>>>()?;
        let position = |id: PointId| {
            Point3::new(columns[0].get(id), columns[1].get(id), columns[2].get(id))
        };
        let bounds = (1..self.len).fold(AABB::from_point(position(0)), |bounds, id| {
            AABB::extend_with_point(&bounds, &position(id))
        });
        Some(bounds)
    }

    fn column_index(&self, dim: DimensionId) -> usize {
        match self.layout.index_of(dim) {
            Some(index) => index,
            None => panic!(
                "Dimension {} not contained in PointLayout of PointSet ({})",
                dim, self.layout
            ),
        }
    }

    fn column(&self, dim: DimensionId) -> &Column {
        &self.columns[self.column_index(dim)]
    }
}
