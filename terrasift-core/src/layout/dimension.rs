use std::{borrow::Cow, fmt::Display};

/// Storage width of a single dimension. Field values are always exchanged as `f64` at the accessor
/// boundary, the data type only decides how they are stored and how writes are converted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DimensionDataType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl DimensionDataType {
    /// Is this a floating point data type?
    pub fn is_floating_point(&self) -> bool {
        matches!(self, DimensionDataType::F32 | DimensionDataType::F64)
    }
}

impl Display for DimensionDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Stable identifier of a dimension. Identifiers are totally ordered, which gives a deterministic
/// evaluation order wherever a collection of dimensions (or ranges over dimensions) is sorted.
/// Built-in dimensions have fixed identifiers, custom dimensions are numbered after them by the
/// [`PointLayout`](super::PointLayout) that registers them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DimensionId(u32);

impl DimensionId {
    /// First identifier handed out to custom dimensions
    pub const FIRST_CUSTOM: DimensionId = DimensionId(1024);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn is_builtin(&self) -> bool {
        self.0 < Self::FIRST_CUSTOM.0
    }
}

impl Display for DimensionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A definition for a single dimension of a point set. A dimension is a named numeric attribute of every
/// point (X, Classification, GpsTime...), identified by a [`DimensionId`] and stored with a
/// [`DimensionDataType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DimensionDefinition {
    id: DimensionId,
    name: Cow<'static, str>,
    datatype: DimensionDataType,
}

impl DimensionDefinition {
    pub(crate) fn new(id: DimensionId, name: &str, datatype: DimensionDataType) -> Self {
        Self {
            id,
            name: Cow::Owned(name.to_owned()),
            datatype,
        }
    }

    /// Returns the identifier of this dimension
    /// ```
    /// # use terrasift_core::layout::*;
    /// assert!(dimensions::X.id() < dimensions::CLASSIFICATION.id());
    /// ```
    pub fn id(&self) -> DimensionId {
        self.id
    }

    /// Returns the name of this dimension
    /// ```
    /// # use terrasift_core::layout::*;
    /// assert_eq!("Classification", dimensions::CLASSIFICATION.name());
    /// ```
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn datatype(&self) -> DimensionDataType {
        self.datatype
    }

    /// Returns a copy of this definition that is stored with a different data type
    /// ```
    /// # use terrasift_core::layout::*;
    /// let wide_classification = dimensions::CLASSIFICATION.with_custom_datatype(DimensionDataType::U16);
    /// assert_eq!(dimensions::CLASSIFICATION.id(), wide_classification.id());
    /// assert_eq!(DimensionDataType::U16, wide_classification.datatype());
    /// ```
    pub fn with_custom_datatype(&self, datatype: DimensionDataType) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            datatype,
        }
    }
}

impl Display for DimensionDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{};{}]", self.name, self.datatype)
    }
}

/// Built-in dimensions. Names and storage widths follow the ASPRS LAS conventions.
pub mod dimensions {
    use super::{DimensionDataType, DimensionDefinition, DimensionId};
    use std::borrow::Cow;

    const fn builtin(raw: u32, name: &'static str, datatype: DimensionDataType) -> DimensionDefinition {
        DimensionDefinition {
            id: DimensionId::from_raw(raw),
            name: Cow::Borrowed(name),
            datatype,
        }
    }

    /// X coordinate. Default datatype is F64
    pub const X: DimensionDefinition = builtin(1, "X", DimensionDataType::F64);
    /// Y coordinate. Default datatype is F64
    pub const Y: DimensionDefinition = builtin(2, "Y", DimensionDataType::F64);
    /// Z coordinate (elevation). Default datatype is F64
    pub const Z: DimensionDefinition = builtin(3, "Z", DimensionDataType::F64);
    /// Intensity of the return. Default datatype is U16
    pub const INTENSITY: DimensionDefinition = builtin(4, "Intensity", DimensionDataType::U16);
    /// Return number of the pulse. Default datatype is U8
    pub const RETURN_NUMBER: DimensionDefinition =
        builtin(5, "ReturnNumber", DimensionDataType::U8);
    /// Number of returns of the pulse. Default datatype is U8
    pub const NUMBER_OF_RETURNS: DimensionDefinition =
        builtin(6, "NumberOfReturns", DimensionDataType::U8);
    /// ASPRS classification code. Default datatype is U8
    pub const CLASSIFICATION: DimensionDefinition =
        builtin(7, "Classification", DimensionDataType::U8);
    /// Scan angle rank. Default datatype is I8
    pub const SCAN_ANGLE_RANK: DimensionDefinition =
        builtin(8, "ScanAngleRank", DimensionDataType::I8);
    /// User data field. Default datatype is U8
    pub const USER_DATA: DimensionDefinition = builtin(9, "UserData", DimensionDataType::U8);
    /// Point source ID. Default datatype is U16
    pub const POINT_SOURCE_ID: DimensionDefinition =
        builtin(10, "PointSourceId", DimensionDataType::U16);
    /// GPS timestamp. Default datatype is F64
    pub const GPS_TIME: DimensionDefinition = builtin(11, "GpsTime", DimensionDataType::F64);

    /// All built-in dimensions, ordered by identifier
    pub const ALL: [DimensionDefinition; 11] = [
        X,
        Y,
        Z,
        INTENSITY,
        RETURN_NUMBER,
        NUMBER_OF_RETURNS,
        CLASSIFICATION,
        SCAN_ANGLE_RANK,
        USER_DATA,
        POINT_SOURCE_ID,
        GPS_TIME,
    ];

    /// Looks up a built-in dimension by name, ignoring ASCII case
    /// ```
    /// # use terrasift_core::layout::dimensions;
    /// assert_eq!(Some(dimensions::Z), dimensions::find_builtin("z"));
    /// assert!(dimensions::find_builtin("Reflectance").is_none());
    /// ```
    pub fn find_builtin(name: &str) -> Option<DimensionDefinition> {
        ALL.iter()
            .find(|dimension| dimension.name().eq_ignore_ascii_case(name))
            .cloned()
    }
}

/// ASPRS classification code for points that were never classified, or were reset to non-ground
pub const CLASSIFICATION_UNCLASSIFIED: u8 = 1;
/// ASPRS classification code for ground points
pub const CLASSIFICATION_GROUND: u8 = 2;
