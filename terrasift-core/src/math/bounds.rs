use nalgebra::{ClosedSub, Point3, Scalar, Vector3};

/// 3D axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB<T: Scalar + PartialOrd> {
    min: Point3<T>,
    max: Point3<T>,
}

impl<T: Scalar + ClosedSub + PartialOrd + Copy> AABB<T> {
    /// Creates a degenerate AABB that contains exactly the given point
    /// ```
    /// # use terrasift_core::math::AABB;
    /// let bounds = AABB::from_point(nalgebra::Point3::new(1.0, 2.0, 3.0));
    /// assert_eq!(bounds.min(), bounds.max());
    /// ```
    pub fn from_point(point: Point3<T>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    pub fn min(&self) -> &Point3<T> {
        &self.min
    }

    pub fn max(&self) -> &Point3<T> {
        &self.max
    }

    /// Returns the extent of this AABB. The extent is the size between the minimum and maximum position of this AABB
    /// ```
    /// # use terrasift_core::math::AABB;
    /// let bounds = AABB::from_point(nalgebra::Point3::new(0.0, 0.0, 0.0));
    /// let bounds = AABB::extend_with_point(&bounds, &nalgebra::Point3::new(2.0, 1.0, 1.0));
    /// assert_eq!(bounds.extent(), nalgebra::Vector3::new(2.0, 1.0, 1.0));
    /// ```
    pub fn extent(&self) -> Vector3<T> {
        self.max - self.min
    }

    /// Returns true if the given point is contained within this AABB. Points right on the boundary
    /// of this AABB count as contained.
    pub fn contains(&self, point: &Point3<T>) -> bool {
        (0..3).all(|axis| point[axis] >= self.min[axis] && point[axis] <= self.max[axis])
    }

    /// Extends the given AABB so that it contains the given point.
    pub fn extend_with_point(bounds: &AABB<T>, point: &Point3<T>) -> AABB<T> {
        let mut extended = *bounds;
        for axis in 0..3 {
            if point[axis] < extended.min[axis] {
                extended.min[axis] = point[axis];
            }
            if point[axis] > extended.max[axis] {
                extended.max[axis] = point[axis];
            }
        }
        extended
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_grows_only_where_needed() {
        let bounds = AABB::from_point(Point3::new(0.0, 0.0, 0.0));
        let bounds = AABB::extend_with_point(&bounds, &Point3::new(-1.0, 2.0, 0.5));
        assert_eq!(Point3::new(-1.0, 0.0, 0.0), *bounds.min());
        assert_eq!(Point3::new(0.0, 2.0, 0.5), *bounds.max());
        assert!(bounds.contains(&Point3::new(-0.5, 1.0, 0.25)));
        assert!(!bounds.contains(&Point3::new(0.5, 1.0, 0.25)));
    }
}
