mod dimension;
pub use self::dimension::*;

mod point_layout;
pub use self::point_layout::*;
