mod loader;
pub use self::loader::*;
