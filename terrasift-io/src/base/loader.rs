use anyhow::Result;
use terrasift_core::containers::PointSet;

/// Capability to synchronously load a complete, named point set into memory. Filters that consult an
/// external reference set (such as a KNN candidate set) call this once, before they process any point.
pub trait PointSetLoader: Send + Sync {
    /// Loads and fully materializes the point set identified by `name`. What `name` means (a path, a key
    /// into some store...) is up to the implementation.
    fn load(&self, name: &str) -> Result<PointSet>;
}

impl<F> PointSetLoader for F
where
    F: Fn(&str) -> Result<PointSet> + Send + Sync,
{
    fn load(&self, name: &str) -> Result<PointSet> {
        self(name)
    }
}
