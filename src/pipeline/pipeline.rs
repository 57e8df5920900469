//! Pipeline trait.
use crate::error::Error;

/// This trait must be implemented for each processing step,
/// and is generic over the return type so that
/// any step that needs to report something (record counts for example) can use the
/// trait aswell.
pub trait Pipeline<T> {
    fn run(&self) -> Result<T, Error>;
}
