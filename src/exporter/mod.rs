use log::{debug, warn};
use thiserror::Error;

pub mod actor;
pub mod grid;
pub mod material;
pub mod resolver;
pub mod scene;
pub mod world;

#[cfg(test)]
pub(crate) mod testing;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Object {0} not found")]
    NotFound(String),

    #[error("{0} is not a World, won't try to export")]
    NotAWorld(String),

    #[error("{0} has already been exported")]
    AlreadyVisited(String),

    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

impl ExportError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExportError::Fatal(_))
    }
}

/// Turns the soft failures of a nested export into an empty child slot, fatal errors keep propagating.
pub fn soft_to_none(result: Result<String, ExportError>) -> Result<Option<String>, ExportError> {
    match result {
        Ok(path) => Ok(Some(path)),
        Err(e @ ExportError::AlreadyVisited(_)) => {
            debug!("{}", e);
            Ok(None)
        }
        Err(e @ (ExportError::NotFound(_) | ExportError::NotAWorld(_))) => {
            warn!("{}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
