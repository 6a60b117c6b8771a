//! Catalog stores holding author and book records.

pub mod memory;
pub mod sqlite;
pub mod store;

use std::sync::Arc;

use crate::errors::ApiError;
use store::CatalogStore;

/// Handle to the catalog store, carrying an explicit unavailable state.
///
/// The server keeps serving when the catalog cannot be opened at startup;
/// every request that needs it then fails with a 500 instead of the
/// process refusing to boot.
pub enum Catalog {
    /// The store is open and usable.
    Ready(Arc<dyn CatalogStore>),
    /// The store could not be initialized; holds the reason.
    Unavailable(String),
}

impl Catalog {
    /// Borrow the store, or fail with `StorageUnavailable`.
    pub fn store(&self) -> Result<&Arc<dyn CatalogStore>, ApiError> {
        match self {
            Catalog::Ready(store) => Ok(store),
            Catalog::Unavailable(reason) => Err(ApiError::StorageUnavailable {
                reason: reason.clone(),
            }),
        }
    }
}
