//! Cover-image blob stores.

pub mod aws;
pub mod local;
pub mod memory;
pub mod sign;
pub mod store;

use std::sync::Arc;

use crate::errors::ApiError;
use store::CoverStore;

/// Handle to the cover store, carrying an explicit disabled state.
///
/// Cover storage is optional: when disabled, create and update skip
/// image handling entirely, while the operations that exist only to
/// serve covers fail with `CoversNotConfigured`.
pub enum Covers {
    /// No cover store configured.
    Disabled,
    /// Cover storage is available.
    Enabled(Arc<dyn CoverStore>),
}

impl Covers {
    /// Borrow the store if cover storage is enabled.
    pub fn enabled(&self) -> Option<&Arc<dyn CoverStore>> {
        match self {
            Covers::Disabled => None,
            Covers::Enabled(store) => Some(store),
        }
    }

    /// Borrow the store, or fail with `CoversNotConfigured`.
    pub fn require(&self) -> Result<&Arc<dyn CoverStore>, ApiError> {
        self.enabled().ok_or(ApiError::CoversNotConfigured)
    }
}
