//! Data-access services for the two admin collections.
//!
//! Each service owns the translation between its model types and the
//! document shape in the store. Services are cheap to clone and share one
//! store handle.

mod delivery;
mod partner;

use thiserror::Error;

use crate::store::StoreError;

pub use delivery::DeliveryService;
pub use partner::PartnerService;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// Maps a store miss to a not-found error for `kind`.
    fn from_store(kind: &'static str, e: StoreError) -> Self {
        match e {
            StoreError::NotFound { id, .. } => ServiceError::NotFound { kind, id },
            other => ServiceError::Store(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound { .. })
    }
}
