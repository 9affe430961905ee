//! Delivery Admin Core Library
//!
//! Data access and session state for the delivery admin panel.

pub mod auth;
pub mod format;
pub mod models;
pub mod notify;
pub mod prefs;
pub mod services;
pub mod store;

pub use auth::{AdminDirectory, AuthError, AuthSession, Authenticator, SessionState};
pub use format::{format_date, BackendTimestamp, DateInput};
pub use models::{
    Delivery, DeliveryPartner, DeliveryStats, DeliveryStatus, NewDelivery, NewPartner, Order,
    PartnerStats, PartnerStatus, PartnerUpdate, User,
};
pub use notify::{Notification, NotificationKind, NotificationQueue, Notifier};
pub use prefs::{LayoutState, LocalStorage, LocalStorageError, SidebarState, ThemeFlag, View};
pub use services::{DeliveryService, PartnerService, ServiceError};
pub use store::{DocumentStore, LocalStore, StoreError, Subscription};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
