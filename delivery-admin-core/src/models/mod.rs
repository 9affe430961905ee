mod delivery;
mod order;
mod partner;
mod stats;
mod user;

pub use delivery::{Delivery, DeliveryStatus, NewDelivery};
pub use order::Order;
pub use partner::{DeliveryPartner, NewPartner, PartnerStatus, PartnerUpdate};
pub use stats::{DeliveryStats, PartnerStats};
pub use user::User;

/// Collection holding delivery documents.
pub const DELIVERIES: &str = "deliveries";

/// Collection holding delivery partner documents.
pub const DELIVERY_PARTNERS: &str = "deliveryPartners";

/// Collection holding admin accounts.
pub const ADMINS: &str = "admins";
