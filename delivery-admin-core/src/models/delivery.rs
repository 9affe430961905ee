use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::order::Order;
use super::partner::DeliveryPartner;
use crate::store::{Document, FieldValue, Fields};

/// Delivery status. Any string may be stored; unknown values are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeliveryStatus {
    Active,
    Delivered,
    Other(String),
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DeliveryStatus::Active => "active",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Other(s) => s,
        }
    }
}

impl From<&str> for DeliveryStatus {
    fn from(s: &str) -> Self {
        match s {
            "active" => DeliveryStatus::Active,
            "delivered" => DeliveryStatus::Delivered,
            other => DeliveryStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for DeliveryStatus {
    fn from(s: String) -> Self {
        DeliveryStatus::from(s.as_str())
    }
}

impl From<DeliveryStatus> for String {
    fn from(status: DeliveryStatus) -> Self {
        status.as_str().to_string()
    }
}

impl From<DeliveryStatus> for FieldValue {
    fn from(status: DeliveryStatus) -> Self {
        FieldValue::String(status.into())
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A delivery as read from the `deliveries` collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: String,
    pub order_id: String,
    pub partner_id: String,
    pub partner_name: Option<String>,
    pub customer_name: Option<String>,
    pub pickup_address: Option<String>,
    pub dropoff_address: Option<String>,
    pub status: DeliveryStatus,
    pub earnings: f64,
    pub distance: f64,
    pub created_at: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Delivery {
    /// Reads a delivery leniently: missing or mistyped fields fall back to
    /// empty values instead of failing.
    pub fn from_document(doc: &Document) -> Self {
        let text = |field: &str| doc.get_str(field).map(str::to_string);

        Self {
            id: doc.id.clone(),
            order_id: text("orderId").unwrap_or_default(),
            partner_id: text("partnerId").unwrap_or_default(),
            partner_name: text("partnerName"),
            customer_name: text("customerName"),
            pickup_address: text("pickupAddress"),
            dropoff_address: text("dropoffAddress"),
            status: DeliveryStatus::from(doc.get_str("status").unwrap_or_default()),
            earnings: doc.get_f64("earnings").unwrap_or(0.0),
            distance: doc.get_f64("distance").unwrap_or(0.0),
            created_at: doc.get_timestamp("createdAt"),
            start_time: doc.get_timestamp("startTime"),
            updated_at: doc.get_timestamp("updatedAt"),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == DeliveryStatus::Active
    }

    pub fn is_delivered(&self) -> bool {
        self.status == DeliveryStatus::Delivered
    }
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Delivery {}", self.id)?;
        writeln!(f, "  Order:    {}", self.order_id)?;
        match &self.partner_name {
            Some(name) => writeln!(f, "  Partner:  {} ({})", name, self.partner_id)?,
            None => writeln!(f, "  Partner:  {}", self.partner_id)?,
        }
        if let Some(customer) = &self.customer_name {
            writeln!(f, "  Customer: {}", customer)?;
        }
        if let (Some(pickup), Some(dropoff)) = (&self.pickup_address, &self.dropoff_address) {
            writeln!(f, "  Route:    {} -> {}", pickup, dropoff)?;
        }
        writeln!(f, "  Status:   {}", self.status)?;
        writeln!(f, "  Earnings: {:.2}", self.earnings)?;
        write!(f, "  Distance: {:.1}", self.distance)
    }
}

/// Fields for a delivery about to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDelivery {
    pub order_id: String,
    pub partner_id: String,
    pub partner_name: Option<String>,
    pub customer_name: Option<String>,
    pub pickup_address: Option<String>,
    pub dropoff_address: Option<String>,
    pub status: DeliveryStatus,
    pub earnings: f64,
    pub distance: f64,
}

impl NewDelivery {
    pub fn new(order_id: impl Into<String>, partner_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            partner_id: partner_id.into(),
            partner_name: None,
            customer_name: None,
            pickup_address: None,
            dropoff_address: None,
            status: DeliveryStatus::Active,
            earnings: 0.0,
            distance: 0.0,
        }
    }

    /// An active delivery of `order` by `partner`, paid at the partner's
    /// per-delivery rate (zero when the partner has none).
    pub fn for_assignment(order: &Order, partner: &DeliveryPartner) -> Self {
        Self {
            order_id: order.id.clone(),
            partner_id: partner.id.clone(),
            partner_name: Some(partner.name.clone()).filter(|n| !n.is_empty()),
            customer_name: order.customer_name.clone(),
            pickup_address: order.pickup_address.clone(),
            dropoff_address: order.dropoff_address.clone(),
            status: DeliveryStatus::Active,
            earnings: partner.rate_per_delivery.unwrap_or(0.0),
            distance: order.distance,
        }
    }

    pub fn with_status(mut self, status: DeliveryStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_earnings(mut self, earnings: f64) -> Self {
        self.earnings = earnings;
        self
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_partner_name(mut self, name: impl Into<String>) -> Self {
        self.partner_name = Some(name.into());
        self
    }

    pub fn into_fields(self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("orderId".into(), self.order_id.into());
        fields.insert("partnerId".into(), self.partner_id.into());
        fields.insert("status".into(), self.status.into());
        fields.insert("earnings".into(), FieldValue::Float(self.earnings));
        fields.insert("distance".into(), FieldValue::Float(self.distance));

        let optional = [
            ("partnerName", self.partner_name),
            ("customerName", self.customer_name),
            ("pickupAddress", self.pickup_address),
            ("dropoffAddress", self.dropoff_address),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                fields.insert(key.into(), value.into());
            }
        }

        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPartner;

    #[test]
    fn test_status_parsing_keeps_unknown_values() {
        assert_eq!(DeliveryStatus::from("active"), DeliveryStatus::Active);
        assert_eq!(DeliveryStatus::from("delivered"), DeliveryStatus::Delivered);
        let other = DeliveryStatus::from("returned");
        assert_eq!(other, DeliveryStatus::Other("returned".to_string()));
        assert_eq!(other.to_string(), "returned");
    }

    #[test]
    fn test_from_document_is_lenient() {
        let mut fields = Fields::new();
        fields.insert("orderId".into(), "o-1".into());
        fields.insert("status".into(), "delivered".into());
        fields.insert("earnings".into(), FieldValue::Int(12));
        fields.insert("distance".into(), "far".into());
        let doc = Document {
            id: "d1".to_string(),
            fields,
        };

        let delivery = Delivery::from_document(&doc);
        assert_eq!(delivery.order_id, "o-1");
        assert_eq!(delivery.partner_id, "");
        assert!(delivery.is_delivered());
        assert_eq!(delivery.earnings, 12.0);
        assert_eq!(delivery.distance, 0.0);
        assert!(delivery.start_time.is_none());
    }

    #[test]
    fn test_assignment_uses_partner_rate() {
        let order = Order::new("o-7")
            .with_customer("Dana")
            .with_route("Depot", "Main St 4")
            .with_distance(3.5);
        let partner = DeliveryPartner::from_new(
            "p1",
            NewPartner::new("Ana", "ana@example.com").with_rate(7.25),
        );

        let new = NewDelivery::for_assignment(&order, &partner);
        assert_eq!(new.status, DeliveryStatus::Active);
        assert_eq!(new.earnings, 7.25);
        assert_eq!(new.distance, 3.5);
        assert_eq!(new.partner_name.as_deref(), Some("Ana"));
        assert_eq!(new.customer_name.as_deref(), Some("Dana"));
    }

    #[test]
    fn test_assignment_without_rate_earns_zero() {
        let partner = DeliveryPartner::from_new("p1", NewPartner::new("Ana", "ana@example.com"));
        let new = NewDelivery::for_assignment(&Order::new("o-1"), &partner);
        assert_eq!(new.earnings, 0.0);
    }

    #[test]
    fn test_into_fields_skips_missing_optionals() {
        let fields = NewDelivery::new("o-1", "p-1").into_fields();
        assert_eq!(fields.get("status"), Some(&FieldValue::from("active")));
        assert!(!fields.contains_key("customerName"));
        assert!(!fields.contains_key("createdAt"));
    }
}
