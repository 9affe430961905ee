use serde::{Deserialize, Serialize};

/// An order waiting for a delivery partner. Orders live outside this crate;
/// only the fields copied onto a delivery are modeled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub customer_name: Option<String>,
    pub pickup_address: Option<String>,
    pub dropoff_address: Option<String>,
    #[serde(default)]
    pub distance: f64,
}

impl Order {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            customer_name: None,
            pickup_address: None,
            dropoff_address: None,
            distance: 0.0,
        }
    }

    pub fn with_customer(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    pub fn with_route(mut self, pickup: impl Into<String>, dropoff: impl Into<String>) -> Self {
        self.pickup_address = Some(pickup.into());
        self.dropoff_address = Some(dropoff.into());
        self
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }
}
