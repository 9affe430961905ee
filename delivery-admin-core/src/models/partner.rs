use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::store::{Document, FieldValue, Fields};

/// Whether a partner is currently taking deliveries.
///
/// Only `active` and `inactive` are written by this crate. Other stored
/// values are preserved in `Other`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PartnerStatus {
    Active,
    #[default]
    Inactive,
    Other(String),
}

impl PartnerStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PartnerStatus::Active => "active",
            PartnerStatus::Inactive => "inactive",
            PartnerStatus::Other(s) => s,
        }
    }

    fn lenient(s: &str) -> Self {
        s.parse()
            .unwrap_or_else(|_| PartnerStatus::Other(s.to_string()))
    }
}

/// Strict parse used for operator input: only `active` and `inactive`.
impl FromStr for PartnerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(PartnerStatus::Active),
            "inactive" => Ok(PartnerStatus::Inactive),
            _ => Err(format!(
                "Invalid partner status: '{}'. Valid values: active, inactive",
                s
            )),
        }
    }
}

impl From<String> for PartnerStatus {
    fn from(s: String) -> Self {
        PartnerStatus::lenient(&s)
    }
}

impl From<PartnerStatus> for String {
    fn from(status: PartnerStatus) -> Self {
        status.as_str().to_string()
    }
}

impl From<PartnerStatus> for FieldValue {
    fn from(status: PartnerStatus) -> Self {
        FieldValue::String(status.into())
    }
}

impl fmt::Display for PartnerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const KNOWN_FIELDS: &[&str] = &[
    "name",
    "email",
    "phone",
    "ratePerDelivery",
    "isApproved",
    "status",
    "rating",
    "totalDeliveries",
    "createdAt",
    "updatedAt",
];

/// A delivery partner as read from the `deliveryPartners` collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPartner {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub rate_per_delivery: Option<f64>,
    pub is_approved: bool,
    pub status: PartnerStatus,
    pub rating: f64,
    pub total_deliveries: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Additional profile fields, kept verbatim.
    #[serde(flatten)]
    pub profile: Fields,
}

impl DeliveryPartner {
    pub fn from_document(doc: &Document) -> Self {
        let profile = doc
            .fields
            .iter()
            .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            id: doc.id.clone(),
            name: doc.get_str("name").unwrap_or_default().to_string(),
            email: doc.get_str("email").unwrap_or_default().to_string(),
            phone: doc.get_str("phone").map(str::to_string),
            rate_per_delivery: doc.get_f64("ratePerDelivery"),
            is_approved: doc.get_bool("isApproved").unwrap_or(false),
            status: doc
                .get_str("status")
                .map(PartnerStatus::lenient)
                .unwrap_or_default(),
            rating: doc.get_f64("rating").unwrap_or(0.0),
            total_deliveries: doc.get_i64("totalDeliveries").unwrap_or(0),
            created_at: doc.get_timestamp("createdAt"),
            updated_at: doc.get_timestamp("updatedAt"),
            profile,
        }
    }

    /// The partner a registration would produce, before the store stamps it.
    pub fn from_new(id: impl Into<String>, new: NewPartner) -> Self {
        Self::from_document(&Document {
            id: id.into(),
            fields: new.into_fields(),
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == PartnerStatus::Active
    }
}

impl fmt::Display for DeliveryPartner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.name, self.id)?;
        writeln!(f, "  Email:      {}", self.email)?;
        if let Some(phone) = &self.phone {
            writeln!(f, "  Phone:      {}", phone)?;
        }
        writeln!(
            f,
            "  Approved:   {}",
            if self.is_approved { "yes" } else { "no" }
        )?;
        writeln!(f, "  Status:     {}", self.status)?;
        if let Some(rate) = self.rate_per_delivery {
            writeln!(f, "  Rate:       {:.2}", rate)?;
        }
        writeln!(f, "  Rating:     {:.1}", self.rating)?;
        write!(f, "  Deliveries: {}", self.total_deliveries)?;
        for (key, value) in &self.profile {
            write!(f, "\n  {}: {}", key, serde_json::to_string(value).unwrap_or_default())?;
        }
        Ok(())
    }
}

/// Registration data for a new partner.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPartner {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub rate_per_delivery: Option<f64>,
    pub profile: Fields,
}

impl NewPartner {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: None,
            rate_per_delivery: None,
            profile: Fields::new(),
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate_per_delivery = Some(rate);
        self
    }

    pub fn with_profile_field(
        mut self,
        key: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Self {
        self.profile.insert(key.into(), value.into());
        self
    }

    /// Document fields with registration defaults: unapproved, inactive,
    /// zero rating and zero deliveries.
    pub fn into_fields(self) -> Fields {
        let mut fields = self.profile;
        fields.insert("name".into(), self.name.into());
        fields.insert("email".into(), self.email.into());
        if let Some(phone) = self.phone {
            fields.insert("phone".into(), phone.into());
        }
        if let Some(rate) = self.rate_per_delivery {
            fields.insert("ratePerDelivery".into(), FieldValue::Float(rate));
        }
        fields.insert("isApproved".into(), false.into());
        fields.insert("status".into(), PartnerStatus::Inactive.into());
        fields.insert("rating".into(), FieldValue::Float(0.0));
        fields.insert("totalDeliveries".into(), FieldValue::Int(0));
        fields
    }
}

/// A partial update to a partner's fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartnerUpdate {
    fields: Fields,
}

impl PartnerUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(self, name: impl Into<String>) -> Self {
        self.field("name", name.into())
    }

    pub fn email(self, email: impl Into<String>) -> Self {
        self.field("email", email.into())
    }

    pub fn phone(self, phone: impl Into<String>) -> Self {
        self.field("phone", phone.into())
    }

    pub fn rate_per_delivery(self, rate: f64) -> Self {
        self.field("ratePerDelivery", FieldValue::Float(rate))
    }

    pub fn rating(self, rating: f64) -> Self {
        self.field("rating", FieldValue::Float(rating))
    }

    /// Sets any field, including profile fields.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_fields(self) -> Fields {
        self.fields
    }
}
