use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::fmt;

use super::delivery::Delivery;
use super::partner::DeliveryPartner;

/// Dashboard totals over the deliveries collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStats {
    pub total: usize,
    pub active: usize,
    /// Delivered deliveries whose start time falls on `today` (local time).
    pub delivered_today: usize,
    /// Sum of earnings over every delivered delivery.
    pub total_earnings: f64,
}

impl DeliveryStats {
    pub fn tally<'a>(deliveries: impl IntoIterator<Item = &'a Delivery>, today: NaiveDate) -> Self {
        let mut stats = Self::default();

        for delivery in deliveries {
            stats.total += 1;

            if delivery.is_active() {
                stats.active += 1;
            }

            if delivery.is_delivered() {
                stats.total_earnings += delivery.earnings;

                let started_today = delivery
                    .start_time
                    .map(|start| start.with_timezone(&Local).date_naive() == today)
                    .unwrap_or(false);
                if started_today {
                    stats.delivered_today += 1;
                }
            }
        }

        stats
    }
}

impl fmt::Display for DeliveryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total deliveries: {}", self.total)?;
        writeln!(f, "Active:           {}", self.active)?;
        writeln!(f, "Delivered today:  {}", self.delivered_today)?;
        write!(f, "Total earnings:   {:.2}", self.total_earnings)
    }
}

/// Totals over the delivery partners collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerStats {
    pub total: usize,
    pub approved: usize,
    pub pending_approval: usize,
    pub active: usize,
    /// Mean rating over partners with a non-zero rating.
    pub average_rating: Option<f64>,
}

impl PartnerStats {
    pub fn tally<'a>(partners: impl IntoIterator<Item = &'a DeliveryPartner>) -> Self {
        let mut stats = Self::default();
        let mut rating_sum = 0.0;
        let mut rated = 0usize;

        for partner in partners {
            stats.total += 1;
            if partner.is_approved {
                stats.approved += 1;
            } else {
                stats.pending_approval += 1;
            }
            if partner.is_active() {
                stats.active += 1;
            }
            if partner.rating > 0.0 {
                rating_sum += partner.rating;
                rated += 1;
            }
        }

        if rated > 0 {
            stats.average_rating = Some(rating_sum / rated as f64);
        }
        stats
    }
}

impl fmt::Display for PartnerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total partners:   {}", self.total)?;
        writeln!(f, "Approved:         {}", self.approved)?;
        writeln!(f, "Pending approval: {}", self.pending_approval)?;
        writeln!(f, "Active:           {}", self.active)?;
        match self.average_rating {
            Some(rating) => write!(f, "Average rating:   {:.2}", rating),
            None => write!(f, "Average rating:   -"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeliveryStatus, NewPartner, PartnerStatus};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn local_noon(date: NaiveDate) -> DateTime<Utc> {
        Local
            .from_local_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn delivery(
        id: &str,
        status: DeliveryStatus,
        earnings: f64,
        start: Option<DateTime<Utc>>,
    ) -> Delivery {
        Delivery {
            id: id.to_string(),
            order_id: format!("order-{}", id),
            partner_id: "p1".to_string(),
            partner_name: None,
            customer_name: None,
            pickup_address: None,
            dropoff_address: None,
            status,
            earnings,
            distance: 0.0,
            created_at: start,
            start_time: start,
            updated_at: None,
        }
    }

    #[test]
    fn test_delivery_stats_fixture() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let yesterday = today - Duration::days(1);

        let deliveries = vec![
            delivery("a", DeliveryStatus::Active, 0.0, Some(local_noon(today))),
            delivery("b", DeliveryStatus::Delivered, 10.0, Some(local_noon(today))),
            delivery("c", DeliveryStatus::Delivered, 5.0, Some(local_noon(yesterday))),
        ];

        let stats = DeliveryStats::tally(&deliveries, today);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.delivered_today, 1);
        assert_eq!(stats.total_earnings, 15.0);
    }

    #[test]
    fn test_delivery_without_start_time_is_not_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let deliveries = vec![delivery("a", DeliveryStatus::Delivered, 3.0, None)];

        let stats = DeliveryStats::tally(&deliveries, today);
        assert_eq!(stats.delivered_today, 0);
        assert_eq!(stats.total_earnings, 3.0);
    }

    #[test]
    fn test_unknown_status_only_counts_toward_total() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let deliveries = vec![delivery(
            "a",
            DeliveryStatus::Other("cancelled".into()),
            9.0,
            Some(local_noon(today)),
        )];

        let stats = DeliveryStats::tally(&deliveries, today);
        assert_eq!(stats, DeliveryStats { total: 1, ..Default::default() });
    }

    #[test]
    fn test_partner_stats() {
        let mut ana = DeliveryPartner::from_new("p1", NewPartner::new("Ana", "a@x.io"));
        ana.is_approved = true;
        ana.status = PartnerStatus::Active;
        ana.rating = 4.0;
        let mut bea = DeliveryPartner::from_new("p2", NewPartner::new("Bea", "b@x.io"));
        bea.rating = 5.0;
        let cai = DeliveryPartner::from_new("p3", NewPartner::new("Cai", "c@x.io"));

        let stats = PartnerStats::tally(&[ana, bea, cai]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.approved, 1);
        assert_eq!(stats.pending_approval, 2);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.average_rating, Some(4.5));
    }

    #[test]
    fn test_partner_stats_empty() {
        let stats = PartnerStats::tally(&Vec::<DeliveryPartner>::new());
        assert_eq!(stats.total, 0);
        assert!(stats.average_rating.is_none());
    }
}
