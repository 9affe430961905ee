use chrono::{Local, NaiveDate};
use std::sync::Arc;

use super::ServiceError;
use crate::models::{
    Delivery, DeliveryPartner, DeliveryStats, DeliveryStatus, NewDelivery, Order, DELIVERIES,
};
use crate::store::{
    Direction, Document, DocumentStore, FieldValue, Fields, Query, Subscription, WriteBatch,
};

/// CRUD, realtime and statistics over the `deliveries` collection.
#[derive(Clone)]
pub struct DeliveryService {
    store: Arc<dyn DocumentStore>,
}

impl DeliveryService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn newest_first() -> Query {
        Query::collection(DELIVERIES).order_by("createdAt", Direction::Descending)
    }

    fn status_fields(status: &DeliveryStatus) -> Fields {
        let mut fields = Fields::new();
        fields.insert("status".into(), status.clone().into());
        fields.insert("updatedAt".into(), FieldValue::ServerTimestamp);
        fields
    }

    /// Calls `on_change` with every delivery, newest first, now and after
    /// each change. Delivery stops when the returned handle is dropped.
    pub fn subscribe<F>(&self, on_change: F) -> Result<Subscription, ServiceError>
    where
        F: Fn(Vec<Delivery>) + Send + Sync + 'static,
    {
        let subscription = self.store.subscribe(
            Self::newest_first(),
            Arc::new(move |docs: Vec<Document>| {
                on_change(docs.iter().map(Delivery::from_document).collect())
            }),
        )?;
        tracing::debug!(subscription = subscription.id(), "Subscribed to deliveries");
        Ok(subscription)
    }

    /// Every delivery, newest first.
    pub async fn list(&self) -> Result<Vec<Delivery>, ServiceError> {
        let docs = self.store.query(&Self::newest_first()).await?;
        Ok(docs.iter().map(Delivery::from_document).collect())
    }

    /// Deliveries assigned to `partner_id`, newest first.
    pub async fn for_partner(&self, partner_id: &str) -> Result<Vec<Delivery>, ServiceError> {
        let query = Self::newest_first().where_eq("partnerId", partner_id);
        let docs = self.store.query(&query).await?;
        Ok(docs.iter().map(Delivery::from_document).collect())
    }

    pub async fn get(&self, id: &str) -> Result<Delivery, ServiceError> {
        self.store
            .get(DELIVERIES, id)
            .await?
            .map(|doc| Delivery::from_document(&doc))
            .ok_or_else(|| ServiceError::NotFound {
                kind: "Delivery",
                id: id.to_string(),
            })
    }

    /// Creates a delivery stamped with creation and start times. Returns its id.
    pub async fn create(&self, delivery: NewDelivery) -> Result<String, ServiceError> {
        let mut fields = delivery.into_fields();
        fields.insert("createdAt".into(), FieldValue::ServerTimestamp);
        fields.insert("startTime".into(), FieldValue::ServerTimestamp);

        let id = self.store.add(DELIVERIES, fields).await?;
        tracing::info!(delivery = %id, "Delivery created");
        Ok(id)
    }

    /// Writes a new status. Fails if the delivery does not exist.
    pub async fn update_status(
        &self,
        id: &str,
        status: DeliveryStatus,
    ) -> Result<(), ServiceError> {
        self.store
            .update(DELIVERIES, id, Self::status_fields(&status))
            .await
            .map_err(|e| ServiceError::from_store("Delivery", e))?;

        tracing::info!(delivery = id, status = %status, "Delivery status updated");
        Ok(())
    }

    /// Creates an active delivery of `order` by `partner`.
    pub async fn assign_partner(
        &self,
        order: &Order,
        partner: &DeliveryPartner,
    ) -> Result<String, ServiceError> {
        let id = self
            .create(NewDelivery::for_assignment(order, partner))
            .await?;
        tracing::info!(
            order = %order.id,
            partner = %partner.id,
            delivery = %id,
            "Partner assigned"
        );
        Ok(id)
    }

    /// Sets `status` on every delivery in `ids` in one atomic batch.
    pub async fn bulk_update_status(
        &self,
        ids: &[String],
        status: DeliveryStatus,
    ) -> Result<(), ServiceError> {
        let mut batch = WriteBatch::new();
        for id in ids {
            batch.update(DELIVERIES, id.as_str(), Self::status_fields(&status));
        }

        self.store
            .commit(batch)
            .await
            .map_err(|e| ServiceError::from_store("Delivery", e))?;

        tracing::info!(count = ids.len(), status = %status, "Delivery statuses updated");
        Ok(())
    }

    /// Statistics for the current local day.
    pub async fn statistics(&self) -> Result<DeliveryStats, ServiceError> {
        self.statistics_on(Local::now().date_naive()).await
    }

    /// Statistics counting deliveries started on `today`.
    pub async fn statistics_on(&self, today: NaiveDate) -> Result<DeliveryStats, ServiceError> {
        let docs = self.store.query(&Query::collection(DELIVERIES)).await?;
        let deliveries: Vec<Delivery> = docs.iter().map(Delivery::from_document).collect();
        Ok(DeliveryStats::tally(&deliveries, today))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPartner;
    use crate::store::LocalStore;
    use std::sync::Mutex;

    fn service() -> (DeliveryService, Arc<LocalStore>) {
        let store = Arc::new(LocalStore::in_memory());
        (DeliveryService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_create_stamps_times() {
        let (service, _) = service();
        let id = service
            .create(NewDelivery::new("o-1", "p-1").with_earnings(8.0))
            .await
            .unwrap();

        let delivery = service.get(&id).await.unwrap();
        assert_eq!(delivery.order_id, "o-1");
        assert_eq!(delivery.status, DeliveryStatus::Active);
        assert!(delivery.created_at.is_some());
        assert_eq!(delivery.created_at, delivery.start_time);
    }

    #[tokio::test]
    async fn test_update_status_unknown_id_fails() {
        let (service, store) = service();
        for id in ["missing", "", "d-404"] {
            let result = service.update_status(id, DeliveryStatus::Delivered).await;
            assert!(matches!(
                result,
                Err(ServiceError::NotFound { kind: "Delivery", id: ref got }) if got == id
            ));
            assert!(store.get(DELIVERIES, id).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_update_status() {
        let (service, _) = service();
        let id = service.create(NewDelivery::new("o-1", "p-1")).await.unwrap();

        service
            .update_status(&id, DeliveryStatus::Delivered)
            .await
            .unwrap();

        let delivery = service.get(&id).await.unwrap();
        assert!(delivery.is_delivered());
        assert!(delivery.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_for_partner_filters_newest_first() {
        let (service, _store) = service();
        let first = service.create(NewDelivery::new("o-1", "p-1")).await.unwrap();
        service.create(NewDelivery::new("o-2", "p-2")).await.unwrap();
        let third = service.create(NewDelivery::new("o-3", "p-1")).await.unwrap();

        let ids: Vec<String> = service
            .for_partner("p-1")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![third, first]);
        assert!(service.for_partner("p-9").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_fails() {
        let (service, _) = service();
        let err = service.get("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_assign_partner() {
        let (service, store) = service();
        let partner_id = store
            .add(
                crate::models::DELIVERY_PARTNERS,
                NewPartner::new("Ana", "ana@example.com").with_rate(6.0).into_fields(),
            )
            .await
            .unwrap();
        let partner_doc = store
            .get(crate::models::DELIVERY_PARTNERS, &partner_id)
            .await
            .unwrap()
            .unwrap();
        let partner = DeliveryPartner::from_document(&partner_doc);

        let id = service
            .assign_partner(&Order::new("o-9").with_distance(2.0), &partner)
            .await
            .unwrap();

        let delivery = service.get(&id).await.unwrap();
        assert_eq!(delivery.partner_id, partner_id);
        assert_eq!(delivery.order_id, "o-9");
        assert_eq!(delivery.earnings, 6.0);
        assert!(delivery.is_active());
    }

    #[tokio::test]
    async fn test_bulk_update_status_updates_all() {
        let (service, _) = service();
        let mut ids = Vec::new();
        for n in 0..4 {
            ids.push(
                service
                    .create(NewDelivery::new(format!("o-{}", n), "p-1"))
                    .await
                    .unwrap(),
            );
        }

        service
            .bulk_update_status(&ids, DeliveryStatus::Delivered)
            .await
            .unwrap();

        for id in &ids {
            assert!(service.get(id).await.unwrap().is_delivered());
        }
    }

    #[tokio::test]
    async fn test_bulk_update_status_is_atomic() {
        let (service, _) = service();
        let a = service.create(NewDelivery::new("o-1", "p-1")).await.unwrap();
        let b = service.create(NewDelivery::new("o-2", "p-1")).await.unwrap();

        let ids = vec![a.clone(), "ghost".to_string(), b.clone()];
        let err = service
            .bulk_update_status(&ids, DeliveryStatus::Delivered)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { ref id, .. } if id == "ghost"));

        for id in [&a, &b] {
            assert!(service.get(id).await.unwrap().is_active());
        }
    }

    #[tokio::test]
    async fn test_bulk_update_with_no_ids_is_noop() {
        let (service, _) = service();
        service
            .bulk_update_status(&[], DeliveryStatus::Delivered)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_subscribe_pushes_newest_first() {
        let (service, _) = service();
        let seen: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let subscription = service
            .subscribe(move |deliveries| {
                sink.lock()
                    .unwrap()
                    .push(deliveries.into_iter().map(|d| d.order_id).collect());
            })
            .unwrap();

        service.create(NewDelivery::new("o-1", "p-1")).await.unwrap();
        service.create(NewDelivery::new("o-2", "p-1")).await.unwrap();
        drop(subscription);
        service.create(NewDelivery::new("o-3", "p-1")).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen[0].is_empty());
        assert_eq!(seen[2], vec!["o-2".to_string(), "o-1".to_string()]);
    }

    #[tokio::test]
    async fn test_statistics_counts_today() {
        let (service, _) = service();
        service.create(NewDelivery::new("o-1", "p-1")).await.unwrap();
        let done = service
            .create(NewDelivery::new("o-2", "p-1").with_earnings(10.0))
            .await
            .unwrap();
        service
            .update_status(&done, DeliveryStatus::Delivered)
            .await
            .unwrap();

        let today = service.get(&done).await.unwrap().start_time.unwrap();
        let stats = service
            .statistics_on(today.with_timezone(&Local).date_naive())
            .await
            .unwrap();

        assert_eq!(stats.total, 2);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.delivered_today, 1);
        assert_eq!(stats.total_earnings, 10.0);
    }
}
