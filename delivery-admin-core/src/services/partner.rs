use std::sync::Arc;

use super::ServiceError;
use crate::models::{
    DeliveryPartner, NewPartner, PartnerStats, PartnerStatus, PartnerUpdate, DELIVERY_PARTNERS,
};
use crate::store::{
    Direction, Document, DocumentStore, FieldValue, Fields, Query, Subscription, WriteBatch,
};

/// CRUD, approval and realtime over the `deliveryPartners` collection.
#[derive(Clone)]
pub struct PartnerService {
    store: Arc<dyn DocumentStore>,
}

impl PartnerService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn stamped(mut fields: Fields) -> Fields {
        fields.insert("updatedAt".into(), FieldValue::ServerTimestamp);
        fields
    }

    async fn merge(&self, id: &str, fields: Fields) -> Result<(), ServiceError> {
        self.store
            .update(DELIVERY_PARTNERS, id, Self::stamped(fields))
            .await
            .map_err(|e| ServiceError::from_store("Partner", e))
    }

    /// Calls `on_change` with every partner, newest first, now and after
    /// each change.
    pub fn subscribe<F>(&self, on_change: F) -> Result<Subscription, ServiceError>
    where
        F: Fn(Vec<DeliveryPartner>) + Send + Sync + 'static,
    {
        let query =
            Query::collection(DELIVERY_PARTNERS).order_by("createdAt", Direction::Descending);
        let subscription = self.store.subscribe(
            query,
            Arc::new(move |docs: Vec<Document>| {
                on_change(docs.iter().map(DeliveryPartner::from_document).collect())
            }),
        )?;
        tracing::debug!(subscription = subscription.id(), "Subscribed to partners");
        Ok(subscription)
    }

    /// Registers a partner with default approval, status and counters.
    pub async fn create(&self, partner: NewPartner) -> Result<String, ServiceError> {
        let mut fields = partner.into_fields();
        fields.insert("createdAt".into(), FieldValue::ServerTimestamp);

        let id = self
            .store
            .add(DELIVERY_PARTNERS, Self::stamped(fields))
            .await?;
        tracing::info!(partner = %id, "Partner registered");
        Ok(id)
    }

    /// Reads one partner. A missing partner is `Ok(None)`.
    pub async fn get(&self, id: &str) -> Result<Option<DeliveryPartner>, ServiceError> {
        let doc = self.store.get(DELIVERY_PARTNERS, id).await?;
        Ok(doc.map(|d| DeliveryPartner::from_document(&d)))
    }

    pub async fn update(&self, id: &str, update: PartnerUpdate) -> Result<(), ServiceError> {
        self.merge(id, update.into_fields()).await?;
        tracing::info!(partner = id, "Partner updated");
        Ok(())
    }

    pub async fn set_approval(&self, id: &str, approved: bool) -> Result<(), ServiceError> {
        let mut fields = Fields::new();
        fields.insert("isApproved".into(), approved.into());
        self.merge(id, fields).await?;
        tracing::info!(partner = id, approved, "Partner approval changed");
        Ok(())
    }

    pub async fn set_status(&self, id: &str, status: PartnerStatus) -> Result<(), ServiceError> {
        let mut fields = Fields::new();
        fields.insert("status".into(), status.clone().into());
        self.merge(id, fields).await?;
        tracing::info!(partner = id, status = %status, "Partner status changed");
        Ok(())
    }

    /// Sets `status` on every partner in `ids` in one atomic batch.
    pub async fn bulk_set_status(
        &self,
        ids: &[String],
        status: PartnerStatus,
    ) -> Result<(), ServiceError> {
        let mut batch = WriteBatch::new();
        for id in ids {
            let mut fields = Fields::new();
            fields.insert("status".into(), status.clone().into());
            batch.update(DELIVERY_PARTNERS, id.as_str(), Self::stamped(fields));
        }

        self.store
            .commit(batch)
            .await
            .map_err(|e| ServiceError::from_store("Partner", e))?;

        tracing::info!(count = ids.len(), status = %status, "Partner statuses updated");
        Ok(())
    }

    /// Every partner, in storage order.
    pub async fn get_all(&self) -> Result<Vec<DeliveryPartner>, ServiceError> {
        let docs = self
            .store
            .query(&Query::collection(DELIVERY_PARTNERS))
            .await?;
        Ok(docs.iter().map(DeliveryPartner::from_document).collect())
    }

    pub async fn statistics(&self) -> Result<PartnerStats, ServiceError> {
        let partners = self.get_all().await?;
        Ok(PartnerStats::tally(&partners))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;
    use std::sync::Mutex;

    fn service() -> PartnerService {
        PartnerService::new(Arc::new(LocalStore::in_memory()))
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let service = service();
        let id = service
            .create(NewPartner::new("Ana", "ana@example.com").with_phone("555-0101"))
            .await
            .unwrap();

        let partner = service.get(&id).await.unwrap().unwrap();
        assert_eq!(partner.name, "Ana");
        assert_eq!(partner.phone.as_deref(), Some("555-0101"));
        assert!(!partner.is_approved);
        assert_eq!(partner.status, PartnerStatus::Inactive);
        assert_eq!(partner.rating, 0.0);
        assert_eq!(partner.total_deliveries, 0);
        assert!(partner.created_at.is_some());
        assert_eq!(partner.created_at, partner.updated_at);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let service = service();
        assert!(service.get("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_merges_and_stamps() {
        let service = service();
        let id = service
            .create(NewPartner::new("Ana", "ana@example.com").with_profile_field("city", "Porto"))
            .await
            .unwrap();
        let before = service.get(&id).await.unwrap().unwrap();

        service
            .update(&id, PartnerUpdate::new().rating(4.7).field("vehicle", "scooter"))
            .await
            .unwrap();

        let after = service.get(&id).await.unwrap().unwrap();
        assert_eq!(after.name, "Ana");
        assert_eq!(after.rating, 4.7);
        assert_eq!(after.profile.get("city"), Some(&FieldValue::from("Porto")));
        assert_eq!(after.profile.get("vehicle"), Some(&FieldValue::from("scooter")));
        assert!(after.updated_at > before.updated_at);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_fails() {
        let service = service();
        let err = service
            .update("nobody", PartnerUpdate::new().name("X"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { kind: "Partner", .. }));
    }

    #[tokio::test]
    async fn test_approval_and_status() {
        let service = service();
        let id = service
            .create(NewPartner::new("Ana", "ana@example.com"))
            .await
            .unwrap();

        service.set_approval(&id, true).await.unwrap();
        service.set_status(&id, PartnerStatus::Active).await.unwrap();

        let partner = service.get(&id).await.unwrap().unwrap();
        assert!(partner.is_approved);
        assert!(partner.is_active());
    }

    #[tokio::test]
    async fn test_bulk_set_status_is_atomic() {
        let service = service();
        let a = service.create(NewPartner::new("A", "a@x.io")).await.unwrap();
        let b = service.create(NewPartner::new("B", "b@x.io")).await.unwrap();

        let err = service
            .bulk_set_status(&[a.clone(), "gone".into(), b.clone()], PartnerStatus::Active)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(service.statistics().await.unwrap().active, 0);

        service
            .bulk_set_status(&[a, b], PartnerStatus::Active)
            .await
            .unwrap();
        assert_eq!(service.statistics().await.unwrap().active, 2);
    }

    #[tokio::test]
    async fn test_get_all_and_statistics() {
        let service = service();
        let a = service.create(NewPartner::new("A", "a@x.io")).await.unwrap();
        service.create(NewPartner::new("B", "b@x.io")).await.unwrap();
        service.set_approval(&a, true).await.unwrap();
        service
            .update(&a, PartnerUpdate::new().rating(5.0))
            .await
            .unwrap();

        assert_eq!(service.get_all().await.unwrap().len(), 2);

        let stats = service.statistics().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.approved, 1);
        assert_eq!(stats.pending_approval, 1);
        assert_eq!(stats.average_rating, Some(5.0));
    }

    #[tokio::test]
    async fn test_subscribe_newest_first() {
        let service = service();
        let names: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&names);

        let _subscription = service
            .subscribe(move |partners| {
                *sink.lock().unwrap() = partners.into_iter().map(|p| p.name).collect();
            })
            .unwrap();

        service.create(NewPartner::new("First", "1@x.io")).await.unwrap();
        service.create(NewPartner::new("Second", "2@x.io")).await.unwrap();

        assert_eq!(*names.lock().unwrap(), vec!["Second".to_string(), "First".to_string()]);
    }
}
