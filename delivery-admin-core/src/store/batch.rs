//! Atomic multi-document writes.

use super::value::Fields;

/// A single mutation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Create or overwrite a document.
    Set {
        collection: String,
        id: String,
        fields: Fields,
    },
    /// Merge fields into an existing document. Fails if the document is absent.
    Update {
        collection: String,
        id: String,
        fields: Fields,
    },
}

impl BatchOp {
    pub fn collection(&self) -> &str {
        match self {
            BatchOp::Set { collection, .. } | BatchOp::Update { collection, .. } => collection,
        }
    }
}

/// A set of mutations committed as one unit: either all apply or none do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        &mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        fields: Fields,
    ) -> &mut Self {
        self.ops.push(BatchOp::Set {
            collection: collection.into(),
            id: id.into(),
            fields,
        });
        self
    }

    pub fn update(
        &mut self,
        collection: impl Into<String>,
        id: impl Into<String>,
        fields: Fields,
    ) -> &mut Self {
        self.ops.push(BatchOp::Update {
            collection: collection.into(),
            id: id.into(),
            fields,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_collects_ops_in_order() {
        let mut batch = WriteBatch::new();
        batch
            .set("deliveries", "a", Fields::new())
            .update("deliveryPartners", "b", Fields::new());

        assert_eq!(batch.len(), 2);
        let ops = batch.into_ops();
        assert!(matches!(&ops[0], BatchOp::Set { id, .. } if id == "a"));
        assert_eq!(ops[1].collection(), "deliveryPartners");
    }
}
