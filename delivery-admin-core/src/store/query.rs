//! Collection queries: equality filters plus an optional single-field ordering.

use std::cmp::Ordering;

use super::value::FieldValue;
use super::Document;

/// Sort direction for an ordered query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A query over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    collection: String,
    filters: Vec<(String, FieldValue)>,
    order_by: Option<(String, Direction)>,
}

impl Query {
    /// Matches every document in `collection`, in key order.
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: None,
        }
    }

    /// Keeps only documents whose `field` equals `value`.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Orders results by `field`. Documents without the field are excluded.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    fn matches(&self, doc: &Document) -> bool {
        let filtered = self
            .filters
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected));

        let ordered = match &self.order_by {
            Some((field, _)) => doc.get(field).is_some(),
            None => true,
        };

        filtered && ordered
    }

    /// Applies filters and ordering to a collection snapshot.
    pub fn apply(&self, documents: Vec<Document>) -> Vec<Document> {
        let mut results: Vec<Document> = documents
            .into_iter()
            .filter(|doc| self.matches(doc))
            .collect();

        if let Some((field, direction)) = &self.order_by {
            results.sort_by(|a, b| {
                let ord = match (a.get(field), b.get(field)) {
                    (Some(x), Some(y)) => x.query_cmp(y),
                    _ => Ordering::Equal,
                };
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        results
    }
}
