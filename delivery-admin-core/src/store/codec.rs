//! Encoding documents into collection Automerge documents and back.
//!
//! A collection document's root is a map of document id to a map of fields.
//! Timestamps are stored as Automerge timestamp scalars (epoch millis).

use automerge::{
    transaction::Transactable, AutoCommit, ObjId, ObjType, ReadDoc, ScalarValue, Value, ROOT,
};

use super::error::StoreError;
use super::value::{timestamp_from_millis, FieldValue, Fields};
use super::Document;

/// Writes a document at root[id], replacing any previous content.
pub fn write_document(doc: &mut AutoCommit, id: &str, fields: &Fields) -> Result<(), StoreError> {
    let obj = doc.put_object(ROOT, id, ObjType::Map)?;
    write_fields(doc, &obj, fields)
}

/// Merges top-level fields into an existing document.
///
/// Returns `Ok(false)` when no document exists at root[id].
pub fn merge_document(doc: &mut AutoCommit, id: &str, fields: &Fields) -> Result<bool, StoreError> {
    let obj = match doc.get(ROOT, id)? {
        Some((Value::Object(ObjType::Map), obj)) => obj,
        _ => return Ok(false),
    };

    write_fields(doc, &obj, fields)?;
    Ok(true)
}

/// Reads a single document by id.
pub fn read_document(doc: &AutoCommit, id: &str) -> Result<Option<Document>, StoreError> {
    match doc.get(ROOT, id)? {
        Some((Value::Object(ObjType::Map), obj)) => Ok(Some(Document {
            id: id.to_string(),
            fields: read_fields(doc, &obj)?,
        })),
        _ => Ok(None),
    }
}

/// Reads every document in a collection, in key order.
pub fn read_all_documents(doc: &AutoCommit) -> Result<Vec<Document>, StoreError> {
    let mut documents = Vec::new();

    for key in doc.keys(ROOT) {
        if let Some(document) = read_document(doc, &key)? {
            documents.push(document);
        }
    }

    Ok(documents)
}

fn write_fields(doc: &mut AutoCommit, obj: &ObjId, fields: &Fields) -> Result<(), StoreError> {
    for (key, value) in fields {
        put_value(doc, obj, key, value)?;
    }
    Ok(())
}

fn put_value(
    doc: &mut AutoCommit,
    obj: &ObjId,
    key: &str,
    value: &FieldValue,
) -> Result<(), StoreError> {
    match value {
        FieldValue::Null => doc.put(obj, key, ScalarValue::Null)?,
        FieldValue::Bool(b) => doc.put(obj, key, *b)?,
        FieldValue::Int(i) => doc.put(obj, key, *i)?,
        FieldValue::Float(f) => doc.put(obj, key, *f)?,
        FieldValue::String(s) => doc.put(obj, key, s.as_str())?,
        FieldValue::Timestamp(ts) => {
            doc.put(obj, key, ScalarValue::Timestamp(ts.timestamp_millis()))?
        }
        FieldValue::List(items) => {
            let list = doc.put_object(obj, key, ObjType::List)?;
            for (i, item) in items.iter().enumerate() {
                insert_value(doc, &list, i, key, item)?;
            }
        }
        FieldValue::Map(fields) => {
            let map = doc.put_object(obj, key, ObjType::Map)?;
            write_fields(doc, &map, fields)?;
        }
        FieldValue::ServerTimestamp => {
            return Err(StoreError::UnresolvedTimestamp(key.to_string()))
        }
    }
    Ok(())
}

fn insert_value(
    doc: &mut AutoCommit,
    list: &ObjId,
    index: usize,
    key: &str,
    value: &FieldValue,
) -> Result<(), StoreError> {
    match value {
        FieldValue::Null => doc.insert(list, index, ScalarValue::Null)?,
        FieldValue::Bool(b) => doc.insert(list, index, *b)?,
        FieldValue::Int(i) => doc.insert(list, index, *i)?,
        FieldValue::Float(f) => doc.insert(list, index, *f)?,
        FieldValue::String(s) => doc.insert(list, index, s.as_str())?,
        FieldValue::Timestamp(ts) => {
            doc.insert(list, index, ScalarValue::Timestamp(ts.timestamp_millis()))?
        }
        FieldValue::List(items) => {
            let nested = doc.insert_object(list, index, ObjType::List)?;
            for (i, item) in items.iter().enumerate() {
                insert_value(doc, &nested, i, key, item)?;
            }
        }
        FieldValue::Map(fields) => {
            let map = doc.insert_object(list, index, ObjType::Map)?;
            write_fields(doc, &map, fields)?;
        }
        FieldValue::ServerTimestamp => {
            return Err(StoreError::UnresolvedTimestamp(key.to_string()))
        }
    }
    Ok(())
}

fn read_fields(doc: &AutoCommit, obj: &ObjId) -> Result<Fields, StoreError> {
    let mut fields = Fields::new();

    for key in doc.keys(obj) {
        if let Some((value, child)) = doc.get(obj, key.as_str())? {
            let value = read_value(doc, value, &child)?;
            fields.insert(key, value);
        }
    }

    Ok(fields)
}

fn read_value(doc: &AutoCommit, value: Value<'_>, obj: &ObjId) -> Result<FieldValue, StoreError> {
    match value {
        Value::Object(ObjType::List) => {
            let mut items = Vec::new();
            for i in 0..doc.length(obj) {
                if let Some((item, child)) = doc.get(obj, i)? {
                    items.push(read_value(doc, item, &child)?);
                }
            }
            Ok(FieldValue::List(items))
        }
        Value::Object(ObjType::Text) => Ok(FieldValue::String(doc.text(obj)?)),
        Value::Object(_) => Ok(FieldValue::Map(read_fields(doc, obj)?)),
        Value::Scalar(scalar) => Ok(read_scalar(scalar.as_ref())),
    }
}

fn read_scalar(scalar: &ScalarValue) -> FieldValue {
    match scalar {
        ScalarValue::Str(s) => FieldValue::String(s.to_string()),
        ScalarValue::Int(i) => FieldValue::Int(*i),
        ScalarValue::Uint(u) => FieldValue::Int(i64::try_from(*u).unwrap_or(i64::MAX)),
        ScalarValue::F64(f) => FieldValue::Float(*f),
        ScalarValue::Boolean(b) => FieldValue::Bool(*b),
        ScalarValue::Timestamp(millis) => timestamp_from_millis(*millis)
            .map(FieldValue::Timestamp)
            .unwrap_or(FieldValue::Null),
        _ => FieldValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_fields() -> Fields {
        let mut address = Fields::new();
        address.insert("city".into(), "Lisbon".into());

        let mut fields = Fields::new();
        fields.insert("status".into(), "active".into());
        fields.insert("earnings".into(), FieldValue::Float(12.5));
        fields.insert("stops".into(), FieldValue::Int(3));
        fields.insert("fragile".into(), FieldValue::Bool(false));
        fields.insert("note".into(), FieldValue::Null);
        fields.insert(
            "createdAt".into(),
            FieldValue::Timestamp(Utc.with_ymd_and_hms(2025, 2, 1, 8, 30, 0).unwrap()),
        );
        fields.insert(
            "tags".into(),
            FieldValue::List(vec!["express".into(), FieldValue::Int(2)]),
        );
        fields.insert("address".into(), FieldValue::Map(address));
        fields
    }

    #[test]
    fn test_write_and_read_document() {
        let mut doc = AutoCommit::new();
        let fields = sample_fields();

        write_document(&mut doc, "d1", &fields).unwrap();

        let read = read_document(&doc, "d1").unwrap().unwrap();
        assert_eq!(read.id, "d1");
        assert_eq!(read.fields, fields);
    }

    #[test]
    fn test_read_missing_document() {
        let doc = AutoCommit::new();
        assert!(read_document(&doc, "nope").unwrap().is_none());
    }

    #[test]
    fn test_merge_overwrites_only_given_fields() {
        let mut doc = AutoCommit::new();
        write_document(&mut doc, "d1", &sample_fields()).unwrap();

        let mut patch = Fields::new();
        patch.insert("status".into(), "delivered".into());
        assert!(merge_document(&mut doc, "d1", &patch).unwrap());

        let read = read_document(&doc, "d1").unwrap().unwrap();
        assert_eq!(read.fields["status"], FieldValue::from("delivered"));
        assert_eq!(read.fields["earnings"], FieldValue::Float(12.5));
    }

    #[test]
    fn test_merge_missing_document() {
        let mut doc = AutoCommit::new();
        let mut patch = Fields::new();
        patch.insert("status".into(), "delivered".into());

        assert!(!merge_document(&mut doc, "ghost", &patch).unwrap());
        assert!(read_document(&doc, "ghost").unwrap().is_none());
    }

    #[test]
    fn test_unresolved_server_timestamp_rejected() {
        let mut doc = AutoCommit::new();
        let mut fields = Fields::new();
        fields.insert("createdAt".into(), FieldValue::ServerTimestamp);

        let result = write_document(&mut doc, "d1", &fields);
        assert!(matches!(result, Err(StoreError::UnresolvedTimestamp(f)) if f == "createdAt"));
    }

    #[test]
    fn test_read_all_documents_in_key_order() {
        let mut doc = AutoCommit::new();
        write_document(&mut doc, "b", &Fields::new()).unwrap();
        write_document(&mut doc, "a", &Fields::new()).unwrap();

        let ids: Vec<String> = read_all_documents(&doc)
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
