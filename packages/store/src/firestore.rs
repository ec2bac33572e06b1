//! Firestore REST backend.
//!
//! Talks to `firestore.googleapis.com` directly over HTTPS instead of
//! going through an SDK, so the only moving part is a [`reqwest::Client`].
//! Firestore wraps every field in a typed value envelope
//! (`{"stringValue": ...}`, `{"mapValue": ...}`, ...); the codec at the
//! bottom of this module converts between that representation and plain
//! JSON so the rest of the system never sees it.
//!
//! See <https://firebase.google.com/docs/firestore/use-rest-api>

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::{Document, DocumentStore, StoreError};

const FIRESTORE_HOST: &str = "https://firestore.googleapis.com/v1";

/// Firestore caps `pageSize` at 300; one page per round trip beyond that.
const PAGE_SIZE: u32 = 300;

/// [`DocumentStore`] backed by the Firestore REST API.
pub struct FirestoreStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FirestoreStore {
    /// Creates a store for the default database of a Firestore project.
    #[must_use]
    pub fn new(client: reqwest::Client, project_id: &str, api_key: String) -> Self {
        Self {
            client,
            base_url: format!("{FIRESTORE_HOST}/projects/{project_id}/databases/(default)/documents"),
            api_key,
        }
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.base_url)
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{collection}", self.base_url)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        let message = body["error"]["message"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string();
        log::debug!("Firestore returned {status}: {message}");
        Err(StoreError::Backend { status, message })
    }

    fn parse_document(value: &Value) -> Result<Document, StoreError> {
        // The document name is a full resource path; the ID is its last
        // path segment.
        let name = value["name"].as_str().ok_or_else(|| {
            StoreError::UnsupportedShape("document without a name".to_string())
        })?;
        let id = name.rsplit('/').next().unwrap_or(name).to_string();

        let fields = value
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let data = decode_fields(&fields)?;
        Ok(Document { id, data })
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let resp = self
            .client
            .get(self.document_url(collection, id))
            .query(&[("key", &self.api_key)])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: Value = Self::check(resp).await?.json().await?;
        Ok(Some(Self::parse_document(&body)?))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.collection_url(collection))
                .query(&[("key", &self.api_key)])
                .query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let body: Value = Self::check(request.send().await?).await?.json().await?;
            if let Some(page) = body["documents"].as_array() {
                for doc in page {
                    documents.push(Self::parse_document(doc)?);
                }
            }

            match body["nextPageToken"].as_str() {
                Some(token) if !token.is_empty() => page_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(documents)
    }

    async fn insert(&self, collection: &str, data: Value) -> Result<Document, StoreError> {
        let resp = self
            .client
            .post(self.collection_url(collection))
            .query(&[("key", &self.api_key)])
            .json(&json!({ "fields": encode_fields(&data)? }))
            .send()
            .await?;

        let body: Value = Self::check(resp).await?.json().await?;
        Self::parse_document(&body)
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<Document, StoreError> {
        // PATCH without an update mask replaces the whole document and
        // creates it if missing.
        let resp = self
            .client
            .patch(self.document_url(collection, id))
            .query(&[("key", &self.api_key)])
            .json(&json!({ "fields": encode_fields(&data)? }))
            .send()
            .await?;

        let body: Value = Self::check(resp).await?.json().await?;
        Self::parse_document(&body)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<Document, StoreError> {
        let fields = encode_fields(&patch)?;

        // An update mask per patched field leaves the rest of the document
        // alone, and currentDocument.exists=true turns a missing document
        // into a 404 instead of an upsert.
        let mut request = self
            .client
            .patch(self.document_url(collection, id))
            .query(&[("key", &self.api_key)])
            .query(&[("currentDocument.exists", "true")]);
        for field in fields.keys() {
            request = request.query(&[("updateMask.fieldPaths", field)]);
        }

        let resp = request.json(&json!({ "fields": fields })).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        let body: Value = Self::check(resp).await?.json().await?;
        Self::parse_document(&body)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let resp = self
            .client
            .delete(self.document_url(collection, id))
            .query(&[("key", &self.api_key)])
            .send()
            .await?;

        // Firestore treats deleting a missing document as success.
        Self::check(resp).await?;
        Ok(())
    }
}

/// Encodes a plain JSON object into Firestore's `fields` map.
///
/// # Errors
///
/// Returns an error if the value is not a JSON object.
pub fn encode_fields(data: &Value) -> Result<Map<String, Value>, StoreError> {
    let object = data.as_object().ok_or_else(|| {
        StoreError::UnsupportedShape("document fields must be a JSON object".to_string())
    })?;
    Ok(object
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect())
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            // Firestore integers travel as strings; anything non-integral
            // becomes a double.
            n.as_i64().map_or_else(
                || json!({ "doubleValue": n.as_f64() }),
                |i| json!({ "integerValue": i.to_string() }),
            )
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({
            "mapValue": {
                "fields": map
                    .iter()
                    .map(|(k, v)| (k.clone(), encode_value(v)))
                    .collect::<Map<_, _>>()
            }
        }),
    }
}

/// Decodes Firestore's `fields` map into a plain JSON object.
///
/// # Errors
///
/// Returns an error if a value envelope holds an unknown type tag.
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Value, StoreError> {
    let mut object = Map::new();
    for (key, value) in fields {
        object.insert(key.clone(), decode_value(value)?);
    }
    Ok(Value::Object(object))
}

fn decode_value(envelope: &Value) -> Result<Value, StoreError> {
    let object = envelope.as_object().ok_or_else(|| {
        StoreError::UnsupportedShape(format!("expected a value envelope, got {envelope}"))
    })?;
    let (tag, inner) = object.iter().next().ok_or_else(|| {
        StoreError::UnsupportedShape("empty value envelope".to_string())
    })?;

    Ok(match tag.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" | "doubleValue" | "stringValue" => inner.clone(),
        // Timestamps come back as RFC 3339 strings, which is what the
        // record types expect.
        "timestampValue" | "referenceValue" => inner.clone(),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .ok_or_else(|| {
                StoreError::UnsupportedShape(format!("bad integerValue: {inner}"))
            })?,
        "arrayValue" => {
            let items = inner["values"].as_array().cloned().unwrap_or_default();
            Value::Array(
                items
                    .iter()
                    .map(decode_value)
                    .collect::<Result<Vec<_>, _>>()?,
            )
        }
        "mapValue" => {
            let fields = inner["fields"].as_object().cloned().unwrap_or_default();
            decode_fields(&fields)?
        }
        other => {
            return Err(StoreError::UnsupportedShape(format!(
                "unknown value type {other}"
            )));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_scalars() {
        let fields = encode_fields(&json!({
            "description": "buraco",
            "similarCount": 4,
            "flagged": false,
            "score": 1.5,
            "lastModerated": null
        }))
        .unwrap();

        assert_eq!(fields["description"], json!({ "stringValue": "buraco" }));
        assert_eq!(fields["similarCount"], json!({ "integerValue": "4" }));
        assert_eq!(fields["flagged"], json!({ "booleanValue": false }));
        assert_eq!(fields["score"], json!({ "doubleValue": 1.5 }));
        assert_eq!(fields["lastModerated"], json!({ "nullValue": null }));
    }

    #[test]
    fn encodes_nested_maps_and_arrays() {
        let fields = encode_fields(&json!({
            "address": { "city": "Imperatriz", "latitude": -5.52 },
            "tags": ["a", "b"]
        }))
        .unwrap();

        assert_eq!(
            fields["address"]["mapValue"]["fields"]["city"],
            json!({ "stringValue": "Imperatriz" })
        );
        assert_eq!(
            fields["tags"]["arrayValue"]["values"][1],
            json!({ "stringValue": "b" })
        );
    }

    #[test]
    fn decode_reverses_encode() {
        let original = json!({
            "description": "esgoto",
            "similarCount": 7,
            "address": { "latitude": -5.52, "longitude": -47.48 },
            "notes": [{ "note": "checked" }]
        });
        let decoded = decode_fields(&encode_fields(&original).unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn decodes_timestamps_as_strings() {
        let mut fields = Map::new();
        fields.insert(
            "createdAt".to_string(),
            json!({ "timestampValue": "2024-03-01T12:00:00Z" }),
        );
        let decoded = decode_fields(&fields).unwrap();
        assert_eq!(decoded["createdAt"], "2024-03-01T12:00:00Z");
    }

    #[test]
    fn rejects_unknown_value_tags() {
        let mut fields = Map::new();
        fields.insert("x".to_string(), json!({ "geoPointValue": {} }));
        assert!(decode_fields(&fields).is_err());
    }

    #[test]
    fn non_object_document_is_rejected() {
        assert!(encode_fields(&json!("just a string")).is_err());
    }

    #[test]
    fn parses_resource_names_into_ids() {
        let doc = FirestoreStore::parse_document(&json!({
            "name": "projects/p/databases/(default)/documents/complaints/abc123",
            "fields": { "description": { "stringValue": "lixo" } }
        }))
        .unwrap();
        assert_eq!(doc.id, "abc123");
        assert_eq!(doc.data["description"], "lixo");
    }
}
