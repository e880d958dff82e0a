//! Firestore over its v1 REST API.
//!
//! Documents travel as typed values (`{"stringValue": ...}`); the codec at
//! the bottom maps them to and from plain JSON so the rest of the crate
//! only ever sees `serde_json::Value`.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{Document, DocumentStore, Query, StoreError};
use crate::auth::TokenProvider;
use crate::config::FirestoreConfig;

const PAGE_SIZE: usize = 300;

/// Firestore document store
pub struct FirestoreStore {
    http: reqwest::Client,
    auth: Arc<TokenProvider>,
    /// `https://.../v1/projects/{p}/databases/{d}/documents`
    documents_url: String,
}

#[derive(Deserialize)]
struct WireDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<WireDocument>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct RunQueryItem {
    document: Option<WireDocument>,
}

impl FirestoreStore {
    pub fn new(config: &FirestoreConfig, auth: Arc<TokenProvider>) -> Result<Self> {
        let project_id = auth.resolve_project(&config.project_id)?;

        let base = match &config.emulator_host {
            Some(host) => format!("http://{}/v1", host.trim_end_matches('/')),
            None => "https://firestore.googleapis.com/v1".to_string(),
        };

        tracing::info!(
            "Firestore project={} database={}",
            project_id,
            config.database_id
        );

        Ok(Self {
            http: reqwest::Client::new(),
            auth,
            documents_url: format!(
                "{}/projects/{}/databases/{}/documents",
                base, project_id, config.database_id
            ),
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/{}",
            self.documents_url,
            urlencoding::encode(collection)
        )
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(collection),
            urlencoding::encode(id)
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let token = self.auth.token().await?;
        let resp = request.bearer_auth(token).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Status { status, body });
        }
        Ok(resp)
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let url = self.collection_url(collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![("pageSize", PAGE_SIZE.to_string())];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }
            let page: ListResponse = self
                .send(self.http.get(&url).query(&params))
                .await?
                .json()
                .await?;

            for wire in page.documents {
                documents.push(from_wire(wire)?);
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!("Listed {} documents from {}", documents.len(), collection);
        Ok(documents)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let url = self.document_url(collection, id);
        match self.send(self.http.get(&url)).await {
            Ok(resp) => {
                let wire: WireDocument = resp.json().await?;
                Ok(Some(from_wire(wire)?))
            }
            Err(StoreError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}:runQuery", self.documents_url);
        let body = structured_query(collection, query);
        let items: Vec<RunQueryItem> = self
            .send(self.http.post(&url).json(&body))
            .await?
            .json()
            .await?;

        items
            .into_iter()
            .filter_map(|item| item.document)
            .map(from_wire)
            .collect()
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let url = self.document_url(collection, id);
        let body = json!({ "fields": encode_fields(&fields) });
        self.send(self.http.patch(&url).json(&body)).await?;
        Ok(())
    }

    async fn add(&self, collection: &str, fields: Map<String, Value>) -> Result<String, StoreError> {
        let url = self.collection_url(collection);
        let body = json!({ "fields": encode_fields(&fields) });
        let wire: WireDocument = self
            .send(self.http.post(&url).json(&body))
            .await?
            .json()
            .await?;
        Ok(document_id(&wire.name).to_string())
    }
}

/// Build the `runQuery` request body
fn structured_query(collection: &str, query: &Query) -> Value {
    let mut structured = json!({
        "from": [{ "collectionId": collection }],
        "where": {
            "fieldFilter": {
                "field": { "fieldPath": query.field },
                "op": "EQUAL",
                "value": encode_value(&query.value),
            }
        }
    });
    if let Some(limit) = query.limit {
        structured["limit"] = json!(limit);
    }
    json!({ "structuredQuery": structured })
}

fn from_wire(wire: WireDocument) -> Result<Document, StoreError> {
    Ok(Document {
        id: document_id(&wire.name).to_string(),
        fields: decode_fields(&wire.fields)?,
    })
}

/// Last path segment of a full document name
fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

// -- Codec --

pub fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect()
}

pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub fn decode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>, StoreError> {
    fields
        .iter()
        .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
        .collect()
}

pub fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Err(StoreError::Decode(format!("not a typed value: {value}")));
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" | "doubleValue" | "geoPointValue" => Ok(inner.clone()),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed
                .map(Value::from)
                .ok_or_else(|| StoreError::Decode(format!("bad integerValue: {inner}")))
        }
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Array(values))
        }
        "mapValue" => {
            let fields = inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Object(fields))
        }
        other => Err(StoreError::Decode(format!("unsupported value type: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode_value(&json!("마늘")), json!({"stringValue": "마늘"}));
        assert_eq!(encode_value(&json!(15000)), json!({"integerValue": "15000"}));
        assert_eq!(encode_value(&json!(36.35)), json!({"doubleValue": 36.35}));
        assert_eq!(encode_value(&json!(true)), json!({"booleanValue": true}));
        assert_eq!(encode_value(&Value::Null), json!({"nullValue": null}));
    }

    #[test]
    fn test_encode_nested() {
        let encoded = encode_value(&json!({"tags": ["의성군", "자연"]}));
        assert_eq!(
            encoded,
            json!({"mapValue": {"fields": {"tags": {"arrayValue": {"values": [
                {"stringValue": "의성군"},
                {"stringValue": "자연"}
            ]}}}}})
        );
    }

    #[test]
    fn test_decode_wire_document_fields() {
        let wire = json!({
            "title": {"stringValue": "조문국박물관"},
            "readcount": {"integerValue": "0"},
            "latitude": {"doubleValue": 36.35},
            "created_at": {"timestampValue": "2025-01-01T00:00:00Z"},
            "tags": {"arrayValue": {}},
            "meta": {"mapValue": {"fields": {"ok": {"booleanValue": true}}}}
        });
        let decoded = decode_fields(wire.as_object().unwrap()).unwrap();
        assert_eq!(decoded["title"], "조문국박물관");
        assert_eq!(decoded["readcount"], 0);
        assert_eq!(decoded["latitude"], 36.35);
        assert_eq!(decoded["created_at"], "2025-01-01T00:00:00Z");
        assert_eq!(decoded["tags"], json!([]));
        assert_eq!(decoded["meta"], json!({"ok": true}));
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        assert!(decode_value(&json!({"vectorValue": {}})).is_err());
        assert!(decode_value(&json!("plain")).is_err());
    }

    #[test]
    fn test_document_id_from_name() {
        assert_eq!(
            document_id("projects/p/databases/(default)/documents/tour_list/126"),
            "126"
        );
    }

    #[test]
    fn test_structured_query_shape() {
        let q = Query::eq("original_data", "a|1|t").limit(1);
        let body = structured_query("qr_results", &q);
        let sq = &body["structuredQuery"];
        assert_eq!(sq["from"][0]["collectionId"], "qr_results");
        assert_eq!(sq["where"]["fieldFilter"]["op"], "EQUAL");
        assert_eq!(
            sq["where"]["fieldFilter"]["value"],
            json!({"stringValue": "a|1|t"})
        );
        assert!(sq.get("orderBy").is_none());
        assert_eq!(sq["limit"], 1);
    }

    #[test]
    fn test_urls_for_emulator() {
        let config = FirestoreConfig {
            project_id: "demo".into(),
            emulator_host: Some("localhost:8080".into()),
            ..Default::default()
        };
        let store = FirestoreStore::new(&config, Arc::new(TokenProvider::fixed("t"))).unwrap();
        assert_eq!(
            store.document_url("tour_list", "126"),
            "http://localhost:8080/v1/projects/demo/databases/(default)/documents/tour_list/126"
        );
    }

    #[test]
    fn test_missing_project_is_an_error() {
        let config = FirestoreConfig::default();
        let result = FirestoreStore::new(&config, Arc::new(TokenProvider::fixed("t")));
        assert!(result.is_err());
    }
}
