//! HTTP client for a Weaviate-style vector engine.
//!
//! Collection management, batched insertion, per-id deletion, nearVector
//! search, and the two fetch interfaces ([structured](WeaviateStore::fetch_all)
//! and [legacy GraphQL](WeaviateStore::fetch_all_legacy)) all go through the
//! engine's HTTP API. Ids are generated client-side (UUIDv4) and sent with the
//! batch, so the id list returned from [`VectorStore::insert_batch`] is in
//! input order no matter how the server acknowledges the write.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use super::{
    ChunkProperties, CollectionSchema, NewObject, PropertyFilter, StoredObject, VectorStore,
};
use crate::types::{EngineError, UpstreamService};

const SERVICE: UpstreamService = UpstreamService::VectorStore;

/// Client for one vector engine instance.
#[derive(Clone, Debug)]
pub struct WeaviateStore {
    client: Client,
    base_url: Url,
}

impl WeaviateStore {
    /// Default deadline for store metadata and data calls.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(base_url: Url) -> Result<Self, EngineError> {
        Self::with_timeout(base_url, Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: Url, timeout: Duration) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(timeout)
            .use_rustls_tls()
            .build()
            .map_err(|err| EngineError::Config(err.to_string()))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, EngineError> {
        self.base_url
            .join(path)
            .map_err(|err| EngineError::Config(err.to_string()))
    }

    async fn post_graphql(&self, query: String) -> Result<Value, EngineError> {
        let response = self
            .client
            .post(self.endpoint("/v1/graphql")?)
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(|err| EngineError::from_transport(SERVICE, err))?
            .error_for_status()
            .map_err(|err| EngineError::from_transport(SERVICE, err))?;

        let body: Value = response
            .json()
            .await
            .map_err(|err| EngineError::ResponseShape {
                service: SERVICE,
                detail: err.to_string(),
            })?;

        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let rendered: Vec<String> = errors
                    .iter()
                    .map(|err| {
                        err.get("message")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown query error")
                            .to_string()
                    })
                    .collect();
                return Err(EngineError::UpstreamUnavailable {
                    service: SERVICE,
                    detail: rendered.join("; "),
                });
            }
        }
        Ok(body)
    }

    fn graphql_where(filter: &PropertyFilter) -> String {
        // valueText is serialized through serde_json so quoting stays correct.
        format!(
            "where: {{path: [\"{}\"], operator: Equal, valueText: {}}}",
            filter.property(),
            Value::String(filter.value().to_string())
        )
    }

    fn graphql_fields() -> &'static str {
        "text source page policy_category last_updated _additional { id }"
    }
}

#[derive(Deserialize)]
struct SchemaClassBody {
    #[serde(default)]
    properties: Vec<SchemaPropertyBody>,
}

#[derive(Deserialize)]
struct SchemaPropertyBody {
    name: String,
    #[serde(rename = "dataType", default)]
    data_type: Vec<String>,
}

#[derive(Serialize)]
struct BatchObjectBody<'a> {
    class: &'a str,
    id: String,
    properties: &'a ChunkProperties,
    vector: &'a [f32],
}

#[derive(Deserialize)]
struct StructuredQueryBody {
    #[serde(default)]
    objects: Vec<StructuredObjectBody>,
}

#[derive(Deserialize)]
struct StructuredObjectBody {
    id: String,
    properties: ChunkProperties,
}

/// Extracts stored objects from the legacy query language's response shape:
/// `data.Get.<Class>[]` with ids tucked under `_additional.id`.
///
/// A response that does not match this shape is an explicit
/// [`EngineError::ResponseShape`], never a panic.
fn objects_from_legacy_response(class: &str, body: &Value) -> Result<Vec<StoredObject>, EngineError> {
    let shape_err = |detail: &str| EngineError::ResponseShape {
        service: SERVICE,
        detail: detail.to_string(),
    };

    let hits = body
        .get("data")
        .and_then(|data| data.get("Get"))
        .and_then(|get| get.get(class))
        .and_then(Value::as_array)
        .ok_or_else(|| shape_err(&format!("missing data.Get.{class} array")))?;

    let mut objects = Vec::with_capacity(hits.len());
    for hit in hits {
        let id = hit
            .get("_additional")
            .and_then(|additional| additional.get("id"))
            .and_then(Value::as_str)
            .ok_or_else(|| shape_err("hit without _additional.id"))?;

        let text_of = |field: &str| {
            hit.get(field)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let page = hit.get("page").and_then(Value::as_u64).unwrap_or_default() as u32;

        objects.push(StoredObject {
            id: id.to_string(),
            properties: ChunkProperties {
                text: text_of("text"),
                source: text_of("source"),
                page,
                policy_category: text_of("policy_category"),
                last_updated: text_of("last_updated"),
            },
        });
    }
    Ok(objects)
}

#[async_trait]
impl VectorStore for WeaviateStore {
    async fn ensure_collection(&self, schema: &CollectionSchema) -> Result<(), EngineError> {
        let lookup = self
            .client
            .get(self.endpoint(&format!("/v1/schema/{}", schema.name))?)
            .send()
            .await
            .map_err(|err| EngineError::from_transport(SERVICE, err))?;

        match lookup.status() {
            StatusCode::OK => {
                let existing: SchemaClassBody =
                    lookup
                        .json()
                        .await
                        .map_err(|err| EngineError::ResponseShape {
                            service: SERVICE,
                            detail: err.to_string(),
                        })?;
                let mut found: Vec<(String, String)> = existing
                    .properties
                    .into_iter()
                    .map(|property| {
                        let data_type = property.data_type.into_iter().next().unwrap_or_default();
                        (property.name, data_type)
                    })
                    .collect();
                let mut wanted: Vec<(String, String)> = schema
                    .properties
                    .iter()
                    .map(|property| (property.name.clone(), property.data_type.clone()))
                    .collect();
                found.sort();
                wanted.sort();
                if found != wanted {
                    return Err(EngineError::SchemaConflict {
                        collection: schema.name.clone(),
                        detail: format!("expected properties {wanted:?}, found {found:?}"),
                    });
                }
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                let properties: Vec<Value> = schema
                    .properties
                    .iter()
                    .map(|property| {
                        json!({ "name": property.name, "dataType": [property.data_type] })
                    })
                    .collect();
                let body = json!({
                    "class": schema.name,
                    "vectorizer": "none",
                    "properties": properties,
                });
                self.client
                    .post(self.endpoint("/v1/schema")?)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|err| EngineError::from_transport(SERVICE, err))?
                    .error_for_status()
                    .map_err(|err| EngineError::from_transport(SERVICE, err))?;
                Ok(())
            }
            status => Err(EngineError::UpstreamUnavailable {
                service: SERVICE,
                detail: format!("schema lookup returned {status}"),
            }),
        }
    }

    async fn insert_batch(
        &self,
        collection: &str,
        objects: Vec<NewObject>,
    ) -> Result<Vec<String>, EngineError> {
        if objects.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = objects
            .iter()
            .map(|_| Uuid::new_v4().to_string())
            .collect();
        let batch: Vec<BatchObjectBody<'_>> = objects
            .iter()
            .zip(&ids)
            .map(|(object, id)| BatchObjectBody {
                class: collection,
                id: id.clone(),
                properties: &object.properties,
                vector: &object.vector,
            })
            .collect();

        self.client
            .post(self.endpoint("/v1/batch/objects")?)
            .json(&json!({ "objects": batch }))
            .send()
            .await
            .map_err(|err| EngineError::from_transport(SERVICE, err))?
            .error_for_status()
            .map_err(|err| EngineError::from_transport(SERVICE, err))?;

        Ok(ids)
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<(), EngineError> {
        let response = self
            .client
            .delete(self.endpoint(&format!("/v1/objects/{collection}/{id}"))?)
            .send()
            .await
            .map_err(|err| EngineError::from_transport(SERVICE, err))?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::OK | StatusCode::NOT_FOUND => Ok(()),
            status => Err(EngineError::UpstreamUnavailable {
                service: SERVICE,
                detail: format!("delete of {id} returned {status}"),
            }),
        }
    }

    async fn search_near_vector(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&PropertyFilter>,
    ) -> Result<Vec<StoredObject>, EngineError> {
        let vector_json =
            serde_json::to_string(vector).map_err(|err| EngineError::Config(err.to_string()))?;
        let where_clause = filter
            .map(|filter| format!(", {}", Self::graphql_where(filter)))
            .unwrap_or_default();
        let query = format!(
            "{{ Get {{ {collection}(limit: {limit}, nearVector: {{vector: {vector_json}}}{where_clause}) {{ {fields} }} }} }}",
            fields = Self::graphql_fields(),
        );

        let body = self.post_graphql(query).await?;
        objects_from_legacy_response(collection, &body)
    }

    async fn fetch_all(
        &self,
        collection: &str,
        filter: Option<&PropertyFilter>,
        limit: usize,
    ) -> Result<Vec<StoredObject>, EngineError> {
        let mut body = json!({ "class": collection, "limit": limit });
        if let Some(filter) = filter {
            body["where"] = json!({
                "property": filter.property(),
                "equals": filter.value(),
            });
        }

        let response = self
            .client
            .post(self.endpoint("/v1/query")?)
            .json(&body)
            .send()
            .await
            .map_err(|err| EngineError::from_transport(SERVICE, err))?
            .error_for_status()
            .map_err(|err| EngineError::from_transport(SERVICE, err))?;

        let parsed: StructuredQueryBody =
            response
                .json()
                .await
                .map_err(|err| EngineError::ResponseShape {
                    service: SERVICE,
                    detail: err.to_string(),
                })?;
        Ok(parsed
            .objects
            .into_iter()
            .map(|object| StoredObject {
                id: object.id,
                properties: object.properties,
            })
            .collect())
    }

    async fn fetch_all_legacy(
        &self,
        collection: &str,
        filter: Option<&PropertyFilter>,
        limit: usize,
    ) -> Result<Vec<StoredObject>, EngineError> {
        let where_clause = filter
            .map(|filter| format!(", {}", Self::graphql_where(filter)))
            .unwrap_or_default();
        let query = format!(
            "{{ Get {{ {collection}(limit: {limit}{where_clause}) {{ {fields} }} }} }}",
            fields = Self::graphql_fields(),
        );

        let body = self.post_graphql(query).await?;
        objects_from_legacy_response(collection, &body)
    }

    async fn ready(&self) -> Result<(), EngineError> {
        self.client
            .get(self.endpoint("/v1/.well-known/ready")?)
            .send()
            .await
            .map_err(|err| EngineError::from_transport(SERVICE, err))?
            .error_for_status()
            .map_err(|err| EngineError::from_transport(SERVICE, err))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_adapter_extracts_ids_and_properties() {
        let body = json!({
            "data": { "Get": { "PolicyChunks": [
                {
                    "text": "vacation accrual",
                    "source": "leave.pdf",
                    "page": 2,
                    "policy_category": "Leave Policies",
                    "last_updated": "2024-01-01",
                    "_additional": { "id": "abc-123" }
                }
            ] } }
        });
        let objects = objects_from_legacy_response("PolicyChunks", &body).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].id, "abc-123");
        assert_eq!(objects[0].properties.source, "leave.pdf");
        assert_eq!(objects[0].properties.page, 2);
    }

    #[test]
    fn legacy_adapter_rejects_foreign_shapes() {
        let body = json!({ "data": { "objects": [] } });
        let err = objects_from_legacy_response("PolicyChunks", &body).unwrap_err();
        assert!(matches!(err, EngineError::ResponseShape { .. }));
    }

    #[test]
    fn where_clause_quotes_values() {
        let clause =
            WeaviateStore::graphql_where(&PropertyFilter::SourceEquals("a \"b\".pdf".into()));
        assert!(clause.contains("path: [\"source\"]"));
        assert!(clause.contains("\\\"b\\\""));
    }
}
