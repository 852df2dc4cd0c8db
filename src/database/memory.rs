use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::store::{DocumentStore, StoreError};

/// 内存文档存储，未配置 DATABASE_URL 时和测试中使用
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Err(StoreError::Duplicate(format!("{}/{}", collection, id)));
        }
        docs.insert(id.to_string(), doc);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| doc.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn merge(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(doc) = collections.get_mut(collection).and_then(|docs| docs.get_mut(id)) else {
            return Ok(None);
        };
        let Value::Object(fields) = &mut *doc else {
            return Err(StoreError::Serialization(format!(
                "{}/{} is not an object",
                collection, id
            )));
        };
        for (key, value) in patch {
            fields.insert(key, value);
        }
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .map(|docs| docs.remove(id).is_some())
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_rejects_duplicate_ids() {
        let store = MemoryStore::new();
        store.insert("services", "a", json!({"id": "a"})).await.unwrap();
        let err = store.insert("services", "a", json!({"id": "a"})).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        // 不同集合互不影响
        store.insert("projects", "a", json!({"id": "a"})).await.unwrap();
    }

    #[tokio::test]
    async fn merge_only_touches_given_fields() {
        let store = MemoryStore::new();
        store
            .insert("clients", "c1", json!({"id": "c1", "name": "Ann", "refresh_token_hash": "x"}))
            .await
            .unwrap();

        let mut patch = Map::new();
        patch.insert("name".into(), json!("Anna"));
        let merged = store.merge("clients", "c1", patch).await.unwrap().unwrap();

        assert_eq!(merged["name"], "Anna");
        assert_eq!(merged["refresh_token_hash"], "x");
        assert!(store.merge("clients", "missing", Map::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_by_field_and_delete() {
        let store = MemoryStore::new();
        store.insert("services", "a", json!({"slug": "web"})).await.unwrap();
        store.insert("services", "b", json!({"slug": "print"})).await.unwrap();

        let found = store.find_by_field("services", "slug", &json!("web")).await.unwrap();
        assert_eq!(found.len(), 1);

        assert!(store.delete("services", "a").await.unwrap());
        assert!(!store.delete("services", "a").await.unwrap());
        assert_eq!(store.list("services").await.unwrap().len(), 1);
        assert!(store.list("unknown").await.unwrap().is_empty());
    }
}
