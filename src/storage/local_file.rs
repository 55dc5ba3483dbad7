use crate::core::Storage;
use crate::data::Data;
use crate::errors::{AgentError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::form_urlencoded;

/// File-name form of a type id or record id: form-urlencoded, with a leading
/// dot and `*` escaped too, so `..`, separators and URLs all stay a single
/// plain component under the root.
fn encode_component(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(AgentError::unsupported("storing under an empty id"));
    }
    let encoded: String = form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('*', "%2A");
    Ok(match encoded.strip_prefix('.') {
        Some(rest) => format!("%2E{}", rest),
        None => encoded,
    })
}

fn decode_component(encoded: &str) -> String {
    form_urlencoded::parse(encoded.as_bytes())
        .next()
        .map(|(name, _)| name.into_owned())
        .unwrap_or_default()
}

/// One pretty-printed JSON file per value at `<root>/<type_id>/<id>.json`.
///
/// Every save is its own write; an expanded save that fails halfway leaves
/// the files already written in place.
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn type_dir(&self, type_id: &str) -> Result<PathBuf> {
        Ok(self.root.join(encode_component(type_id)?))
    }

    pub fn path_for(&self, type_id: &str, id: &str) -> Result<PathBuf> {
        Ok(self
            .type_dir(type_id)?
            .join(format!("{}.json", encode_component(id)?)))
    }

    /// Read a stored value back as JSON.
    pub async fn load(&self, type_id: &str, id: &str) -> Result<Value> {
        let content = tokio::fs::read_to_string(self.path_for(type_id, id)?).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Ids stored under `type_id`, decoded and sorted.
    pub async fn list(&self, type_id: &str) -> Result<Vec<String>> {
        let dir = self.type_dir(type_id)?;
        if !tokio::fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(decode_component(stem));
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl Storage for LocalFileStorage {
    async fn save(&self, payload: Option<&Data>) -> Result<()> {
        let Some(data) = payload else {
            debug!("save without payload, nothing to write");
            return Ok(());
        };

        let (type_id, id) = data.identity().ok_or_else(|| {
            AgentError::unsupported(format!("saving a bare value of type '{}'", data.type_id()))
        })?;

        let path = self.path_for(type_id, id)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let content = serde_json::to_string_pretty(data)?;
        tokio::fs::write(&path, content).await?;

        info!("saved {} to {}", type_id, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::StorageAction;
    use crate::data::Record;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn article(title: &str) -> Data {
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), Data::Value(json!(title)));
        Data::Record(Record::new("Article", fields))
    }

    #[tokio::test]
    async fn test_save_creates_type_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path().join("nested"));
        let record = article("title-A");
        storage
            .perform(&StorageAction::save_data(), Some(&record))
            .await
            .unwrap();

        let (_, id) = record.identity().unwrap();
        let stored = storage.load("Article", id).await.unwrap();
        assert_eq!(stored["title"], "title-A");
        assert_eq!(stored["type_id"], "Article");
        assert_eq!(stored["id"], id);
        assert_eq!(storage.list("Article").await.unwrap(), vec![id.to_string()]);
    }

    #[tokio::test]
    async fn test_save_without_payload_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        storage.save(None).await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_bare_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        let result = storage.save(Some(&Data::Value(json!("plain")))).await;
        assert!(matches!(result, Err(AgentError::UnsupportedOperation(_))));
        let result = storage.save(Some(&Data::List(vec![article("a")]))).await;
        assert!(matches!(result, Err(AgentError::UnsupportedOperation(_))));
    }

    fn article_with_id(id: &str) -> Data {
        match article("linked") {
            Data::Record(record) => Data::Record(record.with_id(id)),
            other => other,
        }
    }

    #[tokio::test]
    async fn test_url_ids_are_stored_as_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        let id = "https://x.test/page0.html?q=a b";
        storage.save(Some(&article_with_id(id))).await.unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path().join("Article"))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].parent().unwrap(), dir.path().join("Article"));
        assert_eq!(storage.list("Article").await.unwrap(), vec![id.to_string()]);
        assert_eq!(storage.load("Article", id).await.unwrap()["id"], id);
    }

    #[tokio::test]
    async fn test_ids_cannot_escape_the_root() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("data");
        let storage = LocalFileStorage::new(&root);

        for id in ["../../escaped", "..", ".hidden", "a/b\\c"] {
            storage.save(Some(&article_with_id(id))).await.unwrap();
            let path = storage.path_for("Article", id).unwrap();
            assert!(path.starts_with(root.join("Article")));
            assert_eq!(path.parent().unwrap(), root.join("Article"));
            assert!(path.is_file());
        }
        assert!(!parent.path().join("escaped.json").exists());
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 1);

        let mut listed = storage.list("Article").await.unwrap();
        listed.sort();
        let mut expected = vec!["../../escaped", "..", ".hidden", "a/b\\c"];
        expected.sort();
        assert_eq!(listed, expected);
    }

    #[tokio::test]
    async fn test_type_ids_are_encoded_too() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path().join("data"));
        let record = Data::Record(Record::new("../Outside", BTreeMap::new()));
        storage.save(Some(&record)).await.unwrap();
        assert!(!dir.path().join("Outside").exists());
        assert_eq!(std::fs::read_dir(dir.path().join("data")).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_empty_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        let result = storage.save(Some(&article_with_id(""))).await;
        assert!(matches!(result, Err(AgentError::UnsupportedOperation(_))));
    }

    #[tokio::test]
    async fn test_list_of_unknown_type_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        assert!(storage.list("Nothing").await.unwrap().is_empty());
    }
}
