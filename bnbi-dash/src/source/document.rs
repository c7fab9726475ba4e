//! Document store backend
//!
//! Reads an export of the listings collection: either a JSON array of
//! documents or newline-delimited JSON, from a local file or an HTTP
//! endpoint returning a JSON array.

use bnbi_common::{Error, RawTable, Result};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{debug, info};

use super::SourceId;
use crate::config::Backend;

/// Document export location
#[derive(Debug, Clone)]
pub enum DocumentSource {
    File(PathBuf),
    Http { url: String, client: reqwest::Client },
}

impl DocumentSource {
    /// Cache query text for a whole-collection fetch
    pub const FETCH_ALL: &'static str = "find({})";

    pub fn file(path: PathBuf) -> Self {
        DocumentSource::File(path)
    }

    pub fn http(url: impl Into<String>) -> Self {
        DocumentSource::Http {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn id(&self) -> SourceId {
        match self {
            DocumentSource::File(path) => SourceId::new(Backend::Document, &format!("file:{}", path.display())),
            DocumentSource::Http { url, .. } => SourceId::new(Backend::Document, url),
        }
    }

    /// Fetch every document as one raw table
    pub async fn fetch_all(&self) -> Result<RawTable> {
        let documents = match self {
            DocumentSource::File(path) => {
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    Error::Source(format!("Read {} failed: {}", path.display(), e))
                })?;
                parse_documents(&content)?
            }
            DocumentSource::Http { url, client } => {
                debug!("Fetching documents from {}", url);
                let values: Vec<Value> = client
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| Error::Source(format!("GET {} failed: {}", url, e)))?
                    .json()
                    .await
                    .map_err(|e| Error::Source(format!("Decode {} failed: {}", url, e)))?;
                into_objects(values)?
            }
        };

        info!("Fetched {} documents from {}", documents.len(), self.id());
        Ok(RawTable::from_documents(documents))
    }
}

/// Parse a JSON array of documents or newline-delimited JSON documents
pub fn parse_documents(content: &str) -> Result<Vec<Map<String, Value>>> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        let values: Vec<Value> = serde_json::from_str(trimmed)?;
        return into_objects(values);
    }

    let values = trimmed
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(serde_json::from_str::<Value>)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    into_objects(values)
}

fn into_objects(values: Vec<Value>) -> Result<Vec<Map<String, Value>>> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| match value {
            Value::Object(map) => Ok(map),
            other => Err(Error::Source(format!(
                "Document {} is not an object: {}",
                i, other
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_array() {
        let docs = parse_documents(r#"[{"_id": {"$oid": "1"}, "price": "$10"}, {"price": "$20"}]"#).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["price"], json!("$20"));
    }

    #[test]
    fn test_parse_ndjson() {
        let docs = parse_documents("{\"price\": \"$10\"}\n\n{\"price\": \"$20\"}\n").unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(matches!(parse_documents("[1, 2]"), Err(Error::Source(_))));
        assert!(matches!(parse_documents("{not json"), Err(Error::Json(_))));
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_documents("  \n").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_source_error() {
        let source = DocumentSource::file(PathBuf::from("/nonexistent/listings.json"));
        assert!(matches!(source.fetch_all().await, Err(Error::Source(_))));
    }
}
