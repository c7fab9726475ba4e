//! Record source adapters
//!
//! Two interchangeable backends supply listings as a `RawTable`: a document
//! store export and an analytical SQL store. Each source has a stable
//! identity used as half of the table cache key.

use bnbi_common::{RawTable, Result};
use std::fmt;

use crate::config::Backend;

mod analytical;
mod document;

pub use analytical::AnalyticalSource;
pub use document::{parse_documents, DocumentSource};

/// Stable identity of a record source (backend kind plus location)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(backend: Backend, location: &str) -> Self {
        Self(format!("{}:{}", backend, location))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Listing record source
#[derive(Debug, Clone)]
pub enum RecordSource {
    Document(DocumentSource),
    Analytical(AnalyticalSource),
}

impl RecordSource {
    pub fn backend(&self) -> Backend {
        match self {
            RecordSource::Document(_) => Backend::Document,
            RecordSource::Analytical(_) => Backend::Analytical,
        }
    }

    pub fn id(&self) -> SourceId {
        match self {
            RecordSource::Document(source) => source.id(),
            RecordSource::Analytical(source) => source.id(),
        }
    }

    /// Query text identifying the listings fetch (second half of the cache key)
    pub fn listings_query(&self) -> String {
        match self {
            RecordSource::Document(_) => DocumentSource::FETCH_ALL.to_string(),
            RecordSource::Analytical(source) => source.select_all_query(source.listings_table()),
        }
    }

    /// Fetch every listing as a raw table
    pub async fn fetch_listings(&self) -> Result<RawTable> {
        match self {
            RecordSource::Document(source) => source.fetch_all().await,
            RecordSource::Analytical(source) => source.select_all(source.listings_table()).await,
        }
    }
}
