//! Revision content providers.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("revision {slug} version {version} not found")]
    NotFound { slug: String, version: u32 },
    #[error("revision source unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to stored revisions.
#[async_trait]
pub trait RevisionSource: Send + Sync {
    async fn fetch(&self, slug: &str, version: u32) -> Result<String, SourceError>;
}

/// Concurrent in-memory revision map, keyed by `(slug, version)`.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRevisionStore {
    revisions: Arc<DashMap<(String, u32), Arc<str>>>,
}

impl InMemoryRevisionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `text` as `slug`@`version`, replacing any previous text.
    pub fn insert(&self, slug: impl Into<String>, version: u32, text: impl Into<Arc<str>>) {
        self.revisions.insert((slug.into(), version), text.into());
    }

    pub fn remove(&self, slug: &str, version: u32) -> bool {
        self.revisions.remove(&(slug.to_string(), version)).is_some()
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }
}

#[async_trait]
impl RevisionSource for InMemoryRevisionStore {
    async fn fetch(&self, slug: &str, version: u32) -> Result<String, SourceError> {
        self.revisions
            .get(&(slug.to_string(), version))
            .map(|entry| entry.value().to_string())
            .ok_or_else(|| SourceError::NotFound {
                slug: slug.to_string(),
                version,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetches_stored_revisions() {
        let store = InMemoryRevisionStore::new();
        store.insert("policy", 1, "Refunds within 30 days.");
        store.insert("policy", 2, "Refunds within 14 days.");

        assert_eq!(store.len(), 2);
        assert_eq!(
            store.fetch("policy", 2).await.unwrap(),
            "Refunds within 14 days."
        );
    }

    #[tokio::test]
    async fn missing_revision_is_not_found() {
        let store = InMemoryRevisionStore::new();
        store.insert("policy", 1, "text");
        assert!(store.remove("policy", 1));

        let err = store.fetch("policy", 1).await.unwrap_err();
        assert_eq!(
            err,
            SourceError::NotFound {
                slug: "policy".into(),
                version: 1
            }
        );
    }
}
