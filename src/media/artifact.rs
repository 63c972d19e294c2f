use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

const REF_PREFIX: &str = "blob:capture-bridge/";

/// Dereferenceable handle to a recorded artifact, shaped like an object URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    fn for_id(id: Uuid) -> Self {
        Self(format!("{REF_PREFIX}{id}"))
    }

    /// Accepts either the full reference or the bare id
    pub fn parse(value: &str) -> Option<Self> {
        let id = value.strip_prefix(REF_PREFIX).unwrap_or(value);
        Uuid::parse_str(id).ok().map(Self::for_id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id part, usable as a path segment
    pub fn id(&self) -> &str {
        self.0.strip_prefix(REF_PREFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The assembled output of one recording run
#[derive(Debug, Clone)]
pub struct Artifact {
    pub mime_type: String,
    pub data: Vec<u8>,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// In-memory registry of artifacts, valid until revoked or cleared
#[derive(Debug, Clone, Default)]
pub struct ArtifactStore {
    artifacts: Arc<RwLock<HashMap<ArtifactRef, Arc<Artifact>>>>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, artifact: Artifact) -> ArtifactRef {
        let reference = ArtifactRef::for_id(Uuid::new_v4());
        info!(
            "Artifact {} created: {} bytes from {} chunks ({})",
            reference,
            artifact.size_bytes(),
            artifact.chunk_count,
            artifact.mime_type
        );
        self.artifacts
            .write()
            .insert(reference.clone(), Arc::new(artifact));
        reference
    }

    pub fn resolve(&self, reference: &str) -> Option<Arc<Artifact>> {
        let reference = ArtifactRef::parse(reference)?;
        self.artifacts.read().get(&reference).cloned()
    }

    /// Drop an artifact. Returns false if it was unknown or already revoked.
    pub fn revoke(&self, reference: &str) -> bool {
        let Some(reference) = ArtifactRef::parse(reference) else {
            return false;
        };
        let removed = self.artifacts.write().remove(&reference).is_some();
        if removed {
            info!("Artifact {} revoked", reference);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.artifacts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.read().is_empty()
    }

    pub fn clear(&self) {
        self.artifacts.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(data: &[u8]) -> Artifact {
        Artifact {
            mime_type: "video/webm".to_string(),
            data: data.to_vec(),
            chunk_count: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_resolve_and_revoke() {
        let store = ArtifactStore::new();
        let reference = store.insert(artifact(b"webm-bytes"));

        assert!(reference.as_str().starts_with("blob:capture-bridge/"));
        let resolved = store.resolve(reference.as_str()).unwrap();
        assert_eq!(resolved.data, b"webm-bytes".to_vec());

        // bare id works too
        assert!(store.resolve(reference.id()).is_some());

        assert!(store.revoke(reference.as_str()));
        assert!(!store.revoke(reference.as_str()));
        assert!(store.resolve(reference.as_str()).is_none());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(ArtifactRef::parse("blob:capture-bridge/not-a-uuid").is_none());
        assert!(ArtifactRef::parse("").is_none());
    }
}
