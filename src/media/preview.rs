use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{BridgeError, BridgeResult};

/// Named display surfaces that can show a live capture source
///
/// Each surface holds at most one source; attaching replaces the previous one.
#[derive(Debug, Clone, Default)]
pub struct PreviewSurfaces {
    surfaces: Arc<RwLock<HashMap<String, Option<Uuid>>>>,
}

impl PreviewSurfaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_surfaces<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let surfaces = Self::new();
        for id in ids {
            surfaces.register(id);
        }
        surfaces
    }

    /// Register a surface. Returns false if it already existed.
    pub fn register(&self, id: impl Into<String>) -> bool {
        let id = id.into();
        let mut surfaces = self.surfaces.write();
        if surfaces.contains_key(&id) {
            return false;
        }
        debug!("Preview surface registered: {}", id);
        surfaces.insert(id, None);
        true
    }

    pub fn unregister(&self, id: &str) -> bool {
        self.surfaces.write().remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.surfaces.read().contains_key(id)
    }

    /// Bind a source as the live content of a surface
    pub fn attach(&self, id: &str, source_id: Uuid) -> BridgeResult<()> {
        let mut surfaces = self.surfaces.write();
        let slot = surfaces
            .get_mut(id)
            .ok_or_else(|| BridgeError::PreviewNotFound(id.to_string()))?;
        *slot = Some(source_id);
        info!("Source {} attached to preview '{}'", source_id, id);
        Ok(())
    }

    /// Clear a surface, but only if it still shows `source_id`
    pub fn detach(&self, id: &str, source_id: Uuid) {
        if let Some(slot) = self.surfaces.write().get_mut(id) {
            if *slot == Some(source_id) {
                *slot = None;
                debug!("Source {} detached from preview '{}'", source_id, id);
            }
        }
    }

    pub fn attached_source(&self, id: &str) -> Option<Uuid> {
        self.surfaces.read().get(id).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_requires_registered_surface() {
        let surfaces = PreviewSurfaces::new();
        let err = surfaces.attach("missing", Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, BridgeError::PreviewNotFound(id) if id == "missing"));
    }

    #[test]
    fn detach_ignores_stale_source() {
        let surfaces = PreviewSurfaces::with_surfaces(["preview"]);
        let old = Uuid::new_v4();
        let new = Uuid::new_v4();

        surfaces.attach("preview", old).unwrap();
        surfaces.attach("preview", new).unwrap();
        surfaces.detach("preview", old);

        assert_eq!(surfaces.attached_source("preview"), Some(new));

        surfaces.detach("preview", new);
        assert_eq!(surfaces.attached_source("preview"), None);
    }

    #[test]
    fn register_is_unique() {
        let surfaces = PreviewSurfaces::new();
        assert!(surfaces.register("a"));
        assert!(!surfaces.register("a"));
        assert!(surfaces.unregister("a"));
        assert!(!surfaces.contains("a"));
    }
}
