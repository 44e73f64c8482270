//! Container catalog checks used before uploads

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::object_store::ObjectStore;
use crate::upstream::read_with_retry;

pub const CONTAINER_NOT_FOUND: &str = "container not found";
pub const INVALID_CORS: &str = "invalid CORS configuration";
pub const VALID_CORS: &str = "valid CORS";
pub const FOLDER_EXISTS: &str = "folder already exists";

/// Yes/no answer with a reason either way
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCheck {
    pub ok: bool,
    pub reason: String,
}

impl CatalogCheck {
    fn pass(reason: &str) -> Self {
        Self {
            ok: true,
            reason: reason.to_string(),
        }
    }

    fn fail(reason: &str) -> Self {
        Self {
            ok: false,
            reason: reason.to_string(),
        }
    }
}

pub struct ContainerCatalog {
    objects: Arc<dyn ObjectStore>,
    timeout: Duration,
}

impl ContainerCatalog {
    pub fn new(objects: Arc<dyn ObjectStore>, timeout: Duration) -> Self {
        Self { objects, timeout }
    }

    /// A container is usable when it exists and accepts browser uploads
    pub async fn validate_container(&self, name: &str) -> CoreResult<CatalogCheck> {
        if name.trim().is_empty() {
            return Err(CoreError::MalformedInput("container is required".into()));
        }

        let containers = read_with_retry(self.timeout, "container list", || {
            self.objects.list_containers()
        })
        .await?;
        if !containers.iter().any(|c| c == name) {
            debug!("Container {} not found", name);
            return Ok(CatalogCheck::fail(CONTAINER_NOT_FOUND));
        }

        let rules = read_with_retry(self.timeout, "container CORS", || {
            self.objects.cors_rules(name)
        })
        .await?;
        if rules.iter().any(|r| r.permits_browser_uploads()) {
            Ok(CatalogCheck::pass(VALID_CORS))
        } else {
            debug!("Container {} lacks a browser upload CORS rule", name);
            Ok(CatalogCheck::fail(INVALID_CORS))
        }
    }

    /// A folder can be created unless its marker already exists
    pub async fn can_create_folder(&self, container: &str, key: &str) -> CoreResult<CatalogCheck> {
        if container.trim().is_empty() {
            return Err(CoreError::MalformedInput("container is required".into()));
        }
        if key.len() < 2 || !key.ends_with('/') {
            return Err(CoreError::MalformedInput(format!(
                "'{key}' is not a folder path"
            )));
        }

        let existing = read_with_retry(self.timeout, "object head", || {
            self.objects.head_object(container, key)
        })
        .await?;
        Ok(match existing {
            Some(_) => CatalogCheck::fail(FOLDER_EXISTS),
            None => CatalogCheck::pass("folder can be created"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryObjectStore;
    use crate::object_store::CorsRule;

    fn catalog(objects: Arc<InMemoryObjectStore>) -> ContainerCatalog {
        ContainerCatalog::new(objects, Duration::from_secs(1))
    }

    fn upload_rule() -> CorsRule {
        CorsRule {
            allowed_headers: vec!["*".into()],
            allowed_methods: vec!["GET".into(), "PUT".into(), "HEAD".into()],
            allowed_origins: vec!["*".into()],
        }
    }

    #[tokio::test]
    async fn test_validate_container() {
        let objects = Arc::new(InMemoryObjectStore::new());
        objects.add_container("media", vec![upload_rule()]);
        objects.add_container("locked", vec![]);
        let catalog = catalog(objects);

        assert_eq!(
            catalog.validate_container("media").await.unwrap(),
            CatalogCheck::pass(VALID_CORS)
        );
        assert_eq!(
            catalog.validate_container("locked").await.unwrap(),
            CatalogCheck::fail(INVALID_CORS)
        );
        assert_eq!(
            catalog.validate_container("nope").await.unwrap(),
            CatalogCheck::fail(CONTAINER_NOT_FOUND)
        );
    }

    #[tokio::test]
    async fn test_can_create_folder() {
        let objects = Arc::new(InMemoryObjectStore::new());
        objects.put_object("media", "shows/", 0);
        let catalog = catalog(objects);

        assert_eq!(
            catalog.can_create_folder("media", "shows/").await.unwrap(),
            CatalogCheck::fail(FOLDER_EXISTS)
        );
        assert!(catalog.can_create_folder("media", "films/").await.unwrap().ok);
        assert!(matches!(
            catalog.can_create_folder("media", "films").await,
            Err(CoreError::MalformedInput(_))
        ));
    }

    #[tokio::test]
    async fn test_unavailable_store_is_retryable() {
        let objects = Arc::new(InMemoryObjectStore::new());
        objects.set_unavailable(true);
        let err = catalog(objects).validate_container("media").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
