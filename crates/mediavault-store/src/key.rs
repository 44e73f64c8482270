//! Asset keys and folder-prefix derivation

use std::fmt;

use serde::{Deserialize, Serialize};

/// Permission path of a container's root folder
pub const ROOT_PREFIX: &str = "/";

/// URI scheme used by object-store job logs and job inputs
pub const STORAGE_URI_SCHEME: &str = "s3://";

/// Identifies an object inside a container (bucket)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetKey {
    pub container: String,
    pub key: String,
}

impl AssetKey {
    pub fn new(container: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            key: key.into(),
        }
    }

    /// Folder containing this object
    pub fn prefix(&self) -> String {
        derive_prefix(&self.key)
    }

    /// Final path segment
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    pub fn is_folder_marker(&self) -> bool {
        is_folder_marker(&self.key)
    }

    /// `s3://container/key`
    pub fn storage_uri(&self) -> String {
        format!("{STORAGE_URI_SCHEME}{}/{}", self.container, self.key)
    }

    /// Parse `s3://container/key`. Returns `None` for anything else.
    pub fn from_storage_uri(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix(STORAGE_URI_SCHEME)?;
        let (container, key) = rest.split_once('/')?;
        if container.is_empty() || key.is_empty() {
            return None;
        }
        Some(Self::new(container, key))
    }

    /// Same file name placed under `new_prefix`
    pub fn moved_under(&self, new_prefix: &str) -> Self {
        let base = if new_prefix == ROOT_PREFIX {
            ""
        } else {
            new_prefix
        };
        Self::new(self.container.clone(), format!("{base}{}", self.file_name()))
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.key)
    }
}

/// Parent folder of an object key, with a trailing slash; `/` at the root.
pub fn derive_prefix(key: &str) -> String {
    match key.rfind('/') {
        Some(idx) => key[..=idx].to_string(),
        None => ROOT_PREFIX.to_string(),
    }
}

pub fn is_folder_marker(key: &str) -> bool {
    key.ends_with('/')
}

/// Whether `folder` sits exactly one level below `parent`
pub fn is_direct_child(parent: &str, folder: &str) -> bool {
    let base = if parent == ROOT_PREFIX { "" } else { parent };
    match folder.strip_prefix(base) {
        Some(rest) => rest != "/" && rest.ends_with('/') && rest.matches('/').count() == 1,
        None => false,
    }
}
