use std::sync::Arc;

use umap_files::package::types::{Export, Package};

use crate::util::paths::{compact_file_path, strip_object_suffix};
use crate::util::{substring_after_last, substring_before_last};

/// Resolves logical package and object paths into parsed packages. Implementations are shared with the
/// materialization workers and have to tolerate concurrent lookups.
pub trait AssetProvider: Send + Sync {
    /// Accepts archive paths (`FortniteGame/Content/Maps/Apollo`) as well as mounted paths (`/Game/Maps/Apollo`),
    /// with or without an extension or object suffix.
    fn try_load_package(&self, path: &str) -> Option<Arc<Package>>;

    /// `/Game/Maps/Apollo.Apollo` loads `/Game/Maps/Apollo` and returns its export `Apollo`. Without an object
    /// suffix the export named like the package is returned.
    fn try_load_object(&self, path: &str) -> Option<Arc<Export>> {
        let package_path = strip_object_suffix(path);
        let package = self.try_load_package(package_path)?;

        let object_name = if package_path.len() < path.len() {
            substring_after_last(&path[package_path.len() + 1..], ':')
        } else {
            package.short_name()
        };

        package.find_export(object_name).cloned()
    }

    fn compact_file_path(&self, path: &str) -> String {
        compact_file_path(path)
    }
}

/// Name part of an object path, the last path segment if there is no object suffix.
pub fn object_name_of(path: &str) -> &str {
    let last_segment = substring_after_last(path, '/');
    if last_segment.contains('.') {
        substring_after_last(substring_after_last(last_segment, '.'), ':')
    } else {
        substring_before_last(last_segment, ':')
    }
}
