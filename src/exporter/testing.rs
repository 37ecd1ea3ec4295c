use std::collections::HashMap;
use std::sync::Arc;

use umap_files::package::reader::PackageReader;
use umap_files::package::types::Package;

use crate::io::common::loader::AssetProvider;
use crate::util::paths::{compact_file_path, strip_object_suffix};

/// Packages parsed up front and served from memory.
#[derive(Default)]
pub struct MemoryProvider {
    packages: HashMap<String, Arc<Package>>,
}

impl MemoryProvider {
    pub fn with(mut self, name: &str, json: &str) -> anyhow::Result<Self> {
        let package = PackageReader::parse_package(&mut json.as_bytes(), name)?;
        self.packages
            .insert(compact_file_path(name).to_ascii_lowercase(), Arc::new(package));
        Ok(self)
    }
}

impl AssetProvider for MemoryProvider {
    fn try_load_package(&self, path: &str) -> Option<Arc<Package>> {
        let key = compact_file_path(strip_object_suffix(path)).to_ascii_lowercase();
        self.packages.get(&key).cloned()
    }
}
