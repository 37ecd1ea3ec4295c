use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use itertools::Itertools;
use log::{debug, info, trace, warn};
use serde::Deserialize;
use umap_files::common::types::Guid;
use umap_files::package::reader::PackageReader;
use umap_files::package::types::Package;

use crate::io::common::loader::AssetProvider;
use crate::settings::EncryptionKey;
use crate::util::package_cache::PackageCache;
use crate::util::paths::{compact_file_path, export_dir, strip_object_suffix};

pub const CONTAINER_MANIFEST: &str = "container.json";
const LOOSE_CONTAINER: &str = "<loose>";

#[derive(Debug, Default, Deserialize)]
struct ContainerManifest {
    #[serde(rename = "EncryptionKeyGuid", default)]
    encryption_key_guid: Option<Guid>,
}

#[derive(Ord, PartialOrd, Eq, PartialEq, Debug)]
enum ContainerType {
    Patch,
    Base,
    Loose,
}

struct IndexedFile {
    container: String,
    file: PathBuf,
    archive_path: String,
}

/// Serves packages that were extracted to disk. Every `*.pak` directory below the root is one container, anything
/// else below the root forms the lowest priority "loose" container.
pub struct LooseFileProvider {
    /// lowercase mounted path without extension -> file
    index: HashMap<String, IndexedFile>,
    mounted: Vec<String>,
    cache: PackageCache,
    dump_dir: Option<PathBuf>,
}

impl LooseFileProvider {
    pub fn new(
        root: &Path,
        keys: &[EncryptionKey],
        cache_size: usize,
        dump_dir: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let entries = fs::read_dir(root)
            .with_context(|| format!("Failed to enumerate archive directory {}", root.display()))?
            .filter_map(|entry| entry.ok())
            .collect_vec();

        let containers = entries
            .iter()
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.to_ascii_lowercase().ends_with(".pak"))
            .sorted_by(|a, b| LooseFileProvider::sorting_order(a, b))
            .collect_vec();

        for key in keys {
            if let Some(file_name) = &key.file_name {
                if !containers
                    .iter()
                    .any(|container| container.eq_ignore_ascii_case(file_name))
                {
                    warn!("PAK file not found: {}", file_name);
                }
            }
        }

        let mut index = HashMap::new();
        let mut mounted = vec![];
        for container in containers {
            let container_dir = root.join(&container);
            if !LooseFileProvider::is_unlocked(&container, &container_dir, keys) {
                continue;
            }

            let count = LooseFileProvider::index_dir(&mut index, &container, &container_dir, &container_dir)?;
            info!("Mounted {} with {} packages", container, count);
            mounted.push(container);
        }

        let mut loose_count = 0;
        for entry in &entries {
            let path = entry.path();
            let is_container = path.is_dir()
                && entry
                    .file_name()
                    .to_string_lossy()
                    .to_ascii_lowercase()
                    .ends_with(".pak");
            if is_container {
                continue;
            }

            if path.is_dir() {
                loose_count += LooseFileProvider::index_dir(&mut index, LOOSE_CONTAINER, root, &path)?;
            } else {
                loose_count += LooseFileProvider::index_file(&mut index, LOOSE_CONTAINER, root, &path);
            }
        }

        if loose_count > 0 {
            info!("Mounted {} loose packages", loose_count);
            mounted.push(LOOSE_CONTAINER.to_string());
        }

        Ok(LooseFileProvider {
            index,
            mounted,
            cache: PackageCache::with_capacity(cache_size),
            dump_dir,
        })
    }

    /// Container names in lookup priority.
    pub fn mounted(&self) -> &[String] {
        &self.mounted
    }

    pub fn package_count(&self) -> usize {
        self.index.len()
    }

    fn sorting_order(a: &str, b: &str) -> Ordering {
        let type_a = LooseFileProvider::extract_container_type(a);
        let type_b = LooseFileProvider::extract_container_type(b);

        match type_a.cmp(&type_b) {
            // newer patches override older ones: _2_P before _1_P
            Ordering::Equal if type_a == ContainerType::Patch => b.cmp(a),
            Ordering::Equal => a.cmp(b),
            ord => ord,
        }
    }

    fn extract_container_type(name: &str) -> ContainerType {
        let stem = name.to_ascii_lowercase();
        let stem = stem.trim_end_matches(".pak");
        if stem.ends_with("_p") {
            ContainerType::Patch
        } else if name == LOOSE_CONTAINER {
            ContainerType::Loose
        } else {
            ContainerType::Base
        }
    }

    fn is_unlocked(container: &str, container_dir: &Path, keys: &[EncryptionKey]) -> bool {
        let manifest_path = container_dir.join(CONTAINER_MANIFEST);
        if !manifest_path.is_file() {
            return true;
        }

        let manifest = File::open(&manifest_path)
            .map_err(anyhow::Error::from)
            .and_then(|file| Ok(serde_json::from_reader::<_, ContainerManifest>(BufReader::new(file))?));

        let manifest = match manifest {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Failed to read {}: {}, not mounting", manifest_path.display(), e);
                return false;
            }
        };

        let Some(guid) = manifest
            .encryption_key_guid
            .filter(|guid| *guid != Guid::default())
        else {
            return true;
        };

        let key = keys.iter().find(|key| match &key.file_name {
            Some(file_name) if !file_name.is_empty() => file_name.eq_ignore_ascii_case(container),
            _ => key.guid == Some(guid),
        });

        match key {
            Some(key) if key.is_well_formed() => true,
            Some(_) => {
                warn!("The key submitted for {} is malformed, not mounting", container);
                false
            }
            None => {
                warn!("{} is encrypted with key {} which was not submitted, not mounting", container, guid);
                false
            }
        }
    }

    /// Indexes every json package below `dir`, relative to `container_root`. Existing (higher priority) entries win.
    fn index_dir(
        index: &mut HashMap<String, IndexedFile>,
        container: &str,
        container_root: &Path,
        dir: &Path,
    ) -> anyhow::Result<usize> {
        let mut count = 0;
        let entries = fs::read_dir(dir).with_context(|| format!("Failed to enumerate {}", dir.display()))?;
        for entry in entries.filter_map(|entry| entry.ok()) {
            let path = entry.path();
            if path.is_dir() {
                count += LooseFileProvider::index_dir(index, container, container_root, &path)?;
            } else {
                count += LooseFileProvider::index_file(index, container, container_root, &path);
            }
        }

        Ok(count)
    }

    fn index_file(
        index: &mut HashMap<String, IndexedFile>,
        container: &str,
        container_root: &Path,
        file: &Path,
    ) -> usize {
        let is_json = file
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if !is_json || file.parent() == Some(container_root) && file.ends_with(CONTAINER_MANIFEST) {
            return 0;
        }

        let Ok(relative) = file.strip_prefix(container_root) else {
            return 0;
        };

        let archive_path = relative
            .with_extension("")
            .components()
            .map(|component| component.as_os_str().to_string_lossy().to_string())
            .join("/");

        let key = compact_file_path(&archive_path).to_ascii_lowercase();
        if index.contains_key(&key) {
            trace!("{} is shadowed by a higher priority container", archive_path);
            return 0;
        }

        index.insert(
            key,
            IndexedFile {
                container: container.to_string(),
                file: file.to_path_buf(),
                archive_path,
            },
        );
        1
    }

    fn dump(&self, dump_dir: &Path, package: &Package) {
        let target = export_dir(dump_dir, &package.name).join(format!("{}.json", package.short_name()));
        let result = target
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| File::create(&target))
            .map_err(anyhow::Error::from)
            .and_then(|file| Ok(PackageReader::dump_package(&mut BufWriter::new(file), package)?));

        match result {
            Ok(_) => debug!("Dumped {} to {}", package.name, target.display()),
            Err(e) => warn!("Failed to dump {}: {}", package.name, e),
        }
    }
}

impl AssetProvider for LooseFileProvider {
    fn try_load_package(&self, path: &str) -> Option<Arc<Package>> {
        let key = compact_file_path(strip_object_suffix(path)).to_ascii_lowercase();
        if let Some(package) = self.cache.get(&key) {
            return Some(package);
        }

        let Some(indexed) = self.index.get(&key) else {
            warn!("Could not locate {}!", path);
            return None;
        };

        trace!("Loading {} from {}", indexed.archive_path, indexed.container);
        let package = File::open(&indexed.file)
            .map_err(anyhow::Error::from)
            .and_then(|file| {
                Ok(PackageReader::parse_package(
                    &mut BufReader::new(file),
                    &indexed.archive_path,
                )?)
            });

        let package = match package {
            Ok(package) => Arc::new(package),
            Err(e) => {
                warn!("Failed to load {}: {}", indexed.archive_path, e);
                return None;
            }
        };

        if let Some(dump_dir) = &self.dump_dir {
            self.dump(dump_dir, &package);
        }

        self.cache.insert(&key, package.clone());
        Some(package)
    }
}
