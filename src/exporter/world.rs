use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use log::{info, warn};
use serde::Serialize;
use umap_files::common::types::Transform;
use umap_files::package::types::{ObjectRef, SoftObjectPath};

use crate::exporter::actor::fresh_id;
use crate::exporter::resolver::{ReferenceResolver, ResolvedObject};
use crate::exporter::scene::{NodeRotation, SceneNode, WorldScene};
use crate::exporter::{ExportError, soft_to_none};
use crate::io::common::loader::AssetProvider;
use crate::materialize::Materializer;
use crate::settings::Config;
use crate::util::paths::{compact_file_path, lights_json_path, processed_json_path, strip_object_suffix};
use crate::util::{substring_after_last, substring_before_last, write_atomically};

const DETAIL_CULLING_PROXY: &str = "LODActor";

/// Key a world is remembered under in the visited set.
pub fn visited_key(path: &str) -> String {
    compact_file_path(strip_object_suffix(path)).to_ascii_lowercase()
}

/// Traversal context of one run: exports worlds and, recursively, everything they reference. Each world is
/// exported at most once, later references to it become empty child slots.
pub struct WorldExporter<'a> {
    provider: &'a dyn AssetProvider,
    config: &'a Config,
    materializer: &'a Materializer,
    visited: HashSet<String>,
}

impl<'a> WorldExporter<'a> {
    pub fn new(provider: &'a dyn AssetProvider, config: &'a Config, materializer: &'a Materializer) -> Self {
        WorldExporter {
            provider,
            config,
            materializer,
            visited: HashSet::new(),
        }
    }

    pub(crate) fn provider(&self) -> &'a dyn AssetProvider {
        self.provider
    }

    pub(crate) fn config(&self) -> &'a Config {
        self.config
    }

    pub(crate) fn materializer(&self) -> &'a Materializer {
        self.materializer
    }

    pub fn is_visited(&self, path: &str) -> bool {
        self.visited.contains(&visited_key(path))
    }

    /// Exports the world at `path` and everything nested in it, writing its `.processed.json` and
    /// `.lights.processed.json`. Returns the canonical path of the world's package.
    pub fn export(&mut self, path: &str) -> Result<String, ExportError> {
        let resolver = ReferenceResolver::new(self.provider);
        let world = self.find_world(&resolver, path)?;

        if !world.export.is_world() {
            return Err(ExportError::NotAWorld(world.export.path_name()));
        }

        if !self.visited.insert(visited_key(&world.package.name)) {
            return Err(ExportError::AlreadyVisited(world.dir_path()));
        }

        let mut scene = WorldScene::default();

        match resolver
            .follow(&world, "PersistentLevel")
            .filter(|level| level.export.is_level())
        {
            Some(level) => self.export_actors(&resolver, &mut scene, &world, &level)?,
            None => warn!("{} has no persistent level", world.dir_path()),
        }

        if self.config.export_building_foundations {
            self.export_streaming_levels(&resolver, &mut scene, &world)?;
        }

        let output_dir = self.materializer.output_dir();
        write_json(&processed_json_path(output_dir, &world.package.name), &scene.nodes)?;
        write_json(&lights_json_path(output_dir, &world.package.name), &scene.lights)?;

        Ok(compact_file_path(&world.package.name))
    }

    /// The first World of the package at `path`, else the object `path` names. `Maps/Apollo.umap` names the
    /// object `Maps/Apollo.Apollo`.
    fn find_world(&self, resolver: &ReferenceResolver, path: &str) -> Result<ResolvedObject, ExportError> {
        if let Some(package) = self.provider.try_load_package(path) {
            if let Some(world) = package.exports.iter().find(|export| export.is_world()) {
                return Ok(ResolvedObject {
                    package: package.clone(),
                    export: world.clone(),
                });
            }
        }

        let object_path = if path.to_ascii_lowercase().ends_with(".umap") {
            format!(
                "{}.{}",
                substring_before_last(path, '.'),
                substring_before_last(substring_after_last(path, '/'), '.')
            )
        } else {
            path.to_string()
        };

        resolver
            .load_object(&object_path)
            .ok_or_else(|| ExportError::NotFound(path.to_string()))
    }

    fn export_actors(
        &mut self,
        resolver: &ReferenceResolver,
        scene: &mut WorldScene,
        world: &ResolvedObject,
        level: &ResolvedObject,
    ) -> Result<(), ExportError> {
        let actors = level
            .props()
            .get::<Vec<Option<ObjectRef>>>("Actors")
            .unwrap_or_default();

        for (index, reference) in actors.iter().enumerate() {
            let Some(actor) = reference
                .as_ref()
                .and_then(|reference| resolver.resolve(&level.package, reference))
            else {
                continue;
            };

            if actor.class_name() == DETAIL_CULLING_PROXY {
                continue;
            }

            info!("Loading {}: {}/{} {}", world.name(), index, actors.len(), actor.name());
            self.process_actor(scene, &actor)?;
        }

        Ok(())
    }

    fn export_streaming_levels(
        &mut self,
        resolver: &ReferenceResolver,
        scene: &mut WorldScene,
        world: &ResolvedObject,
    ) -> Result<(), ExportError> {
        let streaming_levels = world
            .props()
            .get::<Vec<Option<ObjectRef>>>("StreamingLevels")
            .unwrap_or_default();

        for reference in streaming_levels.iter().flatten() {
            let Some(streaming_level) = resolver.resolve(&world.package, reference) else {
                continue;
            };

            let Some(world_asset) = streaming_level
                .props()
                .get::<SoftObjectPath>("WorldAsset")
            else {
                continue;
            };

            let target = strip_object_suffix(&world_asset.asset_path_name);
            if self.is_visited(target) {
                continue;
            }

            let child = soft_to_none(self.export(target))?;
            let transform = streaming_level
                .props()
                .get_or("LevelTransform", Transform::IDENTITY);

            let mut node = SceneNode::container(
                fresh_id(),
                streaming_level.name().to_string(),
                transform.translation,
                NodeRotation::Quat(transform.rotation),
                transform.scale_3d,
            );
            node.children = vec![child];
            scene.push(node);
        }

        Ok(())
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ExportError> {
    info!("Writing to {}", path.display());
    write_atomically(path, |wtr| {
        if cfg!(debug_assertions) {
            serde_json::to_writer_pretty(wtr, value)?;
        } else {
            serde_json::to_writer(wtr, value)?;
        }
        Ok(())
    })
    .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}
